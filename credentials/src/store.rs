// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! File-backed store of tenant credential records
//!
//! The store deliberately caches nothing: every lookup re-reads the backing
//! file so that external edits and concurrent writes are visible on the
//! next call.  Writes serialize the whole document; two concurrent writers
//! are last-writer-wins, which matches how the console is deployed (one
//! operator at a time).

use crate::TenantCredential;
use camino::Utf8PathBuf;
use console_common::CreateResult;
use console_common::DeleteResult;
use console_common::Error;
use console_common::ListResultVec;
use console_common::LookupResult;
use console_common::LookupType;
use console_common::ResourceType;
use console_common::UpdateResult;
use serde::Deserialize;
use serde::Serialize;
use slog::warn;
use slog::Logger;
use slog::o;
use uuid::Uuid;

/// The on-disk document shape: a list of tenants
#[derive(Debug, Default, Deserialize, Serialize)]
struct TenantDocument {
    #[serde(default)]
    tenants: Vec<TenantCredential>,
}

/// Fields a caller supplies when creating or updating a tenant record
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewTenantCredential {
    pub display_name: String,
    pub user_ocid: String,
    pub fingerprint: String,
    pub key_file: Utf8PathBuf,
    pub tenancy_id: String,
    pub default_region: String,
    pub compartment_id: Option<String>,
}

pub struct CredentialStore {
    path: Utf8PathBuf,
    log: Logger,
}

impl CredentialStore {
    pub fn new(path: Utf8PathBuf, log: &Logger) -> CredentialStore {
        let log = log.new(o!("component" => "CredentialStore"));
        CredentialStore { path, log }
    }

    /// Reads the backing file.  A missing or malformed file yields an
    /// empty document rather than an error, so a corrupt config never
    /// takes the console down; the condition is logged.
    async fn load(&self) -> TenantDocument {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    self.log, "could not read tenant store; treating as empty";
                    "path" => %self.path,
                    "error" => %e,
                );
                return TenantDocument::default();
            }
        };
        match toml::from_str(&raw) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(
                    self.log, "malformed tenant store; treating as empty";
                    "path" => %self.path,
                    "error" => %e,
                );
                TenantDocument::default()
            }
        }
    }

    async fn save(&self, doc: &TenantDocument) -> Result<(), Error> {
        let raw = toml::to_string_pretty(doc).map_err(|e| {
            Error::internal_error(&format!(
                "serializing tenant store: {}",
                e
            ))
        })?;
        tokio::fs::write(&self.path, raw).await.map_err(|e| {
            Error::Configuration {
                message: format!(
                    "writing tenant store {}: {}",
                    self.path, e
                ),
            }
        })
    }

    pub async fn get(&self, id: Uuid) -> LookupResult<TenantCredential> {
        self.load()
            .await
            .tenants
            .into_iter()
            .find(|t| t.id == id)
            .ok_or_else(|| {
                LookupType::from(id).into_not_found(ResourceType::Tenant)
            })
    }

    /// Best-effort lookup by display name: names are not guaranteed unique
    /// and the first match wins.
    pub async fn get_by_name(&self, name: &str) -> LookupResult<TenantCredential> {
        self.load()
            .await
            .tenants
            .into_iter()
            .find(|t| t.display_name == name)
            .ok_or_else(|| {
                Error::not_found_by_name(ResourceType::Tenant, name)
            })
    }

    pub async fn list(&self) -> ListResultVec<TenantCredential> {
        Ok(self.load().await.tenants)
    }

    pub async fn create(
        &self,
        new: NewTenantCredential,
    ) -> CreateResult<TenantCredential> {
        let mut doc = self.load().await;
        let tenant = TenantCredential {
            id: Uuid::new_v4(),
            display_name: new.display_name,
            user_ocid: new.user_ocid,
            fingerprint: new.fingerprint,
            key_file: new.key_file,
            tenancy_id: new.tenancy_id,
            default_region: new.default_region,
            compartment_id: new.compartment_id,
        };
        doc.tenants.push(tenant.clone());
        self.save(&doc).await?;
        Ok(tenant)
    }

    pub async fn update(
        &self,
        id: Uuid,
        new: NewTenantCredential,
    ) -> UpdateResult<TenantCredential> {
        let mut doc = self.load().await;
        let tenant = doc
            .tenants
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| {
                LookupType::from(id).into_not_found(ResourceType::Tenant)
            })?;
        tenant.display_name = new.display_name;
        tenant.user_ocid = new.user_ocid;
        tenant.fingerprint = new.fingerprint;
        tenant.key_file = new.key_file;
        tenant.tenancy_id = new.tenancy_id;
        tenant.default_region = new.default_region;
        tenant.compartment_id = new.compartment_id;
        let updated = tenant.clone();
        self.save(&doc).await?;
        Ok(updated)
    }

    pub async fn delete(&self, id: Uuid) -> DeleteResult {
        let mut doc = self.load().await;
        let before = doc.tenants.len();
        doc.tenants.retain(|t| t.id != id);
        if doc.tenants.len() == before {
            return Err(
                LookupType::from(id).into_not_found(ResourceType::Tenant)
            );
        }
        self.save(&doc).await
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use camino_tempfile::Utf8TempDir;

    fn test_log() -> Logger {
        Logger::root(slog::Discard, o!())
    }

    fn new_tenant(name: &str) -> NewTenantCredential {
        NewTenantCredential {
            display_name: String::from(name),
            user_ocid: format!("ocid1.user.oc1..{}", name),
            fingerprint: String::from("aa:bb:cc"),
            key_file: Utf8PathBuf::from("/nonexistent/key.pem"),
            tenancy_id: String::from("ocid1.tenancy.oc1..root"),
            default_region: String::from("us-ashburn-1"),
            compartment_id: None,
        }
    }

    fn store_in(dir: &Utf8TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("tenants.toml"), &test_log())
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = Utf8TempDir::new().unwrap();
        let store = store_in(&dir);
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let dir = Utf8TempDir::new().unwrap();
        let store = store_in(&dir);
        let err = store.get(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::ObjectNotFound { type_name: ResourceType::Tenant, .. }
        ));
    }

    #[tokio::test]
    async fn test_create_then_get_round_trips() {
        let dir = Utf8TempDir::new().unwrap();
        let store = store_in(&dir);
        let created = store.create(new_tenant("prod")).await.unwrap();
        let fetched = store.get(created.id).await.unwrap();
        assert_eq!(created, fetched);
        assert_eq!(fetched.effective_compartment(), "ocid1.tenancy.oc1..root");

        let by_name = store.get_by_name("prod").await.unwrap();
        assert_eq!(by_name.id, created.id);
    }

    #[tokio::test]
    async fn test_writes_visible_without_caching() {
        let dir = Utf8TempDir::new().unwrap();
        // Two store handles over the same file: a write through one is
        // visible through the other because reads hit the file every time.
        let writer = store_in(&dir);
        let reader = store_in(&dir);
        let created = writer.create(new_tenant("shared")).await.unwrap();
        assert_eq!(reader.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let dir = Utf8TempDir::new().unwrap();
        let store = store_in(&dir);
        let created = store.create(new_tenant("stage")).await.unwrap();

        let mut changed = new_tenant("stage");
        changed.default_region = String::from("eu-frankfurt-1");
        changed.compartment_id =
            Some(String::from("ocid1.compartment.oc1..team"));
        let updated = store.update(created.id, changed).await.unwrap();
        assert_eq!(updated.default_region, "eu-frankfurt-1");
        assert_eq!(
            updated.effective_compartment(),
            "ocid1.compartment.oc1..team"
        );

        store.delete(created.id).await.unwrap();
        assert!(store.get(created.id).await.is_err());
        assert!(store.delete(created.id).await.is_err());
    }

    #[tokio::test]
    async fn test_malformed_file_is_empty_not_fatal() {
        let dir = Utf8TempDir::new().unwrap();
        let path = dir.path().join("tenants.toml");
        tokio::fs::write(&path, "tenants = \"not a list").await.unwrap();
        let store = CredentialStore::new(path, &test_log());
        assert!(store.list().await.unwrap().is_empty());
    }
}

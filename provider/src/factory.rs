// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Construction of tenant-scoped service clients

use crate::auth::ApiAuth;
use crate::auth::ServiceKind;
use crate::interfaces::BlockStorageApi;
use crate::interfaces::CloudProvider;
use crate::interfaces::ComputeApi;
use crate::interfaces::IdentityApi;
use crate::interfaces::LimitsApi;
use crate::interfaces::NetworkApi;
use crate::interfaces::ObjectStorageApi;
use crate::interfaces::SubscriptionApi;
use crate::interfaces::UsageApi;
use console_common::Error;
use console_credentials::TenantCredential;
use slog::debug;
use slog::o;
use slog::Logger;
use std::sync::Arc;

/// A service client built for one tenant, tagged by service
///
/// Used by callers that select the service dynamically; callers that know
/// the service statically use the typed accessors on [`ClientFactory`].
#[derive(Clone)]
pub enum ServiceClient {
    Compute(Arc<dyn ComputeApi>),
    Network(Arc<dyn NetworkApi>),
    Identity(Arc<dyn IdentityApi>),
    ObjectStorage(Arc<dyn ObjectStorageApi>),
    BlockStorage(Arc<dyn BlockStorageApi>),
}

impl ServiceClient {
    pub fn kind(&self) -> ServiceKind {
        match self {
            ServiceClient::Compute(_) => ServiceKind::Compute,
            ServiceClient::Network(_) => ServiceKind::Network,
            ServiceClient::Identity(_) => ServiceKind::Identity,
            ServiceClient::ObjectStorage(_) => ServiceKind::ObjectStorage,
            ServiceClient::BlockStorage(_) => ServiceKind::BlockStorage,
        }
    }
}

/// Builds tenant-scoped service clients on demand
///
/// The factory holds no per-tenant state: credentials are resolved fresh on
/// every call, so credential edits take effect immediately.
#[derive(Clone)]
pub struct ClientFactory {
    provider: Arc<dyn CloudProvider>,
    log: Logger,
}

impl ClientFactory {
    pub fn new(provider: Arc<dyn CloudProvider>, log: &Logger) -> ClientFactory {
        let log = log.new(o!("component" => "ClientFactory"));
        ClientFactory { provider, log }
    }

    async fn auth(
        &self,
        tenant: &TenantCredential,
        region: Option<&str>,
    ) -> Result<ApiAuth, Error> {
        let auth = ApiAuth::for_tenant(tenant, region).await?;
        debug!(
            self.log, "resolved tenant auth";
            "tenant" => &tenant.display_name,
            "region" => &auth.region,
        );
        Ok(auth)
    }

    pub async fn build(
        &self,
        tenant: &TenantCredential,
        kind: ServiceKind,
        region: Option<&str>,
    ) -> Result<ServiceClient, Error> {
        let auth = self.auth(tenant, region).await?;
        Ok(match kind {
            ServiceKind::Compute => {
                ServiceClient::Compute(self.provider.compute(&auth))
            }
            ServiceKind::Network => {
                ServiceClient::Network(self.provider.network(&auth))
            }
            ServiceKind::Identity => {
                ServiceClient::Identity(self.provider.identity(&auth))
            }
            ServiceKind::ObjectStorage => {
                ServiceClient::ObjectStorage(self.provider.object_storage(&auth))
            }
            ServiceKind::BlockStorage => {
                ServiceClient::BlockStorage(self.provider.block_storage(&auth))
            }
        })
    }

    pub async fn compute(
        &self,
        tenant: &TenantCredential,
        region: Option<&str>,
    ) -> Result<Arc<dyn ComputeApi>, Error> {
        let auth = self.auth(tenant, region).await?;
        Ok(self.provider.compute(&auth))
    }

    pub async fn network(
        &self,
        tenant: &TenantCredential,
        region: Option<&str>,
    ) -> Result<Arc<dyn NetworkApi>, Error> {
        let auth = self.auth(tenant, region).await?;
        Ok(self.provider.network(&auth))
    }

    pub async fn block_storage(
        &self,
        tenant: &TenantCredential,
        region: Option<&str>,
    ) -> Result<Arc<dyn BlockStorageApi>, Error> {
        let auth = self.auth(tenant, region).await?;
        Ok(self.provider.block_storage(&auth))
    }

    pub async fn identity(
        &self,
        tenant: &TenantCredential,
        region: Option<&str>,
    ) -> Result<Arc<dyn IdentityApi>, Error> {
        let auth = self.auth(tenant, region).await?;
        Ok(self.provider.identity(&auth))
    }

    pub async fn usage(
        &self,
        tenant: &TenantCredential,
    ) -> Result<Arc<dyn UsageApi>, Error> {
        let auth = self.auth(tenant, None).await?;
        Ok(self.provider.usage(&auth))
    }

    pub async fn limits(
        &self,
        tenant: &TenantCredential,
        region: Option<&str>,
    ) -> Result<Arc<dyn LimitsApi>, Error> {
        let auth = self.auth(tenant, region).await?;
        Ok(self.provider.limits(&auth))
    }

    pub async fn subscriptions(
        &self,
        tenant: &TenantCredential,
    ) -> Result<Arc<dyn SubscriptionApi>, Error> {
        let auth = self.auth(tenant, None).await?;
        Ok(self.provider.subscriptions(&auth))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sim::SimCloud;
    use camino::Utf8PathBuf;
    use camino_tempfile::Utf8TempDir;
    use slog::o;
    use uuid::Uuid;

    fn tenant(key_file: Utf8PathBuf) -> TenantCredential {
        TenantCredential {
            id: Uuid::new_v4(),
            display_name: String::from("prod"),
            user_ocid: String::from("ocid1.user.oc1..alice"),
            fingerprint: String::from("aa:bb"),
            key_file,
            tenancy_id: String::from("ocid1.tenancy.oc1..root"),
            default_region: String::from("us-ashburn-1"),
            compartment_id: None,
        }
    }

    #[tokio::test]
    async fn test_build_matches_requested_kind() {
        let dir = Utf8TempDir::new().unwrap();
        let key = dir.path().join("key.pem");
        tokio::fs::write(&key, "KEY").await.unwrap();
        let log = Logger::root(slog::Discard, o!());
        let factory =
            ClientFactory::new(Arc::new(SimCloud::new()), &log);
        let tenant = tenant(key);

        for kind in [
            ServiceKind::Compute,
            ServiceKind::Network,
            ServiceKind::Identity,
            ServiceKind::ObjectStorage,
            ServiceKind::BlockStorage,
        ] {
            let client = factory.build(&tenant, kind, None).await.unwrap();
            assert_eq!(client.kind(), kind);
        }
    }

    #[tokio::test]
    async fn test_build_fails_without_key() {
        let log = Logger::root(slog::Discard, o!());
        let factory =
            ClientFactory::new(Arc::new(SimCloud::new()), &log);
        let tenant = tenant(Utf8PathBuf::from("/nonexistent/key.pem"));
        let result = factory.build(&tenant, ServiceKind::Compute, None).await;
        assert!(matches!(result, Err(Error::ClientConstruction { .. })));
    }
}

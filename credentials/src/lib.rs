// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Tenant credential records and their file-backed store

mod store;

pub use store::CredentialStore;
pub use store::NewTenantCredential;

use camino::Utf8PathBuf;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// One tenant the console can act on behalf of
///
/// The private key is referenced by path and read at client-construction
/// time, never embedded in the record.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct TenantCredential {
    /// Stable identifier, assigned at creation.  `display_name` is a
    /// caller-facing alias and is not guaranteed unique.
    pub id: Uuid,
    pub display_name: String,
    /// OCID of the identity principal (user) acting for this tenant.
    pub user_ocid: String,
    pub fingerprint: String,
    pub key_file: Utf8PathBuf,
    pub tenancy_id: String,
    pub default_region: String,
    pub compartment_id: Option<String>,
}

impl TenantCredential {
    /// The compartment scope for this tenant's resources, falling back to
    /// the root compartment (the tenancy) when none is configured.
    pub fn effective_compartment(&self) -> &str {
        self.compartment_id.as_deref().unwrap_or(&self.tenancy_id)
    }

    /// The region an operation should run in, honoring an optional
    /// caller override.
    pub fn region_or<'a>(&'a self, override_region: Option<&'a str>) -> &'a str {
        override_region.unwrap_or(&self.default_region)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tenant(compartment: Option<&str>) -> TenantCredential {
        TenantCredential {
            id: Uuid::new_v4(),
            display_name: String::from("prod"),
            user_ocid: String::from("ocid1.user.oc1..alice"),
            fingerprint: String::from("aa:bb"),
            key_file: Utf8PathBuf::from("/etc/console/keys/prod.pem"),
            tenancy_id: String::from("ocid1.tenancy.oc1..root"),
            default_region: String::from("us-ashburn-1"),
            compartment_id: compartment.map(String::from),
        }
    }

    #[test]
    fn test_compartment_defaults_to_tenancy() {
        assert_eq!(
            tenant(None).effective_compartment(),
            "ocid1.tenancy.oc1..root"
        );
        assert_eq!(
            tenant(Some("ocid1.compartment.oc1..c1")).effective_compartment(),
            "ocid1.compartment.oc1..c1"
        );
    }

    #[test]
    fn test_region_override() {
        let t = tenant(None);
        assert_eq!(t.region_or(None), "us-ashburn-1");
        assert_eq!(t.region_or(Some("eu-frankfurt-1")), "eu-frankfurt-1");
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Per-call authentication material for provider clients

use console_common::Error;
use console_credentials::TenantCredential;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use std::str::FromStr;
use uuid::Uuid;

/// The provider services a client can be scoped to
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum ServiceKind {
    Compute,
    Network,
    Identity,
    ObjectStorage,
    BlockStorage,
}

impl Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ServiceKind::Compute => "compute",
            ServiceKind::Network => "network",
            ServiceKind::Identity => "identity",
            ServiceKind::ObjectStorage => "object_storage",
            ServiceKind::BlockStorage => "block_storage",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for ServiceKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "compute" => Ok(ServiceKind::Compute),
            "network" => Ok(ServiceKind::Network),
            "identity" => Ok(ServiceKind::Identity),
            "object_storage" => Ok(ServiceKind::ObjectStorage),
            "block_storage" => Ok(ServiceKind::BlockStorage),
            other => Err(Error::invalid_request(&format!(
                "unknown service kind \"{}\"",
                other
            ))),
        }
    }
}

/// Authentication material binding a client to one tenant and region
///
/// Built fresh for every client construction: the private key is read
/// from its file at call time, so a rotated key takes effect on the next
/// call without any cache invalidation.
#[derive(Clone, Debug)]
pub struct ApiAuth {
    pub tenant_id: Uuid,
    pub tenant_name: String,
    pub user_ocid: String,
    pub fingerprint: String,
    pub tenancy_id: String,
    pub region: String,
    pub key_content: String,
}

impl ApiAuth {
    /// Resolves authentication material for `tenant`, honoring an optional
    /// region override.  Key-file problems are credential/config errors,
    /// never retried.
    pub async fn for_tenant(
        tenant: &TenantCredential,
        region_override: Option<&str>,
    ) -> Result<ApiAuth, Error> {
        let key_content = tokio::fs::read_to_string(&tenant.key_file)
            .await
            .map_err(|e| Error::ClientConstruction {
                tenant: tenant.display_name.clone(),
                message: format!(
                    "cannot read key file {}: {}",
                    tenant.key_file, e
                ),
            })?;
        Ok(ApiAuth {
            tenant_id: tenant.id,
            tenant_name: tenant.display_name.clone(),
            user_ocid: tenant.user_ocid.clone(),
            fingerprint: tenant.fingerprint.clone(),
            tenancy_id: tenant.tenancy_id.clone(),
            region: tenant.region_or(region_override).to_owned(),
            key_content,
        })
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Serial console connections

use console_common::model::ConsoleConnection;
use console_common::CreateResult;
use console_common::DeleteResult;
use console_common::ListResultVec;
use console_common::ResourceType;
use slog::info;
use uuid::Uuid;

impl super::Orchestrator {
    pub async fn create_console_connection(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        instance_id: &str,
        public_key: &str,
    ) -> CreateResult<ConsoleConnection> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        info!(
            self.log(), "creating console connection";
            "instance" => instance_id,
        );
        compute
            .create_console_connection(instance_id, public_key)
            .await
            .map_err(|e| e.into_error(ResourceType::Instance, instance_id))
    }

    pub async fn list_console_connections(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        instance_id: &str,
    ) -> ListResultVec<ConsoleConnection> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        compute
            .list_console_connections(
                tenant.effective_compartment(),
                instance_id,
            )
            .await
            .map_err(|e| {
                e.into_error(ResourceType::ConsoleConnection, instance_id)
            })
    }

    /// Deleting a connection that is already gone is success.
    pub async fn delete_console_connection(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        connection_id: &str,
    ) -> DeleteResult {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        match compute.delete_console_connection(connection_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into_error(
                ResourceType::ConsoleConnection,
                connection_id,
            )),
        }
    }
}

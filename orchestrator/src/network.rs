// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! VCN-level networking: subnets, security lists, route tables
//!
//! Rule updates are full replacements, mirroring the provider's contract:
//! callers read the current rule set, edit it, and write the whole thing
//! back.

use console_common::model::RouteRule;
use console_common::model::RouteTable;
use console_common::model::SecurityList;
use console_common::model::SecurityRule;
use console_common::model::Subnet;
use console_common::model::Vcn;
use console_common::CreateResult;
use console_common::DeleteResult;
use console_common::ListResultVec;
use console_common::LookupResult;
use console_common::ResourceType;
use console_common::UpdateResult;
use slog::info;
use uuid::Uuid;

impl super::Orchestrator {
    pub async fn list_vcns(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
    ) -> ListResultVec<Vcn> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        let compartment = tenant.effective_compartment();
        network
            .list_vcns(compartment)
            .await
            .map_err(|e| e.into_error(ResourceType::Vcn, compartment))
    }

    pub async fn create_vcn(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        display_name: &str,
        cidr_block: &str,
        dns_label: Option<&str>,
    ) -> CreateResult<Vcn> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        info!(
            self.log(), "creating vcn";
            "tenant" => &tenant.display_name,
            "display_name" => display_name,
            "cidr" => cidr_block,
        );
        network
            .create_vcn(
                tenant.effective_compartment(),
                display_name,
                cidr_block,
                dns_label,
            )
            .await
            .map_err(|e| e.into_error(ResourceType::Vcn, display_name))
    }

    pub async fn delete_vcn(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        vcn_id: &str,
    ) -> DeleteResult {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        match network.delete_vcn(vcn_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into_error(ResourceType::Vcn, vcn_id)),
        }
    }

    pub async fn list_subnets(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        vcn_id: &str,
    ) -> ListResultVec<Subnet> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        network
            .list_subnets(tenant.effective_compartment(), vcn_id)
            .await
            .map_err(|e| e.into_error(ResourceType::Subnet, vcn_id))
    }

    pub async fn create_subnet(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        vcn_id: &str,
        display_name: &str,
        cidr_block: &str,
    ) -> CreateResult<Subnet> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        info!(
            self.log(), "creating subnet";
            "vcn" => vcn_id,
            "display_name" => display_name,
            "cidr" => cidr_block,
        );
        network
            .create_subnet(
                tenant.effective_compartment(),
                vcn_id,
                display_name,
                cidr_block,
            )
            .await
            .map_err(|e| e.into_error(ResourceType::Subnet, display_name))
    }

    pub async fn delete_subnet(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        subnet_id: &str,
    ) -> DeleteResult {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        match network.delete_subnet(subnet_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into_error(ResourceType::Subnet, subnet_id)),
        }
    }

    pub async fn list_security_lists(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        vcn_id: &str,
    ) -> ListResultVec<SecurityList> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        network
            .list_security_lists(tenant.effective_compartment(), vcn_id)
            .await
            .map_err(|e| e.into_error(ResourceType::SecurityList, vcn_id))
    }

    pub async fn get_security_list(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        security_list_id: &str,
    ) -> LookupResult<SecurityList> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        network.get_security_list(security_list_id).await.map_err(|e| {
            e.into_error(ResourceType::SecurityList, security_list_id)
        })
    }

    pub async fn create_security_list(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        vcn_id: &str,
        display_name: &str,
        ingress_rules: &[SecurityRule],
        egress_rules: &[SecurityRule],
    ) -> CreateResult<SecurityList> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        info!(
            self.log(), "creating security list";
            "vcn" => vcn_id,
            "display_name" => display_name,
        );
        network
            .create_security_list(
                tenant.effective_compartment(),
                vcn_id,
                display_name,
                ingress_rules,
                egress_rules,
            )
            .await
            .map_err(|e| e.into_error(ResourceType::SecurityList, display_name))
    }

    pub async fn delete_security_list(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        security_list_id: &str,
    ) -> DeleteResult {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        match network.delete_security_list(security_list_id).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(e.into_error(
                ResourceType::SecurityList,
                security_list_id,
            )),
        }
    }

    /// Replaces both rule sets of a security list.
    pub async fn update_security_list(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        security_list_id: &str,
        ingress_rules: &[SecurityRule],
        egress_rules: &[SecurityRule],
    ) -> UpdateResult<SecurityList> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        info!(
            self.log(), "replacing security list rules";
            "security_list" => security_list_id,
            "ingress" => ingress_rules.len(),
            "egress" => egress_rules.len(),
        );
        network
            .update_security_list(security_list_id, ingress_rules, egress_rules)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::SecurityList, security_list_id)
            })
    }

    pub async fn list_route_tables(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        vcn_id: &str,
    ) -> ListResultVec<RouteTable> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        network
            .list_route_tables(tenant.effective_compartment(), vcn_id)
            .await
            .map_err(|e| e.into_error(ResourceType::RouteTable, vcn_id))
    }

    pub async fn get_route_table(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        route_table_id: &str,
    ) -> LookupResult<RouteTable> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        network.get_route_table(route_table_id).await.map_err(|e| {
            e.into_error(ResourceType::RouteTable, route_table_id)
        })
    }

    /// Replaces the full rule set of a route table.
    pub async fn update_route_table(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        route_table_id: &str,
        route_rules: &[RouteRule],
    ) -> UpdateResult<RouteTable> {
        let tenant = self.tenant(tenant_id).await?;
        let network = self.factory().network(&tenant, region).await?;
        info!(
            self.log(), "replacing route table rules";
            "route_table" => route_table_id,
            "rules" => route_rules.len(),
        );
        network
            .update_route_table(route_table_id, route_rules)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::RouteTable, route_table_id)
            })
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Service traits the orchestrator programs against
//!
//! Each trait maps to one provider service endpoint family.  Methods take
//! the cloud-assigned identifiers and return wire-shaped models; all
//! normalization and classification happens in the orchestrator.  A real
//! SDK binding and the in-memory [`crate::sim`] both implement
//! [`CloudProvider`].

use crate::auth::ApiAuth;
use crate::error::ProviderError;
use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use console_common::model::AvailabilityDomain;
use console_common::model::ConsoleConnection;
use console_common::model::Instance;
use console_common::model::InstanceAction;
use console_common::model::LaunchInstanceSpec;
use console_common::model::LimitValue;
use console_common::model::Page;
use console_common::model::PrivateIp;
use console_common::model::PublicIp;
use console_common::model::ResourceAvailability;
use console_common::model::RouteRule;
use console_common::model::RouteTable;
use console_common::model::SecurityList;
use console_common::model::SecurityRule;
use console_common::model::ServiceSummary;
use console_common::model::Subnet;
use console_common::model::Subscription;
use console_common::model::UsageLineItem;
use console_common::model::Vcn;
use console_common::model::Vnic;
use console_common::model::VnicAttachment;
use console_common::model::Volume;
use console_common::model::VolumeAttachment;
use console_common::model::VolumeHandle;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;

/// Parameters for a summarized usage request
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UsageQuery {
    pub tenancy_id: String,
    pub time_started: DateTime<Utc>,
    pub time_ended: DateTime<Utc>,
    /// "DAILY" or "MONTHLY".
    pub granularity: String,
    pub page: Option<String>,
}

/// Compute service: instances, their attachments, console connections
#[async_trait]
pub trait ComputeApi: Send + Sync {
    async fn list_instances(
        &self,
        compartment_id: &str,
        page: Option<&str>,
    ) -> Result<Page<Instance>, ProviderError>;

    async fn get_instance(
        &self,
        instance_id: &str,
    ) -> Result<Instance, ProviderError>;

    async fn launch_instance(
        &self,
        compartment_id: &str,
        spec: &LaunchInstanceSpec,
    ) -> Result<Instance, ProviderError>;

    /// Issues a power action.  Acceptance only: the returned instance may
    /// still be in its pre-action state.
    async fn instance_action(
        &self,
        instance_id: &str,
        action: InstanceAction,
    ) -> Result<Instance, ProviderError>;

    async fn terminate_instance(
        &self,
        instance_id: &str,
        preserve_boot_volume: bool,
    ) -> Result<(), ProviderError>;

    async fn list_vnic_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, ProviderError>;

    async fn get_vnic_attachment(
        &self,
        attachment_id: &str,
    ) -> Result<VnicAttachment, ProviderError>;

    async fn attach_vnic(
        &self,
        instance_id: &str,
        subnet_id: &str,
        display_name: Option<&str>,
        assign_public_ip: bool,
    ) -> Result<VnicAttachment, ProviderError>;

    async fn detach_vnic(
        &self,
        attachment_id: &str,
    ) -> Result<(), ProviderError>;

    async fn list_volume_attachments(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VolumeAttachment>, ProviderError>;

    async fn list_boot_volume_attachments(
        &self,
        availability_domain: &str,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VolumeAttachment>, ProviderError>;

    async fn get_volume_attachment(
        &self,
        attachment_id: &str,
    ) -> Result<VolumeAttachment, ProviderError>;

    async fn get_boot_volume_attachment(
        &self,
        attachment_id: &str,
    ) -> Result<VolumeAttachment, ProviderError>;

    async fn attach_block_volume(
        &self,
        instance_id: &str,
        volume_id: &str,
    ) -> Result<VolumeAttachment, ProviderError>;

    async fn attach_boot_volume(
        &self,
        instance_id: &str,
        boot_volume_id: &str,
    ) -> Result<VolumeAttachment, ProviderError>;

    async fn detach_block_volume(
        &self,
        attachment_id: &str,
    ) -> Result<(), ProviderError>;

    async fn detach_boot_volume(
        &self,
        attachment_id: &str,
    ) -> Result<(), ProviderError>;

    async fn create_console_connection(
        &self,
        instance_id: &str,
        public_key: &str,
    ) -> Result<ConsoleConnection, ProviderError>;

    async fn list_console_connections(
        &self,
        compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<ConsoleConnection>, ProviderError>;

    async fn delete_console_connection(
        &self,
        connection_id: &str,
    ) -> Result<(), ProviderError>;
}

/// Virtual networking: VNICs, IPs, VCNs, subnets, security lists, routes
#[async_trait]
pub trait NetworkApi: Send + Sync {
    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic, ProviderError>;

    async fn list_private_ips(
        &self,
        vnic_id: &str,
    ) -> Result<Vec<PrivateIp>, ProviderError>;

    async fn get_public_ip(
        &self,
        public_ip_id: &str,
    ) -> Result<PublicIp, ProviderError>;

    async fn get_public_ip_by_address(
        &self,
        compartment_id: &str,
        ip_address: &str,
    ) -> Result<PublicIp, ProviderError>;

    async fn create_public_ip(
        &self,
        compartment_id: &str,
        private_ip_id: &str,
    ) -> Result<PublicIp, ProviderError>;

    async fn delete_public_ip(
        &self,
        public_ip_id: &str,
    ) -> Result<(), ProviderError>;

    async fn list_vcns(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<Vcn>, ProviderError>;

    async fn create_vcn(
        &self,
        compartment_id: &str,
        display_name: &str,
        cidr_block: &str,
        dns_label: Option<&str>,
    ) -> Result<Vcn, ProviderError>;

    async fn delete_vcn(&self, vcn_id: &str) -> Result<(), ProviderError>;

    async fn list_subnets(
        &self,
        compartment_id: &str,
        vcn_id: &str,
    ) -> Result<Vec<Subnet>, ProviderError>;

    async fn create_subnet(
        &self,
        compartment_id: &str,
        vcn_id: &str,
        display_name: &str,
        cidr_block: &str,
    ) -> Result<Subnet, ProviderError>;

    async fn delete_subnet(
        &self,
        subnet_id: &str,
    ) -> Result<(), ProviderError>;

    async fn list_security_lists(
        &self,
        compartment_id: &str,
        vcn_id: &str,
    ) -> Result<Vec<SecurityList>, ProviderError>;

    async fn get_security_list(
        &self,
        security_list_id: &str,
    ) -> Result<SecurityList, ProviderError>;

    async fn create_security_list(
        &self,
        compartment_id: &str,
        vcn_id: &str,
        display_name: &str,
        ingress_rules: &[SecurityRule],
        egress_rules: &[SecurityRule],
    ) -> Result<SecurityList, ProviderError>;

    async fn delete_security_list(
        &self,
        security_list_id: &str,
    ) -> Result<(), ProviderError>;

    /// Full replacement of both rule sets.
    async fn update_security_list(
        &self,
        security_list_id: &str,
        ingress_rules: &[SecurityRule],
        egress_rules: &[SecurityRule],
    ) -> Result<SecurityList, ProviderError>;

    async fn list_route_tables(
        &self,
        compartment_id: &str,
        vcn_id: &str,
    ) -> Result<Vec<RouteTable>, ProviderError>;

    async fn get_route_table(
        &self,
        route_table_id: &str,
    ) -> Result<RouteTable, ProviderError>;

    /// Full replacement of the rule set.
    async fn update_route_table(
        &self,
        route_table_id: &str,
        route_rules: &[RouteRule],
    ) -> Result<RouteTable, ProviderError>;
}

/// Block storage: block and boot volumes
#[async_trait]
pub trait BlockStorageApi: Send + Sync {
    async fn get_volume(
        &self,
        handle: &VolumeHandle,
    ) -> Result<Volume, ProviderError>;

    /// Resizes a volume.  Both namespaces accept growth only; the provider
    /// rejects block shrinks with 400 while boot shrinks are rejected
    /// locally before this call is reached.
    async fn update_volume(
        &self,
        handle: &VolumeHandle,
        size_in_gbs: u64,
        vpus_per_gb: Option<u64>,
    ) -> Result<Volume, ProviderError>;

    async fn list_block_volumes(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<Volume>, ProviderError>;

    async fn list_boot_volumes(
        &self,
        availability_domain: &str,
        compartment_id: &str,
    ) -> Result<Vec<Volume>, ProviderError>;
}

/// Identity service: availability domains
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn list_availability_domains(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<AvailabilityDomain>, ProviderError>;
}

/// Object storage; only the namespace lookup is needed today.
#[async_trait]
pub trait ObjectStorageApi: Send + Sync {
    async fn get_namespace(&self) -> Result<String, ProviderError>;
}

/// Cost and usage reporting
#[async_trait]
pub trait UsageApi: Send + Sync {
    async fn request_summarized_usage(
        &self,
        query: &UsageQuery,
    ) -> Result<Page<UsageLineItem>, ProviderError>;
}

/// Service limits and their consumption
#[async_trait]
pub trait LimitsApi: Send + Sync {
    async fn list_services(
        &self,
        compartment_id: &str,
    ) -> Result<Vec<ServiceSummary>, ProviderError>;

    async fn list_limit_values(
        &self,
        compartment_id: &str,
        service_name: &str,
        page: Option<&str>,
    ) -> Result<Page<LimitValue>, ProviderError>;

    async fn get_resource_availability(
        &self,
        compartment_id: &str,
        service_name: &str,
        limit_name: &str,
        availability_domain: Option<&str>,
    ) -> Result<ResourceAvailability, ProviderError>;
}

/// Subscribed-service listing
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    async fn list_subscriptions(
        &self,
        tenancy_id: &str,
    ) -> Result<Vec<Subscription>, ProviderError>;
}

/// A full provider binding: hands out service clients scoped to one
/// tenant's authentication material
pub trait CloudProvider: Send + Sync {
    fn compute(&self, auth: &ApiAuth) -> Arc<dyn ComputeApi>;
    fn network(&self, auth: &ApiAuth) -> Arc<dyn NetworkApi>;
    fn block_storage(&self, auth: &ApiAuth) -> Arc<dyn BlockStorageApi>;
    fn identity(&self, auth: &ApiAuth) -> Arc<dyn IdentityApi>;
    fn object_storage(&self, auth: &ApiAuth) -> Arc<dyn ObjectStorageApi>;
    fn usage(&self, auth: &ApiAuth) -> Arc<dyn UsageApi>;
    fn limits(&self, auth: &ApiAuth) -> Arc<dyn LimitsApi>;
    fn subscriptions(&self, auth: &ApiAuth) -> Arc<dyn SubscriptionApi>;
}

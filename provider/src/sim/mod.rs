// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! In-memory cloud provider used by orchestrator tests
//!
//! Resources advance one lifecycle step on every read: a read of a
//! PROVISIONING instance observes STARTING, the next read RUNNING, and so
//! on.  Stable states never advance.  This gives poll loops something real
//! to chew on without any timers in the simulation itself.

mod state;

pub use state::SimCloud;
pub use state::SimInstance;

use crate::auth::ApiAuth;
use crate::error::ProviderError;
use crate::interfaces::BlockStorageApi;
use crate::interfaces::CloudProvider;
use crate::interfaces::ComputeApi;
use crate::interfaces::IdentityApi;
use crate::interfaces::LimitsApi;
use crate::interfaces::NetworkApi;
use crate::interfaces::ObjectStorageApi;
use crate::interfaces::SubscriptionApi;
use crate::interfaces::UsageApi;
use crate::interfaces::UsageQuery;
use async_trait::async_trait;
use console_common::model::AvailabilityDomain;
use console_common::model::ConsoleConnection;
use console_common::model::Instance;
use console_common::model::InstanceAction;
use console_common::model::InstanceState;
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
use std::sync::Arc;

/// Page size for paginated sim listings.
pub(crate) const SIM_PAGE_SIZE: usize = 3;

impl CloudProvider for SimCloud {
    fn compute(&self, _auth: &ApiAuth) -> Arc<dyn ComputeApi> {
        Arc::new(self.clone())
    }
    fn network(&self, _auth: &ApiAuth) -> Arc<dyn NetworkApi> {
        Arc::new(self.clone())
    }
    fn block_storage(&self, _auth: &ApiAuth) -> Arc<dyn BlockStorageApi> {
        Arc::new(self.clone())
    }
    fn identity(&self, _auth: &ApiAuth) -> Arc<dyn IdentityApi> {
        Arc::new(self.clone())
    }
    fn object_storage(&self, _auth: &ApiAuth) -> Arc<dyn ObjectStorageApi> {
        Arc::new(self.clone())
    }
    fn usage(&self, _auth: &ApiAuth) -> Arc<dyn UsageApi> {
        Arc::new(self.clone())
    }
    fn limits(&self, _auth: &ApiAuth) -> Arc<dyn LimitsApi> {
        Arc::new(self.clone())
    }
    fn subscriptions(&self, _auth: &ApiAuth) -> Arc<dyn SubscriptionApi> {
        Arc::new(self.clone())
    }
}

#[async_trait]
impl ComputeApi for SimCloud {
    async fn list_instances(
        &self,
        _compartment_id: &str,
        page: Option<&str>,
    ) -> Result<Page<Instance>, ProviderError> {
        let mut inner = self.lock();
        let start = parse_page(page)?;
        let ids: Vec<String> = inner
            .instances
            .keys()
            .skip(start)
            .take(SIM_PAGE_SIZE)
            .cloned()
            .collect();
        let items = ids
            .iter()
            .map(|id| inner.step_instance(id))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| ProviderError::not_found("instance vanished"))?;
        let next_page = if inner.instances.len() > start + SIM_PAGE_SIZE {
            Some((start + SIM_PAGE_SIZE).to_string())
        } else {
            None
        };
        Ok(Page { items, next_page })
    }

    async fn get_instance(
        &self,
        instance_id: &str,
    ) -> Result<Instance, ProviderError> {
        self.lock()
            .step_instance(instance_id)
            .ok_or_else(|| ProviderError::not_found(instance_id))
    }

    async fn launch_instance(
        &self,
        compartment_id: &str,
        spec: &LaunchInstanceSpec,
    ) -> Result<Instance, ProviderError> {
        Ok(self.lock().launch(compartment_id, spec))
    }

    async fn instance_action(
        &self,
        instance_id: &str,
        action: InstanceAction,
    ) -> Result<Instance, ProviderError> {
        let mut inner = self.lock();
        let instance = inner
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| ProviderError::not_found(instance_id))?;
        let next = match (action, instance.lifecycle_state) {
            (InstanceAction::Start, InstanceState::Stopped) => {
                InstanceState::Starting
            }
            (InstanceAction::Stop, InstanceState::Running) => {
                InstanceState::Stopping
            }
            (InstanceAction::Reset, InstanceState::Running) => {
                InstanceState::Starting
            }
            (InstanceAction::Terminate, s) if !s.is_terminated() => {
                InstanceState::Terminating
            }
            (_, s) => {
                return Err(ProviderError::incorrect_state(&format!(
                    "cannot {} instance in state {}",
                    action, s
                )));
            }
        };
        instance.lifecycle_state = next;
        Ok(instance.clone())
    }

    async fn terminate_instance(
        &self,
        instance_id: &str,
        preserve_boot_volume: bool,
    ) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        inner.last_preserve_boot_volume = Some(preserve_boot_volume);
        let instance = inner
            .instances
            .get_mut(instance_id)
            .ok_or_else(|| ProviderError::not_found(instance_id))?;
        instance.lifecycle_state = InstanceState::Terminating;
        Ok(())
    }

    async fn list_vnic_attachments(
        &self,
        _compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VnicAttachment>, ProviderError> {
        let mut inner = self.lock();
        let ids: Vec<String> = inner
            .vnic_attachments
            .values()
            .filter(|a| a.instance_id == instance_id)
            .map(|a| a.id.clone())
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| inner.step_vnic_attachment(id))
            .collect())
    }

    async fn get_vnic_attachment(
        &self,
        attachment_id: &str,
    ) -> Result<VnicAttachment, ProviderError> {
        self.lock()
            .step_vnic_attachment(attachment_id)
            .ok_or_else(|| ProviderError::not_found(attachment_id))
    }

    async fn attach_vnic(
        &self,
        instance_id: &str,
        subnet_id: &str,
        display_name: Option<&str>,
        assign_public_ip: bool,
    ) -> Result<VnicAttachment, ProviderError> {
        let mut inner = self.lock();
        if !inner.instances.contains_key(instance_id) {
            return Err(ProviderError::not_found(instance_id));
        }
        Ok(inner.attach_vnic(
            instance_id,
            subnet_id,
            display_name,
            assign_public_ip,
        ))
    }

    async fn detach_vnic(
        &self,
        attachment_id: &str,
    ) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        let attachment = inner
            .vnic_attachments
            .get_mut(attachment_id)
            .ok_or_else(|| ProviderError::not_found(attachment_id))?;
        attachment.lifecycle_state =
            console_common::model::AttachmentState::Detaching;
        Ok(())
    }

    async fn list_volume_attachments(
        &self,
        _compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VolumeAttachment>, ProviderError> {
        let mut inner = self.lock();
        let ids: Vec<String> = inner
            .volume_attachments
            .values()
            .filter(|a| a.instance_id == instance_id && !a.volume.is_boot())
            .map(|a| a.handle.id().to_owned())
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| inner.step_volume_attachment(id))
            .collect())
    }

    async fn list_boot_volume_attachments(
        &self,
        _availability_domain: &str,
        _compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<VolumeAttachment>, ProviderError> {
        let mut inner = self.lock();
        let ids: Vec<String> = inner
            .volume_attachments
            .values()
            .filter(|a| a.instance_id == instance_id && a.volume.is_boot())
            .map(|a| a.handle.id().to_owned())
            .collect();
        Ok(ids
            .iter()
            .filter_map(|id| inner.step_volume_attachment(id))
            .collect())
    }

    async fn get_volume_attachment(
        &self,
        attachment_id: &str,
    ) -> Result<VolumeAttachment, ProviderError> {
        self.lock()
            .step_volume_attachment(attachment_id)
            .ok_or_else(|| ProviderError::not_found(attachment_id))
    }

    async fn get_boot_volume_attachment(
        &self,
        attachment_id: &str,
    ) -> Result<VolumeAttachment, ProviderError> {
        self.lock()
            .step_volume_attachment(attachment_id)
            .ok_or_else(|| ProviderError::not_found(attachment_id))
    }

    async fn attach_block_volume(
        &self,
        instance_id: &str,
        volume_id: &str,
    ) -> Result<VolumeAttachment, ProviderError> {
        self.lock().attach_volume(
            instance_id,
            &VolumeHandle::Block(volume_id.to_owned()),
        )
    }

    async fn attach_boot_volume(
        &self,
        instance_id: &str,
        boot_volume_id: &str,
    ) -> Result<VolumeAttachment, ProviderError> {
        self.lock().attach_volume(
            instance_id,
            &VolumeHandle::Boot(boot_volume_id.to_owned()),
        )
    }

    async fn detach_block_volume(
        &self,
        attachment_id: &str,
    ) -> Result<(), ProviderError> {
        self.lock().detach_volume(attachment_id)
    }

    async fn detach_boot_volume(
        &self,
        attachment_id: &str,
    ) -> Result<(), ProviderError> {
        self.lock().detach_volume(attachment_id)
    }

    async fn create_console_connection(
        &self,
        instance_id: &str,
        public_key: &str,
    ) -> Result<ConsoleConnection, ProviderError> {
        let mut inner = self.lock();
        if !inner.instances.contains_key(instance_id) {
            return Err(ProviderError::not_found(instance_id));
        }
        let _ = public_key;
        let id = inner.next_id("instanceconsoleconnection");
        let conn = ConsoleConnection {
            id: id.clone(),
            instance_id: instance_id.to_owned(),
            lifecycle_state: String::from("ACTIVE"),
            connection_string: Some(format!("ssh -o ProxyCommand='...' {}", id)),
        };
        inner.console_connections.insert(id, conn.clone());
        Ok(conn)
    }

    async fn list_console_connections(
        &self,
        _compartment_id: &str,
        instance_id: &str,
    ) -> Result<Vec<ConsoleConnection>, ProviderError> {
        Ok(self
            .lock()
            .console_connections
            .values()
            .filter(|c| c.instance_id == instance_id)
            .cloned()
            .collect())
    }

    async fn delete_console_connection(
        &self,
        connection_id: &str,
    ) -> Result<(), ProviderError> {
        self.lock()
            .console_connections
            .remove(connection_id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::not_found(connection_id))
    }
}

#[async_trait]
impl NetworkApi for SimCloud {
    async fn get_vnic(&self, vnic_id: &str) -> Result<Vnic, ProviderError> {
        self.lock()
            .vnics
            .get(vnic_id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(vnic_id))
    }

    async fn list_private_ips(
        &self,
        vnic_id: &str,
    ) -> Result<Vec<PrivateIp>, ProviderError> {
        Ok(self
            .lock()
            .private_ips
            .values()
            .filter(|ip| ip.vnic_id == vnic_id)
            .cloned()
            .collect())
    }

    async fn get_public_ip(
        &self,
        public_ip_id: &str,
    ) -> Result<PublicIp, ProviderError> {
        self.lock()
            .step_public_ip(public_ip_id)
            .ok_or_else(|| ProviderError::not_found(public_ip_id))
    }

    async fn get_public_ip_by_address(
        &self,
        _compartment_id: &str,
        ip_address: &str,
    ) -> Result<PublicIp, ProviderError> {
        self.lock()
            .public_ips
            .values()
            .find(|ip| ip.ip_address == ip_address)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(ip_address))
    }

    async fn create_public_ip(
        &self,
        _compartment_id: &str,
        private_ip_id: &str,
    ) -> Result<PublicIp, ProviderError> {
        self.lock().create_public_ip(private_ip_id)
    }

    async fn delete_public_ip(
        &self,
        public_ip_id: &str,
    ) -> Result<(), ProviderError> {
        self.lock().delete_public_ip(public_ip_id)
    }

    async fn list_vcns(
        &self,
        _compartment_id: &str,
    ) -> Result<Vec<Vcn>, ProviderError> {
        Ok(self.lock().vcns.values().cloned().collect())
    }

    async fn create_vcn(
        &self,
        _compartment_id: &str,
        display_name: &str,
        cidr_block: &str,
        dns_label: Option<&str>,
    ) -> Result<Vcn, ProviderError> {
        let mut inner = self.lock();
        let id = inner.next_id("vcn");
        let vcn = Vcn {
            id: id.clone(),
            display_name: display_name.to_owned(),
            cidr_block: cidr_block.to_owned(),
            dns_label: dns_label.map(str::to_owned),
        };
        inner.vcns.insert(id, vcn.clone());
        Ok(vcn)
    }

    async fn delete_vcn(&self, vcn_id: &str) -> Result<(), ProviderError> {
        let mut inner = self.lock();
        if inner.subnets.values().any(|s| s.vcn_id == vcn_id) {
            return Err(ProviderError::conflict("VCN still has subnets"));
        }
        inner
            .vcns
            .remove(vcn_id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::not_found(vcn_id))
    }

    async fn list_subnets(
        &self,
        _compartment_id: &str,
        vcn_id: &str,
    ) -> Result<Vec<Subnet>, ProviderError> {
        Ok(self
            .lock()
            .subnets
            .values()
            .filter(|s| s.vcn_id == vcn_id)
            .cloned()
            .collect())
    }

    async fn create_subnet(
        &self,
        _compartment_id: &str,
        vcn_id: &str,
        display_name: &str,
        cidr_block: &str,
    ) -> Result<Subnet, ProviderError> {
        let mut inner = self.lock();
        if !inner.vcns.contains_key(vcn_id) {
            return Err(ProviderError::not_found(vcn_id));
        }
        let id = inner.next_id("subnet");
        let subnet = Subnet {
            id: id.clone(),
            vcn_id: vcn_id.to_owned(),
            display_name: display_name.to_owned(),
            cidr_block: cidr_block.to_owned(),
            availability_domain: None,
        };
        inner.subnets.insert(id, subnet.clone());
        Ok(subnet)
    }

    async fn delete_subnet(
        &self,
        subnet_id: &str,
    ) -> Result<(), ProviderError> {
        self.lock()
            .subnets
            .remove(subnet_id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::not_found(subnet_id))
    }

    async fn list_security_lists(
        &self,
        _compartment_id: &str,
        vcn_id: &str,
    ) -> Result<Vec<SecurityList>, ProviderError> {
        Ok(self
            .lock()
            .security_lists
            .values()
            .filter(|l| l.vcn_id == vcn_id)
            .cloned()
            .collect())
    }

    async fn get_security_list(
        &self,
        security_list_id: &str,
    ) -> Result<SecurityList, ProviderError> {
        self.lock()
            .security_lists
            .get(security_list_id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(security_list_id))
    }

    async fn create_security_list(
        &self,
        _compartment_id: &str,
        vcn_id: &str,
        display_name: &str,
        ingress_rules: &[SecurityRule],
        egress_rules: &[SecurityRule],
    ) -> Result<SecurityList, ProviderError> {
        let mut inner = self.lock();
        if !inner.vcns.contains_key(vcn_id) {
            return Err(ProviderError::not_found(vcn_id));
        }
        let id = inner.next_id("securitylist");
        let list = SecurityList {
            id: id.clone(),
            vcn_id: vcn_id.to_owned(),
            display_name: display_name.to_owned(),
            ingress_rules: ingress_rules.to_vec(),
            egress_rules: egress_rules.to_vec(),
        };
        inner.security_lists.insert(id, list.clone());
        Ok(list)
    }

    async fn delete_security_list(
        &self,
        security_list_id: &str,
    ) -> Result<(), ProviderError> {
        self.lock()
            .security_lists
            .remove(security_list_id)
            .map(|_| ())
            .ok_or_else(|| ProviderError::not_found(security_list_id))
    }

    async fn update_security_list(
        &self,
        security_list_id: &str,
        ingress_rules: &[SecurityRule],
        egress_rules: &[SecurityRule],
    ) -> Result<SecurityList, ProviderError> {
        let mut inner = self.lock();
        let list = inner
            .security_lists
            .get_mut(security_list_id)
            .ok_or_else(|| ProviderError::not_found(security_list_id))?;
        list.ingress_rules = ingress_rules.to_vec();
        list.egress_rules = egress_rules.to_vec();
        Ok(list.clone())
    }

    async fn list_route_tables(
        &self,
        _compartment_id: &str,
        vcn_id: &str,
    ) -> Result<Vec<RouteTable>, ProviderError> {
        Ok(self
            .lock()
            .route_tables
            .values()
            .filter(|t| t.vcn_id == vcn_id)
            .cloned()
            .collect())
    }

    async fn get_route_table(
        &self,
        route_table_id: &str,
    ) -> Result<RouteTable, ProviderError> {
        self.lock()
            .route_tables
            .get(route_table_id)
            .cloned()
            .ok_or_else(|| ProviderError::not_found(route_table_id))
    }

    async fn update_route_table(
        &self,
        route_table_id: &str,
        route_rules: &[RouteRule],
    ) -> Result<RouteTable, ProviderError> {
        let mut inner = self.lock();
        let table = inner
            .route_tables
            .get_mut(route_table_id)
            .ok_or_else(|| ProviderError::not_found(route_table_id))?;
        table.route_rules = route_rules.to_vec();
        Ok(table.clone())
    }
}

#[async_trait]
impl BlockStorageApi for SimCloud {
    async fn get_volume(
        &self,
        handle: &VolumeHandle,
    ) -> Result<Volume, ProviderError> {
        self.lock()
            .volumes
            .get(handle.id())
            .cloned()
            .ok_or_else(|| ProviderError::not_found(handle.id()))
    }

    async fn update_volume(
        &self,
        handle: &VolumeHandle,
        size_in_gbs: u64,
        vpus_per_gb: Option<u64>,
    ) -> Result<Volume, ProviderError> {
        let mut inner = self.lock();
        if inner.busy_volumes.contains(handle.id()) {
            return Err(ProviderError::incorrect_state(
                "volume has a pending operation",
            ));
        }
        let volume = inner
            .volumes
            .get_mut(handle.id())
            .ok_or_else(|| ProviderError::not_found(handle.id()))?;
        if size_in_gbs < volume.size_in_gbs {
            return Err(ProviderError::new(
                400,
                "InvalidParameter",
                "volume size cannot be reduced",
            ));
        }
        volume.size_in_gbs = size_in_gbs;
        if let Some(vpus) = vpus_per_gb {
            volume.vpus_per_gb = vpus;
        }
        Ok(volume.clone())
    }

    async fn list_block_volumes(
        &self,
        _compartment_id: &str,
    ) -> Result<Vec<Volume>, ProviderError> {
        Ok(self
            .lock()
            .volumes
            .values()
            .filter(|v| !v.handle.is_boot())
            .cloned()
            .collect())
    }

    async fn list_boot_volumes(
        &self,
        _availability_domain: &str,
        _compartment_id: &str,
    ) -> Result<Vec<Volume>, ProviderError> {
        Ok(self
            .lock()
            .volumes
            .values()
            .filter(|v| v.handle.is_boot())
            .cloned()
            .collect())
    }
}

#[async_trait]
impl IdentityApi for SimCloud {
    async fn list_availability_domains(
        &self,
        _compartment_id: &str,
    ) -> Result<Vec<AvailabilityDomain>, ProviderError> {
        Ok(self.lock().availability_domains.clone())
    }
}

#[async_trait]
impl ObjectStorageApi for SimCloud {
    async fn get_namespace(&self) -> Result<String, ProviderError> {
        Ok(String::from("simnamespace"))
    }
}

#[async_trait]
impl UsageApi for SimCloud {
    async fn request_summarized_usage(
        &self,
        query: &UsageQuery,
    ) -> Result<Page<UsageLineItem>, ProviderError> {
        let inner = self.lock();
        let index = match &query.page {
            None => 0,
            Some(token) => token.parse::<usize>().map_err(|_| {
                ProviderError::new(400, "InvalidParameter", "bad page token")
            })?,
        };
        let items = inner
            .usage_pages
            .get(index)
            .cloned()
            .unwrap_or_default();
        let next_page = if index + 1 < inner.usage_pages.len() {
            Some((index + 1).to_string())
        } else {
            None
        };
        Ok(Page { items, next_page })
    }
}

#[async_trait]
impl LimitsApi for SimCloud {
    async fn list_services(
        &self,
        _compartment_id: &str,
    ) -> Result<Vec<ServiceSummary>, ProviderError> {
        Ok(self.lock().services.clone())
    }

    async fn list_limit_values(
        &self,
        _compartment_id: &str,
        service_name: &str,
        page: Option<&str>,
    ) -> Result<Page<LimitValue>, ProviderError> {
        let inner = self.lock();
        let all = inner
            .limits
            .get(service_name)
            .cloned()
            .unwrap_or_default();
        let start = parse_page(page)?;
        let items: Vec<LimitValue> =
            all.iter().skip(start).take(SIM_PAGE_SIZE).cloned().collect();
        let next_page = if all.len() > start + SIM_PAGE_SIZE {
            Some((start + SIM_PAGE_SIZE).to_string())
        } else {
            None
        };
        Ok(Page { items, next_page })
    }

    async fn get_resource_availability(
        &self,
        _compartment_id: &str,
        service_name: &str,
        limit_name: &str,
        _availability_domain: Option<&str>,
    ) -> Result<ResourceAvailability, ProviderError> {
        self.lock()
            .availability
            .get(&(service_name.to_owned(), limit_name.to_owned()))
            .cloned()
            .ok_or_else(|| {
                ProviderError::not_found(&format!(
                    "{}/{}",
                    service_name, limit_name
                ))
            })
    }
}

#[async_trait]
impl SubscriptionApi for SimCloud {
    async fn list_subscriptions(
        &self,
        _tenancy_id: &str,
    ) -> Result<Vec<Subscription>, ProviderError> {
        Ok(self.lock().subscriptions.clone())
    }
}

fn parse_page(page: Option<&str>) -> Result<usize, ProviderError> {
    match page {
        None => Ok(0),
        Some(token) => token.parse::<usize>().map_err(|_| {
            ProviderError::new(400, "InvalidParameter", "bad page token")
        }),
    }
}

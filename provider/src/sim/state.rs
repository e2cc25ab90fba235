// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared mutable state behind the simulated provider

use crate::error::ProviderError;
use chrono::Utc;
use console_common::model::AttachmentState;
use console_common::model::AvailabilityDomain;
use console_common::model::ConsoleConnection;
use console_common::model::Instance;
use console_common::model::InstanceState;
use console_common::model::IpState;
use console_common::model::LaunchInstanceSpec;
use console_common::model::LimitValue;
use console_common::model::PrivateIp;
use console_common::model::PublicIp;
use console_common::model::ResourceAvailability;
use console_common::model::RouteRule;
use console_common::model::RouteTable;
use console_common::model::SecurityList;
use console_common::model::SecurityRule;
use console_common::model::ServiceSummary;
use console_common::model::ShapeConfig;
use console_common::model::Subnet;
use console_common::model::Subscription;
use console_common::model::UsageLineItem;
use console_common::model::Vcn;
use console_common::model::Vnic;
use console_common::model::VnicAttachment;
use console_common::model::Volume;
use console_common::model::VolumeAttachment;
use console_common::model::VolumeAttachmentHandle;
use console_common::model::VolumeHandle;
use console_common::model::VolumeState;
use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;

/// A seeded instance together with its primary network identities
#[derive(Clone, Debug)]
pub struct SimInstance {
    pub instance: Instance,
    pub vnic: Vnic,
    pub vnic_attachment_id: String,
    pub private_ip_id: String,
    pub public_ip: PublicIp,
}

#[derive(Default)]
pub(crate) struct SimState {
    counter: u64,
    pub(crate) instances: BTreeMap<String, Instance>,
    pub(crate) vnics: BTreeMap<String, Vnic>,
    pub(crate) vnic_attachments: BTreeMap<String, VnicAttachment>,
    pub(crate) private_ips: BTreeMap<String, PrivateIp>,
    pub(crate) public_ips: BTreeMap<String, PublicIp>,
    pub(crate) volumes: BTreeMap<String, Volume>,
    pub(crate) volume_attachments: BTreeMap<String, VolumeAttachment>,
    pub(crate) vcns: BTreeMap<String, Vcn>,
    pub(crate) subnets: BTreeMap<String, Subnet>,
    pub(crate) security_lists: BTreeMap<String, SecurityList>,
    pub(crate) route_tables: BTreeMap<String, RouteTable>,
    pub(crate) console_connections: BTreeMap<String, ConsoleConnection>,
    pub(crate) availability_domains: Vec<AvailabilityDomain>,
    pub(crate) usage_pages: Vec<Vec<UsageLineItem>>,
    pub(crate) services: Vec<ServiceSummary>,
    pub(crate) limits: BTreeMap<String, Vec<LimitValue>>,
    pub(crate) availability: BTreeMap<(String, String), ResourceAvailability>,
    pub(crate) subscriptions: Vec<Subscription>,
    pub(crate) busy_volumes: BTreeSet<String>,
    pub(crate) last_preserve_boot_volume: Option<bool>,
}

/// In-memory provider; clones share state
#[derive(Clone)]
pub struct SimCloud {
    state: Arc<Mutex<SimState>>,
}

impl Default for SimCloud {
    fn default() -> Self {
        SimCloud::new()
    }
}

impl SimCloud {
    pub fn new() -> SimCloud {
        let mut state = SimState::default();
        state.availability_domains =
            vec![AvailabilityDomain { name: String::from("sim-AD-1") }];
        SimCloud { state: Arc::new(Mutex::new(state)) }
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    /// Seeds an instance in `state` with a primary VNIC, private IP, and
    /// an assigned ephemeral public IP.
    pub fn seed_instance(
        &self,
        display_name: &str,
        state: InstanceState,
    ) -> SimInstance {
        let mut inner = self.lock();
        let instance_id = inner.next_id("instance");
        let instance = Instance {
            id: instance_id.clone(),
            display_name: display_name.to_owned(),
            compartment_id: String::from("ocid1.compartment.oc1..sim"),
            availability_domain: String::from("sim-AD-1"),
            shape: String::from("VM.Standard.E4.Flex"),
            lifecycle_state: state,
            time_created: Utc::now(),
            shape_config: Some(ShapeConfig { ocpus: 2.0, memory_in_gbs: 16.0 }),
            image_id: Some(String::from("ocid1.image.oc1..sim")),
        };
        inner.instances.insert(instance_id.clone(), instance.clone());

        let subnet_id = String::from("ocid1.subnet.oc1..simseed");
        let attachment = inner.attach_vnic(
            &instance_id,
            &subnet_id,
            Some(display_name),
            true,
        );
        // Seeded network plumbing starts settled, not mid-provisioning.
        let attachment_id = attachment.id.clone();
        if let Some(a) = inner.vnic_attachments.get_mut(&attachment_id) {
            a.lifecycle_state = AttachmentState::Attached;
        }
        let vnic_id = attachment.vnic_id.clone().unwrap();
        let vnic = inner.vnics.get(&vnic_id).cloned().unwrap();
        let private_ip_id = inner
            .private_ips
            .values()
            .find(|ip| ip.vnic_id == vnic_id)
            .map(|ip| ip.id.clone())
            .unwrap();
        let public_ip = inner
            .public_ips
            .values()
            .find(|ip| ip.private_ip_id.as_deref() == Some(&private_ip_id))
            .cloned()
            .unwrap();
        SimInstance {
            instance,
            vnic,
            vnic_attachment_id: attachment_id,
            private_ip_id,
            public_ip,
        }
    }

    pub fn seed_volume(&self, boot: bool, name: &str, size_in_gbs: u64) -> Volume {
        let mut inner = self.lock();
        let id = if boot {
            inner.next_id("bootvolume")
        } else {
            inner.next_id("volume")
        };
        let volume = Volume {
            handle: VolumeHandle::from_wire(&id),
            display_name: name.to_owned(),
            size_in_gbs,
            vpus_per_gb: 10,
            lifecycle_state: VolumeState::Available,
            availability_domain: String::from("sim-AD-1"),
        };
        inner.volumes.insert(id, volume.clone());
        volume
    }

    /// Seeds a volume already attached to `instance_id`.
    pub fn seed_attached_volume(
        &self,
        instance_id: &str,
        boot: bool,
        name: &str,
        size_in_gbs: u64,
    ) -> (Volume, VolumeAttachment) {
        let volume = self.seed_volume(boot, name, size_in_gbs);
        let mut inner = self.lock();
        let attachment = inner
            .new_volume_attachment(instance_id, &volume.handle)
            .clone();
        let id = attachment.handle.id().to_owned();
        if let Some(a) = inner.volume_attachments.get_mut(&id) {
            a.lifecycle_state = AttachmentState::Attached;
        }
        let attached =
            inner.volume_attachments.get(&id).cloned().unwrap();
        (volume, attached)
    }

    pub fn seed_vcn(&self, name: &str, cidr: &str) -> Vcn {
        let mut inner = self.lock();
        let id = inner.next_id("vcn");
        let vcn = Vcn {
            id: id.clone(),
            display_name: name.to_owned(),
            cidr_block: cidr.to_owned(),
            dns_label: None,
        };
        inner.vcns.insert(id, vcn.clone());
        vcn
    }

    pub fn seed_subnet(&self, vcn_id: &str, name: &str, cidr: &str) -> Subnet {
        let mut inner = self.lock();
        let id = inner.next_id("subnet");
        let subnet = Subnet {
            id: id.clone(),
            vcn_id: vcn_id.to_owned(),
            display_name: name.to_owned(),
            cidr_block: cidr.to_owned(),
            availability_domain: None,
        };
        inner.subnets.insert(id, subnet.clone());
        subnet
    }

    pub fn seed_security_list(
        &self,
        vcn_id: &str,
        name: &str,
        ingress_rules: Vec<SecurityRule>,
        egress_rules: Vec<SecurityRule>,
    ) -> SecurityList {
        let mut inner = self.lock();
        let id = inner.next_id("securitylist");
        let list = SecurityList {
            id: id.clone(),
            vcn_id: vcn_id.to_owned(),
            display_name: name.to_owned(),
            ingress_rules,
            egress_rules,
        };
        inner.security_lists.insert(id, list.clone());
        list
    }

    pub fn seed_route_table(
        &self,
        vcn_id: &str,
        name: &str,
        route_rules: Vec<RouteRule>,
    ) -> RouteTable {
        let mut inner = self.lock();
        let id = inner.next_id("routetable");
        let table = RouteTable {
            id: id.clone(),
            vcn_id: vcn_id.to_owned(),
            display_name: name.to_owned(),
            route_rules,
        };
        inner.route_tables.insert(id, table.clone());
        table
    }

    pub fn seed_usage_page(&self, items: Vec<UsageLineItem>) {
        self.lock().usage_pages.push(items);
    }

    pub fn seed_service(&self, name: &str, description: &str) {
        self.lock().services.push(ServiceSummary {
            name: name.to_owned(),
            description: description.to_owned(),
        });
    }

    pub fn seed_limit(&self, service_name: &str, limit: LimitValue) {
        self.lock()
            .limits
            .entry(service_name.to_owned())
            .or_default()
            .push(limit);
    }

    pub fn seed_availability(
        &self,
        service_name: &str,
        limit_name: &str,
        used: u64,
        available: u64,
    ) {
        self.lock().availability.insert(
            (service_name.to_owned(), limit_name.to_owned()),
            ResourceAvailability { used, available },
        );
    }

    pub fn seed_subscription(&self, subscription: Subscription) {
        self.lock().subscriptions.push(subscription);
    }

    /// Marks a volume so that updates fail with 409 IncorrectState.
    pub fn set_volume_busy(&self, volume_id: &str) {
        self.lock().busy_volumes.insert(volume_id.to_owned());
    }

    /// The `preserve_boot_volume` flag of the most recent terminate call.
    pub fn last_preserve_boot_volume(&self) -> Option<bool> {
        self.lock().last_preserve_boot_volume
    }
}

impl SimState {
    pub(crate) fn next_id(&mut self, prefix: &str) -> String {
        self.counter += 1;
        format!("ocid1.{}.oc1..sim{:04}", prefix, self.counter)
    }

    fn next_ip(&mut self) -> String {
        self.counter += 1;
        format!("203.0.113.{}", self.counter % 250 + 1)
    }

    /// Advances an instance one lifecycle step and returns the new state.
    pub(crate) fn step_instance(&mut self, id: &str) -> Option<Instance> {
        let instance = self.instances.get_mut(id)?;
        instance.lifecycle_state = match instance.lifecycle_state {
            InstanceState::Provisioning => InstanceState::Starting,
            InstanceState::Starting => InstanceState::Running,
            InstanceState::Stopping => InstanceState::Stopped,
            InstanceState::Terminating => InstanceState::Terminated,
            stable => stable,
        };
        Some(instance.clone())
    }

    pub(crate) fn step_vnic_attachment(
        &mut self,
        id: &str,
    ) -> Option<VnicAttachment> {
        let attachment = self.vnic_attachments.get_mut(id)?;
        attachment.lifecycle_state = match attachment.lifecycle_state {
            AttachmentState::Attaching => AttachmentState::Attached,
            AttachmentState::Detaching => AttachmentState::Detached,
            stable => stable,
        };
        Some(attachment.clone())
    }

    pub(crate) fn step_volume_attachment(
        &mut self,
        id: &str,
    ) -> Option<VolumeAttachment> {
        let attachment = self.volume_attachments.get_mut(id)?;
        attachment.lifecycle_state = match attachment.lifecycle_state {
            AttachmentState::Attaching => AttachmentState::Attached,
            AttachmentState::Detaching => AttachmentState::Detached,
            stable => stable,
        };
        Some(attachment.clone())
    }

    pub(crate) fn step_public_ip(&mut self, id: &str) -> Option<PublicIp> {
        let ip = self.public_ips.get_mut(id)?;
        ip.lifecycle_state = match ip.lifecycle_state {
            IpState::Provisioning => IpState::Available,
            IpState::Terminating => IpState::Terminated,
            stable => stable,
        };
        Some(ip.clone())
    }

    pub(crate) fn launch(
        &mut self,
        compartment_id: &str,
        spec: &LaunchInstanceSpec,
    ) -> Instance {
        let id = self.next_id("instance");
        let shape_config = match (spec.ocpus, spec.memory_in_gbs) {
            (Some(ocpus), Some(memory_in_gbs)) => {
                Some(ShapeConfig { ocpus, memory_in_gbs })
            }
            _ => None,
        };
        let instance = Instance {
            id: id.clone(),
            display_name: spec.display_name.clone(),
            compartment_id: compartment_id.to_owned(),
            availability_domain: spec.availability_domain.clone(),
            shape: spec.shape.clone(),
            lifecycle_state: InstanceState::Provisioning,
            time_created: Utc::now(),
            shape_config,
            image_id: Some(spec.image_id.clone()),
        };
        self.instances.insert(id.clone(), instance.clone());
        self.attach_vnic(
            &id,
            &spec.subnet_id,
            Some(&spec.display_name),
            spec.assign_public_ip,
        );
        instance
    }

    pub(crate) fn attach_vnic(
        &mut self,
        instance_id: &str,
        subnet_id: &str,
        display_name: Option<&str>,
        assign_public_ip: bool,
    ) -> VnicAttachment {
        let vnic_id = self.next_id("vnic");
        let private_ip_id = self.next_id("privateip");
        let attachment_id = self.next_id("vnicattachment");
        let private_address = format!("10.0.0.{}", self.counter % 250 + 1);

        let mut vnic = Vnic {
            id: vnic_id.clone(),
            display_name: display_name.map(str::to_owned),
            private_ip: private_address.clone(),
            public_ip: None,
            subnet_id: subnet_id.to_owned(),
            mac_address: format!("02:00:00:00:{:02x}:01", self.counter % 255),
            is_primary: !self
                .vnic_attachments
                .values()
                .any(|a| a.instance_id == instance_id),
        };
        self.private_ips.insert(
            private_ip_id.clone(),
            PrivateIp {
                id: private_ip_id.clone(),
                ip_address: private_address,
                vnic_id: vnic_id.clone(),
            },
        );
        if assign_public_ip {
            let public_ip_id = self.next_id("publicip");
            let address = self.next_ip();
            self.public_ips.insert(
                public_ip_id.clone(),
                PublicIp {
                    id: public_ip_id,
                    ip_address: address.clone(),
                    lifecycle_state: IpState::Assigned,
                    private_ip_id: Some(private_ip_id),
                },
            );
            vnic.public_ip = Some(address);
        }
        self.vnics.insert(vnic_id.clone(), vnic);

        let attachment = VnicAttachment {
            id: attachment_id.clone(),
            instance_id: instance_id.to_owned(),
            vnic_id: Some(vnic_id),
            lifecycle_state: AttachmentState::Attaching,
        };
        self.vnic_attachments.insert(attachment_id, attachment.clone());
        attachment
    }

    pub(crate) fn new_volume_attachment(
        &mut self,
        instance_id: &str,
        volume: &VolumeHandle,
    ) -> VolumeAttachment {
        let handle = if volume.is_boot() {
            VolumeAttachmentHandle::Boot(self.next_id("bootvolumeattachment"))
        } else {
            VolumeAttachmentHandle::Block(self.next_id("volumeattachment"))
        };
        let attachment = VolumeAttachment {
            handle: handle.clone(),
            volume: volume.clone(),
            instance_id: instance_id.to_owned(),
            lifecycle_state: AttachmentState::Attaching,
            time_created: Utc::now(),
        };
        self.volume_attachments
            .insert(handle.id().to_owned(), attachment.clone());
        attachment
    }

    pub(crate) fn attach_volume(
        &mut self,
        instance_id: &str,
        volume: &VolumeHandle,
    ) -> Result<VolumeAttachment, ProviderError> {
        if !self.instances.contains_key(instance_id) {
            return Err(ProviderError::not_found(instance_id));
        }
        if !self.volumes.contains_key(volume.id()) {
            return Err(ProviderError::not_found(volume.id()));
        }
        // Boot volumes attach to at most one instance.
        if volume.is_boot()
            && self.volume_attachments.values().any(|a| {
                a.volume == *volume
                    && a.lifecycle_state != AttachmentState::Detached
            })
        {
            return Err(ProviderError::conflict(
                "boot volume is already attached",
            ));
        }
        Ok(self.new_volume_attachment(instance_id, volume))
    }

    pub(crate) fn detach_volume(
        &mut self,
        attachment_id: &str,
    ) -> Result<(), ProviderError> {
        let attachment = self
            .volume_attachments
            .get_mut(attachment_id)
            .ok_or_else(|| ProviderError::not_found(attachment_id))?;
        if attachment.lifecycle_state == AttachmentState::Attached
            || attachment.lifecycle_state == AttachmentState::Attaching
        {
            attachment.lifecycle_state = AttachmentState::Detaching;
        }
        Ok(())
    }

    pub(crate) fn create_public_ip(
        &mut self,
        private_ip_id: &str,
    ) -> Result<PublicIp, ProviderError> {
        let vnic_id = self
            .private_ips
            .get(private_ip_id)
            .map(|ip| ip.vnic_id.clone())
            .ok_or_else(|| ProviderError::not_found(private_ip_id))?;
        let id = self.next_id("publicip");
        let address = self.next_ip();
        let ip = PublicIp {
            id: id.clone(),
            ip_address: address.clone(),
            lifecycle_state: IpState::Provisioning,
            private_ip_id: Some(private_ip_id.to_owned()),
        };
        self.public_ips.insert(id, ip.clone());
        if let Some(vnic) = self.vnics.get_mut(&vnic_id) {
            vnic.public_ip = Some(address);
        }
        Ok(ip)
    }

    pub(crate) fn delete_public_ip(
        &mut self,
        public_ip_id: &str,
    ) -> Result<(), ProviderError> {
        let ip = self
            .public_ips
            .get_mut(public_ip_id)
            .ok_or_else(|| ProviderError::not_found(public_ip_id))?;
        ip.lifecycle_state = IpState::Terminating;
        let private_ip_id = ip.private_ip_id.take();
        if let Some(private_ip_id) = private_ip_id {
            if let Some(vnic_id) = self
                .private_ips
                .get(&private_ip_id)
                .map(|p| p.vnic_id.clone())
            {
                if let Some(vnic) = self.vnics.get_mut(&vnic_id) {
                    vnic.public_ip = None;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::interfaces::ComputeApi;
    use crate::interfaces::NetworkApi;
    use console_common::model::InstanceAction;

    #[tokio::test]
    async fn test_instances_advance_on_read() {
        let sim = SimCloud::new();
        let seeded = sim.seed_instance("web-1", InstanceState::Provisioning);
        let id = seeded.instance.id;

        let observed = sim.get_instance(&id).await.unwrap();
        assert_eq!(observed.lifecycle_state, InstanceState::Starting);
        let observed = sim.get_instance(&id).await.unwrap();
        assert_eq!(observed.lifecycle_state, InstanceState::Running);
        // Running is stable.
        let observed = sim.get_instance(&id).await.unwrap();
        assert_eq!(observed.lifecycle_state, InstanceState::Running);
    }

    #[tokio::test]
    async fn test_action_rejects_incompatible_state() {
        let sim = SimCloud::new();
        let seeded = sim.seed_instance("web-1", InstanceState::Running);
        let err = sim
            .instance_action(&seeded.instance.id, InstanceAction::Start)
            .await
            .unwrap_err();
        assert!(err.is_incorrect_state());

        let accepted = sim
            .instance_action(&seeded.instance.id, InstanceAction::Stop)
            .await
            .unwrap();
        assert_eq!(accepted.lifecycle_state, InstanceState::Stopping);
    }

    #[tokio::test]
    async fn test_boot_volume_double_attach_conflicts() {
        let sim = SimCloud::new();
        let a = sim.seed_instance("a", InstanceState::Running);
        let b = sim.seed_instance("b", InstanceState::Stopped);
        let (volume, _) =
            sim.seed_attached_volume(&a.instance.id, true, "boot", 50);

        let err = sim
            .attach_boot_volume(&b.instance.id, volume.handle.id())
            .await
            .unwrap_err();
        assert!(err.is_conflict());
        assert!(!err.is_incorrect_state());
    }

    #[tokio::test]
    async fn test_public_ip_replacement_flow() {
        let sim = SimCloud::new();
        let seeded = sim.seed_instance("web-1", InstanceState::Running);

        sim.delete_public_ip(&seeded.public_ip.id).await.unwrap();
        // Terminating advances to Terminated on the first read.
        let ip = sim.get_public_ip(&seeded.public_ip.id).await.unwrap();
        assert_eq!(ip.lifecycle_state, IpState::Terminated);

        let vnic = sim.get_vnic(&seeded.vnic.id).await.unwrap();
        assert!(vnic.public_ip.is_none());

        let created = sim
            .create_public_ip("ocid1.compartment.oc1..sim", &seeded.private_ip_id)
            .await
            .unwrap();
        assert_eq!(created.lifecycle_state, IpState::Provisioning);
        assert_ne!(created.ip_address, seeded.public_ip.ip_address);
        let ip = sim.get_public_ip(&created.id).await.unwrap();
        assert_eq!(ip.lifecycle_state, IpState::Available);

        let vnic = sim.get_vnic(&seeded.vnic.id).await.unwrap();
        assert_eq!(vnic.public_ip.as_deref(), Some(created.ip_address.as_str()));
    }

    #[tokio::test]
    async fn test_busy_volume_update_is_incorrect_state() {
        let sim = SimCloud::new();
        let volume = sim.seed_volume(false, "data", 100);
        sim.set_volume_busy(volume.handle.id());
        let err = crate::interfaces::BlockStorageApi::update_volume(
            &sim,
            &volume.handle,
            200,
            None,
        )
        .await
        .unwrap_err();
        assert!(err.is_incorrect_state());
    }

    #[tokio::test]
    async fn test_terminate_records_preserve_flag() {
        let sim = SimCloud::new();
        let seeded = sim.seed_instance("web-1", InstanceState::Running);
        sim.terminate_instance(&seeded.instance.id, false).await.unwrap();
        assert_eq!(sim.last_preserve_boot_volume(), Some(false));
        let observed = sim.get_instance(&seeded.instance.id).await.unwrap();
        assert_eq!(observed.lifecycle_state, InstanceState::Terminated);
    }
}

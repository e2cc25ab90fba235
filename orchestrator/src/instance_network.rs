// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! VNIC attachment lifecycle and public IP replacement

use crate::OrchResult;
use console_common::model::AttachmentState;
use console_common::model::InstanceView;
use console_common::model::IpState;
use console_common::model::Vnic;
use console_common::model::VnicAttachment;
use console_common::model::VnicView;
use console_common::poll::poll_until;
use console_common::CreateResult;
use console_common::DeleteResult;
use console_common::Error;
use console_common::ListResultVec;
use console_common::ResourceType;
use console_common::UpdateResult;
use console_provider::ComputeApi;
use console_provider::NetworkApi;
use slog::info;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

impl super::Orchestrator {
    /// Lists the instance's VNICs through their attachments.  Attachments
    /// that are not ATTACHED, and VNICs that vanish between the two reads,
    /// are skipped rather than failing the listing.
    pub async fn list_vnics(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        instance_id: &str,
    ) -> ListResultVec<VnicView> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        let network = self.factory().network(&tenant, region).await?;
        let compartment = tenant.effective_compartment();

        let attachments = compute
            .list_vnic_attachments(compartment, instance_id)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::VnicAttachment, instance_id)
            })?;

        let mut views = Vec::new();
        for attachment in attachments {
            if attachment.lifecycle_state != AttachmentState::Attached {
                continue;
            }
            let Some(vnic_id) = &attachment.vnic_id else {
                continue;
            };
            match network.get_vnic(vnic_id).await {
                Ok(vnic) => views.push(vnic_view(vnic, &attachment)),
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    return Err(e.into_error(ResourceType::Vnic, vnic_id));
                }
            }
        }
        Ok(views)
    }

    pub async fn attach_vnic(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        instance_id: &str,
        subnet_id: &str,
        display_name: Option<&str>,
        assign_public_ip: bool,
        cancel: &CancellationToken,
    ) -> CreateResult<VnicView> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        let network = self.factory().network(&tenant, region).await?;

        let attachment = compute
            .attach_vnic(instance_id, subnet_id, display_name, assign_public_ip)
            .await
            .map_err(|e| e.into_error(ResourceType::Instance, instance_id))?;
        info!(
            self.log(), "attaching vnic";
            "instance" => instance_id,
            "attachment" => &attachment.id,
        );

        let attachment = self
            .await_vnic_attachment_state(
                &compute,
                &attachment.id,
                AttachmentState::Attached,
                cancel,
            )
            .await?;
        let vnic_id = attachment.vnic_id.clone().ok_or_else(|| {
            Error::internal_error("attached VNIC attachment has no VNIC id")
        })?;
        let vnic = network
            .get_vnic(&vnic_id)
            .await
            .map_err(|e| e.into_error(ResourceType::Vnic, &vnic_id))?;
        Ok(vnic_view(vnic, &attachment))
    }

    /// Detaches a VNIC and waits for the attachment to reach DETACHED or
    /// disappear.  Detaching something already gone is success.
    pub async fn detach_vnic(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        attachment_id: &str,
        cancel: &CancellationToken,
    ) -> DeleteResult {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;

        match compute.detach_vnic(attachment_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => {
                return Err(
                    e.into_error(ResourceType::VnicAttachment, attachment_id)
                );
            }
        }
        info!(self.log(), "detaching vnic"; "attachment" => attachment_id);

        let params = self.policy().instance_poll().succeed_on_not_found();
        let result = poll_until(
            &params,
            cancel,
            || {
                let compute = compute.clone();
                let id = attachment_id.to_owned();
                async move {
                    match compute.get_vnic_attachment(&id).await {
                        Ok(a) => Ok(Some(a.lifecycle_state)),
                        Err(e) if e.is_not_found() => Ok(None),
                        Err(e) => Err(e.into_error(
                            ResourceType::VnicAttachment,
                            &id,
                        )),
                    }
                }
            },
            |state| *state == AttachmentState::Detached,
        )
        .await?;
        if result.success {
            Ok(())
        } else {
            Err(result.into_unfinished_error("vnic detach"))
        }
    }

    /// Replaces the instance's ephemeral public IP with a fresh one.
    ///
    /// The sequence releases the current address, waits for the release to
    /// complete, pauses for the provider to settle, then allocates a new
    /// ephemeral address on the primary private IP.  Failures carry the
    /// step that failed so callers can tell a half-done replacement (old
    /// address gone, none yet assigned) from one that never started.
    pub async fn change_public_ip(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        instance_id: &str,
        cancel: &CancellationToken,
    ) -> UpdateResult<InstanceView> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        let network = self.factory().network(&tenant, region).await?;
        let compartment = tenant.effective_compartment();

        let (_, vnic) = self
            .primary_vnic(&compute, &network, compartment, instance_id)
            .await
            .map_err(|e| e.replacement_step("resolve primary vnic"))?
            .ok_or_else(|| {
                Error::invalid_request("instance has no attached VNIC")
                    .replacement_step("resolve primary vnic")
            })?;

        if let Some(address) = &vnic.public_ip {
            self.release_public_ip(&network, compartment, address, cancel)
                .await?;
            self.settle(self.policy().ip_release_settle, cancel)
                .await
                .map_err(|e| e.replacement_step("settle after release"))?;
        }

        let private_ips = network
            .list_private_ips(&vnic.id)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::PrivateIp, &vnic.id)
                    .replacement_step("list private ips")
            })?;
        let private_ip = private_ips.first().ok_or_else(|| {
            Error::internal_error("primary VNIC has no private IP")
                .replacement_step("list private ips")
        })?;

        let created = network
            .create_public_ip(compartment, &private_ip.id)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::PublicIp, &private_ip.id)
                    .replacement_step("allocate public ip")
            })?;
        info!(
            self.log(), "allocated replacement public ip";
            "instance" => instance_id,
            "address" => &created.ip_address,
        );

        let params = self.policy().network_poll();
        let result = poll_until(
            &params,
            cancel,
            || {
                let network = network.clone();
                let id = created.id.clone();
                async move {
                    match network.get_public_ip(&id).await {
                        Ok(ip) => Ok(Some(ip.lifecycle_state)),
                        Err(e) => {
                            Err(e.into_error(ResourceType::PublicIp, &id))
                        }
                    }
                }
            },
            |state| {
                matches!(*state, IpState::Available | IpState::Assigned)
            },
        )
        .await
        .map_err(|e| e.replacement_step("await public ip"))?;
        if !result.success {
            return Err(result
                .into_unfinished_error("public ip allocation")
                .replacement_step("await public ip"));
        }

        let instance = compute
            .get_instance(instance_id)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::Instance, instance_id)
                    .replacement_step("refresh instance")
            })?;
        Ok(self
            .instance_view(&compute, &network, compartment, instance)
            .await)
    }

    /// Releases an existing public IP and waits for it to terminate.  An
    /// address that is already gone at any point counts as released.
    async fn release_public_ip(
        &self,
        network: &Arc<dyn NetworkApi>,
        compartment: &str,
        address: &str,
        cancel: &CancellationToken,
    ) -> OrchResult<()> {
        let ip = match network
            .get_public_ip_by_address(compartment, address)
            .await
        {
            Ok(ip) => ip,
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => {
                return Err(e
                    .into_error(ResourceType::PublicIp, address)
                    .replacement_step("locate public ip"));
            }
        };
        if ip.lifecycle_state == IpState::Terminated {
            return Ok(());
        }

        match network.delete_public_ip(&ip.id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => {
                return Err(e
                    .into_error(ResourceType::PublicIp, &ip.id)
                    .replacement_step("release public ip"));
            }
        }
        info!(
            self.log(), "released public ip";
            "address" => address,
            "public_ip" => &ip.id,
        );

        let params = self.policy().network_poll().succeed_on_not_found();
        let result = poll_until(
            &params,
            cancel,
            || {
                let network = network.clone();
                let id = ip.id.clone();
                async move {
                    match network.get_public_ip(&id).await {
                        Ok(ip) => Ok(Some(ip.lifecycle_state)),
                        Err(e) if e.is_not_found() => Ok(None),
                        Err(e) => {
                            Err(e.into_error(ResourceType::PublicIp, &id))
                        }
                    }
                }
            },
            |state| *state == IpState::Terminated,
        )
        .await
        .map_err(|e| e.replacement_step("await public ip release"))?;
        if result.success {
            Ok(())
        } else {
            Err(result
                .into_unfinished_error("public ip release")
                .replacement_step("await public ip release"))
        }
    }

    /// Finds the instance's primary VNIC via its ATTACHED attachments.
    pub(crate) async fn primary_vnic(
        &self,
        compute: &Arc<dyn ComputeApi>,
        network: &Arc<dyn NetworkApi>,
        compartment: &str,
        instance_id: &str,
    ) -> OrchResult<Option<(VnicAttachment, Vnic)>> {
        let attachments = compute
            .list_vnic_attachments(compartment, instance_id)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::VnicAttachment, instance_id)
            })?;

        let mut fallback = None;
        for attachment in attachments {
            if attachment.lifecycle_state != AttachmentState::Attached {
                continue;
            }
            let Some(vnic_id) = &attachment.vnic_id else {
                continue;
            };
            let vnic = match network.get_vnic(vnic_id).await {
                Ok(vnic) => vnic,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    return Err(e.into_error(ResourceType::Vnic, vnic_id));
                }
            };
            if vnic.is_primary {
                return Ok(Some((attachment, vnic)));
            }
            if fallback.is_none() {
                fallback = Some((attachment, vnic));
            }
        }
        Ok(fallback)
    }

    async fn await_vnic_attachment_state(
        &self,
        compute: &Arc<dyn ComputeApi>,
        attachment_id: &str,
        target: AttachmentState,
        cancel: &CancellationToken,
    ) -> OrchResult<VnicAttachment> {
        let params = self.policy().instance_poll();
        let result = poll_until(
            &params,
            cancel,
            || {
                let compute = compute.clone();
                let id = attachment_id.to_owned();
                async move {
                    match compute.get_vnic_attachment(&id).await {
                        Ok(a) => Ok(Some(a.lifecycle_state)),
                        Err(e) if e.is_not_found() => Ok(None),
                        Err(e) => Err(e.into_error(
                            ResourceType::VnicAttachment,
                            &id,
                        )),
                    }
                }
            },
            |state| *state == target,
        )
        .await?;
        if !result.success {
            return Err(result.into_unfinished_error("vnic attach"));
        }
        compute.get_vnic_attachment(attachment_id).await.map_err(|e| {
            e.into_error(ResourceType::VnicAttachment, attachment_id)
        })
    }

    /// Cancel-aware settle pause.
    pub(crate) async fn settle(
        &self,
        duration: Duration,
        cancel: &CancellationToken,
    ) -> OrchResult<()> {
        tokio::select! {
            _ = cancel.cancelled() => {
                Err(Error::unavail("cancelled while waiting to settle"))
            }
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}

fn vnic_view(vnic: Vnic, attachment: &VnicAttachment) -> VnicView {
    VnicView {
        id: vnic.id,
        display_name: vnic.display_name,
        private_ip: vnic.private_ip,
        public_ip: vnic.public_ip,
        subnet_id: vnic.subnet_id,
        mac_address: vnic.mac_address,
        is_primary: vnic.is_primary,
        attachment_id: attachment.id.clone(),
        attachment_state: attachment.lifecycle_state,
    }
}

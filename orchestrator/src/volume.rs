// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Volume attachment lifecycle and resizing
//!
//! Boot and block volumes live in different provider namespaces but are
//! presented uniformly here; the [`VolumeHandle`] tag carries the
//! distinction so callers never re-derive it from identifier strings.

use console_common::model::AttachmentState;
use console_common::model::Volume;
use console_common::model::VolumeAttachment;
use console_common::model::VolumeAttachmentHandle;
use console_common::model::VolumeHandle;
use console_common::model::VolumeState;
use console_common::model::VolumeView;
use console_common::poll::poll_until;
use console_common::CreateResult;
use console_common::DeleteResult;
use console_common::Error;
use console_common::ListResultVec;
use console_common::ResourceType;
use console_common::UpdateResult;
use console_provider::ComputeApi;
use console_provider::ProviderError;
use slog::info;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn volume_resource(handle: &VolumeHandle) -> ResourceType {
    if handle.is_boot() {
        ResourceType::BootVolume
    } else {
        ResourceType::BlockVolume
    }
}

async fn get_attachment(
    compute: &Arc<dyn ComputeApi>,
    handle: &VolumeAttachmentHandle,
) -> Result<VolumeAttachment, ProviderError> {
    match handle {
        VolumeAttachmentHandle::Block(id) => {
            compute.get_volume_attachment(id).await
        }
        VolumeAttachmentHandle::Boot(id) => {
            compute.get_boot_volume_attachment(id).await
        }
    }
}

impl super::Orchestrator {
    /// Lists the volumes attached to an instance, boot and block combined.
    /// Volumes whose record has vanished since the attachment listing are
    /// skipped.
    pub async fn list_volumes(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        instance_id: &str,
    ) -> ListResultVec<VolumeView> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        let storage = self.factory().block_storage(&tenant, region).await?;
        let compartment = tenant.effective_compartment();

        let instance = compute
            .get_instance(instance_id)
            .await
            .map_err(|e| e.into_error(ResourceType::Instance, instance_id))?;

        let mut attachments = compute
            .list_volume_attachments(compartment, instance_id)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::VolumeAttachment, instance_id)
            })?;
        let boot = compute
            .list_boot_volume_attachments(
                &instance.availability_domain,
                compartment,
                instance_id,
            )
            .await
            .map_err(|e| {
                e.into_error(ResourceType::VolumeAttachment, instance_id)
            })?;
        attachments.extend(boot);

        let mut views = Vec::new();
        for attachment in attachments {
            if attachment.lifecycle_state == AttachmentState::Detached {
                continue;
            }
            let volume = match storage.get_volume(&attachment.volume).await {
                Ok(volume) => volume,
                Err(e) if e.is_not_found() => continue,
                Err(e) => {
                    return Err(e.into_error(
                        volume_resource(&attachment.volume),
                        attachment.volume.id(),
                    ));
                }
            };
            views.push(VolumeView {
                handle: volume.handle,
                display_name: volume.display_name,
                size_in_gbs: volume.size_in_gbs,
                vpus_per_gb: volume.vpus_per_gb,
                lifecycle_state: attachment.lifecycle_state,
                attachment: attachment.handle,
            });
        }
        Ok(views)
    }

    /// Lists the compartment's volumes, boot and block combined, that are
    /// in a state where they could be attached.
    pub async fn list_available_volumes(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        availability_domain: &str,
    ) -> ListResultVec<Volume> {
        let tenant = self.tenant(tenant_id).await?;
        let storage = self.factory().block_storage(&tenant, region).await?;
        let compartment = tenant.effective_compartment();

        let mut volumes = storage
            .list_block_volumes(compartment)
            .await
            .map_err(|e| e.into_error(ResourceType::BlockVolume, compartment))?;
        let boot = storage
            .list_boot_volumes(availability_domain, compartment)
            .await
            .map_err(|e| e.into_error(ResourceType::BootVolume, compartment))?;
        volumes.extend(boot);
        volumes.retain(|v| v.lifecycle_state == VolumeState::Available);
        Ok(volumes)
    }

    /// Attaches a volume and waits for the attachment to reach ATTACHED.
    ///
    /// A boot volume that is already attached to this instance yields the
    /// existing attachment instead of a conflict: the end state the caller
    /// asked for already holds.
    pub async fn attach_volume(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        instance_id: &str,
        volume: &VolumeHandle,
        cancel: &CancellationToken,
    ) -> CreateResult<VolumeAttachment> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        let compartment = tenant.effective_compartment();

        let attachment = match volume {
            VolumeHandle::Block(id) => {
                compute.attach_block_volume(instance_id, id).await
            }
            VolumeHandle::Boot(id) => {
                compute.attach_boot_volume(instance_id, id).await
            }
        };
        let attachment = match attachment {
            Ok(attachment) => attachment,
            Err(e) if volume.is_boot() && e.is_conflict() => {
                match self
                    .existing_boot_attachment(
                        &compute,
                        compartment,
                        instance_id,
                        volume,
                    )
                    .await?
                {
                    Some(existing) => existing,
                    None => {
                        return Err(e.into_error(
                            volume_resource(volume),
                            volume.id(),
                        ));
                    }
                }
            }
            Err(e) => {
                return Err(
                    e.into_error(volume_resource(volume), volume.id())
                );
            }
        };
        info!(
            self.log(), "attaching volume";
            "instance" => instance_id,
            "volume" => volume.id(),
            "attachment" => attachment.handle.id(),
        );

        let params = self.policy().instance_poll();
        let handle = attachment.handle.clone();
        let result = poll_until(
            &params,
            cancel,
            || {
                let compute = compute.clone();
                let handle = handle.clone();
                async move {
                    match get_attachment(&compute, &handle).await {
                        Ok(a) => Ok(Some(a.lifecycle_state)),
                        Err(e) if e.is_not_found() => Ok(None),
                        Err(e) => Err(e.into_error(
                            ResourceType::VolumeAttachment,
                            handle.id(),
                        )),
                    }
                }
            },
            |state| *state == AttachmentState::Attached,
        )
        .await?;
        if !result.success {
            return Err(result.into_unfinished_error("volume attach"));
        }
        get_attachment(&compute, &attachment.handle).await.map_err(|e| {
            e.into_error(ResourceType::VolumeAttachment, attachment.handle.id())
        })
    }

    /// Detaches a volume attachment and waits for DETACHED (or for the
    /// attachment record to disappear).  Already-gone attachments are
    /// success.
    pub async fn detach_volume(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        attachment: &VolumeAttachmentHandle,
        cancel: &CancellationToken,
    ) -> DeleteResult {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;

        let issued = match attachment {
            VolumeAttachmentHandle::Block(id) => {
                compute.detach_block_volume(id).await
            }
            VolumeAttachmentHandle::Boot(id) => {
                compute.detach_boot_volume(id).await
            }
        };
        match issued {
            Ok(()) => {}
            Err(e) if e.is_not_found() => return Ok(()),
            Err(e) => {
                return Err(e.into_error(
                    ResourceType::VolumeAttachment,
                    attachment.id(),
                ));
            }
        }
        info!(
            self.log(), "detaching volume";
            "attachment" => attachment.id(),
        );

        let params = self.policy().instance_poll().succeed_on_not_found();
        let result = poll_until(
            &params,
            cancel,
            || {
                let compute = compute.clone();
                let handle = attachment.clone();
                async move {
                    match get_attachment(&compute, &handle).await {
                        Ok(a) => Ok(Some(a.lifecycle_state)),
                        Err(e) if e.is_not_found() => Ok(None),
                        Err(e) => Err(e.into_error(
                            ResourceType::VolumeAttachment,
                            handle.id(),
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
            Err(result.into_unfinished_error("volume detach"))
        }
    }

    /// Resizes a volume.  Shrinking a boot volume is rejected here, before
    /// any provider call: the provider accepts some shrink requests and
    /// then corrupts the boot record.
    pub async fn update_volume(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        volume: &VolumeHandle,
        size_in_gbs: u64,
        vpus_per_gb: Option<u64>,
    ) -> UpdateResult<Volume> {
        let tenant = self.tenant(tenant_id).await?;
        let storage = self.factory().block_storage(&tenant, region).await?;

        let current = storage.get_volume(volume).await.map_err(|e| {
            e.into_error(volume_resource(volume), volume.id())
        })?;
        if volume.is_boot() && size_in_gbs < current.size_in_gbs {
            return Err(Error::invalid_request(&format!(
                "boot volume size cannot be reduced ({} GB requested, \
                 {} GB current)",
                size_in_gbs, current.size_in_gbs
            )));
        }

        info!(
            self.log(), "updating volume";
            "volume" => volume.id(),
            "size_in_gbs" => size_in_gbs,
        );
        storage
            .update_volume(volume, size_in_gbs, vpus_per_gb)
            .await
            .map_err(|e| e.into_error(volume_resource(volume), volume.id()))
    }

    async fn existing_boot_attachment(
        &self,
        compute: &Arc<dyn ComputeApi>,
        compartment: &str,
        instance_id: &str,
        volume: &VolumeHandle,
    ) -> Result<Option<VolumeAttachment>, Error> {
        let instance = compute
            .get_instance(instance_id)
            .await
            .map_err(|e| e.into_error(ResourceType::Instance, instance_id))?;
        let attachments = compute
            .list_boot_volume_attachments(
                &instance.availability_domain,
                compartment,
                instance_id,
            )
            .await
            .map_err(|e| {
                e.into_error(ResourceType::VolumeAttachment, instance_id)
            })?;
        Ok(attachments.into_iter().find(|a| {
            a.volume == *volume
                && a.lifecycle_state != AttachmentState::Detached
        }))
    }
}

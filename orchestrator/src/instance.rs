// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Instance listing, launch, and power actions

use console_common::model::ActionRequest;
use console_common::model::Instance;
use console_common::model::InstanceAction;
use console_common::model::InstanceState;
use console_common::model::InstanceView;
use console_common::model::LaunchInstanceSpec;
use console_common::poll::poll_until;
use console_common::CreateResult;
use console_common::Error;
use console_common::ListResultVec;
use console_common::LookupResult;
use console_common::ResourceType;
use console_common::UpdateResult;
use console_provider::ComputeApi;
use console_provider::NetworkApi;
use slog::info;
use slog::warn;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Result of a verified power action
///
/// `state` is the lifecycle state observed at verification time; `None`
/// means the instance was gone, which only a terminate can produce.
#[derive(Clone, Debug)]
pub struct ActionOutcome {
    pub action: InstanceAction,
    pub state: Option<InstanceState>,
}

impl super::Orchestrator {
    pub async fn list_instances(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
    ) -> ListResultVec<InstanceView> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        let network = self.factory().network(&tenant, region).await?;
        let compartment = tenant.effective_compartment();

        let mut views = Vec::new();
        let mut page = None::<String>;
        loop {
            let batch = compute
                .list_instances(compartment, page.as_deref())
                .await
                .map_err(|e| {
                    e.into_error(ResourceType::Instance, compartment)
                })?;
            for instance in batch.items {
                views.push(
                    self.instance_view(&compute, &network, compartment, instance)
                        .await,
                );
            }
            match batch.next_page {
                Some(next) => page = Some(next),
                None => break,
            }
        }
        Ok(views)
    }

    pub async fn get_instance(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        instance_id: &str,
    ) -> LookupResult<InstanceView> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        let network = self.factory().network(&tenant, region).await?;
        let instance = compute
            .get_instance(instance_id)
            .await
            .map_err(|e| e.into_error(ResourceType::Instance, instance_id))?;
        Ok(self
            .instance_view(
                &compute,
                &network,
                tenant.effective_compartment(),
                instance,
            )
            .await)
    }

    /// Launches an instance and waits (bounded) for it to reach RUNNING.
    pub async fn launch_instance(
        &self,
        tenant_id: Uuid,
        region: Option<&str>,
        spec: &LaunchInstanceSpec,
        cancel: &CancellationToken,
    ) -> CreateResult<InstanceView> {
        let tenant = self.tenant(tenant_id).await?;
        let compute = self.factory().compute(&tenant, region).await?;
        let network = self.factory().network(&tenant, region).await?;
        let compartment = tenant.effective_compartment();
        info!(
            self.log(), "launching instance";
            "tenant" => &tenant.display_name,
            "display_name" => &spec.display_name,
            "shape" => &spec.shape,
        );
        let instance = compute
            .launch_instance(compartment, spec)
            .await
            .map_err(|e| {
                e.into_error(ResourceType::Instance, &spec.display_name)
            })?;

        let params = self.policy().instance_poll();
        let instance_id = instance.id.clone();
        let result = poll_until(
            &params,
            cancel,
            || {
                let compute = compute.clone();
                let id = instance_id.clone();
                async move {
                    match compute.get_instance(&id).await {
                        Ok(i) => Ok(Some(i.lifecycle_state)),
                        Err(e) => {
                            Err(e.into_error(ResourceType::Instance, &id))
                        }
                    }
                }
            },
            |state| *state == InstanceState::Running,
        )
        .await?;
        if !result.success {
            return Err(result.into_unfinished_error("instance launch"));
        }

        let instance = compute
            .get_instance(&instance_id)
            .await
            .map_err(|e| e.into_error(ResourceType::Instance, &instance_id))?;
        Ok(self
            .instance_view(&compute, &network, compartment, instance)
            .await)
    }

    /// Validates, issues, and verifies a power action.
    ///
    /// Verification confirms acceptance, not completion: after the settle
    /// pause, one read must observe the instance in a state consistent
    /// with the action, or the caller gets
    /// [`Error::ActionVerification`] and should re-check.
    pub async fn instance_action(
        &self,
        request: &ActionRequest,
    ) -> UpdateResult<ActionOutcome> {
        let tenant = self.tenant(request.tenant_id).await?;
        let action =
            InstanceAction::parse(&request.action).ok_or_else(|| {
                Error::invalid_request(&format!(
                    "unsupported instance action \"{}\"",
                    request.action
                ))
            })?;
        let region = request.region.as_deref();
        let compute = self.factory().compute(&tenant, region).await?;
        let instance_id = request.instance_id.as_str();

        let instance = compute.get_instance(instance_id).await.map_err(|e| {
            e.into_error(ResourceType::Instance, instance_id)
        })?;
        let current = instance.lifecycle_state;

        if current.is_terminated() {
            // Terminating a terminated instance is idempotent success;
            // anything else on a terminated instance is a caller error.
            if action == InstanceAction::Terminate {
                return Ok(ActionOutcome { action, state: Some(current) });
            }
            return Err(Error::invalid_request(&format!(
                "cannot {} a terminated instance",
                action
            )));
        }
        if action.conflicting_states().contains(&current) {
            return Err(Error::invalid_request(&format!(
                "instance is already {}",
                current
            )));
        }

        info!(
            self.log(), "issuing instance action";
            "tenant" => &tenant.display_name,
            "instance" => instance_id,
            "action" => %action,
        );
        match action {
            InstanceAction::Terminate => {
                match compute.terminate_instance(instance_id, false).await {
                    Ok(()) => {}
                    // Already gone: the desired end state holds.
                    Err(e) if e.is_not_found() => {
                        return Ok(ActionOutcome { action, state: None });
                    }
                    Err(e) => {
                        return Err(
                            e.into_error(ResourceType::Instance, instance_id)
                        );
                    }
                }
            }
            _ => {
                compute
                    .instance_action(instance_id, action)
                    .await
                    .map_err(|e| {
                        e.into_error(ResourceType::Instance, instance_id)
                    })?;
            }
        }

        tokio::time::sleep(self.policy().action_settle).await;

        let observed = match compute.get_instance(instance_id).await {
            Ok(i) => Some(i.lifecycle_state),
            Err(e)
                if e.is_not_found()
                    && action == InstanceAction::Terminate =>
            {
                None
            }
            Err(e) => {
                warn!(
                    self.log(), "verification read failed";
                    "instance" => instance_id,
                    "error" => %e,
                );
                return Err(Error::ActionVerification {
                    action,
                    last_state: String::from("unknown"),
                });
            }
        };
        match observed {
            None => Ok(ActionOutcome { action, state: None }),
            Some(state) if action.expected_states().contains(&state) => {
                Ok(ActionOutcome { action, state: Some(state) })
            }
            Some(state) => Err(Error::ActionVerification {
                action,
                last_state: state.to_string(),
            }),
        }
    }

    /// Builds the presentation view, enriching with the primary VNIC's
    /// addresses.  Enrichment is best-effort: a failure leaves the IPs
    /// unset rather than failing the listing.
    pub(crate) async fn instance_view(
        &self,
        compute: &Arc<dyn ComputeApi>,
        network: &Arc<dyn NetworkApi>,
        compartment: &str,
        instance: Instance,
    ) -> InstanceView {
        let mut view = bare_view(instance);
        if view.lifecycle_state.network_gone() {
            return view;
        }
        match self.primary_vnic(compute, network, compartment, &view.id).await
        {
            Ok(Some((_, vnic))) => {
                view.private_ip = Some(vnic.private_ip);
                view.public_ip = vnic.public_ip;
            }
            Ok(None) => {}
            Err(e) => {
                warn!(
                    self.log(), "could not resolve primary VNIC";
                    "instance" => &view.id,
                    "error" => %e,
                );
            }
        }
        view
    }
}

fn bare_view(instance: Instance) -> InstanceView {
    let (ocpus, memory_in_gbs) = match &instance.shape_config {
        Some(config) => (Some(config.ocpus), Some(config.memory_in_gbs)),
        None => (None, None),
    };
    InstanceView {
        id: instance.id,
        display_name: instance.display_name,
        lifecycle_state: instance.lifecycle_state,
        availability_domain: instance.availability_domain,
        shape: instance.shape,
        time_created: instance.time_created,
        public_ip: None,
        private_ip: None,
        ocpus,
        memory_in_gbs,
    }
}

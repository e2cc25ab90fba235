// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Resource-action orchestration across tenants
//!
//! The [`Orchestrator`] is the one stateful object in the console: it owns
//! the credential store and a client factory, and every operation resolves
//! its tenant, builds fresh service clients, performs provider calls, and
//! normalizes the results.  Long-running waits are bounded by the
//! [`WaitPolicy`] and cancellable via a caller-held token.
//!
//! The implementation is split by resource family: [`instance`],
//! [`instance_network`], [`volume`], [`network`], [`console`], [`usage`],
//! and [`quota`] each hold an `impl Orchestrator` block.

pub mod console;
pub mod instance;
pub mod instance_network;
pub mod network;
pub mod quota;
pub mod usage;
pub mod volume;

use console_common::poll::PollParams;
use console_common::Error;
use console_common::LookupResult;
use console_credentials::CredentialStore;
use console_credentials::TenantCredential;
use console_provider::ClientFactory;
use console_provider::CloudProvider;
use slog::o;
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Wait budgets for every bounded wait the orchestrator performs
///
/// All fields are operator-configurable; the defaults match the provider's
/// observed settle times.
#[derive(Clone, Debug)]
pub struct WaitPolicy {
    /// Pause between issuing a power action and the verification read.
    pub action_settle: Duration,
    /// Pause after a public IP release before allocating its replacement.
    pub ip_release_settle: Duration,
    /// Budget for network-object waits (public IP release/allocation).
    pub network_wait: Duration,
    /// Budget for instance-scoped waits (VNIC and volume attachments).
    pub instance_wait: Duration,
    /// Interval between successive polls.
    pub poll_interval: Duration,
}

impl Default for WaitPolicy {
    fn default() -> WaitPolicy {
        WaitPolicy {
            action_settle: Duration::from_secs(2),
            ip_release_settle: Duration::from_secs(10),
            network_wait: Duration::from_secs(300),
            instance_wait: Duration::from_secs(1000),
            poll_interval: Duration::from_secs(2),
        }
    }
}

impl WaitPolicy {
    pub(crate) fn network_poll(&self) -> PollParams {
        PollParams::new(self.network_wait, self.poll_interval)
    }

    pub(crate) fn instance_poll(&self) -> PollParams {
        PollParams::new(self.instance_wait, self.poll_interval)
    }
}

/// Multi-tenant resource-action orchestrator
pub struct Orchestrator {
    store: Arc<CredentialStore>,
    factory: ClientFactory,
    policy: WaitPolicy,
    log: Logger,
}

impl Orchestrator {
    pub fn new(
        store: Arc<CredentialStore>,
        provider: Arc<dyn CloudProvider>,
        policy: WaitPolicy,
        log: &Logger,
    ) -> Orchestrator {
        let log = log.new(o!("component" => "Orchestrator"));
        let factory = ClientFactory::new(provider, &log);
        Orchestrator { store, factory, policy, log }
    }

    pub fn credential_store(&self) -> &CredentialStore {
        &self.store
    }

    pub(crate) async fn tenant(
        &self,
        tenant_id: Uuid,
    ) -> LookupResult<TenantCredential> {
        self.store.get(tenant_id).await
    }

    pub(crate) fn factory(&self) -> &ClientFactory {
        &self.factory
    }

    pub(crate) fn policy(&self) -> &WaitPolicy {
        &self.policy
    }

    pub(crate) fn log(&self) -> &Logger {
        &self.log
    }
}

/// Cheap alias so operation modules read naturally.
pub(crate) type OrchResult<T> = Result<T, Error>;

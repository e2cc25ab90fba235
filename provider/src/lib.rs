// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Cloud provider surface for the tenant console
//!
//! The provider SDK is a black box to the rest of the console: this crate
//! defines the service traits the orchestrator calls, the authentication
//! material ([`auth::ApiAuth`]) resolved per call from a tenant record,
//! and the [`factory::ClientFactory`] that binds the two together.  The
//! [`sim`] module is an in-memory provider used by tests.

pub mod auth;
pub mod error;
pub mod factory;
pub mod interfaces;
pub mod sim;

pub use auth::ApiAuth;
pub use auth::ServiceKind;
pub use error::ProviderError;
pub use factory::ClientFactory;
pub use factory::ServiceClient;
pub use interfaces::BlockStorageApi;
pub use interfaces::CloudProvider;
pub use interfaces::ComputeApi;
pub use interfaces::IdentityApi;
pub use interfaces::LimitsApi;
pub use interfaces::NetworkApi;
pub use interfaces::ObjectStorageApi;
pub use interfaces::SubscriptionApi;
pub use interfaces::UsageApi;
pub use interfaces::UsageQuery;

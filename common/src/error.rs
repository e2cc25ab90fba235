// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling facilities for the console control plane
//!
//! Errors here are generated while executing orchestrator operations on
//! behalf of a caller.  The presentation layer is responsible for mapping
//! them onto whatever transport it speaks; this crate never formats
//! user-facing strings beyond each variant's message.

use crate::model::InstanceAction;
use serde::Deserialize;
use serde::Serialize;
use std::fmt::Display;
use uuid::Uuid;

/// An error that can be generated within a console control plane component
///
/// Where possible we reuse existing variants rather than inventing new ones
/// to distinguish cases that no programmatic consumer needs to distinguish.
#[derive(Clone, Debug, Deserialize, thiserror::Error, PartialEq, Serialize)]
pub enum Error {
    /// An object needed as part of this operation was not found.
    #[error("Object (of type {lookup_type:?}) not found: {type_name}")]
    ObjectNotFound { type_name: ResourceType, lookup_type: LookupType },
    /// The request was well-formed, but the operation cannot be completed
    /// given the current state of the system.
    #[error("Invalid Request: {message}")]
    InvalidRequest { message: String },
    /// A tenant record is missing or malformed.
    #[error("Configuration Error: {message}")]
    Configuration { message: String },
    /// A scoped cloud client could not be constructed for a tenant.  These
    /// are credential/config problems, not transient failures.
    #[error("cannot construct client for tenant {tenant}: {message}")]
    ClientConstruction { tenant: String, message: String },
    /// The provider reported the resource is in a state that cannot accept
    /// this operation right now (409/IncorrectState).  Retry later.
    #[error("resource busy, retry later: {message}")]
    ResourceBusy { message: String },
    /// The provider (or part of it) is unavailable.
    #[error("Service Unavailable: {internal_message}")]
    Unavailable { internal_message: String },
    /// The provider accepted the operation but the expected state was not
    /// observed within the bounded wait.  Distinct from failure: the caller
    /// should re-check the resource state later.
    #[error("timed out waiting for {operation} (last observed state: {last_observed})")]
    PollTimeout { operation: String, last_observed: String },
    /// An instance action was issued but the follow-up state check either
    /// failed or observed a state outside the action's expected set.
    #[error("could not verify {action} (last known state: {last_state})")]
    ActionVerification { action: InstanceAction, last_state: String },
    /// A step of the public-IP replacement sequence failed.  No rollback is
    /// attempted; the caller must re-invoke or inspect manually.
    #[error("public ip replacement failed at step \"{step}\": {source}")]
    PublicIpReplacement {
        step: String,
        #[source]
        source: Box<Error>,
    },
    /// The system encountered an unhandled operational error.
    #[error("Internal Error: {internal_message}")]
    InternalError { internal_message: String },
}

/// Kinds of resources the console orchestrates
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq, Serialize)]
pub enum ResourceType {
    Tenant,
    Instance,
    Vnic,
    VnicAttachment,
    BlockVolume,
    BootVolume,
    VolumeAttachment,
    Vcn,
    Subnet,
    SecurityList,
    RouteTable,
    PublicIp,
    PrivateIp,
    ConsoleConnection,
    ServiceLimit,
}

impl Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ResourceType::Tenant => "tenant",
                ResourceType::Instance => "instance",
                ResourceType::Vnic => "vnic",
                ResourceType::VnicAttachment => "vnic attachment",
                ResourceType::BlockVolume => "block volume",
                ResourceType::BootVolume => "boot volume",
                ResourceType::VolumeAttachment => "volume attachment",
                ResourceType::Vcn => "vcn",
                ResourceType::Subnet => "subnet",
                ResourceType::SecurityList => "security list",
                ResourceType::RouteTable => "route table",
                ResourceType::PublicIp => "public ip",
                ResourceType::PrivateIp => "private ip",
                ResourceType::ConsoleConnection => "console connection",
                ResourceType::ServiceLimit => "service limit",
            }
        )
    }
}

/// Indicates how an object was looked up (for an `ObjectNotFound` error)
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub enum LookupType {
    /// a specific name was requested
    ByName(String),
    /// a specific id was requested
    ById(String),
}

impl LookupType {
    /// Returns an ObjectNotFound error appropriate for the case where this
    /// lookup failed
    pub fn into_not_found(self, type_name: ResourceType) -> Error {
        Error::ObjectNotFound { type_name, lookup_type: self }
    }
}

impl From<&str> for LookupType {
    fn from(id: &str) -> Self {
        LookupType::ById(id.to_owned())
    }
}

impl From<Uuid> for LookupType {
    fn from(uuid: Uuid) -> Self {
        LookupType::ById(uuid.to_string())
    }
}

impl Error {
    /// Returns whether the error is likely transient and could reasonably be
    /// retried by the caller
    pub fn retryable(&self) -> bool {
        match self {
            Error::ResourceBusy { .. }
            | Error::Unavailable { .. }
            | Error::PollTimeout { .. } => true,

            Error::ObjectNotFound { .. }
            | Error::InvalidRequest { .. }
            | Error::Configuration { .. }
            | Error::ClientConstruction { .. }
            | Error::ActionVerification { .. }
            | Error::PublicIpReplacement { .. }
            | Error::InternalError { .. } => false,
        }
    }

    /// Generates an [`Error::ObjectNotFound`] error for a lookup by id.
    pub fn not_found_by_id(type_name: ResourceType, id: &str) -> Error {
        LookupType::ById(id.to_owned()).into_not_found(type_name)
    }

    /// Generates an [`Error::ObjectNotFound`] error for a lookup by name.
    pub fn not_found_by_name(type_name: ResourceType, name: &str) -> Error {
        LookupType::ByName(name.to_owned()).into_not_found(type_name)
    }

    /// Generates an [`Error::InvalidRequest`] error with the specific message
    ///
    /// This should be used for failures due possibly to invalid client input
    /// or malformed requests.
    pub fn invalid_request(message: &str) -> Error {
        Error::InvalidRequest { message: message.to_owned() }
    }

    /// Generates an [`Error::InternalError`] error with the specific message
    ///
    /// InternalError should be used for operational conditions that should
    /// not happen but that we cannot reasonably handle at runtime.
    pub fn internal_error(internal_message: &str) -> Error {
        Error::InternalError { internal_message: internal_message.to_owned() }
    }

    /// Generates an [`Error::Unavailable`] error with the specific message
    ///
    /// This should be used for transient failures where the caller might be
    /// expected to retry.
    pub fn unavail(message: &str) -> Error {
        Error::Unavailable { internal_message: message.to_owned() }
    }

    /// Wraps this error as a failed step of the public-IP replacement
    /// sequence.
    pub fn replacement_step(self, step: &str) -> Error {
        Error::PublicIpReplacement {
            step: step.to_owned(),
            source: Box::new(self),
        }
    }

    /// Given an [`Error`] with an internal message, return the same error
    /// with `context` prepended to it to provide more context
    ///
    /// If the error has no internal message, then it is returned unchanged.
    pub fn internal_context<C>(self, context: C) -> Error
    where
        C: Display + Send + Sync + 'static,
    {
        match self {
            Error::InternalError { internal_message } => Error::InternalError {
                internal_message: format!("{}: {}", context, internal_message),
            },
            Error::Unavailable { internal_message } => Error::Unavailable {
                internal_message: format!("{}: {}", context, internal_message),
            },
            other => other,
        }
    }
}

/// Provides extra context for internal error messages in the manner of
/// `anyhow::Context`, without adding a new error to the cause chain.
pub trait InternalContext<T> {
    fn internal_context<C>(self, s: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static;
}

impl<T> InternalContext<T> for Result<T, Error> {
    fn internal_context<C>(self, context: C) -> Result<T, Error>
    where
        C: Display + Send + Sync + 'static,
    {
        self.map_err(|error| error.internal_context(context))
    }
}

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Typed provider service errors and their classification
//!
//! Every provider call can fail with a [`ProviderError`] carrying an
//! HTTP-like status code and a machine code string.  Classification into
//! the console [`Error`] taxonomy happens exactly once, at the boundary
//! where the orchestrator receives the error; idempotent operations
//! instead inspect the error directly (e.g. treating 404 as success).

use console_common::Error;
use console_common::LookupType;
use console_common::ResourceType;
use serde::Deserialize;
use serde::Serialize;

/// An error reported by the cloud provider
#[derive(Clone, Debug, Deserialize, thiserror::Error, PartialEq, Serialize)]
#[error("provider error (status {status}, code {code}): {message}")]
pub struct ProviderError {
    pub status: u16,
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(status: u16, code: &str, message: &str) -> ProviderError {
        ProviderError {
            status,
            code: code.to_owned(),
            message: message.to_owned(),
        }
    }

    pub fn not_found(message: &str) -> ProviderError {
        ProviderError::new(404, "NotAuthorizedOrNotFound", message)
    }

    pub fn conflict(message: &str) -> ProviderError {
        ProviderError::new(409, "Conflict", message)
    }

    pub fn incorrect_state(message: &str) -> ProviderError {
        ProviderError::new(409, "IncorrectState", message)
    }

    pub fn too_many_requests(message: &str) -> ProviderError {
        ProviderError::new(429, "TooManyRequests", message)
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    pub fn is_conflict(&self) -> bool {
        self.status == 409
    }

    pub fn is_incorrect_state(&self) -> bool {
        self.status == 409 && self.code == "IncorrectState"
    }

    /// Classifies this error for a read/mutate path where not-found is an
    /// error (idempotent paths handle 404 themselves before calling this).
    pub fn into_error(self, resource: ResourceType, id: &str) -> Error {
        if self.is_not_found() {
            return LookupType::ById(id.to_owned()).into_not_found(resource);
        }
        if self.is_conflict() {
            return Error::ResourceBusy { message: self.message };
        }
        match self.status {
            429 => Error::unavail(&self.message),
            500..=599 => Error::unavail(&self.message),
            _ => Error::internal_error(&format!(
                "provider error (status {}, code {}): {}",
                self.status, self.code, self.message
            )),
        }
    }
}

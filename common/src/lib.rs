// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! # Tenant console control plane: common facilities
//!
//! This crate holds the pieces every other console crate agrees on: the
//! error taxonomy, the resource model (lifecycle states, handles, views)
//! and the cancellable poll primitive used by every bounded wait.

pub mod error;
pub mod model;
pub mod poll;

pub use error::Error;
pub use error::LookupType;
pub use error::ResourceType;

/// Result alias for operations that look up a single resource.
pub type LookupResult<T> = Result<T, Error>;
/// Result alias for operations that create a resource.
pub type CreateResult<T> = Result<T, Error>;
/// Result alias for operations that list resources.
pub type ListResultVec<T> = Result<Vec<T>, Error>;
/// Result alias for operations that update a resource.
pub type UpdateResult<T> = Result<T, Error>;
/// Result alias for operations that delete a resource.
pub type DeleteResult = Result<(), Error>;

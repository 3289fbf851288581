// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Directory data model, snapshot normalization, and the store contract
//! shared by the reconciliation engine, the IdP client, and the scheduler.

pub mod entities;
pub mod error;
pub mod normalize;
pub mod store;
pub mod sync;
pub mod types;

pub use entities::{AuthenticationProvider, Group, GroupUser, Team, User, UserAuthentication};
pub use error::{DirectoryError, Result};
pub use normalize::normalize_snapshot;
pub use store::{DirectoryStore, DirectoryTransaction, UserUpdate};
pub use sync::{RawIdpUser, ReconcileOptions, SyncReport, SyncUser};
pub use types::{
	AuthenticationProviderId, GroupId, GroupPermission, Role, TeamId, UserAuthenticationId, UserId,
};

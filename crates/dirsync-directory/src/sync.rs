// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! The snapshot and report types that flow through the reconciliation engine.

use serde::{Deserialize, Serialize};

/// A single enabled user as returned by the IdP admin API, before
/// normalization. Field names mirror the Keycloak-shaped admin response in
/// spec.md §6 (`{id, username, email?, firstName?, lastName?, enabled}`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawIdpUser {
	pub id: String,
	pub username: Option<String>,
	pub email: Option<String>,
	#[serde(rename = "firstName")]
	pub first_name: Option<String>,
	#[serde(rename = "lastName")]
	pub last_name: Option<String>,
	pub enabled: bool,
	pub avatar_url: Option<String>,
}

/// Canonical, normalized input to the reconciliation engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncUser {
	pub provider_id: String,
	pub email: String,
	pub name: String,
	pub avatar_url: Option<String>,
}

/// Options controlling default-group assignment on user creation.
/// ID takes precedence over name; a missing group is logged and ignored.
#[derive(Debug, Clone, Default)]
pub struct ReconcileOptions {
	pub default_group_id: Option<crate::types::GroupId>,
	pub default_group_name: Option<String>,
}

/// The outcome of one `reconcile()` call. Counts are total: they sum to at
/// least the number of processed inputs (spec.md §8 Totality property), with
/// a user able to contribute to both `updated` and `reactivated`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncReport {
	pub created: u64,
	pub updated: u64,
	pub suspended: u64,
	pub reactivated: u64,
	pub unchanged: u64,
	pub added_to_group: u64,
	pub errors: Vec<String>,
}

impl SyncReport {
	pub fn is_safety_abort(&self) -> bool {
		self.errors.len() == 1
			&& self.created == 0
			&& self.updated == 0
			&& self.suspended == 0
			&& self.reactivated == 0
			&& self.unchanged == 0
			&& self.added_to_group == 0
	}
}

// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Directory entities: the local store's view of teams, users, and the
//! authentication bindings that tie them to an external IdP.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{AuthenticationProviderId, GroupId, GroupPermission, Role, TeamId, UserId};

/// Tenant boundary. Every `User` and `AuthenticationProvider` is scoped to
/// exactly one team.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
	pub id: TeamId,
	/// Role assigned to users created by the sync engine, when set.
	pub default_user_role: Option<Role>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl Team {
	pub fn new(id: TeamId, default_user_role: Option<Role>) -> Self {
		let now = Utc::now();
		Self {
			id,
			default_user_role,
			created_at: now,
			updated_at: now,
		}
	}
}

/// A (team, provider-name) binding, e.g. a team's "oidc" configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationProvider {
	pub id: AuthenticationProviderId,
	pub team_id: TeamId,
	pub provider_name: String,
	pub enabled: bool,
	pub sync_default_group_id: Option<GroupId>,
	pub sync_default_group_name: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// A local directory entry scoped to a `Team`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	pub id: UserId,
	pub team_id: TeamId,
	pub email: String,
	pub name: String,
	pub avatar_url: Option<String>,
	pub role: Role,
	/// `None` means active. `Some` means suspended at that instant.
	pub suspended_at: Option<DateTime<Utc>>,
	pub suspended_by_id: Option<UserId>,
	pub last_active_at: Option<DateTime<Utc>>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl User {
	pub fn is_suspended(&self) -> bool {
		self.suspended_at.is_some()
	}
}

/// Links a `User` to an `AuthenticationProvider` by external subject ID.
/// Unique within `(authentication_provider_id, provider_id)`; a user has at
/// most one of these per provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAuthentication {
	pub id: crate::types::UserAuthenticationId,
	pub authentication_provider_id: AuthenticationProviderId,
	pub user_id: UserId,
	pub provider_id: String,
	pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
	pub id: GroupId,
	pub team_id: TeamId,
	pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupUser {
	pub group_id: GroupId,
	pub user_id: UserId,
	pub permission: GroupPermission,
	pub created_at: DateTime<Utc>,
}

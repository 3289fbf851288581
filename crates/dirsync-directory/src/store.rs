// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! `DirectoryStore` (spec.md §4.E): the abstract contract the reconciliation
//! engine uses to read and mutate the local directory.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{Group, Team, User, UserAuthentication};
use crate::error::Result;
use crate::types::{AuthenticationProviderId, GroupId, GroupPermission, TeamId, UserId};

/// Fields that the reconciliation engine may overwrite on an existing user.
/// `None` means "leave unchanged" — callers only set the fields the
/// attribute-diff rules decided should change.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
	pub name: Option<String>,
	pub email: Option<String>,
	pub avatar_url: Option<String>,
}

impl UserUpdate {
	pub fn is_empty(&self) -> bool {
		self.name.is_none() && self.email.is_none() && self.avatar_url.is_none()
	}
}

/// A single per-user scoped transaction. Every mutation the engine performs
/// goes through one of these so that a failure on one user never rolls back
/// a sibling user's already-committed change (spec.md §4.C "Per-user fault
/// isolation").
#[async_trait]
pub trait DirectoryTransaction: Send {
	async fn create_user(
		&mut self,
		team_id: TeamId,
		email: &str,
		name: &str,
		role: crate::types::Role,
		avatar_url: Option<&str>,
	) -> Result<User>;

	async fn create_authentication(
		&mut self,
		authentication_provider_id: AuthenticationProviderId,
		user_id: UserId,
		provider_id: &str,
	) -> Result<UserAuthentication>;

	async fn create_group_membership(
		&mut self,
		group_id: GroupId,
		user_id: UserId,
		permission: GroupPermission,
	) -> Result<()>;

	async fn update_user(&mut self, user_id: UserId, update: UserUpdate) -> Result<()>;

	async fn suspend_user(&mut self, user_id: UserId, at: DateTime<Utc>) -> Result<()>;

	async fn clear_suspension(&mut self, user_id: UserId) -> Result<()>;

	async fn commit(self: Box<Self>) -> Result<()>;

	async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
	async fn find_team(&self, id: TeamId) -> Result<Option<Team>>;

	async fn find_auth_provider(
		&self,
		id: AuthenticationProviderId,
	) -> Result<Option<crate::entities::AuthenticationProvider>>;

	async fn find_group_by_id_in_team(&self, team_id: TeamId, group_id: GroupId) -> Result<Option<Group>>;

	async fn find_group_by_name_in_team(&self, team_id: TeamId, name: &str) -> Result<Option<Group>>;

	async fn find_user_by_email_ci(&self, team_id: TeamId, email: &str) -> Result<Option<User>>;

	/// All enabled providers with the given provider-name, across every
	/// team. The scheduled driver partitions this set across replicas
	/// (spec.md §4.D) rather than the engine, which only ever reconciles one
	/// binding at a time.
	async fn list_enabled_providers(&self, provider_name: &str) -> Result<Vec<crate::entities::AuthenticationProvider>>;

	/// Existing authentications for a provider, joined with their user. The
	/// implementation constrains the join to the provider's own team, so a
	/// user from another team can never appear here (invariant 5).
	async fn find_authentications_by_provider(
		&self,
		authentication_provider_id: AuthenticationProviderId,
	) -> Result<Vec<(UserAuthentication, User)>>;

	async fn begin_transaction(&self) -> Result<Box<dyn DirectoryTransaction>>;
}

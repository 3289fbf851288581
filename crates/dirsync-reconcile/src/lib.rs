// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Reconciliation Engine (spec.md §4.C): the core that reconciles one
//! snapshot against one (team, authentication-provider) binding.

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use dirsync_directory::{
	DirectoryStore, GroupPermission, ReconcileOptions, Role, SyncReport,
	SyncUser, User,
};
use dirsync_directory::{AuthenticationProviderId, GroupId, TeamId};
use tracing::{info, warn};

/// Substrings that mark an avatar URL as IdP-sourced, and therefore safe for
/// the engine to overwrite. User-uploaded avatars never match these and are
/// left alone.
const DEFAULT_IDP_AVATAR_MARKERS: &[&str] = &["keycloak", "idp"];

pub async fn reconcile(
	store: &dyn DirectoryStore,
	team_id: TeamId,
	auth_provider_id: AuthenticationProviderId,
	snapshot: Vec<SyncUser>,
	options: ReconcileOptions,
) -> SyncReport {
	reconcile_with_markers(
		store,
		team_id,
		auth_provider_id,
		snapshot,
		options,
		DEFAULT_IDP_AVATAR_MARKERS,
	)
	.await
}

/// Same as [`reconcile`] but with a caller-supplied set of avatar-origin
/// markers, for deployments whose IdP isn't Keycloak.
pub async fn reconcile_with_markers(
	store: &dyn DirectoryStore,
	team_id: TeamId,
	auth_provider_id: AuthenticationProviderId,
	snapshot: Vec<SyncUser>,
	options: ReconcileOptions,
	avatar_markers: &[&str],
) -> SyncReport {
	let mut report = SyncReport::default();

	if snapshot.is_empty() {
		report.errors.push(
			"Provider returned empty user list - sync aborted to prevent mass suspension"
				.to_string(),
		);
		return report;
	}

	let team = match store.find_team(team_id).await {
		Ok(Some(team)) => team,
		Ok(None) => {
			report.errors.push(format!("Team {team_id} not found"));
			return report;
		}
		Err(e) => {
			report
				.errors
				.push(format!("Team {team_id} not found: {e}"));
			return report;
		}
	};

	match store.find_auth_provider(auth_provider_id).await {
		Ok(Some(_)) => {}
		Ok(None) => {
			report.errors.push(format!(
				"Authentication provider {auth_provider_id} not found"
			));
			return report;
		}
		Err(e) => {
			report.errors.push(format!(
				"Authentication provider {auth_provider_id} not found: {e}"
			));
			return report;
		}
	}

	let mut by_provider_id: HashMap<&str, usize> = HashMap::new();
	for (i, user) in snapshot.iter().enumerate() {
		by_provider_id.insert(user.provider_id.as_str(), i);
	}

	let mut processed: HashSet<String> = HashSet::new();

	let default_role = team.default_user_role.unwrap_or_default();

	let existing = match store.find_authentications_by_provider(auth_provider_id).await {
		Ok(rows) => rows,
		Err(e) => {
			report
				.errors
				.push(format!("Failed to load existing authentications: {e}"));
			return report;
		}
	};

	// Phase 1 — existing authentications.
	for (auth, user) in existing {
		processed.insert(auth.provider_id.clone());

		if let Some(&idx) = by_provider_id.get(auth.provider_id.as_str()) {
			let candidate = &snapshot[idx];
			match apply_match(store, &user, candidate, avatar_markers).await {
				Ok((updated, reactivated)) => {
					if updated {
						report.updated += 1;
					}
					if reactivated {
						report.reactivated += 1;
					}
					if !updated && !reactivated {
						report.unchanged += 1;
					}
				}
				Err(e) => report
					.errors
					.push(format!("Failed to update user {}: {e}", user.email)),
			}
		} else if user.is_suspended() {
			report.unchanged += 1;
		} else {
			match apply_suspend(store, user.id).await {
				Ok(()) => report.suspended += 1,
				Err(e) => report
					.errors
					.push(format!("Failed to suspend user {}: {e}", user.email)),
			}
		}
	}

	// Phase 2 — snapshot entries not yet processed.
	for candidate in snapshot.iter().filter(|u| !processed.contains(&u.provider_id)) {
		if candidate.email.is_empty() {
			report.errors.push(format!(
				"Skipping user {}: no email address",
				candidate.provider_id
			));
			continue;
		}

		match store.find_user_by_email_ci(team_id, &candidate.email).await {
			Ok(Some(existing_user)) => {
				match apply_link(
					store,
					auth_provider_id,
					&existing_user,
					candidate,
					avatar_markers,
				)
				.await
				{
					Ok((updated, reactivated)) => {
						if reactivated {
							report.reactivated += 1;
						}
						if updated {
							report.updated += 1;
						}
						if !updated && !reactivated {
							report.unchanged += 1;
						}
					}
					Err(e) => report.errors.push(format!(
						"Failed to update user {}: {e}",
						existing_user.email
					)),
				}
			}
			Ok(None) => {
				match apply_create(
					store,
					team_id,
					auth_provider_id,
					candidate,
					default_role,
					&options,
				)
				.await
				{
					Ok(added_to_group) => {
						report.created += 1;
						if added_to_group {
							report.added_to_group += 1;
						}
					}
					Err(e) => report
						.errors
						.push(format!("Failed to create user {}: {e}", candidate.email)),
				}
			}
			Err(e) => report
				.errors
				.push(format!("Failed to create user {}: {e}", candidate.email)),
		}
	}

	info!(
		%team_id,
		%auth_provider_id,
		created = report.created,
		updated = report.updated,
		suspended = report.suspended,
		reactivated = report.reactivated,
		unchanged = report.unchanged,
		"reconciliation complete"
	);

	report
}

/// Attribute diff (spec.md §4.C): which fields on `existing` should be
/// overwritten with `candidate`'s values.
fn diff_update(
	existing: &User,
	candidate: &SyncUser,
	avatar_markers: &[&str],
) -> dirsync_directory::UserUpdate {
	let mut update = dirsync_directory::UserUpdate::default();

	if !candidate.name.is_empty() && candidate.name != existing.name {
		update.name = Some(candidate.name.clone());
	}

	if !candidate.email.is_empty() && candidate.email != existing.email {
		update.email = Some(candidate.email.clone());
	}

	if let Some(avatar) = candidate.avatar_url.as_deref().filter(|a| !a.is_empty()) {
		let overwrite_allowed = match existing.avatar_url.as_deref() {
			None => true,
			Some("") => true,
			Some(current) => avatar_markers
				.iter()
				.any(|marker| current.to_lowercase().contains(marker)),
		};
		if overwrite_allowed {
			update.avatar_url = Some(avatar.to_string());
		}
	}

	update
}

async fn apply_match(
	store: &dyn DirectoryStore,
	user: &User,
	candidate: &SyncUser,
	avatar_markers: &[&str],
) -> dirsync_directory::Result<(bool, bool)> {
	let diff = diff_update(user, candidate, avatar_markers);
	let reactivate = user.is_suspended();

	if diff.is_empty() && !reactivate {
		return Ok((false, false));
	}

	let mut tx = store.begin_transaction().await?;
	if !diff.is_empty() {
		tx.update_user(user.id, diff.clone()).await?;
	}
	if reactivate {
		tx.clear_suspension(user.id).await?;
	}
	tx.commit().await?;

	Ok((!diff.is_empty(), reactivate))
}

async fn apply_suspend(
	store: &dyn DirectoryStore,
	user_id: dirsync_directory::UserId,
) -> dirsync_directory::Result<()> {
	let mut tx = store.begin_transaction().await?;
	tx.suspend_user(user_id, Utc::now()).await?;
	tx.commit().await
}

async fn apply_link(
	store: &dyn DirectoryStore,
	auth_provider_id: AuthenticationProviderId,
	user: &User,
	candidate: &SyncUser,
	avatar_markers: &[&str],
) -> dirsync_directory::Result<(bool, bool)> {
	let diff = diff_update(user, candidate, avatar_markers);
	let reactivate = user.is_suspended();

	let mut tx = store.begin_transaction().await?;
	tx.create_authentication(auth_provider_id, user.id, &candidate.provider_id)
		.await?;
	if !diff.is_empty() {
		tx.update_user(user.id, diff.clone()).await?;
	}
	if reactivate {
		tx.clear_suspension(user.id).await?;
	}
	tx.commit().await?;

	Ok((!diff.is_empty(), reactivate))
}

async fn apply_create(
	store: &dyn DirectoryStore,
	team_id: TeamId,
	auth_provider_id: AuthenticationProviderId,
	candidate: &SyncUser,
	default_role: Role,
	options: &ReconcileOptions,
) -> dirsync_directory::Result<bool> {
	let mut tx = store.begin_transaction().await?;

	let user = tx
		.create_user(
			team_id,
			&candidate.email,
			&candidate.name,
			default_role,
			candidate.avatar_url.as_deref(),
		)
		.await?;

	tx.create_authentication(auth_provider_id, user.id, &candidate.provider_id)
		.await?;

	let group = resolve_default_group(store, team_id, options).await?;
	let added_to_group = if let Some(group_id) = group {
		tx.create_group_membership(group_id, user.id, GroupPermission::Member)
			.await?;
		true
	} else {
		false
	};

	tx.commit().await?;
	Ok(added_to_group)
}

async fn resolve_default_group(
	store: &dyn DirectoryStore,
	team_id: TeamId,
	options: &ReconcileOptions,
) -> dirsync_directory::Result<Option<GroupId>> {
	if let Some(id) = options.default_group_id {
		if let Some(group) = store.find_group_by_id_in_team(team_id, id).await? {
			return Ok(Some(group.id));
		}
		warn!(%team_id, %id, "configured default group not found");
		return Ok(None);
	}

	if let Some(name) = &options.default_group_name {
		if let Some(group) = store.find_group_by_name_in_team(team_id, name).await? {
			return Ok(Some(group.id));
		}
		warn!(%team_id, %name, "configured default group not found");
	}

	Ok(None)
}

// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dirsync_directory::{
	AuthenticationProvider, AuthenticationProviderId, DirectoryError, DirectoryStore, DirectoryTransaction, Group,
	GroupId, Team, TeamId, User, UserAuthentication,
};
use dirsync_idp_client::IdpClientConfig;
use dirsync_secret::SecretString;

use super::*;

struct FakeStore {
	providers: Vec<AuthenticationProvider>,
	fail_enumeration: bool,
}

#[async_trait]
impl DirectoryStore for FakeStore {
	async fn find_team(&self, _id: TeamId) -> dirsync_directory::Result<Option<Team>> {
		Ok(None)
	}

	async fn find_auth_provider(
		&self,
		_id: AuthenticationProviderId,
	) -> dirsync_directory::Result<Option<AuthenticationProvider>> {
		Ok(None)
	}

	async fn find_group_by_id_in_team(&self, _team_id: TeamId, _group_id: GroupId) -> dirsync_directory::Result<Option<Group>> {
		Ok(None)
	}

	async fn find_group_by_name_in_team(&self, _team_id: TeamId, _name: &str) -> dirsync_directory::Result<Option<Group>> {
		Ok(None)
	}

	async fn find_user_by_email_ci(&self, _team_id: TeamId, _email: &str) -> dirsync_directory::Result<Option<User>> {
		Ok(None)
	}

	async fn list_enabled_providers(&self, provider_name: &str) -> dirsync_directory::Result<Vec<AuthenticationProvider>> {
		if self.fail_enumeration {
			return Err(DirectoryError::Internal("enumeration unavailable".to_string()));
		}
		Ok(self
			.providers
			.iter()
			.filter(|p| p.enabled && p.provider_name == provider_name)
			.cloned()
			.collect())
	}

	async fn find_authentications_by_provider(
		&self,
		_authentication_provider_id: AuthenticationProviderId,
	) -> dirsync_directory::Result<Vec<(UserAuthentication, User)>> {
		Ok(Vec::new())
	}

	async fn begin_transaction(&self) -> dirsync_directory::Result<Box<dyn DirectoryTransaction>> {
		unimplemented!("not exercised by scheduler tests")
	}
}

fn provider(id: AuthenticationProviderId) -> AuthenticationProvider {
	AuthenticationProvider {
		id,
		team_id: TeamId::generate(),
		provider_name: "oidc".to_string(),
		enabled: true,
		sync_default_group_id: None,
		sync_default_group_name: None,
		created_at: Utc::now(),
		updated_at: Utc::now(),
	}
}

fn unreachable_idp_config() -> IdpClientConfig {
	IdpClientConfig {
		admin_url: "http://127.0.0.1:1".to_string(),
		realm: "test".to_string(),
		client_id: "client".to_string(),
		client_secret: SecretString::new("secret"),
	}
}

#[tokio::test]
async fn no_owned_providers_short_circuits_without_contacting_idp() {
	let id = AuthenticationProviderId::generate();
	let store: Arc<dyn DirectoryStore> = Arc::new(FakeStore {
		providers: vec![provider(id)],
		fail_enumeration: false,
	});

	// Force every provider onto a replica index this scheduler does not own.
	let replica_count = 4;
	let owning_replica = partition_for(id, replica_count);
	let other_replica = (owning_replica + 1) % replica_count;

	let scheduler = SyncScheduler::new(store, unreachable_idp_config(), other_replica, replica_count);
	let reports = scheduler.run_tick().await;

	assert!(reports.is_empty());
	let health = scheduler.health_status().await;
	assert_eq!(health.last_tick_succeeded, Some(true));
	assert_eq!(health.status, HealthState::Healthy);
}

#[tokio::test]
async fn unreachable_idp_aborts_tick_and_marks_unhealthy() {
	let id = AuthenticationProviderId::generate();
	let store: Arc<dyn DirectoryStore> = Arc::new(FakeStore {
		providers: vec![provider(id)],
		fail_enumeration: false,
	});

	let scheduler = SyncScheduler::new(store, unreachable_idp_config(), partition_for(id, 1), 1);
	let reports = scheduler.run_tick().await;

	assert!(reports.is_empty());
	let health = scheduler.health_status().await;
	assert_eq!(health.last_tick_succeeded, Some(false));
	assert_eq!(health.consecutive_tick_failures, 1);
}

#[tokio::test]
async fn store_enumeration_failure_aborts_tick() {
	let store: Arc<dyn DirectoryStore> = Arc::new(FakeStore {
		providers: Vec::new(),
		fail_enumeration: true,
	});

	let scheduler = SyncScheduler::new(store, unreachable_idp_config(), 0, 1);
	let reports = scheduler.run_tick().await;

	assert!(reports.is_empty());
	let health = scheduler.health_status().await;
	assert_eq!(health.last_tick_succeeded, Some(false));
}

#[tokio::test]
async fn repeated_failures_escalate_to_unhealthy() {
	let store: Arc<dyn DirectoryStore> = Arc::new(FakeStore {
		providers: Vec::new(),
		fail_enumeration: true,
	});

	let scheduler = SyncScheduler::new(store, unreachable_idp_config(), 0, 1);
	for _ in 0..3 {
		scheduler.run_tick().await;
	}

	let health = scheduler.health_status().await;
	assert_eq!(health.status, HealthState::Unhealthy);
	assert_eq!(health.consecutive_tick_failures, 3);
}

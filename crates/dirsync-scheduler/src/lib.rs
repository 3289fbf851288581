// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Scheduled Driver (spec.md §4.D): a periodic tick over every owned
//! `AuthenticationProvider` binding, sharing one IdP snapshot per tick.

mod health;
mod partition;

pub use health::{determine_health_state, HealthState, SchedulerHealthStatus};
pub use partition::{owns, partition_for};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dirsync_directory::{AuthenticationProviderId, DirectoryStore, ReconcileOptions, SyncReport};
use dirsync_idp_client::{IdpAdminClient, IdpClientConfig};
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

/// spec.md §4.D: "a cron-style task running at a 1-hour interval".
pub const TICK_INTERVAL: Duration = Duration::from_secs(3600);

/// spec.md §4.D: "Options per task run: attempts = 2".
const CONNECTIVITY_ATTEMPTS: u32 = 2;

/// spec.md §7: "logs ... up to the first 10 error strings".
const MAX_LOGGED_ERRORS: usize = 10;

const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Default)]
struct HealthInner {
	last_tick_at: Option<chrono::DateTime<Utc>>,
	last_tick_succeeded: Option<bool>,
	consecutive_tick_failures: u32,
}

pub struct SyncScheduler {
	store: Arc<dyn DirectoryStore>,
	idp_config: IdpClientConfig,
	replica_index: u32,
	replica_count: u32,
	batch_size: usize,
	health: Mutex<HealthInner>,
}

impl SyncScheduler {
	pub fn new(
		store: Arc<dyn DirectoryStore>,
		idp_config: IdpClientConfig,
		replica_index: u32,
		replica_count: u32,
	) -> Self {
		Self {
			store,
			idp_config,
			replica_index,
			replica_count,
			batch_size: DEFAULT_BATCH_SIZE,
			health: Mutex::new(HealthInner::default()),
		}
	}

	pub fn with_batch_size(mut self, batch_size: usize) -> Self {
		self.batch_size = batch_size;
		self
	}

	pub async fn health_status(&self) -> SchedulerHealthStatus {
		let inner = self.health.lock().await;
		SchedulerHealthStatus {
			status: determine_health_state(inner.consecutive_tick_failures),
			last_tick_at: inner.last_tick_at,
			last_tick_succeeded: inner.last_tick_succeeded,
			consecutive_tick_failures: inner.consecutive_tick_failures,
		}
	}

	async fn record_tick(&self, succeeded: bool) {
		let mut inner = self.health.lock().await;
		inner.last_tick_at = Some(Utc::now());
		inner.last_tick_succeeded = Some(succeeded);
		if succeeded {
			inner.consecutive_tick_failures = 0;
		} else {
			inner.consecutive_tick_failures += 1;
		}
	}

	/// Run one tick: enumerate owned bindings, fetch one shared snapshot, and
	/// reconcile every binding against it. A connectivity or fetch failure
	/// aborts the whole tick ("skip this tick"); a single binding's failure
	/// never aborts the others, since `reconcile` isolates it internally.
	#[instrument(skip(self), fields(replica_index = self.replica_index, replica_count = self.replica_count))]
	pub async fn run_tick(&self) -> Vec<(AuthenticationProviderId, SyncReport)> {
		let providers = match self.store.list_enabled_providers("oidc").await {
			Ok(providers) => providers,
			Err(e) => {
				error!(error = %e, "aborting tick: failed to enumerate authentication providers");
				self.record_tick(false).await;
				return Vec::new();
			}
		};

		let owned: Vec<_> = providers
			.into_iter()
			.filter(|p| owns(p.id, self.replica_index, self.replica_count))
			.collect();

		if owned.is_empty() {
			self.record_tick(true).await;
			return Vec::new();
		}

		let client = IdpAdminClient::new(self.idp_config.clone());

		let mut connected = false;
		for attempt in 1..=CONNECTIVITY_ATTEMPTS {
			if client.test_connection().await {
				connected = true;
				break;
			}
			warn!(attempt, "IdP connectivity probe failed");
		}
		if !connected {
			error!("aborting tick: IdP unreachable");
			self.record_tick(false).await;
			return Vec::new();
		}

		let raw_users = match client.fetch_enabled_users(self.batch_size).await {
			Ok(users) => users,
			Err(e) => {
				error!(error = %e, "aborting tick: failed to fetch user snapshot");
				self.record_tick(false).await;
				return Vec::new();
			}
		};

		let mut normalize_errors = Vec::new();
		let snapshot = dirsync_directory::normalize_snapshot(raw_users, &mut normalize_errors);
		if !normalize_errors.is_empty() {
			warn!(
				dropped = normalize_errors.len(),
				"some IdP records were dropped during normalization"
			);
		}

		let mut reports = Vec::with_capacity(owned.len());
		for provider in owned {
			let options = ReconcileOptions {
				default_group_id: provider.sync_default_group_id,
				default_group_name: provider.sync_default_group_name.clone(),
			};
			let report = dirsync_reconcile::reconcile(
				&*self.store,
				provider.team_id,
				provider.id,
				snapshot.clone(),
				options,
			)
			.await;
			log_report(provider.id, &report);
			reports.push((provider.id, report));
		}

		self.record_tick(true).await;
		reports
	}
}

fn log_report(provider_id: AuthenticationProviderId, report: &SyncReport) {
	info!(
		%provider_id,
		created = report.created,
		updated = report.updated,
		suspended = report.suspended,
		reactivated = report.reactivated,
		unchanged = report.unchanged,
		added_to_group = report.added_to_group,
		error_count = report.errors.len(),
		"binding reconciled"
	);
	for message in report.errors.iter().take(MAX_LOGGED_ERRORS) {
		warn!(%provider_id, message);
	}
}

#[cfg(test)]
mod tests;

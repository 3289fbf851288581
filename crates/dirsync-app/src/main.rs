// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::sync::Arc;

use dirsync_config::DirectorySyncConfig;
use dirsync_directory::DirectoryStore;
use dirsync_directory_sqlite::{create_pool, SqliteDirectoryStore};
use dirsync_idp_client::IdpClientConfig;
use dirsync_scheduler::{SyncScheduler, TICK_INTERVAL};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	tracing_subscriber::fmt()
		.with_env_filter(
			EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dirsync=info,warn")),
		)
		.init();

	let config = DirectorySyncConfig::from_env()?;
	if !config.enabled {
		warn!("OIDC_SYNC_ENABLED is false, exiting without starting the scheduler");
		return Ok(());
	}

	let database_url =
		env::var("DIRSYNC_DATABASE_URL").unwrap_or_else(|_| "sqlite://dirsync.db".to_string());
	let replica_index: u32 = env::var("DIRSYNC_REPLICA_INDEX")
		.ok()
		.and_then(|v| v.parse().ok())
		.unwrap_or(0);
	let replica_count: u32 = env::var("DIRSYNC_REPLICA_COUNT")
		.ok()
		.and_then(|v| v.parse().ok())
		.unwrap_or(1);

	info!(%database_url, replica_index, replica_count, "starting directory sync");

	let pool = create_pool(&database_url).await?;
	let store: Arc<dyn DirectoryStore> = Arc::new(SqliteDirectoryStore::new(pool));

	let idp_config = IdpClientConfig {
		admin_url: config.admin_url,
		realm: config.realm,
		client_id: config.client_id,
		client_secret: config.client_secret,
	};

	let scheduler = SyncScheduler::new(store, idp_config, replica_index, replica_count);

	loop {
		let reports = scheduler.run_tick().await;
		info!(bindings = reports.len(), "tick finished");
		tokio::time::sleep(TICK_INTERVAL).await;
	}
}

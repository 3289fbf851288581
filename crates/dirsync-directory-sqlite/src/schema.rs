// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Table definitions (spec.md §3 / SPEC_FULL.md §3), created idempotently at
//! startup rather than through a separate migration runner.

use sqlx::SqlitePool;

use crate::error::map_err;

pub async fn create_tables(pool: &SqlitePool) -> Result<(), dirsync_directory::DirectoryError> {
	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS teams (
			id TEXT PRIMARY KEY,
			default_user_role TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.map_err(map_err)?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS authentication_providers (
			id TEXT PRIMARY KEY,
			team_id TEXT NOT NULL,
			provider_name TEXT NOT NULL,
			enabled INTEGER NOT NULL,
			sync_default_group_id TEXT,
			sync_default_group_name TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.map_err(map_err)?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS users (
			id TEXT PRIMARY KEY,
			team_id TEXT NOT NULL,
			email TEXT NOT NULL,
			email_lower TEXT NOT NULL,
			name TEXT NOT NULL,
			avatar_url TEXT,
			role TEXT NOT NULL,
			suspended_at TEXT,
			suspended_by_id TEXT,
			last_active_at TEXT,
			created_at TEXT NOT NULL,
			updated_at TEXT NOT NULL,
			UNIQUE (team_id, email_lower)
		)
		"#,
	)
	.execute(pool)
	.await
	.map_err(map_err)?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS user_authentications (
			id TEXT PRIMARY KEY,
			authentication_provider_id TEXT NOT NULL,
			user_id TEXT NOT NULL,
			provider_id TEXT NOT NULL,
			created_at TEXT NOT NULL,
			UNIQUE (authentication_provider_id, provider_id)
		)
		"#,
	)
	.execute(pool)
	.await
	.map_err(map_err)?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS groups (
			id TEXT PRIMARY KEY,
			team_id TEXT NOT NULL,
			name TEXT NOT NULL
		)
		"#,
	)
	.execute(pool)
	.await
	.map_err(map_err)?;

	sqlx::query(
		r#"
		CREATE TABLE IF NOT EXISTS group_users (
			group_id TEXT NOT NULL,
			user_id TEXT NOT NULL,
			permission TEXT NOT NULL,
			created_at TEXT NOT NULL,
			PRIMARY KEY (group_id, user_id)
		)
		"#,
	)
	.execute(pool)
	.await
	.map_err(map_err)?;

	Ok(())
}

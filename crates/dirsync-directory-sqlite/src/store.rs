// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! `SqliteDirectoryStore`: a `sqlx`-backed `DirectoryStore`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dirsync_directory::{
	AuthenticationProvider, AuthenticationProviderId, DirectoryError, DirectoryStore,
	DirectoryTransaction, Group, GroupId, GroupPermission, Result, Role, Team, TeamId,
	User, UserAuthentication, UserAuthenticationId, UserId, UserUpdate,
};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqliteSynchronous};
use sqlx::{Row, Sqlite, SqlitePool, Transaction};
use std::str::FromStr;

use crate::error::map_err;
use crate::schema::create_tables;

/// Create a pool with WAL mode enabled and run the (idempotent) schema setup.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DirectoryError::Internal(format!("invalid database URL: {e}")))?
		.journal_mode(SqliteJournalMode::Wal)
		.synchronous(SqliteSynchronous::Normal)
		.create_if_missing(true);

	let pool = SqlitePool::connect_with(options).await.map_err(map_err)?;
	create_tables(&pool).await?;

	tracing::debug!("directory store pool created");
	Ok(pool)
}

#[derive(Clone)]
pub struct SqliteDirectoryStore {
	pool: SqlitePool,
}

impl SqliteDirectoryStore {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[cfg(test)]
	pub(crate) fn pool_for_tests(&self) -> SqlitePool {
		self.pool.clone()
	}
}

fn role_to_str(role: Role) -> &'static str {
	match role {
		Role::Admin => "admin",
		Role::Member => "member",
		Role::Viewer => "viewer",
	}
}

fn role_from_str(s: &str) -> Role {
	match s {
		"admin" => Role::Admin,
		"viewer" => Role::Viewer,
		_ => Role::Member,
	}
}

fn permission_to_str(p: GroupPermission) -> &'static str {
	match p {
		GroupPermission::Admin => "admin",
		GroupPermission::Member => "member",
	}
}

fn parse_ts(s: &str) -> DateTime<Utc> {
	DateTime::parse_from_rfc3339(s)
		.expect("stored timestamp is valid RFC3339")
		.with_timezone(&Utc)
}

fn row_to_team(row: &sqlx::sqlite::SqliteRow) -> Result<Team> {
	let id: String = row.try_get("id").map_err(map_err)?;
	let default_user_role: Option<String> = row.try_get("default_user_role").map_err(map_err)?;
	let created_at: String = row.try_get("created_at").map_err(map_err)?;
	let updated_at: String = row.try_get("updated_at").map_err(map_err)?;

	Ok(Team {
		id: TeamId::new(uuid::Uuid::parse_str(&id).map_err(|e| DirectoryError::Internal(e.to_string()))?),
		default_user_role: default_user_role.map(|r| role_from_str(&r)),
		created_at: parse_ts(&created_at),
		updated_at: parse_ts(&updated_at),
	})
}

fn row_to_provider(row: &sqlx::sqlite::SqliteRow) -> Result<AuthenticationProvider> {
	let id: String = row.try_get("id").map_err(map_err)?;
	let team_id: String = row.try_get("team_id").map_err(map_err)?;
	let sync_default_group_id: Option<String> =
		row.try_get("sync_default_group_id").map_err(map_err)?;

	Ok(AuthenticationProvider {
		id: AuthenticationProviderId::new(uuid::Uuid::parse_str(&id).map_err(|e| DirectoryError::Internal(e.to_string()))?),
		team_id: TeamId::new(uuid::Uuid::parse_str(&team_id).map_err(|e| DirectoryError::Internal(e.to_string()))?),
		provider_name: row.try_get("provider_name").map_err(map_err)?,
		enabled: row.try_get::<i64, _>("enabled").map_err(map_err)? != 0,
		sync_default_group_id: sync_default_group_id
			.map(|g| uuid::Uuid::parse_str(&g).map(GroupId::new))
			.transpose()
			.map_err(|e| DirectoryError::Internal(e.to_string()))?,
		sync_default_group_name: row.try_get("sync_default_group_name").map_err(map_err)?,
		created_at: parse_ts(&row.try_get::<String, _>("created_at").map_err(map_err)?),
		updated_at: parse_ts(&row.try_get::<String, _>("updated_at").map_err(map_err)?),
	})
}

fn row_to_user(row: &sqlx::sqlite::SqliteRow) -> Result<User> {
	let id: String = row.try_get("id").map_err(map_err)?;
	let team_id: String = row.try_get("team_id").map_err(map_err)?;
	let suspended_at: Option<String> = row.try_get("suspended_at").map_err(map_err)?;
	let suspended_by_id: Option<String> = row.try_get("suspended_by_id").map_err(map_err)?;
	let last_active_at: Option<String> = row.try_get("last_active_at").map_err(map_err)?;
	let role: String = row.try_get("role").map_err(map_err)?;

	Ok(User {
		id: UserId::new(uuid::Uuid::parse_str(&id).map_err(|e| DirectoryError::Internal(e.to_string()))?),
		team_id: TeamId::new(uuid::Uuid::parse_str(&team_id).map_err(|e| DirectoryError::Internal(e.to_string()))?),
		email: row.try_get("email").map_err(map_err)?,
		name: row.try_get("name").map_err(map_err)?,
		avatar_url: row.try_get("avatar_url").map_err(map_err)?,
		role: role_from_str(&role),
		suspended_at: suspended_at.as_deref().map(parse_ts),
		suspended_by_id: suspended_by_id
			.map(|s| uuid::Uuid::parse_str(&s).map(UserId::new))
			.transpose()
			.map_err(|e| DirectoryError::Internal(e.to_string()))?,
		last_active_at: last_active_at.as_deref().map(parse_ts),
		created_at: parse_ts(&row.try_get::<String, _>("created_at").map_err(map_err)?),
		updated_at: parse_ts(&row.try_get::<String, _>("updated_at").map_err(map_err)?),
	})
}

fn row_to_group(row: &sqlx::sqlite::SqliteRow) -> Result<Group> {
	let id: String = row.try_get("id").map_err(map_err)?;
	let team_id: String = row.try_get("team_id").map_err(map_err)?;

	Ok(Group {
		id: GroupId::new(uuid::Uuid::parse_str(&id).map_err(|e| DirectoryError::Internal(e.to_string()))?),
		team_id: TeamId::new(uuid::Uuid::parse_str(&team_id).map_err(|e| DirectoryError::Internal(e.to_string()))?),
		name: row.try_get("name").map_err(map_err)?,
	})
}

#[async_trait]
impl DirectoryStore for SqliteDirectoryStore {
	async fn find_team(&self, id: TeamId) -> Result<Option<Team>> {
		let row = sqlx::query("SELECT * FROM teams WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await
			.map_err(map_err)?;
		row.as_ref().map(row_to_team).transpose()
	}

	async fn find_auth_provider(&self, id: AuthenticationProviderId) -> Result<Option<AuthenticationProvider>> {
		let row = sqlx::query("SELECT * FROM authentication_providers WHERE id = ?")
			.bind(id.to_string())
			.fetch_optional(&self.pool)
			.await
			.map_err(map_err)?;
		row.as_ref().map(row_to_provider).transpose()
	}

	async fn find_group_by_id_in_team(&self, team_id: TeamId, group_id: GroupId) -> Result<Option<Group>> {
		let row = sqlx::query("SELECT * FROM groups WHERE team_id = ? AND id = ?")
			.bind(team_id.to_string())
			.bind(group_id.to_string())
			.fetch_optional(&self.pool)
			.await
			.map_err(map_err)?;
		row.as_ref().map(row_to_group).transpose()
	}

	async fn find_group_by_name_in_team(&self, team_id: TeamId, name: &str) -> Result<Option<Group>> {
		let row = sqlx::query("SELECT * FROM groups WHERE team_id = ? AND name = ?")
			.bind(team_id.to_string())
			.bind(name)
			.fetch_optional(&self.pool)
			.await
			.map_err(map_err)?;
		row.as_ref().map(row_to_group).transpose()
	}

	async fn find_user_by_email_ci(&self, team_id: TeamId, email: &str) -> Result<Option<User>> {
		let row = sqlx::query("SELECT * FROM users WHERE team_id = ? AND email_lower = ?")
			.bind(team_id.to_string())
			.bind(email.to_lowercase())
			.fetch_optional(&self.pool)
			.await
			.map_err(map_err)?;
		row.as_ref().map(row_to_user).transpose()
	}

	async fn list_enabled_providers(&self, provider_name: &str) -> Result<Vec<AuthenticationProvider>> {
		let rows = sqlx::query("SELECT * FROM authentication_providers WHERE provider_name = ? AND enabled = 1")
			.bind(provider_name)
			.fetch_all(&self.pool)
			.await
			.map_err(map_err)?;
		rows.iter().map(row_to_provider).collect()
	}

	async fn find_authentications_by_provider(
		&self,
		authentication_provider_id: AuthenticationProviderId,
	) -> Result<Vec<(UserAuthentication, User)>> {
		let rows = sqlx::query(
			r#"
			SELECT ua.id AS id, ua.authentication_provider_id AS authentication_provider_id,
			       ua.user_id AS user_id, ua.provider_id AS provider_id, ua.created_at AS created_at,
			       u.id AS u_id, u.team_id AS u_team_id, u.email AS u_email, u.name AS u_name,
			       u.avatar_url AS u_avatar_url, u.role AS u_role, u.suspended_at AS u_suspended_at,
			       u.suspended_by_id AS u_suspended_by_id, u.last_active_at AS u_last_active_at,
			       u.created_at AS u_created_at, u.updated_at AS u_updated_at
			FROM user_authentications ua
			JOIN authentication_providers p ON p.id = ua.authentication_provider_id
			JOIN users u ON u.id = ua.user_id AND u.team_id = p.team_id
			WHERE ua.authentication_provider_id = ?
			"#,
		)
		.bind(authentication_provider_id.to_string())
		.fetch_all(&self.pool)
		.await
		.map_err(map_err)?;

		rows.iter()
			.map(|row| {
				let auth = UserAuthentication {
					id: UserAuthenticationId::new(
						uuid::Uuid::parse_str(&row.try_get::<String, _>("id").map_err(map_err)?)
							.map_err(|e| DirectoryError::Internal(e.to_string()))?,
					),
					authentication_provider_id,
					user_id: UserId::new(
						uuid::Uuid::parse_str(&row.try_get::<String, _>("user_id").map_err(map_err)?)
							.map_err(|e| DirectoryError::Internal(e.to_string()))?,
					),
					provider_id: row.try_get("provider_id").map_err(map_err)?,
					created_at: parse_ts(&row.try_get::<String, _>("created_at").map_err(map_err)?),
				};
				let user = User {
					id: UserId::new(
						uuid::Uuid::parse_str(&row.try_get::<String, _>("u_id").map_err(map_err)?)
							.map_err(|e| DirectoryError::Internal(e.to_string()))?,
					),
					team_id: TeamId::new(
						uuid::Uuid::parse_str(&row.try_get::<String, _>("u_team_id").map_err(map_err)?)
							.map_err(|e| DirectoryError::Internal(e.to_string()))?,
					),
					email: row.try_get("u_email").map_err(map_err)?,
					name: row.try_get("u_name").map_err(map_err)?,
					avatar_url: row.try_get("u_avatar_url").map_err(map_err)?,
					role: role_from_str(&row.try_get::<String, _>("u_role").map_err(map_err)?),
					suspended_at: row
						.try_get::<Option<String>, _>("u_suspended_at")
						.map_err(map_err)?
						.as_deref()
						.map(parse_ts),
					suspended_by_id: row
						.try_get::<Option<String>, _>("u_suspended_by_id")
						.map_err(map_err)?
						.map(|s| uuid::Uuid::parse_str(&s).map(UserId::new))
						.transpose()
						.map_err(|e| DirectoryError::Internal(e.to_string()))?,
					last_active_at: row
						.try_get::<Option<String>, _>("u_last_active_at")
						.map_err(map_err)?
						.as_deref()
						.map(parse_ts),
					created_at: parse_ts(&row.try_get::<String, _>("u_created_at").map_err(map_err)?),
					updated_at: parse_ts(&row.try_get::<String, _>("u_updated_at").map_err(map_err)?),
				};
				Ok((auth, user))
			})
			.collect()
	}

	async fn begin_transaction(&self) -> Result<Box<dyn DirectoryTransaction>> {
		let tx = self.pool.begin().await.map_err(map_err)?;
		Ok(Box::new(SqliteDirectoryTransaction { tx }))
	}
}

pub struct SqliteDirectoryTransaction {
	tx: Transaction<'static, Sqlite>,
}

#[async_trait]
impl DirectoryTransaction for SqliteDirectoryTransaction {
	async fn create_user(
		&mut self,
		team_id: TeamId,
		email: &str,
		name: &str,
		role: Role,
		avatar_url: Option<&str>,
	) -> Result<User> {
		let now = Utc::now();
		let user = User {
			id: UserId::generate(),
			team_id,
			email: email.to_string(),
			name: name.to_string(),
			avatar_url: avatar_url.map(str::to_string),
			role,
			suspended_at: None,
			suspended_by_id: None,
			last_active_at: None,
			created_at: now,
			updated_at: now,
		};

		sqlx::query(
			r#"
			INSERT INTO users (id, team_id, email, email_lower, name, avatar_url, role,
			                    suspended_at, suspended_by_id, last_active_at, created_at, updated_at)
			VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
			"#,
		)
		.bind(user.id.to_string())
		.bind(user.team_id.to_string())
		.bind(&user.email)
		.bind(user.email.to_lowercase())
		.bind(&user.name)
		.bind(&user.avatar_url)
		.bind(role_to_str(user.role))
		.bind(Option::<String>::None)
		.bind(Option::<String>::None)
		.bind(Option::<String>::None)
		.bind(user.created_at.to_rfc3339())
		.bind(user.updated_at.to_rfc3339())
		.execute(&mut *self.tx)
		.await
		.map_err(map_err)?;

		Ok(user)
	}

	async fn create_authentication(
		&mut self,
		authentication_provider_id: AuthenticationProviderId,
		user_id: UserId,
		provider_id: &str,
	) -> Result<UserAuthentication> {
		let auth = UserAuthentication {
			id: UserAuthenticationId::generate(),
			authentication_provider_id,
			user_id,
			provider_id: provider_id.to_string(),
			created_at: Utc::now(),
		};

		sqlx::query(
			r#"
			INSERT INTO user_authentications (id, authentication_provider_id, user_id, provider_id, created_at)
			VALUES (?, ?, ?, ?, ?)
			"#,
		)
		.bind(auth.id.to_string())
		.bind(auth.authentication_provider_id.to_string())
		.bind(auth.user_id.to_string())
		.bind(&auth.provider_id)
		.bind(auth.created_at.to_rfc3339())
		.execute(&mut *self.tx)
		.await
		.map_err(map_err)?;

		Ok(auth)
	}

	async fn create_group_membership(
		&mut self,
		group_id: GroupId,
		user_id: UserId,
		permission: GroupPermission,
	) -> Result<()> {
		sqlx::query(
			r#"
			INSERT INTO group_users (group_id, user_id, permission, created_at)
			VALUES (?, ?, ?, ?)
			"#,
		)
		.bind(group_id.to_string())
		.bind(user_id.to_string())
		.bind(permission_to_str(permission))
		.bind(Utc::now().to_rfc3339())
		.execute(&mut *self.tx)
		.await
		.map_err(map_err)?;

		Ok(())
	}

	async fn update_user(&mut self, user_id: UserId, update: UserUpdate) -> Result<()> {
		if let Some(name) = &update.name {
			sqlx::query("UPDATE users SET name = ?, updated_at = ? WHERE id = ?")
				.bind(name)
				.bind(Utc::now().to_rfc3339())
				.bind(user_id.to_string())
				.execute(&mut *self.tx)
				.await
				.map_err(map_err)?;
		}
		if let Some(email) = &update.email {
			sqlx::query("UPDATE users SET email = ?, email_lower = ?, updated_at = ? WHERE id = ?")
				.bind(email)
				.bind(email.to_lowercase())
				.bind(Utc::now().to_rfc3339())
				.bind(user_id.to_string())
				.execute(&mut *self.tx)
				.await
				.map_err(map_err)?;
		}
		if let Some(avatar_url) = &update.avatar_url {
			sqlx::query("UPDATE users SET avatar_url = ?, updated_at = ? WHERE id = ?")
				.bind(avatar_url)
				.bind(Utc::now().to_rfc3339())
				.bind(user_id.to_string())
				.execute(&mut *self.tx)
				.await
				.map_err(map_err)?;
		}
		Ok(())
	}

	async fn suspend_user(&mut self, user_id: UserId, at: DateTime<Utc>) -> Result<()> {
		sqlx::query("UPDATE users SET suspended_at = ?, updated_at = ? WHERE id = ?")
			.bind(at.to_rfc3339())
			.bind(Utc::now().to_rfc3339())
			.bind(user_id.to_string())
			.execute(&mut *self.tx)
			.await
			.map_err(map_err)?;
		Ok(())
	}

	async fn clear_suspension(&mut self, user_id: UserId) -> Result<()> {
		sqlx::query(
			"UPDATE users SET suspended_at = NULL, suspended_by_id = NULL, updated_at = ? WHERE id = ?",
		)
		.bind(Utc::now().to_rfc3339())
		.bind(user_id.to_string())
		.execute(&mut *self.tx)
		.await
		.map_err(map_err)?;
		Ok(())
	}

	async fn commit(self: Box<Self>) -> Result<()> {
		self.tx.commit().await.map_err(map_err)
	}

	async fn rollback(self: Box<Self>) -> Result<()> {
		self.tx.rollback().await.map_err(map_err)
	}
}

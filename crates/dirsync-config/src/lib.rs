// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Environment-variable configuration for the directory sync engine
//! (spec.md §6 `OIDC_SYNC_*`).

use std::env;

use dirsync_secret::SecretString;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("missing environment variable: {0}")]
	MissingEnvVar(String),

	#[error("invalid value for {name}: {message}")]
	InvalidValue { name: String, message: String },
}

/// Configuration for the directory sync engine, loaded from `OIDC_SYNC_*`
/// environment variables.
#[derive(Debug, Clone)]
pub struct DirectorySyncConfig {
	pub enabled: bool,
	pub admin_url: String,
	pub realm: String,
	pub client_id: String,
	pub client_secret: SecretString,
}

impl DirectorySyncConfig {
	/// Load configuration from the environment.
	///
	/// `OIDC_SYNC_CLIENT_ID`/`OIDC_SYNC_CLIENT_SECRET` fall back to the
	/// primary OIDC credentials (`OIDC_CLIENT_ID`/`OIDC_CLIENT_SECRET`) when
	/// unset, per spec.md §6.
	///
	/// # Errors
	///
	/// Returns [`ConfigError::MissingEnvVar`] if `OIDC_SYNC_ADMIN_URL`,
	/// `OIDC_SYNC_REALM`, or both the sync-specific and primary OIDC client
	/// credentials are absent, and [`ConfigError::InvalidValue`] if
	/// `OIDC_SYNC_ENABLED` or `OIDC_SYNC_ADMIN_URL` cannot be parsed.
	pub fn from_env() -> Result<Self, ConfigError> {
		let enabled = match env::var("OIDC_SYNC_ENABLED") {
			Ok(value) => parse_bool("OIDC_SYNC_ENABLED", &value)?,
			Err(_) => false,
		};

		let admin_url =
			env::var("OIDC_SYNC_ADMIN_URL").map_err(|_| ConfigError::MissingEnvVar("OIDC_SYNC_ADMIN_URL".to_string()))?;
		validate_url("OIDC_SYNC_ADMIN_URL", &admin_url)?;
		if admin_url.ends_with('/') {
			return Err(ConfigError::InvalidValue {
				name: "OIDC_SYNC_ADMIN_URL".to_string(),
				message: "must not have a trailing slash".to_string(),
			});
		}

		let realm = env::var("OIDC_SYNC_REALM")
			.map_err(|_| ConfigError::MissingEnvVar("OIDC_SYNC_REALM".to_string()))?;

		let client_id = env::var("OIDC_SYNC_CLIENT_ID")
			.or_else(|_| env::var("OIDC_CLIENT_ID"))
			.map_err(|_| ConfigError::MissingEnvVar("OIDC_SYNC_CLIENT_ID".to_string()))?;

		let client_secret = env::var("OIDC_SYNC_CLIENT_SECRET")
			.or_else(|_| env::var("OIDC_CLIENT_SECRET"))
			.map_err(|_| ConfigError::MissingEnvVar("OIDC_SYNC_CLIENT_SECRET".to_string()))?;

		Ok(Self {
			enabled,
			admin_url,
			realm,
			client_id,
			client_secret: SecretString::new(client_secret),
		})
	}
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
	match value.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" => Ok(true),
		"0" | "false" | "no" | "" => Ok(false),
		_ => Err(ConfigError::InvalidValue {
			name: name.to_string(),
			message: format!("expected a boolean, got {value:?}"),
		}),
	}
}

fn validate_url(name: &str, value: &str) -> Result<(), ConfigError> {
	url::Url::parse(value).map_err(|e| ConfigError::InvalidValue {
		name: name.to_string(),
		message: e.to_string(),
	})?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Mutex;

	static ENV_LOCK: Mutex<()> = Mutex::new(());

	fn clear_env() {
		for key in [
			"OIDC_SYNC_ENABLED",
			"OIDC_SYNC_ADMIN_URL",
			"OIDC_SYNC_REALM",
			"OIDC_SYNC_CLIENT_ID",
			"OIDC_SYNC_CLIENT_SECRET",
			"OIDC_CLIENT_ID",
			"OIDC_CLIENT_SECRET",
		] {
			env::remove_var(key);
		}
	}

	#[test]
	fn missing_admin_url_is_reported() {
		let _guard = ENV_LOCK.lock().unwrap();
		clear_env();
		let err = DirectorySyncConfig::from_env().unwrap_err();
		assert!(matches!(err, ConfigError::MissingEnvVar(name) if name == "OIDC_SYNC_ADMIN_URL"));
	}

	#[test]
	fn trailing_slash_admin_url_is_rejected() {
		let _guard = ENV_LOCK.lock().unwrap();
		clear_env();
		env::set_var("OIDC_SYNC_ADMIN_URL", "https://idp.example.com/");
		env::set_var("OIDC_SYNC_REALM", "acme");
		env::set_var("OIDC_SYNC_CLIENT_ID", "id");
		env::set_var("OIDC_SYNC_CLIENT_SECRET", "secret");

		let err = DirectorySyncConfig::from_env().unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { name, .. } if name == "OIDC_SYNC_ADMIN_URL"));
		clear_env();
	}

	#[test]
	fn falls_back_to_primary_oidc_credentials() {
		let _guard = ENV_LOCK.lock().unwrap();
		clear_env();
		env::set_var("OIDC_SYNC_ADMIN_URL", "https://idp.example.com");
		env::set_var("OIDC_SYNC_REALM", "acme");
		env::set_var("OIDC_CLIENT_ID", "primary-id");
		env::set_var("OIDC_CLIENT_SECRET", "primary-secret");

		let config = DirectorySyncConfig::from_env().unwrap();
		assert_eq!(config.client_id, "primary-id");
		assert_eq!(config.client_secret.expose(), "primary-secret");
		clear_env();
	}

	#[test]
	fn enabled_flag_parses_common_boolean_spellings() {
		assert!(parse_bool("x", "true").unwrap());
		assert!(parse_bool("x", "1").unwrap());
		assert!(!parse_bool("x", "false").unwrap());
		assert!(!parse_bool("x", "0").unwrap());
		assert!(parse_bool("x", "bogus").is_err());
	}
}

// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! IdP Admin Client (spec.md §4.A): client-credentials token acquisition with
//! cached expiry, paginated enabled-user listing, and a connectivity probe.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dirsync_directory::RawIdpUser;
use dirsync_secret::SecretString;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

/// Safety margin subtracted from a token's reported `expires_in` before it is
/// considered stale, so a call started just before real expiry never races
/// the IdP's clock.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Hard stop on pagination: protects against a misbehaving IdP returning an
/// endless sequence of full pages.
const MAX_USERS: usize = 100_000;

// =============================================================================
// Configuration
// =============================================================================

#[derive(Debug, Clone)]
pub struct IdpClientConfig {
	pub admin_url: String,
	pub realm: String,
	pub client_id: String,
	pub client_secret: SecretString,
}

// =============================================================================
// Errors
// =============================================================================

/// Raised when the IdP rejects the client's credentials or bearer token.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
	#[error("IdP rejected credentials: {0}")]
	Unauthorized(String),

	#[error("IdP denied access: {0}")]
	Forbidden(String),
}

/// Any other transport or protocol failure.
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
	#[error("HTTP request failed: {0}")]
	Http(#[from] reqwest::Error),

	#[error("failed to parse response: {0}")]
	Parse(String),

	#[error("IdP returned an error response: {0}")]
	IdpError(String),
}

/// The union of everything a client call can fail with. The caller (the
/// scheduled driver) treats any variant as "skip this tick".
#[derive(Debug, thiserror::Error)]
pub enum IdpClientError {
	#[error(transparent)]
	Auth(#[from] AuthError),

	#[error(transparent)]
	Request(#[from] RequestError),
}

// =============================================================================
// Token cache
// =============================================================================

#[derive(Debug, Deserialize)]
struct TokenResponse {
	access_token: String,
	expires_in: u64,
	#[allow(dead_code)]
	token_type: String,
}

struct CachedToken {
	access_token: SecretString,
	expires_at: Instant,
}

impl CachedToken {
	fn is_fresh(&self) -> bool {
		Instant::now() < self.expires_at
	}
}

// =============================================================================
// Client
// =============================================================================

#[derive(Clone)]
pub struct IdpAdminClient {
	config: Arc<IdpClientConfig>,
	http: reqwest::Client,
	token: Arc<Mutex<Option<CachedToken>>>,
}

impl IdpAdminClient {
	#[instrument(skip_all, name = "IdpAdminClient::new", fields(realm = %config.realm))]
	pub fn new(config: IdpClientConfig) -> Self {
		let http = reqwest::Client::builder()
			.build()
			.expect("failed to build HTTP client");

		Self {
			config: Arc::new(config),
			http,
			token: Arc::new(Mutex::new(None)),
		}
	}

	fn token_url(&self) -> String {
		format!(
			"{}/realms/{}/protocol/openid-connect/token",
			self.config.admin_url, self.config.realm
		)
	}

	fn users_url(&self, first: usize, max: usize) -> String {
		format!(
			"{}/admin/realms/{}/users?first={first}&max={max}&enabled=true",
			self.config.admin_url, self.config.realm
		)
	}

	fn count_url(&self) -> String {
		format!(
			"{}/admin/realms/{}/users/count?enabled=true",
			self.config.admin_url, self.config.realm
		)
	}

	/// Invalidate the cached token, forcing the next call to re-authenticate.
	async fn invalidate_token(&self) {
		*self.token.lock().await = None;
	}

	#[instrument(skip(self), name = "IdpAdminClient::authenticate")]
	async fn authenticate(&self) -> Result<SecretString, IdpClientError> {
		debug!("requesting new access token");

		let response = self
			.http
			.post(self.token_url())
			.header("Content-Type", "application/x-www-form-urlencoded")
			.form(&[
				("client_id", self.config.client_id.as_str()),
				(
					"client_secret",
					self.config.client_secret.expose(),
				),
				("grant_type", "client_credentials"),
			])
			.send()
			.await
			.map_err(RequestError::from)?;

		let status = response.status();
		if status.as_u16() == 401 || status.as_u16() == 403 {
			let body = response.text().await.unwrap_or_default();
			return Err(AuthError::Unauthorized(body).into());
		}
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(RequestError::IdpError(format!("token request failed: {body}")).into());
		}

		let body: TokenResponse = response
			.json()
			.await
			.map_err(|e| RequestError::Parse(format!("invalid token response: {e}")))?;

		let expires_at = Instant::now()
			+ Duration::from_secs(body.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);

		let token = SecretString::new(body.access_token);

		*self.token.lock().await = Some(CachedToken {
			access_token: token.clone(),
			expires_at,
		});

		Ok(token)
	}

	/// Return a valid bearer token, reusing the cache when it is still fresh.
	async fn current_token(&self) -> Result<SecretString, IdpClientError> {
		{
			let cached = self.token.lock().await;
			if let Some(token) = cached.as_ref() {
				if token.is_fresh() {
					return Ok(token.access_token.clone());
				}
			}
		}
		self.authenticate().await
	}

	/// Perform a single admin GET, re-authenticating once on a 401/403 and
	/// retrying before surfacing a typed error.
	async fn admin_get(&self, url: &str) -> Result<reqwest::Response, IdpClientError> {
		let token = self.current_token().await?;

		let response = self
			.http
			.get(url)
			.header("Authorization", format!("Bearer {}", token.expose()))
			.header("Content-Type", "application/json")
			.send()
			.await
			.map_err(RequestError::from)?;

		if response.status().as_u16() == 401 || response.status().as_u16() == 403 {
			warn!(status = %response.status(), "admin call unauthorized, re-authenticating once");
			self.invalidate_token().await;
			let token = self.current_token().await?;

			let retried = self
				.http
				.get(url)
				.header("Authorization", format!("Bearer {}", token.expose()))
				.header("Content-Type", "application/json")
				.send()
				.await
				.map_err(RequestError::from)?;

			if retried.status().as_u16() == 401 || retried.status().as_u16() == 403 {
				let status = retried.status();
				let body = retried.text().await.unwrap_or_default();
				return Err(AuthError::Forbidden(format!("{status}: {body}")).into());
			}
			return Ok(retried);
		}

		Ok(response)
	}

	/// Page through `GET .../users` until a short page is returned or the
	/// hard stop is hit. Returns every enabled user seen.
	#[instrument(skip(self), fields(batch_size))]
	pub async fn fetch_enabled_users(
		&self,
		batch_size: usize,
	) -> Result<Vec<RawIdpUser>, IdpClientError> {
		let mut users = Vec::new();
		let mut first = 0;

		loop {
			let url = self.users_url(first, batch_size);
			let response = self.admin_get(&url).await?;

			if !response.status().is_success() {
				let status = response.status();
				let body = response.text().await.unwrap_or_default();
				return Err(RequestError::IdpError(format!("{status}: {body}")).into());
			}

			let page: Vec<RawIdpUser> = response
				.json()
				.await
				.map_err(|e| RequestError::Parse(format!("invalid user page: {e}")))?;

			debug!(first, page_len = page.len(), "fetched user page");

			let page_len = page.len();
			users.extend(page);

			if page_len < batch_size || users.len() >= MAX_USERS {
				if users.len() >= MAX_USERS {
					warn!(count = users.len(), "hit hard stop while paginating users");
					users.truncate(MAX_USERS);
				}
				break;
			}

			first += batch_size;
		}

		Ok(users)
	}

	/// Connectivity probe: never returns an `Err`, collapsing any failure to
	/// `false`.
	#[instrument(skip(self))]
	pub async fn test_connection(&self) -> bool {
		match self.admin_get(&self.count_url()).await {
			Ok(response) if response.status().is_success() => true,
			Ok(response) => {
				warn!(status = %response.status(), "connectivity probe returned non-success");
				false
			}
			Err(err) => {
				warn!(error = %err, "connectivity probe failed");
				false
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config() -> IdpClientConfig {
		IdpClientConfig {
			admin_url: "https://idp.example.com".to_string(),
			realm: "acme".to_string(),
			client_id: "sync-client".to_string(),
			client_secret: SecretString::new("shh"),
		}
	}

	#[test]
	fn cached_token_is_fresh_before_expiry() {
		let token = CachedToken {
			access_token: SecretString::new("abc"),
			expires_at: Instant::now() + Duration::from_secs(30),
		};
		assert!(token.is_fresh());
	}

	#[test]
	fn cached_token_is_stale_after_expiry() {
		let token = CachedToken {
			access_token: SecretString::new("abc"),
			expires_at: Instant::now() - Duration::from_secs(1),
		};
		assert!(!token.is_fresh());
	}

	#[test]
	fn expiry_margin_shortens_a_short_lived_token_to_now() {
		// expires_in of 30s is entirely eaten by the 60s margin: the token
		// must be treated as already stale, never as fresh-for-negative-time.
		let expires_at =
			Instant::now() + Duration::from_secs(30).saturating_sub(TOKEN_EXPIRY_MARGIN);
		let token = CachedToken {
			access_token: SecretString::new("abc"),
			expires_at,
		};
		assert!(!token.is_fresh());
	}

	#[test]
	fn token_url_and_users_url_are_well_formed() {
		let client = IdpAdminClient::new(config());
		assert_eq!(
			client.token_url(),
			"https://idp.example.com/realms/acme/protocol/openid-connect/token"
		);
		assert_eq!(
			client.users_url(200, 100),
			"https://idp.example.com/admin/realms/acme/users?first=200&max=100&enabled=true"
		);
		assert_eq!(
			client.count_url(),
			"https://idp.example.com/admin/realms/acme/users/count?enabled=true"
		);
	}

	#[tokio::test]
	async fn invalidate_token_clears_cache() {
		let client = IdpAdminClient::new(config());
		*client.token.lock().await = Some(CachedToken {
			access_token: SecretString::new("abc"),
			expires_at: Instant::now() + Duration::from_secs(300),
		});
		client.invalidate_token().await;
		assert!(client.token.lock().await.is_none());
	}

	fn raw_user(id: &str) -> RawIdpUser {
		RawIdpUser {
			id: id.to_string(),
			username: None,
			email: Some(format!("{id}@example.com")),
			first_name: None,
			last_name: None,
			enabled: true,
			avatar_url: None,
		}
	}

	async fn mock_server_client(server: &wiremock::MockServer) -> IdpAdminClient {
		IdpAdminClient::new(IdpClientConfig {
			admin_url: server.uri(),
			realm: "acme".to_string(),
			client_id: "sync-client".to_string(),
			client_secret: SecretString::new("shh"),
		})
	}

	async fn mock_token(server: &wiremock::MockServer) {
		use wiremock::matchers::{method, path};
		use wiremock::{Mock, ResponseTemplate};

		Mock::given(method("POST"))
			.and(path("/realms/acme/protocol/openid-connect/token"))
			.respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
				"access_token": "tok-1",
				"expires_in": 300,
				"token_type": "Bearer",
			})))
			.mount(server)
			.await;
	}

	#[tokio::test]
	async fn admin_get_reauthenticates_once_after_401() {
		use wiremock::matchers::{method, path};
		use wiremock::{Mock, MockServer, ResponseTemplate};

		let server = MockServer::start().await;
		mock_token(&server).await;

		// First call to the count endpoint is rejected; the retry after
		// re-authentication succeeds.
		Mock::given(method("GET"))
			.and(path("/admin/realms/acme/users/count"))
			.respond_with(ResponseTemplate::new(401))
			.up_to_n_times(1)
			.mount(&server)
			.await;
		Mock::given(method("GET"))
			.and(path("/admin/realms/acme/users/count"))
			.respond_with(ResponseTemplate::new(200).set_body_string("3"))
			.mount(&server)
			.await;

		let client = mock_server_client(&server).await;
		assert!(client.test_connection().await);
	}

	#[tokio::test]
	async fn admin_get_fails_when_retry_is_also_unauthorized() {
		use wiremock::matchers::{method, path};
		use wiremock::{Mock, MockServer, ResponseTemplate};

		let server = MockServer::start().await;
		mock_token(&server).await;

		Mock::given(method("GET"))
			.and(path("/admin/realms/acme/users/count"))
			.respond_with(ResponseTemplate::new(403))
			.mount(&server)
			.await;

		let client = mock_server_client(&server).await;
		assert!(!client.test_connection().await);
	}

	#[tokio::test]
	async fn fetch_enabled_users_stops_on_a_short_page() {
		use wiremock::matchers::{method, path};
		use wiremock::{Mock, MockServer, ResponseTemplate};

		let server = MockServer::start().await;
		mock_token(&server).await;

		// A page shorter than the requested batch size must end pagination
		// after one request, even though more pages could in principle exist.
		let short_page: Vec<RawIdpUser> = (0..2).map(|i| raw_user(&format!("u{i}"))).collect();
		Mock::given(method("GET"))
			.and(path("/admin/realms/acme/users"))
			.respond_with(ResponseTemplate::new(200).set_body_json(&short_page))
			.expect(1)
			.mount(&server)
			.await;

		let client = mock_server_client(&server).await;
		let users = client.fetch_enabled_users(5).await.unwrap();
		assert_eq!(users.len(), 2);
	}

	#[tokio::test]
	async fn fetch_enabled_users_truncates_at_the_hard_stop() {
		use wiremock::matchers::{method, path};
		use wiremock::{Mock, MockServer, ResponseTemplate};

		let server = MockServer::start().await;
		mock_token(&server).await;

		// A single full page at exactly MAX_USERS already trips the hard stop,
		// so pagination never has to run for real to exercise the truncation.
		let page: Vec<RawIdpUser> = (0..MAX_USERS).map(|i| raw_user(&format!("u{i}"))).collect();
		Mock::given(method("GET"))
			.and(path("/admin/realms/acme/users"))
			.respond_with(ResponseTemplate::new(200).set_body_json(&page))
			.mount(&server)
			.await;

		let client = mock_server_client(&server).await;
		let users = client.fetch_enabled_users(MAX_USERS).await.unwrap();
		assert_eq!(users.len(), MAX_USERS);
	}
}

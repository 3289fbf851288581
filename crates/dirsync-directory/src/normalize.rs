// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Snapshot Normalizer (spec.md §4.B): raw IdP records -> canonical `SyncUser`.

use crate::sync::{RawIdpUser, SyncUser};

/// Normalize a page of raw IdP users. Records without an email are dropped;
/// an error entry naming their `provider_id` is appended to `errors` instead
/// of panicking or silently discarding the row.
pub fn normalize_snapshot(raw: Vec<RawIdpUser>, errors: &mut Vec<String>) -> Vec<SyncUser> {
	raw.into_iter()
		.filter_map(|user| normalize_one(user, errors))
		.collect()
}

fn normalize_one(raw: RawIdpUser, errors: &mut Vec<String>) -> Option<SyncUser> {
	let email = raw.email.clone().unwrap_or_default();
	if email.is_empty() {
		errors.push(format!(
			"Skipping user {}: no email address",
			raw.id
		));
		return None;
	}

	let name = display_name(&raw);
	Some(SyncUser {
		provider_id: raw.id,
		email,
		name,
		avatar_url: raw.avatar_url,
	})
}

/// Display name composition order per spec.md §4.B:
/// "first last" if both present; else first; else last; else username;
/// else email; else "Unknown User".
fn display_name(raw: &RawIdpUser) -> String {
	match (raw.first_name.as_deref(), raw.last_name.as_deref()) {
		(Some(first), Some(last)) if !first.is_empty() && !last.is_empty() => {
			format!("{first} {last}")
		}
		(Some(first), _) if !first.is_empty() => first.to_string(),
		(_, Some(last)) if !last.is_empty() => last.to_string(),
		_ => match raw.username.as_deref() {
			Some(username) if !username.is_empty() => username.to_string(),
			_ => match raw.email.as_deref() {
				Some(email) if !email.is_empty() => email.to_string(),
				_ => "Unknown User".to_string(),
			},
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn raw(id: &str) -> RawIdpUser {
		RawIdpUser {
			id: id.to_string(),
			username: None,
			email: None,
			first_name: None,
			last_name: None,
			enabled: true,
			avatar_url: None,
		}
	}

	#[test]
	fn drops_user_without_email_and_records_error() {
		let mut errors = Vec::new();
		let users = normalize_snapshot(vec![raw("idp-1")], &mut errors);
		assert!(users.is_empty());
		assert_eq!(errors.len(), 1);
		assert!(errors[0].contains("idp-1"));
		assert!(errors[0].contains("no email"));
	}

	#[test]
	fn name_prefers_first_and_last() {
		let mut u = raw("idp-1");
		u.email = Some("a@x.com".to_string());
        u.first_name = Some("Ada".to_string());
        u.last_name = Some("Lovelace".to_string());
		u.username = Some("ada".to_string());
		let mut errors = Vec::new();
		let users = normalize_snapshot(vec![u], &mut errors);
		assert_eq!(users[0].name, "Ada Lovelace");
	}

	#[test]
	fn name_falls_back_to_first_only() {
		let mut u = raw("idp-1");
		u.email = Some("a@x.com".to_string());
		u.first_name = Some("Ada".to_string());
		let mut errors = Vec::new();
		let users = normalize_snapshot(vec![u], &mut errors);
		assert_eq!(users[0].name, "Ada");
	}

	#[test]
	fn name_falls_back_to_last_only() {
		let mut u = raw("idp-1");
		u.email = Some("a@x.com".to_string());
		u.last_name = Some("Lovelace".to_string());
		let mut errors = Vec::new();
		let users = normalize_snapshot(vec![u], &mut errors);
		assert_eq!(users[0].name, "Lovelace");
	}

	#[test]
	fn name_falls_back_to_username() {
		let mut u = raw("idp-1");
		u.email = Some("a@x.com".to_string());
		u.username = Some("ada".to_string());
		let mut errors = Vec::new();
		let users = normalize_snapshot(vec![u], &mut errors);
		assert_eq!(users[0].name, "ada");
	}

	#[test]
	fn name_falls_back_to_email() {
		let mut u = raw("idp-1");
		u.email = Some("a@x.com".to_string());
		let mut errors = Vec::new();
		let users = normalize_snapshot(vec![u], &mut errors);
		assert_eq!(users[0].name, "a@x.com");
	}

	#[test]
	fn name_falls_back_to_unknown_user_when_everything_blank() {
		// The engine never calls normalize on a record without an email (it's
		// dropped first), but the composition order itself is tested directly.
		let u = raw("idp-1");
		assert_eq!(display_name(&u), "Unknown User");
	}

	#[test]
	fn keeps_avatar_url_through_normalization() {
		let mut u = raw("idp-1");
		u.email = Some("a@x.com".to_string());
		u.avatar_url = Some("https://idp.example.com/avatar.png".to_string());
		let mut errors = Vec::new();
		let users = normalize_snapshot(vec![u], &mut errors);
		assert_eq!(
			users[0].avatar_url.as_deref(),
			Some("https://idp.example.com/avatar.png")
		);
	}
}

// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Core ID newtypes and small enums shared across the directory model.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! define_id_type {
	($name:ident, $doc:expr) => {
		#[doc = $doc]
		#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
		#[serde(transparent)]
		pub struct $name(Uuid);

		impl $name {
			pub fn new(id: Uuid) -> Self {
				Self(id)
			}

			pub fn generate() -> Self {
				Self(Uuid::new_v4())
			}

			pub fn into_inner(self) -> Uuid {
				self.0
			}

			pub fn as_uuid(&self) -> &Uuid {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}

		impl From<Uuid> for $name {
			fn from(id: Uuid) -> Self {
				Self(id)
			}
		}

		impl From<$name> for Uuid {
			fn from(id: $name) -> Self {
				id.0
			}
		}
	};
}

define_id_type!(TeamId, "Unique identifier for a team.");
define_id_type!(UserId, "Unique identifier for a user.");
define_id_type!(
	AuthenticationProviderId,
	"Unique identifier for a (team, provider-name) authentication binding."
);
define_id_type!(
	UserAuthenticationId,
	"Unique identifier for a user/provider link."
);
define_id_type!(GroupId, "Unique identifier for a group.");

/// A user's role within a team. Newly created users default to `Member`
/// unless the team's `default_user_role` says otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
	Admin,
	#[default]
	Member,
	Viewer,
}

impl fmt::Display for Role {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Role::Admin => write!(f, "admin"),
			Role::Member => write!(f, "member"),
			Role::Viewer => write!(f, "viewer"),
		}
	}
}

/// A group member's permission level. Members added by the sync engine are
/// always `Member` (spec.md §4.C "Miss" branch).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupPermission {
	Admin,
	Member,
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn id_roundtrips_through_uuid() {
		let uuid = Uuid::new_v4();
		let id = TeamId::new(uuid);
		assert_eq!(id.into_inner(), uuid);
	}

	#[test]
	fn id_generates_unique_values() {
		assert_ne!(UserId::generate(), UserId::generate());
	}

	#[test]
	fn id_serializes_as_uuid_string() {
		let uuid = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
		let id = UserId::new(uuid);
		let json = serde_json::to_string(&id).unwrap();
		assert_eq!(json, "\"550e8400-e29b-41d4-a716-446655440000\"");
	}

	#[test]
	fn role_defaults_to_member() {
		assert_eq!(Role::default(), Role::Member);
	}

	#[test]
	fn role_serializes_snake_case() {
		assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
	}

	proptest! {
		/// Any UUID must survive a round trip through an ID newtype and its
		/// serde representation, regardless of which bits are set.
		#[test]
		fn id_roundtrips_for_any_uuid(high in any::<u64>(), low in any::<u64>()) {
			let uuid = Uuid::from_u64_pair(high, low);
			let id = UserId::new(uuid);
			prop_assert_eq!(id.into_inner(), uuid);

			let json = serde_json::to_string(&id).unwrap();
			let roundtripped: UserId = serde_json::from_str(&json).unwrap();
			prop_assert_eq!(roundtripped, id);
		}
	}
}

// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

use dirsync_directory::DirectoryError;

pub fn map_err(e: sqlx::Error) -> DirectoryError {
	if let sqlx::Error::Database(ref db_err) = e {
		if db_err.is_unique_violation() {
			return DirectoryError::Conflict(db_err.message().to_string());
		}
	}
	DirectoryError::Internal(e.to_string())
}

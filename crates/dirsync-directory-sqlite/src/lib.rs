// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! `sqlx`-backed implementation of `dirsync_directory::DirectoryStore`.

mod error;
mod schema;
mod store;

pub use schema::create_tables;
pub use store::{create_pool, SqliteDirectoryStore, SqliteDirectoryTransaction};

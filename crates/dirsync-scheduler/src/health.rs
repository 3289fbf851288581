// Copyright (c) 2026 Directory Sync Contributors. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Health snapshot scaffolding, grounded on the teacher's job-runner health
//! module. This reports the scheduler's own condition (can it reach the IdP
//! and complete ticks), not the content of any one binding's `SyncReport`.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
	Healthy,
	Degraded,
	Unhealthy,
}

#[derive(Debug, Clone, Serialize)]
pub struct SchedulerHealthStatus {
	pub status: HealthState,
	pub last_tick_at: Option<DateTime<Utc>>,
	pub last_tick_succeeded: Option<bool>,
	pub consecutive_tick_failures: u32,
}

pub fn determine_health_state(consecutive_tick_failures: u32) -> HealthState {
	match consecutive_tick_failures {
		0 => HealthState::Healthy,
		1..=2 => HealthState::Degraded,
		_ => HealthState::Unhealthy,
	}
}

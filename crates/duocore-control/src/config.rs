// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Tunable parameters of the hotplug policy.

use duocore_core::{CoreId, HotplugError, PRIMARY_CORE};
use serde::Deserialize;
use std::time::Duration;

/// Longest accepted sampling interval (one hour).
pub const MAX_SAMPLE_INTERVAL_MS: u64 = 3_600_000;

/// Largest accepted boost factor.
pub const MAX_BOOST_FACTOR: u32 = 64;

/// Configuration of the hotplug policy.
///
/// Deserialized from the daemon's TOML file; every field has a default so a
/// partial file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Normal delay between two decision cycles, in milliseconds.
    pub sample_interval_ms: u64,
    /// Multiplier applied to the normal delay after bringing the secondary core up.
    pub boost_factor: u32,
    /// Average load (percent) below which the secondary core is taken offline.
    pub load_threshold_low: u32,
    /// Average load (percent) above which the secondary core is brought online.
    pub load_threshold_high: u32,
    /// Whether the user lock is engaged at startup.
    pub initial_user_lock: bool,
    /// Whether autonomous hotplug is enabled at startup.
    pub initial_autonomous: bool,
    /// Whether the secondary core is pinned on at startup.
    pub initial_always_on: bool,
    /// Delay before the very first cycle, in milliseconds.
    pub startup_delay_ms: u64,
    /// The hot-pluggable core managed by the policy.
    pub secondary_core: u32,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 500,
            boost_factor: 4,
            load_threshold_low: 20,
            load_threshold_high: 60,
            initial_user_lock: false,
            initial_autonomous: true,
            initial_always_on: true,
            startup_delay_ms: 60_000,
            secondary_core: 1,
        }
    }
}

impl PolicyConfig {
    /// Normal re-check delay.
    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    /// Re-check delay used right after the secondary core came online.
    pub fn boosted_interval(&self) -> Duration {
        self.sample_interval().saturating_mul(self.boost_factor)
    }

    /// Delay before the first cycle.
    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }

    /// The secondary core as a [`CoreId`].
    pub fn secondary(&self) -> CoreId {
        CoreId(self.secondary_core)
    }

    /// Checks the invariants the decision engine relies on.
    pub fn validate(&self) -> Result<(), HotplugError> {
        check_sample_interval(self.sample_interval_ms)?;
        if !(1..=MAX_BOOST_FACTOR).contains(&self.boost_factor) {
            return Err(HotplugError::InvalidConfig(format!(
                "boost_factor ({}) must be between 1 and {MAX_BOOST_FACTOR}",
                self.boost_factor
            )));
        }
        check_thresholds(self.load_threshold_low, self.load_threshold_high)?;
        if self.secondary() == PRIMARY_CORE {
            return Err(HotplugError::InvalidConfig(format!(
                "secondary_core cannot be the primary core ({PRIMARY_CORE})"
            )));
        }
        Ok(())
    }
}

/// Validates a sampling interval in milliseconds.
pub fn check_sample_interval(millis: u64) -> Result<(), HotplugError> {
    if !(1..=MAX_SAMPLE_INTERVAL_MS).contains(&millis) {
        return Err(HotplugError::InvalidConfig(format!(
            "sample_interval_ms ({millis}) must be between 1 and {MAX_SAMPLE_INTERVAL_MS}"
        )));
    }
    Ok(())
}

/// Validates a low/high threshold pair.
pub fn check_thresholds(low: u32, high: u32) -> Result<(), HotplugError> {
    if high > 100 {
        return Err(HotplugError::InvalidConfig(format!(
            "load_threshold_high ({high}) must not exceed 100"
        )));
    }
    if low >= high {
        return Err(HotplugError::InvalidConfig(format!(
            "load_threshold_low ({low}) must be below load_threshold_high ({high})"
        )));
    }
    Ok(())
}

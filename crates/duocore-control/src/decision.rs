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

//! Hysteresis rule for the secondary core.
//!
//! The `DecisionEngine` compares the average load of all online cores against
//! two thresholds. Crossing the low threshold with the secondary core online
//! takes it down; crossing the high threshold with the core offline brings it
//! up and stretches the next re-check delay so a fresh core is not torn down
//! before the load settles.

use crate::config::PolicyConfig;
use std::time::Duration;

/// Re-check delay selected by the hysteresis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Delay {
    /// One sample interval.
    #[default]
    Normal,
    /// `boost_factor` sample intervals, used after scaling up.
    Boosted,
}

impl Delay {
    /// Resolves the delay against the current configuration.
    pub fn duration(self, config: &PolicyConfig) -> Duration {
        match self {
            Delay::Normal => config.sample_interval(),
            Delay::Boosted => config.boosted_interval(),
        }
    }
}

/// Power transition requested for the secondary core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Take the secondary core offline.
    Offline,
    /// Bring the secondary core online.
    Online,
    /// Leave it as it is.
    Hold,
}

/// Outcome of one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Requested transition.
    pub transition: Transition,
    /// Delay to apply once the transition succeeded; `None` keeps the current one.
    pub next_delay: Option<Delay>,
}

impl Decision {
    const HOLD: Decision = Decision {
        transition: Transition::Hold,
        next_delay: None,
    };
}

/// Evaluates the hysteresis rule.
pub struct DecisionEngine;

impl DecisionEngine {
    /// Decides what to do with the secondary core for one cycle.
    ///
    /// Rules are evaluated in order, first match wins:
    /// 1. `avg_load < low` and secondary online: go offline, normal delay.
    /// 2. `avg_load > high` and secondary offline: go online, boosted delay.
    /// 3. Otherwise hold and keep the current delay.
    pub fn evaluate(
        &self,
        avg_load: u32,
        secondary_online: bool,
        config: &PolicyConfig,
    ) -> Decision {
        if avg_load < config.load_threshold_low && secondary_online {
            Decision {
                transition: Transition::Offline,
                next_delay: Some(Delay::Normal),
            }
        } else if avg_load > config.load_threshold_high && !secondary_online {
            Decision {
                transition: Transition::Online,
                next_delay: Some(Delay::Boosted),
            }
        } else {
            Decision::HOLD
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PolicyConfig {
        PolicyConfig {
            load_threshold_low: 20,
            load_threshold_high: 60,
            ..Default::default()
        }
    }

    #[test]
    fn test_low_load_takes_secondary_offline() {
        let decision = DecisionEngine.evaluate(19, true, &config());
        assert_eq!(decision.transition, Transition::Offline);
        assert_eq!(decision.next_delay, Some(Delay::Normal));
    }

    #[test]
    fn test_high_load_brings_secondary_online() {
        let decision = DecisionEngine.evaluate(61, false, &config());
        assert_eq!(decision.transition, Transition::Online);
        assert_eq!(decision.next_delay, Some(Delay::Boosted));
    }

    #[test]
    fn test_transitions_are_idempotent() {
        assert_eq!(
            DecisionEngine.evaluate(5, false, &config()).transition,
            Transition::Hold
        );
        assert_eq!(
            DecisionEngine.evaluate(95, true, &config()).transition,
            Transition::Hold
        );
    }

    #[test]
    fn test_band_between_thresholds_holds() {
        for load in 20..=60 {
            for online in [true, false] {
                let decision = DecisionEngine.evaluate(load, online, &config());
                assert_eq!(decision, Decision::HOLD, "load {load} online {online}");
            }
        }
    }

    #[test]
    fn test_delay_durations() {
        let config = config();
        assert_eq!(Delay::Normal.duration(&config), config.sample_interval());
        assert_eq!(
            Delay::Boosted.duration(&config),
            config.sample_interval() * 4
        );
    }
}

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

//! Per-core load sampling from idle/wall counter deltas.

use duocore_core::{CoreId, CpuTimeSource, HotplugError};
use std::collections::BTreeMap;

/// Sampling baseline of one logical core.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoreLoadSample {
    /// Idle counter at the previous sample.
    pub previous_idle_time: u64,
    /// Wall counter at the previous sample.
    pub previous_wall_time: u64,
    /// Load computed at the previous valid sample (0 to 100).
    pub last_computed_load: u32,
}

/// Computes load percentages from successive counter readings.
///
/// Keeps one [`CoreLoadSample`] per core for the lifetime of the engine.
#[derive(Debug, Default)]
pub struct LoadSampler {
    samples: BTreeMap<CoreId, CoreLoadSample>,
}

impl LoadSampler {
    /// Creates a sampler with no baseline for any core.
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples `core` and returns its load over the window since the last call.
    ///
    /// The baseline is replaced with the current counters even when the
    /// window turns out to be invalid.
    pub fn sample(
        &mut self,
        core: CoreId,
        times: &dyn CpuTimeSource,
    ) -> Result<u32, HotplugError> {
        let current = times.idle_and_wall_time(core)?;
        let entry = self.samples.entry(core).or_default();

        let idle_delta = current.idle.saturating_sub(entry.previous_idle_time);
        let wall_delta = current.wall.saturating_sub(entry.previous_wall_time);
        entry.previous_idle_time = current.idle;
        entry.previous_wall_time = current.wall;

        if wall_delta == 0 || wall_delta < idle_delta {
            return Err(HotplugError::InvalidSample {
                core,
                idle_delta,
                wall_delta,
            });
        }

        let load = (100 * (wall_delta - idle_delta) / wall_delta) as u32;
        entry.last_computed_load = load;
        Ok(load)
    }

    /// Samples every core in `cores`, stopping at the first invalid window.
    pub fn sample_all(
        &mut self,
        cores: &[CoreId],
        times: &dyn CpuTimeSource,
    ) -> Result<Vec<u32>, HotplugError> {
        cores.iter().map(|&core| self.sample(core, times)).collect()
    }

    /// Returns the stored baseline of `core`, if it was ever sampled.
    pub fn baseline(&self, core: CoreId) -> Option<&CoreLoadSample> {
        self.samples.get(&core)
    }

    /// Returns the last valid load of every sampled core.
    pub fn last_loads(&self) -> Vec<(CoreId, u32)> {
        self.samples
            .iter()
            .map(|(core, sample)| (*core, sample.last_computed_load))
            .collect()
    }
}

/// Averages per-core loads with integer division.
///
/// Returns `None` when no core was sampled.
pub fn average_load(loads: &[u32]) -> Option<u32> {
    if loads.is_empty() {
        return None;
    }
    Some(loads.iter().sum::<u32>() / loads.len() as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use duocore_core::CpuTimes;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays a fixed sequence of readings per call.
    struct ScriptedTimes {
        readings: Mutex<VecDeque<CpuTimes>>,
    }

    impl ScriptedTimes {
        fn new(readings: &[(u64, u64)]) -> Self {
            Self {
                readings: Mutex::new(
                    readings
                        .iter()
                        .map(|&(idle, wall)| CpuTimes { idle, wall })
                        .collect(),
                ),
            }
        }
    }

    impl CpuTimeSource for ScriptedTimes {
        fn idle_and_wall_time(&self, core: CoreId) -> Result<CpuTimes, HotplugError> {
            self.readings.lock().unwrap().pop_front().ok_or_else(|| {
                HotplugError::collaborator(
                    core,
                    "idle_and_wall_time",
                    std::io::Error::other("script exhausted"),
                )
            })
        }
    }

    #[test]
    fn test_load_from_deltas() {
        let times = ScriptedTimes::new(&[(100, 1000), (130, 1100)]);
        let mut sampler = LoadSampler::new();
        // First window covers everything since boot: 900 busy out of 1000.
        assert_eq!(sampler.sample(CoreId(0), &times).unwrap(), 90);
        // Second window: 30 idle out of 100.
        assert_eq!(sampler.sample(CoreId(0), &times).unwrap(), 70);

        let baseline = sampler.baseline(CoreId(0)).unwrap();
        assert_eq!(baseline.previous_idle_time, 130);
        assert_eq!(baseline.previous_wall_time, 1100);
        assert_eq!(baseline.last_computed_load, 70);
    }

    #[test]
    fn test_anomaly_is_invalid_and_updates_baseline() {
        let times = ScriptedTimes::new(&[(0, 100), (300, 200), (310, 300)]);
        let mut sampler = LoadSampler::new();
        sampler.sample(CoreId(1), &times).unwrap();

        let err = sampler.sample(CoreId(1), &times).unwrap_err();
        assert!(matches!(
            err,
            HotplugError::InvalidSample {
                idle_delta: 300,
                wall_delta: 100,
                ..
            }
        ));
        // Baseline moved forward despite the error; the last valid load is kept.
        let baseline = sampler.baseline(CoreId(1)).unwrap();
        assert_eq!(baseline.previous_idle_time, 300);
        assert_eq!(baseline.previous_wall_time, 200);
        assert_eq!(baseline.last_computed_load, 100);

        // Next window is measured from the refreshed baseline.
        assert_eq!(sampler.sample(CoreId(1), &times).unwrap(), 90);
    }

    #[test]
    fn test_empty_window_is_invalid() {
        let times = ScriptedTimes::new(&[(10, 100), (10, 100)]);
        let mut sampler = LoadSampler::new();
        sampler.sample(CoreId(0), &times).unwrap();
        assert!(sampler.sample(CoreId(0), &times).is_err());
    }

    #[test]
    fn test_sample_all_fails_fast() {
        let times = ScriptedTimes::new(&[(50, 100), (500, 100)]);
        let mut sampler = LoadSampler::new();
        let result = sampler.sample_all(&[CoreId(0), CoreId(1)], &times);
        assert!(result.is_err());
        assert_eq!(sampler.baseline(CoreId(0)).unwrap().last_computed_load, 50);
    }

    #[test]
    fn test_average_load_integer_division() {
        assert_eq!(average_load(&[65, 40]), Some(52));
        assert_eq!(average_load(&[10]), Some(10));
        assert_eq!(average_load(&[]), None);
    }

    #[test]
    fn test_collaborator_failure_propagates() {
        let times = ScriptedTimes::new(&[]);
        let mut sampler = LoadSampler::new();
        let err = sampler.sample(CoreId(0), &times).unwrap_err();
        assert!(matches!(err, HotplugError::Collaborator { .. }));
        assert!(sampler.baseline(CoreId(0)).is_none());
    }
}

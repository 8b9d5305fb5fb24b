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

//! In-memory platform for tests and dry runs.

use duocore_core::{CoreId, CpuHotplug, CpuTimeSource, CpuTimes, HotplugError, PRIMARY_CORE};
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Length of one simulated sampling window, in counter units.
const WINDOW: u64 = 100;

#[derive(Debug, Default)]
struct SimCore {
    online: bool,
    load: u32,
    counters: CpuTimes,
    anomaly: bool,
}

#[derive(Debug, Default)]
struct SimState {
    cores: Vec<SimCore>,
    up_calls: usize,
    down_calls: usize,
    fail_next: bool,
}

/// A simulated multi-core platform.
///
/// Every read of a core's counters advances them by one window at the core's
/// configured load, so each decision cycle observes exactly the load set
/// before it. Offline cores are never read and their counters stay frozen.
#[derive(Debug)]
pub struct SimulatedPlatform {
    state: Mutex<SimState>,
}

impl SimulatedPlatform {
    /// Creates a platform with `core_count` cores, all online and idle.
    pub fn new(core_count: usize) -> Self {
        let cores = (0..core_count)
            .map(|_| SimCore {
                online: true,
                ..Default::default()
            })
            .collect();
        Self {
            state: Mutex::new(SimState {
                cores,
                ..Default::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Sets the online state directly, without counting a hotplug call.
    pub fn set_online(&self, core: CoreId, online: bool) {
        if let Some(c) = self.lock().cores.get_mut(core.index()) {
            c.online = online;
        }
    }

    /// Sets the load (percent, clamped to 100) of one core.
    pub fn set_load(&self, core: CoreId, load: u32) {
        if let Some(c) = self.lock().cores.get_mut(core.index()) {
            c.load = load.min(100);
        }
    }

    /// Sets the same load on every core.
    pub fn set_all_loads(&self, load: u32) {
        for c in &mut self.lock().cores {
            c.load = load.min(100);
        }
    }

    /// Makes the next read of `core` report more idle than wall time.
    pub fn inject_anomaly(&self, core: CoreId) {
        if let Some(c) = self.lock().cores.get_mut(core.index()) {
            c.anomaly = true;
        }
    }

    /// Makes the next `bring_up` or `take_down` call fail.
    pub fn fail_next_transition(&self) {
        self.lock().fail_next = true;
    }

    /// Number of `bring_up` calls received.
    pub fn up_calls(&self) -> usize {
        self.lock().up_calls
    }

    /// Number of `take_down` calls received.
    pub fn down_calls(&self) -> usize {
        self.lock().down_calls
    }

    fn transition(&self, core: CoreId, online: bool, op: &'static str) -> Result<(), HotplugError> {
        let mut state = self.lock();
        if online {
            state.up_calls += 1;
        } else {
            state.down_calls += 1;
        }
        if std::mem::take(&mut state.fail_next) {
            return Err(HotplugError::collaborator(
                core,
                op,
                io::Error::other("simulated failure"),
            ));
        }
        if !online && core == PRIMARY_CORE {
            return Err(HotplugError::collaborator(
                core,
                op,
                io::Error::new(io::ErrorKind::PermissionDenied, "primary core"),
            ));
        }
        match state.cores.get_mut(core.index()) {
            Some(c) => {
                c.online = online;
                Ok(())
            }
            None => Err(HotplugError::collaborator(
                core,
                op,
                io::Error::new(io::ErrorKind::NotFound, "no such core"),
            )),
        }
    }
}

impl CpuHotplug for SimulatedPlatform {
    fn is_online(&self, core: CoreId) -> bool {
        self.lock()
            .cores
            .get(core.index())
            .is_some_and(|c| c.online)
    }

    fn online_cores(&self) -> Vec<CoreId> {
        self.lock()
            .cores
            .iter()
            .enumerate()
            .filter(|(_, c)| c.online)
            .map(|(i, _)| CoreId(i as u32))
            .collect()
    }

    fn bring_up(&self, core: CoreId) -> Result<(), HotplugError> {
        self.transition(core, true, "cpu_up")
    }

    fn take_down(&self, core: CoreId) -> Result<(), HotplugError> {
        self.transition(core, false, "cpu_down")
    }
}

impl CpuTimeSource for SimulatedPlatform {
    fn idle_and_wall_time(&self, core: CoreId) -> Result<CpuTimes, HotplugError> {
        let mut state = self.lock();
        let Some(c) = state.cores.get_mut(core.index()).filter(|c| c.online) else {
            return Err(HotplugError::collaborator(
                core,
                "idle_and_wall_time",
                io::Error::new(io::ErrorKind::NotFound, "core is offline"),
            ));
        };
        if std::mem::take(&mut c.anomaly) {
            c.counters.idle += 2 * WINDOW;
        } else {
            c.counters.idle += WINDOW - u64::from(c.load);
        }
        c.counters.wall += WINDOW;
        Ok(c.counters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_advance_one_window() {
        let sim = SimulatedPlatform::new(2);
        sim.set_load(CoreId(0), 30);
        let first = sim.idle_and_wall_time(CoreId(0)).unwrap();
        let second = sim.idle_and_wall_time(CoreId(0)).unwrap();
        assert_eq!(second.wall - first.wall, 100);
        assert_eq!(second.idle - first.idle, 70);
    }

    #[test]
    fn test_offline_core_cannot_be_read() {
        let sim = SimulatedPlatform::new(2);
        sim.set_online(CoreId(1), false);
        assert!(sim.idle_and_wall_time(CoreId(1)).is_err());
        assert_eq!(sim.online_cores(), vec![CoreId(0)]);
    }

    #[test]
    fn test_transitions_are_counted() {
        let sim = SimulatedPlatform::new(2);
        sim.take_down(CoreId(1)).unwrap();
        assert!(!sim.is_online(CoreId(1)));
        sim.fail_next_transition();
        assert!(sim.bring_up(CoreId(1)).is_err());
        assert!(!sim.is_online(CoreId(1)));
        sim.bring_up(CoreId(1)).unwrap();
        assert_eq!(sim.up_calls(), 2);
        assert_eq!(sim.down_calls(), 1);
        assert!(sim.take_down(PRIMARY_CORE).is_err());
    }
}

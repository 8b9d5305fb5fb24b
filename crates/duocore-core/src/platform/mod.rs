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

//! Provides abstractions over the operating system's CPU control facilities.
//!
//! The policy never talks to the kernel directly. It consumes these traits, and
//! concrete implementations (sysfs, `/proc/stat`, simulation) live in
//! `duocore-infra`.

use crate::error::HotplugError;
use std::fmt;

/// Identifier of a logical CPU core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct CoreId(pub u32);

impl CoreId {
    /// Returns the zero-based index of the core.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for CoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cpu{}", self.0)
    }
}

/// The primary core. It is always online and hosts the sampling loop.
pub const PRIMARY_CORE: CoreId = CoreId(0);

/// Cumulative idle and wall-clock counters of one core.
///
/// Units are opaque (jiffies, microseconds...) but must be the same for both
/// fields and must increase monotonically while the core is online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CpuTimes {
    /// Total time spent idle.
    pub idle: u64,
    /// Total elapsed time.
    pub wall: u64,
}

/// Power-state control over logical cores.
///
/// `bring_up` and `take_down` may block while the kernel performs the actual
/// transition.
pub trait CpuHotplug: Send + Sync {
    /// Returns `true` if `core` is currently online.
    fn is_online(&self, core: CoreId) -> bool;

    /// Returns every online core, in ascending order.
    fn online_cores(&self) -> Vec<CoreId>;

    /// Brings `core` online.
    fn bring_up(&self, core: CoreId) -> Result<(), HotplugError>;

    /// Takes `core` offline.
    fn take_down(&self, core: CoreId) -> Result<(), HotplugError>;
}

/// Per-core idle/wall time accounting.
pub trait CpuTimeSource: Send + Sync {
    /// Reads the current cumulative counters of `core`.
    fn idle_and_wall_time(&self, core: CoreId) -> Result<CpuTimes, HotplugError>;
}

/// Pins the calling thread to a given core.
pub trait ThreadAffinity: Send + Sync {
    /// Restricts the current thread to run on `core` only.
    fn pin_current_thread(&self, core: CoreId) -> Result<(), HotplugError>;
}

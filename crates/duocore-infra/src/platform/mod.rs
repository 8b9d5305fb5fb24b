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

//! Platform collaborators.

#[cfg(target_os = "linux")]
mod affinity;
mod procfs;
mod simulated;
mod sysfs;

#[cfg(target_os = "linux")]
pub use affinity::SchedAffinity;
pub use procfs::{parse_core_times, ProcStatTimes, DEFAULT_PROC_STAT};
pub use simulated::SimulatedPlatform;
pub use sysfs::{parse_cpu_list, SysfsHotplug, DEFAULT_SYSFS_ROOT};

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

//! Per-core idle/wall accounting from `/proc/stat`.

use duocore_core::{CoreId, CpuTimeSource, CpuTimes, HotplugError};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Default location of the kernel statistics file.
pub const DEFAULT_PROC_STAT: &str = "/proc/stat";

/// Reads per-core counters (in clock ticks) from `/proc/stat`.
///
/// Idle time is `idle + iowait`; wall time is the sum of every non-guest
/// field, guest time being already accounted in `user` and `nice`.
#[derive(Debug, Clone)]
pub struct ProcStatTimes {
    path: PathBuf,
}

impl ProcStatTimes {
    /// Creates a reader for the given statistics file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Default for ProcStatTimes {
    fn default() -> Self {
        Self::new(DEFAULT_PROC_STAT)
    }
}

impl CpuTimeSource for ProcStatTimes {
    fn idle_and_wall_time(&self, core: CoreId) -> Result<CpuTimes, HotplugError> {
        const OP: &str = "idle_and_wall_time";
        let contents =
            fs::read_to_string(&self.path).map_err(|e| HotplugError::collaborator(core, OP, e))?;
        parse_core_times(&contents, core).ok_or_else(|| {
            HotplugError::collaborator(
                core,
                OP,
                io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("no usable '{core}' line in {}", self.path.display()),
                ),
            )
        })
    }
}

/// Extracts the counters of `core` from the contents of `/proc/stat`.
pub fn parse_core_times(contents: &str, core: CoreId) -> Option<CpuTimes> {
    let label = core.to_string();
    let line = contents
        .lines()
        .find(|line| line.split_whitespace().next() == Some(label.as_str()))?;

    let fields = line
        .split_whitespace()
        .skip(1)
        .take(8)
        .map(|f| f.parse::<u64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    // user nice system idle are always present; iowait and later are optional
    // on very old kernels.
    if fields.len() < 4 {
        return None;
    }

    let idle = fields[3] + fields.get(4).copied().unwrap_or(0);
    let wall: u64 = fields.iter().sum();
    Some(CpuTimes { idle, wall })
}

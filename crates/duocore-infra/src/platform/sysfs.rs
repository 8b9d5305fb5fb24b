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

//! Hotplug control through `/sys/devices/system/cpu`.

use duocore_core::{CoreId, CpuHotplug, HotplugError};
use std::fs;
use std::io;
use std::path::PathBuf;

/// Default location of the CPU sysfs directory.
pub const DEFAULT_SYSFS_ROOT: &str = "/sys/devices/system/cpu";

/// Brings cores up and down by writing their `online` attribute.
#[derive(Debug, Clone)]
pub struct SysfsHotplug {
    root: PathBuf,
}

impl SysfsHotplug {
    /// Creates a controller rooted at `root` (normally [`DEFAULT_SYSFS_ROOT`]).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn core_dir(&self, core: CoreId) -> PathBuf {
        self.root.join(format!("cpu{}", core.0))
    }

    fn write_online(&self, core: CoreId, value: &str, op: &'static str) -> Result<(), HotplugError> {
        let path = self.core_dir(core).join("online");
        fs::write(&path, value).map_err(|e| HotplugError::collaborator(core, op, e))?;
        log::debug!("Wrote '{}' to {}.", value, path.display());
        Ok(())
    }

    fn scan_cores(&self) -> io::Result<Vec<CoreId>> {
        let mut cores = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            if let Some(id) = name
                .to_str()
                .and_then(|n| n.strip_prefix("cpu"))
                .and_then(|n| n.parse::<u32>().ok())
            {
                cores.push(CoreId(id));
            }
        }
        cores.sort();
        Ok(cores)
    }
}

impl Default for SysfsHotplug {
    fn default() -> Self {
        Self::new(DEFAULT_SYSFS_ROOT)
    }
}

impl CpuHotplug for SysfsHotplug {
    fn is_online(&self, core: CoreId) -> bool {
        let dir = self.core_dir(core);
        match fs::read_to_string(dir.join("online")) {
            Ok(value) => value.trim() == "1",
            // Cores without an `online` attribute cannot be hot-unplugged.
            Err(e) if e.kind() == io::ErrorKind::NotFound => dir.is_dir(),
            Err(e) => {
                log::warn!("Cannot read the online state of {}: {}", core, e);
                false
            }
        }
    }

    fn online_cores(&self) -> Vec<CoreId> {
        if let Some(cores) = fs::read_to_string(self.root.join("online"))
            .ok()
            .and_then(|list| parse_cpu_list(&list))
        {
            return cores;
        }
        match self.scan_cores() {
            Ok(cores) => cores.into_iter().filter(|&c| self.is_online(c)).collect(),
            Err(e) => {
                log::warn!("Cannot list cores under {}: {}", self.root.display(), e);
                Vec::new()
            }
        }
    }

    fn bring_up(&self, core: CoreId) -> Result<(), HotplugError> {
        self.write_online(core, "1", "cpu_up")
    }

    fn take_down(&self, core: CoreId) -> Result<(), HotplugError> {
        self.write_online(core, "0", "cpu_down")
    }
}

/// Parses a kernel CPU list such as `0-1,3`.
pub fn parse_cpu_list(list: &str) -> Option<Vec<CoreId>> {
    let list = list.trim();
    if list.is_empty() {
        return Some(Vec::new());
    }
    let mut cores = Vec::new();
    for part in list.split(',') {
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start.trim().parse().ok()?;
                let end: u32 = end.trim().parse().ok()?;
                if end < start {
                    return None;
                }
                cores.extend((start..=end).map(CoreId));
            }
            None => cores.push(CoreId(part.trim().parse().ok()?)),
        }
    }
    cores.sort();
    cores.dedup();
    Some(cores)
}

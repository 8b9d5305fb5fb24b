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

//! `sched_setaffinity`-based thread pinning.

use duocore_core::{CoreId, HotplugError, ThreadAffinity};
use nix::sched::{sched_setaffinity, CpuSet};
use nix::unistd::Pid;
use std::io;

/// Pins the calling thread with `sched_setaffinity(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchedAffinity;

impl ThreadAffinity for SchedAffinity {
    fn pin_current_thread(&self, core: CoreId) -> Result<(), HotplugError> {
        let to_error = |e: nix::Error| {
            HotplugError::collaborator(core, "sched_setaffinity", io::Error::from(e))
        };
        let mut set = CpuSet::new();
        set.set(core.index()).map_err(to_error)?;
        sched_setaffinity(Pid::from_raw(0), &set).map_err(to_error)?;
        log::debug!("Pinned the current thread to {}.", core);
        Ok(())
    }
}

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

//! Power-state and reboot notifications.
//!
//! A [`LifecycleSource`] delivers suspend/resume and reboot events to the
//! handlers registered against it. Handlers run synchronously on the notifying
//! thread and must return quickly: the suspend or reboot waits for them.

use crate::error::HotplugError;
use std::sync::Arc;

/// A system power-state transition the policy must react to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    /// The system is about to suspend.
    SuspendPrepare,
    /// The system came back from a suspend.
    PostSuspend,
    /// The system was restored from a hibernation image.
    PostRestore,
    /// The system is rebooting or powering off.
    Reboot,
}

impl LifecycleEvent {
    /// Parses the short event name used on the operator console.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "suspend" | "suspend-prepare" => Some(Self::SuspendPrepare),
            "resume" | "post-suspend" => Some(Self::PostSuspend),
            "restore" | "post-restore" => Some(Self::PostRestore),
            "reboot" | "shutdown" => Some(Self::Reboot),
            _ => None,
        }
    }

    /// Returns `true` for events delivered to power listeners.
    pub fn is_power_event(self) -> bool {
        !matches!(self, Self::Reboot)
    }
}

/// A synchronous lifecycle callback.
pub type LifecycleHandler = Arc<dyn Fn(LifecycleEvent) + Send + Sync>;

/// Registration point for lifecycle notifications.
pub trait LifecycleSource: Send + Sync {
    /// Registers a handler for suspend-prepare, post-suspend and post-restore.
    fn register_power_listener(&self, handler: LifecycleHandler) -> Result<(), HotplugError>;

    /// Registers a handler for reboot and power-off.
    fn register_reboot_listener(&self, handler: LifecycleHandler) -> Result<(), HotplugError>;
}

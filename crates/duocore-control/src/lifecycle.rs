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

//! Reactions to suspend, resume and reboot.
//!
//! Autonomous transitions are frozen across a suspend by forcing the user
//! lock on, and thawed on resume by restoring whatever the operator had set.
//! A reboot freezes them for good.

use crate::engine::HotplugEngine;
use duocore_core::{HotplugError, LifecycleEvent, LifecycleHandler, LifecycleSource};
use std::sync::Arc;

/// The user lock as it was when a suspend started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedLockState {
    /// Value of `user_locked` before suspend-prepare.
    pub user_locked: bool,
}

/// Routes lifecycle events to the engine.
pub struct LifecycleGateway {
    engine: Arc<HotplugEngine>,
}

impl LifecycleGateway {
    /// Creates a gateway for `engine`.
    pub fn new(engine: Arc<HotplugEngine>) -> Self {
        Self { engine }
    }

    /// Registers power and reboot handlers with `source`.
    pub fn register(self: &Arc<Self>, source: &dyn LifecycleSource) -> Result<(), HotplugError> {
        let gateway = Arc::clone(self);
        let power: LifecycleHandler = Arc::new(move |event| gateway.handle(event));
        source.register_power_listener(power)?;

        let gateway = Arc::clone(self);
        let reboot: LifecycleHandler = Arc::new(move |event| gateway.handle(event));
        source.register_reboot_listener(reboot)?;
        Ok(())
    }

    /// Handles one event synchronously.
    pub fn handle(&self, event: LifecycleEvent) {
        match event {
            LifecycleEvent::SuspendPrepare => self.suspend_prepare(),
            LifecycleEvent::PostSuspend | LifecycleEvent::PostRestore => self.resume(),
            LifecycleEvent::Reboot => self.reboot(),
        }
    }

    fn suspend_prepare(&self) {
        self.engine.with_state(|state| {
            let saved = SavedLockState {
                user_locked: state.flags.user_locked,
            };
            state.saved_lock = Some(saved);
            state.flags.user_locked = true;
            log::info!("Suspend: saving hotplug lock ({}).", saved.user_locked);
        });
    }

    fn resume(&self) {
        self.engine.with_state(|state| match state.saved_lock.take() {
            Some(saved) => {
                log::info!("Resume: restoring hotplug lock ({}).", saved.user_locked);
                state.flags.user_locked = saved.user_locked;
            }
            None => log::debug!("Resume without a matching suspend, lock left as is."),
        });
    }

    fn reboot(&self) {
        self.engine.with_state(|state| {
            log::warn!("Reboot: disabling hotplug.");
            state.flags.user_locked = true;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PolicyConfig;
    use duocore_infra::lifecycle::LifecycleDispatcher;
    use duocore_infra::platform::SimulatedPlatform;

    fn gateway(initial_lock: bool) -> (Arc<HotplugEngine>, Arc<LifecycleGateway>) {
        let platform = Arc::new(SimulatedPlatform::new(2));
        let config = PolicyConfig {
            initial_user_lock: initial_lock,
            ..Default::default()
        };
        let (engine, _rx) = HotplugEngine::new(config, platform.clone(), platform).unwrap();
        let engine = Arc::new(engine);
        let gateway = Arc::new(LifecycleGateway::new(engine.clone()));
        (engine, gateway)
    }

    #[test]
    fn test_suspend_resume_round_trip() {
        for initial in [false, true] {
            let (engine, gateway) = gateway(initial);
            gateway.handle(LifecycleEvent::SuspendPrepare);
            assert!(engine.user_locked());
            gateway.handle(LifecycleEvent::PostSuspend);
            assert_eq!(engine.user_locked(), initial);
        }
    }

    #[test]
    fn test_restore_uses_saved_lock() {
        let (engine, gateway) = gateway(false);
        gateway.handle(LifecycleEvent::SuspendPrepare);
        gateway.handle(LifecycleEvent::PostRestore);
        assert!(!engine.user_locked());
    }

    #[test]
    fn test_resume_without_suspend_keeps_lock() {
        let (engine, gateway) = gateway(true);
        gateway.handle(LifecycleEvent::PostSuspend);
        assert!(engine.user_locked());
    }

    #[test]
    fn test_reboot_locks_permanently() {
        let (engine, gateway) = gateway(false);
        gateway.handle(LifecycleEvent::Reboot);
        assert!(engine.user_locked());
        assert_eq!(
            engine.set_autonomous(false).unwrap(),
            crate::flags::WriteOutcome::Ignored(crate::flags::IgnoreReason::UserLocked)
        );
    }

    #[test]
    fn test_registered_handlers_receive_dispatched_events() {
        let (engine, gateway) = gateway(false);
        let dispatcher = LifecycleDispatcher::new();
        gateway.register(&dispatcher).unwrap();

        dispatcher.dispatch(LifecycleEvent::SuspendPrepare);
        assert!(engine.user_locked());
        dispatcher.dispatch(LifecycleEvent::PostSuspend);
        assert!(!engine.user_locked());
        dispatcher.dispatch(LifecycleEvent::Reboot);
        assert!(engine.user_locked());
    }
}

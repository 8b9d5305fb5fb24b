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

//! Synchronous fan-out of lifecycle events to registered handlers.

use duocore_core::{HotplugError, LifecycleEvent, LifecycleHandler, LifecycleSource};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A thread-safe registry of lifecycle handlers.
///
/// Whoever observes the system transition (a sleep hook, the operator
/// console, a signal handler) calls [`dispatch`](Self::dispatch); every
/// matching handler runs on the caller's thread before `dispatch` returns.
#[derive(Default)]
pub struct LifecycleDispatcher {
    power: Mutex<Vec<LifecycleHandler>>,
    reboot: Mutex<Vec<LifecycleHandler>>,
}

impl LifecycleDispatcher {
    /// Creates a dispatcher with no handlers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `event` to every handler registered for its kind.
    ///
    /// Returns the number of handlers notified.
    pub fn dispatch(&self, event: LifecycleEvent) -> usize {
        let handlers = if event.is_power_event() {
            snapshot(&self.power)
        } else {
            snapshot(&self.reboot)
        };
        log::debug!("Dispatching {:?} to {} handler(s).", event, handlers.len());
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }
}

impl LifecycleSource for LifecycleDispatcher {
    fn register_power_listener(&self, handler: LifecycleHandler) -> Result<(), HotplugError> {
        lock(&self.power).push(handler);
        log::info!("Registered power event listener.");
        Ok(())
    }

    fn register_reboot_listener(&self, handler: LifecycleHandler) -> Result<(), HotplugError> {
        lock(&self.reboot).push(handler);
        log::info!("Registered reboot listener.");
        Ok(())
    }
}

fn lock(handlers: &Mutex<Vec<LifecycleHandler>>) -> MutexGuard<'_, Vec<LifecycleHandler>> {
    handlers.lock().unwrap_or_else(PoisonError::into_inner)
}

// Handlers run without the registry lock so they may register further handlers.
fn snapshot(handlers: &Mutex<Vec<LifecycleHandler>>) -> Vec<LifecycleHandler> {
    lock(handlers).clone()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn recorder() -> (LifecycleHandler, Arc<Mutex<Vec<LifecycleEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handler: LifecycleHandler = Arc::new(move |event| sink.lock().unwrap().push(event));
        (handler, seen)
    }

    #[test]
    fn test_events_routed_by_kind() {
        let dispatcher = LifecycleDispatcher::new();
        let (power, power_seen) = recorder();
        let (reboot, reboot_seen) = recorder();
        dispatcher.register_power_listener(power).unwrap();
        dispatcher.register_reboot_listener(reboot).unwrap();

        assert_eq!(dispatcher.dispatch(LifecycleEvent::SuspendPrepare), 1);
        assert_eq!(dispatcher.dispatch(LifecycleEvent::PostRestore), 1);
        assert_eq!(dispatcher.dispatch(LifecycleEvent::Reboot), 1);

        assert_eq!(
            *power_seen.lock().unwrap(),
            vec![LifecycleEvent::SuspendPrepare, LifecycleEvent::PostRestore]
        );
        assert_eq!(*reboot_seen.lock().unwrap(), vec![LifecycleEvent::Reboot]);
    }

    #[test]
    fn test_dispatch_without_handlers() {
        let dispatcher = LifecycleDispatcher::new();
        assert_eq!(dispatcher.dispatch(LifecycleEvent::PostSuspend), 0);
    }
}

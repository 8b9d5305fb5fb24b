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

//! Background service driving the decision loop.

use crate::engine::{CycleOutcome, HotplugEngine, LoopSignal};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use duocore_core::{HotplugError, ThreadAffinity, PRIMARY_CORE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

/// Runs [`HotplugEngine::run_cycle`] on a dedicated thread.
///
/// The thread sleeps until the next deadline or until a [`LoopSignal`]
/// arrives. Each cycle completes, including its rescheduling, before the next
/// one can fire. A halted loop waits for a `Resume` signal with no deadline.
pub struct HotplugService {
    engine: Arc<HotplugEngine>,
    affinity: Option<Arc<dyn ThreadAffinity>>,
    running: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
    signal_tx: Sender<LoopSignal>,
}

impl HotplugService {
    /// Creates a service for `engine`. The thread is not started yet.
    pub fn new(engine: Arc<HotplugEngine>) -> Self {
        let signal_tx = engine.signal_sender();
        Self {
            engine,
            affinity: None,
            running: Arc::new(AtomicBool::new(false)),
            handle: None,
            signal_tx,
        }
    }

    /// Pins the loop thread to the primary core when it starts.
    pub fn with_affinity(mut self, affinity: Arc<dyn ThreadAffinity>) -> Self {
        self.affinity = Some(affinity);
        self
    }

    /// Starts the service thread; the first cycle runs after `startup_delay`.
    pub fn start(
        &mut self,
        signals: Receiver<LoopSignal>,
        startup_delay: Duration,
    ) -> Result<(), HotplugError> {
        if self.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.running.store(true, Ordering::SeqCst);
        let running = Arc::clone(&self.running);
        let engine = Arc::clone(&self.engine);
        let affinity = self.affinity.clone();

        let spawned = thread::Builder::new()
            .name("duocore-hotplug".into())
            .spawn(move || {
                if let Some(affinity) = affinity {
                    if let Err(e) = affinity.pin_current_thread(PRIMARY_CORE) {
                        log::warn!("Could not pin the hotplug loop to {}: {}", PRIMARY_CORE, e);
                    }
                }
                log::info!("Hotplug service thread started.");
                run_loop(&engine, &signals, startup_delay);
                running.store(false, Ordering::SeqCst);
                log::info!("Hotplug service thread stopped.");
            });

        match spawned {
            Ok(handle) => {
                self.handle = Some(handle);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(HotplugError::Initialization(format!(
                    "cannot spawn the hotplug thread: {e}"
                )))
            }
        }
    }

    /// Stops the service thread and waits for it to exit.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.signal_tx.send(LoopSignal::Shutdown);
            let _ = handle.join();
        }
        self.running.store(false, Ordering::SeqCst);
    }

    /// Returns `true` while the service thread is alive.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns the engine driven by this service.
    pub fn engine(&self) -> &Arc<HotplugEngine> {
        &self.engine
    }
}

impl Drop for HotplugService {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(engine: &HotplugEngine, signals: &Receiver<LoopSignal>, startup_delay: Duration) {
    let mut deadline = Some(Instant::now() + startup_delay);

    loop {
        let received = match deadline {
            Some(at) => signals.recv_deadline(at),
            None => signals.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Err(RecvTimeoutError::Timeout) => {
                deadline = match engine.run_cycle() {
                    CycleOutcome::Reschedule(delay) => Some(Instant::now() + delay),
                    CycleOutcome::Halt => None,
                };
            }
            Ok(LoopSignal::Resume(delay)) => {
                if deadline.is_none() {
                    deadline = Some(Instant::now() + delay);
                }
            }
            Ok(LoopSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

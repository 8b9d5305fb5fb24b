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

//! The engine context: shared state, decision cycle and control entry points.
//!
//! All mutable policy state (control flags, configuration, per-core samples,
//! current delay) lives in one [`EngineState`] behind a single mutex. The
//! decision cycle and every mutation entry point hold that mutex for their
//! whole duration, hotplug calls included, so "decide then act" is atomic
//! with respect to flag writes and lifecycle events.
//!
//! Lock order: the engine mutex is the only lock taken by the policy. Hotplug
//! collaborators are called with it held and must not call back into the
//! engine.

use crate::config::{check_sample_interval, check_thresholds, PolicyConfig};
use crate::decision::{DecisionEngine, Delay, Transition};
use crate::flags::{ControlFlags, FlagUpdate, ModeEffect, WriteOutcome};
use crate::lifecycle::SavedLockState;
use crate::sampler::{average_load, LoadSampler};
use crossbeam_channel::{Receiver, Sender};
use duocore_core::{CoreId, CpuHotplug, CpuTimeSource, HotplugError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Message delivered to the service loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopSignal {
    /// The loop halted and must run again after the given delay.
    Resume(Duration),
    /// The service is shutting down.
    Shutdown,
}

/// What the scheduler does after a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Run the next cycle after the given delay.
    Reschedule(Duration),
    /// Autonomous hotplug is off: do not schedule another cycle.
    Halt,
}

/// Counters accumulated over the engine's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Cycles executed.
    pub cycles: u64,
    /// Cycles skipped because the user lock was engaged.
    pub locked_cycles: u64,
    /// Cycles whose transition decision was dropped after a sampling failure.
    pub skipped_cycles: u64,
    /// Successful online transitions of the secondary core.
    pub online_transitions: u64,
    /// Successful offline transitions of the secondary core.
    pub offline_transitions: u64,
    /// Hotplug calls that reported a failure.
    pub failed_transitions: u64,
}

/// Mutable state guarded by the engine lock.
#[derive(Debug)]
pub struct EngineState {
    pub(crate) flags: ControlFlags,
    pub(crate) config: PolicyConfig,
    pub(crate) sampler: LoadSampler,
    pub(crate) delay: Delay,
    pub(crate) loop_scheduled: bool,
    pub(crate) saved_lock: Option<SavedLockState>,
    pub(crate) last_avg_load: Option<u32>,
    pub(crate) stats: CycleStats,
}

impl EngineState {
    fn new(config: PolicyConfig) -> Self {
        Self {
            flags: ControlFlags {
                autonomous_enabled: config.initial_autonomous,
                user_locked: config.initial_user_lock,
                always_on_pin: config.initial_always_on,
            },
            config,
            sampler: LoadSampler::new(),
            delay: Delay::Normal,
            // The first cycle is always scheduled, after the startup delay.
            loop_scheduled: true,
            saved_lock: None,
            last_avg_load: None,
            stats: CycleStats::default(),
        }
    }

    fn current_delay(&self) -> Duration {
        self.delay.duration(&self.config)
    }
}

/// Point-in-time view of the engine, for operators.
#[derive(Debug, Clone)]
pub struct EngineStatus {
    /// Current control flags.
    pub flags: ControlFlags,
    /// Current configuration.
    pub config: PolicyConfig,
    /// Current hysteresis delay.
    pub delay: Delay,
    /// Duration of the current delay.
    pub next_delay: Duration,
    /// Whether another cycle is scheduled.
    pub loop_scheduled: bool,
    /// Whether the secondary core is online right now.
    pub secondary_online: bool,
    /// Average load computed by the last evaluated cycle.
    pub last_avg_load: Option<u32>,
    /// Last valid load of every sampled core.
    pub core_loads: Vec<(CoreId, u32)>,
    /// Lifetime counters.
    pub stats: CycleStats,
}

/// The hotplug policy engine.
///
/// Instantiated once per process and shared through an `Arc` between the
/// service thread, the attribute surface and the lifecycle gateway.
pub struct HotplugEngine {
    state: Mutex<EngineState>,
    hotplug: Arc<dyn CpuHotplug>,
    times: Arc<dyn CpuTimeSource>,
    secondary: CoreId,
    signals: Sender<LoopSignal>,
}

impl HotplugEngine {
    /// Creates a new engine.
    ///
    /// Returns the receiving end of the loop signal channel, to be handed to
    /// [`HotplugService::start`](crate::service::HotplugService::start).
    pub fn new(
        config: PolicyConfig,
        hotplug: Arc<dyn CpuHotplug>,
        times: Arc<dyn CpuTimeSource>,
    ) -> Result<(Self, Receiver<LoopSignal>), HotplugError> {
        config.validate()?;
        let (tx, rx) = crossbeam_channel::unbounded();
        let secondary = config.secondary();
        let engine = Self {
            state: Mutex::new(EngineState::new(config)),
            hotplug,
            times,
            secondary,
            signals: tx,
        };
        Ok((engine, rx))
    }

    /// Runs one decision cycle and tells the scheduler what to do next.
    pub fn run_cycle(&self) -> CycleOutcome {
        let mut state = self.lock_state();
        state.stats.cycles += 1;

        if !state.flags.autonomous_enabled {
            let effect = state.flags.pin_effect();
            if let Err(e) = self.enforce(&mut state, effect) {
                log::warn!(
                    "Failed to apply the {} pin, retrying next cycle: {}",
                    self.secondary,
                    e
                );
                return CycleOutcome::Reschedule(state.current_delay());
            }
            state.loop_scheduled = false;
            log::info!("Autonomous hotplug is off, halting the sampling loop.");
            return CycleOutcome::Halt;
        }

        if state.flags.user_locked {
            state.stats.locked_cycles += 1;
            log::trace!("Hotplug locked, skipping load evaluation.");
            return CycleOutcome::Reschedule(state.current_delay());
        }

        let online = self.hotplug.online_cores();
        let loads = match state.sampler.sample_all(&online, self.times.as_ref()) {
            Ok(loads) => loads,
            Err(e) => {
                state.stats.skipped_cycles += 1;
                log::debug!("Skipping transition decision this cycle: {}", e);
                return CycleOutcome::Reschedule(state.current_delay());
            }
        };
        let Some(avg_load) = average_load(&loads) else {
            state.stats.skipped_cycles += 1;
            log::debug!("No online core reported a load, skipping this cycle.");
            return CycleOutcome::Reschedule(state.current_delay());
        };
        state.last_avg_load = Some(avg_load);

        let secondary_online = self.hotplug.is_online(self.secondary);
        let decision = DecisionEngine.evaluate(avg_load, secondary_online, &state.config);
        let result = match decision.transition {
            Transition::Offline => {
                log::info!(
                    "Taking {} offline (avg load {}%).",
                    self.secondary,
                    avg_load
                );
                self.take_down(&mut state)
            }
            Transition::Online => {
                log::info!(
                    "Bringing {} online (avg load {}%).",
                    self.secondary,
                    avg_load
                );
                self.bring_up(&mut state)
            }
            Transition::Hold => Ok(()),
        };

        match result {
            Ok(()) => {
                if let Some(delay) = decision.next_delay {
                    state.delay = delay;
                }
            }
            Err(e) => log::warn!("Hotplug transition failed, retrying next cycle: {}", e),
        }

        CycleOutcome::Reschedule(state.current_delay())
    }

    /// Switches autonomous hotplug on or off (`hotplug_on`).
    ///
    /// Enabling restarts a halted loop with the normal delay. Disabling pins
    /// the secondary core on, bringing it online if needed; the loop halts at
    /// the first cycle where the core matches the pin. A failed hotplug call
    /// is returned but the flags stand, and the loop retries it.
    pub fn set_autonomous(&self, enabled: bool) -> Result<WriteOutcome, HotplugError> {
        let mut state = self.lock_state();
        let update = state.flags.apply_autonomous(enabled);
        if update.outcome == WriteOutcome::Applied {
            log::info!(
                "Autonomous hotplug is {}.",
                if enabled { "on" } else { "off" }
            );
        }
        self.apply_update(&mut state, update)
    }

    /// Pins the secondary core on or off (`second_core_on`).
    ///
    /// Ignored while autonomous hotplug is enabled or the lock is engaged.
    pub fn set_always_on_pin(&self, enabled: bool) -> Result<WriteOutcome, HotplugError> {
        let mut state = self.lock_state();
        let update = state.flags.apply_always_on_pin(enabled);
        if update.outcome == WriteOutcome::Applied {
            log::info!(
                "{} is always {}.",
                self.secondary,
                if enabled { "on" } else { "off" }
            );
        }
        self.apply_update(&mut state, update)
    }

    /// Returns whether autonomous hotplug is enabled.
    pub fn autonomous(&self) -> bool {
        self.lock_state().flags.autonomous_enabled
    }

    /// Returns whether the secondary core is pinned on.
    pub fn always_on_pin(&self) -> bool {
        self.lock_state().flags.always_on_pin
    }

    /// Returns whether the user lock is engaged.
    pub fn user_locked(&self) -> bool {
        self.lock_state().flags.user_locked
    }

    /// Engages or releases the user lock.
    ///
    /// The loop keeps running while locked; the first cycle after release
    /// evaluates load again.
    pub fn set_user_lock(&self, locked: bool) {
        let mut state = self.lock_state();
        if state.flags.user_locked != locked {
            log::info!(
                "Hotplug user lock {}.",
                if locked { "engaged" } else { "released" }
            );
        }
        state.flags.user_locked = locked;
    }

    /// Changes the normal sampling interval.
    pub fn set_sample_interval(&self, interval: Duration) -> Result<(), HotplugError> {
        let millis = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        check_sample_interval(millis)?;
        self.lock_state().config.sample_interval_ms = millis;
        Ok(())
    }

    /// Changes the load thresholds; `None` keeps the current value.
    pub fn set_thresholds(&self, low: Option<u32>, high: Option<u32>) -> Result<(), HotplugError> {
        let mut state = self.lock_state();
        let low = low.unwrap_or(state.config.load_threshold_low);
        let high = high.unwrap_or(state.config.load_threshold_high);
        check_thresholds(low, high)?;
        state.config.load_threshold_low = low;
        state.config.load_threshold_high = high;
        Ok(())
    }

    /// Returns a copy of the current configuration.
    pub fn config(&self) -> PolicyConfig {
        self.lock_state().config.clone()
    }

    /// Restarts a halted loop.
    ///
    /// Returns `true` if a new cycle was scheduled. Has no effect while
    /// autonomous hotplug is disabled or when a cycle is already pending.
    pub fn resume_loop(&self) -> bool {
        let mut state = self.lock_state();
        if !state.flags.autonomous_enabled {
            log::debug!("Not resuming the loop: autonomous hotplug is off.");
            return false;
        }
        self.schedule(&mut state)
    }

    /// Returns whether another cycle is scheduled.
    pub fn is_loop_scheduled(&self) -> bool {
        self.lock_state().loop_scheduled
    }

    /// Returns the managed secondary core.
    pub fn secondary(&self) -> CoreId {
        self.secondary
    }

    /// Returns a sender for loop signals.
    pub fn signal_sender(&self) -> Sender<LoopSignal> {
        self.signals.clone()
    }

    /// Takes a consistent snapshot of the engine.
    pub fn status(&self) -> EngineStatus {
        let state = self.lock_state();
        EngineStatus {
            flags: state.flags,
            config: state.config.clone(),
            delay: state.delay,
            next_delay: state.current_delay(),
            loop_scheduled: state.loop_scheduled,
            secondary_online: self.hotplug.is_online(self.secondary),
            last_avg_load: state.last_avg_load,
            core_loads: state.sampler.last_loads(),
            stats: state.stats,
        }
    }

    /// Runs `f` with the engine lock held.
    pub(crate) fn with_state<R>(&self, f: impl FnOnce(&mut EngineState) -> R) -> R {
        let mut state = self.lock_state();
        f(&mut state)
    }

    fn lock_state(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply_update(
        &self,
        state: &mut EngineState,
        update: FlagUpdate,
    ) -> Result<WriteOutcome, HotplugError> {
        if update.effect == ModeEffect::ResumeLoop {
            state.delay = Delay::Normal;
            self.schedule(state);
        } else if let Err(e) = self.enforce(state, update.effect) {
            // The flags stay as written; the next cycle retries the pin.
            self.schedule(state);
            return Err(e);
        }
        Ok(update.outcome)
    }

    /// Brings the secondary core in line with a pin effect. Idempotent.
    fn enforce(&self, state: &mut EngineState, effect: ModeEffect) -> Result<(), HotplugError> {
        let online = self.hotplug.is_online(self.secondary);
        match effect {
            ModeEffect::BringSecondaryUp if !online => self.bring_up(state),
            ModeEffect::TakeSecondaryDown if online => self.take_down(state),
            _ => Ok(()),
        }
    }

    fn schedule(&self, state: &mut EngineState) -> bool {
        if state.loop_scheduled {
            return false;
        }
        state.loop_scheduled = true;
        let delay = state.current_delay();
        if self.signals.send(LoopSignal::Resume(delay)).is_err() {
            log::debug!("Loop signal dropped: the service is not listening.");
        }
        log::info!("Sampling loop rescheduled in {:?}.", delay);
        true
    }

    fn bring_up(&self, state: &mut EngineState) -> Result<(), HotplugError> {
        match self.hotplug.bring_up(self.secondary) {
            Ok(()) => {
                state.stats.online_transitions += 1;
                Ok(())
            }
            Err(e) => {
                state.stats.failed_transitions += 1;
                Err(e)
            }
        }
    }

    fn take_down(&self, state: &mut EngineState) -> Result<(), HotplugError> {
        match self.hotplug.take_down(self.secondary) {
            Ok(()) => {
                state.stats.offline_transitions += 1;
                Ok(())
            }
            Err(e) => {
                state.stats.failed_transitions += 1;
                Err(e)
            }
        }
    }
}

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

//! Control flags and their precedence rules.
//!
//! The flags only describe intent. Applying an update returns the side effect
//! the engine must carry out (bringing the secondary core up, restarting the
//! loop...) so precedence can be tested without a platform.

use std::fmt;

/// Operator-facing switch value, written as `on` or `off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    /// Enabled.
    On,
    /// Disabled.
    Off,
}

impl Toggle {
    /// Parses an attribute write.
    ///
    /// Accepts exactly `on` or `off`, optionally followed by a single newline as
    /// produced by `echo`. Anything else is malformed.
    pub fn parse(value: &str) -> Option<Self> {
        match value.strip_suffix('\n').unwrap_or(value) {
            "on" => Some(Toggle::On),
            "off" => Some(Toggle::Off),
            _ => None,
        }
    }

    /// Returns `true` for [`Toggle::On`].
    pub fn is_on(self) -> bool {
        self == Toggle::On
    }
}

impl From<bool> for Toggle {
    fn from(value: bool) -> Self {
        if value {
            Toggle::On
        } else {
            Toggle::Off
        }
    }
}

impl fmt::Display for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Toggle::On => "on",
            Toggle::Off => "off",
        })
    }
}

/// The three control inputs gating the decision loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlFlags {
    /// Master switch for the periodic loop.
    pub autonomous_enabled: bool,
    /// Operator override freezing load-driven transitions.
    pub user_locked: bool,
    /// Keeps the secondary core online while autonomous hotplug is disabled.
    pub always_on_pin: bool,
}

impl Default for ControlFlags {
    fn default() -> Self {
        Self {
            autonomous_enabled: true,
            user_locked: false,
            always_on_pin: true,
        }
    }
}

/// Why a flag write had no effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The user lock is engaged.
    UserLocked,
    /// Autonomous hotplug owns the secondary core.
    AutonomousEnabled,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IgnoreReason::UserLocked => "hotplug is locked",
            IgnoreReason::AutonomousEnabled => "autonomous hotplug is enabled",
        })
    }
}

/// Result of a flag write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The flag changed.
    Applied,
    /// The flag already had the requested value.
    Unchanged,
    /// The write was refused by precedence.
    Ignored(IgnoreReason),
}

/// Side effect the engine performs after a flag update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeEffect {
    /// Nothing to do.
    None,
    /// Reset the delay and restart the loop if it halted.
    ResumeLoop,
    /// Bring the secondary core online if it is offline.
    BringSecondaryUp,
    /// Take the secondary core offline if it is online.
    TakeSecondaryDown,
}

/// A flag write outcome together with its side effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagUpdate {
    /// What happened to the flags.
    pub outcome: WriteOutcome,
    /// What the engine must do next.
    pub effect: ModeEffect,
}

impl FlagUpdate {
    fn unchanged(effect: ModeEffect) -> Self {
        Self {
            outcome: WriteOutcome::Unchanged,
            effect,
        }
    }

    fn ignored(reason: IgnoreReason) -> Self {
        Self {
            outcome: WriteOutcome::Ignored(reason),
            effect: ModeEffect::None,
        }
    }

    fn applied(effect: ModeEffect) -> Self {
        Self {
            outcome: WriteOutcome::Applied,
            effect,
        }
    }
}

impl ControlFlags {
    /// The hotplug action that makes the secondary core match the pin.
    ///
    /// `ModeEffect::None` while autonomous hotplug owns the core.
    pub fn pin_effect(&self) -> ModeEffect {
        match (self.autonomous_enabled, self.always_on_pin) {
            (true, _) => ModeEffect::None,
            (false, true) => ModeEffect::BringSecondaryUp,
            (false, false) => ModeEffect::TakeSecondaryDown,
        }
    }

    /// Switches autonomous hotplug on or off.
    ///
    /// Refused while locked. Disabling pins the secondary core on. Repeating
    /// "off" re-applies the current pin.
    pub fn apply_autonomous(&mut self, enabled: bool) -> FlagUpdate {
        if self.user_locked {
            return FlagUpdate::ignored(IgnoreReason::UserLocked);
        }
        match (self.autonomous_enabled, enabled) {
            (false, true) => {
                self.autonomous_enabled = true;
                FlagUpdate::applied(ModeEffect::ResumeLoop)
            }
            (true, false) => {
                self.autonomous_enabled = false;
                self.always_on_pin = true;
                FlagUpdate::applied(ModeEffect::BringSecondaryUp)
            }
            _ => FlagUpdate::unchanged(self.pin_effect()),
        }
    }

    /// Pins the secondary core on or off.
    ///
    /// Only honored while autonomous hotplug is disabled and unlocked. A write
    /// of the current value re-applies the pin.
    pub fn apply_always_on_pin(&mut self, enabled: bool) -> FlagUpdate {
        if self.user_locked {
            return FlagUpdate::ignored(IgnoreReason::UserLocked);
        }
        if self.autonomous_enabled {
            return FlagUpdate::ignored(IgnoreReason::AutonomousEnabled);
        }
        match (self.always_on_pin, enabled) {
            (false, true) => {
                self.always_on_pin = true;
                FlagUpdate::applied(ModeEffect::BringSecondaryUp)
            }
            (true, false) => {
                self.always_on_pin = false;
                FlagUpdate::applied(ModeEffect::TakeSecondaryDown)
            }
            _ => FlagUpdate::unchanged(self.pin_effect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_parsing() {
        assert_eq!(Toggle::parse("on"), Some(Toggle::On));
        assert_eq!(Toggle::parse("off\n"), Some(Toggle::Off));
        assert_eq!(Toggle::parse("maybe\n"), None);
        assert_eq!(Toggle::parse("on\n\n"), None);
        assert_eq!(Toggle::parse(" on"), None);
        assert_eq!(Toggle::parse("ON"), None);
        assert_eq!(Toggle::from(true).to_string(), "on");
    }

    #[test]
    fn test_disabling_autonomous_pins_secondary_on() {
        let mut flags = ControlFlags {
            always_on_pin: false,
            ..Default::default()
        };
        let update = flags.apply_autonomous(false);
        assert_eq!(update.outcome, WriteOutcome::Applied);
        assert_eq!(update.effect, ModeEffect::BringSecondaryUp);
        assert!(!flags.autonomous_enabled);
        assert!(flags.always_on_pin);
    }

    #[test]
    fn test_enabling_autonomous_resumes_loop() {
        let mut flags = ControlFlags {
            autonomous_enabled: false,
            ..Default::default()
        };
        assert_eq!(flags.apply_autonomous(true).effect, ModeEffect::ResumeLoop);
        assert_eq!(flags.apply_autonomous(true).outcome, WriteOutcome::Unchanged);
    }

    #[test]
    fn test_lock_blocks_every_write() {
        let mut flags = ControlFlags {
            user_locked: true,
            ..Default::default()
        };
        let before = flags;
        assert_eq!(
            flags.apply_autonomous(false).outcome,
            WriteOutcome::Ignored(IgnoreReason::UserLocked)
        );
        assert_eq!(
            flags.apply_always_on_pin(false).outcome,
            WriteOutcome::Ignored(IgnoreReason::UserLocked)
        );
        assert_eq!(flags, before);
    }

    #[test]
    fn test_pin_requires_autonomous_off() {
        let mut flags = ControlFlags::default();
        assert_eq!(
            flags.apply_always_on_pin(false).outcome,
            WriteOutcome::Ignored(IgnoreReason::AutonomousEnabled)
        );
        assert!(flags.always_on_pin);

        flags.apply_autonomous(false);
        let off = flags.apply_always_on_pin(false);
        assert_eq!(off.effect, ModeEffect::TakeSecondaryDown);
        let on = flags.apply_always_on_pin(true);
        assert_eq!(on.effect, ModeEffect::BringSecondaryUp);
        assert_eq!(flags.apply_always_on_pin(true).outcome, WriteOutcome::Unchanged);
    }

    #[test]
    fn test_repeated_manual_writes_reapply_pin() {
        let mut flags = ControlFlags::default();
        assert_eq!(flags.pin_effect(), ModeEffect::None);
        assert_eq!(flags.apply_autonomous(true).effect, ModeEffect::None);

        flags.apply_autonomous(false);
        let again = flags.apply_autonomous(false);
        assert_eq!(again.outcome, WriteOutcome::Unchanged);
        assert_eq!(again.effect, ModeEffect::BringSecondaryUp);

        flags.apply_always_on_pin(false);
        let again = flags.apply_always_on_pin(false);
        assert_eq!(again.outcome, WriteOutcome::Unchanged);
        assert_eq!(again.effect, ModeEffect::TakeSecondaryDown);
        assert_eq!(
            flags.apply_autonomous(false).effect,
            ModeEffect::TakeSecondaryDown
        );
    }
}

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

//! The operator attribute surface.
//!
//! Each attribute reads as a short string and, when writable, accepts a typed
//! value. Unlike a tolerant sysfs store, every write reports whether it was
//! applied: malformed values and writes refused by the control flags come
//! back as errors.

use crate::engine::HotplugEngine;
use crate::flags::{Toggle, WriteOutcome};
use duocore_core::HotplugError;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Version of the attribute surface.
pub const VERSION: u32 = 1;

/// Author reported by the `author` attribute.
pub const AUTHOR: &str = "duocore contributors";

/// An attribute exposed to operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    /// Read-only surface version.
    Version,
    /// Read-only author string.
    Author,
    /// Autonomous hotplug switch.
    HotplugOn,
    /// Always-on pin of the secondary core.
    SecondCoreOn,
    /// Normal sampling interval, in milliseconds.
    Rate,
    /// User lock, `0` or `1`.
    Lock,
    /// Low load threshold, in percent.
    LoadLow,
    /// High load threshold, in percent.
    LoadHigh,
}

impl Attribute {
    /// Every attribute, in listing order.
    pub const ALL: [Attribute; 8] = [
        Attribute::HotplugOn,
        Attribute::SecondCoreOn,
        Attribute::Version,
        Attribute::Author,
        Attribute::Rate,
        Attribute::Lock,
        Attribute::LoadLow,
        Attribute::LoadHigh,
    ];

    /// Returns the attribute's name on the surface.
    pub fn name(self) -> &'static str {
        match self {
            Attribute::Version => "version",
            Attribute::Author => "author",
            Attribute::HotplugOn => "hotplug_on",
            Attribute::SecondCoreOn => "second_core_on",
            Attribute::Rate => "rate",
            Attribute::Lock => "lock",
            Attribute::LoadLow => "loadl",
            Attribute::LoadHigh => "loadh",
        }
    }

    /// Returns `true` if the attribute accepts writes.
    pub fn is_writable(self) -> bool {
        !matches!(self, Attribute::Version | Attribute::Author)
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Attribute {
    type Err = HotplugError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.name() == s)
            .ok_or_else(|| HotplugError::UnknownAttribute(s.to_string()))
    }
}

/// Read/write access to the engine's attributes.
#[derive(Clone)]
pub struct AttributeSurface {
    engine: Arc<HotplugEngine>,
}

impl AttributeSurface {
    /// Creates a surface over `engine`.
    pub fn new(engine: Arc<HotplugEngine>) -> Self {
        Self { engine }
    }

    /// Reads an attribute.
    pub fn read(&self, attr: Attribute) -> String {
        match attr {
            Attribute::Version => VERSION.to_string(),
            Attribute::Author => AUTHOR.to_string(),
            Attribute::HotplugOn => Toggle::from(self.engine.autonomous()).to_string(),
            Attribute::SecondCoreOn => Toggle::from(self.engine.always_on_pin()).to_string(),
            Attribute::Rate => self.engine.config().sample_interval_ms.to_string(),
            Attribute::Lock => u8::from(self.engine.user_locked()).to_string(),
            Attribute::LoadLow => self.engine.config().load_threshold_low.to_string(),
            Attribute::LoadHigh => self.engine.config().load_threshold_high.to_string(),
        }
    }

    /// Writes an attribute.
    pub fn write(&self, attr: Attribute, value: &str) -> Result<(), HotplugError> {
        match attr {
            Attribute::Version | Attribute::Author => {
                Err(HotplugError::ReadOnly(attr.name().to_string()))
            }
            Attribute::HotplugOn => {
                let toggle = parse_toggle(attr, value)?;
                let outcome = self.engine.set_autonomous(toggle.is_on())?;
                check_outcome(attr, outcome)
            }
            Attribute::SecondCoreOn => {
                let toggle = parse_toggle(attr, value)?;
                let outcome = self.engine.set_always_on_pin(toggle.is_on())?;
                check_outcome(attr, outcome)
            }
            Attribute::Rate => {
                let millis: u64 = parse_number(attr, value)?;
                self.engine.set_sample_interval(Duration::from_millis(millis))
            }
            Attribute::Lock => match parse_number::<u8>(attr, value)? {
                0 => {
                    self.engine.set_user_lock(false);
                    Ok(())
                }
                1 => {
                    self.engine.set_user_lock(true);
                    Ok(())
                }
                _ => Err(malformed(attr, value)),
            },
            Attribute::LoadLow => {
                let low = parse_number(attr, value)?;
                self.engine.set_thresholds(Some(low), None)
            }
            Attribute::LoadHigh => {
                let high = parse_number(attr, value)?;
                self.engine.set_thresholds(None, Some(high))
            }
        }
    }

    /// Reads an attribute by name.
    pub fn read_named(&self, name: &str) -> Result<String, HotplugError> {
        Ok(self.read(name.parse()?))
    }

    /// Writes an attribute by name.
    pub fn write_named(&self, name: &str, value: &str) -> Result<(), HotplugError> {
        self.write(name.parse()?, value)
    }
}

fn malformed(attr: Attribute, value: &str) -> HotplugError {
    HotplugError::MalformedWrite {
        attribute: attr.name().to_string(),
        value: value.to_string(),
    }
}

fn parse_toggle(attr: Attribute, value: &str) -> Result<Toggle, HotplugError> {
    Toggle::parse(value).ok_or_else(|| malformed(attr, value))
}

fn parse_number<T: FromStr>(attr: Attribute, value: &str) -> Result<T, HotplugError> {
    value.trim().parse().map_err(|_| malformed(attr, value))
}

fn check_outcome(attr: Attribute, outcome: WriteOutcome) -> Result<(), HotplugError> {
    match outcome {
        WriteOutcome::Applied | WriteOutcome::Unchanged => Ok(()),
        WriteOutcome::Ignored(reason) => Err(HotplugError::Rejected {
            attribute: attr.name().to_string(),
            reason: reason.to_string(),
        }),
    }
}

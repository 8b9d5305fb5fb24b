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

//! Defines the error type shared by every duocore crate.

use crate::platform::CoreId;
use std::io;

/// Errors raised by the hotplug policy and its collaborators.
#[derive(Debug, thiserror::Error)]
pub enum HotplugError {
    /// The idle/wall counters of a core produced an unusable window: no wall
    /// time elapsed, or more idle time than wall time.
    ///
    /// The current cycle skips its transition decision.
    #[error("invalid load sample on {core} (idle delta {idle_delta}, wall delta {wall_delta})")]
    InvalidSample {
        /// The core whose counters were sampled.
        core: CoreId,
        /// Idle time elapsed since the previous sample.
        idle_delta: u64,
        /// Wall time elapsed since the previous sample.
        wall_delta: u64,
    },

    /// A platform collaborator (hotplug control, time accounting) failed.
    #[error("{op} failed on {core}: {source}")]
    Collaborator {
        /// The core the operation targeted.
        core: CoreId,
        /// Short name of the failed operation (`cpu_up`, `cpu_down`, ...).
        op: &'static str,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// An attribute write carried a value that is not a recognized token.
    #[error("malformed value {value:?} for attribute '{attribute}'")]
    MalformedWrite {
        /// The attribute being written.
        attribute: String,
        /// The raw value that was rejected.
        value: String,
    },

    /// A well-formed attribute write was refused by the current control flags.
    #[error("write to '{attribute}' rejected: {reason}")]
    Rejected {
        /// The attribute being written.
        attribute: String,
        /// Why the write had no effect.
        reason: String,
    },

    /// The attribute name is not part of the operator surface.
    #[error("unknown attribute '{0}'")]
    UnknownAttribute(String),

    /// The attribute exists but cannot be written.
    #[error("attribute '{0}' is read-only")]
    ReadOnly(String),

    /// The policy configuration violates one of its invariants.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A setup-time registration (service thread, listener) failed.
    #[error("initialization failed: {0}")]
    Initialization(String),
}

impl HotplugError {
    /// Wraps an I/O error raised by a collaborator operation on `core`.
    pub fn collaborator(core: CoreId, op: &'static str, source: io::Error) -> Self {
        Self::Collaborator { core, op, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_sample_message() {
        let err = HotplugError::InvalidSample {
            core: CoreId(1),
            idle_delta: 200,
            wall_delta: 100,
        };
        assert_eq!(
            err.to_string(),
            "invalid load sample on cpu1 (idle delta 200, wall delta 100)"
        );
    }

    #[test]
    fn test_empty_window_message() {
        let err = HotplugError::InvalidSample {
            core: CoreId(0),
            idle_delta: 0,
            wall_delta: 0,
        };
        let message = err.to_string();
        assert!(!message.contains("exceeds"));
        assert!(message.ends_with("(idle delta 0, wall delta 0)"));
    }

    #[test]
    fn test_collaborator_keeps_source() {
        let err = HotplugError::collaborator(
            CoreId(1),
            "cpu_up",
            io::Error::other("busy"),
        );
        assert!(err.to_string().starts_with("cpu_up failed on cpu1"));
        assert!(std::error::Error::source(&err).is_some());
    }
}

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

//! # Duocore Control
//!
//! Load-driven hotplug policy for a two-core platform: the secondary core is
//! brought online when the average load rises above a high threshold and
//! taken offline when it falls below a low one.

#![warn(missing_docs)]

pub mod attributes;
pub mod config;
pub mod decision;
pub mod engine;
pub mod flags;
pub mod lifecycle;
pub mod sampler;
pub mod service;

pub use attributes::{Attribute, AttributeSurface};
pub use config::PolicyConfig;
pub use engine::{CycleOutcome, EngineStatus, HotplugEngine, LoopSignal};
pub use flags::{ControlFlags, Toggle, WriteOutcome};
pub use lifecycle::LifecycleGateway;
pub use service::HotplugService;

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

//! Command-line arguments and configuration loading.

use anyhow::{Context, Result};
use clap::Parser;
use duocore_control::PolicyConfig;
use duocore_infra::platform::{DEFAULT_PROC_STAT, DEFAULT_SYSFS_ROOT};
use std::fs;
use std::path::{Path, PathBuf};

/// Dynamic hotplug of the secondary CPU core.
#[derive(Debug, Parser)]
#[command(name = "duocored", version, about)]
pub struct Args {
    /// TOML policy configuration file.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// CPU sysfs directory.
    #[arg(long, default_value = DEFAULT_SYSFS_ROOT)]
    pub sysfs_root: PathBuf,

    /// Kernel statistics file providing per-core idle/wall times.
    #[arg(long, default_value = DEFAULT_PROC_STAT)]
    pub proc_stat: PathBuf,

    /// Drive a simulated two-core platform instead of the real one.
    #[arg(long)]
    pub simulate: bool,

    /// Do not read operator commands from stdin.
    #[arg(long)]
    pub headless: bool,

    /// Normal sampling interval in milliseconds.
    #[arg(long)]
    pub rate_ms: Option<u64>,

    /// Low load threshold in percent.
    #[arg(long)]
    pub load_low: Option<u32>,

    /// High load threshold in percent.
    #[arg(long)]
    pub load_high: Option<u32>,

    /// Start with the user lock engaged.
    #[arg(long)]
    pub lock: bool,

    /// Delay before the first cycle, in milliseconds.
    #[arg(long)]
    pub startup_delay_ms: Option<u64>,
}

impl Args {
    /// Builds the policy configuration: file first, then command-line overrides.
    pub fn policy_config(&self) -> Result<PolicyConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => PolicyConfig::default(),
        };

        if let Some(rate) = self.rate_ms {
            config.sample_interval_ms = rate;
        }
        if let Some(low) = self.load_low {
            config.load_threshold_low = low;
        }
        if let Some(high) = self.load_high {
            config.load_threshold_high = high;
        }
        if self.lock {
            config.initial_user_lock = true;
        }
        if let Some(delay) = self.startup_delay_ms {
            config.startup_delay_ms = delay;
        }

        config.validate().context("invalid policy configuration")?;
        Ok(config)
    }
}

/// Reads a [`PolicyConfig`] from a TOML file.
pub fn load_config(path: &Path) -> Result<PolicyConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("cannot parse config file {}", path.display()))
}

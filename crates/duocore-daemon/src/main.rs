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

//! `duocored`: two-core hotplug policy daemon.

mod cli;
mod console;

use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::Receiver;
use cli::Args;
use console::Console;
use duocore_control::{HotplugEngine, HotplugService, LifecycleGateway};
use duocore_core::{CpuHotplug, CpuTimeSource};
use duocore_infra::lifecycle::LifecycleDispatcher;
use duocore_infra::platform::{ProcStatTimes, SimulatedPlatform, SysfsHotplug};
use std::io;
use std::sync::Arc;

/// Cores exposed by the simulated platform.
const SIMULATED_CORES: usize = 2;

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = args.policy_config()?;
    log::info!(
        "Starting duocored v{} (rate {}ms, thresholds {}..{}%, secondary {}).",
        env!("CARGO_PKG_VERSION"),
        config.sample_interval_ms,
        config.load_threshold_low,
        config.load_threshold_high,
        config.secondary(),
    );

    let simulation = args
        .simulate
        .then(|| Arc::new(SimulatedPlatform::new(SIMULATED_CORES)));
    let (hotplug, times): (Arc<dyn CpuHotplug>, Arc<dyn CpuTimeSource>) = match &simulation {
        Some(sim) => {
            log::info!("Using a simulated {SIMULATED_CORES}-core platform.");
            let hotplug: Arc<dyn CpuHotplug> = sim.clone();
            let times: Arc<dyn CpuTimeSource> = sim.clone();
            (hotplug, times)
        }
        None => {
            let hotplug: Arc<dyn CpuHotplug> = Arc::new(SysfsHotplug::new(&args.sysfs_root));
            let times: Arc<dyn CpuTimeSource> = Arc::new(ProcStatTimes::new(&args.proc_stat));
            (hotplug, times)
        }
    };

    let startup_delay = config.startup_delay();
    let (engine, signals) =
        HotplugEngine::new(config, hotplug, times).context("Failed to create hotplug engine")?;
    let engine = Arc::new(engine);

    let dispatcher = Arc::new(LifecycleDispatcher::new());
    let gateway = Arc::new(LifecycleGateway::new(Arc::clone(&engine)));
    gateway
        .register(dispatcher.as_ref())
        .context("Failed to register lifecycle listeners")?;

    let service = HotplugService::new(Arc::clone(&engine));
    #[cfg(target_os = "linux")]
    let service =
        service.with_affinity(Arc::new(duocore_infra::platform::SchedAffinity));
    let mut service = service;
    service
        .start(signals, startup_delay)
        .context("Failed to start hotplug service")?;

    if args.headless {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(1);
        ctrlc::set_handler(move || {
            let _ = stop_tx.try_send(());
        })
        .context("Failed to install the termination handler")?;
        log::info!("Running headless, stop with SIGINT or SIGTERM.");
        wait_for_shutdown(&stop_rx);
    } else {
        let console = Console::new(Arc::clone(&engine), dispatcher, simulation);
        console.run(io::stdin().lock(), io::stdout().lock())?;
    }

    service.stop();
    log::info!("duocored stopped.");
    Ok(())
}

/// Blocks until a termination request arrives or every sender is gone.
fn wait_for_shutdown(stop: &Receiver<()>) {
    if stop.recv().is_ok() {
        log::info!("Termination requested, shutting down.");
    }
}

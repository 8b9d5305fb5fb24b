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

use duocore_control::{CycleOutcome, HotplugEngine, PolicyConfig};
use duocore_core::{CoreId, CpuHotplug};
use duocore_infra::platform::SimulatedPlatform;
use std::sync::Arc;

const SECONDARY: CoreId = CoreId(1);

fn platform(secondary_online: bool) -> Arc<SimulatedPlatform> {
    let platform = Arc::new(SimulatedPlatform::new(2));
    platform.set_online(SECONDARY, secondary_online);
    platform
}

fn engine(platform: &Arc<SimulatedPlatform>) -> HotplugEngine {
    let (engine, _rx) =
        HotplugEngine::new(PolicyConfig::default(), platform.clone(), platform.clone())
            .expect("default config should be valid");
    engine
}

/// Feeds `loads` one cycle at a time and records the secondary's state after each.
fn drive(engine: &HotplugEngine, platform: &SimulatedPlatform, loads: &[u32]) -> Vec<bool> {
    loads
        .iter()
        .map(|&load| {
            platform.set_all_loads(load);
            engine.run_cycle();
            platform.is_online(SECONDARY)
        })
        .collect()
}

#[test]
fn test_low_load_never_brings_secondary_up() {
    // --- 1. ARRANGE ---
    let platform = platform(false);
    let engine = engine(&platform);

    // --- 2. ACT ---
    let states = drive(&engine, &platform, &[0, 5, 19, 12, 3, 19]);

    // --- 3. ASSERT ---
    assert!(states.iter().all(|online| !online));
    assert_eq!(platform.up_calls(), 0);
    assert_eq!(platform.down_calls(), 0);
}

#[test]
fn test_high_load_never_takes_secondary_down() {
    let platform = platform(true);
    let engine = engine(&platform);

    let states = drive(&engine, &platform, &[61, 100, 75, 99, 61]);

    assert!(states.iter().all(|&online| online));
    assert_eq!(platform.down_calls(), 0);
}

#[test]
fn test_mid_band_holds_either_state() {
    // The band is inclusive at both thresholds.
    let band = [20, 35, 60, 45, 20, 60];

    for initially_online in [false, true] {
        let platform = platform(initially_online);
        let engine = engine(&platform);

        let states = drive(&engine, &platform, &band);

        assert!(
            states.iter().all(|&online| online == initially_online),
            "secondary changed state inside the band (started online: {initially_online})"
        );
        assert_eq!(platform.up_calls() + platform.down_calls(), 0);
    }
}

#[test]
fn test_sample_scenario() {
    let platform = platform(false);
    let engine = engine(&platform);

    let states = drive(&engine, &platform, &[10, 15, 70, 65, 30]);

    assert_eq!(states, vec![false, false, true, true, true]);
    let status = engine.status();
    assert_eq!(status.stats.cycles, 5);
    assert_eq!(status.stats.online_transitions, 1);
    assert_eq!(status.last_avg_load, Some(30));
}

#[test]
fn test_delay_follows_last_transition() {
    let platform = platform(false);
    let engine = engine(&platform);
    let config = engine.config();

    platform.set_all_loads(80);
    assert_eq!(
        engine.run_cycle(),
        CycleOutcome::Reschedule(config.boosted_interval())
    );

    // Load drops into the band: no transition, the boosted delay sticks.
    platform.set_all_loads(50);
    assert_eq!(
        engine.run_cycle(),
        CycleOutcome::Reschedule(config.boosted_interval())
    );

    platform.set_all_loads(10);
    assert_eq!(
        engine.run_cycle(),
        CycleOutcome::Reschedule(config.sample_interval())
    );
    assert!(!platform.is_online(SECONDARY));
}

#[test]
fn test_average_spans_every_online_core() {
    let platform = platform(true);
    let engine = engine(&platform);

    // (15 + 20) / 2 = 17, below the default low threshold.
    platform.set_load(CoreId(0), 15);
    platform.set_load(SECONDARY, 20);
    engine.run_cycle();

    assert_eq!(engine.status().last_avg_load, Some(17));
    assert!(!platform.is_online(SECONDARY));
}

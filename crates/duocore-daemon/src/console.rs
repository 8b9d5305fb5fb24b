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

//! Line-oriented operator console.
//!
//! ```text
//! get <attribute>          read an attribute
//! set <attribute> <value>  write an attribute
//! list                     list attributes and their values
//! status                   engine snapshot
//! restart                  restart a halted sampling loop
//! event <name>             inject suspend | resume | restore | reboot
//! load <percent>           set the simulated load (--simulate only)
//! help | quit
//! ```

use anyhow::Result;
use duocore_control::{Attribute, AttributeSurface, HotplugEngine};
use duocore_core::LifecycleEvent;
use duocore_infra::lifecycle::LifecycleDispatcher;
use duocore_infra::platform::SimulatedPlatform;
use std::fmt::Write as _;
use std::io::{BufRead, Write};
use std::sync::Arc;

const HELP: &str = "commands: get <attr> | set <attr> <value> | list | status | restart | \
event <suspend|resume|restore|reboot> | load <percent> | help | quit";

/// A parsed console command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Get(String),
    Set(String, String),
    List,
    Status,
    Restart,
    Event(LifecycleEvent),
    Load(u32),
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, String> {
        let mut words = line.split_whitespace();
        let Some(verb) = words.next() else {
            return Ok(None);
        };
        let arg = words.next();
        let command = match (verb, arg) {
            ("get", Some(attr)) => Command::Get(attr.to_string()),
            ("set", Some(attr)) => {
                let value = words.collect::<Vec<_>>().join(" ");
                if value.is_empty() {
                    return Err("usage: set <attribute> <value>".into());
                }
                return Ok(Some(Command::Set(attr.to_string(), value)));
            }
            ("list", None) => Command::List,
            ("status", None) => Command::Status,
            ("restart", None) => Command::Restart,
            ("event", Some(name)) => LifecycleEvent::from_name(name)
                .map(Command::Event)
                .ok_or_else(|| format!("unknown event '{name}'"))?,
            ("load", Some(value)) => value
                .parse()
                .map(Command::Load)
                .map_err(|_| format!("invalid load '{value}'"))?,
            ("help", None) => Command::Help,
            ("quit" | "exit", None) => Command::Quit,
            _ => return Err(format!("unrecognized command '{}'", line.trim())),
        };
        if words.next().is_some() {
            return Err(format!("too many arguments for '{verb}'"));
        }
        Ok(Some(command))
    }
}

/// Executes console commands against the running engine.
pub struct Console {
    engine: Arc<HotplugEngine>,
    surface: AttributeSurface,
    dispatcher: Arc<LifecycleDispatcher>,
    simulation: Option<Arc<SimulatedPlatform>>,
}

impl Console {
    /// Creates a console. `simulation` enables the `load` command.
    pub fn new(
        engine: Arc<HotplugEngine>,
        dispatcher: Arc<LifecycleDispatcher>,
        simulation: Option<Arc<SimulatedPlatform>>,
    ) -> Self {
        Self {
            surface: AttributeSurface::new(Arc::clone(&engine)),
            engine,
            dispatcher,
            simulation,
        }
    }

    /// Executes one command and returns the text to print.
    pub fn execute(&self, command: &Command) -> String {
        match command {
            Command::Get(name) => match self.surface.read_named(name) {
                Ok(value) => value,
                Err(e) => format!("error: {e}"),
            },
            Command::Set(name, value) => match self.surface.write_named(name, value) {
                Ok(()) => "ok".into(),
                Err(e) => format!("error: {e}"),
            },
            Command::List => {
                let mut out = String::new();
                for attr in Attribute::ALL {
                    let mode = if attr.is_writable() { "rw" } else { "ro" };
                    let _ = writeln!(out, "{attr} ({mode}) = {}", self.surface.read(attr));
                }
                out.trim_end().to_string()
            }
            Command::Status => self.status(),
            Command::Restart => {
                if self.engine.resume_loop() {
                    "sampling loop restarted".into()
                } else {
                    "nothing to restart: loop already scheduled or hotplug_on is off".into()
                }
            }
            Command::Event(event) => {
                let notified = self.dispatcher.dispatch(*event);
                format!("{event:?} delivered to {notified} handler(s)")
            }
            Command::Load(load) => match &self.simulation {
                Some(sim) => {
                    sim.set_all_loads(*load);
                    format!("simulated load set to {}%", (*load).min(100))
                }
                None => "error: load is only available with --simulate".into(),
            },
            Command::Help => HELP.into(),
            Command::Quit => "bye".into(),
        }
    }

    fn status(&self) -> String {
        let status = self.engine.status();
        let loads = status
            .core_loads
            .iter()
            .map(|(core, load)| format!("{core}={load}%"))
            .collect::<Vec<_>>()
            .join(" ");
        format!(
            "autonomous={} locked={} always_on={} {}={} loop={} delay={:?} ({:?}) \
             avg_load={} loads=[{}] cycles={} up={} down={} failed={} skipped={}",
            status.flags.autonomous_enabled,
            status.flags.user_locked,
            status.flags.always_on_pin,
            self.engine.secondary(),
            if status.secondary_online { "online" } else { "offline" },
            if status.loop_scheduled { "scheduled" } else { "halted" },
            status.delay,
            status.next_delay,
            status
                .last_avg_load
                .map_or_else(|| "-".to_string(), |l| format!("{l}%")),
            loads,
            status.stats.cycles,
            status.stats.online_transitions,
            status.stats.offline_transitions,
            status.stats.failed_transitions,
            status.stats.skipped_cycles,
        )
    }

    /// Reads commands from `input` until EOF or `quit`.
    pub fn run(&self, input: impl BufRead, mut output: impl Write) -> Result<()> {
        for line in input.lines() {
            let line = line?;
            let reply = match Command::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => self.execute(&command),
                Ok(None) => continue,
                Err(e) => format!("error: {e}"),
            };
            writeln!(output, "{reply}")?;
            output.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duocore_control::{LifecycleGateway, PolicyConfig};
    use std::io::Cursor;

    fn console() -> (Console, Arc<HotplugEngine>) {
        let sim = Arc::new(SimulatedPlatform::new(2));
        let (engine, _rx) =
            HotplugEngine::new(PolicyConfig::default(), sim.clone(), sim.clone()).unwrap();
        let engine = Arc::new(engine);
        let dispatcher = Arc::new(LifecycleDispatcher::new());
        let gateway = Arc::new(LifecycleGateway::new(engine.clone()));
        gateway.register(dispatcher.as_ref()).unwrap();
        (
            Console::new(engine.clone(), dispatcher, Some(sim)),
            engine,
        )
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            Command::parse("get hotplug_on"),
            Ok(Some(Command::Get("hotplug_on".into())))
        );
        assert_eq!(
            Command::parse("set second_core_on off"),
            Ok(Some(Command::Set("second_core_on".into(), "off".into())))
        );
        assert_eq!(
            Command::parse("event suspend"),
            Ok(Some(Command::Event(LifecycleEvent::SuspendPrepare)))
        );
        assert_eq!(Command::parse("   "), Ok(None));
        assert!(Command::parse("set rate").is_err());
        assert!(Command::parse("event hibernate").is_err());
        assert!(Command::parse("status now").is_err());
    }

    #[test]
    fn test_set_then_get() {
        let (console, engine) = console();
        assert_eq!(
            console.execute(&Command::Set("hotplug_on".into(), "off".into())),
            "ok"
        );
        assert!(!engine.autonomous());
        assert_eq!(console.execute(&Command::Get("hotplug_on".into())), "off");
    }

    #[test]
    fn test_malformed_write_reports_error() {
        let (console, engine) = console();
        let reply = console.execute(&Command::Set("hotplug_on".into(), "maybe".into()));
        assert!(reply.starts_with("error: malformed value"));
        assert!(engine.autonomous());
    }

    #[test]
    fn test_session_over_reader() {
        let (console, engine) = console();
        let input = Cursor::new("event suspend\nget lock\nevent resume\nget lock\nquit\nget lock\n");
        let mut output = Vec::new();
        console.run(input, &mut output).unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[1], "1");
        assert_eq!(lines[3], "0");
        assert!(!engine.user_locked());
    }

    #[test]
    fn test_restart_only_when_halted() {
        let (console, engine) = console();
        assert_eq!(Command::parse("restart"), Ok(Some(Command::Restart)));
        assert!(console.execute(&Command::Restart).starts_with("nothing to restart"));

        engine.set_autonomous(false).unwrap();
        engine.run_cycle();
        assert!(!engine.is_loop_scheduled());
        assert!(console.execute(&Command::Restart).starts_with("nothing to restart"));
        assert!(!engine.is_loop_scheduled());
    }

    #[test]
    fn test_list_and_status() {
        let (console, _) = console();
        let list = console.execute(&Command::List);
        assert!(list.contains("hotplug_on (rw) = on"));
        assert!(list.contains("version (ro) = 1"));
        let status = console.execute(&Command::Status);
        assert!(status.contains("cpu1=online"));
        assert!(status.contains("loop=scheduled"));
    }
}

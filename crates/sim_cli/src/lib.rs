use std::io::Write;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use escape_engine::{
    GameSnapshot, InputAction, InputCollector, InteractTrigger, LoopConfig, MainController,
    ManualClock, Minigame, MinigameError, MinigameRegistry, MinigameSurface, OnComplete,
    RoomLayout, SessionEnd, TickMetrics, TickReport,
};
use serde_json::json;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, Clone)]
pub struct SimOptions {
    pub format: OutputFormat,
    pub interact_trigger: InteractTrigger,
    pub target_tps: u32,
    /// Raw JSON room layout; the embedded campus is used when absent.
    pub layout_json: Option<String>,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            interact_trigger: InteractTrigger::Edge,
            target_tps: LoopConfig::default().target_tps,
            layout_json: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptCommand {
    /// Hold an action down for a number of ticks, then release it.
    Hold { action: InputAction, ticks: u32 },
    /// Press and release an action within one tick.
    Press { action: InputAction },
    /// Run ticks with no input.
    Wait { ticks: u32 },
    /// Report a result for the minigame currently waiting on one.
    Complete { success: bool },
    /// Move the simulated clock without ticking.
    Advance { seconds: u64 },
    /// Print the current state.
    Dump,
}

pub fn parse_action(raw: &str) -> Result<InputAction, String> {
    match raw.to_ascii_lowercase().as_str() {
        "up" => Ok(InputAction::MoveUp),
        "down" => Ok(InputAction::MoveDown),
        "left" => Ok(InputAction::MoveLeft),
        "right" => Ok(InputAction::MoveRight),
        "interact" => Ok(InputAction::Interact),
        "cancel" => Ok(InputAction::Cancel),
        other => Err(format!(
            "unknown action '{other}' (expected up, down, left, right, interact or cancel)"
        )),
    }
}

fn parse_count<T: std::str::FromStr>(raw: Option<&str>, what: &str) -> Result<T, String> {
    let raw = raw.ok_or_else(|| format!("missing {what}"))?;
    raw.parse::<T>()
        .map_err(|_| format!("invalid {what} '{raw}'"))
}

pub fn parse_script_line(line: &str) -> Result<ScriptCommand, String> {
    let mut words = line.split_whitespace();
    let verb = words.next().ok_or_else(|| "empty command".to_string())?;
    let command = match verb {
        "hold" => ScriptCommand::Hold {
            action: parse_action(words.next().ok_or("hold requires an action")?)?,
            ticks: parse_count(words.next(), "tick count")?,
        },
        "press" => ScriptCommand::Press {
            action: parse_action(words.next().ok_or("press requires an action")?)?,
        },
        "wait" => ScriptCommand::Wait {
            ticks: parse_count(words.next(), "tick count")?,
        },
        "complete" => match words.next() {
            Some("success") => ScriptCommand::Complete { success: true },
            Some("fail") => ScriptCommand::Complete { success: false },
            _ => return Err("complete requires 'success' or 'fail'".to_string()),
        },
        "advance" => ScriptCommand::Advance {
            seconds: parse_count(words.next(), "seconds")?,
        },
        "dump" => ScriptCommand::Dump,
        other => return Err(format!("unknown command '{other}'")),
    };
    if let Some(extra) = words.next() {
        return Err(format!("unexpected argument '{extra}' for '{verb}'"));
    }
    Ok(command)
}

/// Parses a script, skipping blank lines and `#` comments. Errors name the
/// 1-based line they came from.
pub fn parse_script(content: &str) -> Result<Vec<ScriptCommand>, String> {
    let mut commands = Vec::new();
    for (index, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let command =
            parse_script_line(trimmed).map_err(|err| format!("line {}: {err}", index + 1))?;
        commands.push(command);
    }
    Ok(commands)
}

/// Callback slot shared by every scripted minigame in one run.
#[derive(Clone, Default)]
struct PendingReport {
    slot: Arc<Mutex<Option<OnComplete>>>,
}

impl PendingReport {
    fn lock(&self) -> MutexGuard<'_, Option<OnComplete>> {
        match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn complete(&self, success: bool, elapsed_seconds: u32) -> bool {
        let Some(on_complete) = self.lock().take() else {
            return false;
        };
        on_complete(success, elapsed_seconds);
        true
    }
}

/// Stands in for an interactive minigame; it finishes only when the script
/// says so.
struct ScriptedMinigame {
    name: String,
    pending: PendingReport,
}

impl Minigame for ScriptedMinigame {
    fn start(
        &mut self,
        _surface: MinigameSurface,
        on_complete: OnComplete,
    ) -> Result<(), MinigameError> {
        *self.pending.lock() = Some(on_complete);
        Ok(())
    }

    fn stop(&mut self) {
        self.pending.lock().take();
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Scripted minigame"
    }
}

fn scripted_registry(layout: &RoomLayout, pending: &PendingReport) -> MinigameRegistry {
    let mut registry = MinigameRegistry::new();
    for key in layout.minigame_keys() {
        let name = format!("scripted:{key}");
        let pending = pending.clone();
        registry.register(key, name.clone(), "Scripted minigame", move || {
            Box::new(ScriptedMinigame {
                name: name.clone(),
                pending: pending.clone(),
            })
        });
    }
    registry
}

struct Simulation {
    controller: MainController,
    input: InputCollector,
    clock: ManualClock,
    pending: PendingReport,
    fixed_dt: Duration,
    format: OutputFormat,
}

impl Simulation {
    fn new(opts: &SimOptions) -> Result<Self, String> {
        let layout = match &opts.layout_json {
            Some(raw) => RoomLayout::from_json_str(raw),
            None => RoomLayout::campus(),
        }
        .map_err(|err| format!("failed to load layout: {err}"))?;
        let config = LoopConfig {
            target_tps: opts.target_tps.max(1),
            interact_trigger: opts.interact_trigger,
            ..LoopConfig::default()
        };
        let clock = ManualClock::new();
        let pending = PendingReport::default();
        let registry = scripted_registry(&layout, &pending);
        let controller =
            MainController::from_layout(&layout, &config, registry, Box::new(clock.clone()))
                .map_err(|err| format!("failed to build controller: {err}"))?;
        info!(
            room_count = layout.room_count(),
            target_tps = config.target_tps,
            "simulation_ready"
        );

        Ok(Self {
            controller,
            input: InputCollector::new(),
            clock,
            pending,
            fixed_dt: config.fixed_dt(),
            format: opts.format,
        })
    }

    fn tick<W: Write>(&mut self, out: &mut W) -> Result<(), String> {
        let snapshot = self.input.snapshot_for_tick();
        let tick = self.controller.tick_count();
        let report = self
            .controller
            .tick(&snapshot)
            .map_err(|err| format!("tick {tick} failed: {err}"))?;
        self.clock.advance(self.fixed_dt);
        self.emit_report(out, tick, &report)
    }

    fn run_ticks<W: Write>(&mut self, out: &mut W, ticks: u32) -> Result<(), String> {
        for _ in 0..ticks {
            self.tick(out)?;
        }
        Ok(())
    }

    fn apply<W: Write>(&mut self, command: ScriptCommand, out: &mut W) -> Result<(), String> {
        match command {
            ScriptCommand::Hold { action, ticks } => {
                self.input.set_action(action, true);
                let result = self.run_ticks(out, ticks);
                self.input.set_action(action, false);
                result
            }
            ScriptCommand::Press { action } => {
                self.input.set_action(action, true);
                self.input.set_action(action, false);
                self.tick(out)
            }
            ScriptCommand::Wait { ticks } => self.run_ticks(out, ticks),
            ScriptCommand::Complete { success } => {
                if self.pending.complete(success, 0) {
                    Ok(())
                } else {
                    Err("no minigame is waiting for a result".to_string())
                }
            }
            ScriptCommand::Advance { seconds } => {
                self.clock.advance(Duration::from_secs(seconds));
                Ok(())
            }
            ScriptCommand::Dump => self.emit_snapshot(out),
        }
    }

    fn emit_report<W: Write>(
        &self,
        out: &mut W,
        tick: u64,
        report: &TickReport,
    ) -> Result<(), String> {
        let mut events = Vec::new();
        if let Some(change) = report.room_change {
            events.push((
                format!("room {} -> {}", change.from, change.to),
                json!({ "tick": tick, "event": "room_changed", "from": change.from, "to": change.to }),
            ));
        }
        if let Some(dialogue) = &report.dialogue {
            events.push((
                format!("dialogue {dialogue}"),
                json!({ "tick": tick, "event": "dialogue", "text": dialogue }),
            ));
        }
        if let Some(session) = report.minigame_started {
            events.push((
                format!("minigame {} started", session.0),
                json!({ "tick": tick, "event": "minigame_started", "session": session.0 }),
            ));
        }
        match &report.session_ended {
            Some(SessionEnd::Scored(score)) => events.push((
                format!(
                    "room {} scored {} points in {}s",
                    score.room_id(),
                    score.points_gained(),
                    score.time_taken_seconds()
                ),
                json!({ "tick": tick, "event": "minigame_scored", "score": score }),
            )),
            Some(SessionEnd::Failed { room_id }) => events.push((
                format!("room {room_id} minigame failed"),
                json!({ "tick": tick, "event": "minigame_failed", "room_id": room_id }),
            )),
            Some(SessionEnd::Ignored) | None => {}
        }
        if report.run_completed {
            events.push((
                "all rooms completed".to_string(),
                json!({ "tick": tick, "event": "run_completed" }),
            ));
        }

        for (text, value) in events {
            match self.format {
                OutputFormat::Text => write_line(out, &format!("tick {tick}: {text}"))?,
                OutputFormat::Json => write_line(out, &value.to_string())?,
            }
        }
        Ok(())
    }

    fn snapshot(&self) -> GameSnapshot {
        self.controller.snapshot(TickMetrics::default())
    }

    fn emit_snapshot<W: Write>(&self, out: &mut W) -> Result<(), String> {
        let snapshot = self.snapshot();
        match self.format {
            OutputFormat::Text => write_line(out, &describe_snapshot(&snapshot)),
            OutputFormat::Json => {
                let encoded = serde_json::to_string(&snapshot)
                    .map_err(|err| format!("failed to encode snapshot: {err}"))?;
                write_line(out, &encoded)
            }
        }
    }
}

fn write_line<W: Write>(out: &mut W, line: &str) -> Result<(), String> {
    writeln!(out, "{line}").map_err(|err| format!("failed to write output: {err}"))
}

pub fn describe_snapshot(snapshot: &GameSnapshot) -> String {
    let mut parts = vec![
        format!("tick {}", snapshot.tick),
        format!("room {} ({})", snapshot.room_id, snapshot.room_name),
        format!(
            "player ({}, {})",
            snapshot.player.position.x, snapshot.player.position.y
        ),
        format!("score {}", snapshot.total_score),
    ];
    if let Some(minigame) = &snapshot.minigame {
        parts.push(format!("minigame {}", minigame.name));
    }
    if snapshot.all_rooms_completed {
        parts.push("completed".to_string());
    }
    parts.join(" | ")
}

/// Runs `commands` against a fresh controller on a simulated clock, then
/// prints the final state.
pub fn run<W: Write>(
    commands: &[ScriptCommand],
    opts: &SimOptions,
    stdout: &mut W,
) -> Result<(), String> {
    let mut simulation = Simulation::new(opts)?;
    for command in commands {
        simulation.apply(*command, stdout)?;
    }
    if simulation.controller.is_minigame_active() {
        warn!("script_ended_with_active_minigame");
    }
    simulation.controller.shutdown();
    simulation.emit_snapshot(stdout)
}

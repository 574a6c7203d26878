use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::entity::PlayerTuning;
use crate::geometry::Point2D;

use super::controller::MainController;
use super::input::{InputHandle, InteractTrigger};
use super::metrics::{MetricsAccumulator, TickMetrics};
use super::snapshot::SnapshotHandle;

pub const LOOP_THREAD_NAME: &str = "game-loop";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    /// Cooperative sleep between loop iterations.
    pub idle_sleep: Duration,
    pub metrics_log_interval: Duration,
    pub interact_trigger: InteractTrigger,
    /// `None` (or zero) lets a silent minigame stay active forever.
    pub minigame_timeout: Option<Duration>,
    pub environment_size: Point2D,
    pub player_tuning: PlayerTuning,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            idle_sleep: Duration::from_millis(1),
            metrics_log_interval: Duration::from_secs(1),
            interact_trigger: InteractTrigger::Edge,
            minigame_timeout: Some(Duration::from_secs(300)),
            environment_size: Point2D::new(1280, 720),
            player_tuning: PlayerTuning::default(),
        }
    }
}

impl LoopConfig {
    pub fn fixed_dt(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.target_tps.max(1)))
    }
}

#[derive(Debug, Error)]
pub enum LoopError {
    #[error("failed to spawn game-loop thread: {0}")]
    SpawnThread(#[source] std::io::Error),
    #[error("controller was lost when the game-loop thread died")]
    ControllerUnavailable,
}

enum LoopCommand {
    Resize(Point2D),
}

/// Runs a [`MainController`] at a fixed tick rate on its own thread.
///
/// The controller moves into the thread on `start` and comes back on `stop`.
/// Input goes in through [`InputHandle`], state comes out through
/// [`SnapshotHandle`].
pub struct GameLoop {
    config: LoopConfig,
    controller: Option<MainController>,
    input: InputHandle,
    snapshots: SnapshotHandle,
    running: Arc<AtomicBool>,
    commands: Option<Sender<LoopCommand>>,
    thread: Option<JoinHandle<MainController>>,
}

impl GameLoop {
    pub fn new(config: LoopConfig, controller: MainController) -> Self {
        let snapshots = SnapshotHandle::default();
        snapshots.publish(controller.snapshot(TickMetrics::default()));
        Self {
            config,
            controller: Some(controller),
            input: InputHandle::default(),
            snapshots,
            running: Arc::new(AtomicBool::new(false)),
            commands: None,
            thread: None,
        }
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn input(&self) -> InputHandle {
        self.input.clone()
    }

    pub fn snapshots(&self) -> SnapshotHandle {
        self.snapshots.clone()
    }

    /// False once stopped, including when the loop stopped itself after a
    /// fatal tick error.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn start(&mut self) -> Result<(), LoopError> {
        if self.thread.is_some() {
            if self.is_running() {
                debug!("game_loop_already_running");
                return Ok(());
            }
            self.join_thread();
        }

        let controller = self
            .controller
            .take()
            .ok_or(LoopError::ControllerUnavailable)?;
        let (command_tx, command_rx) = mpsc::channel();
        let worker = LoopWorker {
            settings: LoopSettings::from_config(&self.config),
            input: self.input.clone(),
            snapshots: self.snapshots.clone(),
            running: Arc::clone(&self.running),
            commands: command_rx,
        };

        self.running.store(true, Ordering::Release);
        let spawned = thread::Builder::new()
            .name(LOOP_THREAD_NAME.to_string())
            .spawn(move || worker.run(controller));
        match spawned {
            Ok(handle) => {
                self.thread = Some(handle);
                self.commands = Some(command_tx);
                Ok(())
            }
            Err(source) => {
                self.running.store(false, Ordering::Release);
                Err(LoopError::SpawnThread(source))
            }
        }
    }

    /// Signals the loop to finish after its current tick and waits for it.
    /// Calling it on a stopped loop does nothing.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        self.join_thread();
    }

    /// Applies new environment bounds at the next tick boundary.
    pub fn resize(&mut self, environment_size: Point2D) {
        self.config.environment_size = environment_size;
        if let Some(controller) = self.controller.as_mut() {
            controller.resize(environment_size);
            self.snapshots
                .publish(controller.snapshot(self.snapshots.snapshot().metrics));
            return;
        }
        if let Some(commands) = &self.commands {
            if commands.send(LoopCommand::Resize(environment_size)).is_err() {
                warn!("resize_dropped_loop_gone");
            }
        }
    }

    /// Stops the loop and hands back the controller.
    pub fn into_controller(mut self) -> Option<MainController> {
        self.stop();
        self.controller.take()
    }

    fn join_thread(&mut self) {
        self.commands = None;
        let Some(handle) = self.thread.take() else {
            return;
        };
        match handle.join() {
            Ok(controller) => self.controller = Some(controller),
            Err(_) => error!("game_loop_panicked"),
        }
    }
}

impl Drop for GameLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Copy)]
struct LoopSettings {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks_per_frame: u32,
    idle_sleep: Duration,
    metrics_log_interval: Duration,
}

impl LoopSettings {
    fn from_config(config: &LoopConfig) -> Self {
        Self {
            fixed_dt: config.fixed_dt(),
            max_frame_delta: normalize_non_zero_duration(
                config.max_frame_delta,
                Duration::from_millis(250),
            ),
            max_ticks_per_frame: config.max_ticks_per_frame.max(1),
            idle_sleep: config.idle_sleep,
            metrics_log_interval: normalize_non_zero_duration(
                config.metrics_log_interval,
                Duration::from_secs(1),
            ),
        }
    }
}

struct LoopWorker {
    settings: LoopSettings,
    input: InputHandle,
    snapshots: SnapshotHandle,
    running: Arc<AtomicBool>,
    commands: Receiver<LoopCommand>,
}

impl LoopWorker {
    fn run(self, mut controller: MainController) -> MainController {
        let settings = self.settings;
        info!(
            tps = (1.0 / settings.fixed_dt.as_secs_f64()).round() as u64,
            max_frame_delta_ms = settings.max_frame_delta.as_millis() as u64,
            max_ticks_per_frame = settings.max_ticks_per_frame,
            idle_sleep_ms = settings.idle_sleep.as_millis() as u64,
            interact_trigger = ?controller.interact_trigger(),
            "game_loop_started"
        );

        let mut accumulator = Duration::ZERO;
        let mut last_instant = Instant::now();
        let mut metrics_accumulator =
            MetricsAccumulator::new(settings.metrics_log_interval, last_instant);
        let mut metrics = self.snapshots.snapshot().metrics;

        'frames: while self.running.load(Ordering::Acquire) {
            while let Ok(command) = self.commands.try_recv() {
                match command {
                    LoopCommand::Resize(environment_size) => controller.resize(environment_size),
                }
            }

            let now = Instant::now();
            let raw_frame_dt = now.saturating_duration_since(last_instant);
            last_instant = now;
            accumulator =
                accumulator.saturating_add(clamp_frame_delta(raw_frame_dt, settings.max_frame_delta));

            let step_plan =
                plan_sim_steps(accumulator, settings.fixed_dt, settings.max_ticks_per_frame);
            match self.run_ticks(&mut controller, step_plan.ticks_to_run, &mut metrics_accumulator) {
                TickBatch::Completed => {}
                TickBatch::Stopped | TickBatch::Fatal => break 'frames,
            }
            accumulator = step_plan.remaining_accumulator;

            if step_plan.dropped_backlog > Duration::ZERO {
                metrics_accumulator.record_dropped_backlog(step_plan.dropped_backlog);
                warn!(
                    dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                    max_ticks_per_frame = settings.max_ticks_per_frame,
                    "sim_clamp_triggered"
                );
            }

            if let Some(next) = metrics_accumulator.maybe_snapshot(now) {
                metrics = next;
                info!(
                    tps = metrics.tps,
                    tick_time_ms = metrics.tick_time_ms,
                    tick = controller.tick_count(),
                    room_id = controller.state().current_room_id().0,
                    minigame_active = controller.is_minigame_active(),
                    "loop_metrics"
                );
            }

            if step_plan.ticks_to_run > 0 {
                self.snapshots.publish(controller.snapshot(metrics));
            }

            thread::sleep(settings.idle_sleep);
        }

        controller.shutdown();
        self.snapshots.publish(controller.snapshot(metrics));
        info!(tick = controller.tick_count(), "game_loop_stopped");
        controller
    }

    /// Runs up to `ticks` ticks, checking the running flag before each one
    /// so a stop never waits out the rest of a catch-up batch.
    fn run_ticks(
        &self,
        controller: &mut MainController,
        ticks: u32,
        metrics_accumulator: &mut MetricsAccumulator,
    ) -> TickBatch {
        for _ in 0..ticks {
            if !self.running.load(Ordering::Acquire) {
                return TickBatch::Stopped;
            }
            let input = self.input.snapshot_for_tick();
            let tick_started = Instant::now();
            if let Err(error) = controller.tick(&input) {
                error!(
                    error = %error,
                    tick = controller.tick_count(),
                    room_id = controller.state().current_room_id().0,
                    "fatal_tick_error"
                );
                self.running.store(false, Ordering::Release);
                return TickBatch::Fatal;
            }
            metrics_accumulator.record_tick(tick_started.elapsed());
        }
        TickBatch::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickBatch {
    Completed,
    Stopped,
    Fatal,
}

#[derive(Debug, Clone, Copy)]
struct StepPlan {
    ticks_to_run: u32,
    remaining_accumulator: Duration,
    dropped_backlog: Duration,
}

fn plan_sim_steps(
    mut accumulator: Duration,
    fixed_dt: Duration,
    max_ticks_per_frame: u32,
) -> StepPlan {
    let mut ticks_to_run = 0u32;

    while accumulator >= fixed_dt && ticks_to_run < max_ticks_per_frame {
        accumulator = accumulator.saturating_sub(fixed_dt);
        ticks_to_run = ticks_to_run.saturating_add(1);
    }

    if accumulator >= fixed_dt {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: Duration::ZERO,
            dropped_backlog: accumulator,
        }
    } else {
        StepPlan {
            ticks_to_run,
            remaining_accumulator: accumulator,
            dropped_backlog: Duration::ZERO,
        }
    }
}

fn clamp_frame_delta(frame_dt: Duration, max_frame_delta: Duration) -> Duration {
    frame_dt.min(max_frame_delta)
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

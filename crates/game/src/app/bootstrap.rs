use std::time::Duration;

use escape_engine::{
    GameLoop, InteractTrigger, LoopConfig, MainController, Point2D, RoomLayout, SystemClock,
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::loop_runner::AppError;
use crate::minigames;

const TARGET_TPS_ENV_VAR: &str = "ESCAPE_TARGET_TPS";
const INTERACT_TRIGGER_ENV_VAR: &str = "ESCAPE_INTERACT_TRIGGER";
const MINIGAME_TIMEOUT_ENV_VAR: &str = "ESCAPE_MINIGAME_TIMEOUT_SECS";
const WINDOW_SIZE_ENV_VAR: &str = "ESCAPE_WINDOW_SIZE";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) game_loop: GameLoop,
}

pub(crate) fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

pub(crate) fn build_app() -> Result<AppWiring, AppError> {
    info!("=== UniversityEscape Startup ===");

    let mut config = LoopConfig::default();
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());

    let layout = RoomLayout::campus()?;
    let registry = minigames::builtin_registry();
    let controller =
        MainController::from_layout(&layout, &config, registry, Box::new(SystemClock))?;
    info!(
        room_count = layout.room_count(),
        target_tps = config.target_tps,
        interact_trigger = ?config.interact_trigger,
        minigame_timeout_secs = config.minigame_timeout.map_or(0, |timeout| timeout.as_secs()),
        width = config.environment_size.x,
        height = config.environment_size.y,
        "game_configured"
    );

    let game_loop = GameLoop::new(config.clone(), controller);
    Ok(AppWiring { config, game_loop })
}

fn apply_env_overrides(config: &mut LoopConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(raw) = lookup(TARGET_TPS_ENV_VAR) {
        match parse_target_tps(&raw) {
            Some(target_tps) => config.target_tps = target_tps,
            None => warn_invalid(TARGET_TPS_ENV_VAR, &raw),
        }
    }
    if let Some(raw) = lookup(INTERACT_TRIGGER_ENV_VAR) {
        match raw.parse::<InteractTrigger>() {
            Ok(trigger) => config.interact_trigger = trigger,
            Err(reason) => warn!(
                var = INTERACT_TRIGGER_ENV_VAR,
                value = %raw,
                reason = %reason,
                "invalid_env_override_ignored"
            ),
        }
    }
    if let Some(raw) = lookup(MINIGAME_TIMEOUT_ENV_VAR) {
        match parse_minigame_timeout(&raw) {
            Some(timeout) => config.minigame_timeout = timeout,
            None => warn_invalid(MINIGAME_TIMEOUT_ENV_VAR, &raw),
        }
    }
    if let Some(raw) = lookup(WINDOW_SIZE_ENV_VAR) {
        match parse_window_size(&raw) {
            Some(size) => config.environment_size = size,
            None => warn_invalid(WINDOW_SIZE_ENV_VAR, &raw),
        }
    }
}

fn warn_invalid(var: &str, raw: &str) {
    warn!(var, value = %raw, "invalid_env_override_ignored");
}

fn parse_target_tps(raw: &str) -> Option<u32> {
    raw.trim().parse::<u32>().ok().filter(|tps| *tps > 0)
}

/// `0` disables the timeout.
fn parse_minigame_timeout(raw: &str) -> Option<Option<Duration>> {
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some((seconds > 0).then(|| Duration::from_secs(seconds)))
}

/// Parses `WIDTHxHEIGHT`, both positive.
fn parse_window_size(raw: &str) -> Option<Point2D> {
    let (width, height) = raw.trim().split_once(['x', 'X'])?;
    let width = width.trim().parse::<i32>().ok().filter(|value| *value > 0)?;
    let height = height.trim().parse::<i32>().ok().filter(|value| *value > 0)?;
    Some(Point2D::new(width, height))
}

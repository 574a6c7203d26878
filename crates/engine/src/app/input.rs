use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InputAction {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    Interact,
    Cancel,
}

const ACTION_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ActionStates {
    down: [bool; ACTION_COUNT],
}

impl ActionStates {
    pub(crate) fn set(&mut self, action: InputAction, is_down: bool) {
        self.down[action.index()] = is_down;
    }

    pub(crate) fn is_down(&self, action: InputAction) -> bool {
        self.down[action.index()]
    }

    fn union(mut self, other: ActionStates) -> Self {
        for (state, other) in self.down.iter_mut().zip(other.down) {
            *state |= other;
        }
        self
    }
}

impl InputAction {
    pub const ALL: [InputAction; ACTION_COUNT] = [
        InputAction::MoveUp,
        InputAction::MoveDown,
        InputAction::MoveLeft,
        InputAction::MoveRight,
        InputAction::Interact,
        InputAction::Cancel,
    ];

    const fn index(self) -> usize {
        match self {
            InputAction::MoveUp => 0,
            InputAction::MoveDown => 1,
            InputAction::MoveLeft => 2,
            InputAction::MoveRight => 3,
            InputAction::Interact => 4,
            InputAction::Cancel => 5,
        }
    }
}

/// Which interact signal starts a door transition or an npc interaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InteractTrigger {
    /// Fires once per key press.
    #[default]
    Edge,
    /// Fires on every tick the key is held.
    Level,
}

impl FromStr for InteractTrigger {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "edge" => Ok(Self::Edge),
            "level" => Ok(Self::Level),
            other => Err(format!("expected 'edge' or 'level', got '{other}'")),
        }
    }
}

/// Input state for one tick: which actions are held, and which went down
/// since the previous tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputSnapshot {
    down: ActionStates,
    pressed: ActionStates,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.down.is_down(action)
    }

    pub fn pressed(&self, action: InputAction) -> bool {
        self.pressed.is_down(action)
    }

    pub fn interact_pressed(&self) -> bool {
        self.pressed(InputAction::Interact)
    }

    pub fn interact_active(&self, trigger: InteractTrigger) -> bool {
        match trigger {
            InteractTrigger::Edge => self.interact_pressed(),
            InteractTrigger::Level => self.is_down(InputAction::Interact),
        }
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.down.set(action, is_down);
        self
    }

    /// Marks `action` as pressed this tick. A press implies the key is down.
    pub fn with_action_pressed(mut self, action: InputAction, pressed: bool) -> Self {
        self.pressed.set(action, pressed);
        if pressed {
            self.down.set(action, true);
        }
        self
    }

    pub fn with_interact_pressed(self, pressed: bool) -> Self {
        self.with_action_pressed(InputAction::Interact, pressed)
    }
}

/// Accumulates key transitions between ticks. Press edges survive until the
/// next `snapshot_for_tick`, so a press and release inside one tick still
/// registers once.
#[derive(Debug, Default)]
pub struct InputCollector {
    down: ActionStates,
    pressed_edges: ActionStates,
}

impl InputCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_action(&mut self, action: InputAction, is_down: bool) {
        if is_down && !self.down.is_down(action) {
            self.pressed_edges.set(action, true);
        }
        self.down.set(action, is_down);
    }

    /// Drops held state, e.g. when the window loses focus and releases will
    /// never arrive. Pending press edges are kept.
    pub fn release_all(&mut self) {
        self.down = ActionStates::default();
    }

    /// An action pressed since the last tick reads as down for this tick
    /// even if it was already released.
    pub fn snapshot_for_tick(&mut self) -> InputSnapshot {
        let snapshot = InputSnapshot {
            down: self.down.union(self.pressed_edges),
            pressed: self.pressed_edges,
        };
        self.pressed_edges = ActionStates::default();
        snapshot
    }
}

static INPUT_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_input_lock_poison_once() {
    if INPUT_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!("input lock poisoned; recovered inner value");
    }
}

/// Collector shared between the thread receiving key events and the loop
/// thread taking per-tick snapshots.
#[derive(Debug, Clone, Default)]
pub struct InputHandle {
    collector: Arc<Mutex<InputCollector>>,
}

impl InputHandle {
    pub fn set_action(&self, action: InputAction, is_down: bool) {
        self.lock().set_action(action, is_down);
    }

    pub fn release_all(&self) {
        self.lock().release_all();
    }

    pub fn snapshot_for_tick(&self) -> InputSnapshot {
        self.lock().snapshot_for_tick()
    }

    fn lock(&self) -> MutexGuard<'_, InputCollector> {
        match self.collector.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_input_lock_poison_once();
                poisoned.into_inner()
            }
        }
    }
}

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::warn;

static SURFACE_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_surface_lock_poison_once() {
    if SURFACE_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!("minigame surface lock poisoned; recovered inner value");
    }
}

/// Press edges routed to the active minigame instead of the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MinigameInput {
    Up,
    Down,
    Left,
    Right,
    Confirm,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum SurfaceTint {
    #[default]
    Neutral,
    Waiting,
    Go,
    Success,
    Failure,
}

/// What a presentation layer needs to draw the active minigame.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MinigameView {
    pub title: String,
    pub prompt: String,
    pub tint: SurfaceTint,
    pub options: Vec<String>,
    pub selected: Option<usize>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    view: MinigameView,
    pending_inputs: VecDeque<MinigameInput>,
}

#[derive(Debug, Default)]
struct SurfaceShared {
    state: Mutex<SurfaceState>,
    closed: AtomicBool,
}

/// Host surface shared between the loop thread, a minigame's own thread and
/// the presentation layer. Cloning yields another handle to the same surface.
#[derive(Debug, Clone, Default)]
pub struct MinigameSurface {
    shared: Arc<SurfaceShared>,
}

impl MinigameSurface {
    pub fn new(title: impl Into<String>) -> Self {
        let surface = Self::default();
        surface.lock().view.title = title.into();
        surface
    }

    pub fn push_input(&self, input: MinigameInput) {
        if self.is_closed() {
            return;
        }
        self.lock().pending_inputs.push_back(input);
    }

    pub fn poll_input(&self) -> Option<MinigameInput> {
        self.lock().pending_inputs.pop_front()
    }

    pub fn clear_inputs(&self) {
        self.lock().pending_inputs.clear();
    }

    pub fn set_prompt(&self, prompt: impl Into<String>) {
        self.lock().view.prompt = prompt.into();
    }

    pub fn set_tint(&self, tint: SurfaceTint) {
        self.lock().view.tint = tint;
    }

    pub fn set_options(&self, options: Vec<String>, selected: Option<usize>) {
        let mut state = self.lock();
        state.view.options = options;
        state.view.selected = selected;
    }

    pub fn set_selected(&self, selected: Option<usize>) {
        self.lock().view.selected = selected;
    }

    pub fn view(&self) -> MinigameView {
        self.lock().view.clone()
    }

    /// Closing is one-way. A minigame that sees its surface closed must give
    /// up and report failure.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
        self.lock().pending_inputs.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    fn lock(&self) -> MutexGuard<'_, SurfaceState> {
        match self.shared.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn_surface_lock_poison_once();
                poisoned.into_inner()
            }
        }
    }
}

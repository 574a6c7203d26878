use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use escape_engine::{Minigame, MinigameError, MinigameInput, MinigameSurface, OnComplete};
use tracing::{debug, info, warn};

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Body of a minigame thread. Returns whether the player passed.
pub(crate) type SessionBody = fn(&SessionContext) -> bool;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Waited {
    Input(MinigameInput),
    Elapsed,
    Aborted,
}

/// What a running minigame body sees: its surface and whether the host
/// has given up on it.
pub(crate) struct SessionContext {
    surface: MinigameSurface,
    stop_requested: Arc<AtomicBool>,
    started: Instant,
}

impl SessionContext {
    fn new(surface: MinigameSurface, stop_requested: Arc<AtomicBool>) -> Self {
        Self {
            surface,
            stop_requested,
            started: Instant::now(),
        }
    }

    pub(crate) fn surface(&self) -> &MinigameSurface {
        &self.surface
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.stop_requested() || self.surface.is_closed()
    }

    fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Blocks until the next routed input, `timeout` elapses, or the session
    /// is aborted.
    pub(crate) fn wait_for_input(&self, timeout: Duration) -> Waited {
        let deadline = Instant::now() + timeout;
        loop {
            if self.is_aborted() {
                return Waited::Aborted;
            }
            if let Some(input) = self.surface.poll_input() {
                return Waited::Input(input);
            }
            let now = Instant::now();
            if now >= deadline {
                return Waited::Elapsed;
            }
            thread::sleep(INPUT_POLL_INTERVAL.min(deadline - now));
        }
    }

    /// Sleeps for `duration`, dropping any input that arrives meanwhile.
    /// Returns `false` when the session was aborted during the pause.
    pub(crate) fn pause(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_aborted() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                self.surface.clear_inputs();
                return true;
            }
            thread::sleep(INPUT_POLL_INTERVAL.min(deadline - now));
        }
    }

    pub(crate) fn elapsed_seconds(&self) -> u32 {
        u32::try_from(self.started.elapsed().as_secs()).unwrap_or(u32::MAX)
    }
}

/// A minigame body running on its own named thread. The completion callback
/// fires once when the body returns, unless the host stopped the session.
struct SessionThread {
    stop_requested: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl SessionThread {
    fn spawn(
        key: &'static str,
        name: &'static str,
        surface: MinigameSurface,
        on_complete: OnComplete,
        body: SessionBody,
    ) -> Result<Self, MinigameError> {
        let stop_requested = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop_requested);
        let handle = thread::Builder::new()
            .name(format!("minigame-{key}"))
            .spawn(move || {
                let context = SessionContext::new(surface, thread_stop);
                let success = body(&context);
                if context.stop_requested() {
                    debug!(minigame = key, "minigame_stopped_before_report");
                    return;
                }
                let elapsed_seconds = context.elapsed_seconds();
                info!(
                    minigame = key,
                    success,
                    elapsed_seconds,
                    "minigame_finished"
                );
                on_complete(success, elapsed_seconds);
            })
            .map_err(|err| MinigameError::StartFailed {
                name: name.to_string(),
                reason: err.to_string(),
            })?;

        Ok(Self {
            stop_requested,
            handle: Some(handle),
        })
    }

    fn stop(&mut self) {
        self.stop_requested.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("minigame_thread_panicked");
            }
        }
    }
}

impl Drop for SessionThread {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Adapts a [`SessionBody`] to the engine's [`Minigame`] contract.
pub(crate) struct ThreadedMinigame {
    key: &'static str,
    name: &'static str,
    description: &'static str,
    body: SessionBody,
    session: Option<SessionThread>,
}

impl ThreadedMinigame {
    pub(crate) fn new(
        key: &'static str,
        name: &'static str,
        description: &'static str,
        body: SessionBody,
    ) -> Self {
        Self {
            key,
            name,
            description,
            body,
            session: None,
        }
    }
}

impl Minigame for ThreadedMinigame {
    fn start(
        &mut self,
        surface: MinigameSurface,
        on_complete: OnComplete,
    ) -> Result<(), MinigameError> {
        self.stop();
        let session = SessionThread::spawn(self.key, self.name, surface, on_complete, self.body)?;
        self.session = Some(session);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }

    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }
}

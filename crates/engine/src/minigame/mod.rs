//! The contract every minigame satisfies, the surface it draws its state on,
//! and the registry that builds one per room.

mod coordinator;
mod surface;

use std::collections::BTreeMap;

use thiserror::Error;

pub use coordinator::{
    calculate_points, Clock, ManualClock, MinigameCoordinator, SessionEnd, SessionId, SystemClock,
    FAST_THRESHOLD_SECONDS, MEDIUM_THRESHOLD_SECONDS, POINTS_FAST, POINTS_MEDIUM, POINTS_SLOW,
};
pub use surface::{MinigameInput, MinigameSurface, MinigameView, SurfaceTint};

/// Completion callback handed to [`Minigame::start`]: `(success, elapsed_seconds)`.
///
/// `FnOnce` so a single `start` can report at most once.
pub type OnComplete = Box<dyn FnOnce(bool, u32) + Send + 'static>;

pub trait Minigame: Send {
    /// Begins the minigame on `surface`. Returning an error means the
    /// minigame never started and `on_complete` will not be called.
    fn start(&mut self, surface: MinigameSurface, on_complete: OnComplete)
        -> Result<(), MinigameError>;

    /// Tears the minigame down. A minigame stopped before finishing may drop
    /// its callback without calling it.
    fn stop(&mut self);

    fn name(&self) -> &str;

    fn description(&self) -> &str;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MinigameError {
    #[error("no minigame registered under key '{key}'")]
    NotRegistered { key: String },
    #[error("failed to start minigame '{name}': {reason}")]
    StartFailed { name: String, reason: String },
}

type MinigameFactory = Box<dyn Fn() -> Box<dyn Minigame> + Send>;

struct RegisteredMinigame {
    name: String,
    description: String,
    factory: MinigameFactory,
}

/// Builds fresh minigame instances from the keys rooms carry.
#[derive(Default)]
pub struct MinigameRegistry {
    entries: BTreeMap<String, RegisteredMinigame>,
}

impl MinigameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<F>(
        &mut self,
        key: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        factory: F,
    ) where
        F: Fn() -> Box<dyn Minigame> + Send + 'static,
    {
        self.entries.insert(
            key.into(),
            RegisteredMinigame {
                name: name.into(),
                description: description.into(),
                factory: Box::new(factory),
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn create(&self, key: &str) -> Result<Box<dyn Minigame>, MinigameError> {
        self.entries
            .get(key)
            .map(|entry| (entry.factory)())
            .ok_or_else(|| MinigameError::NotRegistered {
                key: key.to_string(),
            })
    }

    pub fn name(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|entry| entry.name.as_str())
    }

    pub fn description(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(|entry| entry.description.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NoopMinigame;

    impl Minigame for NoopMinigame {
        fn start(
            &mut self,
            _surface: MinigameSurface,
            _on_complete: OnComplete,
        ) -> Result<(), MinigameError> {
            Ok(())
        }

        fn stop(&mut self) {}

        fn name(&self) -> &str {
            "Noop"
        }

        fn description(&self) -> &str {
            "Does nothing."
        }
    }

    #[test]
    fn registry_creates_registered_minigame() {
        let mut registry = MinigameRegistry::new();
        registry.register("noop", "Noop", "Does nothing.", || Box::new(NoopMinigame));

        assert!(registry.contains("noop"));
        assert_eq!(registry.name("noop"), Some("Noop"));
        assert_eq!(registry.description("noop"), Some("Does nothing."));
        let minigame = registry.create("noop").expect("registered");
        assert_eq!(minigame.name(), "Noop");
    }

    #[test]
    fn unknown_key_is_not_registered_error() {
        let registry = MinigameRegistry::new();
        assert_eq!(
            registry.create("battle").err(),
            Some(MinigameError::NotRegistered {
                key: "battle".to_string()
            })
        );
        assert!(registry.name("battle").is_none());
    }

    #[test]
    fn keys_are_sorted() {
        let mut registry = MinigameRegistry::new();
        registry.register("quiz", "Quiz", "", || Box::new(NoopMinigame));
        registry.register("memory", "Memory", "", || Box::new(NoopMinigame));
        assert_eq!(registry.keys().collect::<Vec<_>>(), vec!["memory", "quiz"]);
    }
}

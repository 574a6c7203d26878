//! Concrete minigames hosted by the escape game. Each one runs its body on
//! a dedicated thread and talks to the loop only through its surface.

mod battle;
mod memory;
mod quiz;
mod reaction;
mod session;

use escape_engine::MinigameRegistry;

use self::session::ThreadedMinigame;

pub(crate) const QUIZ_KEY: &str = "quiz";
pub(crate) const MEMORY_KEY: &str = "memory";
pub(crate) const REACTION_KEY: &str = "reaction_time";
pub(crate) const BATTLE_KEY: &str = "battle";

const PASS_PERCENT: usize = 60;

pub(crate) fn builtin_registry() -> MinigameRegistry {
    let mut registry = MinigameRegistry::new();
    registry.register(QUIZ_KEY, quiz::NAME, quiz::DESCRIPTION, || {
        Box::new(ThreadedMinigame::new(
            QUIZ_KEY,
            quiz::NAME,
            quiz::DESCRIPTION,
            quiz::run,
        ))
    });
    registry.register(MEMORY_KEY, memory::NAME, memory::DESCRIPTION, || {
        Box::new(ThreadedMinigame::new(
            MEMORY_KEY,
            memory::NAME,
            memory::DESCRIPTION,
            memory::run,
        ))
    });
    registry.register(REACTION_KEY, reaction::NAME, reaction::DESCRIPTION, || {
        Box::new(ThreadedMinigame::new(
            REACTION_KEY,
            reaction::NAME,
            reaction::DESCRIPTION,
            reaction::run,
        ))
    });
    registry.register(BATTLE_KEY, battle::NAME, battle::DESCRIPTION, || {
        Box::new(ThreadedMinigame::new(
            BATTLE_KEY,
            battle::NAME,
            battle::DESCRIPTION,
            battle::run,
        ))
    });
    registry
}

fn meets_pass_ratio(successes: usize, total: usize) -> bool {
    total > 0 && successes * 100 >= total * PASS_PERCENT
}

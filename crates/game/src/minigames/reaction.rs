use std::time::{Duration, Instant};

use escape_engine::{MinigameInput, SurfaceTint};
use rand::Rng;

use super::meets_pass_ratio;
use super::session::{SessionContext, Waited};

pub(super) const NAME: &str = "Reaction Time";
pub(super) const DESCRIPTION: &str = "Click when it turns green!";

const ROUNDS: usize = 5;
const MIN_WAIT_MS: u64 = 1000;
const WAIT_SPREAD_MS: u64 = 4000;
const REACTION_WINDOW: Duration = Duration::from_secs(2);
const SUCCESS_THRESHOLD: Duration = Duration::from_millis(1000);
const ROUND_PAUSE: Duration = Duration::from_millis(1500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ReactionOutcome {
    TooEarly,
    Missed,
    Slow(Duration),
    Fast(Duration),
}

impl ReactionOutcome {
    pub(super) fn is_success(self) -> bool {
        matches!(self, Self::Fast(_))
    }

    fn message(self) -> String {
        match self {
            Self::TooEarly => "Too early!".to_string(),
            Self::Missed => "Too slow! Time's up.".to_string(),
            Self::Slow(reaction) => format!("{} ms, too slow", reaction.as_millis()),
            Self::Fast(reaction) => format!("{} ms, nice!", reaction.as_millis()),
        }
    }
}

/// Classifies a press that arrived `reaction` after the surface turned
/// green, or `None` when the window closed without one.
pub(super) fn judge_reaction(reaction: Option<Duration>) -> ReactionOutcome {
    match reaction {
        None => ReactionOutcome::Missed,
        Some(reaction) if reaction < SUCCESS_THRESHOLD => ReactionOutcome::Fast(reaction),
        Some(reaction) => ReactionOutcome::Slow(reaction),
    }
}

pub(super) fn random_wait<R: Rng + ?Sized>(rng: &mut R) -> Duration {
    Duration::from_millis(MIN_WAIT_MS + rng.random_range(0..WAIT_SPREAD_MS))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(super) struct ReactionScore {
    rounds: usize,
    successes: usize,
}

impl ReactionScore {
    pub(super) fn record(&mut self, outcome: ReactionOutcome) {
        self.rounds += 1;
        if outcome.is_success() {
            self.successes += 1;
        }
    }

    pub(super) fn successes(&self) -> usize {
        self.successes
    }

    pub(super) fn passed(&self) -> bool {
        meets_pass_ratio(self.successes, self.rounds)
    }
}

enum Press {
    Confirmed(Duration),
    Timeout,
    Aborted,
}

/// Waits up to `window` for a confirm press, ignoring directions.
fn wait_for_confirm(context: &SessionContext, window: Duration) -> Press {
    let started = Instant::now();
    let deadline = started + window;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match context.wait_for_input(remaining) {
            Waited::Input(MinigameInput::Confirm) => return Press::Confirmed(started.elapsed()),
            Waited::Input(_) => {}
            Waited::Elapsed => return Press::Timeout,
            Waited::Aborted => return Press::Aborted,
        }
    }
}

pub(super) fn run(context: &SessionContext) -> bool {
    let surface = context.surface();
    let mut rng = rand::rng();
    let mut score = ReactionScore::default();
    surface.set_options(Vec::new(), None);

    for round in 1..=ROUNDS {
        surface.set_tint(SurfaceTint::Waiting);
        surface.set_prompt(format!("Round {round}/{ROUNDS}: wait for green..."));
        surface.clear_inputs();

        let outcome = match wait_for_confirm(context, random_wait(&mut rng)) {
            Press::Aborted => return false,
            Press::Confirmed(_) => ReactionOutcome::TooEarly,
            Press::Timeout => {
                surface.set_tint(SurfaceTint::Go);
                surface.set_prompt(format!("Round {round}/{ROUNDS}: NOW!"));
                match wait_for_confirm(context, REACTION_WINDOW) {
                    Press::Aborted => return false,
                    Press::Confirmed(reaction) => judge_reaction(Some(reaction)),
                    Press::Timeout => judge_reaction(None),
                }
            }
        };

        score.record(outcome);
        surface.set_tint(if outcome.is_success() {
            SurfaceTint::Success
        } else {
            SurfaceTint::Failure
        });
        surface.set_prompt(outcome.message());
        if !context.pause(ROUND_PAUSE) {
            return false;
        }
    }

    let passed = score.passed();
    surface.set_tint(if passed {
        SurfaceTint::Success
    } else {
        SurfaceTint::Failure
    });
    surface.set_prompt(format!(
        "{}/{ROUNDS} fast reactions",
        score.successes()
    ));
    context.pause(ROUND_PAUSE) && passed
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn reactions_under_a_second_succeed() {
        assert_eq!(
            judge_reaction(Some(Duration::from_millis(350))),
            ReactionOutcome::Fast(Duration::from_millis(350))
        );
        assert_eq!(
            judge_reaction(Some(Duration::from_millis(1000))),
            ReactionOutcome::Slow(Duration::from_millis(1000))
        );
        assert_eq!(judge_reaction(None), ReactionOutcome::Missed);
    }

    #[test]
    fn only_fast_reactions_count_as_success() {
        assert!(ReactionOutcome::Fast(Duration::from_millis(10)).is_success());
        assert!(!ReactionOutcome::Slow(Duration::from_millis(1500)).is_success());
        assert!(!ReactionOutcome::TooEarly.is_success());
        assert!(!ReactionOutcome::Missed.is_success());
    }

    #[test]
    fn random_wait_stays_between_one_and_five_seconds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..200 {
            let wait = random_wait(&mut rng);
            assert!(wait >= Duration::from_secs(1));
            assert!(wait < Duration::from_secs(5));
        }
    }

    #[test]
    fn three_fast_rounds_of_five_pass() {
        let mut score = ReactionScore::default();
        score.record(ReactionOutcome::Fast(Duration::from_millis(300)));
        score.record(ReactionOutcome::TooEarly);
        score.record(ReactionOutcome::Fast(Duration::from_millis(400)));
        score.record(ReactionOutcome::Missed);
        assert!(!score.passed());

        score.record(ReactionOutcome::Fast(Duration::from_millis(500)));
        assert_eq!(score.successes(), 3);
        assert!(score.passed());
    }

    #[test]
    fn too_early_message_matches_the_red_press() {
        assert_eq!(ReactionOutcome::TooEarly.message(), "Too early!");
    }
}

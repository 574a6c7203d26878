use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::entity::{Player, RoomId, RoomScoreData};

pub const FAST_THRESHOLD_SECONDS: u32 = 30;
pub const MEDIUM_THRESHOLD_SECONDS: u32 = 60;
pub const POINTS_FAST: u32 = 100;
pub const POINTS_MEDIUM: u32 = 70;
pub const POINTS_SLOW: u32 = 40;

pub fn calculate_points(time_taken_seconds: u32) -> u32 {
    if time_taken_seconds < FAST_THRESHOLD_SECONDS {
        POINTS_FAST
    } else if time_taken_seconds < MEDIUM_THRESHOLD_SECONDS {
        POINTS_MEDIUM
    } else {
        POINTS_SLOW
    }
}

pub trait Clock: Send {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let mut now = match self.now.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CoordinatorState {
    Idle,
    Active {
        session: SessionId,
        room_id: RoomId,
        started_at: Instant,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The session succeeded and its score was written to the player.
    Scored(RoomScoreData),
    /// The session ended without success; scores are untouched.
    Failed { room_id: RoomId },
    /// Nothing was active, or the report belonged to an older session.
    Ignored,
}

/// Tracks the single active minigame session and turns successful
/// completions into room scores.
pub struct MinigameCoordinator {
    clock: Box<dyn Clock>,
    state: CoordinatorState,
    next_session: u64,
    timeout: Option<Duration>,
}

impl MinigameCoordinator {
    pub fn new(clock: Box<dyn Clock>, timeout: Option<Duration>) -> Self {
        Self {
            clock,
            state: CoordinatorState::Idle,
            next_session: 0,
            timeout: timeout.filter(|value| !value.is_zero()),
        }
    }

    pub fn with_system_clock(timeout: Option<Duration>) -> Self {
        Self::new(Box::new(SystemClock), timeout)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, CoordinatorState::Active { .. })
    }

    pub fn active_session(&self) -> Option<SessionId> {
        match self.state {
            CoordinatorState::Active { session, .. } => Some(session),
            CoordinatorState::Idle => None,
        }
    }

    pub fn active_room(&self) -> Option<RoomId> {
        match self.state {
            CoordinatorState::Active { room_id, .. } => Some(room_id),
            CoordinatorState::Idle => None,
        }
    }

    pub fn elapsed(&self) -> Option<Duration> {
        match self.state {
            CoordinatorState::Active { started_at, .. } => {
                Some(self.clock.now().saturating_duration_since(started_at))
            }
            CoordinatorState::Idle => None,
        }
    }

    /// Opens a session for `room_id`. Any session still active is replaced;
    /// later reports for it are ignored.
    pub fn start_minigame(&mut self, room_id: RoomId) -> SessionId {
        if let Some(previous) = self.active_session() {
            debug!(session = previous.0, "minigame_session_replaced");
        }
        let session = SessionId(self.next_session);
        self.next_session = self.next_session.wrapping_add(1);
        self.state = CoordinatorState::Active {
            session,
            room_id,
            started_at: self.clock.now(),
        };
        info!(session = session.0, room_id = room_id.0, "minigame_session_started");
        session
    }

    /// Ends whatever session is active. The coordinator is idle afterwards
    /// regardless of the outcome.
    pub fn end_minigame(&mut self, player: &mut Player, success: bool) -> SessionEnd {
        match self.active_session() {
            Some(session) => self.end_session(session, player, success),
            None => SessionEnd::Ignored,
        }
    }

    /// Ends `session` if it is still the active one.
    pub fn end_session(
        &mut self,
        session: SessionId,
        player: &mut Player,
        success: bool,
    ) -> SessionEnd {
        let CoordinatorState::Active {
            session: active,
            room_id,
            started_at,
        } = self.state
        else {
            debug!(session = session.0, "minigame_report_without_session");
            return SessionEnd::Ignored;
        };
        if active != session {
            warn!(
                session = session.0,
                active_session = active.0,
                "stale_minigame_report_ignored"
            );
            return SessionEnd::Ignored;
        }

        self.state = CoordinatorState::Idle;
        if !success {
            info!(room_id = room_id.0, "minigame_session_failed");
            return SessionEnd::Failed { room_id };
        }

        let elapsed = self.clock.now().saturating_duration_since(started_at);
        let time_taken_seconds = u32::try_from(elapsed.as_secs()).unwrap_or(u32::MAX);
        let points = calculate_points(time_taken_seconds);
        player.add_room_score(room_id, time_taken_seconds, points);
        info!(
            room_id = room_id.0,
            time_taken_seconds,
            points,
            total_score = player.total_score(),
            "minigame_session_scored"
        );
        SessionEnd::Scored(RoomScoreData::new(room_id, time_taken_seconds, points, true))
    }

    /// The active session, if it has been running longer than the timeout.
    pub fn expired_session(&self) -> Option<SessionId> {
        let timeout = self.timeout?;
        match self.state {
            CoordinatorState::Active {
                session,
                started_at,
                ..
            } if self.clock.now().saturating_duration_since(started_at) >= timeout => {
                Some(session)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::PlayerTuning;
    use crate::geometry::Point2D;

    fn player() -> Player {
        let env = Point2D::new(1280, 720);
        Player::new(env.half(), env, PlayerTuning::default())
    }

    fn coordinator(clock: &ManualClock, timeout: Option<Duration>) -> MinigameCoordinator {
        MinigameCoordinator::new(Box::new(clock.clone()), timeout)
    }

    #[test]
    fn points_follow_time_tiers() {
        assert_eq!(calculate_points(0), 100);
        assert_eq!(calculate_points(29), 100);
        assert_eq!(calculate_points(30), 70);
        assert_eq!(calculate_points(59), 70);
        assert_eq!(calculate_points(60), 40);
        assert_eq!(calculate_points(u32::MAX), 40);
    }

    #[test]
    fn successful_session_records_score() {
        let clock = ManualClock::new();
        let mut coordinator = coordinator(&clock, None);
        let mut player = player();

        coordinator.start_minigame(RoomId(2));
        clock.advance(Duration::from_secs(10));
        let end = coordinator.end_minigame(&mut player, true);

        let score = player.room_score(RoomId(2)).expect("room 2 score");
        assert_eq!(score.time_taken_seconds(), 10);
        assert_eq!(score.points_gained(), 100);
        assert!(score.completed());
        assert_eq!(end, SessionEnd::Scored(*score));
        assert!(!coordinator.is_active());
    }

    #[test]
    fn failed_session_never_touches_scores() {
        let clock = ManualClock::new();
        let mut coordinator = coordinator(&clock, None);
        let mut player = player();
        player.add_room_score(RoomId(1), 40, 70);

        coordinator.start_minigame(RoomId(1));
        clock.advance(Duration::from_secs(5));
        let end = coordinator.end_minigame(&mut player, false);

        assert_eq!(end, SessionEnd::Failed { room_id: RoomId(1) });
        assert_eq!(
            player.room_score(RoomId(1)).map(RoomScoreData::points_gained),
            Some(70)
        );
        assert!(player.room_score(RoomId(2)).is_none());
        assert!(!coordinator.is_active());
    }

    #[test]
    fn end_without_session_is_ignored() {
        let clock = ManualClock::new();
        let mut coordinator = coordinator(&clock, None);
        let mut player = player();

        assert_eq!(coordinator.end_minigame(&mut player, true), SessionEnd::Ignored);
        assert!(player.room_scores().is_empty());
    }

    #[test]
    fn restart_overwrites_previous_session() {
        let clock = ManualClock::new();
        let mut coordinator = coordinator(&clock, None);
        let mut player = player();

        let first = coordinator.start_minigame(RoomId(1));
        clock.advance(Duration::from_secs(50));
        let second = coordinator.start_minigame(RoomId(3));
        clock.advance(Duration::from_secs(5));

        assert_eq!(
            coordinator.end_session(first, &mut player, true),
            SessionEnd::Ignored
        );
        assert!(coordinator.is_active());
        let end = coordinator.end_session(second, &mut player, true);
        assert!(matches!(end, SessionEnd::Scored(score) if score.time_taken_seconds() == 5));
        assert!(player.room_score(RoomId(1)).is_none());
        assert_eq!(
            player.room_score(RoomId(3)).map(RoomScoreData::points_gained),
            Some(100)
        );
    }

    #[test]
    fn second_report_for_same_session_is_ignored() {
        let clock = ManualClock::new();
        let mut coordinator = coordinator(&clock, None);
        let mut player = player();

        let session = coordinator.start_minigame(RoomId(4));
        clock.advance(Duration::from_secs(61));
        coordinator.end_session(session, &mut player, true);
        clock.advance(Duration::from_secs(100));

        assert_eq!(
            coordinator.end_session(session, &mut player, true),
            SessionEnd::Ignored
        );
        let score = player.room_score(RoomId(4)).expect("score");
        assert_eq!(score.time_taken_seconds(), 61);
        assert_eq!(score.points_gained(), 40);
    }

    #[test]
    fn elapsed_seconds_are_truncated() {
        let clock = ManualClock::new();
        let mut coordinator = coordinator(&clock, None);
        let mut player = player();

        coordinator.start_minigame(RoomId(1));
        clock.advance(Duration::from_millis(29_999));
        coordinator.end_minigame(&mut player, true);

        let score = player.room_score(RoomId(1)).expect("score");
        assert_eq!(score.time_taken_seconds(), 29);
        assert_eq!(score.points_gained(), 100);
    }

    #[test]
    fn session_expires_after_timeout() {
        let clock = ManualClock::new();
        let mut coordinator = coordinator(&clock, Some(Duration::from_secs(120)));

        let session = coordinator.start_minigame(RoomId(2));
        clock.advance(Duration::from_secs(119));
        assert_eq!(coordinator.expired_session(), None);
        clock.advance(Duration::from_secs(1));
        assert_eq!(coordinator.expired_session(), Some(session));
    }

    #[test]
    fn zero_timeout_disables_expiry() {
        let clock = ManualClock::new();
        let mut coordinator = coordinator(&clock, Some(Duration::ZERO));
        coordinator.start_minigame(RoomId(2));
        clock.advance(Duration::from_secs(10_000));
        assert_eq!(coordinator.expired_session(), None);
    }
}

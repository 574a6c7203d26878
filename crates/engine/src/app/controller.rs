use std::sync::mpsc::{self, Receiver, Sender};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::entity::{Door, Entity, Player, RoomId};
use crate::geometry::Point2D;
use crate::layout::{generate_rooms, LayoutError, RoomLayout};
use crate::minigame::{
    Clock, Minigame, MinigameCoordinator, MinigameInput, MinigameRegistry, MinigameSurface,
    OnComplete, SessionEnd, SessionId,
};
use crate::position::{default_spawn_position, position_after_transition};
use crate::state::{GameState, GameStateError};

use super::input::{InputAction, InputSnapshot, InteractTrigger};
use super::loop_runner::LoopConfig;
use super::metrics::TickMetrics;
use super::snapshot::{ActiveMinigameView, BoxView, DoorView, GameSnapshot, NpcView};

const ROUTED_INPUTS: [(InputAction, MinigameInput); 5] = [
    (InputAction::MoveUp, MinigameInput::Up),
    (InputAction::MoveDown, MinigameInput::Down),
    (InputAction::MoveLeft, MinigameInput::Left),
    (InputAction::MoveRight, MinigameInput::Right),
    (InputAction::Interact, MinigameInput::Confirm),
];

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    State(#[from] GameStateError),
    #[error("failed to build room graph: {0}")]
    Layout(#[from] LayoutError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomChange {
    pub from: RoomId,
    pub to: RoomId,
}

/// What a single tick did, for callers that narrate or assert on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub room_change: Option<RoomChange>,
    pub dialogue: Option<String>,
    pub minigame_started: Option<SessionId>,
    pub session_ended: Option<SessionEnd>,
    /// Set only on the tick where the last puzzle room was completed.
    pub run_completed: bool,
}

struct Completion {
    session: SessionId,
    success: bool,
    reported_seconds: u32,
}

struct ActiveSession {
    id: SessionId,
    name: String,
    minigame: Box<dyn Minigame>,
    surface: MinigameSurface,
}

/// Per-tick driver of the simulation. Owns the game state and the minigame
/// session; everything here runs on the loop thread.
pub struct MainController {
    state: GameState,
    registry: MinigameRegistry,
    coordinator: MinigameCoordinator,
    session: Option<ActiveSession>,
    completion_tx: Sender<Completion>,
    completion_rx: Receiver<Completion>,
    interact_trigger: InteractTrigger,
    last_used_door: Option<Door>,
    last_dialogue: Option<String>,
    run_completed: bool,
    tick: u64,
}

impl MainController {
    pub fn new(
        state: GameState,
        registry: MinigameRegistry,
        coordinator: MinigameCoordinator,
        interact_trigger: InteractTrigger,
    ) -> Self {
        let (completion_tx, completion_rx) = mpsc::channel();
        Self {
            state,
            registry,
            coordinator,
            session: None,
            completion_tx,
            completion_rx,
            interact_trigger,
            last_used_door: None,
            last_dialogue: None,
            run_completed: false,
            tick: 0,
        }
    }

    /// Generates the room graph for `layout` and places the player at the
    /// default spawn of room 0.
    pub fn from_layout(
        layout: &RoomLayout,
        config: &LoopConfig,
        registry: MinigameRegistry,
        clock: Box<dyn Clock>,
    ) -> Result<Self, ControllerError> {
        let environment_size = config.environment_size;
        let rooms = generate_rooms(layout, environment_size)?;
        let player = Player::new(
            default_spawn_position(environment_size),
            environment_size,
            config.player_tuning,
        );
        let state = GameState::new(rooms, player, environment_size)?;
        let coordinator = MinigameCoordinator::new(clock, config.minigame_timeout);
        for key in layout.minigame_keys() {
            if !registry.contains(key) {
                warn!(minigame = key, "layout_minigame_not_registered");
            }
        }
        Ok(Self::new(state, registry, coordinator, config.interact_trigger))
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn registry(&self) -> &MinigameRegistry {
        &self.registry
    }

    pub fn interact_trigger(&self) -> InteractTrigger {
        self.interact_trigger
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn is_minigame_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn active_surface(&self) -> Option<&MinigameSurface> {
        self.session.as_ref().map(|session| &session.surface)
    }

    pub fn last_used_door(&self) -> Option<&Door> {
        self.last_used_door.as_ref()
    }

    pub fn last_dialogue(&self) -> Option<&str> {
        self.last_dialogue.as_deref()
    }

    pub fn run_completed(&self) -> bool {
        self.run_completed
    }

    /// Runs one fixed-size step. An error means the world data is broken and
    /// the loop must stop.
    pub fn tick(&mut self, input: &InputSnapshot) -> Result<TickReport, ControllerError> {
        let mut report = TickReport::default();

        self.apply_completions(&mut report);
        self.enforce_session_limits(&mut report);

        if self.session.is_some() {
            self.route_input_to_minigame(input, &mut report);
        } else {
            self.apply_movement(input);
            self.detect_interactions(input, &mut report)?;
        }

        self.check_win(&mut report);
        self.tick = self.tick.wrapping_add(1);
        Ok(report)
    }

    pub fn resize(&mut self, environment_size: Point2D) {
        if environment_size == self.state.environment_size() {
            return;
        }
        self.state.resize(environment_size);
        info!(
            width = environment_size.x,
            height = environment_size.y,
            "environment_resized"
        );
    }

    /// Stops any running minigame. Its session ends as a failure.
    pub fn shutdown(&mut self) {
        if let Some(session) = self.coordinator.active_session() {
            let mut report = TickReport::default();
            self.finish_session(session, false, "shutdown", &mut report);
        }
    }

    pub fn snapshot(&self, metrics: TickMetrics) -> GameSnapshot {
        let room = self.state.current_room();
        let player = self.state.player();
        GameSnapshot {
            tick: self.tick,
            environment_size: self.state.environment_size(),
            room_id: room.id(),
            room_name: room.name().to_string(),
            room_type: room.room_type(),
            player: BoxView {
                position: player.position(),
                size: player.size(),
            },
            doors: room
                .doors()
                .iter()
                .map(|door| DoorView {
                    to: door.to_id(),
                    position: door.position(),
                    size: door.size(),
                })
                .collect(),
            npc: room.npc().map(|npc| NpcView {
                name: npc.name().to_string(),
                position: npc.position(),
                size: npc.size(),
            }),
            last_dialogue: self.last_dialogue.clone(),
            minigame: self
                .session
                .as_ref()
                .zip(self.coordinator.active_room())
                .map(|(session, room_id)| ActiveMinigameView {
                    room_id,
                    name: session.name.clone(),
                    elapsed_seconds: self
                        .coordinator
                        .elapsed()
                        .map(|elapsed| elapsed.as_secs())
                        .unwrap_or(0),
                    view: session.surface.view(),
                }),
            scores: player.room_scores().values().copied().collect(),
            total_score: player.total_score(),
            all_rooms_completed: self.run_completed,
            metrics,
        }
    }

    fn apply_completions(&mut self, report: &mut TickReport) {
        while let Ok(completion) = self.completion_rx.try_recv() {
            debug!(
                session = completion.session.0,
                success = completion.success,
                reported_seconds = completion.reported_seconds,
                "minigame_reported"
            );
            self.finish_session(completion.session, completion.success, "reported", report);
        }
    }

    fn enforce_session_limits(&mut self, report: &mut TickReport) {
        if let Some(session) = self.coordinator.expired_session() {
            warn!(session = session.0, "minigame_timed_out");
            self.finish_session(session, false, "timeout", report);
            return;
        }

        let closed = self
            .session
            .as_ref()
            .filter(|session| session.surface.is_closed())
            .map(|session| session.id);
        if let Some(session) = closed {
            info!(session = session.0, "minigame_surface_closed");
            self.finish_session(session, false, "surface_closed", report);
        }
    }

    fn finish_session(
        &mut self,
        session: SessionId,
        success: bool,
        reason: &'static str,
        report: &mut TickReport,
    ) {
        let end = self
            .coordinator
            .end_session(session, self.state.player_mut(), success);
        if end == SessionEnd::Ignored {
            return;
        }

        let owns_session = self
            .session
            .as_ref()
            .is_some_and(|active| active.id == session);
        let name = if owns_session {
            self.session.take().map(|active| {
                let name = active.name.clone();
                teardown(active);
                name
            })
        } else {
            None
        };

        match end {
            SessionEnd::Scored(score) => info!(
                session = session.0,
                minigame = name.as_deref().unwrap_or("unknown"),
                room_id = score.room_id().0,
                points = score.points_gained(),
                time_taken_seconds = score.time_taken_seconds(),
                total_score = self.state.player().total_score(),
                "minigame_completed"
            ),
            SessionEnd::Failed { room_id } => info!(
                session = session.0,
                minigame = name.as_deref().unwrap_or("unknown"),
                room_id = room_id.0,
                reason,
                "minigame_failed"
            ),
            SessionEnd::Ignored => {}
        }
        report.session_ended = Some(end);
    }

    fn route_input_to_minigame(&mut self, input: &InputSnapshot, report: &mut TickReport) {
        let Some(active) = self.session.as_ref() else {
            return;
        };

        if input.pressed(InputAction::Cancel) {
            let session = active.id;
            info!(session = session.0, "minigame_cancelled");
            self.finish_session(session, false, "cancelled", report);
            return;
        }

        for (action, minigame_input) in ROUTED_INPUTS {
            if input.pressed(action) {
                active.surface.push_input(minigame_input);
            }
        }
    }

    fn apply_movement(&mut self, input: &InputSnapshot) {
        let axis = |negative: InputAction, positive: InputAction| {
            i32::from(input.is_down(positive)) - i32::from(input.is_down(negative))
        };
        let player = self.state.player_mut();
        let speed = player.speed();
        let dx = axis(InputAction::MoveLeft, InputAction::MoveRight).saturating_mul(speed);
        let dy = axis(InputAction::MoveUp, InputAction::MoveDown).saturating_mul(speed);
        if dx != 0 || dy != 0 {
            player.move_by(dx, dy);
        }
    }

    fn detect_interactions(
        &mut self,
        input: &InputSnapshot,
        report: &mut TickReport,
    ) -> Result<(), ControllerError> {
        if !input.interact_active(self.interact_trigger) {
            return Ok(());
        }

        let player_box = self.state.player().hitbox();
        let room = self.state.current_room();

        // First door in enumeration order wins; nothing else is checked in
        // the room that was just left.
        if let Some(door) = room
            .doors()
            .iter()
            .find(|door| door.hitbox().intersects(&player_box))
            .cloned()
        {
            return self.walk_through(door, report);
        }

        let Some(npc) = room.npc().filter(|npc| npc.hitbox().intersects(&player_box)) else {
            return Ok(());
        };
        let dialogue = npc.interact().to_string();
        let room_id = room.id();
        let minigame_key = room.minigame_key().map(str::to_string);

        self.last_dialogue = Some(dialogue.clone());
        report.dialogue = Some(dialogue);
        if let Some(key) = minigame_key {
            self.start_minigame(room_id, &key, report);
        }
        Ok(())
    }

    fn walk_through(&mut self, door: Door, report: &mut TickReport) -> Result<(), ControllerError> {
        let from = self.state.current_room_id();
        let to = door.to_id();
        let back_to = door.from_id();
        self.state.change_room(to)?;
        self.last_used_door = Some(door);

        let environment_size = self.state.environment_size();
        let spawn = match self.state.current_room().door_to(back_to) {
            Some(door_back) => position_after_transition(door_back, environment_size),
            None => {
                debug!(room_id = to.0, back_to = back_to.0, "door_back_missing");
                default_spawn_position(environment_size)
            }
        };
        self.state.player_mut().set_position(spawn);
        debug!(x = spawn.x, y = spawn.y, room_id = to.0, "player_repositioned");

        report.room_change = Some(RoomChange { from, to });
        Ok(())
    }

    fn start_minigame(&mut self, room_id: RoomId, key: &str, report: &mut TickReport) {
        if let Some(session) = self.coordinator.active_session() {
            self.finish_session(session, false, "replaced", report);
        }

        let mut minigame = match self.registry.create(key) {
            Ok(minigame) => minigame,
            Err(error) => {
                warn!(room_id = room_id.0, minigame = key, error = %error, "minigame_start_failed");
                return;
            }
        };

        let name = minigame.name().to_string();
        let surface = MinigameSurface::new(name.clone());
        let session = self.coordinator.start_minigame(room_id);
        let completion_tx = self.completion_tx.clone();
        let on_complete: OnComplete = Box::new(move |success, reported_seconds| {
            // The receiver is gone once the controller has been dropped.
            let _ = completion_tx.send(Completion {
                session,
                success,
                reported_seconds,
            });
        });

        if let Err(error) = minigame.start(surface.clone(), on_complete) {
            warn!(room_id = room_id.0, minigame = key, error = %error, "minigame_start_failed");
            surface.close();
            self.coordinator
                .end_session(session, self.state.player_mut(), false);
            return;
        }

        info!(
            session = session.0,
            room_id = room_id.0,
            minigame = name.as_str(),
            description = minigame.description(),
            "minigame_started"
        );
        self.session = Some(ActiveSession {
            id: session,
            name,
            minigame,
            surface,
        });
        report.minigame_started = Some(session);
    }

    fn check_win(&mut self, report: &mut TickReport) {
        if self.run_completed {
            return;
        }
        let puzzle_rooms = self.state.puzzle_room_count();
        let player = self.state.player();
        if puzzle_rooms == 0 || !player.all_rooms_completed(puzzle_rooms) {
            return;
        }
        self.run_completed = true;
        report.run_completed = true;
        info!(
            total_score = player.total_score(),
            rooms = puzzle_rooms,
            tick = self.tick,
            "all_rooms_completed"
        );
    }
}

fn teardown(mut session: ActiveSession) {
    session.minigame.stop();
    session.surface.close();
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use super::*;
    use crate::entity::{PlayerTuning, RoomScoreData};
    use crate::minigame::{ManualClock, MinigameError};
    use crate::room::{Room, RoomType};

    const ENV: Point2D = Point2D::new(1280, 720);

    #[derive(Clone, Default)]
    struct Recorder {
        callbacks: Arc<Mutex<Vec<Option<OnComplete>>>>,
        surfaces: Arc<Mutex<Vec<MinigameSurface>>>,
        stops: Arc<AtomicUsize>,
    }

    impl Recorder {
        fn starts(&self) -> usize {
            self.callbacks.lock().expect("callbacks").len()
        }

        fn complete(&self, start_index: usize, success: bool, reported_seconds: u32) {
            let callback = self.callbacks.lock().expect("callbacks")[start_index]
                .take()
                .expect("callback not yet used");
            callback(success, reported_seconds);
        }

        fn surface(&self, start_index: usize) -> MinigameSurface {
            self.surfaces.lock().expect("surfaces")[start_index].clone()
        }

        fn stops(&self) -> usize {
            self.stops.load(Ordering::SeqCst)
        }
    }

    struct RecordingMinigame {
        recorder: Recorder,
        fail_start: bool,
    }

    impl Minigame for RecordingMinigame {
        fn start(
            &mut self,
            surface: MinigameSurface,
            on_complete: OnComplete,
        ) -> Result<(), MinigameError> {
            if self.fail_start {
                return Err(MinigameError::StartFailed {
                    name: "Recorder".to_string(),
                    reason: "no surface available".to_string(),
                });
            }
            self.recorder
                .callbacks
                .lock()
                .expect("callbacks")
                .push(Some(on_complete));
            self.recorder.surfaces.lock().expect("surfaces").push(surface);
            Ok(())
        }

        fn stop(&mut self) {
            self.recorder.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn name(&self) -> &str {
            "Recorder"
        }

        fn description(&self) -> &str {
            "Completes when the test says so."
        }
    }

    fn recording_registry(recorder: &Recorder, fail_start: bool) -> MinigameRegistry {
        let mut registry = MinigameRegistry::new();
        for key in ["quiz", "memory", "reaction_time", "battle"] {
            let recorder = recorder.clone();
            registry.register(key, "Recorder", "", move || {
                Box::new(RecordingMinigame {
                    recorder: recorder.clone(),
                    fail_start,
                })
            });
        }
        registry
    }

    fn campus_controller_with(
        clock: &ManualClock,
        registry: MinigameRegistry,
        config: LoopConfig,
    ) -> MainController {
        let layout = RoomLayout::campus().expect("campus layout");
        MainController::from_layout(&layout, &config, registry, Box::new(clock.clone()))
            .expect("controller")
    }

    fn campus_controller(clock: &ManualClock, recorder: &Recorder) -> MainController {
        campus_controller_with(clock, recording_registry(recorder, false), LoopConfig::default())
    }

    fn door_position(controller: &MainController, to: usize) -> Point2D {
        controller
            .state()
            .current_room()
            .door_to(RoomId(to))
            .expect("door")
            .position()
    }

    fn stand_on_door(controller: &mut MainController, to: usize) {
        let position = door_position(controller, to);
        controller.state.player_mut().set_position(position);
    }

    fn stand_on_npc(controller: &mut MainController) {
        let position = controller
            .state()
            .current_room()
            .npc()
            .expect("npc")
            .position();
        controller.state.player_mut().set_position(position);
    }

    fn enter_room_and_start(controller: &mut MainController, room: usize) -> SessionId {
        controller.state.change_room(RoomId(room)).expect("room");
        stand_on_npc(controller);
        controller
            .tick(&InputSnapshot::empty().with_interact_pressed(true))
            .expect("tick")
            .minigame_started
            .expect("minigame started")
    }

    fn idle() -> InputSnapshot {
        InputSnapshot::empty()
    }

    fn press_interact() -> InputSnapshot {
        InputSnapshot::empty().with_interact_pressed(true)
    }

    #[test]
    fn overlap_without_interact_does_not_change_room() {
        let clock = ManualClock::new();
        let mut controller = campus_controller(&clock, &Recorder::default());
        stand_on_door(&mut controller, 1);

        let report = controller.tick(&idle()).expect("tick");

        assert_eq!(report.room_change, None);
        assert_eq!(controller.state().current_room_id(), RoomId(0));
    }

    #[test]
    fn interact_on_door_moves_to_door_back_of_destination() {
        let clock = ManualClock::new();
        let mut controller = campus_controller(&clock, &Recorder::default());
        stand_on_door(&mut controller, 1);

        let report = controller.tick(&press_interact()).expect("tick");

        assert_eq!(
            report.room_change,
            Some(RoomChange {
                from: RoomId(0),
                to: RoomId(1)
            })
        );
        let state = controller.state();
        assert_eq!(state.current_room_id(), RoomId(1));
        let door_back = state.current_room().door_to(RoomId(0)).expect("door back");
        assert_eq!(
            state.player().position(),
            position_after_transition(door_back, ENV)
        );
        assert!(!state.player().hitbox().intersects(&door_back.hitbox()));
        assert_eq!(
            controller.last_used_door().map(Door::to_id),
            Some(RoomId(1))
        );
    }

    #[test]
    fn held_interact_fires_once_with_edge_trigger() {
        let clock = ManualClock::new();
        let mut controller = campus_controller(&clock, &Recorder::default());
        stand_on_door(&mut controller, 3);
        controller.tick(&press_interact()).expect("tick");
        assert_eq!(controller.state().current_room_id(), RoomId(3));

        stand_on_door(&mut controller, 0);
        let held = InputSnapshot::empty().with_action_down(InputAction::Interact, true);
        let report = controller.tick(&held).expect("tick");

        assert_eq!(report.room_change, None);
        assert_eq!(controller.state().current_room_id(), RoomId(3));
    }

    #[test]
    fn held_interact_fires_every_tick_with_level_trigger() {
        let clock = ManualClock::new();
        let config = LoopConfig {
            interact_trigger: InteractTrigger::Level,
            ..LoopConfig::default()
        };
        let mut controller =
            campus_controller_with(&clock, recording_registry(&Recorder::default(), false), config);
        let held = InputSnapshot::empty().with_action_down(InputAction::Interact, true);

        stand_on_door(&mut controller, 3);
        controller.tick(&held).expect("tick");
        assert_eq!(controller.state().current_room_id(), RoomId(3));

        stand_on_door(&mut controller, 0);
        controller.tick(&held).expect("tick");
        assert_eq!(controller.state().current_room_id(), RoomId(0));
    }

    #[test]
    fn first_intersecting_door_wins() {
        let clock = ManualClock::new();
        let door_at = |to: usize| {
            Door::new(
                RoomId(0),
                RoomId(to),
                Point2D::new(10, 300),
                Point2D::new(30, 100),
                ENV,
            )
        };
        let rooms = vec![
            Room::new(RoomId(0), RoomType::Main, vec![door_at(2), door_at(1)]),
            Room::new(RoomId(1), RoomType::Puzzle, Vec::new()),
            Room::new(RoomId(2), RoomType::Puzzle, Vec::new()),
        ];
        let player = Player::new(Point2D::new(10, 300), ENV, PlayerTuning::default());
        let state = GameState::new(rooms, player, ENV).expect("state");
        let coordinator = MinigameCoordinator::new(Box::new(clock), None);
        let mut controller = MainController::new(
            state,
            MinigameRegistry::new(),
            coordinator,
            InteractTrigger::Edge,
        );

        controller.tick(&press_interact()).expect("tick");

        assert_eq!(controller.state().current_room_id(), RoomId(2));
        // Room 2 has no door back, so the player lands at the default spawn.
        assert_eq!(controller.state().player().position(), ENV.half());
    }

    #[test]
    fn door_to_missing_room_is_fatal_and_keeps_room() {
        let clock = ManualClock::new();
        let broken_door = Door::new(
            RoomId(0),
            RoomId(7),
            Point2D::new(10, 300),
            Point2D::new(30, 100),
            ENV,
        );
        let rooms = vec![Room::new(RoomId(0), RoomType::Main, vec![broken_door])];
        let player = Player::new(Point2D::new(10, 300), ENV, PlayerTuning::default());
        let state = GameState::new(rooms, player, ENV).expect("state");
        let coordinator = MinigameCoordinator::new(Box::new(clock), None);
        let mut controller = MainController::new(
            state,
            MinigameRegistry::new(),
            coordinator,
            InteractTrigger::Edge,
        );

        let error = controller.tick(&press_interact()).expect_err("fatal");

        assert!(matches!(
            error,
            ControllerError::State(GameStateError::InvalidRoomId {
                room_id: RoomId(7),
                room_count: 1
            })
        ));
        assert_eq!(controller.state().current_room_id(), RoomId(0));
        assert!(controller.last_used_door().is_none());
    }

    #[test]
    fn diagonal_movement_sums_active_axes() {
        let clock = ManualClock::new();
        let mut controller = campus_controller(&clock, &Recorder::default());
        let start = controller.state().player().position();

        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveUp, true)
            .with_action_down(InputAction::MoveRight, true);
        controller.tick(&input).expect("tick");
        assert_eq!(
            controller.state().player().position(),
            start.translated(5, -5)
        );

        let opposing = InputSnapshot::empty()
            .with_action_down(InputAction::MoveLeft, true)
            .with_action_down(InputAction::MoveRight, true);
        controller.tick(&opposing).expect("tick");
        assert_eq!(
            controller.state().player().position(),
            start.translated(5, -5)
        );
    }

    #[test]
    fn npc_interaction_starts_minigame_and_completion_scores_room() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller = campus_controller(&clock, &recorder);
        controller.state.change_room(RoomId(1)).expect("room");
        stand_on_npc(&mut controller);

        let report = controller.tick(&press_interact()).expect("tick");
        assert!(report.minigame_started.is_some());
        assert!(report.dialogue.is_some());
        assert_eq!(controller.last_dialogue(), report.dialogue.as_deref());
        assert!(controller.is_minigame_active());
        assert_eq!(recorder.starts(), 1);

        clock.advance(Duration::from_secs(10));
        recorder.complete(0, true, 9);
        let report = controller.tick(&idle()).expect("tick");

        let expected = RoomScoreData::new(RoomId(1), 10, 100, true);
        assert_eq!(report.session_ended, Some(SessionEnd::Scored(expected)));
        assert_eq!(
            controller.state().player().room_score(RoomId(1)),
            Some(&expected)
        );
        assert!(!controller.is_minigame_active());
        assert!(recorder.surface(0).is_closed());
        assert_eq!(recorder.stops(), 1);
    }

    #[test]
    fn active_minigame_receives_input_and_player_stays_put() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller = campus_controller(&clock, &recorder);
        enter_room_and_start(&mut controller, 2);
        let before = controller.state().player().position();

        let input = InputSnapshot::empty()
            .with_action_down(InputAction::MoveRight, true)
            .with_action_pressed(InputAction::MoveDown, true)
            .with_interact_pressed(true);
        controller.tick(&input).expect("tick");

        assert_eq!(controller.state().player().position(), before);
        let surface = recorder.surface(0);
        assert_eq!(surface.poll_input(), Some(MinigameInput::Down));
        assert_eq!(surface.poll_input(), Some(MinigameInput::Confirm));
        assert_eq!(surface.poll_input(), None);
        assert_eq!(recorder.starts(), 1);
    }

    #[test]
    fn cancel_ends_session_as_failure() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller = campus_controller(&clock, &recorder);
        enter_room_and_start(&mut controller, 3);

        let cancel = InputSnapshot::empty().with_action_pressed(InputAction::Cancel, true);
        let report = controller.tick(&cancel).expect("tick");

        assert_eq!(
            report.session_ended,
            Some(SessionEnd::Failed { room_id: RoomId(3) })
        );
        assert!(!controller.is_minigame_active());
        assert!(recorder.surface(0).is_closed());
        assert_eq!(recorder.stops(), 1);
        assert!(controller.state().player().room_scores().is_empty());
    }

    #[test]
    fn callback_from_ended_session_is_ignored() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller = campus_controller(&clock, &recorder);
        enter_room_and_start(&mut controller, 1);
        let cancel = InputSnapshot::empty().with_action_pressed(InputAction::Cancel, true);
        controller.tick(&cancel).expect("tick");

        controller.tick(&press_interact()).expect("tick");
        assert!(controller.is_minigame_active());

        recorder.complete(0, true, 1);
        let report = controller.tick(&idle()).expect("tick");
        assert_eq!(report.session_ended, None);
        assert!(controller.is_minigame_active());
        assert!(controller.state().player().room_scores().is_empty());

        clock.advance(Duration::from_secs(45));
        recorder.complete(1, true, 45);
        controller.tick(&idle()).expect("tick");
        assert_eq!(
            controller
                .state()
                .player()
                .room_score(RoomId(1))
                .map(RoomScoreData::points_gained),
            Some(70)
        );
    }

    #[test]
    fn silent_minigame_times_out_as_failure() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let config = LoopConfig {
            minigame_timeout: Some(Duration::from_secs(120)),
            ..LoopConfig::default()
        };
        let mut controller = campus_controller_with(&clock, recording_registry(&recorder, false), config);
        enter_room_and_start(&mut controller, 4);

        clock.advance(Duration::from_secs(119));
        assert_eq!(controller.tick(&idle()).expect("tick").session_ended, None);

        clock.advance(Duration::from_secs(1));
        let report = controller.tick(&idle()).expect("tick");
        assert_eq!(
            report.session_ended,
            Some(SessionEnd::Failed { room_id: RoomId(4) })
        );
        assert!(!controller.is_minigame_active());
    }

    #[test]
    fn closed_surface_ends_session_as_failure() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller = campus_controller(&clock, &recorder);
        enter_room_and_start(&mut controller, 2);

        controller.active_surface().expect("surface").close();
        let report = controller.tick(&idle()).expect("tick");

        assert_eq!(
            report.session_ended,
            Some(SessionEnd::Failed { room_id: RoomId(2) })
        );
        assert!(!controller.is_minigame_active());
    }

    #[test]
    fn unregistered_minigame_leaves_controller_idle() {
        let clock = ManualClock::new();
        let mut controller =
            campus_controller_with(&clock, MinigameRegistry::new(), LoopConfig::default());
        controller.state.change_room(RoomId(1)).expect("room");
        stand_on_npc(&mut controller);

        let report = controller.tick(&press_interact()).expect("tick");

        assert!(report.dialogue.is_some());
        assert_eq!(report.minigame_started, None);
        assert!(!controller.is_minigame_active());
    }

    #[test]
    fn failed_start_leaves_controller_idle() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller =
            campus_controller_with(&clock, recording_registry(&recorder, true), LoopConfig::default());
        controller.state.change_room(RoomId(2)).expect("room");
        stand_on_npc(&mut controller);

        let report = controller.tick(&press_interact()).expect("tick");

        assert_eq!(report.minigame_started, None);
        assert!(!controller.is_minigame_active());
        assert!(controller.active_surface().is_none());

        let before = controller.state().player().position();
        controller
            .tick(&InputSnapshot::empty().with_action_down(InputAction::MoveLeft, true))
            .expect("tick");
        assert_eq!(
            controller.state().player().position(),
            before.translated(-5, 0)
        );
    }

    #[test]
    fn completing_every_puzzle_room_flags_run_once() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller = campus_controller(&clock, &recorder);

        let mut completed_reports = 0;
        for (start_index, room) in (1..=4).enumerate() {
            enter_room_and_start(&mut controller, room);
            clock.advance(Duration::from_secs(20));
            recorder.complete(start_index, true, 20);
            let report = controller.tick(&idle()).expect("tick");
            completed_reports += usize::from(report.run_completed);
        }
        let after = controller.tick(&idle()).expect("tick");

        assert_eq!(completed_reports, 1);
        assert!(!after.run_completed);
        assert!(controller.run_completed());
        assert_eq!(controller.state().player().total_score(), 400);
    }

    #[test]
    fn snapshot_describes_current_room_and_session() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller = campus_controller(&clock, &recorder);
        enter_room_and_start(&mut controller, 1);
        recorder.surface(0).set_prompt("2 + 2 = ?");
        clock.advance(Duration::from_secs(3));

        let snapshot = controller.snapshot(TickMetrics::default());

        assert_eq!(snapshot.room_id, RoomId(1));
        assert_eq!(snapshot.room_name, "Bar");
        assert_eq!(snapshot.room_type, RoomType::Puzzle);
        assert_eq!(snapshot.doors.len(), 1);
        assert_eq!(snapshot.doors[0].to, RoomId(0));
        assert_eq!(snapshot.npc.as_ref().map(|npc| npc.name.as_str()), Some("Barista"));
        let minigame = snapshot.minigame.expect("active minigame");
        assert_eq!(minigame.room_id, RoomId(1));
        assert_eq!(minigame.elapsed_seconds, 3);
        assert_eq!(minigame.view.title, "Recorder");
        assert_eq!(minigame.view.prompt, "2 + 2 = ?");
        assert_eq!(snapshot.tick, controller.tick_count());
    }

    #[test]
    fn shutdown_stops_running_minigame() {
        let clock = ManualClock::new();
        let recorder = Recorder::default();
        let mut controller = campus_controller(&clock, &recorder);
        enter_room_and_start(&mut controller, 1);

        controller.shutdown();

        assert!(!controller.is_minigame_active());
        assert_eq!(recorder.stops(), 1);
        assert!(recorder.surface(0).is_closed());
    }

    #[test]
    fn resize_updates_bounds_without_moving_player() {
        let clock = ManualClock::new();
        let mut controller = campus_controller(&clock, &Recorder::default());
        let before = controller.state().player().position();
        let new_env = Point2D::new(1600, 900);

        controller.resize(new_env);

        assert_eq!(controller.state().environment_size(), new_env);
        assert_eq!(controller.state().player().position(), before);
        assert_eq!(controller.state().player().environment_size(), new_env);
    }
}

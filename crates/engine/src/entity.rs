use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::geometry::{Hitbox, Point2D};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub usize);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Something placed in a room with a position, a fixed logical size and a
/// hitbox derived from both.
///
/// `resize` records the new environment bounds only. Positions are logical
/// coordinates and are never rescaled here; scaling belongs to whoever draws.
pub trait Entity {
    fn position(&self) -> Point2D;
    fn set_position(&mut self, position: Point2D);
    fn size(&self) -> Point2D;
    fn environment_size(&self) -> Point2D;
    fn resize(&mut self, environment_size: Point2D);

    fn hitbox(&self) -> Hitbox {
        Hitbox::new(self.position(), self.size())
    }
}

/// Outcome of one completed minigame. Built once and never mutated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomScoreData {
    room_id: RoomId,
    time_taken_seconds: u32,
    points_gained: u32,
    completed: bool,
}

impl RoomScoreData {
    pub fn new(
        room_id: RoomId,
        time_taken_seconds: u32,
        points_gained: u32,
        completed: bool,
    ) -> Self {
        Self {
            room_id,
            time_taken_seconds,
            points_gained,
            completed,
        }
    }

    pub fn room_id(&self) -> RoomId {
        self.room_id
    }

    pub fn time_taken_seconds(&self) -> u32 {
        self.time_taken_seconds
    }

    pub fn points_gained(&self) -> u32 {
        self.points_gained
    }

    pub fn completed(&self) -> bool {
        self.completed
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PlayerTuning {
    /// Distance covered along each held axis per tick.
    pub speed: i32,
    pub size: Point2D,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            speed: 5,
            size: Point2D::new(40, 40),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Player {
    position: Point2D,
    size: Point2D,
    speed: i32,
    environment_size: Point2D,
    room_scores: BTreeMap<RoomId, RoomScoreData>,
}

impl Player {
    pub fn new(spawn: Point2D, environment_size: Point2D, tuning: PlayerTuning) -> Self {
        Self {
            position: spawn,
            size: tuning.size,
            speed: tuning.speed,
            environment_size,
            room_scores: BTreeMap::new(),
        }
    }

    pub fn speed(&self) -> i32 {
        self.speed
    }

    pub fn move_by(&mut self, dx: i32, dy: i32) {
        self.position = self.position.translated(dx, dy);
    }

    /// Records a completed room, replacing any earlier entry for the same id.
    pub fn add_room_score(&mut self, room_id: RoomId, time_taken_seconds: u32, points: u32) {
        let score = RoomScoreData::new(room_id, time_taken_seconds, points, true);
        if let Some(previous) = self.room_scores.insert(room_id, score) {
            debug!(
                room_id = room_id.0,
                previous_points = previous.points_gained(),
                points,
                "room_score_replaced"
            );
        }
    }

    pub fn room_score(&self, room_id: RoomId) -> Option<&RoomScoreData> {
        self.room_scores.get(&room_id)
    }

    pub fn room_scores(&self) -> &BTreeMap<RoomId, RoomScoreData> {
        &self.room_scores
    }

    pub fn total_score(&self) -> u32 {
        self.room_scores
            .values()
            .map(RoomScoreData::points_gained)
            .fold(0u32, u32::saturating_add)
    }

    pub fn all_rooms_completed(&self, room_count: usize) -> bool {
        self.room_scores.len() == room_count
            && self.room_scores.values().all(RoomScoreData::completed)
    }
}

impl Entity for Player {
    fn position(&self) -> Point2D {
        self.position
    }

    fn set_position(&mut self, position: Point2D) {
        self.position = position;
    }

    fn size(&self) -> Point2D {
        self.size
    }

    fn environment_size(&self) -> Point2D {
        self.environment_size
    }

    fn resize(&mut self, environment_size: Point2D) {
        self.environment_size = environment_size;
    }
}

/// Directed edge of the room graph: walking through it moves the player
/// from `from` to `to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Door {
    from: RoomId,
    to: RoomId,
    position: Point2D,
    size: Point2D,
    environment_size: Point2D,
}

impl Door {
    pub fn new(
        from: RoomId,
        to: RoomId,
        position: Point2D,
        size: Point2D,
        environment_size: Point2D,
    ) -> Self {
        Self {
            from,
            to,
            position,
            size,
            environment_size,
        }
    }

    pub fn from_id(&self) -> RoomId {
        self.from
    }

    pub fn to_id(&self) -> RoomId {
        self.to
    }

    pub fn dimension(&self) -> Point2D {
        self.size
    }
}

impl Entity for Door {
    fn position(&self) -> Point2D {
        self.position
    }

    fn set_position(&mut self, position: Point2D) {
        self.position = position;
    }

    fn size(&self) -> Point2D {
        self.size
    }

    fn environment_size(&self) -> Point2D {
        self.environment_size
    }

    fn resize(&mut self, environment_size: Point2D) {
        self.environment_size = environment_size;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Npc {
    name: String,
    dialogue: String,
    position: Point2D,
    size: Point2D,
    environment_size: Point2D,
}

impl Npc {
    pub fn new(
        name: impl Into<String>,
        dialogue: impl Into<String>,
        position: Point2D,
        size: Point2D,
        environment_size: Point2D,
    ) -> Self {
        Self {
            name: name.into(),
            dialogue: dialogue.into(),
            position,
            size,
            environment_size,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dialogue(&self) -> &str {
        &self.dialogue
    }

    pub fn interact(&self) -> &str {
        info!(npc = self.name.as_str(), dialogue = self.dialogue.as_str(), "npc_interaction");
        &self.dialogue
    }
}

impl Entity for Npc {
    fn position(&self) -> Point2D {
        self.position
    }

    fn set_position(&mut self, position: Point2D) {
        self.position = position;
    }

    fn size(&self) -> Point2D {
        self.size
    }

    fn environment_size(&self) -> Point2D {
        self.environment_size
    }

    fn resize(&mut self, environment_size: Point2D) {
        self.environment_size = environment_size;
    }
}

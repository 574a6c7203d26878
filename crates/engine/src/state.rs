use thiserror::Error;
use tracing::info;

use crate::entity::{Entity, Player, RoomId};
use crate::geometry::Point2D;
use crate::room::{Room, RoomType};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GameStateError {
    #[error("invalid room id {room_id}: valid ids are 0..{room_count}")]
    InvalidRoomId { room_id: RoomId, room_count: usize },
    #[error("game state needs at least one room")]
    NoRooms,
}

/// Owns the room graph and the player. Room 0 is where every run starts.
#[derive(Debug, Clone)]
pub struct GameState {
    rooms: Vec<Room>,
    player: Player,
    current_room_id: RoomId,
    environment_size: Point2D,
}

impl GameState {
    pub fn new(
        rooms: Vec<Room>,
        player: Player,
        environment_size: Point2D,
    ) -> Result<Self, GameStateError> {
        if rooms.is_empty() {
            return Err(GameStateError::NoRooms);
        }
        Ok(Self {
            rooms,
            player,
            current_room_id: RoomId(0),
            environment_size,
        })
    }

    pub fn current_room_id(&self) -> RoomId {
        self.current_room_id
    }

    pub fn current_room(&self) -> &Room {
        // `current_room_id` only ever holds an index validated by `change_room`
        // or the starting room of a non-empty list.
        &self.rooms[self.current_room_id.0]
    }

    /// Moves to `room_id`. An out-of-range id leaves the state untouched.
    pub fn change_room(&mut self, room_id: RoomId) -> Result<(), GameStateError> {
        if room_id.0 >= self.rooms.len() {
            return Err(GameStateError::InvalidRoomId {
                room_id,
                room_count: self.rooms.len(),
            });
        }
        let previous = self.current_room_id;
        self.current_room_id = room_id;
        info!(
            from_room = previous.0,
            to_room = room_id.0,
            room_name = self.current_room().name(),
            "room_changed"
        );
        Ok(())
    }

    pub fn room(&self, room_id: RoomId) -> Option<&Room> {
        self.rooms.get(room_id.0)
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn total_rooms(&self) -> usize {
        self.rooms.len()
    }

    pub fn puzzle_room_count(&self) -> usize {
        self.rooms
            .iter()
            .filter(|room| room.room_type() == RoomType::Puzzle)
            .count()
    }

    pub fn player(&self) -> &Player {
        &self.player
    }

    pub fn player_mut(&mut self) -> &mut Player {
        &mut self.player
    }

    pub fn environment_size(&self) -> Point2D {
        self.environment_size
    }

    /// Forwards new bounds to the player and the entities of the current room.
    pub fn resize(&mut self, environment_size: Point2D) {
        self.environment_size = environment_size;
        self.player.resize(environment_size);
        let current = self.current_room_id.0;
        self.rooms[current].resize(environment_size);
    }
}

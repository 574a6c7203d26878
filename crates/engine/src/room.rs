use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entity::{Door, Entity, Npc, RoomId};
use crate::geometry::Point2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomType {
    Main,
    Puzzle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomFeature {
    Npc,
    Minigame,
}

impl fmt::Display for RoomFeature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Npc => f.write_str("npc"),
            Self::Minigame => f.write_str("minigame"),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("room {room_id} is a main room and cannot hold a {feature}")]
    NotAvailableInMainRoom { room_id: RoomId, feature: RoomFeature },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PuzzleFeatures {
    pub npc: Option<Npc>,
    pub minigame: Option<String>,
}

/// The two room kinds carry different data, so an npc or minigame lookup on a
/// main room is an absent value rather than a runtime failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomKind {
    Main,
    Puzzle(PuzzleFeatures),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    id: RoomId,
    name: String,
    doors: Vec<Door>,
    kind: RoomKind,
}

impl Room {
    pub fn new(id: RoomId, room_type: RoomType, doors: Vec<Door>) -> Self {
        let kind = match room_type {
            RoomType::Main => RoomKind::Main,
            RoomType::Puzzle => RoomKind::Puzzle(PuzzleFeatures::default()),
        };
        Self {
            id,
            name: format!("Room {}", id.0),
            doors,
            kind,
        }
    }

    pub fn id(&self) -> RoomId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn room_type(&self) -> RoomType {
        match self.kind {
            RoomKind::Main => RoomType::Main,
            RoomKind::Puzzle(_) => RoomType::Puzzle,
        }
    }

    pub fn kind(&self) -> &RoomKind {
        &self.kind
    }

    /// Doors in enumeration order. Interaction checks rely on this order.
    pub fn doors(&self) -> &[Door] {
        &self.doors
    }

    pub fn update_doors(&mut self, doors: Vec<Door>) {
        self.doors = doors;
    }

    pub fn npc(&self) -> Option<&Npc> {
        match &self.kind {
            RoomKind::Main => None,
            RoomKind::Puzzle(features) => features.npc.as_ref(),
        }
    }

    pub fn minigame_key(&self) -> Option<&str> {
        match &self.kind {
            RoomKind::Main => None,
            RoomKind::Puzzle(features) => features.minigame.as_deref(),
        }
    }

    pub fn attach_npc(&mut self, npc: Npc) -> Result<(), RoomError> {
        let features = self.puzzle_features_mut(RoomFeature::Npc)?;
        features.npc = Some(npc);
        Ok(())
    }

    pub fn attach_minigame(&mut self, key: impl Into<String>) -> Result<(), RoomError> {
        let features = self.puzzle_features_mut(RoomFeature::Minigame)?;
        features.minigame = Some(key.into());
        Ok(())
    }

    /// Forwards the new bounds to every door and, in puzzle rooms, the npc.
    pub fn resize(&mut self, environment_size: Point2D) {
        for door in &mut self.doors {
            door.resize(environment_size);
        }
        if let RoomKind::Puzzle(PuzzleFeatures { npc: Some(npc), .. }) = &mut self.kind {
            npc.resize(environment_size);
        }
    }

    /// First door, in enumeration order, leading to `destination`.
    pub fn door_to(&self, destination: RoomId) -> Option<&Door> {
        self.doors.iter().find(|door| door.to_id() == destination)
    }

    fn puzzle_features_mut(
        &mut self,
        feature: RoomFeature,
    ) -> Result<&mut PuzzleFeatures, RoomError> {
        match &mut self.kind {
            RoomKind::Main => Err(RoomError::NotAvailableInMainRoom {
                room_id: self.id,
                feature,
            }),
            RoomKind::Puzzle(features) => Ok(features),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENV: Point2D = Point2D::new(1280, 720);

    fn door(from: usize, to: usize, x: i32) -> Door {
        Door::new(
            RoomId(from),
            RoomId(to),
            Point2D::new(x, 10),
            Point2D::new(60, 30),
            ENV,
        )
    }

    fn npc() -> Npc {
        Npc::new("Barista", "Coffee first.", Point2D::new(640, 360), Point2D::new(40, 40), ENV)
    }

    #[test]
    fn main_room_rejects_npc_and_minigame() {
        let mut room = Room::new(RoomId(0), RoomType::Main, Vec::new());

        assert_eq!(
            room.attach_npc(npc()),
            Err(RoomError::NotAvailableInMainRoom {
                room_id: RoomId(0),
                feature: RoomFeature::Npc,
            })
        );
        assert!(room.attach_minigame("quiz").is_err());
        assert!(room.npc().is_none());
        assert!(room.minigame_key().is_none());
    }

    #[test]
    fn puzzle_room_holds_npc_and_minigame() {
        let mut room = Room::new(RoomId(1), RoomType::Puzzle, Vec::new());
        room.attach_npc(npc()).expect("attach npc");
        room.attach_minigame("quiz").expect("attach minigame");

        assert_eq!(room.room_type(), RoomType::Puzzle);
        assert_eq!(room.npc().map(Npc::name), Some("Barista"));
        assert_eq!(room.minigame_key(), Some("quiz"));
    }

    #[test]
    fn default_name_uses_id_until_renamed() {
        let mut room = Room::new(RoomId(3), RoomType::Puzzle, Vec::new());
        assert_eq!(room.name(), "Room 3");
        room.set_name("Gym");
        assert_eq!(room.name(), "Gym");
    }

    #[test]
    fn door_to_returns_first_match_in_order() {
        let room = Room::new(
            RoomId(0),
            RoomType::Main,
            vec![door(0, 1, 100), door(0, 2, 200), door(0, 2, 300)],
        );

        let found = room.door_to(RoomId(2)).expect("door to room 2");
        assert_eq!(found.position().x, 200);
        assert!(room.door_to(RoomId(4)).is_none());
    }

    #[test]
    fn update_doors_replaces_whole_set() {
        let mut room = Room::new(RoomId(0), RoomType::Main, vec![door(0, 1, 100)]);
        room.update_doors(vec![door(0, 3, 50), door(0, 4, 90)]);
        let targets: Vec<_> = room.doors().iter().map(Door::to_id).collect();
        assert_eq!(targets, vec![RoomId(3), RoomId(4)]);
    }

    #[test]
    fn resize_reaches_doors_and_npc_without_moving_them() {
        let mut room = Room::new(RoomId(1), RoomType::Puzzle, vec![door(1, 0, 100)]);
        room.attach_npc(npc()).expect("attach npc");
        let new_env = Point2D::new(1024, 768);

        room.resize(new_env);

        assert_eq!(room.doors()[0].environment_size(), new_env);
        assert_eq!(room.doors()[0].position(), Point2D::new(100, 10));
        let npc = room.npc().expect("npc");
        assert_eq!(npc.environment_size(), new_env);
        assert_eq!(npc.position(), Point2D::new(640, 360));
    }
}

//! Room graph generation from a JSON layout.
//!
//! Door anchors are resolved against the environment size once, when the
//! rooms are generated. Later resizes do not move them.

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::entity::{Door, Npc, RoomId};
use crate::geometry::Point2D;
use crate::room::{Room, RoomError, RoomType};

const CAMPUS_LAYOUT_JSON: &str = include_str!("../assets/campus.json");
const NPC_STEP_X: i32 = 50;
const NPC_STEP_Y: i32 = 30;

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("parse layout json at {path}: {message}")]
    Parse { path: String, message: String },
    #[error("layout declares no rooms")]
    NoRooms,
    #[error("room at index {index} has id {id}; ids must be 0..N-1 in order")]
    RoomIdOutOfOrder { index: usize, id: usize },
    #[error("door {door_index} of room {room_id} leads to room {to}, but only {room_count} rooms exist")]
    DoorTargetOutOfRange {
        room_id: usize,
        door_index: usize,
        to: usize,
        room_count: usize,
    },
    #[error("door offset {offset} of room {room_id} must lie within 0.0..=1.0")]
    DoorOffsetOutOfRange { room_id: usize, offset: f32 },
    #[error(transparent)]
    Room(#[from] RoomError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoorAnchorEdge {
    Left,
    Right,
    Top,
    Bottom,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DoorStyle {
    pub thickness: i32,
    pub length: i32,
    pub inset: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DoorSpec {
    pub to: usize,
    pub edge: DoorAnchorEdge,
    #[serde(default = "default_door_offset")]
    pub offset: f32,
}

fn default_door_offset() -> f32 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NpcSpec {
    pub name: String,
    pub dialogue: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoomSpec {
    pub id: usize,
    pub name: String,
    #[serde(rename = "type")]
    pub room_type: RoomType,
    #[serde(default)]
    pub minigame: Option<String>,
    #[serde(default)]
    pub doors: Vec<DoorSpec>,
    #[serde(default)]
    pub npc: Option<NpcSpec>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoomLayout {
    pub door: DoorStyle,
    pub npc_size: Point2D,
    pub rooms: Vec<RoomSpec>,
}

impl RoomLayout {
    /// The five-room campus shipped with the game.
    pub fn campus() -> Result<Self, LayoutError> {
        Self::from_json_str(CAMPUS_LAYOUT_JSON)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, LayoutError> {
        let mut deserializer = serde_json::Deserializer::from_str(raw);
        let layout: RoomLayout = serde_path_to_error::deserialize(&mut deserializer).map_err(
            |error| {
                let path = error.path().to_string();
                LayoutError::Parse {
                    path,
                    message: error.into_inner().to_string(),
                }
            },
        )?;
        layout.validate()?;
        Ok(layout)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Distinct minigame keys referenced by rooms, in first-use order.
    pub fn minigame_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for key in self.rooms.iter().filter_map(|room| room.minigame.as_deref()) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        keys
    }

    fn validate(&self) -> Result<(), LayoutError> {
        if self.rooms.is_empty() {
            return Err(LayoutError::NoRooms);
        }
        let room_count = self.rooms.len();
        for (index, room) in self.rooms.iter().enumerate() {
            if room.id != index {
                return Err(LayoutError::RoomIdOutOfOrder { index, id: room.id });
            }
            for (door_index, door) in room.doors.iter().enumerate() {
                if door.to >= room_count {
                    return Err(LayoutError::DoorTargetOutOfRange {
                        room_id: room.id,
                        door_index,
                        to: door.to,
                        room_count,
                    });
                }
                if !(0.0..=1.0).contains(&door.offset) {
                    return Err(LayoutError::DoorOffsetOutOfRange {
                        room_id: room.id,
                        offset: door.offset,
                    });
                }
            }
        }
        Ok(())
    }
}

pub struct RoomGenerator<'a> {
    layout: &'a RoomLayout,
    environment_size: Point2D,
}

impl<'a> RoomGenerator<'a> {
    pub fn new(layout: &'a RoomLayout, environment_size: Point2D) -> Self {
        Self {
            layout,
            environment_size,
        }
    }

    pub fn generate(&self, index: usize) -> Option<Result<Room, LayoutError>> {
        let spec = self.layout.rooms.get(index)?;
        Some(self.build_room(spec))
    }

    fn build_room(&self, spec: &RoomSpec) -> Result<Room, LayoutError> {
        let mut room = Room::new(RoomId(spec.id), spec.room_type, self.build_doors(spec));
        room.set_name(spec.name.clone());
        if let Some(key) = &spec.minigame {
            room.attach_minigame(key.clone())?;
        }
        Ok(room)
    }

    fn build_doors(&self, spec: &RoomSpec) -> Vec<Door> {
        spec.doors
            .iter()
            .map(|door| {
                let (position, size) = self.resolve_anchor(door);
                Door::new(
                    RoomId(spec.id),
                    RoomId(door.to),
                    position,
                    size,
                    self.environment_size,
                )
            })
            .collect()
    }

    fn resolve_anchor(&self, door: &DoorSpec) -> (Point2D, Point2D) {
        let style = self.layout.door;
        let env = self.environment_size;
        let along = |extent: i32| (extent as f32 * door.offset).round() as i32 - style.length / 2;
        match door.edge {
            DoorAnchorEdge::Left => (
                Point2D::new(style.inset, along(env.y)),
                Point2D::new(style.thickness, style.length),
            ),
            DoorAnchorEdge::Right => (
                Point2D::new(env.x - style.inset - style.thickness, along(env.y)),
                Point2D::new(style.thickness, style.length),
            ),
            DoorAnchorEdge::Top => (
                Point2D::new(along(env.x), style.inset),
                Point2D::new(style.length, style.thickness),
            ),
            DoorAnchorEdge::Bottom => (
                Point2D::new(along(env.x), env.y - style.inset - style.thickness),
                Point2D::new(style.length, style.thickness),
            ),
        }
    }
}

pub struct NpcGenerator<'a> {
    layout: &'a RoomLayout,
    environment_size: Point2D,
}

impl<'a> NpcGenerator<'a> {
    pub fn new(layout: &'a RoomLayout, environment_size: Point2D) -> Self {
        Self {
            layout,
            environment_size,
        }
    }

    /// NPC for the room at `index`, placed a little further from the center
    /// for each successive room so they do not all stack up.
    pub fn generate(&self, index: usize) -> Option<Npc> {
        let spec = self.layout.rooms.get(index)?.npc.as_ref()?;
        let step = i32::try_from(index).unwrap_or(i32::MAX);
        let position = self
            .environment_size
            .half()
            .translated(step.saturating_mul(NPC_STEP_X), step.saturating_mul(NPC_STEP_Y));
        Some(Npc::new(
            spec.name.clone(),
            spec.dialogue.clone(),
            position,
            self.layout.npc_size,
            self.environment_size,
        ))
    }
}

/// Builds every room of `layout` with its doors, minigame key and npc.
pub fn generate_rooms(layout: &RoomLayout, environment_size: Point2D) -> Result<Vec<Room>, LayoutError> {
    let rooms_generator = RoomGenerator::new(layout, environment_size);
    let npc_generator = NpcGenerator::new(layout, environment_size);

    let mut rooms = Vec::with_capacity(layout.room_count());
    for index in 0..layout.room_count() {
        let Some(room) = rooms_generator.generate(index) else {
            break;
        };
        let mut room = room?;
        if let Some(npc) = npc_generator.generate(index) {
            room.attach_npc(npc)?;
        }
        debug!(
            room_id = index,
            name = room.name(),
            door_count = room.doors().len(),
            has_npc = room.npc().is_some(),
            "room_generated"
        );
        rooms.push(room);
    }
    info!(room_count = rooms.len(), "rooms_generated");
    Ok(rooms)
}

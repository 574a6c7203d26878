use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tracing::warn;

use crate::entity::{RoomId, RoomScoreData};
use crate::geometry::Point2D;
use crate::minigame::MinigameView;
use crate::room::RoomType;

use super::metrics::TickMetrics;

static SNAPSHOT_LOCK_POISON_WARNED: AtomicBool = AtomicBool::new(false);

fn warn_snapshot_lock_poison_once(operation: &'static str) {
    if SNAPSHOT_LOCK_POISON_WARNED
        .compare_exchange(false, true, Ordering::Relaxed, Ordering::Relaxed)
        .is_ok()
    {
        warn!(operation, "snapshot lock poisoned; recovered inner value");
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BoxView {
    pub position: Point2D,
    pub size: Point2D,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorView {
    pub to: RoomId,
    pub position: Point2D,
    pub size: Point2D,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NpcView {
    pub name: String,
    pub position: Point2D,
    pub size: Point2D,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActiveMinigameView {
    pub room_id: RoomId,
    pub name: String,
    pub elapsed_seconds: u64,
    pub view: MinigameView,
}

/// Immutable copy of everything a presentation layer draws. Published by the
/// loop thread after each batch of ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameSnapshot {
    pub tick: u64,
    pub environment_size: Point2D,
    pub room_id: RoomId,
    pub room_name: String,
    pub room_type: RoomType,
    pub player: BoxView,
    pub doors: Vec<DoorView>,
    pub npc: Option<NpcView>,
    pub last_dialogue: Option<String>,
    pub minigame: Option<ActiveMinigameView>,
    pub scores: Vec<RoomScoreData>,
    pub total_score: u32,
    pub all_rooms_completed: bool,
    pub metrics: TickMetrics,
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self {
            tick: 0,
            environment_size: Point2D::ZERO,
            room_id: RoomId(0),
            room_name: String::new(),
            room_type: RoomType::Main,
            player: BoxView::default(),
            doors: Vec::new(),
            npc: None,
            last_dialogue: None,
            minigame: None,
            scores: Vec::new(),
            total_score: 0,
            all_rooms_completed: false,
            metrics: TickMetrics::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SnapshotHandle {
    snapshot: Arc<RwLock<Arc<GameSnapshot>>>,
}

impl SnapshotHandle {
    pub fn snapshot(&self) -> Arc<GameSnapshot> {
        match self.snapshot.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(poisoned) => {
                warn_snapshot_lock_poison_once("read");
                Arc::clone(&poisoned.into_inner())
            }
        }
    }

    pub fn publish(&self, snapshot: GameSnapshot) {
        let snapshot = Arc::new(snapshot);
        match self.snapshot.write() {
            Ok(mut guard) => *guard = snapshot,
            Err(poisoned) => {
                warn_snapshot_lock_poison_once("write");
                let mut guard = poisoned.into_inner();
                *guard = snapshot;
            }
        }
    }
}

pub mod app;
pub mod entity;
pub mod geometry;
pub mod layout;
pub mod minigame;
pub mod position;
pub mod room;
pub mod state;

pub use app::{
    ActiveMinigameView, BoxView, ControllerError, DoorView, GameLoop, GameSnapshot, InputAction,
    InputCollector, InputHandle, InputSnapshot, InteractTrigger, LoopConfig, LoopError,
    MainController, NpcView, RoomChange, SnapshotHandle, TickMetrics, TickReport,
    LOOP_THREAD_NAME,
};
pub use entity::{Door, Entity, Npc, Player, PlayerTuning, RoomId, RoomScoreData};
pub use geometry::{Hitbox, Point2D};
pub use layout::{generate_rooms, LayoutError, NpcGenerator, RoomGenerator, RoomLayout};
pub use minigame::{
    calculate_points, Clock, ManualClock, Minigame, MinigameCoordinator, MinigameError,
    MinigameInput, MinigameRegistry, MinigameSurface, MinigameView, OnComplete, SessionEnd,
    SessionId, SurfaceTint, SystemClock,
};
pub use position::{
    classify_door_edge, default_spawn_position, position_after_transition, spawn_position,
    DoorEdge, SPAWN_OFFSET,
};
pub use room::{Room, RoomError, RoomFeature, RoomKind, RoomType};
pub use state::{GameState, GameStateError};

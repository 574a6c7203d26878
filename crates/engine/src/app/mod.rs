mod controller;
mod input;
mod loop_runner;
mod metrics;
mod snapshot;

pub use controller::{ControllerError, MainController, RoomChange, TickReport};
pub use input::{InputAction, InputCollector, InputHandle, InputSnapshot, InteractTrigger};
pub use loop_runner::{GameLoop, LoopConfig, LoopError, LOOP_THREAD_NAME};
pub use metrics::TickMetrics;
pub use snapshot::{
    ActiveMinigameView, BoxView, DoorView, GameSnapshot, NpcView, SnapshotHandle,
};

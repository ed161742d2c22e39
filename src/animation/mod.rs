//! Vector animation players, their scheduler, and the resource pool that loads them.

pub mod player;
pub mod pool;
pub mod scheduler;

pub use player::{AnimationPlayer, PlayerId};
pub use pool::{AnimationPool, LoadOptions, LoadResult, PendingAnimation};
pub use scheduler::{AnimationGroupId, AnimationHandle, AnimationScheduler, FrameEvent};

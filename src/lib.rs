//! First-person view of a grid maze, rendered on the CPU by ray casting.
//!
//! Per tick the [`scheduler::FrameScheduler`] resolves movement against the wall grid,
//! fills the frame (ceiling and floor, DDA wall columns, billboard sprites) and
//! publishes a pose snapshot to observers such as the minimap.

pub mod assets;
pub mod camera;
pub mod color;
pub mod floor;
pub mod minimap;
pub mod movement;
pub mod raycast;
pub mod renderer;
pub mod scaler;
pub mod scheduler;
pub mod sprites;
pub mod texture;
pub mod world;

pub use camera::Pose;
pub use movement::{InputIntents, MovementConfig};
pub use renderer::{Frame, RenderSettings};
pub use scheduler::{FrameScheduler, PoseSnapshot, SchedulerConfig, TickOutcome};
pub use texture::{Image, Texture, TextureAtlas};
pub use world::{Level, Sprite};

mod camera;
mod entity;
mod factory;
mod input;
mod loop_runner;
mod metrics;
mod rendering;
mod scene;
mod scene_graph;

pub use camera::{wrap_angle, FirstPersonCamera, ViewerPose, PITCH_LIMIT_RADIANS};
pub use entity::{
    AnimalState, ContainerKind, Cosmetics, DoorRole, Entity, EntityContainer, EntityId,
    EntityIdAllocator, EntityKind, Orientation, WanderParams, ROCK_DISPLACEMENT_SAMPLES,
};
pub use factory::{part_shapes, EntityFactory, KindEntry, PartShape};
pub use input::{InputAction, InputEvent};
pub use loop_runner::{run_app, AppError, LoopConfig};
pub use rendering::{world_to_screen_px, Renderer, Viewport};
pub use scene::{InputSnapshot, Scene, SceneCommand, SceneWorld, DEFAULT_MAP_HALF_EXTENT};
pub use scene_graph::{
    LightingState, NodeDesc, NodeId, NodeLayer, NodeOwner, NodePart, RayHit, Rgb, SceneGraph,
};

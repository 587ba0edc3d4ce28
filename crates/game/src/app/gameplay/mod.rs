#[cfg(test)]
use std::collections::HashMap;
use std::f32::consts::{FRAC_PI_2, PI, TAU};
use std::fmt::Display;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use engine::{
    wrap_angle, ContainerKind, DoorRole, Entity, EntityContainer, EntityFactory,
    EntityId, EntityKind, FirstPersonCamera, InputAction, InputEvent, InputSnapshot, LightingState, NodeDesc, NodeId,
    NodeLayer, NodePart, Orientation, RayHit, Rgb, Scene, SceneCommand, SceneGraph, SceneWorld,
    ViewerPose,
};
use glam::Vec3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

const LAYOUT_VERSION: u32 = 2;
const LAYOUT_FILE_PREFIX: &str = "house_";
const LAYOUT_FILE_SUFFIX: &str = ".layout.json";
const HOUSE_KEY_GRID_PER_UNIT: f32 = 100.0;
const PALETTE_SIZE: usize = 8;
const INTERIOR_FLOOR_Y: f32 = 0.0;
const OUTDOOR_FLOOR_Y: f32 = 0.0;
const ROOM_WALL_HEIGHT: f32 = 3.0;
const ROOM_WALL_THICKNESS: f32 = 0.1;
const ROOM_WALL_MARGIN: f32 = 0.5;
const ROOM_ENTRY_INSET: f32 = 1.5;
const ROOM_FLOOR_COLOR: u32 = 0x8d6e63;
const ROOM_WALL_COLOR: u32 = 0xd7ccc8;
const EXIT_DOOR_INSET: f32 = 0.15;
const DRIFT_FREQUENCY: f32 = 1.7;
const DRIFT_AMPLITUDE: f32 = 0.25;
const TURN_GAIN_PER_SECOND: f32 = 4.0;
const IDLE_BOB_RATE: f32 = 1.5;
const IDLE_BOB_HEIGHT: f32 = 0.01;
const LOOK_AROUND_CHANCE_PER_TICK: f64 = 0.01;
const LOOK_AROUND_MAX_RADIANS: f32 = 0.5;
const SOFT_REDIRECT_MIN: f32 = 2.0;
const SOFT_REDIRECT_MAX: f32 = 6.0;
const WANDER_MIN_RADIUS_FRACTION: f32 = 0.3;
const DOWNWARD_LOOK_EPSILON: f32 = 0.01;
const PLACEMENT_CLEARANCE_MARGIN: f32 = 1.0;
const SUN_ORBIT_RADIUS: f32 = 100.0;
const DAY_SKY_COLOR: u32 = 0x87ceeb;
const TWILIGHT_SKY_COLOR: u32 = 0xfd8d5a;
const NIGHT_SKY_COLOR: u32 = 0x0b1026;
const TWILIGHT_EDGE: f32 = 0.1;
const INDOOR_AMBIENT: f32 = 0.8;
const INDOOR_TINT_COLOR: u32 = 0x4e342e;

include!("types.rs");
include!("config.rs");
include!("layout_store.rs");
include!("systems.rs");
include!("scene_state.rs");
include!("scene_impl.rs");
include!("util.rs");

pub(crate) fn build_scene(config: GameplayConfig, store: Box<dyn LayoutStore>) -> Box<dyn Scene> {
    Box::new(HomesteadScene::new(config, store))
}

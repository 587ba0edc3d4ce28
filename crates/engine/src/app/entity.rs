use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::scene_graph::NodeId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Tree,
    Rock,
    House,
    Cow,
    Pig,
    Horse,
    Cat,
    Dog,
    Chair,
    Table,
    Couch,
    Tv,
    Bed,
    Door,
}

impl EntityKind {
    pub const ALL: [EntityKind; 14] = [
        EntityKind::Tree,
        EntityKind::Rock,
        EntityKind::House,
        EntityKind::Cow,
        EntityKind::Pig,
        EntityKind::Horse,
        EntityKind::Cat,
        EntityKind::Dog,
        EntityKind::Chair,
        EntityKind::Table,
        EntityKind::Couch,
        EntityKind::Tv,
        EntityKind::Bed,
        EntityKind::Door,
    ];

    pub const fn index(self) -> usize {
        match self {
            EntityKind::Tree => 0,
            EntityKind::Rock => 1,
            EntityKind::House => 2,
            EntityKind::Cow => 3,
            EntityKind::Pig => 4,
            EntityKind::Horse => 5,
            EntityKind::Cat => 6,
            EntityKind::Dog => 7,
            EntityKind::Chair => 8,
            EntityKind::Table => 9,
            EntityKind::Couch => 10,
            EntityKind::Tv => 11,
            EntityKind::Bed => 12,
            EntityKind::Door => 13,
        }
    }

    pub fn as_token(self) -> &'static str {
        match self {
            EntityKind::Tree => "tree",
            EntityKind::Rock => "rock",
            EntityKind::House => "house",
            EntityKind::Cow => "cow",
            EntityKind::Pig => "pig",
            EntityKind::Horse => "horse",
            EntityKind::Cat => "cat",
            EntityKind::Dog => "dog",
            EntityKind::Chair => "chair",
            EntityKind::Table => "table",
            EntityKind::Couch => "couch",
            EntityKind::Tv => "tv",
            EntityKind::Bed => "bed",
            EntityKind::Door => "door",
        }
    }

    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_token() == token)
    }

    pub fn is_animal(self) -> bool {
        matches!(
            self,
            EntityKind::Cow | EntityKind::Pig | EntityKind::Horse | EntityKind::Cat | EntityKind::Dog
        )
    }
}

/// Which container an entity lives in. An interior is keyed by the house that owns it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContainerKind {
    Outdoor,
    Interior(EntityId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoorRole {
    EntersHouse(EntityId),
    ExitsToOutside,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Orientation {
    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,
}

impl Orientation {
    pub fn from_yaw(yaw: f32) -> Self {
        Self {
            yaw,
            ..Self::default()
        }
    }
}

pub const ROCK_DISPLACEMENT_SAMPLES: usize = 8;

/// Randomised look of an entity; drawn once at construction and never mutated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cosmetics {
    Tree {
        height: f32,
        canopy_radius: f32,
    },
    Rock {
        radius: f32,
        displacement: [f32; ROCK_DISPLACEMENT_SAMPLES],
    },
    House {
        width: f32,
        depth: f32,
        wall_height: f32,
    },
    Animal {
        body_length: f32,
        body_height: f32,
    },
    Furniture {
        width: f32,
        height: f32,
    },
    Door {
        width: f32,
        height: f32,
    },
}

impl Cosmetics {
    /// Half extents of the axis-aligned hit box around the entity origin.
    pub fn half_extents(&self) -> Vec3 {
        match *self {
            Cosmetics::Tree {
                height,
                canopy_radius,
            } => Vec3::new(canopy_radius, height * 0.5, canopy_radius),
            Cosmetics::Rock {
                radius,
                displacement,
            } => {
                let bulge = displacement.iter().fold(0.0f32, |acc, d| acc.max(*d));
                let r = radius + bulge;
                Vec3::new(r, r * 0.6, r)
            }
            Cosmetics::House {
                width,
                depth,
                wall_height,
            } => Vec3::new(width * 0.5, wall_height * 0.5, depth * 0.5),
            Cosmetics::Animal {
                body_length,
                body_height,
            } => Vec3::new(body_length * 0.5, body_height * 0.5, body_length * 0.5),
            Cosmetics::Furniture { width, height } => {
                Vec3::new(width * 0.5, height * 0.5, width * 0.5)
            }
            Cosmetics::Door { width, height } => Vec3::new(width * 0.5, height * 0.5, 0.1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WanderParams {
    pub move_speed: f32,
    pub wander_radius: f32,
}

/// Runtime state owned by the wander controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimalState {
    pub params: WanderParams,
    pub initial_position: Vec3,
    pub target_position: Vec3,
    /// Simulation time in seconds at which a new target is drawn.
    pub next_move_at: f32,
    pub moving: bool,
    pub gait_phase: f32,
    pub tail_phase: f32,
    pub drift_phase: f32,
    pub bob_offset: f32,
}

impl AnimalState {
    pub fn new(params: WanderParams, anchor: Vec3, next_move_at: f32) -> Self {
        Self {
            params,
            initial_position: anchor,
            target_position: anchor,
            next_move_at,
            moving: false,
            gait_phase: 0.0,
            tail_phase: 0.0,
            drift_phase: 0.0,
            bob_offset: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub kind: EntityKind,
    pub position: Vec3,
    pub orientation: Orientation,
    pub removable: bool,
    pub door: Option<DoorRole>,
    pub animal: Option<AnimalState>,
    pub cosmetics: Cosmetics,
    pub interaction_radius: f32,
    /// Scene graph nodes drawing this entity; empty until attached.
    pub nodes: Vec<NodeId>,
}

impl Entity {
    pub fn is_animal(&self) -> bool {
        self.animal.is_some()
    }
}

/// Exclusive owner of the entities of one container.
#[derive(Debug)]
pub struct EntityContainer {
    kind: ContainerKind,
    entities: Vec<Entity>,
}

impl EntityContainer {
    pub fn new(kind: ContainerKind) -> Self {
        Self {
            kind,
            entities: Vec::new(),
        }
    }

    pub fn kind(&self) -> ContainerKind {
        self.kind
    }

    pub fn insert(&mut self, entity: Entity) {
        debug_assert!(!self.contains(entity.id), "entity inserted twice");
        self.entities.push(entity);
    }

    pub fn remove(&mut self, id: EntityId) -> Option<Entity> {
        let index = self.entities.iter().position(|entity| entity.id == id)?;
        Some(self.entities.remove(index))
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.iter().any(|entity| entity.id == id)
    }

    pub fn find(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entities_mut(&mut self) -> &mut [Entity] {
        &mut self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn count_of(&self, kind: EntityKind) -> usize {
        self.entities
            .iter()
            .filter(|entity| entity.kind == kind)
            .count()
    }

    pub fn drain(&mut self) -> Vec<Entity> {
        std::mem::take(&mut self.entities)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rock(id: u64) -> Entity {
        Entity {
            id: EntityId(id),
            kind: EntityKind::Rock,
            position: Vec3::ZERO,
            orientation: Orientation::default(),
            removable: true,
            door: None,
            animal: None,
            cosmetics: Cosmetics::Rock {
                radius: 0.5,
                displacement: [0.0; ROCK_DISPLACEMENT_SAMPLES],
            },
            interaction_radius: 0.8,
            nodes: Vec::new(),
        }
    }

    #[test]
    fn allocator_never_reuses_ids() {
        let mut allocator = EntityIdAllocator::default();
        let first = allocator.allocate();
        let second = allocator.allocate();
        let third = allocator.allocate();

        assert_eq!(first.0, 0);
        assert_eq!(second.0, 1);
        assert_eq!(third.0, 2);
    }

    #[test]
    fn kind_tokens_round_trip() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityKind::from_token(kind.as_token()), Some(kind));
            assert_eq!(EntityKind::ALL[kind.index()], kind);
        }
        assert_eq!(EntityKind::from_token("dragon"), None);
    }

    #[test]
    fn only_livestock_and_pets_are_animals() {
        let animals: Vec<EntityKind> = EntityKind::ALL
            .into_iter()
            .filter(|kind| kind.is_animal())
            .collect();
        assert_eq!(
            animals,
            vec![
                EntityKind::Cow,
                EntityKind::Pig,
                EntityKind::Horse,
                EntityKind::Cat,
                EntityKind::Dog
            ]
        );
    }

    #[test]
    fn container_remove_is_idempotent() {
        let mut container = EntityContainer::new(ContainerKind::Outdoor);
        container.insert(rock(1));
        container.insert(rock(2));

        assert!(container.remove(EntityId(1)).is_some());
        assert!(container.remove(EntityId(1)).is_none());
        assert_eq!(container.len(), 1);
        assert!(container.contains(EntityId(2)));
    }

    #[test]
    fn drain_empties_container_and_returns_entities_in_order() {
        let mut container = EntityContainer::new(ContainerKind::Interior(EntityId(9)));
        container.insert(rock(3));
        container.insert(rock(4));

        let drained: Vec<u64> = container.drain().iter().map(|e| e.id.0).collect();
        assert_eq!(drained, vec![3, 4]);
        assert!(container.is_empty());
        assert_eq!(container.kind(), ContainerKind::Interior(EntityId(9)));
    }
}

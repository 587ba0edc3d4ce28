//! Per-kind construction table.
//!
//! Each [`KindEntry`] knows how to draw an entity's cosmetics from the kind catalog and how
//! to make a cheap stand-in for build previews. Adding a kind means adding a row here.

use glam::Vec3;
use rand::RngCore;

use crate::content::{FloatRange, KindCatalog, KindDef};

use super::entity::{
    AnimalState, Cosmetics, DoorRole, Entity, EntityId, EntityKind, Orientation, WanderParams,
    ROCK_DISPLACEMENT_SAMPLES,
};
use super::scene_graph::{NodeDesc, NodeLayer, NodeOwner, NodePart, SceneGraph};

pub type BuildFn = fn(&KindDef, &mut dyn RngCore) -> Cosmetics;
pub type PlaceholderFn = fn(&KindDef) -> Cosmetics;

pub struct KindEntry {
    pub kind: EntityKind,
    pub build: BuildFn,
    pub placeholder: PlaceholderFn,
}

const KIND_TABLE: [KindEntry; 14] = [
    KindEntry {
        kind: EntityKind::Tree,
        build: build_tree,
        placeholder: tree_placeholder,
    },
    KindEntry {
        kind: EntityKind::Rock,
        build: build_rock,
        placeholder: rock_placeholder,
    },
    KindEntry {
        kind: EntityKind::House,
        build: build_house,
        placeholder: house_placeholder,
    },
    KindEntry {
        kind: EntityKind::Cow,
        build: build_animal,
        placeholder: animal_placeholder,
    },
    KindEntry {
        kind: EntityKind::Pig,
        build: build_animal,
        placeholder: animal_placeholder,
    },
    KindEntry {
        kind: EntityKind::Horse,
        build: build_animal,
        placeholder: animal_placeholder,
    },
    KindEntry {
        kind: EntityKind::Cat,
        build: build_animal,
        placeholder: animal_placeholder,
    },
    KindEntry {
        kind: EntityKind::Dog,
        build: build_animal,
        placeholder: animal_placeholder,
    },
    KindEntry {
        kind: EntityKind::Chair,
        build: build_furniture,
        placeholder: furniture_placeholder,
    },
    KindEntry {
        kind: EntityKind::Table,
        build: build_furniture,
        placeholder: furniture_placeholder,
    },
    KindEntry {
        kind: EntityKind::Couch,
        build: build_furniture,
        placeholder: furniture_placeholder,
    },
    KindEntry {
        kind: EntityKind::Tv,
        build: build_furniture,
        placeholder: furniture_placeholder,
    },
    KindEntry {
        kind: EntityKind::Bed,
        build: build_furniture,
        placeholder: furniture_placeholder,
    },
    KindEntry {
        kind: EntityKind::Door,
        build: build_door,
        placeholder: door_placeholder,
    },
];

const HOUSE_DOOR_WIDTH: f32 = 1.0;
const HOUSE_DOOR_HEIGHT: f32 = 2.1;
const GHOST_TINT: f32 = 0.6;

/// Box drawn for one visual part, in the entity's local frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PartShape {
    pub part: NodePart,
    pub offset: Vec3,
    pub half_extents: Vec3,
}

#[derive(Debug, Clone, Default)]
pub struct EntityFactory {
    catalog: KindCatalog,
}

impl EntityFactory {
    pub fn new(catalog: KindCatalog) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &KindCatalog {
        &self.catalog
    }

    pub fn entry(kind: EntityKind) -> &'static KindEntry {
        &KIND_TABLE[kind.index()]
    }

    /// Builds a detached entity; call [`EntityFactory::attach`] to make it visible.
    pub fn create(
        &self,
        id: EntityId,
        kind: EntityKind,
        position: Vec3,
        yaw: f32,
        rng: &mut dyn RngCore,
    ) -> Entity {
        let def = self.catalog.def(kind);
        let cosmetics = (Self::entry(kind).build)(def, rng);
        let door = match kind {
            EntityKind::House => Some(DoorRole::EntersHouse(id)),
            EntityKind::Door => Some(DoorRole::ExitsToOutside),
            _ => None,
        };
        let animal = def.wander.filter(|_| kind.is_animal()).map(|wander| {
            AnimalState::new(
                WanderParams {
                    move_speed: wander.move_speed,
                    wander_radius: wander.radius,
                },
                position,
                0.0,
            )
        });

        Entity {
            id,
            kind,
            position,
            orientation: Orientation::from_yaw(yaw),
            removable: def.removable,
            door,
            animal,
            cosmetics,
            interaction_radius: def.interaction_radius,
            nodes: Vec::new(),
        }
    }

    /// Inserts one node per visual part, each pointing back at the entity.
    pub fn attach(&self, entity: &mut Entity, graph: &mut SceneGraph, layer: NodeLayer) {
        debug_assert!(entity.nodes.is_empty(), "entity attached twice");
        let color = self.catalog.def(entity.kind).color;
        for shape in part_shapes(entity.kind, &entity.cosmetics) {
            let color = match shape.part {
                NodePart::Body => color,
                NodePart::Door => color.scaled(0.5),
            };
            let node = graph.insert(NodeDesc {
                owner: Some(NodeOwner {
                    entity: entity.id,
                    part: shape.part,
                }),
                layer,
                anchor: entity.position,
                offset: shape.offset,
                orientation: entity.orientation,
                half_extents: shape.half_extents,
                color,
            });
            entity.nodes.push(node);
        }
    }

    /// Removes the entity's nodes; returns how many were still present.
    pub fn detach(entity: &mut Entity, graph: &mut SceneGraph) -> usize {
        entity
            .nodes
            .drain(..)
            .filter(|node| graph.remove(*node))
            .count()
    }

    /// Moves the entity's nodes to its current position and orientation.
    pub fn sync(entity: &Entity, graph: &mut SceneGraph) {
        for node in &entity.nodes {
            graph.set_anchor(*node, entity.position, entity.orientation);
        }
    }

    /// Ghost stand-in for `kind`: one dimmed box with no owner, never hit by rays.
    pub fn placeholder(&self, kind: EntityKind, position: Vec3, yaw: f32) -> NodeDesc {
        let def = self.catalog.def(kind);
        let cosmetics = (Self::entry(kind).placeholder)(def);
        NodeDesc {
            owner: None,
            layer: NodeLayer::Ghost,
            anchor: position,
            offset: Vec3::ZERO,
            orientation: Orientation::from_yaw(yaw),
            half_extents: cosmetics.half_extents(),
            color: def.color.scaled(GHOST_TINT),
        }
    }
}

pub fn part_shapes(kind: EntityKind, cosmetics: &Cosmetics) -> Vec<PartShape> {
    let body = PartShape {
        part: NodePart::Body,
        offset: Vec3::ZERO,
        half_extents: cosmetics.half_extents(),
    };
    match (kind, *cosmetics) {
        (EntityKind::House, Cosmetics::House { depth, .. }) => vec![
            body,
            // Door sits flush on the front (+Z local) wall.
            PartShape {
                part: NodePart::Door,
                offset: Vec3::new(0.0, 0.0, depth * 0.5 + 0.1),
                half_extents: Vec3::new(HOUSE_DOOR_WIDTH * 0.5, HOUSE_DOOR_HEIGHT * 0.5, 0.1),
            },
        ],
        (EntityKind::Door, _) => vec![PartShape {
            part: NodePart::Door,
            ..body
        }],
        _ => vec![body],
    }
}

fn build_tree(def: &KindDef, rng: &mut dyn RngCore) -> Cosmetics {
    Cosmetics::Tree {
        height: def.height.sample(rng),
        canopy_radius: def.radius.sample(rng),
    }
}

fn build_rock(def: &KindDef, rng: &mut dyn RngCore) -> Cosmetics {
    let radius = def.radius.sample(rng);
    let mut displacement = [0.0; ROCK_DISPLACEMENT_SAMPLES];
    for sample in &mut displacement {
        *sample = def.noise.sample(rng);
    }
    Cosmetics::Rock {
        radius,
        displacement,
    }
}

fn build_house(def: &KindDef, rng: &mut dyn RngCore) -> Cosmetics {
    Cosmetics::House {
        width: def.radius.sample(rng) * 2.0,
        depth: def.radius.sample(rng) * 2.0,
        wall_height: def.height.sample(rng),
    }
}

fn build_animal(def: &KindDef, rng: &mut dyn RngCore) -> Cosmetics {
    Cosmetics::Animal {
        body_length: def.radius.sample(rng) * 2.0,
        body_height: def.height.sample(rng),
    }
}

fn build_furniture(def: &KindDef, rng: &mut dyn RngCore) -> Cosmetics {
    Cosmetics::Furniture {
        width: def.radius.sample(rng) * 2.0,
        height: def.height.sample(rng),
    }
}

fn build_door(def: &KindDef, rng: &mut dyn RngCore) -> Cosmetics {
    Cosmetics::Door {
        width: def.radius.sample(rng) * 2.0,
        height: def.height.sample(rng),
    }
}

fn mid(range: FloatRange) -> f32 {
    (range.min + range.max) * 0.5
}

fn tree_placeholder(def: &KindDef) -> Cosmetics {
    Cosmetics::Tree {
        height: mid(def.height),
        canopy_radius: mid(def.radius),
    }
}

fn rock_placeholder(def: &KindDef) -> Cosmetics {
    Cosmetics::Rock {
        radius: mid(def.radius),
        displacement: [0.0; ROCK_DISPLACEMENT_SAMPLES],
    }
}

fn house_placeholder(def: &KindDef) -> Cosmetics {
    Cosmetics::House {
        width: mid(def.radius) * 2.0,
        depth: mid(def.radius) * 2.0,
        wall_height: mid(def.height),
    }
}

fn animal_placeholder(def: &KindDef) -> Cosmetics {
    Cosmetics::Animal {
        body_length: mid(def.radius) * 2.0,
        body_height: mid(def.height),
    }
}

fn furniture_placeholder(def: &KindDef) -> Cosmetics {
    Cosmetics::Furniture {
        width: mid(def.radius) * 2.0,
        height: mid(def.height),
    }
}

fn door_placeholder(def: &KindDef) -> Cosmetics {
    Cosmetics::Door {
        width: mid(def.radius) * 2.0,
        height: mid(def.height),
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    fn factory() -> EntityFactory {
        EntityFactory::new(KindCatalog::builtin())
    }

    #[test]
    fn table_rows_follow_kind_order() {
        for kind in EntityKind::ALL {
            assert_eq!(EntityFactory::entry(kind).kind, kind);
        }
    }

    #[test]
    fn every_kind_constructs_with_catalog_fields() {
        let factory = factory();
        let mut rng = StdRng::seed_from_u64(11);
        for (index, kind) in EntityKind::ALL.into_iter().enumerate() {
            let entity = factory.create(
                EntityId(index as u64),
                kind,
                Vec3::new(1.0, 0.0, 2.0),
                0.3,
                &mut rng,
            );
            let def = factory.catalog().def(kind);
            assert_eq!(entity.kind, kind);
            assert_eq!(entity.removable, def.removable);
            assert_eq!(entity.interaction_radius, def.interaction_radius);
            assert_eq!(entity.is_animal(), kind.is_animal());
            assert!(entity.nodes.is_empty());
        }
    }

    #[test]
    fn tree_cosmetics_are_drawn_from_configured_ranges() {
        let factory = factory();
        let def = factory.catalog().def(EntityKind::Tree).clone();
        let mut rng = StdRng::seed_from_u64(3);
        for id in 0..50 {
            let tree = factory.create(EntityId(id), EntityKind::Tree, Vec3::ZERO, 0.0, &mut rng);
            let Cosmetics::Tree {
                height,
                canopy_radius,
            } = tree.cosmetics
            else {
                panic!("tree cosmetics expected");
            };
            assert!(def.height.contains(height));
            assert!(def.radius.contains(canopy_radius));
        }
    }

    #[test]
    fn rock_displacement_stays_in_noise_range() {
        let factory = factory();
        let noise = factory.catalog().def(EntityKind::Rock).noise;
        let mut rng = StdRng::seed_from_u64(5);
        let rock = factory.create(EntityId(0), EntityKind::Rock, Vec3::ZERO, 0.0, &mut rng);
        let Cosmetics::Rock { displacement, .. } = rock.cosmetics else {
            panic!("rock cosmetics expected");
        };
        assert!(displacement.iter().all(|d| noise.contains(*d)));
    }

    #[test]
    fn door_roles_follow_kind() {
        let factory = factory();
        let mut rng = StdRng::seed_from_u64(1);
        let house = factory.create(EntityId(4), EntityKind::House, Vec3::ZERO, 0.0, &mut rng);
        let door = factory.create(EntityId(5), EntityKind::Door, Vec3::ZERO, 0.0, &mut rng);
        let chair = factory.create(EntityId(6), EntityKind::Chair, Vec3::ZERO, 0.0, &mut rng);

        assert_eq!(house.door, Some(DoorRole::EntersHouse(EntityId(4))));
        assert_eq!(door.door, Some(DoorRole::ExitsToOutside));
        assert_eq!(chair.door, None);
        assert!(house.removable);
        assert!(!door.removable);
    }

    #[test]
    fn animals_anchor_wander_at_spawn_point() {
        let factory = factory();
        let mut rng = StdRng::seed_from_u64(9);
        let spawn = Vec3::new(4.0, 0.0, -6.0);
        let cow = factory.create(EntityId(1), EntityKind::Cow, spawn, 0.0, &mut rng);
        let animal = cow.animal.expect("cow wanders");
        assert_eq!(animal.initial_position, spawn);
        assert_eq!(animal.target_position, spawn);
        assert!(!animal.moving);
        assert!(animal.params.move_speed > 0.0);
    }

    #[test]
    fn house_attaches_body_and_door_parts() {
        let factory = factory();
        let mut graph = SceneGraph::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut house = factory.create(EntityId(7), EntityKind::House, Vec3::ZERO, 0.0, &mut rng);
        factory.attach(&mut house, &mut graph, NodeLayer::Outdoor);

        let parts: Vec<NodePart> = house
            .nodes
            .iter()
            .map(|node| graph.owner_of(*node).expect("owned").part)
            .collect();
        assert_eq!(parts, vec![NodePart::Body, NodePart::Door]);
        assert!(house
            .nodes
            .iter()
            .all(|node| graph.owner_of(*node).expect("owned").entity == EntityId(7)));
    }

    #[test]
    fn detach_is_idempotent() {
        let factory = factory();
        let mut graph = SceneGraph::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut tree = factory.create(EntityId(1), EntityKind::Tree, Vec3::ZERO, 0.0, &mut rng);
        factory.attach(&mut tree, &mut graph, NodeLayer::Outdoor);

        assert_eq!(EntityFactory::detach(&mut tree, &mut graph), 1);
        assert_eq!(EntityFactory::detach(&mut tree, &mut graph), 0);
        assert_eq!(graph.node_count(), 0);
        assert_eq!(graph.disposed_count(), 1);
    }

    #[test]
    fn sync_moves_nodes_with_entity() {
        let factory = factory();
        let mut graph = SceneGraph::default();
        let mut rng = StdRng::seed_from_u64(2);
        let mut pig = factory.create(EntityId(1), EntityKind::Pig, Vec3::ZERO, 0.0, &mut rng);
        factory.attach(&mut pig, &mut graph, NodeLayer::Outdoor);

        pig.position = Vec3::new(3.0, 0.0, 1.0);
        EntityFactory::sync(&pig, &mut graph);
        let node = graph.node(pig.nodes[0]).expect("node");
        assert_eq!(node.anchor, pig.position);
    }

    #[test]
    fn placeholder_is_an_unowned_ghost() {
        let factory = factory();
        let ghost = factory.placeholder(EntityKind::Table, Vec3::new(1.0, 0.0, 1.0), 0.5);
        assert_eq!(ghost.layer, NodeLayer::Ghost);
        assert_eq!(ghost.owner, None);
        assert!(ghost.half_extents.min_element() > 0.0);
    }
}

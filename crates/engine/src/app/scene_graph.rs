//! Retained scene graph: the engine-side home of everything drawable.
//!
//! Every node may carry a non-owning back-reference to the entity it draws, so a ray hit
//! resolves to its entity with a single lookup. Hit boxes are axis aligned.

use std::collections::BTreeMap;

use glam::{Quat, Vec3};

use super::entity::{EntityId, Orientation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeLayer {
    Outdoor,
    Interior,
    /// Build previews. Never hit by rays.
    Ghost,
}

impl NodeLayer {
    const fn index(self) -> usize {
        match self {
            NodeLayer::Outdoor => 0,
            NodeLayer::Interior => 1,
            NodeLayer::Ghost => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodePart {
    Body,
    Door,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeOwner {
    pub entity: EntityId,
    pub part: NodePart,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    pub fn from_hex(hex: u32) -> Self {
        Self {
            r: ((hex >> 16) & 0xff) as f32 / 255.0,
            g: ((hex >> 8) & 0xff) as f32 / 255.0,
            b: (hex & 0xff) as f32 / 255.0,
        }
    }

    pub fn scaled(self, factor: f32) -> Self {
        Self {
            r: self.r * factor,
            g: self.g * factor,
            b: self.b * factor,
        }
    }

    pub fn to_rgba8(self) -> [u8; 4] {
        let channel = |value: f32| (value.clamp(0.0, 1.0) * 255.0).round() as u8;
        [channel(self.r), channel(self.g), channel(self.b), 255]
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeDesc {
    pub owner: Option<NodeOwner>,
    pub layer: NodeLayer,
    /// Floor point the node stands on.
    pub anchor: Vec3,
    /// Offset from the anchor in the node's local frame, rotated by `orientation.yaw`.
    pub offset: Vec3,
    pub orientation: Orientation,
    pub half_extents: Vec3,
    pub color: Rgb,
}

impl NodeDesc {
    pub fn center(&self) -> Vec3 {
        let (sin_yaw, cos_yaw) = self.orientation.yaw.sin_cos();
        let rotated = Vec3::new(
            self.offset.x * cos_yaw + self.offset.z * sin_yaw,
            self.offset.y,
            -self.offset.x * sin_yaw + self.offset.z * cos_yaw,
        );
        self.anchor + rotated + Vec3::new(0.0, self.half_extents.y, 0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub node: NodeId,
    pub distance: f32,
    pub owner: Option<NodeOwner>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightingState {
    pub sun_position: Vec3,
    pub sun_intensity: f32,
    pub sun_visible: bool,
    pub moon_position: Vec3,
    pub moon_intensity: f32,
    pub moon_visible: bool,
    pub ambient_intensity: f32,
    pub sky_color: Rgb,
    pub fog_color: Rgb,
}

impl Default for LightingState {
    fn default() -> Self {
        Self {
            sun_position: Vec3::new(0.0, 100.0, 0.0),
            sun_intensity: 1.0,
            sun_visible: true,
            moon_position: Vec3::new(0.0, -100.0, 0.0),
            moon_intensity: 0.0,
            moon_visible: false,
            ambient_intensity: 0.6,
            sky_color: Rgb::from_hex(0x87ceeb),
            fog_color: Rgb::from_hex(0x87ceeb),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Node {
    desc: NodeDesc,
    marked: bool,
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    next_node: u64,
    nodes: BTreeMap<NodeId, Node>,
    hidden_layers: [bool; 3],
    lighting: LightingState,
    disposed_nodes: u64,
}

impl SceneGraph {
    pub fn insert(&mut self, desc: NodeDesc) -> NodeId {
        let id = NodeId(self.next_node);
        self.next_node = self.next_node.saturating_add(1);
        self.nodes.insert(
            id,
            Node {
                desc,
                marked: false,
            },
        );
        id
    }

    /// Detaches and disposes a node. Returns false if it was already gone.
    pub fn remove(&mut self, id: NodeId) -> bool {
        if self.nodes.remove(&id).is_some() {
            self.disposed_nodes = self.disposed_nodes.saturating_add(1);
            true
        } else {
            false
        }
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeDesc> {
        self.nodes.get(&id).map(|node| &node.desc)
    }

    pub fn owner_of(&self, id: NodeId) -> Option<NodeOwner> {
        self.nodes.get(&id).and_then(|node| node.desc.owner)
    }

    pub fn set_anchor(&mut self, id: NodeId, anchor: Vec3, orientation: Orientation) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.desc.anchor = anchor;
        node.desc.orientation = orientation;
        true
    }

    pub fn set_marked(&mut self, id: NodeId, marked: bool) -> bool {
        let Some(node) = self.nodes.get_mut(&id) else {
            return false;
        };
        node.marked = marked;
        true
    }

    pub fn is_marked(&self, id: NodeId) -> bool {
        self.nodes.get(&id).is_some_and(|node| node.marked)
    }

    pub fn set_layer_visible(&mut self, layer: NodeLayer, visible: bool) {
        self.hidden_layers[layer.index()] = !visible;
    }

    pub fn is_layer_visible(&self, layer: NodeLayer) -> bool {
        !self.hidden_layers[layer.index()]
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn layer_node_count(&self, layer: NodeLayer) -> usize {
        self.nodes
            .values()
            .filter(|node| node.desc.layer == layer)
            .count()
    }

    pub fn disposed_count(&self) -> u64 {
        self.disposed_nodes
    }

    /// Nodes on visible layers in insertion order, with their marked flag.
    pub fn visible_nodes(&self) -> impl Iterator<Item = (NodeId, &NodeDesc, bool)> + '_ {
        self.nodes
            .iter()
            .filter(|(_, node)| self.is_layer_visible(node.desc.layer))
            .map(|(id, node)| (*id, &node.desc, node.marked))
    }

    pub fn lighting(&self) -> &LightingState {
        &self.lighting
    }

    pub fn set_lighting(&mut self, lighting: LightingState) {
        self.lighting = lighting;
    }

    /// Hits on visible, non-ghost layers within `max_distance`, nearest first.
    pub fn intersect_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Vec<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO || !max_distance.is_finite() || max_distance <= 0.0 {
            return Vec::new();
        }

        let mut hits = self
            .nodes
            .iter()
            .filter(|(_, node)| {
                node.desc.layer != NodeLayer::Ghost && self.is_layer_visible(node.desc.layer)
            })
            .filter_map(|(id, node)| {
                // Slab test in the node's yaw frame; the rotation is rigid so `t` carries over.
                let to_local = Quat::from_rotation_y(-node.desc.orientation.yaw);
                let local_origin = to_local * (origin - node.desc.center());
                let local_direction = to_local * direction;
                let distance = ray_aabb_distance(
                    local_origin,
                    local_direction,
                    -node.desc.half_extents,
                    node.desc.half_extents,
                )?;
                (distance <= max_distance).then_some(RayHit {
                    node: *id,
                    distance,
                    owner: node.desc.owner,
                })
            })
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.node.cmp(&b.node)));
        hits
    }
}

fn ray_aabb_distance(origin: Vec3, direction: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;

    for axis in 0..3 {
        let o = origin[axis];
        let d = direction[axis];
        if d.abs() < 1e-8 {
            if o < min[axis] || o > max[axis] {
                return None;
            }
            continue;
        }
        let t1 = (min[axis] - o) / d;
        let t2 = (max[axis] - o) / d;
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
        if t_near > t_far {
            return None;
        }
    }

    if t_far < 0.0 {
        return None;
    }
    Some(t_near.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(owner: Option<NodeOwner>, layer: NodeLayer, anchor: Vec3) -> NodeDesc {
        NodeDesc {
            owner,
            layer,
            anchor,
            offset: Vec3::ZERO,
            orientation: Orientation::default(),
            half_extents: Vec3::splat(0.5),
            color: Rgb::new(1.0, 1.0, 1.0),
        }
    }

    fn owner(id: u64) -> Option<NodeOwner> {
        Some(NodeOwner {
            entity: EntityId(id),
            part: NodePart::Body,
        })
    }

    #[test]
    fn ray_hits_are_sorted_nearest_first() {
        let mut graph = SceneGraph::default();
        let far = graph.insert(block(owner(1), NodeLayer::Outdoor, Vec3::new(0.0, 0.0, -8.0)));
        let near = graph.insert(block(owner(2), NodeLayer::Outdoor, Vec3::new(0.0, 0.0, -3.0)));

        let hits = graph.intersect_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Z, 20.0);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].node, near);
        assert!((hits[0].distance - 2.5).abs() < 0.0001);
        assert_eq!(hits[1].node, far);
        assert_eq!(hits[0].owner, owner(2));
    }

    #[test]
    fn ray_respects_max_distance_and_misses() {
        let mut graph = SceneGraph::default();
        graph.insert(block(owner(1), NodeLayer::Outdoor, Vec3::new(0.0, 0.0, -8.0)));

        assert!(graph
            .intersect_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Z, 5.0)
            .is_empty());
        assert!(graph
            .intersect_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::Z, 50.0)
            .is_empty());
        assert!(graph
            .intersect_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::ZERO, 50.0)
            .is_empty());
    }

    #[test]
    fn ghost_and_hidden_layers_are_never_hit() {
        let mut graph = SceneGraph::default();
        graph.insert(block(None, NodeLayer::Ghost, Vec3::new(0.0, 0.0, -2.0)));
        let interior = graph.insert(block(owner(5), NodeLayer::Interior, Vec3::new(0.0, 0.0, -4.0)));
        graph.set_layer_visible(NodeLayer::Interior, false);

        assert!(graph
            .intersect_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Z, 10.0)
            .is_empty());

        graph.set_layer_visible(NodeLayer::Interior, true);
        let hits = graph.intersect_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Z, 10.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, interior);
    }

    #[test]
    fn origin_inside_box_hits_at_zero() {
        let mut graph = SceneGraph::default();
        graph.insert(block(owner(1), NodeLayer::Outdoor, Vec3::ZERO));
        let hits = graph.intersect_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::X, 10.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].distance, 0.0);
    }

    #[test]
    fn remove_disposes_once() {
        let mut graph = SceneGraph::default();
        let id = graph.insert(block(owner(1), NodeLayer::Outdoor, Vec3::ZERO));
        assert!(graph.remove(id));
        assert!(!graph.remove(id));
        assert_eq!(graph.disposed_count(), 1);
        assert!(!graph.set_marked(id, true));
        assert!(!graph.is_marked(id));
    }

    #[test]
    fn offset_rotates_with_yaw() {
        let desc = NodeDesc {
            offset: Vec3::new(0.0, 0.0, 2.0),
            orientation: Orientation::from_yaw(std::f32::consts::FRAC_PI_2),
            ..block(None, NodeLayer::Outdoor, Vec3::ZERO)
        };
        let center = desc.center();
        assert!((center.x - 2.0).abs() < 0.0001, "{center:?}");
        assert!(center.z.abs() < 0.0001, "{center:?}");
    }

    #[test]
    fn ray_tests_the_box_in_its_yaw_frame() {
        let mut graph = SceneGraph::default();
        let panel = graph.insert(NodeDesc {
            orientation: Orientation::from_yaw(std::f32::consts::FRAC_PI_4),
            half_extents: Vec3::new(2.0, 0.5, 0.1),
            ..block(owner(1), NodeLayer::Outdoor, Vec3::new(0.0, 0.0, -5.0))
        });

        let hits = graph.intersect_ray(Vec3::new(0.0, 0.5, 0.0), Vec3::NEG_Z, 10.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].node, panel);
        // Thickness 0.2 crossed on the diagonal.
        let expected = 5.0 - 0.1 * std::f32::consts::SQRT_2;
        assert!((hits[0].distance - expected).abs() < 0.001, "{}", hits[0].distance);

        // Inside the unrotated footprint, outside the rotated one.
        assert!(graph
            .intersect_ray(Vec3::new(1.8, 0.5, 0.0), Vec3::NEG_Z, 10.0)
            .is_empty());
    }

    #[test]
    fn rgb_hex_conversion() {
        assert_eq!(Rgb::from_hex(0xff8000).to_rgba8(), [255, 128, 0, 255]);
    }
}

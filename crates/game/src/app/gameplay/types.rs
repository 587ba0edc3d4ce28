/// Which container the player is in.
///
/// The outdoor pose and the interior only exist while inside, so a house id while outside
/// cannot be represented.
#[derive(Debug)]
enum WorldState {
    Outside,
    Inside(InsideState),
}

#[derive(Debug)]
struct InsideState {
    house: EntityId,
    key: HouseKey,
    outside_snapshot: ViewerPose,
    interior: Interior,
}

impl WorldState {
    fn is_inside(&self) -> bool {
        matches!(self, WorldState::Inside(_))
    }

    fn current_house_id(&self) -> Option<EntityId> {
        match self {
            WorldState::Outside => None,
            WorldState::Inside(inside) => Some(inside.house),
        }
    }

    fn mode_label(&self) -> &'static str {
        match self {
            WorldState::Outside => "outside",
            WorldState::Inside(_) => "inside",
        }
    }
}

/// One house's room: non-entity shell nodes plus the entities living in it.
#[derive(Debug)]
struct Interior {
    entities: EntityContainer,
    shell_nodes: Vec<NodeId>,
}

const OUTDOOR_PALETTE: [Option<EntityKind>; PALETTE_SIZE] = [
    None,
    Some(EntityKind::Tree),
    Some(EntityKind::Rock),
    Some(EntityKind::House),
    Some(EntityKind::Cow),
    Some(EntityKind::Pig),
    Some(EntityKind::Horse),
    Some(EntityKind::Dog),
];

const INDOOR_PALETTE: [Option<EntityKind>; PALETTE_SIZE] = [
    None,
    Some(EntityKind::Chair),
    Some(EntityKind::Table),
    Some(EntityKind::Couch),
    Some(EntityKind::Tv),
    Some(EntityKind::Bed),
    Some(EntityKind::Cat),
    Some(EntityKind::Dog),
];

fn palette(inside: bool) -> &'static [Option<EntityKind>; PALETTE_SIZE] {
    if inside {
        &INDOOR_PALETTE
    } else {
        &OUTDOOR_PALETTE
    }
}

fn palette_labels(inside: bool) -> Vec<&'static str> {
    palette(inside)
        .iter()
        .map(|slot| slot.map_or("none", EntityKind::as_token))
        .collect()
}

/// What the UI shows: selection, mode and the last save/load outcome.
#[derive(Debug, Default)]
struct HudState {
    selected_index: u8,
    status: Option<String>,
}

impl HudState {
    fn select(&mut self, index: u8) -> bool {
        if usize::from(index) >= PALETTE_SIZE {
            return false;
        }
        self.selected_index = index;
        true
    }

    fn reset_selection(&mut self) {
        self.selected_index = 0;
    }

    fn selected_kind(&self, inside: bool) -> Option<EntityKind> {
        palette(inside)
            .get(usize::from(self.selected_index))
            .copied()
            .flatten()
    }

    fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }
}

/// The entity the interaction ray currently selects.
#[derive(Debug, Clone, Copy, PartialEq)]
struct InteractionTarget {
    entity: EntityId,
    distance: f32,
    door: Option<DoorRole>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct DayPhase {
    is_day: bool,
    progress: f32,
}

/// Bounds and timing that differ between the outdoor world and a room.
#[derive(Debug, Clone, Copy, PartialEq)]
struct WanderMode {
    floor_y: f32,
    /// Square half size animals are kept inside.
    limit: f32,
    /// Outdoors: positions past this trigger the soft-boundary redirect.
    soft_limit: Option<f32>,
    /// Indoors targets are drawn around the room centre instead of the animal's anchor.
    center: Option<Vec3>,
    radius_cap: Option<f32>,
    wait_min: f32,
    wait_max: f32,
    arrive_threshold: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct GaitProfile {
    stride_rate: f32,
    tail_rate: f32,
    bob_height: f32,
}

/// Identity of a house that outlives the session: the world seed plus the house anchor
/// snapped to a centimetre grid. Entity ids follow allocation order and are not reused
/// for this.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct HouseKey(String);

impl HouseKey {
    fn new(seed: u64, anchor: Vec3) -> Self {
        let grid = |value: f32| (value * HOUSE_KEY_GRID_PER_UNIT).round() as i64;
        Self(format!("{seed:x}_{}_{}", grid(anchor.x), grid(anchor.z)))
    }

    fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for HouseKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Saved furniture of one house interior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct HouseLayout {
    version: u32,
    house: String,
    entries: Vec<LayoutEntry>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutEntry {
    kind: EntityKind,
    position: [f32; 3],
    yaw: f32,
}

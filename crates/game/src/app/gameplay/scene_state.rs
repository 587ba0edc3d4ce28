const OUTDOOR_ANIMALS: [EntityKind; 4] = [
    EntityKind::Cow,
    EntityKind::Pig,
    EntityKind::Horse,
    EntityKind::Dog,
];

/// Base furniture of a fresh interior: kind, x and z as fractions of the room half size, yaw.
const BASE_FURNITURE: [(EntityKind, f32, f32, f32); 6] = [
    (EntityKind::Bed, -0.6, -0.6, 0.0),
    (EntityKind::Table, 0.0, -0.15, 0.0),
    (EntityKind::Chair, -0.3, -0.15, FRAC_PI_2),
    (EntityKind::Chair, 0.3, -0.15, -FRAC_PI_2),
    (EntityKind::Couch, 0.6, 0.35, FRAC_PI_2),
    (EntityKind::Tv, -0.6, 0.35, -FRAC_PI_2),
];

pub(crate) struct HomesteadScene {
    config: GameplayConfig,
    rng: StdRng,
    clock_seconds: f32,
    outdoor: EntityContainer,
    state: WorldState,
    hud: HudState,
    highlight: Option<InteractionTarget>,
    ghost: Option<NodeId>,
    layout_store: Box<dyn LayoutStore>,
}

impl HomesteadScene {
    pub(crate) fn new(config: GameplayConfig, layout_store: Box<dyn LayoutStore>) -> Self {
        Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            clock_seconds: 0.0,
            outdoor: EntityContainer::new(ContainerKind::Outdoor),
            state: WorldState::Outside,
            hud: HudState::default(),
            highlight: None,
            ghost: None,
            layout_store,
        }
    }

    fn is_inside(&self) -> bool {
        self.state.is_inside()
    }

    fn active_container(&self) -> &EntityContainer {
        match &self.state {
            WorldState::Outside => &self.outdoor,
            WorldState::Inside(inside) => &inside.interior.entities,
        }
    }

    fn active_layer(&self) -> NodeLayer {
        if self.is_inside() {
            NodeLayer::Interior
        } else {
            NodeLayer::Outdoor
        }
    }

    fn active_floor_y(&self) -> f32 {
        if self.is_inside() {
            INTERIOR_FLOOR_Y
        } else {
            OUTDOOR_FLOOR_Y
        }
    }

    fn active_limit(&self) -> f32 {
        if self.is_inside() {
            self.config.room_limit()
        } else {
            self.config.outdoor_limit()
        }
    }

    fn total_entities(&self) -> usize {
        let interior = match &self.state {
            WorldState::Outside => 0,
            WorldState::Inside(inside) => inside.interior.entities.len(),
        };
        self.outdoor.len() + interior
    }

    fn current_day_phase(&self) -> DayPhase {
        day_phase(
            self.clock_seconds,
            self.config.day_duration_seconds,
            self.config.night_duration_seconds,
        )
    }

    fn apply_day_night(&self, world: &mut SceneWorld) {
        world
            .graph_mut()
            .set_lighting(lighting_for_phase(self.current_day_phase()));
    }

    fn outdoor_spawn_pose(&self) -> ViewerPose {
        ViewerPose {
            position: Vec3::new(0.0, OUTDOOR_FLOOR_Y + self.config.eye_height, 0.0),
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    /// Just inside the entry wall, looking into the room.
    fn interior_entry_pose(&self) -> ViewerPose {
        ViewerPose {
            position: Vec3::new(
                0.0,
                INTERIOR_FLOOR_Y + self.config.eye_height,
                self.config.room_half_size - ROOM_ENTRY_INSET,
            ),
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    fn populate_outdoor(&mut self, world: &mut SceneWorld) {
        let statics = [
            (EntityKind::Tree, self.config.tree_count),
            (EntityKind::Rock, self.config.rock_count),
            (EntityKind::House, self.config.house_count),
        ];
        for (kind, count) in statics {
            for _ in 0..count {
                let position = self.random_outdoor_point();
                let yaw = draw(&mut self.rng, -PI, PI);
                self.spawn_outdoor(world, kind, position, yaw);
            }
        }
        for _ in 0..self.config.animal_count {
            let kind = OUTDOOR_ANIMALS[self.rng.gen_range(0..OUTDOOR_ANIMALS.len())];
            let position = self.random_outdoor_point();
            let yaw = draw(&mut self.rng, -PI, PI);
            self.spawn_outdoor(world, kind, position, yaw);
        }
    }

    /// Uniform inside the soft boundary, pushed out of the clear area around the spawn.
    fn random_outdoor_point(&mut self) -> Vec3 {
        let limit =
            self.config.world_half_size - self.config.hard_margin - self.config.soft_margin;
        let x = draw(&mut self.rng, -limit, limit);
        let z = draw(&mut self.rng, -limit, limit);
        let mut point = Vec3::new(x, OUTDOOR_FLOOR_Y, z);
        let flat = Vec3::new(x, 0.0, z);
        if flat.length() < self.config.spawn_clear_radius {
            let direction = flat.try_normalize().unwrap_or(Vec3::X);
            point = direction * self.config.spawn_clear_radius;
            point.y = OUTDOOR_FLOOR_Y;
        }
        clamp_to_square(point, limit)
    }

    fn spawn_outdoor(
        &mut self,
        world: &mut SceneWorld,
        kind: EntityKind,
        position: Vec3,
        yaw: f32,
    ) -> EntityId {
        spawn_entity(
            world,
            &mut self.outdoor,
            NodeLayer::Outdoor,
            &mut self.rng,
            kind,
            position,
            yaw,
            self.clock_seconds,
        )
    }

    fn spawn_active(
        &mut self,
        world: &mut SceneWorld,
        kind: EntityKind,
        position: Vec3,
        yaw: f32,
    ) -> EntityId {
        let layer = self.active_layer();
        let clock_seconds = self.clock_seconds;
        let container = active_container_mut(&mut self.state, &mut self.outdoor);
        spawn_entity(
            world,
            container,
            layer,
            &mut self.rng,
            kind,
            position,
            yaw,
            clock_seconds,
        )
    }

    fn refresh_highlight(&mut self, world: &mut SceneWorld) {
        let camera = *world.camera();
        let distance = self.config.interaction_distance;
        let hits = world
            .graph()
            .intersect_ray(camera.position, camera.forward(), distance);
        let next = resolve_interaction_target(&hits, self.active_container(), distance);
        self.set_highlight(world, next);
    }

    /// Re-marks nodes only when the selected entity changes.
    fn set_highlight(&mut self, world: &mut SceneWorld, next: Option<InteractionTarget>) {
        let previous = self.highlight.map(|target| target.entity);
        let next_entity = next.map(|target| target.entity);
        if previous != next_entity {
            let container = self.active_container();
            if let Some(id) = previous {
                mark_entity(container, world.graph_mut(), id, false);
            }
            if let Some(id) = next_entity {
                mark_entity(container, world.graph_mut(), id, true);
            }
        }
        self.highlight = next;
    }

    fn clear_highlight(&mut self, world: &mut SceneWorld) {
        self.set_highlight(world, None);
    }

    /// Placement for `kind`, kept far enough out that the viewer stays clear of its footprint.
    fn placement_point(&self, world: &SceneWorld, kind: EntityKind) -> Vec3 {
        let clearance =
            world.factory().catalog().def(kind).interaction_radius + PLACEMENT_CLEARANCE_MARGIN;
        compute_placement_point(
            world.camera(),
            self.active_floor_y(),
            self.is_inside(),
            self.active_limit(),
            clearance,
            &self.config,
        )
    }

    fn update_ghost(&mut self, world: &mut SceneWorld) {
        self.clear_ghost(world);
        let inside = self.is_inside();
        let Some(kind) = self.hud.selected_kind(inside) else {
            return;
        };
        if !world.factory().catalog().def(kind).buildable.allows(inside) {
            return;
        }
        let point = self.placement_point(world, kind);
        let desc = world.factory().placeholder(kind, point, world.camera().yaw);
        self.ghost = Some(world.graph_mut().insert(desc));
    }

    fn clear_ghost(&mut self, world: &mut SceneWorld) {
        if let Some(node) = self.ghost.take() {
            world.graph_mut().remove(node);
        }
    }

    fn build(&mut self, world: &mut SceneWorld, kind: Option<EntityKind>) -> Option<EntityId> {
        let Some(kind) = kind else {
            debug!(reason = "neutral_selection", "build_ignored");
            return None;
        };
        let buildable = world.factory().catalog().def(kind).buildable;
        if !buildable.allows(self.is_inside()) {
            debug!(
                kind = kind.as_token(),
                mode = self.state.mode_label(),
                reason = "not_buildable_here",
                "build_ignored"
            );
            return None;
        }

        let point = self.placement_point(world, kind);
        // Yaw of the viewer turns a house's door towards them.
        let yaw = world.camera().yaw;
        let id = self.spawn_active(world, kind, point, yaw);
        info!(
            entity = id.0,
            kind = kind.as_token(),
            mode = self.state.mode_label(),
            x = point.x,
            z = point.z,
            "entity_built"
        );
        Some(id)
    }

    fn remove(&mut self, world: &mut SceneWorld, target: Option<EntityId>) -> bool {
        let Some(id) = target else {
            debug!(reason = "no_target", "remove_ignored");
            return false;
        };
        let container = active_container_mut(&mut self.state, &mut self.outdoor);
        match container.find(id) {
            None => {
                debug!(entity = id.0, reason = "not_in_active_container", "remove_ignored");
                return false;
            }
            Some(entity) if !entity.removable => {
                debug!(entity = id.0, reason = "not_removable", "remove_ignored");
                return false;
            }
            Some(_) => {}
        }
        let Some(mut entity) = container.remove(id) else {
            return false;
        };
        let released = EntityFactory::detach(&mut entity, world.graph_mut());
        if entity.kind == EntityKind::House {
            let key = self.house_key(&entity);
            if let Err(error) = self.layout_store.discard(&key) {
                warn!(house = id.0, key = %key, error = %error, "layout_discard_failed");
            }
        }
        if self.highlight.is_some_and(|target| target.entity == id) {
            self.highlight = None;
        }
        info!(
            entity = id.0,
            kind = entity.kind.as_token(),
            released_nodes = released,
            "entity_removed"
        );
        true
    }

    fn interact(&mut self, world: &mut SceneWorld) {
        let Some(target) = self.highlight else {
            debug!(reason = "no_target", "interact_ignored");
            return;
        };
        match target.door {
            Some(DoorRole::EntersHouse(house)) => {
                self.enter_house(world, house);
            }
            Some(DoorRole::ExitsToOutside) => {
                self.exit_to_outside(world);
            }
            None => {
                self.remove(world, Some(target.entity));
            }
        }
    }

    fn enter_house(&mut self, world: &mut SceneWorld, house: EntityId) -> bool {
        if let Some(current) = self.state.current_house_id() {
            debug!(
                house = house.0,
                current = current.0,
                reason = "already_inside",
                "enter_ignored"
            );
            return false;
        }
        let key = match self.outdoor.find(house) {
            Some(entity) if entity.kind == EntityKind::House => self.house_key(entity),
            _ => {
                debug!(house = house.0, reason = "not_a_house", "enter_ignored");
                return false;
            }
        };

        let outside_snapshot = world.camera().pose();
        self.clear_highlight(world);
        self.clear_ghost(world);
        world.graph_mut().set_layer_visible(NodeLayer::Outdoor, false);
        world.graph_mut().set_layer_visible(NodeLayer::Interior, true);

        let layout = self.load_layout(house, &key);
        let interior = self.build_interior(world, house, layout.as_ref());
        world.camera_mut().set_pose(self.interior_entry_pose());
        world.graph_mut().set_lighting(indoor_lighting());

        let entity_count = interior.entities.len();
        self.state = WorldState::Inside(InsideState {
            house,
            key,
            outside_snapshot,
            interior,
        });
        self.hud.reset_selection();
        info!(
            house = house.0,
            entities = entity_count,
            palette = ?palette_labels(true),
            "house_entered"
        );
        true
    }

    fn exit_to_outside(&mut self, world: &mut SceneWorld) -> bool {
        if !self.is_inside() {
            debug!(reason = "already_outside", "exit_ignored");
            return false;
        }
        self.clear_highlight(world);
        self.clear_ghost(world);

        let WorldState::Inside(InsideState {
            house,
            key,
            outside_snapshot,
            mut interior,
        }) = std::mem::replace(&mut self.state, WorldState::Outside)
        else {
            return false;
        };

        self.save_layout(house, &key, &interior.entities);
        let released = teardown_interior(&mut interior, world.graph_mut());
        world.graph_mut().set_layer_visible(NodeLayer::Outdoor, true);
        world.camera_mut().set_pose(outside_snapshot);
        self.hud.reset_selection();
        self.apply_day_night(world);
        info!(
            house = house.0,
            released_nodes = released,
            palette = ?palette_labels(false),
            "house_exited"
        );
        true
    }

    fn build_interior(
        &mut self,
        world: &mut SceneWorld,
        house: EntityId,
        layout: Option<&HouseLayout>,
    ) -> Interior {
        let half = self.config.room_half_size;
        let limit = self.config.room_limit();
        let shell_nodes = insert_room_shell(world.graph_mut(), half);
        let mut entities = EntityContainer::new(ContainerKind::Interior(house));

        let door_position = Vec3::new(0.0, INTERIOR_FLOOR_Y, half - EXIT_DOOR_INSET);
        spawn_entity(
            world,
            &mut entities,
            NodeLayer::Interior,
            &mut self.rng,
            EntityKind::Door,
            door_position,
            0.0,
            self.clock_seconds,
        );

        let placements: Vec<(EntityKind, Vec3, f32)> = match layout {
            Some(layout) => layout
                .entries
                .iter()
                .map(|entry| {
                    let [x, _, z] = entry.position;
                    (entry.kind, Vec3::new(x, INTERIOR_FLOOR_Y, z), entry.yaw)
                })
                .collect(),
            None => BASE_FURNITURE
                .iter()
                .map(|&(kind, x, z, yaw)| {
                    (kind, Vec3::new(x * half, INTERIOR_FLOOR_Y, z * half), yaw)
                })
                .collect(),
        };

        for (kind, position, yaw) in placements {
            if !world.factory().catalog().def(kind).buildable.allows(true) {
                warn!(
                    house = house.0,
                    kind = kind.as_token(),
                    "layout_entry_skipped"
                );
                continue;
            }
            spawn_entity(
                world,
                &mut entities,
                NodeLayer::Interior,
                &mut self.rng,
                kind,
                clamp_to_square(position, limit),
                yaw,
                self.clock_seconds,
            );
        }

        Interior {
            entities,
            shell_nodes,
        }
    }

    fn house_key(&self, house: &Entity) -> HouseKey {
        HouseKey::new(self.config.seed, house.position)
    }

    fn load_layout(&mut self, house: EntityId, key: &HouseKey) -> Option<HouseLayout> {
        match self.layout_store.load(key) {
            Ok(Some(layout)) => {
                info!(
                    house = house.0,
                    key = %key,
                    entries = layout.entries.len(),
                    "layout_loaded"
                );
                self.hud
                    .set_status(format!("Loaded saved layout for house {}", house.0));
                Some(layout)
            }
            Ok(None) => None,
            Err(error) => {
                warn!(house = house.0, key = %key, error = %error, "layout_load_failed");
                self.hud.set_status(format!("Layout load failed: {error}"));
                None
            }
        }
    }

    fn save_layout(&mut self, house: EntityId, key: &HouseKey, entities: &EntityContainer) {
        let layout = HouseLayout::from_container(key, entities);
        match self.layout_store.save(key, &layout) {
            Ok(()) => {
                info!(
                    house = house.0,
                    key = %key,
                    entries = layout.entries.len(),
                    "layout_saved"
                );
                self.hud
                    .set_status(format!("Saved layout for house {}", house.0));
            }
            Err(error) => {
                warn!(house = house.0, key = %key, error = %error, "layout_save_failed");
                self.hud.set_status(format!("Layout save failed: {error}"));
            }
        }
    }

    fn advance(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot, world: &mut SceneWorld) {
        if input.pointer_locked() {
            for event in input.events() {
                if let InputEvent::Look { dx, dy } = *event {
                    world
                        .camera_mut()
                        .apply_look_delta(dx, dy, self.config.look_sensitivity);
                }
            }
        }
        let limit = self.active_limit();
        apply_locomotion(
            world.camera_mut(),
            input,
            fixed_dt_seconds,
            self.config.walk_speed,
            limit,
        );

        let inside = self.is_inside();
        let mode = if inside {
            self.config.indoor_wander_mode()
        } else {
            self.config.outdoor_wander_mode()
        };
        let container = active_container_mut(&mut self.state, &mut self.outdoor);
        update_animals(
            container,
            &mode,
            self.clock_seconds,
            fixed_dt_seconds,
            &mut self.rng,
            world.graph_mut(),
        );

        if !inside {
            self.apply_day_night(world);
        }
    }

    fn handle_events(&mut self, input: &InputSnapshot, world: &mut SceneWorld) {
        for event in input.events() {
            match *event {
                InputEvent::SelectKind(index) => {
                    if !self.hud.select(index) {
                        debug!(index, "select_ignored");
                    }
                }
                InputEvent::Interact => self.interact(world),
                InputEvent::Build => {
                    let kind = self.hud.selected_kind(self.is_inside());
                    self.build(world, kind);
                }
                InputEvent::Look { .. } | InputEvent::PointerLock(_) => {}
            }
        }
    }

    fn hud_title(&self) -> String {
        let inside = self.is_inside();
        let selection = self
            .hud
            .selected_kind(inside)
            .map_or("none", EntityKind::as_token);
        let mode = match self.state.current_house_id() {
            Some(house) => format!("{} house {}", self.state.mode_label(), house.0),
            None => self.state.mode_label().to_string(),
        };
        let time = if inside {
            "lights on".to_string()
        } else {
            let phase = self.current_day_phase();
            let label = if phase.is_day { "day" } else { "night" };
            format!("{label} {:.0}%", phase.progress * 100.0)
        };
        let mut title = format!(
            "Homestead | {mode} | [{}] {selection} | {time} | entities {}",
            self.hud.selected_index,
            self.total_entities()
        );
        if let Some(status) = &self.hud.status {
            title.push_str(" | ");
            title.push_str(status);
        }
        title
    }
}

fn active_container_mut<'a>(
    state: &'a mut WorldState,
    outdoor: &'a mut EntityContainer,
) -> &'a mut EntityContainer {
    match state {
        WorldState::Outside => outdoor,
        WorldState::Inside(inside) => &mut inside.interior.entities,
    }
}

#[allow(clippy::too_many_arguments)]
fn spawn_entity(
    world: &mut SceneWorld,
    container: &mut EntityContainer,
    layer: NodeLayer,
    rng: &mut StdRng,
    kind: EntityKind,
    position: Vec3,
    yaw: f32,
    clock_seconds: f32,
) -> EntityId {
    let id = world.allocate_id();
    let (factory, graph) = world.factory_and_graph_mut();
    let mut entity = factory.create(id, kind, position, yaw, rng);
    if let Some(animal) = entity.animal.as_mut() {
        animal.next_move_at = clock_seconds;
    }
    factory.attach(&mut entity, graph, layer);
    container.insert(entity);
    id
}

fn mark_entity(container: &EntityContainer, graph: &mut SceneGraph, id: EntityId, marked: bool) {
    if let Some(entity) = container.find(id) {
        for node in &entity.nodes {
            graph.set_marked(*node, marked);
        }
    }
}

/// Floor and four walls around the origin; plain nodes with no entity behind them.
fn insert_room_shell(graph: &mut SceneGraph, half: f32) -> Vec<NodeId> {
    let wall_half_height = ROOM_WALL_HEIGHT * 0.5;
    let span = half + ROOM_WALL_THICKNESS;
    let floor = Rgb::from_hex(ROOM_FLOOR_COLOR);
    let wall = Rgb::from_hex(ROOM_WALL_COLOR);
    let pieces = [
        (
            Vec3::new(0.0, INTERIOR_FLOOR_Y - ROOM_WALL_THICKNESS, 0.0),
            Vec3::new(half, ROOM_WALL_THICKNESS * 0.5, half),
            floor,
        ),
        (
            Vec3::new(0.0, INTERIOR_FLOOR_Y, -span),
            Vec3::new(span, wall_half_height, ROOM_WALL_THICKNESS),
            wall,
        ),
        (
            Vec3::new(0.0, INTERIOR_FLOOR_Y, span),
            Vec3::new(span, wall_half_height, ROOM_WALL_THICKNESS),
            wall,
        ),
        (
            Vec3::new(-span, INTERIOR_FLOOR_Y, 0.0),
            Vec3::new(ROOM_WALL_THICKNESS, wall_half_height, span),
            wall,
        ),
        (
            Vec3::new(span, INTERIOR_FLOOR_Y, 0.0),
            Vec3::new(ROOM_WALL_THICKNESS, wall_half_height, span),
            wall,
        ),
    ];
    pieces
        .into_iter()
        .map(|(anchor, half_extents, color)| {
            graph.insert(NodeDesc {
                owner: None,
                layer: NodeLayer::Interior,
                anchor,
                offset: Vec3::ZERO,
                orientation: Orientation::default(),
                half_extents,
                color,
            })
        })
        .collect()
}

fn teardown_interior(interior: &mut Interior, graph: &mut SceneGraph) -> usize {
    let mut released = 0;
    for mut entity in interior.entities.drain() {
        released += EntityFactory::detach(&mut entity, graph);
    }
    released
        + interior
            .shell_nodes
            .drain(..)
            .filter(|node| graph.remove(*node))
            .count()
}

impl Scene for HomesteadScene {
    fn load(&mut self, world: &mut SceneWorld) {
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.clock_seconds = 0.0;
        self.outdoor = EntityContainer::new(ContainerKind::Outdoor);
        self.state = WorldState::Outside;
        self.hud = HudState::default();
        self.highlight = None;
        self.ghost = None;

        let graph = world.graph_mut();
        graph.set_layer_visible(NodeLayer::Outdoor, true);
        graph.set_layer_visible(NodeLayer::Interior, true);
        graph.set_layer_visible(NodeLayer::Ghost, true);
        let spawn = self.outdoor_spawn_pose();
        world.camera_mut().set_pose(spawn);

        self.populate_outdoor(world);
        self.apply_day_night(world);
        info!(
            seed = self.config.seed,
            entity_count = self.outdoor.len(),
            houses = self.outdoor.count_of(EntityKind::House),
            palette = ?palette_labels(false),
            "scene_loaded"
        );
    }

    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand {
        if input.quit_requested() {
            return SceneCommand::Quit;
        }

        self.clock_seconds += fixed_dt_seconds;
        self.advance(fixed_dt_seconds, input, world);
        self.refresh_highlight(world);
        self.handle_events(input, world);
        self.refresh_highlight(world);
        self.update_ghost(world);
        SceneCommand::None
    }

    fn unload(&mut self, world: &mut SceneWorld) {
        // Leaving through the state machine keeps the interior layout.
        self.exit_to_outside(world);
        self.clear_highlight(world);
        self.clear_ghost(world);
        let mut released = 0;
        for mut entity in self.outdoor.drain() {
            released += EntityFactory::detach(&mut entity, world.graph_mut());
        }
        info!(released_nodes = released, "scene_unloaded");
    }

    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        Some(self.hud_title())
    }

    fn entity_count(&self) -> usize {
        self.total_entities()
    }

    fn map_half_extent(&self) -> f32 {
        if self.is_inside() {
            self.config.room_half_size
        } else {
            self.config.world_half_size
        }
    }
}

use super::camera::FirstPersonCamera;
use super::entity::{EntityId, EntityIdAllocator};
use super::factory::EntityFactory;
use super::input::{ActionStates, InputAction, InputEvent};
use super::scene_graph::SceneGraph;
use crate::content::KindCatalog;

pub const DEFAULT_MAP_HALF_EXTENT: f32 = 32.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand {
    None,
    Quit,
}

/// Everything the scene sees of one simulation tick's input.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    quit_requested: bool,
    actions: ActionStates,
    events: Vec<InputEvent>,
    pointer_locked: bool,
    window_width: u32,
    window_height: u32,
}

impl InputSnapshot {
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn new(
        quit_requested: bool,
        actions: ActionStates,
        events: Vec<InputEvent>,
        pointer_locked: bool,
        window_size: (u32, u32),
    ) -> Self {
        Self {
            quit_requested,
            actions,
            events,
            pointer_locked,
            window_width: window_size.0,
            window_height: window_size.1,
        }
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    pub fn is_down(&self, action: InputAction) -> bool {
        self.actions.is_down(action)
    }

    /// Discrete events in arrival order.
    pub fn events(&self) -> &[InputEvent] {
        &self.events
    }

    pub fn pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn with_quit_requested(mut self, quit_requested: bool) -> Self {
        self.quit_requested = quit_requested;
        self
    }

    pub fn with_action_down(mut self, action: InputAction, is_down: bool) -> Self {
        self.actions.set(action, is_down);
        self
    }

    pub fn with_event(mut self, event: InputEvent) -> Self {
        self.events.push(event);
        self
    }

    pub fn with_pointer_locked(mut self, pointer_locked: bool) -> Self {
        self.pointer_locked = pointer_locked;
        self
    }

    pub fn with_window_size(mut self, window_size: (u32, u32)) -> Self {
        self.window_width = window_size.0;
        self.window_height = window_size.1;
        self
    }
}

/// Engine-owned state shared by the scene and the renderer.
#[derive(Debug, Default)]
pub struct SceneWorld {
    allocator: EntityIdAllocator,
    graph: SceneGraph,
    camera: FirstPersonCamera,
    factory: EntityFactory,
}

impl SceneWorld {
    pub fn new(catalog: KindCatalog) -> Self {
        Self {
            factory: EntityFactory::new(catalog),
            ..Self::default()
        }
    }

    pub fn allocate_id(&mut self) -> EntityId {
        self.allocator.allocate()
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn camera(&self) -> &FirstPersonCamera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut FirstPersonCamera {
        &mut self.camera
    }

    pub fn factory(&self) -> &EntityFactory {
        &self.factory
    }

    /// Split borrow for code that builds entities straight into the graph.
    pub fn factory_and_graph_mut(&mut self) -> (&EntityFactory, &mut SceneGraph) {
        (&self.factory, &mut self.graph)
    }

    /// Drops all nodes and resets the camera. Ids keep counting and the catalog stays.
    pub fn clear(&mut self) {
        self.graph = SceneGraph::default();
        self.camera = FirstPersonCamera::default();
    }
}

pub trait Scene {
    fn load(&mut self, world: &mut SceneWorld);
    fn update(
        &mut self,
        fixed_dt_seconds: f32,
        input: &InputSnapshot,
        world: &mut SceneWorld,
    ) -> SceneCommand;
    fn unload(&mut self, world: &mut SceneWorld);
    fn debug_title(&self, _world: &SceneWorld) -> Option<String> {
        None
    }
    fn entity_count(&self) -> usize {
        0
    }
    /// Half size of the square area the map view should cover, centred on the origin.
    fn map_half_extent(&self) -> f32 {
        DEFAULT_MAP_HALF_EXTENT
    }
}

pub(crate) struct SceneRuntime {
    scene: Box<dyn Scene>,
    world: SceneWorld,
    is_loaded: bool,
}

impl SceneRuntime {
    pub(crate) fn new(scene: Box<dyn Scene>, world: SceneWorld) -> Self {
        Self {
            scene,
            world,
            is_loaded: false,
        }
    }

    pub(crate) fn load(&mut self) {
        if self.is_loaded {
            return;
        }
        self.scene.load(&mut self.world);
        self.is_loaded = true;
    }

    pub(crate) fn update(&mut self, fixed_dt_seconds: f32, input: &InputSnapshot) -> SceneCommand {
        self.scene.update(fixed_dt_seconds, input, &mut self.world)
    }

    pub(crate) fn world(&self) -> &SceneWorld {
        &self.world
    }

    pub(crate) fn debug_title(&self) -> Option<String> {
        self.scene.debug_title(&self.world)
    }

    pub(crate) fn entity_count(&self) -> usize {
        self.scene.entity_count()
    }

    pub(crate) fn map_half_extent(&self) -> f32 {
        self.scene.map_half_extent()
    }

    pub(crate) fn shutdown(&mut self) {
        if self.is_loaded {
            self.scene.unload(&mut self.world);
            self.world.clear();
            self.is_loaded = false;
        }
    }
}

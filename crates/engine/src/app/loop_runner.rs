use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{debug, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{DeviceEvent, ElementState, Event, KeyEvent, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{CursorGrabMode, Window, WindowBuilder};

use crate::content::ContentCompileError;
use crate::StartupError;

use super::input::ActionStates;
use super::metrics::LoopStats;
use super::scene::SceneRuntime;
use super::{InputAction, InputEvent, InputSnapshot, Renderer, Scene, SceneCommand, SceneWorld};

/// Number of palette slots reachable from the digit keys (0..=7).
const SELECT_KEY_COUNT: usize = 8;

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub target_tps: u32,
    pub max_frame_delta: Duration,
    pub max_ticks_per_frame: u32,
    pub metrics_log_interval: Duration,
    pub max_render_fps: Option<u32>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "Homestead".to_string(),
            window_width: 1280,
            window_height: 720,
            target_tps: 60,
            max_frame_delta: Duration::from_millis(250),
            max_ticks_per_frame: 5,
            metrics_log_interval: Duration::from_secs(1),
            max_render_fps: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load kind catalog: {0}")]
    Content(#[from] ContentCompileError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig, scene: Box<dyn Scene>, world: SceneWorld) -> Result<(), AppError> {
    let mut runtime = SceneRuntime::new(scene, world);

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(config.window_title.clone())
            .with_inner_size(LogicalSize::new(
                config.window_width as f64,
                config.window_height as f64,
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window)).map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let mut step = FixedStep::from_config(&config);
    let fixed_dt_seconds = step.fixed_dt.as_secs_f32();
    let metrics_log_interval = non_zero_or(config.metrics_log_interval, Duration::from_secs(1));
    let render_cap = config.max_render_fps.filter(|fps| *fps > 0);
    let render_frame_target = render_cap.map(|fps| Duration::from_secs_f64(1.0 / fps as f64));
    let size = window.inner_size();
    let mut input_collector = InputCollector::new(size.width, size.height);

    runtime.load();
    info!(
        entity_count = runtime.entity_count(),
        node_count = runtime.world().graph().node_count(),
        "scene_loaded"
    );
    info!(
        fixed_dt_ms = step.fixed_dt.as_secs_f64() * 1000.0,
        max_frame_delta_ms = step.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = step.max_ticks,
        render_fps_cap = ?render_cap,
        "loop_config"
    );

    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut stats = LoopStats::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    input_collector.set_window_size(new_size.width, new_size.height);
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    input_collector.set_window_size(size.width, size.height);
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => {
                    input_collector.release_pointer_lock();
                }
                WindowEvent::MouseInput { state, button, .. } => {
                    input_collector.handle_mouse_input(button, state);
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if let Some(locked) = input_collector.take_pointer_lock_change() {
                        apply_pointer_lock(&window, locked);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let (ticks, dropped) = step.advance(raw_frame_dt);
                    for _ in 0..ticks {
                        let input_snapshot = input_collector.snapshot_for_tick();
                        let command = runtime.update(fixed_dt_seconds, &input_snapshot);
                        stats.tick_ran();
                        if command == SceneCommand::Quit {
                            info!(reason = "scene_command", "shutdown_requested");
                            window_target.exit();
                            break;
                        }
                    }
                    if dropped > Duration::ZERO {
                        stats.backlog_dropped(dropped);
                        warn!(
                            dropped_backlog_ms = dropped.as_millis() as u64,
                            max_ticks_per_frame = step.max_ticks,
                            "sim_clamp_triggered"
                        );
                    }

                    let since_present = Instant::now().saturating_duration_since(last_present_instant);
                    if let Some(pause) = cap_sleep(since_present, render_frame_target) {
                        thread::sleep(pause);
                    }

                    if let Err(error) =
                        renderer.render_world(runtime.world(), runtime.map_half_extent())
                    {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();
                    let next_title = runtime.debug_title();
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }
                    stats.frame_presented(
                        raw_frame_dt,
                        runtime.entity_count(),
                        runtime.world().graph().node_count(),
                    );

                    if let Some(report) = stats.take_report(now) {
                        info!(
                            fps = report.fps,
                            tps = report.tps,
                            frame_time_ms = report.frame_time_ms,
                            dropped_backlog_ms = report.dropped_backlog_ms,
                            entity_count = report.entity_count,
                            peak_node_count = report.peak_node_count,
                            "loop_metrics"
                        );
                    }
                }
                _ => {}
            },
            Event::DeviceEvent {
                event: DeviceEvent::MouseMotion { delta },
                ..
            } => {
                input_collector.handle_mouse_motion(delta.0 as f32, delta.1 as f32);
            }
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                runtime.shutdown();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn apply_pointer_lock(window: &Window, locked: bool) {
    if locked {
        let grabbed = window
            .set_cursor_grab(CursorGrabMode::Locked)
            .or_else(|_| window.set_cursor_grab(CursorGrabMode::Confined));
        if let Err(error) = grabbed {
            warn!(error = %error, "pointer_lock_failed");
        }
        window.set_cursor_visible(false);
    } else {
        if let Err(error) = window.set_cursor_grab(CursorGrabMode::None) {
            warn!(error = %error, "pointer_release_failed");
        }
        window.set_cursor_visible(true);
    }
    debug!(locked, "pointer_lock_changed");
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    action_states: ActionStates,
    pending_events: Vec<InputEvent>,
    pointer_locked: bool,
    pointer_lock_change: Option<bool>,
    select_keys_down: [bool; SELECT_KEY_COUNT],
    left_mouse_is_down: bool,
    right_mouse_is_down: bool,
    window_width: u32,
    window_height: u32,
}

impl InputCollector {
    fn new(window_width: u32, window_height: u32) -> Self {
        Self {
            window_width,
            window_height,
            ..Self::default()
        }
    }

    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &KeyEvent) {
        self.handle_physical_key(key_event.physical_key, key_event.state);
    }

    fn handle_physical_key(&mut self, key: PhysicalKey, state: ElementState) {
        let is_pressed = state == ElementState::Pressed;
        let PhysicalKey::Code(code) = key else {
            return;
        };
        if let Some(action) = movement_action(code) {
            self.action_states.set(action, is_pressed);
            return;
        }
        if let Some(slot) = select_slot(code) {
            let was_down = self.select_keys_down[slot as usize];
            self.select_keys_down[slot as usize] = is_pressed;
            if is_pressed && !was_down {
                self.pending_events.push(InputEvent::SelectKind(slot));
            }
            return;
        }
        if code == KeyCode::Escape {
            self.action_states.set(InputAction::Quit, is_pressed);
            if !is_pressed {
                return;
            }
            // Escape first gives the pointer back; only an unlocked Escape quits.
            if self.pointer_locked {
                self.release_pointer_lock();
            } else {
                self.mark_quit_requested();
            }
        }
    }

    fn handle_mouse_input(&mut self, button: MouseButton, state: ElementState) {
        match button {
            MouseButton::Left => match state {
                ElementState::Pressed => {
                    if !self.left_mouse_is_down {
                        if self.pointer_locked {
                            self.pending_events.push(InputEvent::Interact);
                        } else {
                            self.set_pointer_locked(true);
                        }
                    }
                    self.left_mouse_is_down = true;
                }
                ElementState::Released => self.left_mouse_is_down = false,
            },
            MouseButton::Right => match state {
                ElementState::Pressed => {
                    if !self.right_mouse_is_down {
                        self.pending_events.push(InputEvent::Build);
                    }
                    self.right_mouse_is_down = true;
                }
                ElementState::Released => self.right_mouse_is_down = false,
            },
            _ => {}
        }
    }

    /// Raw device motion; dropped unless the pointer is locked. Consecutive deltas merge.
    fn handle_mouse_motion(&mut self, dx: f32, dy: f32) {
        if !self.pointer_locked || !dx.is_finite() || !dy.is_finite() {
            return;
        }
        if let Some(InputEvent::Look {
            dx: pending_dx,
            dy: pending_dy,
        }) = self.pending_events.last_mut()
        {
            *pending_dx += dx;
            *pending_dy += dy;
            return;
        }
        self.pending_events.push(InputEvent::Look { dx, dy });
    }

    fn release_pointer_lock(&mut self) {
        if self.pointer_locked {
            self.set_pointer_locked(false);
        }
    }

    fn set_pointer_locked(&mut self, locked: bool) {
        self.pointer_locked = locked;
        self.pointer_lock_change = Some(locked);
        self.pending_events.push(InputEvent::PointerLock(locked));
    }

    fn take_pointer_lock_change(&mut self) -> Option<bool> {
        self.pointer_lock_change.take()
    }

    fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_width = width;
        self.window_height = height;
    }

    fn snapshot_for_tick(&mut self) -> InputSnapshot {
        InputSnapshot::new(
            self.quit_requested,
            self.action_states,
            std::mem::take(&mut self.pending_events),
            self.pointer_locked,
            (self.window_width, self.window_height),
        )
    }
}

fn movement_action(code: KeyCode) -> Option<InputAction> {
    match code {
        KeyCode::KeyW | KeyCode::ArrowUp => Some(InputAction::MoveForward),
        KeyCode::KeyS | KeyCode::ArrowDown => Some(InputAction::MoveBack),
        KeyCode::KeyA | KeyCode::ArrowLeft => Some(InputAction::StrafeLeft),
        KeyCode::KeyD | KeyCode::ArrowRight => Some(InputAction::StrafeRight),
        _ => None,
    }
}

fn select_slot(code: KeyCode) -> Option<u8> {
    match code {
        KeyCode::Digit0 | KeyCode::Numpad0 => Some(0),
        KeyCode::Digit1 | KeyCode::Numpad1 => Some(1),
        KeyCode::Digit2 | KeyCode::Numpad2 => Some(2),
        KeyCode::Digit3 | KeyCode::Numpad3 => Some(3),
        KeyCode::Digit4 | KeyCode::Numpad4 => Some(4),
        KeyCode::Digit5 | KeyCode::Numpad5 => Some(5),
        KeyCode::Digit6 | KeyCode::Numpad6 => Some(6),
        KeyCode::Digit7 | KeyCode::Numpad7 => Some(7),
        _ => None,
    }
}

/// Fixed-timestep accumulator: frame time in, whole ticks out.
#[derive(Debug, Clone, Copy)]
struct FixedStep {
    fixed_dt: Duration,
    max_frame_delta: Duration,
    max_ticks: u32,
    carry: Duration,
}

impl FixedStep {
    fn from_config(config: &LoopConfig) -> Self {
        Self::new(
            Duration::from_secs_f64(1.0 / f64::from(config.target_tps.max(1))),
            non_zero_or(config.max_frame_delta, Duration::from_millis(250)),
            config.max_ticks_per_frame.max(1),
        )
    }

    fn new(fixed_dt: Duration, max_frame_delta: Duration, max_ticks: u32) -> Self {
        Self {
            fixed_dt,
            max_frame_delta,
            max_ticks,
            carry: Duration::ZERO,
        }
    }

    /// Returns the ticks to run for this frame and the backlog dropped by the tick cap.
    /// A partial tick carries over; a long stall is clamped to `max_frame_delta` first.
    fn advance(&mut self, frame_dt: Duration) -> (u32, Duration) {
        self.carry = self.carry.saturating_add(frame_dt.min(self.max_frame_delta));
        let mut ticks = 0;
        while self.carry >= self.fixed_dt && ticks < self.max_ticks {
            self.carry -= self.fixed_dt;
            ticks += 1;
        }
        if self.carry >= self.fixed_dt {
            (ticks, std::mem::take(&mut self.carry))
        } else {
            (ticks, Duration::ZERO)
        }
    }
}

fn non_zero_or(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn cap_sleep(since_present: Duration, frame_target: Option<Duration>) -> Option<Duration> {
    frame_target
        .filter(|target| since_present < *target)
        .map(|target| target - since_present)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut InputCollector, code: KeyCode) {
        input.handle_physical_key(PhysicalKey::Code(code), ElementState::Pressed);
    }

    fn release(input: &mut InputCollector, code: KeyCode) {
        input.handle_physical_key(PhysicalKey::Code(code), ElementState::Released);
    }

    fn locked_input() -> InputCollector {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        input.handle_mouse_input(MouseButton::Left, ElementState::Released);
        let _ = input.snapshot_for_tick();
        let _ = input.take_pointer_lock_change();
        input
    }

    fn step_16ms(max_ticks: u32) -> FixedStep {
        FixedStep::new(Duration::from_millis(16), Duration::from_millis(250), max_ticks)
    }

    #[test]
    fn long_stall_is_clamped_before_stepping() {
        let mut step = step_16ms(100);
        let (ticks, dropped) = step.advance(Duration::from_millis(600));
        assert_eq!(ticks, 15);
        assert_eq!(dropped, Duration::ZERO);
        assert_eq!(step.carry, Duration::from_millis(10));
    }

    #[test]
    fn whole_ticks_run_without_drop() {
        let mut step = step_16ms(5);
        assert_eq!(step.advance(Duration::from_millis(48)), (3, Duration::ZERO));
        assert_eq!(step.carry, Duration::ZERO);
    }

    #[test]
    fn tick_cap_drops_the_backlog() {
        let mut step = step_16ms(3);
        assert_eq!(
            step.advance(Duration::from_millis(120)),
            (3, Duration::from_millis(72))
        );
        assert_eq!(step.carry, Duration::ZERO);
    }

    #[test]
    fn partial_tick_carries_into_next_frame() {
        let mut step = step_16ms(5);
        assert_eq!(step.advance(Duration::from_millis(20)).0, 1);
        assert_eq!(step.advance(Duration::from_millis(12)).0, 1);
        assert_eq!(step.carry, Duration::ZERO);
    }

    #[test]
    fn config_zeroes_fall_back_to_sane_values() {
        let config = LoopConfig {
            target_tps: 0,
            max_frame_delta: Duration::ZERO,
            max_ticks_per_frame: 0,
            ..LoopConfig::default()
        };
        let step = FixedStep::from_config(&config);
        assert_eq!(step.fixed_dt, Duration::from_secs(1));
        assert_eq!(step.max_frame_delta, Duration::from_millis(250));
        assert_eq!(step.max_ticks, 1);
    }

    #[test]
    fn wasd_and_arrow_keys_map_to_actions() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyW);
        press(&mut input, KeyCode::ArrowLeft);

        let snapshot = input.snapshot_for_tick();
        assert!(snapshot.is_down(InputAction::MoveForward));
        assert!(snapshot.is_down(InputAction::StrafeLeft));
        assert!(!snapshot.is_down(InputAction::MoveBack));
    }

    #[test]
    fn key_release_clears_action_state() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyD);
        release(&mut input, KeyCode::KeyD);

        assert!(!input.snapshot_for_tick().is_down(InputAction::StrafeRight));
    }

    #[test]
    fn digit_keys_queue_single_select_events() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Digit3);
        press(&mut input, KeyCode::Digit3);
        release(&mut input, KeyCode::Digit3);
        press(&mut input, KeyCode::Numpad0);
        press(&mut input, KeyCode::Digit9);

        let first = input.snapshot_for_tick();
        let second = input.snapshot_for_tick();
        assert_eq!(
            first.events(),
            &[InputEvent::SelectKind(3), InputEvent::SelectKind(0)]
        );
        assert!(second.events().is_empty());
    }

    #[test]
    fn first_left_click_locks_pointer_instead_of_interacting() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);

        let snapshot = input.snapshot_for_tick();
        assert_eq!(snapshot.events(), &[InputEvent::PointerLock(true)]);
        assert!(snapshot.pointer_locked());
        assert_eq!(input.take_pointer_lock_change(), Some(true));
        assert_eq!(input.take_pointer_lock_change(), None);
    }

    #[test]
    fn left_click_interacts_once_while_locked() {
        let mut input = locked_input();
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);
        input.handle_mouse_input(MouseButton::Left, ElementState::Pressed);

        assert_eq!(input.snapshot_for_tick().events(), &[InputEvent::Interact]);
        assert!(input.snapshot_for_tick().events().is_empty());
    }

    #[test]
    fn right_click_is_edge_triggered_build() {
        let mut input = InputCollector::new(1280, 720);
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        assert_eq!(input.snapshot_for_tick().events(), &[InputEvent::Build]);

        input.handle_mouse_input(MouseButton::Right, ElementState::Released);
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        assert_eq!(input.snapshot_for_tick().events(), &[InputEvent::Build]);
    }

    #[test]
    fn mouse_motion_is_ignored_until_locked_and_merges() {
        let mut unlocked = InputCollector::new(1280, 720);
        unlocked.handle_mouse_motion(5.0, 5.0);
        assert!(unlocked.snapshot_for_tick().events().is_empty());

        let mut input = locked_input();
        input.handle_mouse_motion(3.0, -1.0);
        input.handle_mouse_motion(2.0, 4.0);
        input.handle_mouse_input(MouseButton::Right, ElementState::Pressed);
        input.handle_mouse_motion(1.0, 1.0);

        assert_eq!(
            input.snapshot_for_tick().events(),
            &[
                InputEvent::Look { dx: 5.0, dy: 3.0 },
                InputEvent::Build,
                InputEvent::Look { dx: 1.0, dy: 1.0 }
            ]
        );
    }

    #[test]
    fn escape_unlocks_first_then_quits() {
        let mut input = locked_input();
        press(&mut input, KeyCode::Escape);
        assert!(!input.quit_requested);
        assert_eq!(input.take_pointer_lock_change(), Some(false));
        let snapshot = input.snapshot_for_tick();
        assert_eq!(snapshot.events(), &[InputEvent::PointerLock(false)]);
        assert!(!snapshot.pointer_locked());

        release(&mut input, KeyCode::Escape);
        press(&mut input, KeyCode::Escape);
        assert!(input.quit_requested);
        assert!(input.snapshot_for_tick().quit_requested());
    }

    #[test]
    fn focus_loss_releases_lock_once() {
        let mut input = locked_input();
        input.release_pointer_lock();
        input.release_pointer_lock();
        assert_eq!(
            input.snapshot_for_tick().events(),
            &[InputEvent::PointerLock(false)]
        );
    }

    #[test]
    fn snapshot_carries_window_size() {
        let mut input = InputCollector::new(1280, 720);
        input.set_window_size(800, 600);
        assert_eq!(input.snapshot_for_tick().window_size(), (800, 600));
    }

    #[test]
    fn render_cap_sleeps_only_under_budget() {
        let target = Some(Duration::from_millis(16));
        assert_eq!(cap_sleep(Duration::from_millis(20), target), None);
        assert_eq!(
            cap_sleep(Duration::from_millis(5), target),
            Some(Duration::from_millis(11))
        );
        assert_eq!(cap_sleep(Duration::from_millis(5), None), None);
    }
}

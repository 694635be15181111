use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use crate::level::{load_level_file, LevelError};
use crate::sim::{Intents, Stepper, StepperConfig, World};
use crate::{resolve_app_paths, StartupError};

use super::input::ActionStates;
use super::metrics::MetricsAccumulator;
use super::{InputAction, LoopMetricsSnapshot, MetricsHandle, Renderer};

pub const SLOW_FRAME_ENV_VAR: &str = "TILEHOP_SLOW_FRAME_MS";

#[derive(Debug, Clone)]
pub struct LoopConfig {
    pub window_title: String,
    pub window_width: u32,
    pub window_height: u32,
    pub stepper: StepperConfig,
    pub metrics_log_interval: Duration,
    pub simulated_slow_frame_ms: u64,
    pub max_render_fps: Option<u32>,
    /// Explicit level file. When unset the level is looked up under the project root.
    pub level_path: Option<PathBuf>,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            window_title: "tilehop".to_string(),
            window_width: 1024,
            window_height: 768,
            stepper: StepperConfig::default(),
            metrics_log_interval: Duration::from_secs(1),
            simulated_slow_frame_ms: 0,
            max_render_fps: None,
            level_path: None,
        }
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("failed to load level: {0}")]
    Level(#[from] LevelError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub fn run_app(config: LoopConfig) -> Result<(), AppError> {
    let metrics_handle = MetricsHandle::default();
    run_app_with_metrics(config, metrics_handle)
}

pub fn run_app_with_metrics(
    config: LoopConfig,
    metrics_handle: MetricsHandle,
) -> Result<(), AppError> {
    let level_path = match &config.level_path {
        Some(path) => path.clone(),
        None => {
            let app_paths = resolve_app_paths()?;
            info!(
                root = %app_paths.root.display(),
                assets_dir = %app_paths.assets_dir.display(),
                "startup"
            );
            app_paths.level_path
        }
    };
    let mut world = load_level_file(&level_path)?;

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

    let mut stepper = Stepper::new(config.stepper);
    let stepper_config = stepper.config();
    let step_seconds = stepper.step_seconds();
    let metrics_log_interval =
        normalize_non_zero_duration(config.metrics_log_interval, Duration::from_secs(1));
    let slow_frame_delay = resolve_slow_frame_delay(config.simulated_slow_frame_ms);
    let effective_render_cap = normalize_render_fps_cap(config.max_render_fps);
    let render_frame_target = target_frame_duration(effective_render_cap);
    let mut input_collector = InputCollector::default();

    info!(
        step_ms = stepper_config.step.as_secs_f64() * 1000.0,
        slow = stepper_config.slow,
        max_frame_delta_ms = stepper_config.max_frame_delta.as_millis() as u64,
        max_ticks_per_frame = stepper_config.max_ticks_per_frame,
        metrics_log_interval_ms = metrics_log_interval.as_millis() as u64,
        slow_frame_delay_ms = slow_frame_delay.as_millis() as u64,
        render_fps_cap = %format_render_cap(effective_render_cap),
        "loop_config"
    );

    let mut last_frame_instant = Instant::now();
    let mut last_present_instant = Instant::now();
    let mut metrics_accumulator = MetricsAccumulator::new(metrics_log_interval);
    let mut last_applied_title: Option<String> = None;
    let mut overlay_visible = false;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    input_collector.mark_quit_requested();
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::KeyboardInput { event, .. } => {
                    input_collector.handle_keyboard_input(&event);
                    if input_collector.quit_requested {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                    }
                }
                WindowEvent::RedrawRequested => {
                    if input_collector.take_overlay_toggle_pressed() {
                        overlay_visible = !overlay_visible;
                        info!(overlay_visible, "overlay_toggled");
                    }

                    if slow_frame_delay > Duration::ZERO {
                        // Debug perturbation only; render pacing is handled by the FPS cap below.
                        thread::sleep(slow_frame_delay);
                    }

                    let now = Instant::now();
                    let raw_frame_dt = now.saturating_duration_since(last_frame_instant);
                    last_frame_instant = now;

                    let step_plan = stepper.advance_to(now);
                    for _ in 0..step_plan.ticks_to_run {
                        world.set_player_intents(input_collector.player_intents());
                        world.tick(step_seconds);
                    }
                    metrics_accumulator.record_ticks(step_plan.ticks_to_run);

                    if step_plan.dropped_backlog > Duration::ZERO {
                        metrics_accumulator.record_clamp(step_plan.dropped_backlog);
                        warn!(
                            dropped_backlog_ms = step_plan.dropped_backlog.as_millis() as u64,
                            max_ticks_per_frame = stepper_config.max_ticks_per_frame,
                            "sim_clamp_triggered"
                        );
                    }

                    let elapsed_since_last_present =
                        Instant::now().saturating_duration_since(last_present_instant);
                    let cap_sleep =
                        compute_cap_sleep(elapsed_since_last_present, render_frame_target);
                    if cap_sleep > Duration::ZERO {
                        thread::sleep(cap_sleep);
                    }

                    if let Err(error) = renderer.render(&world.render_frame()) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                    }
                    last_present_instant = Instant::now();
                    metrics_accumulator.record_frame(raw_frame_dt);

                    if let Some(snapshot) =
                        metrics_accumulator.maybe_snapshot(now, world.tick_count(), world.stats())
                    {
                        metrics_handle.publish(snapshot);
                        info!(
                            fps = snapshot.fps,
                            tps = snapshot.tps,
                            frame_time_ms = snapshot.frame_time_ms,
                            clamped_frames = snapshot.clamped_frames,
                            sim_tick = snapshot.sim_tick,
                            "loop_metrics"
                        );
                    }

                    let next_title = overlay_visible.then(|| {
                        overlay_title(
                            &config.window_title,
                            &metrics_handle.snapshot(),
                            &world,
                        )
                    });
                    if next_title != last_applied_title {
                        match &next_title {
                            Some(title) => window.set_title(title),
                            None => window.set_title(&config.window_title),
                        }
                        last_applied_title = next_title;
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                let stats = world.stats();
                info!(
                    ticks = world.tick_count(),
                    treasures_collected = stats.treasures_collected,
                    monsters_killed = stats.monsters_killed,
                    player_deaths = stats.player_deaths,
                    "shutdown"
                );
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

#[derive(Debug, Default)]
struct InputCollector {
    quit_requested: bool,
    overlay_toggle_is_down: bool,
    overlay_toggle_pressed_edge: bool,
    action_states: ActionStates,
}

impl InputCollector {
    fn mark_quit_requested(&mut self) {
        self.quit_requested = true;
    }

    fn handle_keyboard_input(&mut self, key_event: &winit::event::KeyEvent) {
        let is_pressed = key_event.state == ElementState::Pressed;
        self.update_action_state_from_physical_key(key_event.physical_key, is_pressed);
        self.handle_overlay_toggle_key_state(
            is_overlay_toggle_key(key_event.physical_key),
            key_event.state,
        );
    }

    fn player_intents(&self) -> Intents {
        self.action_states.player_intents()
    }

    fn take_overlay_toggle_pressed(&mut self) -> bool {
        let was_pressed = self.overlay_toggle_pressed_edge;
        self.overlay_toggle_pressed_edge = false;
        was_pressed
    }

    fn handle_overlay_toggle_key_state(&mut self, is_toggle_key: bool, state: ElementState) {
        if !is_toggle_key {
            return;
        }

        match state {
            ElementState::Pressed => {
                if !self.overlay_toggle_is_down {
                    self.overlay_toggle_pressed_edge = true;
                }
                self.overlay_toggle_is_down = true;
            }
            ElementState::Released => self.overlay_toggle_is_down = false,
        }
    }

    fn update_action_state_from_physical_key(&mut self, key: PhysicalKey, is_pressed: bool) {
        let Some(action) = action_for_key(key) else {
            return;
        };
        self.action_states.set(action, is_pressed);
        if action == InputAction::Quit && is_pressed {
            self.mark_quit_requested();
        }
    }
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    match key {
        PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
            Some(InputAction::MoveLeft)
        }
        PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
            Some(InputAction::MoveRight)
        }
        PhysicalKey::Code(KeyCode::Space)
        | PhysicalKey::Code(KeyCode::KeyW)
        | PhysicalKey::Code(KeyCode::ArrowUp) => Some(InputAction::Jump),
        PhysicalKey::Code(KeyCode::F3) => Some(InputAction::ToggleOverlay),
        PhysicalKey::Code(KeyCode::Escape) => Some(InputAction::Quit),
        _ => None,
    }
}

fn is_overlay_toggle_key(key: PhysicalKey) -> bool {
    action_for_key(key) == Some(InputAction::ToggleOverlay)
}

fn overlay_title(base: &str, metrics: &LoopMetricsSnapshot, world: &World) -> String {
    let stats = world.stats();
    format!(
        "{base} | fps {:.0} tps {:.0} | tick {} | treasure {}/{} | kills {} | deaths {}",
        metrics.fps,
        metrics.tps,
        world.tick_count(),
        stats.treasures_collected,
        world.treasures().len(),
        stats.monsters_killed,
        stats.player_deaths,
    )
}

fn normalize_non_zero_duration(value: Duration, fallback: Duration) -> Duration {
    if value.is_zero() {
        fallback
    } else {
        value
    }
}

fn normalize_render_fps_cap(cap: Option<u32>) -> Option<u32> {
    cap.filter(|value| *value > 0)
}

fn target_frame_duration(max_render_fps: Option<u32>) -> Option<Duration> {
    max_render_fps.map(|fps| Duration::from_secs_f64(1.0 / fps as f64))
}

fn compute_cap_sleep(elapsed: Duration, target: Option<Duration>) -> Duration {
    match target {
        Some(frame_target) if elapsed < frame_target => frame_target - elapsed,
        _ => Duration::ZERO,
    }
}

fn format_render_cap(cap: Option<u32>) -> String {
    match cap {
        Some(value) => value.to_string(),
        None => "off".to_string(),
    }
}

fn resolve_slow_frame_delay(config_slow_frame_ms: u64) -> Duration {
    match env::var(SLOW_FRAME_ENV_VAR) {
        Ok(value) => parse_slow_frame_ms(&value, config_slow_frame_ms),
        Err(env::VarError::NotPresent) => Duration::from_millis(config_slow_frame_ms),
        Err(err) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                error = %err,
                "unable to read slow-frame env var; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

fn parse_slow_frame_ms(value: &str, config_slow_frame_ms: u64) -> Duration {
    match value.trim().parse::<u64>() {
        Ok(ms) => Duration::from_millis(ms),
        Err(_) => {
            warn!(
                env_var = SLOW_FRAME_ENV_VAR,
                value, "invalid slow-frame env var value; falling back to config"
            );
            Duration::from_millis(config_slow_frame_ms)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{Actor, TileMap};

    fn press(input: &mut InputCollector, code: KeyCode) {
        input.update_action_state_from_physical_key(PhysicalKey::Code(code), true);
    }

    fn release(input: &mut InputCollector, code: KeyCode) {
        input.update_action_state_from_physical_key(PhysicalKey::Code(code), false);
    }

    #[test]
    fn arrow_keys_and_letters_map_to_intents() {
        let mut input = InputCollector::default();

        press(&mut input, KeyCode::ArrowLeft);
        press(&mut input, KeyCode::Space);
        assert_eq!(input.player_intents(), Intents::new(true, false, true));

        release(&mut input, KeyCode::ArrowLeft);
        release(&mut input, KeyCode::Space);
        press(&mut input, KeyCode::KeyD);
        press(&mut input, KeyCode::KeyW);
        assert_eq!(input.player_intents(), Intents::new(false, true, true));
    }

    #[test]
    fn key_release_clears_intent() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::ArrowRight);
        release(&mut input, KeyCode::ArrowRight);

        assert_eq!(input.player_intents(), Intents::default());
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::KeyQ);

        assert_eq!(input.player_intents(), Intents::default());
        assert!(!input.quit_requested);
    }

    #[test]
    fn escape_requests_quit() {
        let mut input = InputCollector::default();
        press(&mut input, KeyCode::Escape);
        assert!(input.quit_requested);
    }

    #[test]
    fn f3_toggle_is_edge_triggered() {
        let mut input = InputCollector::default();

        input.handle_overlay_toggle_key_state(true, ElementState::Pressed);
        assert!(input.take_overlay_toggle_pressed());

        input.handle_overlay_toggle_key_state(true, ElementState::Pressed);
        assert!(!input.take_overlay_toggle_pressed());

        input.handle_overlay_toggle_key_state(true, ElementState::Released);
        input.handle_overlay_toggle_key_state(true, ElementState::Pressed);
        assert!(input.take_overlay_toggle_pressed());
    }

    #[test]
    fn only_f3_toggles_overlay() {
        assert!(is_overlay_toggle_key(PhysicalKey::Code(KeyCode::F3)));
        assert!(!is_overlay_toggle_key(PhysicalKey::Code(KeyCode::F4)));
    }

    #[test]
    fn overlay_title_reports_progress() {
        let tiles = TileMap::new(4, 4, vec![0; 16]).expect("tilemap");
        let world = World::new(tiles, Actor::at(0.0, 0.0), Vec::new(), Vec::new());
        let metrics = LoopMetricsSnapshot {
            fps: 59.6,
            tps: 60.0,
            ..LoopMetricsSnapshot::default()
        };

        let title = overlay_title("tilehop", &metrics, &world);

        assert_eq!(
            title,
            "tilehop | fps 60 tps 60 | tick 0 | treasure 0/0 | kills 0 | deaths 0"
        );
    }

    #[test]
    fn invalid_slow_frame_value_falls_back_to_config() {
        assert_eq!(parse_slow_frame_ms("25", 0), Duration::from_millis(25));
        assert_eq!(parse_slow_frame_ms(" 7 ", 0), Duration::from_millis(7));
        assert_eq!(parse_slow_frame_ms("fast", 3), Duration::from_millis(3));
    }

    #[test]
    fn target_frame_duration_none_when_cap_off() {
        assert_eq!(target_frame_duration(None), None);
    }

    #[test]
    fn target_frame_duration_for_60hz_is_expected() {
        let duration = target_frame_duration(Some(60)).expect("duration");
        assert!((duration.as_secs_f64() - (1.0 / 60.0)).abs() < 0.000_001);
    }

    #[test]
    fn compute_cap_sleep_zero_when_over_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(20), target_frame_duration(Some(60)));
        assert_eq!(sleep, Duration::ZERO);
    }

    #[test]
    fn compute_cap_sleep_positive_when_under_budget() {
        let sleep = compute_cap_sleep(Duration::from_millis(5), target_frame_duration(Some(60)));
        assert!(sleep > Duration::ZERO);
    }

    #[test]
    fn normalize_render_fps_cap_disables_zero() {
        assert_eq!(normalize_render_fps_cap(Some(0)), None);
        assert_eq!(normalize_render_fps_cap(Some(60)), Some(60));
    }
}

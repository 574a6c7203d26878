use std::process::ExitCode;
use std::sync::Arc;

use escape_engine::{ControllerError, InputAction, LayoutError, LoopError, Point2D};
use pixels::Error as PixelsError;
use thiserror::Error;
use tracing::{error, info, warn};
use winit::dpi::LogicalSize;
use winit::error::{EventLoopError, OsError};
use winit::event::{ElementState, Event, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::WindowBuilder;

use super::bootstrap::AppWiring;
use super::hud::{window_title, WINDOW_TITLE};
use super::renderer::Renderer;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("failed to load room layout: {0}")]
    Layout(#[from] LayoutError),
    #[error(transparent)]
    Controller(#[from] ControllerError),
    #[error(transparent)]
    Loop(#[from] LoopError),
    #[error("failed to create event loop: {0}")]
    CreateEventLoop(#[source] EventLoopError),
    #[error("failed to create application window: {0}")]
    CreateWindow(#[source] OsError),
    #[error("failed to initialize renderer: {0}")]
    CreateRenderer(#[source] PixelsError),
    #[error("event loop failed: {0}")]
    EventLoopRun(#[source] EventLoopError),
}

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_window(app) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

fn run_window(app: AppWiring) -> Result<(), AppError> {
    let AppWiring {
        config,
        mut game_loop,
    } = app;

    let event_loop = EventLoop::new().map_err(AppError::CreateEventLoop)?;
    let window = Arc::new(
        WindowBuilder::new()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(
                f64::from(config.environment_size.x),
                f64::from(config.environment_size.y),
            ))
            .build(&event_loop)
            .map_err(AppError::CreateWindow)?,
    );
    let mut renderer = Renderer::new(Arc::clone(&window), config.environment_size)
        .map_err(AppError::CreateRenderer)?;

    event_loop.set_control_flow(ControlFlow::Poll);

    let input = game_loop.input();
    let snapshots = game_loop.snapshots();
    game_loop.start()?;
    let mut last_applied_title: Option<String> = None;

    event_loop
        .run(move |event, window_target| match event {
            Event::WindowEvent { window_id, event } if window_id == window.id() => match event {
                WindowEvent::CloseRequested => {
                    info!(reason = "window_close", "shutdown_requested");
                    window_target.exit();
                }
                WindowEvent::Resized(new_size) => {
                    if let Err(error) = renderer.resize_surface(new_size.width, new_size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                        return;
                    }
                    let logical = new_size.to_logical::<f64>(window.scale_factor());
                    if logical.width >= 1.0 && logical.height >= 1.0 {
                        game_loop.resize(Point2D::new(
                            logical.width.round() as i32,
                            logical.height.round() as i32,
                        ));
                    }
                }
                WindowEvent::ScaleFactorChanged { .. } => {
                    let size = window.inner_size();
                    if let Err(error) = renderer.resize_surface(size.width, size.height) {
                        warn!(error = %error, "renderer_resize_failed");
                        window_target.exit();
                    }
                }
                WindowEvent::Focused(false) => input.release_all(),
                WindowEvent::KeyboardInput { event, .. } => {
                    let is_pressed = event.state == ElementState::Pressed;
                    let Some(action) = action_for_key(event.physical_key) else {
                        return;
                    };
                    if action == InputAction::Cancel
                        && is_pressed
                        && !event.repeat
                        && snapshots.snapshot().minigame.is_none()
                    {
                        info!(reason = "escape_key", "shutdown_requested");
                        window_target.exit();
                        return;
                    }
                    input.set_action(action, is_pressed);
                }
                WindowEvent::RedrawRequested => {
                    let snapshot = snapshots.snapshot();
                    if let Err(error) = renderer.render(&snapshot) {
                        warn!(error = %error, "renderer_draw_failed");
                        window_target.exit();
                        return;
                    }

                    let next_title = window_title(&snapshot);
                    if last_applied_title.as_deref() != Some(next_title.as_str()) {
                        window.set_title(&next_title);
                        last_applied_title = Some(next_title);
                    }

                    if !game_loop.is_running() {
                        warn!(tick = snapshot.tick, "game_loop_not_running");
                        window_target.exit();
                    }
                }
                _ => {}
            },
            Event::AboutToWait => {
                window.request_redraw();
            }
            Event::LoopExiting => {
                game_loop.stop();
                info!("shutdown");
            }
            _ => {}
        })
        .map_err(AppError::EventLoopRun)
}

fn action_for_key(key: PhysicalKey) -> Option<InputAction> {
    match key {
        PhysicalKey::Code(KeyCode::KeyW) | PhysicalKey::Code(KeyCode::ArrowUp) => {
            Some(InputAction::MoveUp)
        }
        PhysicalKey::Code(KeyCode::KeyS) | PhysicalKey::Code(KeyCode::ArrowDown) => {
            Some(InputAction::MoveDown)
        }
        PhysicalKey::Code(KeyCode::KeyA) | PhysicalKey::Code(KeyCode::ArrowLeft) => {
            Some(InputAction::MoveLeft)
        }
        PhysicalKey::Code(KeyCode::KeyD) | PhysicalKey::Code(KeyCode::ArrowRight) => {
            Some(InputAction::MoveRight)
        }
        PhysicalKey::Code(KeyCode::KeyE)
        | PhysicalKey::Code(KeyCode::Enter)
        | PhysicalKey::Code(KeyCode::Space) => Some(InputAction::Interact),
        PhysicalKey::Code(KeyCode::Escape) => Some(InputAction::Cancel),
        _ => None,
    }
}

//! # Application State Management
//!
//! This module handles the application's state management, including:
//! - Window and graphics initialization
//! - Input handling
//! - Application lifecycle events
//! - State transitions between initialization and running states

pub mod graphics_resources_builder;
pub mod input_state;

use std::sync::Arc;

use graphics_resources_builder::{Graphics, MaybeGraphics};
use input_state::InputState;

use winit::{
    application::ApplicationHandler,
    event::{ElementState, KeyEvent, WindowEvent},
    event_loop::ActiveEventLoop,
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowId},
};

use crate::engine_state::EngineState;

/// The main application state container that manages the application's lifecycle.
///
/// Holds the current graphics initialization state and, once graphics are
/// ready, the running application state. Implements `ApplicationHandler` to
/// process window events.
pub struct ApplicationState {
    /// The current graphics state, which may be initializing, ready, or moved
    pub graphics: MaybeGraphics,

    /// The initialized application state, if the application has started
    pub state: Option<InitializedApplicationState>,
}

/// The fully initialized and running state of the application.
pub struct InitializedApplicationState {
    /// The tracer engine state and frame loop
    pub engine_state: EngineState,

    /// Handle to the application window
    pub window: Arc<Window>,

    /// Keyboard state for the camera controls
    pub input_state: InputState,

    /// Timestamp of the last frame for delta time calculations
    pub last_frame_time: web_time::Instant,
}

impl ApplicationState {
    /// Transitions from the initialization phase to the running state by
    /// moving the graphics resources into the engine.
    fn initialize_application_state(&mut self) {
        if let MaybeGraphics::Graphics(gfx) = &mut self.graphics {
            let taken_gfx = std::mem::take(gfx);
            let window = taken_gfx.window.expect("Window is missing");
            let engine_state = EngineState::new(
                taken_gfx.surface.expect("Surface is missing"),
                taken_gfx
                    .surface_config
                    .expect("Surface configuration is missing"),
                taken_gfx.device.expect("Device is missing"),
                taken_gfx.queue.expect("Queue is missing"),
            );

            self.state = Some(InitializedApplicationState {
                engine_state,
                window,
                input_state: InputState::new(),
                last_frame_time: web_time::Instant::now(),
            });

            self.graphics = MaybeGraphics::Moved;
        }
    }
}

impl ApplicationHandler<Graphics> for ApplicationState {
    /// Handles window-related events such as resize, focus changes, and input.
    ///
    /// # Arguments
    /// * `event_loop` - Reference to the active event loop
    /// * `_window_id` - ID of the window that generated the event
    /// * `event` - The window event to process
    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        if let Some(state) = &mut self.state {
            state.input_state.intake_input(&event);

            match event {
                WindowEvent::Resized(size) => {
                    state.engine_state.resize_surface(size);
                }
                WindowEvent::Focused(is_focused) => {
                    if !is_focused {
                        state.input_state.reset();
                    }
                }
                WindowEvent::RedrawRequested => {
                    let now = web_time::Instant::now();
                    let dt = now - state.last_frame_time;
                    state.last_frame_time = now;

                    state.engine_state.update_and_render(&state.input_state, dt);
                    state.input_state.finish_frame();
                }
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    event:
                        KeyEvent {
                            state: ElementState::Pressed,
                            physical_key: PhysicalKey::Code(KeyCode::Escape),
                            ..
                        },
                    ..
                } => event_loop.exit(),
                _ => (),
            }
        } else if let WindowEvent::CloseRequested = event {
            event_loop.exit();
        }
    }

    /// Triggers the graphics initialization process on startup.
    ///
    /// # Arguments
    /// * `event_loop` - Reference to the active event loop
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if let MaybeGraphics::Builder(builder) = &mut self.graphics {
            builder.build_and_send(event_loop);
        }
    }

    /// Receives the initialized graphics resources and starts the engine.
    ///
    /// # Arguments
    /// * `_event_loop` - Reference to the active event loop
    /// * `graphics` - The initialized graphics resources
    fn user_event(&mut self, _event_loop: &ActiveEventLoop, graphics: Graphics) {
        self.graphics = MaybeGraphics::Graphics(graphics);
        self.initialize_application_state();
    }

    /// Keeps the frame loop running by requesting the next redraw.
    ///
    /// # Arguments
    /// * `_event_loop` - Reference to the active event loop
    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(state) = &self.state {
            state.window.request_redraw();
        }
    }
}

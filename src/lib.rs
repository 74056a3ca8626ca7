//! # Voxel Tracer
//!
//! A CPU ray tracer over a sparse, chunked voxel world, presented through WGPU.
//!
//! Every frame is traced in software: one perspective ray per pixel walks the
//! voxel grid with a DDA, shades hits recursively through reflection,
//! refraction, and sun shadowing, and the finished framebuffer is blitted to
//! the window as a single textured triangle.
//!
//! ## Key Modules
//!
//! * `application_state` - Manages the application lifecycle and window management
//! * `engine_state` - The tracer itself: camera, world, traversal, shading, presentation
//!
//! ## Architecture
//!
//! The world is a fixed pool of chunks loaded on demand: rays that leave the
//! loaded region enqueue the chunks they needed, and the next frame loads
//! them before tracing starts. Rendering is data-parallel per pixel row; the
//! GPU's only job is putting the traced image on screen.
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     voxel_tracer::run();
//! }
//! ```

use application_state::{
    graphics_resources_builder::{GraphicsBuilder, MaybeGraphics},
    ApplicationState,
};

use log::info;
use winit::event_loop::EventLoop;

mod application_state;
mod engine_state;

/// Initializes logging, builds the event loop, and runs the application
/// until the window closes.
pub fn run() {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");
    let event_loop = EventLoop::with_user_event().build().unwrap();

    let mut state: ApplicationState = ApplicationState {
        graphics: MaybeGraphics::Builder(GraphicsBuilder::new(event_loop.create_proxy())),
        state: None,
    };

    let _ = event_loop.run_app(&mut state);
}

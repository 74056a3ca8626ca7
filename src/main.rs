//! # Voxel Tracer Entry Point
//!
//! Starts the interactive tracer window.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release
//! ```

fn main() {
    voxel_tracer::run();
}

//! # Voxels Module
//!
//! This module contains the voxel data layer of the tracer: materials, chunks,
//! the chunk-pooling world, and the scene context that bundles them for the
//! traversal engine.
//!
//! ## Key Components
//!
//! * `material` - Material descriptors and the id-indexed material table
//! * `chunk` - Fixed-size cubes of material ids with lazy allocation
//! * `world` - The fixed-capacity chunk pool with on-demand streaming
//! * `scene` - The context object handed to the traversal engine

pub mod chunk;
pub mod material;
pub mod scene;
pub mod world;

/// The integer type used to store one voxel's material id.
///
/// Id 0 is reserved for air ("no voxel"); every other id indexes into the
/// scene's material table.
pub type MaterialId = u32;

/// The reserved material id for empty space.
pub const AIR: MaterialId = 0;

//! # Chunk Module
//!
//! This module provides the `Chunk` struct, the allocation unit of the voxel
//! world: a 16x16x16 cube of material ids.
//!
//! ## Memory Model
//!
//! A chunk slot always exists in the world's pool, but its voxel storage is
//! lazily allocated. Allocation is all-or-nothing: a chunk either has no
//! backing storage at all, or exactly `CHUNK_VOLUME` zero-initialized cells.
//! Reading through an unallocated chunk is a non-fatal contract violation that
//! logs a warning and yields the air id instead of faulting.

use std::sync::atomic::{AtomicU64, Ordering};

use cgmath::Point3;
use log::warn;

use super::{MaterialId, AIR};

/// The side length of a chunk in voxels.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of voxels in a single z-plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of voxels in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_VOLUME: usize = (CHUNK_PLANE_SIZE * CHUNK_DIMENSION) as usize;

/// One slot of the world's chunk pool.
///
/// Carries its position in chunk-grid units, optional voxel storage, and an
/// atomic last-touched stamp used by the world's eviction pass. The stamp is
/// updated with relaxed ordering from concurrent traversal reads; it only
/// feeds a heuristic and carries no synchronization requirement.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not voxel coordinates).
    pub position: Point3<i32>,
    /// Voxel storage in z-major order, present only while the chunk is resident.
    voxels: Option<Box<[MaterialId]>>,
    /// Stamp of the last frame this chunk was read by a traversal.
    last_touched: AtomicU64,
}

impl Chunk {
    /// Creates an unallocated pool slot at the origin.
    pub fn empty_slot() -> Self {
        Chunk {
            position: Point3::new(0, 0, 0),
            voxels: None,
            last_touched: AtomicU64::new(0),
        }
    }

    /// Whether this slot currently holds voxel storage.
    pub fn is_allocated(&self) -> bool {
        self.voxels.is_some()
    }

    /// Allocates zero-initialized voxel storage for `position`.
    ///
    /// This is the extension point where procedural content generation would
    /// fill the fresh cells; the contract here is zero-initialization only.
    pub fn allocate(&mut self, position: Point3<i32>, stamp: u64) {
        self.position = position;
        self.voxels = Some(vec![AIR; CHUNK_VOLUME].into_boxed_slice());
        self.last_touched.store(stamp, Ordering::Relaxed);
    }

    /// Frees the voxel storage, returning the slot to the unallocated state.
    pub fn unload(&mut self) {
        self.voxels = None;
    }

    /// Reads the material id at the given linear offset.
    ///
    /// Returns the air id with a logged warning if the chunk is unallocated
    /// or the offset is out of range.
    pub fn voxel(&self, index: usize) -> MaterialId {
        match &self.voxels {
            Some(voxels) if index < voxels.len() => voxels[index],
            Some(_) | None => {
                warn!("Tried reading voxel data from a non-allocated chunk slot");
                AIR
            }
        }
    }

    /// Writes the material id at the given linear offset.
    ///
    /// Logs a warning and drops the write if the chunk is unallocated.
    pub fn set_voxel(&mut self, index: usize, id: MaterialId) {
        match &mut self.voxels {
            Some(voxels) if index < voxels.len() => voxels[index] = id,
            Some(_) | None => {
                warn!("Tried writing voxel data to a non-allocated chunk slot");
            }
        }
    }

    /// Records that a traversal read this chunk during frame `stamp`.
    pub fn touch(&self, stamp: u64) {
        self.last_touched.store(stamp, Ordering::Relaxed);
    }

    /// The stamp of the last frame a traversal read this chunk.
    pub fn last_touched(&self) -> u64 {
        self.last_touched.load(Ordering::Relaxed)
    }
}

/// Converts in-chunk offsets to the linear storage index, z-major:
/// `lz·CHUNK_DIMENSION² + ly·CHUNK_DIMENSION + lx`.
pub fn linear_index(lx: i32, ly: i32, lz: i32) -> usize {
    (lz * CHUNK_PLANE_SIZE + ly * CHUNK_DIMENSION + lx) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_is_all_or_nothing_and_zero_initialized() {
        let mut chunk = Chunk::empty_slot();
        assert!(!chunk.is_allocated());

        chunk.allocate(Point3::new(1, -2, 3), 7);
        assert!(chunk.is_allocated());
        assert_eq!(chunk.position, Point3::new(1, -2, 3));
        for index in [0, CHUNK_VOLUME / 2, CHUNK_VOLUME - 1] {
            assert_eq!(chunk.voxel(index), AIR);
        }

        chunk.unload();
        assert!(!chunk.is_allocated());
    }

    #[test]
    fn unallocated_read_yields_air_instead_of_faulting() {
        let chunk = Chunk::empty_slot();
        assert_eq!(chunk.voxel(0), AIR);
        assert_eq!(chunk.voxel(CHUNK_VOLUME + 100), AIR);
    }

    #[test]
    fn linear_index_is_z_major() {
        assert_eq!(linear_index(0, 0, 0), 0);
        assert_eq!(linear_index(15, 0, 0), 15);
        assert_eq!(linear_index(0, 1, 0), CHUNK_DIMENSION as usize);
        assert_eq!(linear_index(0, 0, 1), CHUNK_PLANE_SIZE as usize);
        assert_eq!(linear_index(15, 15, 15), CHUNK_VOLUME - 1);
    }
}

//! # World Module
//!
//! This module provides the `World` struct: a fixed-capacity pool of chunk
//! slots keyed by chunk coordinates, plus the pending-allocation queue that
//! streams new chunks in between frames.
//!
//! ## Architecture
//!
//! Storage is sparse: only chunks that have been referenced are resident.
//! Chunk lookup is O(1) through a coordinate-to-slot hash map. A lookup that
//! misses does not allocate on the spot (traversal runs on many threads at
//! once); it enqueues the coordinate and reports the sample as not yet loaded.
//! `load_chunks` drains that queue at the synchronization point between
//! frames, when no traversal is in flight.
//!
//! ## Eviction
//!
//! When every slot is occupied, the least-recently-touched resident chunk is
//! unloaded and its slot reused, so a full pool can never wedge streaming.
//! Chunks allocated during the current pass are never eviction candidates.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use cgmath::Point3;
use log::{debug, warn};

use super::chunk::{linear_index, Chunk, CHUNK_DIMENSION};
use super::MaterialId;

/// The number of chunk slots in the world's pool.
pub const CHUNK_CAPACITY: usize = 1024;

/// The result of a voxel lookup.
///
/// Distinguishes a confirmed sample from a read through a region whose chunk
/// has not been streamed in yet. Callers must tolerate `Unloaded` immediately
/// after a lookup, since allocation is deferred to the next `load_chunks`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum VoxelSample {
    /// The chunk is resident; this is its actual cell value.
    Loaded(MaterialId),
    /// The chunk is not resident. A streaming request has been queued.
    Unloaded,
}

impl VoxelSample {
    /// The material id this sample shades as; unloaded regions read as air.
    pub fn material_id(&self) -> MaterialId {
        match self {
            VoxelSample::Loaded(id) => *id,
            VoxelSample::Unloaded => super::AIR,
        }
    }
}

/// The sparse chunked voxel world.
///
/// Traversal reads go through `get_voxel` (`&self`, callable from any number
/// of render threads); residency changes only happen through `&mut self`
/// methods, which the engine confines to the gap between frames.
pub struct World {
    /// The fixed pool of chunk slots.
    slots: Vec<Chunk>,
    /// Coordinate-to-slot index for every allocated chunk.
    resident: HashMap<Point3<i32>, usize>,
    /// Chunk coordinates awaiting allocation, most recent last.
    pending: Mutex<Vec<Point3<i32>>>,
    /// Monotonic pass counter used to stamp chunk reads for eviction.
    frame_stamp: AtomicU64,
}

impl World {
    /// Creates a world with the default pool capacity and no resident chunks.
    pub fn new() -> Self {
        Self::with_capacity(CHUNK_CAPACITY)
    }

    /// Creates a world with `capacity` chunk slots.
    pub fn with_capacity(capacity: usize) -> Self {
        World {
            slots: (0..capacity).map(|_| Chunk::empty_slot()).collect(),
            resident: HashMap::new(),
            pending: Mutex::new(Vec::new()),
            frame_stamp: AtomicU64::new(1),
        }
    }

    /// Samples the voxel at global voxel coordinates (any sign or magnitude).
    ///
    /// Decomposes the coordinates into a chunk position and in-chunk offset
    /// with floored division, so negative coordinates resolve to the correct
    /// chunk. On a miss the coordinate is queued for allocation (once) and
    /// the sample reports `Unloaded`.
    pub fn get_voxel(&self, x: i32, y: i32, z: i32) -> VoxelSample {
        let (cx, lx) = (x.div_euclid(CHUNK_DIMENSION), x.rem_euclid(CHUNK_DIMENSION));
        let (cy, ly) = (y.div_euclid(CHUNK_DIMENSION), y.rem_euclid(CHUNK_DIMENSION));
        let (cz, lz) = (z.div_euclid(CHUNK_DIMENSION), z.rem_euclid(CHUNK_DIMENSION));
        let position = Point3::new(cx, cy, cz);

        match self.resident.get(&position) {
            Some(&slot) => {
                let chunk = &self.slots[slot];
                chunk.touch(self.frame_stamp.load(Ordering::Relaxed));
                VoxelSample::Loaded(chunk.voxel(linear_index(lx, ly, lz)))
            }
            None => {
                let mut pending = self
                    .pending
                    .lock()
                    .expect("pending chunk queue lock poisoned");
                if !pending.contains(&position) {
                    debug!(
                        "Chunk ({}, {}, {}) is not resident, queueing it for allocation",
                        cx, cy, cz
                    );
                    pending.push(position);
                }
                VoxelSample::Unloaded
            }
        }
    }

    /// Writes one voxel, allocating its chunk on the spot if necessary.
    ///
    /// This is a scene-construction operation; it must not run concurrently
    /// with traversal (enforced by `&mut self`).
    pub fn set_voxel(&mut self, x: i32, y: i32, z: i32, id: MaterialId) {
        let (cx, lx) = (x.div_euclid(CHUNK_DIMENSION), x.rem_euclid(CHUNK_DIMENSION));
        let (cy, ly) = (y.div_euclid(CHUNK_DIMENSION), y.rem_euclid(CHUNK_DIMENSION));
        let (cz, lz) = (z.div_euclid(CHUNK_DIMENSION), z.rem_euclid(CHUNK_DIMENSION));
        let position = Point3::new(cx, cy, cz);
        let stamp = self.frame_stamp.load(Ordering::Relaxed);

        match self.ensure_resident(position, stamp) {
            Some(slot) => self.slots[slot].set_voxel(linear_index(lx, ly, lz), id),
            None => warn!(
                "No chunk slot available for ({}, {}, {}), dropping voxel write",
                cx, cy, cz
            ),
        }
    }

    /// Drains the pending-allocation queue into the pool, newest request first.
    ///
    /// This is the only place chunks become resident from traversal misses.
    /// It must run between frames; it mutates residency that traversal reads.
    /// Stops early (requeueing the remainder) only if the pool is full and
    /// every resident chunk was already allocated during this pass.
    pub fn load_chunks(&mut self) {
        let stamp = self.frame_stamp.fetch_add(1, Ordering::Relaxed) + 1;
        let mut queued = {
            let mut pending = self
                .pending
                .lock()
                .expect("pending chunk queue lock poisoned");
            std::mem::take(&mut *pending)
        };

        let mut loaded = 0;
        while let Some(position) = queued.pop() {
            if self.resident.contains_key(&position) {
                continue;
            }
            match self.ensure_resident(position, stamp) {
                Some(_) => loaded += 1,
                None => {
                    queued.push(position);
                    break;
                }
            }
        }

        if !queued.is_empty() {
            warn!(
                "Chunk pool exhausted, {} allocation requests deferred to the next frame",
                queued.len()
            );
            let mut pending = self
                .pending
                .lock()
                .expect("pending chunk queue lock poisoned");
            queued.append(&mut pending);
            *pending = queued;
        }

        if loaded > 0 {
            debug!(
                "Loaded {} chunks, {} of {} slots in use",
                loaded,
                self.resident.len(),
                self.slots.len()
            );
        }
    }

    /// The number of currently resident chunks.
    pub fn resident_count(&self) -> usize {
        self.resident.len()
    }

    /// The number of coordinates currently waiting for allocation.
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .expect("pending chunk queue lock poisoned")
            .len()
    }

    /// The resident chunk at the given chunk coordinates, if any.
    pub fn chunk_at(&self, position: Point3<i32>) -> Option<&Chunk> {
        self.resident.get(&position).map(|&slot| &self.slots[slot])
    }

    /// Makes `position` resident and returns its slot index, allocating into
    /// a free slot or evicting the least-recently-touched chunk. Returns
    /// `None` only when no slot can be freed (every chunk was touched at or
    /// after `stamp`).
    fn ensure_resident(&mut self, position: Point3<i32>, stamp: u64) -> Option<usize> {
        if let Some(&slot) = self.resident.get(&position) {
            return Some(slot);
        }

        let slot = match self.slots.iter().position(|chunk| !chunk.is_allocated()) {
            Some(free) => free,
            None => self.evict_least_recently_touched(stamp)?,
        };

        self.slots[slot].allocate(position, stamp);
        self.resident.insert(position, slot);
        Some(slot)
    }

    /// Unloads the least-recently-touched resident chunk and returns its
    /// slot, skipping chunks stamped during the current pass.
    fn evict_least_recently_touched(&mut self, current_stamp: u64) -> Option<usize> {
        let (slot, position, touched) = self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, chunk)| chunk.is_allocated())
            .map(|(slot, chunk)| (slot, chunk.position, chunk.last_touched()))
            .min_by_key(|&(_, _, touched)| touched)?;

        if touched >= current_stamp {
            return None;
        }

        debug!(
            "Evicting chunk ({}, {}, {}) last touched in pass {}",
            position.x, position.y, position.z, touched
        );
        self.resident.remove(&position);
        self.slots[slot].unload();
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_coordinates_resolve_with_floored_division() {
        let mut world = World::new();
        world.set_voxel(-1, 0, 0, 3);

        assert!(world.chunk_at(Point3::new(-1, 0, 0)).is_some());
        assert!(world.chunk_at(Point3::new(0, 0, 0)).is_none());
        assert_eq!(world.get_voxel(-1, 0, 0), VoxelSample::Loaded(3));

        // Offset (15, 0, 0) inside chunk (-1, 0, 0).
        let chunk = world.chunk_at(Point3::new(-1, 0, 0)).unwrap();
        assert_eq!(chunk.voxel(linear_index(15, 0, 0)), 3);
    }

    #[test]
    fn miss_enqueues_once_and_loads_on_next_pass() {
        let mut world = World::new();

        assert_eq!(world.get_voxel(40, 2, -7), VoxelSample::Unloaded);
        assert_eq!(world.get_voxel(40, 2, -7), VoxelSample::Unloaded);
        assert_eq!(world.pending_count(), 1);

        world.load_chunks();
        assert_eq!(world.pending_count(), 0);
        assert_eq!(world.resident_count(), 1);
        assert_eq!(world.get_voxel(40, 2, -7), VoxelSample::Loaded(crate::engine_state::voxels::AIR));
    }

    #[test]
    fn load_chunks_serves_newest_request_first() {
        let mut world = World::with_capacity(1);

        assert_eq!(world.get_voxel(0, 0, 0), VoxelSample::Unloaded);
        assert_eq!(world.get_voxel(160, 0, 0), VoxelSample::Unloaded);
        world.load_chunks();

        // Only one slot: the most recently enqueued coordinate wins it.
        assert!(world.chunk_at(Point3::new(10, 0, 0)).is_some());
    }

    #[test]
    fn full_pool_evicts_least_recently_touched() {
        let mut world = World::with_capacity(2);
        world.set_voxel(0, 0, 0, 1);
        world.set_voxel(16, 0, 0, 2);
        assert_eq!(world.resident_count(), 2);

        // Touch chunk (0,0,0) during a fresh pass so chunk (1,0,0) is older.
        world.load_chunks();
        assert_eq!(world.get_voxel(0, 0, 0), VoxelSample::Loaded(1));

        assert_eq!(world.get_voxel(32, 0, 0), VoxelSample::Unloaded);
        world.load_chunks();

        assert!(world.chunk_at(Point3::new(0, 0, 0)).is_some());
        assert!(world.chunk_at(Point3::new(1, 0, 0)).is_none());
        assert!(world.chunk_at(Point3::new(2, 0, 0)).is_some());
    }
}

//! # Scene Module
//!
//! The `Scene` struct bundles everything the traversal engine reads: the
//! chunked world, the material table, and the sun direction. Passing it
//! explicitly (instead of consulting process-wide globals) keeps traces
//! reproducible and testable in isolation.

use cgmath::{InnerSpace, Vector3};
use log::warn;

use super::chunk::CHUNK_DIMENSION;
use super::material::MaterialTable;
use super::world::World;
use super::MaterialId;

/// The read-only context a render pass traces against.
///
/// The only mutation traversal performs through this struct is appending to
/// the world's pending-allocation queue, which the world serializes
/// internally; everything else is immutable for the duration of a frame.
pub struct Scene {
    /// The chunked voxel store.
    pub world: World,
    /// Material descriptors indexed by voxel id.
    pub materials: MaterialTable,
    /// Unit direction the sun shines along, used by shading and shadowing.
    pub sun_direction: Vector3<f32>,
}

impl Scene {
    /// Creates a scene around the given world and materials.
    ///
    /// The sun direction is normalized here; a zero vector is replaced with
    /// straight-down sunlight and a logged warning.
    pub fn new(world: World, materials: MaterialTable, sun_direction: Vector3<f32>) -> Self {
        let sun_direction = if sun_direction.magnitude2() > f32::EPSILON {
            sun_direction.normalize()
        } else {
            warn!("Sun direction is zero-length, substituting (0, -1, 0)");
            Vector3::new(0.0, -1.0, 0.0)
        };

        Scene {
            world,
            materials,
            sun_direction,
        }
    }

    /// Fills the world with the built-in demo content: a solid floor slab
    /// plus sparse scattered blocks of random materials above it.
    ///
    /// The generator is seeded so the same seed always produces the same
    /// scene. Material ids are drawn from 1..table length, so the demo adapts
    /// to whatever table the config supplied.
    pub fn seed_demo(&mut self, seed: u64) {
        let mut rng = fastrand::Rng::with_seed(seed);
        let extent = CHUNK_DIMENSION * 3 / 2;
        let max_id = self.materials.len().saturating_sub(1) as MaterialId;
        if max_id == 0 {
            warn!("Material table only contains air, demo scene will be empty");
            return;
        }

        // Floor slab one voxel thick.
        for x in -extent..=extent {
            for z in -extent..=extent {
                self.world.set_voxel(x, 0, z, 1);
            }
        }

        // Sparse scatter above the floor.
        let sparseness = 0.97;
        for x in -extent..=extent {
            for z in -extent..=extent {
                for y in 1..=6 {
                    if rng.f64() > sparseness {
                        self.world.set_voxel(x, y, z, rng.u32(1..=max_id));
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::material::{Material, MaterialKind};
    use crate::engine_state::voxels::world::VoxelSample;
    use cgmath::Point3;

    fn demo_table() -> MaterialTable {
        MaterialTable::new(vec![
            Material::air(),
            Material::new(MaterialKind::Diffuse, Vector3::new(0.3, 0.5, 0.8), 0.0),
            Material::new(MaterialKind::Reflective, Vector3::new(0.8, 0.3, 0.5), 0.3),
        ])
    }

    #[test]
    fn sun_direction_is_normalized() {
        let scene = Scene::new(World::new(), demo_table(), Vector3::new(3.0, -4.0, 0.0));
        assert!((scene.sun_direction.magnitude() - 1.0).abs() < 1e-6);

        let fallback = Scene::new(World::new(), demo_table(), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(fallback.sun_direction, Vector3::new(0.0, -1.0, 0.0));
    }

    #[test]
    fn demo_seed_is_deterministic_and_builds_a_floor() {
        let mut first = Scene::new(World::new(), demo_table(), Vector3::new(0.0, -1.0, 0.0));
        let mut second = Scene::new(World::new(), demo_table(), Vector3::new(0.0, -1.0, 0.0));
        first.seed_demo(42);
        second.seed_demo(42);

        assert_eq!(first.world.get_voxel(0, 0, 0), VoxelSample::Loaded(1));
        assert!(first.world.chunk_at(Point3::new(-1, 0, -1)).is_some());

        for x in -4..4 {
            for y in 0..7 {
                for z in -4..4 {
                    assert_eq!(
                        first.world.get_voxel(x, y, z),
                        second.world.get_voxel(x, y, z)
                    );
                }
            }
        }
    }
}

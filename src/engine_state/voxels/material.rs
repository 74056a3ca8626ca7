//! # Material Module
//!
//! This module defines the surface materials voxels can be made of and the
//! table that maps small integer ids to material descriptors.
//!
//! The table is populated once at startup (from the config file or compiled
//! defaults) and is read-only afterwards; the traversal engine only ever looks
//! materials up by id.

use cgmath::Vector3;
use log::warn;
use serde::{Deserialize, Serialize};

use super::MaterialId;

/// How a surface responds to an incoming ray.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaterialKind {
    /// Empty space. Id 0 always carries this kind; shading it yields black.
    Empty,
    /// A matte surface shaded with the raw Lambertian term only.
    Diffuse,
    /// A mirror-like surface. `effect_value` blends the mirrored bounce
    /// against the flat albedo (0 = pure diffuse, 1 = pure mirror).
    Reflective,
    /// A dielectric surface. `effect_value` is the index of refraction
    /// against an assumed ambient index of 1.
    Refractive,
}

/// A single material descriptor.
///
/// # Fields
/// - `kind`: The shading branch this material dispatches to
/// - `albedo`: Surface color, components in [0, 1]
/// - `effect_value`: Reflective blend weight or refractive index, depending on `kind`
#[derive(Copy, Clone, Debug)]
pub struct Material {
    /// The shading branch this material dispatches to.
    pub kind: MaterialKind,
    /// Surface color, components in [0, 1].
    pub albedo: Vector3<f32>,
    /// Reflective blend weight in [0, 1], or refractive index, per `kind`.
    pub effect_value: f32,
}

impl Material {
    /// Creates a new material descriptor.
    pub fn new(kind: MaterialKind, albedo: Vector3<f32>, effect_value: f32) -> Self {
        Material {
            kind,
            albedo,
            effect_value,
        }
    }

    /// The reserved air material stored at id 0.
    pub fn air() -> Self {
        Material::new(MaterialKind::Empty, Vector3::new(0.0, 0.0, 0.0), 0.0)
    }
}

/// An ordered list of material descriptors indexed by [`MaterialId`].
///
/// Index 0 is always the air material; out-of-range ids are clamped back to
/// air with a logged warning rather than indexing out of bounds.
pub struct MaterialTable {
    materials: Vec<Material>,
}

impl MaterialTable {
    /// Builds a table from the given entries.
    ///
    /// Entry 0 is forced to the air material: if `entries` is empty one is
    /// inserted, and if the caller supplied a non-empty first entry it is
    /// overwritten so that id 0 keeps its "no voxel" meaning.
    pub fn new(entries: Vec<Material>) -> Self {
        let mut materials = entries;
        if materials.is_empty() {
            materials.push(Material::air());
        } else {
            materials[0] = Material::air();
        }
        MaterialTable { materials }
    }

    /// The number of entries in the table.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Looks up the material for `id`.
    ///
    /// Ids at or beyond the table size resolve to the air material at id 0,
    /// with a logged warning.
    pub fn resolve(&self, id: MaterialId) -> &Material {
        match self.materials.get(id as usize) {
            Some(material) => material,
            None => {
                warn!(
                    "Material id {} is outside the {}-entry table, falling back to air",
                    id,
                    self.materials.len()
                );
                &self.materials[0]
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_always_reserves_air_at_id_zero() {
        let table = MaterialTable::new(vec![]);
        assert_eq!(table.len(), 1);
        assert_eq!(table.resolve(0).kind, MaterialKind::Empty);

        let table = MaterialTable::new(vec![
            Material::new(MaterialKind::Diffuse, Vector3::new(1.0, 0.0, 0.0), 0.0),
            Material::new(MaterialKind::Diffuse, Vector3::new(0.0, 1.0, 0.0), 0.0),
        ]);
        assert_eq!(table.resolve(0).kind, MaterialKind::Empty);
        assert_eq!(table.resolve(1).kind, MaterialKind::Diffuse);
    }

    #[test]
    fn out_of_range_id_falls_back_to_air() {
        let table = MaterialTable::new(vec![
            Material::air(),
            Material::new(MaterialKind::Reflective, Vector3::new(0.8, 0.3, 0.5), 0.3),
        ]);
        let material = table.resolve(99);
        assert_eq!(material.kind, MaterialKind::Empty);
    }
}

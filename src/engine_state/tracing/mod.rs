//! # Tracing Module
//!
//! The ray-traversal and shading engine. Rays are stepped voxel-by-voxel
//! through the world with a digital differential analyzer (DDA), and a hit
//! dispatches to diffuse, reflective, or refractive shading, recursing for
//! reflection and refraction until the bounce budget runs out.
//!
//! ## Traversal
//!
//! The DDA advances exactly one voxel boundary per step, always along the
//! axis whose next grid crossing is parametrically nearest (tie-break order
//! x, y, z). Per-axis crossing distances are recomputed every step; when the
//! current position sits exactly on a boundary the next crossing is one full
//! voxel further, which is what prevents a zero-distance infinite loop.
//!
//! ## Light transport
//!
//! Reflection flips the ray direction on the single axis of the face normal,
//! which is valid because every surface normal in this grid is axis-aligned.
//! Refraction follows Snell's law with a Fresnel blend between the reflected
//! and refracted contributions. Shadowing is a boolean DDA toward the sun.

use cgmath::{InnerSpace, Point3, Vector3, Zero};
use log::error;

pub mod ray;

use super::voxels::chunk::CHUNK_DIMENSION;
use super::voxels::material::{Material, MaterialKind};
use super::voxels::scene::Scene;
use super::voxels::AIR;
use ray::Ray;

/// Render distance in chunks.
pub const RENDER_DISTANCE: i32 = 10;
/// Maximum traversal distance in world units before a ray counts as a miss.
pub const MAX_TRACE_DISTANCE: f32 = (RENDER_DISTANCE * CHUNK_DIMENSION) as f32;

/// A per-axis crossing distance at or above this value on every axis means
/// the direction is degenerate, which cannot happen for a normalized nonzero
/// direction; traversal treats it as fatal.
const T_MAX_SENTINEL: f32 = 1000.0;

/// Offset applied against the ray direction when spawning secondary rays, so
/// they start just off the surface they came from.
const SURFACE_BIAS: f32 = 1e-4;

/// Attenuation applied to the light term when the hit point is occluded from
/// the sun. 1.0 keeps shadows visually disabled, matching the behavior the
/// shading model was tuned against.
const SHADOWED_LIGHT_FACTOR: f32 = 1.0;

/// Incremental grid stepper shared by tracing, shadowing, and depth probing.
///
/// `voxel` is the integer cell the ray most recently stepped into, `location`
/// the world-space position of that crossing, and `normal` the axis-aligned
/// unit normal of the crossed face, pointing back toward the ray origin side.
struct GridWalker {
    location: Point3<f32>,
    direction: Vector3<f32>,
    step: [i32; 3],
    voxel: [i32; 3],
    normal: Vector3<f32>,
}

impl GridWalker {
    /// Sets up a walker at `origin` heading along unit `direction`.
    fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        let mut step = [0i32; 3];
        let mut voxel = [0i32; 3];
        for axis in 0..3 {
            step[axis] = if direction[axis] > 0.0 { 1 } else { -1 };
            voxel[axis] = if direction[axis] < 0.0 {
                origin[axis].ceil() as i32
            } else {
                origin[axis].floor() as i32
            };
        }
        GridWalker {
            location: origin,
            direction,
            step,
            voxel,
            normal: Vector3::zero(),
        }
    }

    /// Sets up a walker whose starting cell is `floor(origin)` on every
    /// axis regardless of direction sign. Shadow rays start this way, so the
    /// first advance leaves the cell containing the start point.
    fn containing_cell(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        let mut walker = Self::new(origin, direction);
        for axis in 0..3 {
            walker.voxel[axis] = origin[axis].floor() as i32;
        }
        walker
    }

    /// Parametric distance to the next grid boundary on each axis.
    ///
    /// An axis with zero direction never crosses, so its distance is
    /// infinite. A position exactly on a boundary targets the boundary one
    /// full voxel further in the step direction.
    fn crossing_distances(&self) -> [f32; 3] {
        let mut t_max = [0.0f32; 3];
        for axis in 0..3 {
            let d = self.direction[axis];
            if d == 0.0 {
                t_max[axis] = f32::INFINITY;
                continue;
            }
            let position = self.location[axis];
            let boundary = if position == position.floor() {
                position + self.step[axis] as f32
            } else if self.step[axis] == 1 {
                position.ceil()
            } else {
                position.floor()
            };
            t_max[axis] = (boundary - position) / d;
        }
        t_max
    }

    /// Advances one boundary crossing along the nearest axis (tie-break
    /// order x, y, z) and returns the parametric distance moved.
    ///
    /// # Panics
    /// Panics if the nearest crossing distance reaches the numerical
    /// sentinel on all axes, which indicates a degenerate direction.
    fn advance(&mut self) -> f32 {
        let t_max = self.crossing_distances();
        let axis = if t_max[0] < t_max[1] && t_max[0] < t_max[2] {
            0
        } else if t_max[1] < t_max[2] {
            1
        } else if t_max[2] < T_MAX_SENTINEL {
            2
        } else {
            error!(
                "Voxel traversal crossing distances {:?} all exceed the sentinel, \
                 the ray direction {:?} is degenerate",
                t_max, self.direction
            );
            panic!("degenerate ray direction in voxel traversal");
        };

        let t = t_max[axis];
        self.location += self.direction * t;
        self.voxel[axis] += self.step[axis];
        self.normal = Vector3::zero();
        self.normal[axis] = -self.step[axis] as f32;
        t
    }
}

/// Traces a ray through the scene and returns its color.
///
/// `source` is the traversal's distance reference point (the camera
/// position); it is passed unchanged through recursive bounces so that the
/// render-distance budget is shared by a whole light path. `bounces` is the
/// remaining recursion budget; at zero the ray resolves to the skybox.
pub fn trace(scene: &Scene, source: Point3<f32>, ray: &Ray, bounces: u32) -> Vector3<f32> {
    if ray.direction.magnitude2() <= f32::EPSILON {
        // Zero directions come out of total internal refraction misses.
        return skybox(ray.direction);
    }
    let direction = ray.direction.normalize();
    if bounces == 0 {
        return skybox(direction);
    }

    let mut walker = GridWalker::new(ray.origin, direction);
    while (walker.location - source).magnitude() < MAX_TRACE_DISTANCE {
        walker.advance();
        let id = scene
            .world
            .get_voxel(walker.voxel[0], walker.voxel[1], walker.voxel[2])
            .material_id();
        if id != AIR {
            let material = scene.materials.resolve(id);
            return shade(scene, source, &walker, direction, material, bounces);
        }
    }
    skybox(direction)
}

/// Shades a traversal hit, dispatching on the material kind.
fn shade(
    scene: &Scene,
    source: Point3<f32>,
    walker: &GridWalker,
    direction: Vector3<f32>,
    material: &Material,
    bounces: u32,
) -> Vector3<f32> {
    let location = walker.location - direction * SURFACE_BIAS;
    let normal = walker.normal;

    let occluded = shadow(scene, source, location);
    let attenuation = if occluded { SHADOWED_LIGHT_FACTOR } else { 1.0 };
    // Raw Lambertian term; deliberately not clamped at zero, see DESIGN.md.
    let light = scene.sun_direction.dot(normal) * attenuation;

    match material.kind {
        MaterialKind::Reflective => {
            if material.effect_value <= 0.0 {
                material.albedo * light
            } else if material.effect_value >= 1.0 {
                reflect(scene, source, location, direction, normal, bounces - 1) * light
            } else {
                reflect(scene, source, location, direction, normal, bounces - 1)
                    * material.effect_value
                    * light
                    + material.albedo * (1.0 - material.effect_value) * light
            }
        }
        MaterialKind::Refractive => {
            refract(scene, source, material, location, direction, normal, bounces - 1) * light
        }
        MaterialKind::Empty | MaterialKind::Diffuse => material.albedo * light,
    }
}

/// Mirrors `direction` across an axis-aligned face normal by flipping the
/// sign on the single axis where the normal is nonzero.
fn mirrored_direction(direction: Vector3<f32>, normal: Vector3<f32>) -> Vector3<f32> {
    let mut mirrored = direction;
    for axis in 0..3 {
        if normal[axis] != 0.0 {
            mirrored[axis] = -mirrored[axis];
            break;
        }
    }
    mirrored
}

/// Traces the mirror bounce off a hit and returns its color.
fn reflect(
    scene: &Scene,
    source: Point3<f32>,
    location: Point3<f32>,
    direction: Vector3<f32>,
    normal: Vector3<f32>,
    bounces: u32,
) -> Vector3<f32> {
    let reflected = Ray::new(location, mirrored_direction(direction, normal));
    trace(scene, source, &reflected, bounces)
}

/// Computes the Fresnel reflectance and the Snell refraction direction for a
/// ray hitting a dielectric boundary with the given index of refraction,
/// against an assumed ambient index of 1. The incident and transmitted media
/// swap when the ray exits the material (direction and normal agree).
///
/// Returns `(fresnel, refracted_direction)`; the direction is zero when total
/// internal reflection leaves no transmitted ray.
fn fresnel_and_refraction(
    direction: Vector3<f32>,
    normal: Vector3<f32>,
    index_of_refraction: f32,
) -> (f32, Vector3<f32>) {
    let cosi = direction.dot(normal).clamp(-1.0, 1.0);
    let (etai, etat) = if cosi > 0.0 {
        (index_of_refraction, 1.0)
    } else {
        (1.0, index_of_refraction)
    };

    // Snell's law for the transmitted angle; sint >= 1 is total internal
    // reflection.
    let sint = etai / etat * (1.0 - cosi * cosi).max(0.0).sqrt();
    let fresnel = if sint >= 1.0 {
        1.0
    } else {
        let cost = (1.0 - sint * sint).max(0.0).sqrt();
        let cosi_abs = cosi.abs();
        let r_s = ((etat * cosi_abs) - (etai * cost)) / ((etat * cosi_abs) + (etai * cost));
        let r_p = ((etai * cosi_abs) - (etat * cost)) / ((etai * cosi_abs) + (etat * cost));
        (r_s * r_s + r_p * r_p) / 2.0
    };

    let eta = etai / etat;
    let (cosi, oriented_normal) = if cosi < 0.0 {
        (-cosi, normal)
    } else {
        (cosi, -normal)
    };
    let k = 1.0 - eta * eta * (1.0 - cosi * cosi);
    let refracted = if k < 0.0 {
        Vector3::zero()
    } else {
        direction * eta + oriented_normal * (eta * cosi - k.sqrt())
    };

    (fresnel, refracted)
}

/// Shades a refractive hit: blends the reflected and refracted contributions
/// by the Fresnel coefficient, short-circuiting to pure reflection under
/// total internal reflection and to pure refraction when nothing reflects.
fn refract(
    scene: &Scene,
    source: Point3<f32>,
    material: &Material,
    location: Point3<f32>,
    direction: Vector3<f32>,
    normal: Vector3<f32>,
    bounces: u32,
) -> Vector3<f32> {
    let (fresnel, refracted_direction) =
        fresnel_and_refraction(direction, normal, material.effect_value);

    if fresnel == 1.0 {
        return reflect(scene, source, location, direction, normal, bounces);
    }

    let refracted = Ray::new(location, refracted_direction);
    let refracted_color = trace(scene, source, &refracted, bounces);
    if fresnel == 0.0 {
        return refracted_color;
    }

    reflect(scene, source, location, direction, normal, bounces) * fresnel
        + refracted_color * (1.0 - fresnel)
}

/// Boolean sun-visibility query: walks from `start` along the sun direction
/// and reports whether any solid voxel occludes the path within render
/// distance. Uses the same stepping rule as `trace` but performs no shading.
pub fn shadow(scene: &Scene, source: Point3<f32>, start: Point3<f32>) -> bool {
    let mut walker = GridWalker::containing_cell(start, scene.sun_direction);
    while (walker.location - source).magnitude() < MAX_TRACE_DISTANCE {
        walker.advance();
        let id = scene
            .world
            .get_voxel(walker.voxel[0], walker.voxel[1], walker.voxel[2])
            .material_id();
        if id != AIR {
            return true;
        }
    }
    false
}

/// Distance from the ray origin to the first solid voxel, if any lies within
/// render distance. Feeds the camera's per-frame autofocus.
pub fn probe_depth(scene: &Scene, ray: &Ray) -> Option<f32> {
    if ray.direction.magnitude2() <= f32::EPSILON {
        return None;
    }
    let direction = ray.direction.normalize();

    let mut walker = GridWalker::new(ray.origin, direction);
    while (walker.location - ray.origin).magnitude() < MAX_TRACE_DISTANCE {
        walker.advance();
        let id = scene
            .world
            .get_voxel(walker.voxel[0], walker.voxel[1], walker.voxel[2])
            .material_id();
        if id != AIR {
            return Some((walker.location - ray.origin).magnitude());
        }
    }
    None
}

/// Fallback color for rays that exit render distance: the componentwise
/// absolute value of the direction. A placeholder gradient, not a sky model.
pub fn skybox(direction: Vector3<f32>) -> Vector3<f32> {
    Vector3::new(direction.x.abs(), direction.y.abs(), direction.z.abs())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::material::{Material, MaterialKind, MaterialTable};
    use crate::engine_state::voxels::world::World;
    use approx::assert_abs_diff_eq;

    fn test_materials() -> MaterialTable {
        MaterialTable::new(vec![
            Material::air(),
            Material::new(MaterialKind::Diffuse, Vector3::new(1.0, 0.0, 0.0), 0.0),
            Material::new(MaterialKind::Reflective, Vector3::new(0.8, 0.3, 0.5), 1.0),
            Material::new(MaterialKind::Refractive, Vector3::new(1.0, 1.0, 1.0), 1.0),
        ])
    }

    fn empty_scene() -> Scene {
        Scene::new(World::new(), test_materials(), Vector3::new(0.0, -1.0, 0.0))
    }

    #[test]
    fn walker_always_advances_by_a_positive_distance() {
        // Start exactly on a grid corner, the worst case for the boundary
        // rule: every crossing distance starts on a boundary.
        let direction = Vector3::new(1.0, 1.0, 1.0).normalize();
        let mut walker = GridWalker::new(Point3::new(0.0, 0.0, 0.0), direction);

        let mut previous = walker.voxel;
        for _ in 0..100 {
            let t = walker.advance();
            assert!(t > 0.0, "crossing distance must be strictly positive");

            let changed: i32 = (0..3)
                .map(|axis| (walker.voxel[axis] - previous[axis]).abs())
                .sum();
            assert_eq!(changed, 1, "exactly one axis steps per crossing");
            previous = walker.voxel;
        }
    }

    #[test]
    fn walker_records_normals_opposing_the_step() {
        let mut walker = GridWalker::new(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::new(1.0, 0.0, 0.0),
        );
        walker.advance();
        assert_eq!(walker.normal, Vector3::new(-1.0, 0.0, 0.0));

        let mut walker = GridWalker::new(
            Point3::new(0.5, 0.5, 0.5),
            Vector3::new(0.0, -1.0, 0.0),
        );
        walker.advance();
        assert_eq!(walker.normal, Vector3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn mirrored_direction_flips_only_the_normal_axis() {
        let direction = Vector3::new(0.3, -0.8, 0.52);
        let mirrored = mirrored_direction(direction, Vector3::new(0.0, 1.0, 0.0));
        assert_eq!(mirrored, Vector3::new(0.3, 0.8, 0.52));
    }

    #[test]
    fn matched_index_refraction_passes_straight_through() {
        let direction = Vector3::new(0.0, -1.0, 0.0);
        let normal = Vector3::new(0.0, 1.0, 0.0);
        let (fresnel, refracted) = fresnel_and_refraction(direction, normal, 1.0);

        // Matched indices reflect nothing at normal incidence.
        assert_abs_diff_eq!(fresnel, 0.0, epsilon = 1e-6);
        assert_abs_diff_eq!(refracted, direction, epsilon = 1e-6);
    }

    #[test]
    fn steep_internal_angle_reflects_totally() {
        // Exiting a dense medium (direction agrees with the normal) at a
        // grazing angle: sint >= 1, everything reflects.
        let direction = Vector3::new(0.95, 0.3122, 0.0).normalize();
        let normal = Vector3::new(0.0, 1.0, 0.0);
        let (fresnel, refracted) = fresnel_and_refraction(direction, normal, 1.5);
        assert_eq!(fresnel, 1.0);
        assert_eq!(refracted, Vector3::zero());
    }

    #[test]
    fn single_voxel_scene_shades_with_the_unclamped_light_term() {
        let mut scene = empty_scene();
        scene.world.set_voxel(0, 0, 0, 1);

        let ray = Ray::new(Point3::new(0.0, 5.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
        let color = trace(&scene, ray.origin, &ray, 5);

        // Sun and surface normal are antiparallel: the raw Lambertian term is
        // -1 and passes through unclamped.
        assert_abs_diff_eq!(color, Vector3::new(-1.0, 0.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn rays_through_empty_space_return_the_skybox_within_bounds() {
        let scene = empty_scene();
        let ray = Ray::new(Point3::new(0.25, 0.25, 0.25), Vector3::new(1.0, 0.0, 0.0));

        let color = trace(&scene, ray.origin, &ray, 5);
        assert_abs_diff_eq!(color, Vector3::new(1.0, 0.0, 0.0), epsilon = 1e-6);

        // The traversal queued at most one pending chunk per chunk crossed.
        assert!(scene.world.pending_count() <= (RENDER_DISTANCE + 1) as usize);
    }

    #[test]
    fn zero_bounce_budget_resolves_to_the_skybox() {
        let mut scene = empty_scene();
        scene.world.set_voxel(0, 0, 0, 1);

        let ray = Ray::new(Point3::new(0.0, 5.0, 0.0), Vector3::new(0.0, -1.0, 0.0));
        let color = trace(&scene, ray.origin, &ray, 0);
        assert_abs_diff_eq!(color, Vector3::new(0.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    fn mirror_voxel_reflects_the_primary_ray() {
        let mut scene = empty_scene();
        // Fully mirrored material (effect value 1) on the floor voxel.
        scene.world.set_voxel(0, 0, 0, 2);

        let ray = Ray::new(Point3::new(0.5, 5.0, 0.5), Vector3::new(0.0, -1.0, 0.0));
        let color = trace(&scene, ray.origin, &ray, 5);

        // The bounce exits straight up into the skybox (0,1,0), scaled by
        // the unclamped light term of -1.
        assert_abs_diff_eq!(color, Vector3::new(0.0, -1.0, 0.0), epsilon = 1e-5);
    }

    #[test]
    fn shadow_detects_an_occluder_along_the_sun_direction() {
        let mut scene = empty_scene();
        scene.world.set_voxel(0, -3, 0, 1);

        let start = Point3::new(0.5, 0.5, 0.5);
        assert!(shadow(&scene, start, start));

        let clear = empty_scene();
        assert!(!shadow(&clear, start, start));
    }

    #[test]
    fn probe_depth_reports_the_hit_distance() {
        let mut scene = empty_scene();
        scene.world.set_voxel(0, 0, 0, 1);

        let ray = Ray::new(Point3::new(0.5, 5.0, 0.5), Vector3::new(0.0, -1.0, 0.0));
        let depth = probe_depth(&scene, &ray).expect("probe should hit the voxel");
        assert_abs_diff_eq!(depth, 5.0, epsilon = 1e-4);

        let miss = Ray::new(Point3::new(0.5, 5.0, 0.5), Vector3::new(0.0, 1.0, 0.0));
        assert!(probe_depth(&scene, &miss).is_none());
    }
}

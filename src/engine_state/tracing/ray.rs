//! The ray primitive shared by the camera and the traversal engine.

use cgmath::{Point3, Vector3};

/// An (origin, direction) pair.
///
/// The direction is not required to be unit length here; the traversal engine
/// normalizes it on entry and treats a near-zero direction as an immediate
/// miss.
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    /// The point the ray starts from.
    pub origin: Point3<f32>,
    /// The direction the ray travels in.
    pub direction: Vector3<f32>,
}

impl Ray {
    /// Creates a new ray.
    pub fn new(origin: Point3<f32>, direction: Vector3<f32>) -> Self {
        Ray { origin, direction }
    }
}

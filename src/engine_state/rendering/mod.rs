//! # Rendering Module
//!
//! The CPU render pass: iterates the pixel grid, obtains one perspective ray
//! per pixel from the camera, traces it through the scene, and packs the
//! resulting color into an RGBA framebuffer.
//!
//! ## Parallelism
//!
//! Every pixel trace is independent, so the framebuffer is split into rows
//! and rendered with rayon. The only shared mutation during a pass is the
//! world's pending-allocation queue, which the world serializes internally;
//! pixel completion order does not affect the image.

use cgmath::Vector3;
use rayon::prelude::*;

use super::camera_state::Camera;
use super::tracing;
use super::voxels::scene::Scene;

pub mod blit;
pub mod screenshot;

/// A CPU-side RGBA8 pixel buffer, rows stored top to bottom.
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl Framebuffer {
    /// Creates a black, fully opaque framebuffer.
    pub fn new(width: u32, height: u32) -> Self {
        let mut pixels = vec![0u8; (width * height * 4) as usize];
        for alpha in pixels.iter_mut().skip(3).step_by(4) {
            *alpha = 255;
        }
        Framebuffer {
            width,
            height,
            pixels,
        }
    }

    /// Buffer width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Buffer height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Width divided by height.
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height as f32
    }

    /// The raw RGBA bytes, row-major from the top-left pixel.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The RGBA bytes of the pixel at (x, y), with y counting down from the
    /// top row.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let offset = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[offset],
            self.pixels[offset + 1],
            self.pixels[offset + 2],
            self.pixels[offset + 3],
        ]
    }
}

/// Packs a traced color into RGBA8. Components clamp into [0, 1] before
/// scaling, which is where negative shading values floor to black.
fn pack_color(color: Vector3<f32>) -> [u8; 4] {
    let to_byte = |component: f32| (component.clamp(0.0, 1.0) * 255.99) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z), 255]
}

/// The data-parallel pixel-grid renderer.
pub struct Renderer {
    /// Recursion budget handed to every primary ray.
    pub max_bounces: u32,
}

impl Renderer {
    /// Creates a renderer with the given bounce budget.
    pub fn new(max_bounces: u32) -> Self {
        Renderer { max_bounces }
    }

    /// Renders one full pass of the pixel grid into `frame`.
    ///
    /// Screen coordinates map with (0, 0) at the lower-left viewport corner,
    /// so the top framebuffer row samples t close to 1. The camera must have
    /// been prepared by the caller.
    pub fn render(&self, scene: &Scene, camera: &Camera, frame: &mut Framebuffer) {
        let width = frame.width as usize;
        let width_step = 1.0 / frame.width as f32;
        let height_step = 1.0 / frame.height as f32;
        let max_bounces = self.max_bounces;

        frame
            .pixels
            .par_chunks_mut(width * 4)
            .enumerate()
            .for_each(|(row, row_pixels)| {
                let t = 1.0 - (row as f32 + 0.5) * height_step;
                for (column, pixel) in row_pixels.chunks_exact_mut(4).enumerate() {
                    let s = (column as f32 + 0.5) * width_step;
                    let ray = camera.get_ray(s, t);
                    let color = tracing::trace(scene, camera.position, &ray, max_bounces);
                    pixel.copy_from_slice(&pack_color(color));
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::material::{Material, MaterialKind, MaterialTable};
    use crate::engine_state::voxels::world::World;
    use cgmath::{Deg, InnerSpace, Point3};

    #[test]
    fn pack_color_clamps_and_scales() {
        assert_eq!(pack_color(Vector3::new(0.0, 0.5, 1.0)), [0, 127, 255, 255]);
        assert_eq!(pack_color(Vector3::new(-1.0, 2.0, 0.0)), [0, 255, 0, 255]);
    }

    #[test]
    fn render_fills_every_pixel_from_the_scene() {
        let materials = MaterialTable::new(vec![
            Material::air(),
            Material::new(MaterialKind::Diffuse, Vector3::new(1.0, 0.0, 0.0), 0.0),
        ]);
        let mut scene = Scene::new(World::new(), materials, Vector3::new(0.0, 1.0, 0.0));
        // Solid slab below the camera so every ray hits a lit top face.
        for x in -32..32 {
            for z in -32..32 {
                scene.world.set_voxel(x, 0, z, 1);
            }
        }

        let mut camera = Camera::new(
            Point3::new(0.0, 8.0, 0.0),
            Vector3::unit_y(),
            Deg(50.0),
            1.0,
            0.1,
            8.0,
        );
        camera.prepare(Vector3::new(0.0, -1.0, 0.0).normalize());

        let renderer = Renderer::new(5);
        let mut frame = Framebuffer::new(16, 16);
        renderer.render(&scene, &camera, &mut frame);

        // Sun points up, top-face normals point up: light is +1, so every
        // pixel carries the full red albedo.
        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(frame.pixel(x, y), [255, 0, 0, 255]);
            }
        }
    }
}

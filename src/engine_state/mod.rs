//! # Engine State Module
//!
//! The core engine module: owns the scene, camera, renderer, and the GPU
//! resources that present the traced framebuffer.
//!
//! ## Key Components
//!
//! * `EngineState` - The main state container, driven once per redraw
//! * `camera_state` - Perspective ray generation
//! * `config` - Startup configuration
//! * `rendering` - The CPU render pass, screenshots, and the surface blit
//! * `tracing` - DDA traversal and recursive shading
//! * `voxels` - Materials, chunks, the world pool, and the scene context
//!
//! ## Frame Loop
//!
//! Each frame runs: chunk streaming (the only point where world residency
//! changes), input-driven camera movement, center-ray autofocus, the
//! data-parallel trace pass, and finally the upload/blit to the surface.
//! A screenshot request inserts one extra high-resolution pass before the
//! next frame.

use cgmath::{Deg, InnerSpace, Matrix3, Vector3};
use log::{error, info, warn};
use web_time::{Duration, Instant};
use winit::dpi::PhysicalSize;
use winit::keyboard::KeyCode;

use crate::application_state::input_state::InputState;
use camera_state::Camera;
use config::TracerConfig;
use rendering::blit::FrameBlitter;
use rendering::{screenshot, Framebuffer, Renderer};
use voxels::scene::Scene;
use voxels::world::World;

pub mod camera_state;
pub mod config;
pub mod rendering;
pub mod tracing;
pub mod voxels;

/// Camera translation speed in world units per second.
const MOVE_SPEED: f32 = 6.0;
/// Camera rotation speed in degrees per second.
const TURN_SPEED: f32 = 60.0;
/// Lower bound for the autofocus distance, so a hit right in front of the
/// lens cannot collapse the viewport extents.
const MIN_FOCUS_DISTANCE: f32 = 0.5;

/// The main state container for the tracer.
pub struct EngineState {
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: wgpu::Device,
    queue: wgpu::Queue,
    blitter: FrameBlitter,
    frame: Framebuffer,
    renderer: Renderer,
    camera: Camera,
    view_direction: Vector3<f32>,
    scene: Scene,
    config: TracerConfig,
}

impl EngineState {
    /// Builds the engine around already-initialized graphics resources.
    ///
    /// Loads the configuration, seeds the demo scene, and prepares the
    /// camera so the first frame can render immediately.
    pub fn new(
        surface: wgpu::Surface<'static>,
        surface_config: wgpu::SurfaceConfiguration,
        device: wgpu::Device,
        queue: wgpu::Queue,
    ) -> Self {
        let config = TracerConfig::load(std::path::Path::new(config::CONFIG_FILE));

        let mut scene = Scene::new(
            World::new(),
            config.material_table(),
            config.sun_direction(),
        );
        scene.seed_demo(config.scene_seed);
        info!(
            "Scene seeded, {} chunks resident",
            scene.world.resident_count()
        );

        let frame = Framebuffer::new(config.width, config.height);
        let view_direction = config.view_direction();
        let mut camera = Camera::new(
            config.camera_position(),
            Vector3::unit_y(),
            Deg(config.fov),
            frame.aspect(),
            config.aperture,
            10.0,
        );
        camera.prepare(view_direction);

        let blitter = FrameBlitter::new(
            &device,
            surface_config.format,
            config.width,
            config.height,
        );

        EngineState {
            surface,
            surface_config,
            device,
            queue,
            blitter,
            frame,
            renderer: Renderer::new(config.max_bounces),
            camera,
            view_direction,
            scene,
            config,
        }
    }

    /// Reconfigures the surface after a window resize. The framebuffer keeps
    /// its configured resolution; the blit stretches it over the surface.
    pub fn resize_surface(&mut self, size: PhysicalSize<u32>) {
        if size.width == 0 || size.height == 0 {
            return;
        }
        self.surface_config.width = size.width;
        self.surface_config.height = size.height;
        self.surface.configure(&self.device, &self.surface_config);
    }

    /// Runs one frame: streams pending chunks, applies input, refocuses,
    /// traces the pixel grid, and presents the result.
    pub fn update_and_render(&mut self, input: &InputState, dt: Duration) {
        // Residency may only change here, between trace passes.
        self.scene.world.load_chunks();

        self.apply_camera_input(input, dt);

        // Autofocus on whatever the center ray hits, using the basis from
        // the previous prepare.
        if let Some(depth) = tracing::probe_depth(&self.scene, &self.camera.get_ray(0.5, 0.5)) {
            self.camera.focus_distance = depth.max(MIN_FOCUS_DISTANCE);
        }
        self.camera.prepare(self.view_direction);

        let started = Instant::now();
        self.renderer
            .render(&self.scene, &self.camera, &mut self.frame);
        info!(
            "Rendering the frame took {} ms",
            started.elapsed().as_millis()
        );

        self.present();

        if input.is_just_pressed(KeyCode::KeyQ) {
            self.capture_screenshot();
        }
    }

    /// Moves and rotates the camera from the held keys.
    fn apply_camera_input(&mut self, input: &InputState, dt: Duration) {
        let dt = dt.as_secs_f32();
        let forward = self.view_direction.normalize();
        let mut right = forward.cross(Vector3::unit_y());
        if right.magnitude2() <= f32::EPSILON {
            right = Vector3::unit_x();
        }
        let right = right.normalize();

        let mut translation = Vector3::new(0.0, 0.0, 0.0);
        if input.is_active(KeyCode::KeyW) {
            translation += forward;
        }
        if input.is_active(KeyCode::KeyS) {
            translation -= forward;
        }
        if input.is_active(KeyCode::KeyD) {
            translation += right;
        }
        if input.is_active(KeyCode::KeyA) {
            translation -= right;
        }
        if input.is_active(KeyCode::Space) {
            translation += Vector3::unit_y();
        }
        if input.is_active(KeyCode::ShiftLeft) {
            translation -= Vector3::unit_y();
        }
        self.camera.position += translation * MOVE_SPEED * dt;

        let turn = Deg(TURN_SPEED * dt);
        if input.is_active(KeyCode::ArrowLeft) {
            self.view_direction = Matrix3::from_angle_y(turn) * self.view_direction;
        }
        if input.is_active(KeyCode::ArrowRight) {
            self.view_direction = Matrix3::from_angle_y(-turn) * self.view_direction;
        }
        if input.is_active(KeyCode::ArrowUp) {
            self.view_direction = Matrix3::from_axis_angle(right, turn) * self.view_direction;
        }
        if input.is_active(KeyCode::ArrowDown) {
            self.view_direction = Matrix3::from_axis_angle(right, -turn) * self.view_direction;
        }
    }

    /// Uploads the framebuffer and blits it onto the surface.
    fn present(&mut self) {
        let surface_texture = match self.surface.get_current_texture() {
            Ok(texture) => texture,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                warn!("Surface lost or outdated, reconfiguring");
                self.surface.configure(&self.device, &self.surface_config);
                return;
            }
            Err(wgpu::SurfaceError::Timeout) => {
                warn!("Timed out acquiring a surface texture, skipping this frame");
                return;
            }
            Err(err) => {
                error!("Failed to acquire a surface texture: {}", err);
                return;
            }
        };

        self.blitter.upload(&self.queue, &self.frame);

        let view = surface_texture
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Frame Blit Encoder"),
            });
        self.blitter.draw(&mut encoder, &view);
        self.queue.submit(std::iter::once(encoder.finish()));
        surface_texture.present();
    }

    /// Renders a second, higher-resolution pass and writes it to a PNG.
    fn capture_screenshot(&mut self) {
        let mut shot = Framebuffer::new(self.config.screenshot_width, self.config.screenshot_height);

        // Re-prepare for the screenshot aspect ratio, then restore.
        self.camera.set_aspect(shot.aspect());
        self.camera.prepare(self.view_direction);

        let started = Instant::now();
        self.renderer.render(&self.scene, &self.camera, &mut shot);
        info!(
            "Rendering the screenshot took {} ms",
            started.elapsed().as_millis()
        );

        screenshot::write_png(
            &shot,
            std::path::Path::new(&screenshot::timestamped_filename()),
        );

        self.camera.set_aspect(self.frame.aspect());
        self.camera.prepare(self.view_direction);
    }
}

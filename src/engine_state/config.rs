//! # Configuration Module
//!
//! Startup configuration for the tracer, loaded from an optional JSON file.
//! A missing or malformed file logs a warning and falls back to compiled
//! defaults, so the binary always starts.

use std::path::Path;

use cgmath::Vector3;
use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::voxels::material::{Material, MaterialKind, MaterialTable};

/// The config file looked up next to the working directory.
pub const CONFIG_FILE: &str = "tracer.json";

/// One material table entry as it appears in the config file.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MaterialConfig {
    /// The shading branch for this material.
    pub kind: MaterialKind,
    /// Surface color as an RGB triple, components in [0, 1].
    pub albedo: [f32; 3],
    /// Reflective blend weight or refractive index, depending on `kind`.
    pub effect_value: f32,
}

impl MaterialConfig {
    fn to_material(&self) -> Material {
        Material::new(
            self.kind,
            Vector3::new(self.albedo[0], self.albedo[1], self.albedo[2]),
            self.effect_value,
        )
    }
}

/// Everything the engine reads at startup.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct TracerConfig {
    /// Interactive framebuffer width in pixels.
    pub width: u32,
    /// Interactive framebuffer height in pixels.
    pub height: u32,
    /// Screenshot pass width in pixels.
    pub screenshot_width: u32,
    /// Screenshot pass height in pixels.
    pub screenshot_height: u32,
    /// Vertical field of view in degrees.
    pub fov: f32,
    /// Lens aperture diameter.
    pub aperture: f32,
    /// Recursion budget for reflection and refraction.
    pub max_bounces: u32,
    /// Initial camera position.
    pub camera_position: [f32; 3],
    /// Initial view direction.
    pub view_direction: [f32; 3],
    /// Direction the sun shines along.
    pub sun_direction: [f32; 3],
    /// Seed for the demo scene scatter.
    pub scene_seed: u64,
    /// The material table, id order. Entry 0 is always forced to air.
    pub materials: Vec<MaterialConfig>,
}

impl Default for TracerConfig {
    fn default() -> Self {
        TracerConfig {
            width: 640,
            height: 360,
            screenshot_width: 1920,
            screenshot_height: 1080,
            fov: 50.0,
            aperture: 0.1,
            max_bounces: 5,
            camera_position: [8.0, 6.0, 14.0],
            view_direction: [-3.0, -2.0, -8.0],
            sun_direction: [-0.4, -1.0, -0.2],
            scene_seed: 7,
            materials: vec![
                MaterialConfig {
                    kind: MaterialKind::Empty,
                    albedo: [0.0, 0.0, 0.0],
                    effect_value: 0.0,
                },
                MaterialConfig {
                    kind: MaterialKind::Diffuse,
                    albedo: [0.3, 0.5, 0.8],
                    effect_value: 0.0,
                },
                MaterialConfig {
                    kind: MaterialKind::Reflective,
                    albedo: [0.8, 0.3, 0.5],
                    effect_value: 0.3,
                },
                MaterialConfig {
                    kind: MaterialKind::Refractive,
                    albedo: [0.5, 0.8, 0.3],
                    effect_value: 1.5,
                },
            ],
        }
    }
}

impl TracerConfig {
    /// Loads the config from `path`, falling back to defaults when the file
    /// is absent or does not parse.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    info!("Loaded configuration from {}", path.display());
                    config
                }
                Err(err) => {
                    warn!(
                        "Failed to parse {}, using default configuration: {}",
                        path.display(),
                        err
                    );
                    TracerConfig::default()
                }
            },
            Err(_) => {
                info!(
                    "No configuration file at {}, using defaults",
                    path.display()
                );
                TracerConfig::default()
            }
        }
    }

    /// Builds the material table from the configured entries.
    pub fn material_table(&self) -> MaterialTable {
        MaterialTable::new(self.materials.iter().map(MaterialConfig::to_material).collect())
    }

    /// The configured camera position as a point.
    pub fn camera_position(&self) -> cgmath::Point3<f32> {
        cgmath::Point3::new(
            self.camera_position[0],
            self.camera_position[1],
            self.camera_position[2],
        )
    }

    /// The configured view direction as a vector.
    pub fn view_direction(&self) -> Vector3<f32> {
        Vector3::new(
            self.view_direction[0],
            self.view_direction[1],
            self.view_direction[2],
        )
    }

    /// The configured sun direction as a vector.
    pub fn sun_direction(&self) -> Vector3<f32> {
        Vector3::new(
            self.sun_direction[0],
            self.sun_direction[1],
            self.sun_direction[2],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let config = TracerConfig::load(Path::new("definitely-not-here.json"));
        assert_eq!(config.width, 640);
        assert_eq!(config.max_bounces, 5);
        assert_eq!(config.materials.len(), 4);
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = TracerConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TracerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.height, config.height);
        assert_eq!(parsed.sun_direction, config.sun_direction);
        assert_eq!(parsed.materials.len(), config.materials.len());
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let parsed: TracerConfig = serde_json::from_str(r#"{ "width": 320 }"#).unwrap();
        assert_eq!(parsed.width, 320);
        assert_eq!(parsed.height, 360);
    }

    #[test]
    fn material_table_preserves_configured_order() {
        let table = TracerConfig::default().material_table();
        assert_eq!(table.len(), 4);
        assert_eq!(table.resolve(3).kind, MaterialKind::Refractive);
        assert!((table.resolve(3).effect_value - 1.5).abs() < f32::EPSILON);
    }
}

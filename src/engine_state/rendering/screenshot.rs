//! PNG encoding for captured frames.
//!
//! The renderer hands a finished framebuffer over; this module only packages
//! the bytes and writes them to disk. Failures are logged, never fatal.

use std::path::Path;

use image::RgbaImage;
use log::{error, info};

use super::Framebuffer;

/// Encodes `frame` as a PNG at `path`.
///
/// Returns whether the file was written; encoding and I/O errors are logged.
pub fn write_png(frame: &Framebuffer, path: &Path) -> bool {
    let Some(image) = RgbaImage::from_raw(frame.width(), frame.height(), frame.pixels().to_vec())
    else {
        error!(
            "Framebuffer byte count does not match its {}x{} dimensions",
            frame.width(),
            frame.height()
        );
        return false;
    };

    match image.save(path) {
        Ok(()) => {
            info!("Saved screenshot to {}", path.display());
            true
        }
        Err(err) => {
            error!("Failed to save screenshot to {}: {}", path.display(), err);
            false
        }
    }
}

/// A filename of the form `screenshot-<unix seconds>.png`.
pub fn timestamped_filename() -> String {
    let seconds = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    format!("screenshot-{}.png", seconds)
}

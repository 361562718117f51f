//! Best-effort thumbnail generation.
//!
//! Thumbnails are a convenience for the serving layer, never a correctness
//! requirement: every failure degrades to [`ThumbOutcome::Failed`] and the
//! crawl carries on. Generation is idempotent — an existing thumbnail is
//! left untouched.

use std::io::{BufWriter, Write};
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

use crate::config::ThumbOptions;

/// Result of a thumbnail generation attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThumbOutcome {
    /// A new thumbnail was written.
    Created,
    /// A thumbnail already existed at the target path.
    AlreadyExists,
    /// Generation failed; no usable thumbnail was produced.
    Failed {
        /// Human-readable failure description.
        reason: String,
    },
}

/// Generates a JPEG thumbnail for `source` at `thumb_path`.
///
/// The source image is flattened onto an opaque background if it carries
/// transparency, resized to fit within the configured bounding box without
/// upscaling (Lanczos3), and encoded at the configured JPEG quality.
///
/// This is a synchronous, CPU-bound function; async callers should run it
/// through `spawn_blocking`.
#[must_use]
pub fn generate(source: &Path, thumb_path: &Path, options: &ThumbOptions) -> ThumbOutcome {
    if thumb_path.exists() {
        return ThumbOutcome::AlreadyExists;
    }

    let img = match image::open(source) {
        Ok(img) => img,
        Err(e) => return failed(format!("decode {}: {e}", source.display())),
    };

    let flattened = flatten_alpha(img, options.background);
    let resized = fit_within(flattened, options.max_width, options.max_height);

    let file = match std::fs::File::create(thumb_path) {
        Ok(file) => file,
        Err(e) => return failed(format!("create {}: {e}", thumb_path.display())),
    };
    let mut writer = BufWriter::new(file);

    let encoder = JpegEncoder::new_with_quality(&mut writer, options.quality);
    if let Err(e) = resized.write_with_encoder(encoder) {
        drop(writer);
        let _ = std::fs::remove_file(thumb_path);
        return failed(format!("encode {}: {e}", thumb_path.display()));
    }

    if let Err(e) = writer.flush() {
        drop(writer);
        let _ = std::fs::remove_file(thumb_path);
        return failed(format!("flush {}: {e}", thumb_path.display()));
    }

    ThumbOutcome::Created
}

fn failed(reason: String) -> ThumbOutcome {
    ThumbOutcome::Failed { reason }
}

/// Composites an image with transparency onto an opaque RGB background;
/// opaque images convert directly.
fn flatten_alpha(img: DynamicImage, background: [u8; 3]) -> RgbImage {
    if !img.color().has_alpha() {
        return img.into_rgb8();
    }

    let rgba = img.into_rgba8();
    let (width, height) = rgba.dimensions();
    let mut canvas = RgbImage::from_pixel(width, height, Rgb(background));
    for (x, y, pixel) in rgba.enumerate_pixels() {
        let alpha = u32::from(pixel[3]);
        if alpha == 0 {
            continue;
        }
        let out = canvas.get_pixel_mut(x, y);
        for channel in 0..3 {
            let fg = u32::from(pixel[channel]);
            let bg = u32::from(out[channel]);
            // Rounded integer alpha blend over the opaque background.
            #[allow(clippy::cast_possible_truncation)]
            {
                out[channel] = ((fg * alpha + bg * (255 - alpha) + 127) / 255) as u8;
            }
        }
    }
    canvas
}

/// Shrinks the image to fit within `max_width` x `max_height`, preserving
/// aspect ratio. Images already inside the box are returned unchanged.
fn fit_within(img: RgbImage, max_width: u32, max_height: u32) -> RgbImage {
    let (width, height) = img.dimensions();
    if width <= max_width && height <= max_height {
        return img;
    }
    DynamicImage::ImageRgb8(img)
        .resize(max_width, max_height, FilterType::Lanczos3)
        .into_rgb8()
}

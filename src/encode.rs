//! Encoding a [`PixelBuffer`] back to GIF, JPEG, or PNG.
//!
//! Format selection mirrors the decode side's distrust of extensions where
//! it can: when the target file already exists its real format is sniffed
//! from its header and reused (then the stale file is deleted); only for
//! brand-new targets does the extension decide, with PNG as the default.
//!
//! Write failures are expected/environmental and surface as `false` or
//! `None`, never as errors — consistent with the decode side.

use std::fs::File;
use std::io::{BufWriter, Read};
use std::path::Path;

use image::codecs::gif::GifEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, Frame, ImageEncoder, ImageFormat, RgbaImage};
use thiserror::Error;

use crate::buffer::PixelBuffer;

/// The raster formats this engine writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    Gif,
    Jpeg,
    Png,
}

impl RasterFormat {
    /// Infer from a target path's extension. Anything unrecognized
    /// defaults to PNG.
    pub fn from_extension(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        match ext.as_str() {
            "gif" => Self::Gif,
            "jpg" | "jpeg" | "jpe" => Self::Jpeg,
            _ => Self::Png,
        }
    }

    /// Sniff from leading file content. `None` when the content is not
    /// one of the three supported formats.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        match image::guess_format(bytes).ok()? {
            ImageFormat::Gif => Some(Self::Gif),
            ImageFormat::Jpeg => Some(Self::Jpeg),
            ImageFormat::Png => Some(Self::Png),
            _ => None,
        }
    }
}

/// The persistent asset-store collaborator: takes a finished local file
/// and moves it into external storage under a content address.
pub trait AssetStore {
    type Receipt;

    fn set_from_local_file(
        &self,
        local_path: &Path,
        filename: &str,
        content_hash: &str,
        variant: &str,
    ) -> Option<Self::Receipt>;
}

#[derive(Debug, Error)]
enum EncodeFailure {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("encode failed: {0}")]
    Encode(#[from] image::ImageError),
    #[error("png encode failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("gif encode failed: {0}")]
    Gif(#[from] gif::EncodingError),
    #[error("dimensions {width}x{height} exceed the GIF limit")]
    OversizedGif { width: u32, height: u32 },
}

/// Sniff the format of an already-existing target file, reading only its
/// header.
fn sniff_existing(target: &Path) -> Option<RasterFormat> {
    let mut file = File::open(target).ok()?;
    let mut head = [0u8; 64];
    let read = file.read(&mut head).ok()?;
    RasterFormat::sniff(&head[..read])
}

/// PNG with Adam7 interlacing. The `image` wrapper exposes no interlace
/// knob, so this drops to the `png` crate directly.
fn write_interlaced_png<W: std::io::Write>(
    pixels: &RgbaImage,
    writer: W,
) -> Result<(), EncodeFailure> {
    let mut encoder = png::Encoder::new(writer, pixels.width(), pixels.height());
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_adam7(true);
    let mut writer = encoder.write_header()?;
    writer.write_image_data(pixels.as_raw())?;
    Ok(())
}

/// GIF with the interlace flag set on the image descriptor, via the `gif`
/// crate directly.
fn write_interlaced_gif<W: std::io::Write>(
    pixels: &RgbaImage,
    writer: W,
) -> Result<(), EncodeFailure> {
    let (width, height) = match (u16::try_from(pixels.width()), u16::try_from(pixels.height())) {
        (Ok(w), Ok(h)) => (w, h),
        _ => {
            return Err(EncodeFailure::OversizedGif {
                width: pixels.width(),
                height: pixels.height(),
            });
        }
    };
    let mut data = pixels.as_raw().clone();
    let mut frame = gif::Frame::from_rgba(width, height, &mut data);
    frame.interlaced = true;
    let mut encoder = gif::Encoder::new(writer, width, height, &[])?;
    encoder.write_frame(&frame)?;
    Ok(())
}

fn write_pixels(
    pixels: &RgbaImage,
    format: RasterFormat,
    quality: u8,
    interlace: bool,
    target: &Path,
) -> Result<(), EncodeFailure> {
    let writer = BufWriter::new(File::create(target)?);
    match format {
        RasterFormat::Png if interlace => write_interlaced_png(pixels, writer)?,
        RasterFormat::Png => {
            PngEncoder::new(writer).write_image(
                pixels.as_raw(),
                pixels.width(),
                pixels.height(),
                ExtendedColorType::Rgba8,
            )?;
        }
        RasterFormat::Jpeg => {
            // JPEG carries no alpha; flatten to RGB for the codec.
            let rgb = DynamicImage::ImageRgba8(pixels.clone()).to_rgb8();
            JpegEncoder::new_with_quality(writer, quality).write_image(
                rgb.as_raw(),
                rgb.width(),
                rgb.height(),
                ExtendedColorType::Rgb8,
            )?;
        }
        RasterFormat::Gif if interlace => write_interlaced_gif(pixels, writer)?,
        RasterFormat::Gif => {
            let mut encoder = GifEncoder::new(writer);
            encoder.encode_frame(Frame::new(pixels.clone()))?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn set_world_readable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)) {
        log::debug!("could not set permissions on {}: {e}", path.display());
    }
}

#[cfg(not(unix))]
fn set_world_readable(_path: &Path) {}

impl PixelBuffer {
    /// Encode this buffer to `target`. Returns `false` when the buffer is
    /// empty or the write fails.
    ///
    /// If a file already exists at `target` its sniffed format wins over
    /// the extension and the stale file is deleted first. JPEG honors the
    /// buffer's quality; GIF and PNG ignore it. The interlace flag
    /// produces Adam7 PNG and interlaced GIF output; the JPEG encoder has
    /// no progressive mode, so the flag is ignored there. Written files
    /// get world-readable permissions on a best-effort basis.
    pub fn write_to(&self, target: &Path) -> bool {
        let Some(pixels) = self.pixels() else {
            log::debug!("write skipped, buffer holds no storage");
            return false;
        };
        let format = match sniff_existing(target) {
            Some(existing) => {
                if let Err(e) = std::fs::remove_file(target) {
                    log::warn!("could not remove stale {}: {e}", target.display());
                    return false;
                }
                existing
            }
            None => RasterFormat::from_extension(target),
        };
        if self.interlace() && format == RasterFormat::Jpeg {
            log::debug!(
                "interlaced output requested for {} but the JPEG encoder has no progressive mode",
                target.display()
            );
        }
        if let Err(e) = write_pixels(pixels, format, self.quality().value(), self.interlace(), target)
        {
            log::warn!("write to {} failed: {e}", target.display());
            return false;
        }
        if !target.exists() {
            log::warn!("write to {} reported success but left no file", target.display());
            return false;
        }
        set_world_readable(target);
        true
    }

    /// Encode to a temporary local file named like `filename` (so
    /// extension-based format inference applies) and hand it to the store
    /// collaborator. The temporary file is deleted unconditionally
    /// afterwards. Returns the collaborator's receipt, or `None` when the
    /// local write failed — in which case the collaborator is never
    /// invoked.
    pub fn write_to_store<S: AssetStore>(
        &self,
        store: &S,
        filename: &str,
        content_hash: &str,
        variant: &str,
    ) -> Option<S::Receipt> {
        let dir = match tempfile::tempdir() {
            Ok(dir) => dir,
            Err(e) => {
                log::warn!("could not create temp dir for store write: {e}");
                return None;
            }
        };
        // Strip any directory components a hostile filename might carry.
        let local_name = Path::new(filename)
            .file_name()
            .map(|n| n.to_owned())
            .unwrap_or_else(|| "image.png".into());
        let local_path = dir.path().join(local_name);
        if !self.write_to(&local_path) {
            return None;
        }
        store.set_from_local_file(&local_path, filename, content_hash, variant)
        // `dir` drops here, removing the temporary file.
    }
}

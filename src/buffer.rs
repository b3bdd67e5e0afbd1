//! The pixel buffer: one decoded raster image plus its encode settings.
//!
//! A [`PixelBuffer`] exclusively owns its pixel storage. Transforms consume
//! the buffer and hand back a new one, so storage is never shared between a
//! source and a derived image; release happens exactly once, on every exit
//! path, when the owning buffer drops. A buffer with no storage reports
//! `0 × 0` and every transform on it is a no-op that returns another empty
//! buffer — absence is a state, not an error.

use image::RgbaImage;

use crate::config::EngineConfig;

/// Quality setting for lossy image encoding (0–100). Clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// One decoded raster image.
///
/// Pixels are stored as straight (non-premultiplied) RGBA8 so per-pixel
/// alpha survives the whole pipeline unmodified. Scalar metadata (quality,
/// interlace, alpha capability) is copied onto every buffer derived from
/// this one.
#[derive(Debug, Clone)]
pub struct PixelBuffer {
    storage: Option<RgbaImage>,
    quality: Quality,
    interlace: bool,
    has_alpha: bool,
}

impl PixelBuffer {
    /// An empty buffer carrying the config's quality and interlace
    /// settings. Settings are read here, at reset time, and never re-read
    /// mid-chain.
    pub fn empty(config: &EngineConfig) -> Self {
        Self {
            storage: None,
            quality: Quality::new(config.default_quality),
            interlace: config.image_interlace,
            has_alpha: false,
        }
    }

    /// Wrap freshly decoded pixels. `has_alpha` records whether the source
    /// format carried an alpha channel (the storage is always RGBA8).
    pub fn from_decoded(pixels: RgbaImage, has_alpha: bool, config: &EngineConfig) -> Self {
        Self {
            storage: Some(pixels),
            quality: Quality::new(config.default_quality),
            interlace: config.image_interlace,
            has_alpha,
        }
    }

    /// Derive a buffer holding `pixels`, inheriting this buffer's scalar
    /// metadata. This is the one way transforms produce their results.
    pub(crate) fn derive(&self, pixels: RgbaImage) -> Self {
        Self {
            storage: Some(pixels),
            quality: self.quality,
            interlace: self.interlace,
            has_alpha: self.has_alpha,
        }
    }

    pub fn width(&self) -> u32 {
        self.storage.as_ref().map_or(0, |s| s.width())
    }

    pub fn height(&self) -> u32 {
        self.storage.as_ref().map_or(0, |s| s.height())
    }

    /// Whether this buffer currently holds pixel storage.
    pub fn has_storage(&self) -> bool {
        self.storage.is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_none()
    }

    pub fn quality(&self) -> Quality {
        self.quality
    }

    pub fn set_quality(&mut self, quality: Quality) {
        self.quality = quality;
    }

    pub fn interlace(&self) -> bool {
        self.interlace
    }

    pub fn set_interlace(&mut self, interlace: bool) {
        self.interlace = interlace;
    }

    /// Whether the decoded source format was alpha-capable.
    pub fn has_alpha(&self) -> bool {
        self.has_alpha
    }

    /// Borrow the pixel storage, if any.
    pub fn pixels(&self) -> Option<&RgbaImage> {
        self.storage.as_ref()
    }

    /// Take the pixel storage out, leaving the buffer empty.
    pub(crate) fn take_pixels(&mut self) -> Option<RgbaImage> {
        self.storage.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 0);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(200).value(), 100);
    }

    #[test]
    fn quality_default_is_75() {
        assert_eq!(Quality::default().value(), 75);
    }

    #[test]
    fn empty_buffer_reports_zero_dimensions() {
        let buf = PixelBuffer::empty(&EngineConfig::default());
        assert!(buf.is_empty());
        assert_eq!(buf.width(), 0);
        assert_eq!(buf.height(), 0);
        assert!(!buf.has_alpha());
    }

    #[test]
    fn empty_buffer_reads_config_at_reset_time() {
        let config = EngineConfig {
            default_quality: 40,
            image_interlace: true,
            ..EngineConfig::default()
        };
        let buf = PixelBuffer::empty(&config);
        assert_eq!(buf.quality().value(), 40);
        assert!(buf.interlace());
    }

    #[test]
    fn derive_copies_scalar_metadata() {
        let config = EngineConfig {
            default_quality: 55,
            image_interlace: true,
            ..EngineConfig::default()
        };
        let pixels = RgbaImage::from_pixel(4, 3, Rgba([1, 2, 3, 255]));
        let buf = PixelBuffer::from_decoded(pixels, true, &config);

        let derived = buf.derive(RgbaImage::new(2, 2));
        assert_eq!(derived.quality().value(), 55);
        assert!(derived.interlace());
        assert!(derived.has_alpha());
        assert_eq!(derived.width(), 2);
    }

    #[test]
    fn clone_does_not_share_storage() {
        let config = EngineConfig::default();
        let buf = PixelBuffer::from_decoded(RgbaImage::new(2, 2), false, &config);
        let cloned = buf.clone();
        let a = buf.pixels().unwrap().as_raw().as_ptr();
        let b = cloned.pixels().unwrap().as_raw().as_ptr();
        assert_ne!(a, b);
    }
}

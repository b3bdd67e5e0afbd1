//! Geometry and color transforms on [`PixelBuffer`].
//!
//! Every operation consumes the buffer and returns a new one; storage is
//! never shared or mutated in place. Two rules hold across the whole
//! family:
//!
//! - An empty buffer in means an empty buffer out, reported as `Ok` —
//!   absence of pixels is expected state, not an error.
//! - Nonsensical target dimensions (zero, negative, NaN) are caller bugs
//!   and come back as [`TransformError`], distinct from environmental
//!   failures elsewhere in the engine.
//!
//! Unchanged-dimension requests short-circuit and hand back the very same
//! buffer without touching its storage, so `resize` to the current size
//! costs nothing.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use thiserror::Error;

use crate::buffer::PixelBuffer;
use crate::color::{parse_hex_color, LumaWeights, ParseColorError};
use crate::geometry::{aspect_height, aspect_width, cover_crop_rect, pad_dest_rect, round_dimension};

#[derive(Debug, Error, PartialEq)]
pub enum TransformError {
    /// Zero, negative, or NaN target dimensions — a caller bug, not bad
    /// input data.
    #[error("target dimensions must be positive, got {width} x {height}")]
    InvalidDimensions { width: f64, height: f64 },
    #[error(transparent)]
    InvalidColor(#[from] ParseColorError),
}

/// Full-surface resample at exact target dimensions (stretch, no aspect
/// preservation). Lanczos3 throughout, matching the rest of the pipeline.
fn resample(src: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    imageops::resize(src, width, height, FilterType::Lanczos3)
}

fn validate_positive(width: f64, height: f64) -> Result<(), TransformError> {
    // `!(x > 0.0)` also catches NaN.
    if !(width > 0.0) || !(height > 0.0) {
        return Err(TransformError::InvalidDimensions { width, height });
    }
    Ok(())
}

impl PixelBuffer {
    /// Stretch-resample to exactly `width × height` (no aspect
    /// preservation). Requested dimensions are rounded to nearest and
    /// floored at 1. A request matching the current dimensions returns
    /// this buffer untouched, with no new allocation.
    pub fn resize(mut self, width: f64, height: f64) -> Result<PixelBuffer, TransformError> {
        validate_positive(width, height)?;
        let (target_w, target_h) = (round_dimension(width), round_dimension(height));
        if self.is_empty() || (target_w == self.width() && target_h == self.height()) {
            return Ok(self);
        }
        let src = match self.take_pixels() {
            Some(s) => s,
            None => return Ok(self),
        };
        let out = resample(&src, target_w, target_h);
        Ok(self.derive(out))
    }

    /// Resize to the given width, deriving the height from the source
    /// aspect ratio.
    pub fn resize_by_width(self, width: f64) -> Result<PixelBuffer, TransformError> {
        validate_positive(width, 1.0)?;
        if self.is_empty() {
            return Ok(self);
        }
        let height = aspect_height(self.width(), self.height(), width);
        self.resize(width, height)
    }

    /// Resize to the given height, deriving the width from the source
    /// aspect ratio.
    pub fn resize_by_height(self, height: f64) -> Result<PixelBuffer, TransformError> {
        validate_positive(1.0, height)?;
        if self.is_empty() {
            return Ok(self);
        }
        let width = aspect_width(self.width(), self.height(), height);
        self.resize(width, height)
    }

    /// Aspect-preserving resize against a bounding box.
    ///
    /// By default the constraining axis wins and the whole image fits
    /// inside `max_width × max_height` (contain). With `use_as_minimum`
    /// the other axis wins instead, so the image at least covers the box
    /// on one axis.
    pub fn resize_ratio(
        self,
        max_width: f64,
        max_height: f64,
        use_as_minimum: bool,
    ) -> Result<PixelBuffer, TransformError> {
        validate_positive(max_width, max_height)?;
        if self.is_empty() {
            return Ok(self);
        }
        let width_ratio = max_width / self.width() as f64;
        let height_ratio = max_height / self.height() as f64;
        if width_ratio < height_ratio {
            if use_as_minimum {
                self.resize_by_height(max_height)
            } else {
                self.resize_by_width(max_width)
            }
        } else if use_as_minimum {
            self.resize_by_width(max_width)
        } else {
            self.resize_by_height(max_height)
        }
    }

    /// Two-pass contain fit: resize by height first, then by width if the
    /// result still exceeds the target width. Not maximally efficient —
    /// the worst case resamples twice.
    pub fn fitted_resize(self, width: f64, height: f64) -> Result<PixelBuffer, TransformError> {
        validate_positive(width, height)?;
        if self.is_empty() {
            return Ok(self);
        }
        let first = self.resize_by_height(height)?;
        if (first.width() as f64) > width {
            first.resize_by_width(width)
        } else {
            Ok(first)
        }
    }

    /// Cover fit with centered crop: the result is always exactly
    /// `width × height`, with overflow on the non-matching axis cropped
    /// symmetrically from the source.
    pub fn cropped_resize(mut self, width: u32, height: u32) -> Result<PixelBuffer, TransformError> {
        validate_positive(width as f64, height as f64)?;
        if self.is_empty() || (width == self.width() && height == self.height()) {
            return Ok(self);
        }
        let src = match self.take_pixels() {
            Some(s) => s,
            None => return Ok(self),
        };
        // A zero-dimension source cannot be resampled; hand back a blank
        // destination of the requested size.
        if src.width() == 0 || src.height() == 0 {
            return Ok(self.derive(RgbaImage::new(width, height)));
        }
        let band = cover_crop_rect((src.width(), src.height()), (width, height));
        let cropped = imageops::crop_imm(&src, band.x, band.y, band.width, band.height).to_image();
        let out = resample(&cropped, width, height);
        Ok(self.derive(out))
    }

    /// Contain fit onto a `width × height` canvas filled with
    /// `background` (6 hex digits, leading `#` optional). The scaled image
    /// is centered; the rest of the canvas keeps the background color.
    pub fn padded_resize(
        mut self,
        width: u32,
        height: u32,
        background: &str,
    ) -> Result<PixelBuffer, TransformError> {
        validate_positive(width as f64, height as f64)?;
        let bg = parse_hex_color(background)?;
        if self.is_empty() || (width == self.width() && height == self.height()) {
            return Ok(self);
        }
        let src = match self.take_pixels() {
            Some(s) => s,
            None => return Ok(self),
        };
        let mut canvas = RgbaImage::from_pixel(width, height, bg);
        if src.width() > 0 && src.height() > 0 {
            let dest = pad_dest_rect((src.width(), src.height()), (width, height));
            let scaled = resample(&src, dest.width, dest.height);
            imageops::overlay(&mut canvas, &scaled, dest.x as i64, dest.y as i64);
        }
        Ok(self.derive(canvas))
    }

    /// Extract the rectangle at `(left, top)` of size `width × height`
    /// into a buffer of exactly that size.
    ///
    /// Out-of-range rectangles are not validated here; the source is
    /// clamped at its edges and uncovered destination pixels stay
    /// transparent. Callers are expected to pre-validate.
    pub fn crop(
        mut self,
        top: u32,
        left: u32,
        width: u32,
        height: u32,
    ) -> Result<PixelBuffer, TransformError> {
        validate_positive(width as f64, height as f64)?;
        if self.is_empty() {
            return Ok(self);
        }
        let src = match self.take_pixels() {
            Some(s) => s,
            None => return Ok(self),
        };
        let piece = imageops::crop_imm(&src, left, top, width, height).to_image();
        let mut out = RgbaImage::new(width, height);
        imageops::replace(&mut out, &piece, 0, 0);
        Ok(self.derive(out))
    }

    /// Rotate by 90, 180, or 270 degrees using exact per-pixel remaps.
    ///
    /// There is no arbitrary-angle primitive in this stack, so any other
    /// angle returns the source pixels unchanged. This is a documented
    /// limitation, not an error.
    pub fn rotate(mut self, angle_degrees: f64) -> PixelBuffer {
        if self.is_empty() {
            return self;
        }
        let src = match self.take_pixels() {
            Some(s) => s,
            None => return self,
        };
        let out = if angle_degrees == 90.0 {
            rotate_quarter_turns(&src, Quarter::Cw90)
        } else if angle_degrees == 180.0 {
            rotate_quarter_turns(&src, Quarter::Half)
        } else if angle_degrees == 270.0 {
            rotate_quarter_turns(&src, Quarter::Cw270)
        } else {
            src
        };
        self.derive(out)
    }

    /// Per-pixel luma conversion with BT.601 weights and full brightness.
    pub fn greyscale(self) -> PixelBuffer {
        self.greyscale_with(LumaWeights::default(), 100)
    }

    /// Per-pixel luma conversion. Weights are normalized by their sum (a
    /// zero sum produces solid black); `brightness_percent` scales the
    /// luma, capped at 255. Output pixels satisfy `R = G = B`; alpha is
    /// copied from the source.
    pub fn greyscale_with(mut self, weights: LumaWeights, brightness_percent: u32) -> PixelBuffer {
        if self.is_empty() {
            return self;
        }
        let src = match self.take_pixels() {
            Some(s) => s,
            None => return self,
        };
        let (norm_r, norm_g, norm_b) = weights.normalized();
        let brightness = brightness_percent as f64 / 100.0;
        let mut out = RgbaImage::new(src.width(), src.height());
        for y in 0..src.height() {
            for x in 0..src.width() {
                let Rgba([r, g, b, a]) = *src.get_pixel(x, y);
                let luma =
                    norm_r * r as f64 + norm_b * b as f64 + norm_g * g as f64;
                let scaled = (luma * brightness).min(255.0);
                let value = scaled.round().min(255.0) as u8;
                out.put_pixel(x, y, Rgba([value, value, value, a]));
            }
        }
        self.derive(out)
    }
}

enum Quarter {
    Cw90,
    Half,
    Cw270,
}

/// Row-major per-pixel remap for right-angle rotations.
///
/// 90: dimensions swap, `(x, y) → (y, dest_h − x − 1)`.
/// 180: dimensions keep, `(x, y) → (dest_w − x − 1, dest_h − y − 1)`.
/// 270: dimensions swap, `(x, y) → (dest_w − y − 1, x)`.
fn rotate_quarter_turns(src: &RgbaImage, turn: Quarter) -> RgbaImage {
    let (src_w, src_h) = (src.width(), src.height());
    let (dest_w, dest_h) = match turn {
        Quarter::Half => (src_w, src_h),
        Quarter::Cw90 | Quarter::Cw270 => (src_h, src_w),
    };
    let mut dest = RgbaImage::new(dest_w, dest_h);
    for y in 0..src_h {
        for x in 0..src_w {
            let pixel = *src.get_pixel(x, y);
            let (dx, dy) = match turn {
                Quarter::Cw90 => (y, dest_h - x - 1),
                Quarter::Half => (dest_w - x - 1, dest_h - y - 1),
                Quarter::Cw270 => (dest_w - y - 1, x),
            };
            dest.put_pixel(dx, dy, pixel);
        }
    }
    dest
}

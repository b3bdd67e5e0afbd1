//! Pure dimension math for the transform engine.
//!
//! All functions here are pure and testable without any I/O or pixels. The
//! rounding and tie-break rules are load-bearing: [`cover_crop_rect`] and
//! [`pad_dest_rect`] both center via `round((outer − inner) / 2)`, and
//! target dimensions round to nearest with a floor of 1.

/// A rectangle within an image, in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Round a requested dimension to the nearest integer, flooring at 1.
///
/// Callers validate positivity before rounding; this only guards against
/// fractional requests like `0.4` collapsing to zero.
pub fn round_dimension(value: f64) -> u32 {
    (value.round() as u32).max(1)
}

/// Height that preserves the source aspect ratio at the given width.
pub fn aspect_height(src_width: u32, src_height: u32, new_width: f64) -> f64 {
    src_height as f64 * new_width / src_width as f64
}

/// Width that preserves the source aspect ratio at the given height.
pub fn aspect_width(src_width: u32, src_height: u32, new_height: f64) -> f64 {
    src_width as f64 * new_height / src_height as f64
}

/// Centered source rectangle for a cover-fit (crop-to-fill) resample.
///
/// Compares destination and source aspect ratios: a destination narrower
/// than the source crops a horizontal band out of the source width, a
/// destination wider (or equally proportioned) crops out of the height.
/// The kept band spans the full extent of the other axis.
pub fn cover_crop_rect(src: (u32, u32), dest: (u32, u32)) -> Rect {
    let (src_w, src_h) = src;
    let (dest_w, dest_h) = dest;
    let dest_ar = dest_w as f64 / dest_h as f64;
    let src_ar = src_w as f64 / src_h as f64;

    if dest_ar < src_ar {
        // Destination is narrower: keep full height, crop width.
        let keep_w = (src_h as f64 * dest_ar).round() as u32;
        Rect {
            x: ((src_w as f64 - keep_w as f64) / 2.0).round() as u32,
            y: 0,
            width: keep_w,
            height: src_h,
        }
    } else {
        // Destination is wider or same: keep full width, crop height.
        let keep_h = (src_w as f64 / dest_ar).round() as u32;
        Rect {
            x: 0,
            y: ((src_h as f64 - keep_h as f64) / 2.0).round() as u32,
            width: src_w,
            height: keep_h,
        }
    }
}

/// Centered destination rectangle for a contain-fit (padded) resample.
///
/// Symmetric to [`cover_crop_rect`] but chooses the smaller scaled
/// dimension so the image never overflows the canvas; the remainder is
/// left to the background fill.
pub fn pad_dest_rect(src: (u32, u32), dest: (u32, u32)) -> Rect {
    let (src_w, src_h) = src;
    let (dest_w, dest_h) = dest;
    let dest_ar = dest_w as f64 / dest_h as f64;
    let src_ar = src_w as f64 / src_h as f64;

    if dest_ar < src_ar {
        // Source is wider than the canvas: fit width, letterbox height.
        let fit_h = (dest_w as f64 / src_ar).round() as u32;
        Rect {
            x: 0,
            y: ((dest_h as f64 - fit_h as f64) / 2.0).round() as u32,
            width: dest_w,
            height: fit_h,
        }
    } else {
        // Source is taller or same: fit height, pillarbox width.
        let fit_w = (dest_h as f64 * src_ar).round() as u32;
        Rect {
            x: ((dest_w as f64 - fit_w as f64) / 2.0).round() as u32,
            y: 0,
            width: fit_w,
            height: dest_h,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_dimension_rounds_to_nearest() {
        assert_eq!(round_dimension(19.4), 19);
        assert_eq!(round_dimension(19.5), 20);
        assert_eq!(round_dimension(1.0), 1);
    }

    #[test]
    fn round_dimension_floors_at_one() {
        assert_eq!(round_dimension(0.4), 1);
        assert_eq!(round_dimension(0.0), 1);
    }

    #[test]
    fn aspect_height_preserves_ratio() {
        // 800x600 at width 400 → height 300
        assert_eq!(aspect_height(800, 600, 400.0), 300.0);
        // 1000x750 at width 500 → 375
        assert_eq!(aspect_height(1000, 750, 500.0), 375.0);
    }

    #[test]
    fn aspect_width_preserves_ratio() {
        assert_eq!(aspect_width(800, 600, 300.0), 400.0);
        assert_eq!(aspect_width(600, 800, 400.0), 300.0);
    }

    #[test]
    fn cover_crop_narrower_dest_crops_width() {
        // 800x600 source → 300x300 dest (1:1 narrower than 4:3):
        // keep height 600, width 600, centered at x=100
        assert_eq!(
            cover_crop_rect((800, 600), (300, 300)),
            Rect {
                x: 100,
                y: 0,
                width: 600,
                height: 600
            }
        );
    }

    #[test]
    fn cover_crop_wider_dest_crops_height() {
        // 600x800 source → 300x300 dest (1:1 wider than 3:4):
        // keep width 600, height 600, centered at y=100
        assert_eq!(
            cover_crop_rect((600, 800), (300, 300)),
            Rect {
                x: 0,
                y: 100,
                width: 600,
                height: 600
            }
        );
    }

    #[test]
    fn cover_crop_same_aspect_keeps_everything() {
        assert_eq!(
            cover_crop_rect((800, 600), (400, 300)),
            Rect {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            }
        );
    }

    #[test]
    fn cover_crop_centers_with_rounding() {
        // 101x100 → 100x100: keep_w = 100, offset round(0.5) = 1
        assert_eq!(
            cover_crop_rect((101, 100), (100, 100)),
            Rect {
                x: 1,
                y: 0,
                width: 100,
                height: 100
            }
        );
    }

    #[test]
    fn pad_wider_source_letterboxes() {
        // 800x600 source into 300x300 canvas: fit width 300, height 225,
        // vertical offset round(75/2) = 38
        assert_eq!(
            pad_dest_rect((800, 600), (300, 300)),
            Rect {
                x: 0,
                y: 38,
                width: 300,
                height: 225
            }
        );
    }

    #[test]
    fn pad_taller_source_pillarboxes() {
        // 600x800 into 300x300: fit height 300, width 225, x = 38
        assert_eq!(
            pad_dest_rect((600, 800), (300, 300)),
            Rect {
                x: 38,
                y: 0,
                width: 225,
                height: 300
            }
        );
    }

    #[test]
    fn pad_same_aspect_fills_canvas() {
        assert_eq!(
            pad_dest_rect((800, 600), (400, 300)),
            Rect {
                x: 0,
                y: 0,
                width: 400,
                height: 300
            }
        );
    }

    #[test]
    fn pad_never_overflows_canvas() {
        for src in [(13, 7), (7, 13), (1, 100), (100, 1), (64, 64)] {
            for dest in [(10, 10), (31, 17), (17, 31)] {
                let r = pad_dest_rect(src, dest);
                assert!(r.x + r.width <= dest.0, "{src:?} into {dest:?}: {r:?}");
                assert!(r.y + r.height <= dest.1, "{src:?} into {dest:?}: {r:?}");
            }
        }
    }
}

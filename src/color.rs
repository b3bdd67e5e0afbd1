//! Color helpers: hex background parsing and luma weight normalization.

use image::Rgba;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid hex color {0:?}: expected 6 hex digits with optional leading '#'")]
pub struct ParseColorError(pub String);

/// Parse a 6-digit hex color (`"336699"` or `"#336699"`) into opaque RGBA.
pub fn parse_hex_color(input: &str) -> Result<Rgba<u8>, ParseColorError> {
    let digits = input.strip_prefix('#').unwrap_or(input);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseColorError(input.to_string()));
    }
    // Length and digit checks above make these infallible.
    let r = u8::from_str_radix(&digits[0..2], 16).unwrap_or(0);
    let g = u8::from_str_radix(&digits[2..4], 16).unwrap_or(0);
    let b = u8::from_str_radix(&digits[4..6], 16).unwrap_or(0);
    Ok(Rgba([r, g, b, 255]))
}

/// Greyscale channel weights, normalized lazily by their sum.
///
/// The defaults are the BT.601 luma coefficients scaled by 1000. A zero
/// weight sum yields all-zero normalized weights, which produces solid
/// black output rather than dividing by zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LumaWeights {
    pub red: u32,
    pub green: u32,
    pub blue: u32,
}

impl LumaWeights {
    pub fn new(red: u32, green: u32, blue: u32) -> Self {
        Self { red, green, blue }
    }

    /// Normalized `(red, green, blue)` fractions summing to 1.0, or all
    /// zeros when the weights sum to zero.
    pub fn normalized(self) -> (f64, f64, f64) {
        let sum = (self.red + self.green + self.blue) as f64;
        if sum == 0.0 {
            return (0.0, 0.0, 0.0);
        }
        (
            self.red as f64 / sum,
            self.green as f64 / sum,
            self.blue as f64 / sum,
        )
    }
}

impl Default for LumaWeights {
    fn default() -> Self {
        Self {
            red: 299,
            green: 587,
            blue: 114,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_with_and_without_hash() {
        assert_eq!(parse_hex_color("336699").unwrap(), Rgba([51, 102, 153, 255]));
        assert_eq!(parse_hex_color("#336699").unwrap(), Rgba([51, 102, 153, 255]));
    }

    #[test]
    fn parses_uppercase_digits() {
        assert_eq!(parse_hex_color("#FFCC00").unwrap(), Rgba([255, 204, 0, 255]));
    }

    #[test]
    fn rejects_short_long_and_non_hex() {
        for bad in ["", "#fff", "33669", "3366999", "zzzzzz", "#33669g"] {
            assert!(parse_hex_color(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn default_weights_are_bt601() {
        let w = LumaWeights::default();
        assert_eq!((w.red, w.green, w.blue), (299, 587, 114));
        let (r, g, b) = w.normalized();
        assert!((r + g + b - 1.0).abs() < 1e-9);
        assert!((r - 0.299).abs() < 1e-9);
    }

    #[test]
    fn zero_sum_normalizes_to_zero() {
        assert_eq!(LumaWeights::new(0, 0, 0).normalized(), (0.0, 0.0, 0.0));
    }
}

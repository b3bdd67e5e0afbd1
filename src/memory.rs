//! Decode-memory heuristic.
//!
//! Estimates whether decoding an image of known dimensions and bit depth
//! fits under a configured ceiling *before* the decoder allocates anything.
//! The estimate is an upper bound and is knowingly inaccurate for paletted
//! and animated formats, where true channel and bit accounting is not
//! available from the header; callers treat a wrong answer as an expected
//! outcome, never as a logic error.

/// Whether an image of `width × height` with the given bit depth and
/// channel count is expected to fit under `limit`.
///
/// - `limit == None` means unlimited: always `true`.
/// - `bits_per_channel` defaults to 8 and `channels` to 4 when the header
///   did not say.
/// - `current_usage` is added to the estimate before comparing.
pub fn estimate_fits(
    width: u32,
    height: u32,
    bits_per_channel: Option<u16>,
    channels: Option<u8>,
    limit: Option<u64>,
    current_usage: u64,
) -> bool {
    let Some(limit) = limit else {
        return true;
    };
    let bits = bits_per_channel.unwrap_or(8).max(1) as u64;
    let channels = channels.unwrap_or(4) as u64;
    let bytes_per_pixel = bits.div_ceil(8) * channels;
    let required = (width as u64)
        .saturating_mul(height as u64)
        .saturating_mul(bytes_per_pixel);
    required.saturating_add(current_usage) < limit
}

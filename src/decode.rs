//! Guarded decoding from file paths and byte-bearing assets.
//!
//! The decoder never trusts file extensions: format, dimensions, bit depth,
//! and channel count come from the content header. Before any pixels are
//! decoded it consults the [`FailureLedger`] (known-bad inputs
//! short-circuit immediately) and the memory guard (oversized images are
//! refused without ever attempting the decode). Every environmental
//! failure — unreadable header, unsupported format, memory refusal, codec
//! error — marks the identity key failed and surfaces as an empty buffer,
//! never as an error value. Missing inputs are the one exception: they are
//! skipped without touching the ledger at all.

use std::io::{self, Cursor};
use std::path::Path;

use image::codecs::gif::GifDecoder;
use image::codecs::jpeg::JpegDecoder;
use image::codecs::png::PngDecoder;
use image::{ColorType, ImageDecoder, ImageFormat, ImageReader};
use thiserror::Error;

use crate::buffer::PixelBuffer;
use crate::config::EngineConfig;
use crate::ledger::{FailureLedger, IdentityKey};
use crate::memory::estimate_fits;

/// A byte-bearing container the engine can load from, e.g. a
/// content-addressed asset in a CMS store. Consumed read-only.
pub trait LoadableAsset {
    fn exists(&self) -> bool;
    fn filename(&self) -> String;
    fn content_hash(&self) -> String;
    fn variant(&self) -> String;
    fn bytes(&self) -> io::Result<Vec<u8>>;
}

/// Why a decode attempt was abandoned. Internal: callers only ever see an
/// empty buffer, but the reason is logged and drives ledger marking.
#[derive(Debug, Error)]
enum DecodeFailure {
    #[error("content does not match any known image format")]
    UnknownFormat,
    #[error("unreadable image header: {0}")]
    Header(image::ImageError),
    #[error("unsupported image format {0:?} (only GIF, JPEG, PNG decode)")]
    UnsupportedFormat(ImageFormat),
    #[error("estimated decode of {width}x{height} exceeds the memory limit")]
    MemoryLimit { width: u32, height: u32 },
    #[error("decode failed: {0}")]
    Decode(image::ImageError),
}

/// What the content header says about an image, read without decoding
/// any pixels.
struct HeaderProbe {
    format: ImageFormat,
    width: u32,
    height: u32,
    bits_per_channel: u16,
    channels: u8,
    has_alpha: bool,
}

fn probe_header(bytes: &[u8]) -> Result<HeaderProbe, DecodeFailure> {
    let format = image::guess_format(bytes).map_err(|_| DecodeFailure::UnknownFormat)?;
    let ((width, height), color): ((u32, u32), ColorType) = match format {
        ImageFormat::Gif => {
            let decoder = GifDecoder::new(Cursor::new(bytes)).map_err(DecodeFailure::Header)?;
            (decoder.dimensions(), decoder.color_type())
        }
        ImageFormat::Jpeg => {
            let decoder = JpegDecoder::new(Cursor::new(bytes)).map_err(DecodeFailure::Header)?;
            (decoder.dimensions(), decoder.color_type())
        }
        ImageFormat::Png => {
            let decoder = PngDecoder::new(Cursor::new(bytes)).map_err(DecodeFailure::Header)?;
            (decoder.dimensions(), decoder.color_type())
        }
        other => return Err(DecodeFailure::UnsupportedFormat(other)),
    };
    let channels = color.channel_count().max(1);
    Ok(HeaderProbe {
        format,
        width,
        height,
        bits_per_channel: color.bits_per_pixel() / channels as u16,
        channels,
        has_alpha: color.has_alpha(),
    })
}

/// Decoder with a shared failure ledger and resolved engine config.
#[derive(Debug, Clone)]
pub struct Decoder {
    ledger: FailureLedger,
    config: EngineConfig,
}

impl Decoder {
    pub fn new(ledger: FailureLedger, config: EngineConfig) -> Self {
        Self { ledger, config }
    }

    pub fn ledger(&self) -> &FailureLedger {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Decode an image file. Returns an empty buffer when the file is
    /// missing (no ledger interaction) or when any decode step fails (the
    /// identity key is marked failed so the attempt is never retried).
    pub fn decode_path(&self, path: &Path) -> PixelBuffer {
        if !path.exists() {
            log::debug!("decode skipped, no such file: {}", path.display());
            return PixelBuffer::empty(&self.config);
        }
        let key = match IdentityKey::from_path(path) {
            Ok(key) => key,
            Err(e) => {
                // The file vanished between the existence check and the
                // stat; treat as missing.
                log::debug!("decode skipped, cannot stat {}: {e}", path.display());
                return PixelBuffer::empty(&self.config);
            }
        };
        if self.ledger.has_failed(&key) {
            log::debug!("decode short-circuited, known-bad input: {}", path.display());
            return PixelBuffer::empty(&self.config);
        }
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                // Read errors are treated like a missing file: not
                // memoized, retried on the next call. The ledger records
                // properties of the content, not of the environment.
                log::warn!("decode skipped, cannot read {}: {e}", path.display());
                return PixelBuffer::empty(&self.config);
            }
        };
        self.decode_guarded(&key, &bytes, &path.display().to_string())
    }

    /// Decode from a byte-bearing asset collaborator. Same contract as
    /// [`Self::decode_path`], keyed by `(filename, content_hash, variant)`.
    pub fn decode_asset(&self, asset: &dyn LoadableAsset) -> PixelBuffer {
        if !asset.exists() {
            log::debug!("decode skipped, asset does not exist: {}", asset.filename());
            return PixelBuffer::empty(&self.config);
        }
        let key = IdentityKey::from_parts(
            &asset.filename(),
            &asset.content_hash(),
            &asset.variant(),
        );
        if self.ledger.has_failed(&key) {
            log::debug!(
                "decode short-circuited, known-bad input: {}",
                asset.filename()
            );
            return PixelBuffer::empty(&self.config);
        }
        let bytes = match asset.bytes() {
            Ok(bytes) => bytes,
            Err(e) => {
                // Same as the path entry point: read errors are retried,
                // not memoized.
                log::warn!("decode skipped, cannot read asset {}: {e}", asset.filename());
                return PixelBuffer::empty(&self.config);
            }
        };
        self.decode_guarded(&key, &bytes, &asset.filename())
    }

    fn decode_guarded(&self, key: &IdentityKey, bytes: &[u8], origin: &str) -> PixelBuffer {
        match self.try_decode(bytes) {
            Ok(buffer) => buffer,
            Err(failure) => {
                log::warn!("decode of {origin} failed, memoizing: {failure}");
                self.ledger.mark_failed(key);
                PixelBuffer::empty(&self.config)
            }
        }
    }

    fn try_decode(&self, bytes: &[u8]) -> Result<PixelBuffer, DecodeFailure> {
        // Probing rejects everything except GIF, JPEG, and PNG up front.
        let probe = probe_header(bytes)?;
        if !estimate_fits(
            probe.width,
            probe.height,
            Some(probe.bits_per_channel),
            Some(probe.channels),
            self.config.memory_limit,
            self.config.memory_usage_baseline,
        ) {
            return Err(DecodeFailure::MemoryLimit {
                width: probe.width,
                height: probe.height,
            });
        }
        let image = ImageReader::with_format(Cursor::new(bytes), probe.format)
            .decode()
            .map_err(DecodeFailure::Decode)?;
        // Straight RGBA8: alpha passes through untouched, no pre-blending.
        Ok(PixelBuffer::from_decoded(
            image.into_rgba8(),
            probe.has_alpha,
            &self.config,
        ))
    }
}

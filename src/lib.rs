//! # rastermill
//!
//! A raster-image manipulation engine: decode an image from a file path or
//! byte-bearing asset, run any chain of geometry/color transforms, and
//! encode the result back out as GIF, JPEG, or PNG.
//!
//! ```text
//! Decoder ──▶ PixelBuffer ──▶ transforms (0..n, each a new buffer) ──▶ write_to / write_to_store
//!    │
//!    ├── FailureLedger   (known-bad inputs short-circuit, permanently)
//!    └── memory guard    (oversized decodes refused up front)
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`buffer`] | [`PixelBuffer`] — exclusive owner of one decoded RGBA image plus quality/interlace settings |
//! | [`decode`] | Guarded decoding: header sniffing, memory guard, failure memoization |
//! | [`transform`] | Resize family, crop, rotate, pad, greyscale — pure buffer → buffer operations |
//! | [`encode`] | GIF/JPEG/PNG output, format sniffing, asset-store handoff |
//! | [`ledger`] | Identity keys and the persistent failure ledger with pluggable backing stores |
//! | [`memory`] | Pre-decode memory estimation |
//! | [`geometry`] | Pure dimension math shared by the transforms |
//! | [`color`] | Hex color parsing and luma weights |
//! | [`config`] | [`EngineConfig`] values passed in by the embedding application |
//!
//! # Design Decisions
//!
//! ## Failures are states, not exceptions
//!
//! Missing files, corrupt data, refused decodes, and failed writes are
//! everyday inputs for an engine fed by user uploads. They surface as an
//! empty [`PixelBuffer`] or a `false`/`None` return, and decode failures
//! are memoized in the [`ledger`](crate::ledger) so the expensive attempt
//! never repeats. Only caller bugs — zero or negative target dimensions,
//! malformed color strings — come back as `Err`.
//!
//! ## The ledger is a permanent circuit-breaker
//!
//! A memoized failure has no expiry and survives restarts through the
//! file-backed store. Nothing clears it except an explicit
//! [`FailureLedger::flush_all`], wired to the embedder's
//! cache-invalidation tooling. There is no automatic retry anywhere.
//!
//! ## Transforms consume and re-own
//!
//! Every transform takes its buffer by value and returns a new one;
//! pixel storage is never shared between a source and a derived image, and
//! release happens exactly once when the owning buffer drops. No-op
//! requests (resize to current size) hand the same buffer back without
//! reallocating. Keep a source across a transform by cloning it first.
//!
//! ## Content over extensions
//!
//! Formats are detected from headers on decode, and an existing target
//! file's real format is reused on encode. Extensions only matter when
//! writing to a path that does not exist yet.

pub mod buffer;
pub mod color;
pub mod config;
pub mod decode;
pub mod encode;
pub mod geometry;
pub mod ledger;
pub mod memory;
pub mod transform;

pub use buffer::{PixelBuffer, Quality};
pub use config::EngineConfig;
pub use decode::{Decoder, LoadableAsset};
pub use encode::{AssetStore, RasterFormat};
pub use ledger::{FailureLedger, IdentityKey, JsonFileStore, LedgerStore, MemoryStore};
pub use transform::TransformError;

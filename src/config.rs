//! Engine configuration surface.
//!
//! Configuration loading and merging belong to the embedding application;
//! only the resolved values cross this boundary. An [`EngineConfig`] is
//! passed explicitly wherever a buffer is created or reset — there is no
//! global configuration state, and values are not re-read mid-transform-chain.

use serde::Deserialize;

/// Resolved configuration values consumed by the engine.
///
/// Deserializable so host applications can embed it in their own config
/// files, but a plain `EngineConfig { .. }` literal works just as well.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Encoding quality for lossy formats (0–100). Applied to buffers at
    /// creation/reset time.
    pub default_quality: u8,
    /// Whether encoded output should be interlaced where the codec
    /// supports it.
    pub image_interlace: bool,
    /// Memory ceiling in bytes for decode attempts. `None` means
    /// unlimited: the memory guard always passes.
    pub memory_limit: Option<u64>,
    /// Bytes already in use by the host process, added to the decode
    /// estimate before comparing against `memory_limit`. The engine cannot
    /// observe the host allocator, so the embedder supplies this.
    pub memory_usage_baseline: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_quality: 75,
            image_interlace: false,
            memory_limit: None,
            memory_usage_baseline: 0,
        }
    }
}

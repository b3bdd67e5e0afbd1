//! The failure ledger: persistent memoization of decode failures.
//!
//! Decoding a corrupt or oversized image is expensive to fail at; the
//! ledger records "this exact input failed" so repeat attempts
//! short-circuit before any decoder runs. Entries are keyed by a stable
//! identity hash of the input revision and have no expiry — the ledger is
//! a permanent circuit-breaker, cleared only by an explicit
//! [`FailureLedger::flush_all`] from cache-invalidation tooling.
//!
//! # Keys
//!
//! [`IdentityKey`] hashes the tuple of fields identifying one input
//! revision: `(path, mtime)` for filesystem loads, `(filename,
//! content_hash, variant)` for content-addressed loads. Keys are
//! fixed-length hex SHA-256 digests with a domain prefix so the two key
//! families can never collide.
//!
//! # Backing stores
//!
//! The ledger talks to a [`LedgerStore`] — a key → single-character-flag
//! store (`"1"` failed, `"0"` succeeded). [`MemoryStore`] covers tests and
//! single-process use; [`JsonFileStore`] persists across restarts as a
//! versioned JSON file that loads as empty when missing, corrupt, or
//! version-mismatched. Concurrent get/set races are acceptable (worst case
//! a duplicate write); no transactional guarantee is made.

use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::UNIX_EPOCH;

/// Flag value recorded for a failed decode.
const FLAG_FAILED: &str = "1";
/// Flag value recorded for a successful decode.
const FLAG_SUCCEEDED: &str = "0";

/// Version of the on-disk ledger format. Bump to invalidate existing
/// ledgers when the key computation changes.
const LEDGER_VERSION: u32 = 1;

/// Stable identity of one input revision, used as the ledger key.
///
/// Always 64 lowercase hex characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Key for a filesystem load: the path plus its modification time, so
    /// a rewritten file gets a fresh key.
    pub fn from_path(path: &Path) -> io::Result<Self> {
        let mtime = std::fs::metadata(path)?
            .modified()?
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let mut hasher = Sha256::new();
        hasher.update(b"path\0");
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(b"|");
        hasher.update(mtime.to_le_bytes());
        Ok(Self(format!("{:x}", hasher.finalize())))
    }

    /// Key for a content-addressed load: filename, content hash, and
    /// variant name.
    pub fn from_parts(filename: &str, content_hash: &str, variant: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"asset\0");
        hasher.update(filename.as_bytes());
        hasher.update(b"|");
        hasher.update(content_hash.as_bytes());
        hasher.update(b"|");
        hasher.update(variant.as_bytes());
        Self(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The ledger's backing-store boundary.
///
/// Implementations hold key → flag pairs where flags are single-character
/// strings. `set` overwrites; `clear` drops every entry.
pub trait LedgerStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
    fn clear(&self);
}

/// In-memory store for tests and single-process embedders.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries currently held. Test and diagnostics helper.
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl LedgerStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

/// Serialized shape of the ledger file.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct LedgerFile {
    version: u32,
    entries: HashMap<String, String>,
}

/// File-backed store persisting the ledger across process restarts.
///
/// Every `set`/`clear` rewrites the JSON file under a lock. A missing,
/// unreadable, corrupt, or version-mismatched file loads as empty rather
/// than erroring — losing memoized failures is always safe.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = Self::load(&path);
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn load(path: &Path) -> HashMap<String, String> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(_) => return HashMap::new(),
        };
        let file: LedgerFile = match serde_json::from_str(&content) {
            Ok(f) => f,
            Err(_) => return HashMap::new(),
        };
        if file.version != LEDGER_VERSION {
            return HashMap::new();
        }
        file.entries
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        let file = LedgerFile {
            version: LEDGER_VERSION,
            entries: entries.clone(),
        };
        match serde_json::to_string_pretty(&file) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&self.path, json) {
                    log::warn!("failed to persist ledger to {}: {e}", self.path.display());
                }
            }
            Err(e) => log::warn!("failed to serialize ledger: {e}"),
        }
    }
}

impl LedgerStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
            self.persist(&entries);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
            self.persist(&entries);
        }
    }
}

/// Failure memoization over a shared backing store.
///
/// Cloning shares the store; the ledger is meant to be handed to every
/// decoder in the process.
#[derive(Clone)]
pub struct FailureLedger {
    store: Arc<dyn LedgerStore>,
}

impl FailureLedger {
    pub fn new(store: Arc<dyn LedgerStore>) -> Self {
        Self { store }
    }

    /// Ledger over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    /// Whether this identity previously failed to decode.
    pub fn has_failed(&self, key: &IdentityKey) -> bool {
        self.store
            .get(key.as_str())
            .is_some_and(|flag| flag == FLAG_FAILED)
    }

    /// Record that this identity failed to decode.
    pub fn mark_failed(&self, key: &IdentityKey) {
        self.store.set(key.as_str(), FLAG_FAILED);
    }

    /// Record a success by overwriting the flag; the key itself is kept.
    ///
    /// Part of the ledger contract, but no decode path calls it: a
    /// once-failed identity stays failed until [`Self::flush_all`]. The
    /// original design leaves the intent unclear, so the behavior is
    /// preserved as-is.
    pub fn mark_succeeded(&self, key: &IdentityKey) {
        self.store.set(key.as_str(), FLAG_SUCCEEDED);
    }

    /// Clear every memoized entry, regardless of key. Idempotent; intended
    /// for process-wide cache-invalidation tooling.
    pub fn flush_all(&self) {
        self.store.clear();
    }
}

impl std::fmt::Debug for FailureLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailureLedger").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    // =========================================================================
    // Identity keys
    // =========================================================================

    #[test]
    fn from_parts_is_deterministic_and_fixed_length() {
        let a = IdentityKey::from_parts("photo.png", "abc123", "thumb");
        let b = IdentityKey::from_parts("photo.png", "abc123", "thumb");
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn from_parts_varies_with_each_field() {
        let base = IdentityKey::from_parts("photo.png", "abc123", "thumb");
        assert_ne!(base, IdentityKey::from_parts("other.png", "abc123", "thumb"));
        assert_ne!(base, IdentityKey::from_parts("photo.png", "def456", "thumb"));
        assert_ne!(base, IdentityKey::from_parts("photo.png", "abc123", "full"));
    }

    #[test]
    fn from_path_uses_path_and_mtime() {
        let tmp = TempDir::new().unwrap();
        let a_path = tmp.path().join("a.png");
        let b_path = tmp.path().join("b.png");
        fs::write(&a_path, b"data").unwrap();
        fs::write(&b_path, b"data").unwrap();

        let a = IdentityKey::from_path(&a_path).unwrap();
        assert_eq!(a, IdentityKey::from_path(&a_path).unwrap());
        assert_ne!(a, IdentityKey::from_path(&b_path).unwrap());
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn from_path_missing_file_errors() {
        assert!(IdentityKey::from_path(Path::new("/nonexistent/x.png")).is_err());
    }

    #[test]
    fn delimiter_prevents_field_boundary_collisions() {
        // ("x|y", "", "z") must not hash like ("x", "y", "z").
        let a = IdentityKey::from_parts("x", "y", "z");
        let b = IdentityKey::from_parts("x|y", "", "z");
        assert_ne!(a, b);
    }

    // =========================================================================
    // FailureLedger over MemoryStore
    // =========================================================================

    #[test]
    fn unknown_key_has_not_failed() {
        let ledger = FailureLedger::in_memory();
        assert!(!ledger.has_failed(&IdentityKey::from_parts("a", "b", "c")));
    }

    #[test]
    fn mark_failed_then_has_failed() {
        let ledger = FailureLedger::in_memory();
        let key = IdentityKey::from_parts("a", "b", "c");
        ledger.mark_failed(&key);
        assert!(ledger.has_failed(&key));
    }

    #[test]
    fn mark_succeeded_overwrites_but_keeps_the_key() {
        let store = Arc::new(MemoryStore::new());
        let ledger = FailureLedger::new(store.clone());
        let key = IdentityKey::from_parts("a", "b", "c");
        ledger.mark_failed(&key);
        ledger.mark_succeeded(&key);
        assert!(!ledger.has_failed(&key));
        assert_eq!(store.get(key.as_str()).as_deref(), Some("0"));
    }

    #[test]
    fn flush_all_clears_everything_and_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let ledger = FailureLedger::new(store.clone());
        ledger.mark_failed(&IdentityKey::from_parts("a", "1", ""));
        ledger.mark_failed(&IdentityKey::from_parts("b", "2", ""));
        assert_eq!(store.len(), 2);

        ledger.flush_all();
        assert!(store.is_empty());
        ledger.flush_all();
        assert!(store.is_empty());
    }

    #[test]
    fn clones_share_the_store() {
        let ledger = FailureLedger::in_memory();
        let other = ledger.clone();
        let key = IdentityKey::from_parts("a", "b", "c");
        ledger.mark_failed(&key);
        assert!(other.has_failed(&key));
    }

    // =========================================================================
    // JsonFileStore
    // =========================================================================

    #[test]
    fn json_store_persists_across_reopen() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");
        let key = IdentityKey::from_parts("photo.png", "abc", "thumb");

        {
            let ledger = FailureLedger::new(Arc::new(JsonFileStore::open(&path)));
            ledger.mark_failed(&key);
        }

        let reopened = FailureLedger::new(Arc::new(JsonFileStore::open(&path)));
        assert!(reopened.has_failed(&key));
    }

    #[test]
    fn json_store_missing_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::open(tmp.path().join("absent.json"));
        assert_eq!(store.get("anything"), None);
    }

    #[test]
    fn json_store_corrupt_file_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");
        fs::write(&path, "not json").unwrap();
        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("anything"), None);
    }

    #[test]
    fn json_store_version_mismatch_loads_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");
        let json = format!(
            r#"{{"version": {}, "entries": {{"k": "1"}}}}"#,
            LEDGER_VERSION + 1
        );
        fs::write(&path, json).unwrap();
        let store = JsonFileStore::open(&path);
        assert_eq!(store.get("k"), None);
    }

    #[test]
    fn json_store_clear_persists() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("ledger.json");
        {
            let store = JsonFileStore::open(&path);
            store.set("k", "1");
            store.clear();
        }
        let reopened = JsonFileStore::open(&path);
        assert_eq!(reopened.get("k"), None);
    }
}

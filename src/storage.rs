//! Key-value state storage with a capability-checked fallback.
//!
//! The application keeps a small amount of state between runs (the last
//! successfully aggregated board). Callers talk to the [`KeyValueStore`]
//! contract only; the concrete variant is selected exactly once at startup
//! by [`open_store`], which probes whether the state directory is writable:
//!
//! - writable → [`DiskStore`], a single JSON map file with atomic writes
//! - unwritable (read-only filesystem, permissions, sandbox) → [`MemoryStore`]
//!
//! After selection, no caller needs to special-case the variant — a run on
//! an unwritable filesystem simply loses its state at exit.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const STORE_FILE: &str = "store.json";
const PROBE_FILE: &str = "..__probe_write__";

/// Fixed contract both storage variants satisfy.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str);
    fn remove(&mut self, key: &str);
    fn clear(&mut self);
    fn keys(&self) -> Vec<String>;
}

/// Open the best available store for `state_dir`.
///
/// Probes writability the same way the output-directory check does: create
/// the directory, then create and delete a probe file. Any failure selects
/// the in-memory fallback with a warning.
pub fn open_store(state_dir: &str) -> Box<dyn KeyValueStore> {
    match probe_writable(Path::new(state_dir)) {
        Ok(()) => {
            debug!(%state_dir, "State directory is writable; using disk store");
            Box::new(DiskStore::open(Path::new(state_dir).join(STORE_FILE)))
        }
        Err(e) => {
            warn!(error = %e, %state_dir, "State directory unavailable; using in-memory storage");
            Box::new(MemoryStore::new())
        }
    }
}

fn probe_writable(dir: &Path) -> Result<(), std::io::Error> {
    fs::create_dir_all(dir)?;
    let probe = dir.join(PROBE_FILE);
    fs::File::create(&probe)?;
    let _ = fs::remove_file(&probe);
    Ok(())
}

/// Disk-backed store: one JSON object per state directory.
///
/// Writes go through a temp file followed by a rename so a crash mid-write
/// leaves the previous file intact. Write failures degrade to a warning —
/// the in-memory view stays authoritative for the rest of the run.
pub struct DiskStore {
    path: PathBuf,
    entries: HashMap<String, String>,
}

impl DiskStore {
    pub fn open(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(json) => match serde_json::from_str::<HashMap<String, String>>(&json) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(error = %e, path = %path.display(), "State file unreadable; starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        info!(path = %path.display(), entries = entries.len(), "Opened disk store");
        Self { path, entries }
    }

    fn flush(&self) {
        let json = match serde_json::to_string(&self.entries) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize state; skipping flush");
                return;
            }
        };
        let tmp = self.path.with_extension("json.tmp");
        let result = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, &self.path));
        if let Err(e) = result {
            warn!(error = %e, path = %self.path.display(), "Failed to persist state");
        }
    }
}

impl KeyValueStore for DiskStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush();
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
        self.flush();
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.flush();
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

/// In-memory fallback with the same contract; state dies with the process.
#[derive(Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn keys(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }
}

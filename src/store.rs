//! Persisted allow-list of notification sources.
//!
//! The store is the single piece of durable state in the relay: the
//! set of registered source identifiers and one enabled flag per
//! source. Every component takes it as an explicit dependency; there
//! is no ambient global state.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::RelayError;

/// On-disk form of the allow-list. Sorted collections keep the file
/// stable across rewrites.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AllowListFile {
    #[serde(default)]
    sources: BTreeSet<String>,
    #[serde(default)]
    enabled: BTreeMap<String, bool>,
}

/// In-memory allow-list. Hash collections keep the per-event lookups
/// O(1) regardless of how many sources are registered.
#[derive(Debug, Default)]
struct AllowList {
    sources: HashSet<String>,
    enabled: HashMap<String, bool>,
}

/// Durable, queryable registry of allowed sources and their enabled
/// state.
///
/// Mutations hold the write lock across the in-memory update and the
/// file write, so a concurrent `remove_source` and `set_enabled` on
/// the same id always leave one of the two consistent end states. A
/// mutation whose file write fails is rolled back in memory, so an
/// error reported to the caller means no change took effect anywhere.
pub struct SourceStore {
    path: PathBuf,
    inner: RwLock<AllowList>,
}

impl SourceStore {
    /// Open the store backed by the given file. A missing file yields
    /// an empty store; an unparseable file is ignored with a warning
    /// rather than failing the daemon.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RelayError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = match std::fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str::<AllowListFile>(&contents) {
                Ok(file) => {
                    info!("Loaded allow-list from {:?} ({} sources)", path, file.sources.len());
                    file
                }
                Err(e) => {
                    warn!("Failed to parse allow-list {:?}: {}, starting empty", path, e);
                    AllowListFile::default()
                }
            },
            Err(_) => {
                info!("No allow-list at {:?}, starting empty", path);
                AllowListFile::default()
            }
        };

        let inner = AllowList {
            sources: file.sources.into_iter().collect(),
            enabled: file.enabled.into_iter().collect(),
        };

        Ok(Self {
            path,
            inner: RwLock::new(inner),
        })
    }

    /// Register a source. Idempotent: adding an already-registered id
    /// is a no-op success. A latent enabled flag set before the add
    /// takes effect from this point on.
    pub fn add_source(&self, id: &str) -> Result<(), RelayError> {
        let mut inner = self.write();
        if !inner.sources.insert(id.to_string()) {
            return Ok(());
        }
        if let Err(e) = self.persist(&inner) {
            // Failed mutations must not take effect: an error reply to
            // the consumer with the source silently live would diverge
            // memory from both the disk file and the caller's view.
            inner.sources.remove(id);
            return Err(e);
        }
        Ok(())
    }

    /// Unregister a source and clear its enabled flag. Idempotent;
    /// succeeds even if the id was never registered.
    pub fn remove_source(&self, id: &str) -> Result<(), RelayError> {
        let mut inner = self.write();
        let removed = inner.sources.take(id);
        let flag = inner.enabled.remove(id);
        if removed.is_none() && flag.is_none() {
            return Ok(());
        }
        if let Err(e) = self.persist(&inner) {
            if let Some(source) = removed {
                inner.sources.insert(source);
            }
            if let Some(value) = flag {
                inner.enabled.insert(id.to_string(), value);
            }
            return Err(e);
        }
        Ok(())
    }

    /// All currently registered source ids. Order is not significant.
    pub fn list_sources(&self) -> Vec<String> {
        self.read().sources.iter().cloned().collect()
    }

    /// Set the enabled flag for a source. Allowed on an id that is not
    /// currently registered: the flag is stored latent and takes
    /// effect if the id is later added.
    pub fn set_enabled(&self, id: &str, enabled: bool) -> Result<(), RelayError> {
        let mut inner = self.write();
        let previous = inner.enabled.insert(id.to_string(), enabled);
        if let Err(e) = self.persist(&inner) {
            match previous {
                Some(value) => inner.enabled.insert(id.to_string(), value),
                None => inner.enabled.remove(id),
            };
            return Err(e);
        }
        Ok(())
    }

    /// Whether a source is enabled. Unknown ids default to false.
    pub fn is_enabled(&self, id: &str) -> bool {
        self.read().enabled.get(id).copied().unwrap_or(false)
    }

    /// Whether a source is both registered and enabled, read under one
    /// lock guard so the pair can never be torn by a concurrent
    /// mutation.
    pub fn check(&self, id: &str) -> bool {
        let inner = self.read();
        inner.sources.contains(id) && inner.enabled.get(id).copied().unwrap_or(false)
    }

    fn persist(&self, inner: &AllowList) -> Result<(), RelayError> {
        let file = AllowListFile {
            sources: inner.sources.iter().cloned().collect(),
            enabled: inner
                .enabled
                .iter()
                .map(|(id, flag)| (id.clone(), *flag))
                .collect(),
        };
        let contents = toml::to_string_pretty(&file)?;

        // Write-then-rename keeps the file whole if the daemon dies
        // mid-write.
        let tmp = self.path.with_extension("toml.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    // A panicked holder leaves the maps consistent (nothing panics
    // between map updates); recover from poisoning and keep serving.
    fn read(&self) -> RwLockReadGuard<'_, AllowList> {
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AllowList> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}

//! Rule-List Repository
//!
//! Loads the bundled filter lists from a directory once per session. A
//! missing or unreadable asset degrades to an empty list for that slot.
//! Loading can run on a background thread and be cancelled between lists.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use ps_core::lists::Blocklists;
use ps_core::rules::RuleList;
use ps_core::types::ListId;

use crate::parser::parse_filter_list;

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Rule list loading was cancelled")]
    Cancelled,
    #[error("Rule list loader thread panicked")]
    LoaderPanicked,
}

// =============================================================================
// Cancellation
// =============================================================================

/// Shared flag checked by the loader between lists.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct RuleListRepository {
    dir: PathBuf,
}

impl RuleListRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, id: ListId) -> PathBuf {
        self.dir.join(id.asset_name())
    }

    /// Read and parse one list file.
    pub fn load_file(path: &Path) -> Result<RuleList, RepositoryError> {
        let bytes = fs::read(path).map_err(|source| RepositoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(parse_filter_list(&String::from_utf8_lossy(&bytes)))
    }

    /// Load one named list, or an empty one if its asset is unusable.
    pub fn load_list(&self, id: ListId) -> RuleList {
        match Self::load_file(&self.path_of(id)) {
            Ok(list) => {
                let stats = list.stats();
                log::info!(
                    "Loaded {}: {} rules, {} lines skipped (version {})",
                    id.display_name(),
                    stats.rules,
                    stats.skipped,
                    list.version().unwrap_or("unknown")
                );
                list
            }
            Err(e) => {
                log::warn!("{}; {} will have no rules", e, id.display_name());
                RuleList::empty()
            }
        }
    }

    /// Load every named list. Blocks until done or cancelled.
    pub fn load_dir(&self, cancel: &CancelToken) -> Result<Blocklists, RepositoryError> {
        let mut lists = Blocklists::new();
        for id in ListId::ALL {
            if cancel.is_cancelled() {
                log::info!("Rule list loading cancelled before {}", id);
                return Err(RepositoryError::Cancelled);
            }
            lists.set(id, self.load_list(id));
        }
        Ok(lists)
    }

    /// Load on a background thread.
    pub fn spawn_load(self) -> LoadHandle {
        let cancel = CancelToken::new();
        let token = cancel.clone();
        let thread = std::thread::spawn(move || self.load_dir(&token));
        LoadHandle { cancel, thread }
    }
}

/// A running background load.
#[derive(Debug)]
pub struct LoadHandle {
    cancel: CancelToken,
    thread: JoinHandle<Result<Blocklists, RepositoryError>>,
}

impl LoadHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Wait for the loader to finish.
    pub fn join(self) -> Result<Blocklists, RepositoryError> {
        self.thread.join().map_err(|_| RepositoryError::LoaderPanicked)?
    }
}

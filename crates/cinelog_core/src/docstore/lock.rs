//! Process-wide registry of per-file mutation locks.

use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

static FILE_LOCKS: Lazy<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>> = Lazy::new(Default::default);

/// Returns the lock shared by every store opened on `canonical_path`.
pub(crate) fn lock_for(canonical_path: &Path) -> Arc<Mutex<()>> {
    let mut locks = FILE_LOCKS.lock().unwrap_or_else(PoisonError::into_inner);
    Arc::clone(
        locks
            .entry(canonical_path.to_path_buf())
            .or_insert_with(|| Arc::new(Mutex::new(()))),
    )
}

//! Per-path mutual exclusion around metadata writes

use dashmap::DashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Lock table keyed by normalized path. Cloning shares the table.
#[derive(Debug, Clone, Default)]
pub struct PathLocks {
    table: Arc<DashMap<PathBuf, Arc<Mutex<()>>>>,
}

impl PathLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `path`. The table entry is dropped
    /// again once no other caller holds or waits for it.
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce() -> T) -> T {
        let key = normalize(path);
        let mutex = self.table.entry(key.clone()).or_insert_with(|| Arc::new(Mutex::new(()))).clone();

        let result = {
            let _guard = mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            f()
        };

        // Table plus our clone; anyone else would have cloned under the shard lock
        self.table.remove_if(&key, |_, entry| Arc::strong_count(entry) == 2);
        result
    }

    /// Number of paths currently locked or waited on
    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

/// Canonical path when it exists. Otherwise `.` and `..` are folded
/// lexically and the longest existing ancestor is canonicalized.
pub fn normalize(path: &Path) -> PathBuf {
    if let Ok(canonical) = std::fs::canonicalize(path) {
        return canonical;
    }

    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir().map(|cwd| cwd.join(path)).unwrap_or_else(|_| path.to_path_buf())
    };

    let mut lexical = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                lexical.pop();
            }
            other => lexical.push(other.as_os_str()),
        }
    }

    for ancestor in lexical.ancestors().skip(1) {
        if let Ok(canonical) = std::fs::canonicalize(ancestor) {
            if let Ok(rest) = lexical.strip_prefix(ancestor) {
                return canonical.join(rest);
            }
        }
    }
    lexical
}

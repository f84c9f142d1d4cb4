//! In-memory host for unit tests. Counts reads so cache behavior is observable.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use crate::error::ScriptmarkError;
use crate::host::{FileQuery, Host, build_globset};
use crate::types::Document;

pub(crate) struct MemoryHost {
    root: PathBuf,
    files: Mutex<BTreeMap<PathBuf, (String, SystemTime)>>,
    open: Mutex<Vec<PathBuf>>,
    clock: AtomicU64,
    reads: AtomicUsize,
}

impl MemoryHost {
    pub(crate) fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(root),
            files: Mutex::new(BTreeMap::new()),
            open: Mutex::new(Vec::new()),
            clock: AtomicU64::new(1),
            reads: AtomicUsize::new(0),
        }
    }

    /// Write a file with a new, strictly later timestamp.
    pub(crate) fn write(&self, path: &str, text: &str) {
        let tick = self.clock.fetch_add(1, Ordering::Relaxed);
        let mtime = SystemTime::UNIX_EPOCH + Duration::from_secs(tick);
        self.lock_files()
            .insert(PathBuf::from(path), (text.to_string(), mtime));
    }

    /// Change content without touching the timestamp.
    pub(crate) fn write_keeping_mtime(&self, path: &str, text: &str) {
        if let Some(entry) = self.lock_files().get_mut(Path::new(path)) {
            entry.0 = text.to_string();
        }
    }

    pub(crate) fn open(&self, path: &str) {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(PathBuf::from(path));
    }

    pub(crate) fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub(crate) fn document(&self, path: &str) -> Document {
        let text = self
            .lock_files()
            .get(Path::new(path))
            .map(|(t, _)| t.clone())
            .unwrap_or_default();
        Document::new(path, text)
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, BTreeMap<PathBuf, (String, SystemTime)>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn not_found(path: &Path) -> std::io::Error {
    std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{} not in memory host", path.display()),
    )
}

impl Host for MemoryHost {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.lock_files()
            .get(path)
            .map(|(t, _)| t.clone())
            .ok_or_else(|| not_found(path))
    }

    fn modified(&self, path: &Path) -> std::io::Result<SystemTime> {
        self.lock_files()
            .get(path)
            .map(|(_, m)| *m)
            .ok_or_else(|| not_found(path))
    }

    fn find_files(&self, query: &FileQuery) -> Result<Vec<PathBuf>, ScriptmarkError> {
        let include = build_globset(&query.include)?;
        let exclude = build_globset(&query.exclude)?;
        let max = query.max.unwrap_or(usize::MAX);
        Ok(self
            .lock_files()
            .keys()
            .filter(|p| {
                let rel = p.strip_prefix(&self.root).unwrap_or(p);
                include.is_match(rel) && !exclude.is_match(rel)
            })
            .take(max)
            .cloned()
            .collect())
    }

    fn open_documents(&self) -> Vec<Document> {
        let open = self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        open.iter()
            .map(|p| self.document(&p.to_string_lossy()))
            .collect()
    }

    fn workspace_folders(&self) -> Vec<PathBuf> {
        vec![self.root.clone()]
    }
}

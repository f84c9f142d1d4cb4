//! The editor-side collaborator: file contents, timestamps, enumeration and
//! the set of open documents. The engine only talks to files through this.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, SystemTime};

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use indexmap::IndexMap;

use crate::error::ScriptmarkError;
use crate::types::Document;

/// Workspace enumeration request.
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    /// Globs matched against the path relative to its workspace folder.
    pub include: Vec<String>,
    /// Matching files are skipped; matching directories are not descended.
    pub exclude: Vec<String>,
    pub max: Option<usize>,
}

impl FileQuery {
    /// Files with one of `extensions`, skipping `skip_dirs` anywhere in the tree.
    #[must_use]
    pub fn for_extensions(extensions: &[String], skip_dirs: &[String], max: Option<usize>) -> Self {
        let exclude = skip_dirs
            .iter()
            .flat_map(|d| [format!("**/{d}"), format!("**/{d}/**")])
            .collect();
        Self {
            include: crate::config::Config::globs_for(extensions),
            exclude,
            max,
        }
    }
}

pub trait Host: Send + Sync {
    fn read(&self, path: &Path) -> std::io::Result<String>;

    fn modified(&self, path: &Path) -> std::io::Result<SystemTime>;

    fn find_files(&self, query: &FileQuery) -> Result<Vec<PathBuf>, ScriptmarkError>;

    /// Documents open in the editing session, in the order they were opened.
    fn open_documents(&self) -> Vec<Document>;

    fn workspace_folders(&self) -> Vec<PathBuf>;

    /// The innermost workspace folder containing `path`.
    fn project_root(&self, path: &Path) -> Option<PathBuf> {
        self.workspace_folders()
            .into_iter()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
    }
}

/// Compile globs into a set, naming the offending pattern on failure.
pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet, ScriptmarkError> {
    let mut builder = GlobSetBuilder::new();
    for p in patterns {
        let glob = Glob::new(p).map_err(|e| ScriptmarkError::InvalidQuery {
            query: p.clone(),
            reason: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| ScriptmarkError::InvalidQuery {
        query: patterns.join(","),
        reason: e.to_string(),
    })
}

struct Overlay {
    text: String,
    modified: SystemTime,
}

/// Disk-backed host with an in-memory overlay for open documents.
///
/// An open document's timestamp is the time of its last `open`/`update`,
/// bumped forward if the clock hasn't moved, so every edit invalidates the
/// index entry for that path.
pub struct FsHost {
    roots: Vec<PathBuf>,
    open: Mutex<IndexMap<PathBuf, Overlay>>,
}

impl FsHost {
    #[must_use]
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            open: Mutex::new(IndexMap::new()),
        }
    }

    /// Start tracking `path` with the editor's text.
    pub fn open(&self, path: &Path, text: String) {
        let mut open = self.open.lock().unwrap_or_else(PoisonError::into_inner);
        let modified = next_stamp(open.get(path).map(|o| o.modified));
        open.insert(path.to_path_buf(), Overlay { text, modified });
    }

    /// Replace the text of an open document. Opens it if it wasn't.
    pub fn update(&self, path: &Path, text: String) {
        self.open(path, text);
    }

    /// Stop tracking `path`; reads fall back to disk.
    pub fn close(&self, path: &Path) -> bool {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .shift_remove(path)
            .is_some()
    }
}

fn next_stamp(previous: Option<SystemTime>) -> SystemTime {
    let now = SystemTime::now();
    match previous {
        Some(prev) if now <= prev => prev + Duration::from_nanos(1),
        _ => now,
    }
}

impl Host for FsHost {
    fn read(&self, path: &Path) -> std::io::Result<String> {
        if let Some(o) = self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(o.text.clone());
        }
        std::fs::read_to_string(path)
    }

    fn modified(&self, path: &Path) -> std::io::Result<SystemTime> {
        if let Some(o) = self
            .open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(path)
        {
            return Ok(o.modified);
        }
        std::fs::metadata(path)?.modified()
    }

    /// Sequential walk sorted by file name, so the cap always keeps the same files.
    /// Does NOT respect .gitignore: only the excludes decide what is skipped.
    fn find_files(&self, query: &FileQuery) -> Result<Vec<PathBuf>, ScriptmarkError> {
        let include = build_globset(&query.include)?;
        let exclude = build_globset(&query.exclude)?;
        let max = query.max.unwrap_or(usize::MAX);

        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for root in &self.roots {
            let walker = WalkBuilder::new(root)
                .hidden(false)
                .git_ignore(false)
                .git_global(false)
                .git_exclude(false)
                .ignore(false)
                .parents(false)
                .sort_by_file_name(|a, b| a.cmp(b))
                .filter_entry({
                    let exclude = exclude.clone();
                    let root = root.clone();
                    move |entry| {
                        let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                        !(entry.depth() > 0 && exclude.is_match(rel))
                    }
                })
                .build();

            for entry in walker {
                if files.len() >= max {
                    return Ok(files);
                }
                let Ok(entry) = entry else {
                    continue;
                };
                if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                    continue;
                }
                let path = entry.path();
                let rel = path.strip_prefix(root).unwrap_or(path);
                if include.is_match(rel) && seen.insert(path.to_path_buf()) {
                    files.push(path.to_path_buf());
                }
            }
        }

        Ok(files)
    }

    fn open_documents(&self) -> Vec<Document> {
        self.open
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(path, o)| Document::new(path.clone(), o.text.clone()))
            .collect()
    }

    fn workspace_folders(&self) -> Vec<PathBuf> {
        self.roots.clone()
    }
}

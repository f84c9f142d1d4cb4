//! Which files to search for a definition, and in what order.
//!
//! Tiers are consulted strictly in order. The first tier that yields
//! anything wins; later tiers are never even built. Within a tier, files are
//! looked up in fixed-size parallel batches and every batch of the tier
//! runs, so the batch size changes latency, never the answer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use crate::config::Config;
use crate::host::{FileQuery, Host};
use crate::reffile;
use crate::types::{Document, FileKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TierKind {
    /// Script documents open in the editor.
    OpenDocuments,
    /// Files named by `@reffile` directives in the querying document.
    ReferencedFiles,
    /// Capped enumeration of every script file in the workspace.
    Workspace,
}

#[derive(Debug, Clone)]
pub struct CandidateTier {
    pub kind: TierKind,
    pub files: Vec<PathBuf>,
}

pub struct CandidateFileSelector<'a> {
    host: &'a dyn Host,
    config: &'a Config,
}

impl<'a> CandidateFileSelector<'a> {
    #[must_use]
    pub fn new(host: &'a dyn Host, config: &'a Config) -> Self {
        Self { host, config }
    }

    /// Lazily produced tiers for `document`. Tier B is absent when the
    /// document has no directives.
    #[must_use]
    pub fn tiers<'d>(&'d self, document: &'d Document) -> Tiers<'d, 'a> {
        Tiers {
            selector: self,
            document,
            next: Some(TierKind::OpenDocuments),
        }
    }

    /// Open script documents. A standalone script queries itself first; a
    /// markup document's companion script (same directory and stem) leads.
    #[must_use]
    pub fn open_documents(&self, document: &Document) -> CandidateTier {
        let mut files: Vec<PathBuf> = self
            .host
            .open_documents()
            .into_iter()
            .map(|d| d.path)
            .filter(|p| self.config.kind_of(p) == FileKind::Script)
            .collect();

        match self.config.kind_of(&document.path) {
            FileKind::Script => {
                files.retain(|p| p != &document.path);
                files.insert(0, document.path.clone());
            }
            _ => {
                if let Some(i) = files.iter().position(|p| is_companion(&document.path, p)) {
                    let companion = files.remove(i);
                    files.insert(0, companion);
                }
            }
        }

        CandidateTier {
            kind: TierKind::OpenDocuments,
            files,
        }
    }

    #[must_use]
    pub fn referenced_files(&self, document: &Document) -> Option<CandidateTier> {
        let files: Vec<PathBuf> = reffile::resolve(self.host, self.config, document)
            .into_iter()
            .collect();
        (!files.is_empty()).then_some(CandidateTier {
            kind: TierKind::ReferencedFiles,
            files,
        })
    }

    /// Enumeration failure is logged and yields an empty tier.
    #[must_use]
    pub fn workspace(&self) -> CandidateTier {
        let query = FileQuery::for_extensions(
            &self.config.script_extensions,
            &self.config.skip_dirs,
            Some(self.config.max_workspace_files),
        );
        let files = self.host.find_files(&query).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "workspace enumeration failed");
            Vec::new()
        });
        CandidateTier {
            kind: TierKind::Workspace,
            files,
        }
    }
}

fn is_companion(markup: &Path, script: &Path) -> bool {
    markup.parent() == script.parent() && markup.file_stem() == script.file_stem()
}

/// Iterator over the tiers of one query. Each tier is built only when the
/// previous one came up empty.
pub struct Tiers<'d, 'a> {
    selector: &'d CandidateFileSelector<'a>,
    document: &'d Document,
    next: Option<TierKind>,
}

impl Iterator for Tiers<'_, '_> {
    type Item = CandidateTier;

    fn next(&mut self) -> Option<CandidateTier> {
        loop {
            let kind = self.next?;
            match kind {
                TierKind::OpenDocuments => {
                    self.next = Some(TierKind::ReferencedFiles);
                    return Some(self.selector.open_documents(self.document));
                }
                TierKind::ReferencedFiles => {
                    self.next = Some(TierKind::Workspace);
                    if let Some(tier) = self.selector.referenced_files(self.document) {
                        return Some(tier);
                    }
                }
                TierKind::Workspace => {
                    self.next = None;
                    return Some(self.selector.workspace());
                }
            }
        }
    }
}

/// Run `lookup` over each tier's files in batches of `batch_size`, stopping
/// after the first tier that produced any result. Results keep file order,
/// then per-file order. A file already searched in an earlier tier is
/// skipped.
pub fn search_tiers<T, F>(
    tiers: impl IntoIterator<Item = CandidateTier>,
    batch_size: usize,
    lookup: F,
) -> Vec<T>
where
    T: Send,
    F: Fn(&Path) -> Vec<T> + Sync,
{
    let batch_size = batch_size.max(1);
    let mut searched: HashSet<PathBuf> = HashSet::new();

    for tier in tiers {
        let files: Vec<PathBuf> = tier
            .files
            .into_iter()
            .filter(|p| searched.insert(p.clone()))
            .collect();
        if files.is_empty() {
            tracing::trace!(tier = ?tier.kind, "tier empty, skipping");
            continue;
        }

        let mut found = Vec::new();
        for batch in files.chunks(batch_size) {
            let results: Vec<Vec<T>> = batch.par_iter().map(|p| lookup(p)).collect();
            found.extend(results.into_iter().flatten());
        }

        tracing::debug!(
            tier = ?tier.kind,
            files = files.len(),
            hits = found.len(),
            "tier searched"
        );
        if !found.is_empty() {
            return found;
        }
    }

    Vec::new()
}

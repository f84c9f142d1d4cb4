use std::collections::HashSet;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::boundary;
use crate::config::Config;
use crate::error::ScriptmarkError;
use crate::host::{FileQuery, Host};
use crate::index::SymbolIndex;
use crate::lexer::code_mask;
use crate::text::{LineIndex, is_ident_char, word_at};
use crate::types::{Document, Location, Position};

/// Usage search over every markup file's script regions.
///
/// A usage is the identifier followed by `.member` or a call `(`. Bare
/// mentions and declarations don't count; this is a heuristic, not a
/// binder.
pub struct ReferenceFinder<'a> {
    host: &'a dyn Host,
    index: &'a SymbolIndex,
    config: &'a Config,
}

type LocationKey = (PathBuf, u32, u32);

impl<'a> ReferenceFinder<'a> {
    #[must_use]
    pub fn new(host: &'a dyn Host, index: &'a SymbolIndex, config: &'a Config) -> Self {
        Self {
            host,
            index,
            config,
        }
    }

    /// Usages of the identifier at `position`, deduplicated by
    /// path + line + column. The identifier under the cursor is never
    /// reported as its own reference.
    pub fn find_references(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<Location>, ScriptmarkError> {
        let lines = LineIndex::new(&document.text);
        let Some((word_start, word)) = word_at(&document.text, lines.offset(position)) else {
            return Ok(Vec::new());
        };

        let mut seen: HashSet<LocationKey> = HashSet::new();
        seen.insert((document.path.clone(), position.line, position.column));
        let seed = lines.position(word_start);
        seen.insert((document.path.clone(), seed.line, seed.column));

        let pattern = usage_pattern(word)?;
        let query = FileQuery::for_extensions(
            &self.config.markup_extensions,
            &self.config.skip_dirs,
            Some(self.config.max_workspace_files),
        );

        let mut references = Vec::new();
        for path in self.host.find_files(&query)? {
            let content = match self.index.content(self.host, &path) {
                Ok(c) => c,
                Err(e) => {
                    tracing::warn!(error = %e, "skipping file");
                    continue;
                }
            };
            for location in usages_in(&path, &content, &pattern) {
                if seen.insert((location.path.clone(), location.line, location.column)) {
                    references.push(location);
                }
            }
        }

        tracing::debug!(word, found = references.len(), "reference search");
        Ok(references)
    }
}

/// Every occurrence of the identifier. Boundaries and the usage suffix are
/// checked by hand so adjacent usages like `x.x(1)` and `f(f(x))` all match.
fn usage_pattern(word: &str) -> Result<Regex, ScriptmarkError> {
    Regex::new(&regex::escape(word)).map_err(|e| ScriptmarkError::InvalidQuery {
        query: word.to_string(),
        reason: e.to_string(),
    })
}

/// `.member` or optional whitespace then `(`.
fn is_usage_suffix(rest: &str) -> bool {
    if let Some(member) = rest.strip_prefix('.') {
        return member
            .chars()
            .next()
            .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$');
    }
    rest.trim_start().starts_with('(')
}

/// Usage sites inside the script regions of one markup file, in order.
fn usages_in(path: &Path, content: &str, pattern: &Regex) -> Vec<Location> {
    let lines = LineIndex::new(content);
    let mut found = Vec::new();

    for region in boundary::find_regions(content) {
        let script = region.slice(content);
        let mask = code_mask(script);
        for m in pattern.find_iter(&mask) {
            let preceded_by_ident = mask[..m.start()]
                .chars()
                .next_back()
                .is_some_and(is_ident_char);
            if preceded_by_ident || !is_usage_suffix(&mask[m.end()..]) {
                continue;
            }
            let offset = region.start + m.start();
            if region.contains(offset) {
                found.push(Location::new(path, lines.position(offset)));
            }
        }
    }

    found
}

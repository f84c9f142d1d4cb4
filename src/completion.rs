use std::collections::HashSet;
use std::path::Path;
use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;

use crate::boundary;
use crate::config::Config;
use crate::error::ScriptmarkError;
use crate::host::{FileQuery, Host};
use crate::index::SymbolIndex;
use crate::lexer::code_mask;
use crate::text::LineIndex;
use crate::types::{CompletionCandidate, Document, FileKind, Location, Position};

/// `identifier.` right before the cursor, nothing after the dot.
static MEMBER_ACCESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([\p{L}_$][\p{L}\p{N}_$]*)\.$")
        .unwrap_or_else(|e| unreachable!("member access pattern: {e}"))
});

/// Member completion after `obj.`, from `obj.method = function` style
/// assignments anywhere in the workspace's scripts.
pub struct MethodCompletionProvider<'a> {
    host: &'a dyn Host,
    index: &'a SymbolIndex,
    config: &'a Config,
}

impl<'a> MethodCompletionProvider<'a> {
    #[must_use]
    pub fn new(host: &'a dyn Host, index: &'a SymbolIndex, config: &'a Config) -> Self {
        Self {
            host,
            index,
            config,
        }
    }

    pub fn complete(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<CompletionCandidate>, ScriptmarkError> {
        let lines = LineIndex::new(&document.text);
        let offset = lines.offset(position);

        if self.config.kind_of(&document.path) != FileKind::Script
            && !boundary::is_inside(&document.text, offset)
        {
            return Ok(Vec::new());
        }

        let line_start = lines.offset(Position::new(position.line, 0));
        let Some(object) = object_before_cursor(&document.text[line_start..offset]) else {
            return Ok(Vec::new());
        };

        let pattern = assignment_pattern(object)?;
        let query = FileQuery::for_extensions(
            &self.config.script_extensions,
            &self.config.skip_dirs,
            Some(self.config.max_workspace_files),
        );
        let files = self.host.find_files(&query)?;

        let mut seen = HashSet::new();
        let mut candidates = Vec::new();
        for batch in files.chunks(self.config.batch_size.max(1)) {
            let found: Vec<Vec<(String, Location)>> = batch
                .par_iter()
                .map(|path| self.scan_file(path, &pattern))
                .collect();
            for (method, location) in found.into_iter().flatten() {
                if seen.insert(method.clone()) {
                    candidates.push(CompletionCandidate {
                        detail: format!("{object}.{method}()"),
                        insert_text: format!("{method}()"),
                        label: method,
                        location,
                    });
                }
            }
        }

        tracing::debug!(object, found = candidates.len(), "member completion");
        Ok(candidates)
    }

    /// Method names assigned on the object in one file, with their sites.
    fn scan_file(&self, path: &Path, pattern: &Regex) -> Vec<(String, Location)> {
        let content = match self.index.content(self.host, path) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "skipping file");
                return Vec::new();
            }
        };
        let mask = code_mask(&content);
        let lines = LineIndex::new(&content);
        pattern
            .captures_iter(&mask)
            .filter_map(|caps| {
                let method = caps.get(1)?;
                let location = Location::new(path, lines.position(method.start()));
                Some((method.as_str().to_string(), location))
            })
            .collect()
    }
}

fn object_before_cursor(prefix: &str) -> Option<&str> {
    MEMBER_ACCESS
        .captures(prefix)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// `OBJ.METHOD = function`, `OBJ.METHOD: function`, `OBJ.METHOD = (`, with
/// `OBJ` as a whole identifier (so `myobj.x` is not `obj.x`).
fn assignment_pattern(object: &str) -> Result<Regex, ScriptmarkError> {
    let pattern = format!(
        r"(?:^|[^\w$.]){}\.([\p{{L}}_$][\p{{L}}\p{{N}}_$]*)\s*(?:=\s*(?:function\b|\()|:\s*function\b)",
        regex::escape(object)
    );
    Regex::new(&pattern).map_err(|e| ScriptmarkError::InvalidQuery {
        query: object.to_string(),
        reason: e.to_string(),
    })
}

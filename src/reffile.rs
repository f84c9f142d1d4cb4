//! `@reffile` directives: explicit file dependencies declared in comments.
//!
//! ```text
//! <script>
//!   /* @reffile ./utils.js */        → <document dir>/utils.js
//!   // @reffile /shared/lib.js       → <workspace root>/shared/lib.js
//! </script>
//! ```

use std::path::{Component, Path, PathBuf};

use indexmap::IndexSet;

use crate::boundary;
use crate::config::Config;
use crate::host::Host;
use crate::lexer;
use crate::types::{Document, FileKind, ScriptRegion};

const DIRECTIVE: &[u8] = b"@reffile";

/// Dependency files declared by `document`, resolved to absolute paths,
/// deduplicated, in first-seen order.
pub fn resolve(host: &dyn Host, config: &Config, document: &Document) -> IndexSet<PathBuf> {
    let mut resolved = IndexSet::new();

    for region in script_regions(config, document) {
        let script = region.slice(&document.text);
        for comment in lexer::segments(script).into_iter().filter(|s| s.is_comment()) {
            for target in directives(comment.text(script)) {
                if let Some(path) = resolve_target(host, &document.path, target) {
                    resolved.insert(path);
                }
            }
        }
    }

    resolved
}

/// Markup contributes its `<script>` regions; a standalone script is one
/// region covering everything.
pub(crate) fn script_regions(config: &Config, document: &Document) -> Vec<ScriptRegion> {
    match config.kind_of(&document.path) {
        FileKind::Script => vec![ScriptRegion {
            start: 0,
            end: document.text.len(),
        }],
        FileKind::Markup | FileKind::Other => boundary::find_regions(&document.text),
    }
}

/// Path tokens following each `@reffile` in one comment's text.
fn directives(comment: &str) -> Vec<&str> {
    memchr::memmem::find_iter(comment.as_bytes(), DIRECTIVE)
        .filter_map(|at| {
            let rest = &comment[at + DIRECTIVE.len()..];
            // The directive must be followed by whitespace, then the path.
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            let token = rest.split_whitespace().next()?;
            let token = token.strip_suffix("*/").unwrap_or(token);
            (!token.is_empty()).then_some(token)
        })
        .collect()
}

fn resolve_target(host: &dyn Host, document: &Path, target: &str) -> Option<PathBuf> {
    let joined = if let Some(rooted) = target.strip_prefix('/') {
        let Some(root) = host.project_root(document) else {
            tracing::warn!(
                directive = target,
                document = %document.display(),
                "@reffile: no workspace folder contains this document, skipping"
            );
            return None;
        };
        root.join(rooted)
    } else {
        document.parent().unwrap_or(Path::new("")).join(target)
    };
    Some(normalize(&joined))
}

/// Lexically remove `.` and `..` without touching the filesystem.
#[must_use]
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `..` above the root stays at the root.
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other),
        }
    }
    out
}

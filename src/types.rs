use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Zero-based line/column position. Columns count UTF-16 code units, the
/// unit editors speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl Position {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// A position in a specific file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Location {
    pub path: PathBuf,
    pub line: u32,
    pub column: u32,
}

impl Location {
    #[must_use]
    pub fn new(path: &Path, pos: Position) -> Self {
        Self {
            path: path.to_path_buf(),
            line: pos.line,
            column: pos.column,
        }
    }

    #[must_use]
    pub const fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// Declared name → declaration sites, in scan order. Values are never empty.
pub type SymbolTable = HashMap<String, Vec<Location>>;

/// Byte span of the content between `<script ...>` and `</script>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptRegion {
    pub start: usize,
    pub end: usize,
}

impl ScriptRegion {
    /// Inclusive on both ends: a cursor sitting right after `>` or right
    /// before `</` is still inside.
    #[must_use]
    pub const fn contains(&self, offset: usize) -> bool {
        offset >= self.start && offset <= self.end
    }

    #[must_use]
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }
}

/// How a file participates in resolution. Decided by extension against the
/// configured lists, carried so downstream code never re-detects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// Standalone script (`.js`): the whole text is script.
    Script,
    /// Host markup (`.php`, `.html`): script only inside `<script>` regions.
    Markup,
    Other,
}

/// A document as the editor sees it: identity plus current text, which may
/// differ from what is on disk.
#[derive(Debug, Clone)]
pub struct Document {
    pub path: PathBuf,
    pub text: String,
}

impl Document {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }
}

/// A member completion offered after `obj.`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletionCandidate {
    pub label: String,
    /// `obj.method()`
    pub detail: String,
    /// `method()`
    pub insert_text: String,
    /// Where the method was first seen assigned.
    pub location: Location,
}

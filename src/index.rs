use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use std::time::SystemTime;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use regex::Regex;

use crate::error::ScriptmarkError;
use crate::host::Host;
use crate::lexer::code_mask;
use crate::text::LineIndex;
use crate::types::{Location, Position, SymbolTable};

/// Declaration forms, each optionally led by `const`/`let`/`var` or a
/// global attachment (`window.`). Group 1 is the declared name; the match
/// start (prefix included) is the reported column.
///
/// `NAME = {`, `NAME = function(`, `NAME = (`, `NAME: function(`, plus
/// plain `function NAME(`.
static DECLARATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        (?:(?:const|let|var)\s+)?
        (?:(?:window|globalThis|self)\.)?
        ([\p{L}_$][\p{L}\p{N}_$]*)
        \s*
        (?:
            =\s*(?:\{|\(|function\b\s*\*?\s*(?:[\p{L}_$][\p{L}\p{N}_$]*)?\s*\()
          | :\s*function\b\s*\*?\s*(?:[\p{L}_$][\p{L}\p{N}_$]*)?\s*\(
        )
      | \bfunction\b\s*\*?\s*([\p{L}_$][\p{L}\p{N}_$]*)\s*\(
        ",
    )
    .unwrap_or_else(|e| unreachable!("declaration pattern: {e}"))
});

/// One file's snapshot. Replaced wholesale on staleness, never patched.
pub struct FileIndexEntry {
    pub content: Arc<str>,
    pub symbols: SymbolTable,
    pub modified: SystemTime,
}

struct ContentEntry {
    content: Arc<str>,
    modified: SystemTime,
}

/// Per-file symbol cache, fresh iff the stored mtime equals the host's
/// current mtime for that path.
///
/// Two maps keyed independently: full entries for definition lookup, bare
/// content snapshots for scans that need no symbol table. Rebuilds happen
/// under the key's `entry()` lock, so two threads can't race on one path.
#[derive(Default)]
pub struct SymbolIndex {
    entries: DashMap<PathBuf, Arc<FileIndexEntry>>,
    contents: DashMap<PathBuf, ContentEntry>,
}

impl SymbolIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Declaration sites of `name` in `path`, in scan order.
    pub fn get_symbols(
        &self,
        host: &dyn Host,
        path: &Path,
        name: &str,
    ) -> Result<Vec<Location>, ScriptmarkError> {
        let entry = self.entry(host, path)?;
        Ok(entry.symbols.get(name).cloned().unwrap_or_default())
    }

    /// The fresh entry for `path`, rebuilding it if the file changed.
    pub fn entry(
        &self,
        host: &dyn Host,
        path: &Path,
    ) -> Result<Arc<FileIndexEntry>, ScriptmarkError> {
        let modified = host
            .modified(path)
            .map_err(|e| ScriptmarkError::io(path, e))?;

        match self.entries.entry(path.to_path_buf()) {
            Entry::Occupied(e) if e.get().modified == modified => {
                tracing::trace!(path = %path.display(), "symbol cache hit");
                Ok(Arc::clone(e.get()))
            }
            Entry::Occupied(mut e) => {
                tracing::debug!(path = %path.display(), "symbol cache stale, rebuilding");
                let fresh = Arc::new(build_entry(host, path, modified)?);
                e.insert(Arc::clone(&fresh));
                Ok(fresh)
            }
            Entry::Vacant(e) => {
                tracing::debug!(path = %path.display(), "indexing");
                let fresh = Arc::new(build_entry(host, path, modified)?);
                e.insert(Arc::clone(&fresh));
                Ok(fresh)
            }
        }
    }

    /// Current text of `path`, cached under the same freshness rule.
    pub fn content(&self, host: &dyn Host, path: &Path) -> Result<Arc<str>, ScriptmarkError> {
        let modified = host
            .modified(path)
            .map_err(|e| ScriptmarkError::io(path, e))?;

        match self.contents.entry(path.to_path_buf()) {
            Entry::Occupied(e) if e.get().modified == modified => Ok(Arc::clone(&e.get().content)),
            Entry::Occupied(mut e) => {
                let content: Arc<str> = read(host, path)?.into();
                e.insert(ContentEntry {
                    content: Arc::clone(&content),
                    modified,
                });
                Ok(content)
            }
            Entry::Vacant(e) => {
                let content: Arc<str> = read(host, path)?.into();
                e.insert(ContentEntry {
                    content: Arc::clone(&content),
                    modified,
                });
                Ok(content)
            }
        }
    }

    /// Drop everything cached for `path`. Returns whether anything was cached.
    pub fn invalidate(&self, path: &Path) -> bool {
        let had_entry = self.entries.remove(path).is_some();
        let had_content = self.contents.remove(path).is_some();
        had_entry || had_content
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.contents.clear();
    }

    /// Number of files with a symbol table.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn read(host: &dyn Host, path: &Path) -> Result<String, ScriptmarkError> {
    host.read(path).map_err(|e| ScriptmarkError::io(path, e))
}

fn build_entry(
    host: &dyn Host,
    path: &Path,
    modified: SystemTime,
) -> Result<FileIndexEntry, ScriptmarkError> {
    let content = read(host, path)?;
    let symbols = scan_declarations(path, &content);
    Ok(FileIndexEntry {
        content: content.into(),
        symbols,
        modified,
    })
}

/// Line-by-line declaration scan over the code mask, so declarations inside
/// comments and strings don't count. Columns come from the original text.
#[must_use]
pub fn scan_declarations(path: &Path, content: &str) -> SymbolTable {
    let mask = code_mask(content);
    let index = LineIndex::new(content);
    let mut symbols = SymbolTable::new();
    let mut line_start = 0;

    for (line_no, line) in mask.split('\n').enumerate() {
        for caps in DECLARATION.captures_iter(line) {
            let Some(name) = caps.get(1).or_else(|| caps.get(2)) else {
                continue;
            };
            let Some(whole) = caps.get(0) else {
                continue;
            };
            let column = index.position(line_start + whole.start()).column;
            symbols
                .entry(name.as_str().to_string())
                .or_default()
                .push(Location::new(path, Position::new(line_no as u32, column)));
        }
        line_start += line.len() + 1;
    }

    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryHost;

    fn names(content: &str) -> Vec<(String, u32, u32)> {
        let table = scan_declarations(Path::new("/w/a.js"), content);
        let mut out: Vec<_> = table
            .into_iter()
            .flat_map(|(name, locs)| {
                locs.into_iter()
                    .map(move |l| (name.clone(), l.line, l.column))
            })
            .collect();
        out.sort_by_key(|(_, line, col)| (*line, *col));
        out
    }

    #[test]
    fn const_object_reports_match_start() {
        let content = "// header\n\n\nconst foo = {\n  a: 1\n};";
        let table = scan_declarations(Path::new("/w/a.js"), content);
        let locs = &table["foo"];
        assert_eq!(locs.len(), 1);
        assert_eq!((locs[0].line, locs[0].column), (3, 0));
    }

    #[test]
    fn recognizes_every_declaration_form() {
        let content = "\
var App = {};
App.init = function (opts) {};
window.render = (el) => el;
let handler = function() {};
  onClick: function(e) {},
function plain(a, b) {}
";
        let found = names(content);
        assert_eq!(
            found,
            vec![
                ("App".to_string(), 0, 0),
                ("init".to_string(), 1, 4),
                ("render".to_string(), 2, 0),
                ("handler".to_string(), 3, 0),
                ("onClick".to_string(), 4, 2),
                ("plain".to_string(), 5, 0),
            ]
        );
    }

    #[test]
    fn ignores_comparisons_comments_and_strings() {
        let content = "\
if (a == (b)) {}
// fake = {
var s = \"ghost = function() {}\";
/* hidden = ( */
";
        assert!(names(content).is_empty(), "{:?}", names(content));
    }

    #[test]
    fn repeated_names_keep_scan_order() {
        let content = "foo = {};\nfoo = (x) => x;\n";
        let table = scan_declarations(Path::new("/w/a.js"), content);
        let lines: Vec<u32> = table["foo"].iter().map(|l| l.line).collect();
        assert_eq!(lines, vec![0, 1]);
    }

    #[test]
    fn columns_are_utf16_after_multibyte_text() {
        let content = "/* é */ var x = {};";
        let table = scan_declarations(Path::new("/w/a.js"), content);
        assert_eq!(table["x"][0].column, 8);
    }

    #[test]
    fn non_ascii_names_are_kept_whole() {
        let found = names("var ñandu = {};\nÉtat = function() {};\n");
        assert_eq!(
            found,
            vec![("ñandu".to_string(), 0, 0), ("État".to_string(), 1, 0)]
        );
    }

    #[test]
    fn fresh_entry_is_not_reread() {
        let host = MemoryHost::new("/w");
        host.write("/w/a.js", "var foo = {};");
        let index = SymbolIndex::new();

        let first = index.get_symbols(&host, Path::new("/w/a.js"), "foo").unwrap();
        let second = index.get_symbols(&host, Path::new("/w/a.js"), "foo").unwrap();
        assert_eq!(first, second);
        assert_eq!(host.reads(), 1);

        // Other names are answered from the same snapshot.
        assert!(index.get_symbols(&host, Path::new("/w/a.js"), "bar").unwrap().is_empty());
        assert_eq!(host.reads(), 1);
    }

    #[test]
    fn new_timestamp_rebuilds_wholesale() {
        let host = MemoryHost::new("/w");
        host.write("/w/a.js", "var foo = {};");
        let index = SymbolIndex::new();
        assert_eq!(index.get_symbols(&host, Path::new("/w/a.js"), "foo").unwrap().len(), 1);

        host.write("/w/a.js", "var bar = {};");
        assert!(index.get_symbols(&host, Path::new("/w/a.js"), "foo").unwrap().is_empty());
        assert_eq!(index.get_symbols(&host, Path::new("/w/a.js"), "bar").unwrap().len(), 1);
        assert_eq!(host.reads(), 2);
    }

    #[test]
    fn same_timestamp_edit_is_masked() {
        let host = MemoryHost::new("/w");
        host.write("/w/a.js", "var foo = {};");
        let index = SymbolIndex::new();
        index.get_symbols(&host, Path::new("/w/a.js"), "foo").unwrap();

        host.write_keeping_mtime("/w/a.js", "var bar = {};");
        // Documented gap: equal timestamps mean a cache hit.
        assert_eq!(index.get_symbols(&host, Path::new("/w/a.js"), "foo").unwrap().len(), 1);

        assert!(index.invalidate(Path::new("/w/a.js")));
        assert!(index.get_symbols(&host, Path::new("/w/a.js"), "foo").unwrap().is_empty());
    }

    #[test]
    fn missing_file_is_an_error_not_a_panic() {
        let host = MemoryHost::new("/w");
        let index = SymbolIndex::new();
        let err = index
            .get_symbols(&host, Path::new("/w/gone.js"), "foo")
            .unwrap_err();
        assert!(matches!(err, ScriptmarkError::NotFound { .. }));
        assert!(index.is_empty());
    }

    #[test]
    fn content_cache_is_keyed_separately() {
        let host = MemoryHost::new("/w");
        host.write("/w/a.js", "x.y = function() {};");
        let index = SymbolIndex::new();

        let text = index.content(&host, Path::new("/w/a.js")).unwrap();
        assert_eq!(&*text, "x.y = function() {};");
        index.content(&host, Path::new("/w/a.js")).unwrap();
        assert_eq!(host.reads(), 1);
        // No symbol table was built for the content-only path.
        assert_eq!(index.len(), 0);

        index.clear();
        index.content(&host, Path::new("/w/a.js")).unwrap();
        assert_eq!(host.reads(), 2);
    }
}

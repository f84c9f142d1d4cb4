use std::path::Path;

use crate::boundary;
use crate::candidates::{CandidateFileSelector, search_tiers};
use crate::config::Config;
use crate::error::ScriptmarkError;
use crate::host::Host;
use crate::index::SymbolIndex;
use crate::text::{LineIndex, word_at};
use crate::types::{Document, FileKind, Location, Position};

/// Go-to-definition across the candidate tiers.
pub struct DefinitionResolver<'a> {
    host: &'a dyn Host,
    index: &'a SymbolIndex,
    config: &'a Config,
}

impl<'a> DefinitionResolver<'a> {
    #[must_use]
    pub fn new(host: &'a dyn Host, index: &'a SymbolIndex, config: &'a Config) -> Self {
        Self {
            host,
            index,
            config,
        }
    }

    /// Declarations of the identifier at `position`. Empty when the cursor
    /// is outside script, on no identifier, or nothing declares it.
    pub fn find_definition(
        &self,
        document: &Document,
        position: Position,
    ) -> Result<Vec<Location>, ScriptmarkError> {
        let offset = LineIndex::new(&document.text).offset(position);

        if self.config.kind_of(&document.path) != FileKind::Script
            && !boundary::is_inside(&document.text, offset)
        {
            return Ok(Vec::new());
        }

        let Some((_, word)) = word_at(&document.text, offset) else {
            return Ok(Vec::new());
        };

        let selector = CandidateFileSelector::new(self.host, self.config);
        let locations = search_tiers(selector.tiers(document), self.config.batch_size, |path| {
            self.lookup(path, word)
        });

        tracing::debug!(word, found = locations.len(), "definition lookup");
        Ok(locations)
    }

    /// One file's hits. Unreadable files count as declaring nothing.
    fn lookup(&self, path: &Path, word: &str) -> Vec<Location> {
        self.index
            .get_symbols(self.host, path, word)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "skipping file");
                Vec::new()
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryHost;
    use std::path::PathBuf;

    const PAGE: &str = "<h1>Shop</h1>\n<script>\nCart.add(item);\n</script>\nCart.add outside";

    fn setup() -> (MemoryHost, SymbolIndex, Config) {
        let host = MemoryHost::new("/ws");
        host.write("/ws/page.php", PAGE);
        host.write("/ws/js/cart.js", "var Cart = {\n  add: function(item) {}\n};\n");
        host.write("/ws/js/other.js", "var Unrelated = {};\n");
        (host, SymbolIndex::new(), Config::default())
    }

    #[test]
    fn resolves_from_inside_script_region() {
        let (host, index, config) = setup();
        let resolver = DefinitionResolver::new(&host, &index, &config);
        let doc = host.document("/ws/page.php");

        let found = resolver.find_definition(&doc, Position::new(2, 1)).unwrap();
        assert_eq!(
            found,
            vec![Location::new(Path::new("/ws/js/cart.js"), Position::new(0, 0))]
        );

        let found = resolver.find_definition(&doc, Position::new(2, 6)).unwrap();
        assert_eq!(found[0].path, PathBuf::from("/ws/js/cart.js"));
        assert_eq!(found[0].position(), Position::new(1, 2));
    }

    #[test]
    fn outside_script_region_finds_nothing() {
        let (host, index, config) = setup();
        let resolver = DefinitionResolver::new(&host, &index, &config);
        let doc = host.document("/ws/page.php");
        assert!(resolver.find_definition(&doc, Position::new(4, 1)).unwrap().is_empty());
        assert_eq!(host.reads(), 0);
    }

    #[test]
    fn missing_symbol_is_empty_not_error() {
        let (host, index, config) = setup();
        host.write("/ws/q.js", "missing_symbol();\n");
        let resolver = DefinitionResolver::new(&host, &index, &config);
        let doc = host.document("/ws/q.js");
        assert!(resolver.find_definition(&doc, Position::new(0, 3)).unwrap().is_empty());
    }

    #[test]
    fn no_word_at_cursor_is_empty() {
        let (host, index, config) = setup();
        let resolver = DefinitionResolver::new(&host, &index, &config);
        let doc = Document::new("/ws/page.php", "<script>  (  )  </script>");
        assert!(resolver.find_definition(&doc, Position::new(0, 11)).unwrap().is_empty());
    }

    #[test]
    fn open_documents_shadow_the_workspace() {
        let (host, index, config) = setup();
        host.write("/ws/draft.js", "Cart = function() {};\n");
        host.open("/ws/draft.js");
        let resolver = DefinitionResolver::new(&host, &index, &config);
        let doc = host.document("/ws/page.php");

        let found = resolver.find_definition(&doc, Position::new(2, 1)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, PathBuf::from("/ws/draft.js"));
    }

    #[test]
    fn referenced_files_win_over_workspace() {
        let (host, index, config) = setup();
        host.write("/ws/vendorish/cart2.js", "var Cart = (function() {})();\n");
        let text = "<script>\n// @reffile ./vendorish/cart2.js\nCart.add(1);\n</script>";
        host.write("/ws/ref.php", text);
        let resolver = DefinitionResolver::new(&host, &index, &config);
        let doc = host.document("/ws/ref.php");

        let found = resolver.find_definition(&doc, Position::new(2, 0)).unwrap();
        assert_eq!(
            found,
            vec![Location::new(Path::new("/ws/vendorish/cart2.js"), Position::new(0, 0))]
        );
    }

    #[test]
    fn unreadable_referenced_file_falls_through_to_workspace() {
        let (host, index, config) = setup();
        let text = "<script>\n// @reffile ./gone.js\nCart.add(1);\n</script>";
        host.write("/ws/ref.php", text);
        let resolver = DefinitionResolver::new(&host, &index, &config);
        let doc = host.document("/ws/ref.php");

        let found = resolver.find_definition(&doc, Position::new(2, 0)).unwrap();
        assert_eq!(found[0].path, PathBuf::from("/ws/js/cart.js"));
    }
}

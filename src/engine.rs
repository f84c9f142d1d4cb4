//! The provider facade an editor integration talks to.
//!
//! Owns the host, the symbol index and the config. Every provider call
//! returns a plain list: failures are logged and come back empty, so
//! nothing inside the engine can take down the editor session.

use std::path::Path;

use crate::completion::MethodCompletionProvider;
use crate::config::Config;
use crate::definition::DefinitionResolver;
use crate::error::ScriptmarkError;
use crate::host::Host;
use crate::index::SymbolIndex;
use crate::references::ReferenceFinder;
use crate::types::{CompletionCandidate, Document, Location, Position};

pub struct Engine<H> {
    host: H,
    index: SymbolIndex,
    config: Config,
}

impl<H: Host> Engine<H> {
    #[must_use]
    pub fn new(host: H, config: Config) -> Self {
        Self {
            host,
            index: SymbolIndex::new(),
            config,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn index(&self) -> &SymbolIndex {
        &self.index
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current text of `path` as the host sees it (open buffer first).
    pub fn document(&self, path: &Path) -> Result<Document, ScriptmarkError> {
        let text = self
            .host
            .read(path)
            .map_err(|e| ScriptmarkError::io(path, e))?;
        Ok(Document::new(path, text))
    }

    pub fn provide_definition(&self, document: &Document, position: Position) -> Vec<Location> {
        let resolver = DefinitionResolver::new(&self.host, &self.index, &self.config);
        recover("definition", resolver.find_definition(document, position))
    }

    pub fn provide_completion_items(
        &self,
        document: &Document,
        position: Position,
    ) -> Vec<CompletionCandidate> {
        let provider = MethodCompletionProvider::new(&self.host, &self.index, &self.config);
        recover("completion", provider.complete(document, position))
    }

    pub fn provide_references(&self, document: &Document, position: Position) -> Vec<Location> {
        let finder = ReferenceFinder::new(&self.host, &self.index, &self.config);
        recover("references", finder.find_references(document, position))
    }

    /// Forget cached state for one path, or for everything with `None`.
    pub fn invalidate(&self, path: Option<&Path>) -> bool {
        match path {
            Some(p) => self.index.invalidate(p),
            None => {
                let had_any = !self.index.is_empty();
                self.index.clear();
                had_any
            }
        }
    }
}

fn recover<T>(provider: &str, result: Result<Vec<T>, ScriptmarkError>) -> Vec<T> {
    result.unwrap_or_else(|e| {
        tracing::error!(provider, error = %e, "provider failed");
        Vec::new()
    })
}

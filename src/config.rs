use std::path::Path;

use serde::Deserialize;

use crate::error::ScriptmarkError;
use crate::types::FileKind;

/// Config file looked up in the first workspace folder.
pub const CONFIG_FILE: &str = "scriptmark.toml";

// Never enumerated: dependencies, build output and VCS internals.
const DEFAULT_SKIP_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "bower_components",
    "vendor",
    "dist",
    "build",
    "out",
    "coverage",
    ".cache",
    ".next",
    ".nuxt",
    ".svelte-kit",
    ".turbo",
    ".parcel-cache",
    ".idea",
    ".vscode",
];

/// Engine tuning. Every field has a default; a config file only needs the
/// keys it changes.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Files looked up concurrently per batch. Latency knob only: results
    /// are identical for any value.
    pub batch_size: usize,
    /// Cap on the workspace-wide tier.
    pub max_workspace_files: usize,
    pub script_extensions: Vec<String>,
    pub markup_extensions: Vec<String>,
    pub skip_dirs: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            batch_size: 5,
            max_workspace_files: 1000,
            script_extensions: vec!["js".into(), "mjs".into(), "cjs".into()],
            markup_extensions: vec!["php".into(), "html".into(), "htm".into()],
            skip_dirs: DEFAULT_SKIP_DIRS.iter().map(|s| (*s).to_string()).collect(),
        }
    }
}

impl Config {
    /// Load `scriptmark.toml` from `root`, falling back to defaults when the
    /// file doesn't exist.
    pub fn load(root: &Path) -> Result<Self, ScriptmarkError> {
        let path = root.join(CONFIG_FILE);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ScriptmarkError::io(path, e)),
        };
        let config = Self::parse(&raw).map_err(|reason| ScriptmarkError::Config {
            path: path.clone(),
            reason,
        })?;
        tracing::debug!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// Parse and validate TOML text.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let config: Self = toml::from_str(raw).map_err(|e| e.message().to_string())?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.batch_size == 0 {
            return Err("batch_size must be at least 1".into());
        }
        if self.script_extensions.is_empty() {
            return Err("script_extensions must not be empty".into());
        }
        Ok(())
    }

    #[must_use]
    pub fn kind_of(&self, path: &Path) -> FileKind {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return FileKind::Other;
        };
        let has = |list: &[String]| list.iter().any(|e| e.eq_ignore_ascii_case(ext));
        if has(&self.script_extensions) {
            FileKind::Script
        } else if has(&self.markup_extensions) {
            FileKind::Markup
        } else {
            FileKind::Other
        }
    }

    /// `**/*.{js,mjs}`-style include globs for one extension list.
    #[must_use]
    pub fn globs_for(extensions: &[String]) -> Vec<String> {
        extensions.iter().map(|e| format!("**/*.{e}")).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = Config::parse("batch_size = 2\nmarkup_extensions = [\"vue\"]").unwrap();
        assert_eq!(config.batch_size, 2);
        assert_eq!(config.max_workspace_files, 1000);
        assert_eq!(config.kind_of(Path::new("a/b.vue")), FileKind::Markup);
        assert_eq!(config.kind_of(Path::new("a/b.php")), FileKind::Other);
        assert_eq!(config.kind_of(Path::new("a/b.js")), FileKind::Script);
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        let err = Config::parse("batch_size = 0").unwrap_err();
        assert!(err.contains("batch_size"), "{err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(Config::parse("batchsize = 3").is_err());
    }

    #[test]
    fn missing_file_means_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert_eq!(config.batch_size, 5);
    }

    #[test]
    fn broken_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "batch_size = [").unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, ScriptmarkError::Config { .. }));
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn extension_match_ignores_case() {
        let config = Config::default();
        assert_eq!(config.kind_of(Path::new("INDEX.PHP")), FileKind::Markup);
        assert_eq!(config.kind_of(Path::new("Makefile")), FileKind::Other);
        assert_eq!(Config::globs_for(&config.script_extensions)[0], "**/*.js");
    }
}

use std::path::PathBuf;

/// Every error scriptmark can produce. Providers never surface these to the
/// editor; they are logged and turned into empty results. The CLI shows them.
#[derive(Debug, thiserror::Error)]
pub enum ScriptmarkError {
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid query \"{query}\": {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("bad config in {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl ScriptmarkError {
    /// Wrap an I/O error, mapping `NotFound` to its own variant so the CLI
    /// can tell "no such file" from "couldn't read it".
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Process exit code for the CLI.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. } | Self::Io { .. } => 2,
            Self::InvalidQuery { .. } | Self::Config { .. } => 3,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_maps_to_not_found() {
        let err = ScriptmarkError::io(
            "/nope/a.js",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, ScriptmarkError::NotFound { .. }));
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.to_string(), "not found: /nope/a.js");
    }

    #[test]
    fn other_io_errors_keep_source() {
        let err = ScriptmarkError::io(
            "/x/b.js",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(matches!(err, ScriptmarkError::Io { .. }));
        assert!(err.to_string().contains("denied"));
    }
}

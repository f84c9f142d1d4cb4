#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,  // line/column numbers as u32, we target 64-bit
    clippy::cast_sign_loss,            // same
    clippy::module_name_repetitions,   // Rust naming conventions
    clippy::similar_names,             // common in scanner code
    clippy::too_many_lines,            // the segment state machine
    clippy::struct_excessive_bools,    // CLI struct derives clap
    clippy::missing_errors_doc,        // every error is a ScriptmarkError
    clippy::missing_panics_doc,        // same
)]

pub mod boundary;
pub mod candidates;
pub mod completion;
pub mod config;
pub mod definition;
pub mod engine;
pub mod error;
pub mod host;
pub mod index;
pub(crate) mod lexer;
pub mod logging;
pub mod reffile;
pub mod references;
pub mod server;
pub(crate) mod text;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::Engine;
pub use error::ScriptmarkError;
pub use host::{FileQuery, FsHost, Host};
pub use types::{CompletionCandidate, Document, Location, Position};

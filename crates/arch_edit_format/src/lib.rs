//! On-disk formats for arch_edit
//!
//! This crate reads and writes everything the archetype registry and the
//! map model touch on disk: the collected archetype archive and its
//! companion face/animation files, per-directory `.arc`/`.face`/`.png`
//! sources, artifact definitions, the multi-part position table and map
//! files. Writers produce the collected form back out of a registry.
//!
//! Bulk loaders are deliberately permissive: a malformed entry is logged
//! through `tracing`, recorded on the [`LoadReport`] and skipped, and the
//! load carries on. Only entry-point failures (unreadable archive file,
//! bad configuration TOML) surface as [`FormatError`].
//!
//! # Example
//!
//! ```rust,ignore
//! use arch_edit_core::ArchetypeRegistry;
//! use arch_edit_format::{load_archive, LoaderConfig};
//!
//! let config = LoaderConfig::default();
//! let mut registry = ArchetypeRegistry::new();
//! let report = load_archive(Path::new("arch"), &config, &mut registry)?;
//! println!("{}", report.summary());
//! ```

mod archive;
mod config;
mod directory;
mod map;
mod parser;

pub use archive::*;
pub use config::*;
pub use directory::*;
pub use map::*;
pub use parser::*;

use thiserror::Error;

/// Errors surfaced at loader and writer entry points
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
}

impl From<std::io::Error> for FormatError {
    fn from(err: std::io::Error) -> Self {
        FormatError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for FormatError {
    fn from(err: toml::de::Error) -> Self {
        FormatError::ParseError(err.to_string())
    }
}

/// Tally of one bulk load, plus every warning the loaders produced.
///
/// Warnings are emitted through `tracing::warn!` as they happen; the
/// report keeps a copy so a caller can show the user what the load
/// skipped.
#[derive(Debug, Default)]
pub struct LoadReport {
    pub arches: usize,
    pub faces: usize,
    pub animations: usize,
    pub artifacts: usize,
    warnings: Vec<String>,
}

impl LoadReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a warning and emit it through `tracing`.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// One-line summary for the status bar or the log.
    pub fn summary(&self) -> String {
        format!(
            "{} archetypes, {} faces, {} animations, {} artifacts ({} warnings)",
            self.arches,
            self.faces,
            self.animations,
            self.artifacts,
            self.warnings.len()
        )
    }
}

//! Type definitions and attribute validation for arch_edit
//!
//! This crate loads the type-definition library used to classify
//! archetypes: each `TypeDef` carries a type number, optional required
//! attribute pairs, and the attribute list an object of that type may
//! use. On top of the library sit the attribute-text syntax check and
//! the view filter bit rules.
//!
//! # Example
//!
//! ```rust,ignore
//! use arch_edit_schema::{load_type_library, check_syntax, EDIT_ALL};
//!
//! // Load the library from JSON
//! let library = load_type_library(Path::new("types.json"))?;
//!
//! // Classify and check one object
//! let ty = library.type_of(&obj, Some(&default));
//! check_syntax(&library, &obj, Some(&default))?;
//! library.edit_rules.calculate(&mut obj, Some(&default), EDIT_ALL);
//! ```

mod edit_type;
mod types;
mod validate;

pub use edit_type::*;
pub use types::*;
pub use validate::*;

use std::path::Path;
use thiserror::Error;

/// Errors that can occur when loading a type library
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Parse error: {0}")]
    ParseError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// Load a type library from a JSON file
pub fn load_type_library(path: &Path) -> Result<TypeLibrary, SchemaError> {
    let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError(e.to_string()))?;

    parse_type_library(&content)
}

/// Parse a type library from a JSON string
pub fn parse_type_library(json: &str) -> Result<TypeLibrary, SchemaError> {
    let mut library: TypeLibrary =
        serde_json::from_str(json).map_err(|e| SchemaError::ParseError(e.to_string()))?;

    validate_library(&library)?;
    library.resolve();

    Ok(library)
}

/// Load a type library from bytes
pub fn load_type_library_from_bytes(bytes: &[u8]) -> Result<TypeLibrary, SchemaError> {
    let mut library: TypeLibrary =
        serde_json::from_slice(bytes).map_err(|e| SchemaError::ParseError(e.to_string()))?;

    validate_library(&library)?;
    library.resolve();

    Ok(library)
}

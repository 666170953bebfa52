//! Archetype-based map editor core.
//!
//! This facade re-exports the `arch_edit` crates under one roof:
//! - [`core`] for attribute text, objects, the arena, map grids and the
//!   archetype registry
//! - [`schema`] for type definitions, syntax checking and the view
//!   filter rules
//! - [`format`] for archive/directory loading, map decode/encode and
//!   the collect writer
//!
//! # Example
//!
//! ```rust,ignore
//! use std::path::Path;
//! use arch_edit::prelude::*;
//!
//! // Load an archetype set from a directory tree
//! let config = LoaderConfig::default();
//! let mut registry = ArchetypeRegistry::new();
//! let report = load_directory(Path::new("arch"), &config, &mut registry)?;
//! println!("{}", report.summary());
//!
//! // Decode a map against it
//! let rules = EditTypeRules::default();
//! let ctx = AttachContext {
//!     registry: &registry,
//!     rules: &rules,
//!     mask: EDIT_ALL,
//!     shaped: config.shaped,
//! };
//! let mut arena = ObjectArena::new();
//! let (grid, _) = load_map_file(Path::new("maps/start"), &mut arena, &ctx)?;
//! ```

pub mod core {
    pub use arch_edit_core::*;
}

pub mod schema {
    pub use arch_edit_schema::*;
}

pub mod format {
    pub use arch_edit_format::*;
}

pub mod prelude {
    pub use arch_edit_core::{
        AnimationSet, ArchId, ArchObject, ArchetypeRegistry, AttrText, Face, LoadStatus, MapGrid,
        MultiData, MultiPositionTable, ObjectArena, TYPE_UNSET,
    };
    pub use arch_edit_format::{
        encode_map, load_archive, load_directory, load_map, load_map_file, save_map_file,
        write_archive, ArchParser, AttachContext, FormatError, LoadReport, LoaderConfig,
    };
    pub use arch_edit_schema::{
        check_syntax, load_type_library, parse_type_library, EditTypeRules, SchemaError,
        TypeLibrary, EDIT_ALL, EDIT_NONE,
    };
}

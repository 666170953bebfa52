//! Core data structures for arch_edit
//!
//! This crate provides the fundamental types for the archetype engine:
//! - `AttrText` - Line-oriented attribute diff/merge buffers
//! - `ArchObject` - One game object, default or live map instance
//! - `ObjectArena` / `ArchId` - Ownership and stable identity for live objects
//! - `MapGrid` - Per-square object stacks
//! - `MultiData` / `MultiPositionTable` - Multi-tile geometry
//! - `AnimationSet` - Named face-list animations
//! - `ArchetypeRegistry` - The default-archetype store with face resolution

mod anim;
mod arch;
mod arena;
mod attribute;
mod map;
mod multi;
mod registry;

pub use anim::{Animation, AnimationSet};
pub use arch::{ArchObject, FaceSource, FaceState, TYPE_UNSET};
pub use arena::{ArchId, ObjectArena};
pub use attribute::AttrText;
pub use map::MapGrid;
pub use multi::{MultiData, MultiPositionTable, ISO_TILE_HEIGHT, SHAPE_COLS, SHAPE_ROWS};
pub use registry::{ArchetypeRegistry, Face, LoadStatus};

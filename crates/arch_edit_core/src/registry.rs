//! The archetype registry: dense store of default archetypes, loaded
//! faces and animations, with name lookups and the load status machine.
//!
//! The registry is populated once by a bulk loader and passed by
//! reference to everything that resolves attributes, faces or map
//! objects against it. Node and face indices are append-only and stable
//! for the lifetime of a load pass.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::anim::AnimationSet;
use crate::arch::{ArchObject, FaceSource, FaceState};
use crate::multi::MultiPositionTable;

/// Registry population state. Map loading must not query the registry
/// until it reaches `Complete`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadStatus {
    #[default]
    Empty,
    Loading,
    Complete,
}

/// One loaded face image: a name plus where its pixels come from.
///
/// Directory loads carry the source path, archive loads carry the raw
/// bytes. Decoding pixels is the display layer's business.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Face {
    name: String,
    path: Option<PathBuf>,
    data: Option<Vec<u8>>,
}

impl Face {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            data: None,
        }
    }

    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_data(mut self, data: Vec<u8>) -> Self {
        self.data = Some(data);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn data(&self) -> Option<&[u8]> {
        self.data.as_deref()
    }
}

#[derive(Debug, Default)]
pub struct ArchetypeRegistry {
    arches: Vec<ArchObject>,
    arch_names: HashMap<String, usize>,
    faces: Vec<Face>,
    face_names: HashMap<String, usize>,
    animations: AnimationSet,
    multi_positions: MultiPositionTable,
    status: LoadStatus,
}

impl ArchetypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // ─── Status machine ───

    pub fn status(&self) -> LoadStatus {
        self.status
    }

    /// True once a load pass has finished with at least one archetype.
    pub fn is_ready(&self) -> bool {
        self.status == LoadStatus::Complete
    }

    /// Mark the start of a bulk load pass.
    pub fn begin_load(&mut self) {
        self.status = LoadStatus::Loading;
    }

    /// Close a load pass: connect faces and settle the status. A pass
    /// that found nothing leaves the registry `Empty`.
    pub fn finish_load(&mut self) -> LoadStatus {
        if self.arches.is_empty() {
            self.status = LoadStatus::Empty;
        } else {
            self.connect_faces();
            self.status = LoadStatus::Complete;
        }
        self.status
    }

    // ─── Archetypes ───

    /// Append a default archetype, returning its node number. The node
    /// back-reference is pointed at the entry itself, and the arch name
    /// is registered last-wins.
    pub fn add_arch(&mut self, mut obj: ArchObject) -> usize {
        let node = self.arches.len();
        obj.set_node(Some(node));
        if let Some(name) = obj.arch_name() {
            self.arch_names.insert(name.to_string(), node);
        }
        self.arches.push(obj);
        node
    }

    pub fn arch_count(&self) -> usize {
        self.arches.len()
    }

    pub fn arch(&self, node: usize) -> Option<&ArchObject> {
        self.arches.get(node)
    }

    pub fn arch_mut(&mut self, node: usize) -> Option<&mut ArchObject> {
        self.arches.get_mut(node)
    }

    pub fn arches(&self) -> impl Iterator<Item = &ArchObject> {
        self.arches.iter()
    }

    pub fn find_arch(&self, name: &str) -> Option<usize> {
        self.arch_names.get(name).copied()
    }

    /// The default archetype of `obj`, via its node back-reference.
    pub fn default_of(&self, obj: &ArchObject) -> Option<&ArchObject> {
        self.arches.get(obj.node()?)
    }

    // ─── Faces ───

    /// Append a face, returning its index. The face name is registered
    /// last-wins.
    pub fn add_face(&mut self, face: Face) -> usize {
        let index = self.faces.len();
        self.face_names.insert(face.name().to_string(), index);
        self.faces.push(face);
        index
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }

    pub fn face(&self, index: usize) -> Option<&Face> {
        self.faces.get(index)
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> {
        self.faces.iter()
    }

    pub fn find_face(&self, name: &str) -> Option<usize> {
        self.face_names.get(name).copied()
    }

    // ─── Animations and multi-part positions ───

    pub fn animations(&self) -> &AnimationSet {
        &self.animations
    }

    pub fn animations_mut(&mut self) -> &mut AnimationSet {
        &mut self.animations
    }

    pub fn multi_positions(&self) -> &MultiPositionTable {
        &self.multi_positions
    }

    pub fn set_multi_positions(&mut self, table: MultiPositionTable) {
        self.multi_positions = table;
    }

    // ─── Face resolution ───

    /// Resolve every node's face attribute to a loaded face index and
    /// recompute its display state. Runs once at the end of a load pass.
    pub fn connect_faces(&mut self) {
        for node in 0..self.arches.len() {
            let index = self.arches[node]
                .face_name()
                .and_then(|name| self.face_names.get(name).copied());
            if let Some(index) = index {
                self.arches[node].set_face_index(Some(index));
            }
            let state = self.resolve_face(&self.arches[node]);
            self.arches[node].apply_face_state(state);
        }
    }

    /// Compute which sprite `obj` displays: an animation frame when an
    /// animation applies (the object's own, else its default's), else
    /// the object's face, else the default's face. Every name resolves
    /// through the face table; resolving to nothing is a valid end
    /// state, not an error.
    pub fn resolve_face(&self, obj: &ArchObject) -> FaceState {
        let default = self.default_of(obj);
        let mut state = FaceState {
            no_face: true,
            ..FaceState::default()
        };

        let (anim_name, anim_source) = match obj.anim_name() {
            Some(name) => (Some(name), FaceSource::OwnAnim),
            None => (
                default.and_then(|d| d.anim_name()),
                FaceSource::DefaultAnim,
            ),
        };

        let name = if let Some(anim_name) = anim_name {
            // an active animation overrules the face attribute
            state.no_face = false;
            state.source = anim_source;
            let anim = self.animations.find(anim_name);
            let frame = anim.and_then(|index| {
                usize::try_from(obj.direction())
                    .ok()
                    .and_then(|dir| self.animations.frame(index, dir))
            });
            match frame {
                Some(frame) => {
                    state.anim = anim;
                    if anim
                        .and_then(|index| self.animations.get(index))
                        .map_or(false, |a| a.facings() > 0)
                    {
                        state.turnable = true;
                    }
                    Some(frame)
                }
                None => {
                    state.anim = None;
                    state.source = FaceSource::Unresolved;
                    None
                }
            }
        } else {
            state.source = FaceSource::OwnFace;
            obj.face_name().or_else(|| {
                state.source = FaceSource::DefaultFace;
                default.and_then(|d| d.face_name())
            })
        };

        state.face_name = name.map(str::to_string);
        match name {
            Some(name) => {
                state.no_face = false;
                match self.face_names.get(name) {
                    Some(&index) => state.face = Some(index),
                    None => state.source = FaceSource::Unresolved,
                }
            }
            None => state.source = FaceSource::Unresolved,
        }
        state
    }

    /// Recompute and store the display state of a map object.
    pub fn refresh_face(&self, obj: &mut ArchObject) {
        let state = self.resolve_face(obj);
        obj.apply_face_state(state);
    }

    /// Set a map object's face attribute. An empty name, or a name equal
    /// to the default archetype's face, clears the override so the
    /// object keeps inheriting.
    pub fn set_real_face(&self, obj: &mut ArchObject, name: Option<&str>) {
        let default_face = self
            .default_of(obj)
            .and_then(|d| d.face_name())
            .map(str::to_string);
        let name = name.map(str::trim).filter(|n| !n.is_empty());
        match name {
            None => obj.set_face_name(None),
            Some(n) if default_face.as_deref() == Some(n) => obj.set_face_name(None),
            Some(n) => {
                obj.set_face_name(Some(n.to_string()));
                obj.set_face_index(self.face_names.get(n).copied());
            }
        }
    }
}

//! The archetype object: one game object instance, either a registry
//! default or a live map/inventory object.
//!
//! An object's printed state is always the merge of its own attribute
//! text over its default archetype's text. The struct therefore stores
//! only overrides plus resolved display state, and every topology
//! relation (container, inventory chain, tile stack, multi-tile ring)
//! is an arena id spliced exclusively through `ObjectArena` and
//! `MapGrid` operations.

use crate::arena::ArchId;
use crate::attribute::AttrText;
use crate::multi::MultiData;

/// Type tag sentinel: take whatever type the default archetype specifies.
pub const TYPE_UNSET: i32 = -666;

/// Where an object's display face came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FaceSource {
    /// The object's own animation supplied the frame.
    OwnAnim,
    /// The default archetype's animation supplied the frame.
    DefaultAnim,
    /// The object's own face attribute.
    OwnFace,
    /// The default archetype's face.
    DefaultFace,
    /// Nothing resolved to a loaded face.
    #[default]
    Unresolved,
}

/// Resolved display state, computed by the registry and written back to
/// the object in one step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FaceState {
    pub face: Option<usize>,
    pub face_name: Option<String>,
    pub anim: Option<usize>,
    pub turnable: bool,
    pub no_face: bool,
    pub source: FaceSource,
}

#[derive(Debug, Clone)]
pub struct ArchObject {
    arch_name: Option<String>,
    obj_name: Option<String>,
    text: AttrText,
    msg: Option<String>,
    lore: Option<String>,
    anim_text: Option<String>,
    anim_name: Option<String>,
    face_name: Option<String>,
    face_index: Option<usize>,
    display: FaceState,
    type_nr: i32,
    direction: i32,
    node: Option<usize>,
    map_x: i32,
    map_y: i32,
    folder: Option<String>,
    artifact: bool,
    edit_type: u32,
    multi: Option<Box<MultiData>>,
    container: Option<ArchId>,
    inv_first: Option<ArchId>,
    inv_last: Option<ArchId>,
    inv_prev: Option<ArchId>,
    inv_next: Option<ArchId>,
    above: Option<ArchId>,
    below: Option<ArchId>,
}

impl Default for ArchObject {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchObject {
    pub fn new() -> Self {
        Self {
            arch_name: None,
            obj_name: None,
            text: AttrText::new(),
            msg: None,
            lore: None,
            anim_text: None,
            anim_name: None,
            face_name: None,
            face_index: None,
            display: FaceState::default(),
            type_nr: TYPE_UNSET,
            direction: 0,
            node: None,
            map_x: 0,
            map_y: 0,
            folder: None,
            artifact: false,
            edit_type: 0,
            multi: None,
            container: None,
            inv_first: None,
            inv_last: None,
            inv_prev: None,
            inv_next: None,
            above: None,
            below: None,
        }
    }

    pub fn with_arch_name(name: impl Into<String>) -> Self {
        let mut obj = Self::new();
        obj.arch_name = Some(name.into());
        obj
    }

    // ─── Names ───

    pub fn arch_name(&self) -> Option<&str> {
        self.arch_name.as_deref()
    }

    pub fn set_arch_name(&mut self, name: impl Into<String>) {
        self.arch_name = Some(name.into());
    }

    pub fn obj_name(&self) -> Option<&str> {
        self.obj_name.as_deref()
    }

    pub fn set_obj_name(&mut self, name: Option<String>) {
        self.obj_name = name;
    }

    /// The most descriptive available name: object name, the default's
    /// object name, arch name, the default's arch name, in that order.
    pub fn best_name<'a>(&'a self, default: Option<&'a ArchObject>) -> &'a str {
        if let Some(name) = self.obj_name.as_deref().filter(|n| !n.is_empty()) {
            return name;
        }
        if let Some(name) = default
            .and_then(|d| d.obj_name.as_deref())
            .filter(|n| !n.is_empty())
        {
            return name;
        }
        if let Some(name) = self.arch_name.as_deref().filter(|n| !n.is_empty()) {
            return name;
        }
        if let Some(name) = default.and_then(|d| d.arch_name.as_deref()) {
            return name;
        }
        "???"
    }

    // ─── Attribute text ───

    pub fn text(&self) -> &AttrText {
        &self.text
    }

    pub fn text_mut(&mut self) -> &mut AttrText {
        &mut self.text
    }

    /// Integer attribute resolved against the default archetype.
    pub fn attribute_value(&self, key: &str, default: Option<&ArchObject>) -> i32 {
        self.text.value_of(key, default.map(|d| &d.text))
    }

    /// String attribute resolved against the default archetype.
    pub fn attribute_string(&self, key: &str, default: Option<&ArchObject>) -> String {
        self.text.string_of(key, default.map(|d| &d.text))
    }

    // ─── Auxiliary buffers ───

    /// Message text. `None` means inherit from the default archetype;
    /// an empty buffer means explicitly no message.
    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Message buffer for appending, created empty when absent.
    pub fn msg_mut(&mut self) -> &mut String {
        self.msg.get_or_insert_with(String::new)
    }

    pub fn set_msg(&mut self, msg: Option<String>) {
        self.msg = msg;
    }

    pub fn lore(&self) -> Option<&str> {
        self.lore.as_deref()
    }

    pub fn lore_mut(&mut self) -> &mut String {
        self.lore.get_or_insert_with(String::new)
    }

    pub fn anim_text(&self) -> Option<&str> {
        self.anim_text.as_deref()
    }

    pub fn anim_text_mut(&mut self) -> &mut String {
        self.anim_text.get_or_insert_with(String::new)
    }

    pub fn set_anim_text(&mut self, text: Option<String>) {
        self.anim_text = text;
    }

    pub fn anim_name(&self) -> Option<&str> {
        self.anim_name.as_deref()
    }

    pub fn set_anim_name(&mut self, name: Option<String>) {
        self.anim_name = name;
    }

    // ─── Face fields ───

    /// The raw `face` attribute name. `None` inherits the default's face.
    pub fn face_name(&self) -> Option<&str> {
        self.face_name.as_deref()
    }

    pub fn set_face_name(&mut self, name: Option<String>) {
        self.face_name = name;
    }

    /// Loaded face index for the `face` attribute, once connected.
    pub fn face_index(&self) -> Option<usize> {
        self.face_index
    }

    pub fn set_face_index(&mut self, index: Option<usize>) {
        self.face_index = index;
    }

    /// The resolved display state (active face, animation, direction keys).
    pub fn display(&self) -> &FaceState {
        &self.display
    }

    pub fn apply_face_state(&mut self, state: FaceState) {
        self.display = state;
    }

    // ─── Type, direction, identity ───

    pub fn type_nr(&self) -> i32 {
        self.type_nr
    }

    pub fn set_type_nr(&mut self, type_nr: i32) {
        self.type_nr = type_nr;
    }

    pub fn direction(&self) -> i32 {
        self.direction
    }

    pub fn set_direction(&mut self, direction: i32) {
        self.direction = direction;
    }

    /// Registry node of this object's default archetype. A default points
    /// at itself.
    pub fn node(&self) -> Option<usize> {
        self.node
    }

    pub fn set_node(&mut self, node: Option<usize>) {
        self.node = node;
    }

    pub fn map_x(&self) -> i32 {
        self.map_x
    }

    pub fn map_y(&self) -> i32 {
        self.map_y
    }

    pub fn set_map_pos(&mut self, x: i32, y: i32) {
        self.map_x = x;
        self.map_y = y;
    }

    /// Display category assigned from the directory the arch was found in.
    pub fn folder(&self) -> Option<&str> {
        self.folder.as_deref()
    }

    pub fn set_folder(&mut self, folder: Option<String>) {
        self.folder = folder;
    }

    /// Artifact entries are derived archetypes; they are skipped when the
    /// archive is collected.
    pub fn is_artifact(&self) -> bool {
        self.artifact
    }

    pub fn set_artifact(&mut self, artifact: bool) {
        self.artifact = artifact;
    }

    pub fn edit_type(&self) -> u32 {
        self.edit_type
    }

    pub fn set_edit_type(&mut self, edit_type: u32) {
        self.edit_type = edit_type;
    }

    // ─── Multi-tile data ───

    pub fn multi(&self) -> Option<&MultiData> {
        self.multi.as_deref()
    }

    /// Multi-tile data, allocated on first use.
    pub fn multi_mut(&mut self) -> &mut MultiData {
        self.multi.get_or_insert_with(Default::default)
    }

    /// True for any part of a multi-square object.
    pub fn is_multi(&self) -> bool {
        self.multi
            .as_ref()
            .map_or(false, |m| m.is_tail || m.part_count > 0)
    }

    /// True for a tail part.
    pub fn is_tail(&self) -> bool {
        self.multi.as_ref().map_or(false, |m| m.is_tail)
    }

    /// Number of tail parts when this is a head, else 0.
    pub fn part_count(&self) -> i32 {
        self.multi.as_ref().map_or(0, |m| m.part_count)
    }

    /// Map ring: the head object of this part, if linked.
    pub fn multi_head(&self) -> Option<ArchId> {
        self.multi.as_ref().and_then(|m| m.head)
    }

    /// Map ring: the next part, if any.
    pub fn multi_next(&self) -> Option<ArchId> {
        self.multi.as_ref().and_then(|m| m.next)
    }

    pub(crate) fn set_multi_head(&mut self, head: Option<ArchId>) {
        self.multi_mut().head = head;
    }

    pub(crate) fn set_multi_next(&mut self, next: Option<ArchId>) {
        self.multi_mut().next = next;
    }

    // ─── Topology (read-only outside the arena) ───

    pub fn container(&self) -> Option<ArchId> {
        self.container
    }

    pub fn inv_first(&self) -> Option<ArchId> {
        self.inv_first
    }

    pub fn inv_last(&self) -> Option<ArchId> {
        self.inv_last
    }

    pub fn inv_prev(&self) -> Option<ArchId> {
        self.inv_prev
    }

    pub fn inv_next(&self) -> Option<ArchId> {
        self.inv_next
    }

    /// Next object upward in the tile stack.
    pub fn above(&self) -> Option<ArchId> {
        self.above
    }

    /// Next object downward in the tile stack.
    pub fn below(&self) -> Option<ArchId> {
        self.below
    }

    pub fn has_inventory(&self) -> bool {
        self.inv_first.is_some()
    }

    pub(crate) fn set_container(&mut self, id: Option<ArchId>) {
        self.container = id;
    }

    pub(crate) fn set_inv_first(&mut self, id: Option<ArchId>) {
        self.inv_first = id;
    }

    pub(crate) fn set_inv_last(&mut self, id: Option<ArchId>) {
        self.inv_last = id;
    }

    pub(crate) fn set_inv_prev(&mut self, id: Option<ArchId>) {
        self.inv_prev = id;
    }

    pub(crate) fn set_inv_next(&mut self, id: Option<ArchId>) {
        self.inv_next = id;
    }

    pub(crate) fn set_above(&mut self, id: Option<ArchId>) {
        self.above = id;
    }

    pub(crate) fn set_below(&mut self, id: Option<ArchId>) {
        self.below = id;
    }

    /// Clear every topology link. Used when an object leaves the map.
    pub(crate) fn clear_links(&mut self) {
        self.container = None;
        self.inv_first = None;
        self.inv_last = None;
        self.inv_prev = None;
        self.inv_next = None;
        self.above = None;
        self.below = None;
        if let Some(multi) = self.multi.as_deref_mut() {
            multi.head = None;
            multi.next = None;
        }
    }

    /// Copy of this object at map position `(x, y)` with every topology
    /// link cleared. Inventory children are arena objects and are not
    /// copied along.
    pub fn detached_clone(&self, x: i32, y: i32) -> ArchObject {
        let mut clone = self.clone();
        clone.clear_links();
        clone.map_x = x;
        clone.map_y = y;
        clone
    }
}

//! View filter classification
//!
//! Every map object carries a bitmask describing which editor view
//! filters it belongs to (floors, monsters, walls and so on). The
//! attribute predicates are fixed; the type-number sets behind the
//! exit, door, treasure, equipment and wall filters come from
//! `EditTypeRules` so a library can adjust them.

use arch_edit_core::ArchObject;
use serde::{Deserialize, Serialize};

use crate::types::effective_type_nr;

/// Living monster, npc or generator.
pub const EDIT_MONSTER: u32 = 1;
/// Exit, teleporter or trapdoor.
pub const EDIT_EXIT: u32 = 2;
/// Floor tiles.
pub const EDIT_BACKGROUND: u32 = 4;
/// Doors, gates and the keys that open them.
pub const EDIT_DOOR: u32 = 8;
/// Impassable type-0 objects.
pub const EDIT_WALL: u32 = 16;
/// Wearable or wieldable equipment.
pub const EDIT_EQUIP: u32 = 32;
/// Pickable valuables.
pub const EDIT_TREASURE: u32 = 64;
/// Objects wired to a connection value.
pub const EDIT_CONNECTED: u32 = 128;
/// Every real filter bit.
pub const EDIT_ALL: u32 = EDIT_MONSTER
    | EDIT_EXIT
    | EDIT_BACKGROUND
    | EDIT_DOOR
    | EDIT_WALL
    | EDIT_EQUIP
    | EDIT_TREASURE
    | EDIT_CONNECTED;
/// Marker for an object whose filter bits were never computed.
pub const EDIT_NONE: u32 = 0x10000;

/// Type-number sets consulted by [`EditTypeRules::calculate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditTypeRules {
    pub wall_types: Vec<i32>,
    pub exit_types: Vec<i32>,
    pub door_types: Vec<i32>,
    pub treasure_types: Vec<i32>,
    pub equip_types: Vec<i32>,
}

impl Default for EditTypeRules {
    fn default() -> Self {
        Self {
            wall_types: vec![0],
            exit_types: vec![41, 66, 95],
            door_types: vec![20, 21, 23, 24, 26, 91],
            treasure_types: vec![4, 5, 36, 60, 85, 111, 123, 124, 130],
            equip_types: vec![
                3, 13, 14, 15, 16, 33, 34, 35, 39, 70, 87, 99, 100, 104, 109, 113, 122,
            ],
        }
    }
}

impl EditTypeRules {
    /// Recompute the filter bits named in `mask` for one object and
    /// store the result on it. Bits outside `mask` keep their current
    /// value; the not-yet-computed marker is treated as all clear. A
    /// zero mask leaves the object untouched.
    ///
    /// Attributes are resolved against the default archetype, so a map
    /// object that overrides nothing classifies like its default.
    pub fn calculate(
        &self,
        obj: &mut ArchObject,
        default: Option<&ArchObject>,
        mask: u32,
    ) -> u32 {
        if mask == 0 {
            return obj.edit_type();
        }

        let mut edit = obj.edit_type();
        if edit == EDIT_NONE {
            edit = 0;
        } else {
            edit &= !mask;
        }

        let type_nr = effective_type_nr(obj, default);

        if mask & EDIT_BACKGROUND != 0
            && obj.attribute_value("is_floor", default) == 1
            && obj.attribute_value("no_pick", default) == 1
        {
            edit |= EDIT_BACKGROUND;
        }
        if mask & EDIT_MONSTER != 0
            && obj.attribute_value("alive", default) == 1
            && (obj.attribute_value("monster", default) == 1
                || obj.attribute_value("generator", default) == 1)
        {
            edit |= EDIT_MONSTER;
        }
        if mask & EDIT_WALL != 0
            && self.wall_types.contains(&type_nr)
            && obj.attribute_value("no_pass", default) == 1
        {
            edit |= EDIT_WALL;
        }
        if mask & EDIT_CONNECTED != 0 && obj.attribute_value("connected", default) != 0 {
            edit |= EDIT_CONNECTED;
        }
        if mask & EDIT_EXIT != 0 && self.exit_types.contains(&type_nr) {
            edit |= EDIT_EXIT;
        }
        if mask & EDIT_TREASURE != 0
            && obj.attribute_value("no_pick", default) == 0
            && self.treasure_types.contains(&type_nr)
        {
            edit |= EDIT_TREASURE;
        }
        if mask & EDIT_DOOR != 0 && self.door_types.contains(&type_nr) {
            edit |= EDIT_DOOR;
        }
        if mask & EDIT_EQUIP != 0
            && obj.attribute_value("no_pick", default) == 0
            && self.equip_types.contains(&type_nr)
        {
            edit |= EDIT_EQUIP;
        }

        obj.set_edit_type(edit);
        edit
    }
}

//! Type-definition library
//!
//! Archetypes are classified by type number, with optional required
//! attribute pairs to tell apart types that share a number. Every type
//! carries an ordered attribute list; the lists are merged with the
//! default type (and an optional imported type) when the library is
//! loaded, and drive the syntax check in `validate`.

use std::collections::{HashMap, HashSet};

use arch_edit_core::{ArchObject, TYPE_UNSET};
use serde::{Deserialize, Serialize};

use crate::EditTypeRules;

/// Value kind of an attribute, as entered in the editor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttrDataType {
    #[default]
    Int,
    String,
    Text,
    Bool,
    Fixed,
    Spell,
    NzSpell,
    Bitmask,
    List,
}

/// One attribute a type understands: the key as written in attribute
/// text, plus presentation metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrDef {
    pub key: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub data_type: AttrDataType,
    #[serde(default)]
    pub section: String,
}

impl AttrDef {
    /// Label for display, falling back to the raw key.
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            &self.key
        } else {
            &self.label
        }
    }
}

/// A `(key, value)` pair that must match for a type to apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredPair {
    pub key: String,
    pub value: String,
}

/// Attributes shared by every type. Conventionally these sit in the
/// `general` section, which imports skip.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultTypeDef {
    #[serde(default)]
    pub attributes: Vec<AttrDef>,
}

/// One entry of the type-definition library.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    pub number: i32,
    /// All pairs must match for this type to be chosen over a later
    /// entry with the same number. An expected value of `"0"` also
    /// matches an absent attribute.
    #[serde(default)]
    pub required: Vec<RequiredPair>,
    /// Default attributes excluded from this type, by key.
    #[serde(default)]
    pub ignore: Vec<String>,
    /// Names of library-level ignore lists to apply as well.
    #[serde(default)]
    pub ignore_lists: Vec<String>,
    /// Name of an earlier type whose attributes are appended to this
    /// type's list.
    #[serde(default)]
    pub import: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "use", default)]
    pub usage: String,
    #[serde(default)]
    pub attributes: Vec<AttrDef>,
    #[serde(skip)]
    all_attributes: Vec<AttrDef>,
}

impl TypeDef {
    /// The merged attribute list: defaults minus ignores, then this
    /// type's own attributes, then imported ones. Empty until the
    /// library has been resolved.
    pub fn all_attributes(&self) -> &[AttrDef] {
        &self.all_attributes
    }

    /// Whether `key` appears anywhere in the merged attribute list.
    pub fn knows_key(&self, key: &str) -> bool {
        self.all_attributes.iter().any(|attr| attr.key == key)
    }

    /// Section names in first-appearance order over the merged list.
    pub fn sections(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for attr in &self.all_attributes {
            if !attr.section.is_empty() && !seen.contains(&attr.section.as_str()) {
                seen.push(attr.section.as_str());
            }
        }
        seen
    }
}

/// The complete type-definition library, loaded from JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeLibrary {
    #[serde(default)]
    pub version: u32,
    /// Named attribute-key lists that types can reference in
    /// `ignore_lists`.
    #[serde(default)]
    pub ignore_lists: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub default_type: DefaultTypeDef,
    /// All types in declaration order. The first entry is the generic
    /// fallback used when nothing else matches.
    #[serde(default)]
    pub types: Vec<TypeDef>,
    #[serde(default)]
    pub edit_rules: EditTypeRules,
}

impl TypeLibrary {
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Lookup by the artificial type name shown in the editor.
    pub fn get_type(&self, name: &str) -> Option<&TypeDef> {
        let name = name.trim();
        self.types.iter().find(|ty| ty.name == name)
    }

    /// The type matching the given object, scanning in declaration
    /// order. A type matches when its number equals the object's
    /// effective type number and every required pair matches the
    /// resolved attribute text. Falls back to the first (generic) type;
    /// `None` only for an empty library.
    pub fn type_of(&self, obj: &ArchObject, default: Option<&ArchObject>) -> Option<&TypeDef> {
        let fallback = self.types.first()?;
        let type_nr = effective_type_nr(obj, default);

        let found = self.types.iter().find(|ty| {
            ty.number == type_nr
                && ty.required.iter().all(|pair| {
                    let value = obj.attribute_string(&pair.key, default);
                    value == pair.value || (pair.value == "0" && value.is_empty())
                })
        });

        Some(found.unwrap_or(fallback))
    }

    /// Materialize every type's merged attribute list. Runs once after
    /// parsing; assumes the library passed reference validation.
    pub(crate) fn resolve(&mut self) {
        let mut resolved: Vec<Vec<AttrDef>> = Vec::with_capacity(self.types.len());

        for (i, ty) in self.types.iter().enumerate() {
            let mut ignored: HashSet<&str> = ty.ignore.iter().map(String::as_str).collect();
            for list in &ty.ignore_lists {
                if let Some(keys) = self.ignore_lists.get(list) {
                    ignored.extend(keys.iter().map(String::as_str));
                }
            }

            let mut merged: Vec<AttrDef> = self
                .default_type
                .attributes
                .iter()
                .filter(|attr| !ignored.contains(attr.key.as_str()))
                .cloned()
                .collect();
            merged.extend(ty.attributes.iter().cloned());

            if let Some(import) = &ty.import {
                let source = self.types[..i]
                    .iter()
                    .position(|t| t.name.eq_ignore_ascii_case(import))
                    .and_then(|j| resolved.get(j));
                if let Some(attrs) = source {
                    merged.extend(
                        attrs
                            .iter()
                            .filter(|attr| !attr.section.eq_ignore_ascii_case("general"))
                            .cloned(),
                    );
                }
            }

            resolved.push(merged);
        }

        for (ty, attrs) in self.types.iter_mut().zip(resolved) {
            ty.all_attributes = attrs;
        }
    }
}

/// The object's own type number, or its default's when unset.
pub(crate) fn effective_type_nr(obj: &ArchObject, default: Option<&ArchObject>) -> i32 {
    if obj.type_nr() == TYPE_UNSET {
        default.map_or(TYPE_UNSET, ArchObject::type_nr)
    } else {
        obj.type_nr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_type_library;

    fn sample_library() -> TypeLibrary {
        parse_type_library(
            r#"{
            "version": 1,
            "ignore_lists": {
                "system_object": ["no_pick", "layer"]
            },
            "default_type": {
                "attributes": [
                    { "key": "name", "type": "string", "section": "general" },
                    { "key": "no_pick", "type": "bool", "section": "general" },
                    { "key": "layer", "type": "int", "section": "general" }
                ]
            },
            "types": [
                {
                    "name": "Misc", "number": 0,
                    "attributes": [ { "key": "material", "section": "misc" } ]
                },
                {
                    "name": "Spawn Point", "number": 81,
                    "required": [ { "key": "sys_object", "value": "1" } ],
                    "ignore_lists": ["system_object"],
                    "attributes": [ { "key": "speed", "section": "spawn" } ]
                },
                {
                    "name": "Monster & NPC", "number": 80,
                    "required": [ { "key": "alive", "value": "1" } ],
                    "attributes": [ { "key": "level", "section": "melee" } ]
                },
                {
                    "name": "Pet", "number": 80,
                    "attributes": [ { "key": "friendly", "section": "pet" } ]
                },
                {
                    "name": "Guard", "number": 88,
                    "import": "Monster & NPC",
                    "attributes": [ { "key": "patrol", "section": "guard" } ]
                }
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_type_of_by_number() {
        let library = sample_library();
        let mut obj = ArchObject::with_arch_name("grave");
        obj.set_type_nr(88);

        let ty = library.type_of(&obj, None).unwrap();
        assert_eq!(ty.name, "Guard");
    }

    #[test]
    fn test_required_pairs_disambiguate() {
        let library = sample_library();

        let mut alive = ArchObject::with_arch_name("goblin");
        alive.set_type_nr(80);
        alive.text_mut().append_line("alive 1");
        assert_eq!(library.type_of(&alive, None).unwrap().name, "Monster & NPC");

        let mut tame = ArchObject::with_arch_name("dog");
        tame.set_type_nr(80);
        assert_eq!(library.type_of(&tame, None).unwrap().name, "Pet");
    }

    #[test]
    fn test_zero_expected_matches_absent() {
        let library = parse_type_library(
            r#"{
            "types": [
                { "name": "Misc", "number": 0 },
                {
                    "name": "Closed Pit", "number": 94,
                    "required": [ { "key": "activated", "value": "0" } ]
                }
            ]
        }"#,
        )
        .unwrap();

        let mut pit = ArchObject::with_arch_name("pit");
        pit.set_type_nr(94);
        assert_eq!(library.type_of(&pit, None).unwrap().name, "Closed Pit");

        pit.text_mut().append_line("activated 1");
        assert_eq!(library.type_of(&pit, None).unwrap().name, "Misc");
    }

    #[test]
    fn test_unknown_number_falls_back_to_first() {
        let library = sample_library();
        let mut obj = ArchObject::with_arch_name("blob");
        obj.set_type_nr(999);
        assert_eq!(library.type_of(&obj, None).unwrap().name, "Misc");
    }

    #[test]
    fn test_type_number_inherited_from_default() {
        let library = sample_library();

        let mut default = ArchObject::with_arch_name("guard");
        default.set_type_nr(88);
        let obj = ArchObject::with_arch_name("guard");

        assert_eq!(obj.type_nr(), TYPE_UNSET);
        assert_eq!(library.type_of(&obj, Some(&default)).unwrap().name, "Guard");
    }

    #[test]
    fn test_required_pair_resolved_through_default() {
        let library = sample_library();

        let mut default = ArchObject::with_arch_name("goblin");
        default.set_type_nr(80);
        default.text_mut().append_line("alive 1");
        let obj = ArchObject::with_arch_name("goblin");

        let ty = library.type_of(&obj, Some(&default)).unwrap();
        assert_eq!(ty.name, "Monster & NPC");
    }

    #[test]
    fn test_merged_attributes() {
        let library = sample_library();
        let monster = library.get_type("Monster & NPC").unwrap();

        assert!(monster.knows_key("name"));
        assert!(monster.knows_key("no_pick"));
        assert!(monster.knows_key("level"));
        assert!(!monster.knows_key("material"));
    }

    #[test]
    fn test_ignore_list_strips_defaults() {
        let library = sample_library();
        let spawn = library.get_type("Spawn Point").unwrap();

        assert!(spawn.knows_key("name"));
        assert!(!spawn.knows_key("no_pick"));
        assert!(!spawn.knows_key("layer"));
        assert!(spawn.knows_key("speed"));
    }

    #[test]
    fn test_import_skips_general_section() {
        let library = sample_library();
        let guard = library.get_type("Guard").unwrap();

        assert!(guard.knows_key("patrol"));
        assert!(guard.knows_key("level"));
        let name_count = guard
            .all_attributes()
            .iter()
            .filter(|a| a.key == "name")
            .count();
        assert_eq!(name_count, 1);
    }

    #[test]
    fn test_sections_in_first_appearance_order() {
        let library = sample_library();
        let guard = library.get_type("Guard").unwrap();
        assert_eq!(guard.sections(), vec!["general", "guard", "melee"]);
    }

    #[test]
    fn test_display_label_falls_back_to_key() {
        let attr = AttrDef {
            key: "no_pass".to_string(),
            label: String::new(),
            data_type: AttrDataType::Bool,
            section: String::new(),
        };
        assert_eq!(attr.display_label(), "no_pass");
    }
}

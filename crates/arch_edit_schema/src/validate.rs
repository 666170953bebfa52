//! Library validation and attribute-text syntax checking

use arch_edit_core::ArchObject;

use crate::{SchemaError, TypeLibrary};

/// Validate that the type library is internally consistent.
pub fn validate_library(library: &TypeLibrary) -> Result<(), SchemaError> {
    if library.types.is_empty() {
        return Err(SchemaError::ValidationError(
            "type library defines no types".to_string(),
        ));
    }

    for (i, ty) in library.types.iter().enumerate() {
        for list in &ty.ignore_lists {
            if !library.ignore_lists.contains_key(list) {
                return Err(SchemaError::ValidationError(format!(
                    "Type '{}' references unknown ignore list '{}'",
                    ty.name, list
                )));
            }
        }

        // Imports resolve against earlier entries only, so the merged
        // attribute lists can be built in one forward pass.
        if let Some(import) = &ty.import {
            let found = library.types[..i]
                .iter()
                .any(|t| t.name.eq_ignore_ascii_case(import));
            if !found {
                return Err(SchemaError::ValidationError(format!(
                    "Type '{}' imports unknown or later-declared type '{}'",
                    ty.name, import
                )));
            }
        }
    }

    Ok(())
}

/// Check every line of the object's own attribute text against the
/// attribute list of its identified type. The default archetype is not
/// checked; its text is assumed correct.
///
/// Returns the unmatched lines verbatim. The `direction` attribute is
/// always accepted since it is maintained outside the type lists.
pub fn check_syntax(
    library: &TypeLibrary,
    obj: &ArchObject,
    default: Option<&ArchObject>,
) -> Result<(), Vec<String>> {
    let Some(ty) = library.type_of(obj, default) else {
        return Ok(());
    };

    let mut errors = Vec::new();
    for line in obj.text().as_str().lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        // A line without a value part is treated as a whole-line key.
        let key = line.split(' ').next().unwrap_or(line);
        if key == "direction" || ty.knows_key(key) {
            continue;
        }
        errors.push(line.to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_type_library;

    fn library() -> TypeLibrary {
        parse_type_library(
            r#"{
            "default_type": {
                "attributes": [
                    { "key": "name", "type": "string", "section": "general" },
                    { "key": "face", "type": "string", "section": "general" }
                ]
            },
            "types": [
                { "name": "Misc", "number": 0 },
                {
                    "name": "Floor", "number": 71,
                    "attributes": [
                        { "key": "is_floor", "type": "bool", "section": "terrain" },
                        { "key": "no_pick", "type": "bool", "section": "terrain" }
                    ]
                }
            ]
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_clean_text_passes() {
        let library = library();
        let mut floor = ArchObject::with_arch_name("floor_01");
        floor.set_type_nr(71);
        floor.text_mut().append_line("is_floor 1");
        floor.text_mut().append_line("no_pick 1");

        assert!(check_syntax(&library, &floor, None).is_ok());
    }

    #[test]
    fn test_unknown_attributes_reported_verbatim() {
        let library = library();
        let mut floor = ArchObject::with_arch_name("floor_01");
        floor.set_type_nr(71);
        floor.text_mut().append_line("is_floor 1");
        floor.text_mut().append_line("resist_fire 30");
        floor.text_mut().append_line("weight");

        let errors = check_syntax(&library, &floor, None).unwrap_err();
        assert_eq!(errors, vec!["resist_fire 30", "weight"]);
    }

    #[test]
    fn test_direction_always_accepted() {
        let library = library();
        let mut obj = ArchObject::with_arch_name("floor_01");
        obj.set_type_nr(71);
        obj.text_mut().append_line("direction 3");

        assert!(check_syntax(&library, &obj, None).is_ok());
    }

    #[test]
    fn test_check_uses_type_of_default_arch() {
        let library = library();
        let mut default = ArchObject::with_arch_name("floor_01");
        default.set_type_nr(71);

        let mut obj = ArchObject::with_arch_name("floor_01");
        obj.text_mut().append_line("is_floor 0");

        assert!(check_syntax(&library, &obj, Some(&default)).is_ok());
        assert!(check_syntax(&library, &obj, None).is_err());
    }

    #[test]
    fn test_empty_library_rejected() {
        let result = parse_type_library(r#"{ "types": [] }"#);
        assert!(matches!(result, Err(SchemaError::ValidationError(_))));
    }

    #[test]
    fn test_unknown_ignore_list_rejected() {
        let result = parse_type_library(
            r#"{
            "types": [
                { "name": "Misc", "number": 0, "ignore_lists": ["missing"] }
            ]
        }"#,
        );
        assert!(result.is_err());
        if let Err(SchemaError::ValidationError(msg)) = result {
            assert!(msg.contains("missing"));
        }
    }

    #[test]
    fn test_forward_import_rejected() {
        let result = parse_type_library(
            r#"{
            "types": [
                { "name": "Misc", "number": 0, "import": "Monster" },
                { "name": "Monster", "number": 80 }
            ]
        }"#,
        );
        assert!(matches!(result, Err(SchemaError::ValidationError(_))));
    }
}

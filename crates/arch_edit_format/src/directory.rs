use std::path::Path;

use arch_edit_core::{ArchetypeRegistry, Face};

use crate::archive::{finish_load, load_artifacts, load_position_table};
use crate::{ArchParser, FormatError, LoadReport, LoaderConfig};

/// Load archetypes, faces and animations from a directory tree.
///
/// Every `.arc` file is parsed as archetype blocks, every `.png`
/// becomes a face keyed by its file name, and `.face` files feed the
/// animation table. The first two directory levels under `root` name
/// the display folder assigned to the archetypes beneath them; deeper
/// levels inherit. Directories and files named in `skip_dirs` are left
/// out entirely.
pub fn load_directory(
    root: &Path,
    config: &LoaderConfig,
    registry: &mut ArchetypeRegistry,
) -> Result<LoadReport, FormatError> {
    if !root.is_dir() {
        return Err(FormatError::IoError(format!(
            "{} is not a directory",
            root.display()
        )));
    }
    let mut report = LoadReport::new();
    registry.begin_load();

    load_position_table(root, config, registry, &mut report);
    walk(root, config, registry, &mut report, 0, None);
    load_artifacts(root, config, registry, &mut report);
    finish_load(registry, &mut report);
    Ok(report)
}

fn walk(
    dir: &Path,
    config: &LoaderConfig,
    registry: &mut ArchetypeRegistry,
    report: &mut LoadReport,
    depth: usize,
    folder: Option<&str>,
) {
    let mut entries: Vec<_> = match std::fs::read_dir(dir) {
        Ok(iter) => iter.filter_map(Result::ok).collect(),
        Err(err) => {
            report.warn(format!("directory {} not read: {err}", dir.display()));
            return;
        }
    };
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();
        if config.skips(&name) {
            continue;
        }

        if path.is_dir() {
            // the first level names the panel, the second the category
            let child_folder = match depth {
                0 => Some(name),
                1 => Some(match folder {
                    Some(parent) => format!("{parent}/{name}"),
                    None => name,
                }),
                _ => folder.map(str::to_string),
            };
            walk(&path, config, registry, report, depth + 1, child_folder.as_deref());
        } else if name.ends_with(".arc") {
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    tracing::debug!(path = %path.display(), "parsing archetype file");
                    let mut parser = ArchParser::new(registry, report).shaped(config.shaped);
                    if let Some(folder) = folder {
                        parser = parser.folder(folder);
                    }
                    parser.parse_archetypes(&text);
                }
                Err(err) => {
                    report.warn(format!("archetype file {} not read: {err}", path.display()));
                }
            }
        } else if name.ends_with(".png") {
            if let Some(set) = config.image_set.as_deref() {
                if !name.contains(&format!(".{set}.")) {
                    continue;
                }
            }
            let face = face_name(&name, config.image_set.as_deref());
            registry.add_face(Face::new(face).with_path(path));
        } else if name.ends_with(".face") {
            match std::fs::read_to_string(&path) {
                Ok(text) => parse_face_file(&text, registry),
                Err(err) => {
                    report.warn(format!("face file {} not read: {err}", path.display()));
                }
            }
        }
    }
}

/// Face name for a png file name, with the image-set infix snipped out
/// when one is configured (`blocked.base.111.png` becomes `blocked.111`).
fn face_name(file_name: &str, image_set: Option<&str>) -> String {
    let stem = file_name.strip_suffix(".png").unwrap_or(file_name);
    if image_set.is_some() {
        let mut dots = file_name
            .char_indices()
            .filter(|&(_, c)| c == '.')
            .map(|(i, _)| i);
        if let (Some(first), Some(second)) = (dots.next(), dots.next()) {
            return format!("{}{}", &file_name[..first], &stem[second..]);
        }
    }
    stem.to_string()
}

/// Parse a `.face` file: `animation <name>` opens a block, `mina`
/// closes it and registers the frame list under that name. A block
/// still open at end of file is dropped.
fn parse_face_file(text: &str, registry: &mut ArchetypeRegistry) {
    let mut name: Option<String> = None;
    let mut frames = String::new();

    for raw in text.lines() {
        let line = raw.trim();
        if line.starts_with('#') {
            continue;
        }
        if let Some(rest) = line.strip_prefix("animation ") {
            name = Some(rest.trim().to_string());
            frames.clear();
        } else if line == "mina" {
            if let Some(name) = name.take() {
                registry.animations_mut().add(name, frames.as_str());
            }
            frames.clear();
        } else if name.is_some() && !line.is_empty() {
            frames.push_str(line);
            frames.push('\n');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn build_tree(root: &Path) {
        let floors = root.join("ground/floors");
        std::fs::create_dir_all(&floors).unwrap();
        std::fs::write(
            floors.join("floor.arc"),
            "Object floor\nname Dull Floor\ntype 71\nend\n",
        )
        .unwrap();
        std::fs::write(floors.join("floor.111.png"), b"PNG1").unwrap();

        let deep = root.join("ground/deep/more");
        std::fs::create_dir_all(&deep).unwrap();
        std::fs::write(deep.join("pebble.arc"), "Object pebble\nend\n").unwrap();

        let skipped = root.join("cvs");
        std::fs::create_dir_all(&skipped).unwrap();
        std::fs::write(skipped.join("junk.arc"), "Object junk\nend\n").unwrap();
    }

    #[test]
    fn test_load_directory_walks_tree() {
        let dir = TempDir::new().unwrap();
        build_tree(dir.path());

        let config = LoaderConfig::default();
        let mut registry = ArchetypeRegistry::new();
        let report = load_directory(dir.path(), &config, &mut registry).unwrap();

        assert_eq!(report.arches, 2);
        assert_eq!(report.faces, 1);
        assert!(registry.is_ready());

        let floor = registry.arch(registry.find_arch("floor").unwrap()).unwrap();
        assert_eq!(floor.folder(), Some("ground/floors"));
        // depth three inherits the depth-two category
        let pebble = registry.arch(registry.find_arch("pebble").unwrap()).unwrap();
        assert_eq!(pebble.folder(), Some("ground/deep"));
        assert!(registry.find_arch("junk").is_none());

        let face = registry.face(registry.find_face("floor.111").unwrap()).unwrap();
        assert!(face.path().is_some());
        assert!(face.data().is_none());
    }

    #[test]
    fn test_load_directory_rejects_file_root() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not_a_dir");
        std::fs::write(&file, "x").unwrap();

        let config = LoaderConfig::default();
        let mut registry = ArchetypeRegistry::new();
        let result = load_directory(&file, &config, &mut registry);
        assert!(matches!(result, Err(FormatError::IoError(_))));
    }

    #[test]
    fn test_face_file_animations() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("torch.arc"),
            "Object torch\nend\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("torch.face"),
            "# torch flames\nanimation torch_lit\nfacings 1\ntorch.111\ntorch.112\nmina\nanimation broken\n",
        )
        .unwrap();

        let config = LoaderConfig::default();
        let mut registry = ArchetypeRegistry::new();
        load_directory(dir.path(), &config, &mut registry).unwrap();

        let index = registry.animations().find("torch_lit").unwrap();
        let anim = registry.animations().get(index).unwrap();
        assert_eq!(anim.list(), "facings 1\ntorch.111\ntorch.112\n");
        // the unterminated block is dropped
        assert!(registry.animations().find("broken").is_none());
    }

    #[test]
    fn test_image_set_filter_and_mangling() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("block.arc"), "Object block\nend\n").unwrap();
        std::fs::write(dir.path().join("blocked.base.111.png"), b"a").unwrap();
        std::fs::write(dir.path().join("blocked.alt.111.png"), b"b").unwrap();

        let config = LoaderConfig {
            image_set: Some("base".to_string()),
            ..LoaderConfig::default()
        };
        let mut registry = ArchetypeRegistry::new();
        let report = load_directory(dir.path(), &config, &mut registry).unwrap();

        assert_eq!(report.faces, 1);
        assert!(registry.find_face("blocked.111").is_some());
    }

    #[test]
    fn test_face_name_without_image_set() {
        assert_eq!(face_name("floor.111.png", None), "floor.111");
        assert_eq!(face_name("floor.base.111.png", Some("base")), "floor.111");
        assert_eq!(face_name("plain.png", Some("base")), "plain");
    }
}

use std::path::Path;

use arch_edit_core::{
    ArchObject, ArchetypeRegistry, Face, LoadStatus, MultiPositionTable,
};

use crate::{ArchParser, FormatError, LoadReport, LoaderConfig, MAP_ARCH_NAME};

/// Load a pre-collected archive set from `dir` into the registry.
///
/// Reads the archetype text archive and the binary face archive named
/// by `config`, then the artifacts file. Only a missing archetype file
/// is fatal; everything else degrades to a warning in the report.
pub fn load_archive(
    dir: &Path,
    config: &LoaderConfig,
    registry: &mut ArchetypeRegistry,
) -> Result<LoadReport, FormatError> {
    let mut report = LoadReport::new();
    registry.begin_load();

    load_position_table(dir, config, registry, &mut report);

    let arch_path = dir.join(&config.arch_file);
    tracing::debug!(path = %arch_path.display(), "reading archetype archive");
    let text = std::fs::read_to_string(&arch_path)?;
    ArchParser::new(registry, &mut report)
        .shaped(config.shaped)
        .parse_archetypes(&text);

    let face_path = dir.join(&config.face_file);
    match std::fs::read(&face_path) {
        Ok(bytes) => parse_face_archive(&bytes, registry, &mut report),
        Err(err) => report.warn(format!(
            "face archive {} not read: {err}",
            face_path.display()
        )),
    }

    load_artifacts(dir, config, registry, &mut report);
    finish_load(registry, &mut report);
    Ok(report)
}

/// Probe for the display position table next to the archetypes, then
/// in the conventional editor config subdirectory.
pub(crate) fn load_position_table(
    dir: &Path,
    config: &LoaderConfig,
    registry: &mut ArchetypeRegistry,
    report: &mut LoadReport,
) {
    let candidates = [
        dir.join(&config.positions_file),
        dir.join("dev/editor/conf").join(&config.positions_file),
    ];
    for path in &candidates {
        if let Ok(text) = std::fs::read_to_string(path) {
            let (table, warnings) = MultiPositionTable::parse(&text);
            for warning in warnings {
                report.warn(warning);
            }
            registry.set_multi_positions(table);
            tracing::debug!(path = %path.display(), "loaded display position table");
            return;
        }
    }
    report.warn(format!(
        "display position table {} not found",
        config.positions_file
    ));
}

pub(crate) fn load_artifacts(
    dir: &Path,
    config: &LoaderConfig,
    registry: &mut ArchetypeRegistry,
    report: &mut LoadReport,
) {
    let path = dir.join(&config.artifacts_file);
    match std::fs::read_to_string(&path) {
        Ok(text) => {
            ArchParser::new(registry, report)
                .shaped(config.shaped)
                .parse_artifacts(&text);
        }
        Err(err) => report.warn(format!("artifacts file {} not read: {err}", path.display())),
    }
}

/// Settle the registry status and fill the report counts.
pub(crate) fn finish_load(registry: &mut ArchetypeRegistry, report: &mut LoadReport) {
    if registry.finish_load() == LoadStatus::Empty {
        report.warn("no archetypes found");
    }
    report.arches = registry.arches().filter(|a| !a.is_tail()).count();
    report.faces = registry.face_count();
    report.animations = registry.animations().len();
    tracing::info!("loaded {}", report.summary());
}

/// Read a collected face archive: repeated `IMAGE <index> <size> <path>`
/// headers, each followed by exactly `size` raw image bytes.
///
/// The path hint may contain dots; the face name is whatever follows
/// the last `/`, delimited by the header's linefeed. The declared size
/// is trusted, a truncated stream ends the read with a warning.
pub fn parse_face_archive(bytes: &[u8], registry: &mut ArchetypeRegistry, report: &mut LoadReport) {
    let mut pos = 0;
    while pos < bytes.len() {
        let Some(line_len) = bytes[pos..].iter().position(|&b| b == b'\n') else {
            report.warn("face archive ends inside a header line");
            return;
        };
        let header = &bytes[pos..pos + line_len];
        pos += line_len + 1;

        let Ok(header) = std::str::from_utf8(header) else {
            report.warn("face archive header is not valid text");
            return;
        };
        let mut fields = header.splitn(4, ' ');
        if fields.next() != Some("IMAGE") {
            report.warn(format!("unrecognized face archive header: {header:?}"));
            return;
        }
        fields.next(); // stored index, positional only
        let Some(size) = fields.next().and_then(|f| f.parse::<usize>().ok()) else {
            report.warn(format!("face archive header has no byte length: {header:?}"));
            return;
        };
        let hint = fields.next().unwrap_or_default().trim();
        let name = hint.rsplit('/').next().unwrap_or(hint);

        if pos + size > bytes.len() {
            report.warn(format!("face archive truncated inside {name}"));
            return;
        }
        registry.add_face(Face::new(name).with_data(bytes[pos..pos + size].to_vec()));
        pos += size;
    }
}

/// Regenerate the collected archive files from a loaded registry.
///
/// Writes the archetype text, the animation table, the face-name
/// listing and the binary face archive into `dir`. The inverse of
/// [`load_archive`] up to whitespace normalization; artifact entries
/// stay in the artifacts file and are not collected.
pub fn write_archive(
    dir: &Path,
    config: &LoaderConfig,
    registry: &ArchetypeRegistry,
) -> Result<LoadReport, FormatError> {
    let mut report = LoadReport::new();
    std::fs::create_dir_all(dir)?;
    std::fs::write(
        dir.join(&config.arch_file),
        collect_archetypes(registry, &mut report),
    )?;
    std::fs::write(
        dir.join(&config.animations_file),
        collect_animations(registry),
    )?;
    std::fs::write(dir.join(&config.bmaps_file), collect_bmaps(registry))?;
    std::fs::write(
        dir.join(&config.face_file),
        collect_faces(registry, &mut report),
    )?;
    report.arches = registry
        .arches()
        .filter(|a| !a.is_tail() && !a.is_artifact())
        .count();
    report.faces = registry.face_count();
    report.animations = registry.animations().len();
    tracing::info!("collected {}", report.summary());
    Ok(report)
}

/// Serialize every default archetype back into archive text. Tails
/// follow their head as `More` blocks, artifacts are skipped, and the
/// `map` archetype comes last with its size fields always written.
pub fn collect_archetypes(registry: &ArchetypeRegistry, report: &mut LoadReport) -> String {
    let mut out = String::new();
    for node in 0..registry.arch_count() {
        let Some(arch) = registry.arch(node) else {
            continue;
        };
        if arch.is_artifact() || arch.is_tail() || arch.arch_name() == Some(MAP_ARCH_NAME) {
            continue;
        }
        write_collected_arch(&mut out, arch, true, false);

        let parts = arch.part_count();
        for part in 1..=parts.max(0) as usize {
            let Some(tail) = registry.arch(node + part) else {
                report.warn(format!(
                    "multipart {} is missing tail {part} of {parts}",
                    arch.best_name(None)
                ));
                break;
            };
            if !tail.is_tail() {
                report.warn(format!(
                    "multipart object too short: {} follows {} and is not a tail",
                    tail.best_name(None),
                    arch.best_name(None)
                ));
            }
            out.push_str("More\n");
            write_collected_arch(&mut out, tail, false, true);
        }
    }

    if let Some(arch) = registry.find_arch(MAP_ARCH_NAME).and_then(|n| registry.arch(n)) {
        write_map_defaults(&mut out, arch);
    }
    out
}

fn write_collected_arch(out: &mut String, arch: &ArchObject, folder: bool, offsets: bool) {
    out.push_str("Object ");
    out.push_str(arch.arch_name().unwrap_or_default());
    out.push('\n');
    if let Some(name) = arch.obj_name() {
        out.push_str(&format!("name {name}\n"));
    }
    if arch.type_nr() > 0 {
        out.push_str(&format!("type {}\n", arch.type_nr()));
    }
    let (shape, part) = arch.multi().map_or((0, 0), |m| (m.shape, m.part));
    if shape > 0 {
        out.push_str(&format!("mpart_id {shape}\n"));
    }
    if part > 0 {
        out.push_str(&format!("mpart_nr {part}\n"));
    }
    if let Some(msg) = arch.msg() {
        out.push_str("msg\n");
        if msg.len() > 1 {
            out.push_str(msg);
            if !msg.ends_with('\n') {
                out.push('\n');
            }
        }
        out.push_str("endmsg\n");
    }
    if folder {
        if let Some(category) = arch.folder() {
            out.push_str(&format!("editor_folder {category}\n"));
        }
    }
    let text = arch.text().as_str();
    if !text.is_empty() {
        out.push_str(text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
    }
    if offsets && arch.is_tail() {
        let (x, y) = arch.multi().map_or((0, 0), |m| (m.offset_x, m.offset_y));
        if x != 0 {
            out.push_str(&format!("x {x}\n"));
        }
        if y != 0 {
            out.push_str(&format!("y {y}\n"));
        }
    }
    out.push_str("end\n");
}

fn write_map_defaults(out: &mut String, arch: &ArchObject) {
    out.push_str("Object ");
    out.push_str(arch.arch_name().unwrap_or_default());
    out.push('\n');
    // the default grid size travels in the offset fields
    let (x, y) = arch.multi().map_or((0, 0), |m| (m.offset_x, m.offset_y));
    out.push_str(&format!("x {x}\ny {y}\n"));
    if let Some(name) = arch.obj_name() {
        out.push_str(&format!("name {name}\n"));
    }
    if arch.type_nr() > 0 {
        out.push_str(&format!("type {}\n", arch.type_nr()));
    }
    let text = arch.text().as_str();
    if !text.is_empty() {
        out.push_str(text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
    }
    out.push_str("end\n");
}

/// Serialize the animation table, sorted by name.
pub fn collect_animations(registry: &ArchetypeRegistry) -> String {
    let mut names: Vec<&str> = registry.animations().iter().map(|a| a.name()).collect();
    names.sort_unstable();
    names.dedup();

    let mut out = String::new();
    for name in names {
        let anim = registry
            .animations()
            .find(name)
            .and_then(|index| registry.animations().get(index));
        let Some(anim) = anim else {
            continue;
        };
        out.push_str(&format!("anim {name}\n"));
        out.push_str(anim.list());
        if !anim.list().is_empty() && !anim.list().ends_with('\n') {
            out.push('\n');
        }
        out.push_str("mina\n");
    }
    out
}

/// Face-name listing: one `<index> <name>` line per face, the index
/// zero-padded to five digits.
pub fn collect_bmaps(registry: &ArchetypeRegistry) -> String {
    let mut out = String::new();
    for (index, face) in registry.faces().enumerate() {
        out.push_str(&format!("{index:05} {}\n", face.name()));
    }
    out
}

/// Rebuild the binary face archive. Faces loaded from a directory are
/// read back from their source path; a face with neither raw bytes nor
/// a readable path is skipped.
pub fn collect_faces(registry: &ArchetypeRegistry, report: &mut LoadReport) -> Vec<u8> {
    let mut out = Vec::new();
    for (index, face) in registry.faces().enumerate() {
        let data = match face.data() {
            Some(data) => data.to_vec(),
            None => match face.path().map(std::fs::read) {
                Some(Ok(data)) => data,
                Some(Err(err)) => {
                    report.warn(format!("face {} not read: {err}", face.name()));
                    continue;
                }
                None => {
                    report.warn(format!("face {} has no image source", face.name()));
                    continue;
                }
            },
        };
        out.extend_from_slice(
            format!("IMAGE {index:05} {} {}\n", data.len(), face.name()).as_bytes(),
        );
        out.extend_from_slice(&data);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const ARCH_TEXT: &str = "\
Object floor
name Dull Floor
type 71
editor_folder ground/floors
msg
A worn flagstone.
endmsg
is_floor 1
end
Object torch
type 66
anim
facings 1
torch.111
mina
end
Object gate
mpart_id 2
end
More
Object gate_2
mpart_id 2
mpart_nr 1
x 1
end
Object map
x 24
y 24
end
";

    const ARTIFACT_TEXT: &str = "\
artifact torch_evening
def_arch torch
Object
name Evening Torch
end
";

    fn position_table_text() -> String {
        let row = vec!["0"; 34].join(" ");
        let mut out = String::new();
        for _ in 0..16 {
            out.push_str(&row);
            out.push('\n');
        }
        out
    }

    fn write_fixture(dir: &Path, config: &LoaderConfig) {
        std::fs::write(dir.join(&config.arch_file), ARCH_TEXT).unwrap();
        std::fs::write(dir.join(&config.artifacts_file), ARTIFACT_TEXT).unwrap();
        std::fs::write(dir.join(&config.positions_file), position_table_text()).unwrap();

        let mut archive = Vec::new();
        archive.extend_from_slice(b"IMAGE 00000 5 arch/ground/floor.111\nHELLO");
        archive.extend_from_slice(b"IMAGE 00001 3 torch.111\nABC");
        std::fs::write(dir.join(&config.face_file), archive).unwrap();
    }

    #[test]
    fn test_load_archive_full_set() {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig::default();
        write_fixture(dir.path(), &config);

        let mut registry = ArchetypeRegistry::new();
        let report = load_archive(dir.path(), &config, &mut registry).unwrap();

        // floor, torch, gate, map and the artifact; the tail is not counted
        assert_eq!(report.arches, 5);
        assert_eq!(report.faces, 2);
        assert_eq!(report.animations, 1);
        assert_eq!(report.artifacts, 1);
        assert!(registry.is_ready());

        let floor = registry.arch(registry.find_arch("floor").unwrap()).unwrap();
        assert_eq!(floor.obj_name(), Some("Dull Floor"));
        assert_eq!(floor.folder(), Some("ground/floors"));
        let face = registry.face(registry.find_face("floor.111").unwrap()).unwrap();
        assert_eq!(face.data(), Some(&b"HELLO"[..]));
        assert!(registry.find_arch("torch_evening").is_some());
    }

    #[test]
    fn test_load_archive_missing_archetypes_fails() {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig::default();
        let mut registry = ArchetypeRegistry::new();
        let result = load_archive(dir.path(), &config, &mut registry);
        assert!(matches!(result, Err(FormatError::IoError(_))));
    }

    #[test]
    fn test_load_archive_missing_faces_degrades() {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig::default();
        std::fs::write(dir.path().join(&config.arch_file), "Object floor\nend\n").unwrap();

        let mut registry = ArchetypeRegistry::new();
        let report = load_archive(dir.path(), &config, &mut registry).unwrap();
        assert_eq!(report.arches, 1);
        assert_eq!(report.faces, 0);
        assert!(report.has_warnings());
        assert!(registry.is_ready());
    }

    #[test]
    fn test_face_archive_path_hints() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"IMAGE 00000 5 arch/ground/dull.base.111\nHELLO");
        bytes.extend_from_slice(b"IMAGE 00001 3 torch.111\nABC");

        let mut registry = ArchetypeRegistry::new();
        let mut report = LoadReport::new();
        parse_face_archive(&bytes, &mut registry, &mut report);

        assert!(!report.has_warnings());
        assert_eq!(registry.face_count(), 2);
        // dots in the path hint do not cut the name short
        let face = registry.face(registry.find_face("dull.base.111").unwrap()).unwrap();
        assert_eq!(face.data(), Some(&b"HELLO"[..]));
        assert!(registry.find_face("torch.111").is_some());
    }

    #[test]
    fn test_face_archive_truncated() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(b"IMAGE 00000 3 ok.111\nABC");
        bytes.extend_from_slice(b"IMAGE 00001 10 cut.111\nxy");

        let mut registry = ArchetypeRegistry::new();
        let mut report = LoadReport::new();
        parse_face_archive(&bytes, &mut registry, &mut report);

        assert_eq!(registry.face_count(), 1);
        assert!(report.warnings().iter().any(|w| w.contains("truncated")));
    }

    #[test]
    fn test_collect_archetypes_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig::default();
        write_fixture(dir.path(), &config);

        let mut registry = ArchetypeRegistry::new();
        load_archive(dir.path(), &config, &mut registry).unwrap();

        let mut report = LoadReport::new();
        let first = collect_archetypes(&registry, &mut report);
        assert!(!report.has_warnings());
        assert!(first.contains("editor_folder ground/floors\n"));
        assert!(first.contains("More\nObject gate_2\n"));
        assert!(first.ends_with("Object map\nx 24\ny 24\nend\n"));
        // the artifact reloads from the artifacts file instead
        assert!(!first.contains("torch_evening"));

        let mut registry2 = ArchetypeRegistry::new();
        let mut report2 = LoadReport::new();
        registry2.begin_load();
        ArchParser::new(&mut registry2, &mut report2).parse_archetypes(&first);
        registry2.finish_load();

        let second = collect_archetypes(&registry2, &mut LoadReport::new());
        assert_eq!(first, second);
    }

    #[test]
    fn test_collect_animations_sorted() {
        let mut registry = ArchetypeRegistry::new();
        registry.animations_mut().add("torch", "facings 1\ntorch.111\n");
        registry.animations_mut().add("door", "door.111\ndoor.112\n");

        let text = collect_animations(&registry);
        assert_eq!(
            text,
            "anim door\ndoor.111\ndoor.112\nmina\nanim torch\nfacings 1\ntorch.111\nmina\n"
        );
    }

    #[test]
    fn test_collect_bmaps_padded() {
        let mut registry = ArchetypeRegistry::new();
        registry.add_face(Face::new("floor.111").with_data(b"a".to_vec()));
        registry.add_face(Face::new("torch.111").with_data(b"b".to_vec()));

        assert_eq!(collect_bmaps(&registry), "00000 floor.111\n00001 torch.111\n");
    }

    #[test]
    fn test_collect_faces_round_trip() {
        let mut registry = ArchetypeRegistry::new();
        registry.add_face(Face::new("floor.111").with_data(b"HELLO".to_vec()));
        registry.add_face(Face::new("torch.111").with_data(b"ABC".to_vec()));

        let mut report = LoadReport::new();
        let bytes = collect_faces(&registry, &mut report);
        assert!(!report.has_warnings());

        let mut reloaded = ArchetypeRegistry::new();
        parse_face_archive(&bytes, &mut reloaded, &mut report);
        assert_eq!(reloaded.face_count(), 2);
        let face = reloaded.face(reloaded.find_face("floor.111").unwrap()).unwrap();
        assert_eq!(face.data(), Some(&b"HELLO"[..]));
    }

    #[test]
    fn test_collect_faces_skips_sourceless() {
        let mut registry = ArchetypeRegistry::new();
        registry.add_face(Face::new("ghost.111"));
        registry.add_face(Face::new("ok.111").with_data(b"x".to_vec()));

        let mut report = LoadReport::new();
        let bytes = collect_faces(&registry, &mut report);
        assert!(report.warnings().iter().any(|w| w.contains("ghost.111")));

        let mut reloaded = ArchetypeRegistry::new();
        parse_face_archive(&bytes, &mut reloaded, &mut report);
        assert_eq!(reloaded.face_count(), 1);
    }

    #[test]
    fn test_write_archive_round_trip() {
        let dir = TempDir::new().unwrap();
        let config = LoaderConfig::default();
        write_fixture(dir.path(), &config);

        let mut registry = ArchetypeRegistry::new();
        load_archive(dir.path(), &config, &mut registry).unwrap();

        let out = TempDir::new().unwrap();
        let report = write_archive(out.path(), &config, &registry).unwrap();
        assert_eq!(report.faces, 2);
        assert!(out.path().join(&config.arch_file).is_file());
        assert!(out.path().join(&config.animations_file).is_file());
        assert!(out.path().join(&config.bmaps_file).is_file());
        assert!(out.path().join(&config.face_file).is_file());

        // reload what collect wrote; the artifacts file is not part of
        // the collected set, so carry it over by hand
        std::fs::copy(
            dir.path().join(&config.artifacts_file),
            out.path().join(&config.artifacts_file),
        )
        .unwrap();
        let mut reloaded = ArchetypeRegistry::new();
        let report = load_archive(out.path(), &config, &mut reloaded).unwrap();
        assert_eq!(report.arches, 5);
        assert_eq!(report.faces, 2);
        assert!(reloaded.find_arch("gate_2").is_some());
    }
}

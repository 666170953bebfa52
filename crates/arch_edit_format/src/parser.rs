use std::str::Lines;

use arch_edit_core::{ArchObject, ArchetypeRegistry, SHAPE_ROWS, TYPE_UNSET};
use arch_edit_schema::EDIT_NONE;

use crate::LoadReport;

/// Name of the pseudo archetype that carries map header defaults.
pub const MAP_ARCH_NAME: &str = "map";

/// Streaming parser for `Object ... end` definition blocks.
///
/// One instance feeds one registry. [`parse_archetypes`] handles the
/// collected archive and individual `.arc` files, [`parse_artifacts`]
/// the artifact format layered on top of it. Malformed lines never
/// abort the stream; they are recorded on the report and the parser
/// carries on with the next usable line.
///
/// [`parse_archetypes`]: ArchParser::parse_archetypes
/// [`parse_artifacts`]: ArchParser::parse_artifacts
pub struct ArchParser<'a> {
    registry: &'a mut ArchetypeRegistry,
    report: &'a mut LoadReport,
    shaped: bool,
    folder: Option<String>,
}

/// Base archetype an artifact block is layered over.
struct ArtifactBase {
    name: String,
    base_text: String,
    proto: ArchObject,
}

impl<'a> ArchParser<'a> {
    pub fn new(registry: &'a mut ArchetypeRegistry, report: &'a mut LoadReport) -> Self {
        Self {
            registry,
            report,
            shaped: true,
            folder: None,
        }
    }

    /// Toggle multi-part shape parsing (`mpart_id`/`mpart_nr` lines and
    /// the lowest-part computation).
    pub fn shaped(mut self, shaped: bool) -> Self {
        self.shaped = shaped;
        self
    }

    /// Folder assigned to every archetype this instance parses. Set by
    /// the directory walker; overrides `editor_folder` lines.
    pub fn folder(mut self, folder: impl Into<String>) -> Self {
        self.folder = Some(folder.into());
        self
    }

    /// Parse a stream of archetype definitions into the registry.
    pub fn parse_archetypes(&mut self, text: &str) {
        let mut lines = text.lines();
        self.parse_stream(&mut lines, None, None);
    }

    /// Parse an artifact definition file.
    ///
    /// Each `artifact`/`def_arch` header pair introduces a variant of an
    /// already registered archetype: the base is cloned, its attribute
    /// text replaced by the block body, and the unchanged base lines
    /// merged back in afterwards so the variant only differs where the
    /// block says so.
    pub fn parse_artifacts(&mut self, text: &str) {
        let mut lines = text.lines();
        let mut name: Option<String> = None;
        let mut base: Option<String> = None;

        while let Some(raw) = lines.next() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(rest) = line.strip_prefix("artifact ") {
                name = Some(rest.trim().to_string());
            } else if let Some(rest) = line.strip_prefix("def_arch ") {
                base = Some(rest.trim().to_string());
            } else if line == "Object" || line.starts_with("Object ") {
                let (Some(artifact_name), Some(base_name)) = (name.take(), base.take()) else {
                    self.report
                        .warn("artifact Object without artifact and def_arch headers");
                    continue;
                };
                let Some(node) = self.registry.find_arch(&base_name) else {
                    self.report.warn(format!(
                        "artifact {artifact_name} refers to unknown archetype {base_name}"
                    ));
                    continue;
                };
                let Some(base_arch) = self.registry.arch(node) else {
                    continue;
                };
                if base_arch.is_multi() || base_arch.is_tail() {
                    self.report.warn(format!(
                        "artifact {artifact_name} over multi-part {base_name} is not supported"
                    ));
                    continue;
                }
                let context = ArtifactBase {
                    name: artifact_name,
                    base_text: base_arch.text().as_str().to_string(),
                    proto: base_arch.detached_clone(0, 0),
                };
                if self.parse_stream(&mut lines, Some(raw), Some(&context)).is_some() {
                    self.report.artifacts += 1;
                }
            }
        }
    }

    /// The block parser shared by archetypes and artifacts. In artifact
    /// mode the first `end` finishes the call and the new node is
    /// returned.
    fn parse_stream(
        &mut self,
        lines: &mut Lines<'_>,
        first: Option<&str>,
        artifact: Option<&ArtifactBase>,
    ) -> Option<usize> {
        let mut arch: Option<ArchObject> = None;
        let mut msg_flag = false;
        let mut anim_flag = false;
        let mut lore_flag = false;
        let mut in_tail = false;
        let mut head_node: Option<usize> = None;
        let mut category: Option<String> = None;

        let mut pending = first;
        loop {
            let raw = match pending.take() {
                Some(line) => line,
                None => match lines.next() {
                    Some(line) => line,
                    None => break,
                },
            };
            let line = raw.trim();
            if line.starts_with('#') {
                continue;
            }

            // block terminator, checked before the sub-states so a literal
            // "end" inside msg or anim stays text
            if arch.is_some() && !msg_flag && !anim_flag && !lore_flag && line == "end" {
                let Some(mut obj) = arch.take() else {
                    continue;
                };
                if let Some(node) = head_node {
                    obj.multi_mut().head_node = Some(node);
                }
                if in_tail {
                    let (x, y) = obj.multi().map_or((0, 0), |m| (m.offset_x, m.offset_y));
                    if let Some(head) = head_node.and_then(|n| self.registry.arch_mut(n)) {
                        head.multi_mut().fold_extent(x, y);
                    }
                    obj.multi_mut().is_tail = true;
                } else if obj.arch_name() != Some(MAP_ARCH_NAME) {
                    obj.set_folder(self.folder.clone().or_else(|| category.clone()));
                }
                post_parse_def_arch(&mut obj);
                let node = self.registry.add_arch(obj);
                if self.shaped && in_tail {
                    self.calc_lowest_multi(node);
                }
                in_tail = false;

                if let Some(context) = artifact {
                    let diff = self
                        .registry
                        .arch(node)
                        .map(|entry| entry.text().diff(&context.base_text, true));
                    if let Some(entry) = self.registry.arch_mut(node) {
                        if let Some(diff) = diff {
                            entry.text_mut().append(&diff);
                        }
                        entry.set_artifact(true);
                    }
                    return Some(node);
                }
                continue;
            }

            let Some(obj) = arch.as_mut() else {
                // between blocks
                if line == "More" {
                    if head_node.is_none() {
                        match self.registry.arch_count().checked_sub(1) {
                            Some(last) => {
                                head_node = Some(last);
                                if let Some(head) = self.registry.arch_mut(last) {
                                    head.multi_mut().head_node = Some(last);
                                }
                            }
                            None => {
                                self.report.warn("More before any archetype, ignored");
                                continue;
                            }
                        }
                    }
                    if let Some(head) = head_node.and_then(|n| self.registry.arch_mut(n)) {
                        head.multi_mut().part_count += 1;
                    }
                    in_tail = true;
                } else if line == "Object" || line.starts_with("Object ") {
                    let parsed = line["Object".len()..].trim();
                    let obj = match artifact {
                        Some(context) => {
                            let mut clone = context.proto.clone();
                            clone.text_mut().clear();
                            clone.set_arch_name(context.name.clone());
                            clone
                        }
                        None => {
                            if parsed.is_empty() {
                                self.report.warn("Object line without a name, block skipped");
                                continue;
                            }
                            ArchObject::with_arch_name(parsed)
                        }
                    };
                    if !in_tail {
                        head_node = None;
                    }
                    arch = Some(obj);
                }
                continue;
            };

            if msg_flag {
                if line == "endmsg" {
                    msg_flag = false;
                } else {
                    // raw line, message text keeps its leading whitespace
                    let msg = obj.msg_mut();
                    msg.push_str(raw);
                    msg.push('\n');
                }
                continue;
            }
            if anim_flag {
                if line == "mina" {
                    let name = obj.arch_name().unwrap_or_default().to_string();
                    let list = obj.anim_text().unwrap_or_default().to_string();
                    self.registry.animations_mut().add(name.as_str(), list);
                    obj.text_mut().append_line(&format!("animation {name}"));
                    obj.set_anim_name(Some(name));
                    anim_flag = false;
                } else {
                    let anim = obj.anim_text_mut();
                    anim.push_str(line);
                    anim.push('\n');
                }
                continue;
            }
            if lore_flag {
                if line == "endlore" {
                    lore_flag = false;
                } else {
                    let lore = obj.lore_mut();
                    lore.push_str(line);
                    lore.push('\n');
                }
                continue;
            }

            if line == "Object" || line.starts_with("Object ") {
                self.report.warn(format!(
                    "nested Object inside definition of {}",
                    obj.best_name(None)
                ));
            } else if line == "msg" {
                msg_flag = true;
            } else if let Some(rest) = line.strip_prefix("animation ") {
                obj.text_mut().append_line(line);
                obj.set_anim_name(Some(rest.trim().to_string()));
            } else if line.starts_with("anim_speed") {
                obj.text_mut().append_line(line);
            } else if line == "anim" {
                anim_flag = true;
            } else if line == "lore" {
                lore_flag = true;
            } else if line.starts_with("visibility ")
                || line.starts_with("magicmap ")
                || line.starts_with("color_fg ")
                || line.starts_with("color_bg ")
            {
                // legacy client hints, dropped on load
            } else if let Some(rest) = line.strip_prefix("x ") {
                let value = match rest.trim().parse::<i32>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.report
                            .warn(format!("bad x offset in {}: {line}", obj.best_name(None)));
                        0
                    }
                };
                obj.multi_mut().offset_x = value;
                if !in_tail && obj.arch_name() != Some(MAP_ARCH_NAME) {
                    self.report.warn(format!(
                        "x on single-part archetype {}, kept as attribute",
                        obj.best_name(None)
                    ));
                    obj.text_mut().append_line(line);
                }
            } else if let Some(rest) = line.strip_prefix("y ") {
                let value = match rest.trim().parse::<i32>() {
                    Ok(value) => value,
                    Err(_) => {
                        self.report
                            .warn(format!("bad y offset in {}: {line}", obj.best_name(None)));
                        0
                    }
                };
                obj.multi_mut().offset_y = value;
                if !in_tail && obj.arch_name() != Some(MAP_ARCH_NAME) {
                    self.report.warn(format!(
                        "y on single-part archetype {}, kept as attribute",
                        obj.best_name(None)
                    ));
                    obj.text_mut().append_line(line);
                }
            } else if let Some(rest) = line.strip_prefix("type ") {
                match rest.trim().parse::<i32>() {
                    Ok(value) => {
                        if value == 0 {
                            self.report
                                .warn(format!("type 0 in {}", obj.best_name(None)));
                        }
                        obj.set_type_nr(value);
                    }
                    Err(_) => {
                        self.report
                            .warn(format!("bad type in {}: {line}", obj.best_name(None)));
                        obj.text_mut().append_line(line);
                    }
                }
            } else if let Some(rest) = line.strip_prefix("direction ") {
                match rest.trim().parse::<i32>() {
                    Ok(value) => obj.set_direction(value),
                    Err(_) => self
                        .report
                        .warn(format!("bad direction in {}: {line}", obj.best_name(None))),
                }
                obj.text_mut().append_line(line);
            } else if let Some(rest) = line.strip_prefix("face ") {
                obj.set_face_name(Some(rest.trim().to_string()));
                obj.text_mut().append_line(line);
            } else if let Some(rest) = line.strip_prefix("editor_folder ") {
                category = Some(rest.trim().to_string());
            } else if self.shaped && line.starts_with("mpart_id ") {
                let rest = &line["mpart_id ".len()..];
                match rest.trim().parse::<i32>() {
                    Ok(value) => {
                        if value <= 0 || value >= SHAPE_ROWS as i32 {
                            self.report.warn(format!(
                                "mpart_id {value} out of range in {}",
                                obj.best_name(None)
                            ));
                        }
                        obj.multi_mut().shape = value;
                    }
                    Err(_) => {
                        self.report
                            .warn(format!("bad mpart_id in {}: {line}", obj.best_name(None)));
                        obj.text_mut().append_line(line);
                    }
                }
            } else if self.shaped && line.starts_with("mpart_nr ") {
                let rest = &line["mpart_nr ".len()..];
                match rest.trim().parse::<i32>() {
                    Ok(value) => obj.multi_mut().part = value,
                    Err(_) => {
                        self.report
                            .warn(format!("bad mpart_nr in {}: {line}", obj.best_name(None)));
                        obj.text_mut().append_line(line);
                    }
                }
            } else {
                obj.text_mut().append_line(line);
            }
        }
        None
    }

    /// Recompute the lowest-part flags of the multi ending at `last_tail`.
    ///
    /// Walks back to the head collecting each part's display y-offset,
    /// then marks every part sitting on the lowest row. Runs after each
    /// tail so a partially parsed multi always carries usable flags.
    fn calc_lowest_multi(&mut self, last_tail: usize) {
        let mut offsets: Vec<(usize, i32)> = Vec::new();
        let mut node = last_tail;
        loop {
            let Some(arch) = self.registry.arch(node) else {
                return;
            };
            let (shape, part, count) = arch
                .multi()
                .map_or((0, 0, 0), |m| (m.shape, m.part, m.part_count));
            let offset = self
                .registry
                .multi_positions()
                .y_offset(shape.max(0) as usize, part.max(0) as usize);
            offsets.push((node, offset));
            if count > 0 || node == 0 {
                break;
            }
            node -= 1;
        }
        let Some(lowest) = offsets.iter().map(|&(_, offset)| offset).min() else {
            return;
        };
        for (node, offset) in offsets {
            if let Some(arch) = self.registry.arch_mut(node) {
                arch.multi_mut().lowest_part = offset <= lowest;
            }
        }
    }
}

/// Normalize a freshly parsed definition: pull `name` out of the text,
/// drop historic `editable` hints, keep script bodies verbatim and reset
/// the view filter classification.
fn post_parse_def_arch(arch: &mut ArchObject) {
    if arch.type_nr() == TYPE_UNSET {
        arch.set_type_nr(0);
    }
    let text = arch.text().as_str().to_string();
    arch.text_mut().clear();
    let mut in_script = false;
    for line in text.split('\n') {
        if line.is_empty() {
            continue;
        }
        if in_script {
            arch.text_mut().append_line(line);
            if line.starts_with("end_script_") {
                in_script = false;
            }
        } else if line.starts_with("start_script_") {
            arch.text_mut().append_line(line);
            in_script = true;
        } else if line.starts_with("editable ") {
            // superseded by the view filter rule table
        } else if let Some(rest) = line.strip_prefix("name ") {
            arch.set_obj_name(Some(rest.to_string()));
        } else {
            arch.text_mut().append_line(line);
        }
    }
    arch.set_edit_type(EDIT_NONE);
}

use std::path::Path;
use std::str::Lines;

use arch_edit_core::{
    ArchId, ArchObject, ArchetypeRegistry, MapGrid, ObjectArena, TYPE_UNSET,
};
use arch_edit_schema::EditTypeRules;

use crate::{FormatError, LoadReport};

/// Raw result of [`decode_map`]: the top-level objects in file order and
/// the map size, grown to cover every coordinate seen in the file.
#[derive(Debug)]
pub struct DecodedMap {
    pub objects: Vec<ArchId>,
    pub width: usize,
    pub height: usize,
}

/// Everything the attach pass needs besides the objects themselves.
pub struct AttachContext<'a> {
    pub registry: &'a ArchetypeRegistry,
    pub rules: &'a EditTypeRules,
    /// View filter bits to classify against; 0 skips classification.
    pub mask: u32,
    /// Whether shaped multi-part data is inherited from the defaults.
    pub shaped: bool,
}

/// Parse map text into arena objects.
///
/// The header block (`arch map ... end`) is expected first; a map
/// without one is reported and decoded anyway. Tail blocks introduced
/// by `More` are skipped entirely, heads carry enough to rebuild them.
/// Objects come out unresolved: names are not yet checked against a
/// registry and the direction carries a -1 sentinel.
pub fn decode_map(text: &str, arena: &mut ObjectArena, report: &mut LoadReport) -> DecodedMap {
    let mut lines = text.lines();
    let mut objects = Vec::new();
    let mut max_x: i32 = -1;
    let mut max_y: i32 = -1;
    let mut header_width = 0usize;
    let mut header_height = 0usize;
    let mut saw_header = false;

    while let Some(raw) = lines.next() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if !saw_header && line == "arch map" {
            saw_header = true;
            let mut in_msg = false;
            for raw in lines.by_ref() {
                let line = raw.trim();
                if in_msg {
                    if line == "endmsg" {
                        in_msg = false;
                    }
                    continue;
                }
                if line == "msg" {
                    in_msg = true;
                } else if line == "end" {
                    break;
                } else if let Some(rest) = line.strip_prefix("width ") {
                    header_width = parse_size(rest);
                } else if let Some(rest) = line.strip_prefix("height ") {
                    header_height = parse_size(rest);
                } else if let Some(rest) = line.strip_prefix("x ") {
                    header_width = parse_size(rest);
                } else if let Some(rest) = line.strip_prefix("y ") {
                    header_height = parse_size(rest);
                }
            }
            continue;
        }
        if line == "More" {
            // legacy tail block, rebuilt from the defaults on attach
            for raw in lines.by_ref() {
                if raw.trim() == "end" {
                    break;
                }
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("arch ") {
            if !saw_header {
                report.warn("map file has no header block");
                saw_header = true;
            }
            if let Some(id) = read_arch(&mut lines, rest.trim(), arena, report, &mut max_x, &mut max_y)
            {
                objects.push(id);
            }
        }
    }

    DecodedMap {
        objects,
        width: header_width.max((max_x + 1).max(0) as usize),
        height: header_height.max((max_y + 1).max(0) as usize),
    }
}

fn parse_size(text: &str) -> usize {
    text.trim().parse::<i32>().unwrap_or(0).max(0) as usize
}

/// Read one `arch ... end` block, recursing into inventories.
fn read_arch(
    lines: &mut Lines<'_>,
    name: &str,
    arena: &mut ObjectArena,
    report: &mut LoadReport,
    max_x: &mut i32,
    max_y: &mut i32,
) -> Option<ArchId> {
    let mut obj = ArchObject::with_arch_name(name);
    // sentinel, replaced by the default's direction on attach
    obj.set_direction(-1);
    let id = arena.insert(obj);
    let mut msg_flag = false;
    let mut anim_flag = false;

    while let Some(raw) = lines.next() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        if msg_flag {
            if line == "endmsg" {
                msg_flag = false;
            } else if let Some(obj) = arena.get_mut(id) {
                let msg = obj.msg_mut();
                msg.push_str(line);
                msg.push('\n');
            }
            continue;
        }
        if anim_flag {
            if line == "mina" {
                anim_flag = false;
            } else if let Some(obj) = arena.get_mut(id) {
                let anim = obj.anim_text_mut();
                anim.push_str(line);
                anim.push('\n');
            }
            continue;
        }
        if let Some(rest) = line.strip_prefix("arch ") {
            if let Some(child) = read_arch(lines, rest.trim(), arena, report, max_x, max_y) {
                arena.add_inv(id, child);
            }
            continue;
        }
        if line == "end" {
            return Some(id);
        }

        let Some(obj) = arena.get_mut(id) else {
            continue;
        };
        if line == "msg" {
            if obj.msg().is_none() {
                // an empty block must still override the default
                obj.set_msg(Some(String::new()));
            }
            msg_flag = true;
        } else if line.starts_with("animation ") {
            obj.text_mut().append_line(line);
        } else if line.starts_with("anim_speed") {
            obj.text_mut().append_line(line);
        } else if line == "anim" {
            anim_flag = true;
        } else if line.starts_with("event_") {
            tracing::debug!("dropping event line: {line}");
        } else if let Some(rest) = line.strip_prefix("x ") {
            let value = match rest.trim().parse::<i32>() {
                Ok(value) => value,
                Err(_) => {
                    report.warn(format!("bad x in map object {}: {line}", obj.best_name(None)));
                    0
                }
            };
            obj.set_map_pos(value, obj.map_y());
            *max_x = (*max_x).max(value);
        } else if let Some(rest) = line.strip_prefix("y ") {
            let value = match rest.trim().parse::<i32>() {
                Ok(value) => value,
                Err(_) => {
                    report.warn(format!("bad y in map object {}: {line}", obj.best_name(None)));
                    0
                }
            };
            obj.set_map_pos(obj.map_x(), value);
            *max_y = (*max_y).max(value);
        } else if let Some(rest) = line.strip_prefix("type ") {
            match rest.trim().parse::<i32>() {
                Ok(value) => obj.set_type_nr(value),
                Err(_) => {
                    report.warn(format!(
                        "bad type in map object {}: {line}",
                        obj.best_name(None)
                    ));
                    obj.text_mut().append_line(line);
                }
            }
        } else if let Some(rest) = line.strip_prefix("direction ") {
            match rest.trim().parse::<i32>() {
                Ok(value) => obj.set_direction(value),
                Err(_) => report.warn(format!(
                    "bad direction in map object {}: {line}",
                    obj.best_name(None)
                )),
            }
            obj.text_mut().append_line(line);
        } else if let Some(rest) = line.strip_prefix("face ") {
            obj.set_face_name(Some(rest.trim().to_string()));
            obj.text_mut().append_line(line);
        } else {
            obj.text_mut().append_line(line);
        }
    }
    report.warn("map stream ended inside an object block");
    Some(id)
}

/// Resolve one freshly decoded object against its default archetype.
///
/// Pulls `name` and `animation` out of the attribute text, replaces the
/// direction sentinel, resolves the face override, inherits the type and
/// the multi-part geometry, re-attaches inline animation text and
/// classifies the object for the view filter. `head_edit` carries the
/// head's classification for rebuilt tail parts.
pub fn post_parse_map_arch(obj: &mut ArchObject, ctx: &AttachContext<'_>, head_edit: Option<u32>) {
    let Some(node) = obj.node() else {
        return;
    };
    let Some(default) = ctx.registry.arch(node) else {
        return;
    };

    let text = obj.text().as_str().to_string();
    obj.text_mut().clear();
    for line in text.split('\n') {
        if line.is_empty() {
            continue;
        }
        if let Some(rest) = line.strip_prefix("animation ") {
            obj.set_anim_name(Some(rest.to_string()));
            obj.text_mut().append_line(line);
        } else if let Some(rest) = line.strip_prefix("name ") {
            obj.set_obj_name(Some(rest.to_string()));
        } else {
            obj.text_mut().append_line(line);
        }
    }

    if obj.direction() == -1 {
        obj.set_direction(default.direction());
    }
    let face = obj.face_name().map(str::to_string);
    ctx.registry.set_real_face(obj, face.as_deref());
    if obj.type_nr() == TYPE_UNSET {
        obj.set_type_nr(default.type_nr());
    }

    if ctx.shaped {
        let (shape, part, lowest) = default
            .multi()
            .map_or((0, 0, false), |m| (m.shape, m.part, m.lowest_part));
        if shape > 0 && obj.multi().map_or(0, |m| m.shape) == 0 {
            obj.multi_mut().shape = shape;
        }
        if part > 0 && obj.multi().map_or(0, |m| m.part) == 0 {
            obj.multi_mut().part = part;
        }
        if lowest {
            obj.multi_mut().lowest_part = true;
        }
    }

    if obj.is_multi() || default.is_multi() {
        let geometry = default.multi().map(|m| m.detached()).unwrap_or_default();
        let multi = obj.multi_mut();
        multi.part_count = geometry.part_count;
        multi.is_tail = geometry.is_tail;
        multi.max_x = geometry.max_x;
        multi.max_y = geometry.max_y;
        multi.min_x = geometry.min_x;
        multi.min_y = geometry.min_y;
        multi.offset_x = geometry.offset_x;
        multi.offset_y = geometry.offset_y;
    }

    if let Some(anim) = obj.anim_text().map(str::to_string) {
        obj.text_mut().append("anim\n");
        obj.text_mut().append(&anim);
        obj.text_mut().append("mina\n");
    }

    match head_edit {
        Some(edit) if obj.is_tail() => obj.set_edit_type(edit),
        _ if ctx.mask != 0 => {
            ctx.rules.calculate(obj, Some(default), ctx.mask);
        }
        _ => {}
    }
}

/// Attach decoded objects to the registry.
///
/// Objects naming an unknown archetype are removed and reported, multi
/// heads are expanded into full part groups, and tails that never found
/// a head are cut. Afterwards `objects` is ready for placement.
pub fn attach_decoded(
    arena: &mut ObjectArena,
    objects: &mut Vec<ArchId>,
    ctx: &AttachContext<'_>,
    report: &mut LoadReport,
) {
    objects.retain(|&id| {
        if attach_tree(arena, id, ctx, report) {
            true
        } else {
            arena.remove_subtree(id);
            false
        }
    });

    let mut index = 0;
    while index < objects.len() {
        let tails = expand_multi(arena, objects[index], ctx, report);
        for (offset, tail) in tails.into_iter().enumerate() {
            objects.insert(index + 1 + offset, tail);
        }
        index += 1;
    }

    objects.retain(|&id| {
        let headless = arena
            .get(id)
            .is_some_and(|obj| obj.is_tail() && obj.multi_head().is_none());
        if headless {
            let name = arena
                .get(id)
                .and_then(|obj| obj.arch_name())
                .unwrap_or("?")
                .to_string();
            report.warn(format!("multi tail without head on map: {name}"));
            arena.remove_subtree(id);
        }
        !headless
    });
}

/// Resolve `id` and its inventory, dropping unknown children in place.
/// Returns false when `id` itself is unknown.
fn attach_tree(
    arena: &mut ObjectArena,
    id: ArchId,
    ctx: &AttachContext<'_>,
    report: &mut LoadReport,
) -> bool {
    let Some(name) = arena.get(id).and_then(|o| o.arch_name().map(str::to_string)) else {
        return false;
    };
    let Some(node) = ctx.registry.find_arch(&name) else {
        report.warn(format!("unknown archetype on map: {name}"));
        return false;
    };

    for child in arena.inv_chain(id) {
        if !attach_tree(arena, child, ctx, report) {
            arena.remove_subtree(child);
        }
    }

    if let Some(obj) = arena.get_mut(id) {
        obj.set_node(Some(node));
        post_parse_map_arch(obj, ctx, None);
        ctx.registry.refresh_face(obj);
    }
    true
}

/// Rebuild the tail parts of a multi head from the registry. Returns
/// the new tails in part order; they still need placing on the grid.
fn expand_multi(
    arena: &mut ObjectArena,
    head: ArchId,
    ctx: &AttachContext<'_>,
    report: &mut LoadReport,
) -> Vec<ArchId> {
    let Some(obj) = arena.get(head) else {
        return Vec::new();
    };
    if obj.container().is_some() || obj.multi_next().is_some() || obj.multi_head().is_some() {
        return Vec::new();
    }
    let Some(node) = obj.node() else {
        return Vec::new();
    };
    let count = ctx.registry.arch(node).map_or(0, ArchObject::part_count);
    if count <= 0 {
        return Vec::new();
    }
    let (head_x, head_y) = (obj.map_x(), obj.map_y());
    let head_edit = obj.edit_type();

    let mut tails = Vec::new();
    for part in 1..=count as usize {
        let tail_node = node + part;
        let Some(tail_default) = ctx.registry.arch(tail_node) else {
            report.warn(format!(
                "multi at node {node} is missing tail {part} of {count}"
            ));
            break;
        };
        let Some(tail_name) = tail_default.arch_name().map(str::to_string) else {
            break;
        };
        let (offset_x, offset_y) = tail_default
            .multi()
            .map_or((0, 0), |m| (m.offset_x, m.offset_y));

        let mut tail = ArchObject::with_arch_name(tail_name);
        tail.set_node(Some(tail_node));
        tail.set_map_pos(head_x + offset_x, head_y + offset_y);
        let id = arena.insert(tail);
        arena.push_multi_part(head, id);
        if let Some(obj) = arena.get_mut(id) {
            post_parse_map_arch(obj, ctx, Some(head_edit));
        }
        tails.push(id);
    }
    tails
}

/// Stable partition putting multi-part groups behind everything else,
/// so parts land on top of the square stacks when placed in order.
pub fn sort_multi_last(objects: &mut Vec<ArchId>, arena: &ObjectArena) {
    let (singles, multis): (Vec<ArchId>, Vec<ArchId>) = objects
        .iter()
        .copied()
        .partition(|&id| arena.get(id).map_or(true, |obj| !obj.is_multi()));
    objects.clear();
    objects.extend(singles);
    objects.extend(multis);
}

/// Put attached objects onto the grid, top of stack, in list order.
/// Objects outside the grid are removed and reported.
pub fn place_objects(
    grid: &mut MapGrid,
    arena: &mut ObjectArena,
    objects: &[ArchId],
    report: &mut LoadReport,
) {
    for &id in objects {
        if !grid.insert_top(arena, id) {
            let name = arena
                .get(id)
                .map(|obj| obj.best_name(None).to_string())
                .unwrap_or_default();
            report.warn(format!("map object {name} falls outside the grid"));
            arena.remove_subtree(id);
        }
    }
}

/// Decode, attach and place a whole map in one call.
pub fn load_map(
    text: &str,
    arena: &mut ObjectArena,
    ctx: &AttachContext<'_>,
) -> (MapGrid, LoadReport) {
    let mut report = LoadReport::new();
    let mut decoded = decode_map(text, arena, &mut report);
    attach_decoded(arena, &mut decoded.objects, ctx, &mut report);
    sort_multi_last(&mut decoded.objects, arena);
    let mut grid = MapGrid::new(decoded.width, decoded.height);
    place_objects(&mut grid, arena, &decoded.objects, &mut report);
    (grid, report)
}

/// Load a map from a file. See [`load_map`].
pub fn load_map_file(
    path: &Path,
    arena: &mut ObjectArena,
    ctx: &AttachContext<'_>,
) -> Result<(MapGrid, LoadReport), FormatError> {
    let text = std::fs::read_to_string(path)?;
    Ok(load_map(&text, arena, ctx))
}

/// Serialize a grid back into map text.
///
/// Two passes over the squares, x-major: single-part objects first in
/// stack order, multi heads afterwards. Tail parts are never written;
/// they are rebuilt from the head on load. Attribute values matching
/// the default archetype are left out.
pub fn encode_map(grid: &MapGrid, arena: &ObjectArena, registry: &ArchetypeRegistry) -> String {
    let mut out = String::new();
    out.push_str("arch map\n");
    out.push_str(&format!("width {}\n", grid.width()));
    out.push_str(&format!("height {}\n", grid.height()));
    out.push_str("end\n");

    for x in 0..grid.width() as i32 {
        for y in 0..grid.height() as i32 {
            for id in grid.stack(arena, x, y) {
                let single = arena
                    .get(id)
                    .is_some_and(|obj| obj.multi_head().is_none() && obj.multi_next().is_none());
                if single {
                    write_map_arch(&mut out, arena, registry, id, false);
                }
            }
        }
    }
    for x in 0..grid.width() as i32 {
        for y in 0..grid.height() as i32 {
            for id in grid.stack(arena, x, y) {
                let head = arena
                    .get(id)
                    .is_some_and(|obj| obj.part_count() > 0 && obj.multi_next().is_some());
                if head {
                    write_map_arch(&mut out, arena, registry, id, false);
                }
            }
        }
    }
    out
}

/// Save a map to a file. See [`encode_map`].
pub fn save_map_file(
    path: &Path,
    grid: &MapGrid,
    arena: &ObjectArena,
    registry: &ArchetypeRegistry,
) -> Result<(), FormatError> {
    std::fs::write(path, encode_map(grid, arena, registry))?;
    Ok(())
}

fn write_map_arch(
    out: &mut String,
    arena: &ObjectArena,
    registry: &ArchetypeRegistry,
    id: ArchId,
    inventory: bool,
) {
    let Some(obj) = arena.get(id) else {
        return;
    };
    let Some(name) = obj.arch_name() else {
        return;
    };
    let default = registry.default_of(obj);

    out.push_str("arch ");
    out.push_str(name);
    out.push('\n');

    if let Some(obj_name) = obj.obj_name() {
        out.push_str("name ");
        out.push_str(obj_name);
        out.push('\n');
    }

    if let Some(msg) = obj.msg() {
        let default_msg = default.and_then(|d| d.msg()).map_or("", str::trim);
        if msg.trim() != default_msg {
            out.push_str("msg\n");
            if !msg.trim().is_empty() {
                out.push_str(msg);
                if !msg.ends_with('\n') {
                    out.push('\n');
                }
            }
            out.push_str("endmsg\n");
        }
    }

    let mut text = obj.text().as_str().to_string();
    if let Some(default) = default {
        if obj.type_nr() != default.type_nr() {
            if text.contains("type ") {
                text = text
                    .split('\n')
                    .filter(|line| !line.starts_with("type "))
                    .collect::<Vec<_>>()
                    .join("\n");
            }
            out.push_str(&format!("type {}\n", obj.type_nr()));
        }
    }

    if !text.is_empty() {
        out.push_str(&text);
        if !text.ends_with('\n') {
            out.push('\n');
        }
    }

    if !inventory {
        if obj.map_x() != 0 {
            out.push_str(&format!("x {}\n", obj.map_x()));
        }
        if obj.map_y() != 0 {
            out.push_str(&format!("y {}\n", obj.map_y()));
        }
    }

    for child in arena.inv_chain(id) {
        write_map_arch(out, arena, registry, child, true);
    }

    out.push_str("end\n");
}

//! Multi-tile object geometry: per-part link data and the shaped-mode
//! display-position table.

use crate::arena::ArchId;

/// Pixel height of one shaped-mode tile.
pub const ISO_TILE_HEIGHT: i32 = 23;

/// Rows in the display-position table, one per multi-part shape.
pub const SHAPE_ROWS: usize = 16;

/// Columns per shape row: two length fields plus 16 coordinate pairs.
pub const SHAPE_COLS: usize = 34;

/// Auxiliary data for objects spanning several map squares.
///
/// Most objects are single-tile, so this lives behind an `Option` on the
/// object and is only allocated when a multi-tile field is first set.
/// A head carries `part_count > 0`; every tail carries `is_tail`. Both
/// point back to the head's registry node through `head_node`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiData {
    /// Tail marker. The head of a group never has this set.
    pub is_tail: bool,
    /// Registry node number of the group's head block.
    pub head_node: Option<usize>,
    /// Offset of this tile from the head.
    pub offset_x: i32,
    pub offset_y: i32,
    /// Head only: number of tail parts in the group.
    pub part_count: i32,
    /// Head only: bounding extents over all part offsets.
    pub max_x: i32,
    pub max_y: i32,
    pub min_x: i32,
    pub min_y: i32,
    /// Shape row in the display-position table (shaped mode only).
    pub shape: i32,
    /// Part number within the shape (shaped mode only).
    pub part: i32,
    /// Set on every part sharing the lowest display position.
    pub lowest_part: bool,
    /// Map ring: the head object. A head leaves this unset.
    pub head: Option<ArchId>,
    /// Map ring: the next part. Unset on the last part.
    pub next: Option<ArchId>,
}

impl MultiData {
    /// Widen the head's bounding extents to cover a part at `(x, y)`.
    pub fn fold_extent(&mut self, x: i32, y: i32) {
        if x < 0 && x < self.min_x {
            self.min_x = x;
        } else if x > self.max_x {
            self.max_x = x;
        }
        if y < 0 && y < self.min_y {
            self.min_y = y;
        } else if y > self.max_y {
            self.max_y = y;
        }
    }

    /// Copy of the geometry data with the map ring links cleared. A clone
    /// must be re-linked before it can stand on a map.
    pub fn detached(&self) -> Self {
        Self {
            head: None,
            next: None,
            ..self.clone()
        }
    }
}

/// Display positions for shaped multi-part objects.
///
/// Row = shape id. Columns 0/1 hold the overall x/y pixel lengths, column
/// pairs from 2 hold the per-part pixel positions. Loaded from a plain
/// text resource of whitespace-separated numbers with `#` comment lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiPositionTable {
    data: Vec<[i32; SHAPE_COLS]>,
}

impl Default for MultiPositionTable {
    fn default() -> Self {
        Self {
            data: vec![[0; SHAPE_COLS]; SHAPE_ROWS],
        }
    }
}

impl MultiPositionTable {
    /// Parse the table from text. Bad tokens are skipped in place; rows
    /// beyond [`SHAPE_ROWS`] are ignored. Returns the table together with
    /// warnings about short or missing rows.
    pub fn parse(text: &str) -> (Self, Vec<String>) {
        let mut table = Self::default();
        let mut warnings = Vec::new();
        let mut row = 0;

        for raw in text.lines() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') || row >= SHAPE_ROWS {
                continue;
            }
            let mut col = 0;
            for token in line.split(' ').filter(|t| !t.is_empty()) {
                if col >= SHAPE_COLS {
                    break;
                }
                if let Ok(value) = token.parse::<i32>() {
                    table.data[row][col] = value;
                    col += 1;
                }
            }
            if col < SHAPE_COLS {
                warnings.push(format!(
                    "missing {} numbers in row {}",
                    SHAPE_COLS - col,
                    row + 1
                ));
            }
            row += 1;
        }
        if row < SHAPE_ROWS {
            warnings.push(format!("missing {} entire rows of data", SHAPE_ROWS - row));
        }

        (table, warnings)
    }

    /// Overall pixel width of a shape.
    pub fn x_len(&self, shape: usize) -> i32 {
        self.data.get(shape).map_or(0, |r| r[0])
    }

    /// Overall pixel height of a shape.
    pub fn y_len(&self, shape: usize) -> i32 {
        self.data.get(shape).map_or(0, |r| r[1])
    }

    /// X-offset of one part from the leftmost pixel of the shape's image.
    pub fn x_offset(&self, shape: usize, part: usize) -> i32 {
        match self.data.get(shape) {
            Some(row) if 2 + part * 2 < SHAPE_COLS => row[2 + part * 2],
            _ => 0,
        }
    }

    /// Y-offset of one part, measured so that a part sitting on the
    /// default single-tile position yields zero.
    pub fn y_offset(&self, shape: usize, part: usize) -> i32 {
        match self.data.get(shape) {
            Some(row) if 3 + part * 2 < SHAPE_COLS => {
                row[1] - ISO_TILE_HEIGHT - row[3 + part * 2]
            }
            _ => 0,
        }
    }
}

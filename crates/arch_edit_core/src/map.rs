//! The map grid: per-square object stacks over the arena.
//!
//! Each square holds the bottom object of a doubly linked stack; `above`
//! walks toward the top. Multi-tile objects stand on several squares at
//! once, one part per square, tied together by the arena's multi ring.

use tracing::warn;

use crate::arch::ArchObject;
use crate::arena::{ArchId, ObjectArena};

/// A rectangular grid of object stacks.
#[derive(Debug, Clone)]
pub struct MapGrid {
    width: usize,
    height: usize,
    squares: Vec<Option<ArchId>>,
}

impl MapGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            squares: vec![None; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height
    }

    fn cell(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some(y as usize * self.width + x as usize)
        } else {
            None
        }
    }

    /// Bottom object of the stack at `(x, y)`.
    pub fn bottom(&self, x: i32, y: i32) -> Option<ArchId> {
        self.squares[self.cell(x, y)?]
    }

    /// The stack at `(x, y)`, bottom to top. A link that loops back is
    /// treated as end-of-chain.
    pub fn stack(&self, arena: &ObjectArena, x: i32, y: i32) -> Vec<ArchId> {
        let mut out = Vec::new();
        let mut cur = self.bottom(x, y);
        while let Some(id) = cur {
            if out.contains(&id) {
                break;
            }
            out.push(id);
            cur = arena.get(id).and_then(ArchObject::above);
        }
        out
    }

    /// Top object of the stack at `(x, y)`.
    pub fn top(&self, arena: &ObjectArena, x: i32, y: i32) -> Option<ArchId> {
        self.stack(arena, x, y).last().copied()
    }

    /// Put `id` on top of the stack at its own map position.
    pub fn insert_top(&mut self, arena: &mut ObjectArena, id: ArchId) -> bool {
        let (x, y) = match arena.get(id) {
            Some(obj) => (obj.map_x(), obj.map_y()),
            None => return false,
        };
        let Some(cell) = self.cell(x, y) else {
            return false;
        };
        match self.squares[cell] {
            None => self.squares[cell] = Some(id),
            Some(bottom) => {
                let top = *self.stack(arena, x, y).last().unwrap_or(&bottom);
                if top == id {
                    return false;
                }
                if let Some(obj) = arena.get_mut(top) {
                    obj.set_above(Some(id));
                }
                if let Some(obj) = arena.get_mut(id) {
                    obj.set_below(Some(top));
                }
            }
        }
        true
    }

    /// Put `id` below the stack at its own map position, making it the
    /// new bottom.
    pub fn insert_bottom(&mut self, arena: &mut ObjectArena, id: ArchId) -> bool {
        let (x, y) = match arena.get(id) {
            Some(obj) => (obj.map_x(), obj.map_y()),
            None => return false,
        };
        let Some(cell) = self.cell(x, y) else {
            return false;
        };
        if let Some(bottom) = self.squares[cell] {
            if bottom == id {
                return false;
            }
            if let Some(obj) = arena.get_mut(bottom) {
                obj.set_below(Some(id));
            }
            if let Some(obj) = arena.get_mut(id) {
                obj.set_above(Some(bottom));
            }
        }
        self.squares[cell] = Some(id);
        true
    }

    /// Swap `id` with the object above it. Objects inside a container
    /// cannot be reordered.
    pub fn move_up(&mut self, arena: &mut ObjectArena, id: ArchId) -> bool {
        let (container, above) = match arena.get(id) {
            Some(obj) => (obj.container(), obj.above()),
            None => return false,
        };
        if container.is_some() {
            return false;
        }
        let Some(other) = above else {
            return false;
        };
        self.swap_with_above(arena, id, other);
        true
    }

    /// Swap `id` with the object below it. Objects inside a container
    /// cannot be reordered.
    pub fn move_down(&mut self, arena: &mut ObjectArena, id: ArchId) -> bool {
        let (container, below) = match arena.get(id) {
            Some(obj) => (obj.container(), obj.below()),
            None => return false,
        };
        if container.is_some() {
            return false;
        }
        let Some(other) = below else {
            return false;
        };
        self.swap_with_above(arena, other, id);
        true
    }

    /// Swap an adjacent pair so `upper` ends up directly above `lower`.
    /// `upper` must currently be directly below `lower`.
    fn swap_with_above(&mut self, arena: &mut ObjectArena, upper: ArchId, lower: ArchId) {
        let old_top = arena.get(lower).and_then(ArchObject::above);
        let old_bottom = arena.get(upper).and_then(ArchObject::below);

        if let Some(obj) = arena.get_mut(upper) {
            obj.set_above(old_top);
            obj.set_below(Some(lower));
        }
        if let Some(obj) = arena.get_mut(lower) {
            obj.set_above(Some(upper));
            obj.set_below(old_bottom);
        }
        if let Some(top) = old_top {
            if let Some(obj) = arena.get_mut(top) {
                obj.set_below(Some(upper));
            }
        }
        match old_bottom {
            Some(bottom) => {
                if let Some(obj) = arena.get_mut(bottom) {
                    obj.set_above(Some(lower));
                }
            }
            None => {
                let (x, y) = match arena.get(lower) {
                    Some(obj) => (obj.map_x(), obj.map_y()),
                    None => return,
                };
                if let Some(cell) = self.cell(x, y) {
                    self.squares[cell] = Some(lower);
                }
            }
        }
    }

    /// Delete `id` from the map and the arena. Inventory objects are
    /// unlinked from their container; map objects take every multi-tile
    /// part and all inventories with them.
    pub fn delete(&mut self, arena: &mut ObjectArena, id: ArchId) -> bool {
        let Some(obj) = arena.get(id) else {
            return false;
        };
        if obj.container().is_some() {
            return arena.remove_subtree(id).is_some();
        }

        // start from the head so every part goes
        let mut cur = Some(obj.multi_head().unwrap_or(id));
        while let Some(part) = cur {
            let Some(obj) = arena.get(part) else { break };
            let (x, y) = (obj.map_x(), obj.map_y());
            let below = obj.below();
            let mut above = obj.above();
            if above == Some(part) {
                warn!(
                    arch = obj.arch_name().unwrap_or("?"),
                    "object links above itself, treating as top of stack"
                );
                above = None;
            }

            match below {
                None => {
                    if let Some(cell) = self.cell(x, y) {
                        self.squares[cell] = above;
                    }
                    if let Some(up) = above {
                        if let Some(obj) = arena.get_mut(up) {
                            obj.set_below(None);
                        }
                    }
                }
                Some(down) => {
                    if let Some(obj) = arena.get_mut(down) {
                        obj.set_above(above);
                    }
                    if let Some(up) = above {
                        if let Some(obj) = arena.get_mut(up) {
                            obj.set_below(Some(down));
                        }
                    }
                }
            }

            arena.remove_contents(part);
            let next = arena.get(part).and_then(ArchObject::multi_next);
            arena.remove(part);
            cur = if next == Some(part) { None } else { next };
        }
        true
    }

    /// Delete every object on the map.
    pub fn clear(&mut self, arena: &mut ObjectArena) {
        for cell in 0..self.squares.len() {
            while let Some(id) = self.squares[cell] {
                if !self.delete(arena, id) {
                    self.squares[cell] = None;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(arena: &mut ObjectArena, name: &str, x: i32, y: i32) -> ArchId {
        let mut obj = ArchObject::with_arch_name(name);
        obj.set_map_pos(x, y);
        arena.insert(obj)
    }

    fn names(arena: &ObjectArena, grid: &MapGrid, x: i32, y: i32) -> Vec<String> {
        grid.stack(arena, x, y)
            .into_iter()
            .map(|id| arena.get(id).unwrap().arch_name().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_insert_top_and_bottom() {
        let mut arena = ObjectArena::new();
        let mut grid = MapGrid::new(4, 4);
        let floor = place(&mut arena, "floor", 1, 1);
        let wall = place(&mut arena, "wall", 1, 1);
        let rug = place(&mut arena, "rug", 1, 1);

        assert!(grid.insert_top(&mut arena, floor));
        assert!(grid.insert_top(&mut arena, wall));
        assert!(grid.insert_bottom(&mut arena, rug));

        assert_eq!(names(&arena, &grid, 1, 1), ["rug", "floor", "wall"]);
        assert_eq!(grid.bottom(1, 1), Some(rug));
        assert_eq!(grid.top(&arena, 1, 1), Some(wall));
    }

    #[test]
    fn test_insert_out_of_bounds() {
        let mut arena = ObjectArena::new();
        let mut grid = MapGrid::new(2, 2);
        let stray = place(&mut arena, "stray", 5, 0);
        assert!(!grid.insert_top(&mut arena, stray));
    }

    #[test]
    fn test_move_up_and_down() {
        let mut arena = ObjectArena::new();
        let mut grid = MapGrid::new(3, 3);
        let a = place(&mut arena, "a", 0, 0);
        let b = place(&mut arena, "b", 0, 0);
        let c = place(&mut arena, "c", 0, 0);
        for id in [a, b, c] {
            grid.insert_top(&mut arena, id);
        }

        assert!(grid.move_up(&mut arena, a));
        assert_eq!(names(&arena, &grid, 0, 0), ["b", "a", "c"]);
        assert_eq!(grid.bottom(0, 0), Some(b));

        assert!(grid.move_down(&mut arena, c));
        assert_eq!(names(&arena, &grid, 0, 0), ["b", "c", "a"]);

        // top can't move further up, bottom can't move down
        assert!(!grid.move_up(&mut arena, a));
        assert!(!grid.move_down(&mut arena, b));
    }

    #[test]
    fn test_contained_objects_do_not_reorder() {
        let mut arena = ObjectArena::new();
        let mut grid = MapGrid::new(3, 3);
        let chest = place(&mut arena, "chest", 0, 0);
        let coin = place(&mut arena, "coin", 0, 0);
        grid.insert_top(&mut arena, chest);
        arena.add_inv(chest, coin);
        assert!(!grid.move_up(&mut arena, coin));
    }

    #[test]
    fn test_delete_resplices_stack_and_drops_inventory() {
        let mut arena = ObjectArena::new();
        let mut grid = MapGrid::new(3, 3);
        let floor = place(&mut arena, "floor", 2, 2);
        let chest = place(&mut arena, "chest", 2, 2);
        let torch = place(&mut arena, "torch", 2, 2);
        for id in [floor, chest, torch] {
            grid.insert_top(&mut arena, id);
        }
        let coin = place(&mut arena, "coin", 2, 2);
        arena.add_inv(chest, coin);

        assert!(grid.delete(&mut arena, chest));
        assert_eq!(names(&arena, &grid, 2, 2), ["floor", "torch"]);
        assert!(arena.get(chest).is_none());
        assert!(arena.get(coin).is_none());
        assert_eq!(arena.get(floor).unwrap().above(), Some(torch));
        assert_eq!(arena.get(torch).unwrap().below(), Some(floor));
    }

    #[test]
    fn test_delete_inventory_object_only_unlinks_it() {
        let mut arena = ObjectArena::new();
        let mut grid = MapGrid::new(3, 3);
        let chest = place(&mut arena, "chest", 0, 0);
        grid.insert_top(&mut arena, chest);
        let coin = place(&mut arena, "coin", 0, 0);
        arena.add_inv(chest, coin);

        assert!(grid.delete(&mut arena, coin));
        assert!(arena.get(chest).is_some());
        assert!(arena.get(coin).is_none());
        assert_eq!(arena.get(chest).unwrap().inv_first(), None);
    }

    #[test]
    fn test_delete_removes_every_multi_part() {
        let mut arena = ObjectArena::new();
        let mut grid = MapGrid::new(4, 4);

        let mut head_obj = ArchObject::with_arch_name("house");
        head_obj.set_map_pos(0, 0);
        head_obj.multi_mut().part_count = 1;
        let head = arena.insert(head_obj);

        let mut tail_obj = ArchObject::with_arch_name("house_t");
        tail_obj.set_map_pos(1, 0);
        tail_obj.multi_mut().is_tail = true;
        let tail = arena.insert(tail_obj);

        arena.push_multi_part(head, tail);
        grid.insert_top(&mut arena, head);
        grid.insert_top(&mut arena, tail);

        // deleting through the tail takes the head square down too
        assert!(grid.delete(&mut arena, tail));
        assert_eq!(grid.bottom(0, 0), None);
        assert_eq!(grid.bottom(1, 0), None);
        assert!(arena.get(head).is_none());
        assert!(arena.get(tail).is_none());
    }

    #[test]
    fn test_clear_empties_the_map() {
        let mut arena = ObjectArena::new();
        let mut grid = MapGrid::new(2, 2);
        for i in 0..4 {
            let id = place(&mut arena, "tile", i % 2, i / 2);
            grid.insert_top(&mut arena, id);
        }
        grid.clear(&mut arena);
        assert!(arena.is_empty());
        assert_eq!(grid.bottom(0, 0), None);
    }
}

//! Arena ownership for live map and inventory objects.
//!
//! Every topology relation between live objects is an [`ArchId`] into
//! this arena. Slots are never reused within a process run, so an id
//! doubles as the object's unique runtime identity. All link splicing
//! goes through arena methods; the link fields themselves are not
//! writable from outside the crate.

use crate::arch::ArchObject;

/// Stable handle to an object in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ArchId(pub(crate) usize);

impl ArchId {
    /// The underlying slot index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for ArchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Slot store for live objects. Removal leaves a tombstone so indices
/// stay stable for the lifetime of the process.
#[derive(Debug, Default)]
pub struct ObjectArena {
    slots: Vec<Option<ArchObject>>,
}

impl ObjectArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, obj: ArchObject) -> ArchId {
        let id = ArchId(self.slots.len());
        self.slots.push(Some(obj));
        id
    }

    pub fn get(&self, id: ArchId) -> Option<&ArchObject> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub fn get_mut(&mut self, id: ArchId) -> Option<&mut ArchObject> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn contains(&self, id: ArchId) -> bool {
        self.get(id).is_some()
    }

    /// Remove one object, leaving its slot dead. Links held by other
    /// objects are not touched; use the higher-level removal operations
    /// for linked objects.
    pub fn remove(&mut self, id: ArchId) -> Option<ArchObject> {
        self.slots.get_mut(id.0).and_then(Option::take)
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArchId, &ArchObject)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|obj| (ArchId(i), obj)))
    }

    // ─── Inventory ───

    /// Put `child` at the end of `parent`'s inventory. The child takes
    /// the parent's map position. Returns false when either id is dead,
    /// the child is the parent, or the child is already contained.
    pub fn add_inv(&mut self, parent: ArchId, child: ArchId) -> bool {
        if parent == child || !self.contains(parent) {
            return false;
        }
        let (last, x, y) = match self.get(parent) {
            Some(p) => (p.inv_last(), p.map_x(), p.map_y()),
            None => return false,
        };
        match self.get_mut(child) {
            Some(c) if c.container().is_none() => {
                c.set_inv_prev(last);
                c.set_inv_next(None);
                c.set_container(Some(parent));
                c.set_map_pos(x, y);
            }
            _ => return false,
        }
        if let Some(last) = last {
            if let Some(obj) = self.get_mut(last) {
                obj.set_inv_next(Some(child));
            }
        }
        if let Some(p) = self.get_mut(parent) {
            if p.inv_first().is_none() {
                p.set_inv_first(Some(child));
            }
            p.set_inv_last(Some(child));
        }
        true
    }

    /// Splice `child` out of its container's inventory chain. The child
    /// keeps its own inventory; only the links to parent and siblings are
    /// cut, and they are cut on both sides.
    pub fn unlink_inv(&mut self, child: ArchId) -> bool {
        let (container, prev, next) = match self.get(child) {
            Some(c) => (c.container(), c.inv_prev(), c.inv_next()),
            None => return false,
        };
        let Some(container) = container else {
            return false;
        };
        if let Some(prev) = prev {
            if let Some(obj) = self.get_mut(prev) {
                obj.set_inv_next(next);
            }
        }
        if let Some(next) = next {
            if let Some(obj) = self.get_mut(next) {
                obj.set_inv_prev(prev);
            }
        }
        if let Some(parent) = self.get_mut(container) {
            if parent.inv_first() == Some(child) {
                parent.set_inv_first(next);
            }
            if parent.inv_last() == Some(child) {
                parent.set_inv_last(prev);
            }
        }
        if let Some(c) = self.get_mut(child) {
            c.set_container(None);
            c.set_inv_prev(None);
            c.set_inv_next(None);
        }
        true
    }

    /// Remove every object in `id`'s inventory from the arena,
    /// recursively.
    pub fn remove_contents(&mut self, id: ArchId) {
        let mut cur = self.get(id).and_then(|o| o.inv_first());
        while let Some(child) = cur {
            cur = self.get(child).and_then(|o| o.inv_next());
            self.remove_contents(child);
            self.remove(child);
        }
        if let Some(obj) = self.get_mut(id) {
            obj.set_inv_first(None);
            obj.set_inv_last(None);
        }
    }

    /// Remove `id` and its whole inventory subtree from the arena,
    /// unlinking it from its container first.
    pub fn remove_subtree(&mut self, id: ArchId) -> Option<ArchObject> {
        if self.get(id)?.container().is_some() {
            self.unlink_inv(id);
        }
        self.remove_contents(id);
        self.remove(id)
    }

    /// Total number of objects inside `id`'s inventory tree.
    pub fn count_inv(&self, id: ArchId) -> usize {
        let mut count = 0;
        let mut cur = self.get(id).and_then(|o| o.inv_first());
        while let Some(child) = cur {
            count += 1 + self.count_inv(child);
            cur = self.get(child).and_then(|o| o.inv_next());
        }
        count
    }

    /// The inventory children of `id`, first to last.
    pub fn inv_chain(&self, id: ArchId) -> Vec<ArchId> {
        let mut out = Vec::new();
        let mut cur = self.get(id).and_then(|o| o.inv_first());
        while let Some(child) = cur {
            if out.contains(&child) {
                break;
            }
            out.push(child);
            cur = self.get(child).and_then(|o| o.inv_next());
        }
        out
    }

    // ─── Multi-tile ring ───

    /// Append `part` to the ring anchored at `head`, setting the part's
    /// back-link.
    pub fn push_multi_part(&mut self, head: ArchId, part: ArchId) -> bool {
        if head == part || !self.contains(part) {
            return false;
        }
        let chain = self.multi_chain(head);
        let Some(&last) = chain.last() else {
            return false;
        };
        if chain.contains(&part) {
            return false;
        }
        if let Some(obj) = self.get_mut(last) {
            obj.set_multi_next(Some(part));
        }
        if let Some(obj) = self.get_mut(part) {
            obj.set_multi_head(Some(head));
        }
        true
    }

    /// The head and every reachable part, in ring order. A link that
    /// loops back is treated as end-of-chain.
    pub fn multi_chain(&self, head: ArchId) -> Vec<ArchId> {
        let mut out = Vec::new();
        let mut cur = if self.contains(head) { Some(head) } else { None };
        while let Some(id) = cur {
            if out.contains(&id) {
                break;
            }
            out.push(id);
            cur = self.get(id).and_then(|o| o.multi_next());
        }
        out
    }

    /// Check the multi-tile invariant for `head`: the part count matches
    /// the reachable tiles and every part points back at the head.
    pub fn verify_multi(&self, head: ArchId) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();
        let Some(obj) = self.get(head) else {
            return Err(vec![format!("multi head {head} is not a live object")]);
        };
        let chain = self.multi_chain(head);
        let reachable = chain.len() - 1;
        if reachable != obj.part_count() as usize {
            errors.push(format!(
                "multi head {head} expects {} parts but reaches {reachable}",
                obj.part_count()
            ));
        }
        for &part in &chain[1..] {
            match self.get(part) {
                Some(p) => {
                    if p.multi_head() != Some(head) {
                        errors.push(format!("part {part} does not point back at head {head}"));
                    }
                    if !p.is_tail() {
                        errors.push(format!("part {part} is not marked as a tail"));
                    }
                }
                None => errors.push(format!("part {part} is not a live object")),
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::ArchObject;

    fn named(name: &str) -> ArchObject {
        ArchObject::with_arch_name(name)
    }

    #[test]
    fn test_ids_stay_stable_after_remove() {
        let mut arena = ObjectArena::new();
        let a = arena.insert(named("a"));
        let b = arena.insert(named("b"));
        arena.remove(a);
        let c = arena.insert(named("c"));
        assert_ne!(c, a);
        assert!(arena.get(a).is_none());
        assert_eq!(arena.get(b).unwrap().arch_name(), Some("b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_add_inv_links_and_position() {
        let mut arena = ObjectArena::new();
        let mut sack = named("sack");
        sack.set_map_pos(3, 7);
        let parent = arena.insert(sack);
        let first = arena.insert(named("coin"));
        let second = arena.insert(named("gem"));

        assert!(arena.add_inv(parent, first));
        assert!(arena.add_inv(parent, second));

        let p = arena.get(parent).unwrap();
        assert_eq!(p.inv_first(), Some(first));
        assert_eq!(p.inv_last(), Some(second));
        assert_eq!(arena.get(first).unwrap().inv_next(), Some(second));
        assert_eq!(arena.get(second).unwrap().inv_prev(), Some(first));
        assert_eq!(arena.get(second).unwrap().container(), Some(parent));
        assert_eq!(arena.get(second).unwrap().map_x(), 3);
        assert_eq!(arena.inv_chain(parent), [first, second]);
    }

    #[test]
    fn test_unlink_inv_leaves_no_dangling_links() {
        let mut arena = ObjectArena::new();
        let parent = arena.insert(named("chest"));
        let a = arena.insert(named("a"));
        let b = arena.insert(named("b"));
        let c = arena.insert(named("c"));
        arena.add_inv(parent, a);
        arena.add_inv(parent, b);
        arena.add_inv(parent, c);

        assert!(arena.unlink_inv(b));

        let p = arena.get(parent).unwrap();
        assert_ne!(p.inv_first(), Some(b));
        assert_ne!(p.inv_last(), Some(b));
        assert_eq!(arena.get(a).unwrap().inv_next(), Some(c));
        assert_eq!(arena.get(c).unwrap().inv_prev(), Some(a));
        let gone = arena.get(b).unwrap();
        assert_eq!(gone.container(), None);
        assert_eq!(gone.inv_prev(), None);
        assert_eq!(gone.inv_next(), None);

        // removing an end keeps first/last coherent
        assert!(arena.unlink_inv(a));
        let p = arena.get(parent).unwrap();
        assert_eq!(p.inv_first(), Some(c));
        assert_eq!(p.inv_last(), Some(c));
    }

    #[test]
    fn test_remove_subtree_is_recursive() {
        let mut arena = ObjectArena::new();
        let parent = arena.insert(named("chest"));
        let bag = arena.insert(named("bag"));
        let coin = arena.insert(named("coin"));
        arena.add_inv(parent, bag);
        arena.add_inv(bag, coin);

        assert_eq!(arena.count_inv(parent), 2);
        arena.remove_subtree(bag);
        assert_eq!(arena.count_inv(parent), 0);
        assert!(arena.get(bag).is_none());
        assert!(arena.get(coin).is_none());
        assert_eq!(arena.get(parent).unwrap().inv_first(), None);
    }

    #[test]
    fn test_multi_chain_and_verify() {
        let mut arena = ObjectArena::new();
        let mut head_obj = named("house");
        head_obj.multi_mut().part_count = 2;
        let head = arena.insert(head_obj);

        let mut tail = named("house_t1");
        tail.multi_mut().is_tail = true;
        let t1 = arena.insert(tail.clone());
        let t2 = arena.insert(tail);

        assert!(arena.push_multi_part(head, t1));
        assert!(arena.push_multi_part(head, t2));

        assert_eq!(arena.multi_chain(head), [head, t1, t2]);
        assert_eq!(arena.get(t2).unwrap().multi_head(), Some(head));
        assert!(arena.verify_multi(head).is_ok());
    }

    #[test]
    fn test_verify_multi_reports_mismatch() {
        let mut arena = ObjectArena::new();
        let mut head_obj = named("house");
        head_obj.multi_mut().part_count = 3;
        let head = arena.insert(head_obj);
        let mut tail = named("house_t1");
        tail.multi_mut().is_tail = true;
        let t1 = arena.insert(tail);
        arena.push_multi_part(head, t1);

        let errors = arena.verify_multi(head).unwrap_err();
        assert!(errors[0].contains("expects 3 parts but reaches 1"));
    }
}

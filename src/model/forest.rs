use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node in the forest. Handles stay valid across
    /// arbitrary mutation of other nodes and become inert (all lookups
    /// fail) once their node is removed.
    pub struct NodeId;
}

/// Which of a parent's two child lists a node is linked into.
///
/// Only workspaces use the floating list; every other interior node keeps
/// it empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Tiling,
    Floating,
}

/// Arena of tree nodes plus the observer that keeps per-node components
/// in sync with structural changes.
#[derive(Serialize, Deserialize)]
pub struct Forest<O> {
    pub map: NodeMap,
    pub data: O,
}

impl Forest<()> {
    pub fn new() -> Self {
        Self::with_observer(())
    }
}

impl<O: Observer> Forest<O> {
    pub fn with_observer(data: O) -> Self {
        Forest { map: NodeMap { map: SlotMap::default() }, data }
    }

    /// Allocates a detached node. The caller must attach it or remove it.
    pub fn create(&mut self) -> NodeId {
        let id = self.map.map.insert(Node::default());
        self.data.added_to_forest(&self.map, id);
        id
    }

    /// Appends `child` to the back of `parent`'s list for `slot`.
    pub fn attach(&mut self, parent: NodeId, child: NodeId, slot: Slot) {
        let index = self.map.list(parent, slot).len();
        self.attach_at(parent, index, child, slot);
    }

    /// Inserts `child` into `parent`'s `slot` list at `index`.
    pub fn attach_at(&mut self, parent: NodeId, index: usize, child: NodeId, slot: Slot) {
        debug_assert_ne!(parent, child, "node cannot be its own parent");
        debug_assert!(
            self.map.parent(child).is_none(),
            "attach of a node that already has a parent: {child:?}"
        );
        debug_assert!(
            !self.map.ancestors(parent).any(|a| a == child),
            "attach would create a cycle: {child:?} under {parent:?}"
        );
        self.map.map[child].parent = Some(parent);
        self.map.map[child].slot = slot;
        let parent_node = &mut self.map.map[parent];
        match slot {
            Slot::Tiling => parent_node.children.insert(index, child),
            Slot::Floating => parent_node.floating.insert(index, child),
        }
        self.data.added_to_parent(&self.map, child);
    }

    /// Inserts `child` immediately after `sibling`, in the same list.
    pub fn attach_after(&mut self, sibling: NodeId, child: NodeId) {
        let parent = self
            .map
            .parent(sibling)
            .expect("attach_after requires an attached sibling");
        let slot = self.map.map[sibling].slot;
        let index = self
            .map
            .list(parent, slot)
            .iter()
            .position(|&c| c == sibling)
            .expect("sibling missing from its parent's list");
        self.attach_at(parent, index + 1, child, slot);
    }

    /// Unlinks `child` from its parent. The subtree stays in the forest.
    pub fn detach(&mut self, child: NodeId) {
        let Some(parent) = self.map.parent(child) else {
            return;
        };
        self.data.removing_from_parent(&self.map, child);
        let slot = self.map.map[child].slot;
        let parent_node = &mut self.map.map[parent];
        match slot {
            Slot::Tiling => parent_node.children.retain(|&c| c != child),
            Slot::Floating => parent_node.floating.retain(|&c| c != child),
        }
        self.map.map[child].parent = None;
    }

    /// Removes a detached subtree from the forest, leaves first.
    pub fn remove(&mut self, node: NodeId) {
        debug_assert!(
            self.map.parent(node).is_none(),
            "remove called on a node that is still attached: {node:?}"
        );
        let order: Vec<NodeId> = self.map.traverse_postorder(node).collect();
        for id in order {
            self.data.removed_from_forest(&self.map, id);
            self.map.map.remove(id);
        }
    }

    /// Exchanges the tree positions of two attached nodes.
    pub fn swap(&mut self, a: NodeId, b: NodeId) {
        if a == b {
            return;
        }
        let (pa, pb) = (self.map.parent(a), self.map.parent(b));
        let (Some(pa), Some(pb)) = (pa, pb) else {
            return;
        };
        debug_assert!(
            !self.map.ancestors(a).any(|n| n == b) && !self.map.ancestors(b).any(|n| n == a),
            "swap of a node with its own ancestor: {a:?} <-> {b:?}"
        );
        let slot_a = self.map.map[a].slot;
        let slot_b = self.map.map[b].slot;
        let ia = self.map.index_in_parent(a).expect("attached node has an index");
        let ib = self.map.index_in_parent(b).expect("attached node has an index");
        self.map.list_mut(pa, slot_a)[ia] = b;
        self.map.list_mut(pb, slot_b)[ib] = a;
        self.map.map[a].parent = Some(pb);
        self.map.map[a].slot = slot_b;
        self.map.map[b].parent = Some(pa);
        self.map.map[b].slot = slot_a;
    }
}

/// Structural bookkeeping hooks. Components (focus pointers, per-node
/// data) implement this to stay consistent without the mutation sites
/// knowing about them.
pub trait Observer: Sized {
    fn added_to_forest(&mut self, map: &NodeMap, node: NodeId);
    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId);
    fn removed_from_forest(&mut self, map: &NodeMap, node: NodeId);
}

impl Observer for () {
    fn added_to_forest(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn added_to_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removing_from_parent(&mut self, _map: &NodeMap, _node: NodeId) {}

    fn removed_from_forest(&mut self, _map: &NodeMap, _node: NodeId) {}
}

/// Read-only view of the forest structure.
#[derive(Serialize, Deserialize)]
pub struct NodeMap {
    map: SlotMap<NodeId, Node>,
}

#[derive(Default, Debug, Serialize, Deserialize)]
struct Node {
    parent: Option<NodeId>,
    slot: Slot,
    children: Vec<NodeId>,
    floating: Vec<NodeId>,
}

impl Default for Slot {
    fn default() -> Self {
        Slot::Tiling
    }
}

impl NodeMap {
    pub fn contains(&self, id: NodeId) -> bool {
        self.map.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.map.get(id).and_then(|n| n.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.map.get(id).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    pub fn floating(&self, id: NodeId) -> &[NodeId] {
        self.map.get(id).map(|n| n.floating.as_slice()).unwrap_or(&[])
    }

    pub fn slot(&self, id: NodeId) -> Option<Slot> {
        self.map.get(id).filter(|n| n.parent.is_some()).map(|n| n.slot)
    }

    /// Index of `id` within its parent's list, tiling or floating.
    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let node = self.map.get(id)?;
        let parent = node.parent?;
        self.list(parent, node.slot).iter().position(|&c| c == id)
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let slot = self.map[id].slot;
        let list = self.list(parent, slot);
        let index = list.iter().position(|&c| c == id)?;
        list.get(index + 1).copied()
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let slot = self.map[id].slot;
        let list = self.list(parent, slot);
        let index = list.iter().position(|&c| c == id)?;
        index.checked_sub(1).and_then(|i| list.get(i)).copied()
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.map
            .get(id)
            .map(|n| n.children.is_empty() && n.floating.is_empty())
            .unwrap_or(true)
    }

    /// Iterates `id` and then every ancestor up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut next = self.contains(id).then_some(id);
        std::iter::from_fn(move || {
            let node = next;
            next = node.and_then(|n| self.parent(n));
            node
        })
    }

    /// Parent-before-children traversal. A node's tiling children come
    /// first, then its floating children, matching the order the IPC
    /// collaborator observes.
    pub fn traverse_preorder(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut stack = if self.contains(root) { vec![root] } else { vec![] };
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            for &child in self.floating(node).iter().rev() {
                stack.push(child);
            }
            for &child in self.children(node).iter().rev() {
                stack.push(child);
            }
            Some(node)
        })
    }

    /// Children-before-parent traversal, floating included.
    pub fn traverse_postorder(&self, root: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        let mut order: Vec<NodeId> = self.traverse_preorder(root).collect();
        order.reverse();
        order.into_iter()
    }

    fn list(&self, parent: NodeId, slot: Slot) -> &[NodeId] {
        match slot {
            Slot::Tiling => self.children(parent),
            Slot::Floating => self.floating(parent),
        }
    }

    fn list_mut(&mut self, parent: NodeId, slot: Slot) -> &mut Vec<NodeId> {
        let node = &mut self.map[parent];
        match slot {
            Slot::Tiling => &mut node.children,
            Slot::Floating => &mut node.floating,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// ```text
    ///        __root__
    ///       /    |   \
    /// child1  child2  child3     (+ float1 in root's floating list)
    ///            |
    ///           gc1
    /// ```
    struct TestForest {
        forest: Forest<Events>,
        root: NodeId,
        child1: NodeId,
        child2: NodeId,
        child3: NodeId,
        gc1: NodeId,
        float1: NodeId,
    }

    impl TestForest {
        fn new() -> Self {
            let mut forest = Forest::with_observer(Events(vec![]));
            let root = forest.create();
            let child1 = forest.create();
            let child2 = forest.create();
            let child3 = forest.create();
            let gc1 = forest.create();
            let float1 = forest.create();
            forest.attach(root, child1, Slot::Tiling);
            forest.attach(root, child2, Slot::Tiling);
            forest.attach(root, child3, Slot::Tiling);
            forest.attach(child2, gc1, Slot::Tiling);
            forest.attach(root, float1, Slot::Floating);
            forest.data.0.clear();
            TestForest { forest, root, child1, child2, child3, gc1, float1 }
        }
    }

    #[derive(Clone, PartialEq, Debug)]
    enum ForestEvent {
        AddedToForest(NodeId),
        AddedToParent(NodeId),
        RemovingFromParent(NodeId, NodeId),
        RemovedFromForest(NodeId),
    }
    use ForestEvent::*;

    struct Events(Vec<ForestEvent>);

    impl Observer for Events {
        fn added_to_forest(&mut self, _map: &NodeMap, node: NodeId) {
            self.0.push(AddedToForest(node))
        }

        fn added_to_parent(&mut self, _map: &NodeMap, node: NodeId) {
            self.0.push(AddedToParent(node))
        }

        fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
            let parent = map.parent(node).expect("event fires while still attached");
            self.0.push(RemovingFromParent(node, parent))
        }

        fn removed_from_forest(&mut self, _map: &NodeMap, node: NodeId) {
            self.0.push(RemovedFromForest(node))
        }
    }

    #[test]
    fn children_and_floating_are_separate_lists() {
        let t = TestForest::new();
        assert_eq!(t.forest.map.children(t.root), [t.child1, t.child2, t.child3]);
        assert_eq!(t.forest.map.floating(t.root), [t.float1]);
        assert_eq!(t.forest.map.parent(t.float1), Some(t.root));
        assert_eq!(t.forest.map.slot(t.float1), Some(Slot::Floating));
        assert_eq!(t.forest.map.slot(t.child1), Some(Slot::Tiling));
        assert_eq!(t.forest.map.slot(t.root), None);
    }

    #[test]
    fn attach_after_inserts_in_order() {
        let mut t = TestForest::new();
        let new = t.forest.create();
        t.forest.attach_after(t.child1, new);
        assert_eq!(t.forest.map.children(t.root), [t.child1, new, t.child2, t.child3]);
        assert_eq!(
            t.forest.data.0,
            vec![AddedToForest(new), AddedToParent(new)]
        );
    }

    #[test]
    fn siblings() {
        let t = TestForest::new();
        assert_eq!(t.forest.map.next_sibling(t.child1), Some(t.child2));
        assert_eq!(t.forest.map.prev_sibling(t.child1), None);
        assert_eq!(t.forest.map.next_sibling(t.child3), None);
        assert_eq!(t.forest.map.prev_sibling(t.child3), Some(t.child2));
        // Floating nodes have no tiling siblings.
        assert_eq!(t.forest.map.next_sibling(t.float1), None);
    }

    #[test]
    fn ancestors_reach_root() {
        let t = TestForest::new();
        let ancestors: Vec<_> = t.forest.map.ancestors(t.gc1).collect();
        assert_eq!(ancestors, [t.gc1, t.child2, t.root]);
    }

    #[test]
    fn preorder_visits_parent_before_children_and_floating_last() {
        let t = TestForest::new();
        let order: Vec<_> = t.forest.map.traverse_preorder(t.root).collect();
        assert_eq!(order, [t.root, t.child1, t.child2, t.gc1, t.child3, t.float1]);
    }

    #[test]
    fn postorder_visits_children_first() {
        let t = TestForest::new();
        let order: Vec<_> = t.forest.map.traverse_postorder(t.root).collect();
        assert_eq!(order, [t.float1, t.child3, t.gc1, t.child2, t.child1, t.root]);
    }

    #[test]
    fn detach_then_remove_drops_subtree() {
        let mut t = TestForest::new();
        t.forest.detach(t.child2);
        assert_eq!(t.forest.map.children(t.root), [t.child1, t.child3]);
        assert_eq!(t.forest.map.parent(t.child2), None);
        // Subtree is still alive until removed.
        assert!(t.forest.map.contains(t.gc1));
        t.forest.remove(t.child2);
        assert!(!t.forest.map.contains(t.child2));
        assert!(!t.forest.map.contains(t.gc1));
        assert_eq!(
            t.forest.data.0,
            vec![
                RemovingFromParent(t.child2, t.root),
                RemovedFromForest(t.gc1),
                RemovedFromForest(t.child2),
            ]
        );
    }

    #[test]
    fn detach_and_reattach_elsewhere() {
        let mut t = TestForest::new();
        t.forest.detach(t.child1);
        t.forest.attach(t.child2, t.child1, Slot::Tiling);
        assert_eq!(t.forest.map.children(t.root), [t.child2, t.child3]);
        assert_eq!(t.forest.map.children(t.child2), [t.gc1, t.child1]);
        assert_eq!(t.forest.map.parent(t.child1), Some(t.child2));
    }

    #[test]
    fn swap_exchanges_positions_across_parents() {
        let mut t = TestForest::new();
        t.forest.swap(t.child1, t.gc1);
        assert_eq!(t.forest.map.children(t.root), [t.gc1, t.child2, t.child3]);
        assert_eq!(t.forest.map.children(t.child2), [t.child1]);
        assert_eq!(t.forest.map.parent(t.gc1), Some(t.root));
        assert_eq!(t.forest.map.parent(t.child1), Some(t.child2));
    }

    #[test]
    fn swap_between_slots_updates_slot_tags() {
        let mut t = TestForest::new();
        t.forest.swap(t.child3, t.float1);
        assert_eq!(t.forest.map.children(t.root), [t.child1, t.child2, t.float1]);
        assert_eq!(t.forest.map.floating(t.root), [t.child3]);
        assert_eq!(t.forest.map.slot(t.child3), Some(Slot::Floating));
        assert_eq!(t.forest.map.slot(t.float1), Some(Slot::Tiling));
    }

    #[test]
    fn stale_ids_are_inert() {
        let mut t = TestForest::new();
        t.forest.detach(t.child2);
        t.forest.remove(t.child2);
        assert_eq!(t.forest.map.parent(t.gc1), None);
        assert_eq!(t.forest.map.children(t.gc1), []);
        assert!(t.forest.map.ancestors(t.gc1).next().is_none());
        assert!(t.forest.map.is_leaf(t.gc1));
    }

    #[test]
    fn index_in_parent_covers_both_lists() {
        let t = TestForest::new();
        assert_eq!(t.forest.map.index_in_parent(t.child2), Some(1));
        assert_eq!(t.forest.map.index_in_parent(t.float1), Some(0));
        assert_eq!(t.forest.map.index_in_parent(t.root), None);
    }
}

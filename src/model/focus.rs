use serde::{Deserialize, Serialize};

use crate::model::forest::{NodeId, NodeMap};

/// Per-node "currently focused child" pointers.
///
/// The pointer is non-owning: it denotes a relationship, never lifetime.
/// Pointers are dropped when the pointee leaves its parent, so a stale
/// entry can never outlive the membership it describes.
#[derive(Default, Serialize, Deserialize)]
pub struct FocusChain {
    focused: slotmap::SecondaryMap<NodeId, NodeId>,
}

impl FocusChain {
    /// The focused child of `node`, if any.
    pub fn focused_child(&self, map: &NodeMap, node: NodeId) -> Option<NodeId> {
        let child = self.focused.get(node).copied();
        if let Some(child) = child {
            debug_assert_eq!(
                map.parent(child),
                Some(node),
                "focused pointer at {node:?} does not point at a current child"
            );
        }
        child
    }

    /// Follows focused pointers from `root` until a node without one.
    pub fn descend(&self, map: &NodeMap, root: NodeId) -> NodeId {
        let mut node = root;
        while let Some(&child) = self.focused.get(node) {
            debug_assert_eq!(map.parent(child), Some(node));
            node = child;
        }
        node
    }

    /// Points `node`'s parent at `node`. Returns the previously focused
    /// sibling if the pointer changed.
    pub fn focus_locally(&mut self, map: &NodeMap, node: NodeId) -> Option<NodeId> {
        let parent = map.parent(node)?;
        let prev = self.focused.insert(parent, node);
        prev.filter(|&p| p != node)
    }

    /// Points every ancestor at the child leading to `node`, stopping
    /// after `top`'s pointer is set (or at the root when `top` is None).
    pub fn focus_path(&mut self, map: &NodeMap, node: NodeId, top: Option<NodeId>) {
        let mut node = node;
        while let Some(parent) = map.parent(node) {
            self.focused.insert(parent, node);
            if Some(parent) == top {
                break;
            }
            node = parent;
        }
    }

    /// True when `node` lies on the focus path from the root, i.e. every
    /// ancestor is its own parent's focused child.
    pub fn is_globally_focused(&self, map: &NodeMap, node: NodeId) -> bool {
        map.ancestors(node).all(|n| match map.parent(n) {
            Some(parent) => self.focused.get(parent).copied() == Some(n),
            None => true,
        })
    }

    pub fn clear(&mut self, node: NodeId) {
        self.focused.remove(node);
    }

    /// Structural fixup: a node leaving its parent takes the parent's
    /// focused pointer with it. The caller re-establishes focus.
    pub fn on_removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
        if let Some(parent) = map.parent(node)
            && self.focused.get(parent).copied() == Some(node)
        {
            self.focused.remove(parent);
        }
    }

    pub fn on_removed_from_forest(&mut self, node: NodeId) {
        self.focused.remove(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::forest::{Forest, Slot};

    fn forest() -> (Forest<()>, NodeId, NodeId, NodeId, NodeId) {
        let mut f = Forest::new();
        let root = f.create();
        let a = f.create();
        let b = f.create();
        let leaf = f.create();
        f.attach(root, a, Slot::Tiling);
        f.attach(root, b, Slot::Tiling);
        f.attach(a, leaf, Slot::Tiling);
        (f, root, a, b, leaf)
    }

    #[test]
    fn descend_follows_pointers() {
        let (f, root, a, _b, leaf) = forest();
        let mut chain = FocusChain::default();
        assert_eq!(chain.descend(&f.map, root), root);
        chain.focus_path(&f.map, leaf, None);
        assert_eq!(chain.descend(&f.map, root), leaf);
        assert_eq!(chain.focused_child(&f.map, root), Some(a));
        assert_eq!(chain.focused_child(&f.map, a), Some(leaf));
    }

    #[test]
    fn focus_locally_reports_previous() {
        let (f, _root, a, b, _leaf) = forest();
        let mut chain = FocusChain::default();
        assert_eq!(chain.focus_locally(&f.map, a), None);
        assert_eq!(chain.focus_locally(&f.map, a), None);
        assert_eq!(chain.focus_locally(&f.map, b), Some(a));
    }

    #[test]
    fn globally_focused_requires_full_path() {
        let (f, root, a, b, leaf) = forest();
        let mut chain = FocusChain::default();
        chain.focus_locally(&f.map, leaf);
        assert!(!chain.is_globally_focused(&f.map, leaf));
        chain.focus_locally(&f.map, b);
        assert!(!chain.is_globally_focused(&f.map, leaf));
        chain.focus_locally(&f.map, a);
        assert!(chain.is_globally_focused(&f.map, leaf));
        assert!(chain.is_globally_focused(&f.map, root));
    }

    #[test]
    fn removal_clears_the_parent_pointer() {
        let (mut f, root, a, _b, leaf) = forest();
        let mut chain = FocusChain::default();
        chain.focus_path(&f.map, leaf, None);
        chain.on_removing_from_parent(&f.map, a);
        f.detach(a);
        assert_eq!(chain.focused_child(&f.map, root), None);
        // The detached subtree keeps its own pointers until removed.
        assert_eq!(chain.focused_child(&f.map, a), Some(leaf));
        chain.on_removed_from_forest(a);
        assert_eq!(chain.descend(&f.map, a), a);
    }

    #[test]
    fn scoped_path_stops_at_top() {
        let (f, root, a, _b, leaf) = forest();
        let mut chain = FocusChain::default();
        chain.focus_path(&f.map, leaf, Some(a));
        assert_eq!(chain.focused_child(&f.map, a), Some(leaf));
        assert_eq!(chain.focused_child(&f.map, root), None);
    }
}

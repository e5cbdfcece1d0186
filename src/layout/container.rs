use serde::{Deserialize, Serialize};
use slotmap::SecondaryMap;
use tracing::{debug, warn};

use crate::common::collections::HashMap;
use crate::common::config::LayoutSettings;
use crate::geometry::{Axis, Point, Rect};
use crate::layout::focus::FocusContext;
use crate::layout::view::View;
use crate::model::focus::FocusChain;
use crate::model::forest::{Forest, NodeId, NodeMap, Observer, Slot};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Root,
    Output,
    Workspace,
    Container,
    View,
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Layout {
    #[default]
    None,
    Horizontal,
    Vertical,
    Tabbed,
    Stacked,
    Floating,
}

impl Layout {
    /// The split axis, for the two partitioning layouts.
    pub fn axis(self) -> Option<Axis> {
        match self {
            Layout::Horizontal => Some(Axis::Horizontal),
            Layout::Vertical => Some(Axis::Vertical),
            _ => None,
        }
    }

    /// Tabbed and stacked children fully overlap; only the focused one
    /// is shown.
    pub fn is_group(self) -> bool {
        matches!(self, Layout::Tabbed | Layout::Stacked)
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderKind {
    #[default]
    Normal,
    Pixel,
    None,
}

/// What the rendering collaborator reads. The core only keeps these
/// fields current; drawing them is out of scope.
#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Border {
    pub kind: BorderKind,
    pub rect: Rect,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub kind: NodeKind,
    pub layout: Layout,
    /// Proportional share of a split. Always positive.
    pub weight: f64,
    pub rect: Rect,
    pub visible: bool,
    /// Inner gap override in pixels; -1 inherits the configured default.
    pub gaps: f64,
    pub is_floating: bool,
    pub fullscreen: bool,
    pub activated: bool,
    pub border: Border,
    pub name: Option<String>,
}

impl Default for NodeData {
    fn default() -> Self {
        Self {
            kind: NodeKind::View,
            layout: Layout::None,
            weight: 1.0,
            rect: Rect::default(),
            visible: false,
            gaps: -1.0,
            is_floating: false,
            fullscreen: false,
            activated: false,
            border: Border::default(),
            name: None,
        }
    }
}

#[derive(Default, Serialize, Deserialize)]
pub(crate) struct NodeStore {
    nodes: SecondaryMap<NodeId, NodeData>,
}

impl NodeStore {
    pub(crate) fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id)
    }
}

impl std::ops::Index<NodeId> for NodeStore {
    type Output = NodeData;

    fn index(&self, index: NodeId) -> &NodeData {
        &self.nodes[index]
    }
}

impl std::ops::IndexMut<NodeId> for NodeStore {
    fn index_mut(&mut self, index: NodeId) -> &mut NodeData {
        &mut self.nodes[index]
    }
}

/// Per-node components kept in sync with the forest structure through
/// [`Observer`] events.
#[derive(Default, Serialize, Deserialize)]
pub(crate) struct Components {
    pub(crate) focus: FocusChain,
    pub(crate) nodes: NodeStore,
    pub(crate) names: HashMap<String, NodeId>,
}

impl Observer for Components {
    fn added_to_forest(&mut self, _map: &NodeMap, node: NodeId) {
        self.nodes.nodes.insert(node, NodeData::default());
    }

    fn added_to_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.nodes[node].is_floating = map.slot(node) == Some(Slot::Floating);
    }

    fn removing_from_parent(&mut self, map: &NodeMap, node: NodeId) {
        self.focus.on_removing_from_parent(map, node);
    }

    fn removed_from_forest(&mut self, _map: &NodeMap, node: NodeId) {
        if let Some(name) = self.nodes[node].name.take() {
            self.names.remove(&name);
        }
        self.nodes.nodes.remove(node);
        self.focus.on_removed_from_forest(node);
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0:?} is no longer in the tree")]
    Missing(NodeId),
    #[error("node {0:?} has no parent")]
    Detached(NodeId),
    #[error("node {0:?} is already attached")]
    AlreadyAttached(NodeId),
    #[error("node {child:?} is not a child of {parent:?}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("operation on a {actual} node requires a {expected}")]
    WrongKind { expected: NodeKind, actual: NodeKind },
    #[error("focus is locked")]
    FocusLocked,
}

/// The container tree: node graph, per-node data, focus pointers, and the
/// view collaborators hanging off the leaves.
///
/// All mutation goes through the operations defined here and in the
/// arrange/focus/resize modules; every public operation leaves the tree
/// fully valid before returning.
#[derive(Serialize, Deserialize)]
pub struct ContainerTree {
    pub(crate) forest: Forest<Components>,
    root: NodeId,
    pub(crate) settings: LayoutSettings,
    pub(crate) ctx: FocusContext,
    #[serde(skip)]
    pub(crate) views: SecondaryMap<NodeId, Box<dyn View>>,
    #[serde(skip)]
    needs_redraw: bool,
}

impl ContainerTree {
    pub fn new(settings: LayoutSettings) -> Self {
        let mut forest = Forest::with_observer(Components::default());
        let root = forest.create();
        forest.data.nodes[root].kind = NodeKind::Root;
        forest.data.nodes[root].visible = true;
        ContainerTree {
            forest,
            root,
            settings,
            ctx: FocusContext::default(),
            views: SecondaryMap::new(),
            needs_redraw: false,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn map(&self) -> &NodeMap {
        &self.forest.map
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.settings
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeData> {
        self.forest.data.nodes.get(id)
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.node(id).map(|d| d.kind)
    }

    pub fn rect(&self, id: NodeId) -> Option<Rect> {
        self.node(id).map(|d| d.rect)
    }

    pub(crate) fn data(&self, id: NodeId) -> &NodeData {
        &self.forest.data.nodes[id]
    }

    pub(crate) fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.forest.data.nodes[id]
    }

    pub(crate) fn ensure(&self, id: NodeId) -> Result<(), TreeError> {
        if self.forest.map.contains(id) {
            Ok(())
        } else {
            Err(TreeError::Missing(id))
        }
    }

    pub(crate) fn ensure_kind(&self, id: NodeId, expected: NodeKind) -> Result<(), TreeError> {
        let actual = self.data(id).kind;
        if actual == expected {
            Ok(())
        } else {
            Err(TreeError::WrongKind { expected, actual })
        }
    }

    /// Signals the rendering collaborator; reading clears the flag.
    pub fn take_redraw_request(&mut self) -> bool {
        std::mem::replace(&mut self.needs_redraw, false)
    }

    pub(crate) fn request_redraw(&mut self) {
        self.needs_redraw = true;
    }

    // ---- node constructors -------------------------------------------------

    fn mk_node(&mut self, kind: NodeKind) -> NodeId {
        let id = self.forest.create();
        self.data_mut(id).kind = kind;
        id
    }

    /// Creates an output and its first workspace. Outputs host at least
    /// one workspace at all times, so the two are born together.
    pub fn create_output(&mut self, name: &str, rect: Rect) -> NodeId {
        let output = self.mk_node(NodeKind::Output);
        {
            let data = self.data_mut(output);
            data.rect = rect;
            data.visible = true;
        }
        self.set_name(output, name);
        self.attach_and_seed_focus(self.root, output, Slot::Tiling);
        // Lowest numeric name not taken yet; workspace names are global,
        // so counting anything would collide across outputs or with
        // caller-chosen names.
        let mut n = 1usize;
        while self.forest.data.names.contains_key(&n.to_string()) {
            n += 1;
        }
        self.create_workspace(output, &n.to_string())
            .expect("fresh output accepts a workspace");
        debug!(output = name, ?rect, "created output");
        output
    }

    pub fn create_workspace(&mut self, output: NodeId, name: &str) -> Result<NodeId, TreeError> {
        self.ensure(output)?;
        self.ensure_kind(output, NodeKind::Output)?;
        let workspace = self.mk_node(NodeKind::Workspace);
        {
            let rect = self.data(output).rect;
            let data = self.data_mut(workspace);
            data.layout = Layout::Horizontal;
            data.rect = rect;
        }
        self.set_name(workspace, name);
        self.attach_and_seed_focus(output, workspace, Slot::Tiling);
        if self.forest.map.children(output).len() == 1 {
            self.data_mut(workspace).visible = true;
        }
        debug!(workspace = name, "created workspace");
        Ok(workspace)
    }

    /// Creates a view leaf under `parent` (a workspace or container).
    pub fn create_view(&mut self, parent: NodeId) -> Result<NodeId, TreeError> {
        self.ensure(parent)?;
        match self.data(parent).kind {
            NodeKind::Workspace | NodeKind::Container => {}
            actual => return Err(TreeError::WrongKind { expected: NodeKind::Container, actual }),
        }
        let view = self.mk_node(NodeKind::View);
        let visible = self.data(parent).visible;
        self.attach_and_seed_focus(parent, view, Slot::Tiling);
        self.data_mut(view).visible = visible;
        Ok(view)
    }

    /// Registers the external collaborator backing a view node.
    pub fn set_view_backend(&mut self, view: NodeId, backend: Box<dyn View>) -> Result<(), TreeError> {
        self.ensure(view)?;
        self.ensure_kind(view, NodeKind::View)?;
        self.views.insert(view, backend);
        Ok(())
    }

    pub fn set_name(&mut self, node: NodeId, name: &str) {
        if let Some(old) = self.data_mut(node).name.replace(name.to_owned()) {
            self.forest.data.names.remove(&old);
        }
        self.forest.data.names.insert(name.to_owned(), node);
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.forest.data.names.get(name).copied()
    }

    // ---- structural primitives ---------------------------------------------

    fn attach_and_seed_focus(&mut self, parent: NodeId, child: NodeId, slot: Slot) {
        self.forest.attach(parent, child, slot);
        if self.forest.data.focus.focused_child(&self.forest.map, parent).is_none() {
            self.forest.data.focus.focus_locally(&self.forest.map, child);
        }
    }

    /// Appends `child` to `parent`'s tiling children. Seeds the parent's
    /// focused pointer when it had none.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure(parent)?;
        self.ensure(child)?;
        if self.forest.map.parent(child).is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        self.attach_and_seed_focus(parent, child, Slot::Tiling);
        Ok(())
    }

    /// Inserts `child` immediately after `sibling` in its parent's list.
    pub fn add_sibling(&mut self, sibling: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure(sibling)?;
        self.ensure(child)?;
        if self.forest.map.parent(sibling).is_none() {
            return Err(TreeError::Detached(sibling));
        }
        if self.forest.map.parent(child).is_some() {
            return Err(TreeError::AlreadyAttached(child));
        }
        self.forest.attach_after(sibling, child);
        Ok(())
    }

    /// Swaps `new` into `old`'s slot, transferring parent and, if `old`
    /// was the focused child, focus. `old` is left detached but alive.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> Result<(), TreeError> {
        self.ensure(old)?;
        self.ensure(new)?;
        let Some(parent) = self.forest.map.parent(old) else {
            return Err(TreeError::Detached(old));
        };
        if self.forest.map.parent(new).is_some() {
            return Err(TreeError::AlreadyAttached(new));
        }
        let slot = self.forest.map.slot(old).expect("attached node has a slot");
        let index = self.forest.map.index_in_parent(old).expect("attached node has an index");
        let had_focus =
            self.forest.data.focus.focused_child(&self.forest.map, parent) == Some(old);
        self.forest.detach(old);
        self.forest.attach_at(parent, index, new, slot);
        if had_focus {
            self.forest.data.focus.focus_locally(&self.forest.map, new);
        }
        Ok(())
    }

    /// Detaches `child` from `parent`. Clears the parent's focused
    /// pointer if it pointed at `child`; the caller re-establishes focus.
    /// Does not collapse emptied containers; that is `destroy`'s job.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.ensure(parent)?;
        self.ensure(child)?;
        if self.forest.map.parent(child) != Some(parent) {
            return Err(TreeError::NotAChild { parent, child });
        }
        self.forest.detach(child);
        Ok(())
    }

    /// Wraps `child` in a new container with the given layout.
    ///
    /// For a workspace the wrap reorganizes its existing content instead
    /// of nesting the workspace: the children and focus move into the new
    /// container, which becomes the sole child, and the layout values are
    /// exchanged (the container keeps what the workspace had, the
    /// workspace takes `layout`).
    pub fn wrap(&mut self, child: NodeId, layout: Layout) -> Result<NodeId, TreeError> {
        self.ensure(child)?;
        if self.data(child).kind == NodeKind::Workspace {
            return self.wrap_workspace(child, layout);
        }
        let Some(_) = self.forest.map.parent(child) else {
            return Err(TreeError::Detached(child));
        };
        let container = self.mk_node(NodeKind::Container);
        {
            let (rect, visible, weight) = {
                let d = self.data(child);
                (d.rect, d.visible, d.weight)
            };
            let data = self.data_mut(container);
            data.layout = layout;
            data.rect = rect;
            data.visible = visible;
            data.weight = weight;
        }
        self.replace_child(child, container)?;
        self.add_child(container, child)?;
        self.data_mut(child).weight = 1.0;
        debug!(?child, ?container, %layout, "wrapped node in container");
        Ok(container)
    }

    fn wrap_workspace(&mut self, workspace: NodeId, layout: Layout) -> Result<NodeId, TreeError> {
        let container = self.mk_node(NodeKind::Container);
        let previous_layout = self.data(workspace).layout;
        let previous_focus =
            self.forest.data.focus.focused_child(&self.forest.map, workspace);
        {
            let (rect, visible) = {
                let d = self.data(workspace);
                (d.rect, d.visible)
            };
            let data = self.data_mut(container);
            data.layout = previous_layout;
            data.rect = rect;
            data.visible = visible;
        }
        let children: Vec<NodeId> = self.forest.map.children(workspace).to_vec();
        for child in children {
            self.forest.detach(child);
            self.forest.attach(container, child, Slot::Tiling);
        }
        if let Some(focused) = previous_focus {
            self.forest.data.focus.focus_locally(&self.forest.map, focused);
        }
        self.attach_and_seed_focus(workspace, container, Slot::Tiling);
        self.data_mut(workspace).layout = layout;
        debug!(?workspace, ?container, %layout, "rewrapped workspace content");
        Ok(container)
    }

    /// Exchanges two nodes' tree positions (and their split weights, so
    /// the surrounding layout keeps its shape). Used by tiling drag.
    pub fn swap(&mut self, a: NodeId, b: NodeId) -> Result<(), TreeError> {
        self.ensure(a)?;
        self.ensure(b)?;
        if self.forest.map.parent(a).is_none() {
            return Err(TreeError::Detached(a));
        }
        if self.forest.map.parent(b).is_none() {
            return Err(TreeError::Detached(b));
        }
        self.forest.swap(a, b);
        let weight_a = self.data(a).weight;
        let weight_b = self.data(b).weight;
        self.data_mut(a).weight = weight_b;
        self.data_mut(b).weight = weight_a;
        self.request_redraw();
        Ok(())
    }

    // ---- destruction -------------------------------------------------------

    /// Destroys `node` and its whole subtree, floating members included.
    ///
    /// Emptied `Container` ancestors collapse away, and a container left
    /// with a single child is flattened into its parent's list at the
    /// same index. Workspaces follow the migration rules: the last
    /// workspace on an output survives, occupants move to a sibling
    /// workspace first.
    pub fn destroy(&mut self, node: NodeId) -> Result<(), TreeError> {
        self.ensure(node)?;
        match self.data(node).kind {
            NodeKind::Root => Err(TreeError::WrongKind {
                expected: NodeKind::Container,
                actual: NodeKind::Root,
            }),
            NodeKind::Output => self.destroy_output(node),
            NodeKind::Workspace => self.destroy_workspace(node),
            NodeKind::Container | NodeKind::View => {
                let parent = self.forest.map.parent(node);
                self.drop_subtree(node);
                if let Some(parent) = parent {
                    let survivor = self.reap(parent);
                    self.refocus_after_destroy();
                    self.arrange(survivor, None);
                }
                Ok(())
            }
        }
    }

    fn destroy_output(&mut self, output: NodeId) -> Result<(), TreeError> {
        let target = self
            .forest
            .map
            .children(self.root)
            .iter()
            .copied()
            .find(|&o| o != output);
        if let Some(target) = target {
            // Single atomic step in which an output may briefly hold no
            // workspaces: they are re-homed before the node is freed.
            let workspaces: Vec<NodeId> = self.forest.map.children(output).to_vec();
            for workspace in workspaces {
                self.forest.detach(workspace);
                self.attach_and_seed_focus(target, workspace, Slot::Tiling);
            }
            debug!(?output, ?target, "migrated workspaces off destroyed output");
        }
        self.drop_subtree(output);
        self.refocus_after_destroy();
        self.arrange(self.root, None);
        Ok(())
    }

    fn destroy_workspace(&mut self, workspace: NodeId) -> Result<(), TreeError> {
        let output = self.forest.map.parent(workspace).ok_or(TreeError::Detached(workspace))?;
        let sibling = self
            .forest
            .map
            .children(output)
            .iter()
            .copied()
            .find(|&w| w != workspace);
        let Some(target) = sibling else {
            debug!(?workspace, "kept last workspace on output");
            return Ok(());
        };
        let children: Vec<NodeId> = self.forest.map.children(workspace).to_vec();
        for child in children {
            self.forest.detach(child);
            self.attach_and_seed_focus(target, child, Slot::Tiling);
        }
        let floating: Vec<NodeId> = self.forest.map.floating(workspace).to_vec();
        for child in floating {
            self.forest.detach(child);
            self.forest.attach(target, child, Slot::Floating);
        }
        self.drop_subtree(workspace);
        self.refocus_after_destroy();
        self.arrange(output, None);
        Ok(())
    }

    /// Detaches and frees a subtree, dropping view collaborators with it.
    fn drop_subtree(&mut self, node: NodeId) {
        let ids: Vec<NodeId> = self.forest.map.traverse_preorder(node).collect();
        for id in ids {
            self.views.remove(id);
        }
        self.forest.detach(node);
        self.forest.remove(node);
        self.request_redraw();
    }

    /// Restores the "no dangling empty containers" invariant upward from
    /// a container that just lost a child. Returns the nearest surviving
    /// ancestor, which is what the caller should re-arrange.
    fn reap(&mut self, mut node: NodeId) -> NodeId {
        loop {
            if !self.forest.map.contains(node) {
                return self.root;
            }
            if self.data(node).kind != NodeKind::Container {
                return node;
            }
            let children = self.forest.map.children(node);
            match children.len() {
                0 => {
                    let parent = self.forest.map.parent(node);
                    self.drop_subtree(node);
                    match parent {
                        Some(parent) => node = parent,
                        None => return self.root,
                    }
                }
                1 => {
                    let only = children[0];
                    let weight = self.data(node).weight;
                    let parent = self.forest.map.parent(node);
                    self.forest.detach(only);
                    if self.replace_child(node, only).is_err() {
                        // A detached container being collapsed has no slot
                        // to hand over; just keep the child detached too.
                        warn!(?node, "collapsed container without a parent");
                    }
                    self.data_mut(only).weight = weight;
                    self.forest.remove(node);
                    return parent.unwrap_or(self.root);
                }
                _ => return node,
            }
        }
    }

    // ---- floating ----------------------------------------------------------

    pub fn is_floating(&self, node: NodeId) -> bool {
        self.node(node).map(|d| d.is_floating).unwrap_or(false)
    }

    /// Moves a view between its workspace's tiling and floating lists.
    pub fn set_floating(&mut self, view: NodeId, floating: bool) -> Result<(), TreeError> {
        self.ensure(view)?;
        self.ensure_kind(view, NodeKind::View)?;
        if self.is_floating(view) == floating {
            return Ok(());
        }
        let workspace = self.workspace_of(view).ok_or(TreeError::Detached(view))?;
        let old_parent = self.forest.map.parent(view).ok_or(TreeError::Detached(view))?;
        self.forest.detach(view);
        if floating {
            self.forest.attach(workspace, view, Slot::Floating);
            self.reap(old_parent);
        } else {
            self.attach_and_seed_focus(workspace, view, Slot::Tiling);
        }
        // Detaching cleared the focus path; restore it if this was the
        // focused view so the chain still ends at it.
        if self.ctx.focused_leaf() == Some(view) {
            self.forest.data.focus.focus_path(&self.forest.map, view, None);
        }
        self.arrange(workspace, None);
        Ok(())
    }

    // ---- ancestry ----------------------------------------------------------

    pub fn workspace_of(&self, node: NodeId) -> Option<NodeId> {
        self.forest
            .map
            .ancestors(node)
            .find(|&n| self.data(n).kind == NodeKind::Workspace)
    }

    pub fn output_of(&self, node: NodeId) -> Option<NodeId> {
        self.forest
            .map
            .ancestors(node)
            .find(|&n| self.data(n).kind == NodeKind::Output)
    }

    pub fn outputs(&self) -> &[NodeId] {
        self.forest.map.children(self.root)
    }

    // ---- fullscreen --------------------------------------------------------

    pub fn set_fullscreen(&mut self, view: NodeId, fullscreen: bool) -> Result<(), TreeError> {
        self.ensure(view)?;
        self.ensure_kind(view, NodeKind::View)?;
        self.data_mut(view).fullscreen = fullscreen;
        if let Some(workspace) = self.workspace_of(view) {
            self.arrange(workspace, None);
        }
        Ok(())
    }

    // ---- gaps and weights --------------------------------------------------

    pub fn set_gaps(&mut self, node: NodeId, gaps: f64) -> Result<(), TreeError> {
        self.ensure(node)?;
        self.data_mut(node).gaps = gaps;
        Ok(())
    }

    pub(crate) fn effective_gap(&self, node: NodeId) -> f64 {
        let gaps = self.data(node).gaps;
        if gaps >= 0.0 { gaps } else { self.settings.inner_gap }
    }

    pub fn set_layout(&mut self, node: NodeId, layout: Layout) -> Result<(), TreeError> {
        self.ensure(node)?;
        match self.data(node).kind {
            NodeKind::Workspace | NodeKind::Container => {
                self.data_mut(node).layout = layout;
                self.arrange(node, None);
                Ok(())
            }
            actual => Err(TreeError::WrongKind { expected: NodeKind::Container, actual }),
        }
    }

    // ---- lookups for the IPC/criteria collaborators ------------------------

    /// Topmost visible view under `point`. Floating views win over tiled
    /// ones, later floating entries over earlier ones.
    pub fn view_at(&self, point: Point) -> Option<NodeId> {
        let output = self
            .outputs()
            .iter()
            .copied()
            .find(|&o| self.data(o).rect.contains(point))?;
        let workspace = self
            .forest
            .map
            .children(output)
            .iter()
            .copied()
            .find(|&w| self.data(w).visible)?;
        for &floater in self.forest.map.floating(workspace).iter().rev() {
            if let Some(hit) = self.view_at_in(floater, point) {
                return Some(hit);
            }
        }
        self.view_at_in(workspace, point)
    }

    fn view_at_in(&self, node: NodeId, point: Point) -> Option<NodeId> {
        let data = self.data(node);
        if !data.visible || !data.rect.contains(point) {
            return None;
        }
        if data.kind == NodeKind::View {
            return Some(node);
        }
        self.forest
            .map
            .children(node)
            .iter()
            .copied()
            .find_map(|child| self.view_at_in(child, point))
    }

    /// Read-only tree description for the IPC collaborator, traversed
    /// parent-before-children with floating members inside their
    /// workspace's subtree.
    pub fn ipc_snapshot(&self) -> serde_json::Value {
        self.ipc_node(self.root)
    }

    fn ipc_node(&self, node: NodeId) -> serde_json::Value {
        use slotmap::Key;
        let data = self.data(node);
        let focused = self.forest.data.focus.focused_child(&self.forest.map, node);
        serde_json::json!({
            "id": node.data().as_ffi(),
            "name": data.name,
            "kind": data.kind,
            "layout": data.layout,
            "rect": data.rect,
            "visible": data.visible,
            "fullscreen": data.fullscreen,
            "focused": self.ctx.focused_leaf() == Some(node),
            "focus": focused.map(|f| f.data().as_ffi()),
            "nodes": self
                .forest
                .map
                .children(node)
                .iter()
                .map(|&c| self.ipc_node(c))
                .collect::<Vec<_>>(),
            "floating_nodes": self
                .forest
                .map
                .floating(node)
                .iter()
                .map(|&c| self.ipc_node(c))
                .collect::<Vec<_>>(),
        })
    }

    pub fn draw_tree(&self) -> String {
        let tree = self.ascii_node(self.root);
        let mut out = String::new();
        ascii_tree::write_tree(&mut out, &tree).expect("writing to a String cannot fail");
        out
    }

    fn ascii_node(&self, node: NodeId) -> ascii_tree::Tree {
        let data = self.data(node);
        let label = format!(
            "{} {}{} [{} {}x{}]",
            data.kind,
            data.name.as_deref().unwrap_or(""),
            if data.is_floating { " (floating)" } else { "" },
            data.layout,
            data.rect.width,
            data.rect.height,
        );
        let children: Vec<ascii_tree::Tree> = self
            .forest
            .map
            .children(node)
            .iter()
            .chain(self.forest.map.floating(node).iter())
            .map(|&c| self.ascii_node(c))
            .collect();
        if children.is_empty() {
            ascii_tree::Tree::Leaf(vec![label])
        } else {
            ascii_tree::Tree::Node(label, children)
        }
    }

    // ---- view collaborator plumbing ----------------------------------------

    pub(crate) fn with_view<R>(
        &mut self,
        node: NodeId,
        f: impl FnOnce(&mut dyn View) -> R,
    ) -> Option<R> {
        self.views.get_mut(node).map(|v| f(v.as_mut()))
    }

    /// Asks the collaborator to close the surface behind a view. The node
    /// itself is destroyed later, when the collaborator reports the
    /// surface gone.
    pub fn close(&mut self, view: NodeId) -> Result<(), TreeError> {
        self.ensure(view)?;
        self.ensure_kind(view, NodeKind::View)?;
        self.with_view(view, |v| v.close());
        Ok(())
    }
}

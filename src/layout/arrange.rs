use tracing::{trace, warn};

use crate::geometry::{Axis, Size};
use crate::layout::container::{ContainerTree, NodeKind};
use crate::model::forest::NodeId;

impl ContainerTree {
    /// Recomputes geometry for `node`'s subtree.
    ///
    /// `size` overrides the stored box extent; `None` is the sentinel
    /// meaning "arrange into the box the node already has". Arranging an
    /// unmutated subtree twice produces identical geometry.
    pub fn arrange(&mut self, node: NodeId, size: Option<Size>) {
        if !self.map().contains(node) {
            warn!(?node, "arrange on a node that is no longer in the tree");
            return;
        }
        if let Some(size) = size {
            let data = self.data_mut(node);
            data.rect = data.rect.with_size(size);
        }
        match self.data(node).kind {
            NodeKind::Root => {
                // Outputs keep their own absolute origins and sizes.
                for output in self.map().children(node).to_vec() {
                    self.arrange(output, None);
                }
            }
            NodeKind::Output => self.arrange_output(node),
            NodeKind::Workspace | NodeKind::Container => self.arrange_interior(node),
            NodeKind::View => self.arrange_view(node),
        }
    }

    fn arrange_output(&mut self, output: NodeId) {
        let rect = self.data(output).rect;
        let visible = self.data(output).visible;
        let workspaces = self.map().children(output).to_vec();
        let focused = self
            .forest
            .data
            .focus
            .focused_child(&self.forest.map, output)
            .or_else(|| workspaces.first().copied());
        for workspace in workspaces {
            let data = self.data_mut(workspace);
            data.rect = rect;
            data.visible = visible && Some(workspace) == focused;
            self.arrange(workspace, None);
        }
    }

    fn arrange_interior(&mut self, node: NodeId) {
        let layout = self.data(node).layout;
        match layout.axis() {
            Some(axis) => self.arrange_split(node, axis),
            None if layout.is_group() => self.arrange_group(node),
            // Workspaces default to horizontal; a container should never
            // carry a non-layout value, but arranging it as one split is
            // strictly better than leaving stale geometry behind.
            None => self.arrange_split(node, Axis::Horizontal),
        }
        if self.data(node).kind == NodeKind::Workspace {
            let visible = self.data(node).visible;
            for floater in self.map().floating(node).to_vec() {
                self.data_mut(floater).visible = visible;
                self.arrange(floater, None);
            }
        }
    }

    /// Partitions the split axis with a cumulative-remainder integer
    /// distribution: each child's extent is the rounded cumulative ideal
    /// minus the pixels already handed out, so the allocations are
    /// contiguous and sum exactly to the available extent. Truncating
    /// each child independently would leak pixels.
    fn arrange_split(&mut self, node: NodeId, axis: Axis) {
        let children = self.map().children(node).to_vec();
        if children.is_empty() {
            return;
        }
        let rect = self.data(node).rect;
        let visible = self.data(node).visible;
        let gap = self.effective_gap(node);
        let available =
            (rect.extent(axis) - gap * (children.len() as f64 - 1.0)).max(0.0);
        let total_weight: f64 = children.iter().map(|&c| self.data(c).weight).sum();
        debug_assert!(total_weight > 0.0, "split with non-positive total weight");

        let mut cursor = rect.position(axis);
        let mut allocated = 0.0;
        let mut cumulative = 0.0;
        for &child in &children {
            let weight = self.data(child).weight;
            debug_assert!(weight > 0.0, "child {child:?} has non-positive weight");
            cumulative += weight;
            let end = (available * cumulative / total_weight).round();
            let extent = end - allocated;
            allocated = end;

            let mut child_rect = rect;
            child_rect.set_position(axis, cursor);
            child_rect.set_extent(axis, extent);
            let data = self.data_mut(child);
            data.rect = child_rect;
            data.visible = visible;
            cursor += extent + gap;
            trace!(?child, ?child_rect, "allocated split share");
            self.arrange(child, None);
        }
    }

    /// Tabbed/stacked children all take the full box; only the focused
    /// one stays visible. Hidden children still get geometry so a tab
    /// switch needs no re-arrange.
    fn arrange_group(&mut self, node: NodeId) {
        let children = self.map().children(node).to_vec();
        if children.is_empty() {
            return;
        }
        let rect = self.data(node).rect;
        let visible = self.data(node).visible;
        let focused = self
            .forest
            .data
            .focus
            .focused_child(&self.forest.map, node)
            .or_else(|| children.first().copied());
        for &child in &children {
            let data = self.data_mut(child);
            data.rect = rect;
            data.visible = visible && Some(child) == focused;
            self.arrange(child, None);
        }
    }

    fn arrange_view(&mut self, view: NodeId) {
        let fullscreen = self.data(view).fullscreen;
        if fullscreen && let Some(output) = self.output_of(view) {
            // Fullscreen overrides whatever share the parent assigned.
            let rect = self.data(output).rect;
            self.data_mut(view).rect = rect;
        }
        let rect = self.data(view).rect;
        self.data_mut(view).border.rect = rect;
        self.with_view(view, |v| {
            v.set_geometry(rect);
            if fullscreen {
                v.raise();
            }
        });
        self.request_redraw();
    }

    /// Recomputes the visibility of `node`'s subtree from its own current
    /// flag: focused workspaces and focused group members show, everyone
    /// else under a group or an unfocused workspace is masked.
    pub(crate) fn update_visibility(&mut self, node: NodeId) {
        let visible = self.data(node).visible;
        self.apply_visibility(node, visible);
        self.request_redraw();
    }

    fn apply_visibility(&mut self, node: NodeId, visible: bool) {
        self.data_mut(node).visible = visible;
        let data = self.data(node);
        let gate = data.kind == NodeKind::Output || data.layout.is_group();
        let focused = self.forest.data.focus.focused_child(&self.forest.map, node);
        let children = self.map().children(node).to_vec();
        let first = children.first().copied();
        for child in children {
            let shown = visible && (!gate || Some(child) == focused.or(first));
            self.apply_visibility(child, shown);
        }
        for floater in self.map().floating(node).to_vec() {
            self.apply_visibility(floater, visible);
        }
    }
}

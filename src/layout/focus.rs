use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::layout::container::{ContainerTree, NodeKind, TreeError};
use crate::layout::view::ViewState;
use crate::model::forest::NodeId;

/// Global focus bookkeeping. Owned by the tree, never process-wide.
#[derive(Default, Serialize, Deserialize)]
pub struct FocusContext {
    focused_leaf: Option<NodeId>,
    last_workspace: Option<NodeId>,
    locked: bool,
    suspend_cleanup: bool,
}

impl FocusContext {
    /// The globally focused view, if the focus chain ends at one.
    pub fn focused_leaf(&self) -> Option<NodeId> {
        self.focused_leaf
    }

    pub fn locked(&self) -> bool {
        self.locked
    }
}

impl ContainerTree {
    /// Follows focused pointers from `node` down. Yields the view the
    /// chain ends at, or `None` when it dead-ends (childless workspace).
    pub fn get_focused(&self, node: NodeId) -> Option<NodeId> {
        if !self.map().contains(node) {
            return None;
        }
        let end = self.forest.data.focus.descend(&self.forest.map, node);
        (self.data(end).kind == NodeKind::View).then_some(end)
    }

    pub fn focused_view(&self) -> Option<NodeId> {
        self.ctx.focused_leaf()
    }

    /// While locked, `set_focus` fails and soft updates skip the external
    /// input-focus request.
    pub fn set_focus_locked(&mut self, locked: bool) {
        self.ctx.locked = locked;
    }

    pub fn focus_locked(&self) -> bool {
        self.ctx.locked
    }

    /// Suspends the empty-workspace cleanup normally performed when focus
    /// leaves a workspace.
    pub fn suspend_workspace_cleanup(&mut self, suspend: bool) {
        self.ctx.suspend_cleanup = suspend;
    }

    /// Focuses `node`: repoints every ancestor's focused pointer, makes
    /// the target workspace visible, activates the resulting leaf and
    /// requests input focus for it.
    pub fn set_focus(&mut self, node: NodeId) -> Result<(), TreeError> {
        if !self.map().contains(node) {
            return Err(TreeError::Missing(node));
        }
        if self.ctx.locked {
            return Err(TreeError::FocusLocked);
        }
        self.set_focus_inner(node, false);
        Ok(())
    }

    /// Like `set_focus`, but only updates internal bookkeeping; no
    /// input-focus request crosses the collaborator boundary. This is the
    /// only focus mutation allowed while locked.
    pub fn set_focus_soft(&mut self, node: NodeId) -> Result<(), TreeError> {
        if !self.map().contains(node) {
            return Err(TreeError::Missing(node));
        }
        self.set_focus_inner(node, true);
        Ok(())
    }

    /// Focus restricted to the subtree under `top`: pointers along the
    /// path are updated, but global focus only moves if `node` ends up on
    /// the focus path from the real root, in which case this delegates to
    /// `set_focus`.
    pub fn set_focus_scoped(&mut self, top: NodeId, node: NodeId) -> Result<(), TreeError> {
        if !self.map().contains(top) {
            return Err(TreeError::Missing(top));
        }
        if !self.map().contains(node) {
            return Err(TreeError::Missing(node));
        }
        self.forest.data.focus.focus_path(&self.forest.map, node, Some(top));
        if self.forest.data.focus.is_globally_focused(&self.forest.map, node) {
            self.set_focus(node)
        } else {
            self.request_redraw();
            Ok(())
        }
    }

    fn set_focus_inner(&mut self, node: NodeId, soft: bool) {
        let mut target = node;
        // A fullscreen leaf captures focus for its whole workspace.
        if let Some(workspace) = self.workspace_of(node)
            && let Some(leaf) = self.get_focused(workspace)
            && leaf != node
            && self.data(leaf).fullscreen
        {
            debug!(?node, ?leaf, "redirecting focus to fullscreen view");
            target = leaf;
        }

        self.forest.data.focus.focus_path(&self.forest.map, target, None);

        let new_workspace = self.workspace_of(target);
        let prev_workspace = self.ctx.last_workspace.filter(|&w| self.map().contains(w));
        // Repointing the chain can change which workspace shows and which
        // member of a tabbed/stacked group shows; both read the focused
        // pointers, so recompute from the output down on every change.
        if let Some(workspace) = new_workspace
            && let Some(output) = self.output_of(workspace)
        {
            self.update_visibility(output);
        }

        let end = self.forest.data.focus.descend(&self.forest.map, self.root());
        let new_leaf = (self.data(end).kind == NodeKind::View).then_some(end);
        let prev_leaf = self.ctx.focused_leaf.filter(|&l| self.map().contains(l));
        if prev_leaf != new_leaf {
            if let Some(prev) = prev_leaf {
                self.data_mut(prev).activated = false;
                let state = self.view_state_of(prev);
                self.with_view(prev, |v| v.set_state(state));
            }
            if let Some(leaf) = new_leaf {
                self.data_mut(leaf).activated = true;
                let state = self.view_state_of(leaf);
                self.with_view(leaf, |v| v.set_state(state));
            }
        }
        if let Some(leaf) = new_leaf
            && !soft
        {
            self.with_view(leaf, |v| v.request_focus());
        }

        self.ctx.focused_leaf = new_leaf;
        self.ctx.last_workspace = new_workspace;
        self.request_redraw();

        // Leaving a now-empty workspace cleans it up, unless suspended.
        // `destroy` itself keeps the last workspace on an output alive.
        if !self.ctx.suspend_cleanup
            && let Some(prev) = prev_workspace
            && new_workspace != Some(prev)
            && self.map().contains(prev)
            && self.map().is_leaf(prev)
        {
            debug!(?prev, "destroying empty workspace after focus left it");
            let _ = self.destroy(prev);
        }
    }

    /// Re-establishes a coherent global focus after a destroy removed the
    /// focused leaf (or its workspace).
    pub(crate) fn refocus_after_destroy(&mut self) {
        if let Some(ws) = self.ctx.last_workspace
            && !self.map().contains(ws)
        {
            self.ctx.last_workspace = None;
        }
        let stale = match self.ctx.focused_leaf {
            Some(leaf) => !self.map().contains(leaf),
            None => false,
        };
        if !stale {
            return;
        }
        self.ctx.focused_leaf = None;
        // Removal cleared the focused pointer at the destroyed node's
        // parent, so the chain may dead-end early; fall through to first
        // children until a view turns up.
        let mut end = self.forest.data.focus.descend(&self.forest.map, self.root());
        while self.data(end).kind != NodeKind::View {
            let Some(&child) = self.forest.map.children(end).first() else {
                break;
            };
            end = self.forest.data.focus.descend(&self.forest.map, child);
        }
        if self.data(end).kind == NodeKind::View {
            // Respect the lock: bookkeeping updates, the external focus
            // request is only made when unlocked.
            let soft = self.ctx.locked;
            self.set_focus_inner(end, soft);
        }
    }

    pub(crate) fn view_state_of(&self, node: NodeId) -> ViewState {
        let data = self.data(node);
        ViewState {
            activated: data.activated,
            fullscreen: data.fullscreen,
            maximized: false,
        }
    }
}

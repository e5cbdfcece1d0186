use tracing::{debug, trace};

use crate::geometry::{Axis, Point, Rect, ResizeEdges};
use crate::layout::container::{ContainerTree, NodeKind, TreeError};
use crate::model::forest::NodeId;

/// Split-level reference frozen at session start. `target` is the
/// ancestor of the grabbed view that actually trades space along the
/// axis; deltas are computed against its extent at entry, never against
/// the previous motion event.
#[derive(Clone, Copy, Debug)]
struct AxisSnapshot {
    target: NodeId,
    start_extent: f64,
}

#[derive(Debug)]
enum Session {
    MoveFloating {
        view: NodeId,
        start_pointer: Point,
        start_rect: Rect,
    },
    MoveTiling {
        view: NodeId,
    },
    ResizeFloating {
        view: NodeId,
        edges: ResizeEdges,
        start_pointer: Point,
        start_rect: Rect,
    },
    ResizeTiling {
        view: NodeId,
        edges: ResizeEdges,
        start_pointer: Point,
        horizontal: Option<AxisSnapshot>,
        vertical: Option<AxisSnapshot>,
    },
}

impl Session {
    fn view(&self) -> NodeId {
        match *self {
            Session::MoveFloating { view, .. }
            | Session::MoveTiling { view }
            | Session::ResizeFloating { view, .. }
            | Session::ResizeTiling { view, .. } => view,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerState {
    Idle,
    DraggingFloating,
    DraggingTiling,
    ResizingFloating,
    ResizingTiling,
}

/// Drag/resize session driver. At most one session exists at a time;
/// entering captures a snapshot and every motion event is interpreted
/// against it, so coalesced or dropped events cannot cause drift.
#[derive(Default, Debug)]
pub struct PointerInteraction {
    session: Option<Session>,
}

impl PointerInteraction {
    pub fn state(&self) -> PointerState {
        match self.session {
            None => PointerState::Idle,
            Some(Session::MoveFloating { .. }) => PointerState::DraggingFloating,
            Some(Session::MoveTiling { .. }) => PointerState::DraggingTiling,
            Some(Session::ResizeFloating { .. }) => PointerState::ResizingFloating,
            Some(Session::ResizeTiling { .. }) => PointerState::ResizingTiling,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.session.is_none()
    }

    /// Starts a drag session on `view`. The floating/tiled branch is
    /// chosen by the view's state at entry and does not change mid-session.
    pub fn begin_move(
        &mut self,
        tree: &mut ContainerTree,
        view: NodeId,
        pointer: Point,
    ) -> Result<(), TreeError> {
        tree.ensure(view)?;
        tree.ensure_kind(view, NodeKind::View)?;
        if tree.is_floating(view) {
            let start_rect = tree.data(view).rect;
            tree.with_view(view, |v| v.raise());
            self.session = Some(Session::MoveFloating {
                view,
                start_pointer: pointer,
                start_rect,
            });
        } else {
            self.session = Some(Session::MoveTiling { view });
        }
        debug!(?view, state = ?self.state(), "pointer session started");
        Ok(())
    }

    /// Starts a resize session on `view` grabbing `edges`.
    pub fn begin_resize(
        &mut self,
        tree: &mut ContainerTree,
        view: NodeId,
        edges: ResizeEdges,
        pointer: Point,
    ) -> Result<(), TreeError> {
        tree.ensure(view)?;
        tree.ensure_kind(view, NodeKind::View)?;
        if tree.is_floating(view) {
            self.session = Some(Session::ResizeFloating {
                view,
                edges,
                start_pointer: pointer,
                start_rect: tree.data(view).rect,
            });
        } else {
            let snapshot = |axis: Axis| {
                edges.affects(axis).then(|| {
                    tree.split_ancestor(view, axis).map(|(target, _)| AxisSnapshot {
                        target,
                        start_extent: tree.data(target).rect.extent(axis),
                    })
                })
                .flatten()
            };
            self.session = Some(Session::ResizeTiling {
                view,
                edges,
                start_pointer: pointer,
                horizontal: snapshot(Axis::Horizontal),
                vertical: snapshot(Axis::Vertical),
            });
        }
        debug!(?view, ?edges, state = ?self.state(), "pointer session started");
        Ok(())
    }

    /// Applies the current pointer position to the active session. A
    /// no-op while idle. Only the latest position matters, so replaying
    /// or dropping intermediate events changes nothing.
    pub fn motion(&mut self, tree: &mut ContainerTree, pointer: Point) {
        let Some(session) = &self.session else {
            return;
        };
        if !tree.map().contains(session.view()) {
            trace!("manipulated view vanished, invalidating session");
            self.session = None;
            return;
        }
        match *session {
            Session::MoveFloating { view, start_pointer, start_rect } => {
                let mut rect = start_rect;
                rect.x = start_rect.x + (pointer.x - start_pointer.x);
                rect.y = start_rect.y + (pointer.y - start_pointer.y);
                tree.data_mut(view).rect = rect;
                tree.arrange(view, None);
            }
            Session::MoveTiling { view } => {
                if let Some(under) = tree.view_at(pointer)
                    && under != view
                    && !tree.is_floating(under)
                    && tree.swap(view, under).is_ok()
                {
                    let root = tree.root();
                    tree.arrange(root, None);
                }
            }
            Session::ResizeFloating { view, edges, start_pointer, start_rect } => {
                let mut rect = start_rect;
                for axis in [Axis::Horizontal, Axis::Vertical] {
                    if !edges.affects(axis) {
                        continue;
                    }
                    let delta = (pointer.along(axis) - start_pointer.along(axis))
                        * edges.growth_sign(axis);
                    let extent = (start_rect.extent(axis) + delta)
                        .max(tree.settings().min_extent(axis));
                    // The grabbed edge moves; the opposite edge anchors.
                    if edges.growth_sign(axis) < 0.0 {
                        rect.set_position(
                            axis,
                            start_rect.position(axis) + start_rect.extent(axis) - extent,
                        );
                    }
                    rect.set_extent(axis, extent);
                }
                tree.data_mut(view).rect = rect;
                tree.arrange(view, None);
            }
            Session::ResizeTiling { edges, start_pointer, horizontal, vertical, .. } => {
                for (axis, snapshot) in
                    [(Axis::Horizontal, horizontal), (Axis::Vertical, vertical)]
                {
                    let Some(snapshot) = snapshot else {
                        continue;
                    };
                    if !tree.map().contains(snapshot.target) {
                        continue;
                    }
                    let desired = snapshot.start_extent
                        + (pointer.along(axis) - start_pointer.along(axis))
                            * edges.growth_sign(axis);
                    let current = tree.data(snapshot.target).rect.extent(axis);
                    let delta = desired - current;
                    if delta.abs() < 1.0 {
                        continue;
                    }
                    // Rejections leave the last valid committed state.
                    let _ = tree.resize_tiled(snapshot.target, axis, delta);
                }
            }
        }
    }

    /// Button release: the session's effects stay, its state is dropped.
    pub fn end(&mut self) {
        if let Some(session) = self.session.take() {
            debug!(view = ?session.view(), "pointer session ended");
        }
    }

    /// Aborts the session (output/focus loss). Floating sessions restore
    /// the pre-session geometry; a tiling drag already finalized each
    /// swap, and a tiling resize keeps whatever was committed since every
    /// committed intermediate state passed validation on its own.
    pub fn cancel(&mut self, tree: &mut ContainerTree) {
        let Some(session) = self.session.take() else {
            return;
        };
        debug!(view = ?session.view(), "pointer session cancelled");
        match session {
            Session::MoveFloating { view, start_rect, .. }
            | Session::ResizeFloating { view, start_rect, .. } => {
                if tree.map().contains(view) {
                    tree.data_mut(view).rect = start_rect;
                    tree.arrange(view, None);
                }
            }
            Session::MoveTiling { .. } | Session::ResizeTiling { .. } => {}
        }
    }

    /// Destruction of a node referenced by the session snapshot makes the
    /// snapshot meaningless; the session is invalidated rather than left
    /// dangling. State already committed stays.
    pub fn handle_node_destroyed(&mut self, node: NodeId) {
        let Some(session) = &self.session else {
            return;
        };
        let referenced = session.view() == node
            || match *session {
                Session::ResizeTiling { horizontal, vertical, .. } => {
                    horizontal.is_some_and(|s| s.target == node)
                        || vertical.is_some_and(|s| s.target == node)
                }
                _ => false,
            };
        if referenced {
            debug!(?node, "referenced node destroyed, invalidating session");
            self.session = None;
        }
    }
}

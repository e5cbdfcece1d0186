use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::geometry::{Axis, Round};
use crate::layout::container::{ContainerTree, NodeKind, TreeError};
use crate::model::forest::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeUnit {
    Pixels,
    /// Percent of the node's current extent along the resize axis.
    Percent,
}

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ResizeError {
    #[error(transparent)]
    Tree(#[from] TreeError),
    #[error("resizing {node:?} by {delta}px along {axis:?} would shrink a sibling below minimum")]
    BelowMinimum { node: NodeId, axis: Axis, delta: f64 },
    #[error("no ancestor of {0:?} is split along the requested axis")]
    NoSplitAncestor(NodeId),
    #[error("{0:?} has no siblings to trade space with")]
    NoSiblings(NodeId),
    #[error("{0:?} is not a floating node")]
    NotFloating(NodeId),
}

impl ContainerTree {
    /// Grows `node` by `amount` along `axis` (negative shrinks).
    ///
    /// `unit: None` picks the caller convention: floating nodes default
    /// to pixels, tiled nodes to percent of current extent. Callers rely
    /// on the asymmetry, so it is deliberately not unified.
    pub fn resize(
        &mut self,
        node: NodeId,
        axis: Axis,
        amount: f64,
        unit: Option<ResizeUnit>,
    ) -> Result<(), ResizeError> {
        self.ensure(node)?;
        let current = self.data(node).rect.extent(axis);
        if self.is_floating(node) {
            let delta = match unit.unwrap_or(ResizeUnit::Pixels) {
                ResizeUnit::Pixels => amount,
                ResizeUnit::Percent => current * amount / 100.0,
            };
            self.set_floating_size(node, axis, current + delta)
        } else {
            let delta = match unit.unwrap_or(ResizeUnit::Percent) {
                ResizeUnit::Pixels => amount,
                ResizeUnit::Percent => current * amount / 100.0,
            };
            self.resize_tiled(node, axis, delta)
        }
    }

    /// Sets a floating node's extent along `axis` directly, clamped to
    /// the configured minimum. The origin shifts by half the extent
    /// change so the resize looks centered on the previous box.
    pub fn set_floating_size(
        &mut self,
        node: NodeId,
        axis: Axis,
        extent: f64,
    ) -> Result<(), ResizeError> {
        self.ensure(node)?;
        if !self.is_floating(node) {
            return Err(ResizeError::NotFloating(node));
        }
        let extent = extent.max(self.settings().min_extent(axis));
        let rect = self.data(node).rect;
        let old = rect.extent(axis);
        let mut rect = rect;
        rect.set_position(axis, rect.position(axis) + (old - extent) / 2.0);
        rect.set_extent(axis, extent);
        self.data_mut(node).rect = rect.round();
        self.arrange(node, None);
        Ok(())
    }

    /// Tiled resize: trades `delta` pixels between the split-level
    /// ancestor of `node` and its siblings. Validates every affected
    /// extent against the minimum before mutating anything, so a
    /// rejection leaves all geometry untouched.
    pub(crate) fn resize_tiled(
        &mut self,
        node: NodeId,
        axis: Axis,
        delta: f64,
    ) -> Result<(), ResizeError> {
        if delta == 0.0 {
            return Ok(());
        }
        let (target, parent) = self
            .split_ancestor(node, axis)
            .ok_or(ResizeError::NoSplitAncestor(node))?;

        let children = self.map().children(parent).to_vec();
        let idx = children.iter().position(|&c| c == target).unwrap_or(0);
        let before = &children[..idx];
        let after = &children[idx + 1..];
        if before.is_empty() && after.is_empty() {
            return Err(ResizeError::NoSiblings(node));
        }

        // Validation pass. Both groups absorb half the delta when both
        // exist, otherwise the single group absorbs all of it; within a
        // group the share is split evenly.
        let groups: f64 = [!before.is_empty(), !after.is_empty()]
            .iter()
            .filter(|&&g| g)
            .count() as f64;
        let min = self.settings().min_extent(axis);
        let share = |group: &[NodeId]| -delta / groups / group.len().max(1) as f64;
        let new_extent = |n: NodeId, d: f64| self.data(n).rect.extent(axis) + d;

        let mut planned: Vec<(NodeId, f64)> = Vec::with_capacity(children.len());
        planned.push((target, new_extent(target, delta)));
        for &sib in before {
            planned.push((sib, new_extent(sib, share(before))));
        }
        for &sib in after {
            planned.push((sib, new_extent(sib, share(after))));
        }
        if let Some(&(victim, extent)) = planned.iter().find(|&&(_, e)| e < min) {
            trace!(?victim, extent, min, "rejecting resize below minimum");
            return Err(ResizeError::BelowMinimum { node, axis, delta });
        }

        // Commit pass. Weights are proportional, so planned pixel extents
        // serve directly; arrange renormalizes them against the total.
        for (child, extent) in planned {
            self.data_mut(child).weight = extent;
        }
        debug!(?target, ?axis, delta, "committed tiled resize");
        self.arrange(parent, None);
        Ok(())
    }

    /// First ancestor of `node` (inclusive) whose parent splits along
    /// `axis`, paired with that parent.
    pub(crate) fn split_ancestor(&self, node: NodeId, axis: Axis) -> Option<(NodeId, NodeId)> {
        for n in self.map().ancestors(node) {
            if self.is_floating(n) {
                return None;
            }
            let parent = self.map().parent(n)?;
            if self.data(parent).layout.axis() == Some(axis) {
                return Some((n, parent));
            }
            if self.data(parent).kind == NodeKind::Output {
                return None;
            }
        }
        None
    }
}

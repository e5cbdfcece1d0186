pub mod common;
pub mod geometry;
pub mod layout;
pub mod model;

pub use common::config::LayoutSettings;
pub use geometry::{Axis, Point, Rect, ResizeEdges, Round, Size};
pub use layout::{
    ContainerTree, Layout, NodeKind, PointerInteraction, PointerState, ResizeError, ResizeUnit,
    TreeError, View, ViewState,
};
pub use model::forest::NodeId;

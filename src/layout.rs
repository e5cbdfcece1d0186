mod arrange;
pub mod container;
pub mod focus;
pub mod pointer;
pub mod resize;
pub mod view;

pub use container::{Border, BorderKind, ContainerTree, Layout, NodeData, NodeKind, TreeError};
pub use focus::FocusContext;
pub use pointer::{PointerInteraction, PointerState};
pub use resize::{ResizeError, ResizeUnit};
pub use view::{View, ViewState};

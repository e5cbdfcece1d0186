pub mod focus;
pub mod forest;

use serde::{Deserialize, Serialize};

#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// A pixel box. Origin is the top-left corner, extents grow right and down.
#[derive(Default, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn with_size(&self, size: Size) -> Rect {
        Rect::new(self.x, self.y, size.width, size.height)
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x < self.x + self.width
            && point.y >= self.y
            && point.y < self.y + self.height
    }

    pub fn extent(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.width,
            Axis::Vertical => self.height,
        }
    }

    pub fn set_extent(&mut self, axis: Axis, extent: f64) {
        match axis {
            Axis::Horizontal => self.width = extent,
            Axis::Vertical => self.height = extent,
        }
    }

    pub fn position(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal => self.x,
            Axis::Vertical => self.y,
        }
    }

    pub fn set_position(&mut self, axis: Axis, position: f64) {
        match axis {
            Axis::Horizontal => self.x = position,
            Axis::Vertical => self.y = position,
        }
    }
}

/// Rounds geometry to whole pixels without letting opposite edges drift
/// apart: both edges are rounded, then the extent is recomputed from them.
pub trait Round {
    fn round(&self) -> Self;
}

impl Round for Point {
    fn round(&self) -> Self {
        Point::new(self.x.round(), self.y.round())
    }
}

impl Round for Rect {
    fn round(&self) -> Self {
        let min = self.origin().round();
        let max = Point::new(self.x + self.width, self.y + self.height).round();
        Rect::new(min.x, min.y, max.x - min.x, max.y - min.y)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Axis {
    Horizontal,
    Vertical,
}

bitflags::bitflags! {
    /// Which edges of a box a resize grabs.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ResizeEdges: u8 {
        const TOP = 1 << 0;
        const BOTTOM = 1 << 1;
        const LEFT = 1 << 2;
        const RIGHT = 1 << 3;
    }
}

impl ResizeEdges {
    pub fn affects(self, axis: Axis) -> bool {
        match axis {
            Axis::Horizontal => self.intersects(Self::LEFT | Self::RIGHT),
            Axis::Vertical => self.intersects(Self::TOP | Self::BOTTOM),
        }
    }

    /// Sign of the extent change for a positive pointer delta along `axis`.
    pub fn growth_sign(self, axis: Axis) -> f64 {
        match axis {
            Axis::Horizontal if self.contains(Self::LEFT) => -1.0,
            Axis::Horizontal => 1.0,
            Axis::Vertical if self.contains(Self::TOP) => -1.0,
            Axis::Vertical => 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_round_keeps_edges_aligned() {
        let a = Rect::new(0.0, 0.0, 100.4, 50.0).round();
        let b = Rect::new(100.4, 0.0, 99.6, 50.0).round();
        assert_eq!(a.width + b.width, 200.0);
        assert_eq!(a.x + a.width, b.x);
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 80.0, 40.0);
        assert!(r.contains(Point::new(10.0, 10.0)));
        assert!(r.contains(Point::new(89.9, 49.9)));
        assert!(!r.contains(Point::new(90.0, 30.0)));
        assert!(!r.contains(Point::new(50.0, 50.0)));
    }

    #[test]
    fn axis_accessors() {
        let mut r = Rect::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(r.extent(Axis::Horizontal), 3.0);
        assert_eq!(r.extent(Axis::Vertical), 4.0);
        r.set_extent(Axis::Vertical, 8.0);
        r.set_position(Axis::Horizontal, 5.0);
        assert_eq!(r, Rect::new(5.0, 2.0, 3.0, 8.0));
    }

    #[test]
    fn growth_sign_follows_grabbed_edge() {
        assert_eq!(ResizeEdges::RIGHT.growth_sign(Axis::Horizontal), 1.0);
        assert_eq!(ResizeEdges::LEFT.growth_sign(Axis::Horizontal), -1.0);
        assert_eq!(ResizeEdges::BOTTOM.growth_sign(Axis::Vertical), 1.0);
        assert_eq!(ResizeEdges::TOP.growth_sign(Axis::Vertical), -1.0);
    }
}

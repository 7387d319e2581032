use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

/// Four-corner box as emitted by the recognizer, clockwise from top-left.
///
/// Serialized as `[[x, y], [x, y], [x, y], [x, y]]`, which is the shape the
/// OCR bridge prints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(from = "[[f32; 2]; 4]", into = "[[f32; 2]; 4]")]
pub struct Quad {
    pub points: [Point; 4],
}

impl Quad {
    pub fn new(points: [Point; 4]) -> Self {
        Self { points }
    }

    /// Axis-aligned quad spanning `(x0, y0)`-`(x1, y1)`.
    pub fn from_rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self::new([
            Point::new(x0, y0),
            Point::new(x1, y0),
            Point::new(x1, y1),
            Point::new(x0, y1),
        ])
    }

    pub fn top_left(&self) -> Point {
        self.points[0]
    }

    pub fn top_right(&self) -> Point {
        self.points[1]
    }
}

impl From<[[f32; 2]; 4]> for Quad {
    fn from(raw: [[f32; 2]; 4]) -> Self {
        Self::new(raw.map(|[x, y]| Point::new(x, y)))
    }
}

impl From<Quad> for [[f32; 2]; 4] {
    fn from(quad: Quad) -> Self {
        quad.points.map(|p| [p.x, p.y])
    }
}

/// Column crop: `x1..x2` horizontally, `y1` down to the bottom of the page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CropRectangle {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
}

impl CropRectangle {
    /// Builds a rectangle, rejecting `x2 <= x1`.
    pub fn new(x1: u32, y1: u32, x2: u32) -> Option<Self> {
        (x2 > x1).then_some(Self { x1, y1, x2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x1 as f32 && point.x < self.x2 as f32 && point.y >= self.y1 as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn quad_round_trips_through_nested_arrays() {
        let quad: Quad = serde_json::from_str("[[1,2],[9,2],[9,8],[1,8]]").unwrap();
        assert_eq!(quad, Quad::from_rect(1.0, 2.0, 9.0, 8.0));
        assert_eq!(quad.top_right(), Point::new(9.0, 2.0));
        assert_eq!(serde_json::to_string(&quad).unwrap(), "[[1.0,2.0],[9.0,2.0],[9.0,8.0],[1.0,8.0]]");
    }

    #[test]
    fn rejects_degenerate_rectangle() {
        assert!(CropRectangle::new(10, 0, 10).is_none());
        assert!(CropRectangle::new(11, 0, 10).is_none());
        assert_eq!(CropRectangle::new(10, 5, 30).map(|r| r.width()), Some(20));
    }

    #[test]
    fn containment_is_bottom_open() {
        let rect = CropRectangle::new(10, 100, 50).unwrap();
        assert!(rect.contains(Point::new(10.0, 5000.0)));
        assert!(!rect.contains(Point::new(50.0, 200.0)));
        assert!(!rect.contains(Point::new(20.0, 99.0)));
    }
}

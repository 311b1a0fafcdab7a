use serde::{Deserialize, Serialize};

/// A point on the drawing surface, normalized to `[0, 1] x [0, 1]`.
///
/// The origin is the top-left corner of the surface and `y` grows downward,
/// matching the gesture handler that produces the points. Values outside the
/// unit square are kept as-is; they simply land off-canvas when rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrokePoint {
    pub x: f32,
    pub y: f32,
}

impl StrokePoint {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns true when both coordinates are finite numbers
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<(f32, f32)> for StrokePoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

impl From<[f32; 2]> for StrokePoint {
    fn from([x, y]: [f32; 2]) -> Self {
        Self::new(x, y)
    }
}

/// The freehand drawing of one session, in drawing order.
///
/// Points are only ever appended; consecutive points form the line segments
/// the rasterizer draws. Nothing is deduplicated.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StrokeBuffer {
    points: Vec<StrokePoint>,
}

impl StrokeBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a point. Always grows the buffer by exactly one.
    pub fn add_point(&mut self, point: impl Into<StrokePoint>) {
        self.points.push(point.into());
    }

    /// Discards every point
    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[StrokePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterates over consecutive point pairs, i.e. the drawable segments
    pub fn segments(&self) -> impl Iterator<Item = (StrokePoint, StrokePoint)> + '_ {
        self.points.windows(2).map(|pair| (pair[0], pair[1]))
    }
}

impl<P: Into<StrokePoint>> FromIterator<P> for StrokeBuffer {
    fn from_iter<I: IntoIterator<Item = P>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl<P: Into<StrokePoint>> Extend<P> for StrokeBuffer {
    fn extend<I: IntoIterator<Item = P>>(&mut self, iter: I) {
        self.points.extend(iter.into_iter().map(Into::into));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_point_grows_by_one() {
        let mut buffer = StrokeBuffer::new();
        for i in 0..5 {
            let before = buffer.len();
            buffer.add_point((0.1 * i as f32, 0.5));
            assert_eq!(buffer.len(), before + 1);
        }
    }

    #[test]
    fn test_duplicates_and_out_of_range_are_kept() {
        let mut buffer = StrokeBuffer::new();
        buffer.add_point((0.5, 0.5));
        buffer.add_point((0.5, 0.5));
        buffer.add_point((1.5, -0.25));
        assert_eq!(buffer.len(), 3);
        assert_eq!(buffer.points()[2], StrokePoint::new(1.5, -0.25));
    }

    #[test]
    fn test_clear_empties_buffer() {
        let mut buffer: StrokeBuffer = vec![(0.0, 0.0), (1.0, 1.0), (0.5, 0.2)].into_iter().collect();
        assert!(!buffer.is_empty());
        buffer.clear();
        assert!(buffer.is_empty());
        buffer.clear();
        assert_eq!(buffer.len(), 0);
    }

    #[test]
    fn test_segments_follow_drawing_order() {
        let buffer: StrokeBuffer = vec![[0.0, 0.0], [0.5, 0.5], [1.0, 0.0]].into_iter().collect();
        let segments: Vec<_> = buffer.segments().collect();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].1, StrokePoint::new(0.5, 0.5));
        assert_eq!(segments[1].0, StrokePoint::new(0.5, 0.5));
        assert_eq!(segments[1].1, StrokePoint::new(1.0, 0.0));
    }

    #[test]
    fn test_single_point_has_no_segments() {
        let mut buffer = StrokeBuffer::new();
        buffer.add_point((0.3, 0.3));
        assert_eq!(buffer.segments().count(), 0);
    }
}

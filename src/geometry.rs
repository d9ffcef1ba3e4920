//! Integer points and rectangles.
//!
//! Every raster operation in the crate is scoped to a `Rect`, usually the
//! tight bounding box of the enclosing mask.

/// Integer pixel coordinate on the unbounded logical plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned integer rectangle (left, top, width, height).
///
/// A rectangle with zero width or height is empty. All empty rectangles
/// compare equal to `Rect::EMPTY` after normalisation through the set
/// operations below.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const EMPTY: Rect = Rect { x: 0, y: 0, width: 0, height: 0 };

    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    /// Rectangle spanning two inclusive corners.
    pub fn from_corners(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        if right < left || bottom < top {
            return Self::EMPTY;
        }
        Self::new(left, top, right - left + 1, bottom - top + 1)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    #[inline]
    pub fn left(&self) -> i32 {
        self.x
    }

    #[inline]
    pub fn top(&self) -> i32 {
        self.y
    }

    /// Exclusive right edge.
    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    /// Exclusive bottom edge.
    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    #[inline]
    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.x && y >= self.y && x < self.right() && y < self.bottom()
    }

    #[inline]
    pub fn contains_point(&self, p: Point) -> bool {
        self.contains(p.x, p.y)
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        other.is_empty()
            || (other.x >= self.x
                && other.y >= self.y
                && other.right() <= self.right()
                && other.bottom() <= self.bottom())
    }

    pub fn intersected(&self, other: &Rect) -> Rect {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            Rect::EMPTY
        } else {
            Rect::new(left, top, right - left, bottom - top)
        }
    }

    pub fn united(&self, other: &Rect) -> Rect {
        if self.is_empty() {
            return *other;
        }
        if other.is_empty() {
            return *self;
        }
        let left = self.x.min(other.x);
        let top = self.y.min(other.y);
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Rect::new(left, top, right - left, bottom - top)
    }

    /// Grow (positive) or shrink (negative) every edge by `d` pixels.
    ///
    /// Saturates at the `i32` range instead of wrapping.
    pub fn adjusted(&self, d: i32) -> Rect {
        if self.is_empty() {
            return Rect::EMPTY;
        }
        let grow = d.saturating_mul(2);
        let r = Rect::new(
            self.x.saturating_sub(d),
            self.y.saturating_sub(d),
            self.width.saturating_add(grow),
            self.height.saturating_add(grow),
        );
        if r.is_empty() {
            Rect::EMPTY
        } else {
            r
        }
    }

    /// Row-major iterator over every point of the rectangle.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        let r = *self;
        let (w, h) = if r.is_empty() { (0, 0) } else { (r.width, r.height) };
        (0..h).flat_map(move |dy| (0..w).map(move |dx| Point::new(r.x + dx, r.y + dy)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersection_and_union() {
        let a = Rect::new(0, 0, 10, 10);
        let b = Rect::new(5, 5, 10, 10);
        assert_eq!(a.intersected(&b), Rect::new(5, 5, 5, 5));
        assert_eq!(a.united(&b), Rect::new(0, 0, 15, 15));

        let c = Rect::new(20, 20, 2, 2);
        assert!(a.intersected(&c).is_empty());
        assert_eq!(Rect::EMPTY.united(&c), c);
    }

    #[test]
    fn test_adjusted() {
        let r = Rect::new(2, 3, 4, 5);
        assert_eq!(r.adjusted(2), Rect::new(0, 1, 8, 9));
        assert_eq!(r.adjusted(-1), Rect::new(3, 4, 2, 3));
        assert_eq!(r.adjusted(-2), Rect::EMPTY);
    }

    #[test]
    fn test_adjusted_saturates() {
        let r = Rect::new(2, 3, 4, 5);
        let huge = r.adjusted(1 << 30);
        assert_eq!(huge.x, 2 - (1 << 30));
        assert_eq!(huge.width, i32::MAX);
        assert_eq!(r.adjusted(-(1 << 30)), Rect::EMPTY);
        assert_eq!(r.adjusted(i32::MIN), Rect::EMPTY);
    }

    #[test]
    fn test_from_corners_and_points() {
        let r = Rect::from_corners(1, 1, 2, 3);
        assert_eq!(r, Rect::new(1, 1, 2, 3));
        let pts: Vec<Point> = r.points().collect();
        assert_eq!(pts.len(), 6);
        assert_eq!(pts[0], Point::new(1, 1));
        assert_eq!(pts[1], Point::new(2, 1));
        assert_eq!(pts[5], Point::new(2, 3));
        assert!(Rect::from_corners(3, 0, 2, 0).is_empty());
    }
}

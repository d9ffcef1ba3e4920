//! Enclosing contour extraction.
//!
//! Finds the boundary pixels of a mask: selected pixels with at least one
//! unselected pixel among their 8 neighbours. These are the seeds from which
//! regions touching the edge of the enclosing area are grown.
//!
//! Single pass over the mask's bounding rectangle with a rolling buffer of
//! three rows (top / middle / bottom), each padded with one unselected
//! sentinel pixel on both sides. Rows above the first and below the last are
//! all sentinels. Runs in O(width × height) with no per-pixel lookups into
//! the mask.

use crate::geometry::{Point, Rect};
use crate::mask::{MaskSource, MIN_SELECTED};

/// Collect the contour points of `mask` inside `rect`, in row-major order.
///
/// # Arguments
/// * `mask` - Enclosing mask (0 = outside, >0 = inside)
/// * `rect` - Area to scan, normally the mask's tight bounding box
///
/// # Returns
/// Boundary points; empty when `rect` is empty
pub fn enclosing_contour_points<M: MaskSource + ?Sized>(mask: &M, rect: Rect) -> Vec<Point> {
    let mut points = Vec::new();
    if rect.is_empty() {
        return points;
    }

    let width = rect.width as usize;
    let height = rect.height as usize;
    let stride = width + 2;

    // Rows are rotated by index instead of copying bytes
    let mut rows: [Vec<u8>; 3] = [
        vec![MIN_SELECTED; stride],
        vec![MIN_SELECTED; stride],
        vec![MIN_SELECTED; stride],
    ];
    let load = |row: &mut Vec<u8>, y: usize| {
        if y < height {
            row[0] = MIN_SELECTED;
            mask.read_row(&mut row[1..=width], rect.x, rect.y + y as i32);
            row[stride - 1] = MIN_SELECTED;
        } else {
            row.fill(MIN_SELECTED);
        }
    };

    let (mut top, mut middle, mut bottom) = (0usize, 1usize, 2usize);
    load(&mut rows[middle], 0);
    load(&mut rows[bottom], 1);

    for y in 0..height {
        if y > 0 {
            // The old top row becomes the new bottom row
            let recycled = top;
            top = middle;
            middle = bottom;
            bottom = recycled;
            load(&mut rows[bottom], y + 1);
        }

        let (t, m, b) = (&rows[top], &rows[middle], &rows[bottom]);
        for x in 1..=width {
            if m[x] == MIN_SELECTED {
                continue;
            }
            let on_border = t[x - 1] == MIN_SELECTED
                || t[x] == MIN_SELECTED
                || t[x + 1] == MIN_SELECTED
                || m[x - 1] == MIN_SELECTED
                || m[x + 1] == MIN_SELECTED
                || b[x - 1] == MIN_SELECTED
                || b[x] == MIN_SELECTED
                || b[x + 1] == MIN_SELECTED;
            if on_border {
                points.push(Point::new(rect.x + x as i32 - 1, rect.y + y as i32));
            }
        }
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mask::Mask;

    #[test]
    fn test_empty_rect() {
        let mask = Mask::from_rect(Rect::new(0, 0, 3, 3), 255);
        assert!(enclosing_contour_points(&mask, Rect::EMPTY).is_empty());
    }

    #[test]
    fn test_single_pixel() {
        let mask = Mask::from_rect(Rect::new(4, 9, 1, 1), 255);
        let points = enclosing_contour_points(&mask, mask.selected_exact_rect());
        assert_eq!(points, vec![Point::new(4, 9)]);
    }

    #[test]
    fn test_filled_square_ring() {
        let rect = Rect::new(0, 0, 5, 5);
        let mask = Mask::from_rect(rect, 255);
        let points = enclosing_contour_points(&mask, rect);
        // 5x5 square: 25 pixels minus the 3x3 interior
        assert_eq!(points.len(), 16);
        assert_eq!(points[0], Point::new(0, 0));
        assert_eq!(points[5], Point::new(0, 1));
        assert_eq!(points[6], Point::new(4, 1));
        assert!(!points.contains(&Point::new(2, 2)));
    }

    #[test]
    fn test_diagonal_neighbour_counts() {
        // 3x3 square with its top-left corner punched out: the centre pixel
        // only touches the hole diagonally, and must still be a contour point
        let mut mask = Mask::from_rect(Rect::new(0, 0, 3, 3), 255);
        mask.set_pixel(0, 0, 0);
        let points = enclosing_contour_points(&mask, Rect::new(0, 0, 3, 3));
        assert_eq!(points.len(), 8);
        assert!(points.contains(&Point::new(1, 1)));
    }

    #[test]
    fn test_inner_hole_contributes_points() {
        let mut mask = Mask::from_rect(Rect::new(0, 0, 7, 7), 255);
        mask.set_pixel(3, 3, 0);
        let points = enclosing_contour_points(&mask, Rect::new(0, 0, 7, 7));
        // Outer ring of 24 plus the 8 pixels around the hole
        assert_eq!(points.len(), 32);
        assert!(points.contains(&Point::new(2, 2)));
        assert!(points.contains(&Point::new(4, 4)));
        assert!(!points.contains(&Point::new(3, 3)));
    }

    #[test]
    fn test_single_row() {
        let mask = Mask::from_rect(Rect::new(0, 0, 4, 1), 255);
        let points = enclosing_contour_points(&mask, Rect::new(0, 0, 4, 1));
        assert_eq!(points.len(), 4);
    }
}

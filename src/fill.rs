//! Bounded scanline fill.
//!
//! Flood fill from a seed that never leaves a bounding rectangle and never
//! crosses the unselected pixels of a boundary mask. The fill runs
//! horizontally from each popped point, then looks at the rows above and
//! below the finished span and pushes one point per run of fillable pixels.
//! Connectivity is 4-way.
//!
//! Every variant computes a per-pixel strength; a pixel joins the region
//! when its strength is non-zero, and the strength is what gets written.
//! Results are merged into the destination with a per-pixel maximum, which
//! is the same as filling a fresh mask and adding it to the destination.
//!
//! Per-pixel bookkeeping lives in a [`FillBuffer`] shared by every fill of
//! one selection. A fill only touches the pixels it classifies and the spans
//! it fills, so seeding many small fills costs the size of their regions,
//! not the size of the rectangle.

use log::trace;
use ndarray::Array2;

use crate::color::Color;
use crate::geometry::{Point, Rect};
use crate::mask::{Mask, MaskSource, MAX_SELECTED, MIN_SELECTED};
use crate::policy::{DifferenceKind, DifferencePolicy, SelectionPolicy};
use crate::raster::Raster;

const UNKNOWN: u8 = 0;
const REJECTED: u8 = 1;
const CANDIDATE: u8 = 2;
const FILLED: u8 = 3;

/// Filled run of one row, both ends inclusive.
#[derive(Debug, Clone, Copy)]
struct Span {
    y: i32,
    left: i32,
    right: i32,
}

/// Reusable per-pixel state for a series of fills over one rectangle.
///
/// Every fill starts a new generation. Pixels stamped with an older
/// generation read as unvisited, so the buffer is never cleared between
/// fills.
#[derive(Debug)]
pub struct FillBuffer {
    bounds: Rect,
    generation: u32,
    stamp: Array2<u32>,
    state: Array2<u8>,
    strength: Array2<u8>,
    spans: Vec<Span>,
}

impl Default for FillBuffer {
    fn default() -> Self {
        Self {
            bounds: Rect::EMPTY,
            generation: 0,
            stamp: Array2::zeros((0, 0)),
            state: Array2::zeros((0, 0)),
            strength: Array2::zeros((0, 0)),
            spans: Vec::new(),
        }
    }
}

impl FillBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepare for a fill over `bounds`, reallocating only when the
    /// rectangle changes.
    fn begin(&mut self, bounds: Rect) {
        if bounds != self.bounds || self.stamp.is_empty() {
            let shape = if bounds.is_empty() {
                (0, 0)
            } else {
                (bounds.height as usize, bounds.width as usize)
            };
            self.bounds = bounds;
            self.stamp = Array2::zeros(shape);
            self.state = Array2::zeros(shape);
            self.strength = Array2::zeros(shape);
            self.generation = 0;
        }
        self.spans.clear();
        self.generation = self.generation.wrapping_add(1);
        if self.generation == 0 {
            self.stamp.fill(0);
            self.generation = 1;
        }
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> (usize, usize) {
        ((y - self.bounds.y) as usize, (x - self.bounds.x) as usize)
    }

    #[inline]
    fn state_at(&self, idx: (usize, usize)) -> u8 {
        if self.stamp[idx] == self.generation {
            self.state[idx]
        } else {
            UNKNOWN
        }
    }

    #[inline]
    fn mark(&mut self, idx: (usize, usize), state: u8) {
        self.stamp[idx] = self.generation;
        self.state[idx] = state;
    }

    /// Classify a pixel once; returns true when it may still be filled.
    fn fillable<F>(&mut self, strength_at: &mut F, x: i32, y: i32) -> bool
    where
        F: FnMut(i32, i32) -> u8,
    {
        let idx = self.index(x, y);
        match self.state_at(idx) {
            UNKNOWN => {
                let s = strength_at(x, y);
                if s > MIN_SELECTED {
                    self.mark(idx, CANDIDATE);
                    self.strength[idx] = s;
                    true
                } else {
                    self.mark(idx, REJECTED);
                    false
                }
            }
            CANDIDATE => true,
            _ => false,
        }
    }

    /// Number of pixels reached by the last fill.
    fn count(&self) -> usize {
        self.spans.iter().map(|span| (span.right - span.left + 1) as usize).sum()
    }

    /// Pixels reached by the last fill with their strengths.
    fn filled(&self) -> impl Iterator<Item = (Point, u8)> + '_ {
        self.spans.iter().flat_map(move |span| {
            (span.left..=span.right).map(move |x| (Point::new(x, span.y), self.strength[self.index(x, span.y)]))
        })
    }

    fn merge_into(&self, mask: &mut Mask) {
        if self.spans.is_empty() {
            return;
        }
        // Materialise the whole rectangle once so later fills never regrow
        mask.ensure_extent(self.bounds);
        for (p, s) in self.filled() {
            if s > mask.pixel(p.x, p.y) {
                mask.set_pixel(p.x, p.y, s);
            }
        }
    }
}

/// Span-based flood fill over `bounds` driven by a strength function.
///
/// # Returns
/// Number of pixels reached; the spans stay in `buffer` until the next fill
fn scanline_fill<F>(buffer: &mut FillBuffer, seed: Point, bounds: Rect, mut strength_at: F) -> usize
where
    F: FnMut(i32, i32) -> u8,
{
    buffer.begin(bounds);
    if !bounds.contains_point(seed) {
        return 0;
    }

    let mut stack = vec![seed];
    while let Some(Point { x, y }) = stack.pop() {
        if !buffer.fillable(&mut strength_at, x, y) {
            continue;
        }

        let mut left = x;
        while left > bounds.left() && buffer.fillable(&mut strength_at, left - 1, y) {
            left -= 1;
        }
        let mut right = x;
        while right + 1 < bounds.right() && buffer.fillable(&mut strength_at, right + 1, y) {
            right += 1;
        }

        for sx in left..=right {
            let idx = buffer.index(sx, y);
            buffer.mark(idx, FILLED);
        }
        buffer.spans.push(Span { y, left, right });

        for ny in [y - 1, y + 1] {
            if ny < bounds.top() || ny >= bounds.bottom() {
                continue;
            }
            let mut in_run = false;
            for sx in left..=right {
                if buffer.fillable(&mut strength_at, sx, ny) {
                    if !in_run {
                        stack.push(Point::new(sx, ny));
                        in_run = true;
                    }
                } else {
                    in_run = false;
                }
            }
        }
    }

    buffer.count()
}

#[inline]
fn bounded(strength: u8, boundary: u8) -> u8 {
    (strength as u32 * boundary as u32 / MAX_SELECTED as u32) as u8
}

/// Bounded flood fill seeded at one point of a reference raster.
///
/// Similarity is judged with the invocation's threshold and softness
/// (softness 0 gives a hard fill).
#[derive(Debug, Clone, Copy)]
pub struct ScanlineFill<'a> {
    raster: &'a Raster,
    seed: Point,
    bounds: Rect,
    threshold: u8,
    softness: u8,
}

impl<'a> ScanlineFill<'a> {
    /// # Arguments
    /// * `raster` - Reference raster the similarity is measured on
    /// * `seed` - Starting point; a seed outside `bounds` fills nothing
    /// * `bounds` - Rectangle the fill may not leave
    pub fn new(raster: &'a Raster, seed: Point, bounds: Rect) -> Self {
        Self { raster, seed, bounds, threshold: 0, softness: 0 }
    }

    /// Maximum difference (0-100) still considered similar.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    /// Ramp width (0-100); 0 selects a hard fill.
    pub fn with_softness(mut self, softness: u8) -> Self {
        self.softness = softness;
        self
    }

    fn policy(&self, kind: DifferenceKind, color: &Color) -> SelectionPolicy {
        let difference = DifferencePolicy::new(kind, self.raster.color_space(), color);
        SelectionPolicy::new(difference, self.threshold, self.softness)
    }

    /// Fill the region of pixels similar to the seed pixel, staying on the
    /// selected pixels of `boundary`.
    ///
    /// `buffer` holds the per-pixel state and is meant to be shared by all
    /// fills of one selection.
    ///
    /// # Returns
    /// Number of pixels reached
    pub fn fill_selection_with_boundary<M: MaskSource + ?Sized>(
        &self,
        mask: &mut Mask,
        boundary: &M,
        buffer: &mut FillBuffer,
    ) -> usize {
        let reference = self.raster.color_at(self.seed.x, self.seed.y);
        let policy = self.policy(DifferenceKind::SpecificColor, &reference);
        let raster = self.raster;
        let count = scanline_fill(buffer, self.seed, self.bounds, |x, y| {
            bounded(policy.selection_for(raster.pixel(x, y)), boundary.pixel(x, y))
        });
        buffer.merge_into(mask);
        trace!("fill from ({}, {}) reached {} pixels", self.seed.x, self.seed.y, count);
        count
    }

    /// Fill outwards from the seed until pixels matching `color` are met.
    pub fn fill_selection_until_color_with_boundary<M: MaskSource + ?Sized>(
        &self,
        mask: &mut Mask,
        color: &Color,
        boundary: &M,
        buffer: &mut FillBuffer,
    ) -> usize {
        let policy = self.policy(DifferenceKind::SpecificColor, color);
        self.fill_until(mask, &policy, boundary, buffer)
    }

    /// Fill outwards from the seed until pixels matching `color` or
    /// transparent pixels are met.
    pub fn fill_selection_until_color_or_transparent_with_boundary<M: MaskSource + ?Sized>(
        &self,
        mask: &mut Mask,
        color: &Color,
        boundary: &M,
        buffer: &mut FillBuffer,
    ) -> usize {
        let policy = self.policy(DifferenceKind::SpecificColorOrTransparent, color);
        self.fill_until(mask, &policy, boundary, buffer)
    }

    fn fill_until<M: MaskSource + ?Sized>(
        &self,
        mask: &mut Mask,
        policy: &SelectionPolicy,
        boundary: &M,
        buffer: &mut FillBuffer,
    ) -> usize {
        let raster = self.raster;
        let count = scanline_fill(buffer, self.seed, self.bounds, |x, y| {
            let similar = policy.selection_for(raster.pixel(x, y));
            bounded(MAX_SELECTED - similar, boundary.pixel(x, y))
        });
        buffer.merge_into(mask);
        trace!("fill-until from ({}, {}) reached {} pixels", self.seed.x, self.seed.y, count);
        count
    }
}

/// Zero the 4-connected component of non-zero pixels of `mask` that contains
/// `seed`, without leaving `bounds`.
///
/// # Returns
/// Number of pixels cleared
pub fn clear_non_zero_component(mask: &mut Mask, seed: Point, bounds: Rect, buffer: &mut FillBuffer) -> usize {
    let count = scanline_fill(buffer, seed, bounds, |x, y| mask.pixel(x, y));
    for span in &buffer.spans {
        for x in span.left..=span.right {
            mask.set_pixel(x, span.y, MIN_SELECTED);
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::rgba8;
    use ndarray::Array3;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    /// Raster filled with `base`, with the pixels listed in `others` painted.
    fn raster(width: usize, height: usize, base: [u8; 4], others: &[(usize, usize, [u8; 4])]) -> Raster {
        let mut image = Array3::<u8>::zeros((height, width, 4));
        for y in 0..height {
            for x in 0..width {
                for c in 0..4 {
                    image[[y, x, c]] = base[c];
                }
            }
        }
        for &(x, y, px) in others {
            for c in 0..4 {
                image[[y, x, c]] = px[c];
            }
        }
        Raster::new(image.view(), rgba8()).unwrap()
    }

    #[test]
    fn test_fill_whole_uniform_region() {
        let r = raster(6, 4, RED, &[]);
        let bounds = Rect::new(0, 0, 6, 4);
        let boundary = Mask::from_rect(bounds, 255);
        let mut mask = Mask::new();
        let n = ScanlineFill::new(&r, Point::new(2, 2), bounds).fill_selection_with_boundary(&mut mask, &boundary, &mut FillBuffer::new());
        assert_eq!(n, 24);
        assert_eq!(mask.selected_pixel_count(), 24);
    }

    #[test]
    fn test_fill_stops_at_different_color() {
        // Vertical blue wall at x = 2
        let wall: Vec<(usize, usize, [u8; 4])> = (0..4).map(|y| (2, y, BLUE)).collect();
        let r = raster(5, 4, RED, &wall);
        let bounds = Rect::new(0, 0, 5, 4);
        let boundary = Mask::from_rect(bounds, 255);
        let mut mask = Mask::new();
        ScanlineFill::new(&r, Point::new(0, 0), bounds).fill_selection_with_boundary(&mut mask, &boundary, &mut FillBuffer::new());
        assert_eq!(mask.selected_pixel_count(), 8);
        assert_eq!(mask.pixel(3, 0), 0);
    }

    #[test]
    fn test_fill_respects_boundary_mask() {
        let r = raster(5, 5, RED, &[]);
        let bounds = Rect::new(0, 0, 5, 5);
        // Boundary with a closed horizontal gap on row 2
        let mut boundary = Mask::from_rect(bounds, 255);
        for x in 0..5 {
            boundary.set_pixel(x, 2, 0);
        }
        let mut mask = Mask::new();
        ScanlineFill::new(&r, Point::new(1, 0), bounds).fill_selection_with_boundary(&mut mask, &boundary, &mut FillBuffer::new());
        assert_eq!(mask.selected_pixel_count(), 10);
        assert_eq!(mask.pixel(1, 3), 0);
    }

    #[test]
    fn test_fill_never_leaves_bounds() {
        let r = raster(8, 8, RED, &[]);
        let everything = Mask::from_rect(Rect::new(0, 0, 8, 8), 255);
        let bounds = Rect::new(2, 2, 3, 3);
        let mut mask = Mask::new();
        ScanlineFill::new(&r, Point::new(3, 3), bounds).fill_selection_with_boundary(&mut mask, &everything, &mut FillBuffer::new());
        assert_eq!(mask.selected_exact_rect(), bounds);

        let mut outside = Mask::new();
        let n = ScanlineFill::new(&r, Point::new(0, 0), bounds).fill_selection_with_boundary(&mut outside, &everything, &mut FillBuffer::new());
        assert_eq!(n, 0);
        assert!(outside.is_empty());
    }

    #[test]
    fn test_fill_until_color_stops_on_ring() {
        // Blue ring around (2, 2) inside a red 5x5 image
        let ring: Vec<(usize, usize, [u8; 4])> = Rect::new(1, 1, 3, 3)
            .points()
            .filter(|p| !(p.x == 2 && p.y == 2))
            .map(|p| (p.x as usize, p.y as usize, BLUE))
            .collect();
        let r = raster(5, 5, RED, &ring);
        let bounds = Rect::new(0, 0, 5, 5);
        let boundary = Mask::from_rect(bounds, 255);
        let blue = Color::rgba8(0, 0, 255, 255);

        let mut mask = Mask::new();
        ScanlineFill::new(&r, Point::new(0, 0), bounds)
            .with_threshold(10)
            .fill_selection_until_color_with_boundary(&mut mask, &blue, &boundary, &mut FillBuffer::new());
        // Only the outer ring of 16 is reached; the centre stays enclosed
        assert_eq!(mask.selected_pixel_count(), 16);
        assert_eq!(mask.pixel(2, 2), 0);
        assert_eq!(mask.pixel(1, 1), 0);
    }

    #[test]
    fn test_fill_until_color_or_transparent() {
        let wall: Vec<(usize, usize, [u8; 4])> = (0..3).map(|y| (1, y, [0, 0, 0, 0])).collect();
        let r = raster(3, 3, RED, &wall);
        let bounds = Rect::new(0, 0, 3, 3);
        let boundary = Mask::from_rect(bounds, 255);
        let blue = Color::rgba8(0, 0, 255, 255);
        let mut mask = Mask::new();
        ScanlineFill::new(&r, Point::new(0, 0), bounds)
            .with_threshold(10)
            .fill_selection_until_color_or_transparent_with_boundary(&mut mask, &blue, &boundary, &mut FillBuffer::new());
        assert_eq!(mask.selected_pixel_count(), 3);
    }

    #[test]
    fn test_clear_non_zero_component() {
        let mut mask = Mask::from_rect(Rect::new(0, 0, 2, 2), 255);
        mask.set_pixel(4, 4, 128);
        let bounds = Rect::new(0, 0, 5, 5);
        let mut buffer = FillBuffer::new();
        assert_eq!(clear_non_zero_component(&mut mask, Point::new(1, 1), bounds, &mut buffer), 4);
        assert_eq!(mask.pixel(0, 0), 0);
        assert_eq!(mask.pixel(4, 4), 128);
        assert_eq!(clear_non_zero_component(&mut mask, Point::new(0, 0), bounds, &mut buffer), 0);
        assert_eq!(clear_non_zero_component(&mut mask, Point::new(4, 4), bounds, &mut buffer), 1);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_fill_only_visits_its_region() {
        // A single fillable pixel in a large rectangle is classified with its
        // four neighbours and nothing else
        let bounds = Rect::new(0, 0, 500, 500);
        let mut buffer = FillBuffer::new();
        let mut visited = 0usize;
        let count = scanline_fill(&mut buffer, Point::new(250, 250), bounds, |x, y| {
            visited += 1;
            if x == 250 && y == 250 {
                MAX_SELECTED
            } else {
                MIN_SELECTED
            }
        });
        assert_eq!(count, 1);
        assert_eq!(visited, 5);
        assert_eq!(buffer.filled().count(), 1);
    }

    #[test]
    fn test_shared_buffer_starts_each_fill_fresh() {
        // Vertical 1px stripes: every seed on the top row starts its own fill
        let stripes: Vec<(usize, usize, [u8; 4])> = (0..8)
            .flat_map(|y| (0..8).filter(|x| x % 2 == 1).map(move |x| (x, y, BLUE)))
            .collect();
        let r = raster(8, 8, RED, &stripes);
        let bounds = Rect::new(0, 0, 8, 8);
        let boundary = Mask::from_rect(bounds, 255);
        let mut buffer = FillBuffer::new();
        let mut mask = Mask::new();
        for x in 0..8 {
            let n = ScanlineFill::new(&r, Point::new(x, 0), bounds).fill_selection_with_boundary(
                &mut mask,
                &boundary,
                &mut buffer,
            );
            assert_eq!(n, 8, "column {x}");
        }
        assert_eq!(mask.selected_pixel_count(), 64);
    }

    #[test]
    fn test_buffer_survives_generation_wrap() {
        let r = raster(4, 4, RED, &[]);
        let bounds = Rect::new(0, 0, 4, 4);
        let boundary = Mask::from_rect(bounds, 255);
        let mut buffer = FillBuffer::new();
        let mut mask = Mask::new();
        ScanlineFill::new(&r, Point::new(0, 0), bounds).fill_selection_with_boundary(&mut mask, &boundary, &mut buffer);
        buffer.generation = u32::MAX;
        let mut again = Mask::new();
        let n = ScanlineFill::new(&r, Point::new(3, 3), bounds).fill_selection_with_boundary(&mut again, &boundary, &mut buffer);
        assert_eq!(n, 16);
        assert_eq!(buffer.generation, 1);
        assert_eq!(again, mask);
    }
}

//! Post-processing of a finished selection: Grow, Shrink, Feather, Antialias.
//!
//! Each filter reads the rectangle it works on (plus whatever neighbourhood
//! it needs) out of the mask, computes a new block and writes it back.
//! Pixels outside the mask's materialised area read as unselected.
//!
//! ## Ordering
//!
//! `apply_post_processing` runs at most one of grow/shrink, then at most one
//! of feather/antialias. Feathering already smooths the edges, so antialias
//! only runs when no feather radius is set.
//!
//! Grow/shrink distances and feather radii are limited to
//! [`MAX_SIZE_MODIFIER`] and [`MAX_FEATHER`].

use log::debug;
use ndarray::Array2;

use crate::geometry::Rect;
use crate::mask::{Mask, MaskSource, MAX_SELECTED, MIN_SELECTED};

/// Largest grow or shrink distance, in pixels.
pub const MAX_SIZE_MODIFIER: i32 = 400;
/// Largest feather radius, in pixels.
pub const MAX_FEATHER: u32 = 400;

// ============================================================================
// Grow / Shrink
// ============================================================================

/// Offsets of a circular structuring element.
fn disc_offsets(radius: u32) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let r_sq = r * r;
    let mut offsets = Vec::new();
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r_sq {
                offsets.push((dy, dx));
            }
        }
    }
    offsets
}

fn morphology(mask: &mut Mask, radius: u32, rect: Rect, dilate: bool) {
    if radius == 0 || rect.is_empty() {
        return;
    }
    let r = radius as usize;
    let source = mask.read_bytes(rect.adjusted(radius as i32));
    let offsets = disc_offsets(radius);

    let output = Array2::from_shape_fn((rect.height as usize, rect.width as usize), |(y, x)| {
        let (cy, cx) = ((y + r) as isize, (x + r) as isize);
        let values = offsets
            .iter()
            .map(|&(dy, dx)| source[[(cy + dy) as usize, (cx + dx) as usize]]);
        let value = if dilate { values.max() } else { values.min() };
        value.unwrap_or(MIN_SELECTED)
    });

    mask.write_bytes(rect.x, rect.y, output.view());
    mask.compact();
}

/// Grow the selection by `radius` pixels inside `rect`.
///
/// Takes the maximum over a disc, so `rect` should cover the selected area
/// padded by the radius.
pub fn grow(mask: &mut Mask, radius: u32, rect: Rect) {
    morphology(mask, radius, rect, true);
}

/// Shrink the selection by `radius` pixels inside `rect`.
///
/// Takes the minimum over a disc; the neighbourhood outside `rect` is read
/// from the mask, so edges of the plane behave like unselected pixels.
pub fn shrink(mask: &mut Mask, radius: u32, rect: Rect) {
    morphology(mask, radius, rect, false);
}

// ============================================================================
// Feather
// ============================================================================

/// Normalised Gaussian kernel spanning `2 * radius + 1` taps.
fn feather_kernel(radius: u32) -> Vec<f32> {
    let half = radius as isize;
    // Three sigmas on each side fit inside the radius
    let sigma = (radius as f32 / 3.0).max(0.5);
    let mut kernel: Vec<f32> = (-half..=half)
        .map(|i| {
            let x = i as f32;
            (-x * x / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    for v in kernel.iter_mut() {
        *v /= sum;
    }
    kernel
}

/// Separable blur of a selection block, repeating edge pixels.
fn blur(block: &Array2<u8>, kernel: &[f32]) -> Array2<u8> {
    let (height, width) = block.dim();
    let half = kernel.len() / 2;
    let mut temp = Array2::<f32>::zeros((height, width));
    let mut result = Array2::<f32>::zeros((height, width));

    // Horizontal pass
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sx = (x as isize + ki as isize - half as isize).clamp(0, width as isize - 1) as usize;
                sum += block[[y, sx]] as f32 * kv;
            }
            temp[[y, x]] = sum;
        }
    }

    // Vertical pass
    for y in 0..height {
        for x in 0..width {
            let mut sum = 0.0f32;
            for (ki, &kv) in kernel.iter().enumerate() {
                let sy = (y as isize + ki as isize - half as isize).clamp(0, height as isize - 1) as usize;
                sum += temp[[sy, x]] * kv;
            }
            result[[y, x]] = sum;
        }
    }

    result.mapv(|v| v.round().clamp(0.0, 255.0) as u8)
}

/// Soften the selection edges with a Gaussian of the given radius.
///
/// `rect` should cover the selected area padded by the radius.
pub fn feather(mask: &mut Mask, radius: u32, rect: Rect) {
    if radius == 0 || rect.is_empty() {
        return;
    }
    let block = mask.read_bytes(rect);
    let blurred = blur(&block, &feather_kernel(radius));
    mask.write_bytes(rect.x, rect.y, blurred.view());
    mask.compact();
}

// ============================================================================
// Antialias
// ============================================================================

#[inline]
fn is_selected(v: u8) -> bool {
    v > MAX_SELECTED / 2
}

/// Smooth hard selection edges.
///
/// Pixels whose 3x3 neighbourhood mixes selected and unselected pixels are
/// replaced by the neighbourhood mean; everything else is left untouched.
pub fn antialias(mask: &mut Mask, rect: Rect) {
    if rect.is_empty() {
        return;
    }
    let work = rect.adjusted(1);
    let source = mask.read_bytes(work.adjusted(1));
    let (height, width) = (work.height as usize, work.width as usize);

    let mut changed = 0usize;
    let output = Array2::from_shape_fn((height, width), |(y, x)| {
        let centre = source[[y + 1, x + 1]];
        let mut sum = 0u32;
        let mut transition = false;
        for sy in y..y + 3 {
            for sx in x..x + 3 {
                let v = source[[sy, sx]];
                sum += v as u32;
                transition |= is_selected(v) != is_selected(centre);
            }
        }
        if transition {
            changed += 1;
            ((sum + 4) / 9) as u8
        } else {
            centre
        }
    });

    debug!("antialias touched {} edge pixels", changed);
    mask.write_bytes(work.x, work.y, output.view());
    mask.compact();
}

// ============================================================================
// Pipeline
// ============================================================================

/// Run the configured post-processing on a composed selection.
///
/// # Arguments
/// * `mask` - Selection to modify in place
/// * `size_modifier` - Grow (> 0) or shrink (< 0) by this many pixels
/// * `feather_radius` - Feather radius; 0 disables feathering
/// * `antialias_edges` - Smooth edges when not feathering
///
/// Magnitudes beyond [`MAX_SIZE_MODIFIER`] and [`MAX_FEATHER`] are clamped.
pub fn apply_post_processing(mask: &mut Mask, size_modifier: i32, feather_radius: u32, antialias_edges: bool) {
    let size_modifier = size_modifier.clamp(-MAX_SIZE_MODIFIER, MAX_SIZE_MODIFIER);
    let feather_radius = feather_radius.min(MAX_FEATHER);
    if size_modifier > 0 {
        let rect = mask.selected_exact_rect().adjusted(size_modifier);
        debug!("growing selection by {} over {:?}", size_modifier, rect);
        grow(mask, size_modifier as u32, rect);
    } else if size_modifier < 0 {
        let rect = mask.selected_exact_rect();
        debug!("shrinking selection by {} over {:?}", size_modifier.unsigned_abs(), rect);
        shrink(mask, size_modifier.unsigned_abs(), rect);
    }

    if feather_radius > 0 {
        let rect = mask.selected_exact_rect().adjusted(feather_radius as i32);
        debug!("feathering selection by {} over {:?}", feather_radius, rect);
        feather(mask, feather_radius, rect);
    } else if antialias_edges {
        let rect = mask.selected_exact_rect();
        antialias(mask, rect);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x: i32, y: i32, size: i32) -> Mask {
        Mask::from_rect(Rect::new(x, y, size, size), MAX_SELECTED)
    }

    #[test]
    fn test_grow_single_pixel_to_disc() {
        let mut mask = square(10, 10, 1);
        apply_post_processing(&mut mask, 2, 0, false);
        // Disc of radius 2: 13 pixels
        assert_eq!(mask.selected_pixel_count(), 13);
        assert_eq!(mask.selected_exact_rect(), Rect::new(8, 8, 5, 5));
        assert_eq!(mask.pixel(8, 8), MIN_SELECTED);
        assert_eq!(mask.pixel(10, 8), MAX_SELECTED);
    }

    #[test]
    fn test_shrink_square() {
        let mut mask = square(0, 0, 7);
        apply_post_processing(&mut mask, -2, 0, false);
        assert_eq!(mask.selected_exact_rect(), Rect::new(2, 2, 3, 3));
        assert_eq!(mask.selected_pixel_count(), 9);
    }

    #[test]
    fn test_shrink_removes_thin_selection() {
        let mut mask = square(3, 3, 2);
        apply_post_processing(&mut mask, -1, 0, false);
        assert!(mask.is_empty());
    }

    #[test]
    fn test_grow_then_shrink_is_a_superset() {
        let original = square(5, 5, 6);
        for n in 1..4 {
            let mut mask = original.clone();
            apply_post_processing(&mut mask, n, 0, false);
            apply_post_processing(&mut mask, -n, 0, false);
            for p in Rect::new(0, 0, 20, 20).points() {
                assert!(mask.pixel(p.x, p.y) >= original.pixel(p.x, p.y), "lost {:?}", p);
            }
        }
    }

    #[test]
    fn test_feather_softens_edges_only() {
        let mut mask = square(0, 0, 12);
        apply_post_processing(&mut mask, 0, 3, false);
        assert_eq!(mask.pixel(6, 6), MAX_SELECTED);
        let edge = mask.pixel(0, 6);
        assert!(edge > MIN_SELECTED && edge < MAX_SELECTED);
        assert!(mask.pixel(-1, 6) > MIN_SELECTED);
        assert_eq!(mask.pixel(-5, 6), MIN_SELECTED);
    }

    #[test]
    fn test_antialias_blends_transition_pixels() {
        let mut mask = square(0, 0, 4);
        apply_post_processing(&mut mask, 0, 0, true);
        // Corner: 4 of 9 neighbours selected
        assert_eq!(mask.pixel(0, 0), 113);
        // Interior pixels have a uniform neighbourhood
        assert_eq!(mask.pixel(1, 1), MAX_SELECTED);
        // Outside neighbours pick up some selection
        assert_eq!(mask.pixel(-1, 1), 85);
    }

    #[test]
    fn test_huge_shrink_is_clamped() {
        let mut shrunk = square(0, 0, 8);
        apply_post_processing(&mut shrunk, i32::MIN, 0, false);
        assert!(shrunk.is_empty());
    }

    #[test]
    fn test_feather_wins_over_antialias() {
        let mut feathered = square(0, 0, 6);
        let mut both = feathered.clone();
        apply_post_processing(&mut feathered, 0, 2, false);
        apply_post_processing(&mut both, 0, 2, true);
        assert_eq!(feathered, both);
    }
}

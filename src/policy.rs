//! Difference and selection policies.
//!
//! A difference policy turns a pixel into a distance in [0, 100] from some
//! criterion (transparency, a colour, or either). A selection policy turns
//! that distance into a selection strength in [0, 255], either as a hard
//! step or as a soft ramp near the threshold.
//!
//! Both are closed enums resolved once per pixel with a `match`, so the hot
//! loops stay free of dynamic dispatch on the policy itself.

use crate::color::{Color, ColorKey, ColorSpaceRef};
use crate::mask::{MAX_SELECTED, MIN_SELECTED};

/// Criterion a pixel is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DifferenceKind {
    /// Distance from full transparency (the opacity itself).
    Transparent,
    /// Colour difference including alpha.
    SpecificColor,
    /// Like `SpecificColorOrTransparent`, but fully opaque pixels are never
    /// close to transparent. Keeps anti-aliased edges of a coloured shape
    /// from being classified as transparent.
    TransparentForHalos,
    /// Close to the colour or close to transparent, whichever is nearer.
    SpecificColorOrTransparent,
}

/// Difference policy bound to a colour space and a criterion colour.
///
/// The criterion's comparison key is computed once, when the policy is built.
#[derive(Debug, Clone)]
pub struct DifferencePolicy {
    kind: DifferenceKind,
    space: ColorSpaceRef,
    color: Color,
    key: ColorKey,
}

#[inline]
fn opacity_difference(opacity: u8) -> u8 {
    (opacity as u32 * 100 / MAX_SELECTED as u32) as u8
}

impl DifferencePolicy {
    /// Bind `kind` to `space`, converting `color` into that space.
    pub fn new(kind: DifferenceKind, space: &ColorSpaceRef, color: &Color) -> Self {
        let color = color.converted_to(space);
        let key = space.key(color.data());
        Self { kind, space: space.clone(), color, key }
    }

    pub fn kind(&self) -> DifferenceKind {
        self.kind
    }

    /// Criterion colour, expressed in the policy's colour space.
    pub fn color(&self) -> &Color {
        &self.color
    }

    /// Distance of `pixel` from the criterion, in [0, 100].
    #[inline]
    pub fn difference_for(&self, pixel: &[u8]) -> u8 {
        match self.kind {
            DifferenceKind::Transparent => opacity_difference(self.space.opacity_u8(pixel)),
            DifferenceKind::SpecificColor => self.space.difference_a_to(pixel, &self.key),
            DifferenceKind::TransparentForHalos => {
                let opacity = self.space.opacity_u8(pixel);
                if opacity == MAX_SELECTED {
                    return 100;
                }
                let color_difference = self.space.difference_to(pixel, &self.key);
                color_difference.min(opacity_difference(opacity))
            }
            DifferenceKind::SpecificColorOrTransparent => {
                let color_difference = self.space.difference_to(pixel, &self.key);
                color_difference.min(opacity_difference(self.space.opacity_u8(pixel)))
            }
        }
    }
}

/// Hard step: selected when `difference <= threshold`.
#[inline]
pub fn hard_selection(difference: u8, threshold: u8) -> u8 {
    if difference <= threshold {
        MAX_SELECTED
    } else {
        MIN_SELECTED
    }
}

/// Soft ramp from 255 at distance 0 down to 0 at the threshold.
///
/// A zero threshold never selects anything.
#[inline]
pub fn soft_selection(difference: u8, threshold: u8, softness: u8) -> u8 {
    if threshold == 0 || softness == 0 {
        return MIN_SELECTED;
    }
    let threshold = threshold as i32;
    let difference = difference as i32;
    if difference >= threshold {
        return MIN_SELECTED;
    }
    let v = (threshold - difference) * MAX_SELECTED as i32 * 100 / (threshold * softness as i32);
    v.clamp(MIN_SELECTED as i32, MAX_SELECTED as i32) as u8
}

/// Converts a difference policy into selection strengths.
#[derive(Debug, Clone)]
pub enum SelectionPolicy {
    Hard { difference: DifferencePolicy, threshold: u8 },
    Soft { difference: DifferencePolicy, threshold: u8, softness: u8 },
}

impl SelectionPolicy {
    /// Hard policy when `softness` is 0, soft policy otherwise.
    pub fn new(difference: DifferencePolicy, threshold: u8, softness: u8) -> Self {
        if softness == 0 {
            SelectionPolicy::Hard { difference, threshold }
        } else {
            SelectionPolicy::Soft { difference, threshold, softness }
        }
    }

    pub fn hard(difference: DifferencePolicy, threshold: u8) -> Self {
        SelectionPolicy::Hard { difference, threshold }
    }

    pub fn difference(&self) -> &DifferencePolicy {
        match self {
            SelectionPolicy::Hard { difference, .. } | SelectionPolicy::Soft { difference, .. } => {
                difference
            }
        }
    }

    /// Criterion colour of the wrapped difference policy.
    pub fn color(&self) -> &Color {
        self.difference().color()
    }

    /// Selection strength of `pixel`, in [0, 255].
    #[inline]
    pub fn selection_for(&self, pixel: &[u8]) -> u8 {
        match self {
            SelectionPolicy::Hard { difference, threshold } => {
                hard_selection(difference.difference_for(pixel), *threshold)
            }
            SelectionPolicy::Soft { difference, threshold, softness } => {
                soft_selection(difference.difference_for(pixel), *threshold, *softness)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::rgba8;

    fn policy(kind: DifferenceKind, color: Color) -> DifferencePolicy {
        DifferencePolicy::new(kind, &rgba8(), &color)
    }

    #[test]
    fn test_transparent_difference_is_scaled_opacity() {
        let p = policy(DifferenceKind::Transparent, Color::default());
        assert_eq!(p.difference_for(&[9, 9, 9, 0]), 0);
        assert_eq!(p.difference_for(&[9, 9, 9, 255]), 100);
        assert_eq!(p.difference_for(&[9, 9, 9, 128]), 50);
    }

    #[test]
    fn test_halo_policy_treats_opaque_as_far() {
        let red = Color::rgba8(255, 0, 0, 255);
        let halos = policy(DifferenceKind::TransparentForHalos, red.clone());
        let either = policy(DifferenceKind::SpecificColorOrTransparent, red);

        // An opaque red pixel matches the colour, but is never "transparent"
        assert_eq!(halos.difference_for(&[255, 0, 0, 255]), 100);
        assert_eq!(either.difference_for(&[255, 0, 0, 255]), 0);

        // A translucent blue edge pixel is close to transparent for both
        assert_eq!(halos.difference_for(&[0, 0, 255, 25]), 9);
        assert_eq!(either.difference_for(&[0, 0, 255, 25]), 9);
    }

    #[test]
    fn test_cached_key_matches_direct_difference() {
        let space = rgba8();
        let teal = Color::rgba8(0, 128, 128, 200);
        let p = policy(DifferenceKind::SpecificColor, teal.clone());
        for pixel in [[0u8, 128, 128, 200], [0, 130, 120, 255], [250, 10, 10, 20]] {
            assert_eq!(p.difference_for(&pixel), space.difference_a(&pixel, teal.data()));
        }
    }

    #[test]
    fn test_hard_threshold_is_inclusive() {
        assert_eq!(hard_selection(30, 30), MAX_SELECTED);
        assert_eq!(hard_selection(31, 30), MIN_SELECTED);
        assert_eq!(hard_selection(0, 0), MAX_SELECTED);
    }

    #[test]
    fn test_soft_zero_threshold_never_selects() {
        for d in 0..=100u8 {
            assert_eq!(soft_selection(d, 0, 50), MIN_SELECTED);
        }
    }

    #[test]
    fn test_soft_ramp() {
        // Full softness: linear from 255 at distance 0 to 0 at the threshold
        assert_eq!(soft_selection(0, 50, 100), 255);
        assert_eq!(soft_selection(25, 50, 100), 127);
        assert_eq!(soft_selection(50, 50, 100), 0);
        assert_eq!(soft_selection(80, 50, 100), 0);
        // Lower softness saturates earlier
        assert_eq!(soft_selection(25, 50, 50), 255);
        assert_eq!(soft_selection(40, 50, 50), 102);
    }

    #[test]
    fn test_selection_policy_dispatch() {
        let p = policy(DifferenceKind::Transparent, Color::default());
        let hard = SelectionPolicy::new(p.clone(), 50, 0);
        let soft = SelectionPolicy::new(p, 50, 100);
        assert!(matches!(hard, SelectionPolicy::Hard { .. }));
        assert_eq!(hard.selection_for(&[0, 0, 0, 127]), 255);
        assert_eq!(soft.selection_for(&[0, 0, 0, 0]), 255);
        assert_eq!(soft.selection_for(&[0, 0, 0, 255]), 0);
    }
}

//! Invocation parameters.
//!
//! `EncloseOptions` bundles everything a caller can configure for one run of
//! the enclosed-region selector. Values are plain data; `validate` checks the
//! ranges before a selector is built from them.

use crate::color::Color;
use crate::error::{Error, Result};
use crate::postprocess::{MAX_FEATHER, MAX_SIZE_MODIFIER};
use crate::selector::RegionSelectionMethod;

/// Largest accepted threshold and softness.
pub const MAX_PERCENT: u8 = 100;

/// Parameters of one enclosed-region selection.
#[derive(Debug, Clone, PartialEq)]
pub struct EncloseOptions {
    /// Which regions of the enclosing area are selected.
    pub method: RegionSelectionMethod,
    /// Criterion colour of the specific-colour methods; ignored otherwise.
    pub region_color: Color,
    /// Largest difference (0-100) still counted as a match.
    pub threshold: u8,
    /// Width of the soft ramp (0-100); 0 selects hard thresholding.
    pub softness: u8,
    /// Select the complement of the regions inside the enclosing area.
    pub invert: bool,
    /// Keep matching regions that touch the enclosing contour.
    pub include_contour_regions: bool,
    /// Keep the surrounding colour itself for the surrounded-by methods.
    pub include_surrounding_regions: bool,
    /// Intersect the result with the existing selection, when one is given.
    pub use_selection_as_boundary: bool,
    /// Grow (> 0) or shrink (< 0) the result by this many pixels.
    pub size_modifier: i32,
    /// Feather radius in pixels; 0 disables feathering.
    pub feather: u32,
    /// Smooth hard edges. Ignored when feathering.
    pub antialias: bool,
}

impl Default for EncloseOptions {
    fn default() -> Self {
        Self {
            method: RegionSelectionMethod::SelectAllRegions,
            region_color: Color::default(),
            threshold: 8,
            softness: 0,
            invert: false,
            include_contour_regions: true,
            include_surrounding_regions: true,
            use_selection_as_boundary: false,
            size_modifier: 0,
            feather: 0,
            antialias: false,
        }
    }
}

impl EncloseOptions {
    /// Default options for `method`.
    pub fn new(method: RegionSelectionMethod) -> Self {
        Self { method, ..Self::default() }
    }

    pub fn with_color(mut self, color: Color) -> Self {
        self.region_color = color;
        self
    }

    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_softness(mut self, softness: u8) -> Self {
        self.softness = softness;
        self
    }

    /// Set softness from an opacity spread, where 100 means hard edges.
    pub fn with_opacity_spread(mut self, spread: u8) -> Self {
        self.softness = MAX_PERCENT.saturating_sub(spread);
        self
    }

    pub fn with_invert(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    pub fn with_contour_regions(mut self, include: bool) -> Self {
        self.include_contour_regions = include;
        self
    }

    pub fn with_surrounding_regions(mut self, include: bool) -> Self {
        self.include_surrounding_regions = include;
        self
    }

    pub fn with_selection_as_boundary(mut self, enabled: bool) -> Self {
        self.use_selection_as_boundary = enabled;
        self
    }

    pub fn with_size_modifier(mut self, pixels: i32) -> Self {
        self.size_modifier = pixels;
        self
    }

    pub fn with_feather(mut self, radius: u32) -> Self {
        self.feather = radius;
        self
    }

    pub fn with_antialias(mut self, antialias: bool) -> Self {
        self.antialias = antialias;
        self
    }

    /// Whether any post-processing step will run.
    pub fn has_post_processing(&self) -> bool {
        self.size_modifier != 0 || self.feather > 0 || self.antialias
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.threshold > MAX_PERCENT {
            return Err(Error::InvalidParameter(format!(
                "threshold must be in 0..={}, got {}",
                MAX_PERCENT, self.threshold
            )));
        }
        if self.softness > MAX_PERCENT {
            return Err(Error::InvalidParameter(format!(
                "softness must be in 0..={}, got {}",
                MAX_PERCENT, self.softness
            )));
        }
        check_post_processing(self.size_modifier, self.feather)
    }
}

/// Check grow/shrink and feather magnitudes.
pub fn check_post_processing(size_modifier: i32, feather: u32) -> Result<()> {
    if !(-MAX_SIZE_MODIFIER..=MAX_SIZE_MODIFIER).contains(&size_modifier) {
        return Err(Error::InvalidParameter(format!(
            "size modifier must be in -{0}..={0}, got {1}",
            MAX_SIZE_MODIFIER, size_modifier
        )));
    }
    if feather > MAX_FEATHER {
        return Err(Error::InvalidParameter(format!(
            "feather must be in 0..={}, got {}",
            MAX_FEATHER, feather
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let options = EncloseOptions::default();
        assert!(options.validate().is_ok());
        assert_eq!(options.threshold, 8);
        assert!(!options.has_post_processing());
    }

    #[test]
    fn test_out_of_range_values_are_rejected() {
        let options = EncloseOptions::default().with_threshold(101);
        assert!(matches!(options.validate(), Err(Error::InvalidParameter(_))));
        let options = EncloseOptions::default().with_softness(200);
        assert!(matches!(options.validate(), Err(Error::InvalidParameter(_))));
    }

    #[test]
    fn test_post_processing_magnitudes_are_bounded() {
        let options = EncloseOptions::default().with_size_modifier(1 << 30);
        assert!(matches!(options.validate(), Err(Error::InvalidParameter(_))));
        let options = EncloseOptions::default().with_size_modifier(i32::MIN);
        assert!(matches!(options.validate(), Err(Error::InvalidParameter(_))));
        let options = EncloseOptions::default().with_feather(MAX_FEATHER + 1);
        assert!(matches!(options.validate(), Err(Error::InvalidParameter(_))));

        let options = EncloseOptions::default()
            .with_size_modifier(-MAX_SIZE_MODIFIER)
            .with_feather(MAX_FEATHER);
        assert!(options.validate().is_ok());
        assert!(options.has_post_processing());
    }

    #[test]
    fn test_opacity_spread_maps_to_softness() {
        assert_eq!(EncloseOptions::default().with_opacity_spread(100).softness, 0);
        assert_eq!(EncloseOptions::default().with_opacity_spread(30).softness, 70);
        assert_eq!(EncloseOptions::default().with_opacity_spread(0).softness, 100);
    }
}

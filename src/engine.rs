//! Enclosed-region selection pipeline.
//!
//! ```text
//! enclosing mask ─┐
//!                 ├─> region selector ─> compositor ─> post-processing ─> mask
//! reference ──────┘   (raw mask)         (invert, intersect)
//! ```
//!
//! One `EnclosedRegionSelector` runs one invocation at a time and owns the
//! scratch masks it needs. Independent invocations against the same inputs
//! can run in parallel with [`select_batch`].

use log::debug;
use ndarray::{Array2, ArrayView2, ArrayView3};
use rayon::prelude::*;

use crate::color::{gray_a8, rgba8};
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};
use crate::mask::{Mask, MaskSource, ScratchMasks, SelectionAction};
use crate::options::EncloseOptions;
use crate::postprocess::apply_post_processing;
use crate::raster::Raster;
use crate::selector::{RegionSelectionMethod, RegionSelector};

/// Selects regions of a reference raster enclosed by a mask.
#[derive(Debug)]
pub struct EnclosedRegionSelector {
    options: EncloseOptions,
    scratch: ScratchMasks,
}

impl EnclosedRegionSelector {
    /// Build a selector; fails when `options` are out of range.
    pub fn new(options: EncloseOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self { options, scratch: ScratchMasks::new() })
    }

    pub fn options(&self) -> &EncloseOptions {
        &self.options
    }

    /// Replace the options, keeping the scratch masks.
    pub fn set_options(&mut self, options: EncloseOptions) -> Result<()> {
        options.validate()?;
        self.options = options;
        Ok(())
    }

    /// Raw mask of the configured method, before inversion and
    /// post-processing.
    ///
    /// For [`RegionSelectionMethod::SelectAllRegions`] this is the complement
    /// of the enclosed regions.
    pub fn compute_enclosed_regions_mask<E: MaskSource + ?Sized>(
        &mut self,
        enclosing: &E,
        reference: &Raster,
    ) -> Mask {
        let mut result = Mask::new();
        RegionSelector::new(enclosing, reference, &self.options).compute(&mut result, &mut self.scratch);
        result
    }

    /// Compute the final selection.
    ///
    /// # Arguments
    /// * `enclosing` - Area to search; only regions inside it are selected
    /// * `reference` - Image the regions are found on
    /// * `existing` - Current selection, used as an extra boundary when the
    ///   options ask for it
    ///
    /// # Returns
    /// New mask; empty when nothing qualifies
    pub fn create_selection<E: MaskSource + ?Sized>(
        &mut self,
        enclosing: &E,
        reference: &Raster,
        existing: Option<&dyn MaskSource>,
    ) -> Mask {
        let enclosing_rect = enclosing.selected_exact_rect();
        if enclosing_rect.is_empty() {
            debug!("enclosing mask is empty");
            return Mask::new();
        }

        let mut result = Mask::new();
        let raw_rect = RegionSelector::new(enclosing, reference, &self.options)
            .compute(&mut result, &mut self.scratch);
        if raw_rect.is_empty() {
            debug!("{} selected nothing", self.options.method);
            result.compact();
            return result;
        }

        invert_if_needed(&mut result, enclosing, self.options.method, self.options.invert);

        if self.options.use_selection_as_boundary {
            if let Some(existing) = existing {
                result.apply_selection(existing, SelectionAction::Intersect);
            }
        }

        if self.options.has_post_processing() {
            apply_post_processing(
                &mut result,
                self.options.size_modifier,
                self.options.feather,
                self.options.antialias,
            );
        }
        result.compact();
        result
    }
}

/// Bring the raw mask to the requested polarity.
///
/// The raw mask is inverted when its natural polarity disagrees with the
/// `invert` flag, then clipped back to the enclosing mask because an
/// inverted mask covers the whole unbounded plane.
///
/// # Returns
/// Whether the mask was inverted
pub fn invert_if_needed<E: MaskSource + ?Sized>(
    mask: &mut Mask,
    enclosing: &E,
    method: RegionSelectionMethod,
    invert: bool,
) -> bool {
    if method.is_naturally_inverted() == invert {
        return false;
    }
    mask.invert();
    mask.apply_selection(enclosing, SelectionAction::Intersect);
    true
}

/// One-shot selection with a fresh selector.
pub fn select_enclosed_regions<E: MaskSource + ?Sized>(
    enclosing: &E,
    reference: &Raster,
    options: &EncloseOptions,
    existing: Option<&dyn MaskSource>,
) -> Result<Mask> {
    let mut selector = EnclosedRegionSelector::new(options.clone())?;
    Ok(selector.create_selection(enclosing, reference, existing))
}

/// Run several independent selections over the same inputs in parallel.
///
/// Every option set gets its own selector; results come back in the order of
/// `options`. All options are validated before any work starts.
pub fn select_batch<E: MaskSource + Sync + ?Sized>(
    enclosing: &E,
    reference: &Raster,
    options: &[EncloseOptions],
) -> Result<Vec<Mask>> {
    let selectors = options
        .iter()
        .cloned()
        .map(EnclosedRegionSelector::new)
        .collect::<Result<Vec<_>>>()?;

    debug!("running {} selections in parallel", selectors.len());
    Ok(selectors
        .into_par_iter()
        .map(|mut selector| selector.create_selection(enclosing, reference, None))
        .collect())
}

/// Array front end used by the bindings.
///
/// # Arguments
/// * `enclosing` - Enclosing mask as `(height, width)`
/// * `image` - Reference image as `(height, width, channels)`; 4 channels are
///   read as RGBA8, 2 channels as GrayA8
/// * `options` - Selection options
///
/// # Returns
/// Selection over the image area as `(height, width)`
pub fn select_enclosed_regions_array(
    enclosing: ArrayView2<u8>,
    image: ArrayView3<u8>,
    options: &EncloseOptions,
) -> Result<Array2<u8>> {
    let (height, width, channels) = image.dim();
    if enclosing.dim() != (height, width) {
        return Err(Error::ShapeMismatch {
            expected: height * width,
            actual: enclosing.len(),
        });
    }
    let space = match channels {
        4 => rgba8(),
        2 => gray_a8(),
        _ => return Err(Error::InvalidChannels { expected: 4, actual: channels }),
    };
    let reference = Raster::new(image, space)?;
    let mask = Mask::from_array(Point::new(0, 0), enclosing.to_owned());
    let selection = select_enclosed_regions(&mask, &reference, options, None)?;
    Ok(selection.read_bytes(Rect::new(0, 0, width as i32, height as i32)))
}

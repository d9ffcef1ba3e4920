//! EncloseStag Rust Extensions
//!
//! Enclosed-region selection: given an enclosing mask drawn by the user and a
//! reference image, select the regions of the image that lie inside the
//! enclosing area, with Python bindings via PyO3 and WASM bindings for
//! JavaScript.
//!
//! ## Pipeline
//! - **Contour**: boundary pixels of the enclosing mask seed the fills
//! - **Selector**: one of ten region selection methods builds a raw mask
//! - **Compositor**: inverts when requested and clips to the enclosing mask
//! - **Post-processing**: grow/shrink, feather or antialias
//!
//! ## Image Format
//! Reference images are `(height, width, channels)` arrays of `u8`:
//! - **RGBA**: 4 channels, compared as CIE76 deltaE in Lab
//! - **Gray + alpha**: 2 channels, compared on lightness
//!
//! Masks are `(height, width)` arrays, 0 = unselected, 255 = fully selected.
//!
//! ## Example
//! ```
//! use enclosestag_rust::{EncloseOptions, EnclosedRegionSelector, Mask, Raster, Rect};
//! use enclosestag_rust::{rgba8, RegionSelectionMethod};
//! use ndarray::Array3;
//!
//! let image = Array3::<u8>::zeros((8, 8, 4));
//! let reference = Raster::new(image.view(), rgba8()).unwrap();
//! let enclosing = Mask::from_rect(Rect::new(0, 0, 8, 8), 255);
//!
//! let options = EncloseOptions::new(RegionSelectionMethod::SelectRegionsFilledWithTransparent);
//! let mut selector = EnclosedRegionSelector::new(options).unwrap();
//! let selection = selector.create_selection(&enclosing, &reference, None);
//! assert_eq!(selection.selected_pixel_count(), 64);
//! ```

pub mod color;
pub mod contour;
pub mod engine;
pub mod error;
pub mod fill;
pub mod geometry;
pub mod mask;
pub mod options;
pub mod policy;
pub mod postprocess;
pub mod raster;
pub mod selector;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use color::{gray_a8, rgba8, Color, ColorKey, ColorSpace, ColorSpaceRef};
pub use engine::{
    invert_if_needed, select_batch, select_enclosed_regions, select_enclosed_regions_array,
    EnclosedRegionSelector,
};
pub use error::{Error, Result};
pub use geometry::{Point, Rect};
pub use mask::{Mask, MaskSource, ScratchMasks, SelectionAction, MAX_SELECTED, MIN_SELECTED};
pub use options::{check_post_processing, EncloseOptions};
pub use raster::Raster;
pub use selector::{RegionFamily, RegionSelectionMethod, RegionTarget};

// Python bindings (only when python feature is enabled)
#[cfg(feature = "python")]
mod python {
    use numpy::{IntoPyArray, PyArray2, PyReadonlyArray2, PyReadonlyArray3};
    use pyo3::exceptions::PyValueError;
    use pyo3::prelude::*;

    use crate::color::Color;
    use crate::engine::select_enclosed_regions_array;
    use crate::options::EncloseOptions;
    use crate::selector::RegionSelectionMethod;

    fn value_error(err: crate::error::Error) -> PyErr {
        PyValueError::new_err(err.to_string())
    }

    // ========================================================================
    // Enclosed Region Selection
    // ========================================================================

    /// Select the regions of an image enclosed by a mask.
    ///
    /// # Arguments
    /// * `enclosing_mask` - Enclosing area (height, width), 0-255
    /// * `image` - Reference image (height, width, 4) RGBA or (height, width, 2) gray + alpha
    /// * `method` - Region selection method name, e.g. "all_regions"
    /// * `color` - RGBA criterion colour for the specific-colour methods
    /// * `threshold` - Largest colour difference (0-100) counted as a match
    /// * `softness` - Soft ramp width (0-100); 0 = hard edges
    ///
    /// # Returns
    /// Selection mask (height, width), 0-255
    #[pyfunction]
    #[pyo3(signature = (
        enclosing_mask,
        image,
        method="all_regions",
        color=(0, 0, 0, 255),
        threshold=8,
        softness=0,
        invert=false,
        include_contour_regions=true,
        include_surrounding_regions=true,
        size_modifier=0,
        feather=0,
        antialias=false
    ))]
    #[allow(clippy::too_many_arguments)]
    pub fn select_enclosed_regions<'py>(
        py: Python<'py>,
        enclosing_mask: PyReadonlyArray2<'py, u8>,
        image: PyReadonlyArray3<'py, u8>,
        method: &str,
        color: (u8, u8, u8, u8),
        threshold: u8,
        softness: u8,
        invert: bool,
        include_contour_regions: bool,
        include_surrounding_regions: bool,
        size_modifier: i32,
        feather: u32,
        antialias: bool,
    ) -> PyResult<Bound<'py, PyArray2<u8>>> {
        let method: RegionSelectionMethod = method.parse().map_err(value_error)?;
        let options = EncloseOptions::new(method)
            .with_color(Color::rgba8(color.0, color.1, color.2, color.3))
            .with_threshold(threshold)
            .with_softness(softness)
            .with_invert(invert)
            .with_contour_regions(include_contour_regions)
            .with_surrounding_regions(include_surrounding_regions)
            .with_size_modifier(size_modifier)
            .with_feather(feather)
            .with_antialias(antialias);

        let result = select_enclosed_regions_array(enclosing_mask.as_array(), image.as_array(), &options)
            .map_err(value_error)?;
        Ok(result.into_pyarray(py))
    }

    /// Names accepted by `select_enclosed_regions(method=...)`.
    #[pyfunction]
    pub fn region_selection_methods() -> Vec<&'static str> {
        RegionSelectionMethod::ALL.iter().map(|m| m.name()).collect()
    }

    #[pymodule]
    pub fn enclosestag_rust(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_function(wrap_pyfunction!(select_enclosed_regions, m)?)?;
        m.add_function(wrap_pyfunction!(region_selection_methods, m)?)?;
        Ok(())
    }
}

#[cfg(feature = "python")]
pub use python::enclosestag_rust;

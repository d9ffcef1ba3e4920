//! WebAssembly exports for enclosed-region selection.
//!
//! These functions are exposed to JavaScript via wasm-bindgen and work on
//! flat buffers, as handed over from `ImageData` and canvas masks.

use ndarray::{Array2, Array3};
use wasm_bindgen::prelude::*;

use crate::color::Color;
use crate::engine::select_enclosed_regions_array;
use crate::error::Error;
use crate::geometry::Rect;
use crate::mask::{Mask, MaskSource};
use crate::options::{check_post_processing, EncloseOptions};
use crate::postprocess::apply_post_processing;
use crate::selector::RegionSelectionMethod;

fn js_error(err: Error) -> JsValue {
    JsValue::from_str(&err.to_string())
}

/// Select the regions of an RGBA image enclosed by a mask.
///
/// # Arguments
/// * `mask` - Flat enclosing mask (length = width * height), 0-255
/// * `image` - Flat array of RGBA bytes (length = width * height * 4)
/// * `width` - Image width in pixels
/// * `height` - Image height in pixels
/// * `method` - Region selection method name, e.g. "all_regions"
/// * `r`, `g`, `b`, `a` - Criterion colour for the specific-colour methods
/// * `threshold` - Largest colour difference (0-100) counted as a match
/// * `softness` - Soft ramp width (0-100); 0 = hard edges
///
/// # Returns
/// Flat selection mask (length = width * height)
#[wasm_bindgen]
#[allow(clippy::too_many_arguments)]
pub fn select_enclosed_regions_wasm(
    mask: &[u8],
    image: &[u8],
    width: usize,
    height: usize,
    method: &str,
    r: u8,
    g: u8,
    b: u8,
    a: u8,
    threshold: u8,
    softness: u8,
    invert: bool,
    include_contour_regions: bool,
    include_surrounding_regions: bool,
) -> Result<Vec<u8>, JsValue> {
    let enclosing = Array2::from_shape_vec((height, width), mask.to_vec()).map_err(|_| {
        js_error(Error::ShapeMismatch { expected: width * height, actual: mask.len() })
    })?;
    let pixels = Array3::from_shape_vec((height, width, 4), image.to_vec()).map_err(|_| {
        js_error(Error::ShapeMismatch { expected: width * height * 4, actual: image.len() })
    })?;

    let method: RegionSelectionMethod = method.parse().map_err(js_error)?;
    let options = EncloseOptions::new(method)
        .with_color(Color::rgba8(r, g, b, a))
        .with_threshold(threshold)
        .with_softness(softness)
        .with_invert(invert)
        .with_contour_regions(include_contour_regions)
        .with_surrounding_regions(include_surrounding_regions);

    let result = select_enclosed_regions_array(enclosing.view(), pixels.view(), &options).map_err(js_error)?;
    Ok(result.into_raw_vec_and_offset().0)
}

/// Grow/shrink, feather and antialias an existing flat selection mask.
///
/// # Arguments
/// * `mask` - Flat selection mask (length = width * height)
/// * `width` - Mask width in pixels
/// * `height` - Mask height in pixels
/// * `size_modifier` - Grow (> 0) or shrink (< 0) by this many pixels
/// * `feather` - Feather radius; 0 disables feathering
/// * `antialias` - Smooth edges when not feathering
#[wasm_bindgen]
pub fn post_process_selection_wasm(
    mask: &[u8],
    width: usize,
    height: usize,
    size_modifier: i32,
    feather: u32,
    antialias: bool,
) -> Result<Vec<u8>, JsValue> {
    check_post_processing(size_modifier, feather).map_err(js_error)?;
    let mut selection = Mask::from_vec(mask.to_vec(), width, height).map_err(js_error)?;
    apply_post_processing(&mut selection, size_modifier, feather, antialias);
    let out = selection.read_bytes(Rect::new(0, 0, width as i32, height as i32));
    Ok(out.into_raw_vec_and_offset().0)
}

/// Names accepted by the `method` argument.
#[wasm_bindgen]
pub fn region_selection_methods_wasm() -> Vec<String> {
    RegionSelectionMethod::ALL.iter().map(|m| m.name().to_string()).collect()
}

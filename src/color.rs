//! Colour spaces and colour criteria.
//!
//! The engine treats a colour space as an opaque provider of three things:
//! the opacity of a pixel, the perceptual difference between two pixels
//! (0-100, with or without alpha) and conversion to and from 8-bit RGBA so
//! a criterion colour can be expressed in the reference raster's space.
//!
//! Two spaces ship with the crate:
//! - **RGBA8**: 4 bytes per pixel, differences measured as CIE76 deltaE in Lab
//! - **GrayA8**: 2 bytes per pixel, differences measured on Lab lightness

use std::fmt;
use std::sync::Arc;

/// Pixel format and colour arithmetic of a reference raster.
pub trait ColorSpace: Send + Sync + fmt::Debug {
    /// Identifier used to detect that two colours share a space.
    fn id(&self) -> &'static str;

    /// Bytes per pixel.
    fn pixel_size(&self) -> usize;

    /// Opacity of a pixel, 0 = transparent, 255 = opaque.
    fn opacity_u8(&self, pixel: &[u8]) -> u8;

    /// Perceptual coordinates of a pixel, the form differences are measured in.
    fn key(&self, pixel: &[u8]) -> ColorKey;

    /// Difference in the range [0, 100] between `pixel` and a precomputed key,
    /// ignoring alpha.
    #[inline]
    fn difference_to(&self, pixel: &[u8], key: &ColorKey) -> u8 {
        clamp_difference(self.key(pixel).distance(key))
    }

    /// Difference in the range [0, 100] between `pixel` and a precomputed key,
    /// alpha included.
    #[inline]
    fn difference_a_to(&self, pixel: &[u8], key: &ColorKey) -> u8 {
        let k = self.key(pixel);
        with_alpha(k.distance(key), k.alpha, key.alpha)
    }

    /// Colour difference in the range [0, 100], ignoring alpha.
    fn difference(&self, a: &[u8], b: &[u8]) -> u8 {
        self.difference_to(a, &self.key(b))
    }

    /// Colour difference in the range [0, 100], alpha included.
    fn difference_a(&self, a: &[u8], b: &[u8]) -> u8 {
        self.difference_a_to(a, &self.key(b))
    }

    /// Encode an 8-bit straight-alpha RGBA colour in this space.
    fn from_rgba8(&self, rgba: [u8; 4]) -> Vec<u8>;

    /// Decode a pixel of this space to 8-bit straight-alpha RGBA.
    fn to_rgba8(&self, pixel: &[u8]) -> [u8; 4];
}

/// Shared handle to a colour space.
pub type ColorSpaceRef = Arc<dyn ColorSpace>;

/// A pixel in CIE Lab plus its alpha.
///
/// Computing the key of a criterion colour once keeps the colour conversion
/// out of per-pixel comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorKey {
    pub lab: [f32; 3],
    pub alpha: u8,
}

impl ColorKey {
    /// CIE76 deltaE between two keys.
    #[inline]
    pub fn distance(&self, other: &ColorKey) -> f32 {
        let dl = self.lab[0] - other.lab[0];
        let da = self.lab[1] - other.lab[1];
        let db = self.lab[2] - other.lab[2];
        (dl * dl + da * da + db * db).sqrt()
    }
}

/// Immutable colour value tagged with the space it is expressed in.
#[derive(Clone)]
pub struct Color {
    data: Vec<u8>,
    space: ColorSpaceRef,
}

impl Color {
    /// Colour from raw pixel bytes of `space`.
    ///
    /// # Panics
    /// If `data` does not hold exactly one pixel of `space`.
    pub fn new(data: Vec<u8>, space: ColorSpaceRef) -> Self {
        assert_eq!(data.len(), space.pixel_size(), "colour data must hold one pixel");
        Self { data, space }
    }

    /// 8-bit RGBA colour.
    pub fn rgba8(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { data: vec![r, g, b, a], space: rgba8() }
    }

    /// Fully transparent colour of `space`.
    pub fn transparent(space: &ColorSpaceRef) -> Self {
        Self { data: space.from_rgba8([0, 0, 0, 0]), space: Arc::clone(space) }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn color_space(&self) -> &ColorSpaceRef {
        &self.space
    }

    /// Same colour re-encoded in `space`.
    pub fn converted_to(&self, space: &ColorSpaceRef) -> Color {
        if self.space.id() == space.id() {
            return Self { data: self.data.clone(), space: Arc::clone(space) };
        }
        let rgba = self.space.to_rgba8(&self.data);
        Self { data: space.from_rgba8(rgba), space: Arc::clone(space) }
    }
}

impl fmt::Debug for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Color")
            .field("space", &self.space.id())
            .field("data", &self.data)
            .finish()
    }
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.space.id() == other.space.id() && self.data == other.data
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::rgba8(0, 0, 0, 255)
    }
}

/// Shared RGBA8 colour space.
pub fn rgba8() -> ColorSpaceRef {
    Arc::new(Rgba8ColorSpace)
}

/// Shared GrayA8 colour space.
pub fn gray_a8() -> ColorSpaceRef {
    Arc::new(GrayA8ColorSpace)
}

// ============================================================================
// Shared colour science
// ============================================================================

/// sRGB 8-bit to CIE Lab (D65).
fn rgb_to_lab(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    #[inline]
    fn linearize(c: u8) -> f32 {
        let c = c as f32 / 255.0;
        if c > 0.04045 {
            ((c + 0.055) / 1.055).powf(2.4)
        } else {
            c / 12.92
        }
    }

    #[inline]
    fn f(t: f32) -> f32 {
        if t > 0.008856 {
            t.cbrt()
        } else {
            7.787 * t + 16.0 / 116.0
        }
    }

    let r = linearize(r);
    let g = linearize(g);
    let b = linearize(b);

    let x = (r * 0.4124564 + g * 0.3575761 + b * 0.1804375) / 0.95047;
    let y = r * 0.2126729 + g * 0.7151522 + b * 0.0721750;
    let z = (r * 0.0193339 + g * 0.1191920 + b * 0.9503041) / 1.08883;

    let fx = f(x);
    let fy = f(y);
    let fz = f(z);

    (116.0 * fy - 16.0, 500.0 * (fx - fy), 200.0 * (fy - fz))
}

/// Alpha difference rescaled to the 0-100 difference range.
#[inline]
fn alpha_difference(a: u8, b: u8) -> f32 {
    (a as f32 - b as f32).abs() * 100.0 / 255.0
}

#[inline]
fn clamp_difference(d: f32) -> u8 {
    d.round().clamp(0.0, 100.0) as u8
}

/// Combine a colour difference with an alpha difference.
///
/// Two fully transparent pixels are identical whatever their colour bytes.
#[inline]
fn with_alpha(color_diff: f32, alpha_a: u8, alpha_b: u8) -> u8 {
    if alpha_a == 0 && alpha_b == 0 {
        return 0;
    }
    let da = alpha_difference(alpha_a, alpha_b);
    clamp_difference((color_diff * color_diff + da * da).sqrt())
}

// ============================================================================
// RGBA8
// ============================================================================

/// 8-bit sRGB with straight alpha, 4 bytes per pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rgba8ColorSpace;

impl ColorSpace for Rgba8ColorSpace {
    fn id(&self) -> &'static str {
        "RGBA8"
    }

    fn pixel_size(&self) -> usize {
        4
    }

    #[inline]
    fn opacity_u8(&self, pixel: &[u8]) -> u8 {
        pixel[3]
    }

    fn key(&self, pixel: &[u8]) -> ColorKey {
        let (l, a, b) = rgb_to_lab(pixel[0], pixel[1], pixel[2]);
        ColorKey { lab: [l, a, b], alpha: pixel[3] }
    }

    fn from_rgba8(&self, rgba: [u8; 4]) -> Vec<u8> {
        rgba.to_vec()
    }

    fn to_rgba8(&self, pixel: &[u8]) -> [u8; 4] {
        [pixel[0], pixel[1], pixel[2], pixel[3]]
    }
}

// ============================================================================
// GrayA8
// ============================================================================

/// 8-bit gray with straight alpha, 2 bytes per pixel.
#[derive(Debug, Clone, Copy, Default)]
pub struct GrayA8ColorSpace;

impl ColorSpace for GrayA8ColorSpace {
    fn id(&self) -> &'static str {
        "GRAYA8"
    }

    fn pixel_size(&self) -> usize {
        2
    }

    #[inline]
    fn opacity_u8(&self, pixel: &[u8]) -> u8 {
        pixel[1]
    }

    /// Lightness only; the chroma axes stay at zero.
    fn key(&self, pixel: &[u8]) -> ColorKey {
        let (l, _, _) = rgb_to_lab(pixel[0], pixel[0], pixel[0]);
        ColorKey { lab: [l, 0.0, 0.0], alpha: pixel[1] }
    }

    /// BT.709 luma.
    fn from_rgba8(&self, rgba: [u8; 4]) -> Vec<u8> {
        let luma = 0.2126 * rgba[0] as f32 + 0.7152 * rgba[1] as f32 + 0.0722 * rgba[2] as f32;
        vec![luma.round().clamp(0.0, 255.0) as u8, rgba[3]]
    }

    fn to_rgba8(&self, pixel: &[u8]) -> [u8; 4] {
        [pixel[0], pixel[0], pixel[0], pixel[1]]
    }
}

//! Reference raster: the read-only image the selection is computed against.
//!
//! Pixels are stored row-major as `(height, width, channels)`, matching the
//! ndarray shape used across the crate. The raster can be placed anywhere on
//! the logical plane through its origin; pixels outside the stored area read
//! as fully transparent.

use ndarray::{Array3, ArrayView3};

use crate::color::{Color, ColorSpaceRef};
use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};

/// Read-only, colour-space-tagged image.
#[derive(Debug, Clone)]
pub struct Raster {
    pixels: Vec<u8>,
    bounds: Rect,
    channels: usize,
    space: ColorSpaceRef,
    transparent: Vec<u8>,
}

impl Raster {
    /// Wrap a `(height, width, channels)` image placed at the origin.
    ///
    /// # Arguments
    /// * `image` - Pixel data; channel count must match the colour space
    /// * `space` - Colour space interpreting each pixel
    pub fn new(image: ArrayView3<u8>, space: ColorSpaceRef) -> Result<Self> {
        let (height, width, channels) = image.dim();
        if channels != space.pixel_size() {
            return Err(Error::InvalidChannels { expected: space.pixel_size(), actual: channels });
        }
        let transparent = Color::transparent(&space).data().to_vec();
        Ok(Self {
            pixels: image.iter().copied().collect(),
            bounds: Rect::new(0, 0, width as i32, height as i32),
            channels,
            space,
            transparent,
        })
    }

    /// Build a raster from a flat row-major buffer.
    ///
    /// # Arguments
    /// * `data` - Pixel bytes (length = width * height * pixel size)
    /// * `width` - Image width in pixels
    /// * `height` - Image height in pixels
    /// * `space` - Colour space interpreting each pixel
    pub fn from_vec(data: Vec<u8>, width: usize, height: usize, space: ColorSpaceRef) -> Result<Self> {
        let channels = space.pixel_size();
        let expected = width * height * channels;
        if data.len() != expected {
            return Err(Error::ShapeMismatch { expected, actual: data.len() });
        }
        let transparent = Color::transparent(&space).data().to_vec();
        Ok(Self {
            pixels: data,
            bounds: Rect::new(0, 0, width as i32, height as i32),
            channels,
            space,
            transparent,
        })
    }

    /// Move the raster so its top-left pixel sits at `origin`.
    pub fn with_origin(mut self, origin: Point) -> Self {
        self.bounds.x = origin.x;
        self.bounds.y = origin.y;
        self
    }

    /// Area covered by stored pixels.
    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn color_space(&self) -> &ColorSpaceRef {
        &self.space
    }

    /// Pixel bytes at `(x, y)`; transparent outside the stored area.
    #[inline]
    pub fn pixel(&self, x: i32, y: i32) -> &[u8] {
        if !self.bounds.contains(x, y) {
            return &self.transparent;
        }
        let col = (x - self.bounds.x) as usize;
        let row = (y - self.bounds.y) as usize;
        let start = (row * self.bounds.width as usize + col) * self.channels;
        &self.pixels[start..start + self.channels]
    }

    /// Colour of the pixel at `(x, y)`.
    pub fn color_at(&self, x: i32, y: i32) -> Color {
        Color::new(self.pixel(x, y).to_vec(), self.space.clone())
    }

    /// Copy of the stored pixels as a `(height, width, channels)` array.
    pub fn to_array(&self) -> Array3<u8> {
        Array3::from_shape_fn(
            (self.bounds.height as usize, self.bounds.width as usize, self.channels),
            |(y, x, c)| self.pixels[(y * self.bounds.width as usize + x) * self.channels + c],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{gray_a8, rgba8};

    #[test]
    fn test_channel_mismatch_is_rejected() {
        let image = Array3::<u8>::zeros((2, 2, 3));
        assert!(matches!(
            Raster::new(image.view(), rgba8()),
            Err(Error::InvalidChannels { expected: 4, actual: 3 })
        ));
    }

    #[test]
    fn test_pixel_lookup_with_origin() {
        let mut image = Array3::<u8>::zeros((2, 3, 2));
        image[[1, 2, 0]] = 77;
        image[[1, 2, 1]] = 255;
        let raster = Raster::new(image.view(), gray_a8()).unwrap().with_origin(Point::new(10, 20));

        assert_eq!(raster.pixel(12, 21), &[77, 255]);
        assert_eq!(raster.pixel(0, 0), &[0, 0]);
        assert_eq!(raster.bounds(), Rect::new(10, 20, 3, 2));
        assert_eq!(raster.to_array(), image);
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(Raster::from_vec(vec![0; 15], 2, 2, rgba8()).is_err());
        let raster = Raster::from_vec(vec![1, 2, 3, 4], 1, 1, rgba8()).unwrap();
        assert_eq!(raster.color_at(0, 0), Color::rgba8(1, 2, 3, 4));
    }
}

//! Selection masks.
//!
//! A mask is a byte-per-pixel selection raster (0 = unselected, 255 = fully
//! selected) over an unbounded logical plane. Storage is only materialised
//! for the rectangle that has been written to; every pixel outside that
//! extent reads as the mask's default value, which is what makes `invert`
//! meaningful on an unbounded plane.
//!
//! Masks never share storage. Composition (`apply_selection`) always merges
//! another mask into an explicit destination.

use ndarray::{s, Array2, ArrayView2};

use crate::error::{Error, Result};
use crate::geometry::{Point, Rect};

/// Selection strength of an unselected pixel.
pub const MIN_SELECTED: u8 = 0;
/// Selection strength of a fully selected pixel.
pub const MAX_SELECTED: u8 = 255;

/// Read-only access to a selection raster.
///
/// This is the narrow interface the engine needs from the enclosing mask and
/// from an existing selection: pixel reads, rectangle reads and the tight
/// bounding box of the selected pixels.
pub trait MaskSource {
    /// Selection strength at `(x, y)`.
    fn pixel(&self, x: i32, y: i32) -> u8;

    /// Value of every pixel outside `extent()`.
    fn default_pixel(&self) -> u8;

    /// Rectangle outside of which every pixel equals `default_pixel()`.
    fn extent(&self) -> Rect;

    /// Tight bounding box of the pixels with non-zero strength.
    fn selected_exact_rect(&self) -> Rect;

    /// Copy one row segment starting at `(x, y)` into `buf`.
    fn read_row(&self, buf: &mut [u8], x: i32, y: i32) {
        for (i, v) in buf.iter_mut().enumerate() {
            *v = self.pixel(x + i as i32, y);
        }
    }

    /// Copy a rectangle into a new `(height, width)` array.
    fn read_bytes(&self, rect: Rect) -> Array2<u8> {
        if rect.is_empty() {
            return Array2::zeros((0, 0));
        }
        let mut out = Array2::<u8>::zeros((rect.height as usize, rect.width as usize));
        let mut row = vec![0u8; rect.width as usize];
        for dy in 0..rect.height {
            self.read_row(&mut row, rect.x, rect.y + dy);
            out.row_mut(dy as usize)
                .iter_mut()
                .zip(row.iter())
                .for_each(|(d, &s)| *d = s);
        }
        out
    }
}

/// How a mask is merged into a destination mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionAction {
    /// Destination becomes a copy of the source.
    Replace,
    /// Union: per-pixel maximum.
    Add,
    /// Difference: destination minus source, saturating at zero.
    Subtract,
    /// Intersection: per-pixel minimum.
    Intersect,
}

impl SelectionAction {
    #[inline]
    fn combine(self, dst: u8, src: u8) -> u8 {
        match self {
            SelectionAction::Replace => src,
            SelectionAction::Add => dst.max(src),
            SelectionAction::Subtract => dst.saturating_sub(src),
            SelectionAction::Intersect => dst.min(src),
        }
    }
}

/// Owned selection raster.
#[derive(Debug, Clone)]
pub struct Mask {
    extent: Rect,
    data: Array2<u8>,
    default_value: u8,
    // Buffer kept from a cleared mask so a reused scratch mask can
    // materialise without reallocating
    spare: Vec<u8>,
}

impl PartialEq for Mask {
    fn eq(&self, other: &Self) -> bool {
        self.extent == other.extent
            && self.default_value == other.default_value
            && self.data == other.data
    }
}

impl Eq for Mask {}

impl Default for Mask {
    fn default() -> Self {
        Self::new()
    }
}

impl Mask {
    /// Empty mask: nothing selected anywhere.
    pub fn new() -> Self {
        Self {
            extent: Rect::EMPTY,
            data: Array2::zeros((0, 0)),
            default_value: MIN_SELECTED,
            spare: Vec::new(),
        }
    }

    /// Mask with `rect` filled with `value` and nothing selected elsewhere.
    pub fn from_rect(rect: Rect, value: u8) -> Self {
        if rect.is_empty() {
            return Self::new();
        }
        Self {
            extent: rect,
            data: Array2::from_elem((rect.height as usize, rect.width as usize), value),
            default_value: MIN_SELECTED,
            spare: Vec::new(),
        }
    }

    /// Wrap a `(height, width)` array whose top-left pixel sits at `origin`.
    pub fn from_array(origin: Point, data: Array2<u8>) -> Self {
        let (height, width) = data.dim();
        if height == 0 || width == 0 {
            return Self::new();
        }
        Self {
            extent: Rect::new(origin.x, origin.y, width as i32, height as i32),
            data,
            default_value: MIN_SELECTED,
            spare: Vec::new(),
        }
    }

    /// Build a mask at the origin from a flat row-major buffer.
    ///
    /// # Arguments
    /// * `data` - Selection bytes (length = width * height)
    /// * `width` - Mask width in pixels
    /// * `height` - Mask height in pixels
    pub fn from_vec(data: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        let expected = width * height;
        if data.len() != expected {
            return Err(Error::ShapeMismatch { expected, actual: data.len() });
        }
        let array = Array2::from_shape_vec((height, width), data)
            .map_err(|e| Error::InvalidParameter(e.to_string()))?;
        Ok(Self::from_array(Point::new(0, 0), array))
    }

    /// Materialised storage as a `(height, width)` view.
    pub fn data(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }

    /// Reset to the empty mask, keeping the allocation for later reuse.
    pub fn clear(&mut self) {
        let (mut buffer, _) = std::mem::replace(&mut self.data, Array2::zeros((0, 0))).into_raw_vec_and_offset();
        if buffer.capacity() > self.spare.capacity() {
            buffer.clear();
            self.spare = buffer;
        }
        self.extent = Rect::EMPTY;
        self.data = Array2::zeros((0, 0));
        self.default_value = MIN_SELECTED;
    }

    fn allocate(&mut self, rect: Rect, value: u8) -> Array2<u8> {
        let shape = (rect.height as usize, rect.width as usize);
        let mut buffer = std::mem::take(&mut self.spare);
        buffer.clear();
        buffer.resize(shape.0 * shape.1, value);
        Array2::from_shape_vec(shape, buffer).unwrap_or_else(|_| Array2::from_elem(shape, value))
    }

    /// Grow the materialised storage so it covers `rect`.
    ///
    /// Newly materialised pixels take the default value, so the logical
    /// content of the mask does not change.
    pub fn ensure_extent(&mut self, rect: Rect) {
        if rect.is_empty() || self.extent.contains_rect(&rect) {
            return;
        }
        let target = self.extent.united(&rect);
        let mut data = self.allocate(target, self.default_value);
        if !self.extent.is_empty() {
            let ox = (self.extent.x - target.x) as usize;
            let oy = (self.extent.y - target.y) as usize;
            data.slice_mut(s![
                oy..oy + self.extent.height as usize,
                ox..ox + self.extent.width as usize
            ])
            .assign(&self.data);
        }
        self.extent = target;
        self.data = data;
    }

    #[inline]
    fn index(&self, x: i32, y: i32) -> Option<(usize, usize)> {
        if self.extent.contains(x, y) {
            Some(((y - self.extent.y) as usize, (x - self.extent.x) as usize))
        } else {
            None
        }
    }

    /// Write one pixel, materialising storage if needed.
    pub fn set_pixel(&mut self, x: i32, y: i32, value: u8) {
        if !self.extent.contains(x, y) {
            if value == self.default_value {
                return;
            }
            self.ensure_extent(Rect::new(x, y, 1, 1));
        }
        if let Some(idx) = self.index(x, y) {
            self.data[idx] = value;
        }
    }

    /// Write a `(height, width)` block with its top-left pixel at `(x, y)`.
    pub fn write_bytes(&mut self, x: i32, y: i32, block: ArrayView2<u8>) {
        let (height, width) = block.dim();
        let rect = Rect::new(x, y, width as i32, height as i32);
        if rect.is_empty() {
            return;
        }
        self.ensure_extent(rect);
        let ox = (x - self.extent.x) as usize;
        let oy = (y - self.extent.y) as usize;
        self.data
            .slice_mut(s![oy..oy + height, ox..ox + width])
            .assign(&block);
    }

    /// Invert every pixel of the plane, including the unmaterialised ones.
    pub fn invert(&mut self) {
        self.data.mapv_inplace(|v| MAX_SELECTED - v);
        self.default_value = MAX_SELECTED - self.default_value;
    }

    /// Merge `other` into this mask.
    pub fn apply_selection<M: MaskSource + ?Sized>(&mut self, other: &M, action: SelectionAction) {
        let new_default = action.combine(self.default_value, other.default_pixel());
        let work = self.extent.united(&other.extent());
        self.ensure_extent(work);

        if !work.is_empty() {
            let mut row = vec![0u8; work.width as usize];
            for dy in 0..work.height {
                other.read_row(&mut row, work.x, work.y + dy);
                let oy = (work.y + dy - self.extent.y) as usize;
                let ox = (work.x - self.extent.x) as usize;
                let mut dst = self.data.slice_mut(s![oy, ox..ox + work.width as usize]);
                dst.iter_mut()
                    .zip(row.iter())
                    .for_each(|(d, &s)| *d = action.combine(*d, s));
            }
        }

        self.default_value = new_default;
        self.compact();
    }

    /// Shrink storage to the bounding box of pixels that differ from the
    /// default value.
    pub fn compact(&mut self) {
        let bounds = self.bounds_where(|v| v != self.default_value);
        if bounds == self.extent {
            return;
        }
        if bounds.is_empty() {
            self.extent = Rect::EMPTY;
            self.data = Array2::zeros((0, 0));
            return;
        }
        let ox = (bounds.x - self.extent.x) as usize;
        let oy = (bounds.y - self.extent.y) as usize;
        self.data = self
            .data
            .slice(s![
                oy..oy + bounds.height as usize,
                ox..ox + bounds.width as usize
            ])
            .to_owned();
        self.extent = bounds;
    }

    fn bounds_where(&self, pred: impl Fn(u8) -> bool) -> Rect {
        let (height, width) = self.data.dim();
        let mut min_x = width;
        let mut min_y = height;
        let mut max_x = 0usize;
        let mut max_y = 0usize;
        let mut found = false;
        for ((y, x), &v) in self.data.indexed_iter() {
            if pred(v) {
                found = true;
                min_x = min_x.min(x);
                min_y = min_y.min(y);
                max_x = max_x.max(x);
                max_y = max_y.max(y);
            }
        }
        if !found {
            return Rect::EMPTY;
        }
        Rect::from_corners(
            self.extent.x + min_x as i32,
            self.extent.y + min_y as i32,
            self.extent.x + max_x as i32,
            self.extent.y + max_y as i32,
        )
    }

    /// Number of pixels with non-zero strength inside the materialised extent.
    pub fn selected_pixel_count(&self) -> usize {
        self.data.iter().filter(|&&v| v > MIN_SELECTED).count()
    }

    /// True when no pixel of the plane is selected.
    pub fn is_empty(&self) -> bool {
        self.default_value == MIN_SELECTED && self.selected_pixel_count() == 0
    }
}

impl MaskSource for Mask {
    #[inline]
    fn pixel(&self, x: i32, y: i32) -> u8 {
        match self.index(x, y) {
            Some(idx) => self.data[idx],
            None => self.default_value,
        }
    }

    fn default_pixel(&self) -> u8 {
        self.default_value
    }

    fn extent(&self) -> Rect {
        self.extent
    }

    /// For an inverted mask (non-zero default) the selection is unbounded;
    /// the materialised extent is returned in that case.
    fn selected_exact_rect(&self) -> Rect {
        if self.default_value != MIN_SELECTED {
            return self.extent;
        }
        self.bounds_where(|v| v > MIN_SELECTED)
    }

    fn read_row(&self, buf: &mut [u8], x: i32, y: i32) {
        let row_rect = Rect::new(x, y, buf.len() as i32, 1);
        let inside = row_rect.intersected(&self.extent);
        if inside.is_empty() {
            buf.fill(self.default_value);
            return;
        }
        let start = (inside.x - x) as usize;
        let end = start + inside.width as usize;
        buf[..start].fill(self.default_value);
        buf[end..].fill(self.default_value);
        let oy = (y - self.extent.y) as usize;
        let ox = (inside.x - self.extent.x) as usize;
        buf[start..end]
            .iter_mut()
            .zip(self.data.slice(s![oy, ox..ox + inside.width as usize]).iter())
            .for_each(|(d, &s)| *d = s);
    }
}

/// Pool of scratch masks owned by one selector.
///
/// Intermediate masks are checked out, used within a single invocation and
/// handed back; they never escape as part of a result.
#[derive(Debug, Default)]
pub struct ScratchMasks {
    free: Vec<Mask>,
}

impl ScratchMasks {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty mask, reusing a returned one when available.
    pub fn checkout(&mut self) -> Mask {
        self.free.pop().unwrap_or_default()
    }

    /// Return a mask to the pool. Its content is discarded.
    pub fn give_back(&mut self, mut mask: Mask) {
        mask.clear();
        self.free.push(mask);
    }

    /// Number of masks waiting for reuse.
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

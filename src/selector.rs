//! Region selection methods.
//!
//! Every method works inside the tight bounding box of the enclosing mask and
//! is built from the same few steps:
//!
//! - **similar / dissimilar scan**: run a selection policy over every pixel
//!   inside the enclosing mask
//! - **fill from contour**: bounded fills seeded at the enclosing contour,
//!   which reach exactly the regions touching the edge of the enclosing area
//! - **fill until**: the same, but growth stops at a criterion colour
//! - **contour region removal**: clear the result components that touch the
//!   contour
//!
//! A method is a family (what to do) crossed with a target (what the regions
//! are compared against), so the ten methods share four routines.
//!
//! The raw mask of [`RegionSelectionMethod::SelectAllRegions`] is the
//! complement of what the user asked for; the compositor in `engine`
//! inverts it. All other methods produce their result directly.

use std::cell::{OnceCell, RefCell};
use std::fmt;
use std::str::FromStr;

use log::debug;
use ndarray::{Array2, Zip};

use crate::color::Color;
use crate::contour::enclosing_contour_points;
use crate::error::Error;
use crate::fill::{clear_non_zero_component, FillBuffer, ScanlineFill};
use crate::geometry::{Point, Rect};
use crate::mask::{Mask, MaskSource, ScratchMasks, SelectionAction, MAX_SELECTED, MIN_SELECTED};
use crate::options::EncloseOptions;
use crate::policy::{DifferenceKind, DifferencePolicy, SelectionPolicy};
use crate::raster::Raster;

// ============================================================================
// Methods
// ============================================================================

/// Which regions of the enclosing area get selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionSelectionMethod {
    /// Every region not touching the edge of the enclosing area.
    SelectAllRegions,
    SelectRegionsFilledWithSpecificColor,
    SelectRegionsFilledWithTransparent,
    SelectRegionsFilledWithSpecificColorOrTransparent,
    SelectAllRegionsExceptFilledWithSpecificColor,
    SelectAllRegionsExceptFilledWithTransparent,
    SelectAllRegionsExceptFilledWithSpecificColorOrTransparent,
    SelectRegionsSurroundedBySpecificColor,
    SelectRegionsSurroundedByTransparent,
    SelectRegionsSurroundedBySpecificColorOrTransparent,
}

/// What regions are compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionTarget {
    SpecificColor,
    Transparent,
    SpecificColorOrTransparent,
}

/// How a method composes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionFamily {
    All,
    FilledWith(RegionTarget),
    AllExceptFilledWith(RegionTarget),
    SurroundedBy(RegionTarget),
}

use RegionSelectionMethod as M;

// (method, binding name, host configuration name)
const METHOD_NAMES: [(RegionSelectionMethod, &str, &str); 10] = [
    (M::SelectAllRegions, "all_regions", "allRegions"),
    (
        M::SelectRegionsFilledWithSpecificColor,
        "regions_filled_with_specific_color",
        "regionsFilledWithSpecificColor",
    ),
    (
        M::SelectRegionsFilledWithTransparent,
        "regions_filled_with_transparent",
        "regionsFilledWithTransparent",
    ),
    (
        M::SelectRegionsFilledWithSpecificColorOrTransparent,
        "regions_filled_with_specific_color_or_transparent",
        "regionsFilledWithSpecificColorOrTransparent",
    ),
    (
        M::SelectAllRegionsExceptFilledWithSpecificColor,
        "all_regions_except_filled_with_specific_color",
        "allRegionsExceptFilledWithSpecificColor",
    ),
    (
        M::SelectAllRegionsExceptFilledWithTransparent,
        "all_regions_except_filled_with_transparent",
        "allRegionsExceptFilledWithTransparent",
    ),
    (
        M::SelectAllRegionsExceptFilledWithSpecificColorOrTransparent,
        "all_regions_except_filled_with_specific_color_or_transparent",
        "allRegionsExceptFilledWithSpecificColorOrTransparent",
    ),
    (
        M::SelectRegionsSurroundedBySpecificColor,
        "regions_surrounded_by_specific_color",
        "regionsSurroundedBySpecificColor",
    ),
    (
        M::SelectRegionsSurroundedByTransparent,
        "regions_surrounded_by_transparent",
        "regionsSurroundedByTransparent",
    ),
    (
        M::SelectRegionsSurroundedBySpecificColorOrTransparent,
        "regions_surrounded_by_specific_color_or_transparent",
        "regionsSurroundedBySpecificColorOrTransparent",
    ),
];

impl RegionSelectionMethod {
    /// Every method, in declaration order.
    pub const ALL: [RegionSelectionMethod; 10] = [
        M::SelectAllRegions,
        M::SelectRegionsFilledWithSpecificColor,
        M::SelectRegionsFilledWithTransparent,
        M::SelectRegionsFilledWithSpecificColorOrTransparent,
        M::SelectAllRegionsExceptFilledWithSpecificColor,
        M::SelectAllRegionsExceptFilledWithTransparent,
        M::SelectAllRegionsExceptFilledWithSpecificColorOrTransparent,
        M::SelectRegionsSurroundedBySpecificColor,
        M::SelectRegionsSurroundedByTransparent,
        M::SelectRegionsSurroundedBySpecificColorOrTransparent,
    ];

    pub fn family(self) -> RegionFamily {
        use RegionFamily::*;
        use RegionTarget::*;
        match self {
            M::SelectAllRegions => All,
            M::SelectRegionsFilledWithSpecificColor => FilledWith(SpecificColor),
            M::SelectRegionsFilledWithTransparent => FilledWith(Transparent),
            M::SelectRegionsFilledWithSpecificColorOrTransparent => {
                FilledWith(SpecificColorOrTransparent)
            }
            M::SelectAllRegionsExceptFilledWithSpecificColor => AllExceptFilledWith(SpecificColor),
            M::SelectAllRegionsExceptFilledWithTransparent => AllExceptFilledWith(Transparent),
            M::SelectAllRegionsExceptFilledWithSpecificColorOrTransparent => {
                AllExceptFilledWith(SpecificColorOrTransparent)
            }
            M::SelectRegionsSurroundedBySpecificColor => SurroundedBy(SpecificColor),
            M::SelectRegionsSurroundedByTransparent => SurroundedBy(Transparent),
            M::SelectRegionsSurroundedBySpecificColorOrTransparent => {
                SurroundedBy(SpecificColorOrTransparent)
            }
        }
    }

    /// True when the raw mask holds the complement of the requested regions.
    pub fn is_naturally_inverted(self) -> bool {
        matches!(self, M::SelectAllRegions)
    }

    /// Whether the method reads the user's region colour.
    pub fn uses_region_color(self) -> bool {
        match self.family() {
            RegionFamily::All => false,
            RegionFamily::FilledWith(t)
            | RegionFamily::AllExceptFilledWith(t)
            | RegionFamily::SurroundedBy(t) => t != RegionTarget::Transparent,
        }
    }

    /// Snake-case name used by the bindings.
    pub fn name(self) -> &'static str {
        METHOD_NAMES
            .iter()
            .find(|(m, _, _)| *m == self)
            .map(|(_, name, _)| *name)
            .unwrap_or("all_regions")
    }
}

impl fmt::Display for RegionSelectionMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RegionSelectionMethod {
    type Err = Error;

    /// Accepts the snake-case names as well as the camel-case names used in
    /// host tool configurations.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        METHOD_NAMES
            .iter()
            .find(|(_, snake, camel)| *snake == s || *camel == s)
            .map(|(m, _, _)| *m)
            .ok_or_else(|| Error::UnknownMethod(s.to_string()))
    }
}

// ============================================================================
// Selection routines
// ============================================================================

/// Read-only inputs of one region selection.
///
/// Contour points are extracted at most once per selector, the first time a
/// routine needs them. All fills of the selector share one fill buffer.
pub struct RegionSelector<'a, E: MaskSource + ?Sized> {
    enclosing: &'a E,
    rect: Rect,
    reference: &'a Raster,
    options: &'a EncloseOptions,
    contour: OnceCell<Vec<Point>>,
    fills: RefCell<FillBuffer>,
}

impl<'a, E: MaskSource + ?Sized> RegionSelector<'a, E> {
    pub fn new(enclosing: &'a E, reference: &'a Raster, options: &'a EncloseOptions) -> Self {
        Self {
            enclosing,
            rect: enclosing.selected_exact_rect(),
            reference,
            options,
            contour: OnceCell::new(),
            fills: RefCell::new(FillBuffer::new()),
        }
    }

    /// Working rectangle: the enclosing mask's tight bounding box.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Enclosing contour points in row-major order.
    pub fn contour_points(&self) -> &[Point] {
        self.contour
            .get_or_init(|| enclosing_contour_points(self.enclosing, self.rect))
    }

    fn policy(&self, kind: DifferenceKind, color: &Color) -> SelectionPolicy {
        let difference = DifferencePolicy::new(kind, self.reference.color_space(), color);
        SelectionPolicy::new(difference, self.options.threshold, self.options.softness)
    }

    fn target_policy(&self, target: RegionTarget) -> SelectionPolicy {
        match target {
            RegionTarget::SpecificColor => {
                self.policy(DifferenceKind::SpecificColor, &self.options.region_color)
            }
            RegionTarget::Transparent => {
                let transparent = Color::transparent(self.reference.color_space());
                self.policy(DifferenceKind::Transparent, &transparent)
            }
            RegionTarget::SpecificColorOrTransparent => self.policy(
                DifferenceKind::SpecificColorOrTransparent,
                &self.options.region_color,
            ),
        }
    }

    fn fill_from(&self, seed: Point) -> ScanlineFill<'a> {
        ScanlineFill::new(self.reference, seed, self.rect)
            .with_threshold(self.options.threshold)
            .with_softness(self.options.softness)
    }

    /// Scan the enclosing area, writing `strength(pixel)` where it is non-zero.
    fn scan(&self, result: &mut Mask, strength: impl Fn(&[u8]) -> u8) -> usize {
        if self.rect.is_empty() {
            return 0;
        }
        let enclosing = self.enclosing.read_bytes(self.rect);
        let mut selected = Array2::<u8>::zeros(enclosing.dim());
        let mut count = 0usize;
        let (x0, y0) = (self.rect.x, self.rect.y);
        Zip::indexed(&mut selected).and(&enclosing).for_each(|(row, col), out, &inside| {
            if inside == MIN_SELECTED {
                return;
            }
            let s = strength(self.reference.pixel(x0 + col as i32, y0 + row as i32));
            if s > MIN_SELECTED {
                *out = s;
                count += 1;
            }
        });
        if count > 0 {
            result.apply_selection(&Mask::from_array(Point::new(x0, y0), selected), SelectionAction::Add);
        }
        count
    }

    /// Select the pixels matching `policy` inside the enclosing area.
    ///
    /// # Returns
    /// Number of pixels with non-zero strength
    pub fn select_similar_regions(&self, result: &mut Mask, policy: &SelectionPolicy) -> usize {
        self.scan(result, |pixel| policy.selection_for(pixel))
    }

    /// Select the pixels *not* matching `policy` inside the enclosing area.
    pub fn select_dissimilar_regions(&self, result: &mut Mask, policy: &SelectionPolicy) -> usize {
        self.scan(result, |pixel| MAX_SELECTED - policy.selection_for(pixel))
    }

    /// Fill every region touching the enclosing contour.
    pub fn select_regions_from_contour(&self, result: &mut Mask) {
        let mut buffer = self.fills.borrow_mut();
        for &point in self.contour_points() {
            if result.pixel(point.x, point.y) == MAX_SELECTED {
                continue;
            }
            self.fill_from(point)
                .fill_selection_with_boundary(result, self.enclosing, &mut buffer);
        }
    }

    /// Fill from the contour inwards until pixels matching `color` (or, with
    /// `or_transparent`, transparent pixels) are met.
    pub fn select_regions_from_contour_until(&self, result: &mut Mask, color: &Color, or_transparent: bool) {
        let mut buffer = self.fills.borrow_mut();
        for &point in self.contour_points() {
            if result.pixel(point.x, point.y) == MAX_SELECTED {
                continue;
            }
            let fill = self.fill_from(point);
            if or_transparent {
                fill.fill_selection_until_color_or_transparent_with_boundary(
                    result,
                    color,
                    self.enclosing,
                    &mut buffer,
                );
            } else {
                fill.fill_selection_until_color_with_boundary(result, color, self.enclosing, &mut buffer);
            }
        }
    }

    /// Clear every component of `result` that touches the enclosing contour.
    pub fn remove_contour_regions(&self, result: &mut Mask) {
        let mut buffer = self.fills.borrow_mut();
        for &point in self.contour_points() {
            if result.pixel(point.x, point.y) == MIN_SELECTED {
                continue;
            }
            clear_non_zero_component(result, point, self.rect, &mut buffer);
        }
    }

    /// Compute the raw mask of the configured method into `result`.
    ///
    /// # Returns
    /// Tight bounding box of the raw mask; empty when nothing was selected
    pub fn compute(&self, result: &mut Mask, scratch: &mut ScratchMasks) -> Rect {
        let method = self.options.method;
        debug!("computing {} over {:?}", method, self.rect);
        match method.family() {
            RegionFamily::All => {
                self.select_regions_from_contour(result);
                result.selected_exact_rect()
            }
            RegionFamily::FilledWith(RegionTarget::SpecificColorOrTransparent) => {
                self.select_filled_with_color_or_transparent(result, scratch)
            }
            RegionFamily::FilledWith(target) => {
                let policy = self.target_policy(target);
                self.select_filled_with(result, &policy)
            }
            RegionFamily::AllExceptFilledWith(target) => {
                let policy = self.target_policy(target);
                self.select_all_except_filled_with(result, scratch, &policy)
            }
            RegionFamily::SurroundedBy(target) => {
                let policy = self.target_policy(target);
                let or_transparent = target == RegionTarget::SpecificColorOrTransparent;
                self.select_surrounded_by(result, scratch, &policy, or_transparent)
            }
        }
    }

    fn select_filled_with(&self, result: &mut Mask, policy: &SelectionPolicy) -> Rect {
        if self.select_similar_regions(result, policy) == 0 {
            debug!("no pixel matches the region criterion");
            return Rect::EMPTY;
        }
        if !self.options.include_contour_regions {
            self.remove_contour_regions(result);
        }
        result.selected_exact_rect()
    }

    // Colour and transparency are selected separately so that contour
    // regions are removed independently when they touch each other.
    fn select_filled_with_color_or_transparent(&self, result: &mut Mask, scratch: &mut ScratchMasks) -> Rect {
        let color_policy = self.policy(DifferenceKind::SpecificColor, &self.options.region_color);
        let halo_policy = SelectionPolicy::hard(
            DifferencePolicy::new(
                DifferenceKind::TransparentForHalos,
                self.reference.color_space(),
                &self.options.region_color,
            ),
            self.options.threshold,
        );

        self.select_filled_with(result, &color_policy);
        let mut transparent = scratch.checkout();
        self.select_filled_with(&mut transparent, &halo_policy);
        result.apply_selection(&transparent, SelectionAction::Add);
        scratch.give_back(transparent);
        result.selected_exact_rect()
    }

    fn select_all_except_filled_with(
        &self,
        result: &mut Mask,
        scratch: &mut ScratchMasks,
        policy: &SelectionPolicy,
    ) -> Rect {
        self.contour_points();
        if self.select_dissimilar_regions(result, policy) == 0 {
            debug!("every pixel matches the region criterion");
            return Rect::EMPTY;
        }
        if !self.options.include_contour_regions {
            // Contour regions may span several patches of the matching
            // colour, so they come from a fill rather than from `result`
            let mut contour_regions = scratch.checkout();
            self.select_regions_from_contour(&mut contour_regions);
            result.apply_selection(&contour_regions, SelectionAction::Subtract);
            scratch.give_back(contour_regions);
        }
        result.selected_exact_rect()
    }

    fn select_surrounded_by(
        &self,
        result: &mut Mask,
        scratch: &mut ScratchMasks,
        policy: &SelectionPolicy,
        or_transparent: bool,
    ) -> Rect {
        if self.contour_points().is_empty() {
            return Rect::EMPTY;
        }
        // The fill reaches everything around the enclosed regions
        self.select_regions_from_contour_until(result, policy.color(), or_transparent);
        result.invert();
        result.apply_selection(self.enclosing, SelectionAction::Intersect);

        if !self.options.include_surrounding_regions {
            let mut surrounding = scratch.checkout();
            self.select_similar_regions(&mut surrounding, policy);
            result.apply_selection(&surrounding, SelectionAction::Subtract);
            scratch.give_back(surrounding);
        }
        self.remove_contour_regions(result);
        result.selected_exact_rect()
    }
}

//! Grid geometry for the page editor.
//!
//! Pure functions for breakpoint selection, column and row sizing, placing a
//! new item beneath the current skyline, and snapping resize gestures onto the
//! allowed tile sizes. Nothing here knows about brick types; the per-type
//! sizing lives in [`crate::brick_rules`].

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

/// Viewport width (px) at and above which the desktop grid is used.
pub const DEFAULT_BREAKPOINT_PX: f64 = 768.0;

/// Column count of the mobile grid.
pub const DEFAULT_MOBILE_COLS: u32 = 2;

/// Column count of the desktop grid.
pub const DEFAULT_DESKTOP_COLS: u32 = 4;

/// Horizontal and vertical gap between grid cells (px).
pub const DEFAULT_MARGIN_PX: f64 = 16.0;

/// Row height used when a square row height cannot be derived (px).
pub const DEFAULT_ROW_HEIGHT_PX: f64 = 80.0;

/// Tile widths a resize gesture may snap to.
pub const DEFAULT_RESIZE_WIDTHS: &[u32] = &[1, 2];

/// Tile heights a resize gesture may snap to.
pub const DEFAULT_RESIZE_HEIGHTS: &[u32] = &[2, 4];

/// Tile heights used instead when the item allows single-row heights.
pub const DEFAULT_COMPACT_RESIZE_HEIGHTS: &[u32] = &[1, 2, 4];

// ---------------------------------------------------------------------------
// Breakpoints and responsive values
// ---------------------------------------------------------------------------

/// One of the two supported viewport width classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Breakpoint {
    Mobile,
    Desktop,
}

impl Breakpoint {
    /// Both breakpoints, mobile first.
    pub const ALL: [Breakpoint; 2] = [Breakpoint::Mobile, Breakpoint::Desktop];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Desktop => "desktop",
        }
    }

    /// The opposite breakpoint.
    pub fn other(self) -> Self {
        match self {
            Self::Mobile => Self::Desktop,
            Self::Desktop => Self::Mobile,
        }
    }
}

/// A value held once per breakpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Responsive<T> {
    pub mobile: T,
    pub desktop: T,
}

impl<T> Responsive<T> {
    pub fn new(mobile: T, desktop: T) -> Self {
        Self { mobile, desktop }
    }

    /// Build a value for each breakpoint from a closure.
    pub fn from_fn(mut f: impl FnMut(Breakpoint) -> T) -> Self {
        Self {
            mobile: f(Breakpoint::Mobile),
            desktop: f(Breakpoint::Desktop),
        }
    }

    pub fn get(&self, breakpoint: Breakpoint) -> &T {
        match breakpoint {
            Breakpoint::Mobile => &self.mobile,
            Breakpoint::Desktop => &self.desktop,
        }
    }

    pub fn get_mut(&mut self, breakpoint: Breakpoint) -> &mut T {
        match breakpoint {
            Breakpoint::Mobile => &mut self.mobile,
            Breakpoint::Desktop => &mut self.desktop,
        }
    }
}

/// Grid cell coordinates of an item's top-left corner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPosition {
    pub x: u32,
    pub y: u32,
}

/// Cell span of an item.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub w: u32,
    pub h: u32,
}

/// Sizing bounds enforced on an item while it is laid out and resized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridConstraints {
    pub min_w: u32,
    pub max_w: u32,
    pub min_h: u32,
    pub max_h: u32,
    pub is_resizable: bool,
}

/// One entry of the drag/resize grid's layout for a single breakpoint.
///
/// Field names follow the grid library's wire format (`minW`, `isResizable`,
/// `static`). Constraint fields are optional because layouts reported back by
/// the library after a drag do not always carry them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutItem {
    pub i: String,
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_w: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_h: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_h: Option<u32>,
    #[serde(default = "default_resizable")]
    pub is_resizable: bool,
    #[serde(default, rename = "static")]
    pub is_static: bool,
}

fn default_resizable() -> bool {
    true
}

impl LayoutItem {
    /// Build a layout item carrying the given constraints.
    pub fn new(
        id: impl Into<String>,
        position: GridPosition,
        size: GridSize,
        constraints: GridConstraints,
    ) -> Self {
        Self {
            i: id.into(),
            x: position.x,
            y: position.y,
            w: size.w,
            h: size.h,
            min_w: Some(constraints.min_w),
            max_w: Some(constraints.max_w),
            min_h: Some(constraints.min_h),
            max_h: Some(constraints.max_h),
            is_resizable: constraints.is_resizable,
            is_static: false,
        }
    }

    pub fn position(&self) -> GridPosition {
        GridPosition {
            x: self.x,
            y: self.y,
        }
    }

    pub fn size(&self) -> GridSize {
        GridSize {
            w: self.w,
            h: self.h,
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Candidate tile sizes a resize gesture snaps onto.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResizeCandidates {
    pub widths: Vec<u32>,
    pub heights: Vec<u32>,
    /// Used in place of `heights` when the item's `min_h` is 1 or less.
    pub compact_heights: Vec<u32>,
}

impl Default for ResizeCandidates {
    fn default() -> Self {
        Self {
            widths: DEFAULT_RESIZE_WIDTHS.to_vec(),
            heights: DEFAULT_RESIZE_HEIGHTS.to_vec(),
            compact_heights: DEFAULT_COMPACT_RESIZE_HEIGHTS.to_vec(),
        }
    }
}

/// Product-level grid settings shared by every page.
#[derive(Debug, Clone, PartialEq)]
pub struct GridConfig {
    /// Viewport width (px) at which the desktop grid takes over.
    pub breakpoint_px: f64,
    /// Column count per breakpoint.
    pub cols: Responsive<u32>,
    /// `[x, y]` gap between cells (px).
    pub margin: [f64; 2],
    /// `[x, y]` padding inside the grid container (px).
    pub container_padding: [f64; 2],
    pub resize: ResizeCandidates,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            breakpoint_px: DEFAULT_BREAKPOINT_PX,
            cols: Responsive::new(DEFAULT_MOBILE_COLS, DEFAULT_DESKTOP_COLS),
            margin: [DEFAULT_MARGIN_PX, DEFAULT_MARGIN_PX],
            container_padding: [0.0, 0.0],
            resize: ResizeCandidates::default(),
        }
    }
}

impl GridConfig {
    pub fn cols(&self, breakpoint: Breakpoint) -> u32 {
        *self.cols.get(breakpoint)
    }

    /// Breakpoint for a viewport of the given width.
    pub fn breakpoint_for(&self, width: f64) -> Breakpoint {
        get_breakpoint(width, self.breakpoint_px)
    }

    /// Row height that renders a two-row media tile as a square at `width`.
    pub fn square_row_height(&self, width: f64, row_span: u32) -> f64 {
        let breakpoint = self.breakpoint_for(width);
        let column_width = get_column_width(
            width,
            self.cols(breakpoint),
            self.margin[0],
            self.container_padding[0],
        );
        get_row_height_for_square(column_width, row_span, self.margin[1])
    }
}

// ---------------------------------------------------------------------------
// Sizing
// ---------------------------------------------------------------------------

/// Select the breakpoint for a viewport width. Desktop when `width >= threshold`.
pub fn get_breakpoint(width: f64, threshold: f64) -> Breakpoint {
    if width >= threshold {
        Breakpoint::Desktop
    } else {
        Breakpoint::Mobile
    }
}

/// Width of a single column once margins and padding are taken out.
///
/// Returns `0.0` for a grid without columns.
pub fn get_column_width(total_width: f64, cols: u32, margin_x: f64, padding_x: f64) -> f64 {
    if cols == 0 {
        return 0.0;
    }
    let cols_f = f64::from(cols);
    (total_width - margin_x * (cols_f - 1.0) - 2.0 * padding_x) / cols_f
}

/// Row height such that `row_span` rows plus their inner margins equal
/// `column_width`, so a one-column, `row_span`-row tile renders square.
///
/// Falls back to [`DEFAULT_ROW_HEIGHT_PX`] when the result is not a positive
/// finite number.
pub fn get_row_height_for_square(column_width: f64, row_span: u32, margin_y: f64) -> f64 {
    let span = f64::from(row_span);
    let height = (column_width - margin_y * (span - 1.0)) / span;
    if height.is_finite() && height > 0.0 {
        height
    } else {
        DEFAULT_ROW_HEIGHT_PX
    }
}

// ---------------------------------------------------------------------------
// Placement
// ---------------------------------------------------------------------------

/// Place a new item of `item_width` columns beneath the current skyline.
///
/// Each column's height is the lowest free row below every existing item that
/// covers it. Every start column `x` in `[0, cols - item_width]` is scored by
/// the tallest column it would span; the lowest score wins and the leftmost
/// start wins ties. Existing items are never moved.
pub fn find_column_stack_position(
    existing: &[LayoutItem],
    cols: u32,
    item_width: u32,
) -> GridPosition {
    if cols == 0 {
        return GridPosition::default();
    }
    let width = item_width.clamp(1, cols) as usize;
    let cols = cols as usize;

    let mut skyline = vec![0u32; cols];
    for item in existing {
        let start = (item.x as usize).min(cols);
        let end = (item.x as usize)
            .saturating_add(item.w as usize)
            .min(cols);
        let bottom = item.y.saturating_add(item.h);
        for column in &mut skyline[start..end] {
            *column = (*column).max(bottom);
        }
    }

    let mut best = GridPosition {
        x: 0,
        y: u32::MAX,
    };
    for x in 0..=(cols - width) {
        let height = skyline[x..x + width].iter().copied().max().unwrap_or(0);
        if height < best.y {
            best = GridPosition {
                x: x as u32,
                y: height,
            };
        }
    }
    best
}

// ---------------------------------------------------------------------------
// Resize snapping
// ---------------------------------------------------------------------------

/// Grid facts a resize gesture is snapped against.
#[derive(Debug, Clone, Copy)]
pub struct ResizeContext<'a> {
    pub cols: u32,
    pub candidates: &'a ResizeCandidates,
}

/// Snap a free-form resize of `item` to `(w, h)` onto the nearest allowed size.
///
/// Widths come from the configured width candidates within
/// `[min_w, min(max_w, cols)]`; heights from the height candidates (or the
/// compact set when `min_h <= 1`) within `[min_h, max_h]`. The nearest pair by
/// Manhattan distance wins, first candidate on ties. Static and non-resizable
/// items pass through untouched. When no configured candidate fits the
/// bounds, the requested value clamped into the bounds is the only candidate.
pub fn resize_ratio_constraint_handler(
    item: &LayoutItem,
    w: u32,
    h: u32,
    context: &ResizeContext<'_>,
) -> GridSize {
    if item.is_static || !item.is_resizable {
        return GridSize { w, h };
    }

    let cols = context.cols.max(1);
    let min_w = item.min_w.unwrap_or(1).max(1);
    let max_w = item.max_w.unwrap_or(cols).min(cols).max(min_w);
    let min_h = item.min_h.unwrap_or(1);
    let max_h = item.max_h.unwrap_or(u32::MAX).max(min_h);

    let height_pool = if min_h <= 1 {
        &context.candidates.compact_heights
    } else {
        &context.candidates.heights
    };

    let widths = candidates_within(&context.candidates.widths, min_w, max_w, w);
    let heights = candidates_within(height_pool, min_h, max_h, h);

    let mut best = GridSize {
        w: widths[0],
        h: heights[0],
    };
    let mut best_distance = u32::MAX;
    for &cw in &widths {
        for &ch in &heights {
            let distance = cw.abs_diff(w).saturating_add(ch.abs_diff(h));
            if distance < best_distance {
                best_distance = distance;
                best = GridSize { w: cw, h: ch };
            }
        }
    }
    best
}

/// Candidates inside `[min, max]`, or the clamped request when none fit.
fn candidates_within(pool: &[u32], min: u32, max: u32, requested: u32) -> Vec<u32> {
    let fitting: Vec<u32> = pool
        .iter()
        .copied()
        .filter(|c| (min..=max).contains(c))
        .collect();
    if fitting.is_empty() {
        vec![requested.clamp(min, max)]
    } else {
        fitting
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, x: u32, y: u32, w: u32, h: u32) -> LayoutItem {
        LayoutItem {
            i: id.to_string(),
            x,
            y,
            w,
            h,
            min_w: None,
            max_w: None,
            min_h: None,
            max_h: None,
            is_resizable: true,
            is_static: false,
        }
    }

    fn media_item() -> LayoutItem {
        LayoutItem {
            min_w: Some(1),
            max_w: Some(2),
            min_h: Some(2),
            max_h: Some(4),
            ..item("m", 0, 0, 1, 2)
        }
    }

    // -- breakpoints / sizing --

    #[test]
    fn test_breakpoint_threshold_is_inclusive() {
        assert_eq!(get_breakpoint(767.9, 768.0), Breakpoint::Mobile);
        assert_eq!(get_breakpoint(768.0, 768.0), Breakpoint::Desktop);
        assert_eq!(get_breakpoint(1440.0, 768.0), Breakpoint::Desktop);
    }

    #[test]
    fn test_breakpoint_other() {
        assert_eq!(Breakpoint::Mobile.other(), Breakpoint::Desktop);
        assert_eq!(Breakpoint::Desktop.other(), Breakpoint::Mobile);
    }

    #[test]
    fn test_column_width() {
        // 4 columns, 3 gaps of 16, no padding: (400 - 48) / 4 = 88
        assert_eq!(get_column_width(400.0, 4, 16.0, 0.0), 88.0);
        // padding is taken from both sides
        assert_eq!(get_column_width(400.0, 2, 16.0, 12.0), 180.0);
    }

    #[test]
    fn test_column_width_without_columns_is_zero() {
        assert_eq!(get_column_width(400.0, 0, 16.0, 0.0), 0.0);
    }

    #[test]
    fn test_square_row_height() {
        // two rows of 36 plus one 16 margin span 88
        assert_eq!(get_row_height_for_square(88.0, 2, 16.0), 36.0);
    }

    #[test]
    fn test_square_row_height_falls_back() {
        assert_eq!(get_row_height_for_square(0.0, 2, 16.0), DEFAULT_ROW_HEIGHT_PX);
        assert_eq!(get_row_height_for_square(10.0, 2, 16.0), DEFAULT_ROW_HEIGHT_PX);
        assert_eq!(get_row_height_for_square(88.0, 0, 16.0), DEFAULT_ROW_HEIGHT_PX);
    }

    #[test]
    fn test_config_square_row_height_uses_breakpoint_columns() {
        let config = GridConfig::default();
        // desktop: 4 columns at 400px wide
        assert_eq!(config.square_row_height(800.0, 2), get_row_height_for_square(188.0, 2, 16.0));
        // mobile: 2 columns at 400px wide
        assert_eq!(config.square_row_height(400.0, 2), get_row_height_for_square(192.0, 2, 16.0));
    }

    // -- placement --

    #[test]
    fn test_stack_position_on_empty_grid() {
        assert_eq!(
            find_column_stack_position(&[], 4, 1),
            GridPosition { x: 0, y: 0 }
        );
    }

    #[test]
    fn test_stack_position_fills_shortest_column() {
        let layout = vec![item("a", 0, 0, 1, 2), item("b", 1, 0, 1, 4)];
        assert_eq!(
            find_column_stack_position(&layout, 2, 1),
            GridPosition { x: 0, y: 2 }
        );
    }

    #[test]
    fn test_stack_position_leftmost_wins_ties() {
        let layout = vec![item("a", 0, 0, 1, 2), item("b", 1, 0, 1, 2)];
        assert_eq!(
            find_column_stack_position(&layout, 2, 1),
            GridPosition { x: 0, y: 2 }
        );
    }

    #[test]
    fn test_stack_position_wide_item_uses_tallest_spanned_column() {
        // skyline: [2, 4, 1, 1]
        let layout = vec![
            item("a", 0, 0, 1, 2),
            item("b", 1, 0, 1, 4),
            item("c", 2, 0, 2, 1),
        ];
        assert_eq!(
            find_column_stack_position(&layout, 4, 2),
            GridPosition { x: 2, y: 1 }
        );
    }

    #[test]
    fn test_stack_position_full_width_goes_below_everything() {
        let layout = vec![item("a", 0, 0, 1, 2), item("b", 3, 0, 1, 5)];
        assert_eq!(
            find_column_stack_position(&layout, 4, 4),
            GridPosition { x: 0, y: 5 }
        );
    }

    #[test]
    fn test_stack_position_clips_items_past_the_last_column() {
        // a desktop-wide item viewed on a two-column grid
        let layout = vec![item("a", 1, 0, 3, 2)];
        assert_eq!(
            find_column_stack_position(&layout, 2, 1),
            GridPosition { x: 0, y: 0 }
        );
    }

    #[test]
    fn test_stack_position_is_minimal_over_all_starts() {
        let layout = vec![
            item("a", 0, 0, 1, 3),
            item("b", 1, 0, 1, 1),
            item("c", 2, 0, 1, 2),
            item("d", 3, 0, 1, 6),
        ];
        let cols = 4;
        for width in 1..=cols {
            let chosen = find_column_stack_position(&layout, cols, width);
            for x in 0..=(cols - width) {
                let height = layout
                    .iter()
                    .filter(|it| it.x < x + width && it.x + it.w > x)
                    .map(|it| it.y + it.h)
                    .max()
                    .unwrap_or(0);
                assert!(chosen.y <= height, "width {width}: x={x} beats chosen");
            }
        }
    }

    #[test]
    fn test_stack_position_without_columns() {
        assert_eq!(find_column_stack_position(&[], 0, 1), GridPosition::default());
    }

    // -- resize snapping --

    #[test]
    fn test_resize_snaps_to_nearest_candidate() {
        let candidates = ResizeCandidates::default();
        let ctx = ResizeContext { cols: 4, candidates: &candidates };
        let it = media_item();
        assert_eq!(resize_ratio_constraint_handler(&it, 2, 3, &ctx), GridSize { w: 2, h: 2 });
        assert_eq!(resize_ratio_constraint_handler(&it, 3, 5, &ctx), GridSize { w: 2, h: 4 });
        assert_eq!(resize_ratio_constraint_handler(&it, 1, 1, &ctx), GridSize { w: 1, h: 2 });
    }

    #[test]
    fn test_resize_respects_column_count() {
        let candidates = ResizeCandidates::default();
        let ctx = ResizeContext { cols: 1, candidates: &candidates };
        let it = media_item();
        assert_eq!(resize_ratio_constraint_handler(&it, 2, 4, &ctx), GridSize { w: 1, h: 4 });
    }

    #[test]
    fn test_resize_uses_compact_heights_for_single_row_items() {
        let candidates = ResizeCandidates::default();
        let ctx = ResizeContext { cols: 4, candidates: &candidates };
        let it = LayoutItem {
            min_h: Some(1),
            max_h: Some(4),
            ..media_item()
        };
        assert_eq!(resize_ratio_constraint_handler(&it, 1, 1, &ctx), GridSize { w: 1, h: 1 });
    }

    #[test]
    fn test_resize_passes_through_static_and_fixed_items() {
        let candidates = ResizeCandidates::default();
        let ctx = ResizeContext { cols: 4, candidates: &candidates };
        let fixed = LayoutItem {
            is_resizable: false,
            ..media_item()
        };
        let pinned = LayoutItem {
            is_static: true,
            ..media_item()
        };
        assert_eq!(resize_ratio_constraint_handler(&fixed, 3, 3, &ctx), GridSize { w: 3, h: 3 });
        assert_eq!(resize_ratio_constraint_handler(&pinned, 3, 3, &ctx), GridSize { w: 3, h: 3 });
    }

    #[test]
    fn test_resize_result_always_in_candidate_set() {
        let candidates = ResizeCandidates::default();
        let bounds = [(1, 2, 2, 4), (1, 1, 2, 2), (1, 2, 1, 4), (2, 2, 4, 4), (1, 4, 1, 1)];
        for cols in 1..=4 {
            let ctx = ResizeContext { cols, candidates: &candidates };
            for (min_w, max_w, min_h, max_h) in bounds {
                let it = LayoutItem {
                    min_w: Some(min_w),
                    max_w: Some(max_w),
                    min_h: Some(min_h),
                    max_h: Some(max_h),
                    ..media_item()
                };
                let pool = if min_h <= 1 { &candidates.compact_heights } else { &candidates.heights };
                for w in 0..6 {
                    for h in 0..6 {
                        let out = resize_ratio_constraint_handler(&it, w, h, &ctx);
                        assert!(candidates.widths.contains(&out.w), "{out:?} for ({w},{h})");
                        assert!(pool.contains(&out.h), "{out:?} for ({w},{h})");
                        assert!(out.w >= min_w && out.w <= max_w.max(min_w));
                        assert!(out.h >= min_h && out.h <= max_h);
                    }
                }
            }
        }
    }

    #[test]
    fn test_layout_item_wire_names() {
        let it = LayoutItem::new(
            "b1",
            GridPosition { x: 1, y: 2 },
            GridSize { w: 1, h: 2 },
            GridConstraints {
                min_w: 1,
                max_w: 2,
                min_h: 2,
                max_h: 4,
                is_resizable: true,
            },
        );
        let json = serde_json::to_value(&it).unwrap();
        assert_eq!(json["minW"], 1);
        assert_eq!(json["maxH"], 4);
        assert_eq!(json["isResizable"], true);
        assert_eq!(json["static"], false);

        let parsed: LayoutItem =
            serde_json::from_value(serde_json::json!({"i": "b1", "x": 0, "y": 3, "w": 2, "h": 2}))
                .unwrap();
        assert!(parsed.is_resizable);
        assert!(!parsed.is_static);
        assert_eq!(parsed.min_w, None);
    }
}

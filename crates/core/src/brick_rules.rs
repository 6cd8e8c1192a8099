//! Per-type brick rules: default payloads and grid sizing.
//!
//! This is the single place that decides what a new brick of a given type
//! looks like. Adding a brick type means adding a [`BrickRule`] and a payload
//! factory arm here; the domain model and reducer stay untouched.

use crate::brick::{
    BrickData, BrickType, ImageBrickData, LinkBrickData, MapBrickData, TextBrickData,
    VideoBrickData,
};
use crate::grid::{GridConstraints, GridSize};

// ---------------------------------------------------------------------------
// Sizing constants
// ---------------------------------------------------------------------------

/// Default width of a media tile (columns).
pub const MEDIA_DEFAULT_W: u32 = 1;

/// Default height of a media tile (rows).
pub const MEDIA_DEFAULT_H: u32 = 2;

/// Widest a media tile may be resized to (columns), before the grid's own limit.
pub const MEDIA_MAX_W: u32 = 2;

/// Shortest a media tile may be (rows).
pub const MEDIA_MIN_H: u32 = 2;

/// Tallest a media tile may be (rows).
pub const MEDIA_MAX_H: u32 = 4;

/// Height of a freshly created text brick (rows).
pub const TEXT_DEFAULT_H: u32 = 1;

/// Fixed footprint of a map brick.
pub const MAP_SIZE: GridSize = GridSize { w: 2, h: 4 };

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Grid sizing policy for one family of brick types.
pub trait BrickRule: Send + Sync {
    /// Size of a freshly created brick on a grid of `cols` columns.
    fn resolve_grid(&self, cols: u32) -> GridSize;

    /// Bounds applied while laying out and resizing a brick of size `grid`.
    fn resolve_constraints(&self, cols: u32, grid: GridSize) -> GridConstraints;
}

/// Small resizable tile (link, image, video).
#[derive(Debug, Clone, Copy)]
pub struct MediaRule;

impl BrickRule for MediaRule {
    fn resolve_grid(&self, cols: u32) -> GridSize {
        GridSize {
            w: MEDIA_DEFAULT_W.min(cols.max(1)),
            h: MEDIA_DEFAULT_H,
        }
    }

    fn resolve_constraints(&self, cols: u32, _grid: GridSize) -> GridConstraints {
        GridConstraints {
            min_w: 1,
            max_w: MEDIA_MAX_W.min(cols.max(1)),
            min_h: MEDIA_MIN_H,
            max_h: MEDIA_MAX_H,
            is_resizable: true,
        }
    }
}

/// Spans every column at its current height; never resized by hand (text).
///
/// The height follows the measured text and is changed through the reducer's
/// row-span updates, not through the grid.
#[derive(Debug, Clone, Copy)]
pub struct FullWidthRule;

impl BrickRule for FullWidthRule {
    fn resolve_grid(&self, cols: u32) -> GridSize {
        GridSize {
            w: cols.max(1),
            h: TEXT_DEFAULT_H,
        }
    }

    fn resolve_constraints(&self, cols: u32, grid: GridSize) -> GridConstraints {
        let cols = cols.max(1);
        let h = grid.h.max(1);
        GridConstraints {
            min_w: cols,
            max_w: cols,
            min_h: h,
            max_h: h,
            is_resizable: false,
        }
    }
}

/// Fixed footprint, never resized (map).
#[derive(Debug, Clone, Copy)]
pub struct FixedRule {
    pub size: GridSize,
}

impl FixedRule {
    fn fitted(&self, cols: u32) -> GridSize {
        GridSize {
            w: self.size.w.min(cols.max(1)),
            h: self.size.h,
        }
    }
}

impl BrickRule for FixedRule {
    fn resolve_grid(&self, cols: u32) -> GridSize {
        self.fitted(cols)
    }

    fn resolve_constraints(&self, cols: u32, _grid: GridSize) -> GridConstraints {
        let size = self.fitted(cols);
        GridConstraints {
            min_w: size.w,
            max_w: size.w,
            min_h: size.h,
            max_h: size.h,
            is_resizable: false,
        }
    }
}

static MEDIA_RULE: MediaRule = MediaRule;
static FULL_WIDTH_RULE: FullWidthRule = FullWidthRule;
static MAP_RULE: FixedRule = FixedRule { size: MAP_SIZE };

/// The sizing rule governing `brick_type`.
pub fn rule_for(brick_type: BrickType) -> &'static dyn BrickRule {
    match brick_type {
        BrickType::Text => &FULL_WIDTH_RULE,
        BrickType::Link | BrickType::Image | BrickType::Video => &MEDIA_RULE,
        BrickType::Map => &MAP_RULE,
    }
}

// ---------------------------------------------------------------------------
// Payload factories
// ---------------------------------------------------------------------------

/// Caller-supplied content for a new brick. Fields a type does not use are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrickPayload {
    pub text: Option<String>,
    /// Link target (link), or the media URL (image, video).
    pub url: Option<String>,
    /// Click-through target of an image or video.
    pub link_url: Option<String>,
    pub map: Option<MapBrickData>,
}

/// Build the default payload of a new `brick_type` brick.
pub fn default_brick_data(brick_type: BrickType, payload: BrickPayload) -> BrickData {
    match brick_type {
        BrickType::Text => BrickData::Text(TextBrickData {
            text: payload.text.unwrap_or_default(),
        }),
        BrickType::Link => BrickData::Link(LinkBrickData {
            url: payload.url.unwrap_or_default(),
            ..LinkBrickData::default()
        }),
        BrickType::Image => BrickData::Image(ImageBrickData {
            image_url: payload.url.unwrap_or_default(),
            link_url: payload.link_url,
        }),
        BrickType::Video => BrickData::Video(VideoBrickData {
            video_url: payload.url.unwrap_or_default(),
            link_url: payload.link_url,
        }),
        BrickType::Map => BrickData::Map(payload.map.unwrap_or_default()),
    }
}

//! Page grid domain model.
//!
//! Pure functions over a page's brick collection: creating and updating
//! bricks, projecting them into per-breakpoint grid layouts and back, and
//! converting them to and from the persisted [`PageLayoutSnapshot`].
//!
//! Persisted JSON is untrusted. [`parse_page_layout_snapshot`] never fails:
//! malformed input yields an empty page and malformed bricks are dropped one
//! by one (each drop is logged at `debug`).

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};

use serde::Serialize;
use serde_json::{Map, Value};

use crate::brick::{Brick, BrickData, BrickStatus, BrickStyle, BrickType};
use crate::brick_rules::{default_brick_data, rule_for, BrickPayload};
use crate::grid::{
    find_column_stack_position, Breakpoint, GridConfig, GridPosition, GridSize, LayoutItem,
    Responsive,
};
use crate::types::{BrickId, Timestamp};

/// The persisted layout of a page: every persistable brick, status stripped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageLayoutSnapshot {
    pub bricks: Vec<Brick>,
}

impl PageLayoutSnapshot {
    /// JSON value written to the page record.
    pub fn to_json(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

// ---------------------------------------------------------------------------
// Creation and update
// ---------------------------------------------------------------------------

/// Input for [`create_page_grid_brick`].
#[derive(Debug, Clone)]
pub struct CreateBrickInput<'a> {
    pub id: BrickId,
    pub brick_type: BrickType,
    pub status: BrickStatus,
    pub payload: BrickPayload,
    /// Bricks already on the page; the new brick is stacked beneath them.
    pub bricks: &'a [Brick],
    /// Creation time. Defaults to now.
    pub timestamp: Option<Timestamp>,
}

/// Create a brick sized by its type's rule and placed on the shortest column
/// stack of each breakpoint.
pub fn create_page_grid_brick(input: CreateBrickInput<'_>, config: &GridConfig) -> Brick {
    let now = input.timestamp.unwrap_or_else(chrono::Utc::now);
    let rule = rule_for(input.brick_type);
    let layouts = build_layouts_from_bricks(input.bricks, config);

    let sizes = Responsive::from_fn(|bp| rule.resolve_grid(config.cols(bp)));
    let position = Responsive::from_fn(|bp| {
        find_column_stack_position(layouts.get(bp), config.cols(bp), sizes.get(bp).w)
    });

    Brick {
        id: input.id,
        data: default_brick_data(input.brick_type, input.payload),
        position,
        style: Responsive::from_fn(|bp| BrickStyle {
            grid: *sizes.get(bp),
        }),
        status: input.status,
        created_at: now,
        updated_at: now,
    }
}

/// Input for [`update_page_grid_brick`].
#[derive(Debug, Clone, Default)]
pub struct UpdateBrickInput {
    /// New text of a text brick.
    pub text: Option<String>,
    /// New link target (link) or media URL (image, video).
    pub url: Option<String>,
    pub status: Option<BrickStatus>,
    /// New size at one breakpoint.
    pub grid: Option<(Breakpoint, GridSize)>,
    /// Update time. Defaults to now.
    pub timestamp: Option<Timestamp>,
}

/// Return an updated copy of `brick`.
///
/// `text` only applies to text bricks and `url` only to link, image and video
/// bricks; the brick's type never changes.
pub fn update_page_grid_brick(brick: &Brick, input: UpdateBrickInput) -> Brick {
    let mut next = brick.clone();

    match (&mut next.data, input.text, input.url) {
        (BrickData::Text(data), Some(text), _) => data.text = text,
        (BrickData::Link(data), _, Some(url)) => data.url = url,
        (BrickData::Image(data), _, Some(url)) => data.image_url = url,
        (BrickData::Video(data), _, Some(url)) => data.video_url = url,
        _ => {}
    }
    if let Some(status) = input.status {
        next.status = status;
    }
    if let Some((breakpoint, grid)) = input.grid {
        next.style.get_mut(breakpoint).grid = grid;
    }
    next.updated_at = input.timestamp.unwrap_or_else(chrono::Utc::now);
    next
}

/// Status of a text brick given its text and whether it has focus.
///
/// Blank text is always a draft, focused or not.
pub fn resolve_text_brick_status(text: &str, is_editing: bool) -> BrickStatus {
    if text.trim().is_empty() {
        BrickStatus::Draft
    } else if is_editing {
        BrickStatus::Editing
    } else {
        BrickStatus::Ready
    }
}

// ---------------------------------------------------------------------------
// Layout projection
// ---------------------------------------------------------------------------

/// Project every brick into the grid layout of both breakpoints, attaching
/// each type's constraints. Sizes are clamped into those constraints.
pub fn build_layouts_from_bricks(
    bricks: &[Brick],
    config: &GridConfig,
) -> Responsive<Vec<LayoutItem>> {
    Responsive::from_fn(|bp| {
        let cols = config.cols(bp);
        bricks
            .iter()
            .map(|brick| {
                let grid = brick.grid_at(bp);
                let constraints = rule_for(brick.brick_type()).resolve_constraints(cols, grid);
                let size = GridSize {
                    w: grid
                        .w
                        .clamp(constraints.min_w, constraints.max_w.max(constraints.min_w)),
                    h: grid
                        .h
                        .clamp(constraints.min_h, constraints.max_h.max(constraints.min_h)),
                };
                LayoutItem::new(brick.id.clone(), brick.position_at(bp), size, constraints)
            })
            .collect()
    })
}

/// Write a breakpoint's layout back onto the bricks.
///
/// Bricks whose layout entry differs from their stored geometry get the new
/// position, size and `updated_at`. When nothing differs the input slice is
/// returned borrowed, so callers can skip work on a no-op.
pub fn apply_layout_to_bricks<'a>(
    bricks: &'a [Brick],
    layout: &[LayoutItem],
    breakpoint: Breakpoint,
    timestamp: Option<Timestamp>,
) -> Cow<'a, [Brick]> {
    let by_id: HashMap<&str, &LayoutItem> =
        layout.iter().map(|item| (item.i.as_str(), item)).collect();
    let now = timestamp.unwrap_or_else(chrono::Utc::now);

    let mut next: Option<Vec<Brick>> = None;
    for (index, brick) in bricks.iter().enumerate() {
        let Some(item) = by_id.get(brick.id.as_str()) else {
            continue;
        };
        if brick.position_at(breakpoint) == item.position()
            && brick.grid_at(breakpoint) == item.size()
        {
            continue;
        }
        let target = &mut next.get_or_insert_with(|| bricks.to_vec())[index];
        *target.position.get_mut(breakpoint) = item.position();
        target.style.get_mut(breakpoint).grid = item.size();
        target.updated_at = now;
    }

    match next {
        Some(bricks) => Cow::Owned(bricks),
        None => Cow::Borrowed(bricks),
    }
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Whether a brick belongs in the persisted snapshot.
///
/// The status must be ready or editing, and a text brick must have
/// non-blank text whatever its status.
pub fn is_persistable(brick: &Brick) -> bool {
    if !brick.status.is_persistable() {
        return false;
    }
    match brick.text() {
        Some(text) => !text.trim().is_empty(),
        None => true,
    }
}

/// Snapshot of the persistable bricks, or `None` when there are none.
///
/// Snapshot bricks carry [`BrickStatus::Ready`], matching what a reload
/// produces, so comparing snapshots ignores editor status.
pub fn serialize_page_layout(bricks: &[Brick]) -> Option<PageLayoutSnapshot> {
    let persisted: Vec<Brick> = bricks
        .iter()
        .filter(|brick| is_persistable(brick))
        .map(|brick| Brick {
            status: BrickStatus::Ready,
            ..brick.clone()
        })
        .collect();

    if persisted.is_empty() {
        None
    } else {
        Some(PageLayoutSnapshot { bricks: persisted })
    }
}

/// Rehydrate bricks from a persisted layout value.
///
/// Anything but an object with a `bricks` array yields an empty list. Each
/// element is validated on its own and dropped when malformed; duplicate ids
/// keep the first occurrence. A brick stored with only one breakpoint gets
/// the other filled from it. Every returned brick is [`BrickStatus::Ready`].
pub fn parse_page_layout_snapshot(value: &Value) -> Vec<Brick> {
    let Some(entries) = value
        .as_object()
        .and_then(|obj| obj.get("bricks"))
        .and_then(Value::as_array)
    else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut bricks = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match parse_brick(entry) {
            Ok(brick) if seen.insert(brick.id.clone()) => bricks.push(brick),
            Ok(brick) => {
                tracing::debug!(index, brick_id = %brick.id, "Dropping duplicate brick id");
            }
            Err(reason) => {
                tracing::debug!(index, reason, "Dropping malformed brick");
            }
        }
    }
    bricks
}

/// Like [`parse_page_layout_snapshot`] for raw JSON text. Unparseable text
/// yields an empty list.
pub fn parse_page_layout_json(text: &str) -> Vec<Brick> {
    serde_json::from_str::<Value>(text)
        .map(|value| parse_page_layout_snapshot(&value))
        .unwrap_or_default()
}

fn parse_brick(value: &Value) -> Result<Brick, &'static str> {
    let obj = value.as_object().ok_or("brick is not an object")?;

    let id = obj
        .get("id")
        .and_then(Value::as_str)
        .ok_or("id is not a string")?;
    let brick_type = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(BrickType::from_name)
        .ok_or("unknown brick type")?;

    let data = obj
        .get("data")
        .filter(|d| d.is_object())
        .ok_or("data is not an object")?;
    let data = BrickData::from_json(brick_type, data.clone()).map_err(|_| "malformed data")?;

    let position = parse_responsive(obj.get("position"), parse_position)
        .ok_or("malformed position")?;
    let style = parse_responsive(obj.get("style"), parse_style).ok_or("malformed style")?;

    let created_at = parse_timestamp(obj.get("created_at")).ok_or("malformed created_at")?;
    let updated_at = parse_timestamp(obj.get("updated_at")).ok_or("malformed updated_at")?;

    Ok(Brick {
        id: id.to_string(),
        data,
        position,
        style,
        status: BrickStatus::Ready,
        created_at,
        updated_at,
    })
}

/// Parse a `{mobile, desktop}` record, filling a missing side from the other.
/// A side that is present but malformed fails the whole record.
fn parse_responsive<T: Copy>(
    value: Option<&Value>,
    parse: impl Fn(&Value) -> Option<T>,
) -> Option<Responsive<T>> {
    let obj = value?.as_object()?;
    let side = |bp: Breakpoint| -> Option<Option<T>> {
        match obj.get(bp.as_str()) {
            None | Some(Value::Null) => Some(None),
            Some(v) => parse(v).map(Some),
        }
    };
    match (side(Breakpoint::Mobile)?, side(Breakpoint::Desktop)?) {
        (Some(mobile), Some(desktop)) => Some(Responsive::new(mobile, desktop)),
        (Some(only), None) | (None, Some(only)) => Some(Responsive::new(only, only)),
        (None, None) => None,
    }
}

fn parse_position(value: &Value) -> Option<GridPosition> {
    let obj = value.as_object()?;
    Some(GridPosition {
        x: cell(obj, "x")?,
        y: cell(obj, "y")?,
    })
}

fn parse_style(value: &Value) -> Option<BrickStyle> {
    let grid = value.as_object()?.get("grid")?.as_object()?;
    Some(BrickStyle {
        grid: GridSize {
            w: cell(grid, "w")?.max(1),
            h: cell(grid, "h")?.max(1),
        },
    })
}

/// A non-negative numeric grid coordinate, rounded to the nearest cell.
fn cell(obj: &Map<String, Value>, key: &str) -> Option<u32> {
    let n = obj.get(key)?.as_f64()?;
    if n.is_finite() && n >= 0.0 && n <= f64::from(u32::MAX) {
        Some(n.round() as u32)
    } else {
        None
    }
}

/// RFC 3339 string, normalised to UTC. Any other string rejects the brick.
fn parse_timestamp(value: Option<&Value>) -> Option<Timestamp> {
    let text = value?.as_str()?;
    chrono::DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|at| at.with_timezone(&chrono::Utc))
}

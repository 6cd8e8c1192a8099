//! Brick data model.
//!
//! A brick is one positioned content unit on a page. Its payload shape is
//! decided by its type, its geometry is held once per breakpoint, and its
//! lifecycle status is transient editor state that never reaches storage.

use serde::{Deserialize, Serialize, Serializer};

use crate::grid::{Breakpoint, GridPosition, GridSize, Responsive};
use crate::types::{BrickId, Timestamp};

// ---------------------------------------------------------------------------
// Type and status
// ---------------------------------------------------------------------------

/// The closed set of brick types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrickType {
    Text,
    Link,
    Image,
    Video,
    Map,
}

impl BrickType {
    /// Every brick type, in wire-name order.
    pub const ALL: [BrickType; 5] = [
        BrickType::Text,
        BrickType::Link,
        BrickType::Image,
        BrickType::Video,
        BrickType::Map,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Link => "link",
            Self::Image => "image",
            Self::Video => "video",
            Self::Map => "map",
        }
    }

    /// Parse a wire name. Unknown names yield `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == name)
    }
}

/// Transient lifecycle tag of a brick inside the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrickStatus {
    Draft,
    Uploading,
    Ready,
    Editing,
    Error,
}

impl BrickStatus {
    /// Whether a brick in this status may be written to the layout snapshot.
    ///
    /// Text bricks additionally need non-empty text; see
    /// [`crate::page_grid::is_persistable`].
    pub fn is_persistable(self) -> bool {
        matches!(self, Self::Ready | Self::Editing)
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextBrickData {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkBrickData {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub site_name: Option<String>,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageBrickData {
    #[serde(default)]
    pub image_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoBrickData {
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub link_url: Option<String>,
}

/// Default map zoom for a freshly placed map brick (whole-world view).
pub const DEFAULT_MAP_ZOOM: f64 = 2.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapBrickData {
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lng: f64,
    #[serde(default = "default_map_zoom")]
    pub zoom: f64,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
}

fn default_map_zoom() -> f64 {
    DEFAULT_MAP_ZOOM
}

impl Default for MapBrickData {
    fn default() -> Self {
        Self {
            lat: 0.0,
            lng: 0.0,
            zoom: DEFAULT_MAP_ZOOM,
            href: None,
            caption: None,
        }
    }
}

/// Type-specific brick payload. The variant is the brick's type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BrickData {
    Text(TextBrickData),
    Link(LinkBrickData),
    Image(ImageBrickData),
    Video(VideoBrickData),
    Map(MapBrickData),
}

impl BrickData {
    pub fn brick_type(&self) -> BrickType {
        match self {
            Self::Text(_) => BrickType::Text,
            Self::Link(_) => BrickType::Link,
            Self::Image(_) => BrickType::Image,
            Self::Video(_) => BrickType::Video,
            Self::Map(_) => BrickType::Map,
        }
    }

    /// Decode the payload of a brick of `brick_type` from its JSON object.
    pub fn from_json(
        brick_type: BrickType,
        value: serde_json::Value,
    ) -> Result<Self, serde_json::Error> {
        Ok(match brick_type {
            BrickType::Text => Self::Text(serde_json::from_value(value)?),
            BrickType::Link => Self::Link(serde_json::from_value(value)?),
            BrickType::Image => Self::Image(serde_json::from_value(value)?),
            BrickType::Video => Self::Video(serde_json::from_value(value)?),
            BrickType::Map => Self::Map(serde_json::from_value(value)?),
        })
    }
}

// ---------------------------------------------------------------------------
// Brick
// ---------------------------------------------------------------------------

/// Per-breakpoint style of a brick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrickStyle {
    pub grid: GridSize,
}

/// A single placeable unit of a page.
///
/// Serializes to the persisted snapshot shape; `status` is left out.
#[derive(Debug, Clone, PartialEq)]
pub struct Brick {
    pub id: BrickId,
    pub data: BrickData,
    pub position: Responsive<GridPosition>,
    pub style: Responsive<BrickStyle>,
    pub status: BrickStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Brick {
    pub fn brick_type(&self) -> BrickType {
        self.data.brick_type()
    }

    pub fn position_at(&self, breakpoint: Breakpoint) -> GridPosition {
        *self.position.get(breakpoint)
    }

    pub fn grid_at(&self, breakpoint: Breakpoint) -> GridSize {
        self.style.get(breakpoint).grid
    }

    /// Text of a text brick, `None` for every other type.
    pub fn text(&self) -> Option<&str> {
        match &self.data {
            BrickData::Text(data) => Some(&data.text),
            _ => None,
        }
    }
}

/// Wire shape of a persisted brick.
#[derive(Serialize)]
struct BrickRecord<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    brick_type: BrickType,
    data: &'a BrickData,
    position: &'a Responsive<GridPosition>,
    style: &'a Responsive<BrickStyle>,
    created_at: &'a Timestamp,
    updated_at: &'a Timestamp,
}

impl Serialize for Brick {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        BrickRecord {
            id: &self.id,
            brick_type: self.brick_type(),
            data: &self.data,
            position: &self.position,
            style: &self.style,
            created_at: &self.created_at,
            updated_at: &self.updated_at,
        }
        .serialize(serializer)
    }
}

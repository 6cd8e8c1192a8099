//! Page grid reducer.
//!
//! [`reduce`] is the only way the editor's brick collection changes. Each
//! action maps to one handler that either returns the input state borrowed
//! (nothing changed) or an owned successor. Callers compare against
//! [`Cow::Borrowed`] to skip work on no-ops.
//!
//! `should_persist_draft` is raised by every change except local row-span
//! measurements and text updates dispatched with `persist: false`. The
//! owner clears it with [`PageGridAction::AcknowledgePersist`] once the
//! layout has been handed to auto-save.

use std::borrow::Cow;

use crate::brick::{Brick, BrickData, BrickStatus, BrickType, LinkBrickData, MapBrickData};
use crate::brick_rules::BrickPayload;
use crate::grid::{Breakpoint, GridConfig, GridSize, LayoutItem};
use crate::media::MediaKind;
use crate::page_grid::{
    apply_layout_to_bricks, create_page_grid_brick, resolve_text_brick_status,
    update_page_grid_brick, CreateBrickInput, UpdateBrickInput,
};
use crate::types::{BrickId, Timestamp};

/// In-memory brick collection of one page being edited.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageGridState {
    pub bricks: Vec<Brick>,
    /// Set when the persisted layout may have changed since the last
    /// acknowledgement.
    pub should_persist_draft: bool,
}

impl PageGridState {
    pub fn new(bricks: Vec<Brick>) -> Self {
        Self {
            bricks,
            should_persist_draft: false,
        }
    }

    pub fn brick(&self, id: &str) -> Option<&Brick> {
        self.bricks.iter().find(|brick| brick.id == id)
    }

    fn position_of(&self, id: &str) -> Option<usize> {
        self.bricks.iter().position(|brick| brick.id == id)
    }
}

/// Everything that can happen to a page grid.
#[derive(Debug, Clone, PartialEq)]
pub enum PageGridAction {
    /// Add an image or video tile while its file uploads.
    AddMediaPlaceholder { id: BrickId, kind: MediaKind },
    /// Attach the uploaded URL to a media placeholder and mark it ready.
    CompleteMediaUpload { id: BrickId, url: String },
    AddTextPlaceholder { id: BrickId },
    AddMapPlaceholder { id: BrickId, data: Option<MapBrickData> },
    /// Add a link tile while its metadata is fetched.
    AddLinkPlaceholder { id: BrickId, url: String },
    UpdateText {
        id: BrickId,
        text: String,
        is_editing: bool,
        /// Measured height at one breakpoint.
        row_span: Option<(Breakpoint, u32)>,
        persist: bool,
    },
    /// Measured height change that must not trigger a save.
    UpdateTextRowSpanLocal {
        id: BrickId,
        breakpoint: Breakpoint,
        row_span: u32,
    },
    RemoveBrick { id: BrickId },
    ApplyLayout {
        layout: Vec<LayoutItem>,
        breakpoint: Breakpoint,
    },
    UpdateMap { id: BrickId, data: MapBrickData },
    /// Replace a link brick's payload and mark it ready.
    UpdateLink { id: BrickId, data: LinkBrickData },
    /// Set or clear the click-through URL of an image or video.
    UpdateMediaLink { id: BrickId, link_url: Option<String> },
    AcknowledgePersist,
}

/// Apply `action` to `state`.
///
/// `now` stamps created and updated bricks.
pub fn reduce<'a>(
    state: &'a PageGridState,
    action: PageGridAction,
    config: &GridConfig,
    now: Timestamp,
) -> Cow<'a, PageGridState> {
    match action {
        PageGridAction::AddMediaPlaceholder { id, kind } => add_brick(
            state,
            config,
            now,
            id,
            kind.brick_type(),
            BrickStatus::Uploading,
            BrickPayload::default(),
        ),
        PageGridAction::CompleteMediaUpload { id, url } => {
            replace_brick(state, &id, true, |brick| complete_media_upload(brick, url, now))
        }
        PageGridAction::AddTextPlaceholder { id } => add_brick(
            state,
            config,
            now,
            id,
            BrickType::Text,
            BrickStatus::Draft,
            BrickPayload::default(),
        ),
        PageGridAction::AddMapPlaceholder { id, data } => add_brick(
            state,
            config,
            now,
            id,
            BrickType::Map,
            BrickStatus::Ready,
            BrickPayload {
                map: data,
                ..BrickPayload::default()
            },
        ),
        PageGridAction::AddLinkPlaceholder { id, url } => add_brick(
            state,
            config,
            now,
            id,
            BrickType::Link,
            BrickStatus::Draft,
            BrickPayload {
                url: Some(url),
                ..BrickPayload::default()
            },
        ),
        PageGridAction::UpdateText {
            id,
            text,
            is_editing,
            row_span,
            persist,
        } => replace_brick(state, &id, persist, |brick| {
            update_text(brick, text, is_editing, row_span, now)
        }),
        PageGridAction::UpdateTextRowSpanLocal {
            id,
            breakpoint,
            row_span,
        } => replace_brick(state, &id, false, |brick| {
            brick.text()?;
            resize_text(brick, breakpoint, row_span, now)
        }),
        PageGridAction::RemoveBrick { id } => remove_brick(state, &id),
        PageGridAction::ApplyLayout { layout, breakpoint } => {
            match apply_layout_to_bricks(&state.bricks, &layout, breakpoint, Some(now)) {
                Cow::Borrowed(_) => Cow::Borrowed(state),
                Cow::Owned(bricks) => Cow::Owned(PageGridState {
                    bricks,
                    should_persist_draft: true,
                }),
            }
        }
        PageGridAction::UpdateMap { id, data } => {
            replace_brick(state, &id, true, |brick| match &brick.data {
                BrickData::Map(current) if *current != data => Some(Brick {
                    data: BrickData::Map(data),
                    updated_at: now,
                    ..brick.clone()
                }),
                _ => None,
            })
        }
        PageGridAction::UpdateLink { id, data } => {
            replace_brick(state, &id, true, |brick| match &brick.data {
                BrickData::Link(current)
                    if *current != data || brick.status != BrickStatus::Ready =>
                {
                    Some(Brick {
                        data: BrickData::Link(data),
                        status: BrickStatus::Ready,
                        updated_at: now,
                        ..brick.clone()
                    })
                }
                _ => None,
            })
        }
        PageGridAction::UpdateMediaLink { id, link_url } => {
            let link_url = link_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty());
            replace_brick(state, &id, true, |brick| update_media_link(brick, link_url, now))
        }
        PageGridAction::AcknowledgePersist => {
            if state.should_persist_draft {
                Cow::Owned(PageGridState {
                    bricks: state.bricks.clone(),
                    should_persist_draft: false,
                })
            } else {
                Cow::Borrowed(state)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

fn add_brick<'a>(
    state: &'a PageGridState,
    config: &GridConfig,
    now: Timestamp,
    id: BrickId,
    brick_type: BrickType,
    status: BrickStatus,
    payload: BrickPayload,
) -> Cow<'a, PageGridState> {
    if state.position_of(&id).is_some() {
        tracing::debug!(brick_id = %id, "Ignoring placeholder with an existing id");
        return Cow::Borrowed(state);
    }
    let brick = create_page_grid_brick(
        CreateBrickInput {
            id,
            brick_type,
            status,
            payload,
            bricks: &state.bricks,
            timestamp: Some(now),
        },
        config,
    );
    let mut bricks = state.bricks.clone();
    bricks.push(brick);
    Cow::Owned(PageGridState {
        bricks,
        should_persist_draft: true,
    })
}

/// Swap the brick `id` for the output of `update`. `update` returns `None`
/// when the brick would not change.
fn replace_brick<'a>(
    state: &'a PageGridState,
    id: &str,
    persist: bool,
    update: impl FnOnce(&Brick) -> Option<Brick>,
) -> Cow<'a, PageGridState> {
    let Some(index) = state.position_of(id) else {
        return Cow::Borrowed(state);
    };
    let Some(next) = update(&state.bricks[index]) else {
        return Cow::Borrowed(state);
    };
    let mut bricks = state.bricks.clone();
    bricks[index] = next;
    Cow::Owned(PageGridState {
        bricks,
        should_persist_draft: state.should_persist_draft || persist,
    })
}

fn remove_brick<'a>(state: &'a PageGridState, id: &str) -> Cow<'a, PageGridState> {
    if state.position_of(id).is_none() {
        return Cow::Borrowed(state);
    }
    Cow::Owned(PageGridState {
        bricks: state
            .bricks
            .iter()
            .filter(|brick| brick.id != id)
            .cloned()
            .collect(),
        should_persist_draft: true,
    })
}

fn complete_media_upload(brick: &Brick, url: String, now: Timestamp) -> Option<Brick> {
    let current = match &brick.data {
        BrickData::Image(data) => &data.image_url,
        BrickData::Video(data) => &data.video_url,
        _ => return None,
    };
    if *current == url && brick.status == BrickStatus::Ready {
        return None;
    }
    Some(update_page_grid_brick(
        brick,
        UpdateBrickInput {
            url: Some(url),
            status: Some(BrickStatus::Ready),
            timestamp: Some(now),
            ..UpdateBrickInput::default()
        },
    ))
}

fn update_text(
    brick: &Brick,
    text: String,
    is_editing: bool,
    row_span: Option<(Breakpoint, u32)>,
    now: Timestamp,
) -> Option<Brick> {
    let current = brick.text()?;
    let status = resolve_text_brick_status(&text, is_editing);
    let grid = row_span.map(|(breakpoint, span)| {
        let size = GridSize {
            w: brick.grid_at(breakpoint).w,
            h: span.max(1),
        };
        (breakpoint, size)
    });

    let grid_unchanged = grid.map_or(true, |(bp, size)| brick.grid_at(bp) == size);
    if current == text && brick.status == status && grid_unchanged {
        return None;
    }
    Some(update_page_grid_brick(
        brick,
        UpdateBrickInput {
            text: Some(text),
            status: Some(status),
            grid,
            timestamp: Some(now),
            ..UpdateBrickInput::default()
        },
    ))
}

fn resize_text(brick: &Brick, breakpoint: Breakpoint, row_span: u32, now: Timestamp) -> Option<Brick> {
    let size = GridSize {
        w: brick.grid_at(breakpoint).w,
        h: row_span.max(1),
    };
    if brick.grid_at(breakpoint) == size {
        return None;
    }
    Some(update_page_grid_brick(
        brick,
        UpdateBrickInput {
            grid: Some((breakpoint, size)),
            timestamp: Some(now),
            ..UpdateBrickInput::default()
        },
    ))
}

fn update_media_link(brick: &Brick, link_url: Option<String>, now: Timestamp) -> Option<Brick> {
    let mut next = brick.clone();
    let slot = match &mut next.data {
        BrickData::Image(data) => &mut data.link_url,
        BrickData::Video(data) => &mut data.link_url,
        _ => return None,
    };
    if *slot == link_url {
        return None;
    }
    *slot = link_url;
    next.updated_at = now;
    Some(next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::{ImageBrickData, VideoBrickData};
    use crate::page_grid::{build_layouts_from_bricks, serialize_page_layout};
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn at(second: u32) -> Timestamp {
        chrono::Utc.with_ymd_and_hms(2025, 4, 1, 9, 0, second).unwrap()
    }

    fn step(state: &PageGridState, action: PageGridAction) -> PageGridState {
        reduce(state, action, &GridConfig::default(), at(1)).into_owned()
    }

    fn text_update(id: &str, text: &str, is_editing: bool) -> PageGridAction {
        PageGridAction::UpdateText {
            id: id.into(),
            text: text.into(),
            is_editing,
            row_span: None,
            persist: true,
        }
    }

    fn with_image() -> PageGridState {
        step(
            &PageGridState::default(),
            PageGridAction::AddMediaPlaceholder {
                id: "img".into(),
                kind: MediaKind::Image,
            },
        )
    }

    #[test]
    fn test_text_lifecycle() {
        let state = step(&PageGridState::default(), PageGridAction::AddTextPlaceholder { id: "t".into() });
        assert_eq!(state.brick("t").unwrap().status, BrickStatus::Draft);
        assert!(state.should_persist_draft);

        let state = step(&state, text_update("t", "Hello", true));
        assert_eq!(state.brick("t").unwrap().status, BrickStatus::Editing);

        let state = step(&state, text_update("t", "Hello", false));
        assert_eq!(state.brick("t").unwrap().status, BrickStatus::Ready);

        let state = step(&state, text_update("t", "  ", false));
        assert_eq!(state.brick("t").unwrap().status, BrickStatus::Draft);

        let state = step(&state, PageGridAction::RemoveBrick { id: "t".into() });
        assert!(state.bricks.is_empty());
    }

    #[test]
    fn test_media_placeholder_then_upload() {
        let state = with_image();
        let brick = state.brick("img").unwrap();
        assert_eq!(brick.status, BrickStatus::Uploading);
        assert_eq!(brick.brick_type(), BrickType::Image);
        assert!(serialize_page_layout(&state.bricks).is_none());

        let state = step(
            &state,
            PageGridAction::CompleteMediaUpload {
                id: "img".into(),
                url: "https://cdn/1.png".into(),
            },
        );
        let brick = state.brick("img").unwrap();
        assert_eq!(brick.status, BrickStatus::Ready);
        assert_matches!(&brick.data, BrickData::Image(ImageBrickData { image_url, .. }) if image_url == "https://cdn/1.png");
        assert_eq!(serialize_page_layout(&state.bricks).unwrap().bricks.len(), 1);
    }

    #[test]
    fn test_complete_upload_ignores_missing_and_non_media() {
        let state = step(&PageGridState::default(), PageGridAction::AddTextPlaceholder { id: "t".into() });
        for id in ["t", "missing"] {
            let next = reduce(
                &state,
                PageGridAction::CompleteMediaUpload {
                    id: id.into(),
                    url: "u".into(),
                },
                &GridConfig::default(),
                at(2),
            );
            assert_matches!(next, Cow::Borrowed(_));
        }
    }

    #[test]
    fn test_duplicate_placeholder_id_is_a_no_op() {
        let state = with_image();
        let next = reduce(
            &state,
            PageGridAction::AddTextPlaceholder { id: "img".into() },
            &GridConfig::default(),
            at(2),
        );
        assert_matches!(next, Cow::Borrowed(_));
    }

    #[test]
    fn test_unchanged_text_update_is_borrowed() {
        let state = step(&PageGridState::default(), PageGridAction::AddTextPlaceholder { id: "t".into() });
        let state = step(&state, text_update("t", "Hi", false));
        let next = reduce(&state, text_update("t", "Hi", false), &GridConfig::default(), at(5));
        assert_matches!(next, Cow::Borrowed(s) if std::ptr::eq(s, &state));
    }

    #[test]
    fn test_local_row_span_does_not_request_persist() {
        let state = step(&PageGridState::default(), PageGridAction::AddTextPlaceholder { id: "t".into() });
        let state = step(&state, PageGridAction::AcknowledgePersist);
        assert!(!state.should_persist_draft);

        let state = step(
            &state,
            PageGridAction::UpdateTextRowSpanLocal {
                id: "t".into(),
                breakpoint: Breakpoint::Desktop,
                row_span: 3,
            },
        );
        assert_eq!(state.brick("t").unwrap().grid_at(Breakpoint::Desktop).h, 3);
        assert_eq!(state.brick("t").unwrap().grid_at(Breakpoint::Mobile).h, 1);
        assert!(!state.should_persist_draft);
    }

    #[test]
    fn test_non_persisting_text_update_keeps_flag_clear() {
        let state = step(&PageGridState::default(), PageGridAction::AddTextPlaceholder { id: "t".into() });
        let state = step(&state, PageGridAction::AcknowledgePersist);
        let state = step(
            &state,
            PageGridAction::UpdateText {
                id: "t".into(),
                text: "typing".into(),
                is_editing: true,
                row_span: Some((Breakpoint::Mobile, 2)),
                persist: false,
            },
        );
        assert_eq!(state.brick("t").unwrap().text(), Some("typing"));
        assert_eq!(state.brick("t").unwrap().grid_at(Breakpoint::Mobile).h, 2);
        assert!(!state.should_persist_draft);
    }

    #[test]
    fn test_non_persisting_update_keeps_pending_flag() {
        let state = step(&PageGridState::default(), PageGridAction::AddTextPlaceholder { id: "t".into() });
        assert!(state.should_persist_draft);
        let state = step(
            &state,
            PageGridAction::UpdateText {
                id: "t".into(),
                text: "x".into(),
                is_editing: true,
                row_span: None,
                persist: false,
            },
        );
        assert!(state.should_persist_draft);
    }

    #[test]
    fn test_row_span_ignored_for_non_text() {
        let state = with_image();
        let next = reduce(
            &state,
            PageGridAction::UpdateTextRowSpanLocal {
                id: "img".into(),
                breakpoint: Breakpoint::Desktop,
                row_span: 4,
            },
            &GridConfig::default(),
            at(2),
        );
        assert_matches!(next, Cow::Borrowed(_));
    }

    #[test]
    fn test_apply_layout_twice_returns_same_state() {
        let state = with_image();
        let state = step(&state, PageGridAction::AcknowledgePersist);
        let mut layout = build_layouts_from_bricks(&state.bricks, &GridConfig::default()).desktop;
        layout[0].x = 3;
        let action = PageGridAction::ApplyLayout {
            layout,
            breakpoint: Breakpoint::Desktop,
        };

        let state = step(&state, action.clone());
        assert_eq!(state.brick("img").unwrap().position.desktop.x, 3);
        assert!(state.should_persist_draft);

        let again = reduce(&state, action, &GridConfig::default(), at(3));
        assert_matches!(again, Cow::Borrowed(s) if std::ptr::eq(s, &state));
    }

    #[test]
    fn test_link_placeholder_becomes_ready_with_metadata() {
        let state = step(
            &PageGridState::default(),
            PageGridAction::AddLinkPlaceholder {
                id: "l".into(),
                url: "https://a.dev/".into(),
            },
        );
        assert_eq!(state.brick("l").unwrap().status, BrickStatus::Draft);
        assert!(serialize_page_layout(&state.bricks).is_none());

        let data = LinkBrickData {
            url: "https://a.dev/".into(),
            title: Some("A".into()),
            ..LinkBrickData::default()
        };
        let state = step(&state, PageGridAction::UpdateLink { id: "l".into(), data: data.clone() });
        let brick = state.brick("l").unwrap();
        assert_eq!(brick.status, BrickStatus::Ready);
        assert_eq!(brick.data, BrickData::Link(data.clone()));

        let again = reduce(&state, PageGridAction::UpdateLink { id: "l".into(), data }, &GridConfig::default(), at(4));
        assert_matches!(again, Cow::Borrowed(_));
    }

    #[test]
    fn test_map_placeholder_is_ready_and_updatable() {
        let state = step(
            &PageGridState::default(),
            PageGridAction::AddMapPlaceholder { id: "m".into(), data: None },
        );
        assert_eq!(state.brick("m").unwrap().status, BrickStatus::Ready);
        assert_eq!(serialize_page_layout(&state.bricks).unwrap().bricks.len(), 1);

        let data = MapBrickData {
            lat: 37.5,
            lng: 127.0,
            zoom: 12.0,
            caption: Some("Seoul".into()),
            ..MapBrickData::default()
        };
        let state = step(&state, PageGridAction::UpdateMap { id: "m".into(), data: data.clone() });
        assert_eq!(state.brick("m").unwrap().data, BrickData::Map(data.clone()));
        let again = reduce(&state, PageGridAction::UpdateMap { id: "m".into(), data }, &GridConfig::default(), at(4));
        assert_matches!(again, Cow::Borrowed(_));
    }

    #[test]
    fn test_media_link_is_trimmed_and_cleared() {
        let state = step(
            &PageGridState::default(),
            PageGridAction::AddMediaPlaceholder {
                id: "v".into(),
                kind: MediaKind::Video,
            },
        );
        let state = step(
            &state,
            PageGridAction::UpdateMediaLink {
                id: "v".into(),
                link_url: Some("  https://x.dev ".into()),
            },
        );
        assert_matches!(&state.brick("v").unwrap().data, BrickData::Video(VideoBrickData { link_url: Some(u), .. }) if u == "https://x.dev");

        let state = step(
            &state,
            PageGridAction::UpdateMediaLink {
                id: "v".into(),
                link_url: Some("   ".into()),
            },
        );
        assert_matches!(&state.brick("v").unwrap().data, BrickData::Video(VideoBrickData { link_url: None, .. }));
    }

    #[test]
    fn test_remove_missing_brick_is_borrowed() {
        let state = with_image();
        let next = reduce(&state, PageGridAction::RemoveBrick { id: "nope".into() }, &GridConfig::default(), at(2));
        assert_matches!(next, Cow::Borrowed(_));
    }

    #[test]
    fn test_acknowledge_without_pending_flag_is_borrowed() {
        let state = PageGridState::default();
        let next = reduce(&state, PageGridAction::AcknowledgePersist, &GridConfig::default(), at(2));
        assert_matches!(next, Cow::Borrowed(_));
    }
}

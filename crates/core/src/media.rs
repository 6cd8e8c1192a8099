//! Media uploads for image and video bricks: validation, kind detection and
//! storage paths.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::brick::BrickType;
use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Largest accepted upload (bytes).
pub const MAX_MEDIA_BYTES: u64 = 2_000_000;

/// Recognised image extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "avif"];

/// Recognised video extensions.
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "webm", "mov", "m4v"];

/// Recognised image MIME types.
pub const IMAGE_MIME_TYPES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/webp",
    "image/avif",
];

/// Recognised video MIME types.
pub const VIDEO_MIME_TYPES: &[&str] = &["video/mp4", "video/webm", "video/quicktime", "video/x-m4v"];

pub const FILE_TOO_LARGE_MESSAGE: &str = "File is too large. Maximum size is 2 MB.";
pub const UNSUPPORTED_FILE_MESSAGE: &str =
    "Unsupported file type. Please upload an image (JPG, PNG, GIF, WebP, AVIF) or video (MP4, WebM, MOV).";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which media brick a file can become.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn brick_type(self) -> BrickType {
        match self {
            Self::Image => BrickType::Image,
            Self::Video => BrickType::Video,
        }
    }
}

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub name: String,
    pub mime_type: Option<String>,
    pub data: Vec<u8>,
}

impl MediaFile {
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// Request handed to a [`MediaUploader`].
#[derive(Debug, Clone)]
pub struct MediaUploadRequest {
    pub page_id: DbId,
    pub user_id: DbId,
    /// Logical asset the file belongs to (a brick id, or `cover` for the page
    /// image). Same asset, same storage path.
    pub object_id: String,
    pub file: MediaFile,
}

/// Where an uploaded file ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedMedia {
    pub public_url: String,
    pub path: String,
}

/// Stores media files for a page owner.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, request: MediaUploadRequest) -> Result<UploadedMedia, CoreError>;
}

// ---------------------------------------------------------------------------
// Detection and validation
// ---------------------------------------------------------------------------

/// Lowercased extension of `file_name`, if any.
pub fn file_extension(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Media kind from the file extension, falling back to the MIME type.
pub fn detect_media_kind(file_name: &str, mime_type: Option<&str>) -> Option<MediaKind> {
    if let Some(ext) = file_extension(file_name) {
        if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            return Some(MediaKind::Image);
        }
        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            return Some(MediaKind::Video);
        }
    }

    let mime = mime_type?
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    if IMAGE_MIME_TYPES.contains(&mime.as_str()) {
        Some(MediaKind::Image)
    } else if VIDEO_MIME_TYPES.contains(&mime.as_str()) {
        Some(MediaKind::Video)
    } else {
        None
    }
}

/// User-facing reason `file` cannot be uploaded, or `None` when it can.
///
/// Size is checked before type.
pub fn get_media_validation_error(file: &MediaFile) -> Option<&'static str> {
    if file.size() > MAX_MEDIA_BYTES {
        return Some(FILE_TOO_LARGE_MESSAGE);
    }
    if detect_media_kind(&file.name, file.mime_type.as_deref()).is_none() {
        return Some(UNSUPPORTED_FILE_MESSAGE);
    }
    None
}

/// Validate `file` and return the brick kind it becomes.
pub fn validate_media_file(file: &MediaFile) -> Result<MediaKind, CoreError> {
    if let Some(message) = get_media_validation_error(file) {
        return Err(CoreError::Validation(message.to_string()));
    }
    detect_media_kind(&file.name, file.mime_type.as_deref())
        .ok_or_else(|| CoreError::Validation(UNSUPPORTED_FILE_MESSAGE.to_string()))
}

/// Stable storage path `{user_id}/{page_id}/{object_id}`.
///
/// Only owner, page and asset take part, never the uploaded file name, so a
/// replacement overwrites the previous object even when its extension
/// differs.
pub fn media_storage_path(user_id: DbId, page_id: DbId, object_id: &str) -> String {
    let object_id: String = object_id
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    format!("{user_id}/{page_id}/{object_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, mime: Option<&str>, size: usize) -> MediaFile {
        MediaFile {
            name: name.into(),
            mime_type: mime.map(str::to_string),
            data: vec![0; size],
        }
    }

    #[test]
    fn test_detect_by_extension_first() {
        assert_eq!(detect_media_kind("a.PNG", None), Some(MediaKind::Image));
        assert_eq!(detect_media_kind("clip.mov", Some("image/png")), Some(MediaKind::Video));
    }

    #[test]
    fn test_detect_falls_back_to_mime() {
        assert_eq!(detect_media_kind("blob", Some("image/webp")), Some(MediaKind::Image));
        assert_eq!(
            detect_media_kind("capture.bin", Some("video/mp4; codecs=avc1")),
            Some(MediaKind::Video)
        );
        assert_eq!(detect_media_kind("notes.txt", Some("text/plain")), None);
        assert_eq!(detect_media_kind("notes", None), None);
    }

    #[test]
    fn test_validation_checks_size_before_type() {
        assert_eq!(
            get_media_validation_error(&file("x.txt", None, 2_000_001)),
            Some(FILE_TOO_LARGE_MESSAGE)
        );
        assert_eq!(
            get_media_validation_error(&file("x.txt", None, 10)),
            Some(UNSUPPORTED_FILE_MESSAGE)
        );
        assert_eq!(get_media_validation_error(&file("x.jpg", None, 2_000_000)), None);
    }

    #[test]
    fn test_validate_returns_kind() {
        assert_eq!(validate_media_file(&file("v.webm", None, 1)).unwrap(), MediaKind::Video);
        assert!(validate_media_file(&file("v.exe", None, 1)).is_err());
    }

    #[test]
    fn test_storage_path_is_stable() {
        let a = media_storage_path(7, 42, "brick-1");
        assert_eq!(a, "7/42/brick-1");
        assert_eq!(a, media_storage_path(7, 42, "brick-1"));
        assert_ne!(a, media_storage_path(7, 43, "brick-1"));
        assert_eq!(media_storage_path(7, 42, "../../etc"), "7/42/etc");
    }

    #[test]
    fn test_file_extension() {
        assert_eq!(file_extension("a.tar.GZ").as_deref(), Some("gz"));
        assert_eq!(file_extension(".hidden"), None);
        assert_eq!(file_extension("trailing."), None);
    }
}

//! Local-disk media storage.
//!
//! Files land at `{media_root}/{user_id}/{page_id}/{object_id}` and are
//! served back under the configured public base URL. The path depends only
//! on owner, page and asset, so re-uploading an asset overwrites it whatever
//! the new file is called.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use brickpage_core::error::CoreError;
use brickpage_core::media::{
    media_storage_path, validate_media_file, MediaFile, MediaKind, MediaUploadRequest,
    MediaUploader, UploadedMedia, UNSUPPORTED_FILE_MESSAGE,
};

/// [`MediaUploader`] writing to a local directory.
#[derive(Debug, Clone)]
pub struct LocalMediaStorage {
    root: PathBuf,
    public_base_url: String,
}

impl LocalMediaStorage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{path}", self.public_base_url)
    }
}

/// Reject files whose content bytes identify a different kind of media than
/// their name or declared type. Content `infer` does not recognise passes.
fn check_content(file: &MediaFile, kind: MediaKind) -> Result<(), CoreError> {
    let Some(sniffed) = infer::get(&file.data) else {
        return Ok(());
    };
    let matches = match sniffed.matcher_type() {
        infer::MatcherType::Image => kind == MediaKind::Image,
        infer::MatcherType::Video => kind == MediaKind::Video,
        _ => false,
    };
    if matches {
        Ok(())
    } else {
        tracing::debug!(
            file_name = %file.name,
            sniffed = sniffed.mime_type(),
            "Rejecting media with mismatched content"
        );
        Err(CoreError::Validation(UNSUPPORTED_FILE_MESSAGE.to_string()))
    }
}

#[async_trait]
impl MediaUploader for LocalMediaStorage {
    async fn upload(&self, request: MediaUploadRequest) -> Result<UploadedMedia, CoreError> {
        let kind = validate_media_file(&request.file)?;
        check_content(&request.file, kind)?;
        if !request.object_id.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(CoreError::Validation("Invalid media object id".to_string()));
        }

        let path = media_storage_path(request.user_id, request.page_id, &request.object_id);
        let target = self.root.join(&path);
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CoreError::Internal(format!("Failed to create media directory: {e}")))?;
        }
        tokio::fs::write(&target, &request.file.data)
            .await
            .map_err(|e| CoreError::Internal(format!("Failed to write media file: {e}")))?;

        tracing::info!(
            user_id = request.user_id,
            page_id = request.page_id,
            path = %path,
            size = request.file.size(),
            "Media stored",
        );

        Ok(UploadedMedia {
            public_url: self.public_url(&path),
            path,
        })
    }
}

use url::Url;

use crate::{
    classify::{Platform, VideoSource},
    error::{RelayError, RelayResult},
};

pub const VIMEO_THUMBNAIL: &str = "https://i.vimeocdn.com/video/default.jpg";
pub const PLACEHOLDER_THUMBNAIL: &str = "https://via.placeholder.com/320x180?text=Video";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail_url: String,
}

/// Build display metadata from the classified source alone. Nothing is
/// fetched; the only failure is an unknown-platform URL without a hostname.
pub fn synthesize(url: &str, source: &VideoSource) -> RelayResult<VideoMetadata> {
    let meta = match source.platform {
        Platform::YouTube => VideoMetadata {
            title: format!("YouTube Video {}", source.id),
            thumbnail_url: format!("https://img.youtube.com/vi/{}/mqdefault.jpg", source.id),
        },
        Platform::Vimeo => VideoMetadata {
            title: format!("Vimeo Video {}", source.id),
            thumbnail_url: VIMEO_THUMBNAIL.to_string(),
        },
        Platform::Unknown => {
            let parsed = Url::parse(url)
                .map_err(|err| RelayError::InvalidArgument(format!("{url:?}: {err}")))?;
            let host = parsed.host_str().ok_or_else(|| {
                RelayError::InvalidArgument(format!("{url:?}: url has no hostname"))
            })?;

            VideoMetadata {
                title: format!("Video from {host}"),
                thumbnail_url: PLACEHOLDER_THUMBNAIL.to_string(),
            }
        }
    };

    Ok(meta)
}

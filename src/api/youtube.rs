use super::http::Fetcher;
use super::{ResolveRequest, SourceResolver};
use crate::config::Config;
use crate::error::ResolveError;
use crate::models::{PlaybackHint, SourceKind, TrackDraft};
use crate::util::{non_empty, MAX_VIDEO_ID_CHARS};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug, Deserialize)]
struct OEmbed {
    title: Option<String>,
    thumbnail_url: Option<String>,
}

/// Single video links: youtu.be, watch?v=, /shorts/, /embed/, /v/.
pub struct YoutubeResolver {
    fetcher: Fetcher,
    oembed_base: String,
    thumbnail_base: String,
    timeout: Duration,
}

impl YoutubeResolver {
    pub fn new(cfg: &Config, fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            oembed_base: cfg.endpoints.youtube_oembed.clone(),
            thumbnail_base: cfg.endpoints.youtube_thumbnail.trim_end_matches('/').to_string(),
            timeout: cfg.youtube_oembed_timeout(),
        }
    }

    fn thumbnail_for(&self, video_id: &str) -> String {
        format!("{}/vi/{}/hqdefault.jpg", self.thumbnail_base, video_id)
    }

    async fn fetch_oembed(&self, watch_url: &str) -> Option<OEmbed> {
        let url = format!(
            "{}?url={}&format=json",
            self.oembed_base,
            urlencoding::encode(watch_url)
        );
        self.fetcher
            .json::<OEmbed>(self.fetcher.get(&url), Some(self.timeout))
            .await
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

/// Pull the video id out of a YouTube link, or None if there is none.
pub fn extract_video_id(url: &Url) -> Option<String> {
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|p| !p.is_empty()).collect())
        .unwrap_or_default();

    let candidate = if host.contains("youtu.be") {
        segments.first().map(|s| s.to_string())
    } else if host.contains("youtube.com") {
        url.query_pairs()
            .find(|(k, _)| k == "v")
            .map(|(_, v)| v.into_owned())
            .filter(|v| !v.is_empty())
            .or_else(|| match segments.as_slice() {
                [prefix, id, ..] if matches!(*prefix, "shorts" | "embed" | "v") => {
                    Some(id.to_string())
                }
                _ => None,
            })
    } else {
        None
    };

    candidate.filter(|id| is_video_id(id))
}

/// Title used when oEmbed gives us nothing.
fn fallback_title(video_id: &str) -> String {
    format!("YouTube video {}", video_id)
}

fn is_video_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_VIDEO_ID_CHARS
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

#[async_trait]
impl SourceResolver for YoutubeResolver {
    fn name(&self) -> &str {
        "youtube"
    }

    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<TrackDraft>, ResolveError> {
        let video_id = extract_video_id(request.url).ok_or(ResolveError::InvalidYoutubeUrl)?;
        let watch = watch_url(&video_id);

        let meta = self.fetch_oembed(&watch).await;
        if meta.is_none() {
            debug!(video_id = %video_id, "youtube oembed unavailable; using fallbacks");
        }
        let (title, cover) = match meta {
            Some(m) => (non_empty(m.title.as_deref()), non_empty(m.thumbnail_url.as_deref())),
            None => (None, None),
        };
        let title = title.unwrap_or_else(|| fallback_title(&video_id));
        let cover = cover.unwrap_or_else(|| self.thumbnail_for(&video_id));

        let track = TrackDraft::new(SourceKind::Youtube, &watch, &title)
            .with_cover(Some(&cover))
            .with_stream(Some(&watch), PlaybackHint::Youtube)
            .with_player(Some("youtube"), Some(&video_id));
        Ok(vec![track])
    }
}

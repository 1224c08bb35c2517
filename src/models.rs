use crate::error::ResolveError;
use crate::util::{
    clamp_duration, clean_label, clean_title, non_empty, MAX_PLAYER_TYPE_CHARS,
    MAX_SEARCH_CHARS, MAX_VIDEO_ID_CHARS,
};
use serde::{Deserialize, Serialize};

/// Length of a provider preview snippet, in seconds.
pub const PREVIEW_DURATION_SEC: f64 = 30.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Spotify,
    Youtube,
    Soundcloud,
    Bandcamp,
    Mixcloud,
    Direct,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Spotify => "spotify",
            SourceKind::Youtube => "youtube",
            SourceKind::Soundcloud => "soundcloud",
            SourceKind::Bandcamp => "bandcamp",
            SourceKind::Mixcloud => "mixcloud",
            SourceKind::Direct => "direct",
        }
    }

    /// Human label shown next to a track.
    pub fn label(self) -> &'static str {
        match self {
            SourceKind::Spotify => "Spotify",
            SourceKind::Youtube => "YouTube",
            SourceKind::Soundcloud => "SoundCloud",
            SourceKind::Bandcamp => "Bandcamp",
            SourceKind::Mixcloud => "Mixcloud",
            SourceKind::Direct => "Direct Link",
        }
    }

    fn default_hint(self) -> PlaybackHint {
        match self {
            SourceKind::Youtube => PlaybackHint::Youtube,
            SourceKind::Spotify => PlaybackHint::External,
            SourceKind::Soundcloud | SourceKind::Bandcamp | SourceKind::Mixcloud => {
                PlaybackHint::Stream
            }
            SourceKind::Direct => PlaybackHint::AudioDefault,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the caller should render / play a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PlaybackHint {
    Youtube,
    Preview,
    External,
    Stream,
    AudioDefault,
}

/// A short playable snippet found on a secondary provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewAsset {
    pub stream_url: String,
    pub duration_sec: f64,
    pub cover_url: Option<String>,
}

/// Working record used while a link is being resolved. Carries the
/// search hints enrichment needs; converted to `ResolvedTrack` once at the
/// pipeline boundary. Every builder method consumes `self` and returns a
/// new record.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackDraft {
    pub url: String,
    pub title: String,
    pub source: SourceKind,
    pub cover_url: Option<String>,
    pub duration_sec: Option<f64>,
    pub stream_url: Option<String>,
    pub playback_hint: PlaybackHint,
    pub search_title: Option<String>,
    pub search_artist: Option<String>,
    pub player_type: Option<String>,
    pub video_id: Option<String>,
}

impl TrackDraft {
    pub fn new(source: SourceKind, url: &str, title: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            title: clean_title(title),
            source,
            cover_url: None,
            duration_sec: None,
            stream_url: None,
            playback_hint: source.default_hint(),
            search_title: None,
            search_artist: None,
            player_type: None,
            video_id: None,
        }
    }

    pub fn with_title(self, title: &str) -> Self {
        Self {
            title: clean_title(title),
            ..self
        }
    }

    pub fn with_cover(self, cover_url: Option<&str>) -> Self {
        Self {
            cover_url: non_empty(cover_url),
            ..self
        }
    }

    pub fn with_duration(self, seconds: Option<f64>) -> Self {
        Self {
            duration_sec: seconds.and_then(clamp_duration),
            ..self
        }
    }

    /// Attach a stream. An empty or missing stream leaves the record unplayable
    /// with the source's default hint.
    pub fn with_stream(self, stream_url: Option<&str>, hint: PlaybackHint) -> Self {
        match non_empty(stream_url) {
            Some(s) => Self {
                stream_url: Some(s),
                playback_hint: hint,
                ..self
            },
            None => Self {
                stream_url: None,
                playback_hint: self.source.default_hint(),
                ..self
            },
        }
    }

    pub fn with_search(self, title: Option<&str>, artist: Option<&str>) -> Self {
        Self {
            search_title: title.and_then(|t| clean_label(t, MAX_SEARCH_CHARS)),
            search_artist: artist.and_then(|a| clean_label(a, MAX_SEARCH_CHARS)),
            ..self
        }
    }

    pub fn with_player(self, player_type: Option<&str>, video_id: Option<&str>) -> Self {
        Self {
            player_type: player_type.and_then(|p| clean_label(p, MAX_PLAYER_TYPE_CHARS)),
            video_id: video_id.and_then(|v| clean_label(v, MAX_VIDEO_ID_CHARS)),
            ..self
        }
    }

    /// Apply a preview match: the snippet becomes the stream, the duration
    /// becomes the snippet length, and the cover is kept unless missing.
    pub fn with_preview(self, preview: &PreviewAsset) -> Self {
        let cover = self.cover_url.clone().or_else(|| preview.cover_url.clone());
        self.with_stream(Some(&preview.stream_url), PlaybackHint::Preview)
            .with_duration(Some(preview.duration_sec))
            .with_cover(cover.as_deref())
    }

    pub fn is_playable(&self) -> bool {
        self.stream_url.is_some()
    }

    /// Public shape; internal search hints do not survive this conversion.
    pub fn into_resolved(self) -> ResolvedTrack {
        let is_playable = self.is_playable();
        ResolvedTrack {
            url: self.url,
            title: self.title,
            source: self.source,
            source_label: self.source.label().to_string(),
            cover_url: self.cover_url,
            duration_sec: self.duration_sec,
            stream_url: self.stream_url,
            is_playable,
            playback_hint: self.playback_hint,
            player_type: self.player_type,
            video_id: self.video_id,
        }
    }
}

/// A track as handed to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTrack {
    pub url: String,
    pub title: String,
    pub source: SourceKind,
    pub source_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_sec: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_url: Option<String>,
    pub is_playable: bool,
    pub playback_hint: PlaybackHint,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ResolveOptions {
    /// Replaces the derived title when exactly one track comes back.
    pub title_hint: Option<String>,
    /// Requested cap, bounded to [1, 120]; defaults to 120.
    pub max_tracks: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolutionResult {
    pub tracks: Vec<ResolvedTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ResolveError>,
}

impl ResolutionResult {
    pub fn ok(tracks: Vec<ResolvedTrack>) -> Self {
        Self { tracks, error: None }
    }

    pub fn failed(error: ResolveError) -> Self {
        Self {
            tracks: Vec::new(),
            error: Some(error),
        }
    }
}

pub mod deezer;
pub mod http;
pub mod spotify;
pub mod spotify_auth;
pub mod youtube;

use crate::error::ResolveError;
use crate::models::TrackDraft;
use url::Url;

/// One resolution request after input validation.
#[derive(Debug, Clone, Copy)]
pub struct ResolveRequest<'a> {
    pub url: &'a Url,
    /// Already bounded to [1, 120].
    pub max_tracks: usize,
    pub title_hint: Option<&'a str>,
}

/// A per-service resolver: turns a link of its service into track drafts.
/// Upstream failures degrade to fewer or poorer tracks; only input the
/// resolver cannot interpret at all is an error.
#[async_trait::async_trait]
pub trait SourceResolver: Send + Sync {
    /// Return the resolver's name (for logging)
    fn name(&self) -> &str;

    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<TrackDraft>, ResolveError>;
}

use crate::api::deezer::DeezerClient;
use crate::api::http::Fetcher;
use crate::api::spotify::SpotifyResolver;
use crate::api::youtube::YoutubeResolver;
use crate::api::{ResolveRequest, SourceResolver};
use crate::cache::{Clock, PreviewCache, SystemClock, TokenCache};
use crate::classify::classify;
use crate::config::Config;
use crate::enrich::PreviewEnricher;
use crate::error::ResolveError;
use crate::models::{ResolutionResult, ResolveOptions, SourceKind};
use crate::util::clamp_track_limit;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

/// Entry point: one instance per process, shared by every request so the
/// token and preview caches are too.
pub struct Pipeline {
    resolvers: Vec<(SourceKind, Arc<dyn SourceResolver>)>,
    enricher: PreviewEnricher,
}

impl Pipeline {
    pub fn new(cfg: &Config) -> Self {
        Self::with_clock(cfg, Arc::new(SystemClock))
    }

    pub fn with_clock(cfg: &Config, clock: Arc<dyn Clock>) -> Self {
        let fetcher = Fetcher::new(cfg.fetch_timeout());
        let tokens = Arc::new(TokenCache::new());
        let previews = Arc::new(PreviewCache::new(
            cfg.preview_cache_capacity,
            i64::try_from(cfg.preview_cache_ttl_sec)
                .unwrap_or(i64::MAX)
                .saturating_mul(1000),
            clock.clone(),
        ));

        let spotify = SpotifyResolver::new(cfg, fetcher.clone(), tokens, clock);
        let youtube = YoutubeResolver::new(cfg, fetcher.clone());
        let enricher = PreviewEnricher::new(
            DeezerClient::new(cfg, fetcher),
            previews,
            cfg.enrich_concurrency,
        );

        Self {
            resolvers: vec![
                (SourceKind::Spotify, Arc::new(spotify) as Arc<dyn SourceResolver>),
                (SourceKind::Youtube, Arc::new(youtube) as Arc<dyn SourceResolver>),
            ],
            enricher,
        }
    }

    pub fn preview_cache(&self) -> &PreviewCache {
        self.enricher.cache()
    }

    fn resolver_for(&self, source: SourceKind) -> Option<&Arc<dyn SourceResolver>> {
        self.resolvers
            .iter()
            .find(|(kind, _)| *kind == source)
            .map(|(_, r)| r)
    }

    /// Resolve a user-supplied link into tracks. Never fails; bad input is
    /// reported in `error`, upstream trouble only shrinks the result.
    pub async fn resolve_input(&self, raw_url: &str, options: &ResolveOptions) -> ResolutionResult {
        let url = match Url::parse(raw_url.trim()) {
            Ok(u) => u,
            Err(e) => {
                debug!("rejecting input {:?}: {}", raw_url, e);
                return ResolutionResult::failed(ResolveError::InvalidUrl);
            }
        };
        if !matches!(url.scheme(), "http" | "https") {
            return ResolutionResult::failed(ResolveError::InvalidProtocol);
        }

        let max_tracks = clamp_track_limit(options.max_tracks);
        let source = classify(&url);
        let Some(resolver) = self.resolver_for(source) else {
            debug!(source = %source, "no resolver for {}", url);
            return ResolutionResult::failed(ResolveError::UnsupportedSource);
        };

        let request = ResolveRequest {
            url: &url,
            max_tracks,
            title_hint: options.title_hint.as_deref(),
        };
        let mut drafts = match resolver.resolve(&request).await {
            Ok(d) => d,
            Err(e) => return ResolutionResult::failed(e),
        };
        drafts.truncate(max_tracks);

        let drafts = self.enricher.enrich(drafts).await;
        let tracks: Vec<_> = drafts.into_iter().map(|d| d.into_resolved()).collect();
        info!(
            source = %source,
            resolver = resolver.name(),
            tracks = tracks.len(),
            "resolved link"
        );
        ResolutionResult::ok(tracks)
    }
}

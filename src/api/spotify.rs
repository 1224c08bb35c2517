use super::http::Fetcher;
use super::spotify_auth::{ClientCredentials, SpotifyAuth};
use super::{ResolveRequest, SourceResolver};
use crate::cache::{Clock, TokenCache};
use crate::config::Config;
use crate::error::ResolveError;
use crate::models::{PlaybackHint, SourceKind, TrackDraft};
use crate::pool::map_bounded;
use crate::util::{non_empty, title_from_raw_url, title_from_url};
use async_trait::async_trait;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::AUTHORIZATION;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const PLAYER_TYPE: &str = "spotify";

const PLAYLIST_FIELDS: &str = "images,tracks(items(track(id,name,type,duration_ms,preview_url,external_urls,artists(name),album(images))),next)";

static META_TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<meta\b[^>]*>").expect("valid meta tag regex"));
static META_ATTR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)\b(property|name|content)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("valid meta attribute regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Track,
    Album,
    Playlist,
}

impl ResourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Track => "track",
            ResourceKind::Album => "album",
            ResourceKind::Playlist => "playlist",
        }
    }

    fn parse(segment: &str) -> Option<Self> {
        match segment {
            "track" => Some(ResourceKind::Track),
            "album" => Some(ResourceKind::Album),
            "playlist" => Some(ResourceKind::Playlist),
            _ => None,
        }
    }

    fn is_collection(self) -> bool {
        matches!(self, ResourceKind::Album | ResourceKind::Playlist)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpotifyResource {
    pub kind: ResourceKind,
    pub id: String,
}

/// Find the `<type>/<id>` pair in an open.spotify.com path, skipping
/// localized `intl-xx` segments.
pub fn parse_resource(url: &Url) -> Option<SpotifyResource> {
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|s| !s.is_empty() && !s.starts_with("intl-"))
        .collect();
    let pos = segments.iter().position(|s| ResourceKind::parse(s).is_some())?;
    let kind = ResourceKind::parse(segments[pos])?;
    let id = segments.get(pos + 1)?.split('?').next().unwrap_or("").trim();
    if id.is_empty() {
        return None;
    }
    Some(SpotifyResource {
        kind,
        id: id.to_string(),
    })
}

/// Strategies in the order they are tried. The first one to yield any
/// track wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    WebApi,
    PageScrape,
    OEmbed,
}

pub const TIERS: [Tier; 3] = [Tier::WebApi, Tier::PageScrape, Tier::OEmbed];

impl Tier {
    fn applies_to(self, resource: Option<&SpotifyResource>) -> bool {
        match self {
            Tier::WebApi => resource.is_some(),
            Tier::PageScrape => resource.map_or(false, |r| r.kind.is_collection()),
            Tier::OEmbed => true,
        }
    }
}

/// Spotify tracks, albums and playlists.
///
/// Tiers: the Web API with a client-credentials token, then scraping
/// `music:song` meta tags off the public album/playlist page, then the
/// public oEmbed endpoint, which always yields one (possibly degraded)
/// record.
pub struct SpotifyResolver {
    fetcher: Fetcher,
    auth: SpotifyAuth,
    api_base: String,
    oembed_base: String,
    web_base: String,
    page_timeout: Duration,
    scrape_concurrency: usize,
    max_pages: usize,
}

impl SpotifyResolver {
    pub fn new(cfg: &Config, fetcher: Fetcher, tokens: Arc<TokenCache>, clock: Arc<dyn Clock>) -> Self {
        let credentials = cfg
            .spotify_credentials()
            .map(|(client_id, client_secret)| ClientCredentials {
                client_id,
                client_secret,
            });
        let auth = SpotifyAuth::new(
            fetcher.clone(),
            cfg.endpoints.spotify_accounts.clone(),
            credentials,
            tokens,
            clock,
        );
        Self {
            fetcher,
            auth,
            api_base: cfg.endpoints.spotify_api.trim_end_matches('/').to_string(),
            oembed_base: cfg.endpoints.spotify_oembed.clone(),
            web_base: cfg.endpoints.spotify_web.trim_end_matches('/').to_string(),
            page_timeout: cfg.spotify_page_timeout(),
            scrape_concurrency: cfg.scrape_concurrency,
            max_pages: cfg.playlist_max_pages,
        }
    }

    /// Run the tier chain; returns at most `max_tracks` drafts.
    pub async fn run_tiers(&self, url: &Url, max_tracks: usize) -> Vec<TrackDraft> {
        let resource = parse_resource(url);
        for tier in TIERS {
            if !tier.applies_to(resource.as_ref()) {
                continue;
            }
            let mut tracks = match (tier, resource.as_ref()) {
                (Tier::WebApi, Some(r)) => self.from_web_api(r, max_tracks).await,
                (Tier::PageScrape, Some(r)) => self.from_page_scrape(r, max_tracks).await,
                (Tier::OEmbed, _) => vec![self.from_oembed(url).await],
                _ => Vec::new(),
            };
            if !tracks.is_empty() {
                debug!("Spotify {:?} tier produced {} tracks", tier, tracks.len());
                tracks.truncate(max_tracks);
                return tracks;
            }
            debug!("Spotify {:?} tier produced nothing; falling through", tier);
        }
        Vec::new()
    }

    // ---- Tier 1: Web API ----

    async fn from_web_api(&self, resource: &SpotifyResource, max_tracks: usize) -> Vec<TrackDraft> {
        let Some(token) = self.auth.access_token().await else {
            return Vec::new();
        };
        let bearer = format!("Bearer {}", token);
        match resource.kind {
            ResourceKind::Track => self.api_track(&bearer, &resource.id).await,
            ResourceKind::Album => self.api_album(&bearer, &resource.id, max_tracks).await,
            ResourceKind::Playlist => self.api_playlist(&bearer, &resource.id, max_tracks).await,
        }
    }

    async fn api_get(&self, bearer: &str, url: &str) -> Option<Value> {
        let req = self.fetcher.get(url).header(AUTHORIZATION, bearer);
        self.fetcher.json::<Value>(req, None).await
    }

    async fn api_track(&self, bearer: &str, id: &str) -> Vec<TrackDraft> {
        let url = format!("{}/tracks/{}", self.api_base, id);
        self.api_get(bearer, &url)
            .await
            .and_then(|j| draft_from_api_track(&j, None))
            .into_iter()
            .collect()
    }

    async fn api_album(&self, bearer: &str, id: &str, max_tracks: usize) -> Vec<TrackDraft> {
        let url = format!("{}/albums/{}", self.api_base, id);
        let Some(j) = self.api_get(bearer, &url).await else {
            return Vec::new();
        };
        let album_cover = first_image(&j["images"]);
        j["tracks"]["items"]
            .as_array()
            .map(|items| {
                items
                    .iter()
                    .filter_map(|t| draft_from_api_track(t, album_cover))
                    .take(max_tracks)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Walks `next` cursors until the cap is reached, the cursor runs out,
    /// or the page budget is spent.
    async fn api_playlist(&self, bearer: &str, id: &str, max_tracks: usize) -> Vec<TrackDraft> {
        let url = format!(
            "{}/playlists/{}?fields={}",
            self.api_base,
            id,
            urlencoding::encode(PLAYLIST_FIELDS)
        );
        let Some(j) = self.api_get(bearer, &url).await else {
            return Vec::new();
        };

        let playlist_cover = first_image(&j["images"]).map(str::to_string);
        let mut tracks = Vec::new();
        collect_playlist_items(&j["tracks"]["items"], playlist_cover.as_deref(), &mut tracks);
        let mut next = j["tracks"]["next"].as_str().map(|s| s.to_string());
        let mut pages = 0;

        while tracks.len() < max_tracks {
            let Some(page_url) = next.take() else {
                break;
            };
            if pages >= self.max_pages {
                debug!("Spotify playlist {} hit page budget of {}", id, self.max_pages);
                break;
            }
            pages += 1;
            let Some(page) = self.api_get(bearer, &page_url).await else {
                // keep what we already have
                break;
            };
            collect_playlist_items(&page["items"], playlist_cover.as_deref(), &mut tracks);
            next = page["next"].as_str().map(|s| s.to_string());
        }

        tracks.truncate(max_tracks);
        tracks
    }

    // ---- Tier 2: page scrape ----

    async fn from_page_scrape(&self, resource: &SpotifyResource, max_tracks: usize) -> Vec<TrackDraft> {
        let page_url = format!("{}/{}/{}", self.web_base, resource.kind.as_str(), resource.id);
        let Some(html) = self
            .fetcher
            .text(self.fetcher.get(&page_url), Some(self.page_timeout))
            .await
        else {
            return Vec::new();
        };
        let song_urls = extract_song_urls(&html, max_tracks);
        debug!("Scraped {} song links from {}", song_urls.len(), page_url);

        map_bounded(&song_urls, self.scrape_concurrency, |u| self.oembed_track(u))
            .await
            .into_iter()
            .flatten()
            .collect()
    }

    // ---- Tier 3: oEmbed ----

    async fn oembed_track(&self, link: &str) -> Option<TrackDraft> {
        let url = format!("{}?url={}", self.oembed_base, urlencoding::encode(link));
        let j = self.fetcher.json::<Value>(self.fetcher.get(&url), None).await?;
        let title = non_empty(j["title"].as_str());
        let draft = TrackDraft::new(
            SourceKind::Spotify,
            link,
            title.as_deref().unwrap_or(&title_from_raw_url(link)),
        )
        .with_cover(j["thumbnail_url"].as_str())
        .with_search(title.as_deref(), None)
        .with_player(Some(PLAYER_TYPE), None);
        Some(draft)
    }

    async fn from_oembed(&self, url: &Url) -> TrackDraft {
        match self.oembed_track(url.as_str()).await {
            Some(t) => t,
            None => TrackDraft::new(SourceKind::Spotify, url.as_str(), &title_from_url(url))
                .with_player(Some(PLAYER_TYPE), None),
        }
    }
}

#[async_trait]
impl SourceResolver for SpotifyResolver {
    fn name(&self) -> &str {
        "spotify"
    }

    async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Vec<TrackDraft>, ResolveError> {
        let mut tracks = self.run_tiers(request.url, request.max_tracks).await;
        if tracks.len() == 1 {
            if let Some(hint) = request.title_hint.filter(|h| !h.trim().is_empty()) {
                tracks = tracks.into_iter().map(|t| t.with_title(hint)).collect();
            }
        }
        Ok(tracks)
    }
}

fn first_image(images: &Value) -> Option<&str> {
    images
        .as_array()
        .and_then(|a| a.iter().find_map(|img| img["url"].as_str()))
        .filter(|s| !s.trim().is_empty())
}

/// Playlist entries fall back to the playlist cover when their album has no art.
fn collect_playlist_items(items: &Value, fallback_cover: Option<&str>, out: &mut Vec<TrackDraft>) {
    if let Some(items) = items.as_array() {
        out.extend(
            items
                .iter()
                .filter_map(|it| draft_from_api_track(&it["track"], fallback_cover)),
        );
    }
}

/// Map a Web API track object. Tracks without a name, podcast episodes and
/// local files without a link are skipped.
pub fn draft_from_api_track(t: &Value, fallback_cover: Option<&str>) -> Option<TrackDraft> {
    if t.is_null() || t["type"].as_str() == Some("episode") {
        return None;
    }
    let name = non_empty(t["name"].as_str())?;
    let link = non_empty(t["external_urls"]["spotify"].as_str()).or_else(|| {
        non_empty(t["id"].as_str()).map(|id| format!("https://open.spotify.com/track/{}", id))
    })?;

    let artists: Vec<&str> = t["artists"]
        .as_array()
        .map(|a| {
            a.iter()
                .filter_map(|x| x["name"].as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();
    let title = if artists.is_empty() {
        name.clone()
    } else {
        format!("{} - {}", name, artists.join(", "))
    };
    let cover = first_image(&t["album"]["images"]).or(fallback_cover);
    let duration = t["duration_ms"].as_f64().map(|ms| ms / 1000.0);

    Some(
        TrackDraft::new(SourceKind::Spotify, &link, &title)
            .with_cover(cover)
            .with_duration(duration)
            .with_stream(t["preview_url"].as_str(), PlaybackHint::Preview)
            .with_search(Some(name.as_str()), artists.first().copied())
            .with_player(Some(PLAYER_TYPE), None),
    )
}

/// Collect the `content` of every `<meta property|name="music:song">`,
/// de-duplicated in page order, capped at `max`.
pub fn extract_song_urls(html: &str, max: usize) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    for tag in META_TAG.find_iter(html) {
        let mut is_song = false;
        let mut content: Option<String> = None;
        for cap in META_ATTR.captures_iter(tag.as_str()) {
            let key = cap.get(1).map(|m| m.as_str().to_ascii_lowercase()).unwrap_or_default();
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str().trim())
                .unwrap_or("");
            match key.as_str() {
                "property" | "name" if value.eq_ignore_ascii_case("music:song") => is_song = true,
                "content" if !value.is_empty() => content = Some(value.replace("&amp;", "&")),
                _ => {}
            }
        }
        if let (true, Some(c)) = (is_song, content) {
            urls.push(c);
        }
    }

    // Deduplicate while preserving order.
    let mut seen = std::collections::HashSet::new();
    urls.retain(|u| seen.insert(u.clone()));
    urls.truncate(max);
    urls
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn res(s: &str) -> Option<SpotifyResource> {
        parse_resource(&Url::parse(s).unwrap())
    }

    #[test]
    fn parses_resource_paths() {
        assert_eq!(
            res("https://open.spotify.com/track/4uLU6hMCjMI75M1A2tKUQC?si=abc"),
            Some(SpotifyResource { kind: ResourceKind::Track, id: "4uLU6hMCjMI75M1A2tKUQC".into() })
        );
        assert_eq!(
            res("https://open.spotify.com/intl-de/album/1DFixLWuPkv3KT3TnV35m3"),
            Some(SpotifyResource { kind: ResourceKind::Album, id: "1DFixLWuPkv3KT3TnV35m3".into() })
        );
        assert_eq!(
            res("https://open.spotify.com/embed/playlist/37i9dQZF1DXcBWIGoYBM5M"),
            Some(SpotifyResource { kind: ResourceKind::Playlist, id: "37i9dQZF1DXcBWIGoYBM5M".into() })
        );
        assert_eq!(res("https://open.spotify.com/artist/0gxyHStUsqpMadRV0Di1Qt"), None);
        assert_eq!(res("https://open.spotify.com/track/"), None);
        assert_eq!(res("https://open.spotify.com/"), None);
    }

    #[test]
    fn tiers_apply_by_resource_kind() {
        let track = SpotifyResource { kind: ResourceKind::Track, id: "t".into() };
        let album = SpotifyResource { kind: ResourceKind::Album, id: "a".into() };
        assert!(Tier::WebApi.applies_to(Some(&track)));
        assert!(!Tier::PageScrape.applies_to(Some(&track)));
        assert!(Tier::PageScrape.applies_to(Some(&album)));
        assert!(!Tier::WebApi.applies_to(None));
        assert!(Tier::OEmbed.applies_to(None));
    }

    #[test]
    fn extracts_distinct_song_meta_tags() {
        let html = r#"
            <html><head>
            <meta property="og:title" content="Some Playlist"/>
            <meta property="music:song" content="https://open.spotify.com/track/a"/>
            <meta content='https://open.spotify.com/track/b' name='music:song'>
            <meta property="music:song" content="https://open.spotify.com/track/a"/>
            <META PROPERTY="music:song" CONTENT="https://open.spotify.com/track/c?x=1&amp;y=2">
            <meta property="music:song:track" content="1"/>
            </head></html>"#;
        let urls = extract_song_urls(html, 10);
        assert_eq!(
            urls,
            vec![
                "https://open.spotify.com/track/a",
                "https://open.spotify.com/track/b",
                "https://open.spotify.com/track/c?x=1&y=2",
            ]
        );
        assert_eq!(extract_song_urls(html, 2).len(), 2);
    }

    #[test]
    fn maps_api_track_objects() {
        let t = json!({
            "id": "abc",
            "name": "Song",
            "type": "track",
            "duration_ms": 215_500,
            "preview_url": null,
            "external_urls": { "spotify": "https://open.spotify.com/track/abc" },
            "artists": [{ "name": "Artist One" }, { "name": "Two" }],
            "album": { "images": [] }
        });
        let d = draft_from_api_track(&t, Some("https://i.scdn.co/album.jpg")).unwrap();
        assert_eq!(d.title, "Song - Artist One, Two");
        assert_eq!(d.search_title.as_deref(), Some("Song"));
        assert_eq!(d.search_artist.as_deref(), Some("Artist One"));
        assert_eq!(d.cover_url.as_deref(), Some("https://i.scdn.co/album.jpg"));
        assert_eq!(d.duration_sec, Some(215.5));
        assert!(!d.is_playable());
        assert_eq!(d.playback_hint, PlaybackHint::External);

        let with_preview = json!({
            "id": "p", "name": "P", "preview_url": "https://p.scdn.co/mp3-preview/x",
            "album": { "images": [{ "url": "https://i.scdn.co/own.jpg" }] }
        });
        let d = draft_from_api_track(&with_preview, Some("https://i.scdn.co/album.jpg")).unwrap();
        assert_eq!(d.url, "https://open.spotify.com/track/p");
        assert_eq!(d.cover_url.as_deref(), Some("https://i.scdn.co/own.jpg"));
        assert_eq!(d.playback_hint, PlaybackHint::Preview);

        assert!(draft_from_api_track(&Value::Null, None).is_none());
        assert!(draft_from_api_track(&json!({ "type": "episode", "name": "Pod", "id": "e" }), None).is_none());
        assert!(draft_from_api_track(&json!({ "name": "Local", "id": null }), None).is_none());
    }
}

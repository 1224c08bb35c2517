use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Base URLs of every third-party service the resolver talks to.
/// Overridable so tests can point them at a local mock server.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Endpoints {
    pub spotify_accounts: String,
    pub spotify_api: String,
    pub spotify_oembed: String,
    /// Host serving the public open.spotify.com pages that get scraped.
    pub spotify_web: String,
    pub youtube_oembed: String,
    pub youtube_thumbnail: String,
    pub deezer_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            spotify_accounts: "https://accounts.spotify.com".into(),
            // include v1 path by default
            spotify_api: "https://api.spotify.com/v1".into(),
            spotify_oembed: "https://open.spotify.com/oembed".into(),
            spotify_web: "https://open.spotify.com".into(),
            youtube_oembed: "https://www.youtube.com/oembed".into(),
            youtube_thumbnail: "https://i.ytimg.com".into(),
            deezer_api: "https://api.deezer.com".into(),
        }
    }
}

impl Endpoints {
    /// Every endpoint rooted at one base URL, e.g. a mock server.
    pub fn all_at(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            spotify_accounts: base.to_string(),
            spotify_api: base.to_string(),
            spotify_oembed: format!("{base}/oembed/spotify"),
            spotify_web: base.to_string(),
            youtube_oembed: format!("{base}/oembed/youtube"),
            youtube_thumbnail: base.to_string(),
            deezer_api: base.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub spotify_client_id: String,
    #[serde(default)]
    pub spotify_client_secret: String,

    // Timeouts (milliseconds)
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_youtube_oembed_timeout")]
    pub youtube_oembed_timeout_ms: u64,
    #[serde(default = "default_spotify_page_timeout")]
    pub spotify_page_timeout_ms: u64,
    #[serde(default = "default_deezer_timeout")]
    pub deezer_timeout_ms: u64,

    // Fan-out
    #[serde(default = "default_scrape_concurrency")]
    pub scrape_concurrency: usize,
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
    /// Follow-up page requests allowed per playlist, on top of the track cap.
    #[serde(default = "default_playlist_max_pages")]
    pub playlist_max_pages: usize,

    // Preview cache
    #[serde(default = "default_preview_cache_capacity")]
    pub preview_cache_capacity: usize,
    #[serde(default = "default_preview_cache_ttl")]
    pub preview_cache_ttl_sec: u64,

    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub endpoints: Endpoints,
}

fn default_fetch_timeout() -> u64 { 7_000 }
fn default_youtube_oembed_timeout() -> u64 { 6_000 }
fn default_spotify_page_timeout() -> u64 { 9_000 }
fn default_deezer_timeout() -> u64 { 6_500 }
fn default_scrape_concurrency() -> usize { 5 }
fn default_enrich_concurrency() -> usize { 6 }
fn default_playlist_max_pages() -> usize { 20 }
fn default_preview_cache_capacity() -> usize { 4_096 }
fn default_preview_cache_ttl() -> u64 { 6 * 60 * 60 }

impl Default for Config {
    fn default() -> Self {
        Self {
            spotify_client_id: String::new(),
            spotify_client_secret: String::new(),
            fetch_timeout_ms: default_fetch_timeout(),
            youtube_oembed_timeout_ms: default_youtube_oembed_timeout(),
            spotify_page_timeout_ms: default_spotify_page_timeout(),
            deezer_timeout_ms: default_deezer_timeout(),
            scrape_concurrency: default_scrape_concurrency(),
            enrich_concurrency: default_enrich_concurrency(),
            playlist_max_pages: default_playlist_max_pages(),
            preview_cache_capacity: default_preview_cache_capacity(),
            preview_cache_ttl_sec: default_preview_cache_ttl(),
            log_dir: None,
            endpoints: Endpoints::default(),
        }
    }
}

impl Config {
    pub fn from_path(path: &std::path::Path) -> anyhow::Result<Self> {
        let s = std::fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&s)?;
        Ok(cfg)
    }

    /// Overlay credentials and endpoint bases from the environment.
    pub fn apply_env(self) -> Self {
        self.apply_vars(|k| std::env::var(k).ok())
    }

    fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> Self {
        let var = |k: &str| var(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        if let Some(v) = var("SPOTIFY_CLIENT_ID") {
            self.spotify_client_id = v;
        }
        if let Some(v) = var("SPOTIFY_CLIENT_SECRET") {
            self.spotify_client_secret = v;
        }
        if let Some(v) = var("SPOTIFY_AUTH_BASE") {
            self.endpoints.spotify_accounts = v;
        }
        if let Some(v) = var("SPOTIFY_API_BASE") {
            self.endpoints.spotify_api = v;
        }
        if let Some(v) = var("DEEZER_API_BASE") {
            self.endpoints.deezer_api = v;
        }
        self
    }

    /// Client credentials, if both halves are configured.
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        let id = self.spotify_client_id.trim();
        let secret = self.spotify_client_secret.trim();
        if id.is_empty() || secret.is_empty() {
            None
        } else {
            Some((id.to_string(), secret.to_string()))
        }
    }

    pub fn fetch_timeout(&self) -> Duration { Duration::from_millis(self.fetch_timeout_ms) }
    pub fn youtube_oembed_timeout(&self) -> Duration { Duration::from_millis(self.youtube_oembed_timeout_ms) }
    pub fn spotify_page_timeout(&self) -> Duration { Duration::from_millis(self.spotify_page_timeout_ms) }
    pub fn deezer_timeout(&self) -> Duration { Duration::from_millis(self.deezer_timeout_ms) }
}

use music_link_resolver::config::{Config, Endpoints};
use std::io::Write;
use std::time::Duration;
use tempfile::NamedTempFile;

#[test]
fn parses_partial_toml_with_defaults() {
    let mut f = NamedTempFile::new().unwrap();
    writeln!(
        f,
        r#"
spotify_client_id = "abc"
spotify_client_secret = "def"
scrape_concurrency = 3
log_dir = "/tmp/mlr-logs"

[endpoints]
deezer_api = "http://localhost:9000"
"#
    )
    .unwrap();

    let cfg = Config::from_path(f.path()).unwrap();
    assert_eq!(cfg.spotify_credentials(), Some(("abc".into(), "def".into())));
    assert_eq!(cfg.scrape_concurrency, 3);
    assert_eq!(cfg.enrich_concurrency, 6);
    assert_eq!(cfg.playlist_max_pages, 20);
    assert_eq!(cfg.fetch_timeout(), Duration::from_millis(7_000));
    assert_eq!(cfg.spotify_page_timeout(), Duration::from_millis(9_000));
    assert_eq!(cfg.log_dir.as_deref(), Some(std::path::Path::new("/tmp/mlr-logs")));
    assert_eq!(cfg.endpoints.deezer_api, "http://localhost:9000");
    assert_eq!(cfg.endpoints.spotify_api, Endpoints::default().spotify_api);
}

#[test]
fn empty_file_is_all_defaults() {
    let f = NamedTempFile::new().unwrap();
    let cfg = Config::from_path(f.path()).unwrap();
    let d = Config::default();
    assert_eq!(cfg.spotify_credentials(), None);
    assert_eq!(cfg.youtube_oembed_timeout_ms, d.youtube_oembed_timeout_ms);
    assert_eq!(cfg.deezer_timeout_ms, 6_500);
    assert_eq!(cfg.preview_cache_capacity, 4_096);
    assert_eq!(cfg.preview_cache_ttl_sec, 21_600);
    assert_eq!(cfg.endpoints, d.endpoints);
}

#[test]
fn malformed_file_is_an_error() {
    let mut f = NamedTempFile::new().unwrap();
    writeln!(f, "scrape_concurrency = \"many\"").unwrap();
    assert!(Config::from_path(f.path()).is_err());
}

#[test]
fn missing_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(Config::from_path(&dir.path().join("nope.toml")).is_err());
}

#[test]
fn all_at_roots_every_endpoint_at_one_base() {
    let e = Endpoints::all_at("http://127.0.0.1:1234/");
    assert_eq!(e.spotify_api, "http://127.0.0.1:1234");
    assert_eq!(e.spotify_oembed, "http://127.0.0.1:1234/oembed/spotify");
    assert_eq!(e.youtube_oembed, "http://127.0.0.1:1234/oembed/youtube");
    assert_eq!(e.deezer_api, "http://127.0.0.1:1234");
}

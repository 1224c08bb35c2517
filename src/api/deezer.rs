use super::http::Fetcher;
use crate::config::Config;
use crate::models::{PreviewAsset, PREVIEW_DURATION_SEC};
use crate::util::non_empty;
use anyhow::{anyhow, Result};
use log::debug;
use serde_json::Value;
use std::time::Duration;

/// Deezer public search, used only to find 30-second preview snippets.
pub struct DeezerClient {
    fetcher: Fetcher,
    api_base: String,
    timeout: Duration,
}

impl DeezerClient {
    pub fn new(cfg: &Config, fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            api_base: cfg.endpoints.deezer_api.trim_end_matches('/').to_string(),
            timeout: cfg.deezer_timeout(),
        }
    }

    /// Search by title/artist and return the first hit that has a preview.
    /// `Ok(None)` means the search completed without a previewable match;
    /// `Err` means the search itself could not be completed.
    pub async fn search_preview(&self, title: &str, artist: &str) -> Result<Option<PreviewAsset>> {
        let q = search_query(title, artist);
        if q.is_empty() {
            return Ok(None);
        }
        let url = format!(
            "{}/search?q={}&limit=5",
            self.api_base,
            urlencoding::encode(&q)
        );
        let j: Value = self
            .fetcher
            .json(self.fetcher.get(&url), Some(self.timeout))
            .await
            .ok_or_else(|| anyhow!("deezer search unavailable"))?;
        // Deezer reports quota and query problems as 200 with an error object.
        if !j["error"].is_null() {
            return Err(anyhow!("deezer search error: {}", j["error"]));
        }

        let hit = j["data"].as_array().and_then(|items| {
            items.iter().find_map(|it| {
                let preview = non_empty(it["preview"].as_str())?;
                let cover = ["cover_xl", "cover_big", "cover_medium", "cover"]
                    .iter()
                    .find_map(|k| non_empty(it["album"][*k].as_str()));
                Some(PreviewAsset {
                    stream_url: preview,
                    duration_sec: PREVIEW_DURATION_SEC,
                    cover_url: cover,
                })
            })
        });
        if hit.is_none() {
            debug!("deezer: no preview for {:?}", q);
        }
        Ok(hit)
    }
}

/// `track:"…" artist:"…"`, omitting empty parts. Embedded quotes are dropped
/// so they cannot end a field early.
pub fn search_query(title: &str, artist: &str) -> String {
    let field = |name: &str, value: &str| {
        let v: String = value.chars().filter(|c| *c != '"').collect();
        let v = v.trim();
        if v.is_empty() {
            None
        } else {
            Some(format!("{}:\"{}\"", name, v))
        }
    };
    [field("track", title), field("artist", artist)]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_quoted_field_queries() {
        assert_eq!(search_query("Song", "Band"), r#"track:"Song" artist:"Band""#);
        assert_eq!(search_query("Say \"Hi\"", ""), r#"track:"Say Hi""#);
        assert_eq!(search_query("  ", "Band"), r#"artist:"Band""#);
        assert_eq!(search_query("", ""), "");
    }
}

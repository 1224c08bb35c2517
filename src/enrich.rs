//! Second pass for Spotify tracks: find a playable preview snippet on
//! Deezer for every track that has no stream yet.

use crate::api::deezer::DeezerClient;
use crate::cache::{PreviewCache, PreviewLookup};
use crate::models::{SourceKind, TrackDraft};
use crate::pool::map_bounded;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Trailing "- Artist" or "by Artist".
static TRAILING_ARTIST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(?:\s-\s*|\bby\s+)([^-]+?)\s*$").expect("valid trailing artist regex")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    pub title: String,
    pub artist: String,
}

impl SearchTerms {
    /// Lower-cased `title::artist`.
    pub fn cache_key(&self) -> String {
        format!("{}::{}", self.title, self.artist).to_lowercase()
    }

    fn is_empty(&self) -> bool {
        self.title.is_empty() && self.artist.is_empty()
    }
}

/// Prefer the hints a resolver kept, otherwise split the display title.
pub fn search_terms(track: &TrackDraft) -> SearchTerms {
    let title = track
        .search_title
        .clone()
        .unwrap_or_else(|| {
            track
                .title
                .split(" - ")
                .next()
                .unwrap_or("")
                .trim()
                .to_string()
        });
    let artist = track
        .search_artist
        .clone()
        .or_else(|| {
            TRAILING_ARTIST
                .captures(&track.title)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
        .unwrap_or_default();
    SearchTerms { title, artist }
}

fn needs_preview(track: &TrackDraft) -> bool {
    track.source == SourceKind::Spotify && track.stream_url.is_none()
}

pub struct PreviewEnricher {
    deezer: DeezerClient,
    cache: Arc<PreviewCache>,
    concurrency: usize,
}

impl PreviewEnricher {
    pub fn new(deezer: DeezerClient, cache: Arc<PreviewCache>, concurrency: usize) -> Self {
        Self {
            deezer,
            cache,
            concurrency,
        }
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    /// Returns the same tracks in the same order, with previews attached
    /// where one was found. Tracks sharing a search key share one lookup.
    pub async fn enrich(&self, tracks: Vec<TrackDraft>) -> Vec<TrackDraft> {
        let mut pending: Vec<SearchTerms> = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for t in tracks.iter().filter(|t| needs_preview(t)) {
            let terms = search_terms(t);
            if seen.insert(terms.cache_key()) {
                pending.push(terms);
            }
        }
        if pending.is_empty() {
            return tracks;
        }

        let outcomes = map_bounded(&pending, self.concurrency, |terms| self.lookup(terms)).await;
        let found: HashMap<String, PreviewLookup> = pending
            .iter()
            .map(SearchTerms::cache_key)
            .zip(outcomes)
            .filter_map(|(key, outcome)| outcome.map(|o| (key, o)))
            .collect();

        tracks
            .into_iter()
            .map(|t| {
                if !needs_preview(&t) {
                    return t;
                }
                match found.get(&search_terms(&t).cache_key()) {
                    Some(PreviewLookup::Found(asset)) => t.with_preview(asset),
                    _ => t,
                }
            })
            .collect()
    }

    /// Cached outcome, or a fresh search whose completed result is cached.
    /// None when the search could not be completed.
    async fn lookup(&self, terms: &SearchTerms) -> Option<PreviewLookup> {
        let key = terms.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            return Some(hit);
        }
        if terms.is_empty() {
            self.cache.insert(key, PreviewLookup::NoMatch);
            return Some(PreviewLookup::NoMatch);
        }
        match self.deezer.search_preview(&terms.title, &terms.artist).await {
            Ok(hit) => {
                let outcome = hit.map_or(PreviewLookup::NoMatch, PreviewLookup::Found);
                self.cache.insert(key, outcome.clone());
                Some(outcome)
            }
            Err(e) => {
                debug!(key = %key, "preview lookup failed: {}", e);
                None
            }
        }
    }
}

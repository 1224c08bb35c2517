use super::http::Fetcher;
use crate::cache::{Clock, TokenCache};
use base64::{engine::general_purpose, Engine as _};
use log::{debug, warn};
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use std::sync::Arc;

/// Client-credentials grant against the Spotify Accounts service.
/// The token is shared process-wide through `TokenCache`; two concurrent
/// misses both exchange and the later write wins, which is harmless.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

#[derive(Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

pub struct SpotifyAuth {
    fetcher: Fetcher,
    accounts_base: String,
    credentials: Option<ClientCredentials>,
    tokens: Arc<TokenCache>,
    clock: Arc<dyn Clock>,
}

impl SpotifyAuth {
    pub fn new(
        fetcher: Fetcher,
        accounts_base: String,
        credentials: Option<ClientCredentials>,
        tokens: Arc<TokenCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            fetcher,
            accounts_base,
            credentials,
            tokens,
            clock,
        }
    }

    /// A usable bearer token, exchanging credentials when the cached one is
    /// missing or inside the expiry margin. None when unconfigured or the
    /// exchange fails.
    pub async fn access_token(&self) -> Option<String> {
        let creds = self.credentials.as_ref()?;
        if let Some(token) = self.tokens.get(self.clock.now_ms()) {
            return Some(token);
        }

        debug!("Spotify token missing or near expiry, exchanging client credentials");
        let auth_header = format!(
            "Basic {}",
            general_purpose::STANDARD.encode(format!("{}:{}", creds.client_id, creds.client_secret))
        );
        let url = format!("{}/api/token", self.accounts_base.trim_end_matches('/'));
        let req = self
            .fetcher
            .client()
            .post(&url)
            .header(AUTHORIZATION, auth_header)
            .form(&[("grant_type", "client_credentials")]);

        let Some(tr) = self.fetcher.json::<TokenResponse>(req, None).await else {
            warn!("Spotify client-credentials exchange failed");
            return None;
        };
        let lifetime_ms = tr.expires_in.clamp(0, i64::MAX / 1000) * 1000;
        let expires_at_ms = self.clock.now_ms().saturating_add(lifetime_ms);
        self.tokens.store(tr.access_token.clone(), expires_at_ms);
        Some(tr.access_token)
    }
}

use log::debug;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(7);

const USER_AGENT: &str = concat!("music-link-resolver/", env!("CARGO_PKG_VERSION"));

/// Best-effort HTTP access. Every call is raced against a timeout and the
/// in-flight request is dropped when the timer wins. Non-2xx statuses,
/// timeouts, transport errors and undecodable bodies all come back as `None`.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    default_timeout: Duration,
}

impl Fetcher {
    pub fn new(default_timeout: Duration) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|e| {
                debug!("falling back to default http client: {}", e);
                Client::new()
            });
        Self {
            client,
            default_timeout,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Fetch and decode a JSON body.
    pub async fn json<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        timeout: Option<Duration>,
    ) -> Option<T> {
        self.guarded(req, timeout, |resp| async move {
            match resp.json::<T>().await {
                Ok(v) => Some(v),
                Err(e) => {
                    debug!("undecodable json body: {}", e);
                    None
                }
            }
        })
        .await
    }

    /// Fetch a body as text.
    pub async fn text(&self, req: RequestBuilder, timeout: Option<Duration>) -> Option<String> {
        self.guarded(req, timeout, |resp| async move {
            match resp.text().await {
                Ok(s) => Some(s),
                Err(e) => {
                    debug!("unreadable body: {}", e);
                    None
                }
            }
        })
        .await
    }

    async fn guarded<T, F, Fut>(
        &self,
        req: RequestBuilder,
        timeout: Option<Duration>,
        read_body: F,
    ) -> Option<T>
    where
        F: FnOnce(reqwest::Response) -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let limit = timeout.unwrap_or(self.default_timeout);
        let call = async {
            let resp = match req.send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!("request failed: {}", e);
                    return None;
                }
            };
            let status = resp.status();
            if !status.is_success() {
                debug!("{} returned {}", resp.url(), status);
                return None;
            }
            read_body(resp).await
        };
        match tokio::time::timeout(limit, call).await {
            Ok(out) => out,
            Err(_) => {
                debug!("request timed out after {:?}", limit);
                None
            }
        }
    }
}

impl Default for Fetcher {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    #[tokio::test]
    async fn non_success_and_bad_json_are_absent() {
        let mut server = Server::new_async().await;
        let _bad = server
            .mock("GET", "/bad")
            .with_status(500)
            .create_async()
            .await;
        let _garbage = server
            .mock("GET", "/garbage")
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;
        let _ok = server
            .mock("GET", "/ok")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"a":1}"#)
            .create_async()
            .await;

        let f = Fetcher::default();
        let base = server.url();
        let bad: Option<serde_json::Value> = f.json(f.get(&format!("{base}/bad")), None).await;
        assert!(bad.is_none());
        let garbage: Option<serde_json::Value> =
            f.json(f.get(&format!("{base}/garbage")), None).await;
        assert!(garbage.is_none());
        let ok: Option<serde_json::Value> = f.json(f.get(&format!("{base}/ok")), None).await;
        assert_eq!(ok.unwrap()["a"], 1);
        let text = f.text(f.get(&format!("{base}/garbage")), None).await;
        assert_eq!(text.as_deref(), Some("not json"));
    }

    #[tokio::test]
    async fn stalled_server_is_cut_off_at_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        std::thread::spawn(move || {
            // accept and never answer
            if let Ok((sock, _)) = listener.accept() {
                std::thread::sleep(Duration::from_secs(10));
                drop(sock);
            }
        });

        let f = Fetcher::default();
        let started = std::time::Instant::now();
        let out = f
            .text(
                f.get(&format!("http://{addr}/slow")),
                Some(Duration::from_millis(200)),
            )
            .await;
        assert!(out.is_none());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn unreachable_host_is_absent() {
        let f = Fetcher::new(Duration::from_millis(500));
        let out = f.text(f.get("http://127.0.0.1:1/nothing"), None).await;
        assert!(out.is_none());
    }
}

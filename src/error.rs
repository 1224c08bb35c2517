use serde::{Deserialize, Serialize};

/// Failures a caller can see. Upstream provider failures never show up
/// here; they degrade to fewer tracks or poorer metadata instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveError {
    #[error("invalid_url")]
    InvalidUrl,
    #[error("invalid_protocol")]
    InvalidProtocol,
    #[error("invalid_youtube_url")]
    InvalidYoutubeUrl,
    #[error("unsupported_source")]
    UnsupportedSource,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_wire_code() {
        for e in [
            ResolveError::InvalidUrl,
            ResolveError::InvalidProtocol,
            ResolveError::InvalidYoutubeUrl,
            ResolveError::UnsupportedSource,
        ] {
            let wire = serde_json::to_value(e).unwrap();
            assert_eq!(wire, e.to_string());
        }
    }
}

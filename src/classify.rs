use crate::models::SourceKind;
use url::Url;

/// Host substrings checked in order; first hit wins.
const HOST_RULES: &[(&str, SourceKind)] = &[
    ("spotify", SourceKind::Spotify),
    ("youtube", SourceKind::Youtube),
    ("youtu.be", SourceKind::Youtube),
    ("soundcloud", SourceKind::Soundcloud),
    ("bandcamp", SourceKind::Bandcamp),
    ("mixcloud", SourceKind::Mixcloud),
];

/// Decide which service a link belongs to from its hostname alone.
pub fn classify(url: &Url) -> SourceKind {
    let host = url.host_str().unwrap_or("").to_ascii_lowercase();
    HOST_RULES
        .iter()
        .find(|(needle, _)| host.contains(needle))
        .map(|(_, kind)| *kind)
        .unwrap_or(SourceKind::Direct)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind(s: &str) -> SourceKind {
        classify(&Url::parse(s).unwrap())
    }

    #[test]
    fn classifies_known_hosts() {
        assert_eq!(kind("https://open.spotify.com/track/abc"), SourceKind::Spotify);
        assert_eq!(kind("https://www.youtube.com/watch?v=x"), SourceKind::Youtube);
        assert_eq!(kind("https://music.youtube.com/watch?v=x"), SourceKind::Youtube);
        assert_eq!(kind("https://youtu.be/x"), SourceKind::Youtube);
        assert_eq!(kind("https://soundcloud.com/a/b"), SourceKind::Soundcloud);
        assert_eq!(kind("https://artist.bandcamp.com/track/b"), SourceKind::Bandcamp);
        assert_eq!(kind("https://www.mixcloud.com/a/b/"), SourceKind::Mixcloud);
        assert_eq!(kind("https://example.com/song.mp3"), SourceKind::Direct);
    }

    #[test]
    fn order_decides_ambiguous_hosts() {
        assert_eq!(kind("https://spotify.youtube.example/"), SourceKind::Spotify);
        assert_eq!(kind("HTTPS://OPEN.SPOTIFY.COM/track/x"), SourceKind::Spotify);
    }

    #[test]
    fn only_the_host_is_inspected() {
        assert_eq!(kind("https://example.com/spotify/youtube"), SourceKind::Direct);
    }
}

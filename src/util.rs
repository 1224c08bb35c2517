use url::Url;

pub const UNTITLED_TRACK: &str = "Untitled Track";
pub const MAX_TITLE_CHARS: usize = 180;
pub const MAX_SEARCH_CHARS: usize = 140;
pub const MAX_PLAYER_TYPE_CHARS: usize = 20;
pub const MAX_VIDEO_ID_CHARS: usize = 32;

/// Twelve hours.
pub const MAX_DURATION_SEC: f64 = 43_200.0;

/// Upper bound (and default) for the number of tracks a single resolution returns.
pub const MAX_TRACKS: usize = 120;

/// Collapse runs of whitespace, trim, and cut to `max_chars` characters.
/// Returns None when nothing printable is left.
pub fn clean_label(raw: &str, max_chars: usize) -> Option<String> {
    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let cut: String = collapsed.chars().take(max_chars).collect();
    let cut = cut.trim_end().to_string();
    if cut.is_empty() {
        None
    } else {
        Some(cut)
    }
}

/// Track titles are never empty.
pub fn clean_title(raw: &str) -> String {
    clean_label(raw, MAX_TITLE_CHARS).unwrap_or_else(|| UNTITLED_TRACK.to_string())
}

/// Clamp a duration in seconds into [0, 12h] at millisecond precision.
/// NaN and infinities are treated as unknown.
pub fn clamp_duration(seconds: f64) -> Option<f64> {
    if !seconds.is_finite() {
        return None;
    }
    let clamped = seconds.clamp(0.0, MAX_DURATION_SEC);
    Some((clamped * 1000.0).round() / 1000.0)
}

/// Bound a caller-requested track count into [1, MAX_TRACKS].
pub fn clamp_track_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(MAX_TRACKS).clamp(1, MAX_TRACKS)
}

/// Best-effort human title from the last meaningful path segment of a URL,
/// e.g. `/music/some_great-song.mp3` -> "some great song".
pub fn title_from_url(url: &Url) -> String {
    let segment = url
        .path_segments()
        .and_then(|segs| segs.filter(|s| !s.is_empty()).last())
        .unwrap_or("");
    let decoded = urlencoding::decode(segment)
        .map(|c| c.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    let stem = match decoded.rsplit_once('.') {
        Some((base, ext)) if !base.is_empty() && ext.len() <= 4 => base.to_string(),
        _ => decoded,
    };
    clean_title(&stem.replace(['-', '_'], " "))
}

/// Same as `title_from_url` for a raw string; unparseable input yields the placeholder.
pub fn title_from_raw_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(u) => title_from_url(&u),
        Err(_) => UNTITLED_TRACK.to_string(),
    }
}

/// Trim and drop empty strings.
pub fn non_empty(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

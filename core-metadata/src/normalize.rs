//! Normalization helpers for raw tag values.

/// Marker that introduces the free-form tag list inside a comment.
pub const LASTFM_TAGS_MARKER: &str = "LastFM tags:";

/// ID3v2 `COMM` description that marks the whole comment as a tag list.
pub const LASTFM_TAGS_DESCRIPTION: &str = "LastFM tags";

/// Normalize text metadata
///
/// - Removes null bytes and control characters
/// - Normalizes consecutive whitespace to single space
/// - Trims leading/trailing whitespace
pub fn normalize_text(text: &str) -> String {
    text.chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a track number, dropping any `/total` suffix. `0` when absent.
pub fn parse_track_number(raw: &str) -> u32 {
    raw.split('/')
        .next()
        .map(str::trim)
        .and_then(|n| n.parse::<u32>().ok())
        .unwrap_or(0)
}

/// Year from the first four digits of a date string. `0` when absent.
pub fn parse_year(raw: &str) -> u32 {
    let digits: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .take(4)
        .collect();

    if digits.len() == 4 {
        digits.parse().unwrap_or(0)
    } else {
        0
    }
}

/// Tag list following the `LastFM tags:` marker, if the comment carries one.
pub fn lastfm_tags(comment: &str) -> Option<String> {
    let (_, rest) = comment.split_once(LASTFM_TAGS_MARKER)?;
    let tags = normalize_text(rest);
    (!tags.is_empty()).then_some(tags)
}

/// Tag list from a described comment.
///
/// A `LastFM tags` description makes the whole text the list, with any
/// repeated marker dropped. Otherwise the text must carry the marker itself.
pub fn comment_tags(description: &str, text: &str) -> Option<String> {
    if description != LASTFM_TAGS_DESCRIPTION {
        return lastfm_tags(text);
    }
    let tags = normalize_text(&text.replace(LASTFM_TAGS_MARKER, ""));
    (!tags.is_empty()).then_some(tags)
}

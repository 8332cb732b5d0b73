//! Placeholder token scanner and segment classifier.
//!
//! Two stages. The scanner makes a single left-to-right pass over the
//! message and finds maximal non-overlapping matches of
//! `kind ("_" segment)*`, where a segment is a non-empty run of characters
//! that are not `_`, whitespace, `{` or `}`. The classifier then assigns the
//! `_`-separated segments of each match right-to-left: trailing indicator
//! set first, then a `<digits>天` window, and whatever remains is entity
//! text. Entity names may themselves contain underscores or digit runs, so
//! classification stops at the first segment that does not match — a
//! window-shaped segment ahead of unknown trailing text stays entity text.

use crate::domain::series::SeriesKind;
use crate::domain::token::{Indicator, PlaceholderToken};

fn is_segment_char(ch: char) -> bool {
    !ch.is_whitespace() && ch != '_' && ch != '{' && ch != '}'
}

/// Byte length of the `("_" segment)*` tail at the start of `rest`.
///
/// A trailing `_` with no segment body is not consumed, and an empty
/// segment (`__`) terminates the match, so `周K__360天` matches only `周K`.
fn segments_len(rest: &str) -> usize {
    let mut len = 0;
    loop {
        let tail = &rest[len..];
        if !tail.starts_with('_') {
            break;
        }
        let mut seg_len = 0;
        for ch in tail[1..].chars() {
            if is_segment_char(ch) {
                seg_len += ch.len_utf8();
            } else {
                break;
            }
        }
        if seg_len == 0 {
            break;
        }
        len += 1 + seg_len;
    }
    len
}

fn match_kind(rest: &str) -> Option<SeriesKind> {
    SeriesKind::ALL
        .into_iter()
        .find(|kind| rest.starts_with(kind.keyword()))
}

/// `<digits>天`, parsed as a row count.
fn parse_window(segment: &str) -> Option<usize> {
    let digits = segment.strip_suffix('天')?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// All `&`-pieces must be known indicators for the segment to classify.
fn parse_indicator_segment(segment: &str) -> Option<Vec<Indicator>> {
    segment
        .split('&')
        .map(|piece| Indicator::from_name(piece.trim()))
        .collect()
}

fn classify(raw: &str, start: usize, kind: SeriesKind) -> PlaceholderToken {
    let body = &raw[kind.keyword().len()..];
    let mut segments: Vec<&str> = if body.is_empty() {
        Vec::new()
    } else {
        body[1..].split('_').collect()
    };

    let mut indicators = Vec::new();
    if let Some(last) = segments.last() {
        if let Some(parsed) = parse_indicator_segment(last) {
            indicators = parsed;
            segments.pop();
        }
    }

    let mut window = None;
    if let Some(last) = segments.last() {
        if let Some(n) = parse_window(last) {
            window = Some(n);
            segments.pop();
        }
    }

    let entity = if segments.is_empty() {
        None
    } else {
        Some(segments.join("_"))
    };

    PlaceholderToken {
        raw: raw.to_string(),
        start,
        kind,
        entity,
        window,
        indicators,
    }
}

/// Find and parse every placeholder token in `message`.
///
/// Matches are discovered in source order and never overlap; a kind keyword
/// falling inside an earlier match is consumed by it and not re-matched.
pub fn scan(message: &str) -> Vec<PlaceholderToken> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < message.len() {
        if let Some(kind) = match_kind(&message[pos..]) {
            let keyword_len = kind.keyword().len();
            let raw_len = keyword_len + segments_len(&message[pos + keyword_len..]);
            let raw = &message[pos..pos + raw_len];
            tokens.push(classify(raw, pos, kind));
            pos += raw_len;
        } else {
            // Safe: pos is always on a char boundary.
            pos += message[pos..].chars().next().map_or(1, char::len_utf8);
        }
    }

    tokens
}

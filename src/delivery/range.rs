//! Byte-range planning for single-range requests (RFC 7233).
//!
//! Only the first range of a multi-range header is honored. Ranges that
//! cannot be satisfied are rejected outright instead of being served as
//! computed, so no malformed or negative-length slice ever reaches a client.

use axum::http::StatusCode;

/// What to send for a request against an object of known length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponsePlan {
    /// 200 with the whole object.
    Full { content_length: u64 },
    /// 206 with bytes `start..=end` of an object of `content_length` bytes.
    Partial {
        start: u64,
        end: u64,
        content_length: u64,
    },
    /// 416 with `Content-Range: bytes */content_length`.
    Unsatisfiable { content_length: u64 },
}

impl ResponsePlan {
    pub fn status(&self) -> StatusCode {
        match self {
            ResponsePlan::Full { .. } => StatusCode::OK,
            ResponsePlan::Partial { .. } => StatusCode::PARTIAL_CONTENT,
            ResponsePlan::Unsatisfiable { .. } => StatusCode::RANGE_NOT_SATISFIABLE,
        }
    }

    /// Offset of the first byte to send.
    pub fn offset(&self) -> u64 {
        match self {
            ResponsePlan::Partial { start, .. } => *start,
            _ => 0,
        }
    }

    /// Number of body bytes to send; this is the `Content-Length` header.
    pub fn body_len(&self) -> u64 {
        match self {
            ResponsePlan::Full { content_length } => *content_length,
            ResponsePlan::Partial { start, end, .. } => end - start + 1,
            ResponsePlan::Unsatisfiable { .. } => 0,
        }
    }

    /// Value of the `Content-Range` header, if one is sent.
    pub fn content_range(&self) -> Option<String> {
        match self {
            ResponsePlan::Full { .. } => None,
            ResponsePlan::Partial {
                start,
                end,
                content_length,
            } => Some(format!("bytes {}-{}/{}", start, end, content_length)),
            ResponsePlan::Unsatisfiable { content_length } => {
                Some(format!("bytes */{}", content_length))
            }
        }
    }
}

/// Decide the response for an optional `Range` header value.
///
/// - No header, or a unit other than `bytes`: the full object.
/// - `bytes=<start>-<end>`: an omitted end means the last byte, and an end
///   past the last byte is clamped to it.
/// - `bytes=-<n>`: the last `n` bytes, or the whole object when `n` is at
///   least its length.
/// - An unparseable start or end, `start > end`, `start >= content_length`,
///   a zero suffix or an empty object is unsatisfiable.
pub fn plan(range_header: Option<&str>, content_length: u64) -> ResponsePlan {
    let Some(value) = range_header else {
        return ResponsePlan::Full { content_length };
    };

    let value = value.trim();
    let Some(spec) = strip_bytes_unit(value) else {
        return ResponsePlan::Full { content_length };
    };

    let first = spec.split(',').next().unwrap_or("").trim();
    match parse_first_range(first, content_length) {
        Some((start, end)) => ResponsePlan::Partial {
            start,
            end,
            content_length,
        },
        None => ResponsePlan::Unsatisfiable { content_length },
    }
}

/// Strip a case-insensitive `bytes=` prefix.
fn strip_bytes_unit(value: &str) -> Option<&str> {
    let (unit, rest) = value.split_once('=')?;
    unit.trim().eq_ignore_ascii_case("bytes").then_some(rest)
}

fn parse_first_range(range: &str, content_length: u64) -> Option<(u64, u64)> {
    let (start, end) = range.split_once('-')?;
    if content_length == 0 {
        return None;
    }
    let last = content_length - 1;

    let start = start.trim();
    if start.is_empty() {
        let suffix: u64 = end.trim().parse().ok()?;
        if suffix == 0 {
            return None;
        }
        return Some((content_length.saturating_sub(suffix), last));
    }

    let start: u64 = start.parse().ok()?;
    if start >= content_length {
        return None;
    }

    let end = match end.trim() {
        "" => last,
        e => e.parse::<u64>().ok()?.min(last),
    };

    (start <= end).then_some((start, end))
}

//! Turning request parameters or a `Range` header into a [`ByteRange`].
//!
//! Malformed input is never an error here: anything that cannot be
//! understood is treated as "no range requested" and the whole object is
//! served.

use crate::types::{ByteRange, RangeQuery};
use axum::http::{HeaderMap, header};

/// Resolve the byte range for a request.
///
/// Explicit `offset`/`length` parameters win over a `Range` header.
pub fn parse_byte_range(query: &RangeQuery, headers: &HeaderMap) -> ByteRange {
    if let Some(range) = from_params(query) {
        return range;
    }

    headers
        .get(header::RANGE)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_range_header)
        .unwrap_or(ByteRange::Whole)
}

fn from_params(query: &RangeQuery) -> Option<ByteRange> {
    let offset = parse_u64(query.offset.as_deref()?)?;
    match query.length.as_deref().and_then(parse_u64) {
        Some(length) => Some(ByteRange::Slice { offset, length }),
        None => Some(ByteRange::From { offset }),
    }
}

/// Parse `bytes=<start>-[<end>]`. Anything else yields `None`.
pub fn parse_range_header(value: &str) -> Option<ByteRange> {
    let ranges = value.trim().strip_prefix("bytes=")?;
    let (start, end) = ranges.trim().split_once('-')?;
    let offset = parse_u64(start)?;

    let end = end.trim();
    if end.is_empty() {
        return Some(ByteRange::From { offset });
    }

    let end = parse_u64(end)?;
    let length = end.checked_sub(offset)?.checked_add(1)?;
    Some(ByteRange::Slice { offset, length })
}

fn parse_u64(s: &str) -> Option<u64> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

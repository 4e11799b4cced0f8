use super::AppState;
use crate::{Error, Result, range::parse_byte_range, types::RangeQuery};
use axum::{
    body::Body,
    extract::{Path, RawQuery, State},
    http::{HeaderMap, StatusCode, header},
    response::Response,
};

/// Serve a WARC file, or a byte range of it, by file name.
///
/// Ranged responses go out as 200 unless the server was started with
/// partial-content responses enabled.
pub async fn get_by_filename(
    State(state): State<AppState>,
    Path(name): Path<String>,
    RawQuery(raw_query): RawQuery,
    headers: HeaderMap,
) -> Result<Response> {
    let query = RangeQuery::parse(raw_query.as_deref().unwrap_or_default());
    let range = parse_byte_range(&query, &headers);
    tracing::info!(file = %name, offset = ?range.offset(), length = ?range.length(), "looking up range");

    // The snapshot is released here; streaming does not hold the index.
    let record = state.index.lookup(&name)?;
    let content = state.streamer.open(&record, range).await?;

    let status = if content.is_partial() && state.partial_content {
        StatusCode::PARTIAL_CONTENT
    } else {
        StatusCode::OK
    };

    let builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, content.content_type.as_str());
    let builder = match &content.content_range {
        Some(content_range) => builder.header(header::CONTENT_RANGE, content_range.as_str()),
        None => builder.header(header::ACCEPT_RANGES, "bytes"),
    };
    let builder = match content.content_length() {
        Some(length) => builder.header(header::CONTENT_LENGTH, length),
        None => builder,
    };

    builder
        .body(Body::from_stream(content.body))
        .map_err(|e| Error::Internal(format!("failed to build response: {}", e)))
}

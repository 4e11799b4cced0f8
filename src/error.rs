use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub message: String,
}

impl Error {
    fn error_type(&self) -> &'static str {
        match self {
            Error::NotFound(_) => "NotFound",
            Error::Upstream(_) => "UpstreamError",
            Error::Io(_) | Error::Internal(_) => "InternalError",
        }
    }

    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::Upstream(_) => StatusCode::BAD_GATEWAY,
            Error::Io(_) | Error::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        if matches!(self, Error::NotFound(_)) {
            tracing::debug!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, "request failed");
        }
        let body = ErrorResponse {
            error: ErrorBody {
                kind: self.error_type(),
                message: self.to_string(),
            },
        };
        (self.status_code(), axum::Json(body)).into_response()
    }
}

/// Cut an upstream response body down to something fit for a log line.
pub(crate) fn truncate_body(body: &str, max: usize) -> &str {
    if body.len() <= max {
        return body;
    }
    let mut end = max;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    &body[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            Error::NotFound("x".into()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::Upstream("x".into()).status_code(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Error::Internal("x".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_truncate_body() {
        assert_eq!(truncate_body("short", 1024), "short");
        assert_eq!(truncate_body("abcdef", 3), "abc");
        // never splits a multi-byte character
        assert_eq!(truncate_body("aé", 2), "a");
    }
}

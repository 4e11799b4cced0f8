//! WebHDFS gateway backend.
//!
//! Files held in HDFS are proxied through the gateway's `OPEN` operation,
//! which takes `offset` and `length` query parameters. The gateway does not
//! tell us the total object size, so ranged responses use the open-ended
//! `*` form in their content range.

use super::{ContentStream, OCTET_STREAM, chunked};
use crate::{Error, Result, error::truncate_body, types::ByteRange};
use futures::TryStreamExt;
use reqwest::Client;
use std::time::Duration;
use tokio_util::io::StreamReader;
use url::Url;

const MAX_LOGGED_BODY: usize = 1024;

pub struct WebHdfsStorage {
    client: Client,
    prefix: String,
    user: String,
}

impl WebHdfsStorage {
    /// Create a new WebHdfsStorage instance.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Gateway URL prefix the HDFS path is appended to
    ///   (e.g., "http://hdfs.example.org/webhdfs/v1")
    /// * `user` - Value sent as `user.name`
    /// * `connect_timeout` - Connect timeout for gateway requests
    pub fn new(prefix: String, user: String, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            prefix: prefix.trim_end_matches('/').to_string(),
            user,
        })
    }

    /// Build the gateway request URL for `path`.
    ///
    /// A record's own access URL keeps its query parameters, with `offset`
    /// and `length` replaced by the requested range.
    pub fn request_url(
        &self,
        path: &str,
        access_url: Option<&Url>,
        range: ByteRange,
    ) -> Result<Url> {
        let mut url = match access_url {
            Some(access_url) => {
                let mut url = access_url.clone();
                let kept: Vec<(String, String)> = access_url
                    .query_pairs()
                    .filter(|(k, _)| k != "offset" && k != "length")
                    .map(|(k, v)| (k.into_owned(), v.into_owned()))
                    .collect();
                url.set_query(None);
                if !kept.is_empty() {
                    url.query_pairs_mut().extend_pairs(kept);
                }
                url
            }
            None => {
                let raw = format!("{}/{}", self.prefix, path.trim_start_matches('/'));
                let mut url = Url::parse(&raw)
                    .map_err(|e| Error::Internal(format!("bad WebHDFS URL {}: {}", raw, e)))?;
                url.query_pairs_mut()
                    .append_pair("op", "OPEN")
                    .append_pair("user.name", &self.user);
                url
            }
        };

        if let Some(offset) = range.offset() {
            url.query_pairs_mut()
                .append_pair("offset", &offset.to_string());
        }
        // A zero length is sent as no length at all.
        if let Some(length) = range.length().filter(|&length| length > 0) {
            url.query_pairs_mut()
                .append_pair("length", &length.to_string());
        }
        Ok(url)
    }

    /// Request the range from the gateway and proxy the body.
    pub async fn open(
        &self,
        path: &str,
        access_url: Option<&Url>,
        range: ByteRange,
    ) -> Result<ContentStream> {
        let url = self.request_url(path, access_url, range)?;
        tracing::debug!(%url, "requesting from WebHDFS");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("WebHDFS request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                %url,
                %status,
                body = truncate_body(&body, MAX_LOGGED_BODY),
                "WebHDFS returned an error"
            );
            return Err(Error::Upstream(format!("WebHDFS returned {} for {}", status, path)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(OCTET_STREAM)
            .to_string();
        let total_size = match range {
            ByteRange::Whole => response.content_length(),
            _ => None,
        };

        let reader = StreamReader::new(response.bytes_stream().map_err(std::io::Error::other));

        Ok(ContentStream {
            body: chunked(reader),
            content_type,
            total_size,
            content_range: content_range(range),
        })
    }
}

fn content_range(range: ByteRange) -> Option<String> {
    match range {
        ByteRange::Whole => None,
        ByteRange::From { offset } => Some(format!("bytes {}-*/*", offset)),
        ByteRange::Slice { offset, length: 0 } => Some(format!("bytes {}-*/*", offset)),
        ByteRange::Slice { offset, length } => Some(format!(
            "bytes {}-{}/*",
            offset,
            offset.saturating_add(length - 1)
        )),
    }
}

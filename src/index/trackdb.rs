//! Pulls the list of WARC files held in HDFS from the tracking database.
//!
//! The tracking database is a Solr core. One bulk `select` returns every
//! WARC record as CSV; the rows are sorted by file name, then by refresh
//! time ascending, so when a file is listed more than once the most recently
//! refreshed row is applied last and survives.

use super::{RecordBatch, Source, Updater};
use crate::{Error, Result, error::truncate_body, types::FileRecord};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use std::time::Duration;
use url::Url;

const FIELDS: &str = "file_name_s,file_path_s,access_url_s";
const QUERY: &str = "kind_s:warcs AND file_path_s:[* TO *]";
const SORT: &str = "file_name_s desc,refresh_date_dt asc";
const MAX_LOGGED_BODY: usize = 1024;

pub struct TrackDbSync {
    client: Client,
    select_url: String,
    max_rows: u64,
}

impl TrackDbSync {
    /// Create a sync job against the Solr core at `trackdb_url`.
    pub fn new(trackdb_url: &str, max_rows: u64, connect_timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            select_url: format!("{}/select", trackdb_url.trim_end_matches('/')),
            max_rows,
        })
    }

    /// Fetch the full remote file list.
    ///
    /// Nothing is returned unless the whole response was read and parsed.
    pub async fn fetch(&self) -> Result<RecordBatch> {
        let rows = self.max_rows.to_string();
        let response = self
            .client
            .get(&self.select_url)
            .query(&[
                ("q", QUERY),
                ("fl", FIELDS),
                ("sort", SORT),
                ("rows", rows.as_str()),
                ("wt", "csv"),
            ])
            .send()
            .await
            .map_err(|e| Error::Upstream(format!("tracking database request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(
                %status,
                body = truncate_body(&body, MAX_LOGGED_BODY),
                "tracking database returned an error"
            );
            return Err(Error::Upstream(format!(
                "tracking database returned {}",
                status
            )));
        }

        let mut batch = RecordBatch::new();
        let mut lines = LineBuffer::default();
        let mut seen_header = false;
        let mut skipped = 0usize;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| {
                Error::Upstream(format!("tracking database response failed: {}", e))
            })?;
            for line in lines.push(&chunk)? {
                if !seen_header {
                    seen_header = true;
                    continue;
                }
                match parse_row(&line) {
                    Some(record) => batch.insert(record),
                    None => skipped += 1,
                }
            }
        }
        if let Some(line) = lines.finish()? {
            if seen_header {
                match parse_row(&line) {
                    Some(record) => batch.insert(record),
                    None => skipped += 1,
                }
            }
        }

        if skipped > 0 {
            tracing::debug!(skipped, "skipped incomplete tracking database rows");
        }
        Ok(batch)
    }
}

#[async_trait]
impl Updater for TrackDbSync {
    fn source(&self) -> Source {
        Source::TrackDb
    }

    fn name(&self) -> &'static str {
        "trackdb"
    }

    async fn refresh(&self) -> Result<RecordBatch> {
        tracing::debug!(url = %self.select_url, "pulling file list from tracking database");
        self.fetch().await
    }
}

/// Turn one CSV row into a remote record. Rows without a name or a path are
/// dropped.
fn parse_row(line: &str) -> Option<FileRecord> {
    if line.trim().is_empty() {
        return None;
    }
    let mut fields = parse_csv_line(line).into_iter();
    let name = fields.next().filter(|s| !s.is_empty())?;
    let path = fields.next().filter(|s| !s.is_empty())?;
    let access_url = fields
        .next()
        .filter(|s| !s.is_empty())
        .and_then(|s| match Url::parse(&s) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(file = %name, access_url = %s, error = %e, "ignoring bad access URL");
                None
            }
        });
    Some(FileRecord::remote(name, path, access_url))
}

/// Split one CSV line into fields, honouring double-quoted fields and `""`
/// escapes.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' if field.is_empty() => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}

/// Reassembles lines from a chunked body.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Result<Vec<String>> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(decode_line(&line[..pos])?);
        }
        Ok(lines)
    }

    fn finish(self) -> Result<Option<String>> {
        if self.pending.is_empty() {
            return Ok(None);
        }
        decode_line(&self.pending).map(Some)
    }
}

fn decode_line(bytes: &[u8]) -> Result<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|e| Error::Upstream(format!("tracking database sent invalid UTF-8: {}", e)))
}

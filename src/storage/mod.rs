//! Streaming byte ranges out of the storage backends.
//!
//! [`ContentStreamer`] takes a resolved [`FileRecord`] and a [`ByteRange`]
//! and produces a [`ContentStream`]: a lazy body of bounded chunks plus the
//! metadata needed to build the response headers. Every backend goes through
//! the same chunking, so memory use does not depend on the object size and a
//! disconnected client stops the reads.
//!
//! # Implementations
//!
//! - [`LocalStorage`] - files on a locally mounted filesystem
//! - [`WebHdfsStorage`] - files in HDFS behind a WebHDFS gateway
//!
//! # Example
//!
//! ```no_run
//! use warcserver::storage::{ContentStreamer, LocalStorage, WebHdfsStorage};
//! use std::time::Duration;
//!
//! let webhdfs = WebHdfsStorage::new(
//!     "http://hdfs.example.org/webhdfs/v1".to_string(),
//!     "access".to_string(),
//!     Duration::from_secs(10),
//! )
//! .unwrap();
//! let streamer = ContentStreamer::new(LocalStorage::new(), webhdfs);
//! ```

mod local;
mod webhdfs;

pub use local::LocalStorage;
pub use webhdfs::WebHdfsStorage;

use crate::{
    Result,
    types::{Backend, ByteRange, FileRecord},
};
use bytes::Bytes;
use futures::stream::BoxStream;
use tokio::io::AsyncRead;
use tokio_util::io::ReaderStream;

/// Size of the chunks handed to the HTTP response writer.
pub const CHUNK_SIZE: usize = 1024;

pub const OCTET_STREAM: &str = "application/octet-stream";

/// A lazily read, bounded-chunk response body and what is known about it.
pub struct ContentStream {
    pub body: BoxStream<'static, std::io::Result<Bytes>>,
    pub content_type: String,
    /// Total object size, when the backend can tell.
    pub total_size: Option<u64>,
    /// `Content-Range` value for explicit range requests, `None` for whole
    /// objects.
    pub content_range: Option<String>,
}

impl ContentStream {
    pub fn is_partial(&self) -> bool {
        self.content_range.is_some()
    }

    /// Body length to advertise. Only whole-object responses of known size
    /// have one; ranged bodies may end early.
    pub fn content_length(&self) -> Option<u64> {
        if self.is_partial() {
            None
        } else {
            self.total_size
        }
    }

    /// Drain the body into memory.
    #[cfg(test)]
    pub(crate) async fn collect_bytes(self) -> std::io::Result<Vec<u8>> {
        use futures::TryStreamExt;
        self.body
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
    }
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStream")
            .field("content_type", &self.content_type)
            .field("total_size", &self.total_size)
            .field("content_range", &self.content_range)
            .finish_non_exhaustive()
    }
}

/// Wrap a reader as a stream of chunks no larger than [`CHUNK_SIZE`].
pub(crate) fn chunked<R>(reader: R) -> BoxStream<'static, std::io::Result<Bytes>>
where
    R: AsyncRead + Send + 'static,
{
    Box::pin(ReaderStream::with_capacity(reader, CHUNK_SIZE))
}

/// Dispatches a record to the backend that holds it.
pub struct ContentStreamer {
    local: LocalStorage,
    webhdfs: WebHdfsStorage,
}

impl ContentStreamer {
    pub fn new(local: LocalStorage, webhdfs: WebHdfsStorage) -> Self {
        Self { local, webhdfs }
    }

    pub async fn open(&self, record: &FileRecord, range: ByteRange) -> Result<ContentStream> {
        match &record.backend {
            Backend::Local { path } => self.local.open(&record.key, path, range).await,
            Backend::Remote { path, access_url } => {
                self.webhdfs.open(path, access_url.as_ref(), range).await
            }
        }
    }
}

use super::{ContentStream, OCTET_STREAM, chunked};
use crate::{Error, Result, types::ByteRange};
use bytes::Bytes;
use futures::StreamExt;
use std::io::{ErrorKind, SeekFrom};
use std::path::Path;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncSeekExt};

/// Reads WARC files straight off a local filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalStorage;

impl LocalStorage {
    pub fn new() -> Self {
        Self
    }

    /// Open `path` and stream the requested range.
    ///
    /// Files that are still being written may hold fewer bytes than asked
    /// for; the stream then simply ends early.
    pub async fn open(&self, key: &str, path: &Path, range: ByteRange) -> Result<ContentStream> {
        let mut file = fs::File::open(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(key.to_string()),
            _ => Error::Io(e),
        })?;
        let size = file.metadata().await?.len();

        let offset = range.offset().unwrap_or(0);
        let length = range
            .length()
            .unwrap_or_else(|| size.saturating_sub(offset));
        tracing::debug!(path = %path.display(), offset, length, size, "streaming local file");

        let content_range = range
            .is_explicit()
            .then(|| content_range(offset, length, size));

        // Nothing to read at or past EOF, and offsets beyond i64::MAX cannot
        // be seeked to anyway.
        let body = if offset >= size {
            futures::stream::empty::<std::io::Result<Bytes>>().boxed()
        } else {
            file.seek(SeekFrom::Start(offset)).await?;
            chunked(file.take(length))
        };

        Ok(ContentStream {
            body,
            content_type: OCTET_STREAM.to_string(),
            total_size: Some(size),
            content_range,
        })
    }
}

fn content_range(offset: u64, length: u64, size: u64) -> String {
    if length == 0 {
        format!("bytes */{}", size)
    } else {
        format!("bytes {}-{}/{}", offset, offset.saturating_add(length - 1), size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::CHUNK_SIZE;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn sample_file(len: usize) -> (NamedTempFile, Vec<u8>) {
        let data: Vec<u8> = (0..len).map(|i| (i % 251) as u8).collect();
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&data).unwrap();
        file.flush().unwrap();
        (file, data)
    }

    #[tokio::test]
    async fn test_whole_file() {
        let (file, data) = sample_file(5000);
        let stream = LocalStorage::new()
            .open("f", file.path(), ByteRange::Whole)
            .await
            .unwrap();

        assert!(!stream.is_partial());
        assert_eq!(stream.total_size, Some(5000));
        assert_eq!(stream.content_length(), Some(5000));
        assert_eq!(stream.collect_bytes().await.unwrap(), data);
    }

    #[tokio::test]
    async fn test_slice() {
        let (file, data) = sample_file(100);
        let stream = LocalStorage::new()
            .open(
                "f",
                file.path(),
                ByteRange::Slice {
                    offset: 10,
                    length: 10,
                },
            )
            .await
            .unwrap();

        assert_eq!(stream.content_range.as_deref(), Some("bytes 10-19/100"));
        assert_eq!(stream.content_length(), None);
        assert_eq!(stream.collect_bytes().await.unwrap(), &data[10..20]);
    }

    #[tokio::test]
    async fn test_from_offset_to_end() {
        let (file, data) = sample_file(100);
        let stream = LocalStorage::new()
            .open("f", file.path(), ByteRange::From { offset: 90 })
            .await
            .unwrap();

        assert_eq!(stream.content_range.as_deref(), Some("bytes 90-99/100"));
        assert_eq!(stream.collect_bytes().await.unwrap(), &data[90..]);
    }

    #[tokio::test]
    async fn test_short_read_is_not_an_error() {
        let (file, data) = sample_file(50);
        let stream = LocalStorage::new()
            .open(
                "f",
                file.path(),
                ByteRange::Slice {
                    offset: 40,
                    length: 100,
                },
            )
            .await
            .unwrap();

        assert_eq!(stream.content_range.as_deref(), Some("bytes 40-139/50"));
        assert_eq!(stream.collect_bytes().await.unwrap(), &data[40..]);
    }

    #[tokio::test]
    async fn test_offset_past_end() {
        let (file, _) = sample_file(50);
        let stream = LocalStorage::new()
            .open("f", file.path(), ByteRange::From { offset: 80 })
            .await
            .unwrap();

        assert_eq!(stream.content_range.as_deref(), Some("bytes */50"));
        assert!(stream.collect_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_huge_offset_is_empty_not_an_error() {
        let (file, _) = sample_file(50);
        let stream = LocalStorage::new()
            .open("f", file.path(), ByteRange::From { offset: u64::MAX })
            .await
            .unwrap();

        assert_eq!(stream.content_range.as_deref(), Some("bytes */50"));
        assert!(stream.collect_bytes().await.unwrap().is_empty());

        let stream = LocalStorage::new()
            .open(
                "f",
                file.path(),
                ByteRange::Slice {
                    offset: i64::MAX as u64 + 1,
                    length: 10,
                },
            )
            .await
            .unwrap();
        assert!(stream.collect_bytes().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_huge_length_does_not_overflow() {
        let (file, data) = sample_file(50);
        let stream = LocalStorage::new()
            .open(
                "f",
                file.path(),
                ByteRange::Slice {
                    offset: 5,
                    length: u64::MAX,
                },
            )
            .await
            .unwrap();

        assert_eq!(
            stream.content_range.as_deref(),
            Some("bytes 5-18446744073709551615/50")
        );
        assert_eq!(stream.collect_bytes().await.unwrap(), &data[5..]);
    }

    #[tokio::test]
    async fn test_chunks_are_bounded() {
        let (file, _) = sample_file(CHUNK_SIZE * 3 + 17);
        let stream = LocalStorage::new()
            .open("f", file.path(), ByteRange::Whole)
            .await
            .unwrap();

        let chunks: Vec<_> = stream.body.map(|c| c.unwrap().len()).collect().await;
        assert!(chunks.iter().all(|&len| len <= CHUNK_SIZE));
        assert_eq!(chunks.iter().sum::<usize>(), CHUNK_SIZE * 3 + 17);
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = LocalStorage::new()
            .open("gone.warc.gz", &dir.path().join("gone.warc.gz"), ByteRange::Whole)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}

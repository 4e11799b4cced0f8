use serde::Serialize;
use std::path::PathBuf;
use url::Url;

/// Suffix carried by WARC files that are still being written.
pub const OPEN_SUFFIX: &str = ".open";

/// Where one named WARC file currently lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    pub key: String,
    pub backend: Backend,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// A file on a locally mounted filesystem.
    Local { path: PathBuf },
    /// A file in HDFS, reached through the WebHDFS gateway. A pre-built
    /// access URL takes precedence over the default gateway URL.
    Remote {
        path: String,
        access_url: Option<Url>,
    },
}

impl FileRecord {
    pub fn local(key: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            key: key.into(),
            backend: Backend::Local { path: path.into() },
        }
    }

    pub fn remote(key: impl Into<String>, path: impl Into<String>, access_url: Option<Url>) -> Self {
        Self {
            key: key.into(),
            backend: Backend::Remote {
                path: path.into(),
                access_url,
            },
        }
    }

    pub fn is_open(&self) -> bool {
        self.key.ends_with(OPEN_SUFFIX)
    }
}

/// Resolved byte range of a request.
///
/// `Whole` means no range semantics were asked for. `From` reads to the end
/// of the object, wherever the backend says that is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteRange {
    #[default]
    Whole,
    From { offset: u64 },
    Slice { offset: u64, length: u64 },
}

impl ByteRange {
    pub fn offset(&self) -> Option<u64> {
        match self {
            ByteRange::Whole => None,
            ByteRange::From { offset } | ByteRange::Slice { offset, .. } => Some(*offset),
        }
    }

    pub fn length(&self) -> Option<u64> {
        match self {
            ByteRange::Slice { length, .. } => Some(*length),
            ByteRange::Whole | ByteRange::From { .. } => None,
        }
    }

    pub fn is_explicit(&self) -> bool {
        !matches!(self, ByteRange::Whole)
    }
}

/// WebHDFS-style range parameters (`offset=<n>[&length=<n>]`).
///
/// Kept as strings so that garbage degrades to "no range" rather than a
/// rejected request.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RangeQuery {
    pub offset: Option<String>,
    pub length: Option<String>,
}

impl RangeQuery {
    /// Pick `offset` and `length` out of a raw query string. The first
    /// occurrence of a repeated parameter wins; everything else is ignored.
    pub fn parse(query: &str) -> Self {
        let mut parsed = RangeQuery::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "offset" => &mut parsed.offset,
                "length" => &mut parsed.length,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(value.into_owned());
            }
        }
        parsed
    }
}

/// Document served at `/`.
#[derive(Debug, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub version: String,
    pub files: IndexStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub local: usize,
    pub remote: usize,
}

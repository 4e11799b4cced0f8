//! Process-wide map from WARC filename to the place it is stored.
//!
//! The index holds one [`RecordBatch`] per [`Source`]. Each updater builds a
//! complete batch off to the side and publishes it with
//! [`LocationIndex::upsert_batch`], which swaps in a new [`IndexSnapshot`].
//! Readers clone the current snapshot `Arc` and never see a half-applied
//! batch.
//!
//! # Precedence
//!
//! A name may be known to both sources while a file is being moved into
//! HDFS. Lookups try the exact name before the `.open` alias, and for each
//! candidate the local view is consulted before the remote one.

mod filesystem;
mod trackdb;

pub use filesystem::FilesystemScanner;
pub use trackdb::{TrackDbSync, parse_csv_line};

use crate::{
    Error, Result,
    types::{FileRecord, IndexStats, OPEN_SUFFIX},
};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Which updater contributed a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Filesystem,
    TrackDb,
}

/// A complete view of the files one source knows about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordBatch {
    records: HashMap<String, Arc<FileRecord>>,
}

impl RecordBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record, replacing any earlier record with the same key.
    pub fn insert(&mut self, record: FileRecord) {
        self.records.insert(record.key.clone(), Arc::new(record));
    }

    pub fn get(&self, key: &str) -> Option<&Arc<FileRecord>> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    /// Drop `name.open` wherever `name` is also present.
    ///
    /// Returns the number of aliases removed.
    pub fn reconcile_open_variants(&mut self) -> usize {
        let stale: Vec<String> = self
            .records
            .keys()
            .filter_map(|key| {
                let base = key.strip_suffix(OPEN_SUFFIX)?;
                self.records.contains_key(base).then(|| key.clone())
            })
            .collect();

        for key in &stale {
            self.records.remove(key);
        }
        stale.len()
    }
}

impl FromIterator<FileRecord> for RecordBatch {
    fn from_iter<I: IntoIterator<Item = FileRecord>>(iter: I) -> Self {
        let mut batch = RecordBatch::new();
        for record in iter {
            batch.insert(record);
        }
        batch
    }
}

/// An immutable, consistent view of both sources.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    local: Arc<RecordBatch>,
    remote: Arc<RecordBatch>,
}

impl IndexSnapshot {
    pub fn batch(&self, source: Source) -> &RecordBatch {
        match source {
            Source::Filesystem => &self.local,
            Source::TrackDb => &self.remote,
        }
    }

    /// Find a file by name, ignoring any leading path.
    pub fn lookup(&self, filename: &str) -> Option<Arc<FileRecord>> {
        let name = base_name(filename);
        if name.is_empty() {
            return None;
        }
        let open_name = format!("{name}{OPEN_SUFFIX}");

        [name, open_name.as_str()].into_iter().find_map(|candidate| {
            self.local
                .get(candidate)
                .or_else(|| self.remote.get(candidate))
                .cloned()
        })
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats {
            local: self.local.len(),
            remote: self.remote.len(),
        }
    }
}

/// Concurrency-safe filename → location map shared by the whole process.
#[derive(Debug, Default)]
pub struct LocationIndex {
    current: RwLock<Arc<IndexSnapshot>>,
}

impl LocationIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace everything previously contributed by `source` with `batch`.
    pub fn upsert_batch(&self, source: Source, batch: RecordBatch) {
        let batch = Arc::new(batch);
        let mut current = self.current.write();
        let next = match source {
            Source::Filesystem => IndexSnapshot {
                local: batch,
                remote: Arc::clone(&current.remote),
            },
            Source::TrackDb => IndexSnapshot {
                local: Arc::clone(&current.local),
                remote: batch,
            },
        };
        *current = Arc::new(next);
    }

    /// The current view. Holding it does not block writers.
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.current.read().clone()
    }

    pub fn lookup(&self, filename: &str) -> Result<Arc<FileRecord>> {
        self.snapshot()
            .lookup(filename)
            .ok_or_else(|| Error::NotFound(filename.to_string()))
    }

    pub fn stats(&self) -> IndexStats {
        self.snapshot().stats()
    }
}

fn base_name(filename: &str) -> &str {
    filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
}

/// A background job that periodically produces a fresh batch for one source.
#[async_trait]
pub trait Updater: Send + Sync {
    fn source(&self) -> Source;

    fn name(&self) -> &'static str;

    /// Build a complete batch. On error nothing is published.
    async fn refresh(&self) -> Result<RecordBatch>;
}

/// Run one refresh pass and publish the result if it succeeded.
pub async fn refresh_once<U: Updater + ?Sized>(updater: &U, index: &LocationIndex) -> Result<usize> {
    let batch = updater.refresh().await?;
    let count = batch.len();
    index.upsert_batch(updater.source(), batch);
    Ok(count)
}

/// Drive `updater` until `shutdown` fires, waiting `interval` between passes.
///
/// A failed pass is logged and the previously published batch stays in place.
pub async fn run_updater<U: Updater + ?Sized>(
    updater: Arc<U>,
    index: Arc<LocationIndex>,
    interval: Duration,
    shutdown: CancellationToken,
) {
    tracing::debug!(updater = updater.name(), ?interval, "starting updater");
    loop {
        let pass = tokio::select! {
            result = refresh_once(updater.as_ref(), &index) => result,
            _ = shutdown.cancelled() => break,
        };

        match pass {
            Ok(count) => tracing::info!(updater = updater.name(), count, "published file list"),
            Err(e) => tracing::error!(
                updater = updater.name(),
                error = %e,
                "refresh failed, keeping previous file list"
            ),
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = shutdown.cancelled() => break,
        }
    }
    tracing::debug!(updater = updater.name(), "updater stopped");
}

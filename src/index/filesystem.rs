use super::{RecordBatch, Source, Updater};
use crate::{Error, Result, types::FileRecord};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks the configured local roots and reports every file found.
#[derive(Debug, Clone)]
pub struct FilesystemScanner {
    roots: Vec<PathBuf>,
}

impl FilesystemScanner {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self { roots }
    }

    pub fn roots(&self) -> &[PathBuf] {
        &self.roots
    }

    /// Walk every root and build a batch keyed by file name.
    ///
    /// Entries that cannot be read (dangling links, unreadable directories,
    /// missing roots) are logged and skipped. The pass fails only when none
    /// of the roots could be read.
    pub fn scan(&self) -> Result<RecordBatch> {
        let mut batch = RecordBatch::new();
        let mut readable_roots = 0usize;
        for root in &self.roots {
            if scan_root(root, &mut batch) {
                readable_roots += 1;
            }
        }

        if readable_roots == 0 && !self.roots.is_empty() {
            return Err(Error::Io(std::io::Error::other(format!(
                "none of the search roots could be read: {:?}",
                self.roots
            ))));
        }

        let dropped = batch.reconcile_open_variants();
        if dropped > 0 {
            tracing::debug!(dropped, "dropped .open aliases of finalized files");
        }
        Ok(batch)
    }
}

/// Add every file under `root` to `batch`. Returns whether the root itself
/// could be read.
fn scan_root(root: &Path, batch: &mut RecordBatch) -> bool {
    tracing::trace!(root = %root.display(), "scanning");
    let mut root_readable = true;
    for entry in WalkDir::new(root).follow_links(true) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                if e.depth() == 0 {
                    root_readable = false;
                }
                tracing::warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Some(name) = entry.file_name().to_str() else {
            tracing::warn!(path = %entry.path().display(), "skipping non UTF-8 file name");
            continue;
        };
        match std::path::absolute(entry.path()) {
            Ok(path) => batch.insert(FileRecord::local(name, path)),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "skipping file")
            }
        }
    }
    root_readable
}

#[async_trait]
impl Updater for FilesystemScanner {
    fn source(&self) -> Source {
        Source::Filesystem
    }

    fn name(&self) -> &'static str {
        "filesystem"
    }

    async fn refresh(&self) -> Result<RecordBatch> {
        tracing::debug!(roots = ?self.roots, "scanning filesystem for files");
        let scanner = self.clone();
        tokio::task::spawn_blocking(move || scanner.scan())
            .await
            .map_err(|e| Error::Internal(format!("filesystem scan panicked: {}", e)))?
    }
}

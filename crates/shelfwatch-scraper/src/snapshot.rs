//! Diagnostic page snapshots.
//!
//! Strategies call [`SnapshotSink::capture`] after acquiring a results page
//! and whenever a block page is detected. Whether anything is written is up
//! to the sink; failures are logged and never affect the run.

use std::path::PathBuf;

use async_trait::async_trait;

#[derive(Debug, Clone, Copy)]
pub enum Snapshot<'a> {
    Markup(&'a str),
    Image(&'a [u8]),
}

impl Snapshot<'_> {
    fn extension(&self) -> &'static str {
        match self {
            Snapshot::Markup(_) => "html",
            Snapshot::Image(_) => "png",
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            Snapshot::Markup(html) => html.as_bytes(),
            Snapshot::Image(png) => png,
        }
    }
}

#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn capture(&self, name: &str, snapshot: Snapshot<'_>);
}

/// Writes `{dir}/{name}.html` or `{dir}/{name}.png`, overwriting.
#[derive(Debug, Clone)]
pub struct DirectorySnapshots {
    dir: PathBuf,
}

impl DirectorySnapshots {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[must_use]
    pub fn path_for(&self, name: &str, snapshot: &Snapshot<'_>) -> PathBuf {
        self.dir.join(format!("{name}.{}", snapshot.extension()))
    }
}

#[async_trait]
impl SnapshotSink for DirectorySnapshots {
    async fn capture(&self, name: &str, snapshot: Snapshot<'_>) {
        let path = self.path_for(name, &snapshot);
        if let Err(e) = tokio::fs::create_dir_all(&self.dir).await {
            tracing::warn!(dir = %self.dir.display(), error = %e, "could not create snapshot directory");
            return;
        }
        match tokio::fs::write(&path, snapshot.bytes()).await {
            Ok(()) => tracing::info!(path = %path.display(), "saved page snapshot"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "failed to save page snapshot"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSnapshots;

#[async_trait]
impl SnapshotSink for NoopSnapshots {
    async fn capture(&self, _name: &str, _snapshot: Snapshot<'_>) {}
}

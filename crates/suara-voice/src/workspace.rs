//! Per-request scratch directories.

use crate::error::VoiceError;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing::{debug, warn};
use uuid::Uuid;

/// A uniquely named scratch directory owned by one request.
///
/// Holds the input audio copy, the recognition engine's transcript file and
/// the synthesized audio. The directory and everything in it is removed by
/// [`Workspace::close`], or on drop if the request is cancelled first.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    dir: TempDir,
}

impl Workspace {
    /// Creates a new workspace under `root`, creating `root` if needed.
    ///
    /// The filesystem work runs on the blocking pool. If the caller is
    /// cancelled mid-creation the directory is removed when the blocking
    /// task's result is dropped.
    pub async fn create(root: &Path) -> Result<Self, VoiceError> {
        let root = root.to_path_buf();
        let id = Uuid::new_v4();
        let dir = tokio::task::spawn_blocking(move || -> std::io::Result<TempDir> {
            std::fs::create_dir_all(&root)?;
            tempfile::Builder::new()
                .prefix(&format!("suara-{}-", id))
                .tempdir_in(&root)
        })
        .await
        .map_err(|e| VoiceError::Workspace(std::io::Error::other(e)))??;
        debug!(workspace_id = %id, path = ?dir.path(), "created workspace");
        Ok(Self { id, dir })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path of a named file inside the workspace.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Path of a file whose name cannot collide with any other in the
    /// workspace: `<stem>-<uuid>.<extension>`.
    pub fn unique_file(&self, stem: &str, extension: &str) -> PathBuf {
        self.file(&format!("{}-{}.{}", stem, Uuid::new_v4(), extension))
    }

    /// Removes the directory and its contents off the async scheduler.
    pub async fn close(self) {
        let id = self.id;
        match tokio::task::spawn_blocking(move || self.dir.close()).await {
            Ok(Ok(())) => debug!(workspace_id = %id, "removed workspace"),
            Ok(Err(e)) => warn!(workspace_id = %id, error = %e, "failed to remove workspace"),
            Err(e) => warn!(workspace_id = %id, error = %e, "workspace cleanup task failed"),
        }
    }
}

use std::path::{Path, PathBuf};

use anyhow::Context as _;

use crate::foundation::error::ReelResult;

/// Per-request scratch directory, removed when dropped.
#[derive(Debug)]
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    /// Create a fresh directory under `root`, or under the system temp dir.
    pub fn create(root: Option<&Path>) -> ReelResult<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("reelcast-");
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)
                    .with_context(|| format!("create temp root '{}'", root.display()))?;
                builder.tempdir_in(root)
            }
            None => builder.tempdir(),
        }
        .context("create request workspace")?;
        Ok(Self { dir })
    }

    /// Directory of the workspace.
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Path for `name` inside the workspace, without creating it.
    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Write `bytes` to `name` and return the full path.
    pub async fn write(&self, name: &str, bytes: &[u8]) -> ReelResult<PathBuf> {
        let path = self.file(name);
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("write '{}'", path.display()))?;
        Ok(path)
    }

    /// Remove the directory now, reporting failures instead of ignoring them.
    pub fn release(self) -> ReelResult<()> {
        let path = self.dir.path().to_path_buf();
        self.dir
            .close()
            .with_context(|| format!("remove workspace '{}'", path.display()))?;
        Ok(())
    }
}

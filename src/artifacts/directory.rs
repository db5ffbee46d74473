use super::{io_error, object_path, ArtifactError, ArtifactStore};
use std::fs;
use std::path::{Path, PathBuf};

/// Store backed by a mounted directory: `latch:///a/b.log` lands at
/// `<root>/a/b.log`.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn resolve(&self, remote: &str) -> Result<PathBuf, ArtifactError> {
        Ok(self.root.join(object_path(remote)?))
    }
}

impl ArtifactStore for DirectoryStore {
    fn upload(&self, local: &Path, remote: &str) -> Result<(), ArtifactError> {
        let target = self.resolve(remote)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        fs::copy(local, &target).map_err(|e| io_error(&target, e))?;
        Ok(())
    }
}

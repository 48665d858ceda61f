//! Private and public compilation storage areas.
//!
//! A compile run owns exactly two areas under its destination directory:
//! the private area (everything the execution engine needs) and the public
//! area (only delivery-accessible assets). Area ids are unique per run and
//! end up joined in the invocation descriptor.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use uuid::Uuid;

/// One uniquely identified storage directory.
#[derive(Debug, Clone)]
pub struct StorageArea {
    id: String,
    root: PathBuf,
}

impl StorageArea {
    /// Spawn a fresh area under `parent`, named `{prefix}-{uuid}`.
    pub fn spawn(parent: &Path, prefix: &str) -> Result<Self> {
        let id = format!("{prefix}-{}", Uuid::new_v4());
        let root = parent.join(&id);
        std::fs::create_dir_all(&root)
            .with_context(|| format!("failed to create storage area {}", root.display()))?;
        Ok(Self { id, root })
    }

    /// Open an existing area directory, using its directory name as id.
    pub fn open(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!("storage area does not exist: {}", root.display());
        }
        let id = root
            .file_name()
            .and_then(|n| n.to_str())
            .context("storage area path has no directory name")?
            .to_string();
        Ok(Self {
            id,
            root: root.to_path_buf(),
        })
    }

    /// The unique identifier of this area.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// The root directory of this area.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `content` to a path relative to the area root, creating
    /// parent directories as needed.
    pub fn write(&self, relative: &Path, content: &str) -> Result<PathBuf> {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }

    /// Copy a file into the area at a relative destination path.
    pub fn copy_into(&self, source: &Path, relative: &Path) -> Result<()> {
        let destination = self.root.join(relative);
        if let Some(parent) = destination.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(source, &destination).with_context(|| {
            format!(
                "failed to copy {} to {}",
                source.display(),
                destination.display()
            )
        })?;
        Ok(())
    }

    /// Read a file relative to the area root.
    pub fn read_to_string(&self, relative: &Path) -> Result<String> {
        let path = self.root.join(relative);
        std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))
    }

    /// Remove a file relative to the area root.
    pub fn remove(&self, relative: &Path) -> Result<()> {
        let path = self.root.join(relative);
        std::fs::remove_file(&path)
            .with_context(|| format!("failed to remove {}", path.display()))
    }
}

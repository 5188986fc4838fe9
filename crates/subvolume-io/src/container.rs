//! Hierarchical containers of named datasets.

use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

use ndarray::ArrayViewD;
use serde::{Deserialize, Serialize};
use subvolume_core::ArrayLike;

use crate::error::{Result, StorageError};
use crate::store::{ChunkStore, Compression};

/// Whether a container is opened for reading only or may be written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Open an existing container for reading.
    #[default]
    Read,
    /// Open for reading and writing, creating the container if missing.
    ReadWrite,
}

/// Classification of a node inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    /// Holds further named nodes.
    Group,
    /// An array that can be read.
    Dataset,
}

/// A dataset handed out by a container.
pub type DatasetHandle = Box<dyn ArrayLike + Send + Sync>;

/// A file-like collection of datasets, one implementation per storage format.
pub trait Container: fmt::Debug + Send {
    /// Location the container was opened from.
    fn path(&self) -> &Path;

    /// Names of the nodes directly below the root, sorted.
    fn keys(&self) -> Result<Vec<String>>;

    /// Open the dataset called `name`.
    fn dataset(&self, name: &str) -> Result<DatasetHandle>;

    /// Whether `name` refers to a group or a dataset. The empty name and `/`
    /// are the root group.
    fn node_kind(&self, name: &str) -> Result<NodeKind>;

    /// Release backend resources. Called once, by [`OpenFile`](crate::OpenFile).
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// A directory of chunked datasets; subdirectories without metadata are
/// groups.
#[derive(Debug)]
pub struct ChunkContainer {
    root: PathBuf,
    mode: AccessMode,
}

impl ChunkContainer {
    /// Open the container at `path`.
    ///
    /// In `ReadWrite` mode a missing directory is created; in `Read` mode it
    /// must exist.
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        let root = path.as_ref().to_path_buf();
        match mode {
            AccessMode::ReadWrite => fs::create_dir_all(&root).map_err(StorageError::io(&root))?,
            AccessMode::Read if !root.is_dir() => {
                return Err(StorageError::Io {
                    path: root,
                    source: std::io::ErrorKind::NotFound.into(),
                })
            }
            AccessMode::Read => {}
        }
        tracing::debug!(path = %root.display(), ?mode, "opened chunk container");
        Ok(Self { root, mode })
    }

    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Resolve a node name to a path below the root.
    fn node_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(StorageError::MissingDataset(name.to_string()));
        }
        Ok(self.root.join(relative))
    }

    /// Create a dataset called `name` holding `data`.
    pub fn create_dataset(
        &self,
        name: &str,
        data: ArrayViewD<'_, f64>,
        chunks: &[usize],
        compression: Compression,
    ) -> Result<ChunkStore> {
        if self.mode == AccessMode::Read {
            return Err(StorageError::ReadOnly(self.root.clone()));
        }
        let store = ChunkStore::create(self.node_path(name)?, data.shape(), chunks, compression)?;
        store.write(data)?;
        Ok(store)
    }

    /// Open the dataset called `name`.
    pub fn open_dataset(&self, name: &str) -> Result<ChunkStore> {
        let path = self.node_path(name)?;
        if !ChunkStore::is_dataset(&path) {
            return Err(StorageError::MissingDataset(name.to_string()));
        }
        ChunkStore::open(path)
    }
}

impl Container for ChunkContainer {
    fn path(&self) -> &Path {
        &self.root
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.root).map_err(StorageError::io(&self.root))? {
            let entry = entry.map_err(StorageError::io(&self.root))?;
            if entry.path().is_dir() {
                keys.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }

    fn dataset(&self, name: &str) -> Result<DatasetHandle> {
        Ok(Box::new(self.open_dataset(name)?))
    }

    fn node_kind(&self, name: &str) -> Result<NodeKind> {
        let path = self.node_path(name)?;
        if ChunkStore::is_dataset(&path) {
            Ok(NodeKind::Dataset)
        } else if path.is_dir() {
            Ok(NodeKind::Group)
        } else {
            Err(StorageError::MissingDataset(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, ArrayD};
    use subvolume_core::BoundingBox;

    fn data() -> ArrayD<f64> {
        Array2::from_shape_fn((12, 12), |(i, j)| (i * 12 + j) as f64).into_dyn()
    }

    #[test]
    fn test_create_and_list() {
        let dir = tempfile::tempdir().unwrap();
        let container = ChunkContainer::open(dir.path().join("vol.n5"), AccessMode::ReadWrite).unwrap();
        container
            .create_dataset("raw", data().view(), &[5, 5], Compression::Raw)
            .unwrap();
        container
            .create_dataset("seg/labels", data().view(), &[6, 6], Compression::Gzip { level: 1 })
            .unwrap();

        assert_eq!(container.keys().unwrap(), vec!["raw", "seg"]);
        assert_eq!(container.node_kind("raw").unwrap(), NodeKind::Dataset);
        assert_eq!(container.node_kind("seg").unwrap(), NodeKind::Group);
        assert_eq!(container.node_kind("/seg/labels").unwrap(), NodeKind::Dataset);
        assert_eq!(container.node_kind("").unwrap(), NodeKind::Group);
        assert!(container.node_kind("missing").is_err());
    }

    #[test]
    fn test_dataset_reads() {
        let dir = tempfile::tempdir().unwrap();
        let container = ChunkContainer::open(dir.path(), AccessMode::ReadWrite).unwrap();
        container
            .create_dataset("raw", data().view(), &[5, 5], Compression::Raw)
            .unwrap();

        let ds = container.dataset("raw").unwrap();
        assert_eq!(ds.shape(), &[12, 12]);
        let bb = BoundingBox::new(vec![3..8, 4..12]).unwrap();
        assert_eq!(ds.read(&bb).unwrap(), bb.slice_of(&data()).to_owned());
    }

    #[test]
    fn test_read_mode() {
        let dir = tempfile::tempdir().unwrap();
        let container = ChunkContainer::open(dir.path(), AccessMode::Read).unwrap();
        assert!(matches!(
            container.create_dataset("raw", data().view(), &[5, 5], Compression::Raw),
            Err(StorageError::ReadOnly(_))
        ));
        assert!(matches!(container.dataset("raw"), Err(StorageError::MissingDataset(_))));
        assert!(ChunkContainer::open(dir.path().join("nope"), AccessMode::Read).is_err());
    }

    #[test]
    fn test_rejects_escaping_names() {
        let dir = tempfile::tempdir().unwrap();
        let container = ChunkContainer::open(dir.path(), AccessMode::ReadWrite).unwrap();
        assert!(container.dataset("../outside").is_err());
    }
}

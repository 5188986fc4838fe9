//! On-disk chunked datasets.
//!
//! A dataset is a directory holding an `attributes.json` and one file per
//! chunk at `<dataset>/<i>/<j>/...`, one path component per axis. Chunk files
//! hold the chunk's values in row-major order as little-endian `f64`,
//! optionally gzip-compressed. Edge chunks store only their clipped extent.
//! Chunks that were never written read as zeros.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use ndarray::{ArrayD, ArrayViewD, IxDyn};
use serde::{Deserialize, Serialize};
use subvolume_core::{ArrayLike, BoundingBox, ReadError};

use crate::error::{Result, StorageError};
use crate::grid::ChunkGrid;

/// File holding the dataset metadata.
pub const ATTRIBUTES_FILE: &str = "attributes.json";

const DATA_TYPE: &str = "float64";

/// Compression applied to each chunk file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Compression {
    /// Uncompressed.
    #[default]
    Raw,
    /// Gzip with the given level (0-9).
    Gzip {
        #[serde(default = "default_gzip_level")]
        level: u32,
    },
}

fn default_gzip_level() -> u32 {
    6
}

/// Contents of `attributes.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetAttributes {
    /// Array shape.
    pub dimensions: Vec<usize>,
    /// Chunk shape.
    pub block_size: Vec<usize>,
    /// Element type; only `float64` is supported.
    pub data_type: String,
    #[serde(default)]
    pub compression: Compression,
}

/// A chunked dataset stored in a directory.
#[derive(Debug, Clone)]
pub struct ChunkStore {
    path: PathBuf,
    attributes: DatasetAttributes,
    grid: ChunkGrid,
}

impl ChunkStore {
    /// Create an empty dataset at `path`, writing its metadata.
    pub fn create(
        path: impl AsRef<Path>,
        shape: &[usize],
        chunks: &[usize],
        compression: Compression,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let grid = ChunkGrid::new(shape, chunks)?;
        let attributes = DatasetAttributes {
            dimensions: shape.to_vec(),
            block_size: chunks.to_vec(),
            data_type: DATA_TYPE.to_string(),
            compression,
        };

        fs::create_dir_all(&path).map_err(StorageError::io(&path))?;
        let attr_path = path.join(ATTRIBUTES_FILE);
        let file = File::create(&attr_path).map_err(StorageError::io(&attr_path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &attributes).map_err(|source| {
            StorageError::Metadata {
                path: attr_path.clone(),
                source,
            }
        })?;

        tracing::debug!(path = %path.display(), ?shape, ?chunks, "created dataset");
        Ok(Self {
            path,
            attributes,
            grid,
        })
    }

    /// Open an existing dataset.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let attr_path = path.join(ATTRIBUTES_FILE);
        let file = File::open(&attr_path).map_err(StorageError::io(&attr_path))?;
        let attributes: DatasetAttributes = serde_json::from_reader(BufReader::new(file))
            .map_err(|source| StorageError::Metadata {
                path: attr_path.clone(),
                source,
            })?;
        if attributes.data_type != DATA_TYPE {
            return Err(StorageError::InvalidLayout(format!(
                "data type '{}' (only {DATA_TYPE} is supported)",
                attributes.data_type
            )));
        }
        let grid = ChunkGrid::new(&attributes.dimensions, &attributes.block_size)?;
        Ok(Self {
            path,
            attributes,
            grid,
        })
    }

    /// True if `path` holds dataset metadata.
    pub fn is_dataset(path: impl AsRef<Path>) -> bool {
        path.as_ref().join(ATTRIBUTES_FILE).is_file()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn attributes(&self) -> &DatasetAttributes {
        &self.attributes
    }

    pub fn chunk_shape(&self) -> &[usize] {
        self.grid.chunks()
    }

    fn chunk_path(&self, index: &[usize]) -> PathBuf {
        index
            .iter()
            .fold(self.path.clone(), |p, i| p.join(i.to_string()))
    }

    /// Write the chunk at `index`; `data` must have the chunk's clipped shape.
    pub fn write_chunk(&self, index: &[usize], data: ArrayViewD<'_, f64>) -> Result<()> {
        let expected = self.grid.chunk_box(index)?.shape();
        if data.shape() != expected.as_slice() {
            return Err(StorageError::ShapeMismatch {
                what: "chunk write",
                expected,
                actual: data.shape().to_vec(),
            });
        }

        let path = self.chunk_path(index);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(StorageError::io(parent))?;
        }
        let mut file = BufWriter::new(File::create(&path).map_err(StorageError::io(&path))?);
        match self.attributes.compression {
            Compression::Raw => write_values(&mut file, data, &path)?,
            Compression::Gzip { level } => {
                let mut encoder = GzEncoder::new(&mut file, flate2::Compression::new(level));
                write_values(&mut encoder, data, &path)?;
                encoder.finish().map_err(StorageError::io(&path))?;
            }
        }
        file.flush().map_err(StorageError::io(&path))
    }

    /// Read the chunk at `index`, zeros if it was never written.
    pub fn read_chunk(&self, index: &[usize]) -> Result<ArrayD<f64>> {
        let shape = self.grid.chunk_box(index)?.shape();
        let path = self.chunk_path(index);
        if !path.is_file() {
            tracing::trace!(path = %path.display(), "missing chunk, reading zeros");
            return Ok(ArrayD::zeros(IxDyn(&shape)));
        }

        let mut file = BufReader::new(File::open(&path).map_err(StorageError::io(&path))?);
        let mut bytes = Vec::new();
        match self.attributes.compression {
            Compression::Raw => file.read_to_end(&mut bytes),
            Compression::Gzip { .. } => GzDecoder::new(file).read_to_end(&mut bytes),
        }
        .map_err(StorageError::io(&path))?;

        let len: usize = shape.iter().product();
        if bytes.len() != len * 8 {
            return Err(StorageError::ShapeMismatch {
                what: "chunk file",
                expected: shape,
                actual: vec![bytes.len() / 8],
            });
        }
        let mut values = vec![0.0; len];
        let mut reader = bytes.as_slice();
        reader
            .read_f64_into::<LittleEndian>(&mut values)
            .map_err(StorageError::io(&path))?;
        ArrayD::from_shape_vec(IxDyn(&shape), values).map_err(|e| {
            StorageError::InvalidLayout(format!("chunk {index:?}: {e}"))
        })
    }

    /// Write a whole array, chunk by chunk.
    pub fn write(&self, data: ArrayViewD<'_, f64>) -> Result<()> {
        if data.shape() != self.grid.shape() {
            return Err(StorageError::ShapeMismatch {
                what: "dataset write",
                expected: self.grid.shape().to_vec(),
                actual: data.shape().to_vec(),
            });
        }
        for index in self.grid.all_chunks() {
            let chunk = self.grid.chunk_box(&index)?;
            self.write_chunk(&index, chunk.slice_of(&data))?;
        }
        tracing::debug!(path = %self.path.display(), "wrote dataset");
        Ok(())
    }

    /// Read the region covered by `bbox`.
    pub fn read_region(&self, bbox: &BoundingBox) -> Result<ArrayD<f64>> {
        self.grid.assemble(bbox, |index| self.read_chunk(index))
    }
}

fn write_values<W: Write>(w: &mut W, data: ArrayViewD<'_, f64>, path: &Path) -> Result<()> {
    for &v in data.iter() {
        w.write_f64::<LittleEndian>(v).map_err(StorageError::io(path))?;
    }
    Ok(())
}

impl ArrayLike for ChunkStore {
    fn shape(&self) -> &[usize] {
        self.grid.shape()
    }

    fn read(&self, bbox: &BoundingBox) -> std::result::Result<ArrayD<f64>, ReadError> {
        Ok(self.read_region(bbox)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn ramp() -> ArrayD<f64> {
        Array2::from_shape_fn((10, 7), |(i, j)| i as f64 * 0.5 - j as f64).into_dyn()
    }

    #[test]
    fn test_write_and_read_region() {
        let dir = tempfile::tempdir().unwrap();
        for (i, compression) in [Compression::Raw, Compression::Gzip { level: 4 }].into_iter().enumerate() {
            let path = dir.path().join(format!("ds{i}"));
            let store = ChunkStore::create(&path, &[10, 7], &[4, 3], compression).unwrap();
            let data = ramp();
            store.write(data.view()).unwrap();

            let reopened = ChunkStore::open(&path).unwrap();
            assert_eq!(reopened.attributes().compression, compression);
            let bb = BoundingBox::new(vec![2..9, 1..7]).unwrap();
            assert_eq!(reopened.read_region(&bb).unwrap(), bb.slice_of(&data).to_owned());
        }
    }

    #[test]
    fn test_chunk_layout_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::create(dir.path().join("ds"), &[10, 7], &[4, 3], Compression::Raw).unwrap();
        store.write(ramp().view()).unwrap();
        // Edge chunk (2, 2) covers rows 8..10 and column 6..7
        let edge = dir.path().join("ds").join("2").join("2");
        assert_eq!(fs::metadata(edge).unwrap().len(), 2 * 8);
        assert!(ChunkStore::is_dataset(dir.path().join("ds")));
    }

    #[test]
    fn test_missing_chunks_are_zero() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::create(dir.path(), &[6, 6], &[3, 3], Compression::Raw).unwrap();
        let ones = ArrayD::from_elem(IxDyn(&[3, 3]), 1.0);
        store.write_chunk(&[1, 1], ones.view()).unwrap();

        let all = store.read_region(&BoundingBox::full(&[6, 6])).unwrap();
        assert_eq!(all.sum(), 9.0);
        assert_eq!(all[[0, 0]], 0.0);
        assert_eq!(all[[5, 5]], 1.0);
    }

    #[test]
    fn test_attributes_json() {
        let dir = tempfile::tempdir().unwrap();
        ChunkStore::create(dir.path(), &[6, 6], &[3, 3], Compression::Gzip { level: 9 }).unwrap();
        let text = fs::read_to_string(dir.path().join(ATTRIBUTES_FILE)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["dimensions"], serde_json::json!([6, 6]));
        assert_eq!(value["blockSize"], serde_json::json!([3, 3]));
        assert_eq!(value["dataType"], "float64");
        assert_eq!(value["compression"]["type"], "gzip");
    }

    #[test]
    fn test_wrong_chunk_shape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::create(dir.path(), &[6, 6], &[3, 3], Compression::Raw).unwrap();
        let bad = ArrayD::zeros(IxDyn(&[2, 3]));
        assert!(matches!(
            store.write_chunk(&[0, 0], bad.view()),
            Err(StorageError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_corrupt_chunk_detected() {
        let dir = tempfile::tempdir().unwrap();
        let store = ChunkStore::create(dir.path(), &[4, 4], &[2, 2], Compression::Raw).unwrap();
        fs::create_dir_all(dir.path().join("0")).unwrap();
        fs::write(dir.path().join("0").join("0"), [0u8; 5]).unwrap();
        assert!(store.read_chunk(&[0, 0]).is_err());
    }

    #[test]
    fn test_open_rejects_other_data_types() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(ATTRIBUTES_FILE),
            r#"{"dimensions": [4], "blockSize": [2], "dataType": "uint8"}"#,
        )
        .unwrap();
        assert!(matches!(
            ChunkStore::open(dir.path()),
            Err(StorageError::InvalidLayout(_))
        ));
    }

    #[test]
    fn test_open_missing_metadata() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(ChunkStore::open(dir.path()), Err(StorageError::Io { .. })));
    }
}

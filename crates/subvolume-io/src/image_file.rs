//! Read-only access to PNG and JPEG images.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageReader;
use ndarray::{Array2, ArrayD};
use subvolume_core::{ArrayLike, BoundingBox, ReadError};

use crate::container::{AccessMode, Container, DatasetHandle, NodeKind};
use crate::error::{Result, StorageError};

/// Name of the single dataset an image file exposes.
pub const IMAGE_DATASET: &str = "image";

/// A decoded image presented as a container with one 2D grayscale dataset of
/// shape `(height, width)`. Color images are converted to luma.
#[derive(Debug)]
pub struct ImageFile {
    path: PathBuf,
    pixels: Arc<ArrayD<f64>>,
}

impl ImageFile {
    /// Decode the image at `path`. Images can only be opened for reading.
    pub fn open(path: impl AsRef<Path>, mode: AccessMode) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if mode != AccessMode::Read {
            return Err(StorageError::ReadOnly(path));
        }
        let img = ImageReader::open(&path)
            .map_err(StorageError::io(&path))?
            .with_guessed_format()
            .map_err(StorageError::io(&path))?
            .decode()?;
        let luma = img.into_luma8();
        let (width, height) = luma.dimensions();
        let pixels = Array2::from_shape_fn((height as usize, width as usize), |(y, x)| {
            luma.get_pixel(x as u32, y as u32).0[0] as f64
        });
        tracing::debug!(path = %path.display(), width, height, "decoded image");
        Ok(Self {
            path,
            pixels: Arc::new(pixels.into_dyn()),
        })
    }

    /// The decoded pixels.
    pub fn pixels(&self) -> &ArrayD<f64> {
        &self.pixels
    }
}

/// Shared view of decoded pixels.
#[derive(Debug, Clone)]
struct ImageDataset(Arc<ArrayD<f64>>);

impl ArrayLike for ImageDataset {
    fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    fn read(&self, bbox: &BoundingBox) -> std::result::Result<ArrayD<f64>, ReadError> {
        ArrayLike::read(&*self.0, bbox)
    }
}

impl Container for ImageFile {
    fn path(&self) -> &Path {
        &self.path
    }

    fn keys(&self) -> Result<Vec<String>> {
        Ok(vec![IMAGE_DATASET.to_string()])
    }

    fn dataset(&self, name: &str) -> Result<DatasetHandle> {
        if name.trim_start_matches('/') != IMAGE_DATASET {
            return Err(StorageError::MissingDataset(name.to_string()));
        }
        Ok(Box::new(ImageDataset(Arc::clone(&self.pixels))))
    }

    fn node_kind(&self, name: &str) -> Result<NodeKind> {
        match name.trim_start_matches('/') {
            "" => Ok(NodeKind::Group),
            IMAGE_DATASET => Ok(NodeKind::Dataset),
            _ => Err(StorageError::MissingDataset(name.to_string())),
        }
    }
}

//! Subvolume IO - storage backends for subvolume resampling
//!
//! Provides sources implementing [`subvolume_core::ArrayLike`] and a
//! registry that opens files by extension:
//!
//! - [`ChunkedArray`]: in-memory chunk grid that counts chunk reads
//! - [`ChunkStore`]: on-disk chunked dataset (`attributes.json` + chunk files)
//! - [`ChunkContainer`]: directory of named chunked datasets
//! - [`ImageFile`]: PNG/JPEG image as a single 2D dataset
//! - [`Registry`] / [`OpenFile`]: extension dispatch and scoped handles
//!
//! # Example
//!
//! ```ignore
//! use subvolume_io::{AccessMode, Registry};
//!
//! let registry = Registry::with_defaults();
//! let file = registry.open("volume.n5", AccessMode::Read)?;
//! let raw = file.dataset("raw")?;
//! // file is released when it goes out of scope
//! ```

mod chunked;
mod container;
mod error;
mod grid;
mod image_file;
mod registry;
mod store;

pub use chunked::ChunkedArray;
pub use container::{AccessMode, ChunkContainer, Container, DatasetHandle, NodeKind};
pub use error::{Result, StorageError};
pub use image_file::{ImageFile, IMAGE_DATASET};
pub use registry::{OpenFile, Opener, Registry, CHUNK_EXTENSIONS, IMAGE_EXTENSIONS};
pub use store::{ChunkStore, Compression, DatasetAttributes, ATTRIBUTES_FILE};

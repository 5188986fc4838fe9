//! Extension-based dispatch to storage backends.
//!
//! A [`Registry`] maps file extensions to openers. It is constructed
//! explicitly and passed to whoever opens files; there is no global table.

use std::collections::HashMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use crate::container::{AccessMode, ChunkContainer, Container, NodeKind};
use crate::error::{Result, StorageError};
use crate::image_file::ImageFile;

/// Opens a container at a path.
pub type Opener = Box<dyn Fn(&Path, AccessMode) -> Result<Box<dyn Container>> + Send + Sync>;

/// Directory-based chunked formats.
pub const CHUNK_EXTENSIONS: &[&str] = &[".chunks", ".n5", ".zarr", ".zr"];

/// Image formats readable as a single dataset.
pub const IMAGE_EXTENSIONS: &[&str] = &[".png", ".jpg", ".jpeg"];

/// Table of openers keyed by lower-case extension (with the leading dot; the
/// empty string stands for paths without an extension).
///
/// The first opener registered for an extension wins; later registrations
/// for the same extension are ignored.
#[derive(Default)]
pub struct Registry {
    openers: HashMap<String, Opener>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("extensions", &self.extensions())
            .finish()
    }
}

fn normalize_extension(ext: &str) -> String {
    let ext = ext.to_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

impl Registry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in backends: chunk containers for
    /// [`CHUNK_EXTENSIONS`] and image files for [`IMAGE_EXTENSIONS`].
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(CHUNK_EXTENSIONS, |path, mode| {
            Ok(Box::new(ChunkContainer::open(path, mode)?))
        });
        registry.register(IMAGE_EXTENSIONS, |path, mode| {
            Ok(Box::new(ImageFile::open(path, mode)?))
        });
        registry
    }

    /// Register `opener` for each of `extensions` not registered yet.
    ///
    /// Returns the number of extensions that were added.
    pub fn register<F>(&mut self, extensions: &[&str], opener: F) -> usize
    where
        F: Fn(&Path, AccessMode) -> Result<Box<dyn Container>> + Clone + Send + Sync + 'static,
    {
        let mut added = 0;
        for ext in extensions {
            let key = normalize_extension(ext);
            if self.openers.contains_key(&key) {
                tracing::debug!(extension = %key, "extension already registered, keeping first opener");
                continue;
            }
            self.openers.insert(key, Box::new(opener.clone()));
            added += 1;
        }
        added
    }

    /// Registered extensions, sorted.
    pub fn extensions(&self) -> Vec<&str> {
        let mut exts: Vec<&str> = self.openers.keys().map(String::as_str).collect();
        exts.sort_unstable();
        exts
    }

    /// True if a backend handles the extension of `path`.
    pub fn supports(&self, path: impl AsRef<Path>) -> bool {
        self.openers.contains_key(&extension_of(path.as_ref()))
    }

    /// Open `path` with the backend registered for its extension.
    ///
    /// # Errors
    ///
    /// `UnknownExtension` if no backend handles the extension, otherwise any
    /// error of the backend.
    pub fn open(&self, path: impl AsRef<Path>, mode: AccessMode) -> Result<OpenFile> {
        let path = path.as_ref();
        let extension = extension_of(path);
        let opener = self
            .openers
            .get(&extension)
            .ok_or_else(|| StorageError::UnknownExtension {
                extension: extension.clone(),
                path: path.to_path_buf(),
            })?;
        let container = opener(path, mode)?;
        tracing::debug!(path = %path.display(), %extension, ?mode, "opened file");
        Ok(OpenFile::new(container))
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|e| normalize_extension(&e.to_string_lossy()))
        .unwrap_or_default()
}

/// A container that is released when the handle goes out of scope.
///
/// Dereferences to the underlying [`Container`]. Use [`OpenFile::close`] to
/// observe errors from releasing the backend; on drop they are only logged.
#[derive(Debug)]
pub struct OpenFile {
    inner: Box<dyn Container>,
    released: bool,
}

impl OpenFile {
    fn new(inner: Box<dyn Container>) -> Self {
        Self {
            inner,
            released: false,
        }
    }

    /// Whether `name` is a group or a dataset.
    pub fn kind(&self, name: &str) -> Result<NodeKind> {
        self.inner.node_kind(name)
    }

    pub fn path(&self) -> PathBuf {
        self.inner.path().to_path_buf()
    }

    /// Release the backend now and report any error.
    pub fn close(mut self) -> Result<()> {
        self.released = true;
        let result = self.inner.close();
        tracing::debug!(path = %self.inner.path().display(), "closed file");
        result
    }
}

impl Deref for OpenFile {
    type Target = dyn Container;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl DerefMut for OpenFile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.as_mut()
    }
}

impl Drop for OpenFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        match self.inner.close() {
            Ok(()) => tracing::debug!(path = %self.inner.path().display(), "released file"),
            Err(e) => tracing::warn!(path = %self.inner.path().display(), error = %e, "failed to release file"),
        }
    }
}

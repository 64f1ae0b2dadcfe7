//! Error types shared by the atlas, the node and the device seam.

use std::path::PathBuf;

use thiserror::Error;

use crate::geom::Size;

/// Errors raised while building or drawing a tile atlas.
#[derive(Error, Debug)]
pub enum AtlasError {
    /// The item size cannot be laid out on the atlas texture.
    #[error("item size {item} does not fit atlas {atlas}: {reason}")]
    InvalidDimensions {
        item: Size,
        atlas: Size,
        reason: &'static str,
    },
    /// A quad write targeted a slot beyond the atlas capacity.
    #[error("quad index {index} out of range (capacity {capacity})")]
    IndexOutOfRange { index: usize, capacity: usize },
    /// Host or GPU storage for the quads could not be allocated.
    #[error("cannot allocate storage for {requested} quads: {reason}")]
    Allocation { requested: usize, reason: String },
    /// The texture loader failed.
    #[error(transparent)]
    TextureLoad(#[from] TextureLoadError),
}

impl AtlasError {
    pub(crate) fn allocation(requested: usize, reason: impl Into<String>) -> Self {
        Self::Allocation {
            requested,
            reason: reason.into(),
        }
    }
}

/// Failure reported by a [`TextureLoader`](crate::texture::TextureLoader).
#[derive(Error, Debug)]
#[error("failed to load texture {path:?}")]
pub struct TextureLoadError {
    pub path: PathBuf,
    #[source]
    pub source: Box<dyn std::error::Error + Send + Sync>,
}

impl TextureLoadError {
    pub fn new(
        path: impl Into<PathBuf>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
        }
    }
}

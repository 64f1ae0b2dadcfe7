//! Texture handles as the core sees them, and the loader collaborator.

use std::path::Path;

use crate::error::TextureLoadError;
use crate::geom::Size;

/// A decoded atlas texture resident on some device.
pub trait AtlasTexture {
    /// Allocated size in texels. Texture coordinates are normalized by this.
    fn pixel_size(&self) -> Size;

    /// Size of the meaningful image data. Smaller than
    /// [`pixel_size`](AtlasTexture::pixel_size) when the texture was padded
    /// (e.g. to a power of two); grid layout is computed from this.
    fn content_size(&self) -> Size {
        self.pixel_size()
    }

    /// Whether color channels are already multiplied by alpha.
    fn has_premultiplied_alpha(&self) -> bool;
}

/// Loads a named image resource into a texture of type `T`.
pub trait TextureLoader<T> {
    fn load(&mut self, path: &Path) -> Result<T, TextureLoadError>;
}

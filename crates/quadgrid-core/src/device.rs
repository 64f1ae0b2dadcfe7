//! The device seam: the GPU operations a [`TextureAtlas`](crate::TextureAtlas)
//! needs, and the state bound for each batched draw.

use std::ops::Range;

use crate::blend::BlendFunc;
use crate::color::Rgba;
use crate::error::AtlasError;
use crate::quad::QuadRecord;
use crate::texture::AtlasTexture;

/// Blend function and modulated color active for one draw.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct DrawState {
    pub blend: BlendFunc,
    pub color: Rgba,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            blend: BlendFunc::default(),
            color: Rgba::OPAQUE_WHITE,
        }
    }
}

/// Back-end device (e.g. wgpu, or the in-memory [`RecordingDevice`]).
///
/// All calls happen on the rendering thread; implementations need no
/// internal locking.
///
/// [`RecordingDevice`]: crate::recording::RecordingDevice
pub trait RenderDevice {
    /// Texture handle sampled by draws.
    type Texture: AtlasTexture;
    /// GPU storage for a fixed number of quads.
    type QuadBuffer;

    /// Allocate storage for `capacity` quads.
    fn create_quad_buffer(&mut self, capacity: usize) -> Result<Self::QuadBuffer, AtlasError>;

    /// Copy `quads` into `buffer` starting at slot `first`.
    fn upload_quads(&mut self, buffer: &mut Self::QuadBuffer, first: usize, quads: &[QuadRecord]);

    /// Issue one batched draw of the quads in `quads`.
    fn draw_quads(
        &mut self,
        buffer: &Self::QuadBuffer,
        texture: &Self::Texture,
        state: &DrawState,
        quads: Range<usize>,
    );
}

//! In-memory device and loader.
//!
//! [`RecordingDevice`] implements [`RenderDevice`] without a GPU: uploads are
//! mirrored into per-buffer quad arrays and every draw is recorded along
//! with a snapshot of the quads it covered. Useful for headless dry runs and
//! for tests.

use std::collections::HashMap;
use std::io;
use std::ops::Range;
use std::path::{Path, PathBuf};

use crate::device::{DrawState, RenderDevice};
use crate::error::{AtlasError, TextureLoadError};
use crate::geom::Size;
use crate::quad::QuadRecord;
use crate::texture::{AtlasTexture, TextureLoader};

// ---------------------------------------------------------------------------
// RecordedTexture
// ---------------------------------------------------------------------------

/// A texture that exists only as its metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedTexture {
    pub id: u32,
    pub pixel_size: Size,
    pub content_size: Size,
    pub premultiplied_alpha: bool,
}

impl RecordedTexture {
    /// A premultiplied texture whose content fills its pixels.
    pub fn new(id: u32, width: u32, height: u32) -> Self {
        let size = Size::new(width, height);
        Self {
            id,
            pixel_size: size,
            content_size: size,
            premultiplied_alpha: true,
        }
    }

    /// Set the content size (builder).
    pub fn with_content_size(mut self, width: u32, height: u32) -> Self {
        self.content_size = Size::new(width, height);
        self
    }

    /// Set the alpha layout (builder).
    pub fn with_premultiplied_alpha(mut self, premultiplied: bool) -> Self {
        self.premultiplied_alpha = premultiplied;
        self
    }
}

impl AtlasTexture for RecordedTexture {
    fn pixel_size(&self) -> Size {
        self.pixel_size
    }

    fn content_size(&self) -> Size {
        self.content_size
    }

    fn has_premultiplied_alpha(&self) -> bool {
        self.premultiplied_alpha
    }
}

// ---------------------------------------------------------------------------
// RecordingDevice
// ---------------------------------------------------------------------------

/// Mirror of a quad buffer's contents.
#[derive(Clone, Debug)]
pub struct RecordedBuffer {
    pub id: usize,
    pub quads: Vec<QuadRecord>,
}

impl RecordedBuffer {
    pub fn capacity(&self) -> usize {
        self.quads.len()
    }
}

/// One `upload_quads` call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upload {
    pub buffer: usize,
    pub slots: Range<usize>,
}

/// One `draw_quads` call.
#[derive(Clone, Debug)]
pub struct DrawCall {
    pub buffer: usize,
    pub texture: u32,
    pub state: DrawState,
    pub range: Range<usize>,
    /// Buffer contents covered by `range` at draw time.
    pub quads: Vec<QuadRecord>,
}

/// A [`RenderDevice`] that records instead of rendering.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    next_buffer: usize,
    allocation_limit: Option<usize>,
    uploads: Vec<Upload>,
    draws: Vec<DrawCall>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every buffer allocation larger than `max_quads`.
    pub fn with_allocation_limit(mut self, max_quads: usize) -> Self {
        self.allocation_limit = Some(max_quads);
        self
    }

    pub fn uploads(&self) -> &[Upload] {
        &self.uploads
    }

    pub fn draws(&self) -> &[DrawCall] {
        &self.draws
    }

    /// Drain recorded uploads and draws, e.g. at the end of a frame.
    pub fn clear(&mut self) {
        self.uploads.clear();
        self.draws.clear();
    }
}

impl RenderDevice for RecordingDevice {
    type Texture = RecordedTexture;
    type QuadBuffer = RecordedBuffer;

    fn create_quad_buffer(&mut self, capacity: usize) -> Result<RecordedBuffer, AtlasError> {
        if let Some(limit) = self.allocation_limit {
            if capacity > limit {
                return Err(AtlasError::allocation(
                    capacity,
                    format!("device limit is {limit} quads"),
                ));
            }
        }
        let id = self.next_buffer;
        self.next_buffer += 1;
        Ok(RecordedBuffer {
            id,
            quads: vec![QuadRecord::default(); capacity],
        })
    }

    fn upload_quads(&mut self, buffer: &mut RecordedBuffer, first: usize, quads: &[QuadRecord]) {
        let slots = first..first + quads.len();
        buffer.quads[slots.clone()].copy_from_slice(quads);
        self.uploads.push(Upload {
            buffer: buffer.id,
            slots,
        });
    }

    fn draw_quads(
        &mut self,
        buffer: &RecordedBuffer,
        texture: &RecordedTexture,
        state: &DrawState,
        quads: Range<usize>,
    ) {
        self.draws.push(DrawCall {
            buffer: buffer.id,
            texture: texture.id,
            state: *state,
            quads: buffer.quads[quads.clone()].to_vec(),
            range: quads,
        });
    }
}

// ---------------------------------------------------------------------------
// RecordingLoader
// ---------------------------------------------------------------------------

/// A [`TextureLoader`] serving textures from a fixed table.
#[derive(Debug, Default)]
pub struct RecordingLoader {
    textures: HashMap<PathBuf, RecordedTexture>,
}

impl RecordingLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `texture` under `path` (builder).
    pub fn with_texture(mut self, path: impl Into<PathBuf>, texture: RecordedTexture) -> Self {
        self.textures.insert(path.into(), texture);
        self
    }
}

impl TextureLoader<RecordedTexture> for RecordingLoader {
    fn load(&mut self, path: &Path) -> Result<RecordedTexture, TextureLoadError> {
        self.textures.get(path).cloned().ok_or_else(|| {
            TextureLoadError::new(
                path,
                io::Error::new(io::ErrorKind::NotFound, "no such texture"),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Rect, TexRect};

    #[test]
    fn allocation_limit() {
        let mut dev = RecordingDevice::new().with_allocation_limit(4);
        assert_eq!(dev.create_quad_buffer(4).map(|b| b.capacity()).ok(), Some(4));
        assert!(matches!(
            dev.create_quad_buffer(5),
            Err(AtlasError::Allocation { requested: 5, .. })
        ));
    }

    #[test]
    fn draws_snapshot_buffer_contents() {
        let mut dev = RecordingDevice::new();
        let mut buf = dev.create_quad_buffer(3).unwrap();
        let q = QuadRecord::new(Rect::new(0.0, 0.0, 1.0, 1.0), TexRect::new(0.0, 0.0, 1.0, 1.0));
        dev.upload_quads(&mut buf, 1, &[q]);
        let tex = RecordedTexture::new(7, 16, 16);
        dev.draw_quads(&buf, &tex, &DrawState::default(), 0..2);

        assert_eq!(dev.uploads(), &[Upload { buffer: buf.id, slots: 1..2 }]);
        let call = &dev.draws()[0];
        assert_eq!(call.texture, 7);
        assert_eq!(call.range, 0..2);
        assert_eq!(call.quads, vec![QuadRecord::default(), q]);

        dev.clear();
        assert!(dev.draws().is_empty() && dev.uploads().is_empty());
    }

    #[test]
    fn loader_serves_registered_paths() {
        let mut loader =
            RecordingLoader::new().with_texture("tiles.png", RecordedTexture::new(1, 64, 64));
        assert_eq!(loader.load(Path::new("tiles.png")).unwrap().id, 1);
        let err = loader.load(Path::new("missing.png")).unwrap_err();
        assert_eq!(err.path, PathBuf::from("missing.png"));
    }
}

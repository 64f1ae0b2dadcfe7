//! [`TextureAtlas`]: one texture plus a fixed-capacity array of quads drawn
//! as a single batch.
//!
//! Host-side quads are the source of truth. Writes widen a dirty slot range
//! that is uploaded to the device right before the next draw, so a burst of
//! updates costs one upload.

use std::ops::Range;

use crate::device::{DrawState, RenderDevice};
use crate::error::AtlasError;
use crate::quad::QuadRecord;

/// A texture and the quads that sample it.
pub struct TextureAtlas<D: RenderDevice> {
    texture: D::Texture,
    /// Written slots, `len() == total_quads()`. Reserved to `capacity`.
    quads: Vec<QuadRecord>,
    capacity: usize,
    buffer: D::QuadBuffer,
    dirty: Option<Range<usize>>,
}

impl<D: RenderDevice> TextureAtlas<D> {
    /// Allocate an atlas able to hold `capacity` quads.
    pub fn new(device: &mut D, texture: D::Texture, capacity: usize) -> Result<Self, AtlasError> {
        if capacity == 0 {
            return Err(AtlasError::allocation(0, "capacity must be positive"));
        }
        let quads = reserve_quads(capacity)?;
        let buffer = device.create_quad_buffer(capacity)?;
        log::debug!("texture atlas created, capacity {capacity}");
        Ok(Self {
            texture,
            quads,
            capacity,
            buffer,
            dirty: None,
        })
    }

    pub fn texture(&self) -> &D::Texture {
        &self.texture
    }

    /// Swap the sampled texture, returning the previous one.
    pub fn set_texture(&mut self, texture: D::Texture) -> D::Texture {
        std::mem::replace(&mut self.texture, texture)
    }

    /// Maximum number of quads.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// One past the highest slot ever written.
    pub fn total_quads(&self) -> usize {
        self.quads.len()
    }

    /// Written quads, in slot order.
    pub fn quads(&self) -> &[QuadRecord] {
        &self.quads
    }

    /// Write `quad` at slot `index`.
    ///
    /// Slots skipped over between the previous high-water mark and `index`
    /// are filled with degenerate quads.
    pub fn update_quad(&mut self, index: usize, quad: QuadRecord) -> Result<(), AtlasError> {
        if index >= self.capacity {
            return Err(AtlasError::IndexOutOfRange {
                index,
                capacity: self.capacity,
            });
        }
        let len = self.quads.len();
        if index < len {
            self.quads[index] = quad;
            self.mark_dirty(index..index + 1);
        } else {
            // within the reservation, so this never reallocates
            self.quads.resize(index, QuadRecord::degenerate());
            self.quads.push(quad);
            self.mark_dirty(len..index + 1);
        }
        Ok(())
    }

    /// Grow or shrink to `new_capacity`, keeping quads below the new bound.
    ///
    /// New storage is allocated before anything is released, so a failure
    /// leaves the atlas exactly as it was.
    pub fn resize(&mut self, device: &mut D, new_capacity: usize) -> Result<(), AtlasError> {
        if new_capacity == 0 {
            return Err(AtlasError::allocation(0, "capacity must be positive"));
        }
        if new_capacity == self.capacity {
            return Ok(());
        }
        let mut quads = reserve_quads(new_capacity)?;
        let buffer = device.create_quad_buffer(new_capacity)?;

        let kept = self.quads.len().min(new_capacity);
        quads.extend_from_slice(&self.quads[..kept]);
        log::debug!(
            "texture atlas resized {} -> {new_capacity}, {kept} quads kept",
            self.capacity
        );

        self.quads = quads;
        self.buffer = buffer;
        self.capacity = new_capacity;
        // the fresh buffer holds nothing yet
        self.dirty = (kept > 0).then_some(0..kept);
        Ok(())
    }

    /// Upload pending writes.
    pub fn flush(&mut self, device: &mut D) {
        if let Some(range) = self.dirty.take() {
            log::trace!("uploading quads {}..{}", range.start, range.end);
            device.upload_quads(&mut self.buffer, range.start, &self.quads[range]);
        }
    }

    /// Draw every written quad.
    pub fn draw_quads(&mut self, device: &mut D, state: &DrawState) {
        self.draw_range(device, state, 0, self.quads.len());
    }

    /// Draw `count` quads starting at slot `start` as one batch.
    pub fn draw_range(&mut self, device: &mut D, state: &DrawState, start: usize, count: usize) {
        if count == 0 {
            return;
        }
        let end = start + count;
        debug_assert!(
            end <= self.quads.len(),
            "drawing quads {start}..{end} but only {} written",
            self.quads.len()
        );
        let end = end.min(self.quads.len());
        if start >= end {
            return;
        }
        self.flush(device);
        device.draw_quads(&self.buffer, &self.texture, state, start..end);
    }

    fn mark_dirty(&mut self, slots: Range<usize>) {
        self.dirty = Some(match self.dirty.take() {
            Some(d) => d.start.min(slots.start)..d.end.max(slots.end),
            None => slots,
        });
    }
}

fn reserve_quads(capacity: usize) -> Result<Vec<QuadRecord>, AtlasError> {
    let mut quads = Vec::new();
    quads
        .try_reserve_exact(capacity)
        .map_err(|e| AtlasError::allocation(capacity, e.to_string()))?;
    Ok(quads)
}

impl<D: RenderDevice> std::fmt::Debug for TextureAtlas<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureAtlas")
            .field("capacity", &self.capacity)
            .field("total_quads", &self.quads.len())
            .field("dirty", &self.dirty)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{Rect, TexRect};
    use crate::recording::{RecordedTexture, RecordingDevice, Upload};

    fn quad(n: f32) -> QuadRecord {
        QuadRecord::new(Rect::new(n, 0.0, 1.0, 1.0), TexRect::new(0.0, 0.0, 0.5, 0.5))
    }

    fn atlas(dev: &mut RecordingDevice, capacity: usize) -> TextureAtlas<RecordingDevice> {
        TextureAtlas::new(dev, RecordedTexture::new(1, 64, 64), capacity).unwrap()
    }

    #[test]
    fn zero_capacity_is_an_allocation_error() {
        let mut dev = RecordingDevice::new();
        let r = TextureAtlas::new(&mut dev, RecordedTexture::new(1, 8, 8), 0);
        assert!(matches!(r, Err(AtlasError::Allocation { requested: 0, .. })));
    }

    #[test]
    fn host_allocation_failure_is_reported() {
        let mut dev = RecordingDevice::new();
        let r = TextureAtlas::new(&mut dev, RecordedTexture::new(1, 8, 8), usize::MAX);
        assert!(matches!(r, Err(AtlasError::Allocation { .. })));
    }

    #[test]
    fn device_allocation_failure_is_reported() {
        let mut dev = RecordingDevice::new().with_allocation_limit(8);
        let r = TextureAtlas::new(&mut dev, RecordedTexture::new(1, 8, 8), 9);
        assert!(matches!(r, Err(AtlasError::Allocation { requested: 9, .. })));
    }

    #[test]
    fn update_past_capacity_fails() {
        let mut dev = RecordingDevice::new();
        let mut a = atlas(&mut dev, 4);
        assert!(a.update_quad(3, quad(3.0)).is_ok());
        assert!(matches!(
            a.update_quad(4, quad(4.0)),
            Err(AtlasError::IndexOutOfRange { index: 4, capacity: 4 })
        ));
    }

    #[test]
    fn skipped_slots_are_degenerate() {
        let mut dev = RecordingDevice::new();
        let mut a = atlas(&mut dev, 8);
        a.update_quad(2, quad(2.0)).unwrap();
        assert_eq!(a.total_quads(), 3);
        assert!(a.quads()[0].is_degenerate());
        assert!(a.quads()[1].is_degenerate());
        assert_eq!(a.quads()[2], quad(2.0));
    }

    #[test]
    fn uploads_are_batched_until_draw() {
        let mut dev = RecordingDevice::new();
        let mut a = atlas(&mut dev, 8);
        for i in 0..4 {
            a.update_quad(i, quad(i as f32)).unwrap();
        }
        a.update_quad(1, quad(10.0)).unwrap();
        assert!(dev.uploads().is_empty());

        a.draw_quads(&mut dev, &DrawState::default());
        assert_eq!(dev.uploads(), &[Upload { buffer: 0, slots: 0..4 }]);
        assert_eq!(dev.draws().len(), 1);
        assert_eq!(dev.draws()[0].range, 0..4);
        assert_eq!(dev.draws()[0].quads[1], quad(10.0));

        // nothing new to upload on the next frame
        a.draw_quads(&mut dev, &DrawState::default());
        assert_eq!(dev.uploads().len(), 1);
        assert_eq!(dev.draws().len(), 2);
    }

    #[test]
    fn zero_count_draw_is_a_no_op() {
        let mut dev = RecordingDevice::new();
        let mut a = atlas(&mut dev, 4);
        a.update_quad(0, quad(0.0)).unwrap();
        a.draw_range(&mut dev, &DrawState::default(), 0, 0);
        assert!(dev.draws().is_empty());
        assert!(dev.uploads().is_empty());
    }

    #[test]
    fn draw_range_covers_sub_batch() {
        let mut dev = RecordingDevice::new();
        let mut a = atlas(&mut dev, 4);
        for i in 0..4 {
            a.update_quad(i, quad(i as f32)).unwrap();
        }
        a.draw_range(&mut dev, &DrawState::default(), 1, 2);
        assert_eq!(dev.draws()[0].range, 1..3);
        assert_eq!(dev.draws()[0].quads, vec![quad(1.0), quad(2.0)]);
    }

    #[test]
    fn resize_preserves_prefix() {
        let mut dev = RecordingDevice::new();
        let mut a = atlas(&mut dev, 4);
        for i in 0..4 {
            a.update_quad(i, quad(i as f32)).unwrap();
        }
        a.resize(&mut dev, 8).unwrap();
        assert_eq!(a.capacity(), 8);
        assert_eq!(a.total_quads(), 4);
        a.update_quad(7, quad(7.0)).unwrap();

        a.resize(&mut dev, 2).unwrap();
        assert_eq!(a.capacity(), 2);
        assert_eq!(a.quads(), &[quad(0.0), quad(1.0)]);

        // re-uploaded in full to the new buffer
        a.draw_quads(&mut dev, &DrawState::default());
        assert_eq!(dev.uploads(), &[Upload { buffer: 2, slots: 0..2 }]);
    }

    #[test]
    fn failed_resize_leaves_atlas_intact() {
        let mut dev = RecordingDevice::new().with_allocation_limit(4);
        let mut a = atlas(&mut dev, 4);
        a.update_quad(0, quad(0.0)).unwrap();
        assert!(matches!(
            a.resize(&mut dev, 16),
            Err(AtlasError::Allocation { requested: 16, .. })
        ));
        assert!(a.resize(&mut dev, 0).is_err());
        assert_eq!(a.capacity(), 4);
        assert_eq!(a.quads(), &[quad(0.0)]);
        assert!(a.update_quad(3, quad(3.0)).is_ok());
    }

    #[test]
    fn texture_swap_returns_previous() {
        let mut dev = RecordingDevice::new();
        let mut a = atlas(&mut dev, 1);
        let old = a.set_texture(RecordedTexture::new(2, 32, 32));
        assert_eq!(old.id, 1);
        assert_eq!(a.texture().id, 2);
    }
}

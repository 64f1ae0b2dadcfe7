//! Grid geometry of an atlas: how many items fit per row and column, and
//! where each item's texels and quad live.

use crate::error::AtlasError;
use crate::geom::{GridCell, Rect, Size, TexRect};
use crate::quad::QuadRecord;
use crate::texture::AtlasTexture;

/// Layout of identically-sized items on an atlas texture.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AtlasGrid {
    atlas_size: Size,
    item_size: Size,
    items_per_row: usize,
    items_per_column: usize,
    tex_step_x: f32,
    tex_step_y: f32,
}

impl AtlasGrid {
    /// Lay `item_size` items out on a texture.
    ///
    /// Rows and columns are counted over `content` (the meaningful image
    /// area); texture steps are normalized by `pixels` (the allocated texel
    /// extent). Fails with [`AtlasError::InvalidDimensions`] whenever the
    /// result would have no rows or no columns.
    pub fn new(item_size: Size, content: Size, pixels: Size) -> Result<Self, AtlasError> {
        let invalid = |reason| AtlasError::InvalidDimensions {
            item: item_size,
            atlas: content,
            reason,
        };
        if item_size.is_empty() {
            return Err(invalid("item size must be positive"));
        }
        if pixels.is_empty() || content.is_empty() {
            return Err(invalid("atlas texture is empty"));
        }
        if item_size.width > content.width {
            return Err(invalid("item wider than atlas"));
        }
        if item_size.height > content.height {
            return Err(invalid("item taller than atlas"));
        }

        Ok(Self {
            atlas_size: content,
            item_size,
            items_per_row: (content.width / item_size.width) as usize,
            items_per_column: (content.height / item_size.height) as usize,
            tex_step_x: item_size.width as f32 / pixels.width as f32,
            tex_step_y: item_size.height as f32 / pixels.height as f32,
        })
    }

    /// Lay items out on `texture`.
    pub fn for_texture<T: AtlasTexture + ?Sized>(
        item_size: Size,
        texture: &T,
    ) -> Result<Self, AtlasError> {
        Self::new(item_size, texture.content_size(), texture.pixel_size())
    }

    /// Content size the grid was laid out over.
    #[inline]
    pub fn atlas_size(&self) -> Size {
        self.atlas_size
    }

    #[inline]
    pub fn item_size(&self) -> Size {
        self.item_size
    }

    #[inline]
    pub fn items_per_row(&self) -> usize {
        self.items_per_row
    }

    #[inline]
    pub fn items_per_column(&self) -> usize {
        self.items_per_column
    }

    /// Normalized width of one item.
    #[inline]
    pub fn tex_step_x(&self) -> f32 {
        self.tex_step_x
    }

    /// Normalized height of one item.
    #[inline]
    pub fn tex_step_y(&self) -> f32 {
        self.tex_step_y
    }

    /// Number of distinct items on the atlas.
    #[inline]
    pub fn cell_count(&self) -> usize {
        self.items_per_row * self.items_per_column
    }

    /// Grid cell of linear item `index`.
    #[inline]
    pub fn cell(&self, index: usize) -> GridCell {
        GridCell::from_index(index, self.items_per_row)
    }

    /// Texture sub-rectangle of atlas item `index`.
    pub fn tex_rect(&self, index: usize) -> TexRect {
        let cell = self.cell(index);
        TexRect::new(
            cell.col as f32 * self.tex_step_x,
            cell.row as f32 * self.tex_step_y,
            self.tex_step_x,
            self.tex_step_y,
        )
    }

    /// Local-space rectangle of an item placed at `cell`.
    pub fn item_rect(&self, cell: GridCell) -> Rect {
        let (w, h) = (self.item_size.width as f32, self.item_size.height as f32);
        Rect::new(cell.col as f32 * w, cell.row as f32 * h, w, h)
    }

    /// Quad showing atlas item `tex_index` at layout cell `at`.
    pub fn quad(&self, tex_index: usize, at: GridCell) -> QuadRecord {
        QuadRecord::new(self.item_rect(at), self.tex_rect(tex_index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(aw: u32, ah: u32, iw: u32, ih: u32) -> Result<AtlasGrid, AtlasError> {
        let atlas = Size::new(aw, ah);
        AtlasGrid::new(Size::new(iw, ih), atlas, atlas)
    }

    #[test]
    fn reference_sheet() {
        let g = grid(256, 128, 32, 32).unwrap();
        assert_eq!(g.items_per_row(), 8);
        assert_eq!(g.items_per_column(), 4);
        assert_eq!(g.tex_step_x(), 0.125);
        assert_eq!(g.tex_step_y(), 0.25);
        assert_eq!(g.cell(5), GridCell::new(0, 5));
        let t = g.tex_rect(5);
        assert_eq!((t.u, t.v), (0.625, 0.0));
        assert_eq!((t.width, t.height), (0.125, 0.25));
    }

    #[test]
    fn counts_are_floored_and_positive() {
        for (aw, ah) in [(1, 1), (37, 19), (256, 128), (1000, 3)] {
            for iw in 1..=aw.min(40) {
                for ih in 1..=ah.min(40) {
                    let g = grid(aw, ah, iw, ih).unwrap();
                    assert_eq!(g.items_per_row(), (aw / iw) as usize);
                    assert_eq!(g.items_per_column(), (ah / ih) as usize);
                    assert!(g.items_per_row() >= 1 && g.items_per_column() >= 1);
                }
            }
        }
    }

    #[test]
    fn tex_origins_stay_in_unit_square() {
        for (aw, ah, iw, ih) in [(256, 128, 32, 32), (100, 70, 7, 9), (64, 64, 64, 64)] {
            let g = grid(aw, ah, iw, ih).unwrap();
            for i in 0..g.cell_count() {
                let t = g.tex_rect(i);
                let expect_u = (i % g.items_per_row()) as f32 * g.tex_step_x();
                let expect_v = (i / g.items_per_row()) as f32 * g.tex_step_y();
                assert_eq!((t.u, t.v), (expect_u, expect_v));
                assert!((0.0..=1.0).contains(&t.u) && (0.0..=1.0).contains(&t.v));
                assert!(t.right() <= 1.0 && t.bottom() <= 1.0);
            }
        }
    }

    #[test]
    fn oversized_items_are_rejected() {
        let wide = grid(32, 32, 33, 8);
        assert!(matches!(
            wide,
            Err(AtlasError::InvalidDimensions { reason: "item wider than atlas", .. })
        ));
        let tall = grid(32, 32, 8, 64);
        assert!(matches!(
            tall,
            Err(AtlasError::InvalidDimensions { reason: "item taller than atlas", .. })
        ));
        assert!(grid(32, 32, 0, 8).is_err());
        assert!(grid(0, 32, 8, 8).is_err());
    }

    #[test]
    fn padded_texture_uses_content_for_counts() {
        // 100x60 image padded to 128x64
        let g = AtlasGrid::new(Size::new(20, 20), Size::new(100, 60), Size::new(128, 64)).unwrap();
        assert_eq!(g.items_per_row(), 5);
        assert_eq!(g.items_per_column(), 3);
        assert_eq!(g.tex_step_x(), 20.0 / 128.0);
        assert_eq!(g.tex_step_y(), 20.0 / 64.0);
    }

    #[test]
    fn item_rects_tile_the_plane() {
        let g = grid(64, 64, 16, 8).unwrap();
        assert_eq!(g.item_rect(GridCell::new(2, 3)), Rect::new(48.0, 16.0, 16.0, 8.0));
        let q = g.quad(0, GridCell::new(0, 1));
        assert_eq!(q.tl.position, [16.0, 0.0]);
        assert_eq!(q.br.tex_coords, [0.25, 0.125]);
    }
}

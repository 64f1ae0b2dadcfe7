//! Item sources: the per-item quad policy plugged into an
//! [`AtlasNode`](crate::AtlasNode).
//!
//! The node owns the grid math and the atlas; a source only decides which
//! atlas item each active index shows and where its quad goes.

use crate::geom::GridCell;
use crate::layout::AtlasGrid;
use crate::quad::QuadRecord;

/// Computes the quad for each active item of a node.
///
/// Implementations must be pure: the same `(index, grid)` always yields the
/// same quad, so regenerating all quads is idempotent.
pub trait ItemSource {
    /// Quad for active item `index`.
    fn item_quad(&self, index: usize, grid: &AtlasGrid) -> QuadRecord;

    /// Upper bound on the number of active items, or `None` if unbounded.
    fn max_items(&self, grid: &AtlasGrid) -> Option<usize> {
        Some(grid.cell_count())
    }
}

// ---------------------------------------------------------------------------
// GridItems
// ---------------------------------------------------------------------------

/// Tile-sheet policy: item `i` shows atlas item `i`, laid out left-to-right,
/// top-to-bottom with the same column count as the atlas.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct GridItems;

impl ItemSource for GridItems {
    fn item_quad(&self, index: usize, grid: &AtlasGrid) -> QuadRecord {
        grid.quad(index, grid.cell(index))
    }
}

// ---------------------------------------------------------------------------
// CharItems
// ---------------------------------------------------------------------------

/// Glyph-grid policy: a string rendered from a character atlas whose first
/// item is `map_start`. Glyphs sit side by side on one line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CharItems {
    chars: Vec<char>,
    map_start: char,
}

impl CharItems {
    pub fn new(text: &str, map_start: char) -> Self {
        Self {
            chars: text.chars().collect(),
            map_start,
        }
    }

    /// Number of characters, i.e. the quantity of items to render.
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    pub fn text(&self) -> String {
        self.chars.iter().collect()
    }

    /// Atlas item of `ch`, if it is mapped at all.
    pub fn glyph_index(&self, ch: char) -> Option<usize> {
        (ch as u32)
            .checked_sub(self.map_start as u32)
            .map(|i| i as usize)
    }
}

impl ItemSource for CharItems {
    fn item_quad(&self, index: usize, grid: &AtlasGrid) -> QuadRecord {
        let glyph = self
            .chars
            .get(index)
            .and_then(|&ch| self.glyph_index(ch))
            .filter(|&g| g < grid.cell_count());
        match glyph {
            Some(g) => grid.quad(g, GridCell::new(0, index)),
            None => QuadRecord::degenerate(),
        }
    }

    fn max_items(&self, _grid: &AtlasGrid) -> Option<usize> {
        None
    }
}

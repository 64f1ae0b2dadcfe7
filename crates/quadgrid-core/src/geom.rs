//! Geometry primitives: [`Size`], [`GridCell`], [`Rect`] and [`TexRect`].
//!
//! Local space is pixel-based with X growing right and Y growing down.
//! Texture space is normalized to `[0, 1]` with `v` growing down the image.

use std::fmt;

// ---------------------------------------------------------------------------
// Size
// ---------------------------------------------------------------------------

/// An integer extent in pixels (or texels).
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    /// Create a new size.
    #[inline]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Whether either side is zero.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Whether `other` fits inside `self` on both axes.
    #[inline]
    pub const fn contains(self, other: Size) -> bool {
        other.width <= self.width && other.height <= self.height
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

// ---------------------------------------------------------------------------
// GridCell
// ---------------------------------------------------------------------------

/// A row/column address in a row-major grid.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GridCell {
    pub row: usize,
    pub col: usize,
}

impl GridCell {
    #[inline]
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// Cell of linear `index` in a grid `per_row` cells wide.
    ///
    /// `per_row` must be non-zero; layouts reject zero-width grids up front.
    #[inline]
    pub const fn from_index(index: usize, per_row: usize) -> Self {
        Self {
            row: index / per_row,
            col: index % per_row,
        }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(row={}, col={})", self.row, self.col)
    }
}

// ---------------------------------------------------------------------------
// Rect / TexRect
// ---------------------------------------------------------------------------

/// An axis-aligned rectangle in local (pixel) space.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[inline]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.y + self.height
    }
}

/// A sub-rectangle of a texture in normalized coordinates.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TexRect {
    pub u: f32,
    pub v: f32,
    pub width: f32,
    pub height: f32,
}

impl TexRect {
    #[inline]
    pub const fn new(u: f32, v: f32, width: f32, height: f32) -> Self {
        Self {
            u,
            v,
            width,
            height,
        }
    }

    #[inline]
    pub fn right(self) -> f32 {
        self.u + self.width
    }

    #[inline]
    pub fn bottom(self) -> f32 {
        self.v + self.height
    }
}

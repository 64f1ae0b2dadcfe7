//! The GPU-facing quad record: four textured vertices drawn as two triangles.

use bytemuck::{Pod, Zeroable};

use crate::geom::{Rect, TexRect};

/// One corner of a quad.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadVertex {
    pub position: [f32; 2],
    pub tex_coords: [f32; 2],
}

/// A textured rectangle. Corner order is fixed: top-left, bottom-left,
/// top-right, bottom-right, matching [`QUAD_INDICES`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct QuadRecord {
    pub tl: QuadVertex,
    pub bl: QuadVertex,
    pub tr: QuadVertex,
    pub br: QuadVertex,
}

/// Triangle indices for one quad, relative to its first vertex.
pub const QUAD_INDICES: [u32; 6] = [0, 1, 2, 3, 2, 1];

/// Vertices per quad.
pub const QUAD_VERTICES: usize = 4;

impl QuadRecord {
    /// Map `tex` onto the local-space rectangle `pos`.
    pub fn new(pos: Rect, tex: TexRect) -> Self {
        let v = |x: f32, y: f32, u: f32, t: f32| QuadVertex {
            position: [x, y],
            tex_coords: [u, t],
        };
        Self {
            tl: v(pos.x, pos.y, tex.u, tex.v),
            bl: v(pos.x, pos.bottom(), tex.u, tex.bottom()),
            tr: v(pos.right(), pos.y, tex.right(), tex.v),
            br: v(pos.right(), pos.bottom(), tex.right(), tex.bottom()),
        }
    }

    /// A zero-area quad; rasterizes to nothing.
    pub const fn degenerate() -> Self {
        Self {
            tl: ZERO_VERTEX,
            bl: ZERO_VERTEX,
            tr: ZERO_VERTEX,
            br: ZERO_VERTEX,
        }
    }

    /// Corners in index order.
    pub fn vertices(&self) -> [QuadVertex; 4] {
        [self.tl, self.bl, self.tr, self.br]
    }

    /// Texture-space origin (top-left corner).
    pub fn tex_origin(&self) -> [f32; 2] {
        self.tl.tex_coords
    }

    pub fn is_degenerate(&self) -> bool {
        self.tl.position == self.br.position
    }
}

const ZERO_VERTEX: QuadVertex = QuadVertex {
    position: [0.0; 2],
    tex_coords: [0.0; 2],
};

/// Index list for `count` consecutive quads, starting at vertex 0.
pub fn quad_indices(count: usize) -> Vec<u32> {
    (0..count)
        .flat_map(|q| QUAD_INDICES.map(|i| (q * QUAD_VERTICES) as u32 + i))
        .collect()
}

//! **quadgrid-core**: batched rendering of same-sized tiles from one
//! texture atlas (core types).
//!
//! An [`AtlasNode`] maps a linear item index to a grid cell and a texture
//! sub-rectangle, keeps a fixed-capacity [`TextureAtlas`] of quads in sync
//! with that mapping, and draws every quad in one batch with a node-wide
//! tint, opacity and [`BlendFunc`]. The per-item policy is an injected
//! [`ItemSource`] (tile sheets, glyph labels, ...).
//!
//! The crate is GPU-agnostic: graphics back-ends implement
//! [`RenderDevice`], and [`recording::RecordingDevice`] runs everything in
//! memory.

pub mod atlas;
pub mod blend;
pub mod color;
pub mod config;
pub mod device;
pub mod error;
pub mod geom;
pub mod items;
pub mod layout;
pub mod node;
pub mod quad;
pub mod recording;
pub mod texture;

pub use atlas::TextureAtlas;
pub use blend::{BlendFactor, BlendFunc};
pub use color::{Color, Rgba};
pub use config::AtlasNodeConfig;
pub use device::{DrawState, RenderDevice};
pub use error::{AtlasError, TextureLoadError};
pub use geom::{GridCell, Rect, Size, TexRect};
pub use items::{CharItems, GridItems, ItemSource};
pub use layout::AtlasGrid;
pub use node::AtlasNode;
pub use quad::{QUAD_INDICES, QuadRecord, QuadVertex, quad_indices};
pub use texture::{AtlasTexture, TextureLoader};

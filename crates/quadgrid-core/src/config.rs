//! Construction parameters for an [`AtlasNode`](crate::AtlasNode).

use crate::blend::BlendFunc;
use crate::color::Color;
use crate::geom::Size;

/// Configuration for an atlas node.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct AtlasNodeConfig {
    /// Width of one item in pixels.
    pub item_width: u32,
    /// Height of one item in pixels.
    pub item_height: u32,
    /// Number of items to render.
    pub item_count: usize,
    /// Quad capacity of the atlas. Defaults to `item_count` (at least 1).
    pub capacity: Option<usize>,
    /// Initial opacity.
    pub opacity: u8,
    /// Initial (unmodified) tint.
    pub color: Color,
    /// Blend override. Defaults from the texture's alpha layout.
    pub blend_func: Option<BlendFunc>,
    /// Opacity-modifies-RGB override. Defaults to the texture's
    /// premultiplied-alpha flag.
    pub opacity_modify_rgb: Option<bool>,
}

impl Default for AtlasNodeConfig {
    fn default() -> Self {
        Self {
            item_width: 32,
            item_height: 32,
            item_count: 0,
            capacity: None,
            opacity: 255,
            color: Color::WHITE,
            blend_func: None,
            opacity_modify_rgb: None,
        }
    }
}

impl AtlasNodeConfig {
    pub fn new(item_width: u32, item_height: u32, item_count: usize) -> Self {
        Self {
            item_width,
            item_height,
            item_count,
            ..Default::default()
        }
    }

    /// Set the atlas capacity (builder).
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn item_size(&self) -> Size {
        Size::new(self.item_width, self.item_height)
    }

    /// Capacity to allocate: never below `item_count`.
    pub fn atlas_capacity(&self) -> usize {
        match self.capacity {
            Some(c) => c.max(self.item_count),
            None => self.item_count.max(1),
        }
    }
}

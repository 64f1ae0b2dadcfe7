//! [`AtlasNode`]: renders a batch of same-sized items from one atlas, with
//! node-wide tint, opacity and blend function.
//!
//! The node owns the grid layout and keeps its atlas quads in sync with the
//! active [`ItemSource`]. Property changes that affect quads only mark the
//! node dirty; quads are regenerated at most once, on the next draw.

use std::path::Path;

use crate::atlas::TextureAtlas;
use crate::blend::BlendFunc;
use crate::color::Color;
use crate::config::AtlasNodeConfig;
use crate::device::{DrawState, RenderDevice};
use crate::error::AtlasError;
use crate::geom::Size;
use crate::items::{GridItems, ItemSource};
use crate::layout::AtlasGrid;
use crate::texture::{AtlasTexture, TextureLoader};

/// A drawable grid of atlas items.
pub struct AtlasNode<D: RenderDevice> {
    atlas: TextureAtlas<D>,
    grid: AtlasGrid,
    source: Box<dyn ItemSource>,
    quantity_of_items: usize,
    opacity: u8,
    /// Tint actually bound at draw time.
    color: Color,
    color_unmodified: Color,
    opacity_modify_rgb: bool,
    blend_func: BlendFunc,
    dirty: bool,
}

impl<D: RenderDevice> AtlasNode<D> {
    /// Tile-sheet node showing the first `item_count` items of `texture`.
    pub fn new(
        device: &mut D,
        texture: D::Texture,
        item_width: u32,
        item_height: u32,
        item_count: usize,
    ) -> Result<Self, AtlasError> {
        let config = AtlasNodeConfig::new(item_width, item_height, item_count);
        Self::with_config(device, texture, Box::new(GridItems), &config)
    }

    /// Load the atlas through `loader`, then behave as [`new`](Self::new).
    pub fn from_file<L>(
        device: &mut D,
        loader: &mut L,
        path: impl AsRef<Path>,
        item_width: u32,
        item_height: u32,
        item_count: usize,
    ) -> Result<Self, AtlasError>
    where
        L: TextureLoader<D::Texture> + ?Sized,
    {
        let texture = loader.load(path.as_ref())?;
        Self::new(device, texture, item_width, item_height, item_count)
    }

    /// Glyph-grid node rendering `text` from a character atlas whose first
    /// item is `map_start`.
    pub fn label(
        device: &mut D,
        texture: D::Texture,
        item_width: u32,
        item_height: u32,
        text: &str,
        map_start: char,
    ) -> Result<Self, AtlasError> {
        let items = crate::items::CharItems::new(text, map_start);
        let config = AtlasNodeConfig::new(item_width, item_height, items.len());
        Self::with_config(device, texture, Box::new(items), &config)
    }

    /// Build a node from a full configuration and item source.
    ///
    /// Nothing is returned unless every step succeeds: layout, atlas
    /// allocation and the initial quad generation.
    pub fn with_config(
        device: &mut D,
        texture: D::Texture,
        source: Box<dyn ItemSource>,
        config: &AtlasNodeConfig,
    ) -> Result<Self, AtlasError> {
        let grid = AtlasGrid::for_texture(config.item_size(), &texture)?;
        check_quantity(source.as_ref(), &grid, config.item_count)?;
        let premultiplied = texture.has_premultiplied_alpha();
        let atlas = TextureAtlas::new(device, texture, config.atlas_capacity())?;

        let mut node = Self {
            atlas,
            grid,
            source,
            quantity_of_items: config.item_count,
            opacity: config.opacity,
            color: config.color,
            color_unmodified: config.color,
            opacity_modify_rgb: config.opacity_modify_rgb.unwrap_or(premultiplied),
            blend_func: config
                .blend_func
                .unwrap_or(BlendFunc::for_texture(premultiplied)),
            dirty: true,
        };
        node.set_color(config.color);
        node.update_atlas_values()?;

        log::debug!(
            "atlas node: {} items of {} on {}x{} grid",
            node.quantity_of_items,
            grid.item_size(),
            grid.items_per_row(),
            grid.items_per_column()
        );
        Ok(node)
    }

    // -- layout -------------------------------------------------------------

    /// Regenerate the quad of every active item and push it to the atlas.
    pub fn update_atlas_values(&mut self) -> Result<(), AtlasError> {
        for i in 0..self.quantity_of_items {
            let quad = self.source.item_quad(i, &self.grid);
            self.atlas.update_quad(i, quad)?;
        }
        self.dirty = false;
        Ok(())
    }

    pub fn grid(&self) -> &AtlasGrid {
        &self.grid
    }

    pub fn items_per_row(&self) -> usize {
        self.grid.items_per_row()
    }

    pub fn items_per_column(&self) -> usize {
        self.grid.items_per_column()
    }

    pub fn item_size(&self) -> Size {
        self.grid.item_size()
    }

    /// Change the item size; fails, leaving the node unchanged, if the new
    /// size does not fit the atlas.
    pub fn set_item_size(&mut self, item_width: u32, item_height: u32) -> Result<(), AtlasError> {
        let grid = AtlasGrid::for_texture(Size::new(item_width, item_height), self.atlas.texture())?;
        check_quantity(self.source.as_ref(), &grid, self.quantity_of_items)?;
        self.grid = grid;
        self.dirty = true;
        Ok(())
    }

    pub fn quantity_of_items(&self) -> usize {
        self.quantity_of_items
    }

    /// Change how many items are rendered, growing the atlas if needed.
    pub fn set_quantity_of_items(
        &mut self,
        device: &mut D,
        quantity: usize,
    ) -> Result<(), AtlasError> {
        check_quantity(self.source.as_ref(), &self.grid, quantity)?;
        self.reserve(device, quantity)?;
        self.quantity_of_items = quantity;
        self.dirty = true;
        Ok(())
    }

    /// Swap the item policy together with the number of items it renders.
    pub fn set_items(
        &mut self,
        device: &mut D,
        source: Box<dyn ItemSource>,
        quantity: usize,
    ) -> Result<(), AtlasError> {
        check_quantity(source.as_ref(), &self.grid, quantity)?;
        self.reserve(device, quantity)?;
        self.source = source;
        self.quantity_of_items = quantity;
        self.dirty = true;
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    fn reserve(&mut self, device: &mut D, quantity: usize) -> Result<(), AtlasError> {
        if quantity > self.atlas.capacity() {
            self.atlas.resize(device, quantity)?;
        }
        Ok(())
    }

    // -- atlas and texture --------------------------------------------------

    pub fn atlas(&self) -> &TextureAtlas<D> {
        &self.atlas
    }

    pub fn texture(&self) -> &D::Texture {
        self.atlas.texture()
    }

    /// Point the node at another texture, returning the previous one.
    ///
    /// The layout is recomputed for the new texture; if the current items
    /// no longer fit, nothing changes and the error is returned.
    pub fn set_texture(&mut self, texture: D::Texture) -> Result<D::Texture, AtlasError> {
        let grid = AtlasGrid::for_texture(self.grid.item_size(), &texture)?;
        check_quantity(self.source.as_ref(), &grid, self.quantity_of_items)?;
        let old = self.atlas.set_texture(texture);
        self.grid = grid;
        self.texture_changed();
        Ok(old)
    }

    /// Replace the whole atlas, returning the one previously held.
    pub fn replace_atlas(
        &mut self,
        atlas: TextureAtlas<D>,
    ) -> Result<TextureAtlas<D>, AtlasError> {
        let grid = AtlasGrid::for_texture(self.grid.item_size(), atlas.texture())?;
        check_quantity(self.source.as_ref(), &grid, self.quantity_of_items)?;
        if self.quantity_of_items > atlas.capacity() {
            return Err(AtlasError::IndexOutOfRange {
                index: self.quantity_of_items - 1,
                capacity: atlas.capacity(),
            });
        }
        let old = std::mem::replace(&mut self.atlas, atlas);
        self.grid = grid;
        self.texture_changed();
        Ok(old)
    }

    fn texture_changed(&mut self) {
        let premultiplied = self.atlas.texture().has_premultiplied_alpha();
        if !premultiplied {
            self.blend_func = BlendFunc::STRAIGHT_ALPHA;
        }
        self.opacity_modify_rgb = premultiplied;
        self.set_color(self.color_unmodified);
        self.dirty = true;
    }

    // -- color, opacity, blending ------------------------------------------

    pub fn opacity(&self) -> u8 {
        self.opacity
    }

    pub fn set_opacity(&mut self, opacity: u8) {
        self.opacity = opacity;
        if self.opacity_modify_rgb {
            self.color = self.color_unmodified.premultiplied(opacity);
        }
    }

    /// Set opacity from a normalized alpha, clamped to `[0, 1]`.
    pub fn set_opacity_f32(&mut self, alpha: f32) {
        // NaN saturates to 0
        self.set_opacity((alpha.clamp(0.0, 1.0) * 255.0).round() as u8);
    }

    /// Tint bound at draw time (premultiplied if opacity modifies RGB).
    pub fn color(&self) -> Color {
        self.color
    }

    pub fn color_unmodified(&self) -> Color {
        self.color_unmodified
    }

    pub fn set_color(&mut self, color: Color) {
        self.color_unmodified = color;
        self.color = if self.opacity_modify_rgb {
            color.premultiplied(self.opacity)
        } else {
            color
        };
    }

    pub fn opacity_modify_rgb(&self) -> bool {
        self.opacity_modify_rgb
    }

    pub fn set_opacity_modify_rgb(&mut self, modify: bool) {
        self.opacity_modify_rgb = modify;
        self.set_color(self.color_unmodified);
    }

    pub fn blend_func(&self) -> BlendFunc {
        self.blend_func
    }

    pub fn set_blend_func(&mut self, blend_func: BlendFunc) {
        self.blend_func = blend_func;
    }

    /// Blend function and RGBA modulation the next draw binds.
    pub fn draw_state(&self) -> DrawState {
        DrawState {
            blend: self.blend_func,
            color: self.color.with_alpha(self.opacity),
        }
    }

    // -- drawing ------------------------------------------------------------

    /// Draw all active items as one batch. Called once per frame by the
    /// container, with its transform already bound on `device`.
    pub fn draw(&mut self, device: &mut D) -> Result<(), AtlasError> {
        if self.dirty {
            self.update_atlas_values()?;
        }
        let state = self.draw_state();
        self.atlas
            .draw_range(device, &state, 0, self.quantity_of_items);
        Ok(())
    }
}

fn check_quantity(
    source: &dyn ItemSource,
    grid: &AtlasGrid,
    quantity: usize,
) -> Result<(), AtlasError> {
    match source.max_items(grid) {
        Some(max) if quantity > max => Err(AtlasError::InvalidDimensions {
            item: grid.item_size(),
            atlas: grid.atlas_size(),
            reason: "more items than the atlas holds",
        }),
        _ => Ok(()),
    }
}

impl<D: RenderDevice> std::fmt::Debug for AtlasNode<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasNode")
            .field("atlas", &self.atlas)
            .field("grid", &self.grid)
            .field("quantity_of_items", &self.quantity_of_items)
            .field("opacity", &self.opacity)
            .field("color", &self.color)
            .field("color_unmodified", &self.color_unmodified)
            .field("opacity_modify_rgb", &self.opacity_modify_rgb)
            .field("blend_func", &self.blend_func)
            .field("dirty", &self.dirty)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::items::CharItems;
    use crate::recording::{RecordedTexture, RecordingDevice, RecordingLoader};

    fn sheet(id: u32) -> RecordedTexture {
        RecordedTexture::new(id, 256, 128)
    }

    fn node(dev: &mut RecordingDevice, count: usize) -> AtlasNode<RecordingDevice> {
        AtlasNode::new(dev, sheet(1), 32, 32, count).unwrap()
    }

    #[test]
    fn reference_layout() {
        let mut dev = RecordingDevice::new();
        let n = node(&mut dev, 8);
        assert_eq!(n.items_per_row(), 8);
        assert_eq!(n.items_per_column(), 4);
        assert_eq!(n.grid().cell(5).row, 0);
        assert_eq!(n.grid().cell(5).col, 5);
        assert_eq!(n.atlas().quads()[5].tex_origin(), [0.625, 0.0]);
        assert_eq!(n.atlas().total_quads(), 8);
        assert!(!n.is_dirty());
    }

    #[test]
    fn oversized_item_is_invalid() {
        let mut dev = RecordingDevice::new();
        let r = AtlasNode::new(&mut dev, sheet(1), 300, 32, 1);
        assert!(matches!(r, Err(AtlasError::InvalidDimensions { .. })));
        let r = AtlasNode::new(&mut dev, sheet(1), 32, 129, 1);
        assert!(matches!(r, Err(AtlasError::InvalidDimensions { .. })));
    }

    #[test]
    fn too_many_items_is_invalid() {
        let mut dev = RecordingDevice::new();
        assert!(AtlasNode::new(&mut dev, sheet(1), 32, 32, 32).is_ok());
        let r = AtlasNode::new(&mut dev, sheet(1), 32, 32, 33);
        assert!(matches!(r, Err(AtlasError::InvalidDimensions { .. })));
    }

    #[test]
    fn allocation_failure_aborts_construction() {
        let mut dev = RecordingDevice::new().with_allocation_limit(4);
        let r = AtlasNode::new(&mut dev, sheet(1), 32, 32, 5);
        assert!(matches!(r, Err(AtlasError::Allocation { .. })));
    }

    #[test]
    fn from_file_uses_loader() {
        let mut dev = RecordingDevice::new();
        let mut loader = RecordingLoader::new().with_texture("tiles.png", sheet(9));
        let n = AtlasNode::from_file(&mut dev, &mut loader, "tiles.png", 32, 32, 3).unwrap();
        assert_eq!(n.texture().id, 9);

        let r = AtlasNode::from_file(&mut dev, &mut loader, "nope.png", 32, 32, 3);
        assert!(matches!(r, Err(AtlasError::TextureLoad(_))));
    }

    #[test]
    fn update_is_idempotent() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 13);
        let before = bytemuck::cast_slice::<_, u8>(n.atlas().quads()).to_vec();
        n.update_atlas_values().unwrap();
        let after = bytemuck::cast_slice::<_, u8>(n.atlas().quads()).to_vec();
        assert_eq!(before, after);
    }

    #[test]
    fn zero_items_draw_nothing() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 0);
        assert_eq!(n.atlas().capacity(), 1);
        n.draw(&mut dev).unwrap();
        assert!(dev.draws().is_empty());
    }

    #[test]
    fn draw_binds_blend_and_modulated_color() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 4);
        n.set_color(Color::from_rgb(255, 255, 255));
        n.set_opacity(128);
        n.set_blend_func(BlendFunc::ADDITIVE);
        n.draw(&mut dev).unwrap();

        let call = &dev.draws()[0];
        assert_eq!(call.texture, 1);
        assert_eq!(call.range, 0..4);
        assert_eq!(call.state.blend, BlendFunc::ADDITIVE);
        assert_eq!(
            call.state.color,
            Rgba {
                r: 128,
                g: 128,
                b: 128,
                a: 128
            }
        );
        assert_eq!(call.quads, n.atlas().quads());
    }

    #[test]
    fn premultiplied_texture_defaults() {
        let mut dev = RecordingDevice::new();
        let n = node(&mut dev, 1);
        assert!(n.opacity_modify_rgb());
        assert_eq!(n.blend_func(), BlendFunc::PREMULTIPLIED);
        assert_eq!(n.opacity(), 255);
        assert_eq!(n.color(), Color::WHITE);
    }

    #[test]
    fn straight_alpha_texture_defaults() {
        let mut dev = RecordingDevice::new();
        let tex = sheet(1).with_premultiplied_alpha(false);
        let mut n = AtlasNode::new(&mut dev, tex, 32, 32, 1).unwrap();
        assert!(!n.opacity_modify_rgb());
        assert_eq!(n.blend_func(), BlendFunc::STRAIGHT_ALPHA);

        // alpha goes to the draw only; the tint is untouched
        n.set_color(Color::from_rgb(200, 100, 50));
        n.set_opacity(10);
        assert_eq!(n.color(), Color::from_rgb(200, 100, 50));
        assert_eq!(n.draw_state().color.a, 10);
    }

    #[test]
    fn opacity_scales_color_monotonically() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 1);
        let base = Color::from_rgb(240, 120, 7);
        n.set_color(base);
        let mut prev = Color::BLACK;
        for opacity in 0..=255u8 {
            n.set_opacity(opacity);
            let c = n.color();
            assert!(c.r() >= prev.r() && c.g() >= prev.g() && c.b() >= prev.b());
            prev = c;
        }
        assert_eq!(n.color(), base);
        assert_eq!(n.color_unmodified(), base);
        n.set_opacity(0);
        assert_eq!(n.color(), Color::BLACK);
    }

    #[test]
    fn toggling_opacity_modify_reapplies_color() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 1);
        n.set_opacity(128);
        assert_eq!(n.color(), Color::from_rgb(128, 128, 128));
        n.set_opacity_modify_rgb(false);
        assert_eq!(n.color(), Color::WHITE);
        n.set_opacity_modify_rgb(true);
        assert_eq!(n.color(), Color::from_rgb(128, 128, 128));
    }

    #[test]
    fn float_opacity_is_clamped() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 1);
        n.set_opacity_f32(2.5);
        assert_eq!(n.opacity(), 255);
        n.set_opacity_f32(-1.0);
        assert_eq!(n.opacity(), 0);
        n.set_opacity_f32(0.5);
        assert_eq!(n.opacity(), 128);
    }

    #[test]
    fn texture_swap_relayouts_lazily() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 4);
        let old = n.set_texture(RecordedTexture::new(2, 128, 128)).unwrap();
        assert_eq!(old.id, 1);
        assert_eq!(n.items_per_row(), 4);
        assert!(n.is_dirty());
        // quads are only regenerated by the draw
        assert_eq!(n.atlas().quads()[1].tex_origin(), [0.125, 0.0]);
        n.draw(&mut dev).unwrap();
        assert_eq!(n.atlas().quads()[1].tex_origin(), [0.25, 0.0]);
        assert_eq!(dev.draws()[0].texture, 2);
    }

    #[test]
    fn rejected_texture_keeps_state() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 8);
        // holds only 4 items
        let r = n.set_texture(RecordedTexture::new(2, 64, 64));
        assert!(matches!(r, Err(AtlasError::InvalidDimensions { .. })));
        let r = n.set_texture(RecordedTexture::new(3, 16, 16));
        assert!(matches!(r, Err(AtlasError::InvalidDimensions { .. })));
        assert_eq!(n.texture().id, 1);
        assert_eq!(n.items_per_row(), 8);
        assert!(!n.is_dirty());
    }

    #[test]
    fn straight_texture_swap_switches_blend() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 1);
        n.set_opacity(128);
        n.set_texture(sheet(2).with_premultiplied_alpha(false)).unwrap();
        assert_eq!(n.blend_func(), BlendFunc::STRAIGHT_ALPHA);
        assert!(!n.opacity_modify_rgb());
        assert_eq!(n.color(), Color::WHITE);
    }

    #[test]
    fn replace_atlas_hands_back_the_old_one() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 4);
        let small = TextureAtlas::new(&mut dev, sheet(5), 2).unwrap();
        assert!(matches!(
            n.replace_atlas(small),
            Err(AtlasError::IndexOutOfRange { index: 3, capacity: 2 })
        ));

        let fresh = TextureAtlas::new(&mut dev, sheet(6), 16).unwrap();
        let old = n.replace_atlas(fresh).unwrap();
        assert_eq!(old.texture().id, 1);
        assert_eq!(old.total_quads(), 4);
        n.draw(&mut dev).unwrap();
        assert_eq!(n.atlas().total_quads(), 4);
        assert_eq!(dev.draws()[0].texture, 6);
    }

    #[test]
    fn growing_quantity_resizes_atlas() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 2);
        n.set_quantity_of_items(&mut dev, 10).unwrap();
        assert_eq!(n.atlas().capacity(), 10);
        n.draw(&mut dev).unwrap();
        assert_eq!(dev.draws()[0].range, 0..10);

        assert!(n.set_quantity_of_items(&mut dev, 33).is_err());
        assert_eq!(n.quantity_of_items(), 10);

        // shrinking keeps capacity and draws fewer
        n.set_quantity_of_items(&mut dev, 3).unwrap();
        n.draw(&mut dev).unwrap();
        assert_eq!(n.atlas().capacity(), 10);
        assert_eq!(dev.draws()[1].range, 0..3);
    }

    #[test]
    fn item_size_change_relayouts() {
        let mut dev = RecordingDevice::new();
        let mut n = node(&mut dev, 4);
        n.set_item_size(64, 64).unwrap();
        assert_eq!((n.items_per_row(), n.items_per_column()), (4, 2));
        n.draw(&mut dev).unwrap();
        assert_eq!(n.atlas().quads()[3].tl.position, [192.0, 0.0]);
        assert!(n.set_item_size(0, 8).is_err());
        assert_eq!(n.item_size(), Size::new(64, 64));
    }

    #[test]
    fn label_node_tracks_text() {
        let mut dev = RecordingDevice::new();
        let mut n = AtlasNode::label(&mut dev, sheet(1), 32, 32, "42", '0').unwrap();
        assert_eq!(n.quantity_of_items(), 2);
        assert_eq!(n.atlas().quads()[0].tex_origin(), [0.5, 0.0]);
        assert_eq!(n.atlas().quads()[1].tl.position, [32.0, 0.0]);

        // longer than the sheet holds distinct glyphs: fine for labels
        let text = "0123456789".repeat(4);
        let items = CharItems::new(&text, '0');
        n.set_items(&mut dev, Box::new(items), text.len()).unwrap();
        n.draw(&mut dev).unwrap();
        assert_eq!(dev.draws()[0].range, 0..40);
        assert_eq!(n.atlas().quads()[39].tl.position, [39.0 * 32.0, 0.0]);
    }
}

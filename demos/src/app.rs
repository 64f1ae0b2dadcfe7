//! The demo window: a tile-sheet node and a frame-counter label, redrawn
//! continuously.

use std::error::Error;
use std::path::PathBuf;
use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    dpi::PhysicalSize,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop},
    window::{Window, WindowId},
};

use quadgrid_core::{AtlasNode, CharItems, Color, Size};
use quadgrid_wgpu::{
    GpuContext, TextureOptions, WgpuDevice, WgpuDeviceConfig, WgpuTexture, pixel_projection,
};

use crate::sheet;

const MARGIN: f32 = 16.0;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Configuration for the demo.
#[derive(Clone, Debug, PartialEq)]
pub struct DemoConfig {
    /// Window title.
    pub title: String,
    /// Tile sheet to load. A generated sheet is used when `None`.
    pub atlas_path: Option<PathBuf>,
    /// Tile width in pixels.
    pub item_width: u32,
    /// Tile height in pixels.
    pub item_height: u32,
    /// Number of tiles to show.
    pub item_count: usize,
    /// Columns of the generated sheet.
    pub sheet_columns: u32,
    /// Rows of the generated sheet.
    pub sheet_rows: u32,
    /// Pixel scale of the counter glyphs.
    pub glyph_scale: u32,
    /// Initial inner window size.
    pub window_width: u32,
    pub window_height: u32,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            title: "quadgrid atlas demo".into(),
            atlas_path: None,
            item_width: 32,
            item_height: 32,
            item_count: 32,
            sheet_columns: 8,
            sheet_rows: 4,
            glyph_scale: 4,
            window_width: 800,
            window_height: 600,
        }
    }
}

impl DemoConfig {
    /// `[ATLAS ITEM_WIDTH ITEM_HEIGHT ITEM_COUNT]`; missing trailing
    /// arguments keep their defaults.
    pub fn from_args<I>(args: I) -> Result<Self, Box<dyn Error>>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();
        if let Some(path) = args.next() {
            config.atlas_path = Some(PathBuf::from(path));
        }
        if let Some(w) = args.next() {
            config.item_width = w.parse()?;
        }
        if let Some(h) = args.next() {
            config.item_height = h.parse()?;
        }
        if let Some(n) = args.next() {
            config.item_count = n.parse()?;
        }
        if args.next().is_some() {
            return Err("usage: atlas-demo [ATLAS ITEM_WIDTH ITEM_HEIGHT ITEM_COUNT]".into());
        }
        Ok(config)
    }
}

/// Open the window and run until it is closed.
pub fn run(config: DemoConfig) -> Result<(), Box<dyn Error>> {
    let event_loop = EventLoop::new()?;
    let mut app = DemoApp::new(config);
    event_loop.run_app(&mut app)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Graphics state
// ---------------------------------------------------------------------------

struct Graphics {
    gpu: GpuContext,
    surface: wgpu::Surface<'static>,
    surface_config: wgpu::SurfaceConfiguration,
    device: WgpuDevice,
    tiles: AtlasNode<WgpuDevice>,
    counter: AtlasNode<WgpuDevice>,
}

impl Graphics {
    fn new(config: &DemoConfig, window: Arc<Window>) -> Result<Self, Box<dyn Error>> {
        let instance = GpuContext::create_instance();
        let surface = instance.create_surface(window.clone())?;
        let gpu = GpuContext::new(instance, Some(&surface))?;

        let caps = surface.get_capabilities(&gpu.adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| !f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or("surface supports no texture formats")?;
        let size = window.inner_size();
        let surface_config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode: caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&gpu.device, &surface_config);

        let mut device = WgpuDevice::new(&gpu, WgpuDeviceConfig::new(format));

        let tiles = match &config.atlas_path {
            Some(path) => {
                let mut loader = gpu.image_loader(TextureOptions {
                    premultiply_alpha: true,
                    pad_to_power_of_two: false,
                });
                AtlasNode::from_file(
                    &mut device,
                    &mut loader,
                    path,
                    config.item_width,
                    config.item_height,
                    config.item_count,
                )?
            }
            None => {
                let item = Size::new(config.item_width, config.item_height);
                let sheet = sheet::tile_sheet(item, config.sheet_columns, config.sheet_rows);
                // straight alpha: the node switches to a non-premultiplied blend
                let texture = WgpuTexture::from_rgba(
                    &gpu.device,
                    &gpu.queue,
                    sheet.size,
                    &sheet.rgba,
                    false,
                    TextureOptions::default(),
                )?;
                AtlasNode::new(
                    &mut device,
                    texture,
                    config.item_width,
                    config.item_height,
                    config.item_count,
                )?
            }
        };

        let digits = sheet::digit_sheet(config.glyph_scale);
        let cell = sheet::digit_cell(config.glyph_scale);
        let digit_texture = WgpuTexture::from_rgba(
            &gpu.device,
            &gpu.queue,
            digits.size,
            &digits.rgba,
            true,
            TextureOptions::default(),
        )?;
        let mut counter =
            AtlasNode::label(&mut device, digit_texture, cell.width, cell.height, "0", '0')?;
        counter.set_color(Color::from_rgb(255, 220, 90));

        log::info!(
            "showing {} tiles of {} ({} blend)",
            tiles.quantity_of_items(),
            tiles.item_size(),
            tiles.blend_func()
        );

        Ok(Self {
            gpu,
            surface,
            surface_config,
            device,
            tiles,
            counter,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.surface_config.width = width.max(1);
        self.surface_config.height = height.max(1);
        self.surface.configure(&self.gpu.device, &self.surface_config);
    }

    fn update(&mut self, frame: u64) -> Result<(), Box<dyn Error>> {
        let phase = (frame as f32 / 60.0).sin();
        self.tiles.set_opacity_f32(0.75 + 0.25 * phase);

        let text = frame.to_string();
        let items = CharItems::new(&text, '0');
        let count = items.len();
        self.counter
            .set_items(&mut self.device, Box::new(items), count)?;
        Ok(())
    }

    fn render(&mut self) -> Result<(), Box<dyn Error>> {
        let frame = match self.surface.get_current_texture() {
            Ok(frame) => frame,
            Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                log::warn!("surface lost, reconfiguring");
                self.surface.configure(&self.gpu.device, &self.surface_config);
                return Ok(());
            }
            Err(e) => {
                log::warn!("skipping frame: {e}");
                return Ok(());
            }
        };
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let viewport = Size::new(self.surface_config.width, self.surface_config.height);
        self.device
            .set_transform(pixel_projection(viewport, [-MARGIN, -MARGIN]));
        self.tiles.draw(&mut self.device)?;

        let grid = self.tiles.grid();
        let rows = self.tiles.quantity_of_items().div_ceil(grid.items_per_row());
        let label_y = MARGIN * 2.0 + (rows as u32 * grid.item_size().height) as f32;
        self.device
            .set_transform(pixel_projection(viewport, [-MARGIN, -label_y]));
        self.counter.draw(&mut self.device)?;

        self.device.render(&view, Some(wgpu::Color::BLACK));
        frame.present();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// DemoApp: ApplicationHandler
// ---------------------------------------------------------------------------

struct DemoApp {
    config: DemoConfig,
    window: Option<Arc<Window>>,
    gfx: Option<Graphics>,
    frame: u64,
}

impl DemoApp {
    fn new(config: DemoConfig) -> Self {
        Self {
            config,
            window: None,
            gfx: None,
            frame: 0,
        }
    }

    fn redraw(&mut self) -> Result<(), Box<dyn Error>> {
        let Some(gfx) = self.gfx.as_mut() else {
            return Ok(());
        };
        gfx.update(self.frame)?;
        gfx.render()?;
        self.frame += 1;
        if let Some(w) = self.window.as_ref() {
            w.request_redraw();
        }
        Ok(())
    }
}

impl ApplicationHandler for DemoApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }

        let window_attrs = Window::default_attributes()
            .with_title(&self.config.title)
            .with_inner_size(PhysicalSize::new(
                self.config.window_width,
                self.config.window_height,
            ))
            .with_resizable(true);

        let window = match event_loop.create_window(window_attrs) {
            Ok(w) => Arc::new(w),
            Err(e) => {
                log::error!("failed to create window: {e}");
                event_loop.exit();
                return;
            }
        };

        match Graphics::new(&self.config, window.clone()) {
            Ok(gfx) => self.gfx = Some(gfx),
            Err(e) => {
                log::error!("graphics setup failed: {e}");
                event_loop.exit();
                return;
            }
        }
        window.request_redraw();
        self.window = Some(window);
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => event_loop.exit(),

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                if let Some(gfx) = self.gfx.as_mut() {
                    gfx.resize(width, height);
                }
            }

            WindowEvent::RedrawRequested => {
                if let Err(e) = self.redraw() {
                    log::error!("draw failed: {e}");
                    event_loop.exit();
                }
            }

            _ => {}
        }
    }
}

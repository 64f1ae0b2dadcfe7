//! Atlas textures on the GPU and the image-file loader that creates them.

use std::path::Path;

use quadgrid_core::{AtlasTexture, Size, TextureLoadError, TextureLoader};

use crate::GpuError;

const RGBA_CHANNELS: usize = 4;

/// How decoded pixels are prepared before upload.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TextureOptions {
    /// Multiply color channels by alpha on load.
    pub premultiply_alpha: bool,
    /// Pad the image to power-of-two sides. The padding is transparent and
    /// excluded from the texture's content size.
    pub pad_to_power_of_two: bool,
}

/// An RGBA atlas texture.
#[derive(Debug)]
pub struct WgpuTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    pixel_size: Size,
    content_size: Size,
    premultiplied_alpha: bool,
}

impl WgpuTexture {
    /// Upload tightly packed RGBA8 pixels of an image of `size`.
    ///
    /// `premultiplied_alpha` declares the layout of `rgba` as given;
    /// `options.premultiply_alpha` converts straight alpha before upload.
    pub fn from_rgba(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        size: Size,
        rgba: &[u8],
        premultiplied_alpha: bool,
        options: TextureOptions,
    ) -> Result<Self, GpuError> {
        let expected = size.width as usize * size.height as usize * RGBA_CHANNELS;
        if rgba.len() != expected {
            return Err(GpuError::TextureData {
                expected,
                actual: rgba.len(),
            });
        }

        let mut pixels = rgba.to_vec();
        let premultiply = options.premultiply_alpha && !premultiplied_alpha;
        if premultiply {
            premultiply_alpha(&mut pixels);
        }
        let pixel_size = if options.pad_to_power_of_two {
            let padded = Size::new(
                size.width.next_power_of_two(),
                size.height.next_power_of_two(),
            );
            pixels = pad_rgba(&pixels, size, padded);
            padded
        } else {
            size
        };

        let limit = device.limits().max_texture_dimension_2d;
        if pixel_size.width > limit || pixel_size.height > limit {
            return Err(GpuError::TextureTooLarge {
                size: pixel_size,
                limit,
            });
        }

        let extent = wgpu::Extent3d {
            width: pixel_size.width,
            height: pixel_size.height,
            depth_or_array_layers: 1,
        };
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("atlas texture"),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(pixel_size.width * RGBA_CHANNELS as u32),
                rows_per_image: Some(pixel_size.height),
            },
            extent,
        );
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        log::debug!("atlas texture {size} uploaded as {pixel_size}");
        Ok(Self {
            texture,
            view,
            pixel_size,
            content_size: size,
            premultiplied_alpha: premultiplied_alpha || premultiply,
        })
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }
}

impl AtlasTexture for WgpuTexture {
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
// ImageLoader
// ---------------------------------------------------------------------------

/// Decodes image files with [`image`] and uploads them as atlas textures.
#[derive(Debug)]
pub struct ImageLoader {
    device: wgpu::Device,
    queue: wgpu::Queue,
    options: TextureOptions,
}

impl ImageLoader {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, options: TextureOptions) -> Self {
        Self {
            device,
            queue,
            options,
        }
    }
}

impl TextureLoader<WgpuTexture> for ImageLoader {
    fn load(&mut self, path: &Path) -> Result<WgpuTexture, TextureLoadError> {
        let img = image::open(path)
            .map_err(|e| TextureLoadError::new(path, e))?
            .to_rgba8();
        let size = Size::new(img.width(), img.height());
        log::debug!("decoded {} ({size})", path.display());
        // decoded files carry straight alpha
        WgpuTexture::from_rgba(
            &self.device,
            &self.queue,
            size,
            img.as_raw(),
            false,
            self.options,
        )
        .map_err(|e| TextureLoadError::new(path, e))
    }
}

// ---------------------------------------------------------------------------
// Pixel helpers
// ---------------------------------------------------------------------------

/// Multiply the color channels of RGBA8 pixels by their alpha, in place.
pub fn premultiply_alpha(rgba: &mut [u8]) {
    for px in rgba.chunks_exact_mut(RGBA_CHANNELS) {
        let a = px[3] as u32;
        for c in &mut px[..3] {
            *c = ((*c as u32 * a + 127) / 255) as u8;
        }
    }
}

/// Copy an RGBA8 image of `size` into the top-left of a transparent image
/// of `padded`.
fn pad_rgba(rgba: &[u8], size: Size, padded: Size) -> Vec<u8> {
    let src_row = size.width as usize * RGBA_CHANNELS;
    let dst_row = padded.width as usize * RGBA_CHANNELS;
    let mut out = vec![0u8; dst_row * padded.height as usize];
    for (src, dst) in rgba.chunks_exact(src_row).zip(out.chunks_exact_mut(dst_row)) {
        dst[..src_row].copy_from_slice(src);
    }
    out
}

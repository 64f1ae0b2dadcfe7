//! wgpu back-end for quadgrid.
//!
//! Implements the core's [`RenderDevice`](quadgrid_core::RenderDevice) seam
//! on the GPU: each atlas gets a vertex buffer of quads plus a fixed index
//! buffer, each draw binds the atlas texture and a small uniform block
//! (transform + modulated color), and pipelines are cached per blend
//! function. Draws issued during a frame are queued and replayed into one
//! render pass by [`WgpuDevice::render`].
//!
//! Uses:
//! - [`wgpu`] for GPU rendering
//! - [`image`] for decoding atlas files (the texture loader)

mod renderer;
mod texture;

use thiserror::Error;

use quadgrid_core::Size;

pub use renderer::{DrawUniforms, WgpuDevice, WgpuDeviceConfig, WgpuQuadBuffer, pixel_projection};
pub use texture::{ImageLoader, TextureOptions, WgpuTexture, premultiply_alpha};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Failures of the GPU back-end itself.
#[derive(Error, Debug)]
pub enum GpuError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("failed to create GPU device")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
    #[error("texture data is {actual} bytes, expected {expected}")]
    TextureData { expected: usize, actual: usize },
    #[error("texture {size} exceeds the device limit of {limit} texels per side")]
    TextureTooLarge { size: Size, limit: u32 },
}

// ---------------------------------------------------------------------------
// GpuContext
// ---------------------------------------------------------------------------

/// Instance, adapter, device and queue.
#[derive(Debug)]
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Request an adapter (able to present to `compatible_surface`, if
    /// given) and a device on it.
    pub fn new(
        instance: wgpu::Instance,
        compatible_surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, GpuError> {
        let adapter = pollster_block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface,
            force_fallback_adapter: false,
        }))
        .ok_or(GpuError::NoAdapter)?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let (device, queue) = pollster_block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("quadgrid device"),
                ..Default::default()
            },
            None,
        ))?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// A context with no presentation surface, e.g. for offscreen targets.
    pub fn headless() -> Result<Self, GpuError> {
        Self::new(Self::create_instance(), None)
    }

    pub fn create_instance() -> wgpu::Instance {
        wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        })
    }

    /// Image-file loader creating textures on this context's device.
    pub fn image_loader(&self, options: TextureOptions) -> ImageLoader {
        ImageLoader::new(self.device.clone(), self.queue.clone(), options)
    }
}

// ---------------------------------------------------------------------------
// Minimal pollster (block on async without pulling in tokio)
// ---------------------------------------------------------------------------

pub(crate) fn pollster_block_on<F: std::future::Future>(f: F) -> F::Output {
    // Adapter/device requests and error scopes resolve almost immediately
    // on native back-ends, so spin-polling is enough.
    let mut f = std::pin::pin!(f);
    let waker = waker_fn::noop_waker();
    let mut cx = std::task::Context::from_waker(&waker);
    loop {
        match f.as_mut().poll(&mut cx) {
            std::task::Poll::Ready(v) => return v,
            std::task::Poll::Pending => std::thread::yield_now(),
        }
    }
}

mod waker_fn {
    use std::task::{RawWaker, RawWakerVTable, Waker};

    const VTABLE: RawWakerVTable = RawWakerVTable::new(clone_fn, noop_fn, noop_fn, noop_fn);

    /// A waker that does nothing (suitable for spin-polling).
    pub fn noop_waker() -> Waker {
        // SAFETY: every vtable entry ignores the data pointer.
        unsafe { Waker::from_raw(RawWaker::new(std::ptr::null(), &VTABLE)) }
    }

    unsafe fn clone_fn(_: *const ()) -> RawWaker {
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    unsafe fn noop_fn(_: *const ()) {}
}

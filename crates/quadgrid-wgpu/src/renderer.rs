//! [`RenderDevice`] on wgpu: quad buffers, cached pipelines per blend
//! function, and a per-frame queue of draws.

use std::collections::HashMap;
use std::ops::Range;

use wgpu::util::DeviceExt;

use quadgrid_core::{
    AtlasError, BlendFactor, BlendFunc, DrawState, QUAD_INDICES, QuadRecord, QuadVertex,
    RenderDevice, Size, quad_indices,
};

use crate::texture::WgpuTexture;
use crate::{GpuContext, pollster_block_on};

const QUAD_BYTES: u64 = std::mem::size_of::<QuadRecord>() as u64;
const INDEX_BYTES: u64 = (QUAD_INDICES.len() * std::mem::size_of::<u32>()) as u64;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Render target and sampling settings for a [`WgpuDevice`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct WgpuDeviceConfig {
    /// Format of the views passed to [`WgpuDevice::render`].
    pub target_format: wgpu::TextureFormat,
    /// Atlas sampling filter. Pixel-art sheets want `Nearest`.
    pub filter: wgpu::FilterMode,
}

impl WgpuDeviceConfig {
    pub fn new(target_format: wgpu::TextureFormat) -> Self {
        Self {
            target_format,
            filter: wgpu::FilterMode::Nearest,
        }
    }
}

// ---------------------------------------------------------------------------
// GPU types
// ---------------------------------------------------------------------------

/// Per-draw uniform block, laid out as in `quad.wgsl`.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct DrawUniforms {
    /// Column-major local-to-clip transform.
    pub transform: [[f32; 4]; 4],
    /// Modulation color, each channel in `0.0..=1.0`.
    pub color: [f32; 4],
}

/// Vertex and index storage for a fixed number of quads.
#[derive(Debug)]
pub struct WgpuQuadBuffer {
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    capacity: usize,
}

impl WgpuQuadBuffer {
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

struct PendingDraw {
    pipeline: BlendFunc,
    bind_group: wgpu::BindGroup,
    vertices: wgpu::Buffer,
    indices: wgpu::Buffer,
    index_range: Range<u32>,
}

// ---------------------------------------------------------------------------
// WgpuDevice
// ---------------------------------------------------------------------------

/// wgpu implementation of the quad-drawing device.
///
/// `draw_quads` only records work; [`render`](Self::render) encodes every
/// draw recorded since the last call into a single render pass, in order.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: WgpuDeviceConfig,
    shader: wgpu::ShaderModule,
    bind_group_layout: wgpu::BindGroupLayout,
    pipeline_layout: wgpu::PipelineLayout,
    sampler: wgpu::Sampler,
    pipelines: HashMap<BlendFunc, wgpu::RenderPipeline>,
    transform: [[f32; 4]; 4],
    pending: Vec<PendingDraw>,
}

impl WgpuDevice {
    pub fn new(gpu: &GpuContext, config: WgpuDeviceConfig) -> Self {
        let device = gpu.device.clone();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("quad shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("quad.wgsl").into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("quad bgl"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
            ],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("quad pipeline layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("atlas sampler"),
            mag_filter: config.filter,
            min_filter: config.filter,
            ..Default::default()
        });

        Self {
            device,
            queue: gpu.queue.clone(),
            config,
            shader,
            bind_group_layout,
            pipeline_layout,
            sampler,
            pipelines: HashMap::new(),
            transform: pixel_projection(Size::new(1, 1), [0.0, 0.0]),
            pending: Vec::new(),
        }
    }

    /// Transform applied to draws recorded from now on.
    pub fn set_transform(&mut self, transform: [[f32; 4]; 4]) {
        self.transform = transform;
    }

    pub fn transform(&self) -> [[f32; 4]; 4] {
        self.transform
    }

    /// Number of draws waiting for [`render`](Self::render).
    pub fn pending_draws(&self) -> usize {
        self.pending.len()
    }

    /// Encode and submit all recorded draws into `view`, clearing it first
    /// when `clear` is given.
    pub fn render(&mut self, view: &wgpu::TextureView, clear: Option<wgpu::Color>) {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("quadgrid encoder"),
            });

        {
            let load = match clear {
                Some(color) => wgpu::LoadOp::Clear(color),
                None => wgpu::LoadOp::Load,
            };
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("quadgrid pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            for draw in &self.pending {
                let Some(pipeline) = self.pipelines.get(&draw.pipeline) else {
                    continue;
                };
                pass.set_pipeline(pipeline);
                pass.set_bind_group(0, &draw.bind_group, &[]);
                pass.set_vertex_buffer(0, draw.vertices.slice(..));
                pass.set_index_buffer(draw.indices.slice(..), wgpu::IndexFormat::Uint32);
                pass.draw_indexed(draw.index_range.clone(), 0, 0..1);
            }
        }

        log::trace!("submitting {} quad draws", self.pending.len());
        self.pending.clear();
        self.queue.submit(std::iter::once(encoder.finish()));
    }

    fn pipeline(&mut self, blend: BlendFunc) {
        if self.pipelines.contains_key(&blend) {
            return;
        }
        log::debug!("creating quad pipeline for blend {blend}");
        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some("quad pipeline"),
                layout: Some(&self.pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &self.shader,
                    entry_point: Some("vs_main"),
                    buffers: &[vertex_layout()],
                    compilation_options: Default::default(),
                },
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: None,
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                fragment: Some(wgpu::FragmentState {
                    module: &self.shader,
                    entry_point: Some("fs_main"),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.config.target_format,
                        blend: Some(blend_state(blend)),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                    compilation_options: Default::default(),
                }),
                multiview: None,
                cache: None,
            });
        self.pipelines.insert(blend, pipeline);
    }
}

impl RenderDevice for WgpuDevice {
    type Texture = WgpuTexture;
    type QuadBuffer = WgpuQuadBuffer;

    fn create_quad_buffer(&mut self, capacity: usize) -> Result<WgpuQuadBuffer, AtlasError> {
        let vertex_bytes = (capacity as u64).saturating_mul(QUAD_BYTES);
        let index_bytes = (capacity as u64).saturating_mul(INDEX_BYTES);
        let limit = self.device.limits().max_buffer_size;
        if vertex_bytes > limit || index_bytes > limit {
            return Err(AtlasError::Allocation {
                requested: capacity,
                reason: format!("exceeds the device buffer limit of {limit} bytes"),
            });
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let vertices = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("quad vertices"),
            size: vertex_bytes,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let indices = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("quad indices"),
                contents: bytemuck::cast_slice(&quad_indices(capacity)),
                usage: wgpu::BufferUsages::INDEX,
            });
        if let Some(err) = pollster_block_on(self.device.pop_error_scope()) {
            return Err(AtlasError::Allocation {
                requested: capacity,
                reason: err.to_string(),
            });
        }

        log::debug!("allocated quad buffer for {capacity} quads");
        Ok(WgpuQuadBuffer {
            vertices,
            indices,
            capacity,
        })
    }

    fn upload_quads(&mut self, buffer: &mut WgpuQuadBuffer, first: usize, quads: &[QuadRecord]) {
        if first + quads.len() > buffer.capacity {
            log::warn!(
                "dropping upload of quads {}..{} past buffer capacity {}",
                first,
                first + quads.len(),
                buffer.capacity
            );
            return;
        }
        self.queue.write_buffer(
            &buffer.vertices,
            first as u64 * QUAD_BYTES,
            bytemuck::cast_slice(quads),
        );
    }

    fn draw_quads(
        &mut self,
        buffer: &WgpuQuadBuffer,
        texture: &WgpuTexture,
        state: &DrawState,
        quads: Range<usize>,
    ) {
        if quads.is_empty() {
            return;
        }
        self.pipeline(state.blend);

        let uniforms = DrawUniforms {
            transform: self.transform,
            color: state.color.to_f32(),
        };
        let uniform_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("draw uniforms"),
                contents: bytemuck::bytes_of(&uniforms),
                usage: wgpu::BufferUsages::UNIFORM,
            });
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("quad bg"),
            layout: &self.bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: uniform_buffer.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::TextureView(texture.view()),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: wgpu::BindingResource::Sampler(&self.sampler),
                },
            ],
        });

        let per_quad = QUAD_INDICES.len() as u32;
        self.pending.push(PendingDraw {
            pipeline: state.blend,
            bind_group,
            vertices: buffer.vertices.clone(),
            indices: buffer.indices.clone(),
            index_range: quads.start as u32 * per_quad..quads.end as u32 * per_quad,
        });
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn vertex_layout() -> wgpu::VertexBufferLayout<'static> {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] = [
        // position
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 0,
            shader_location: 0,
        },
        // tex_coords
        wgpu::VertexAttribute {
            format: wgpu::VertexFormat::Float32x2,
            offset: 8,
            shader_location: 1,
        },
    ];
    wgpu::VertexBufferLayout {
        array_stride: std::mem::size_of::<QuadVertex>() as u64,
        step_mode: wgpu::VertexStepMode::Vertex,
        attributes: &ATTRIBUTES,
    }
}

fn blend_factor(factor: BlendFactor) -> wgpu::BlendFactor {
    match factor {
        BlendFactor::Zero => wgpu::BlendFactor::Zero,
        BlendFactor::One => wgpu::BlendFactor::One,
        BlendFactor::SrcColor => wgpu::BlendFactor::Src,
        BlendFactor::OneMinusSrcColor => wgpu::BlendFactor::OneMinusSrc,
        BlendFactor::SrcAlpha => wgpu::BlendFactor::SrcAlpha,
        BlendFactor::OneMinusSrcAlpha => wgpu::BlendFactor::OneMinusSrcAlpha,
        BlendFactor::DstColor => wgpu::BlendFactor::Dst,
        BlendFactor::OneMinusDstColor => wgpu::BlendFactor::OneMinusDst,
        BlendFactor::DstAlpha => wgpu::BlendFactor::DstAlpha,
        BlendFactor::OneMinusDstAlpha => wgpu::BlendFactor::OneMinusDstAlpha,
    }
}

/// The same factors on the color and alpha channels.
fn blend_state(func: BlendFunc) -> wgpu::BlendState {
    let component = wgpu::BlendComponent {
        src_factor: blend_factor(func.src),
        dst_factor: blend_factor(func.dst),
        operation: wgpu::BlendOperation::Add,
    };
    wgpu::BlendState {
        color: component,
        alpha: component,
    }
}

/// Orthographic projection mapping pixel coordinates (y down, `origin` at
/// the top-left of the viewport) to clip space.
pub fn pixel_projection(viewport: Size, origin: [f32; 2]) -> [[f32; 4]; 4] {
    let sx = 2.0 / viewport.width.max(1) as f32;
    let sy = -2.0 / viewport.height.max(1) as f32;
    [
        [sx, 0.0, 0.0, 0.0],
        [0.0, sy, 0.0, 0.0],
        [0.0, 0.0, 1.0, 0.0],
        [-1.0 - origin[0] * sx, 1.0 - origin[1] * sy, 0.0, 1.0],
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(m: &[[f32; 4]; 4], p: [f32; 2]) -> [f32; 2] {
        [
            m[0][0] * p[0] + m[1][0] * p[1] + m[3][0],
            m[0][1] * p[0] + m[1][1] * p[1] + m[3][1],
        ]
    }

    fn assert_near(got: [f32; 2], want: [f32; 2]) {
        assert!(
            (got[0] - want[0]).abs() < 1e-5 && (got[1] - want[1]).abs() < 1e-5,
            "{got:?} != {want:?}"
        );
    }

    #[test]
    fn projection_maps_viewport_corners() {
        let m = pixel_projection(Size::new(800, 600), [0.0, 0.0]);
        assert_near(apply(&m, [0.0, 0.0]), [-1.0, 1.0]);
        assert_near(apply(&m, [800.0, 600.0]), [1.0, -1.0]);
        assert_near(apply(&m, [400.0, 300.0]), [0.0, 0.0]);
    }

    #[test]
    fn projection_origin_shifts_view() {
        let m = pixel_projection(Size::new(100, 100), [50.0, 20.0]);
        assert_near(apply(&m, [50.0, 20.0]), [-1.0, 1.0]);
        assert_near(apply(&m, [150.0, 120.0]), [1.0, -1.0]);
    }

    #[test]
    fn blend_presets_map_to_wgpu() {
        assert_eq!(
            blend_state(BlendFunc::PREMULTIPLIED),
            wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING
        );
        assert_eq!(blend_state(BlendFunc::REPLACE), wgpu::BlendState::REPLACE);
        let straight = blend_state(BlendFunc::STRAIGHT_ALPHA);
        assert_eq!(straight.color.src_factor, wgpu::BlendFactor::SrcAlpha);
        assert_eq!(straight.color.dst_factor, wgpu::BlendFactor::OneMinusSrcAlpha);
    }

    #[test]
    fn gpu_layouts_match_shader() {
        assert_eq!(std::mem::size_of::<DrawUniforms>(), 80);
        assert_eq!(QUAD_BYTES, 4 * std::mem::size_of::<QuadVertex>() as u64);
        assert_eq!(vertex_layout().array_stride, 16);
    }
}

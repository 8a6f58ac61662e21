//! wgpu implementation of [`BatchBackend`].
//!
//! Every batch becomes one vertex buffer sized for the full batch capacity and
//! rewritten in place with `Queue::write_buffer`. The [`PointLayer`] is the scene
//! the buffers attach to; it draws each attached buffer as a point list.

use crate::builder::{BufferBuildError, BufferBuilder, BufferUsage};
use crate::cloud::{BackendError, BatchBackend};
use crate::pipeline::{PipelineBuildError, RenderPipelineBuilder};
use crate::{CameraUniforms, Handle, PointVertex, Renderer, ResourceRegistry};
use tracing::debug;

/// Configuration for a [`PointLayer`].
#[derive(Debug, Clone, Copy)]
pub struct LayerConfig {
    /// Format of the color target the layer renders into.
    pub color_format: wgpu::TextureFormat,
    pub clear_color: wgpu::Color,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            color_format: wgpu::TextureFormat::Rgba8UnormSrgb,
            clear_color: wgpu::Color {
                r: 0.02,
                g: 0.02,
                b: 0.025,
                a: 1.0,
            },
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LayerError {
    #[error("Buffer build error: {0}")]
    BufferBuildError(#[from] BufferBuildError),
    #[error("Pipeline build error: {0}")]
    PipelineBuildError(#[from] PipelineBuildError),
    #[error("Resource not found: {0}")]
    MissingResource(&'static str),
}

/// Context passed to [`PointLayer::render`].
pub struct RenderContext<'a> {
    pub color_view: &'a wgpu::TextureView,
}

/// GPU resource backing one batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchBuffer {
    buffer: Handle<wgpu::Buffer>,
    capacity: usize,
    slot: Option<usize>,
}

#[derive(Debug, Clone, Copy)]
struct LayerEntry {
    buffer: Handle<wgpu::Buffer>,
    vertex_count: u32,
}

/// Draw list of attached batch buffers plus the pipeline that draws them.
pub struct PointLayer {
    entries: Vec<Option<LayerEntry>>,
    pipeline: Handle<wgpu::RenderPipeline>,
    bind_group: Handle<wgpu::BindGroup>,
    camera_buffer: Handle<wgpu::Buffer>,
    clear_color: wgpu::Color,
}

impl PointLayer {
    /// Number of attached batches.
    pub fn batch_count(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    /// Vertices drawn per frame.
    pub fn vertex_count(&self) -> u64 {
        self.entries
            .iter()
            .flatten()
            .map(|entry| u64::from(entry.vertex_count))
            .sum()
    }

    pub fn update_camera(
        &self,
        queue: &wgpu::Queue,
        registry: &ResourceRegistry,
        camera: &CameraUniforms,
    ) -> Result<(), BackendError> {
        let camera_buffer = registry
            .get(self.camera_buffer)
            .ok_or(BackendError::MissingResource("camera buffer"))?;
        queue.write_buffer(camera_buffer, 0, bytemuck::bytes_of(camera));
        Ok(())
    }

    /// Record a pass drawing every attached batch with its committed point count.
    pub fn render(
        &self,
        encoder: &mut wgpu::CommandEncoder,
        ctx: RenderContext,
        registry: &ResourceRegistry,
    ) -> Result<(), BackendError> {
        let pipeline = registry
            .get(self.pipeline)
            .ok_or(BackendError::MissingResource("point pipeline"))?;
        let bind_group = registry
            .get(self.bind_group)
            .ok_or(BackendError::MissingResource("point bind group"))?;

        let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Point Cloud Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: ctx.color_view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(self.clear_color),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            occlusion_query_set: None,
            timestamp_writes: None,
        });

        render_pass.set_pipeline(pipeline);
        render_pass.set_bind_group(0, bind_group, &[]);
        for entry in self.entries.iter().flatten() {
            if entry.vertex_count == 0 {
                continue;
            }
            let buffer = registry
                .get(entry.buffer)
                .ok_or(BackendError::MissingResource("batch buffer"))?;
            render_pass.set_vertex_buffer(0, buffer.slice(..));
            render_pass.draw(0..entry.vertex_count, 0..1);
        }
        Ok(())
    }

    fn attach_entry(&mut self, buffer: Handle<wgpu::Buffer>) -> usize {
        self.entries.push(Some(LayerEntry {
            buffer,
            vertex_count: 0,
        }));
        self.entries.len() - 1
    }

    fn set_vertex_count(&mut self, slot: usize, count: u32) -> Result<(), BackendError> {
        let entry = self
            .entries
            .get_mut(slot)
            .and_then(Option::as_mut)
            .ok_or(BackendError::MissingResource("layer slot"))?;
        entry.vertex_count = count;
        Ok(())
    }

    fn detach(&mut self, slot: usize) {
        if let Some(entry) = self.entries.get_mut(slot) {
            *entry = None;
        }
        while matches!(self.entries.last(), Some(None)) {
            self.entries.pop();
        }
    }
}

/// Vertex count for a draw call; wgpu draw ranges are `u32`.
fn draw_count(len: usize) -> Result<u32, BackendError> {
    u32::try_from(len).map_err(|_| BackendError::Overflow {
        len,
        capacity: u32::MAX as usize,
    })
}

/// Batch backend writing into wgpu vertex buffers.
pub struct WgpuBatchBackend {
    device: wgpu::Device,
    queue: wgpu::Queue,
    registry: ResourceRegistry,
}

impl WgpuBatchBackend {
    pub fn new(renderer: &Renderer) -> Self {
        Self {
            device: renderer.device().clone(),
            queue: renderer.queue().clone(),
            registry: ResourceRegistry::new(),
        }
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    /// Build the pipeline and camera resources for a new, empty layer.
    pub fn create_layer(&mut self, config: LayerConfig) -> Result<PointLayer, LayerError> {
        let camera_buffer = BufferBuilder::new(&self.device)
            .label("Point Camera Buffer")
            .with_pod_data(&[CameraUniforms::default()])
            .usage(BufferUsage::Uniform)
            .build(&mut self.registry)?;

        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some("Point Bind Group Layout"),
                    entries: &[wgpu::BindGroupLayoutEntry {
                        binding: 0,
                        visibility: wgpu::ShaderStages::VERTEX,
                        ty: wgpu::BindingType::Buffer {
                            ty: wgpu::BufferBindingType::Uniform,
                            has_dynamic_offset: false,
                            min_binding_size: wgpu::BufferSize::new(
                                std::mem::size_of::<CameraUniforms>() as u64,
                            ),
                        },
                        count: None,
                    }],
                });

        let camera = self
            .registry
            .get(camera_buffer)
            .ok_or(LayerError::MissingResource("camera buffer"))?;
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Point Bind Group"),
            layout: &bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera.as_entire_binding(),
            }],
        });
        let bind_group = self.registry.insert(bind_group);

        let shader = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("point_shader"),
                source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/point.wgsl").into()),
            });
        let shader = self.registry.insert(shader);

        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some("Point Pipeline Layout"),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let pipeline = RenderPipelineBuilder::new(&self.device)
            .with_label("Point Cloud Pipeline")
            .with_shader(shader)
            .with_layout(pipeline_layout)
            .with_vertex_buffer(PointVertex::layout())
            .with_fragment_target(Some(wgpu::ColorTargetState {
                format: config.color_format,
                blend: Some(wgpu::BlendState::REPLACE),
                write_mask: wgpu::ColorWrites::ALL,
            }))
            .build(&mut self.registry)?;

        Ok(PointLayer {
            entries: Vec::new(),
            pipeline,
            bind_group,
            camera_buffer,
            clear_color: config.clear_color,
        })
    }
}

impl BatchBackend for WgpuBatchBackend {
    type Handle = BatchBuffer;
    type Scene = PointLayer;

    fn create(&mut self, capacity: usize) -> Result<BatchBuffer, BackendError> {
        let buffer = BufferBuilder::new(&self.device)
            .label("Point Batch Buffer")
            .size(capacity as u64 * PointVertex::SIZE)
            .usage(BufferUsage::DynamicVertex)
            .build(&mut self.registry)
            .map_err(|e| BackendError::Create(e.to_string()))?;
        debug!("Created batch buffer {:?} for {} points", buffer, capacity);
        Ok(BatchBuffer {
            buffer,
            capacity,
            slot: None,
        })
    }

    fn attach(
        &mut self,
        scene: &mut PointLayer,
        handle: &mut BatchBuffer,
    ) -> Result<(), BackendError> {
        if handle.slot.is_some() {
            return Err(BackendError::Attach(format!(
                "buffer {:?} is already attached",
                handle.buffer
            )));
        }
        handle.slot = Some(scene.attach_entry(handle.buffer));
        Ok(())
    }

    fn upload(
        &mut self,
        scene: &mut PointLayer,
        handle: &BatchBuffer,
        vertices: &[PointVertex],
    ) -> Result<(), BackendError> {
        if vertices.len() > handle.capacity {
            return Err(BackendError::Overflow {
                len: vertices.len(),
                capacity: handle.capacity,
            });
        }
        let slot = handle
            .slot
            .ok_or(BackendError::MissingResource("layer slot"))?;
        let buffer = self
            .registry
            .get(handle.buffer)
            .ok_or(BackendError::MissingResource("batch buffer"))?;

        let count = draw_count(vertices.len())?;
        if !vertices.is_empty() {
            self.queue
                .write_buffer(buffer, 0, bytemuck::cast_slice(vertices));
        }
        scene.set_vertex_count(slot, count)
    }

    fn release(&mut self, scene: &mut PointLayer, handle: BatchBuffer, attached: bool) {
        if attached {
            if let Some(slot) = handle.slot {
                scene.detach(slot);
            }
        }
        if let Some(buffer) = self.registry.remove(handle.buffer) {
            buffer.destroy();
        }
    }
}

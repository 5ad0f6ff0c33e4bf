use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use raw_window_handle::{HasDisplayHandle, HasWindowHandle};
use tracing::debug;
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::geometry::{pixel_projection, PlaneMesh, PlaneSpec};
use crate::stage::{DrawCommand, PlaneId, ShaderId};
use crate::types::{AdapterProfile, Antialiasing, ColorSpaceMode, Rgba};

use super::context::GpuContext;
use super::pipeline::{PipelineLayouts, ShaderPipeline, TargetState};
use super::texture::{PlaneTexture, RenderTargets};
use super::uniforms::PlaneUniforms;

/// GPU buffers and bind groups owned by one plane.
struct PlaneResources {
    spec: PlaneSpec,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    texture_bind_group: wgpu::BindGroup,
    _texture: Option<PlaneTexture>,
}

/// Owns the device, the shader and plane arenas, and the per-frame render pass.
pub(crate) struct GpuState {
    context: GpuContext,
    layouts: PipelineLayouts,
    targets: RenderTargets,
    placeholder: PlaneTexture,
    shaders: Vec<ShaderPipeline>,
    planes: Vec<PlaneResources>,
    background: Rgba,
    depth_test: bool,
    frames_since_report: u32,
    last_report: Instant,
}

impl GpuState {
    pub(crate) fn new<T>(
        target: &T,
        initial_size: PhysicalSize<u32>,
        antialiasing: Antialiasing,
        color_space: ColorSpaceMode,
        vsync: bool,
    ) -> Result<Self>
    where
        T: HasDisplayHandle + HasWindowHandle,
    {
        let context = GpuContext::new(target, initial_size, antialiasing, color_space, vsync)?;
        let layouts = PipelineLayouts::new(&context.device);
        let targets = RenderTargets::new(
            &context.device,
            context.surface_format,
            context.size.width,
            context.size.height,
            context.sample_count,
        );
        let placeholder =
            PlaneTexture::placeholder(&context.device, &context.queue, context.color_space);

        Ok(Self {
            context,
            layouts,
            targets,
            placeholder,
            shaders: Vec::new(),
            planes: Vec::new(),
            background: Rgba::BLACK,
            depth_test: false,
            frames_since_report: 0,
            last_report: Instant::now(),
        })
    }

    pub(crate) fn size(&self) -> PhysicalSize<u32> {
        self.context.size
    }

    pub(crate) fn adapter_profile(&self) -> &AdapterProfile {
        &self.context.adapter_profile
    }

    pub(crate) fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub(crate) fn plane_count(&self) -> usize {
        self.planes.len()
    }

    pub(crate) fn set_background(&mut self, color: Rgba) {
        self.background = color;
    }

    fn target_state(&self) -> TargetState {
        TargetState {
            surface_format: self.context.surface_format,
            sample_count: self.context.sample_count,
            depth_test: self.depth_test,
        }
    }

    /// Switches depth testing, rebuilding any pipelines that were already loaded.
    pub(crate) fn set_depth_test(&mut self, enabled: bool) -> Result<()> {
        if self.depth_test == enabled {
            return Ok(());
        }
        self.depth_test = enabled;
        let target = self.target_state();
        for shader in &mut self.shaders {
            *shader = ShaderPipeline::new(
                &self.context.device,
                &self.layouts,
                target,
                &shader.shader_source,
            )?;
        }
        debug!(enabled, rebuilt = self.shaders.len(), "depth test updated");
        Ok(())
    }

    pub(crate) fn load_shader(&mut self, path: &Path) -> Result<ShaderId> {
        let pipeline =
            ShaderPipeline::new(&self.context.device, &self.layouts, self.target_state(), path)?;
        self.shaders.push(pipeline);
        Ok(ShaderId(self.shaders.len() - 1))
    }

    pub(crate) fn create_plane(&mut self, spec: PlaneSpec) -> Result<PlaneId> {
        let device = &self.context.device;
        let mesh = PlaneMesh::build(&spec);

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("plane vertices"),
            contents: bytemuck::cast_slice(&mesh.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("plane indices"),
            contents: bytemuck::cast_slice(&mesh.indices),
            usage: wgpu::BufferUsages::INDEX,
        });
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("plane uniforms"),
            size: PlaneUniforms::SIZE,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("plane uniform bind group"),
            layout: &self.layouts.uniform_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: uniform_buffer.as_entire_binding(),
            }],
        });

        let texture = spec
            .texture
            .as_deref()
            .map(|path| {
                PlaneTexture::load(device, &self.context.queue, path, self.context.color_space)
            })
            .transpose()
            .context("failed to create plane texture")?;
        let bound = texture.as_ref().unwrap_or(&self.placeholder);
        let texture_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("plane texture bind group"),
            layout: &self.layouts.texture_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&bound.view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&bound.sampler),
                },
            ],
        });

        debug!(
            width = spec.width,
            height = spec.height,
            position = ?spec.position,
            vertices = mesh.vertices.len(),
            texture = ?texture.as_ref().map(|t| t.resolution),
            "created plane"
        );

        self.planes.push(PlaneResources {
            index_count: mesh.indices.len() as u32,
            spec,
            vertex_buffer,
            index_buffer,
            uniform_buffer,
            uniform_bind_group,
            texture_bind_group,
            _texture: texture,
        });
        Ok(PlaneId(self.planes.len() - 1))
    }

    pub(crate) fn resize(&mut self, new_size: PhysicalSize<u32>) {
        if new_size.width == 0 || new_size.height == 0 {
            return;
        }
        self.context.resize(new_size);
        self.targets = RenderTargets::new(
            &self.context.device,
            self.context.surface_format,
            new_size.width,
            new_size.height,
            self.context.sample_count,
        );
    }

    pub(crate) fn reconfigure(&mut self) {
        self.context.reconfigure();
    }

    /// Clears to the background and encodes every queued draw in one pass.
    pub(crate) fn render(&mut self, commands: &[DrawCommand]) -> Result<(), wgpu::SurfaceError> {
        let frame = self.context.surface.get_current_texture()?;
        let view = frame
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());

        let size = self.context.size;
        let projection = pixel_projection(size.width, size.height);
        // A plane drawn twice in one frame keeps the uniforms of its last draw.
        for command in commands {
            let plane = &self.planes[command.plane.0];
            let uniforms = PlaneUniforms::new(
                projection * plane.spec.model_matrix(),
                command.uniforms,
                size.width,
                size.height,
            );
            self.context
                .queue
                .write_buffer(&plane.uniform_buffer, 0, bytemuck::bytes_of(&uniforms));
        }

        let mut encoder =
            self.context
                .device
                .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                    label: Some("frame encoder"),
                });
        {
            let (attachment_view, resolve_target) = self.targets.color_attachment(&view);
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("plane pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: attachment_view,
                    depth_slice: None,
                    resolve_target,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(self.background.to_wgpu()),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: Some(wgpu::RenderPassDepthStencilAttachment {
                    view: &self.targets.depth_view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Discard,
                    }),
                    stencil_ops: None,
                }),
                occlusion_query_set: None,
                timestamp_writes: None,
            });

            for command in commands {
                let plane = &self.planes[command.plane.0];
                let shader = &self.shaders[command.shader.0];
                render_pass.set_pipeline(&shader.pipeline);
                render_pass.set_bind_group(0, &plane.uniform_bind_group, &[]);
                render_pass.set_bind_group(1, &plane.texture_bind_group, &[]);
                render_pass.set_vertex_buffer(0, plane.vertex_buffer.slice(..));
                render_pass.set_index_buffer(plane.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..plane.index_count, 0, 0..1);
            }
        }

        self.context.queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.report_stats(commands.len());
        Ok(())
    }

    fn report_stats(&mut self, draws: usize) {
        self.frames_since_report += 1;
        let elapsed = self.last_report.elapsed();
        if elapsed >= Duration::from_secs(5) {
            let fps = self.frames_since_report as f32 / elapsed.as_secs_f32();
            debug!(fps = fps.round(), draws, "render stats");
            self.frames_since_report = 0;
            self.last_report = Instant::now();
        }
    }
}

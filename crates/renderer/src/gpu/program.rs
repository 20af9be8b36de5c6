use std::borrow::Cow;

use composer::compose::{sampler_binding, texture_binding};
use composer::ComposedShader;

use crate::compile::{self, ParsedStage};
use crate::error::RenderError;

use super::context::GpuContext;

/// A linked fragment program: the pipeline plus the texture units it reads.
pub(crate) struct Program {
    pub pipeline: wgpu::RenderPipeline,
    pub texture_layout: wgpu::BindGroupLayout,
    /// Indexed by texture unit; `false` marks a sampler the shader never reads.
    pub active_units: Vec<bool>,
}

impl Program {
    pub fn is_unit_active(&self, unit: u32) -> bool {
        self.active_units
            .get(unit as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn active_unit_count(&self) -> usize {
        self.active_units.iter().filter(|active| **active).count()
    }
}

/// Owns the shared vertex stage and the currently linked program.
///
/// A program is replaced only after its successor has compiled and linked;
/// on failure the previous one stays current.
pub(crate) struct ProgramManager {
    vertex_module: wgpu::ShaderModule,
    target_format: wgpu::TextureFormat,
    current: Option<Program>,
}

impl ProgramManager {
    pub fn new(context: &GpuContext, target_format: wgpu::TextureFormat) -> Result<Self, RenderError> {
        let vertex = compile::parse_vertex_stage()?;
        let device = &context.device;

        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let vertex_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fragpad quad vertex"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(vertex.module)),
        });
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            return Err(RenderError::VertexCompile {
                log: error.to_string(),
            });
        }

        Ok(Self {
            vertex_module,
            target_format,
            current: None,
        })
    }

    pub fn vertex_module(&self) -> &wgpu::ShaderModule {
        &self.vertex_module
    }

    /// Compiles and links `shader`; `sampler_names` lists the textures in
    /// unit order.
    pub fn recompile(
        &mut self,
        context: &GpuContext,
        shader: &ComposedShader,
        sampler_names: &[&str],
    ) -> Result<&Program, RenderError> {
        let stage = compile::parse_fragment_stage(shader).inspect_err(|err| {
            tracing::warn!(%err, "fragment shader rejected; keeping previous program");
        })?;
        let active_units = compile::active_samplers(&stage, sampler_names.iter().copied());
        for (name, active) in sampler_names.iter().zip(&active_units) {
            if !active {
                tracing::debug!(sampler = %name, "sampler is not used by the shader; skipping");
            }
        }

        let device = &context.device;
        device.push_error_scope(wgpu::ErrorFilter::Validation);
        let program = self.link(device, stage, active_units);
        if let Some(error) = pollster::block_on(device.pop_error_scope()) {
            tracing::warn!(%error, "shader program failed to link; keeping previous program");
            return Err(RenderError::Link {
                log: error.to_string(),
            });
        }

        tracing::debug!(
            active_samplers = program.active_unit_count(),
            "linked shader program"
        );
        Ok(self.current.insert(program))
    }

    fn link(&self, device: &wgpu::Device, stage: ParsedStage, active_units: Vec<bool>) -> Program {
        let fragment_module = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("fragpad fragment"),
            source: wgpu::ShaderSource::Naga(Cow::Owned(stage.module)),
        });

        let texture_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("texture layout"),
            entries: &build_layout_entries(&active_units),
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("fragpad pipeline layout"),
            bind_group_layouts: &[&texture_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("fragpad pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &self.vertex_module,
                entry_point: Some("main"),
                buffers: &[],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
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
                module: &fragment_module,
                entry_point: Some("main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: self.target_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        Program {
            pipeline,
            texture_layout,
            active_units,
        }
    }
}

fn build_layout_entries(active_units: &[bool]) -> Vec<wgpu::BindGroupLayoutEntry> {
    let mut entries = Vec::new();
    for (unit, _) in active_units
        .iter()
        .enumerate()
        .filter(|(_, active)| **active)
    {
        let unit = unit as u32;
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: texture_binding(unit),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
                view_dimension: wgpu::TextureViewDimension::D2,
                multisampled: false,
            },
            count: None,
        });
        entries.push(wgpu::BindGroupLayoutEntry {
            binding: sampler_binding(unit),
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
            count: None,
        });
    }
    entries
}

use std::path::Path;

use anyhow::{Context, Result};
use composer::{compose, Resources};
use image::{ImageFormat, RgbaImage};
use sizing::{CanvasSize, Dimensions};

use crate::error::RenderError;
use crate::gpu::{bind_textures, Canvas, GpuContext, ProgramManager, CANVAS_FORMAT};

/// Summary of a successful render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameReport {
    pub size: Dimensions,
    pub textures: usize,
    pub active_samplers: usize,
}

/// Turns resources plus user source into pixels on the offscreen canvas.
///
/// Each call to [`Renderer::render`] composes the shader, compiles and links
/// it, uploads the textures it reads and draws one frame. A compile or link
/// failure leaves both the previous program and the previous frame intact.
pub struct Renderer {
    context: GpuContext,
    programs: ProgramManager,
    canvas: Canvas,
}

impl Renderer {
    pub fn new(context: GpuContext, initial_size: Dimensions) -> Result<Self, RenderError> {
        check_canvas_size(&context, initial_size)?;
        let programs = ProgramManager::new(&context, CANVAS_FORMAT)?;
        let canvas = Canvas::new(&context.device, initial_size);
        Ok(Self {
            context,
            programs,
            canvas,
        })
    }

    /// Renderer on a headless GPU context.
    pub fn headless(initial_size: Dimensions) -> Result<Self, RenderError> {
        Self::new(GpuContext::headless()?, initial_size)
    }

    pub fn context(&self) -> &GpuContext {
        &self.context
    }

    /// Size of the frame currently held by the canvas.
    pub fn canvas_size(&self) -> Dimensions {
        self.canvas.size()
    }

    pub fn render(
        &mut self,
        resources: &Resources,
        user_source: &str,
        size: &CanvasSize,
    ) -> Result<FrameReport, RenderError> {
        check_canvas_size(&self.context, size.output)?;

        let composed = compose(resources, user_source);
        let names: Vec<&str> = resources.textures.names().collect();
        let units = self.context.max_texture_units() as usize;
        if names.len() > units {
            tracing::warn!(
                textures = names.len(),
                units,
                "more textures than the GPU has sampler units"
            );
        }

        let program = self
            .programs
            .recompile(&self.context, &composed, &names)?;
        let textures = bind_textures(&self.context, program, &resources.textures);

        self.canvas.ensure_size(&self.context.device, size.output);
        self.canvas.draw(&self.context, program, &textures);

        let report = FrameReport {
            size: size.output,
            textures: names.len(),
            active_samplers: program.active_unit_count(),
        };
        tracing::debug!(?report, "rendered frame");
        Ok(report)
    }

    /// Reads the last good frame back as RGBA, top row first.
    pub fn read_pixels(&self) -> Result<RgbaImage, RenderError> {
        self.canvas.read_pixels(&self.context)
    }

    /// Writes the last good frame to `path` as a PNG.
    pub fn export_png(&self, path: &Path) -> Result<()> {
        let image = self.read_pixels()?;
        image
            .save_with_format(path, ImageFormat::Png)
            .with_context(|| format!("failed to write PNG to {}", path.display()))?;
        tracing::info!(path = %path.display(), size = %self.canvas.size(), "exported canvas");
        Ok(())
    }

    pub(crate) fn canvas_view(&self) -> &wgpu::TextureView {
        self.canvas.view()
    }

    pub(crate) fn vertex_module(&self) -> &wgpu::ShaderModule {
        self.programs.vertex_module()
    }
}

fn check_canvas_size(context: &GpuContext, size: Dimensions) -> Result<(), RenderError> {
    let limit = context.max_texture_dimension();
    if size.width > limit || size.height > limit {
        return Err(RenderError::CanvasTooLarge {
            width: size.width,
            height: size.height,
            limit,
        });
    }
    Ok(())
}

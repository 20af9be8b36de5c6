//! GLSL front end: parses and validates shader stages with naga before any
//! GPU object is created, so compile failures carry a readable log.

use composer::compose::{sampler_global, texture_global};
use composer::ComposedShader;
use wgpu::naga::front::glsl;
use wgpu::naga::valid::{Capabilities, ModuleInfo, ValidationFlags, Validator};
use wgpu::naga::{Module, ShaderStage};

use crate::error::RenderError;

/// Emits two triangles covering clip space. `texcoord` runs from (0, 0) at
/// the top-left corner to (1, 1) at the bottom-right, matching image row order.
pub(crate) const VERTEX_SHADER_GLSL: &str = r"#version 450
layout(location = 0) out vec2 texcoord;

const vec2 positions[6] = vec2[6](
    vec2(-1.0, -1.0),
    vec2(-1.0, 1.0),
    vec2(1.0, 1.0),
    vec2(-1.0, -1.0),
    vec2(1.0, 1.0),
    vec2(1.0, -1.0)
);

const vec2 texcoords[6] = vec2[6](
    vec2(0.0, 1.0),
    vec2(0.0, 0.0),
    vec2(1.0, 0.0),
    vec2(0.0, 1.0),
    vec2(1.0, 0.0),
    vec2(1.0, 1.0)
);

void main() {
    uint index = uint(gl_VertexIndex);
    texcoord = texcoords[index];
    gl_Position = vec4(positions[index], 0.0, 1.0);
}
";

/// Number of vertices drawn by [`VERTEX_SHADER_GLSL`].
pub(crate) const QUAD_VERTEX_COUNT: u32 = 6;

/// A stage that parsed and validated cleanly.
pub(crate) struct ParsedStage {
    pub module: Module,
    pub info: ModuleInfo,
}

/// Parses and validates `source` as Vulkan GLSL for `stage`.
///
/// The error string is a rendered diagnostic with source excerpts.
pub(crate) fn parse_stage(stage: ShaderStage, source: &str) -> Result<ParsedStage, String> {
    let mut frontend = glsl::Frontend::default();
    let module = frontend
        .parse(&glsl::Options::from(stage), source)
        .map_err(|errors| errors.emit_to_string(source))?;

    let info = Validator::new(ValidationFlags::all(), Capabilities::default())
        .validate(&module)
        .map_err(|error| error.emit_to_string(source))?;

    Ok(ParsedStage { module, info })
}

pub(crate) fn parse_vertex_stage() -> Result<ParsedStage, RenderError> {
    parse_stage(ShaderStage::Vertex, VERTEX_SHADER_GLSL)
        .map_err(|log| RenderError::VertexCompile { log })
}

/// Parses the composed fragment shader.
///
/// The log gets a trailing note that maps composed line numbers back to the
/// user's source.
pub(crate) fn parse_fragment_stage(shader: &ComposedShader) -> Result<ParsedStage, RenderError> {
    parse_stage(ShaderStage::Fragment, &shader.source).map_err(|log| RenderError::Compile {
        log: format!(
            "{log}\nnote: user code starts at line {} of the composed shader",
            shader.user_line_offset
        ),
    })
}

/// Which sampler names the fragment entry point actually reads.
///
/// A sampler the shader declares but never samples is inactive, like an
/// optimized-out uniform: it gets no binding and is skipped silently.
pub(crate) fn active_samplers<'a, I>(stage: &ParsedStage, names: I) -> Vec<bool>
where
    I: IntoIterator<Item = &'a str>,
{
    let Some(entry_index) = stage
        .module
        .entry_points
        .iter()
        .position(|entry| entry.stage == ShaderStage::Fragment)
    else {
        return names.into_iter().map(|_| false).collect();
    };
    let usage = stage.info.get_entry_point(entry_index);

    let is_used = |global_name: &str| {
        stage
            .module
            .global_variables
            .iter()
            .find(|(_, global)| global.name.as_deref() == Some(global_name))
            .is_some_and(|(handle, _)| !usage[handle].is_empty())
    };

    names
        .into_iter()
        .map(|name| is_used(&texture_global(name)) || is_used(&sampler_global(name)))
        .collect()
}

//! Builds the complete fragment shader for one recompilation.
//!
//! Output layout:
//!
//! 1. [`HEADER`]: version, precision, the `texcoord` varying and `outcolor`.
//! 2. One sampler per texture, in registry order. wgpu consumes Vulkan GLSL,
//!    which has no bare `uniform sampler2D`, so each sampler is a
//!    `texture2D`/`sampler` pair at bindings `2 * unit` and `2 * unit + 1`
//!    joined under the resource name by a `#define`.
//! 3. One `vec4` per color that resolves.
//! 4. The user source, verbatim.
//! 5. [`FOOTER`], whose `main` forwards to `mainImage`.

use std::fmt::Write as _;

use crate::color;
use crate::registry::Resources;

/// Identifiers starting with this prefix belong to generated code.
pub const RESERVED_PREFIX: &str = "fragpad_";

/// Name of the function user code must define.
pub const USER_ENTRY_POINT: &str = "mainImage";

/// Starter source used when no shader file is supplied.
pub const TEMPLATE_SOURCE: &str = r"void mainImage(out vec4 fragColor, in vec2 fragCoord) {
    fragColor = vec4(fragCoord, 0.0, 1.0);
}
";

const HEADER: &str = r"#version 450
precision highp float;
layout(location = 0) in vec2 texcoord;
layout(location = 0) out vec4 outcolor;
";

const FOOTER: &str = r"
void main() {
    mainImage(outcolor, texcoord);
}
";

/// Fully assembled fragment source plus where the user's code begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedShader {
    pub source: String,
    /// 1-based line of the composed source holding the user's first line.
    pub user_line_offset: usize,
}

impl ComposedShader {
    /// Maps a 1-based line of the composed source back into the user source.
    pub fn user_line(&self, composed_line: usize) -> Option<usize> {
        composed_line
            .checked_sub(self.user_line_offset)
            .map(|line| line + 1)
    }
}

/// Binding slot of the `texture2D` half of a sampler on `unit`.
pub const fn texture_binding(unit: u32) -> u32 {
    unit * 2
}

/// Binding slot of the `sampler` half of a sampler on `unit`.
pub const fn sampler_binding(unit: u32) -> u32 {
    unit * 2 + 1
}

/// Generated name of the `texture2D` global backing sampler `name`.
pub fn texture_global(name: &str) -> String {
    format!("{RESERVED_PREFIX}texture_{name}")
}

/// Generated name of the `sampler` global backing sampler `name`.
pub fn sampler_global(name: &str) -> String {
    format!("{RESERVED_PREFIX}sampler_{name}")
}

/// Composes the fragment shader; identical inputs give byte-identical output.
pub fn compose(resources: &Resources, user_source: &str) -> ComposedShader {
    let mut source = String::from(HEADER);

    for (unit, texture) in resources.textures.list().into_iter().enumerate() {
        let unit = unit as u32;
        let name = &texture.name;
        let texture_name = texture_global(name);
        let sampler_name = sampler_global(name);
        let _ = writeln!(
            source,
            "layout(set = 0, binding = {}) uniform texture2D {texture_name};",
            texture_binding(unit)
        );
        let _ = writeln!(
            source,
            "layout(set = 0, binding = {}) uniform sampler {sampler_name};",
            sampler_binding(unit)
        );
        let _ = writeln!(
            source,
            "#define {name} sampler2D({texture_name}, {sampler_name})"
        );
    }

    for entry in resources.colors.list() {
        match color::resolve(&entry.color) {
            Some(rgb) => {
                let _ = writeln!(
                    source,
                    "vec4 {} = vec4({}, {}, {}, 1.0);",
                    entry.name,
                    float_literal(rgb.r),
                    float_literal(rgb.g),
                    float_literal(rgb.b)
                );
            }
            None => {
                tracing::debug!(
                    name = %entry.name,
                    color = %entry.color,
                    "skipping color that is not a valid hex value"
                );
            }
        }
    }

    let user_line_offset = source.lines().count() + 1;
    source.push_str(user_source);
    if !user_source.ends_with('\n') {
        source.push('\n');
    }
    source.push_str(FOOTER);

    ComposedShader {
        source,
        user_line_offset,
    }
}

/// `Debug` keeps a fractional part (`1.0`, `0.2`) so GLSL sees float literals.
fn float_literal(value: f64) -> String {
    format!("{value:?}")
}

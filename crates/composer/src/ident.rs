//! GLSL identifier checks applied to resource names before they are
//! registered. The registry itself never validates; the console and the
//! startup config call [`validate_identifier`] and [`ensure_unique`] first.

use crate::compose::RESERVED_PREFIX;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdentError {
    #[error("resource name must not be empty")]
    Empty,
    #[error("resource name '{0}' must start with a letter or underscore")]
    LeadingDigit(String),
    #[error("resource name '{name}' contains invalid character '{ch}'")]
    InvalidCharacter { name: String, ch: char },
    #[error("resource name '{0}' is a reserved GLSL word")]
    Reserved(String),
    #[error("resource name '{0}' uses a prefix reserved for generated code")]
    ReservedPrefix(String),
    #[error("resource name '{0}' is already in use")]
    Duplicate(String),
}

/// Keywords, reserved words and built-in type names of GLSL 4.50 plus the
/// names the generated wrapper itself defines.
const RESERVED_WORDS: &[&str] = &[
    "attribute", "const", "uniform", "varying", "buffer", "shared", "coherent",
    "volatile", "restrict", "readonly", "writeonly", "atomic_uint", "layout",
    "centroid", "flat", "smooth", "noperspective", "patch", "sample", "break",
    "continue", "do", "for", "while", "switch", "case", "default", "if", "else",
    "subroutine", "in", "out", "inout", "float", "double", "int", "void", "bool",
    "true", "false", "invariant", "precise", "discard", "return", "mat2", "mat3",
    "mat4", "dmat2", "dmat3", "dmat4", "mat2x2", "mat2x3", "mat2x4", "mat3x2",
    "mat3x3", "mat3x4", "mat4x2", "mat4x3", "mat4x4", "vec2", "vec3", "vec4",
    "ivec2", "ivec3", "ivec4", "bvec2", "bvec3", "bvec4", "dvec2", "dvec3", "dvec4",
    "uint", "uvec2", "uvec3", "uvec4", "lowp", "mediump", "highp", "precision",
    "sampler1D", "sampler2D", "sampler3D", "samplerCube", "sampler2DShadow",
    "sampler2DArray", "isampler2D", "usampler2D", "texture1D", "texture2D",
    "texture3D", "textureCube", "sampler", "samplerShadow", "struct", "common",
    "partition", "active", "asm", "class", "union", "enum", "typedef", "template",
    "this", "resource", "goto", "inline", "noinline", "public", "static", "extern",
    "external", "interface", "long", "short", "half", "fixed", "unsigned",
    "superp", "input", "output", "hvec2", "hvec3", "hvec4", "fvec2", "fvec3",
    "fvec4", "sampler3DRect", "filter", "image1D", "image2D", "image3D", "sizeof",
    "cast", "namespace", "using", "main", "mainImage", "texcoord", "outcolor",
    "texture", "mix", "clamp", "min", "max", "abs", "sin", "cos", "dot",
];

/// Checks that `name` can be emitted verbatim as a GLSL identifier.
pub fn validate_identifier(name: &str) -> Result<(), IdentError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(IdentError::Empty);
    };
    if first.is_ascii_digit() {
        return Err(IdentError::LeadingDigit(name.to_string()));
    }
    if let Some(ch) = name
        .chars()
        .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '_'))
    {
        return Err(IdentError::InvalidCharacter {
            name: name.to_string(),
            ch,
        });
    }
    // Double underscores are reserved by GLSL, the prefix by the composer.
    if name.starts_with("gl_") || name.contains("__") {
        return Err(IdentError::Reserved(name.to_string()));
    }
    if name.starts_with(RESERVED_PREFIX) {
        return Err(IdentError::ReservedPrefix(name.to_string()));
    }
    if RESERVED_WORDS.contains(&name) {
        return Err(IdentError::Reserved(name.to_string()));
    }
    Ok(())
}

/// Rejects `name` when any of `taken` already uses it.
pub fn ensure_unique<'a, I>(name: &str, taken: I) -> Result<(), IdentError>
where
    I: IntoIterator<Item = &'a str>,
{
    if taken.into_iter().any(|existing| existing == name) {
        return Err(IdentError::Duplicate(name.to_string()));
    }
    Ok(())
}

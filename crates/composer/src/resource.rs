use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use image::RgbaImage;

/// Resources that are addressed in GLSL by a display name.
pub trait Named {
    fn name(&self) -> &str;
}

/// How a sampler treats coordinates outside `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

/// Interpolation used for both minification and magnification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    #[default]
    Nearest,
    Linear,
}

impl FromStr for WrapMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "clamp" | "clamp-to-edge" | "clamp_to_edge" => Ok(Self::ClampToEdge),
            "repeat" => Ok(Self::Repeat),
            other => Err(format!(
                "unknown wrap mode '{other}'; expected clamp or repeat"
            )),
        }
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "nearest" => Ok(Self::Nearest),
            "linear" => Ok(Self::Linear),
            other => Err(format!(
                "unknown filter mode '{other}'; expected nearest or linear"
            )),
        }
    }
}

impl fmt::Display for WrapMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ClampToEdge => f.write_str("clamp"),
            Self::Repeat => f.write_str("repeat"),
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nearest => f.write_str("nearest"),
            Self::Linear => f.write_str("linear"),
        }
    }
}

/// A decoded image bound to a sampler named `name`.
#[derive(Clone)]
pub struct TextureResource {
    pub name: String,
    pub image: Arc<RgbaImage>,
    pub wrap: WrapMode,
    pub filter: FilterMode,
}

impl TextureResource {
    /// Creates a texture with the default clamp/nearest sampling.
    pub fn new(name: impl Into<String>, image: Arc<RgbaImage>) -> Self {
        Self {
            name: name.into(),
            image,
            wrap: WrapMode::default(),
            filter: FilterMode::default(),
        }
    }

    pub fn with_sampling(mut self, wrap: WrapMode, filter: FilterMode) -> Self {
        self.wrap = wrap;
        self.filter = filter;
        self
    }
}

impl fmt::Debug for TextureResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureResource")
            .field("name", &self.name)
            .field("size", &self.image.dimensions())
            .field("wrap", &self.wrap)
            .field("filter", &self.filter)
            .finish()
    }
}

impl Named for TextureResource {
    fn name(&self) -> &str {
        &self.name
    }
}

/// A hex color exposed to GLSL as a `vec4` named `name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorResource {
    pub name: String,
    pub color: String,
}

impl ColorResource {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }
}

impl Named for ColorResource {
    fn name(&self) -> &str {
        &self.name
    }
}

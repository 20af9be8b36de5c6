//! Startup configuration read from `fragpad.toml`.
//!
//! The file is input only: it seeds the shader source path, canvas sizes and
//! resources when fragpad starts. Nothing is ever written back.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use composer::{ensure_unique, validate_identifier, FilterMode, WrapMode};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use sizing::{evaluate_dimension, CanvasSize, Dimensions};

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct PadConfig {
    pub version: u32,
    #[serde(default)]
    pub source: Option<PathBuf>,
    #[serde(default)]
    pub canvas: CanvasConfig,
    #[serde(default)]
    pub textures: Vec<TextureEntry>,
    #[serde(default)]
    pub colors: Vec<ColorEntry>,
}

/// Size fields hold arithmetic expressions (`"1920 / 2"`) or plain numbers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CanvasConfig {
    #[serde(default, deserialize_with = "deserialize_expr_opt")]
    pub output_width: Option<String>,
    #[serde(default, deserialize_with = "deserialize_expr_opt")]
    pub output_height: Option<String>,
    #[serde(default, deserialize_with = "deserialize_expr_opt")]
    pub display_width: Option<String>,
    #[serde(default, deserialize_with = "deserialize_expr_opt")]
    pub display_height: Option<String>,
    #[serde(default)]
    pub lock_output: bool,
    #[serde(default)]
    pub lock_display: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextureEntry {
    pub name: String,
    pub path: PathBuf,
    #[serde(default)]
    pub wrap: WrapSetting,
    #[serde(default)]
    pub filter: FilterSetting,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColorEntry {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WrapSetting {
    #[default]
    Clamp,
    Repeat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSetting {
    #[default]
    Nearest,
    Linear,
}

impl From<WrapSetting> for WrapMode {
    fn from(value: WrapSetting) -> Self {
        match value {
            WrapSetting::Clamp => WrapMode::ClampToEdge,
            WrapSetting::Repeat => WrapMode::Repeat,
        }
    }
}

impl From<FilterSetting> for FilterMode {
    fn from(value: FilterSetting) -> Self {
        match value {
            FilterSetting::Nearest => FilterMode::Nearest,
            FilterSetting::Linear => FilterMode::Linear,
        }
    }
}

impl From<WrapMode> for WrapSetting {
    fn from(value: WrapMode) -> Self {
        match value {
            WrapMode::ClampToEdge => WrapSetting::Clamp,
            WrapMode::Repeat => WrapSetting::Repeat,
        }
    }
}

impl From<FilterMode> for FilterSetting {
    fn from(value: FilterMode) -> Self {
        match value {
            FilterMode::Nearest => FilterSetting::Nearest,
            FilterMode::Linear => FilterSetting::Linear,
        }
    }
}

fn deserialize_expr_opt<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct Visitor;
    impl<'de> de::Visitor<'de> for Visitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a size as a number or an arithmetic expression string")
        }

        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E>(self, v: f64) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            Ok(Some(v.to_string()))
        }
    }

    deserializer.deserialize_any(Visitor)
}

impl Default for PadConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            source: None,
            canvas: CanvasConfig::default(),
            textures: Vec::new(),
            colors: Vec::new(),
        }
    }
}

impl PadConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PadConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads `path` and resolves relative paths against its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&contents)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    pub fn resolve_paths(&mut self, base: &Path) {
        if let Some(source) = self.source.as_mut() {
            if source.is_relative() {
                *source = base.join(&*source);
            }
        }
        for texture in &mut self.textures {
            if texture.path.is_relative() {
                texture.path = base.join(&texture.path);
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected {CONFIG_VERSION}",
                self.version
            )));
        }

        let mut names: Vec<&str> = Vec::new();
        for name in self
            .textures
            .iter()
            .map(|entry| entry.name.as_str())
            .chain(self.colors.iter().map(|entry| entry.name.as_str()))
        {
            validate_identifier(name)
                .and_then(|()| ensure_unique(name, names.iter().copied()))
                .map_err(|err| ConfigError::Invalid(err.to_string()))?;
            names.push(name);
        }

        for texture in &self.textures {
            if texture.path.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "texture '{}' must declare a path",
                    texture.name
                )));
            }
        }

        self.canvas.resolve()?;
        Ok(())
    }

    pub fn canvas_size(&self) -> Result<CanvasSize, ConfigError> {
        self.canvas.resolve()
    }
}

impl CanvasConfig {
    /// Evaluates the size expressions; display falls back to the output size
    /// and output to 800x600.
    pub fn resolve(&self) -> Result<CanvasSize, ConfigError> {
        let field = |name: &str, value: &Option<String>, fallback: u32| match value {
            Some(input) => evaluate_dimension(input)
                .map_err(|err| ConfigError::Invalid(format!("canvas.{name}: {err}"))),
            None => Ok(fallback),
        };

        let output_width = field("output_width", &self.output_width, 800)?;
        let output_height = field("output_height", &self.output_height, 600)?;
        let display_width = field("display_width", &self.display_width, output_width)?;
        let display_height = field("display_height", &self.display_height, output_height)?;

        let mut canvas = CanvasSize::new(
            Dimensions::new(output_width, output_height),
            Dimensions::new(display_width, display_height),
        );
        canvas.lock_output = self.lock_output;
        canvas.lock_display = self.lock_display;
        Ok(canvas)
    }
}

//! Editable playground state and the commands that change it.
//!
//! Every mutation validates resource names first; a rejected command leaves
//! the session untouched.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use composer::{
    ensure_unique, resolve_color, validate_identifier, ColorResource, FilterMode, IdentError,
    ResourceId, Resources, TextureResource, WrapMode, TEMPLATE_SOURCE,
};
use sizing::{Axis, CanvasSize, Pair, SizingError};

use crate::loader::{DecodedTexture, ImageLoader, TextureRequest};

/// Value given to a color added without one.
pub const DEFAULT_COLOR: &str = "#000000";

/// Where the user's shader text comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    Template,
    File(PathBuf),
}

impl ShaderSource {
    pub fn load(&self) -> Result<String> {
        match self {
            Self::Template => Ok(TEMPLATE_SOURCE.to_string()),
            Self::File(path) => fs::read_to_string(path)
                .with_context(|| format!("failed to read shader source at {}", path.display())),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Template => None,
            Self::File(path) => Some(path),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    AddTexture(TextureRequest),
    /// `None` picks `colN` for the name and black for a new color's value.
    SetColor {
        name: Option<String>,
        color: Option<String>,
    },
    Rename { from: String, to: String },
    SetWrap { name: String, wrap: WrapMode },
    SetFilter { name: String, filter: FilterMode },
    Remove { name: String },
    Resize { pair: Pair, axis: Axis, input: String },
    Lock { pair: Pair, locked: bool },
    Reload,
    Export { path: PathBuf },
    List,
    Quit,
}

/// What the caller should do after a command was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Rerender,
    /// A texture is decoding; a render follows when it arrives.
    Pending,
    Export(PathBuf),
    Listing(String),
    Quit,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Name(#[from] IdentError),
    #[error(transparent)]
    Size(#[from] SizingError),
    #[error("no resource named '{0}'")]
    UnknownResource(String),
    #[error("no texture named '{0}'")]
    UnknownTexture(String),
    #[error(transparent)]
    Load(#[from] anyhow::Error),
}

/// Resources, canvas sizing and shader source of one playground.
#[derive(Debug, Clone)]
pub struct Session {
    pub resources: Resources,
    pub canvas: CanvasSize,
    pub source: ShaderSource,
}

impl Session {
    pub fn new(source: ShaderSource, canvas: CanvasSize) -> Self {
        Self {
            resources: Resources::new(),
            canvas,
            source,
        }
    }

    pub fn apply(&mut self, command: Command, loader: &mut ImageLoader) -> Result<Outcome, SessionError> {
        match command {
            Command::AddTexture(request) => {
                if let Some(name) = &request.name {
                    self.check_new_name(name, None)?;
                }
                loader.request(request)?;
                Ok(Outcome::Pending)
            }
            Command::SetColor { name, color } => {
                let name = name.unwrap_or_else(|| self.resources.next_color_name());
                let color = match (color, self.resources.colors.find_by_name(&name)) {
                    (Some(color), _) => color,
                    (None, Some(id)) => match self.resources.colors.get(id) {
                        Some(existing) => existing.color.clone(),
                        None => DEFAULT_COLOR.to_string(),
                    },
                    (None, None) => DEFAULT_COLOR.to_string(),
                };
                self.set_color(&name, &color)?;
                Ok(Outcome::Rerender)
            }
            Command::Rename { from, to } => {
                self.rename(&from, &to)?;
                Ok(Outcome::Rerender)
            }
            Command::SetWrap { name, wrap } => {
                self.texture_mut(&name)?.wrap = wrap;
                Ok(Outcome::Rerender)
            }
            Command::SetFilter { name, filter } => {
                self.texture_mut(&name)?.filter = filter;
                Ok(Outcome::Rerender)
            }
            Command::Remove { name } => {
                self.remove(&name)?;
                Ok(Outcome::Rerender)
            }
            Command::Resize { pair, axis, input } => {
                self.canvas.apply(pair, axis, &input)?;
                Ok(Outcome::Rerender)
            }
            Command::Lock { pair, locked } => {
                self.canvas.set_lock(pair, locked);
                Ok(Outcome::Rerender)
            }
            Command::Reload => Ok(Outcome::Rerender),
            Command::Export { path } => Ok(Outcome::Export(path)),
            Command::List => Ok(Outcome::Listing(self.describe())),
            Command::Quit => Ok(Outcome::Quit),
        }
    }

    /// Registers a finished decode, naming it `texN` when no name was asked for.
    pub fn add_decoded(&mut self, decoded: DecodedTexture) -> Result<ResourceId, SessionError> {
        let DecodedTexture { request, image } = decoded;
        let image = image?;
        let name = match request.name {
            Some(name) => {
                self.check_new_name(&name, None)?;
                name
            }
            None => self.resources.next_texture_name(),
        };
        let texture = TextureResource::new(name, Arc::new(image))
            .with_sampling(request.wrap, request.filter);
        Ok(self.resources.add_texture(texture))
    }

    /// Adds a color or updates the value of an existing one.
    ///
    /// A value that is not valid hex is stored but left out of the shader.
    pub fn set_color(&mut self, name: &str, color: &str) -> Result<ResourceId, SessionError> {
        if resolve_color(color).is_none() {
            tracing::warn!(%name, %color, "color is not a valid hex value; it will be skipped");
        }
        if let Some(id) = self.resources.colors.find_by_name(name) {
            if let Some(entry) = self.resources.colors.get_mut(id) {
                entry.color = color.to_string();
            }
            return Ok(id);
        }
        self.check_new_name(name, None)?;
        Ok(self.resources.add_color(ColorResource::new(name, color)))
    }

    pub fn rename(&mut self, from: &str, to: &str) -> Result<(), SessionError> {
        if self.resources.textures.find_by_name(from).is_none()
            && self.resources.colors.find_by_name(from).is_none()
        {
            return Err(SessionError::UnknownResource(from.to_string()));
        }
        if from == to {
            return Ok(());
        }
        self.check_new_name(to, Some(from))?;
        if let Some(id) = self.resources.textures.find_by_name(from) {
            if let Some(texture) = self.resources.textures.get_mut(id) {
                texture.name = to.to_string();
            }
        } else if let Some(id) = self.resources.colors.find_by_name(from) {
            if let Some(color) = self.resources.colors.get_mut(id) {
                color.name = to.to_string();
            }
        }
        tracing::debug!(%from, %to, "renamed resource");
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), SessionError> {
        if let Some(id) = self.resources.textures.find_by_name(name) {
            self.resources.textures.remove(id);
        } else if let Some(id) = self.resources.colors.find_by_name(name) {
            self.resources.colors.remove(id);
        } else {
            return Err(SessionError::UnknownResource(name.to_string()));
        }
        tracing::debug!(%name, "removed resource");
        Ok(())
    }

    /// Human-readable summary of resources and sizes.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        match self.source.path() {
            Some(path) => {
                let _ = writeln!(out, "source   {}", path.display());
            }
            None => {
                let _ = writeln!(out, "source   <template>");
            }
        }
        let lock = |locked: bool| if locked { " (aspect locked)" } else { "" };
        let _ = writeln!(
            out,
            "output   {}{}",
            self.canvas.output,
            lock(self.canvas.lock_output)
        );
        let _ = writeln!(
            out,
            "display  {}{}",
            self.canvas.display,
            lock(self.canvas.lock_display)
        );
        for (unit, texture) in self.resources.textures.list().into_iter().enumerate() {
            let (width, height) = texture.image.dimensions();
            let _ = writeln!(
                out,
                "texture  {} unit={unit} {width}x{height} wrap={} filter={}",
                texture.name, texture.wrap, texture.filter
            );
        }
        for color in self.resources.colors.list() {
            let _ = writeln!(out, "color    {} {}", color.name, color.color);
        }
        out
    }

    fn texture_mut(&mut self, name: &str) -> Result<&mut TextureResource, SessionError> {
        self.resources
            .textures
            .find_by_name(name)
            .and_then(|id| self.resources.textures.get_mut(id))
            .ok_or_else(|| SessionError::UnknownTexture(name.to_string()))
    }

    /// Validates `name` and checks it against every name except `renaming`.
    fn check_new_name(&self, name: &str, renaming: Option<&str>) -> Result<(), IdentError> {
        validate_identifier(name)?;
        ensure_unique(
            name,
            self.resources
                .all_names()
                .filter(|taken| Some(*taken) != renaming),
        )
    }
}

#[cfg(test)]
mod tests {
    use image::RgbaImage;

    use super::*;

    fn session() -> Session {
        Session::new(ShaderSource::Template, CanvasSize::default())
    }

    fn decoded(name: Option<&str>) -> DecodedTexture {
        let mut request = TextureRequest::new("unused.png");
        request.name = name.map(str::to_string);
        DecodedTexture {
            request,
            image: Ok(RgbaImage::new(4, 2)),
        }
    }

    #[test]
    fn colors_are_added_then_updated() {
        let mut session = session();
        let mut loader = ImageLoader::new();
        let outcome = session
            .apply(
                Command::SetColor {
                    name: Some("bg".into()),
                    color: Some("#ff0000".into()),
                },
                &mut loader,
            )
            .unwrap();
        assert_eq!(outcome, Outcome::Rerender);

        let first = session.set_color("bg", "#00ff00").unwrap();
        let second = session.set_color("bg", "zzz").unwrap();
        assert_eq!(first, second);
        assert_eq!(session.resources.colors.len(), 1);
        assert_eq!(session.resources.colors.list()[0].color, "zzz");
    }

    #[test]
    fn colors_without_name_or_value_get_defaults() {
        let mut session = session();
        let mut loader = ImageLoader::new();
        session.set_color("col0", "#fff").unwrap();
        for command in [
            Command::SetColor {
                name: None,
                color: None,
            },
            Command::SetColor {
                name: None,
                color: Some("#123".into()),
            },
            Command::SetColor {
                name: Some("accent".into()),
                color: None,
            },
            // Existing colors keep their value.
            Command::SetColor {
                name: Some("col0".into()),
                color: None,
            },
        ] {
            assert_eq!(session.apply(command, &mut loader).unwrap(), Outcome::Rerender);
        }

        let colors: Vec<_> = session
            .resources
            .colors
            .list()
            .into_iter()
            .map(|color| (color.name.as_str(), color.color.as_str()))
            .collect();
        assert_eq!(
            colors,
            vec![
                ("col0", "#fff"),
                ("col1", DEFAULT_COLOR),
                ("col2", "#123"),
                ("accent", DEFAULT_COLOR),
            ]
        );
    }

    #[test]
    fn decoded_textures_get_default_names() {
        let mut session = session();
        session.add_decoded(decoded(None)).unwrap();
        session.add_decoded(decoded(Some("noise"))).unwrap();
        session.add_decoded(decoded(None)).unwrap();
        let names: Vec<_> = session.resources.textures.names().collect();
        assert_eq!(names, vec!["tex0", "noise", "tex2"]);
    }

    #[test]
    fn rejects_invalid_and_duplicate_names() {
        let mut session = session();
        session.set_color("bg", "#000").unwrap();
        session.add_decoded(decoded(Some("albedo"))).unwrap();

        assert!(matches!(
            session.set_color("1bad", "#fff"),
            Err(SessionError::Name(IdentError::LeadingDigit(_)))
        ));
        assert!(matches!(
            session.rename("bg", "albedo"),
            Err(SessionError::Name(IdentError::Duplicate(_)))
        ));
        assert!(matches!(
            session.add_decoded(decoded(Some("bg"))),
            Err(SessionError::Name(IdentError::Duplicate(_)))
        ));
        assert!(matches!(
            session.rename("bg", "gl_Color"),
            Err(SessionError::Name(IdentError::Reserved(_)))
        ));
        assert_eq!(session.resources.all_names().collect::<Vec<_>>(), vec!["albedo", "bg"]);
    }

    #[test]
    fn renames_and_removes_resources() {
        let mut session = session();
        let mut loader = ImageLoader::new();
        session.add_decoded(decoded(None)).unwrap();
        session.set_color("bg", "#123").unwrap();

        session.rename("tex0", "albedo").unwrap();
        session.rename("bg", "bg").unwrap();
        assert!(matches!(
            session.rename("ghost", "ghost"),
            Err(SessionError::UnknownResource(_))
        ));
        assert!(matches!(
            session.rename("ghost", "spirit"),
            Err(SessionError::UnknownResource(_))
        ));
        session
            .apply(
                Command::SetWrap {
                    name: "albedo".into(),
                    wrap: WrapMode::Repeat,
                },
                &mut loader,
            )
            .unwrap();
        assert_eq!(session.resources.textures.list()[0].wrap, WrapMode::Repeat);

        assert!(matches!(
            session.apply(
                Command::SetFilter {
                    name: "bg".into(),
                    filter: FilterMode::Linear
                },
                &mut loader
            ),
            Err(SessionError::UnknownTexture(_))
        ));

        session.remove("albedo").unwrap();
        assert!(session.resources.textures.is_empty());
        assert!(matches!(
            session.remove("albedo"),
            Err(SessionError::UnknownResource(_))
        ));
    }

    #[test]
    fn resize_commands_respect_locks() {
        let mut session = session();
        let mut loader = ImageLoader::new();
        for command in [
            Command::Lock {
                pair: Pair::Output,
                locked: true,
            },
            Command::Resize {
                pair: Pair::Output,
                axis: Axis::Width,
                input: "800 / 2".into(),
            },
        ] {
            session.apply(command, &mut loader).unwrap();
        }
        assert_eq!(session.canvas.output, sizing::Dimensions::new(400, 300));

        let err = session
            .apply(
                Command::Resize {
                    pair: Pair::Display,
                    axis: Axis::Height,
                    input: "process.exit()".into(),
                },
                &mut loader,
            )
            .unwrap_err();
        assert!(matches!(err, SessionError::Size(_)));
        assert_eq!(session.canvas.display, sizing::Dimensions::new(800, 600));
    }

    #[test]
    fn describe_lists_units_in_order() {
        let mut session = session();
        session.add_decoded(decoded(Some("a"))).unwrap();
        session.add_decoded(decoded(Some("b"))).unwrap();
        let listing = session.describe();
        assert!(listing.contains("texture  a unit=0 4x2 wrap=clamp filter=nearest"));
        assert!(listing.contains("texture  b unit=1"));
        assert!(listing.contains("source   <template>"));
    }
}

use std::path::PathBuf;

use clap::Parser;
use composer::{FilterMode, WrapMode};
use sizing::Dimensions;

#[derive(Parser, Debug)]
#[command(
    name = "fragpad",
    author,
    version,
    about = "Live GLSL fragment shader playground"
)]
pub struct Cli {
    /// GLSL file defining `mainImage`; the built-in template is used when omitted.
    #[arg(value_name = "SOURCE")]
    pub source: Option<PathBuf>,

    /// Startup configuration (TOML).
    #[arg(long, env = "FRAGPAD_CONFIG", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Backing resolution; each side may be an arithmetic expression (`1920/2x540`).
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions)]
    pub output: Option<Dimensions>,

    /// Size the canvas is shown at; defaults to the output size.
    #[arg(long, value_name = "WIDTHxHEIGHT", value_parser = parse_dimensions)]
    pub display: Option<Dimensions>,

    /// Keep the output aspect ratio when one output dimension changes.
    #[arg(long)]
    pub lock_output_aspect: bool,

    /// Keep the display aspect ratio when one display dimension changes.
    #[arg(long)]
    pub lock_display_aspect: bool,

    /// Register a texture (`albedo=img.png:repeat:linear`); repeatable.
    #[arg(
        long = "texture",
        value_name = "NAME=PATH[:WRAP[:FILTER]]",
        value_parser = parse_texture_arg
    )]
    pub textures: Vec<TextureArg>,

    /// Register a color (`bg=#ff8800`); repeatable.
    #[arg(long = "color", value_name = "NAME=HEX", value_parser = parse_color_arg)]
    pub colors: Vec<ColorArg>,

    /// Render once without a window, write a PNG and exit.
    #[arg(long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Do not re-render when the source file changes on disk.
    #[arg(long)]
    pub no_watch: bool,

    /// Write the starter shader to PATH and exit.
    #[arg(long, value_name = "PATH", conflicts_with = "export")]
    pub init: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureArg {
    pub name: String,
    pub path: PathBuf,
    pub wrap: WrapMode,
    pub filter: FilterMode,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorArg {
    pub name: String,
    pub color: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_dimensions(value: &str) -> Result<Dimensions, String> {
    Dimensions::parse(value).map_err(|err| err.to_string())
}

/// Parses `NAME=PATH[:WRAP[:FILTER]]`.
///
/// Suffixes are only split off when they name a mode, so paths that contain
/// `:` still work.
pub fn parse_texture_arg(value: &str) -> Result<TextureArg, String> {
    let (name, rest) = split_assignment(value, "NAME=PATH")?;

    let mut path = rest;
    let mut wrap = WrapMode::default();
    let mut filter = FilterMode::default();
    if let Some((head, last)) = rest.rsplit_once(':') {
        let wrap_then_filter = head
            .rsplit_once(':')
            .and_then(|(prefix, wrap)| {
                let wrap = wrap.parse::<WrapMode>().ok()?;
                let filter = last.parse::<FilterMode>().ok()?;
                Some((prefix, wrap, filter))
            });
        if let Some((prefix, parsed_wrap, parsed_filter)) = wrap_then_filter {
            path = prefix;
            wrap = parsed_wrap;
            filter = parsed_filter;
        } else if let Ok(parsed_wrap) = last.parse::<WrapMode>() {
            path = head;
            wrap = parsed_wrap;
        }
    }

    if path.is_empty() {
        return Err(format!("texture '{name}' needs a path"));
    }
    Ok(TextureArg {
        name: name.to_string(),
        path: PathBuf::from(path),
        wrap,
        filter,
    })
}

/// Parses `NAME=HEX`.
pub fn parse_color_arg(value: &str) -> Result<ColorArg, String> {
    let (name, color) = split_assignment(value, "NAME=HEX")?;
    if composer::resolve_color(color).is_none() {
        return Err(format!("'{color}' is not a hex color"));
    }
    Ok(ColorArg {
        name: name.to_string(),
        color: color.to_string(),
    })
}

fn split_assignment<'a>(value: &'a str, shape: &str) -> Result<(&'a str, &'a str), String> {
    let (name, rest) = value
        .split_once('=')
        .ok_or_else(|| format!("expected {shape}, got '{value}'"))?;
    let name = name.trim();
    composer::validate_identifier(name).map_err(|err| err.to_string())?;
    Ok((name, rest.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_texture_variants() {
        assert_eq!(
            parse_texture_arg("albedo=img/a.png").unwrap(),
            TextureArg {
                name: "albedo".into(),
                path: PathBuf::from("img/a.png"),
                wrap: WrapMode::ClampToEdge,
                filter: FilterMode::Nearest,
            }
        );

        let repeat = parse_texture_arg("noise=n.png:repeat").unwrap();
        assert_eq!(repeat.wrap, WrapMode::Repeat);
        assert_eq!(repeat.filter, FilterMode::Nearest);

        let both = parse_texture_arg("noise=n.png:repeat:linear").unwrap();
        assert_eq!(both.path, PathBuf::from("n.png"));
        assert_eq!((both.wrap, both.filter), (WrapMode::Repeat, FilterMode::Linear));

        let colon = parse_texture_arg("t=C:/images/x.png").unwrap();
        assert_eq!(colon.path, PathBuf::from("C:/images/x.png"));
    }

    #[test]
    fn rejects_bad_texture_args() {
        assert!(parse_texture_arg("no-equals").is_err());
        assert!(parse_texture_arg("2d=a.png").is_err());
        assert!(parse_texture_arg("tex=").is_err());
        assert!(parse_texture_arg("tex=:repeat").is_err());
    }

    #[test]
    fn parses_colors() {
        assert_eq!(
            parse_color_arg("bg=#ff8800").unwrap(),
            ColorArg {
                name: "bg".into(),
                color: "#ff8800".into(),
            }
        );
        assert!(parse_color_arg("bg=orange").is_err());
        assert!(parse_color_arg("main=#fff").is_err());
    }

    #[test]
    fn parses_full_command_line() {
        let cli = Cli::try_parse_from([
            "fragpad",
            "shader.glsl",
            "--output",
            "1920/2x540",
            "--lock-output-aspect",
            "--texture",
            "a=a.png",
            "--texture",
            "b=b.png:repeat",
            "--color",
            "bg=#000",
            "--export",
            "out.png",
        ])
        .unwrap();
        assert_eq!(cli.source, Some(PathBuf::from("shader.glsl")));
        assert_eq!(cli.output, Some(Dimensions::new(960, 540)));
        assert!(cli.lock_output_aspect);
        assert_eq!(cli.textures.len(), 2);
        assert_eq!(cli.colors[0].name, "bg");
        assert_eq!(cli.export, Some(PathBuf::from("out.png")));
        assert!(!cli.no_watch);
    }
}

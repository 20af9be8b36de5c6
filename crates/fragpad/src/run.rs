use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use composer::TEMPLATE_SOURCE;
use padconfig::{ColorEntry, PadConfig, TextureEntry};
use renderer::{
    decode_image, run_window, DecodedTexture, Renderer, Session, ShaderSource, TextureRequest,
    WindowOptions,
};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::console;

pub fn run(cli: Cli) -> Result<()> {
    if let Some(path) = cli.init.as_deref() {
        return write_template(path);
    }

    let config = load_config(&cli)?;
    let session = build_session(&config)?;
    tracing::debug!(
        source = ?session.source,
        output = %session.canvas.output,
        display = %session.canvas.display,
        textures = session.resources.textures.len(),
        colors = session.resources.colors.len(),
        "session ready"
    );

    if let Some(path) = cli.export.as_deref() {
        return export_once(&session, path);
    }

    let options = WindowOptions {
        watch_source: !cli.no_watch,
    };
    run_window(session, options, |proxy| {
        if let Err(err) = console::spawn(proxy) {
            tracing::warn!("console unavailable: {err}");
        }
    })
}

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn write_template(path: &Path) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(TEMPLATE_SOURCE.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!(path = %path.display(), "wrote starter shader");
    Ok(())
}

/// Reads the config file if one was given and folds the command line over it.
fn load_config(cli: &Cli) -> Result<PadConfig> {
    let mut config = match cli.config.as_deref() {
        Some(path) => PadConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => PadConfig::default(),
    };
    apply_overrides(&mut config, cli);
    config.validate().context("invalid command line settings")?;
    Ok(config)
}

/// Command-line values win; textures and colors replace config entries of the
/// same name and are otherwise appended.
fn apply_overrides(config: &mut PadConfig, cli: &Cli) {
    if let Some(source) = &cli.source {
        config.source = Some(source.clone());
    }
    if let Some(output) = cli.output {
        config.canvas.output_width = Some(output.width.to_string());
        config.canvas.output_height = Some(output.height.to_string());
    }
    if let Some(display) = cli.display {
        config.canvas.display_width = Some(display.width.to_string());
        config.canvas.display_height = Some(display.height.to_string());
    }
    config.canvas.lock_output |= cli.lock_output_aspect;
    config.canvas.lock_display |= cli.lock_display_aspect;

    for texture in &cli.textures {
        let entry = TextureEntry {
            name: texture.name.clone(),
            path: texture.path.clone(),
            wrap: texture.wrap.into(),
            filter: texture.filter.into(),
        };
        upsert(&mut config.textures, entry, |existing| existing.name == texture.name);
    }
    for color in &cli.colors {
        let entry = ColorEntry {
            name: color.name.clone(),
            color: color.color.clone(),
        };
        upsert(&mut config.colors, entry, |existing| existing.name == color.name);
    }
}

fn upsert<T>(entries: &mut Vec<T>, entry: T, same: impl Fn(&T) -> bool) {
    match entries.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = entry,
        None => entries.push(entry),
    }
}

/// Startup textures decode on this thread so unit order follows the config.
fn build_session(config: &PadConfig) -> Result<Session> {
    let source = match &config.source {
        Some(path) => ShaderSource::File(path.clone()),
        None => ShaderSource::Template,
    };
    let canvas = config.canvas_size()?;
    let mut session = Session::new(source, canvas);

    for entry in &config.textures {
        let mut request = TextureRequest::new(entry.path.clone()).named(entry.name.clone());
        request.wrap = entry.wrap.into();
        request.filter = entry.filter.into();
        let image = decode_image(&request.path);
        session
            .add_decoded(DecodedTexture { request, image })
            .with_context(|| format!("failed to load texture '{}'", entry.name))?;
    }
    for entry in &config.colors {
        session
            .set_color(&entry.name, &entry.color)
            .with_context(|| format!("failed to add color '{}'", entry.name))?;
    }
    Ok(session)
}

fn export_once(session: &Session, path: &Path) -> Result<()> {
    let source = session.source.load()?;
    let mut renderer = Renderer::headless(session.canvas.output)?;
    let report = renderer
        .render(&session.resources, &source, &session.canvas)
        .map_err(|err| anyhow!("{} error: {err}", err.kind()))?;
    tracing::info!(
        size = %report.size,
        textures = report.textures,
        active_samplers = report.active_samplers,
        "rendered"
    );
    renderer.export_png(path)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use clap::Parser;
    use padconfig::{FilterSetting, WrapSetting};

    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fragpad").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn command_line_overrides_config() {
        let mut config = PadConfig::from_toml_str(
            r##"
version = 1
source = "from-config.glsl"

[canvas]
output_width = "1920 / 2"
output_height = 540

[[textures]]
name = "albedo"
path = "config.png"

[[colors]]
name = "bg"
color = "#000"
"##,
        )
        .unwrap();

        let cli = cli(&[
            "cli.glsl",
            "--display",
            "480x270",
            "--lock-display-aspect",
            "--texture",
            "albedo=cli.png:repeat",
            "--texture",
            "noise=noise.png",
            "--color",
            "fg=#fff",
        ]);
        apply_overrides(&mut config, &cli);
        config.validate().unwrap();

        assert_eq!(config.source, Some(PathBuf::from("cli.glsl")));
        let canvas = config.canvas_size().unwrap();
        assert_eq!(canvas.output, sizing::Dimensions::new(960, 540));
        assert_eq!(canvas.display, sizing::Dimensions::new(480, 270));
        assert!(canvas.lock_display);
        assert!(!canvas.lock_output);

        let textures: Vec<_> = config
            .textures
            .iter()
            .map(|entry| (entry.name.as_str(), entry.path.clone(), entry.wrap))
            .collect();
        assert_eq!(
            textures,
            vec![
                ("albedo", PathBuf::from("cli.png"), WrapSetting::Repeat),
                ("noise", PathBuf::from("noise.png"), WrapSetting::Clamp),
            ]
        );
        assert_eq!(config.colors.len(), 2);
    }

    #[test]
    fn name_clash_between_texture_and_color_is_rejected() {
        let mut config = PadConfig::default();
        let cli = cli(&["--texture", "bg=a.png", "--color", "bg=#fff"]);
        apply_overrides(&mut config, &cli);
        assert!(config.validate().is_err());
    }

    #[test]
    fn session_loads_startup_resources_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.png", "a.png"] {
            image::RgbaImage::new(2, 3).save(dir.path().join(name)).unwrap();
        }
        let mut config = PadConfig::default();
        let cli = cli(&[
            "--texture",
            &format!("second={}", dir.path().join("b.png").display()),
            "--texture",
            &format!("first={}:repeat:linear", dir.path().join("a.png").display()),
            "--color",
            "bg=#123456",
        ]);
        apply_overrides(&mut config, &cli);

        let session = build_session(&config).unwrap();
        assert_eq!(session.source, ShaderSource::Template);
        let names: Vec<_> = session.resources.textures.names().collect();
        assert_eq!(names, vec!["second", "first"]);
        let first = session.resources.textures.list()[1];
        assert_eq!(first.wrap, composer::WrapMode::Repeat);
        assert_eq!(first.filter, composer::FilterMode::Linear);
        assert_eq!(session.resources.colors.list()[0].color, "#123456");
    }

    #[test]
    fn missing_startup_texture_fails() {
        let mut config = PadConfig::default();
        config.textures.push(TextureEntry {
            name: "gone".into(),
            path: PathBuf::from("/definitely/not/here.png"),
            wrap: WrapSetting::Clamp,
            filter: FilterSetting::Nearest,
        });
        let err = build_session(&config).unwrap_err();
        assert!(format!("{err:#}").contains("gone"));
    }
}

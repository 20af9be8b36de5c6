use std::sync::Arc;

use composer::{ColorResource, FilterMode, Resources, TextureResource, WrapMode};
use image::{Rgba, RgbaImage};
use renderer::{GpuContext, RenderError, Renderer};
use sizing::{CanvasSize, Dimensions};

/// Renderer on whatever adapter is present; `None` skips GPU-less machines.
fn renderer(size: Dimensions) -> Option<Renderer> {
    let context = match GpuContext::headless() {
        Ok(context) => context,
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            return None;
        }
    };
    Some(Renderer::new(context, size).expect("renderer"))
}

fn canvas(width: u32, height: u32) -> CanvasSize {
    let size = Dimensions::new(width, height);
    CanvasSize::new(size, size)
}

fn checkerboard() -> Arc<RgbaImage> {
    let mut image = RgbaImage::new(2, 2);
    image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
    image.put_pixel(1, 0, Rgba([0, 255, 0, 255]));
    image.put_pixel(0, 1, Rgba([0, 0, 255, 255]));
    image.put_pixel(1, 1, Rgba([255, 255, 255, 255]));
    Arc::new(image)
}

const SOLID_BG: &str = "void mainImage(out vec4 fragColor, in vec2 fragCoord) {\n    fragColor = bg;\n}\n";

const SAMPLE_TEX: &str =
    "void mainImage(out vec4 fragColor, in vec2 fragCoord) {\n    fragColor = texture(checker, fragCoord);\n}\n";

#[test]
fn color_resource_fills_canvas() {
    let Some(mut renderer) = renderer(Dimensions::new(4, 4)) else {
        return;
    };
    let mut resources = Resources::new();
    resources.add_color(ColorResource::new("bg", "#ff0000"));

    let report = renderer
        .render(&resources, SOLID_BG, &canvas(4, 4))
        .expect("render");
    assert_eq!(report.size, Dimensions::new(4, 4));

    let pixels = renderer.read_pixels().unwrap();
    assert!(pixels.pixels().all(|pixel| *pixel == Rgba([255, 0, 0, 255])));
}

#[test]
fn texture_is_sampled_top_row_first() {
    let Some(mut renderer) = renderer(Dimensions::new(2, 2)) else {
        return;
    };
    let mut resources = Resources::new();
    resources.add_texture(
        TextureResource::new("checker", checkerboard())
            .with_sampling(WrapMode::ClampToEdge, FilterMode::Nearest),
    );

    let report = renderer
        .render(&resources, SAMPLE_TEX, &canvas(2, 2))
        .expect("render");
    assert_eq!(report.active_samplers, 1);

    let pixels = renderer.read_pixels().unwrap();
    assert_eq!(pixels.get_pixel(0, 0), &Rgba([255, 0, 0, 255]));
    assert_eq!(pixels.get_pixel(1, 0), &Rgba([0, 255, 0, 255]));
    assert_eq!(pixels.get_pixel(0, 1), &Rgba([0, 0, 255, 255]));
    assert_eq!(pixels.get_pixel(1, 1), &Rgba([255, 255, 255, 255]));
}

#[test]
fn compile_error_keeps_last_frame_then_recovers() {
    let Some(mut renderer) = renderer(Dimensions::new(4, 4)) else {
        return;
    };
    let mut resources = Resources::new();
    resources.add_color(ColorResource::new("bg", "#00ff00"));
    renderer
        .render(&resources, SOLID_BG, &canvas(4, 4))
        .expect("first render");
    let good = renderer.read_pixels().unwrap();

    let broken = "void mainImage(out vec4 fragColor, in vec2 fragCoord) { fragColor = ; }";
    let err = renderer
        .render(&resources, broken, &canvas(8, 8))
        .unwrap_err();
    assert!(matches!(err, RenderError::Compile { .. }), "{err}");
    assert!(err.is_recoverable());

    // Neither the frame nor the canvas size moved.
    assert_eq!(renderer.canvas_size(), Dimensions::new(4, 4));
    assert_eq!(renderer.read_pixels().unwrap(), good);

    resources.add_color(ColorResource::new("fg", "#0000ff"));
    let fixed = "void mainImage(out vec4 fragColor, in vec2 fragCoord) { fragColor = fg; }";
    renderer
        .render(&resources, fixed, &canvas(8, 8))
        .expect("recovered render");
    let pixels = renderer.read_pixels().unwrap();
    assert_eq!(pixels.dimensions(), (8, 8));
    assert!(pixels.pixels().all(|pixel| *pixel == Rgba([0, 0, 255, 255])));
}

#[test]
fn identical_inputs_render_identical_pixels() {
    let Some(mut renderer) = renderer(Dimensions::new(16, 8)) else {
        return;
    };
    let mut resources = Resources::new();
    resources.add_texture(TextureResource::new("checker", checkerboard()));
    let source = "void mainImage(out vec4 fragColor, in vec2 fragCoord) {\n    fragColor = texture(checker, fragCoord * 3.0) * vec4(fragCoord, 1.0, 1.0);\n}\n";

    renderer.render(&resources, source, &canvas(16, 8)).unwrap();
    let first = renderer.read_pixels().unwrap();
    renderer.render(&resources, source, &canvas(16, 8)).unwrap();
    let second = renderer.read_pixels().unwrap();
    assert_eq!(first, second);
}

#[test]
fn unused_and_removed_samplers_are_skipped() {
    let Some(mut renderer) = renderer(Dimensions::new(2, 2)) else {
        return;
    };
    let mut resources = Resources::new();
    let unused = resources.add_texture(TextureResource::new("unused", checkerboard()));
    resources.add_texture(TextureResource::new("checker", checkerboard()));

    let report = renderer
        .render(&resources, SAMPLE_TEX, &canvas(2, 2))
        .expect("render with an unused sampler");
    assert_eq!(report.textures, 2);
    assert_eq!(report.active_samplers, 1);
    assert_eq!(
        renderer.read_pixels().unwrap().get_pixel(0, 0),
        &Rgba([255, 0, 0, 255])
    );

    // `checker` moves from unit 1 to unit 0.
    resources.textures.remove(unused);
    renderer
        .render(&resources, SAMPLE_TEX, &canvas(2, 2))
        .expect("render after removal");
    assert_eq!(
        renderer.read_pixels().unwrap().get_pixel(1, 1),
        &Rgba([255, 255, 255, 255])
    );
}

#[test]
fn export_writes_png() {
    let Some(mut renderer) = renderer(Dimensions::new(3, 2)) else {
        return;
    };
    let mut resources = Resources::new();
    resources.add_color(ColorResource::new("bg", "#fff"));
    renderer.render(&resources, SOLID_BG, &canvas(3, 2)).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("frame.png");
    renderer.export_png(&path).unwrap();

    let written = image::open(&path).unwrap().to_rgba8();
    assert_eq!(written.dimensions(), (3, 2));
    assert_eq!(written.get_pixel(2, 1), &Rgba([255, 255, 255, 255]));
}

fn strip() -> Arc<RgbaImage> {
    let mut image = RgbaImage::new(2, 1);
    image.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
    image.put_pixel(1, 0, Rgba([0, 0, 255, 255]));
    Arc::new(image)
}

#[test]
fn wrap_mode_comes_from_the_texture() {
    let Some(mut renderer) = renderer(Dimensions::new(4, 1)) else {
        return;
    };
    let mut resources = Resources::new();
    let id = resources.add_texture(
        TextureResource::new("strip", strip()).with_sampling(WrapMode::Repeat, FilterMode::Nearest),
    );
    let source = "void mainImage(out vec4 fragColor, in vec2 fragCoord) {\n    fragColor = texture(strip, vec2(fragCoord.x * 2.0, 0.5));\n}\n";

    let red = Rgba([255, 0, 0, 255]);
    let blue = Rgba([0, 0, 255, 255]);
    let row = |image: &RgbaImage| (0..4).map(|x| *image.get_pixel(x, 0)).collect::<Vec<_>>();

    renderer.render(&resources, source, &canvas(4, 1)).unwrap();
    assert_eq!(row(&renderer.read_pixels().unwrap()), vec![red, blue, red, blue]);

    resources.textures.get_mut(id).unwrap().wrap = WrapMode::ClampToEdge;
    renderer.render(&resources, source, &canvas(4, 1)).unwrap();
    assert_eq!(row(&renderer.read_pixels().unwrap()), vec![red, blue, blue, blue]);
}

#[test]
fn linear_filter_blends_neighbouring_texels() {
    let Some(mut renderer) = renderer(Dimensions::new(1, 1)) else {
        return;
    };
    let mut resources = Resources::new();
    resources.add_texture(
        TextureResource::new("strip", strip()).with_sampling(WrapMode::ClampToEdge, FilterMode::Linear),
    );
    let source = "void mainImage(out vec4 fragColor, in vec2 fragCoord) {\n    fragColor = texture(strip, vec2(0.5, 0.5));\n}\n";

    renderer.render(&resources, source, &canvas(1, 1)).unwrap();
    let pixel = *renderer.read_pixels().unwrap().get_pixel(0, 0);
    assert!((64..=192).contains(&pixel[0]), "{pixel:?}");
    assert!((64..=192).contains(&pixel[2]), "{pixel:?}");
}

#[test]
fn link_failure_keeps_previous_program_and_frame() {
    let Some(mut renderer) = renderer(Dimensions::new(2, 2)) else {
        return;
    };
    let limits = renderer.context().device().limits();
    let units = limits
        .max_sampled_textures_per_shader_stage
        .min(limits.max_samplers_per_shader_stage);
    if units > 64 {
        eprintln!("skipping link failure test: device allows {units} texture units");
        return;
    }

    let mut resources = Resources::new();
    resources.add_color(ColorResource::new("bg", "#00ff00"));
    renderer
        .render(&resources, SOLID_BG, &canvas(2, 2))
        .expect("first render");
    let good = renderer.read_pixels().unwrap();

    let image = checkerboard();
    let mut source = String::from("void mainImage(out vec4 fragColor, in vec2 fragCoord) {\n    fragColor = bg;\n");
    for unit in 0..=units {
        resources.add_texture(TextureResource::new(format!("t{unit}"), image.clone()));
        source.push_str(&format!("    fragColor += texture(t{unit}, fragCoord) * 0.0;\n"));
    }
    source.push_str("}\n");

    let err = renderer
        .render(&resources, &source, &canvas(2, 2))
        .unwrap_err();
    assert!(matches!(err, RenderError::Link { .. }), "{err}");
    assert!(err.is_recoverable());
    assert_eq!(renderer.read_pixels().unwrap(), good);

    // Rendering recovers once the shader fits the device again.
    let mut fewer = Resources::new();
    fewer.add_color(ColorResource::new("bg", "#0000ff"));
    renderer
        .render(&fewer, SOLID_BG, &canvas(2, 2))
        .expect("render after link failure");
    assert_eq!(
        renderer.read_pixels().unwrap().get_pixel(0, 0),
        &Rgba([0, 0, 255, 255])
    );
}

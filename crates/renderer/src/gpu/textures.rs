use composer::compose::{sampler_binding, texture_binding};
use composer::{FilterMode, Registry, TextureResource, WrapMode};
use wgpu::util::{DeviceExt, TextureDataOrder};

use super::context::GpuContext;
use super::program::Program;

/// Texture units for every registered texture, assigned in registry order
/// starting at zero.
pub fn plan_units(textures: &Registry<TextureResource>) -> Vec<(u32, &TextureResource)> {
    textures
        .list()
        .into_iter()
        .enumerate()
        .map(|(unit, texture)| (unit as u32, texture))
        .collect()
}

/// GPU copies of the textures bound for one draw.
///
/// They are rebuilt on every render, so the GPU copy never outlives the
/// registry entry it came from.
pub(crate) struct BoundTextures {
    pub bind_group: wgpu::BindGroup,
    _textures: Vec<wgpu::Texture>,
}

/// Uploads the textures `program` reads and binds them to their units.
///
/// Units the program does not read are skipped.
pub(crate) fn bind_textures(
    context: &GpuContext,
    program: &Program,
    textures: &Registry<TextureResource>,
) -> BoundTextures {
    let max_dimension = context.max_texture_dimension();
    let mut uploaded = Vec::new();
    for (unit, resource) in plan_units(textures) {
        if !program.is_unit_active(unit) {
            continue;
        }
        let texture = upload_texture(context, unit, resource, max_dimension);
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = create_sampler(&context.device, resource.wrap, resource.filter);
        uploaded.push((unit, texture, view, sampler));
    }

    let mut entries = Vec::with_capacity(uploaded.len() * 2);
    for (unit, _, view, sampler) in &uploaded {
        entries.push(wgpu::BindGroupEntry {
            binding: texture_binding(*unit),
            resource: wgpu::BindingResource::TextureView(view),
        });
        entries.push(wgpu::BindGroupEntry {
            binding: sampler_binding(*unit),
            resource: wgpu::BindingResource::Sampler(sampler),
        });
    }

    let bind_group = context.device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("texture bind group"),
        layout: &program.texture_layout,
        entries: &entries,
    });
    tracing::trace!(bound = uploaded.len(), "bound textures");

    BoundTextures {
        bind_group,
        _textures: uploaded.into_iter().map(|(_, texture, _, _)| texture).collect(),
    }
}

fn upload_texture(
    context: &GpuContext,
    unit: u32,
    resource: &TextureResource,
    max_dimension: u32,
) -> wgpu::Texture {
    let (width, height) = resource.image.dimensions();
    if width == 0 || height == 0 || width > max_dimension || height > max_dimension {
        tracing::warn!(
            name = %resource.name,
            width,
            height,
            max_dimension,
            "texture cannot be uploaded; using placeholder"
        );
        return create_placeholder_texture(context, unit);
    }

    context.device.create_texture_with_data(
        &context.queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("texture '{}' on unit {unit}", resource.name)),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        resource.image.as_raw(),
    )
}

fn create_placeholder_texture(context: &GpuContext, unit: u32) -> wgpu::Texture {
    context.device.create_texture_with_data(
        &context.queue,
        &wgpu::TextureDescriptor {
            label: Some(&format!("placeholder texture on unit {unit}")),
            size: wgpu::Extent3d {
                width: 1,
                height: 1,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8Unorm,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        },
        TextureDataOrder::LayerMajor,
        &[0, 0, 0, 255],
    )
}

fn create_sampler(device: &wgpu::Device, wrap: WrapMode, filter: FilterMode) -> wgpu::Sampler {
    let address_mode = match wrap {
        WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        WrapMode::Repeat => wgpu::AddressMode::Repeat,
    };
    let filter_mode = match filter {
        FilterMode::Nearest => wgpu::FilterMode::Nearest,
        FilterMode::Linear => wgpu::FilterMode::Linear,
    };
    device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("texture sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: filter_mode,
        min_filter: filter_mode,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    })
}

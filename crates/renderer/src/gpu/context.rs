use std::sync::Arc;

use winit::window::Window;

use crate::error::RenderError;

/// Adapter, device and queue shared by every GPU object the renderer owns.
pub struct GpuContext {
    pub(crate) device: wgpu::Device,
    pub(crate) queue: wgpu::Queue,
    pub(crate) adapter: wgpu::Adapter,
}

impl GpuContext {
    /// Context without a presentation surface, used for export and tests.
    pub fn headless() -> Result<Self, RenderError> {
        let instance = create_instance();
        Self::from_instance(&instance, None)
    }

    /// Context whose adapter can present to `window`.
    pub fn for_window(window: Arc<Window>) -> Result<(Self, wgpu::Surface<'static>), RenderError> {
        let instance = create_instance();
        let surface = instance
            .create_surface(window)
            .map_err(|err| RenderError::Device(format!("failed to create rendering surface: {err}")))?;
        let context = Self::from_instance(&instance, Some(&surface))?;
        Ok((context, surface))
    }

    fn from_instance(
        instance: &wgpu::Instance,
        surface: Option<&wgpu::Surface<'_>>,
    ) -> Result<Self, RenderError> {
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: surface,
            force_fallback_adapter: false,
        }))
        .map_err(|err| RenderError::Device(format!("failed to find a suitable GPU adapter: {err}")))?;

        let info = adapter.get_info();
        tracing::debug!(
            name = %info.name,
            backend = ?info.backend,
            device_type = ?info.device_type,
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("fragpad device"),
            required_features: wgpu::Features::empty(),
            required_limits: adapter.limits(),
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| RenderError::Device(format!("failed to create GPU device: {err}")))?;

        // Everything that can fail runs inside an error scope; anything that
        // escapes one is logged instead of aborting the process.
        device.on_uncaptured_error(Box::new(|error| {
            tracing::error!(%error, "uncaptured GPU error");
        }));

        Ok(Self {
            device,
            queue,
            adapter,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    pub(crate) fn max_texture_dimension(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    /// Maximum number of sampled textures a single shader may bind.
    pub(crate) fn max_texture_units(&self) -> u32 {
        let limits = self.device.limits();
        limits
            .max_sampled_textures_per_shader_stage
            .min(limits.max_samplers_per_shader_stage)
    }
}

fn create_instance() -> wgpu::Instance {
    wgpu::Instance::new(&wgpu::InstanceDescriptor {
        backends: wgpu::Backends::all(),
        flags: wgpu::InstanceFlags::default(),
        memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
        backend_options: wgpu::BackendOptions::default(),
    })
}

//! Headless wgpu device setup.

use crate::error::{classify, RenderError, RenderResult};
use crate::volume::{adapter_volume_usages, missing_volume_usages, VOLUME_FORMAT};

/// A headless wgpu device and queue.
///
/// wgpu handles are reference counted, so clones share the same device.
#[derive(Clone)]
pub struct GpuContext {
    /// The wgpu instance.
    pub instance: wgpu::Instance,
    /// The wgpu adapter.
    pub adapter: wgpu::Adapter,
    /// The wgpu device.
    pub device: wgpu::Device,
    /// The wgpu queue.
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Creates a device without a surface.
    ///
    /// The preferred adapter is used when it can render to and copy from
    /// [`VOLUME_FORMAT`]; otherwise the first enumerated adapter that can is
    /// picked. Fails with [`RenderError::AdapterCreationFailed`] when none can.
    ///
    /// Requests `FLOAT32_FILTERABLE` when the adapter has it so the volume's
    /// linear sampler can be bound by downstream passes.
    pub async fn new_headless() -> RenderResult<Self> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let preferred = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|e| RenderError::AdapterCreationFailed(e.to_string()))?;
        let adapter = select_volume_adapter(&instance, preferred)?;

        let info = adapter.get_info();
        log::info!("using adapter {} ({:?})", info.name, info.backend);

        let required_features = adapter.features() & wgpu::Features::FLOAT32_FILTERABLE;
        if required_features.is_empty() {
            log::warn!("adapter cannot filter R32Float textures; linear sampling unavailable");
        }

        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: Some("voxfield device (headless)"),
                required_features,
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
                trace: Default::default(),
                experimental_features: Default::default(),
            })
            .await?;

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
        })
    }

    /// Device limits in effect.
    pub fn limits(&self) -> wgpu::Limits {
        self.device.limits()
    }

    /// Runs an allocation inside out-of-memory and validation scopes.
    ///
    /// Out-of-memory wins when both scopes caught something.
    pub fn scoped_allocation<T>(
        &self,
        wrap: impl FnOnce(String) -> RenderError,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> RenderResult<T> {
        use pollster::FutureExt;

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let value = f(&self.device);
        let validation = self.device.pop_error_scope().block_on();
        let oom = self.device.pop_error_scope().block_on();
        match (oom, validation) {
            (Some(_), _) => Err(RenderError::OutOfMemory),
            (None, Some(err)) => Err(classify(&err, wrap)),
            (None, None) => Ok(value),
        }
    }

    /// Runs `f` inside an error scope and reports whatever it raised.
    ///
    /// `wrap` builds the error for validation failures; out-of-memory is
    /// always reported as [`RenderError::OutOfMemory`].
    pub fn scoped<T>(
        &self,
        filter: wgpu::ErrorFilter,
        wrap: impl FnOnce(String) -> RenderError,
        f: impl FnOnce(&wgpu::Device) -> T,
    ) -> RenderResult<T> {
        use pollster::FutureExt;

        self.device.push_error_scope(filter);
        let value = f(&self.device);
        match self.device.pop_error_scope().block_on() {
            Some(err) => Err(classify(&err, wrap)),
            None => Ok(value),
        }
    }
}

/// Keeps `preferred` if it can hold a density volume, else looks for one that can.
fn select_volume_adapter(
    instance: &wgpu::Instance,
    preferred: wgpu::Adapter,
) -> RenderResult<wgpu::Adapter> {
    let missing = missing_volume_usages(adapter_volume_usages(&preferred));
    if missing.is_empty() {
        return Ok(preferred);
    }

    let info = preferred.get_info();
    log::warn!(
        "adapter {} ({:?}) lacks {missing:?} for {VOLUME_FORMAT:?}, trying others",
        info.name,
        info.backend
    );

    instance
        .enumerate_adapters(wgpu::Backends::all())
        .into_iter()
        .find(|adapter| missing_volume_usages(adapter_volume_usages(adapter)).is_empty())
        .ok_or_else(|| {
            RenderError::AdapterCreationFailed(format!(
                "no adapter can render to {VOLUME_FORMAT:?} volumes"
            ))
        })
}

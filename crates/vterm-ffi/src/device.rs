//! Headless GPU device acquisition for `pool_create`.
//!
//! Every terminal renders into its own offscreen `wgpu::Texture`
//! (`vterm-render`'s `SurfaceCache`) rather than a shared window swapchain,
//! so the pool never needs a native window surface to pick an adapter
//! against — unlike the teacher's Metal-layer-bound `term_session_init_gpu`,
//! this can request an adapter with no `compatible_surface` at all. A host
//! that wants the result on screen reads back the offscreen texture and
//! blits it into its own window surface itself (native window composition
//! is out of scope here, same as the teacher leaves it to `tide-platform`).

use std::sync::Arc;

pub fn acquire_headless() -> Option<(Arc<wgpu::Device>, Arc<wgpu::Queue>, wgpu::TextureFormat)> {
    pollster::block_on(async {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor { backends: wgpu::Backends::all(), ..Default::default() });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("vterm_pool_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                    memory_hints: Default::default(),
                },
                None,
            )
            .await
            .ok()?;

        Some((Arc::new(device), Arc::new(queue), wgpu::TextureFormat::Bgra8UnormSrgb))
    })
}

//! Per-terminal offscreen render target. Each terminal renders into its own
//! texture so a layout manager (out of scope here) can composite many panes
//! without the engine knowing anything about window geometry.

use std::sync::Arc;

pub struct SurfaceCache {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub width_px: u32,
    pub height_px: u32,
    format: wgpu::TextureFormat,
}

impl SurfaceCache {
    pub fn new(device: &wgpu::Device, format: wgpu::TextureFormat, width_px: u32, height_px: u32) -> Self {
        let (texture, view) = Self::create(device, format, width_px, height_px);
        Self { texture, view, width_px, height_px, format }
    }

    fn create(
        device: &wgpu::Device,
        format: wgpu::TextureFormat,
        width_px: u32,
        height_px: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("terminal_surface"),
            size: wgpu::Extent3d {
                width: width_px.max(1),
                height: height_px.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        (texture, view)
    }

    /// Recreate the backing texture iff the requested size differs from the
    /// one it was created at. Returns true if it resized (callers should
    /// treat this as "every cache for this terminal is now stale").
    pub fn ensure_size(&mut self, device: &Arc<wgpu::Device>, width_px: u32, height_px: u32) -> bool {
        if width_px == self.width_px && height_px == self.height_px {
            return false;
        }
        let (texture, view) = Self::create(device, self.format, width_px, height_px);
        self.texture = texture;
        self.view = view;
        self.width_px = width_px;
        self.height_px = height_px;
        true
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }
}

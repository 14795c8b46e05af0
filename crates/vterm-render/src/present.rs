//! Submits one terminal's accumulated vertex/index streams to the GPU.
//!
//! Grounded on the teacher's `render_frame`: upload-then-draw, buffers grown
//! on demand rather than recreated every frame. Scoped down to the two
//! layers this engine has — grid body and overlay — since panel chrome and
//! a "top" UI layer belong to the layout manager this crate doesn't build.

use crate::{TerminalRenderState, WgpuRenderer};

impl WgpuRenderer {
    /// Render `state`'s current frame into its own offscreen surface and
    /// submit the work to the GPU queue. Call after `paint_terminal`.
    pub fn present(&self, state: &mut TerminalRenderState) {
        let screen = [state.surface.width_px as f32, state.surface.height_px as f32];
        if screen != state.last_uniform_screen {
            let data = [screen[0], screen[1], 0.0f32, 0.0f32];
            self.queue.write_buffer(&state.uniform_buffer, 0, bytemuck::cast_slice(&data));
            state.last_uniform_screen = screen;
        }

        state.grid_rect_buf.upload(&self.device, &self.queue, bytemuck::cast_slice(&state.grid_rect_vertices));
        state.grid_rect_idx.upload(&self.device, &self.queue, bytemuck::cast_slice(&state.grid_rect_indices));
        state.grid_glyph_buf.upload(&self.device, &self.queue, bytemuck::cast_slice(&state.grid_glyph_vertices));
        state.grid_glyph_idx.upload(&self.device, &self.queue, bytemuck::cast_slice(&state.grid_glyph_indices));
        state.overlay_rect_buf.upload(&self.device, &self.queue, bytemuck::cast_slice(&state.overlay_rect_vertices));
        state.overlay_rect_idx.upload(&self.device, &self.queue, bytemuck::cast_slice(&state.overlay_rect_indices));
        state.overlay_glyph_buf.upload(&self.device, &self.queue, bytemuck::cast_slice(&state.overlay_glyph_vertices));
        state.overlay_glyph_idx.upload(&self.device, &self.queue, bytemuck::cast_slice(&state.overlay_glyph_indices));

        let mut encoder = self.device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("terminal_frame"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("terminal_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: state.surface.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color { r: 0.0, g: 0.0, b: 0.0, a: 1.0 }),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            let grid_rect_count = state.grid_rect_indices.len() as u32;
            let grid_glyph_count = state.grid_glyph_indices.len() as u32;
            let overlay_rect_count = state.overlay_rect_indices.len() as u32;
            let overlay_glyph_count = state.overlay_glyph_indices.len() as u32;

            if grid_rect_count > 0 {
                if let (Some(vb), Some(ib)) = (state.grid_rect_buf.slice(), state.grid_rect_idx.slice()) {
                    pass.set_pipeline(&self.rect_pipeline);
                    pass.set_bind_group(0, &state.uniform_bind_group, &[]);
                    pass.set_vertex_buffer(0, vb);
                    pass.set_index_buffer(ib, wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..grid_rect_count, 0, 0..1);
                }
            }

            if grid_glyph_count > 0 {
                if let (Some(vb), Some(ib)) = (state.grid_glyph_buf.slice(), state.grid_glyph_idx.slice()) {
                    pass.set_pipeline(&self.glyph_pipeline);
                    pass.set_bind_group(0, &state.uniform_bind_group, &[]);
                    pass.set_bind_group(1, &self.atlas_bind_group, &[]);
                    pass.set_vertex_buffer(0, vb);
                    pass.set_index_buffer(ib, wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..grid_glyph_count, 0, 0..1);
                }
            }

            if overlay_rect_count > 0 {
                if let (Some(vb), Some(ib)) = (state.overlay_rect_buf.slice(), state.overlay_rect_idx.slice()) {
                    pass.set_pipeline(&self.rect_pipeline);
                    pass.set_bind_group(0, &state.uniform_bind_group, &[]);
                    pass.set_vertex_buffer(0, vb);
                    pass.set_index_buffer(ib, wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..overlay_rect_count, 0, 0..1);
                }
            }

            if overlay_glyph_count > 0 {
                if let (Some(vb), Some(ib)) = (state.overlay_glyph_buf.slice(), state.overlay_glyph_idx.slice()) {
                    pass.set_pipeline(&self.glyph_pipeline);
                    pass.set_bind_group(0, &state.uniform_bind_group, &[]);
                    pass.set_bind_group(1, &self.atlas_bind_group, &[]);
                    pass.set_vertex_buffer(0, vb);
                    pass.set_index_buffer(ib, wgpu::IndexFormat::Uint32);
                    pass.draw_indexed(0..overlay_glyph_count, 0, 0..1);
                }
            }
        }

        self.queue.submit(Some(encoder.finish()));
    }
}

//! GPU renderer for the terminal engine: `wgpu` for drawing, `cosmic-text`
//! for shaping and rasterizing glyphs.
//!
//! `WgpuRenderer` holds everything a pool of terminals shares — pipelines,
//! the glyph atlas, the font shaper. `TerminalRenderState` holds everything
//! specific to one terminal — its offscreen surface, its three-level render
//! cache, and the GPU buffers it feeds each frame. A pool keeps one
//! `WgpuRenderer` and one `TerminalRenderState` per open terminal.

mod atlas;
mod buffer;
mod cache;
mod font;
mod grid;
mod pipelines;
mod present;
mod shaders;
mod surface;
mod vertex;

use cosmic_text::{FontSystem, SwashCache};
use std::sync::Arc;

use atlas::GlyphAtlas;
use buffer::GrowableBuffer;
use cache::RenderCache;
use surface::SurfaceCache;
use vertex::{GlyphVertex, RectVertex};
use vterm_core::Size;

/// Hashing/cache internals exposed only so benchmarks can drive the L1/L2
/// chain directly, without spinning up a GPU device.
#[doc(hidden)]
pub mod bench_support {
    pub use crate::cache::{bench_make_row as make_row, hash_row_text, RenderCache};
}

/// Pool-shared GPU context: one per `TerminalPool`, guarded by the pool's
/// own `Arc<Mutex<_>>` the way the spec's single renderer-per-pool is meant
/// to be shared.
pub struct WgpuRenderer {
    pub(crate) rect_pipeline: wgpu::RenderPipeline,
    pub(crate) rounded_rect_pipeline: wgpu::RenderPipeline,
    pub(crate) glyph_pipeline: wgpu::RenderPipeline,

    pub(crate) uniform_bind_group_layout: wgpu::BindGroupLayout,

    pub(crate) atlas: GlyphAtlas,
    pub(crate) atlas_bind_group: wgpu::BindGroup,

    pub(crate) font_system: FontSystem,
    pub(crate) swash_cache: SwashCache,

    pub(crate) scale_factor: f32,
    pub(crate) base_font_size: f32,
    pub(crate) cached_cell_size: Size,

    /// Bumped every time the atlas is cleared and repacked (full, or an
    /// explicit font-size change). Terminals compare this against the value
    /// they cached their `RenderCache` entries under to know when those
    /// entries' baked UVs have gone stale.
    pub(crate) atlas_reset_count: u64,

    pub(crate) device: Arc<wgpu::Device>,
    pub(crate) queue: Arc<wgpu::Queue>,
}

impl WgpuRenderer {
    pub fn cell_size(&self) -> Size {
        self.cached_cell_size
    }

    pub fn atlas_reset_count(&self) -> u64 {
        self.atlas_reset_count
    }
}

/// Everything specific to one terminal's rendering: its offscreen surface,
/// its three-level render cache, and the per-frame vertex/index streams fed
/// into GPU buffers right before `present`.
///
/// The grid and overlay streams are kept separate because they're rebuilt
/// at different rates: the grid streams are mostly blits out of the L1 cache
/// (see `grid::paint_terminal`), while the overlay streams (cursor blink,
/// focused search ring) are rebuilt from scratch every frame.
pub struct TerminalRenderState {
    pub(crate) surface: SurfaceCache,
    pub(crate) cache: RenderCache,
    pub(crate) cache_atlas_generation: u64,

    pub(crate) uniform_buffer: wgpu::Buffer,
    pub(crate) uniform_bind_group: wgpu::BindGroup,
    pub(crate) last_uniform_screen: [f32; 2],

    pub(crate) grid_rect_vertices: Vec<RectVertex>,
    pub(crate) grid_rect_indices: Vec<u32>,
    pub(crate) grid_glyph_vertices: Vec<GlyphVertex>,
    pub(crate) grid_glyph_indices: Vec<u32>,

    pub(crate) overlay_rect_vertices: Vec<RectVertex>,
    pub(crate) overlay_rect_indices: Vec<u32>,
    pub(crate) overlay_glyph_vertices: Vec<GlyphVertex>,
    pub(crate) overlay_glyph_indices: Vec<u32>,

    pub(crate) grid_rect_buf: GrowableBuffer,
    pub(crate) grid_rect_idx: GrowableBuffer,
    pub(crate) grid_glyph_buf: GrowableBuffer,
    pub(crate) grid_glyph_idx: GrowableBuffer,
    pub(crate) overlay_rect_buf: GrowableBuffer,
    pub(crate) overlay_rect_idx: GrowableBuffer,
    pub(crate) overlay_glyph_buf: GrowableBuffer,
    pub(crate) overlay_glyph_idx: GrowableBuffer,
}

impl TerminalRenderState {
    pub fn surface(&self) -> &SurfaceCache {
        &self.surface
    }

    pub fn l1_len(&self) -> usize {
        self.cache.l1_len()
    }

    pub fn l2_len(&self) -> usize {
        self.cache.l2_len()
    }
}

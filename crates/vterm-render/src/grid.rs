//! Assembles a `GridView` into GPU vertices, going through the three-level
//! render cache before ever touching the glyph atlas.

use vterm_core::{AbsLine, Cell, Color, Selection, TerminalSnapshot};

use crate::buffer::GrowableBuffer;
use crate::cache::{hash_overlay, hash_row_text, BakedRow, OverlayHashInput, ShapedCell, ShapedRow};
use crate::surface::SurfaceCache;
use crate::vertex::{GlyphVertex, RectVertex};
use crate::{TerminalRenderState, WgpuRenderer};

fn vb_usage() -> wgpu::BufferUsages {
    wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST
}

fn ib_usage() -> wgpu::BufferUsages {
    wgpu::BufferUsages::INDEX | wgpu::BufferUsages::COPY_DST
}

impl WgpuRenderer {
    pub fn create_terminal_state(&self, width_px: u32, height_px: u32, format: wgpu::TextureFormat) -> TerminalRenderState {
        let uniform_buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("terminal_uniform_buffer"),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let uniform_bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("terminal_uniform_bg"),
            layout: &self.uniform_bind_group_layout,
            entries: &[wgpu::BindGroupEntry { binding: 0, resource: uniform_buffer.as_entire_binding() }],
        });

        TerminalRenderState {
            surface: SurfaceCache::new(&self.device, format, width_px, height_px),
            cache: crate::cache::RenderCache::new(),
            cache_atlas_generation: self.atlas_reset_count,
            uniform_buffer,
            uniform_bind_group,
            last_uniform_screen: [0.0, 0.0],
            grid_rect_vertices: Vec::new(),
            grid_rect_indices: Vec::new(),
            grid_glyph_vertices: Vec::new(),
            grid_glyph_indices: Vec::new(),
            overlay_rect_vertices: Vec::new(),
            overlay_rect_indices: Vec::new(),
            overlay_glyph_vertices: Vec::new(),
            overlay_glyph_indices: Vec::new(),
            grid_rect_buf: GrowableBuffer::new(vb_usage(), "grid_rect_vb"),
            grid_rect_idx: GrowableBuffer::new(ib_usage(), "grid_rect_ib"),
            grid_glyph_buf: GrowableBuffer::new(vb_usage(), "grid_glyph_vb"),
            grid_glyph_idx: GrowableBuffer::new(ib_usage(), "grid_glyph_ib"),
            overlay_rect_buf: GrowableBuffer::new(vb_usage(), "overlay_rect_vb"),
            overlay_rect_idx: GrowableBuffer::new(ib_usage(), "overlay_rect_ib"),
            overlay_glyph_buf: GrowableBuffer::new(vb_usage(), "overlay_glyph_vb"),
            overlay_glyph_idx: GrowableBuffer::new(ib_usage(), "overlay_glyph_ib"),
        }
    }

    /// Consume a terminal snapshot and leave `state`'s frame buffers ready to
    /// submit. Mirrors Algorithm R steps 5-7: resize the surface if needed,
    /// paint the grid body through L1/L2/L3, then paint the overlays that
    /// don't belong to any single cached row (cursor, focused search ring).
    pub fn paint_terminal(&mut self, state: &mut TerminalRenderState, snapshot: &TerminalSnapshot) {
        if state.surface.ensure_size(
            &self.device,
            (snapshot.view.cols as f32 * self.cached_cell_size.width * self.scale_factor) as u32,
            (snapshot.view.rows as f32 * self.cached_cell_size.height * self.scale_factor) as u32,
        ) {
            state.cache.clear();
        }

        // A font-size change resets the atlas and repacks it, so every L1/L2
        // entry's UV coordinates (baked at the old layout) are now wrong.
        if state.cache_atlas_generation != self.atlas_reset_count {
            state.cache.clear();
            state.cache_atlas_generation = self.atlas_reset_count;
        }

        state.grid_rect_vertices.clear();
        state.grid_rect_indices.clear();
        state.grid_glyph_vertices.clear();
        state.grid_glyph_indices.clear();
        state.overlay_rect_vertices.clear();
        state.overlay_rect_indices.clear();
        state.overlay_glyph_vertices.clear();
        state.overlay_glyph_indices.clear();

        let cell_w = self.cached_cell_size.width * self.scale_factor;
        let cell_h = self.cached_cell_size.height * self.scale_factor;
        let first_visible = first_visible_abs_line(snapshot);

        for row in 0..snapshot.view.rows as usize {
            let cells = snapshot.view.row(row);
            let text_hash = hash_row_text(cells);
            let abs_row = first_visible + row as u64;
            let overlay_input = overlay_hash_input_for_row(snapshot, abs_row);
            let overlay_hash = hash_overlay(&overlay_input);

            let baked = match state.cache.lookup_l1(text_hash, overlay_hash) {
                Some(baked) => baked.clone(),
                None => {
                    let shaped = match state.cache.lookup_l2(text_hash) {
                        Some(shaped) => shaped.clone(),
                        None => {
                            let shaped = self.shape_row(cells);
                            state.cache.insert_l2(text_hash, shaped.clone());
                            shaped
                        }
                    };
                    let baked = bake_row(&shaped, &overlay_input, cell_w, cell_h);
                    state.cache.insert_l1(text_hash, overlay_hash, baked.clone());
                    baked
                }
            };

            blit_row(&baked, row as f32 * cell_h, &mut state.grid_rect_vertices, &mut state.grid_rect_indices,
                &mut state.grid_glyph_vertices, &mut state.grid_glyph_indices);
        }

        state.cache.evict_if_large(4 * (snapshot.view.rows as usize).max(1));

        self.paint_cursor_overlay(state, snapshot, first_visible, cell_w, cell_h);
        self.paint_search_overlay(state, snapshot, first_visible, cell_w, cell_h);
    }

    fn shape_row(&mut self, cells: &[Cell]) -> ShapedRow {
        use vterm_core::CellFlags;
        let shaped = cells
            .iter()
            .map(|cell| {
                // INVERSE is already resolved into fg/bg by `vterm_terminal`'s
                // snapshot conversion, so only the flags that survive into
                // `Cell::flags` untouched need handling here.
                let fg = if cell.flags.contains(CellFlags::DIM) {
                    Color::new(cell.fg.r, cell.fg.g, cell.fg.b, cell.fg.a * 0.7)
                } else {
                    cell.fg
                };
                let bg = non_default_bg(cell.bg);
                let underline = cell.flags.contains(CellFlags::UNDERLINE);
                let strikeout = cell.flags.contains(CellFlags::STRIKEOUT);

                if cell.is_wide_spacer() || cell.character == ' ' || cell.character == '\0' {
                    return ShapedCell { region: None, fg, bg, underline, strikeout };
                }
                let region = self.ensure_glyph_cached(cell.character, cell.flags);
                let region = if region.width > 0 { Some(region) } else { None };
                ShapedCell { region, fg, bg, underline, strikeout }
            })
            .collect();
        ShapedRow { cells: shaped }
    }

    fn paint_cursor_overlay(&mut self, state: &mut TerminalRenderState, snapshot: &TerminalSnapshot, first_visible: AbsLine, cell_w: f32, cell_h: f32) {
        if !snapshot.cursor.visible {
            return;
        }
        let Some(row) = row_in_view(snapshot.cursor.line, first_visible, snapshot.view.rows) else {
            return;
        };
        let x = snapshot.cursor.col as f32 * cell_w;
        let y = row as f32 * cell_h;
        push_quad(&mut state.overlay_rect_vertices, &mut state.overlay_rect_indices, x, y, cell_w.max(1.0), cell_h, Color::new(0.9, 0.9, 0.95, 0.5));
    }

    fn paint_search_overlay(&mut self, state: &mut TerminalRenderState, snapshot: &TerminalSnapshot, first_visible: AbsLine, cell_w: f32, cell_h: f32) {
        let Some(idx) = snapshot.focused_match else { return };
        let Some(m) = snapshot.search_matches.get(idx) else { return };
        if m.start.line != m.end.line {
            return;
        }
        let Some(row) = row_in_view(m.start.line, first_visible, snapshot.view.rows) else {
            return;
        };
        let x = m.start.col as f32 * cell_w;
        let w = (m.end.col.saturating_sub(m.start.col)).max(1) as f32 * cell_w;
        let y = row as f32 * cell_h;
        push_quad(&mut state.overlay_rect_vertices, &mut state.overlay_rect_indices, x, y, w, cell_h, Color::new(1.0, 0.8, 0.2, 0.35));
    }
}

fn non_default_bg(bg: Color) -> Option<Color> {
    if bg == Color::BLACK {
        None
    } else {
        Some(bg)
    }
}

/// Absolute line of the topmost visible row, given the current scroll offset.
fn first_visible_abs_line(snapshot: &TerminalSnapshot) -> AbsLine {
    (snapshot.history_len as u64).saturating_sub(snapshot.display_offset as u64)
}

fn row_in_view(abs_line: AbsLine, first_visible: AbsLine, rows: u16) -> Option<usize> {
    let offset = abs_line.checked_sub(first_visible)?;
    if offset < rows as u64 {
        Some(offset as usize)
    } else {
        None
    }
}

fn overlay_hash_input_for_row(snapshot: &TerminalSnapshot, abs_row: AbsLine) -> OverlayHashInput {
    let mut input = OverlayHashInput::default();

    if snapshot.cursor.visible && snapshot.cursor.line == abs_row {
        input.cursor_col = Some(snapshot.cursor.col);
    }

    if let Some(sel) = &snapshot.selection {
        if let Some(range) = selection_cols_on_row(sel, abs_row, snapshot.view.cols) {
            input.selected_cols.push(range);
        }
    }

    for (idx, m) in snapshot.search_matches.iter().enumerate() {
        if m.start.line <= abs_row && abs_row <= m.end.line {
            input.search_cols.push((m.start.col, m.end.col, snapshot.focused_match == Some(idx)));
        }
    }

    input
}

fn selection_cols_on_row(sel: &Selection, abs_row: AbsLine, cols: u16) -> Option<(u16, u16)> {
    if abs_row < sel.start.line || abs_row > sel.end.line {
        return None;
    }
    let start_col = if abs_row == sel.start.line { sel.start.col } else { 0 };
    let end_col = if abs_row == sel.end.line { sel.end.col } else { cols };
    Some((start_col, end_col))
}

fn bake_row(shaped: &ShapedRow, overlay: &OverlayHashInput, cell_w: f32, cell_h: f32) -> BakedRow {
    let mut row = BakedRow::default();
    for (col, cell) in shaped.cells.iter().enumerate() {
        let x = col as f32 * cell_w;
        let selected = overlay.selected_cols.iter().any(|(s, e)| col as u16 >= *s && (col as u16) < *e);
        let (fg, bg) = if selected {
            (Color::BLACK, Some(Color::rgb(0.6, 0.7, 1.0)))
        } else {
            (cell.fg, cell.bg)
        };

        if let Some(bg) = bg {
            push_unindexed_quad(&mut row.rect_vertices, x, 0.0, cell_w, cell_h, bg);
        }
        let baseline_y = cell_h * 0.8;
        if let Some(region) = cell.region {
            let gx = x + region.left;
            let gy = baseline_y - region.top;
            push_unindexed_glyph(&mut row.glyph_vertices, gx, gy, region.width as f32, region.height as f32, region.uv_min, region.uv_max, fg);
        }
        if cell.underline {
            push_unindexed_quad(&mut row.rect_vertices, x, baseline_y + 1.0, cell_w, 1.0, fg);
        }
        if cell.strikeout {
            push_unindexed_quad(&mut row.rect_vertices, x, cell_h * 0.45, cell_w, 1.0, fg);
        }
    }
    row
}

pub(crate) fn push_unindexed_quad(vertices: &mut Vec<RectVertex>, x: f32, y: f32, w: f32, h: f32, color: Color) {
    let c = [color.r, color.g, color.b, color.a];
    vertices.push(RectVertex { position: [x, y], color: c });
    vertices.push(RectVertex { position: [x + w, y], color: c });
    vertices.push(RectVertex { position: [x + w, y + h], color: c });
    vertices.push(RectVertex { position: [x, y + h], color: c });
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn push_unindexed_glyph(vertices: &mut Vec<GlyphVertex>, x: f32, y: f32, w: f32, h: f32, uv_min: [f32; 2], uv_max: [f32; 2], color: Color) {
    let c = [color.r, color.g, color.b, color.a];
    vertices.push(GlyphVertex { position: [x, y], uv: [uv_min[0], uv_min[1]], color: c });
    vertices.push(GlyphVertex { position: [x + w, y], uv: [uv_max[0], uv_min[1]], color: c });
    vertices.push(GlyphVertex { position: [x + w, y + h], uv: [uv_max[0], uv_max[1]], color: c });
    vertices.push(GlyphVertex { position: [x, y + h], uv: [uv_min[0], uv_max[1]], color: c });
}

/// Push a quad plus its indices into a live overlay batch (unlike a baked
/// row, overlay quads are never blitted later, so they need indices now).
pub(crate) fn push_quad(vertices: &mut Vec<RectVertex>, indices: &mut Vec<u32>, x: f32, y: f32, w: f32, h: f32, color: Color) {
    let base = vertices.len() as u32;
    push_unindexed_quad(vertices, x, y, w, h, color);
    indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn push_glyph(vertices: &mut Vec<GlyphVertex>, indices: &mut Vec<u32>, x: f32, y: f32, w: f32, h: f32, uv_min: [f32; 2], uv_max: [f32; 2], color: Color) {
    let base = vertices.len() as u32;
    push_unindexed_glyph(vertices, x, y, w, h, uv_min, uv_max, color);
    indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

fn blit_row(
    baked: &BakedRow,
    y_offset: f32,
    out_rect_v: &mut Vec<RectVertex>,
    out_rect_i: &mut Vec<u32>,
    out_glyph_v: &mut Vec<GlyphVertex>,
    out_glyph_i: &mut Vec<u32>,
) {
    for quad in baked.rect_vertices.chunks_exact(4) {
        let base = out_rect_v.len() as u32;
        for v in quad {
            out_rect_v.push(RectVertex { position: [v.position[0], v.position[1] + y_offset], color: v.color });
        }
        out_rect_i.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    for quad in baked.glyph_vertices.chunks_exact(4) {
        let base = out_glyph_v.len() as u32;
        for v in quad {
            out_glyph_v.push(GlyphVertex { position: [v.position[0], v.position[1] + y_offset], uv: v.uv, color: v.color });
        }
        out_glyph_i.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vterm_core::{SelectionKind, SelectionPoint};

    #[test]
    fn row_in_view_offsets_from_first_visible() {
        assert_eq!(row_in_view(10, 10, 24), Some(0));
        assert_eq!(row_in_view(15, 10, 24), Some(5));
    }

    #[test]
    fn row_in_view_rejects_lines_outside_the_viewport() {
        assert_eq!(row_in_view(9, 10, 24), None); // scrolled out above
        assert_eq!(row_in_view(34, 10, 24), None); // at/past the bottom edge
    }

    #[test]
    fn first_visible_is_history_len_when_scrolled_to_bottom() {
        let snapshot = snapshot_with(100, 0, 24);
        assert_eq!(first_visible_abs_line(&snapshot), 100);
    }

    #[test]
    fn first_visible_moves_up_with_display_offset() {
        let snapshot = snapshot_with(100, 20, 24);
        assert_eq!(first_visible_abs_line(&snapshot), 80);
    }

    #[test]
    fn selection_single_line_clips_to_its_own_columns() {
        let sel = Selection {
            kind: SelectionKind::Linear,
            start: SelectionPoint { line: 5, col: 3 },
            end: SelectionPoint { line: 5, col: 10 },
        };
        assert_eq!(selection_cols_on_row(&sel, 5, 80), Some((3, 10)));
        assert_eq!(selection_cols_on_row(&sel, 4, 80), None);
        assert_eq!(selection_cols_on_row(&sel, 6, 80), None);
    }

    #[test]
    fn selection_spanning_rows_covers_full_width_on_middle_rows() {
        let sel = Selection {
            kind: SelectionKind::Linear,
            start: SelectionPoint { line: 5, col: 40 },
            end: SelectionPoint { line: 7, col: 5 },
        };
        assert_eq!(selection_cols_on_row(&sel, 5, 80), Some((40, 80)));
        assert_eq!(selection_cols_on_row(&sel, 6, 80), Some((0, 80)));
        assert_eq!(selection_cols_on_row(&sel, 7, 80), Some((0, 5)));
    }

    #[test]
    fn bake_row_paints_underline_and_strikeout_as_extra_quads() {
        let plain = ShapedRow {
            cells: vec![ShapedCell { region: None, fg: Color::WHITE, bg: None, underline: false, strikeout: false }],
        };
        let styled = ShapedRow {
            cells: vec![ShapedCell { region: None, fg: Color::WHITE, bg: None, underline: true, strikeout: true }],
        };
        let overlay = OverlayHashInput::default();

        let plain_baked = bake_row(&plain, &overlay, 8.0, 16.0);
        let styled_baked = bake_row(&styled, &overlay, 8.0, 16.0);

        assert_eq!(plain_baked.rect_vertices.len(), 0);
        // One quad (4 vertices) each for underline and strikeout.
        assert_eq!(styled_baked.rect_vertices.len(), 8);
    }

    fn snapshot_with(history_len: usize, display_offset: usize, rows: u16) -> TerminalSnapshot {
        TerminalSnapshot {
            view: vterm_core::GridView::empty(80, rows),
            cursor: vterm_core::CursorState {
                line: 0,
                col: 0,
                visible: false,
                shape: vterm_core::CursorShape::Block,
            },
            display_offset,
            history_len,
            selection: None,
            search_matches: Vec::new(),
            focused_match: None,
            title: None,
            generation: 0,
        }
    }
}

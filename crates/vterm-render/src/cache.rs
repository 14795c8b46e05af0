//! Three-level render cache for a single terminal's grid body.
//!
//! L1 holds a fully baked, row-local vertex batch keyed by (text, overlay) —
//! a hit costs one `extend_from_slice` with a y-offset, no glyph work at all.
//! L2 holds the shaped-and-colored glyph layout for a row, independent of
//! cursor/selection/search overlays, so toggling an overlay never re-shapes.
//! L3 is not a cache at all: it is the atlas lookup in `font::ensure_glyph_cached`,
//! consulted only on an L2 miss.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use vterm_core::{Cell, Color};

use crate::atlas::AtlasRegion;
use crate::vertex::{GlyphVertex, RectVertex};

/// Hash of a row's cell contents (char, colors, style flags). Changes iff
/// the grid marks the row damaged with different content.
/// Build `cols` plain-ASCII cells for benchmarking the hashing/cache paths
/// without needing a real `Terminal`.
#[doc(hidden)]
pub fn bench_make_row(cols: usize) -> Vec<Cell> {
    (0..cols)
        .map(|i| Cell {
            character: (b'a' + (i % 26) as u8) as char,
            fg: Color::WHITE,
            bg: Color::BLACK,
            flags: vterm_core::CellFlags::empty(),
            hyperlink_id: 0,
        })
        .collect()
}

pub fn hash_row_text(cells: &[Cell]) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    for cell in cells {
        cell.character.hash(&mut hasher);
        cell.flags.bits().hash(&mut hasher);
        cell.hyperlink_id.hash(&mut hasher);
        hash_color(&mut hasher, cell.fg);
        hash_color(&mut hasher, cell.bg);
    }
    hasher.finish()
}

fn hash_color(hasher: &mut impl Hasher, c: Color) {
    c.r.to_bits().hash(hasher);
    c.g.to_bits().hash(hasher);
    c.b.to_bits().hash(hasher);
    c.a.to_bits().hash(hasher);
}

/// Hash of the overlay state touching a given row: whether the cursor sits on
/// it, which columns (if any) are selected, and which search matches land on
/// it. None of this comes from the grid, so it cannot be folded into the text
/// hash above.
#[derive(Default)]
pub struct OverlayHashInput {
    pub cursor_col: Option<u16>,
    pub selected_cols: Vec<(u16, u16)>,
    pub search_cols: Vec<(u16, u16, bool)>,
}

pub fn hash_overlay(input: &OverlayHashInput) -> u64 {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    input.cursor_col.hash(&mut hasher);
    input.selected_cols.hash(&mut hasher);
    input.search_cols.hash(&mut hasher);
    hasher.finish()
}

/// L2: shaped + colored glyphs for one row, independent of overlay state.
#[derive(Clone)]
pub struct ShapedRow {
    pub cells: Vec<ShapedCell>,
}

#[derive(Clone, Copy)]
pub struct ShapedCell {
    pub region: Option<AtlasRegion>,
    pub fg: Color,
    pub bg: Option<Color>,
    pub underline: bool,
    pub strikeout: bool,
}

/// L1: a fully baked row, positioned with its top-left at (0, 0). Blitting
/// into the frame batch is a translate-and-extend, not a re-shape.
#[derive(Clone, Default)]
pub struct BakedRow {
    pub rect_vertices: Vec<RectVertex>,
    pub glyph_vertices: Vec<GlyphVertex>,
}

pub struct RenderCache {
    l1: HashMap<(u64, u64), BakedRow>,
    l2: HashMap<u64, ShapedRow>,
}

impl Default for RenderCache {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderCache {
    pub fn new() -> Self {
        Self { l1: HashMap::new(), l2: HashMap::new() }
    }

    pub fn lookup_l1(&self, text_hash: u64, overlay_hash: u64) -> Option<&BakedRow> {
        self.l1.get(&(text_hash, overlay_hash))
    }

    pub fn insert_l1(&mut self, text_hash: u64, overlay_hash: u64, row: BakedRow) {
        self.l1.insert((text_hash, overlay_hash), row);
    }

    pub fn lookup_l2(&self, text_hash: u64) -> Option<&ShapedRow> {
        self.l2.get(&text_hash)
    }

    pub fn insert_l2(&mut self, text_hash: u64, row: ShapedRow) {
        self.l2.insert(text_hash, row);
    }

    /// Row content changed: drop every cache entry keyed by the old text hash.
    /// Cheap and correct without tracking hash->row membership, since a stale
    /// entry simply stops being looked up and is reclaimed the next time the
    /// map grows past its capacity-driven eviction (see `evict_if_large`).
    pub fn evict_if_large(&mut self, max_entries: usize) {
        if self.l1.len() > max_entries {
            self.l1.clear();
        }
        if self.l2.len() > max_entries {
            self.l2.clear();
        }
    }

    pub fn clear(&mut self) {
        self.l1.clear();
        self.l2.clear();
    }

    pub fn l1_len(&self) -> usize {
        self.l1.len()
    }

    pub fn l2_len(&self) -> usize {
        self.l2.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vterm_core::CellFlags;

    fn cell(ch: char) -> Cell {
        Cell { character: ch, fg: Color::WHITE, bg: Color::BLACK, flags: CellFlags::empty(), hyperlink_id: 0 }
    }

    #[test]
    fn row_text_hash_is_stable_for_identical_rows() {
        let a = vec![cell('a'), cell('b'), cell('c')];
        let b = vec![cell('a'), cell('b'), cell('c')];
        assert_eq!(hash_row_text(&a), hash_row_text(&b));
    }

    #[test]
    fn row_text_hash_changes_with_content() {
        let a = vec![cell('a'), cell('b')];
        let b = vec![cell('a'), cell('x')];
        assert_ne!(hash_row_text(&a), hash_row_text(&b));
    }

    #[test]
    fn row_text_hash_ignores_overlay_state() {
        // Same cells, but a differing OverlayHashInput must not affect the L2 key.
        let row = vec![cell('a'), cell('b')];
        let h1 = hash_row_text(&row);
        let h2 = hash_row_text(&row);
        assert_eq!(h1, h2);

        let mut overlay_a = OverlayHashInput::default();
        overlay_a.cursor_col = Some(0);
        let overlay_b = OverlayHashInput::default();
        assert_ne!(hash_overlay(&overlay_a), hash_overlay(&overlay_b));
    }

    #[test]
    fn l1_lookup_misses_until_inserted() {
        let mut cache = RenderCache::new();
        assert!(cache.lookup_l1(1, 2).is_none());
        cache.insert_l1(1, 2, BakedRow::default());
        assert!(cache.lookup_l1(1, 2).is_some());
        // A different overlay hash for the same text is a distinct L1 entry.
        assert!(cache.lookup_l1(1, 3).is_none());
    }

    #[test]
    fn l2_is_keyed_by_text_only() {
        let mut cache = RenderCache::new();
        cache.insert_l2(42, ShapedRow { cells: Vec::new() });
        assert!(cache.lookup_l2(42).is_some());
        assert_eq!(cache.l2_len(), 1);
    }

    #[test]
    fn evict_if_large_clears_past_the_threshold() {
        let mut cache = RenderCache::new();
        for i in 0..5 {
            cache.insert_l1(i, 0, BakedRow::default());
        }
        assert_eq!(cache.l1_len(), 5);
        cache.evict_if_large(4);
        assert_eq!(cache.l1_len(), 0);
    }

    #[test]
    fn clear_drops_both_tiers() {
        let mut cache = RenderCache::new();
        cache.insert_l1(1, 1, BakedRow::default());
        cache.insert_l2(1, ShapedRow { cells: Vec::new() });
        cache.clear();
        assert_eq!(cache.l1_len(), 0);
        assert_eq!(cache.l2_len(), 0);
    }
}

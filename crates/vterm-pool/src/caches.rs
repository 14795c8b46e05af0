//! Lock-free snapshot slots a host can poll without ever touching a
//! terminal's `Mutex`. Written once per render tick, from the render path,
//! after `try_snapshot()` has already taken (and released) the lock.
//!
//! The source hazards this is designed around (see the spec's design notes):
//! a valid-bit folded into a packed coordinate's high word can be masked away
//! by the coordinate itself, and `total_lines`/`scrollback_size` packed into
//! `u16` truncate past 65k lines. Both are avoided here by giving every field
//! its own atomic instead of bit-packing tuples into a shared word.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use vterm_core::{CursorShape, SelectionKind, TerminalSnapshot};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CursorInfo {
    pub line: u64,
    pub col: u16,
    pub display_offset: u64,
    pub visible: bool,
    pub shape: CursorShape,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionRange {
    pub kind: SelectionKind,
    pub start_line: u64,
    pub start_col: u16,
    pub end_line: u64,
    pub end_col: u16,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollInfo {
    pub display_offset: u64,
    pub scrollback_size: u64,
    pub total_lines: u64,
}

fn shape_to_u8(shape: CursorShape) -> u8 {
    match shape {
        CursorShape::Block => 0,
        CursorShape::Beam => 1,
        CursorShape::Underline => 2,
    }
}

fn shape_from_u8(bits: u8) -> CursorShape {
    match bits {
        1 => CursorShape::Beam,
        2 => CursorShape::Underline,
        _ => CursorShape::Block,
    }
}

fn selection_kind_to_u8(kind: SelectionKind) -> u8 {
    match kind {
        SelectionKind::Linear => 0,
        SelectionKind::Block => 1,
        SelectionKind::SemanticWord => 2,
    }
}

fn selection_kind_from_u8(bits: u8) -> SelectionKind {
    match bits {
        1 => SelectionKind::Block,
        2 => SelectionKind::SemanticWord,
        _ => SelectionKind::Linear,
    }
}

pub struct AtomicCaches {
    has_snapshot: AtomicBool,

    cursor_line: AtomicU64,
    cursor_col: AtomicU32,
    cursor_display_offset: AtomicU64,
    cursor_visible: AtomicBool,
    cursor_shape: AtomicU8,

    selection_valid: AtomicBool,
    selection_kind: AtomicU8,
    selection_start_line: AtomicU64,
    selection_start_col: AtomicU32,
    selection_end_line: AtomicU64,
    selection_end_col: AtomicU32,

    scrollback_size: AtomicU64,
    total_lines: AtomicU64,

    dirty: AtomicBool,
    title: ArcSwapOption<str>,
}

impl Default for AtomicCaches {
    fn default() -> Self {
        Self::new()
    }
}

impl AtomicCaches {
    pub fn new() -> Self {
        Self {
            has_snapshot: AtomicBool::new(false),
            cursor_line: AtomicU64::new(0),
            cursor_col: AtomicU32::new(0),
            cursor_display_offset: AtomicU64::new(0),
            cursor_visible: AtomicBool::new(false),
            cursor_shape: AtomicU8::new(0),
            selection_valid: AtomicBool::new(false),
            selection_kind: AtomicU8::new(0),
            selection_start_line: AtomicU64::new(0),
            selection_start_col: AtomicU32::new(0),
            selection_end_line: AtomicU64::new(0),
            selection_end_col: AtomicU32::new(0),
            scrollback_size: AtomicU64::new(0),
            total_lines: AtomicU64::new(0),
            dirty: AtomicBool::new(false),
            title: ArcSwapOption::empty(),
        }
    }

    /// Single writer: the render path, once per tick, after it has taken and
    /// released the terminal's lock for `try_snapshot()`. Every store uses
    /// `Release` so a reader's matching `Acquire` load sees a fully-formed
    /// tuple, never a half-written one.
    pub fn write_snapshot(&self, snapshot: &TerminalSnapshot) {
        self.cursor_line.store(snapshot.cursor.line, Ordering::Relaxed);
        self.cursor_col.store(snapshot.cursor.col as u32, Ordering::Relaxed);
        self.cursor_display_offset.store(snapshot.display_offset as u64, Ordering::Relaxed);
        self.cursor_visible.store(snapshot.cursor.visible, Ordering::Relaxed);
        self.cursor_shape.store(shape_to_u8(snapshot.cursor.shape), Ordering::Relaxed);

        match &snapshot.selection {
            Some(sel) => {
                self.selection_kind.store(selection_kind_to_u8(sel.kind), Ordering::Relaxed);
                self.selection_start_line.store(sel.start.line, Ordering::Relaxed);
                self.selection_start_col.store(sel.start.col as u32, Ordering::Relaxed);
                self.selection_end_line.store(sel.end.line, Ordering::Relaxed);
                self.selection_end_col.store(sel.end.col as u32, Ordering::Relaxed);
                self.selection_valid.store(true, Ordering::Release);
            }
            None => self.selection_valid.store(false, Ordering::Release),
        }

        let scrollback_size = snapshot.history_len as u64;
        let total_lines = snapshot.history_len as u64 + snapshot.view.rows as u64;
        self.scrollback_size.store(scrollback_size, Ordering::Relaxed);
        self.total_lines.store(total_lines, Ordering::Relaxed);

        if let Some(title) = &snapshot.title {
            self.title.store(Some(Arc::from(title.as_str())));
        }

        self.has_snapshot.store(true, Ordering::Release);
    }

    pub fn cursor(&self) -> Option<CursorInfo> {
        if !self.has_snapshot.load(Ordering::Acquire) {
            return None;
        }
        Some(CursorInfo {
            line: self.cursor_line.load(Ordering::Relaxed),
            col: self.cursor_col.load(Ordering::Relaxed) as u16,
            display_offset: self.cursor_display_offset.load(Ordering::Relaxed),
            visible: self.cursor_visible.load(Ordering::Relaxed),
            shape: shape_from_u8(self.cursor_shape.load(Ordering::Relaxed)),
        })
    }

    pub fn selection(&self) -> Option<SelectionRange> {
        if !self.selection_valid.load(Ordering::Acquire) {
            return None;
        }
        Some(SelectionRange {
            kind: selection_kind_from_u8(self.selection_kind.load(Ordering::Relaxed)),
            start_line: self.selection_start_line.load(Ordering::Relaxed),
            start_col: self.selection_start_col.load(Ordering::Relaxed) as u16,
            end_line: self.selection_end_line.load(Ordering::Relaxed),
            end_col: self.selection_end_col.load(Ordering::Relaxed) as u16,
        })
    }

    pub fn scroll_info(&self) -> Option<ScrollInfo> {
        if !self.has_snapshot.load(Ordering::Acquire) {
            return None;
        }
        Some(ScrollInfo {
            display_offset: self.cursor_display_offset.load(Ordering::Relaxed),
            scrollback_size: self.scrollback_size.load(Ordering::Relaxed),
            total_lines: self.total_lines.load(Ordering::Relaxed),
        })
    }

    pub fn title(&self) -> Option<Arc<str>> {
        self.title.load_full()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vterm_core::{CursorState, GridView};

    fn snapshot(line: u64, display_offset: usize, history_len: usize) -> TerminalSnapshot {
        TerminalSnapshot {
            view: GridView::empty(80, 24),
            cursor: CursorState { line, col: 4, visible: true, shape: CursorShape::Beam },
            display_offset,
            history_len,
            selection: None,
            search_matches: Vec::new(),
            focused_match: None,
            title: Some("zsh".to_string()),
            generation: 1,
        }
    }

    #[test]
    fn queries_return_none_before_first_write() {
        let caches = AtomicCaches::new();
        assert!(caches.cursor().is_none());
        assert!(caches.scroll_info().is_none());
        assert!(caches.selection().is_none());
    }

    #[test]
    fn cursor_round_trips_through_disjoint_atomics() {
        let caches = AtomicCaches::new();
        caches.write_snapshot(&snapshot(42, 3, 1000));
        let cursor = caches.cursor().expect("snapshot written");
        assert_eq!(cursor.line, 42);
        assert_eq!(cursor.col, 4);
        assert_eq!(cursor.shape, CursorShape::Beam);
        assert!(cursor.visible);
    }

    #[test]
    fn scroll_info_uses_full_width_counters_past_u16_range() {
        let caches = AtomicCaches::new();
        // A scrollback size that would truncate if packed into a u16.
        caches.write_snapshot(&snapshot(0, 0, 100_000));
        let info = caches.scroll_info().expect("snapshot written");
        assert_eq!(info.scrollback_size, 100_000);
        assert_eq!(info.total_lines, 100_024);
    }

    #[test]
    fn title_is_shared_without_a_lock() {
        let caches = AtomicCaches::new();
        assert!(caches.title().is_none());
        caches.write_snapshot(&snapshot(0, 0, 0));
        assert_eq!(caches.title().as_deref(), Some("zsh"));
    }
}

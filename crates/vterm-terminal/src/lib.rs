// PTY lifecycle and ANSI state machine for a single terminal.
//
// State capture is synchronous: a render tick calls `try_snapshot`, which
// takes the `Term` mutex once, copies and diffs the cells it needs against
// the previous frame, and releases the lock before any rendering work
// begins. There is no separate grid-sync thread — `vterm-pool`'s
// `render_terminal` is the only intended caller of `try_snapshot`, once per
// tick per terminal.

use std::borrow::Cow;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

use alacritty_terminal::event::{Event, EventListener, WindowSize};
use alacritty_terminal::event_loop::{EventLoop, Msg, Notifier};
use alacritty_terminal::grid::{Dimensions, Scroll};
use alacritty_terminal::index::{Column, Direction, Line, Point, Side};
use alacritty_terminal::selection::{Selection as AlacSelection, SelectionType};
use alacritty_terminal::sync::FairMutex;
use alacritty_terminal::term::cell::Flags as AlacCellFlags;
use alacritty_terminal::term::search::RegexSearch;
use alacritty_terminal::term::{Config as TermConfig, Term, TermMode};
use alacritty_terminal::tty;
use alacritty_terminal::vte::ansi::{Color as AnsiColor, NamedColor, Rgb as AnsiRgb};

mod color;

pub use color::PaletteOverrides;

use vterm_core::{
    Cell, CellFlags, CursorShape, CursorState, GridView, MatchRange, Selection, SelectionKind,
    SelectionPoint, TerminalError, TerminalEvent, TerminalSnapshot,
};

/// Number of scrollback history lines to keep.
const SCROLLBACK_LINES: usize = 10_000;

/// Implements alacritty_terminal's `Dimensions` trait for a fixed cols/rows pair.
struct TermDimensions {
    cols: usize,
    rows: usize,
}

impl TermDimensions {
    fn new(cols: usize, rows: usize) -> Self {
        Self { cols, rows }
    }
}

impl Dimensions for TermDimensions {
    fn columns(&self) -> usize {
        self.cols
    }

    fn screen_lines(&self) -> usize {
        self.rows
    }

    fn total_lines(&self) -> usize {
        self.rows + SCROLLBACK_LINES
    }
}

/// Convert a storage-space `Line` (0 = top of history, negative impossible —
/// alacritty's own `Line` goes negative into scrollback) into an absolute
/// line counted from the oldest retained row.
fn abs_line(history_len: usize, line: Line) -> u64 {
    (history_len as i64 + line.0 as i64).max(0) as u64
}

fn to_alac_line(history_len: usize, abs: u64) -> Line {
    Line(abs as i64 as i32 - history_len as i32)
}

// ──────────────────────────────────────────────
// Event listener (PTY thread → dirty flag + event queue)
// ──────────────────────────────────────────────

#[derive(Clone)]
struct TermEventListener {
    dirty: Arc<AtomicBool>,
    pty_writer: Arc<Mutex<Option<Notifier>>>,
    title: Arc<Mutex<Option<String>>>,
    pending_events: Arc<Mutex<Vec<TerminalEvent>>>,
}

impl EventListener for TermEventListener {
    fn send_event(&self, event: Event) {
        match event {
            Event::PtyWrite(text) => {
                if let Ok(guard) = self.pty_writer.lock() {
                    if let Some(notifier) = guard.as_ref() {
                        let _ = notifier.0.send(Msg::Input(Cow::Owned(text.into_bytes())));
                    }
                }
            }
            Event::Title(title) => {
                if let Ok(mut guard) = self.title.lock() {
                    *guard = Some(title.clone());
                }
                if let Ok(mut events) = self.pending_events.lock() {
                    events.push(TerminalEvent::TitleChanged(title));
                }
            }
            Event::ResetTitle => {
                if let Ok(mut guard) = self.title.lock() {
                    *guard = None;
                }
            }
            Event::Bell => {
                if let Ok(mut events) = self.pending_events.lock() {
                    events.push(TerminalEvent::Bell);
                }
            }
            _ => {}
        }
        self.dirty.store(true, Ordering::Relaxed);
    }
}

// ──────────────────────────────────────────────
// Terminal
// ──────────────────────────────────────────────

/// A single PTY-backed terminal: shell process, ANSI state machine, and the
/// damage-tracked grid a render tick pulls a snapshot from.
pub struct Terminal {
    term: Arc<FairMutex<Term<TermEventListener>>>,
    notifier: Notifier,
    child_pid: Option<u32>,
    current_dir: Option<PathBuf>,
    cols: u16,
    rows: u16,

    dirty: Arc<AtomicBool>,
    title: Arc<Mutex<Option<String>>>,
    pending_events: Arc<Mutex<Vec<TerminalEvent>>>,
    exited: Option<i32>,

    // Persisted viewport-sized view, mutated in place so only changed cells
    // pay the color-conversion cost each tick; cloned out on `try_snapshot`.
    view: GridView,
    generation: u64,
    raw_buf: Vec<(char, AnsiColor, AnsiColor, AlacCellFlags)>,
    prev_raw_buf: Vec<(char, AnsiColor, AnsiColor, AlacCellFlags)>,
    palette_buf: [Option<AnsiRgb>; 256],
    palette_overrides: crate::color::PaletteOverrides,

    dark_mode: Arc<AtomicBool>,
    dark_mode_changed: Arc<AtomicBool>,
    stay_at_bottom: Arc<AtomicBool>,

    url_ranges: Vec<Vec<(usize, usize)>>,
    url_row_buf: String,
    last_url_detect: Instant,

    selection_kind: Option<SelectionKind>,
    search: SearchState,

    pending_pty_resize: Option<(WindowSize, Instant)>,
}

#[derive(Default)]
struct SearchState {
    regex: Option<RegexSearch>,
    matches: Vec<MatchRange>,
    focused: Option<usize>,
}

impl Terminal {
    pub fn new(cols: u16, rows: u16) -> Result<Self, TerminalError> {
        Self::with_cwd(cols, rows, None, true, PaletteOverrides::default())
    }

    pub fn with_cwd(
        cols: u16,
        rows: u16,
        cwd: Option<PathBuf>,
        dark_mode: bool,
        palette_overrides: PaletteOverrides,
    ) -> Result<Self, TerminalError> {
        let cell_width = 8;
        let cell_height = 16;

        let window_size = WindowSize {
            num_cols: cols,
            num_lines: rows,
            cell_width,
            cell_height,
        };

        let term_size = TermDimensions::new(cols as usize, rows as usize);

        let dirty = Arc::new(AtomicBool::new(true));
        let pty_writer = Arc::new(Mutex::new(None));
        let title = Arc::new(Mutex::new(None));
        let pending_events = Arc::new(Mutex::new(Vec::new()));
        let listener = TermEventListener {
            dirty: dirty.clone(),
            pty_writer: pty_writer.clone(),
            title: title.clone(),
            pending_events: pending_events.clone(),
        };

        let config = TermConfig::default();
        let term = Term::new(config, &term_size, listener.clone());
        let term = Arc::new(FairMutex::new(term));

        let shell = Self::detect_shell();
        let working_directory = cwd.or_else(|| std::env::var("HOME").ok().map(PathBuf::from));
        let mut env = std::collections::HashMap::new();
        env.insert(String::from("TERM"), String::from("xterm-256color"));
        env.insert(String::from("COLORTERM"), String::from("truecolor"));
        env.insert(String::from("PROMPT_EOL_MARK"), String::new());
        if dark_mode {
            env.insert(String::from("COLORFGBG"), String::from("15;0"));
        } else {
            env.insert(String::from("COLORFGBG"), String::from("0;15"));
        }
        let pty_config = tty::Options {
            shell: Some(tty::Shell::new(shell, vec![String::from("--login")])),
            working_directory,
            env,
            ..tty::Options::default()
        };

        let pty = tty::new(&pty_config, window_size, 0).map_err(TerminalError::SpawnFailed)?;
        let child_pid = pty.child().id();

        let event_loop = EventLoop::new(term.clone(), listener, pty, false, false)
            .map_err(TerminalError::SpawnFailed)?;
        let notifier = Notifier(event_loop.channel());
        if let Ok(mut guard) = pty_writer.lock() {
            *guard = Some(Notifier(event_loop.channel()));
        }
        event_loop.spawn();

        Ok(Terminal {
            term,
            notifier,
            child_pid: Some(child_pid),
            current_dir: None,
            cols,
            rows,
            dirty,
            title,
            pending_events,
            exited: None,
            view: GridView::empty(cols, rows),
            generation: 0,
            raw_buf: Vec::new(),
            prev_raw_buf: Vec::new(),
            palette_buf: [None; 256],
            palette_overrides,
            dark_mode: Arc::new(AtomicBool::new(dark_mode)),
            dark_mode_changed: Arc::new(AtomicBool::new(false)),
            stay_at_bottom: Arc::new(AtomicBool::new(false)),
            url_ranges: Vec::new(),
            url_row_buf: String::new(),
            last_url_detect: Instant::now(),
            selection_kind: None,
            search: SearchState::default(),
            pending_pty_resize: None,
        })
    }

    fn detect_shell() -> String {
        std::env::var("SHELL").unwrap_or_else(|_| {
            if std::path::Path::new("/bin/zsh").exists() {
                "/bin/zsh".to_string()
            } else {
                "/bin/bash".to_string()
            }
        })
    }

    /// Detect the CWD of the child process using native OS APIs (no subprocess).
    #[cfg(target_os = "macos")]
    pub fn detect_cwd_fallback(&self) -> Option<PathBuf> {
        let pid = self.child_pid? as i32;

        const PROC_PIDVNODEPATHINFO: i32 = 9;
        const BUF_SIZE: usize = 2352;
        const PATH_OFFSET: usize = 152;
        const MAXPATHLEN: usize = 1024;

        let mut buf = [0u8; BUF_SIZE];
        let ret = unsafe {
            libc::proc_pidinfo(
                pid,
                PROC_PIDVNODEPATHINFO,
                0,
                buf.as_mut_ptr() as *mut libc::c_void,
                BUF_SIZE as i32,
            )
        };

        if ret <= 0 {
            return None;
        }

        let path_bytes = &buf[PATH_OFFSET..PATH_OFFSET + MAXPATHLEN];
        let len = path_bytes.iter().position(|&b| b == 0).unwrap_or(0);
        if len == 0 {
            return None;
        }

        let path = std::str::from_utf8(&path_bytes[..len]).ok()?;
        let p = PathBuf::from(path);
        if p.is_dir() {
            Some(p)
        } else {
            None
        }
    }

    #[cfg(not(target_os = "macos"))]
    pub fn detect_cwd_fallback(&self) -> Option<PathBuf> {
        let pid = self.child_pid?;
        std::fs::read_link(format!("/proc/{pid}/cwd")).ok()
    }

    pub fn refresh_cwd(&mut self) {
        self.current_dir = self.detect_cwd_fallback();
    }

    pub fn cwd(&self) -> Option<PathBuf> {
        self.current_dir.clone()
    }

    pub fn child_pid(&self) -> Option<u32> {
        self.child_pid
    }

    pub fn write(&mut self, data: &[u8]) -> Result<(), TerminalError> {
        if self.exited.is_some() {
            return Err(TerminalError::WriteClosed);
        }
        self.notifier
            .0
            .send(Msg::Input(Cow::Owned(data.to_vec())))
            .map_err(|_| TerminalError::WriteClosed)
    }

    /// Drain events raised since the last call (title changes, bell, exit)
    /// and poll for child-process exit via a non-blocking `waitpid`.
    pub fn drain_events(&mut self) -> Vec<TerminalEvent> {
        let mut events = self
            .pending_events
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default();

        if self.exited.is_none() {
            if let Some(pid) = self.child_pid {
                let mut status = 0i32;
                let ret = unsafe { libc::waitpid(pid as i32, &mut status, libc::WNOHANG) };
                if ret == pid as i32 {
                    let code = if libc::WIFEXITED(status) {
                        libc::WEXITSTATUS(status)
                    } else {
                        -1
                    };
                    self.exited = Some(code);
                    events.push(TerminalEvent::Exited { code });
                }
            }
        }

        events
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Relaxed)
    }

    /// A clone of the dirty flag shared with the PTY event listener, so a
    /// pool can check it before ever locking this terminal behind its own
    /// `Mutex` (Algorithm R step 2's no-op-render fast path).
    pub fn dirty_flag(&self) -> Arc<AtomicBool> {
        self.dirty.clone()
    }

    pub fn title(&self) -> Option<String> {
        self.title.lock().ok().and_then(|g| g.clone())
    }

    pub fn hyperlink_ranges(&self) -> &[Vec<(usize, usize)>] {
        &self.url_ranges
    }

    pub fn set_dark_mode(&mut self, dark: bool) {
        if self.dark_mode.load(Ordering::Relaxed) != dark {
            self.dark_mode.store(dark, Ordering::Relaxed);
            self.dark_mode_changed.store(true, Ordering::Relaxed);
            self.dirty.store(true, Ordering::Relaxed);
        }
    }

    pub fn request_scroll_to_bottom(&mut self) {
        self.stay_at_bottom.store(true, Ordering::Relaxed);
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn scroll_display(&mut self, delta: i32) {
        self.stay_at_bottom.store(false, Ordering::Relaxed);
        let mut term = self.term.lock();
        let old_offset = term.grid().display_offset();
        term.scroll_display(Scroll::Delta(delta));
        let new_offset = term.grid().display_offset();
        drop(term);
        if old_offset != new_offset {
            self.dirty.store(true, Ordering::Relaxed);
        }
    }

    pub fn display_offset(&self) -> usize {
        self.term.lock().grid().display_offset()
    }

    pub fn history_size(&self) -> usize {
        self.term.lock().grid().history_size()
    }

    pub fn is_bracketed_paste_mode(&self) -> bool {
        self.term.lock().mode().contains(TermMode::BRACKETED_PASTE)
    }

    pub fn is_alt_screen(&self) -> bool {
        self.term.lock().mode().contains(TermMode::ALT_SCREEN)
    }

    pub fn is_app_cursor_keys(&self) -> bool {
        self.term.lock().mode().contains(TermMode::APP_CURSOR)
    }

    pub fn is_mouse_reporting(&self) -> bool {
        let mode = self.term.lock().mode().clone();
        mode.intersects(TermMode::MOUSE_REPORT_CLICK | TermMode::MOUSE_MOTION | TermMode::MOUSE_DRAG)
    }

    // ── Selection ──

    pub fn start_selection(&mut self, kind: SelectionKind, line: u64, col: u16, side_right: bool) {
        let ty = match kind {
            SelectionKind::Linear => SelectionType::Simple,
            SelectionKind::Block => SelectionType::Block,
            SelectionKind::SemanticWord => SelectionType::Semantic,
        };
        let mut term = self.term.lock();
        let history_len = term.grid().history_size();
        let point = Point::new(to_alac_line(history_len, line), Column(col as usize));
        let side = if side_right { Side::Right } else { Side::Left };
        term.selection = Some(AlacSelection::new(ty, point, side));
        drop(term);
        self.selection_kind = Some(kind);
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn update_selection(&mut self, line: u64, col: u16, side_right: bool) {
        let mut term = self.term.lock();
        let history_len = term.grid().history_size();
        let point = Point::new(to_alac_line(history_len, line), Column(col as usize));
        let side = if side_right { Side::Right } else { Side::Left };
        if let Some(sel) = term.selection.as_mut() {
            sel.update(point, side);
        }
        drop(term);
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn clear_selection(&mut self) {
        self.term.lock().selection = None;
        self.selection_kind = None;
        self.dirty.store(true, Ordering::Relaxed);
    }

    pub fn selection_text(&self) -> Option<String> {
        self.term.lock().selection_to_string()
    }

    fn snapshot_selection(&self, term: &Term<TermEventListener>, history_len: usize) -> Option<Selection> {
        let kind = self.selection_kind?;
        let range = term.selection.as_ref()?.to_range(term)?;
        Some(Selection {
            kind,
            start: SelectionPoint {
                line: abs_line(history_len, range.start.line),
                col: range.start.column.0 as u16,
            },
            end: SelectionPoint {
                line: abs_line(history_len, range.end.line),
                col: range.end.column.0 as u16,
            },
        })
    }

    // ── Search ──

    pub fn search_set(&mut self, pattern: &str) -> Result<(), TerminalError> {
        let mut regex = RegexSearch::new(pattern)
            .map_err(|e| TerminalError::InvalidPattern(format!("{e:?}")))?;

        let term = self.term.lock();
        let history_len = term.grid().history_size();
        let mut matches = Vec::new();
        let mut point = Point::new(to_alac_line(history_len, 0), Column(0));

        // Scrollback can be large; cap the number of matches collected in one
        // pass so a pathological pattern (matching every line) can't spin.
        const MAX_MATCHES: usize = 10_000;
        while matches.len() < MAX_MATCHES {
            match term.search_next(&mut regex, point, Direction::Right, Side::Left, None) {
                Some(m) => {
                    matches.push(MatchRange {
                        start: SelectionPoint {
                            line: abs_line(history_len, m.start().line),
                            col: m.start().column.0 as u16,
                        },
                        end: SelectionPoint {
                            line: abs_line(history_len, m.end().line),
                            col: m.end().column.0 as u16,
                        },
                    });
                    let mut next = *m.end();
                    next.column.0 += 1;
                    point = next;
                }
                None => break,
            }
        }
        drop(term);

        self.search = SearchState {
            regex: Some(regex),
            focused: if matches.is_empty() { None } else { Some(0) },
            matches,
        };
        self.dirty.store(true, Ordering::Relaxed);
        Ok(())
    }

    pub fn search_next(&mut self) -> Option<MatchRange> {
        if self.search.matches.is_empty() {
            return None;
        }
        let next = self.search.focused.map(|i| (i + 1) % self.search.matches.len()).unwrap_or(0);
        self.search.focused = Some(next);
        self.dirty.store(true, Ordering::Relaxed);
        self.search.matches.get(next).copied()
    }

    pub fn search_prev(&mut self) -> Option<MatchRange> {
        if self.search.matches.is_empty() {
            return None;
        }
        let len = self.search.matches.len();
        let prev = self.search.focused.map(|i| (i + len - 1) % len).unwrap_or(0);
        self.search.focused = Some(prev);
        self.dirty.store(true, Ordering::Relaxed);
        self.search.matches.get(prev).copied()
    }

    pub fn search_clear(&mut self) {
        self.search = SearchState::default();
        self.dirty.store(true, Ordering::Relaxed);
    }

    // ── Resize ──

    pub fn resize(&mut self, cols: u16, rows: u16) -> Result<(), TerminalError> {
        if cols == 0 || rows == 0 {
            return Err(TerminalError::InvalidDimensions { cols, rows });
        }
        // Clamp to sane maximums to prevent catastrophic allocation
        // (e.g. 65535x65535 grid is close to 100GB of cells).
        let cols = cols.min(1000);
        let rows = rows.min(500);
        if self.cols == cols && self.rows == rows {
            return Ok(());
        }
        self.cols = cols;
        self.rows = rows;

        let cell_width = 8;
        let cell_height = 16;
        let window_size = WindowSize {
            num_cols: cols,
            num_lines: rows,
            cell_width,
            cell_height,
        };
        let term_size = TermDimensions::new(cols as usize, rows as usize);

        let (history_len, display_offset) = {
            let mut term = self.term.lock();
            term.resize(term_size);
            let grid = term.grid();
            (grid.history_size(), grid.display_offset())
        };

        // The grid has already reflowed synchronously above; every row of
        // the new view is therefore stale until the next snapshot repaints
        // it, so announce all of them rather than waiting to diff cells.
        if let Ok(mut events) = self.pending_events.lock() {
            for row in 0..rows as i32 {
                let line = abs_line(history_len, Line(row - display_offset as i32));
                events.push(TerminalEvent::Damaged { line });
            }
        }

        // Debounce the PTY resize notification (SIGWINCH) to avoid prompt
        // redraw artifacts during interactive drag-resize.
        self.pending_pty_resize = Some((window_size, Instant::now()));
        self.dirty.store(true, Ordering::Relaxed);
        Ok(())
    }

    /// Flush a debounced PTY resize if its delay has elapsed. Called once per
    /// tick by the pool alongside `drain_events`/`try_snapshot`.
    pub fn flush_pending_resize(&mut self) {
        if let Some((window_size, stamp)) = self.pending_pty_resize {
            if stamp.elapsed().as_millis() >= 50 {
                self.pending_pty_resize = None;
                let _ = self.notifier.0.send(Msg::Resize(window_size));
            }
        }
    }

    // ── Snapshot ──

    /// Returns a fresh snapshot if the terminal has changed since the last
    /// call, or `None` if nothing is dirty. Clears the dirty flag *before*
    /// doing the (potentially slow) diff/convert work: any event arriving
    /// while this call is in flight re-sets the flag for the caller's next
    /// tick instead of being silently dropped.
    pub fn try_snapshot(&mut self) -> Option<TerminalSnapshot> {
        if !self.dirty.swap(false, Ordering::AcqRel) {
            return None;
        }

        if self.dark_mode_changed.swap(false, Ordering::Relaxed) {
            self.prev_raw_buf.clear();
        }

        let dark_mode = self.dark_mode.load(Ordering::Relaxed);
        let stay_at_bottom = self.stay_at_bottom.load(Ordering::Relaxed);

        let (cols, total_lines, history_len, display_offset, cursor, selection) = {
            let mut term = self.term.lock();
            if stay_at_bottom {
                term.scroll_display(Scroll::Bottom);
            }

            let grid = term.grid();
            let cols = grid.columns();
            let total_lines = grid.screen_lines();
            let display_offset = grid.display_offset();
            let history_len = grid.history_size();
            let total_cells = cols * total_lines;

            let colors = term.colors();
            for i in 0..256 {
                self.palette_buf[i] = colors[i];
            }

            self.raw_buf.resize(
                total_cells,
                (
                    ' ',
                    AnsiColor::Named(NamedColor::Foreground),
                    AnsiColor::Named(NamedColor::Background),
                    AlacCellFlags::empty(),
                ),
            );
            for line_idx in 0..total_lines {
                let line = Line(line_idx as i32 - display_offset as i32);
                let base = line_idx * cols;
                for col_idx in 0..cols {
                    let point = Point::new(line, Column(col_idx));
                    let cell = &grid[point];
                    self.raw_buf[base + col_idx] = (cell.c, cell.fg, cell.bg, cell.flags);
                }
            }

            let cursor_point = grid.cursor.point;
            let cursor_shape = match term.cursor_style().shape {
                alacritty_terminal::vte::ansi::CursorShape::Block => CursorShape::Block,
                alacritty_terminal::vte::ansi::CursorShape::Beam => CursorShape::Beam,
                alacritty_terminal::vte::ansi::CursorShape::Underline => CursorShape::Underline,
                _ => CursorShape::Block,
            };
            let cursor_visible = term.mode().contains(TermMode::SHOW_CURSOR);
            let cursor = CursorState {
                line: abs_line(history_len, cursor_point.line),
                col: cursor_point.column.0 as u16,
                visible: cursor_visible,
                shape: cursor_shape,
            };

            let selection = self.snapshot_selection(&term, history_len);

            (cols, total_lines, history_len, display_offset, cursor, selection)
        }; // Term lock released here.

        if self.view.cols as usize != cols || self.view.rows as usize != total_lines {
            self.view = GridView::empty(cols as u16, total_lines as u16);
            self.prev_raw_buf.clear();
        }

        let total_cells = cols * total_lines;
        let same_size = self.prev_raw_buf.len() == total_cells;
        let mut any_changed = false;
        let mut inverse_cursor: Option<(usize, usize)> = None;

        for idx in (0..total_cells).rev() {
            let flags = self.raw_buf[idx].3;
            if flags.contains(AlacCellFlags::INVERSE) && !flags.contains(AlacCellFlags::WIDE_CHAR_SPACER) {
                inverse_cursor = Some((idx / cols, idx % cols));
                break;
            }
        }

        // TUI apps (e.g. Ink-based CLIs) draw their own cursor as an INVERSE
        // cell while hiding the terminal's real cursor — fall back to it.
        let mut cursor = cursor;
        if !cursor.visible {
            if let Some((row, col)) = inverse_cursor {
                cursor.line = abs_line(history_len, Line(row as i32 - display_offset as i32));
                cursor.col = col as u16;
            }
        }

        for row in 0..total_lines {
            let base = row * cols;
            let mut row_changed = !same_size;

            for col in 0..cols {
                let idx = base + col;
                let raw = self.raw_buf[idx];
                if same_size && self.prev_raw_buf[idx] == raw {
                    continue;
                }
                row_changed = true;

                let (c, fg, bg, flags) = raw;
                let cell = &mut self.view.cells[idx];

                if flags.contains(AlacCellFlags::WIDE_CHAR_SPACER) {
                    // Second half of a wide glyph: no character of its own,
                    // but keep the background so selection/inverse highlights
                    // still cover it.
                    let mut bg_color = Terminal::convert_color(dark_mode, &bg, &self.palette_buf, &self.palette_overrides);
                    if flags.contains(AlacCellFlags::INVERSE) {
                        bg_color = Terminal::convert_color(dark_mode, &fg, &self.palette_buf, &self.palette_overrides);
                    }
                    cell.character = '\0';
                    cell.bg = bg_color;
                    cell.fg = bg_color;
                    cell.flags = CellFlags::WIDE_SPACER;
                    cell.hyperlink_id = 0;
                    continue;
                }

                let mut fg_color = Terminal::convert_color(dark_mode, &fg, &self.palette_buf, &self.palette_overrides);
                let mut bg_color = Terminal::convert_color(dark_mode, &bg, &self.palette_buf, &self.palette_overrides);

                if flags.contains(AlacCellFlags::INVERSE) {
                    std::mem::swap(&mut fg_color, &mut bg_color);
                }

                fg_color = if dark_mode {
                    Terminal::ensure_dark_fg_contrast(fg_color)
                } else {
                    Terminal::ensure_light_fg_contrast(fg_color)
                };

                let mut out_flags = CellFlags::empty();
                if flags.contains(AlacCellFlags::BOLD) {
                    out_flags |= CellFlags::BOLD;
                }
                if flags.contains(AlacCellFlags::ITALIC) {
                    out_flags |= CellFlags::ITALIC;
                }
                if flags.contains(AlacCellFlags::UNDERLINE)
                    || flags.contains(AlacCellFlags::DOUBLE_UNDERLINE)
                    || flags.contains(AlacCellFlags::UNDERCURL)
                {
                    out_flags |= CellFlags::UNDERLINE;
                }
                if flags.contains(AlacCellFlags::DIM) {
                    out_flags |= CellFlags::DIM;
                }
                if flags.contains(AlacCellFlags::STRIKEOUT) {
                    out_flags |= CellFlags::STRIKEOUT;
                }
                if flags.contains(AlacCellFlags::WIDE_CHAR) {
                    out_flags |= CellFlags::WIDE_CHAR;
                }

                cell.character = c;
                cell.fg = fg_color;
                cell.bg = bg_color;
                cell.flags = out_flags;
                cell.hyperlink_id = 0;
            }

            self.view.row_damage[row] = row_changed;
            any_changed |= row_changed;
        }

        std::mem::swap(&mut self.prev_raw_buf, &mut self.raw_buf);

        if any_changed || !same_size {
            self.generation += 1;
        }

        if (any_changed || !same_size) && self.last_url_detect.elapsed().as_millis() >= 200 {
            self.detect_urls();
            self.last_url_detect = Instant::now();
        }

        Some(TerminalSnapshot {
            view: self.view.clone(),
            cursor,
            display_offset,
            history_len,
            selection,
            search_matches: self.search.matches.clone(),
            focused_match: self.search.focused,
            title: self.title(),
            generation: self.generation,
        })
    }

    /// Scan the current view for `https?://` spans and assign each a
    /// `hyperlink_id`, clearing stale ids on cells no longer part of a URL.
    fn detect_urls(&mut self) {
        static URL_RE: OnceLock<regex::Regex> = OnceLock::new();
        let re = URL_RE.get_or_init(|| regex::Regex::new(r#"https?://[^\s<>"{}|\\^`\[\]]+"#).unwrap());

        let cols = self.view.cols as usize;
        let rows = self.view.rows as usize;
        self.url_ranges.resize(rows, Vec::new());

        let mut next_id: u32 = 1;
        for row in 0..rows {
            self.url_ranges[row].clear();
            self.url_row_buf.clear();
            let base = row * cols;
            for cell in &mut self.view.cells[base..base + cols] {
                let c = cell.character;
                self.url_row_buf.push(if c == '\0' { ' ' } else { c });
                cell.hyperlink_id = 0;
            }
            for m in re.find_iter(&self.url_row_buf) {
                let start_col = self.url_row_buf[..m.start()].chars().count();
                let end_col = start_col + m.as_str().chars().count();
                self.url_ranges[row].push((start_col, end_col));
                let id = next_id;
                next_id += 1;
                for col in start_col..end_col.min(cols) {
                    self.view.cells[base + col].hyperlink_id = id;
                }
            }
        }
        self.url_ranges.truncate(rows);
    }

    /// Inject bytes directly into the terminal emulator, bypassing the PTY.
    /// Used by benchmarks to measure VTE parsing throughput in isolation.
    #[doc(hidden)]
    pub fn bench_write_to_term(&self, data: &[u8]) {
        use alacritty_terminal::vte::ansi::{Processor, StdSyncHandler};
        let mut processor: Processor<StdSyncHandler> = Processor::new();
        let mut term = self.term.lock();
        processor.advance(&mut *term, data);
    }

    /// Force a snapshot cycle for benchmarking, regardless of the dirty flag.
    #[doc(hidden)]
    pub fn bench_force_snapshot(&mut self) -> Option<TerminalSnapshot> {
        self.dirty.store(true, Ordering::Relaxed);
        self.try_snapshot()
    }
}

/// Wait for a child process to exit after SIGHUP, polling with `waitpid`.
/// Escalates to SIGKILL if it doesn't exit within 200ms.
fn wait_for_child_exit(pid: u32) {
    use std::time::Duration;

    let deadline = Instant::now() + Duration::from_millis(200);
    loop {
        let ret = unsafe { libc::waitpid(pid as i32, std::ptr::null_mut(), libc::WNOHANG) };
        if ret != 0 {
            return;
        }
        if Instant::now() >= deadline {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }

    unsafe {
        libc::kill(-(pid as i32), libc::SIGKILL);
    }
    let kill_deadline = Instant::now() + Duration::from_millis(50);
    loop {
        let ret = unsafe { libc::waitpid(pid as i32, std::ptr::null_mut(), libc::WNOHANG) };
        if ret != 0 || Instant::now() >= kill_deadline {
            return;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // SIGHUP the child's process group so shell trap handlers (e.g.
        // pyenv's rehash lock cleanup) get to run before the PTY fd closes.
        if let Some(pid) = self.child_pid {
            unsafe {
                libc::kill(-(pid as i32), libc::SIGHUP);
            }
            wait_for_child_exit(pid);
        }
        let _ = self.notifier.0.send(Msg::Shutdown);
    }
}

#[cfg(test)]
mod tests;

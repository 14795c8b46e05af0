//! C ABI bridge for host shells embedding the terminal engine.
//!
//! Every handle crossing this boundary is opaque: `PoolHandle` wraps a
//! `Box<PoolState>`, created by `pool_create` and destroyed by
//! `pool_destroy`. Out parameters are `repr(C)` plain-old-data structs
//! filled in place rather than returned, matching the boundary's "fixed-size
//! out structs" shape. Grounded on `other_examples/…terminal-emulator__src-ffi.rs`'s
//! `term_session_*` functions (`#[no_mangle] pub extern "C" fn`,
//! `Box::into_raw`/`Box::from_raw` handles, a paired `*_free` for every
//! allocation handed across); no teacher file covers a C boundary directly,
//! since the teacher embeds natively via `tide-platform` rather than a
//! shared library.

use std::collections::VecDeque;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::sync::{Arc, Mutex};

use vterm_core::{PoolError, SelectionKind, TerminalError, TerminalEvent, TerminalId};
use vterm_pool::{ModeCommand, OpenConfig, PoolConfig, SelectionCommand, TerminalPool};

mod device;

/// Mirrors spec's boundary error taxonomy. `Busy` is returned by the
/// non-blocking variants instead of making the host thread wait.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Success = 0,
    NullPointer = 1,
    InvalidConfig = 2,
    InvalidUtf8 = 3,
    RenderError = 4,
    OutOfBounds = 5,
    Busy = 6,
    NotFound = 7,
}

impl From<PoolError> for ErrorCode {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::NotFound => ErrorCode::NotFound,
            PoolError::Busy => ErrorCode::Busy,
            PoolError::Terminal(TerminalError::InvalidDimensions { .. }) => ErrorCode::InvalidConfig,
            PoolError::Terminal(_) => ErrorCode::RenderError,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PoolConfigFfi {
    pub scale_factor: f32,
    pub input_queue_capacity: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct OpenConfigFfi {
    pub cols: u16,
    pub rows: u16,
    pub dark_mode: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct CursorInfoFfi {
    pub line: u64,
    pub col: u16,
    pub display_offset: u64,
    pub visible: c_int,
    pub shape: u8,
    pub has_value: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionRangeFfi {
    pub kind: u8,
    pub start_line: u64,
    pub start_col: u16,
    pub end_line: u64,
    pub end_col: u16,
    pub has_value: c_int,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrollInfoFfi {
    pub display_offset: u64,
    pub scrollback_size: u64,
    pub total_lines: u64,
    pub has_value: c_int,
}

/// Fixed-width mirror of `vterm_core::TerminalEvent` for the polling path.
/// `Bell`/`SessionReady`/`CursorBlink` carry no payload; `Damaged`'s payload
/// lands in `line`, `Exited`'s in `code`, `TitleChanged`'s in `title` (a
/// caller-owned buffer filled up to `title_capacity`, NUL-terminated).
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct TerminalEventFfi {
    pub terminal_id: TerminalId,
    pub kind: u8,
    pub line: u64,
    pub code: i32,
}

const EVENT_KIND_CURSOR_BLINK: u8 = 0;
const EVENT_KIND_BELL: u8 = 1;
const EVENT_KIND_TITLE_CHANGED: u8 = 2;
const EVENT_KIND_DAMAGED: u8 = 3;
const EVENT_KIND_EXITED: u8 = 4;
const EVENT_KIND_SESSION_READY: u8 = 5;

fn event_to_ffi(id: TerminalId, event: &TerminalEvent) -> TerminalEventFfi {
    match event {
        TerminalEvent::CursorBlink => TerminalEventFfi { terminal_id: id, kind: EVENT_KIND_CURSOR_BLINK, line: 0, code: 0 },
        TerminalEvent::Bell => TerminalEventFfi { terminal_id: id, kind: EVENT_KIND_BELL, line: 0, code: 0 },
        TerminalEvent::TitleChanged(_) => TerminalEventFfi { terminal_id: id, kind: EVENT_KIND_TITLE_CHANGED, line: 0, code: 0 },
        TerminalEvent::Damaged { line } => TerminalEventFfi { terminal_id: id, kind: EVENT_KIND_DAMAGED, line: *line, code: 0 },
        TerminalEvent::Exited { code } => TerminalEventFfi { terminal_id: id, kind: EVENT_KIND_EXITED, line: 0, code: *code },
        TerminalEvent::SessionReady => TerminalEventFfi { terminal_id: id, kind: EVENT_KIND_SESSION_READY, line: 0, code: 0 },
    }
}

type RawCallback = extern "C" fn(TerminalId, TerminalEventFfi, *mut c_void);

struct CallbackSlot {
    callback: RawCallback,
    user_data: usize,
}

// The host guarantees `user_data` is safe to hand back across threads; we
// only ever move the raw pointer's integer value, never dereference it.
unsafe impl Send for CallbackSlot {}
unsafe impl Sync for CallbackSlot {}

/// Everything behind a `PoolHandle`. Owns the device/queue this process's
/// pool renders with; see `device.rs` for how those are obtained headlessly.
pub struct PoolState {
    pool: TerminalPool,
    poll_buffer: Arc<Mutex<VecDeque<TerminalEventFfi>>>,
}

/// Opaque handle returned by `pool_create`.
pub struct PoolHandle(PoolState);

fn config_from_ffi(config: PoolConfigFfi) -> PoolConfig {
    PoolConfig {
        scale_factor: if config.scale_factor > 0.0 { config.scale_factor } else { 1.0 },
        input_queue_capacity: config.input_queue_capacity.max(1) as usize,
    }
}

/// Creates a pool with its own headless GPU device. Returns null on
/// adapter/device failure (no compatible GPU, driver rejected the request).
#[no_mangle]
pub extern "C" fn pool_create(config: PoolConfigFfi) -> *mut PoolHandle {
    let Some((device, queue, format)) = device::acquire_headless() else {
        log::error!("pool_create: failed to acquire a GPU device");
        return std::ptr::null_mut();
    };

    vterm_pool::init_logging();
    let pool = TerminalPool::new(device, queue, format, config_from_ffi(config));
    let poll_buffer = Arc::new(Mutex::new(VecDeque::new()));

    let buffer_for_callback = poll_buffer.clone();
    pool.set_event_callback(move |id, event| {
        let mut buf = buffer_for_callback.lock().unwrap();
        if buf.len() >= 4096 {
            buf.pop_front();
        }
        buf.push_back(event_to_ffi(id, &event));
    });

    Box::into_raw(Box::new(PoolHandle(PoolState { pool, poll_buffer })))
}

#[no_mangle]
pub extern "C" fn pool_destroy(handle: *mut PoolHandle) {
    if !handle.is_null() {
        unsafe { drop(Box::from_raw(handle)) };
    }
}

/// # Safety
/// `handle` must be a live pointer returned by `pool_create` and not yet
/// passed to `pool_destroy`. All functions below share this requirement.
unsafe fn state<'a>(handle: *const PoolHandle) -> Option<&'a PoolState> {
    handle.as_ref().map(|h| &h.0)
}

#[no_mangle]
pub extern "C" fn pool_open(handle: *mut PoolHandle, config: OpenConfigFfi) -> TerminalId {
    let Some(state) = (unsafe { state(handle) }) else { return 0 };
    let open_config = OpenConfig {
        cols: config.cols,
        rows: config.rows,
        cwd: None,
        dark_mode: config.dark_mode != 0,
        palette_overrides: std::collections::HashMap::new(),
    };
    state.pool.open(open_config).unwrap_or(0)
}

#[no_mangle]
pub extern "C" fn pool_close(handle: *mut PoolHandle, id: TerminalId) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    match state.pool.close(id) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_write_input(
    handle: *mut PoolHandle,
    id: TerminalId,
    bytes: *const u8,
    len: usize,
) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    if bytes.is_null() && len > 0 {
        return ErrorCode::NullPointer;
    }
    let slice = if len == 0 { &[][..] } else { unsafe { std::slice::from_raw_parts(bytes, len) } };
    match state.pool.input_async(id, slice.to_vec()) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_scroll(handle: *mut PoolHandle, id: TerminalId, delta: i32) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    match state.pool.scroll_async(id, delta) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

/// `width_px`/`height_px` are accepted for boundary-shape compatibility but
/// unused: the renderer derives a terminal's surface size from `cols`/`rows`
/// and its own cached cell metrics (see `vterm-render::paint_terminal`), so
/// there is nothing pixel-dimensioned for this call to act on directly.
#[no_mangle]
pub extern "C" fn pool_resize(
    handle: *mut PoolHandle,
    id: TerminalId,
    cols: u16,
    rows: u16,
    _width_px: u32,
    _height_px: u32,
) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    match state.pool.resize_async(id, cols, rows) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_render(handle: *mut PoolHandle, id: TerminalId) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    match state.pool.render(id) {
        Ok(_) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_get_cursor(handle: *mut PoolHandle, id: TerminalId, out: *mut CursorInfoFfi) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    if out.is_null() {
        return ErrorCode::NullPointer;
    }
    match state.pool.get_cursor(id) {
        Ok(Some(cursor)) => {
            unsafe {
                *out = CursorInfoFfi {
                    line: cursor.line,
                    col: cursor.col,
                    display_offset: cursor.display_offset,
                    visible: cursor.visible as c_int,
                    shape: cursor.shape as u8,
                    has_value: 1,
                };
            }
            ErrorCode::Success
        }
        Ok(None) => {
            unsafe { *out = CursorInfoFfi::default() };
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_get_selection_range(handle: *mut PoolHandle, id: TerminalId, out: *mut SelectionRangeFfi) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    if out.is_null() {
        return ErrorCode::NullPointer;
    }
    match state.pool.get_selection(id) {
        Ok(Some(sel)) => {
            unsafe {
                *out = SelectionRangeFfi {
                    kind: sel.kind as u8,
                    start_line: sel.start_line,
                    start_col: sel.start_col,
                    end_line: sel.end_line,
                    end_col: sel.end_col,
                    has_value: 1,
                };
            }
            ErrorCode::Success
        }
        Ok(None) => {
            unsafe { *out = SelectionRangeFfi::default() };
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_get_scroll_info(handle: *mut PoolHandle, id: TerminalId, out: *mut ScrollInfoFfi) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    if out.is_null() {
        return ErrorCode::NullPointer;
    }
    match state.pool.get_scroll_info(id) {
        Ok(Some(info)) => {
            unsafe {
                *out = ScrollInfoFfi {
                    display_offset: info.display_offset,
                    scrollback_size: info.scrollback_size,
                    total_lines: info.total_lines,
                    has_value: 1,
                };
            }
            ErrorCode::Success
        }
        Ok(None) => {
            unsafe { *out = ScrollInfoFfi::default() };
            ErrorCode::Success
        }
        Err(e) => e.into(),
    }
}

/// Writes up to `buf_len - 1` bytes of the cached title plus a NUL
/// terminator into `buf`, and the number of bytes written (excluding the
/// NUL) into `*written`.
#[no_mangle]
pub extern "C" fn pool_get_title(
    handle: *mut PoolHandle,
    id: TerminalId,
    buf: *mut c_char,
    buf_len: usize,
    written: *mut usize,
) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    if buf.is_null() || written.is_null() || buf_len == 0 {
        return ErrorCode::NullPointer;
    }
    let title = match state.pool.get_title(id) {
        Ok(title) => title.unwrap_or_else(|| Arc::from("")),
        Err(e) => return e.into(),
    };

    let bytes = title.as_bytes();
    let copy_len = bytes.len().min(buf_len - 1);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf as *mut u8, copy_len);
        *(buf.add(copy_len)) = 0;
        *written = copy_len;
    }
    ErrorCode::Success
}

#[no_mangle]
pub extern "C" fn pool_set_dark_mode(handle: *mut PoolHandle, id: TerminalId, dark: c_int) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    match state.pool.mode_async(id, ModeCommand::SetDarkMode(dark != 0)) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_scroll_to_bottom(handle: *mut PoolHandle, id: TerminalId) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    match state.pool.mode_async(id, ModeCommand::RequestScrollToBottom) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_selection_start(
    handle: *mut PoolHandle,
    id: TerminalId,
    kind: u8,
    line: u64,
    col: u16,
    side_right: c_int,
) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    let kind = match kind {
        1 => SelectionKind::Block,
        2 => SelectionKind::SemanticWord,
        _ => SelectionKind::Linear,
    };
    let cmd = SelectionCommand::Start { kind, line, col, side_right: side_right != 0 };
    match state.pool.selection_async(id, cmd) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_selection_update(handle: *mut PoolHandle, id: TerminalId, line: u64, col: u16, side_right: c_int) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    let cmd = SelectionCommand::Update { line, col, side_right: side_right != 0 };
    match state.pool.selection_async(id, cmd) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_selection_clear(handle: *mut PoolHandle, id: TerminalId) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    match state.pool.selection_async(id, SelectionCommand::Clear) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

/// Extracts selected text by locking the terminal directly (spec's
/// `try_with_terminal` path) rather than via the async queue, since the
/// result must come back synchronously.
#[no_mangle]
pub extern "C" fn pool_get_selection_text(
    handle: *mut PoolHandle,
    id: TerminalId,
    buf: *mut c_char,
    buf_len: usize,
    written: *mut usize,
) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    if buf.is_null() || written.is_null() || buf_len == 0 {
        return ErrorCode::NullPointer;
    }
    let text = match state.pool.try_with_terminal(id, |term| term.selection_text()) {
        Ok(text) => text.unwrap_or_default(),
        Err(e) => return e.into(),
    };

    let bytes = text.as_bytes();
    let copy_len = bytes.len().min(buf_len - 1);
    unsafe {
        std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf as *mut u8, copy_len);
        *(buf.add(copy_len)) = 0;
        *written = copy_len;
    }
    ErrorCode::Success
}

#[no_mangle]
pub extern "C" fn pool_search_set(handle: *mut PoolHandle, id: TerminalId, pattern: *const c_char) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    if pattern.is_null() {
        return ErrorCode::NullPointer;
    }
    let Ok(pattern) = (unsafe { CStr::from_ptr(pattern) }).to_str() else { return ErrorCode::InvalidUtf8 };
    let pattern = pattern.to_string();
    match state.pool.try_with_terminal(id, move |term| term.search_set(&pattern)) {
        Ok(Ok(())) => ErrorCode::Success,
        Ok(Err(_)) => ErrorCode::InvalidConfig,
        Err(e) => e.into(),
    }
}

#[no_mangle]
pub extern "C" fn pool_search_clear(handle: *mut PoolHandle, id: TerminalId) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    match state.pool.try_with_terminal(id, |term| term.search_clear()) {
        Ok(()) => ErrorCode::Success,
        Err(e) => e.into(),
    }
}

/// Registers the single event callback. `user_data` is handed back
/// unmodified on every invocation; the host owns its lifetime.
#[no_mangle]
pub extern "C" fn pool_set_event_callback(handle: *mut PoolHandle, callback: RawCallback, user_data: *mut c_void) {
    let Some(state) = (unsafe { state(handle) }) else { return };
    let slot = CallbackSlot { callback, user_data: user_data as usize };
    let poll_buffer = state.poll_buffer.clone();
    state.pool.set_event_callback(move |id, event| {
        let ffi_event = event_to_ffi(id, &event);
        {
            let mut buf = poll_buffer.lock().unwrap();
            if buf.len() >= 4096 {
                buf.pop_front();
            }
            buf.push_back(ffi_event);
        }
        (slot.callback)(id, ffi_event, slot.user_data as *mut c_void);
    });
}

/// Polling alternative to the callback: drains up to `max` buffered events
/// into `buf`, writing the count to `*written`. Events delivered via the
/// callback (if one is registered) are still buffered here, so a host can
/// mix both without losing events, at the cost of delivering each event
/// twice if it uses both paths.
#[no_mangle]
pub extern "C" fn pool_poll_events(handle: *mut PoolHandle, buf: *mut TerminalEventFfi, max: usize, written: *mut usize) -> ErrorCode {
    let Some(state) = (unsafe { state(handle) }) else { return ErrorCode::NullPointer };
    if buf.is_null() || written.is_null() {
        return ErrorCode::NullPointer;
    }
    let mut queue = state.poll_buffer.lock().unwrap();
    let count = max.min(queue.len());
    for i in 0..count {
        let event = queue.pop_front().expect("count bounded by queue.len()");
        unsafe { *(buf.add(i)) = event };
    }
    unsafe { *written = count };
    ErrorCode::Success
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_error_maps_to_the_expected_error_code() {
        assert_eq!(ErrorCode::from(PoolError::NotFound), ErrorCode::NotFound);
        assert_eq!(ErrorCode::from(PoolError::Busy), ErrorCode::Busy);
        assert_eq!(
            ErrorCode::from(PoolError::Terminal(TerminalError::InvalidDimensions { cols: 0, rows: 0 })),
            ErrorCode::InvalidConfig
        );
    }

    #[test]
    fn event_kinds_round_trip_their_payloads() {
        let damaged = event_to_ffi(3, &TerminalEvent::Damaged { line: 42 });
        assert_eq!(damaged.kind, EVENT_KIND_DAMAGED);
        assert_eq!(damaged.line, 42);

        let exited = event_to_ffi(3, &TerminalEvent::Exited { code: 1 });
        assert_eq!(exited.kind, EVENT_KIND_EXITED);
        assert_eq!(exited.code, 1);
    }
}

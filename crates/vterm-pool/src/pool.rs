//! `TerminalPool`: the keyed collection of open terminals, the central
//! `RwLock`, the input queue, the event callback, and `render`, the sole
//! entry point for driving a frame (Algorithm R).
//!
//! Grounded on `tide-app`'s pane registry (`HashMap<PaneId, PaneKind>` plus
//! `action/pane_lifecycle.rs::create_terminal_pane`/`close_specific_pane`),
//! generalized from "one app's `HashMap` of panes of several kinds" to a
//! `TerminalPool`-owned `RwLock<HashMap<TerminalId, TerminalEntry>>` per the
//! arena+id rearchitecture in spec.md §9: terminals hold no back-reference to
//! the pool, so there is no cycle to break on drop.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use arc_swap::ArcSwapOption;
use vterm_core::{PoolError, TerminalEvent, TerminalId};
use vterm_render::WgpuRenderer;
use vterm_terminal::Terminal;

use crate::caches::{AtomicCaches, CursorInfo, ScrollInfo, SelectionRange};
use crate::config::OpenConfig;
use crate::events::{self, EventCallback};
use crate::input_queue::{self, InputEvent, ModeCommand, SelectionCommand};
use crate::PoolConfig;

pub(crate) struct TerminalEntry {
    pub(crate) terminal: Mutex<Terminal>,
    pub(crate) caches: AtomicCaches,
    dirty: Arc<std::sync::atomic::AtomicBool>,
    render_state: Mutex<vterm_render::TerminalRenderState>,
}

/// State the input-queue consumer thread needs, split out of `TerminalPool`
/// itself so the thread can hold a clone without keeping the pool's sender
/// half (and therefore the queue) alive forever.
pub(crate) struct PoolShared {
    pub(crate) entries: RwLock<HashMap<TerminalId, TerminalEntry>>,
    pub(crate) callback: ArcSwapOption<EventCallback>,
}

pub struct TerminalPool {
    shared: Arc<PoolShared>,
    next_id: AtomicU64,
    renderer: Mutex<WgpuRenderer>,
    surface_format: wgpu::TextureFormat,
    scale_factor: f32,
    input_tx: std::sync::mpsc::SyncSender<InputEvent>,
}

impl TerminalPool {
    /// `device`/`queue`/`surface_format` are the host's GPU resources,
    /// created and owned by the host (spec's GPU-backend-init Non-goal);
    /// the pool only ever draws into offscreen surfaces it allocates itself.
    pub fn new(
        device: Arc<wgpu::Device>,
        queue: Arc<wgpu::Queue>,
        surface_format: wgpu::TextureFormat,
        config: PoolConfig,
    ) -> Self {
        let renderer = WgpuRenderer::new(device, queue, surface_format, config.scale_factor);
        let shared = Arc::new(PoolShared {
            entries: RwLock::new(HashMap::new()),
            callback: ArcSwapOption::empty(),
        });
        let (tx, rx) = input_queue::make_queue(config.input_queue_capacity);

        let consumer_shared = shared.clone();
        std::thread::Builder::new()
            .name("vterm-pool-input".into())
            .spawn(move || input_queue::run_consumer(rx, consumer_shared))
            .expect("spawn input consumer thread");

        Self {
            shared,
            next_id: AtomicU64::new(1),
            renderer: Mutex::new(renderer),
            surface_format,
            scale_factor: config.scale_factor,
            input_tx: tx,
        }
    }

    /// Spawns a PTY, forks the shell, and registers a new entry. Returns the
    /// assigned id — never 0, so a caller across the boundary can use 0 to
    /// mean "open failed" without an extra out-parameter.
    pub fn open(&self, config: OpenConfig) -> Result<TerminalId, PoolError> {
        let overrides = vterm_terminal::PaletteOverrides::from_entries(config.palette_overrides.clone());
        let terminal = Terminal::with_cwd(config.cols, config.rows, config.cwd, config.dark_mode, overrides)
            .map_err(|e| {
                log::error!("Failed to open terminal ({}x{}): {}", config.cols, config.rows, e);
                PoolError::from(e)
            })?;
        let dirty = terminal.dirty_flag();

        let cell_size = self.renderer.lock().unwrap().cell_size();
        let width_px = (config.cols as f32 * cell_size.width * self.scale_factor) as u32;
        let height_px = (config.rows as f32 * cell_size.height * self.scale_factor) as u32;
        let render_state = self.renderer.lock().unwrap().create_terminal_state(
            width_px.max(1),
            height_px.max(1),
            self.surface_format,
        );

        let entry = TerminalEntry {
            terminal: Mutex::new(terminal),
            caches: AtomicCaches::new(),
            dirty,
            render_state: Mutex::new(render_state),
        };

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared.entries.write().unwrap().insert(id, entry);
        Ok(id)
    }

    /// Drops the entry; `Terminal`'s own `Drop` impl signals and reaps the
    /// shell, so no further teardown happens here.
    pub fn close(&self, id: TerminalId) -> Result<(), PoolError> {
        if self.shared.entries.write().unwrap().remove(&id).is_none() {
            log::warn!("close requested for unknown terminal {id}");
            return Err(PoolError::NotFound);
        }
        Ok(())
    }

    /// Algorithm R. Never blocks longer than a `try_lock`: a busy terminal or
    /// a fully up-to-date frame both return `Ok(true)` ("nothing to do right
    /// now, try again next tick") rather than making the render thread wait.
    pub fn render(&self, id: TerminalId) -> Result<bool, PoolError> {
        let entries = self.shared.entries.read().unwrap();
        let entry = entries.get(&id).ok_or(PoolError::NotFound)?;

        // Step 2: the hot path. No mutation has landed since the last frame
        // and nothing else changed state, so skip without taking any lock
        // beyond the pool's own read lock already held above.
        if !entry.dirty.load(Ordering::Acquire) {
            return Ok(true);
        }

        // Step 3: never block waiting on a busy terminal.
        let mut term = match entry.terminal.try_lock() {
            Ok(guard) => guard,
            Err(_) => return Ok(true),
        };

        // Step 4: snapshot + reset-damage in one lock acquisition.
        // `try_snapshot` itself swaps the dirty flag to false before doing
        // any of the (potentially slow) diff/convert work, so a mutation
        // landing while steps 5-8 run below re-sets it for the next tick
        // instead of being silently dropped (spec's §9 Open Question,
        // resolved in favor of re-check-then-clear rather than
        // double-buffering).
        term.flush_pending_resize();
        let events = term.drain_events();
        let snapshot = term.try_snapshot();
        drop(term);

        events::dispatch(id, events, &self.shared.callback);

        let Some(snapshot) = snapshot else {
            // The dirty flag observed above raced with `try_snapshot`'s own
            // clear-and-check and lost; nothing new to paint this tick.
            return Ok(true);
        };

        // Steps 5-7: row cache chain + overlays.
        {
            let mut renderer = self.renderer.lock().unwrap();
            let mut state = entry.render_state.lock().unwrap();
            renderer.paint_terminal(&mut state, &snapshot);
            // Step 8: present to the offscreen surface.
            renderer.present(&mut state);
        }

        entry.caches.write_snapshot(&snapshot);
        Ok(true)
    }

    pub fn input_async(&self, id: TerminalId, bytes: Vec<u8>) -> Result<(), PoolError> {
        input_queue::send(&self.input_tx, InputEvent::Write(id, bytes))
    }

    pub fn scroll_async(&self, id: TerminalId, delta: i32) -> Result<(), PoolError> {
        input_queue::send(&self.input_tx, InputEvent::Scroll(id, delta))
    }

    pub fn resize_async(&self, id: TerminalId, cols: u16, rows: u16) -> Result<(), PoolError> {
        input_queue::send(&self.input_tx, InputEvent::Resize(id, cols, rows))
    }

    pub fn selection_async(&self, id: TerminalId, cmd: SelectionCommand) -> Result<(), PoolError> {
        input_queue::send(&self.input_tx, InputEvent::Selection(id, cmd))
    }

    pub fn mode_async(&self, id: TerminalId, cmd: ModeCommand) -> Result<(), PoolError> {
        input_queue::send(&self.input_tx, InputEvent::Mode(id, cmd))
    }

    pub fn get_cursor(&self, id: TerminalId) -> Result<Option<CursorInfo>, PoolError> {
        let entries = self.shared.entries.read().unwrap();
        let entry = entries.get(&id).ok_or(PoolError::NotFound)?;
        Ok(entry.caches.cursor())
    }

    pub fn get_selection(&self, id: TerminalId) -> Result<Option<SelectionRange>, PoolError> {
        let entries = self.shared.entries.read().unwrap();
        let entry = entries.get(&id).ok_or(PoolError::NotFound)?;
        Ok(entry.caches.selection())
    }

    pub fn get_scroll_info(&self, id: TerminalId) -> Result<Option<ScrollInfo>, PoolError> {
        let entries = self.shared.entries.read().unwrap();
        let entry = entries.get(&id).ok_or(PoolError::NotFound)?;
        Ok(entry.caches.scroll_info())
    }

    pub fn get_title(&self, id: TerminalId) -> Result<Option<Arc<str>>, PoolError> {
        let entries = self.shared.entries.read().unwrap();
        let entry = entries.get(&id).ok_or(PoolError::NotFound)?;
        Ok(entry.caches.title())
    }

    /// Holds the pool's read lock while `f` runs with the entry's `Terminal`
    /// locked. Callers are expected to keep `f` short — this is the one path
    /// in the public API that can block on contention.
    pub fn with_terminal<F, T>(&self, id: TerminalId, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(&mut Terminal) -> T,
    {
        let entries = self.shared.entries.read().unwrap();
        let entry = entries.get(&id).ok_or(PoolError::NotFound)?;
        let mut term = entry.terminal.lock().unwrap();
        Ok(f(&mut term))
    }

    /// Non-blocking variant of `with_terminal`: returns `Busy` instead of
    /// waiting if another thread (most likely the render path) holds the
    /// entry's lock.
    pub fn try_with_terminal<F, T>(&self, id: TerminalId, f: F) -> Result<T, PoolError>
    where
        F: FnOnce(&mut Terminal) -> T,
    {
        let entries = self.shared.entries.read().unwrap();
        let entry = entries.get(&id).ok_or(PoolError::NotFound)?;
        let mut term = entry.terminal.try_lock().map_err(|_| PoolError::Busy)?;
        Ok(f(&mut term))
    }

    /// Installs the single fan-out sink. Replaces any previously registered
    /// callback. May be invoked from the render thread, the input-consumer
    /// thread, or a `Terminal`'s own PTY event listener — callers must treat
    /// it as thread-foreign and must not block or re-enter the pool from it
    /// in a way that would deadlock (spec.md §4.2/§5).
    pub fn set_event_callback<F>(&self, callback: F)
    where
        F: Fn(TerminalId, TerminalEvent) + Send + Sync + 'static,
    {
        self.shared.callback.store(Some(Arc::new(Box::new(callback))));
    }

    pub fn clear_event_callback(&self) {
        self.shared.callback.store(None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These exercise the registry/queue bookkeeping without spinning up a
    // real `wgpu::Device` (impossible headlessly) or a real PTY — both are
    // covered by `vterm-terminal`'s and `vterm-render`'s own test suites.

    #[test]
    fn open_on_an_empty_pool_returns_not_found_for_other_ids() {
        let shared = Arc::new(PoolShared { entries: RwLock::new(HashMap::new()), callback: ArcSwapOption::empty() });
        assert!(shared.entries.read().unwrap().get(&1).is_none());
    }

    #[test]
    fn event_dispatch_is_a_no_op_with_no_registered_callback() {
        let callback: ArcSwapOption<EventCallback> = ArcSwapOption::empty();
        // Must not panic with nothing registered.
        events::dispatch(1, vec![TerminalEvent::Bell], &callback);
    }

    #[test]
    fn event_dispatch_invokes_the_registered_callback_per_event() {
        let callback: ArcSwapOption<EventCallback> = ArcSwapOption::empty();
        let received = Arc::new(Mutex::new(Vec::new()));
        let received_clone = received.clone();
        callback.store(Some(Arc::new(Box::new(move |id, event| {
            received_clone.lock().unwrap().push((id, event));
        }))));

        events::dispatch(7, vec![TerminalEvent::Bell, TerminalEvent::SessionReady], &callback);

        let got = received.lock().unwrap();
        assert_eq!(got.len(), 2);
        assert_eq!(got[0], (7, TerminalEvent::Bell));
        assert_eq!(got[1], (7, TerminalEvent::SessionReady));
    }
}

//! The pool's single-producer/single-consumer input queue (spec.md §4.2,
//! §5): the host thread is the sole producer via the pool's `*_async`
//! methods; a dedicated consumer thread spawned by `TerminalPool::new` is the
//! sole reader, dispatching each event into the target terminal's `Mutex`.
//!
//! Grounded on `std::sync::mpsc`, already the teacher's channel of choice
//! (`tide-app/src/main.rs`, `file_tree.rs`) for cross-thread work handoff —
//! narrowed here to a bounded `sync_channel` so a saturated queue reports
//! `Busy` to the caller instead of growing without bound.

use std::sync::mpsc::{Receiver, SyncSender};
use std::sync::Arc;

use vterm_core::{PoolError, SelectionKind, TerminalId};

use crate::events;
use crate::pool::PoolShared;

#[derive(Debug, Clone)]
pub enum SelectionCommand {
    Start { kind: SelectionKind, line: u64, col: u16, side_right: bool },
    Update { line: u64, col: u16, side_right: bool },
    Clear,
}

#[derive(Debug, Clone)]
pub enum ModeCommand {
    SetDarkMode(bool),
    RequestScrollToBottom,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Write(TerminalId, Vec<u8>),
    Scroll(TerminalId, i32),
    Resize(TerminalId, u16, u16),
    Selection(TerminalId, SelectionCommand),
    Mode(TerminalId, ModeCommand),
}

pub(crate) fn make_queue(capacity: usize) -> (SyncSender<InputEvent>, Receiver<InputEvent>) {
    std::sync::mpsc::sync_channel(capacity.max(1))
}

pub(crate) fn send(tx: &SyncSender<InputEvent>, event: InputEvent) -> Result<(), PoolError> {
    tx.try_send(event).map_err(|_| PoolError::Busy)
}

/// Runs on the pool's dedicated consumer thread until the sender half (owned
/// by `TerminalPool` itself) is dropped, at which point `recv` returns `Err`
/// and the thread exits.
pub(crate) fn run_consumer(rx: Receiver<InputEvent>, shared: Arc<PoolShared>) {
    while let Ok(event) = rx.recv() {
        dispatch(event, &shared);
    }
}

fn dispatch(event: InputEvent, shared: &PoolShared) {
    let id = event_target(&event);
    let entries = shared.entries.read().unwrap();
    let Some(entry) = entries.get(&id) else { return };
    let mut term = entry.terminal.lock().unwrap();

    match event {
        InputEvent::Write(_, bytes) => {
            if let Err(e) = term.write(&bytes) {
                log::error!("write to terminal {id} failed: {e}");
            }
        }
        InputEvent::Scroll(_, delta) => term.scroll_display(delta),
        InputEvent::Resize(_, cols, rows) => {
            if let Err(e) = term.resize(cols, rows) {
                log::error!("resize of terminal {id} to {cols}x{rows} failed: {e}");
            }
        }
        InputEvent::Selection(_, cmd) => apply_selection(&mut term, cmd),
        InputEvent::Mode(_, cmd) => apply_mode(&mut term, cmd),
    }

    let pending = term.drain_events();
    drop(term);
    drop(entries);
    events::dispatch(id, pending, &shared.callback);
}

fn event_target(event: &InputEvent) -> TerminalId {
    match event {
        InputEvent::Write(id, _)
        | InputEvent::Scroll(id, _)
        | InputEvent::Resize(id, _, _)
        | InputEvent::Selection(id, _)
        | InputEvent::Mode(id, _) => *id,
    }
}

fn apply_selection(term: &mut vterm_terminal::Terminal, cmd: SelectionCommand) {
    match cmd {
        SelectionCommand::Start { kind, line, col, side_right } => term.start_selection(kind, line, col, side_right),
        SelectionCommand::Update { line, col, side_right } => term.update_selection(line, col, side_right),
        SelectionCommand::Clear => term.clear_selection(),
    }
}

fn apply_mode(term: &mut vterm_terminal::Terminal, cmd: ModeCommand) {
    match cmd {
        ModeCommand::SetDarkMode(dark) => term.set_dark_mode(dark),
        ModeCommand::RequestScrollToBottom => term.request_scroll_to_bottom(),
    }
}

//! Fan-out of `TerminalEvent`s to a single host-registered callback. A
//! generalization of the teacher's `Terminal::set_waker` (one waker closure
//! woken on a new grid snapshot) to one callback carrying the event itself,
//! matching the boundary's `pool_set_event_callback` shape.

use arc_swap::ArcSwapOption;
use vterm_core::{TerminalEvent, TerminalId};

pub type EventCallback = Box<dyn Fn(TerminalId, TerminalEvent) + Send + Sync>;

/// Drain a terminal's pending events into the registered callback, if any.
/// Called from both the render path and the input-queue consumer thread,
/// wherever a `Terminal` method may have produced events (see spec's event
/// fan-out rule) — so this function, not either caller, is kept in step with
/// spec.md §4.2's "after each Terminal method that produces events" wording.
pub(crate) fn dispatch(id: TerminalId, events: Vec<TerminalEvent>, callback: &ArcSwapOption<EventCallback>) {
    if events.is_empty() {
        return;
    }
    if let Some(cb) = callback.load_full() {
        for event in events {
            cb(id, event);
        }
    }
}

//! Keyed terminal pool: the engine's single entry point for hosts that don't
//! need (or want) the C ABI in `vterm-ffi`.
//!
//! A `TerminalPool` owns a `WgpuRenderer`, a registry of open terminals each
//! guarded by its own lock, a bounded input queue drained by a dedicated
//! consumer thread, and a single event callback fanned out to on every
//! terminal event. See [`TerminalPool`] for the full per-terminal API and
//! [`TerminalPool::render`] for the frame-render entry point.

mod caches;
mod config;
mod events;
mod input_queue;
mod logging;
mod pool;

pub use caches::{AtomicCaches, CursorInfo, ScrollInfo, SelectionRange};
pub use config::{OpenConfig, PoolConfig};
pub use events::EventCallback;
pub use input_queue::{InputEvent, ModeCommand, SelectionCommand};
pub use logging::init_logging;
pub use pool::TerminalPool;

pub use vterm_core::{PoolError, TerminalError, TerminalEvent, TerminalId};

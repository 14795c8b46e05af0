mod cell;
mod error;
mod event;
mod geometry;
mod grid;
mod selection;

pub use cell::{Cell, CellFlags};
pub use error::{PoolError, TerminalError};
pub use event::TerminalEvent;
pub use geometry::{Color, Size};
pub use grid::{AbsLine, CursorShape, CursorState, GridView, TerminalSnapshot};
pub use selection::{MatchRange, Selection, SelectionKind, SelectionPoint};

/// Identifies a single open terminal within a `TerminalPool`.
///
/// Assigned by the pool on `open()`; never reused for the lifetime of the
/// process, so a stale id from a closed terminal is always distinguishable
/// from a live one (never silently aliases a newer terminal).
pub type TerminalId = u64;

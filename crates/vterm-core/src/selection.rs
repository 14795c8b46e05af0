use crate::grid::AbsLine;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionKind {
    Linear,
    Block,
    SemanticWord,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectionPoint {
    pub line: AbsLine,
    pub col: u16,
}

/// A selection's endpoints are always expressed in absolute scrollback
/// coordinates (see `AbsLine`), never viewport-relative ones, so a
/// selection made before a scroll still highlights the same text after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub kind: SelectionKind,
    pub start: SelectionPoint,
    pub end: SelectionPoint,
}

/// One match produced by a buffer search, in the same absolute coordinate
/// space as `Selection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRange {
    pub start: SelectionPoint,
    pub end: SelectionPoint,
}

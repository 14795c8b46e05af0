use std::fmt;

/// Failures that can occur within a single `Terminal`'s lifetime.
#[derive(Debug)]
pub enum TerminalError {
    /// PTY allocation or shell spawn failed.
    SpawnFailed(std::io::Error),
    /// `write()` was called after the child process exited and the PTY
    /// write half was closed.
    WriteClosed,
    /// `resize()` was called with a zero column or row count.
    InvalidDimensions { cols: u16, rows: u16 },
    /// The search pattern failed to compile.
    InvalidPattern(String),
}

impl fmt::Display for TerminalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminalError::SpawnFailed(e) => write!(f, "failed to spawn shell: {e}"),
            TerminalError::WriteClosed => write!(f, "write to a closed terminal"),
            TerminalError::InvalidDimensions { cols, rows } => {
                write!(f, "invalid terminal dimensions: {cols}x{rows}")
            }
            TerminalError::InvalidPattern(p) => write!(f, "invalid search pattern: {p}"),
        }
    }
}

impl std::error::Error for TerminalError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TerminalError::SpawnFailed(e) => Some(e),
            _ => None,
        }
    }
}

/// Failures `TerminalPool` can return to a caller. A superset of
/// `TerminalError` plus the pool-level lookup/locking failures that only
/// make sense once terminals live in a keyed collection.
#[derive(Debug)]
pub enum PoolError {
    NotFound,
    /// `try_with_terminal` couldn't acquire the entry's lock without
    /// blocking; distinct from `NotFound` so a caller can retell "busy" from
    /// "this id never existed or was already closed".
    Busy,
    Terminal(TerminalError),
}

impl fmt::Display for PoolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolError::NotFound => write!(f, "no terminal with that id"),
            PoolError::Busy => write!(f, "terminal is busy"),
            PoolError::Terminal(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for PoolError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PoolError::Terminal(e) => Some(e),
            _ => None,
        }
    }
}

impl From<TerminalError> for PoolError {
    fn from(e: TerminalError) -> Self {
        PoolError::Terminal(e)
    }
}

//! Serde-capable configuration. The engine persists none of this itself
//! (per-terminal identity and working directory belong to the caller's
//! session layer) but a host embedding the pool as a library can round-trip
//! these through its own session file the same way the teacher's settings
//! and session types do.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_scale_factor() -> f32 {
    1.0
}

fn default_input_queue_capacity() -> usize {
    256
}

/// Process-wide pool settings. The GPU device/queue/surface format are host
/// resources handed to `TerminalPool::new` directly, not carried here — they
/// aren't serializable and standing one up is the host's job (see spec's
/// GPU-backend-init Non-goal).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f32,
    /// Bound on the SPSC input queue; a full queue returns `Busy` to the
    /// caller rather than blocking the host thread.
    #[serde(default = "default_input_queue_capacity")]
    pub input_queue_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self { scale_factor: default_scale_factor(), input_queue_capacity: default_input_queue_capacity() }
    }
}

fn default_dark_mode() -> bool {
    true
}

/// Per-terminal open parameters.
///
/// `palette_overrides` is the engine's hook for "feed a configuration struct
/// into the engine" theming (spec's theme-loading Non-goal leaves parsing a
/// theme file to the host): a map of the 16 ANSI color names
/// (`"red"`, `"bright_blue"`, `"foreground"`, ...) to RGB triples in 0.0-1.0
/// range. Names that don't match a known ANSI color are ignored rather than
/// rejected, so a host can pass through an entire unfiltered theme file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenConfig {
    pub cols: u16,
    pub rows: u16,
    #[serde(default)]
    pub cwd: Option<PathBuf>,
    #[serde(default = "default_dark_mode")]
    pub dark_mode: bool,
    #[serde(default)]
    pub palette_overrides: HashMap<String, (f32, f32, f32)>,
}

impl OpenConfig {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { cols, rows, cwd: None, dark_mode: default_dark_mode(), palette_overrides: HashMap::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_config_deserializes_from_an_empty_object() {
        let config: PoolConfig = serde_json::from_str("{}").expect("defaults fill in");
        assert_eq!(config.scale_factor, 1.0);
        assert_eq!(config.input_queue_capacity, 256);
    }

    #[test]
    fn open_config_round_trips_through_json() {
        let config = OpenConfig {
            cols: 80,
            rows: 24,
            cwd: Some(PathBuf::from("/tmp")),
            dark_mode: false,
            palette_overrides: HashMap::new(),
        };
        let json = serde_json::to_string(&config).expect("serialize");
        let back: OpenConfig = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.cols, 80);
        assert_eq!(back.cwd, Some(PathBuf::from("/tmp")));
        assert!(!back.dark_mode);
    }

    #[test]
    fn open_config_palette_overrides_default_to_empty() {
        let config: OpenConfig = serde_json::from_str(r#"{"cols":80,"rows":24}"#).expect("defaults fill in");
        assert!(config.palette_overrides.is_empty());
    }
}

//! Thin `env_logger` wrapper, matching the teacher's `fn main() { env_logger::init(); ... }`
//! call site but made idempotent: the FFI boundary and an embedding host may
//! both want to call this, and `env_logger::init()` panics on a second call.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the default `env_logger` subscriber, reading `RUST_LOG` the same
/// way the teacher's app binary does. Safe to call more than once — only the
/// first call takes effect.
pub fn init_logging() {
    INIT.call_once(|| {
        env_logger::init();
    });
}

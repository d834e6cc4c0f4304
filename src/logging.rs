//! Purpose: Process-level tracing setup for hosts that do not install their own subscriber.
//! Exports: `init_tracing`.
//! Role: Optional; library code only emits `tracing` events and never requires a subscriber.
//! Invariants: Idempotent; a subscriber installed elsewhere wins and is left alone.

use tracing_subscriber::EnvFilter;

/// Installs a fmt subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` when a global subscriber was already set.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::init_tracing;

    #[test]
    fn second_init_is_a_no_op() {
        init_tracing();
        assert!(!init_tracing());
    }
}

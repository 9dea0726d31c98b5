//! Tracing initialization for tests and binaries
//!
//! Environment-based filtering via `RUST_LOG`, e.g.
//! `RUST_LOG=rustywlan=debug` or `RUST_LOG=rustywlan::framesync=trace`.

use once_cell::sync::Lazy;

/// Initialize tracing for tests; safe to call from every test
pub fn init_test_tracing() {
    static TRACING: Lazy<()> = Lazy::new(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("rustywlan=warn"));

        fmt()
            .with_env_filter(filter)
            .with_target(true)
            .with_line_number(true)
            .with_test_writer()
            .try_init()
            .ok();
    });

    Lazy::force(&TRACING);
}

/// Initialize tracing for binaries; call early in main()
pub fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rustywlan=info"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_line_number(true)
        .init();
}

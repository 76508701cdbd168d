pub mod mock_ntfy;

/// Route listener logs to the test harness. `RUST_LOG` selects the level;
/// nothing is printed without it.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

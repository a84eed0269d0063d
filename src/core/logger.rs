use env_logger::Env;

/// Info level unless `RUST_LOG` says otherwise.
pub fn setup_logging() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();
}

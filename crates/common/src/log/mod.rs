use tracing_subscriber::{EnvFilter, filter::LevelFilter, fmt, prelude::*};

/// Installs the global subscriber writing to stdout. The configured level
/// seeds the default directive; `RUST_LOG` still overrides it.
pub fn logging_stdout(default_level: &str) -> impl Drop {
    let (nonblocking, _guard) = tracing_appender::non_blocking(std::io::stdout());

    let default_level = default_level
        .parse::<LevelFilter>()
        .unwrap_or(LevelFilter::INFO);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(nonblocking)
                .with_file(cfg!(debug_assertions))
                .with_line_number(cfg!(debug_assertions)),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .init();

    _guard
}

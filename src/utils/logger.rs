use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    /// JSON lines, for running under a service manager that ships logs elsewhere.
    Json,
}

/// `RUST_LOG` wins over the verbosity flag.
fn tracker_filter(verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let directive = if verbose {
            "valheim_tracker=debug,info"
        } else {
            "valheim_tracker=info,warn"
        };
        EnvFilter::new(directive)
    })
}

pub fn init_logger(format: LogFormat, verbose: bool) {
    let base = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let output = match format {
        LogFormat::Compact => base.compact().boxed(),
        LogFormat::Json => base.json().boxed(),
    };

    tracing_subscriber::registry()
        .with(tracker_filter(verbose))
        .with(output)
        .init();
}

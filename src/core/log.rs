use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

/// Installs the global subscriber. Verbose mode shows this crate's debug
/// output; the storage engine and HTTP client only surface warnings.
/// `RUST_LOG` overrides the default directive.
pub fn init_logging(verbose: bool) {
    let (app_level, dependency_level, directive) = if verbose {
        (LevelFilter::DEBUG, LevelFilter::WARN, "debug")
    } else {
        (LevelFilter::OFF, LevelFilter::OFF, "off")
    };

    let targets = Targets::new()
        .with_target("ratewatch", app_level)
        .with_target("fjall", dependency_level)
        .with_target("lsm_tree", dependency_level)
        .with_target("reqwest", dependency_level)
        .with_target("hyper_util", dependency_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    // Report tables go to stdout, diagnostics stay on stderr
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .pretty()
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(targets)
        .with(env_filter)
        .init();
}

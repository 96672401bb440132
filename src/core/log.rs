use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const APP_TARGET: &str = "fundsync";

/// Directive used when `RUST_LOG` is unset.
fn default_directive(verbose: bool) -> String {
    if verbose {
        // Keep HTTP and storage internals out of verbose output
        format!("{APP_TARGET}=debug,reqwest=warn,hyper=warn,fjall=warn,lsm_tree=warn")
    } else {
        "off".to_string()
    }
}

/// Installs the global subscriber on stderr so tables on stdout stay clean.
///
/// `RUST_LOG` wins over `verbose` when set.
pub fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbose)));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(verbose)
                .without_time(),
        )
        .with(filter)
        .try_init();
}

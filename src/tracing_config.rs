use eyre::Result;
use tracing::subscriber::set_global_default;
use tracing_error::ErrorLayer;
use tracing_log::LogTracer;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};
use tracing_tree::HierarchicalLayer;

/// Used when `LOG` is unset or unparseable. HTTP client internals only speak up on problems.
const DEFAULT_FILTER: &str = "info,hyper=warn,reqwest=warn";

fn log_filter(spec: Option<&str>) -> EnvFilter {
    spec.and_then(|s| EnvFilter::try_new(s).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Logs go to stderr so `handle` output on stdout stays clean.
pub fn init_tracing() -> Result<()> {
    LogTracer::builder()
        .ignore_crate("rustls")
        .with_max_level(log::LevelFilter::Debug)
        .init()?;

    let spec = std::env::var("LOG").ok();
    let tree = HierarchicalLayer::new(2)
        .with_writer(std::io::stderr)
        .with_targets(true)
        .with_bracketed_fields(true);
    let subscriber = Registry::default()
        .with(log_filter(spec.as_deref()))
        .with(tree)
        .with(ErrorLayer::default());

    set_global_default(subscriber)?;
    Ok(())
}

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_tree::HierarchicalLayer;
use tracing_tree::time::Uptime;

/// Environment variable holding the filter directives, e.g. `tagwm=debug`.
pub const LOG_ENV: &str = "TAGWM_LOG";

/// Installs the global subscriber. Output goes to stderr; stdout belongs to
/// the display bridge.
pub fn init_logging() {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .with_env_var(LOG_ENV)
        .from_env_lossy();
    let tree = HierarchicalLayer::default()
        .with_writer(std::io::stderr)
        .with_indent_lines(true)
        .with_targets(true)
        .with_bracketed_fields(true)
        .with_timer(Uptime::default());
    // A second call (tests, re-init) keeps the first subscriber.
    let _ = tracing_subscriber::registry().with(filter).with(tree).try_init();
}

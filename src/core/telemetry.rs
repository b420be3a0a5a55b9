//! core/telemetry.rs
//! tracing subscriber setup. Filter comes from `RUST_LOG`, default `info`.

use tracing_subscriber::{EnvFilter, Registry, fmt, layer::SubscriberExt};

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_target(false);
    let subscriber = Registry::default().with(env_filter).with(fmt_layer);

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("tracing already initialised: {e}");
    }
}

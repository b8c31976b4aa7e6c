use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str = "info,stt_stream=debug";

/// Install the global subscriber. Logs go to stderr so stdout only carries results.
pub fn init_tracing(json: bool) {
	let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
	let registry = tracing_subscriber::registry().with(env_filter);

	if json {
		registry.with(fmt::layer().json().with_target(true).with_writer(std::io::stderr)).init();
	} else {
		registry.with(fmt::layer().with_target(true).with_writer(std::io::stderr)).init();
	}
}

use tilehop_engine::{LoopConfig, StepperConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const SLOW_MOTION_ENV_VAR: &str = "TILEHOP_SLOW_MOTION";

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
}

pub(crate) fn build_app() -> AppWiring {
    init_tracing();
    info!(version = env!("CARGO_PKG_VERSION"), "=== tilehop startup ===");

    let defaults = StepperConfig::default();
    let slow = std::env::var(SLOW_MOTION_ENV_VAR)
        .ok()
        .map_or(defaults.slow, |raw| parse_slow_motion(&raw, defaults.slow));
    let config = LoopConfig {
        stepper: StepperConfig { slow, ..defaults },
        ..LoopConfig::default()
    };

    AppWiring { config }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_slow_motion(raw: &str, fallback: f64) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value,
        _ => {
            warn!(
                env_var = SLOW_MOTION_ENV_VAR,
                value = raw,
                "invalid slow-motion factor; falling back to default"
            );
            fallback
        }
    }
}

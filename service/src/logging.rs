use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder};

/// Dependencies silenced unless the level is Trace.
const FILTERED_MODULES: &[&str] = &[
    "tower",
    "tower_sessions",
    "tower_http",
    "hyper",
    "axum",
    "tungstenite",
    "tokio_tungstenite",
    "notify",
    "minijinja",
];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger.
    ///
    /// With the level at Trace everything is shown, including dependency logs.
    /// Any other level hides the modules in [`FILTERED_MODULES`].
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let log_level_filter = Self::effective_level(config);
        let apply_filters = Self::should_filter_dependencies(log_level_filter);
        let log_config = Self::build_log_config(apply_filters);

        simplelog::TermLogger::init(
            Self::convert_level_filter(log_level_filter),
            log_config,
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    // Debug logging needs at least the Debug level to be visible.
    fn effective_level(config: &Config) -> LevelFilter {
        if config.debug_log() {
            config.log_level_filter.max(LevelFilter::Debug)
        } else {
            config.log_level_filter
        }
    }

    fn convert_level_filter(level: LevelFilter) -> simplelog::LevelFilter {
        match level {
            LevelFilter::Off => simplelog::LevelFilter::Off,
            LevelFilter::Error => simplelog::LevelFilter::Error,
            LevelFilter::Warn => simplelog::LevelFilter::Warn,
            LevelFilter::Info => simplelog::LevelFilter::Info,
            LevelFilter::Debug => simplelog::LevelFilter::Debug,
            LevelFilter::Trace => simplelog::LevelFilter::Trace,
        }
    }

    fn should_filter_dependencies(level: LevelFilter) -> bool {
        level != LevelFilter::Trace
    }

    fn build_log_config(apply_filters: bool) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        if apply_filters {
            for module in FILTERED_MODULES {
                builder.add_filter_ignore_str(module);
            }
        }

        builder.build()
    }
}

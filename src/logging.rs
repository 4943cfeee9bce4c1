use tracing_subscriber::{fmt, EnvFilter};

use crate::config::{Config, DEFAULT_LOG_FILTER};

/// Installs the global stderr subscriber. `verbose` forces debug output.
/// Calling this twice is harmless; the first subscriber stays.
pub fn init(config: &Config, verbose: bool) {
    let filter = build_filter(&config.log_filter, verbose);
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn build_filter(directives: &str, verbose: bool) -> EnvFilter {
    if verbose {
        return EnvFilter::new("debug");
    }
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbose_forces_debug() {
        assert_eq!(build_filter("error", true).to_string(), "debug");
    }

    #[test]
    fn valid_directives_are_kept() {
        assert_eq!(build_filter("flipnote=info", false).to_string(), "flipnote=info");
    }

    #[test]
    fn init_twice_does_not_panic() {
        let config = Config::new();
        init(&config, false);
        init(&config, true);
    }
}

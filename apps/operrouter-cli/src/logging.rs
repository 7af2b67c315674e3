//! Tracing subscriber setup.

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Filter directive for the given verbosity.
///
/// `RUST_LOG` wins over everything; otherwise `-v` selects info, `-vv`
/// debug and `-vvv` trace, and no flag falls back to the configured level.
#[must_use]
pub fn filter_directive(cfg: &LoggingConfig, verbose: u8) -> String {
    if let Ok(directive) = std::env::var(EnvFilter::DEFAULT_ENV)
        && !directive.trim().is_empty()
    {
        return directive;
    }

    match verbose {
        0 => cfg.level.clone(),
        1 => "info".to_owned(),
        2 => "debug".to_owned(),
        _ => "trace".to_owned(),
    }
}

/// Install the global subscriber. Logs go to stderr so stdout only carries
/// command output. A second call is a no-op.
pub fn init_logging(cfg: &LoggingConfig, verbose: u8) {
    let directive = filter_directive(cfg, verbose);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new("warn"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true);

    let installed = if cfg.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };

    if installed.is_ok() {
        tracing::debug!(%directive, json = cfg.json, "logging initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_selects_level() {
        temp_env::with_var_unset("RUST_LOG", || {
            let cfg = LoggingConfig::default();
            assert_eq!(filter_directive(&cfg, 0), "warn");
            assert_eq!(filter_directive(&cfg, 1), "info");
            assert_eq!(filter_directive(&cfg, 2), "debug");
            assert_eq!(filter_directive(&cfg, 7), "trace");
        });
    }

    #[test]
    fn rust_log_wins() {
        temp_env::with_var("RUST_LOG", Some("operrouter_grpc=trace"), || {
            assert_eq!(
                filter_directive(&LoggingConfig::default(), 2),
                "operrouter_grpc=trace"
            );
        });
    }

    #[test]
    fn configured_level_is_the_fallback() {
        temp_env::with_var_unset("RUST_LOG", || {
            let cfg = LoggingConfig {
                level: "operrouter_http=debug,warn".to_owned(),
                json: true,
            };
            assert_eq!(filter_directive(&cfg, 0), "operrouter_http=debug,warn");
        });
    }
}

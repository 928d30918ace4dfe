//! Configuration, errors and logging shared by the getappt binary.

pub mod config;
pub mod error;

pub use config::{
    AppointmentsConfig, AvailabilityConfig, Config, DeliveryConfig, ExchangeConfig,
    ValidationResult,
};
pub use error::{ConfigError, DeliveryError};

/// Initialize tracing/logging on stderr.
///
/// `trace_target` names a target to open up to `trace` level, used for
/// protocol dumps. `RUST_LOG` takes precedence over both arguments.
pub fn init_logging(verbose: bool, trace_target: Option<&str>) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    tracing_subscriber::EnvFilter::new(default_directives(verbose, trace_target))
                }),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn default_directives(verbose: bool, trace_target: Option<&str>) -> String {
    let base = if verbose { "info" } else { "warn" };
    match trace_target {
        Some(target) => format!("{base},{target}=trace"),
        None => base.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(default_directives(false, None), "warn");
        assert_eq!(default_directives(true, None), "info");
        assert_eq!(default_directives(false, Some("ews_trace")), "warn,ews_trace=trace");
        assert_eq!(default_directives(true, Some("ews_trace")), "info,ews_trace=trace");
    }
}

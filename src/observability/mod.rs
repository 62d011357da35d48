//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Consumers:
//!     → Log aggregation (stdout, file, remote)
//!     → Metrics endpoint (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured fields over string interpolation for machine parsing
//! - Metrics are cheap (atomic increments); recording without an
//!   installed exporter is a no-op

pub mod logging;
pub mod metrics;

pub use logging::init_logging;
pub use metrics::init_metrics;

use crate::config::ObservabilityConfig;

/// Initialize logging and, when enabled, the metrics exporter.
pub fn init(config: &ObservabilityConfig) {
    logging::init_logging(&config.log_level);
    if config.metrics_enabled {
        match config.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    address = %config.metrics_address,
                    "invalid metrics exporter address"
                );
            }
        }
    }
}

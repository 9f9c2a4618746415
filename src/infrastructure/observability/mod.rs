//! Push-based observability for Inferno
//!
//! Observability through **outbound data only**: a Prometheus registry kept
//! in-process and a reporter that periodically writes a JSON snapshot to
//! stdout. No HTTP server, no incoming requests.

pub mod metrics;
pub mod reporter;

pub use metrics::Metrics;
pub use reporter::MetricsReporter;

//! spamdb node: wires the reputation ledger to LMDB.
//!
//! The node:
//! - Loads TOML configuration
//! - Opens and integrity-checks the LMDB environment
//! - Provisions the day window for each configured country code
//! - Serves reports, queries and downloads
//! - Exports Prometheus metrics
//!
//! Logging is process-global: the embedding binary calls
//! [`NodeConfig::init_logging`] once before opening the node.

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod node;

pub use config::NodeConfig;
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use metrics::NodeMetrics;
pub use node::SpamDbNode;

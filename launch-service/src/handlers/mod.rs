//! HTTP handlers for the launch service.

pub mod generation;
pub mod health;
pub mod metrics;
pub mod providers;
pub mod status;

pub use generation::generate;
pub use health::health_check;
pub use self::metrics::metrics_endpoint;
pub use providers::list_providers;
pub use status::session_status;

pub mod metrics;
pub mod providers;
pub mod shutdown;

pub use metrics::{get_metrics, init_metrics, record_generation};
pub use shutdown::ShutdownTrigger;

pub mod link;
pub mod metrics;

pub use link::{LinkError, OverflowPolicy, StreamLink, DEFAULT_RX_BUFFER};
pub use metrics::{encode_metrics, init_metrics, serve_metrics};

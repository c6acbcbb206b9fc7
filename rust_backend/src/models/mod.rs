pub mod metrics;
pub mod recording;

pub use metrics::*;
pub use recording::*;

//! Service layer: metric computations and their orchestration.
//!
//! - [`metrics`]: pure per-bin computations on loaded data
//! - [`aggregator`]: chunk-by-chunk table construction over a repository
//! - [`session`]: settings, plan and entry points of one analysis

pub mod aggregator;
pub mod metrics;
pub mod session;

pub use aggregator::Aggregator;
pub use session::AnalysisSession;

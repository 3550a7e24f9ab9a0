// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod config;
pub mod error;
pub mod feed;
pub mod metrics;
pub mod normalize;
pub mod pipeline;
pub mod resolve;
pub mod scheduler;
pub mod sink;

// ---- Re-exports for stable public API ----
pub use crate::error::{AcquisitionError, CatalogError, CycleError, SinkError, SinkOp};
pub use crate::normalize::{
    normalize, CycleSummary, LeagueResultSet, ProjectionRecord, ResolutionGap,
};
pub use crate::pipeline::{Cycle, CycleReport, Pipeline};
pub use crate::resolve::{resolve, PlayerInfo, ReferenceTables};
pub use crate::scheduler::{run_cycle_guarded, Scheduler, SchedulerHandle};

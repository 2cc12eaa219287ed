//! Nightly CI - the nightly build pipeline
//!
//! Runs the external tools stage by stage, then:
//! - Assembles the status page from the artifacts of passing stages
//! - Publishes it with the artifacts in one swap
//! - Marks the previous page stale or failed when sync or build break

pub mod assemble;
pub mod depgraph;
pub mod pipeline;
pub mod runner;
pub mod stage;

// Re-export key types
pub use assemble::{ReportAssembler, StageFlags, SummaryStatus};
pub use pipeline::{NightlyPipeline, RunOptions, RunOutcome, RunReport};
pub use runner::{CiRunner, StageResult, TaskOutcome};
pub use stage::{BuiltinStage, FailureCheck, StageConfig};

//! Nightly Core Library
//!
//! Configuration, log scanning, test-summary parsing, and rendering and
//! publishing of the nightly status site.

pub mod config;
pub mod date;
pub mod error;
pub mod junit;
pub mod obs;
pub mod publish;
pub mod report;
pub mod scan;
pub mod telemetry;
pub mod transform;

pub use config::{CommandsConfig, NightlyConfig, ProjectConfig, SourceLayout};
pub use date::RunDate;
pub use error::{NightlyError, Result};
pub use junit::{parse_test_log, TestSummaryRow};
pub use publish::{RunLock, StagingArea};
pub use report::{Link, ReportPage};
pub use scan::{job_failed, segv_detected, FailureDetector, MarkerScan};
pub use telemetry::init_tracing;
pub use transform::{XmlTransform, Xsltproc};

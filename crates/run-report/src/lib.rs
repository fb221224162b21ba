//! # Run Report
//!
//! Outcome accounting for stepbind runs: per-step status, per-scenario
//! verdicts, the run summary that decides the process exit status, and the
//! JSON result log that Then-steps feed through their assertion records.

pub use stepbind_core;

mod report;
mod result_log;

pub use report::{FeatureReport, RunReport, RunSummary, ScenarioReport, StepReport, StepStatus};
pub use result_log::ResultLog;

pub use stepbind_core::AssertionRecord;

//! # Step Registry
//!
//! Maps step patterns to handlers and executes Gherkin scenarios against
//! them.
//!
//! - [`StepRegistry`] holds definitions in registration order and rejects
//!   overlapping patterns up front
//! - [`ScenarioRunner`] gives every scenario its own [`ScenarioContext`] and
//!   keeps running after a scenario fails
//! - [`parse_feature`] / [`load_features`] read `.feature` files

pub use run_report;
pub use stepbind_core;

mod feature;
mod pattern;
mod registry;
mod runner;
mod snippet;

pub use feature::{load_features, parse_feature, Feature, Scenario, Step};
pub use pattern::{PatternKind, StepPattern};
pub use registry::{RegistryStats, StepDefinition, StepHandler, StepKeyword, StepMatch, StepRegistry};
pub use runner::{ContextFactory, ScenarioRunner};
pub use snippet::suggest_expression;

// Re-export core types for convenience
pub use stepbind_core::{Arguments, ParamType, Result, ScenarioContext, StepData, StepError};

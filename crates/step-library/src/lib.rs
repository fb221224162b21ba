//! # Step Library
//!
//! Built-in step definitions: cluster health checks backed by the
//! collaborators in `cluster-probe`, and arithmetic demonstration steps.

pub use cluster_probe;
pub use step_registry;

pub mod calculator;
pub mod cluster;

pub use calculator::register_calculator_steps;
pub use cluster::{register_cluster_steps, ClusterSteps, POD_STATUS_LOOKUP_KEY};

use step_registry::StepRegistry;
use stepbind_core::Result;
use tracing::info;

/// Registry holding every built-in step
pub fn standard_registry(cluster: ClusterSteps) -> Result<StepRegistry> {
    let mut registry = StepRegistry::new();
    register_cluster_steps(&mut registry, cluster)?;
    register_calculator_steps(&mut registry)?;

    let stats = registry.stats();
    info!(
        total = stats.total,
        given = stats.given,
        when = stats.when,
        then = stats.then,
        "standard steps registered"
    );
    Ok(registry)
}

//! # Cluster Probe
//!
//! Collaborators the cluster steps call: a status probe, a pod query and the
//! command runner both sit on. Real implementations shell out to the
//! commands named in the YAML test configuration; the simulated ones serve
//! fixed answers.

pub use stepbind_core;

mod cluster;
mod command;
mod config;
mod pods;
pub mod simulated;

pub use cluster::{ClusterStatus, ClusterStatusProbe, MinikubeProbe};
pub use command::{CommandLine, CommandOutput, CommandRunner, SystemCommandRunner};
pub use config::{CommandTemplates, EnvironmentConfig, TestConfig};
pub use pods::{selector_equality, KubectlPodQuery, Pod, PodList, PodQuery};
pub use simulated::{ScriptedCommandRunner, StaticClusterProbe, StaticPodQuery};

//! Cluster status collaborator

use crate::command::{CommandLine, CommandRunner};
use crate::config::TestConfig;
use std::collections::BTreeMap;
use stepbind_core::Result;
use tracing::{info, instrument};

/// Free-text status output such as `minikube status` prints
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterStatus {
    raw: String,
    components: BTreeMap<String, String>,
}

impl ClusterStatus {
    pub fn parse(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let components = raw
            .lines()
            .filter_map(|line| line.split_once(':'))
            .map(|(key, value)| (key.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        Self { raw, components }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn component(&self, name: &str) -> Option<&str> {
        self.components
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// `host: Running`, and `kubelet: Running` when a kubelet line is present
    pub fn is_running(&self) -> bool {
        let running = |value: &str| value.eq_ignore_ascii_case("running");
        self.component("host").is_some_and(running) && self.component("kubelet").map_or(true, running)
    }
}

pub trait ClusterStatusProbe: Send + Sync {
    fn status(&self) -> Result<ClusterStatus>;
}

/// Queries cluster status through the configured status command
#[derive(Debug, Clone)]
pub struct MinikubeProbe<R> {
    runner: R,
    command: CommandLine,
}

impl<R: CommandRunner> MinikubeProbe<R> {
    pub fn new(runner: R, command: CommandLine) -> Self {
        Self { runner, command }
    }

    pub fn from_config(config: &TestConfig, runner: R) -> Result<Self> {
        let command = CommandLine::render(&config.commands.get_minikube_status, &[])?;
        Ok(Self::new(runner, command))
    }
}

impl<R: CommandRunner> ClusterStatusProbe for MinikubeProbe<R> {
    #[instrument(skip(self), fields(command = %self.command))]
    fn status(&self) -> Result<ClusterStatus> {
        let output = self.runner.run_checked(&self.command)?;
        let status = ClusterStatus::parse(output.combined());
        info!(running = status.is_running(), "cluster status queried");
        Ok(status)
    }
}

//! In-process collaborators for demos and tests

use crate::cluster::{ClusterStatus, ClusterStatusProbe};
use crate::command::{CommandLine, CommandOutput, CommandRunner};
use crate::pods::{Pod, PodList, PodQuery};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use stepbind_core::{Result, StepError};

/// Always reports the same status text
#[derive(Debug, Clone)]
pub struct StaticClusterProbe {
    status: ClusterStatus,
}

impl StaticClusterProbe {
    pub fn new(raw: impl Into<String>) -> Self {
        Self {
            status: ClusterStatus::parse(raw),
        }
    }

    pub fn running() -> Self {
        Self::new("host: Running\nkubelet: Running\napiserver: Running\n")
    }

    pub fn stopped() -> Self {
        Self::new("host: Stopped\nkubelet: Stopped\napiserver: Stopped\n")
    }
}

impl ClusterStatusProbe for StaticClusterProbe {
    fn status(&self) -> Result<ClusterStatus> {
        Ok(self.status.clone())
    }
}

/// Serves a fixed pod list, filtered by `key=value` selectors
#[derive(Debug, Default)]
pub struct StaticPodQuery {
    pods: PodList,
    calls: Mutex<Vec<(String, String)>>,
}

impl StaticPodQuery {
    pub fn new(pods: PodList) -> Self {
        Self {
            pods,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// One pod named after its `app` label
    pub fn single(app: &str, phase: &str) -> Self {
        Self::new(PodList {
            items: vec![Pod {
                name: format!("{app}-0"),
                labels: BTreeMap::from([("app".to_string(), app.to_string())]),
                phase: phase.to_string(),
            }],
        })
    }

    /// (selector, namespace) of every query so far
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().clone()
    }
}

impl PodQuery for StaticPodQuery {
    fn pods_by_label(&self, selector: &str, namespace: &str) -> Result<PodList> {
        self.calls
            .lock()
            .push((selector.to_string(), namespace.to_string()));

        let items = match crate::pods::selector_equality(selector) {
            Some((key, value)) => self
                .pods
                .items
                .iter()
                .filter(|pod| pod.labels.get(key).is_some_and(|v| v == value))
                .cloned()
                .collect(),
            None => self.pods.items.clone(),
        };
        Ok(PodList { items })
    }
}

/// Replays canned outputs keyed by the rendered command line
#[derive(Debug, Clone, Default)]
pub struct ScriptedCommandRunner {
    responses: Arc<Mutex<HashMap<String, CommandOutput>>>,
    invocations: Arc<Mutex<Vec<CommandLine>>>,
}

impl ScriptedCommandRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, command: &str, output: CommandOutput) {
        self.responses.lock().insert(command.to_string(), output);
    }

    pub fn invocations(&self) -> Vec<CommandLine> {
        self.invocations.lock().clone()
    }
}

impl CommandRunner for ScriptedCommandRunner {
    fn run(&self, command: &CommandLine) -> Result<CommandOutput> {
        self.invocations.lock().push(command.clone());
        self.responses
            .lock()
            .get(&command.to_string())
            .cloned()
            .ok_or_else(|| {
                StepError::collaborator(
                    command.program.clone(),
                    format!("no scripted output for `{command}`"),
                )
            })
    }
}

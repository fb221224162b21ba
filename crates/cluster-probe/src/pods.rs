//! Pod query collaborator
//!
//! `kubectl get pods -o json` output is decoded with explicit shape checks;
//! a document missing an expected field fails with a `CollaboratorFailure`
//! naming the offending path.

use crate::command::{CommandLine, CommandRunner};
use crate::config::TestConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use stepbind_core::{Result, StepError};
use tracing::{debug, instrument};

const COLLABORATOR: &str = "kubectl";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pod {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub phase: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PodList {
    pub items: Vec<Pod>,
}

fn shape_error(path: &str, expected: &str) -> StepError {
    StepError::collaborator(
        COLLABORATOR,
        format!("pod list JSON: expected {path} to be {expected}"),
    )
}

fn required_str<'a>(item: &'a Value, pointer: &str, path: String) -> Result<&'a str> {
    item.pointer(pointer)
        .and_then(Value::as_str)
        .ok_or_else(|| shape_error(&path, "a string"))
}

impl PodList {
    pub fn from_json(text: &str) -> Result<Self> {
        let document: Value = serde_json::from_str(text).map_err(|err| {
            StepError::collaborator(COLLABORATOR, format!("output is not valid JSON: {err}"))
        })?;
        Self::from_value(&document)
    }

    pub fn from_value(document: &Value) -> Result<Self> {
        let items = document
            .get("items")
            .and_then(Value::as_array)
            .ok_or_else(|| shape_error("items", "an array"))?;

        let items = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let name = required_str(item, "/metadata/name", format!("items[{index}].metadata.name"))?;
                let phase = required_str(item, "/status/phase", format!("items[{index}].status.phase"))?;
                let labels = match item.pointer("/metadata/labels") {
                    None | Some(Value::Null) => BTreeMap::new(),
                    Some(Value::Object(map)) => map
                        .iter()
                        .map(|(key, value)| {
                            value
                                .as_str()
                                .map(|value| (key.clone(), value.to_string()))
                                .ok_or_else(|| {
                                    shape_error(
                                        &format!("items[{index}].metadata.labels.{key}"),
                                        "a string",
                                    )
                                })
                        })
                        .collect::<Result<_>>()?,
                    Some(_) => {
                        return Err(shape_error(
                            &format!("items[{index}].metadata.labels"),
                            "an object",
                        ))
                    }
                };

                Ok(Pod {
                    name: name.to_string(),
                    labels,
                    phase: phase.to_string(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { items })
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first_phase(&self) -> Option<&str> {
        self.items.first().map(|pod| pod.phase.as_str())
    }

    pub fn find_labelled(&self, key: &str, value: &str) -> Option<&Pod> {
        self.items
            .iter()
            .find(|pod| pod.labels.get(key).is_some_and(|v| v == value))
    }
}

/// `key=value` from the first term of a label selector
pub fn selector_equality(selector: &str) -> Option<(&str, &str)> {
    let first = selector.split(',').next()?.trim();
    let (key, value) = first.split_once('=')?;
    let value = value.strip_prefix('=').unwrap_or(value);
    (!key.is_empty() && !key.ends_with('!')).then_some((key.trim(), value.trim()))
}

pub trait PodQuery: Send + Sync {
    fn pods_by_label(&self, selector: &str, namespace: &str) -> Result<PodList>;
}

/// Lists pods through the configured kubectl command template
#[derive(Debug, Clone)]
pub struct KubectlPodQuery<R> {
    runner: R,
    template: String,
    kubeconfig: Option<String>,
    context: Option<String>,
}

impl<R: CommandRunner> KubectlPodQuery<R> {
    pub fn from_config(config: &TestConfig, runner: R) -> Self {
        Self {
            runner,
            template: config.commands.get_pod_json_by_label.clone(),
            kubeconfig: config.environment.kubeconfig_path.clone(),
            context: config.environment.cluster_context_name.clone(),
        }
    }

    pub fn command(&self, selector: &str, namespace: &str) -> Result<CommandLine> {
        let mut command = CommandLine::render(
            &self.template,
            &[("label", selector), ("namespace", namespace)],
        )?;
        if let Some(kubeconfig) = &self.kubeconfig {
            command = command.arg("--kubeconfig").arg(kubeconfig.clone());
        }
        if let Some(context) = &self.context {
            command = command.arg("--context").arg(context.clone());
        }
        Ok(command)
    }
}

impl<R: CommandRunner> PodQuery for KubectlPodQuery<R> {
    #[instrument(skip(self))]
    fn pods_by_label(&self, selector: &str, namespace: &str) -> Result<PodList> {
        let command = self.command(selector, namespace)?;
        let output = self.runner.run_checked(&command)?;
        let pods = PodList::from_json(&output.stdout)?;
        debug!(pods = pods.items.len(), "pods listed");
        Ok(pods)
    }
}

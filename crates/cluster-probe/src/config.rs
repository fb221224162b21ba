//! YAML test configuration
//!
//! Mirrors the `config.yaml` the step definitions read: environment details,
//! command templates and expected outputs. Every section is optional.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use stepbind_core::{Result, StepError};
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfig {
    pub environment: EnvironmentConfig,
    pub commands: CommandTemplates,
    pub expected_outputs: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    pub default_namespace: String,
    pub kubeconfig_path: Option<String>,
    pub cluster_context_name: Option<String>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            default_namespace: "default".to_string(),
            kubeconfig_path: None,
            cluster_context_name: None,
        }
    }
}

/// Command templates; `{label}` and `{namespace}` are substituted per call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandTemplates {
    pub get_minikube_status: String,
    pub get_pod_json_by_label: String,
}

impl Default for CommandTemplates {
    fn default() -> Self {
        Self {
            get_minikube_status: "minikube status".to_string(),
            get_pod_json_by_label: "kubectl get pods -l {label} -n {namespace} -o json"
                .to_string(),
        }
    }
}

impl TestConfig {
    pub const DEFAULT_FILE: &'static str = "config.yaml";

    pub fn from_yaml(text: &str) -> Result<Self> {
        // an empty document is an empty mapping
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text).map_err(|err| StepError::Configuration {
            reason: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|err| StepError::io(path.display().to_string(), err))?;
        let config = Self::from_yaml(&text).map_err(|err| match err {
            StepError::Configuration { reason } => StepError::Configuration {
                reason: format!("{}: {reason}", path.display()),
            },
            other => other,
        })?;
        info!(path = %path.display(), "loaded test configuration");
        Ok(config)
    }

    /// Search `start` and its ancestors for `file_name`
    pub fn discover(start: &Path, file_name: &str) -> Result<Option<(PathBuf, Self)>> {
        for dir in start.ancestors() {
            let candidate = dir.join(file_name);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((candidate, config)));
            }
        }
        debug!(start = %start.display(), file_name, "no test configuration found");
        Ok(None)
    }

    pub fn validate(&self) -> Result<()> {
        let fail = |reason: &str| {
            Err(StepError::Configuration {
                reason: reason.to_string(),
            })
        };
        if self.environment.default_namespace.trim().is_empty() {
            return fail("environment.default_namespace must not be empty");
        }
        if self.commands.get_minikube_status.trim().is_empty() {
            return fail("commands.get_minikube_status must not be empty");
        }
        if !self.commands.get_pod_json_by_label.contains("{label}") {
            return fail("commands.get_pod_json_by_label must contain {label}");
        }
        Ok(())
    }

    pub fn expected_output(&self, key: &str) -> Option<&str> {
        self.expected_outputs.get(key).map(String::as_str)
    }
}

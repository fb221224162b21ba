//! Cluster health steps
//!
//! Bindings for minikube/kubectl scenarios. The collaborators are injected so
//! the same steps run against a real cluster or the simulated ones.

use cluster_probe::{
    selector_equality, ClusterStatusProbe, KubectlPodQuery, MinikubeProbe, PodList, PodQuery,
    SystemCommandRunner, TestConfig,
};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use step_registry::StepRegistry;
use stepbind_core::{Arguments, Result, ScenarioContext, StepError};
use tracing::info;

pub mod keys {
    pub const CLUSTER_STATUS: &str = "cluster.status";
    pub const CLUSTER_CONTEXT: &str = "cluster.context";
    pub const NAMESPACE: &str = "cluster.namespace";
    pub const POD_LABEL: &str = "pods.label";
    pub const POD_LIST: &str = "pods.list";
    pub const POD_PHASE: &str = "pods.phase";
    pub const RESOURCE_NAME: &str = "pods.resource_name";
}

/// Lookup key literal pod status assertions are logged under; assertions
/// against `expected_outputs` use the entry's own key
pub const POD_STATUS_LOOKUP_KEY: &str = "podStatus";

/// Collaborators and settings shared by every cluster step
#[derive(Clone)]
pub struct ClusterSteps {
    pub probe: Arc<dyn ClusterStatusProbe>,
    pub pods: Arc<dyn PodQuery>,
    pub namespace: String,
    pub cluster_context: String,
    pub expected_outputs: BTreeMap<String, String>,
}

impl fmt::Debug for ClusterSteps {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClusterSteps")
            .field("namespace", &self.namespace)
            .field("cluster_context", &self.cluster_context)
            .field("expected_outputs", &self.expected_outputs)
            .finish()
    }
}

impl ClusterSteps {
    pub fn new(probe: Arc<dyn ClusterStatusProbe>, pods: Arc<dyn PodQuery>) -> Self {
        let defaults = TestConfig::default();
        Self {
            probe,
            pods,
            namespace: defaults.environment.default_namespace,
            cluster_context: "minikube".to_string(),
            expected_outputs: BTreeMap::new(),
        }
    }

    /// Real collaborators driven by the configured command templates
    pub fn from_config(config: &TestConfig) -> Result<Self> {
        let probe = MinikubeProbe::from_config(config, SystemCommandRunner)?;
        let pods = KubectlPodQuery::from_config(config, SystemCommandRunner);
        Ok(Self {
            namespace: config.environment.default_namespace.clone(),
            cluster_context: config
                .environment
                .cluster_context_name
                .clone()
                .unwrap_or_else(|| "minikube".to_string()),
            expected_outputs: config.expected_outputs.clone(),
            ..Self::new(Arc::new(probe), Arc::new(pods))
        })
    }

    fn cluster_accessible(&self, ctx: &mut ScenarioContext) -> Result<()> {
        let status = self.probe.status()?;
        ctx.insert(keys::CLUSTER_STATUS, status.raw())?;
        if !status.is_running() {
            return Err(StepError::collaborator(
                "minikube",
                format!("cluster is not running: {}", status.raw().trim()),
            ));
        }
        ctx.insert(keys::CLUSTER_CONTEXT, &self.cluster_context)?;
        ctx.insert(keys::NAMESPACE, &self.namespace)
    }

    fn check_pod_status(&self, ctx: &mut ScenarioContext, args: &Arguments) -> Result<()> {
        let selector = args.text(0)?;
        let namespace = ctx
            .get::<String>(keys::NAMESPACE)?
            .unwrap_or_else(|| self.namespace.clone());

        let pods = self.pods.pods_by_label(selector, &namespace)?;
        info!(selector, namespace = %namespace, pods = pods.items.len(), "pod status checked");

        ctx.insert(keys::POD_LABEL, selector)?;
        if let Some(phase) = pods.first_phase() {
            ctx.insert(keys::POD_PHASE, phase)?;
        }
        if let Some(pod) =
            selector_equality(selector).and_then(|(key, value)| pods.find_labelled(key, value))
        {
            ctx.insert(keys::RESOURCE_NAME, &pod.name)?;
        }
        ctx.insert(keys::POD_LIST, &pods)
    }

    fn assert_pod_phase(
        &self,
        ctx: &mut ScenarioContext,
        lookup_key: &str,
        expected: &str,
    ) -> Result<()> {
        let pods: PodList = ctx.require(keys::POD_LIST)?;
        let Some(actual) = pods.first_phase() else {
            let selector: String = ctx.get(keys::POD_LABEL)?.unwrap_or_default();
            return Err(StepError::collaborator(
                "kubectl",
                format!("no pods matched label {selector:?}"),
            ));
        };

        let passed = actual.eq_ignore_ascii_case(expected);
        ctx.record_assertion(lookup_key, expected, actual, passed);
        if passed {
            Ok(())
        } else {
            Err(StepError::mismatch("pod status", expected, actual))
        }
    }

    fn expected_output(&self, key: &str) -> Result<&str> {
        self.expected_outputs
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| StepError::Configuration {
                reason: format!("expected_outputs has no entry {key:?}"),
            })
    }
}

pub fn register_cluster_steps(registry: &mut StepRegistry, steps: ClusterSteps) -> Result<()> {
    let steps = Arc::new(steps);

    let accessible = {
        let steps = Arc::clone(&steps);
        move |ctx: &mut ScenarioContext, _: &Arguments| steps.cluster_accessible(ctx)
    };
    let check = {
        let steps = Arc::clone(&steps);
        move |ctx: &mut ScenarioContext, args: &Arguments| steps.check_pod_status(ctx, args)
    };
    let phase = {
        let steps = Arc::clone(&steps);
        move |ctx: &mut ScenarioContext, args: &Arguments| {
            let expected = args.text(0)?;
            steps.assert_pod_phase(ctx, POD_STATUS_LOOKUP_KEY, expected)
        }
    };
    let configured_phase = {
        let steps = Arc::clone(&steps);
        move |ctx: &mut ScenarioContext, args: &Arguments| {
            let key = args.text(0)?;
            let expected = steps.expected_output(key)?.to_string();
            steps.assert_pod_phase(ctx, key, &expected)
        }
    };

    registry
        .given("the mini Kube cluster is accessible", accessible.clone())?
        .given("the mini Kube cluster is up and reachable", accessible)?
        .when("I check the status of the pod with label {string}", check.clone())?
        .when(
            "I request the current operational status of the pod with label {string}",
            check,
        )?
        .then("the pod status should be {string}", phase.clone())?
        .then("the returned status for this pod must be {string}", phase)?
        .then(
            "the pod status should match the expected output {string}",
            configured_phase,
        )?;
    Ok(())
}

//! BDD Tests for the built-in step library

use cucumber::gherkin::Step;
use cucumber::{given, then, when, World};
use std::sync::Arc;
use step_library::cluster_probe::{StaticClusterProbe, StaticPodQuery};
use step_library::step_registry::{parse_feature, run_report::ScenarioReport, ScenarioRunner};
use step_library::{standard_registry, ClusterSteps};

#[derive(Debug, World)]
#[world(init = Self::new)]
struct LibraryWorld {
    probe: StaticClusterProbe,
    pods: StaticPodQuery,
    report: Option<ScenarioReport>,
}

impl LibraryWorld {
    fn new() -> Self {
        Self {
            probe: StaticClusterProbe::running(),
            pods: StaticPodQuery::default(),
            report: None,
        }
    }

    fn report(&self) -> &ScenarioReport {
        self.report.as_ref().expect("a scenario has run")
    }
}

#[given(expr = "a running cluster with pod {string} in phase {string}")]
async fn given_running_cluster(world: &mut LibraryWorld, app: String, phase: String) {
    world.probe = StaticClusterProbe::running();
    world.pods = StaticPodQuery::single(&app, &phase);
}

#[given("a stopped cluster")]
async fn given_stopped_cluster(world: &mut LibraryWorld) {
    world.probe = StaticClusterProbe::stopped();
}

#[when("I run the scenario:")]
async fn when_run_scenario(world: &mut LibraryWorld, step: &Step) {
    let body = step.docstring.as_deref().expect("scenario steps as a doc string");
    let text = format!("Feature: library\n  Scenario: embedded\n{body}\n");
    let feature = parse_feature("embedded.feature", &text).expect("embedded feature parses");

    let probe = std::mem::replace(&mut world.probe, StaticClusterProbe::running());
    let pods = std::mem::take(&mut world.pods);
    let registry = standard_registry(ClusterSteps::new(Arc::new(probe), Arc::new(pods)))
        .expect("standard steps register");

    let runner = ScenarioRunner::new(Arc::new(registry));
    world.report = Some(runner.run_scenario(&feature.background, &feature.scenarios[0]));
}

#[then("the scenario should pass")]
async fn then_passes(world: &mut LibraryWorld) {
    let report = world.report();
    assert!(report.passed(), "{:?}", report.failure());
}

#[then(expr = "the scenario should fail with {word} mentioning {string}")]
async fn then_fails_with(world: &mut LibraryWorld, kind: String, text: String) {
    let failure = world.report().failure().expect("a failed step");
    let message = format!("{:?}", failure.status);
    assert!(message.contains(&kind), "{message}");
    assert!(message.contains(&text), "{message}");
}

#[then(expr = "{int} step(s) should be skipped")]
async fn then_skipped(world: &mut LibraryWorld, count: usize) {
    let skipped = world
        .report()
        .steps
        .iter()
        .filter(|step| !step.status.is_passed() && !step.status.is_failed())
        .count();
    assert_eq!(skipped, count);
}

#[then(expr = "{int} assertion(s) should be recorded")]
async fn then_assertions(world: &mut LibraryWorld, count: usize) {
    assert_eq!(world.report().assertions.len(), count);
}

#[tokio::main]
async fn main() {
    LibraryWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/features")
        .await;
}

//! Scenario runner
//!
//! Runs parsed features against a registry, one fresh context per scenario.
//! A failing step ends its scenario; the run itself always continues.

use crate::feature::{Feature, Scenario, Step};
use crate::registry::StepRegistry;
use crate::snippet::suggest_expression;
use run_report::{FeatureReport, RunReport, ScenarioReport, StepReport, StepStatus};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use stepbind_core::{ScenarioContext, StepError};
use tracing::{info, instrument, warn};

/// Builds the context each scenario starts from
pub type ContextFactory = Arc<dyn Fn(&Scenario) -> ScenarioContext + Send + Sync>;

#[derive(Clone)]
pub struct ScenarioRunner {
    registry: Arc<StepRegistry>,
    context_factory: ContextFactory,
    tags: Vec<String>,
}

impl fmt::Debug for ScenarioRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioRunner")
            .field("registry", &self.registry)
            .field("tags", &self.tags)
            .finish()
    }
}

impl ScenarioRunner {
    pub fn new(registry: Arc<StepRegistry>) -> Self {
        Self {
            registry,
            context_factory: Arc::new(|scenario: &Scenario| ScenarioContext::new(&scenario.name)),
            tags: Vec::new(),
        }
    }

    /// Seed every scenario's context, e.g. with configuration values
    pub fn with_context_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&Scenario) -> ScenarioContext + Send + Sync + 'static,
    {
        self.context_factory = Arc::new(factory);
        self
    }

    /// Only run scenarios carrying at least one of these tags (`@` optional)
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|tag| normalize_tag(tag.as_ref()))
            .collect();
        self
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn selects(&self, scenario: &Scenario) -> bool {
        self.tags.is_empty() || self.any_selected(&scenario.tags)
    }

    fn any_selected(&self, tags: &[String]) -> bool {
        tags.iter().any(|tag| self.tags.contains(&normalize_tag(tag)))
    }

    /// Feature background, rule background, then scenario steps, stopping at
    /// the first failure
    #[instrument(skip(self, background, scenario), fields(scenario = %scenario.name))]
    pub fn run_scenario(&self, background: &[Step], scenario: &Scenario) -> ScenarioReport {
        let mut context = (self.context_factory)(scenario);
        let mut steps = Vec::with_capacity(
            background.len() + scenario.background.len() + scenario.steps.len(),
        );
        let mut failed = false;

        let all_steps = background
            .iter()
            .chain(&scenario.background)
            .chain(&scenario.steps);
        for step in all_steps {
            if failed {
                steps.push(StepReport::skipped(&step.keyword, &step.text, step.line));
                continue;
            }

            let started = Instant::now();
            let outcome = self
                .registry
                .execute_step(&mut context, &step.text, &step.data);
            let duration_ms = started.elapsed().as_millis() as u64;

            let (status, snippet) = match outcome {
                Ok(()) => (StepStatus::Passed, None),
                Err(err) => {
                    failed = true;
                    warn!(line = step.line, kind = err.kind(), error = %err, "step failed");
                    let snippet = matches!(err, StepError::UndefinedStep { .. })
                        .then(|| suggest_expression(&step.text));
                    (StepStatus::failed(&err), snippet)
                }
            };

            steps.push(StepReport {
                keyword: step.keyword.clone(),
                text: step.text.clone(),
                line: step.line,
                status,
                duration_ms,
                snippet,
            });
        }

        info!(passed = !failed, "scenario finished");
        ScenarioReport {
            name: scenario.name.clone(),
            line: scenario.line,
            tags: scenario.tags.clone(),
            steps,
            assertions: context.into_assertions(),
        }
    }

    #[instrument(skip(self, feature), fields(feature = %feature.name))]
    pub fn run_feature(&self, feature: &Feature) -> FeatureReport {
        let scenarios = feature
            .scenarios
            .iter()
            // feature tags apply to every scenario in the feature
            .filter(|scenario| self.selects(scenario) || self.any_selected(&feature.tags))
            .map(|scenario| self.run_scenario(&feature.background, scenario))
            .collect();

        FeatureReport {
            name: feature.name.clone(),
            source: feature.source.clone(),
            scenarios,
        }
    }

    pub fn run(&self, features: &[Feature]) -> RunReport {
        let mut report = RunReport::new();
        for feature in features {
            report.push_feature(self.run_feature(feature));
        }
        report.finish();

        let summary = report.summary();
        info!(
            scenarios = summary.scenarios,
            failed = summary.scenarios_failed,
            "run finished"
        );
        report
    }
}

fn normalize_tag(tag: &str) -> String {
    let tag = tag.trim();
    if tag.starts_with('@') {
        tag.to_string()
    } else {
        format!("@{tag}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feature::parse_feature;

    fn registry() -> Arc<StepRegistry> {
        let mut registry = StepRegistry::new();
        registry
            .given("the counter starts at {int}", |ctx, args| {
                ctx.insert("counter", args.int(0)?)
            })
            .unwrap()
            .when("I increment the counter", |ctx, _| {
                let counter: i64 = ctx.get("counter")?.unwrap_or(0);
                ctx.insert("counter", counter + 1)
            })
            .unwrap()
            .then("the counter should be {int}", |ctx, args| {
                let expected = args.int(0)?;
                let actual: i64 = ctx.require("counter")?;
                ctx.record_assertion("counter", expected.to_string(), actual.to_string(), actual == expected);
                if actual == expected {
                    Ok(())
                } else {
                    Err(StepError::mismatch("counter", expected, actual))
                }
            })
            .unwrap();
        Arc::new(registry)
    }

    const FEATURE: &str = r#"
Feature: Counter
  Scenario: Undefined step stops the scenario
    Given the counter starts at 1
    When I dance "the tango" 2 times
    Then the counter should be 1

  @fast
  Scenario: Counter keeps counting
    When I increment the counter
    Then the counter should be 1
"#;

    #[test]
    fn failure_skips_rest_but_run_continues() {
        let feature = parse_feature("counter.feature", FEATURE).unwrap();
        let report = ScenarioRunner::new(registry()).run(&[feature]);

        let scenarios: Vec<_> = report.scenarios().collect();
        let broken = scenarios[0];
        assert!(!broken.passed());
        assert!(broken.steps[0].status.is_passed());
        assert_eq!(broken.steps[2].status, StepStatus::Skipped);
        assert_eq!(
            broken.steps[1].snippet.as_deref(),
            Some("I dance {string} {int} times")
        );

        // a fresh context: the counter set in the first scenario is gone
        assert!(scenarios[1].passed());
        assert_eq!(scenarios[1].assertions.len(), 1);
        assert_eq!(report.exit_code(), 1);
    }

    #[test]
    fn reruns_are_identical() {
        let feature = parse_feature("counter.feature", FEATURE).unwrap();
        let runner = ScenarioRunner::new(registry());
        let strip = |report: RunReport| {
            report
                .scenarios()
                .map(|s| s.steps.iter().map(|step| step.status.clone()).collect::<Vec<_>>())
                .collect::<Vec<_>>()
        };
        assert_eq!(strip(runner.run(&[feature.clone()])), strip(runner.run(&[feature])));
    }

    #[test]
    fn tag_filter_selects_scenarios() {
        let feature = parse_feature("counter.feature", FEATURE).unwrap();
        let report = ScenarioRunner::new(registry()).with_tags(["fast"]).run(&[feature]);
        assert_eq!(report.summary().scenarios, 1);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn feature_tags_select_every_scenario() {
        let text = "@counting\nFeature: tagged\n  Scenario: one\n    Given the counter starts at 1\n  Scenario: two\n    Given the counter starts at 2\n";
        let feature = parse_feature("tagged.feature", text).unwrap();
        let report = ScenarioRunner::new(registry())
            .with_tags(["@counting"])
            .run(&[feature]);
        assert_eq!(report.summary().scenarios, 2);
    }

    #[test]
    fn background_runs_before_each_scenario() {
        let text = "Feature: bg\n  Background:\n    Given the counter starts at 10\n  Scenario: one\n    When I increment the counter\n    Then the counter should be 11\n  Scenario: two\n    Then the counter should be 10\n";
        let feature = parse_feature("bg.feature", text).unwrap();
        let report = ScenarioRunner::new(registry()).run(&[feature]);
        assert_eq!(report.summary().scenarios_passed, 2);
    }

    #[test]
    fn rule_background_runs_after_feature_background() {
        let text = "Feature: rules\n  Background:\n    Given the counter starts at 10\n  Rule: bumped\n    Background:\n      When I increment the counter\n    Scenario: one\n      Then the counter should be 11\n  Rule: plain\n    Scenario: two\n      Then the counter should be 10\n";
        let feature = parse_feature("rules.feature", text).unwrap();
        let report = ScenarioRunner::new(registry()).run(&[feature]);
        assert_eq!(report.summary().scenarios_passed, 2);

        let first = report.scenarios().next().unwrap();
        assert_eq!(first.steps.len(), 3);
        assert_eq!(first.steps[1].line, 6);
    }

    #[test]
    fn data_table_reaches_the_handler() {
        let mut registry = StepRegistry::new();
        registry
            .given("the counters are", |ctx, args| {
                let rows = args.table().map_or(0, |rows| rows.len().saturating_sub(1));
                ctx.insert("rows", rows as i64)
            })
            .unwrap()
            .then("there are {int} counters", |ctx, args| {
                let expected = args.int(0)?;
                let actual: i64 = ctx.require("rows")?;
                if actual == expected {
                    Ok(())
                } else {
                    Err(StepError::mismatch("rows", expected, actual))
                }
            })
            .unwrap();

        let text = "Feature: tables\n  Scenario: rows\n    Given the counters are\n      | name |\n      | a    |\n      | b    |\n    Then there are 2 counters\n";
        let feature = parse_feature("tables.feature", text).unwrap();
        let report = ScenarioRunner::new(Arc::new(registry)).run(&[feature]);
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn context_factory_seeds_each_scenario() {
        let text = "Feature: seeded\n  Scenario: seeded\n    When I increment the counter\n    Then the counter should be 101\n";
        let feature = parse_feature("seeded.feature", text).unwrap();
        let runner = ScenarioRunner::new(registry()).with_context_factory(|scenario| {
            let mut ctx = ScenarioContext::new(&scenario.name);
            ctx.insert("counter", 100).expect("seed value serializes");
            ctx
        });
        assert_eq!(runner.run(&[feature]).exit_code(), 0);
    }
}

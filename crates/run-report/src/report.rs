//! Step, scenario and run outcomes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::path::Path;
use stepbind_core::{AssertionRecord, Result, StepError};
use tracing::info;

/// Outcome of a single step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Passed,
    Failed { kind: String, message: String },
    Skipped,
}

impl StepStatus {
    pub fn failed(error: &StepError) -> Self {
        StepStatus::Failed {
            kind: error.kind().to_string(),
            message: error.to_string(),
        }
    }

    pub fn is_passed(&self) -> bool {
        matches!(self, StepStatus::Passed)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub keyword: String,
    pub text: String,
    pub line: usize,
    #[serde(flatten)]
    pub status: StepStatus,
    pub duration_ms: u64,
    /// Suggested pattern when the step is undefined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snippet: Option<String>,
}

impl StepReport {
    pub fn skipped(keyword: impl Into<String>, text: impl Into<String>, line: usize) -> Self {
        Self {
            keyword: keyword.into(),
            text: text.into(),
            line,
            status: StepStatus::Skipped,
            duration_ms: 0,
            snippet: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub name: String,
    pub line: usize,
    pub tags: Vec<String>,
    pub steps: Vec<StepReport>,
    pub assertions: Vec<AssertionRecord>,
}

impl ScenarioReport {
    pub fn passed(&self) -> bool {
        self.steps.iter().all(|step| step.status.is_passed())
    }

    /// The step that terminated the scenario, if any
    pub fn failure(&self) -> Option<&StepReport> {
        self.steps.iter().find(|step| step.status.is_failed())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureReport {
    pub name: String,
    pub source: String,
    pub scenarios: Vec<ScenarioReport>,
}

impl FeatureReport {
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }
}

/// Counts across a whole run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub scenarios: usize,
    pub scenarios_passed: usize,
    pub scenarios_failed: usize,
    pub steps: usize,
    pub steps_passed: usize,
    pub steps_failed: usize,
    pub steps_skipped: usize,
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} scenarios ({} passed, {} failed)",
            self.scenarios, self.scenarios_passed, self.scenarios_failed
        )?;
        write!(
            f,
            "{} steps ({} passed, {} failed, {} skipped)",
            self.steps, self.steps_passed, self.steps_failed, self.steps_skipped
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub features: Vec<FeatureReport>,
}

impl RunReport {
    pub fn new() -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            features: Vec::new(),
        }
    }

    pub fn push_feature(&mut self, feature: FeatureReport) {
        self.features.push(feature);
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn scenarios(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.features.iter().flat_map(|feature| feature.scenarios.iter())
    }

    pub fn failed_scenarios(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.scenarios().filter(|scenario| !scenario.passed())
    }

    pub fn assertions(&self) -> impl Iterator<Item = &AssertionRecord> {
        self.scenarios().flat_map(|scenario| scenario.assertions.iter())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for scenario in self.scenarios() {
            summary.scenarios += 1;
            if scenario.passed() {
                summary.scenarios_passed += 1;
            } else {
                summary.scenarios_failed += 1;
            }
            for step in &scenario.steps {
                summary.steps += 1;
                match step.status {
                    StepStatus::Passed => summary.steps_passed += 1,
                    StepStatus::Failed { .. } => summary.steps_failed += 1,
                    StepStatus::Skipped => summary.steps_skipped += 1,
                }
            }
        }
        summary
    }

    /// Process exit status: nonzero if any scenario failed
    pub fn exit_code(&self) -> i32 {
        if self.failed_scenarios().next().is_some() {
            1
        } else {
            0
        }
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let body = serde_json::to_string_pretty(self)?;
        std::fs::write(path, body).map_err(|err| StepError::io(path.display().to_string(), err))?;
        info!(path = %path.display(), "run report written");
        Ok(())
    }

    /// Human-readable rendering for terminals
    pub fn render(&self) -> String {
        let mut out = String::new();
        for feature in &self.features {
            let _ = writeln!(out, "Feature: {} ({})", feature.name, feature.source);
            for scenario in &feature.scenarios {
                let _ = writeln!(out, "  Scenario: {}", scenario.name);
                for step in &scenario.steps {
                    let marker = match &step.status {
                        StepStatus::Passed => "✔",
                        StepStatus::Failed { .. } => "✘",
                        StepStatus::Skipped => "-",
                    };
                    let _ = writeln!(out, "    {} {} {}", marker, step.keyword, step.text);
                    if let StepStatus::Failed { message, .. } = &step.status {
                        let _ = writeln!(out, "        {message}");
                    }
                    if let Some(snippet) = &step.snippet {
                        let _ = writeln!(out, "        suggested pattern: {snippet}");
                    }
                }
            }
        }
        let _ = write!(out, "{}", self.summary());
        out
    }
}

impl Default for RunReport {
    fn default() -> Self {
        Self::new()
    }
}

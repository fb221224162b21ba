//! Per-scenario mutable state

use crate::error::{Result, StepError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;
use uuid::Uuid;

pub type ScenarioId = Uuid;

/// Outcome of one Then-step comparison, kept for the result log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionRecord {
    pub lookup_key: String,
    pub expected_value: String,
    pub actual_value: String,
    /// Absent from logs written before outcomes were recorded
    #[serde(default)]
    pub passed: bool,
}

/// State owned by exactly one scenario run.
///
/// Handlers receive it by `&mut` in step order; it is dropped when the
/// scenario ends, so nothing leaks into the next scenario.
#[derive(Debug, Clone)]
pub struct ScenarioContext {
    id: ScenarioId,
    scenario: String,
    values: BTreeMap<String, Value>,
    assertions: Vec<AssertionRecord>,
}

impl ScenarioContext {
    pub fn new(scenario: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            scenario: scenario.into(),
            values: BTreeMap::new(),
            assertions: Vec::new(),
        }
    }

    pub fn id(&self) -> ScenarioId {
        self.id
    }

    pub fn scenario(&self) -> &str {
        &self.scenario
    }

    /// Store a value under `key`, replacing any previous one
    pub fn insert<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value)?;
        debug!(scenario_id = %self.id, key = %key, "context value stored");
        self.values.insert(key, value);
        Ok(())
    }

    /// Read a value, `None` when absent
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.values
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|err| {
                    StepError::StepExecutionError {
                        reason: format!("context value {key} has unexpected shape: {err}"),
                    }
                })
            })
            .transpose()
    }

    /// Read a value that an earlier step must have stored
    pub fn require<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        self.get(key)?.ok_or_else(|| StepError::MissingContextValue {
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn record_assertion(
        &mut self,
        lookup_key: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
        passed: bool,
    ) {
        self.assertions.push(AssertionRecord {
            lookup_key: lookup_key.into(),
            expected_value: expected.into(),
            actual_value: actual.into(),
            passed,
        });
    }

    pub fn assertions(&self) -> &[AssertionRecord] {
        &self.assertions
    }

    pub fn into_assertions(self) -> Vec<AssertionRecord> {
        self.assertions
    }
}

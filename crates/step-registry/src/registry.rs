//! Step Registry Implementation
//!
//! Append-only list of step definitions. Matching is ordered and
//! keyword-agnostic; overlapping patterns are rejected when registered so
//! that at most one definition can claim a step line.

use crate::pattern::StepPattern;
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use stepbind_core::{keywords, Arguments, ParamType, Result, ScenarioContext, StepData, StepError};
use tracing::{debug, info, instrument, warn};

/// Handler invoked with the scenario's context and decoded arguments
pub type StepHandler =
    Arc<dyn Fn(&mut ScenarioContext, &Arguments) -> Result<()> + Send + Sync>;

/// Keyword a definition was registered under, informational only
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKeyword {
    Given,
    When,
    Then,
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StepKeyword::Given => keywords::GIVEN,
            StepKeyword::When => keywords::WHEN,
            StepKeyword::Then => keywords::THEN,
        })
    }
}

pub struct StepDefinition {
    index: usize,
    keyword: StepKeyword,
    pattern: StepPattern,
    handler: StepHandler,
}

impl StepDefinition {
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn keyword(&self) -> StepKeyword {
        self.keyword
    }

    pub fn pattern(&self) -> &StepPattern {
        &self.pattern
    }

    pub fn params(&self) -> &[ParamType] {
        self.pattern.params()
    }
}

impl fmt::Debug for StepDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepDefinition")
            .field("index", &self.index)
            .field("keyword", &self.keyword)
            .field("pattern", &self.pattern.source())
            .field("params", &self.pattern.params())
            .finish()
    }
}

/// A definition that claimed a step line, with its raw captures
#[derive(Debug, Clone)]
pub struct StepMatch {
    pub definition: Arc<StepDefinition>,
    pub captures: Vec<String>,
}

#[derive(Default)]
pub struct StepRegistry {
    definitions: Vec<Arc<StepDefinition>>,
}

impl fmt::Debug for StepRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRegistry")
            .field("definitions_count", &self.definitions.len())
            .finish()
    }
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. Fails if the pattern overlaps an existing one.
    #[instrument(skip(self, handler), fields(pattern = %pattern.source()))]
    pub fn register<F>(
        &mut self,
        keyword: StepKeyword,
        pattern: StepPattern,
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&mut ScenarioContext, &Arguments) -> Result<()> + Send + Sync + 'static,
    {
        if let Some(existing) = self
            .definitions
            .iter()
            .find(|definition| definition.pattern.overlaps(&pattern))
        {
            warn!(existing = %existing.pattern.source(), "rejecting ambiguous step pattern");
            return Err(StepError::AmbiguousStep {
                pattern: pattern.source().to_string(),
                existing: existing.pattern.source().to_string(),
            });
        }

        let index = self.definitions.len();
        debug!(index, keyword = %keyword, "step registered");
        self.definitions.push(Arc::new(StepDefinition {
            index,
            keyword,
            pattern,
            handler: Arc::new(handler),
        }));
        Ok(self)
    }

    pub fn given<F>(&mut self, expression: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(&mut ScenarioContext, &Arguments) -> Result<()> + Send + Sync + 'static,
    {
        self.register(StepKeyword::Given, StepPattern::expression(expression)?, handler)
    }

    pub fn when<F>(&mut self, expression: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(&mut ScenarioContext, &Arguments) -> Result<()> + Send + Sync + 'static,
    {
        self.register(StepKeyword::When, StepPattern::expression(expression)?, handler)
    }

    pub fn then<F>(&mut self, expression: &str, handler: F) -> Result<&mut Self>
    where
        F: Fn(&mut ScenarioContext, &Arguments) -> Result<()> + Send + Sync + 'static,
    {
        self.register(StepKeyword::Then, StepPattern::expression(expression)?, handler)
    }

    /// Register a regular-expression pattern with explicit parameter types
    pub fn regex<F>(
        &mut self,
        keyword: StepKeyword,
        regex: &str,
        params: Vec<ParamType>,
        handler: F,
    ) -> Result<&mut Self>
    where
        F: Fn(&mut ScenarioContext, &Arguments) -> Result<()> + Send + Sync + 'static,
    {
        self.register(keyword, StepPattern::regex(regex, params)?, handler)
    }

    /// First definition matching the step text (keyword already removed)
    pub fn find(&self, text: &str) -> Result<StepMatch> {
        self.definitions
            .iter()
            .find_map(|definition| {
                definition.pattern.captures(text).map(|captures| StepMatch {
                    definition: Arc::clone(definition),
                    captures,
                })
            })
            .ok_or_else(|| StepError::UndefinedStep {
                step: text.to_string(),
            })
    }

    /// Match a step line (with or without its Gherkin keyword) and run it
    pub fn execute(&self, context: &mut ScenarioContext, line: &str) -> Result<()> {
        let text = keywords::split(line).map_or(line.trim(), |(_, text)| text);
        self.execute_text(context, text)
    }

    /// Run step text that has already had its keyword removed
    pub fn execute_text(&self, context: &mut ScenarioContext, text: &str) -> Result<()> {
        self.execute_step(context, text, &StepData::default())
    }

    /// Run step text together with the doc string or table written under it
    #[instrument(skip(self, context, data), fields(scenario_id = %context.id()))]
    pub fn execute_step(
        &self,
        context: &mut ScenarioContext,
        text: &str,
        data: &StepData,
    ) -> Result<()> {
        let StepMatch {
            definition,
            captures,
        } = self.find(text)?;
        let args = Arguments::decode(definition.params(), &captures)?.with_data(data.clone());

        debug!(index = definition.index, pattern = %definition.pattern.source(), "executing step");
        let handler = &definition.handler;
        match panic::catch_unwind(AssertUnwindSafe(|| handler(context, &args))) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_reason(payload.as_ref());
                warn!(reason = %reason, "step handler panicked");
                Err(StepError::StepExecutionError { reason })
            }
        }
    }

    pub fn definitions(&self) -> impl Iterator<Item = &StepDefinition> {
        self.definitions.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn stats(&self) -> RegistryStats {
        let count = |keyword: StepKeyword| {
            self.definitions
                .iter()
                .filter(|definition| definition.keyword == keyword)
                .count()
        };
        let stats = RegistryStats {
            total: self.definitions.len(),
            given: count(StepKeyword::Given),
            when: count(StepKeyword::When),
            then: count(StepKeyword::Then),
        };
        info!(total = stats.total, "registry stats collected");
        stats
    }
}

/// Registry statistics for `stepbind steps`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub given: usize,
    pub when: usize,
    pub then: usize,
}

fn panic_reason(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("handler panicked: {message}")
    } else {
        "handler panicked".to_string()
    }
}

//! Gherkin feature loading
//!
//! Files are parsed by the `gherkin` crate and flattened into what the runner
//! needs: rules dissolve into their scenarios, outlines expand into one
//! scenario per Examples row, and tags keep their `@` prefix.

use gherkin::GherkinEnv;
use std::fs;
use std::path::{Path, PathBuf};
use stepbind_core::{keywords, Result, StepData, StepError};
use tracing::{debug, instrument};

const OUTLINE_KEYWORDS: [&str; 2] = ["Scenario Outline", "Scenario Template"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub keyword: String,
    pub text: String,
    pub line: usize,
    /// Doc string or data table written under the step
    pub data: StepData,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub name: String,
    pub line: usize,
    /// Rule tags, then the scenario's own, then those of its Examples table
    pub tags: Vec<String>,
    /// Name of the enclosing `Rule:`
    pub rule: Option<String>,
    /// Rule background, run after the feature background
    pub background: Vec<Step>,
    pub steps: Vec<Step>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub name: String,
    pub source: String,
    pub tags: Vec<String>,
    pub background: Vec<Step>,
    pub scenarios: Vec<Scenario>,
}

/// What a scenario picks up from its enclosing rule
#[derive(Default)]
struct Inherited {
    rule: Option<String>,
    tags: Vec<String>,
    background: Vec<Step>,
}

/// Parse feature text; `source` names it in errors and reports
#[instrument(skip(text))]
pub fn parse_feature(source: &str, text: &str) -> Result<Feature> {
    let parsed = gherkin::Feature::parse(text, GherkinEnv::default())
        .map_err(|err| parser_error(source, err.to_string()))?;

    let outside = "step outside of a scenario";
    reject_stray_steps(
        source,
        text,
        parsed.position.line,
        parsed.description.as_deref(),
        outside,
    )?;
    let background = match &parsed.background {
        Some(background) => block_steps(source, text, background)?,
        None => Vec::new(),
    };

    let mut scenarios = Vec::new();
    for scenario in &parsed.scenarios {
        scenarios.extend(flatten(source, text, scenario, &Inherited::default())?);
    }
    for rule in &parsed.rules {
        reject_stray_steps(
            source,
            text,
            rule.position.line,
            rule.description.as_deref(),
            outside,
        )?;
        let inherited = Inherited {
            rule: Some(rule.name.clone()),
            tags: prefixed(&rule.tags),
            background: match &rule.background {
                Some(background) => block_steps(source, text, background)?,
                None => Vec::new(),
            },
        };
        for scenario in &rule.scenarios {
            scenarios.extend(flatten(source, text, scenario, &inherited)?);
        }
    }
    debug!(scenarios = scenarios.len(), rules = parsed.rules.len(), "feature parsed");

    Ok(Feature {
        name: parsed.name.clone(),
        source: source.to_string(),
        tags: prefixed(&parsed.tags),
        background,
        scenarios,
    })
}

/// Read `.feature` files; directories are walked recursively in sorted order
pub fn load_features(paths: &[PathBuf]) -> Result<Vec<Feature>> {
    let mut files = Vec::new();
    for path in paths {
        collect_feature_files(path, &mut files)?;
    }

    files
        .iter()
        .map(|file| {
            let text = fs::read_to_string(file)
                .map_err(|err| StepError::io(file.display().to_string(), err))?;
            parse_feature(&file.display().to_string(), &text)
        })
        .collect()
}

fn collect_feature_files(path: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let io_error = |err| StepError::io(path.display().to_string(), err);
    if !path.is_dir() {
        if !path.exists() {
            return Err(io_error(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "feature path does not exist",
            )));
        }
        files.push(path.to_path_buf());
        return Ok(());
    }

    let mut entries = fs::read_dir(path)
        .map_err(io_error)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(io_error)?;
    entries.sort();

    for entry in entries {
        if entry.is_dir() {
            collect_feature_files(&entry, files)?;
        } else if entry.extension().is_some_and(|ext| ext == "feature") {
            files.push(entry);
        }
    }
    Ok(())
}

fn parser_error(source: &str, reason: impl Into<String>) -> StepError {
    StepError::FeatureParse {
        source_name: source.to_string(),
        reason: reason.into(),
    }
}

fn prefixed(tags: &[String]) -> Vec<String> {
    tags.iter().map(|tag| format!("@{tag}")).collect()
}

/// Gherkin reads a keyword line it cannot parse as a step (a bare `Given`,
/// a lower-case `given ...`) as description prose
fn reject_stray_steps(
    source: &str,
    text: &str,
    header_line: usize,
    description: Option<&str>,
    reason: &str,
) -> Result<()> {
    let Some(stray) = description
        .into_iter()
        .flat_map(str::lines)
        .map(str::trim)
        .find(|line| keywords::looks_like_step(line))
    else {
        return Ok(());
    };

    let line = text
        .lines()
        .enumerate()
        .skip(header_line)
        .find(|(_, candidate)| candidate.trim() == stray)
        .map_or(header_line, |(index, _)| index + 1);
    Err(parser_error(source, format!("line {line}: {reason}: {stray:?}")))
}

fn block_steps(source: &str, text: &str, background: &gherkin::Background) -> Result<Vec<Step>> {
    reject_stray_steps(
        source,
        text,
        background.position.line,
        background.description.as_deref(),
        "not a valid step",
    )?;
    Ok(background.steps.iter().map(convert_step).collect())
}

fn convert_step(step: &gherkin::Step) -> Step {
    Step {
        keyword: step.keyword.trim().to_string(),
        text: step.value.clone(),
        line: step.position.line,
        data: StepData {
            docstring: step.docstring.as_deref().map(docstring_body),
            table: step.table.as_ref().map(|table| table.rows.clone()),
        },
    }
}

/// Doc strings arrive dedented but still framed by their delimiter lines
fn docstring_body(raw: &str) -> String {
    let body = raw.strip_prefix("\r\n").or_else(|| raw.strip_prefix('\n')).unwrap_or(raw);
    body.trim_end().to_string()
}

fn flatten(
    source: &str,
    text: &str,
    scenario: &gherkin::Scenario,
    inherited: &Inherited,
) -> Result<Vec<Scenario>> {
    reject_stray_steps(
        source,
        text,
        scenario.position.line,
        scenario.description.as_deref(),
        "not a valid step",
    )?;

    let mut tags = inherited.tags.clone();
    tags.extend(prefixed(&scenario.tags));
    let base = Scenario {
        name: scenario.name.clone(),
        line: scenario.position.line,
        tags,
        rule: inherited.rule.clone(),
        background: inherited.background.clone(),
        steps: scenario.steps.iter().map(convert_step).collect(),
    };

    let outline = OUTLINE_KEYWORDS.contains(&scenario.keyword.trim());
    if !outline && scenario.examples.is_empty() {
        return Ok(vec![base]);
    }

    let expanded = expand_outline(&base, &scenario.examples);
    if expanded.is_empty() {
        return Err(parser_error(
            source,
            format!("line {}: Scenario Outline has no Examples rows", base.line),
        ));
    }
    Ok(expanded)
}

fn expand_outline(outline: &Scenario, examples: &[gherkin::Examples]) -> Vec<Scenario> {
    let mut expanded = Vec::new();

    for table in examples {
        let Some((header, rows)) = table.table.as_ref().and_then(|t| t.rows.split_first()) else {
            continue;
        };
        for row in rows {
            let substitute = |text: &str| {
                header
                    .iter()
                    .zip(row)
                    .fold(text.to_string(), |acc, (column, value)| {
                        acc.replace(&format!("<{column}>"), value)
                    })
            };
            let number = expanded.len() + 1;
            let mut tags = outline.tags.clone();
            tags.extend(prefixed(&table.tags));

            expanded.push(Scenario {
                name: format!("{} (example {number})", substitute(&outline.name)),
                line: outline.line,
                tags,
                rule: outline.rule.clone(),
                background: outline.background.clone(),
                steps: outline
                    .steps
                    .iter()
                    .map(|step| Step {
                        keyword: step.keyword.clone(),
                        text: substitute(&step.text),
                        line: step.line,
                        data: StepData {
                            docstring: step.data.docstring.as_deref().map(&substitute),
                            table: step.data.table.as_ref().map(|rows| {
                                rows.iter()
                                    .map(|cells| cells.iter().map(|cell| substitute(cell)).collect())
                                    .collect()
                            }),
                        },
                    })
                    .collect(),
            });
        }
    }
    expanded
}

#[cfg(test)]
mod tests {
    use super::*;

    const POD_FEATURE: &str = r#"
@cluster
Feature: Pod health
  As an operator I want to know whether my pods are running.

  Background:
    Given the mini Kube cluster is accessible

  # the flask deployment
  @smoke # flaky on CI
  Scenario: Flask pod is running
    When I check the status of the pod with label "app=flask-api"
    Then the pod status should be "Running"

  Scenario Outline: Adding numbers
    Given the first number is <a>
    And the second number is <b>
    When I add the two numbers
    Then the result should be <sum>

    @arithmetic
    Examples:
      | a | b | sum |
      | 2 | 3 | 5   |
      | 4 | 4 | 8   |
"#;

    #[test]
    fn parses_background_scenarios_and_tags() {
        let feature = parse_feature("pod.feature", POD_FEATURE).unwrap();
        assert_eq!(feature.name, "Pod health");
        assert_eq!(feature.tags, vec!["@cluster"]);
        assert_eq!(feature.background.len(), 1);
        assert_eq!(feature.background[0].keyword, "Given");
        assert_eq!(feature.scenarios.len(), 3);

        let flask = &feature.scenarios[0];
        assert_eq!(flask.line, 11);
        assert_eq!(flask.steps[0].keyword, "When");
        assert_eq!(flask.steps[0].line, 12);
        assert_eq!(
            flask.steps[0].text,
            r#"I check the status of the pod with label "app=flask-api""#
        );
    }

    #[test]
    fn comment_after_a_tag_is_not_a_tag() {
        let feature = parse_feature("pod.feature", POD_FEATURE).unwrap();
        assert_eq!(feature.scenarios[0].tags, vec!["@smoke"]);
    }

    #[test]
    fn expands_outline_rows() {
        let feature = parse_feature("pod.feature", POD_FEATURE).unwrap();
        let second = &feature.scenarios[2];
        assert_eq!(second.name, "Adding numbers (example 2)");
        assert_eq!(second.tags, vec!["@arithmetic"]);
        assert_eq!(second.steps[0].text, "the first number is 4");
        assert_eq!(second.steps[1].keyword, "And");
        assert_eq!(second.steps[3].text, "the result should be 8");
    }

    #[test]
    fn rules_bring_their_own_background_and_tags() {
        let text = r#"
Feature: Pods
  Background:
    Given the mini Kube cluster is accessible

  @health
  Rule: Running pods
    Background:
      Given the namespace is "default"

    Scenario: flask
      Then the pod status should be "Running"

  Rule: Arithmetic
    Scenario: add
      When I add the two numbers
"#;
        let feature = parse_feature("rules.feature", text).unwrap();
        assert_eq!(feature.background.len(), 1);
        assert_eq!(feature.scenarios.len(), 2);

        let flask = &feature.scenarios[0];
        assert_eq!(flask.rule.as_deref(), Some("Running pods"));
        assert_eq!(flask.tags, vec!["@health"]);
        assert_eq!(flask.background[0].text, r#"the namespace is "default""#);

        let add = &feature.scenarios[1];
        assert_eq!(add.rule.as_deref(), Some("Arithmetic"));
        assert!(add.tags.is_empty());
        assert!(add.background.is_empty());
    }

    #[test]
    fn doc_strings_and_tables_stay_on_their_step() {
        let text = r#"
Feature: data
  Scenario: payload
    Given the pod JSON is
      """
      {"phase": "Running"}
      """
    When I add the numbers
      | a | b |
      | 2 | 3 |
"#;
        let feature = parse_feature("data.feature", text).unwrap();
        let steps = &feature.scenarios[0].steps;
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].data.docstring.as_deref(), Some(r#"{"phase": "Running"}"#));
        assert_eq!(
            steps[1].data.table,
            Some(vec![
                vec!["a".to_string(), "b".to_string()],
                vec!["2".to_string(), "3".to_string()],
            ])
        );
    }

    #[test]
    fn outline_placeholders_reach_step_tables() {
        let text = "Feature: f\n  Scenario Outline: o\n    Given the values\n      | <a> |\n    Examples:\n      | a |\n      | 7 |\n";
        let feature = parse_feature("table.feature", text).unwrap();
        assert_eq!(
            feature.scenarios[0].steps[0].data.table,
            Some(vec![vec!["7".to_string()]])
        );
    }

    #[test]
    fn bare_keyword_is_an_error() {
        let err = parse_feature("bare.feature", "Feature: f\n  Scenario: s\n    Given\n").unwrap_err();
        match err {
            StepError::FeatureParse { reason, .. } => {
                assert!(reason.starts_with("line 3:"), "{reason}");
                assert!(reason.contains("not a valid step"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn lowercase_keyword_is_an_error() {
        let text = "Feature: lower\n  Scenario: s\n    given a thing\n";
        assert!(parse_feature("lower.feature", text).is_err());
    }

    #[test]
    fn step_outside_scenario_is_an_error() {
        let err = parse_feature("bad.feature", "Feature: bad\n  Given a stray step\n").unwrap_err();
        match err {
            StepError::FeatureParse { reason, .. } => {
                assert!(reason.starts_with("line 2:"), "{reason}");
                assert!(reason.contains("outside of a scenario"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn misspelled_step_after_steps_is_an_error() {
        let err = parse_feature(
            "typo.feature",
            "Feature: typo\n  Scenario: s\n    Given a thing\n    Gvien another thing\n",
        )
        .unwrap_err();
        assert_eq!(err.kind(), "FeatureParse");
        assert!(err.to_string().contains("typo.feature"));
    }

    #[test]
    fn short_examples_row_is_an_error() {
        let text = "Feature: f\n  Scenario Outline: o\n    Given <a> and <b>\n    Examples:\n      | a | b |\n      | 1 |\n";
        assert!(parse_feature("ragged.feature", text).is_err());
    }

    #[test]
    fn outline_without_rows_is_an_error() {
        let text = "Feature: f\n  Scenario Outline: o\n    Given <a>\n";
        let err = parse_feature("empty.feature", text).unwrap_err();
        assert!(err.to_string().contains("no Examples rows"));
    }

    #[test]
    fn missing_feature_header_is_an_error() {
        assert!(parse_feature("none.feature", "# only a comment\n").is_err());
    }

    #[test]
    fn loads_directories_recursively_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("nested");
        fs::create_dir(&nested).unwrap();
        fs::write(dir.path().join("b.feature"), "Feature: B\n").unwrap();
        fs::write(nested.join("a.feature"), "Feature: A\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let features = load_features(&[dir.path().to_path_buf()]).unwrap();
        let names: Vec<_> = features.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
    }

    #[test]
    fn missing_path_is_an_io_error() {
        let err = load_features(&[PathBuf::from("/definitely/not/here.feature")]).unwrap_err();
        assert_eq!(err.kind(), "Io");
    }
}

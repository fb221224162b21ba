//! Step patterns: anchored regular expressions and cucumber expressions
//!
//! Both syntaxes compile to one anchored [`Regex`] so that a pattern either
//! matches a whole step line or not at all.

use regex::Regex;
use std::fmt;
use stepbind_core::{ParamType, Result, StepError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Regex,
    Expression,
}

/// Upper bound on sample lines tried per pattern pair
const MAX_CANDIDATES: usize = 512;

/// Piece of a cucumber expression, kept to build sample lines
#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Optional(String),
    Param(ParamType),
}

#[derive(Debug, Clone)]
pub struct StepPattern {
    source: String,
    kind: PatternKind,
    regex: Regex,
    params: Vec<ParamType>,
    segments: Vec<Segment>,
    /// Sample line the pattern is known to match
    witness: Option<String>,
}

impl StepPattern {
    /// Compile a regular expression with an explicit parameter-type list.
    ///
    /// `^`/`$` anchors are optional; the pattern is always matched against the
    /// whole line.
    pub fn regex(source: &str, params: Vec<ParamType>) -> Result<Self> {
        let regex = compile(source, &anchor(source))?;
        let groups = regex.captures_len() - 1;
        if groups != params.len() {
            return Err(invalid(
                source,
                format!(
                    "pattern has {groups} capture groups but {} parameter types",
                    params.len()
                ),
            ));
        }

        Ok(Self {
            source: source.to_string(),
            kind: PatternKind::Regex,
            regex,
            params,
            segments: Vec::new(),
            witness: None,
        })
    }

    /// Compile a cucumber expression such as `the result should be {int}`.
    pub fn expression(source: &str) -> Result<Self> {
        let segments = parse_expression(source)?;
        let regex = compile(source, &format!("^{}$", expression_regex(&segments)))?;
        let params = segments
            .iter()
            .filter_map(|segment| match segment {
                Segment::Param(param) => Some(*param),
                _ => None,
            })
            .collect();
        let witness = segments
            .iter()
            .map(|segment| match segment {
                Segment::Literal(text) => text.as_str(),
                Segment::Optional(_) => "",
                Segment::Param(param) => sample(*param),
            })
            .collect();

        Ok(Self {
            source: source.to_string(),
            kind: PatternKind::Expression,
            regex,
            params,
            segments,
            witness: Some(witness),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    pub fn params(&self) -> &[ParamType] {
        &self.params
    }

    pub fn witness(&self) -> Option<&str> {
        self.witness.as_deref()
    }

    /// The anchored regex actually used for matching
    pub fn compiled(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, line: &str) -> bool {
        self.regex.is_match(line)
    }

    /// Raw captured substrings in group order, `None` when the line does not match
    pub fn captures(&self, line: &str) -> Option<Vec<String>> {
        let caps = self.regex.captures(line)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|group| group.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }

    /// True when the two patterns can match the same line. Besides identical
    /// compiled source, each expression is tried with its placeholders
    /// filled by the other pattern's literal words, so `I have {int} items`
    /// and `I have 5 {word}` meet on `I have 5 items`.
    pub fn overlaps(&self, other: &StepPattern) -> bool {
        self.compiled() == other.compiled()
            || self.shared_line(other).is_some()
            || other.shared_line(self).is_some()
    }

    /// A line built from this pattern that both patterns match
    fn shared_line(&self, other: &StepPattern) -> Option<String> {
        let fills = other.fill_words();
        self.candidates(&fills)
            .into_iter()
            .find(|line| self.is_match(line) && other.is_match(line))
    }

    /// Words a placeholder of another pattern might have to take to collide
    /// with this one
    fn fill_words(&self) -> Vec<String> {
        let mut words: Vec<String> = Vec::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) | Segment::Optional(text) => {
                    words.extend(text.split_whitespace().map(str::to_string));
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        words.push(trimmed.to_string());
                    }
                }
                Segment::Param(param) => words.push(sample(*param).to_string()),
            }
        }
        words.sort();
        words.dedup();
        words
    }

    /// Sample lines: every placeholder takes its own sample or one of `fills`,
    /// every optional part is present or absent
    fn candidates(&self, fills: &[String]) -> Vec<String> {
        if self.segments.is_empty() {
            return Vec::new();
        }

        let mut lines = vec![String::new()];
        for segment in &self.segments {
            let options: Vec<String> = match segment {
                Segment::Literal(text) => vec![text.clone()],
                Segment::Optional(text) => vec![String::new(), text.clone()],
                Segment::Param(param) => std::iter::once(sample(*param).to_string())
                    .chain(fills.iter().cloned())
                    .collect(),
            };
            lines = lines
                .iter()
                .flat_map(|line| options.iter().map(move |option| format!("{line}{option}")))
                .take(MAX_CANDIDATES)
                .collect();
        }
        lines
    }
}

impl fmt::Display for StepPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn invalid(pattern: &str, reason: impl Into<String>) -> StepError {
    StepError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: reason.into(),
    }
}

fn compile(source: &str, anchored: &str) -> Result<Regex> {
    Regex::new(anchored).map_err(|err| invalid(source, err.to_string()))
}

fn anchor(source: &str) -> String {
    let inner = source.strip_prefix('^').unwrap_or(source);
    let inner = match inner.strip_suffix('$') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => inner,
    };
    format!("^(?:{inner})$")
}

fn placeholder(name: &str) -> Option<ParamType> {
    match name {
        "int" => Some(ParamType::Int),
        "float" => Some(ParamType::Float),
        "word" => Some(ParamType::Word),
        "string" => Some(ParamType::String),
        _ => None,
    }
}

/// Capture group for a placeholder; `{float}` also takes `.5` and `1e3`
fn group(param: ParamType) -> &'static str {
    match param {
        ParamType::Int => r"(-?\d+)",
        ParamType::Float => r"(-?(?:\d+(?:\.\d+)?|\.\d+)(?:[eE][-+]?\d+)?)",
        ParamType::Word => r"(\S+)",
        ParamType::String => r#""([^"]*)""#,
    }
}

fn sample(param: ParamType) -> &'static str {
    match param {
        ParamType::Int => "0",
        ParamType::Float => "0.5",
        ParamType::Word => "w",
        ParamType::String => "\"s\"",
    }
}

fn expression_regex(segments: &[Segment]) -> String {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(text) => regex::escape(text),
            Segment::Optional(text) => format!("(?:{})?", regex::escape(text)),
            Segment::Param(param) => group(*param).to_string(),
        })
        .collect()
}

/// Split cucumber-expression syntax into segments: `{type}` placeholders,
/// `(optional)` text and backslash escapes. Alternation (`a/b`) is not
/// supported.
fn parse_expression(source: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut chars = source.chars();
    let mut literal = String::new();

    let flush = |literal: &mut String, segments: &mut Vec<Segment>| {
        if !literal.is_empty() {
            segments.push(Segment::Literal(std::mem::take(literal)));
        }
    };

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(escaped) => literal.push(escaped),
                None => return Err(invalid(source, "trailing backslash")),
            },
            '{' => {
                flush(&mut literal, &mut segments);
                let mut name = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '}' {
                        closed = true;
                        break;
                    }
                    name.push(c);
                }
                if !closed {
                    return Err(invalid(source, "unclosed parameter placeholder"));
                }
                let Some(param) = placeholder(&name) else {
                    return Err(invalid(source, format!("unknown parameter type {{{name}}}")));
                };
                segments.push(Segment::Param(param));
            }
            '(' => {
                flush(&mut literal, &mut segments);
                let mut optional = String::new();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == ')' {
                        closed = true;
                        break;
                    }
                    if matches!(c, '{' | '(') {
                        return Err(invalid(source, "optional text cannot nest groups"));
                    }
                    optional.push(c);
                }
                if !closed {
                    return Err(invalid(source, "unclosed optional text"));
                }
                segments.push(Segment::Optional(optional));
            }
            '}' | ')' => return Err(invalid(source, format!("unbalanced {c:?}"))),
            other => literal.push(other),
        }
    }
    flush(&mut literal, &mut segments);

    Ok(segments)
}

//! # stepbind core
//!
//! Core types shared by the step registry, the scenario runner and step
//! libraries: the per-scenario context, parameter decoding and the error
//! taxonomy every step outcome is reported with.

pub mod argument;
pub mod context;
pub mod error;

pub use argument::{Argument, Arguments, ParamType, StepData};
pub use context::{AssertionRecord, ScenarioContext, ScenarioId};
pub use error::{Result, StepError};

/// Current stepbind version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build information for logs
pub const BUILD_INFO: &str = concat!(
    "stepbind ",
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("CARGO_PKG_NAME"),
    ")"
);

/// Gherkin keywords recognised at the start of a step line
pub mod keywords {
    pub const GIVEN: &str = "Given";
    pub const WHEN: &str = "When";
    pub const THEN: &str = "Then";
    pub const AND: &str = "And";
    pub const BUT: &str = "But";
    pub const STAR: &str = "*";

    pub const ALL: [&str; 6] = [GIVEN, WHEN, THEN, AND, BUT, STAR];

    /// Split a step line into its canonical keyword and the remaining text.
    ///
    /// Keywords match case-insensitively and must be followed by whitespace.
    pub fn split(line: &str) -> Option<(&'static str, &str)> {
        let line = line.trim_start();
        ALL.iter().find_map(|keyword| {
            let head = line.get(..keyword.len())?;
            let rest = line.get(keyword.len()..)?;
            (head.eq_ignore_ascii_case(keyword) && rest.starts_with(char::is_whitespace))
                .then(|| (*keyword, rest.trim()))
        })
    }

    /// True for a line that reads as a step in any letter case, including a
    /// bare keyword with no text after it
    pub fn looks_like_step(line: &str) -> bool {
        let line = line.trim();
        split(line).is_some() || ALL.iter().any(|keyword| keyword.eq_ignore_ascii_case(line))
    }

}

//! Error types for step registration and execution

use crate::argument::ParamType;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StepError>;

#[derive(Error, Debug)]
pub enum StepError {
    #[error("Undefined step: {step}")]
    UndefinedStep { step: String },

    #[error("Invalid argument {index}: cannot decode {text:?} as {expected}")]
    InvalidArgument {
        index: usize,
        text: String,
        expected: ParamType,
    },

    #[error("Collaborator {collaborator} failed: {reason}")]
    CollaboratorFailure {
        collaborator: String,
        reason: String,
    },

    #[error("Assertion mismatch on {subject}: expected {expected}, actual {actual}")]
    AssertionMismatch {
        subject: String,
        expected: String,
        actual: String,
    },

    #[error("Step execution error: {reason}")]
    StepExecutionError { reason: String },

    #[error("Invalid step pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("Ambiguous step pattern {pattern:?} overlaps {existing:?}")]
    AmbiguousStep { pattern: String, existing: String },

    #[error("Missing context value: {key}")]
    MissingContextValue { key: String },

    #[error("Feature parse error in {source_name}: {reason}")]
    FeatureParse { source_name: String, reason: String },

    #[error("Configuration error: {reason}")]
    Configuration { reason: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
}

impl StepError {
    pub fn collaborator(collaborator: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CollaboratorFailure {
            collaborator: collaborator.into(),
            reason: reason.into(),
        }
    }

    pub fn mismatch(
        subject: impl Into<String>,
        expected: impl ToString,
        actual: impl ToString,
    ) -> Self {
        Self::AssertionMismatch {
            subject: subject.into(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Stable kind name used in run reports
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UndefinedStep { .. } => "UndefinedStep",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::CollaboratorFailure { .. } => "CollaboratorFailure",
            Self::AssertionMismatch { .. } => "AssertionMismatch",
            Self::StepExecutionError { .. } => "StepExecutionError",
            Self::InvalidPattern { .. } => "InvalidPattern",
            Self::AmbiguousStep { .. } => "AmbiguousStep",
            Self::MissingContextValue { .. } => "MissingContextValue",
            Self::FeatureParse { .. } => "FeatureParse",
            Self::Configuration { .. } => "Configuration",
            Self::Io { .. } => "Io",
            Self::Serialization { .. } => "Serialization",
        }
    }
}

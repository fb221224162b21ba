//! Step parameter types and argument decoding

use crate::error::{Result, StepError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared type of a captured step parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    Int,
    Float,
    Word,
    String,
}

impl ParamType {
    /// Decode one captured substring into a typed argument
    pub fn decode(self, index: usize, text: &str) -> Result<Argument> {
        let invalid = || StepError::InvalidArgument {
            index,
            text: text.to_string(),
            expected: self,
        };

        match self {
            ParamType::Int => text.trim().parse::<i64>().map(Argument::Int).map_err(|_| invalid()),
            ParamType::Float => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Argument::Float)
                .ok_or_else(invalid),
            ParamType::Word => {
                if text.is_empty() || text.chars().any(char::is_whitespace) {
                    Err(invalid())
                } else {
                    Ok(Argument::Text(text.to_string()))
                }
            }
            ParamType::String => Ok(Argument::Text(text.to_string())),
        }
    }

    /// Placeholder name in cucumber expressions
    pub fn placeholder(self) -> &'static str {
        match self {
            ParamType::Int => "int",
            ParamType::Float => "float",
            ParamType::Word => "word",
            ParamType::String => "string",
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.placeholder())
    }
}

/// A decoded step argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Argument {
    Int(i64),
    Float(f64),
    Text(String),
}

/// Doc string or data table written under a step line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepData {
    pub docstring: Option<String>,
    pub table: Option<Vec<Vec<String>>>,
}

impl StepData {
    pub fn is_empty(&self) -> bool {
        self.docstring.is_none() && self.table.is_none()
    }
}

/// Ordered arguments handed to a step handler
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    values: Vec<Argument>,
    data: StepData,
}

impl Arguments {
    pub fn new(values: Vec<Argument>) -> Self {
        Self {
            values,
            data: StepData::default(),
        }
    }

    pub fn with_data(mut self, data: StepData) -> Self {
        self.data = data;
        self
    }

    /// Decode raw captures against the declared parameter types
    pub fn decode(types: &[ParamType], captures: &[String]) -> Result<Self> {
        if types.len() != captures.len() {
            return Err(StepError::StepExecutionError {
                reason: format!(
                    "expected {} captured arguments, got {}",
                    types.len(),
                    captures.len()
                ),
            });
        }

        types
            .iter()
            .zip(captures)
            .enumerate()
            .map(|(index, (param, text))| param.decode(index, text))
            .collect::<Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Argument> {
        self.values.get(index)
    }

    pub fn int(&self, index: usize) -> Result<i64> {
        match self.values.get(index) {
            Some(Argument::Int(value)) => Ok(*value),
            other => Err(self.wrong_type(index, "int", other)),
        }
    }

    pub fn float(&self, index: usize) -> Result<f64> {
        match self.values.get(index) {
            Some(Argument::Float(value)) => Ok(*value),
            Some(Argument::Int(value)) => Ok(*value as f64),
            other => Err(self.wrong_type(index, "float", other)),
        }
    }

    pub fn text(&self, index: usize) -> Result<&str> {
        match self.values.get(index) {
            Some(Argument::Text(value)) => Ok(value),
            other => Err(self.wrong_type(index, "text", other)),
        }
    }

    pub fn docstring(&self) -> Option<&str> {
        self.data.docstring.as_deref()
    }

    /// Data table rows, header row included
    pub fn table(&self) -> Option<&[Vec<String>]> {
        self.data.table.as_deref()
    }

    fn wrong_type(&self, index: usize, wanted: &str, found: Option<&Argument>) -> StepError {
        StepError::StepExecutionError {
            reason: match found {
                Some(arg) => format!("argument {index} is {arg:?}, handler expected {wanted}"),
                None => format!("argument {index} missing, handler expected {wanted}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn decodes_integer_text() {
        assert_eq!(ParamType::Int.decode(0, "42").unwrap(), Argument::Int(42));
        assert_eq!(ParamType::Int.decode(0, "-7").unwrap(), Argument::Int(-7));
    }

    #[test]
    fn rejects_non_numeric_integer() {
        let err = ParamType::Int.decode(1, "abc").unwrap_err();
        match err {
            StepError::InvalidArgument {
                index,
                text,
                expected,
            } => {
                assert_eq!(index, 1);
                assert_eq!(text, "abc");
                assert_eq!(expected, ParamType::Int);
            }
            other => panic!("expected InvalidArgument, got {other:?}"),
        }
    }

    #[test]
    fn rejects_non_finite_float() {
        assert!(ParamType::Float.decode(0, "NaN").is_err());
        assert_eq!(
            ParamType::Float.decode(0, "2.5").unwrap(),
            Argument::Float(2.5)
        );
    }

    #[test]
    fn float_accepts_leading_dot_and_exponent() {
        assert_eq!(ParamType::Float.decode(0, ".5").unwrap(), Argument::Float(0.5));
        assert_eq!(ParamType::Float.decode(0, "1e3").unwrap(), Argument::Float(1000.0));
        assert_eq!(ParamType::Float.decode(0, "-2.5E-1").unwrap(), Argument::Float(-0.25));
    }

    #[test]
    fn step_data_travels_with_arguments() {
        let args = Arguments::default().with_data(StepData {
            docstring: Some("{\"phase\": \"Running\"}".to_string()),
            table: Some(vec![vec!["a".to_string()], vec!["1".to_string()]]),
        });
        assert_eq!(args.docstring(), Some("{\"phase\": \"Running\"}"));
        assert_eq!(args.table().map(<[_]>::len), Some(2));
        assert!(Arguments::default().docstring().is_none());
    }

    #[test]
    fn word_must_not_contain_whitespace() {
        assert!(ParamType::Word.decode(0, "two words").is_err());
        assert_eq!(
            ParamType::Word.decode(0, "app=flask-api").unwrap(),
            Argument::Text("app=flask-api".to_string())
        );
    }

    #[test]
    fn decode_checks_capture_count() {
        let err = Arguments::decode(&[ParamType::Int], &[]).unwrap_err();
        assert_eq!(err.kind(), "StepExecutionError");
    }

    #[test]
    fn typed_accessors() {
        let args = Arguments::decode(
            &[ParamType::Int, ParamType::String],
            &["3".to_string(), "Running".to_string()],
        )
        .unwrap();
        assert_eq!(args.int(0).unwrap(), 3);
        assert_eq!(args.float(0).unwrap(), 3.0);
        assert_eq!(args.text(1).unwrap(), "Running");
        assert!(args.text(0).is_err());
        assert!(args.int(5).is_err());
    }

    proptest! {
        #[test]
        fn any_i64_round_trips_through_int(value in any::<i64>()) {
            prop_assert_eq!(
                ParamType::Int.decode(0, &value.to_string()).unwrap(),
                Argument::Int(value)
            );
        }

        #[test]
        fn alphabetic_text_is_never_an_int(text in "[a-zA-Z]{1,12}") {
            prop_assert!(ParamType::Int.decode(0, &text).is_err());
        }
    }
}

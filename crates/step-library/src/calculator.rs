//! Arithmetic demonstration steps
//!
//! Operands and results live directly in the scenario context; there is no
//! external collaborator.

use step_registry::StepRegistry;
use stepbind_core::{Result, ScenarioContext, StepError};

pub mod keys {
    pub const FIRST: &str = "calculator.first";
    pub const SECOND: &str = "calculator.second";
    pub const RESULT: &str = "calculator.result";
    pub const VARIABLE: &str = "calculator.variable";
}

fn checked_sum(a: i64, b: i64) -> Result<i64> {
    a.checked_add(b).ok_or_else(|| StepError::StepExecutionError {
        reason: format!("{a} + {b} overflows"),
    })
}

/// Compare an integer stored under `key` and record the assertion
fn expect_int(ctx: &mut ScenarioContext, key: &str, subject: &str, expected: i64) -> Result<()> {
    let actual: i64 = ctx.require(key)?;
    let passed = actual == expected;
    ctx.record_assertion(key, expected.to_string(), actual.to_string(), passed);
    if passed {
        Ok(())
    } else {
        Err(StepError::mismatch(subject, expected, actual))
    }
}

pub fn register_calculator_steps(registry: &mut StepRegistry) -> Result<()> {
    registry
        .given("the first number is {int}", |ctx, args| {
            ctx.insert(keys::FIRST, args.int(0)?)
        })?
        .given("the second number is {int}", |ctx, args| {
            ctx.insert(keys::SECOND, args.int(0)?)
        })?
        .when("I add the two numbers", |ctx, _| {
            let sum = checked_sum(ctx.require(keys::FIRST)?, ctx.require(keys::SECOND)?)?;
            ctx.insert(keys::RESULT, sum)
        })?
        .then("the result should be {int}", |ctx, args| {
            expect_int(ctx, keys::RESULT, "result", args.int(0)?)
        })?
        .given("a variable set to {int}", |ctx, args| {
            ctx.insert(keys::VARIABLE, args.int(0)?)
        })?
        .when("we increment the variable by {int}", |ctx, args| {
            let value = checked_sum(ctx.require(keys::VARIABLE)?, args.int(0)?)?;
            ctx.insert(keys::VARIABLE, value)
        })?
        .then("the variable should be {int}", |ctx, args| {
            expect_int(ctx, keys::VARIABLE, "variable", args.int(0)?)
        })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> StepRegistry {
        let mut registry = StepRegistry::new();
        register_calculator_steps(&mut registry).unwrap();
        registry
    }

    #[test]
    fn two_plus_three() {
        let registry = registry();
        let mut ctx = ScenarioContext::new("sum");
        for line in [
            "Given the first number is 2",
            "And the second number is 3",
            "When I add the two numbers",
            "Then the result should be 5",
        ] {
            registry.execute(&mut ctx, line).unwrap();
        }
        assert_eq!(ctx.assertions().len(), 1);
        assert!(ctx.assertions()[0].passed);
    }

    #[test]
    fn wrong_result_reports_expected_and_actual() {
        let registry = registry();
        let mut ctx = ScenarioContext::new("sum");
        registry.execute(&mut ctx, "Given the first number is 2").unwrap();
        registry.execute(&mut ctx, "And the second number is 3").unwrap();
        registry.execute(&mut ctx, "When I add the two numbers").unwrap();

        match registry.execute(&mut ctx, "Then the result should be 6").unwrap_err() {
            StepError::AssertionMismatch {
                expected, actual, ..
            } => assert_eq!((expected.as_str(), actual.as_str()), ("6", "5")),
            other => panic!("expected AssertionMismatch, got {other:?}"),
        }
        assert!(!ctx.assertions()[0].passed);
    }

    #[test]
    fn adding_without_operands_is_missing_context() {
        let registry = registry();
        let mut ctx = ScenarioContext::new("no operands");
        let err = registry.execute(&mut ctx, "When I add the two numbers").unwrap_err();
        assert_eq!(err.kind(), "MissingContextValue");
    }

    #[test]
    fn overflow_is_an_execution_error() {
        let registry = registry();
        let mut ctx = ScenarioContext::new("overflow");
        registry
            .execute(&mut ctx, &format!("Given a variable set to {}", i64::MAX))
            .unwrap();
        let err = registry
            .execute(&mut ctx, "When we increment the variable by 1")
            .unwrap_err();
        assert_eq!(err.kind(), "StepExecutionError");
    }

    #[test]
    fn oversized_literal_is_an_invalid_argument() {
        let registry = registry();
        let mut ctx = ScenarioContext::new("huge");
        let err = registry
            .execute(&mut ctx, "Given the first number is 99999999999999999999")
            .unwrap_err();
        assert_eq!(err.kind(), "InvalidArgument");
    }
}

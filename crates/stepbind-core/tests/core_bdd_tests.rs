//! BDD Tests for stepbind core

use cucumber::{given, then, when, World};
use stepbind_core::*;

#[derive(Debug, World)]
#[world(init = Self::new)]
struct CoreWorld {
    captured: Option<String>,
    decoded: Option<Argument>,
    last_error: Option<StepError>,
    context: ScenarioContext,
}

impl CoreWorld {
    fn new() -> Self {
        Self {
            captured: None,
            decoded: None,
            last_error: None,
            context: ScenarioContext::new("core"),
        }
    }
}

#[given(expr = "a captured argument {string}")]
async fn given_captured_argument(world: &mut CoreWorld, text: String) {
    world.captured = Some(text);
}

#[when("I decode it as int")]
async fn when_decode_as_int(world: &mut CoreWorld) {
    let text = world.captured.as_deref().unwrap_or_default();
    match ParamType::Int.decode(0, text) {
        Ok(arg) => world.decoded = Some(arg),
        Err(err) => world.last_error = Some(err),
    }
}

#[then(expr = "the decoded value should be {int}")]
async fn then_decoded_value(world: &mut CoreWorld, expected: i64) {
    assert_eq!(world.decoded, Some(Argument::Int(expected)));
}

#[then(expr = "I should get a {string} error")]
async fn then_error_kind(world: &mut CoreWorld, kind: String) {
    let error = world.last_error.as_ref().expect("an error should be recorded");
    assert_eq!(error.kind(), kind);
}

#[then(expr = "the error should mention {string}")]
async fn then_error_mentions(world: &mut CoreWorld, text: String) {
    let error = world.last_error.as_ref().expect("an error should be recorded");
    assert!(error.to_string().contains(&text));
}

#[given(expr = "a scenario context holding result {int}")]
async fn given_context_with_result(world: &mut CoreWorld, result: i64) {
    world.context.insert("result", result).unwrap();
}

#[when("a fresh scenario context is created")]
async fn when_fresh_context(world: &mut CoreWorld) {
    world.context = ScenarioContext::new("core");
}

#[then(expr = "the fresh context should not contain {string}")]
async fn then_context_lacks(world: &mut CoreWorld, key: String) {
    assert!(!world.context.contains(&key));
}

#[tokio::main]
async fn main() {
    CoreWorld::cucumber()
        .fail_on_skipped()
        .run_and_exit("tests/features")
        .await;
}

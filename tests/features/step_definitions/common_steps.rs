//! Common step definitions used across features

use cucumber::{then, when};

use crate::features::support::TestWorld;

#[when("I resolve the agent plan")]
async fn resolve_plan(world: &mut TestWorld) {
    world.resolve();
}

#[then(expr = "resolution should fail with {string}")]
async fn resolution_fails(world: &mut TestWorld, message: String) {
    match &world.error {
        Some(error) => assert!(
            error.contains(&message),
            "expected error containing '{}', got '{}'",
            message,
            error
        ),
        None => panic!("Resolution succeeded: {:?}", world.resolution),
    }
}

#[then(expr = "there should be a {string} diagnostic")]
async fn has_diagnostic(world: &mut TestWorld, kind: String) {
    let diagnostics = &world.resolution().diagnostics;
    let found = diagnostics.iter().any(|d| {
        serde_json::to_value(d.kind).ok() == Some(serde_json::Value::String(kind.clone()))
    });
    assert!(found, "no '{}' diagnostic in {:?}", kind, diagnostics);
}

#[then("there should be no diagnostics")]
async fn no_diagnostics(world: &mut TestWorld) {
    assert!(world.resolution().diagnostics.is_empty());
}

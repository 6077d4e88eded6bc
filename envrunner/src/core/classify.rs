//! Deterministic classification of per-component results into a phase outcome.

use crate::core::merge::merge_delta;
use crate::core::types::{EnvState, StateDelta};
use crate::error::{ComponentError, ComponentFailure};

/// Aggregate result of one phase run.
#[derive(Debug)]
pub enum PhaseOutcome {
    /// Every selected component succeeded (or none was selected).
    Success { merged: EnvState },
    /// Some components failed. `merged` holds the deltas of the ones that
    /// succeeded and must still be persisted.
    PartialSuccess {
        merged: EnvState,
        failures: Vec<ComponentFailure>,
    },
    /// Every selected component failed; nothing is merged.
    Failure { failures: Vec<ComponentFailure> },
}

impl PhaseOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PhaseOutcome::Success { .. })
    }

    /// Stable label for logs and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            PhaseOutcome::Success { .. } => "success",
            PhaseOutcome::PartialSuccess { .. } => "partial_success",
            PhaseOutcome::Failure { .. } => "failure",
        }
    }

    /// Merged deltas to persist, if any component succeeded.
    pub fn merged(&self) -> Option<&EnvState> {
        match self {
            PhaseOutcome::Success { merged } | PhaseOutcome::PartialSuccess { merged, .. } => {
                Some(merged)
            }
            PhaseOutcome::Failure { .. } => None,
        }
    }

    pub fn failures(&self) -> &[ComponentFailure] {
        match self {
            PhaseOutcome::Success { .. } => &[],
            PhaseOutcome::PartialSuccess { failures, .. } | PhaseOutcome::Failure { failures } => {
                failures
            }
        }
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            PhaseOutcome::Success { .. } => crate::exit_codes::OK,
            PhaseOutcome::PartialSuccess { .. } => crate::exit_codes::PARTIAL,
            PhaseOutcome::Failure { .. } => crate::exit_codes::FAILED,
        }
    }
}

/// Result of one component task, in dispatch order.
#[derive(Debug)]
pub struct ComponentResult {
    pub component: String,
    pub result: Result<StateDelta, ComponentError>,
}

/// Fold component results into a [`PhaseOutcome`].
///
/// Failures keep the order of `results`. Empty input is a no-op success.
pub fn classify_results(results: Vec<ComponentResult>) -> PhaseOutcome {
    let mut merged = EnvState::new();
    let mut succeeded = 0usize;
    let mut failures = Vec::new();

    for ComponentResult { component, result } in results {
        match result {
            Ok(delta) => {
                succeeded += 1;
                if !delta.is_empty() {
                    merge_delta(&mut merged, &component, delta);
                }
            }
            Err(error) => failures.push(ComponentFailure::new(component, error)),
        }
    }

    match (succeeded, failures.is_empty()) {
        (_, true) => PhaseOutcome::Success { merged },
        (0, false) => PhaseOutcome::Failure { failures },
        (_, false) => PhaseOutcome::PartialSuccess { merged, failures },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    fn ok(component: &str, value: Value) -> ComponentResult {
        let Value::Object(delta) = value else {
            panic!("delta must be an object");
        };
        ComponentResult {
            component: component.to_string(),
            result: Ok(delta),
        }
    }

    fn failed(component: &str, msg: &str) -> ComponentResult {
        ComponentResult {
            component: component.to_string(),
            result: Err(ComponentError::Failed(anyhow::anyhow!(msg.to_string()))),
        }
    }

    fn names(failures: &[ComponentFailure]) -> Vec<&str> {
        failures.iter().map(|f| f.component.as_str()).collect()
    }

    #[test]
    fn empty_results_are_success() {
        let outcome = classify_results(Vec::new());
        assert!(outcome.is_success());
        assert!(outcome.merged().expect("merged").is_empty());
    }

    #[test]
    fn all_ok_is_success_with_union() {
        let outcome = classify_results(vec![
            ok("aad", json!({ "clientId": "abc" })),
            ok("bot", json!({ "botId": "b1" })),
        ]);
        assert_eq!(outcome.kind(), "success");
        assert_eq!(outcome.exit_code(), crate::exit_codes::OK);
        let merged = outcome.merged().expect("merged");
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn middle_failure_is_partial_success() {
        let outcome = classify_results(vec![
            ok("one", json!({ "v": 1 })),
            failed("two", "boom"),
            ok("three", json!({ "v": 3 })),
        ]);

        let PhaseOutcome::PartialSuccess { merged, failures } = &outcome else {
            panic!("expected partial success, got {}", outcome.kind());
        };
        assert_eq!(names(failures), vec!["two"]);
        assert_eq!(merged.component("one").expect("one")["v"], json!(1));
        assert_eq!(merged.component("three").expect("three")["v"], json!(3));
        assert!(merged.component("two").is_none());
        assert_eq!(outcome.exit_code(), crate::exit_codes::PARTIAL);
    }

    #[test]
    fn all_failed_is_failure_in_input_order() {
        let outcome = classify_results(vec![
            failed("c", "x"),
            failed("a", "y"),
            failed("b", "z"),
        ]);
        assert_eq!(outcome.kind(), "failure");
        assert!(outcome.merged().is_none());
        assert_eq!(names(outcome.failures()), vec!["c", "a", "b"]);
    }

    #[test]
    fn empty_delta_counts_as_success_without_state() {
        let outcome = classify_results(vec![ok("aad", json!({})), failed("bot", "down")]);
        let PhaseOutcome::PartialSuccess { merged, .. } = outcome else {
            panic!("expected partial success");
        };
        assert!(merged.is_empty());
    }
}

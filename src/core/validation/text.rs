//! Free-text validation via a caller-supplied predicate
//!
//! A panic inside the predicate is caught and converted into a failing
//! outcome carrying the panic text.

use std::panic::{catch_unwind, AssertUnwindSafe};

use super::{TextPredicate, ValidationOutcome};

pub(super) fn validate(predicate: &TextPredicate, output: &str) -> ValidationOutcome {
    match catch_unwind(AssertUnwindSafe(|| predicate(output))) {
        Ok((true, _)) => ValidationOutcome::pass(output),
        Ok((false, message)) => {
            let message = message.unwrap_or_else(|| "Output does not meet requirements".to_string());
            ValidationOutcome::fail(message.clone(), retry_prompt(output, &message))
        }
        Err(payload) => {
            let message = format!("Validation function error: {}", panic_text(payload.as_ref()));
            ValidationOutcome::fail(message.clone(), retry_prompt(output, &message))
        }
    }
}

fn panic_text(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        (*text).to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic".to_string()
    }
}

fn retry_prompt(output: &str, message: &str) -> String {
    format!(
        "Your previous response did not meet the format requirements: {}\n\nPrevious response:\n{}\n\nPlease provide a response that meets the specified requirements.",
        message, output
    )
}

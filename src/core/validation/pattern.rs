//! Pattern validation
//!
//! On success the whole matched text is returned; capture groups are not
//! extracted.

use regex::Regex;

use super::ValidationOutcome;

pub(super) fn validate(regex: &Regex, output: &str) -> ValidationOutcome {
    match regex.find(output) {
        Some(found) => ValidationOutcome::pass(found.as_str()),
        None => {
            let message = format!("Output does not match required pattern: {}", regex.as_str());
            ValidationOutcome::fail(message.clone(), retry_prompt(output, regex))
        }
    }
}

fn retry_prompt(output: &str, regex: &Regex) -> String {
    format!(
        "Your previous response did not match the required format.\n\nRequired pattern: {}\n\nPrevious response:\n{}\n\nPlease provide a response that matches the required format.",
        regex.as_str(),
        output
    )
}

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::{ApiError, FieldError};

/// One declarative validation rule: the predicate must hold for the
/// request to pass. Rules are evaluated in order and every failure is
/// collected, so the client sees all problems at once.
pub struct Rule<T> {
    pub field: &'static str,
    pub message: &'static str,
    pub check: fn(&T) -> bool,
}

pub fn check_rules<T>(value: &T, rules: &[Rule<T>]) -> Result<(), ApiError> {
    let errors: Vec<FieldError> = rules
        .iter()
        .filter(|rule| !(rule.check)(value))
        .map(|rule| FieldError {
            field: rule.field,
            message: rule.message,
        })
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::Validation(errors))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

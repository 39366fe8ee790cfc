//! Field-level validation errors that are collected and reported together.

use std::fmt::Display;

use serde::Serialize;
use time::{Date, OffsetDateTime, format_description::well_known::Rfc3339, macros::format_description};
use unicode_segmentation::UnicodeSegmentation;

use crate::Error;

/// A single validation failure for one input field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// The name of the field as the client sent it, e.g. "startDate".
    pub field: String,
    /// A human readable explanation of what is wrong with the field.
    pub message: String,
}

/// Every validation failure found in a request.
///
/// Validators push into this list instead of returning on the first failure
/// so that the client sees all problems at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    /// Create an empty list of errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure for `field`.
    pub fn push(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    /// Whether no failures have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a failure has been recorded for `field`.
    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|error| error.field == field)
    }

    /// The recorded failures in the order they were found.
    pub fn errors(&self) -> &[FieldError] {
        &self.0
    }

    /// Return `value` if no failures were recorded, otherwise [Error::Validation].
    pub fn into_result<T>(self, value: T) -> Result<T, Error> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(Error::Validation(self))
        }
    }

    /// Unwrap a field result, recording the failure under `field` on error.
    pub fn check<T>(&mut self, field: &str, result: Result<T, String>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(message) => {
                self.push(field, message);
                None
            }
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|error| format!("{}: {}", error.field, error.message))
            .collect::<Vec<_>>()
            .join("; ");

        write!(f, "{joined}")
    }
}

/// The number of user-perceived characters in `text`.
pub fn character_count(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Parse an ISO 8601 calendar date ("2025-01-31") or an RFC 3339 date-time.
///
/// Only the calendar date of a date-time is kept.
pub fn parse_iso_date(text: &str) -> Option<Date> {
    let text = text.trim();

    Date::parse(text, format_description!("[year]-[month]-[day]"))
        .ok()
        .or_else(|| {
            OffsetDateTime::parse(text, &Rfc3339)
                .ok()
                .map(|date_time| date_time.date())
        })
}

/// Parse a positive integer that must lie within `min..=max`.
pub fn parse_bounded_integer(text: &str, min: u64, max: u64) -> Option<u64> {
    text.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| (min..=max).contains(value))
}

/// A string that does not name any variant of a closed enumeration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("\"{value}\" is not a valid {kind}")]
pub struct UnknownVariant {
    /// What was being parsed, e.g. "category".
    pub kind: &'static str,
    /// The text that could not be parsed.
    pub value: String,
}

impl UnknownVariant {
    /// Create an error for `value` not being a valid `kind`.
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

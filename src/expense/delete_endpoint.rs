//! Defines the endpoints for deleting one or many expenses.

use axum::{
    Extension,
    body::Bytes,
    extract::{Path, State, rejection::PathRejection},
};
use serde::Serialize;
use serde_json::Value;

use crate::{
    Error,
    database_id::ExpenseId,
    db::lock_connection,
    envelope::Envelope,
    expense::{ExpenseState, delete_expense, delete_expenses, parse_expense_id},
    user::UserID,
    validation::ValidationErrors,
};

/// The result of a bulk delete.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedCount {
    /// How many of the requested expenses were deleted.
    pub deleted_count: usize,
}

/// A route handler for deleting one of the caller's expenses.
pub async fn delete_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    expense_id: Result<Path<String>, PathRejection>,
) -> Result<Envelope<()>, Error> {
    let Path(expense_id) = expense_id?;
    let expense_id = parse_expense_id(&expense_id)?;

    let connection = lock_connection(&state.db_connection)?;
    delete_expense(expense_id, user_id, &connection)?;

    Ok(Envelope::message("Expense deleted successfully"))
}

/// A route handler for deleting many of the caller's expenses at once.
///
/// The body must be `{"ids": [...]}`. IDs that do not exist or belong to
/// another user are skipped, and the response reports how many were deleted.
pub async fn delete_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    body: Bytes,
) -> Result<Envelope<DeletedCount>, Error> {
    let ids = parse_bulk_ids(&body)?;

    let connection = lock_connection(&state.db_connection)?;
    let deleted_count = delete_expenses(&ids, user_id, &connection)?;

    tracing::debug!(
        "user {user_id} bulk deleted {deleted_count} of {} expenses",
        ids.len()
    );

    Ok(Envelope::data(DeletedCount { deleted_count })
        .with_message(format!("{deleted_count} expense(s) deleted successfully")))
}

/// Read the `ids` list of a bulk delete body.
///
/// IDs may be integers or strings holding integers.
fn parse_bulk_ids(body: &[u8]) -> Result<Vec<ExpenseId>, Error> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Err(Error::MissingExpenseIds);
    }

    let body: Value = serde_json::from_slice(body).map_err(|error| {
        Error::InvalidRequest(format!(
            "Failed to parse the request body as JSON: {error}"
        ))
    })?;

    let raw_ids = match body.get("ids") {
        Some(Value::Array(raw_ids)) if !raw_ids.is_empty() => raw_ids,
        _ => return Err(Error::MissingExpenseIds),
    };

    let ids: Option<Vec<ExpenseId>> = raw_ids
        .iter()
        .map(|raw_id| match raw_id {
            Value::Number(number) => number.as_i64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .collect();

    ids.ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.push("ids", "Invalid expense ID");
        Error::Validation(errors)
    })
}

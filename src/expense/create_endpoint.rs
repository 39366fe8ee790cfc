//! Defines the endpoint for creating a new expense.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};

use crate::{
    Error,
    db::lock_connection,
    envelope::Envelope,
    expense::{Expense, ExpenseForm, ExpenseState, create_expense, validate_new_expense},
    timezone::get_local_today,
    user::UserID,
};

/// A route handler for creating a new expense owned by the caller.
///
/// Responds with 201 and the stored expense. An expense without a date is
/// dated today in the server's local timezone.
pub async fn create_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    form: Result<Json<ExpenseForm>, JsonRejection>,
) -> Result<(StatusCode, Envelope<Expense>), Error> {
    let Json(form) = form?;
    let today = get_local_today(&state.local_timezone)?;
    let new_expense = validate_new_expense(form, today)?;

    let connection = lock_connection(&state.db_connection)?;
    let expense = create_expense(user_id, new_expense, &connection)?;

    tracing::debug!("user {user_id} created expense {}", expense.id);

    Ok((
        StatusCode::CREATED,
        Envelope::data(expense).with_message("Expense created successfully"),
    ))
}

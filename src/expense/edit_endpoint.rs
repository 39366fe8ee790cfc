//! Defines the endpoint for partially updating an expense.

use axum::{
    Extension, Json,
    extract::{
        Path, State,
        rejection::{JsonRejection, PathRejection},
    },
};

use crate::{
    Error,
    db::lock_connection,
    envelope::Envelope,
    expense::{
        Expense, ExpenseForm, ExpenseState, parse_expense_id, update_expense,
        validate_expense_patch,
    },
    user::UserID,
};

/// A route handler for updating one of the caller's expenses.
///
/// Only the fields present in the request body are changed.
pub async fn edit_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    expense_id: Result<Path<String>, PathRejection>,
    form: Result<Json<ExpenseForm>, JsonRejection>,
) -> Result<Envelope<Expense>, Error> {
    let Path(expense_id) = expense_id?;
    let expense_id = parse_expense_id(&expense_id)?;
    let Json(form) = form?;
    let patch = validate_expense_patch(form)?;

    let connection = lock_connection(&state.db_connection)?;
    let expense = update_expense(expense_id, user_id, patch, &connection)?;

    Ok(Envelope::data(expense).with_message("Expense updated successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints::{self, format_endpoint},
        expense::get_expense,
        test_utils::{
            must_create_test_expense, must_create_test_server, must_create_test_state,
            must_create_test_user, must_create_test_user_with_email,
        },
    };

    #[tokio::test]
    async fn updates_only_given_fields() {
        let state = must_create_test_state();
        let (user, token) = must_create_test_user(&state);
        let expense = must_create_test_expense(&state, user.id);
        let server = must_create_test_server(state.clone());

        let response = server
            .put(&format_endpoint(endpoints::EXPENSE, expense.id))
            .authorization_bearer(&token)
            .json(&json!({"amount": 12.25, "isRecurring": true, "recurringFrequency": "weekly"}))
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["message"], json!("Expense updated successfully"));
        assert_eq!(body["data"]["amount"], json!(12.25));
        assert_eq!(body["data"]["title"], json!(expense.title));
        assert_eq!(body["data"]["recurringFrequency"], json!("weekly"));

        let connection = state.db_connection.lock().unwrap();
        let stored = get_expense(expense.id, user.id, &connection).unwrap();
        assert_eq!(stored.amount, 12.25);
        assert!(stored.is_recurring);
        assert_eq!(stored.category, expense.category);
    }

    #[tokio::test]
    async fn update_rejects_invalid_fields() {
        let state = must_create_test_state();
        let (user, token) = must_create_test_user(&state);
        let expense = must_create_test_expense(&state, user.id);
        let server = must_create_test_server(state);

        let response = server
            .put(&format_endpoint(endpoints::EXPENSE, expense.id))
            .authorization_bearer(&token)
            .json(&json!({"amount": 0, "type": "gift"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["errors"],
            json!([
                {"field": "amount", "message": "Amount must be greater than 0"},
                {"field": "type", "message": "Type must be income or expense"},
            ])
        );
    }

    #[tokio::test]
    async fn update_cannot_touch_other_users_expense() {
        let state = must_create_test_state();
        let (owner, _) = must_create_test_user(&state);
        let (_, intruder_token) = must_create_test_user_with_email(&state, "intruder@example.com");
        let expense = must_create_test_expense(&state, owner.id);
        let server = must_create_test_server(state.clone());

        let response = server
            .put(&format_endpoint(endpoints::EXPENSE, expense.id))
            .authorization_bearer(&intruder_token)
            .json(&json!({"title": "Stolen"}))
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
        let connection = state.db_connection.lock().unwrap();
        let stored = get_expense(expense.id, owner.id, &connection).unwrap();
        assert_eq!(stored.title, expense.title);
    }
}

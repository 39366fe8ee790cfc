//! Endpoints for listing a user's expenses and fetching a single expense.

use axum::{
    Extension,
    extract::{
        Path, Query, State,
        rejection::{PathRejection, QueryRejection},
    },
};

use crate::{
    Error,
    db::lock_connection,
    envelope::Envelope,
    expense::{
        Expense, ExpenseState, ListParams, get_expense, parse_expense_id, parse_list_params,
        query_expenses,
    },
    pagination::Pagination,
    user::UserID,
};

/// A route handler that responds with one page of the caller's expenses.
///
/// The query string may filter by type, category, date range and search text,
/// and choose the sort order and page. See [ListParams].
pub async fn list_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Envelope<Vec<Expense>>, Error> {
    let Query(params) = params?;
    let query = parse_list_params(&params, user_id, &state.pagination_config)?;

    let connection = lock_connection(&state.db_connection)?;
    let (expenses, total) = query_expenses(&query, &connection)?;

    Ok(Envelope::data(expenses).with_pagination(Pagination::new(query.page, query.limit, total)))
}

/// A route handler that responds with one of the caller's expenses.
///
/// Responds with 404 if the expense does not exist or belongs to another user.
pub async fn get_expense_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    expense_id: Result<Path<String>, PathRejection>,
) -> Result<Envelope<Expense>, Error> {
    let Path(expense_id) = expense_id?;
    let expense_id = parse_expense_id(&expense_id)?;

    let connection = lock_connection(&state.db_connection)?;
    let expense = get_expense(expense_id, user_id, &connection)?;

    Ok(Envelope::data(expense))
}

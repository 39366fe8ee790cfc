//! Expense management: the owner-scoped record store, the list query builder,
//! analytics and the REST endpoints built on top of them.

mod aggregation;
mod analytics_endpoint;
mod core;
mod create_endpoint;
mod delete_endpoint;
mod edit_endpoint;
mod form;
mod list_endpoint;
mod query;

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use rusqlite::Connection;

use crate::{AppState, pagination::PaginationConfig};

pub use aggregation::{
    Summary, TrendRow, get_aggregate_rows, monthly_trends, summarize, trend_window_start,
};
pub use analytics_endpoint::{
    get_recent_expenses_endpoint, get_summary_endpoint, get_trends_endpoint,
};
pub use core::{
    Category, Expense, ExpenseKind, ExpensePatch, NewExpense, RecurringFrequency,
    count_expenses, create_expense, create_expense_table, delete_expense, delete_expenses, get_expense,
    get_recent_expenses, update_expense,
};
pub use create_endpoint::create_expense_endpoint;
pub use delete_endpoint::{delete_expense_endpoint, delete_expenses_endpoint};
pub use edit_endpoint::edit_expense_endpoint;
pub use form::{ExpenseForm, parse_expense_id, validate_expense_patch, validate_new_expense};
pub use list_endpoint::{get_expense_endpoint, list_expenses_endpoint};
pub use query::{DateRange, ExpenseFilter, ListParams, parse_list_params, query_expenses};

/// The state needed by the expense endpoints.
#[derive(Debug, Clone)]
pub struct ExpenseState {
    /// The database connection for managing expenses.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The config that controls how to page lists of expenses.
    pub pagination_config: PaginationConfig,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for ExpenseState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            pagination_config: state.pagination_config.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

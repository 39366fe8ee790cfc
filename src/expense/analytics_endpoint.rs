//! Endpoints for the summary, monthly trend and recent activity views.

use axum::{
    Extension,
    extract::{Query, State, rejection::QueryRejection},
};
use serde::Deserialize;

use crate::{
    Error,
    db::lock_connection,
    envelope::Envelope,
    expense::{
        DateRange, Expense, ExpenseFilter, ExpenseState, Summary, TrendRow, get_aggregate_rows,
        get_recent_expenses, monthly_trends,
        query::{non_empty, parse_date_range},
        summarize, trend_window_start,
    },
    timezone::get_local_today,
    user::UserID,
    validation::{ValidationErrors, parse_bounded_integer},
};

const DEFAULT_TREND_MONTHS: u64 = 6;
const MAX_TREND_MONTHS: u64 = 120;
const DEFAULT_RECENT_LIMIT: u64 = 5;
const MAX_RECENT_LIMIT: u64 = 100;

/// The query string of a summary request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    start_date: Option<String>,
    end_date: Option<String>,
}

/// The query string of a trends request.
#[derive(Debug, Default, Deserialize)]
pub struct TrendParams {
    months: Option<String>,
}

/// The query string of a recent expenses request.
#[derive(Debug, Default, Deserialize)]
pub struct RecentParams {
    limit: Option<String>,
}

fn parse_summary_params(params: &SummaryParams) -> Result<DateRange, Error> {
    let mut errors = ValidationErrors::new();
    let start_date = non_empty(params.start_date.as_deref());
    let end_date = non_empty(params.end_date.as_deref());

    match (start_date, end_date) {
        (Some(_), None) => errors.push("endDate", "startDate and endDate must be provided together"),
        (None, Some(_)) => {
            errors.push("startDate", "startDate and endDate must be provided together")
        }
        _ => {}
    }

    let date_range = parse_date_range(start_date, end_date, &mut errors);

    errors.into_result(date_range)
}

fn parse_bounded_param(
    field: &str,
    value: Option<&str>,
    default: u64,
    max: u64,
    message: &str,
) -> Result<u64, Error> {
    let Some(text) = non_empty(value) else {
        return Ok(default);
    };

    parse_bounded_integer(text, 1, max).ok_or_else(|| {
        let mut errors = ValidationErrors::new();
        errors.push(field, message);
        Error::Validation(errors)
    })
}

/// A route handler that responds with the caller's income and expense totals.
///
/// The optional `startDate` and `endDate` parameters restrict the summary to an
/// inclusive date range.
pub async fn get_summary_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    params: Result<Query<SummaryParams>, QueryRejection>,
) -> Result<Envelope<Summary>, Error> {
    let Query(params) = params?;
    let filter = ExpenseFilter {
        date_range: parse_summary_params(&params)?,
        ..Default::default()
    };

    let connection = lock_connection(&state.db_connection)?;
    let rows = get_aggregate_rows(user_id, &filter, &connection)?;

    Ok(Envelope::data(summarize(&rows)))
}

/// A route handler that responds with the caller's income and expense totals
/// per month, oldest month first.
///
/// Covers the last `months` months up to today. Months without any records
/// are left out.
pub async fn get_trends_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    params: Result<Query<TrendParams>, QueryRejection>,
) -> Result<Envelope<Vec<TrendRow>>, Error> {
    let Query(params) = params?;
    let months = parse_bounded_param(
        "months",
        params.months.as_deref(),
        DEFAULT_TREND_MONTHS,
        MAX_TREND_MONTHS,
        "Months must be between 1 and 120",
    )?;
    let today = get_local_today(&state.local_timezone)?;
    let window_start = trend_window_start(today, u32::try_from(months).unwrap_or(u32::MAX));
    let filter = ExpenseFilter {
        date_range: DateRange {
            start: Some(window_start),
            end: None,
        },
        ..Default::default()
    };

    let connection = lock_connection(&state.db_connection)?;
    let rows = get_aggregate_rows(user_id, &filter, &connection)?;

    Ok(Envelope::data(monthly_trends(&rows)))
}

/// A route handler that responds with the caller's latest expenses.
pub async fn get_recent_expenses_endpoint(
    State(state): State<ExpenseState>,
    Extension(user_id): Extension<UserID>,
    params: Result<Query<RecentParams>, QueryRejection>,
) -> Result<Envelope<Vec<Expense>>, Error> {
    let Query(params) = params?;
    let limit = parse_bounded_param(
        "limit",
        params.limit.as_deref(),
        DEFAULT_RECENT_LIMIT,
        MAX_RECENT_LIMIT,
        "Limit must be between 1 and 100",
    )?;

    let connection = lock_connection(&state.db_connection)?;
    let expenses = get_recent_expenses(user_id, limit, &connection)?;

    Ok(Envelope::data(expenses))
}

//! Expense totals, category breakdowns and monthly trends.
//!
//! The rows for one user are fetched with [get_aggregate_rows] and then reduced
//! by the pure functions [summarize] and [monthly_trends].

use std::{collections::BTreeMap, fmt::Display};

use rusqlite::{Connection, params_from_iter};
use serde::{Serialize, Serializer};
use time::{Date, Month};

use crate::{
    Error,
    db::get_parsed,
    expense::{
        Category, ExpenseKind,
        query::{ExpenseFilter, Predicate},
    },
    user::UserID,
};

/// The fields of an expense needed for aggregation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AggregateRow {
    /// Whether the money was earned or spent.
    pub kind: ExpenseKind,
    /// What the money was for.
    pub category: Category,
    /// How much money.
    pub amount: f64,
    /// When the money was earned or spent.
    pub date: Date,
}

/// The spending in one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    /// The category.
    pub category: Category,
    /// The sum of the spending in the category.
    pub total: f64,
    /// The number of expenses in the category.
    pub count: u64,
    /// The category's share of all spending, in percent, rounded to one decimal place.
    #[serde(serialize_with = "serialize_one_decimal")]
    pub percentage: f64,
}

/// Income and spending totals over a period.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// The sum of all income.
    pub total_income: f64,
    /// The sum of all spending.
    pub total_expense: f64,
    /// Income minus spending. Negative when more was spent than earned.
    pub balance: f64,
    /// The number of income records.
    pub income_count: u64,
    /// The number of spending records.
    pub expense_count: u64,
    /// Spending per category, largest total first.
    pub category_breakdown: Vec<CategoryTotal>,
}

/// A calendar month, serialized as "YYYY-MM".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct YearMonth {
    /// The calendar year.
    pub year: i32,
    /// The month of the year, 1 to 12.
    pub month: u8,
}

impl From<Date> for YearMonth {
    fn from(date: Date) -> Self {
        Self {
            year: date.year(),
            month: date.month() as u8,
        }
    }
}

impl Display for YearMonth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl Serialize for YearMonth {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// The income and spending in one month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendRow {
    /// The month.
    pub month: YearMonth,
    /// The sum of the income in the month, zero if there was none.
    pub income: f64,
    /// The sum of the spending in the month, zero if there was none.
    pub expense: f64,
}

fn serialize_one_decimal<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&format_args!("{value:.1}"))
}

/// Round half away from zero to one decimal place.
fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Compute the income and spending totals and the spending per category.
///
/// Categories with equal totals are ordered by their declaration order in [Category].
/// When nothing was spent every percentage is zero.
pub fn summarize(rows: &[AggregateRow]) -> Summary {
    let mut total_income = 0.0;
    let mut total_expense = 0.0;
    let mut income_count = 0;
    let mut expense_count = 0;
    let mut category_totals: BTreeMap<Category, (f64, u64)> = BTreeMap::new();

    for row in rows {
        match row.kind {
            ExpenseKind::Income => {
                total_income += row.amount;
                income_count += 1;
            }
            ExpenseKind::Expense => {
                total_expense += row.amount;
                expense_count += 1;

                let (total, count) = category_totals.entry(row.category).or_insert((0.0, 0));
                *total += row.amount;
                *count += 1;
            }
        }
    }

    let mut category_breakdown: Vec<CategoryTotal> = category_totals
        .into_iter()
        .map(|(category, (total, count))| CategoryTotal {
            category,
            total,
            count,
            percentage: if total_expense > 0.0 {
                round_one_decimal(total / total_expense * 100.0)
            } else {
                0.0
            },
        })
        .collect();

    // Stable sort, so ties keep the category order from the map.
    category_breakdown.sort_by(|a, b| b.total.total_cmp(&a.total));

    Summary {
        total_income,
        total_expense,
        balance: total_income - total_expense,
        income_count,
        expense_count,
        category_breakdown,
    }
}

/// Sum the income and spending of each month that has at least one record.
///
/// Months without records are left out rather than filled with zeros.
/// Rows are in ascending order of month.
pub fn monthly_trends(rows: &[AggregateRow]) -> Vec<TrendRow> {
    let mut months: BTreeMap<YearMonth, TrendRow> = BTreeMap::new();

    for row in rows {
        let month = YearMonth::from(row.date);
        let trend = months.entry(month).or_insert(TrendRow {
            month,
            income: 0.0,
            expense: 0.0,
        });

        match row.kind {
            ExpenseKind::Income => trend.income += row.amount,
            ExpenseKind::Expense => trend.expense += row.amount,
        }
    }

    months.into_values().collect()
}

/// The first day of a trend window covering `months` months up to `today`.
///
/// Steps back by calendar months. If the day of `today` does not exist in the
/// target month, the last day of that month is used, e.g. 31 March minus one
/// month is 28 February (or 29 in a leap year).
pub fn trend_window_start(today: Date, months: u32) -> Date {
    let month_index =
        i64::from(today.year()) * 12 + i64::from(today.month() as u8) - 1 - i64::from(months);
    let Ok(year) = i32::try_from(month_index.div_euclid(12)) else {
        return Date::MIN;
    };
    let Some(month) = u8::try_from(month_index.rem_euclid(12) + 1)
        .ok()
        .and_then(|month| Month::try_from(month).ok())
    else {
        return Date::MIN;
    };

    (1..=today.day())
        .rev()
        .find_map(|day| Date::from_calendar_date(year, month, day).ok())
        .unwrap_or(Date::MIN)
}

/// Get the aggregation fields of the expenses of `owner` matching `filter`.
///
/// # Errors
/// Returns [Error::SqlError] if the SQL query fails or a row cannot be read.
pub fn get_aggregate_rows(
    owner: UserID,
    filter: &ExpenseFilter,
    connection: &Connection,
) -> Result<Vec<AggregateRow>, Error> {
    let predicate = Predicate::new(owner, filter);

    connection
        .prepare(&format!(
            "SELECT kind, category, amount, date FROM expense WHERE {}",
            predicate.clause
        ))?
        .query_map(params_from_iter(predicate.values.iter()), |row| {
            Ok(AggregateRow {
                kind: get_parsed(row, 0)?,
                category: get_parsed(row, 1)?,
                amount: row.get(2)?,
                date: row.get(3)?,
            })
        })?
        .map(|row_result| row_result.map_err(Error::from))
        .collect()
}

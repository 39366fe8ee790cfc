//! Defines the core data models and database queries for expenses.
//!
//! Every query in this module is scoped to the expense's owner. A caller can
//! never read or change an expense that belongs to another user, and cannot
//! tell such an expense apart from one that does not exist.

use std::{collections::BTreeSet, fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{ToSqlOutput, Type},
};
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime};

use crate::{
    Error,
    database_id::ExpenseId,
    db::{get_count, get_parsed},
    user::UserID,
    validation::UnknownVariant,
};

// ============================================================================
// MODELS
// ============================================================================

/// Whether money was earned or spent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpenseKind {
    /// Money earned.
    Income,
    /// Money spent.
    Expense,
}

impl ExpenseKind {
    /// The name of the kind as it appears in requests and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            ExpenseKind::Income => "income",
            ExpenseKind::Expense => "expense",
        }
    }
}

impl FromStr for ExpenseKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(ExpenseKind::Income),
            "expense" => Ok(ExpenseKind::Expense),
            other => Err(UnknownVariant::new("type", other)),
        }
    }
}

/// What an expense was for.
///
/// Salary, freelance and investment are meant for income and the rest for
/// spending, but any category may be used with either [ExpenseKind].
///
/// The declaration order is used to break ties between categories with equal totals.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Groceries, eating out.
    Food,
    /// Fuel, fares, parking.
    Transport,
    /// Power, water, internet.
    Utilities,
    /// Movies, games, events.
    Entertainment,
    /// Clothes and other goods.
    Shopping,
    /// Medical costs.
    Health,
    /// Courses, books, fees.
    Education,
    /// Wages.
    Salary,
    /// Contract work.
    Freelance,
    /// Returns on investments.
    Investment,
    /// Anything else.
    Other,
}

impl Category {
    /// Every category in declaration order.
    pub const ALL: [Category; 11] = [
        Category::Food,
        Category::Transport,
        Category::Utilities,
        Category::Entertainment,
        Category::Shopping,
        Category::Health,
        Category::Education,
        Category::Salary,
        Category::Freelance,
        Category::Investment,
        Category::Other,
    ];

    /// The name of the category as it appears in requests and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Utilities => "utilities",
            Category::Entertainment => "entertainment",
            Category::Shopping => "shopping",
            Category::Health => "health",
            Category::Education => "education",
            Category::Salary => "salary",
            Category::Freelance => "freelance",
            Category::Investment => "investment",
            Category::Other => "other",
        }
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("category", s))
    }
}

/// How often a recurring expense repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurringFrequency {
    /// Every day.
    Daily,
    /// Every week.
    Weekly,
    /// Every month.
    Monthly,
    /// Every year.
    Yearly,
}

impl RecurringFrequency {
    /// The name of the frequency as it appears in requests and in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurringFrequency::Daily => "daily",
            RecurringFrequency::Weekly => "weekly",
            RecurringFrequency::Monthly => "monthly",
            RecurringFrequency::Yearly => "yearly",
        }
    }
}

impl FromStr for RecurringFrequency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily" => Ok(RecurringFrequency::Daily),
            "weekly" => Ok(RecurringFrequency::Weekly),
            "monthly" => Ok(RecurringFrequency::Monthly),
            "yearly" => Ok(RecurringFrequency::Yearly),
            other => Err(UnknownVariant::new("recurring frequency", other)),
        }
    }
}

macro_rules! impl_to_sql_as_str {
    ($($name:ty),+) => {
        $(
            impl ToSql for $name {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl Display for $name {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

impl_to_sql_as_str!(ExpenseKind, Category, RecurringFrequency);

/// A single income or expense record owned by one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Expense {
    /// The ID of the expense.
    pub id: ExpenseId,
    /// The user that created the expense.
    #[serde(rename = "user")]
    pub owner: UserID,
    /// A short name for the expense.
    pub title: String,
    /// How much money was earned or spent. Always positive.
    pub amount: f64,
    /// Whether the money was earned or spent.
    #[serde(rename = "type")]
    pub kind: ExpenseKind,
    /// What the money was for.
    pub category: Category,
    /// Optional free text, empty if not given.
    pub description: String,
    /// When the money was earned or spent.
    pub date: Date,
    /// Short labels attached by the user.
    pub tags: Vec<String>,
    /// Whether the expense repeats.
    pub is_recurring: bool,
    /// How often the expense repeats.
    pub recurring_frequency: Option<RecurringFrequency>,
    /// When the expense was created.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// When the expense was last changed.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// The validated data needed to create an expense.
///
/// The owner is supplied separately by the caller's identity.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    /// A short name for the expense.
    pub title: String,
    /// How much money was earned or spent.
    pub amount: f64,
    /// Whether the money was earned or spent.
    pub kind: ExpenseKind,
    /// What the money was for.
    pub category: Category,
    /// Optional free text.
    pub description: String,
    /// When the money was earned or spent.
    pub date: Date,
    /// Short labels.
    pub tags: Vec<String>,
    /// Whether the expense repeats.
    pub is_recurring: bool,
    /// How often the expense repeats.
    pub recurring_frequency: Option<RecurringFrequency>,
}

impl NewExpense {
    /// Create a one-off expense with no description or tags.
    ///
    /// Shortcut for filling out [NewExpense] by hand.
    pub fn build(
        title: &str,
        amount: f64,
        kind: ExpenseKind,
        category: Category,
        date: Date,
    ) -> Self {
        Self {
            title: title.to_owned(),
            amount,
            kind,
            category,
            description: String::new(),
            date,
            tags: Vec::new(),
            is_recurring: false,
            recurring_frequency: None,
        }
    }
}

/// A partial update to an expense.
///
/// `None` leaves a field unchanged. For `recurring_frequency`, `Some(None)`
/// clears the frequency.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpensePatch {
    /// The new title.
    pub title: Option<String>,
    /// The new amount.
    pub amount: Option<f64>,
    /// The new kind.
    pub kind: Option<ExpenseKind>,
    /// The new category.
    pub category: Option<Category>,
    /// The new description.
    pub description: Option<String>,
    /// The new date.
    pub date: Option<Date>,
    /// The new tags, replacing the old ones.
    pub tags: Option<Vec<String>>,
    /// The new recurring flag.
    pub is_recurring: Option<bool>,
    /// The new frequency, or `Some(None)` to clear it.
    pub recurring_frequency: Option<Option<RecurringFrequency>>,
}

impl ExpensePatch {
    fn apply(self, expense: &mut Expense) {
        if let Some(title) = self.title {
            expense.title = title;
        }
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(kind) = self.kind {
            expense.kind = kind;
        }
        if let Some(category) = self.category {
            expense.category = category;
        }
        if let Some(description) = self.description {
            expense.description = description;
        }
        if let Some(date) = self.date {
            expense.date = date;
        }
        if let Some(tags) = self.tags {
            expense.tags = tags;
        }
        if let Some(is_recurring) = self.is_recurring {
            expense.is_recurring = is_recurring;
        }
        if let Some(recurring_frequency) = self.recurring_frequency {
            expense.recurring_frequency = recurring_frequency;
        }
    }
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// The columns read by [map_expense_row], in order.
pub(crate) const EXPENSE_COLUMNS: &str = "id, user_id, title, amount, kind, category, \
     description, date, tags, is_recurring, recurring_frequency, created_at, updated_at";

type RowsAffected = usize;

fn tags_to_json(tags: &[String]) -> Result<String, Error> {
    serde_json::to_string(tags).map_err(|error| Error::JSONSerializationError(error.to_string()))
}

/// Create a new expense owned by `owner`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error,
/// for example if `owner` is not a registered user.
pub fn create_expense(
    owner: UserID,
    new_expense: NewExpense,
    connection: &Connection,
) -> Result<Expense, Error> {
    let now = OffsetDateTime::now_utc();
    let tags = tags_to_json(&new_expense.tags)?;

    let expense = connection
        .prepare(&format!(
            "INSERT INTO expense (user_id, title, amount, kind, category, description, date, \
             tags, is_recurring, recurring_frequency, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
             RETURNING {EXPENSE_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                owner,
                new_expense.title,
                new_expense.amount,
                new_expense.kind,
                new_expense.category,
                new_expense.description,
                new_expense.date,
                tags,
                new_expense.is_recurring,
                new_expense.recurring_frequency,
                now,
            ],
            map_expense_row,
        )?;

    Ok(expense)
}

/// Retrieve the expense with `id` owned by `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::ExpenseNotFound] if `id` does not refer to an expense owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn get_expense(id: ExpenseId, owner: UserID, connection: &Connection) -> Result<Expense, Error> {
    connection
        .prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expense WHERE id = :id AND user_id = :owner"
        ))?
        .query_row(
            rusqlite::named_params! {":id": id, ":owner": owner},
            map_expense_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::ExpenseNotFound,
            error => error.into(),
        })
}

/// Apply `patch` to the expense with `id` owned by `owner` and return the updated expense.
///
/// Fields not set in `patch` keep their current values. `updated_at` is set to now.
///
/// # Errors
/// This function will return a:
/// - [Error::ExpenseNotFound] if `id` does not refer to an expense owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn update_expense(
    id: ExpenseId,
    owner: UserID,
    patch: ExpensePatch,
    connection: &Connection,
) -> Result<Expense, Error> {
    let mut expense = get_expense(id, owner, connection)?;
    patch.apply(&mut expense);
    let tags = tags_to_json(&expense.tags)?;

    connection
        .prepare(&format!(
            "UPDATE expense SET title = ?1, amount = ?2, kind = ?3, category = ?4, \
             description = ?5, date = ?6, tags = ?7, is_recurring = ?8, \
             recurring_frequency = ?9, updated_at = ?10
             WHERE id = ?11 AND user_id = ?12
             RETURNING {EXPENSE_COLUMNS}"
        ))?
        .query_row(
            rusqlite::params![
                expense.title,
                expense.amount,
                expense.kind,
                expense.category,
                expense.description,
                expense.date,
                tags,
                expense.is_recurring,
                expense.recurring_frequency,
                OffsetDateTime::now_utc(),
                id,
                owner,
            ],
            map_expense_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::ExpenseNotFound,
            error => error.into(),
        })
}

/// Delete the expense with `id` owned by `owner`.
///
/// # Errors
/// This function will return a:
/// - [Error::ExpenseNotFound] if `id` does not refer to an expense owned by `owner`,
/// - or [Error::SqlError] there is some other SQL error.
pub fn delete_expense(id: ExpenseId, owner: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM expense WHERE id = :id AND user_id = :owner",
        rusqlite::named_params! {":id": id, ":owner": owner},
    )?;

    match rows_affected {
        0 => Err(Error::ExpenseNotFound),
        _ => Ok(()),
    }
}

/// Delete every expense in `ids` that is owned by `owner`.
///
/// IDs that do not exist or belong to another user are skipped. Duplicate IDs
/// are only counted once.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
/// No expenses are deleted in that case.
pub fn delete_expenses(
    ids: &[ExpenseId],
    owner: UserID,
    connection: &Connection,
) -> Result<RowsAffected, Error> {
    let ids: BTreeSet<ExpenseId> = ids.iter().copied().collect();
    let transaction = connection.unchecked_transaction()?;
    let mut rows_affected = 0;

    {
        let mut statement =
            transaction.prepare("DELETE FROM expense WHERE id = :id AND user_id = :owner")?;

        for id in ids {
            rows_affected +=
                statement.execute(rusqlite::named_params! {":id": id, ":owner": owner})?;
        }
    }

    transaction.commit()?;

    Ok(rows_affected)
}

/// Get the `limit` most recent expenses of `owner`, newest first.
///
/// Expenses on the same date are ordered by ID, highest first.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn get_recent_expenses(
    owner: UserID,
    limit: u64,
    connection: &Connection,
) -> Result<Vec<Expense>, Error> {
    let limit = i64::try_from(limit).unwrap_or(i64::MAX);

    connection
        .prepare(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expense WHERE user_id = :owner
             ORDER BY date DESC, id DESC LIMIT :limit"
        ))?
        .query_map(
            rusqlite::named_params! {":owner": owner, ":limit": limit},
            map_expense_row,
        )?
        .map(|maybe_expense| maybe_expense.map_err(Error::from))
        .collect()
}

/// Get the number of expenses owned by `owner`.
///
/// # Errors
/// This function will return a [Error::SqlError] if there is an SQL error.
pub fn count_expenses(owner: UserID, connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM expense WHERE user_id = :owner",
            rusqlite::named_params! {":owner": owner},
            get_count,
        )
        .map_err(|error| error.into())
}

/// Create the expense table in the database.
///
/// The user table must exist first.
///
/// # Errors
/// Returns an error if the table cannot be created or if there is an SQL error.
pub fn create_expense_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS expense (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                title TEXT NOT NULL,
                amount REAL NOT NULL CHECK (amount > 0),
                kind TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                tags TEXT NOT NULL DEFAULT '[]',
                is_recurring INTEGER NOT NULL DEFAULT 0,
                recurring_frequency TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    // Indexes for the list filters and the analytics queries.
    connection.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_expense_user_date ON expense(user_id, date);
         CREATE INDEX IF NOT EXISTS idx_expense_user_kind ON expense(user_id, kind);
         CREATE INDEX IF NOT EXISTS idx_expense_user_category ON expense(user_id, category);",
    )?;

    Ok(())
}

/// Map a database row with the columns in [EXPENSE_COLUMNS] to an Expense.
pub(crate) fn map_expense_row(row: &Row) -> Result<Expense, rusqlite::Error> {
    let raw_tags: String = row.get(8)?;
    let tags = serde_json::from_str(&raw_tags).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(8, Type::Text, Box::new(error))
    })?;
    let raw_frequency: Option<String> = row.get(10)?;
    let recurring_frequency = raw_frequency
        .map(|frequency| frequency.parse::<RecurringFrequency>())
        .transpose()
        .map_err(|error| {
            rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(error))
        })?;

    Ok(Expense {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        amount: row.get(3)?,
        kind: get_parsed(row, 4)?,
        category: get_parsed(row, 5)?,
        description: row.get(6)?,
        date: row.get(7)?,
        tags,
        is_recurring: row.get(9)?,
        recurring_frequency,
        created_at: row.get(11)?,
        updated_at: row.get(12)?,
    })
}

// ============================================================================
// TESTS
// ============================================================================

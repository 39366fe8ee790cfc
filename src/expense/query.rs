//! Turns the list filters in a request into one owner-scoped SQL query.

use std::str::FromStr;

use rusqlite::{Connection, params_from_iter, types::Value};
use serde::Deserialize;
use time::Date;

use crate::{
    Error,
    db::{CONTAINS_CI, get_count},
    expense::{
        Category, Expense, ExpenseKind,
        core::{EXPENSE_COLUMNS, map_expense_row},
    },
    pagination::{Pagination, PaginationConfig},
    user::UserID,
    validation::{ValidationErrors, parse_bounded_integer, parse_iso_date},
};

/// An inclusive range of dates. A missing bound leaves that side open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// The earliest date to include.
    pub start: Option<Date>,
    /// The latest date to include.
    pub end: Option<Date>,
}

/// The optional filters for a list of expenses.
///
/// Filters that are `None` do not constrain the results. The filters that are
/// set must all match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    /// Only include income or only include spending.
    pub kind: Option<ExpenseKind>,
    /// Only include this category.
    pub category: Option<Category>,
    /// Only include expenses dated within this range.
    pub date_range: DateRange,
    /// Only include expenses whose title or description contains this text, ignoring case.
    pub search: Option<String>,
}

/// The field to sort expenses by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    /// When the money was earned or spent.
    Date,
    /// How much money.
    Amount,
    /// The title, in byte order.
    Title,
    /// The category name.
    Category,
    /// Income or expense.
    Kind,
    /// When the expense was recorded.
    CreatedAt,
}

impl SortField {
    fn column(&self) -> &'static str {
        match self {
            SortField::Date => "date",
            SortField::Amount => "amount",
            SortField::Title => "title",
            SortField::Category => "category",
            SortField::Kind => "kind",
            SortField::CreatedAt => "created_at",
        }
    }
}

/// The order to sort expenses in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Sort in order of increasing value.
    Ascending,
    /// Sort in order of decreasing value.
    Descending,
}

impl SortOrder {
    fn keyword(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// How to order a list of expenses.
///
/// Written as `field` for ascending or `-field` for descending order, e.g. `-date`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    /// The field to sort by.
    pub field: SortField,
    /// The direction to sort in.
    pub order: SortOrder,
}

impl Default for Sort {
    fn default() -> Self {
        Self {
            field: SortField::Date,
            order: SortOrder::Descending,
        }
    }
}

impl FromStr for Sort {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (order, name) = match s.strip_prefix('-') {
            Some(name) => (SortOrder::Descending, name),
            None => (SortOrder::Ascending, s),
        };

        let field = match name {
            "date" => SortField::Date,
            "amount" => SortField::Amount,
            "title" => SortField::Title,
            "category" => SortField::Category,
            "type" => SortField::Kind,
            "createdAt" => SortField::CreatedAt,
            _ => return Err("Invalid sort field".to_owned()),
        };

        Ok(Self { field, order })
    }
}

/// A fully validated request for one page of a user's expenses.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseQuery {
    /// The user whose expenses to list. Always the caller.
    pub owner: UserID,
    /// Which expenses to include.
    pub filter: ExpenseFilter,
    /// How to order the expenses.
    pub sort: Sort,
    /// The 1-based page number.
    pub page: u64,
    /// The maximum number of expenses per page.
    pub limit: u64,
}

/// A SQL `WHERE` clause with its positional parameters.
///
/// The clause always starts with the owner condition, so a predicate cannot be
/// built that reaches another user's expenses.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Predicate {
    pub(crate) clause: String,
    pub(crate) values: Vec<Value>,
}

impl Predicate {
    pub(crate) fn new(owner: UserID, filter: &ExpenseFilter) -> Self {
        let mut conditions = vec!["user_id = ?".to_owned()];
        let mut values = vec![Value::Integer(owner.as_i64())];

        if let Some(kind) = filter.kind {
            conditions.push("kind = ?".to_owned());
            values.push(Value::Text(kind.as_str().to_owned()));
        }

        if let Some(category) = filter.category {
            conditions.push("category = ?".to_owned());
            values.push(Value::Text(category.as_str().to_owned()));
        }

        if let Some(start) = filter.date_range.start {
            conditions.push("date >= ?".to_owned());
            values.push(Value::Text(start.to_string()));
        }

        if let Some(end) = filter.date_range.end {
            conditions.push("date <= ?".to_owned());
            values.push(Value::Text(end.to_string()));
        }

        if let Some(search) = &filter.search {
            conditions.push(format!(
                "({CONTAINS_CI}(title, ?) OR {CONTAINS_CI}(description, ?))"
            ));
            values.push(Value::Text(search.clone()));
            values.push(Value::Text(search.clone()));
        }

        Self {
            clause: conditions.join(" AND "),
            values,
        }
    }
}

/// Get one page of the expenses matching `query` and the number of matches across all pages.
///
/// A page past the last one is empty rather than an error.
///
/// # Errors
/// Returns [Error::SqlError] if the SQL query fails or a row cannot be read.
pub fn query_expenses(
    query: &ExpenseQuery,
    connection: &Connection,
) -> Result<(Vec<Expense>, u64), Error> {
    let predicate = Predicate::new(query.owner, &query.filter);

    let total: u64 = connection.query_row(
        &format!("SELECT COUNT(id) FROM expense WHERE {}", predicate.clause),
        params_from_iter(predicate.values.iter()),
        get_count,
    )?;

    let (Some(offset), Ok(limit)) = (
        Pagination::offset(query.page, query.limit),
        i64::try_from(query.limit),
    ) else {
        return Ok((Vec::new(), total));
    };

    // Sort by the requested field, then ID to keep the order stable between pages.
    let order = query.sort.order.keyword();
    let sql = format!(
        "SELECT {EXPENSE_COLUMNS} FROM expense WHERE {} \
         ORDER BY {} {order}, id {order} LIMIT ? OFFSET ?",
        predicate.clause,
        query.sort.field.column(),
    );

    let mut values = predicate.values;
    values.push(Value::Integer(limit));
    values.push(Value::Integer(offset));

    let expenses = connection
        .prepare(&sql)?
        .query_map(params_from_iter(values.iter()), map_expense_row)?
        .map(|expense_result| expense_result.map_err(Error::from))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((expenses, total))
}

/// The raw query string of a list request. Every value is validated before use.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    page: Option<String>,
    limit: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    category: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    search: Option<String>,
    sort: Option<String>,
}

/// Treat a parameter that is empty after trimming as absent.
pub(crate) fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

/// Parse the `startDate` and `endDate` parameters, recording any problems in `errors`.
///
/// A range whose start is after its end is rejected.
pub(crate) fn parse_date_range(
    start_date: Option<&str>,
    end_date: Option<&str>,
    errors: &mut ValidationErrors,
) -> DateRange {
    let start = non_empty(start_date).and_then(|text| {
        let date = parse_iso_date(text);
        if date.is_none() {
            errors.push("startDate", "Invalid start date format");
        }
        date
    });
    let end = non_empty(end_date).and_then(|text| {
        let date = parse_iso_date(text);
        if date.is_none() {
            errors.push("endDate", "Invalid end date format");
        }
        date
    });

    if let (Some(start), Some(end)) = (start, end)
        && start > end
    {
        errors.push("endDate", "End date must be on or after start date");
    }

    DateRange { start, end }
}

/// Validate the query string of a list request and build the query for `owner`.
///
/// # Errors
/// Returns [Error::Validation] listing every invalid parameter.
pub fn parse_list_params(
    params: &ListParams,
    owner: UserID,
    config: &PaginationConfig,
) -> Result<ExpenseQuery, Error> {
    let mut errors = ValidationErrors::new();

    let page = match non_empty(params.page.as_deref()) {
        Some(text) => parse_bounded_integer(text, 1, u64::MAX).unwrap_or_else(|| {
            errors.push("page", "Page must be a positive integer");
            config.default_page
        }),
        None => config.default_page,
    };

    let limit = match non_empty(params.limit.as_deref()) {
        Some(text) => {
            parse_bounded_integer(text, 1, config.max_page_size).unwrap_or_else(|| {
                errors.push(
                    "limit",
                    format!("Limit must be between 1 and {}", config.max_page_size),
                );
                config.default_page_size
            })
        }
        None => config.default_page_size,
    };

    let kind = non_empty(params.kind.as_deref()).and_then(|text| {
        errors.check(
            "type",
            text.parse::<ExpenseKind>()
                .map_err(|_| "Type must be income or expense".to_owned()),
        )
    });

    let category = non_empty(params.category.as_deref()).and_then(|text| {
        errors.check(
            "category",
            text.parse::<Category>()
                .map_err(|_| "Invalid category".to_owned()),
        )
    });

    let date_range = parse_date_range(
        params.start_date.as_deref(),
        params.end_date.as_deref(),
        &mut errors,
    );

    let search = non_empty(params.search.as_deref()).map(str::to_owned);

    let sort = match non_empty(params.sort.as_deref()) {
        Some(text) => errors.check("sort", text.parse::<Sort>()).unwrap_or_default(),
        None => Sort::default(),
    };

    errors.into_result(ExpenseQuery {
        owner,
        filter: ExpenseFilter {
            kind,
            category,
            date_range,
            search,
        },
        sort,
        page,
        limit,
    })
}

#[cfg(test)]
mod query_tests {
    use rusqlite::Connection;
    use time::{Duration, macros::date};

    use crate::{
        db::initialize,
        expense::{
            Category, ExpenseKind, NewExpense, create_expense,
            query::{DateRange, ExpenseFilter, ExpenseQuery, Sort, SortField, SortOrder, query_expenses},
        },
        password::PasswordHash,
        user::{NewUser, UserID, create_user},
    };

    fn get_test_connection() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        conn
    }

    fn must_create_user(email: &str, conn: &Connection) -> UserID {
        create_user(
            NewUser {
                name: "Test".to_owned(),
                email: email.to_owned(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
            },
            conn,
        )
        .unwrap()
        .id
    }

    fn query_for(owner: UserID) -> ExpenseQuery {
        ExpenseQuery {
            owner,
            filter: ExpenseFilter::default(),
            sort: Sort::default(),
            page: 1,
            limit: 10,
        }
    }

    #[test]
    fn pages_through_results() {
        let conn = get_test_connection();
        let owner = must_create_user("a@example.com", &conn);
        let start = date!(2025 - 01 - 01);
        for i in 0..15 {
            create_expense(
                owner,
                NewExpense::build(
                    &format!("expense #{i}"),
                    (i + 1) as f64,
                    ExpenseKind::Expense,
                    Category::Other,
                    start + Duration::days(i),
                ),
                &conn,
            )
            .unwrap();
        }

        let (first_page, total) = query_expenses(&query_for(owner), &conn).unwrap();
        let (second_page, _) = query_expenses(
            &ExpenseQuery {
                page: 2,
                ..query_for(owner)
            },
            &conn,
        )
        .unwrap();
        let (third_page, _) = query_expenses(
            &ExpenseQuery {
                page: 3,
                ..query_for(owner)
            },
            &conn,
        )
        .unwrap();

        assert_eq!(total, 15);
        assert_eq!(first_page.len(), 10);
        assert_eq!(second_page.len(), 5);
        assert!(third_page.is_empty());
        assert_eq!(first_page[0].date, date!(2025 - 01 - 15), "newest first");
        assert_eq!(second_page[4].date, start);
    }

    #[test]
    fn never_returns_other_owners_expenses() {
        let conn = get_test_connection();
        let owner = must_create_user("a@example.com", &conn);
        let other = must_create_user("b@example.com", &conn);
        let today = date!(2025 - 05 - 05);
        create_expense(
            other,
            NewExpense::build("Rent", 900.0, ExpenseKind::Expense, Category::Utilities, today),
            &conn,
        )
        .unwrap();

        let (expenses, total) = query_expenses(&query_for(owner), &conn).unwrap();

        assert!(expenses.is_empty());
        assert_eq!(total, 0);
    }

    #[test]
    fn combines_filters_with_and() {
        let conn = get_test_connection();
        let owner = must_create_user("a@example.com", &conn);
        let want = create_expense(
            owner,
            NewExpense::build("Groceries", 80.0, ExpenseKind::Expense, Category::Food, date!(2025 - 02 - 10)),
            &conn,
        )
        .unwrap();
        for new_expense in [
            NewExpense::build("Pay", 3000.0, ExpenseKind::Income, Category::Food, date!(2025 - 02 - 10)),
            NewExpense::build("Bus", 3.0, ExpenseKind::Expense, Category::Transport, date!(2025 - 02 - 10)),
            NewExpense::build("Groceries", 70.0, ExpenseKind::Expense, Category::Food, date!(2025 - 03 - 10)),
        ] {
            create_expense(owner, new_expense, &conn).unwrap();
        }

        let (got, total) = query_expenses(
            &ExpenseQuery {
                filter: ExpenseFilter {
                    kind: Some(ExpenseKind::Expense),
                    category: Some(Category::Food),
                    date_range: DateRange {
                        start: Some(date!(2025 - 02 - 01)),
                        end: Some(date!(2025 - 02 - 28)),
                    },
                    search: None,
                },
                ..query_for(owner)
            },
            &conn,
        )
        .unwrap();

        assert_eq!(total, 1);
        assert_eq!(got, vec![want]);
    }

    #[test]
    fn date_range_is_inclusive() {
        let conn = get_test_connection();
        let owner = must_create_user("a@example.com", &conn);
        for date in [date!(2025 - 01 - 31), date!(2025 - 02 - 01), date!(2025 - 02 - 28), date!(2025 - 03 - 01)] {
            create_expense(
                owner,
                NewExpense::build("Lunch", 12.0, ExpenseKind::Expense, Category::Food, date),
                &conn,
            )
            .unwrap();
        }

        let (got, _) = query_expenses(
            &ExpenseQuery {
                filter: ExpenseFilter {
                    date_range: DateRange {
                        start: Some(date!(2025 - 02 - 01)),
                        end: Some(date!(2025 - 02 - 28)),
                    },
                    ..Default::default()
                },
                ..query_for(owner)
            },
            &conn,
        )
        .unwrap();

        let dates: Vec<_> = got.iter().map(|expense| expense.date).collect();
        assert_eq!(dates, vec![date!(2025 - 02 - 28), date!(2025 - 02 - 01)]);
    }

    #[test]
    fn search_matches_title_or_description_ignoring_case() {
        let conn = get_test_connection();
        let owner = must_create_user("a@example.com", &conn);
        let date = date!(2025 - 04 - 01);
        let by_title = create_expense(
            owner,
            NewExpense::build("COFFEE beans", 20.0, ExpenseKind::Expense, Category::Food, date),
            &conn,
        )
        .unwrap();
        let by_description = create_expense(
            owner,
            NewExpense {
                description: "Iced coffee with Sam".to_owned(),
                ..NewExpense::build("Cafe", 6.0, ExpenseKind::Expense, Category::Food, date)
            },
            &conn,
        )
        .unwrap();
        create_expense(
            owner,
            NewExpense::build("Tea", 4.0, ExpenseKind::Expense, Category::Food, date),
            &conn,
        )
        .unwrap();

        let (got, total) = query_expenses(
            &ExpenseQuery {
                filter: ExpenseFilter {
                    search: Some("Coffee".to_owned()),
                    ..Default::default()
                },
                sort: Sort {
                    field: SortField::Amount,
                    order: SortOrder::Ascending,
                },
                ..query_for(owner)
            },
            &conn,
        )
        .unwrap();

        assert_eq!(total, 2);
        assert_eq!(got, vec![by_description, by_title]);
    }

    #[test]
    fn search_treats_wildcards_literally() {
        let conn = get_test_connection();
        let owner = must_create_user("a@example.com", &conn);
        create_expense(
            owner,
            NewExpense::build("Books", 30.0, ExpenseKind::Expense, Category::Education, date!(2025 - 04 - 01)),
            &conn,
        )
        .unwrap();

        let (got, _) = query_expenses(
            &ExpenseQuery {
                filter: ExpenseFilter {
                    search: Some("%".to_owned()),
                    ..Default::default()
                },
                ..query_for(owner)
            },
            &conn,
        )
        .unwrap();

        assert!(got.is_empty());
    }

    #[test]
    fn equal_sort_keys_are_ordered_by_id() {
        let conn = get_test_connection();
        let owner = must_create_user("a@example.com", &conn);
        let date = date!(2025 - 04 - 01);
        let mut ids = Vec::new();
        for _ in 0..3 {
            let expense = create_expense(
                owner,
                NewExpense::build("Same", 1.0, ExpenseKind::Expense, Category::Other, date),
                &conn,
            )
            .unwrap();
            ids.push(expense.id);
        }

        let (got, _) = query_expenses(&query_for(owner), &conn).unwrap();

        let got_ids: Vec<_> = got.iter().map(|expense| expense.id).collect();
        ids.reverse();
        assert_eq!(got_ids, ids);
    }
}

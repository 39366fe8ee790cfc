//! Validation of the JSON bodies used to create and update expenses.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use time::Date;

use crate::{
    Error,
    database_id::ExpenseId,
    expense::{Category, ExpenseKind, ExpensePatch, NewExpense, RecurringFrequency},
    validation::{ValidationErrors, character_count, parse_iso_date},
};

/// The smallest amount an expense can have.
pub const MIN_AMOUNT: f64 = 0.01;

const TITLE_LENGTH: std::ops::RangeInclusive<usize> = 2..=100;
const MAX_DESCRIPTION_LENGTH: usize = 500;
const MAX_TAG_LENGTH: usize = 20;

/// The body of a create or update request, before validation.
///
/// Any owner field sent by the client is ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseForm {
    title: Option<String>,
    /// A number, or a string holding a number.
    amount: Option<Value>,
    #[serde(rename = "type", alias = "kind")]
    kind: Option<String>,
    category: Option<String>,
    description: Option<String>,
    #[serde(alias = "occurredOn")]
    date: Option<String>,
    tags: Option<Vec<String>>,
    is_recurring: Option<bool>,
    /// `None` when absent, `Some(None)` when explicitly null.
    #[serde(default, deserialize_with = "deserialize_present")]
    recurring_frequency: Option<Option<String>>,
}

fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn validate_title(raw_title: &str) -> Result<String, String> {
    let title = raw_title.trim();

    if title.is_empty() {
        return Err("Title is required".to_owned());
    }

    if !TITLE_LENGTH.contains(&character_count(title)) {
        return Err("Title must be 2-100 characters".to_owned());
    }

    Ok(title.to_owned())
}

fn validate_amount(raw_amount: &Value) -> Result<f64, String> {
    let amount = match raw_amount {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    };

    amount
        .filter(|amount| amount.is_finite() && *amount >= MIN_AMOUNT)
        .ok_or_else(|| "Amount must be greater than 0".to_owned())
}

fn validate_kind(raw_kind: &str) -> Result<ExpenseKind, String> {
    raw_kind
        .trim()
        .parse()
        .map_err(|_| "Type must be income or expense".to_owned())
}

fn validate_category(raw_category: &str) -> Result<Category, String> {
    raw_category
        .trim()
        .parse()
        .map_err(|_| "Invalid category".to_owned())
}

fn validate_description(raw_description: &str) -> Result<String, String> {
    let description = raw_description.trim();

    if character_count(description) > MAX_DESCRIPTION_LENGTH {
        return Err(format!(
            "Description cannot exceed {MAX_DESCRIPTION_LENGTH} characters"
        ));
    }

    Ok(description.to_owned())
}

fn validate_date(raw_date: &str) -> Result<Date, String> {
    parse_iso_date(raw_date).ok_or_else(|| "Invalid date format".to_owned())
}

fn validate_tags(raw_tags: Vec<String>) -> Result<Vec<String>, String> {
    let tags: Vec<String> = raw_tags
        .into_iter()
        .map(|tag| tag.trim().to_owned())
        .collect();

    if tags
        .iter()
        .any(|tag| character_count(tag) > MAX_TAG_LENGTH)
    {
        return Err(format!("Tags cannot exceed {MAX_TAG_LENGTH} characters"));
    }

    Ok(tags)
}

fn validate_frequency(raw_frequency: Option<String>) -> Result<Option<RecurringFrequency>, String> {
    raw_frequency
        .map(|frequency| frequency.trim().parse::<RecurringFrequency>())
        .transpose()
        .map_err(|_| "Invalid recurring frequency".to_owned())
}

/// Validate a create request, collecting every problem.
///
/// `today` is used when no date is given.
///
/// # Errors
/// Returns [Error::Validation] listing every invalid or missing field.
pub fn validate_new_expense(form: ExpenseForm, today: Date) -> Result<NewExpense, Error> {
    let mut errors = ValidationErrors::new();

    let title = match form.title {
        Some(title) => errors.check("title", validate_title(&title)),
        None => {
            errors.push("title", "Title is required");
            None
        }
    };
    let amount = match form.amount {
        Some(Value::Null) | None => {
            errors.push("amount", "Amount is required");
            None
        }
        Some(amount) => errors.check("amount", validate_amount(&amount)),
    };
    let kind = match form.kind.as_deref().map(str::trim) {
        Some("") | None => {
            errors.push("type", "Type is required");
            None
        }
        Some(kind) => errors.check("type", validate_kind(kind)),
    };
    let category = match form.category.as_deref().map(str::trim) {
        Some("") | None => {
            errors.push("category", "Category is required");
            None
        }
        Some(category) => errors.check("category", validate_category(category)),
    };
    let description = match form.description {
        Some(description) => errors.check("description", validate_description(&description)),
        None => Some(String::new()),
    };
    let date = match form.date {
        Some(date) => errors.check("date", validate_date(&date)),
        None => Some(today),
    };
    let tags = match form.tags {
        Some(tags) => errors.check("tags", validate_tags(tags)),
        None => Some(Vec::new()),
    };
    let recurring_frequency = errors.check(
        "recurringFrequency",
        validate_frequency(form.recurring_frequency.flatten()),
    );

    match (
        title,
        amount,
        kind,
        category,
        description,
        date,
        tags,
        recurring_frequency,
    ) {
        (
            Some(title),
            Some(amount),
            Some(kind),
            Some(category),
            Some(description),
            Some(date),
            Some(tags),
            Some(recurring_frequency),
        ) if errors.is_empty() => Ok(NewExpense {
            title,
            amount,
            kind,
            category,
            description,
            date,
            tags,
            is_recurring: form.is_recurring.unwrap_or(false),
            recurring_frequency,
        }),
        _ => Err(Error::Validation(errors)),
    }
}

/// Validate an update request, collecting every problem.
///
/// Only the fields present in the request are validated and set in the patch.
///
/// # Errors
/// Returns [Error::Validation] listing every invalid field.
pub fn validate_expense_patch(form: ExpenseForm) -> Result<ExpensePatch, Error> {
    let mut errors = ValidationErrors::new();

    let patch = ExpensePatch {
        title: form
            .title
            .and_then(|title| errors.check("title", validate_title(&title))),
        amount: form
            .amount
            .filter(|amount| !amount.is_null())
            .and_then(|amount| errors.check("amount", validate_amount(&amount))),
        kind: form
            .kind
            .and_then(|kind| errors.check("type", validate_kind(&kind))),
        category: form
            .category
            .and_then(|category| errors.check("category", validate_category(&category))),
        description: form.description.and_then(|description| {
            errors.check("description", validate_description(&description))
        }),
        date: form
            .date
            .and_then(|date| errors.check("date", validate_date(&date))),
        tags: form
            .tags
            .and_then(|tags| errors.check("tags", validate_tags(tags))),
        is_recurring: form.is_recurring,
        recurring_frequency: form.recurring_frequency.and_then(|frequency| {
            errors.check("recurringFrequency", validate_frequency(frequency))
        }),
    };

    errors.into_result(patch)
}

/// Parse an expense ID taken from a URL path.
///
/// # Errors
/// Returns [Error::Validation] on field `id` if `raw_id` is not an integer.
pub fn parse_expense_id(raw_id: &str) -> Result<ExpenseId, Error> {
    raw_id.trim().parse::<ExpenseId>().map_err(|_| {
        let mut errors = ValidationErrors::new();
        errors.push("id", "Invalid expense ID");
        Error::Validation(errors)
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use time::macros::date;

    use crate::{
        Error,
        expense::{
            Category, ExpenseKind, ExpensePatch, RecurringFrequency,
            form::{ExpenseForm, parse_expense_id, validate_expense_patch, validate_new_expense},
        },
    };

    fn form(value: serde_json::Value) -> ExpenseForm {
        serde_json::from_value(value).unwrap()
    }

    fn error_fields(error: Error) -> Vec<(String, String)> {
        match error {
            Error::Validation(errors) => errors
                .errors()
                .iter()
                .map(|error| (error.field.clone(), error.message.clone()))
                .collect(),
            other => panic!("expected validation errors, got {other:?}"),
        }
    }

    #[test]
    fn create_fills_defaults() {
        let today = date!(2025 - 08 - 20);

        let new_expense = validate_new_expense(
            form(json!({"title": " Coffee ", "amount": 4.5, "type": "expense", "category": "food"})),
            today,
        )
        .unwrap();

        assert_eq!(new_expense.title, "Coffee");
        assert_eq!(new_expense.amount, 4.5);
        assert_eq!(new_expense.kind, ExpenseKind::Expense);
        assert_eq!(new_expense.category, Category::Food);
        assert_eq!(new_expense.description, "");
        assert_eq!(new_expense.date, today);
        assert!(new_expense.tags.is_empty());
        assert!(!new_expense.is_recurring);
        assert_eq!(new_expense.recurring_frequency, None);
    }

    #[test]
    fn create_accepts_aliases_and_numeric_strings() {
        let new_expense = validate_new_expense(
            form(json!({
                "title": "Salary",
                "amount": "2500.00",
                "kind": "income",
                "category": "salary",
                "occurredOn": "2025-08-01",
                "tags": [" work "],
                "isRecurring": true,
                "recurringFrequency": "monthly"
            })),
            date!(2025 - 08 - 20),
        )
        .unwrap();

        assert_eq!(new_expense.amount, 2500.0);
        assert_eq!(new_expense.kind, ExpenseKind::Income);
        assert_eq!(new_expense.date, date!(2025 - 08 - 01));
        assert_eq!(new_expense.tags, vec!["work".to_owned()]);
        assert_eq!(
            new_expense.recurring_frequency,
            Some(RecurringFrequency::Monthly)
        );
    }

    #[test]
    fn create_reports_every_missing_field() {
        let error = validate_new_expense(form(json!({})), date!(2025 - 08 - 20)).unwrap_err();

        assert_eq!(
            error_fields(error),
            vec![
                ("title".to_owned(), "Title is required".to_owned()),
                ("amount".to_owned(), "Amount is required".to_owned()),
                ("type".to_owned(), "Type is required".to_owned()),
                ("category".to_owned(), "Category is required".to_owned()),
            ]
        );
    }

    #[test]
    fn create_reports_every_invalid_field() {
        let error = validate_new_expense(
            form(json!({
                "title": "A",
                "amount": 0.001,
                "type": "gift",
                "category": "pets",
                "description": "x".repeat(501),
                "date": "31/12/2025",
                "tags": ["this tag is far too long to keep"],
                "recurringFrequency": "hourly"
            })),
            date!(2025 - 08 - 20),
        )
        .unwrap_err();

        assert_eq!(
            error_fields(error),
            vec![
                ("title".to_owned(), "Title must be 2-100 characters".to_owned()),
                ("amount".to_owned(), "Amount must be greater than 0".to_owned()),
                ("type".to_owned(), "Type must be income or expense".to_owned()),
                ("category".to_owned(), "Invalid category".to_owned()),
                (
                    "description".to_owned(),
                    "Description cannot exceed 500 characters".to_owned()
                ),
                ("date".to_owned(), "Invalid date format".to_owned()),
                ("tags".to_owned(), "Tags cannot exceed 20 characters".to_owned()),
                (
                    "recurringFrequency".to_owned(),
                    "Invalid recurring frequency".to_owned()
                ),
            ]
        );
    }

    #[test]
    fn create_accepts_smallest_amount() {
        let new_expense = validate_new_expense(
            form(json!({"title": "Gum", "amount": 0.01, "type": "expense", "category": "food"})),
            date!(2025 - 08 - 20),
        )
        .unwrap();

        assert_eq!(new_expense.amount, 0.01);
    }

    #[test]
    fn create_counts_title_characters_not_bytes() {
        let title = "é".repeat(100);

        let result = validate_new_expense(
            form(json!({"title": title, "amount": 1, "type": "expense", "category": "other"})),
            date!(2025 - 08 - 20),
        );

        assert!(result.is_ok(), "got {result:?}");
    }

    #[test]
    fn salary_as_expense_is_allowed() {
        let result = validate_new_expense(
            form(json!({"title": "Odd", "amount": 1, "type": "expense", "category": "salary"})),
            date!(2025 - 08 - 20),
        );

        assert!(result.is_ok());
    }

    #[test]
    fn update_only_sets_present_fields() {
        let patch = validate_expense_patch(form(json!({"amount": 12, "tags": []}))).unwrap();

        assert_eq!(
            patch,
            ExpensePatch {
                amount: Some(12.0),
                tags: Some(Vec::new()),
                ..Default::default()
            }
        );
    }

    #[test]
    fn update_distinguishes_null_frequency_from_absent() {
        let cleared =
            validate_expense_patch(form(json!({"recurringFrequency": null}))).unwrap();
        let untouched = validate_expense_patch(form(json!({}))).unwrap();

        assert_eq!(cleared.recurring_frequency, Some(None));
        assert_eq!(untouched.recurring_frequency, None);
    }

    #[test]
    fn update_validates_present_fields() {
        let error =
            validate_expense_patch(form(json!({"title": "x", "category": "pets"}))).unwrap_err();

        assert_eq!(
            error_fields(error),
            vec![
                ("title".to_owned(), "Title must be 2-100 characters".to_owned()),
                ("category".to_owned(), "Invalid category".to_owned()),
            ]
        );
    }

    #[test]
    fn expense_id_must_be_an_integer() {
        assert_eq!(parse_expense_id("42"), Ok(42));

        let error = parse_expense_id("64b7f0c2e1").unwrap_err();
        assert_eq!(
            error_fields(error),
            vec![("id".to_owned(), "Invalid expense ID".to_owned())]
        );
    }
}

//! Code for creating the user table and reading and writing users.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash, db::get_parsed, validation::UnknownVariant};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for UserID {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0))
    }
}

impl FromSql for UserID {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(UserID)
    }
}

/// The currency the user wants amounts displayed in.
///
/// Amounts are stored without a currency, this is purely a display preference.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    /// Indian rupee.
    #[default]
    Inr,
    /// United States dollar.
    Usd,
    /// Euro.
    Eur,
    /// Pound sterling.
    Gbp,
}

impl Currency {
    /// The currency code, e.g. "USD".
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Inr => "INR",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }
}

impl FromStr for Currency {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "INR" => Ok(Currency::Inr),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            other => Err(UnknownVariant::new("currency", other)),
        }
    }
}

/// The colour scheme the user prefers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Dark text on a light background.
    #[default]
    Light,
    /// Light text on a dark background.
    Dark,
}

impl Theme {
    /// The theme name, e.g. "dark".
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl FromStr for Theme {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            other => Err(UnknownVariant::new("theme", other)),
        }
    }
}

/// A registered user of the application.
///
/// The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user goes by.
    pub name: String,
    /// The user's email address, stored in lowercase.
    pub email: String,
    /// The user's password hash.
    #[serde(skip)]
    pub password_hash: PasswordHash,
    /// The currency to display amounts in.
    pub currency: Currency,
    /// The preferred colour scheme.
    pub theme: Theme,
    /// When the user registered.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// The data needed to register a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The name the user goes by.
    pub name: String,
    /// The user's email address. It is converted to lowercase before saving.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

/// A partial update to a user's profile. `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    /// The new display name.
    pub name: Option<String>,
    /// The new display currency.
    pub currency: Option<Currency>,
    /// The new colour scheme.
    pub theme: Option<Theme>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                currency TEXT NOT NULL DEFAULT 'INR',
                theme TEXT NOT NULL DEFAULT 'light',
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

const USER_COLUMNS: &str = "id, name, email, password, currency, theme, created_at";

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        currency: get_parsed(row, 4)?,
        theme: get_parsed(row, 5)?,
        created_at: row.get(6)?,
    })
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if the email is already registered,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO user (name, email, password, currency, theme, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             RETURNING {USER_COLUMNS}"
        ))?
        .query_row(
            (
                new_user.name,
                new_user.email.to_lowercase(),
                new_user.password_hash.as_ref(),
                Currency::default().as_str(),
                Theme::default().as_str(),
                OffsetDateTime::now_utc(),
            ),
            map_user_row,
        )
        .map_err(Error::from)
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user ([Error::NotFound]).
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM user WHERE id = :id"))?
        .query_row(&[(":id", &user_id)], map_user_row)
        .map_err(Error::from)
}

/// Get the user registered with `email`, ignoring case.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has registered with `email`.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM user WHERE email = :email"
        ))?
        .query_row(&[(":email", &email.to_lowercase())], map_user_row)
        .map_err(Error::from)
}

/// Apply `update` to the user's profile and return the updated user.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not belong to a registered user.
pub fn update_profile(
    user_id: UserID,
    update: ProfileUpdate,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "UPDATE user SET
                name = COALESCE(?1, name),
                currency = COALESCE(?2, currency),
                theme = COALESCE(?3, theme)
             WHERE id = ?4
             RETURNING {USER_COLUMNS}"
        ))?
        .query_row(
            (
                update.name,
                update.currency.map(|currency| currency.as_str()),
                update.theme.map(|theme| theme.as_str()),
                user_id,
            ),
            map_user_row,
        )
        .map_err(Error::from)
}

/// Replace the user's password hash.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not belong to a registered user.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

/// Delete the user and, through the foreign key cascade, all of their expenses.
///
/// # Errors
///
/// Returns [Error::NotFound] if `user_id` does not belong to a registered user.
pub fn delete_user(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM user WHERE id = ?1", (user_id,))?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
#[cfg(test)]
pub fn count_users(connection: &Connection) -> Result<u64, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], crate::db::get_count)
        .map_err(|error| error.into())
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error, PasswordHash,
        db::initialize,
        user::{
            Currency, NewUser, ProfileUpdate, Theme, UserID, count_users, create_user,
            delete_user, get_user_by_email, get_user_by_id, update_password, update_profile,
        },
    };

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        initialize(&conn).expect("Could not initialize database");

        conn
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Avery".to_owned(),
            email: email.to_owned(),
            password_hash: PasswordHash::new_unchecked("hunter2"),
        }
    }

    #[test]
    fn insert_user_succeeds() {
        let db_connection = get_db_connection();

        let inserted_user = create_user(new_user("Avery@Example.com"), &db_connection).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.email, "avery@example.com");
        assert_eq!(inserted_user.currency, Currency::Inr);
        assert_eq!(inserted_user.theme, Theme::Light);
    }

    #[test]
    fn insert_user_fails_on_duplicate_email() {
        let db_connection = get_db_connection();
        create_user(new_user("avery@example.com"), &db_connection).unwrap();

        let duplicate = create_user(new_user("AVERY@example.com"), &db_connection);

        assert_eq!(duplicate, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_by_email_ignores_case() {
        let db_connection = get_db_connection();
        let want = create_user(new_user("avery@example.com"), &db_connection).unwrap();

        let got = get_user_by_email("Avery@Example.COM", &db_connection).unwrap();

        assert_eq!(want, got);
    }

    #[test]
    fn get_user_fails_with_unknown_id() {
        let db_connection = get_db_connection();

        assert_eq!(
            get_user_by_id(UserID::new(42), &db_connection),
            Err(Error::NotFound)
        );
    }

    #[test]
    fn update_profile_only_changes_given_fields() {
        let db_connection = get_db_connection();
        let user = create_user(new_user("avery@example.com"), &db_connection).unwrap();

        let updated = update_profile(
            user.id,
            ProfileUpdate {
                theme: Some(Theme::Dark),
                ..Default::default()
            },
            &db_connection,
        )
        .unwrap();

        assert_eq!(updated.theme, Theme::Dark);
        assert_eq!(updated.name, user.name);
        assert_eq!(updated.currency, user.currency);
    }

    #[test]
    fn update_password_replaces_hash() {
        let db_connection = get_db_connection();
        let user = create_user(new_user("avery@example.com"), &db_connection).unwrap();
        let new_hash = PasswordHash::new_unchecked("correct horse battery staple");

        update_password(user.id, &new_hash, &db_connection).unwrap();

        let got = get_user_by_id(user.id, &db_connection).unwrap();
        assert_eq!(got.password_hash, new_hash);
    }

    #[test]
    fn delete_user_removes_user() {
        let db_connection = get_db_connection();
        let user = create_user(new_user("avery@example.com"), &db_connection).unwrap();

        delete_user(user.id, &db_connection).unwrap();

        assert_eq!(count_users(&db_connection), Ok(0));
        assert_eq!(delete_user(user.id, &db_connection), Err(Error::NotFound));
    }
}

//! Database setup shared by the server and the command line utilities.

use std::{
    str::FromStr,
    sync::{Mutex, MutexGuard},
};

use rusqlite::{Connection, Row, functions::FunctionFlags, types::Type};

use crate::{Error, expense::create_expense_table, user::create_user_table};

/// The name of the SQL function used for case-insensitive substring search.
///
/// `contains_ci(haystack, needle)` is true when `needle` occurs anywhere in
/// `haystack`, ignoring case for all of Unicode rather than only ASCII as
/// SQLite's `LIKE` does.
pub const CONTAINS_CI: &str = "contains_ci";

/// Prepare a connection for use by the application.
///
/// Enables foreign keys, registers the custom SQL functions and creates the
/// tables if they do not exist yet. This must be called on every new
/// connection since pragmas and functions are per-connection.
///
/// # Errors
/// Returns an error if a table cannot be created or a function cannot be registered.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    register_functions(connection)?;

    create_user_table(connection)?;
    create_expense_table(connection)?;

    Ok(())
}

fn register_functions(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.create_scalar_function(
        CONTAINS_CI,
        2,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |context| {
            let haystack = context.get::<String>(0)?;
            let needle = context.get::<String>(1)?;

            Ok(haystack.to_lowercase().contains(&needle.to_lowercase()))
        },
    )
}

/// Acquire the shared database connection.
///
/// # Errors
/// Returns [Error::DatabaseLockError] if the lock was poisoned by a panicking thread.
pub fn lock_connection(connection: &Mutex<Connection>) -> Result<MutexGuard<'_, Connection>, Error> {
    connection.lock().map_err(|error| {
        tracing::error!("Could not acquire the database lock: {error}");
        Error::DatabaseLockError
    })
}

/// Read a text column and parse it with [FromStr].
///
/// Used for enums that are stored by name.
pub fn get_parsed<T>(row: &Row, index: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let text: String = row.get(index)?;

    text.parse()
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error)))
}

/// Read the result of a `COUNT(...)` query from the first column of `row`.
pub fn get_count(row: &Row) -> Result<u64, rusqlite::Error> {
    let count: i64 = row.get(0)?;

    u64::try_from(count)
        .map_err(|error| rusqlite::Error::FromSqlConversionFailure(0, Type::Integer, Box::new(error)))
}

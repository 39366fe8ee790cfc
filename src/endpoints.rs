//! The API endpoints URIs.
//!
//! For endpoints that take a parameter, e.g., '/api/expenses/{expense_id}', use [format_endpoint].

/// The unauthenticated health check.
pub const HEALTH: &str = "/health";

/// The route for registering a new user.
pub const REGISTER: &str = "/api/auth/register";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/auth/login";
/// The route for getting the logged in user.
pub const ME: &str = "/api/auth/me";

/// The route to list, create and bulk delete expenses.
pub const EXPENSES: &str = "/api/expenses";
/// The route to access a single expense.
pub const EXPENSE: &str = "/api/expenses/{expense_id}";
/// The route for the income and spending summary.
pub const EXPENSE_SUMMARY: &str = "/api/expenses/summary";
/// The route for the monthly income and spending trends.
pub const EXPENSE_TRENDS: &str = "/api/expenses/trends";
/// The route for the latest expenses.
pub const EXPENSE_RECENT: &str = "/api/expenses/recent";

/// The route to view and update the user's profile.
pub const PROFILE: &str = "/api/users/profile";
/// The route to change the user's password.
pub const CHANGE_PASSWORD: &str = "/api/users/change-password";
/// The route to delete the user's account.
pub const ACCOUNT: &str = "/api/users/account";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/users/{user_id}', '{user_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let Some(param_start) = endpoint_path.find('{') else {
        return endpoint_path.to_owned();
    };

    let param_end = endpoint_path[param_start..]
        .find('}')
        .map_or(endpoint_path.len(), |offset| param_start + offset + 1);

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}

//! Endpoints for viewing and changing the signed-in user's profile.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State, rejection::JsonRejection},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    db::lock_connection,
    envelope::Envelope,
    expense::count_expenses,
    password::{PASSWORD_MIN_LENGTH, PasswordHash, ValidatedPassword},
    user::{
        Currency, ProfileUpdate, Theme, User, UserID, delete_user, get_user_by_id,
        update_password, update_profile,
    },
    validation::{ValidationErrors, character_count},
};

/// The state needed by the profile endpoints.
#[derive(Debug, Clone)]
pub struct UserState {
    /// The database connection for managing users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The bcrypt cost used when hashing a new password.
    pub password_cost: u32,
}

impl FromRef<AppState> for UserState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            password_cost: state.password_cost,
        }
    }
}

/// The body of a profile update. Absent fields are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ProfileForm {
    name: Option<String>,
    currency: Option<String>,
    theme: Option<String>,
}

/// The body of a password change.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    #[serde(default)]
    current_password: String,
    #[serde(default)]
    new_password: String,
}

/// The body of an account deletion.
#[derive(Debug, Default, Deserialize)]
pub struct DeleteAccountForm {
    #[serde(default)]
    password: String,
}

/// Validate a display name, returning the trimmed name.
pub(crate) fn validate_name(raw_name: &str) -> Result<String, String> {
    let name = raw_name.trim();

    if !(2..=50).contains(&character_count(name)) {
        return Err("Name must be 2-50 characters".to_owned());
    }

    Ok(name.to_owned())
}

fn validate_new_password(raw_password: &str) -> Result<ValidatedPassword, String> {
    if raw_password.is_empty() {
        return Err("New password is required".to_owned());
    }

    if raw_password.chars().count() < PASSWORD_MIN_LENGTH {
        return Err(format!(
            "New password must be at least {PASSWORD_MIN_LENGTH} characters"
        ));
    }

    ValidatedPassword::new(raw_password)
}

fn check_password(user: &User, raw_password: &str) -> Result<(), Error> {
    match user.password_hash.verify(raw_password) {
        Ok(true) => Ok(()),
        Ok(false) => Err(Error::IncorrectPassword),
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}

/// A route handler that responds with the signed-in user's profile.
pub async fn get_profile_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Envelope<User>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let user = get_user_by_id(user_id, &connection)?;

    Ok(Envelope::data(user))
}

/// A route handler for changing the user's name, currency or theme.
pub async fn update_profile_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
    form: Result<Json<ProfileForm>, JsonRejection>,
) -> Result<Envelope<User>, Error> {
    let Json(form) = form?;
    let mut errors = ValidationErrors::new();

    let update = ProfileUpdate {
        name: form
            .name
            .and_then(|name| errors.check("name", validate_name(&name))),
        currency: form.currency.and_then(|currency| {
            errors.check(
                "currency",
                currency
                    .parse::<Currency>()
                    .map_err(|_| "Invalid currency".to_owned()),
            )
        }),
        theme: form.theme.and_then(|theme| {
            errors.check(
                "theme",
                theme
                    .parse::<Theme>()
                    .map_err(|_| "Theme must be light or dark".to_owned()),
            )
        }),
    };
    let update = errors.into_result(update)?;

    let connection = lock_connection(&state.db_connection)?;
    let user = update_profile(user_id, update, &connection)?;

    Ok(Envelope::data(user).with_message("Profile updated successfully"))
}

/// A route handler for changing the user's password.
///
/// The current password must be given to confirm the change.
pub async fn change_password_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
    form: Result<Json<ChangePasswordForm>, JsonRejection>,
) -> Result<Envelope<()>, Error> {
    let Json(form) = form?;
    let mut errors = ValidationErrors::new();

    if form.current_password.is_empty() {
        errors.push("currentPassword", "Current password is required");
    }
    let new_password = errors.check("newPassword", validate_new_password(&form.new_password));
    let (Some(new_password), true) = (new_password, errors.is_empty()) else {
        return Err(Error::Validation(errors));
    };

    let user = {
        let connection = lock_connection(&state.db_connection)?;
        get_user_by_id(user_id, &connection)?
    };
    check_password(&user, &form.current_password)?;

    // Hash without holding the database lock.
    let password_hash = PasswordHash::new(new_password, state.password_cost)?;

    let connection = lock_connection(&state.db_connection)?;
    update_password(user_id, &password_hash, &connection)?;
    tracing::info!("User {user_id} changed their password");

    Ok(Envelope::message("Password changed successfully"))
}

/// A route handler that deletes the user's account and all of their expenses.
pub async fn delete_account_endpoint(
    State(state): State<UserState>,
    Extension(user_id): Extension<UserID>,
    form: Result<Json<DeleteAccountForm>, JsonRejection>,
) -> Result<Envelope<()>, Error> {
    let Json(form) = form?;

    if form.password.is_empty() {
        let mut errors = ValidationErrors::new();
        errors.push("password", "Password is required");
        return Err(Error::Validation(errors));
    }

    let connection = lock_connection(&state.db_connection)?;
    let user = get_user_by_id(user_id, &connection)?;
    check_password(&user, &form.password)?;
    let expense_count = count_expenses(user_id, &connection)?;
    delete_user(user_id, &connection)?;
    tracing::info!("Deleted user {user_id} and their {expense_count} expenses");

    Ok(Envelope::message("Account deleted successfully"))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        expense::count_expenses,
        test_utils::{
            must_create_test_expense, must_create_test_server, must_create_test_state,
            must_create_test_user,
        },
        user::{Currency, Theme, get_user_by_id},
    };

    #[tokio::test]
    async fn get_profile_hides_password_hash() {
        let state = must_create_test_state();
        let (user, token) = must_create_test_user(&state);
        let server = must_create_test_server(state);

        let response = server
            .get(endpoints::PROFILE)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["data"]["email"], json!(user.email));
        assert_eq!(body["data"]["currency"], json!("INR"));
        assert!(body["data"].get("passwordHash").is_none());
        assert!(body["data"].get("password").is_none());
    }

    #[tokio::test]
    async fn update_profile_changes_given_fields() {
        let state = must_create_test_state();
        let (user, token) = must_create_test_user(&state);
        let server = must_create_test_server(state.clone());

        let response = server
            .put(endpoints::PROFILE)
            .authorization_bearer(&token)
            .json(&json!({"currency": "USD", "theme": "dark"}))
            .await;

        response.assert_status_ok();
        let connection = state.db_connection.lock().unwrap();
        let got = get_user_by_id(user.id, &connection).unwrap();
        assert_eq!(got.currency, Currency::Usd);
        assert_eq!(got.theme, Theme::Dark);
        assert_eq!(got.name, user.name);
    }

    #[tokio::test]
    async fn update_profile_reports_every_invalid_field() {
        let state = must_create_test_state();
        let (_, token) = must_create_test_user(&state);
        let server = must_create_test_server(state);

        let response = server
            .put(endpoints::PROFILE)
            .authorization_bearer(&token)
            .json(&json!({"name": "A", "currency": "JPY", "theme": "blue"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        let body = response.json::<Value>();
        assert_eq!(body["message"], json!("Validation failed"));
        assert_eq!(
            body["errors"],
            json!([
                {"field": "name", "message": "Name must be 2-50 characters"},
                {"field": "currency", "message": "Invalid currency"},
                {"field": "theme", "message": "Theme must be light or dark"},
            ])
        );
    }

    #[tokio::test]
    async fn change_password_requires_current_password() {
        let state = must_create_test_state();
        let (_, token) = must_create_test_user(&state);
        let server = must_create_test_server(state);

        let response = server
            .put(endpoints::CHANGE_PASSWORD)
            .authorization_bearer(&token)
            .json(&json!({"currentPassword": "NotMyPassw0rd", "newPassword": "Brand3NewOne"}))
            .await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.json::<Value>()["message"],
            json!("Current password is incorrect")
        );
    }

    #[tokio::test]
    async fn change_password_then_log_in_with_new_password() {
        let state = must_create_test_state();
        let (user, token) = must_create_test_user(&state);
        let server = must_create_test_server(state);

        server
            .put(endpoints::CHANGE_PASSWORD)
            .authorization_bearer(&token)
            .json(&json!({"currentPassword": "Test1234", "newPassword": "Brand3NewOne"}))
            .await
            .assert_status_ok();

        server
            .post(endpoints::LOG_IN)
            .json(&json!({"email": user.email, "password": "Brand3NewOne"}))
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn change_password_rejects_weak_password() {
        let state = must_create_test_state();
        let (_, token) = must_create_test_user(&state);
        let server = must_create_test_server(state);

        let response = server
            .put(endpoints::CHANGE_PASSWORD)
            .authorization_bearer(&token)
            .json(&json!({"currentPassword": "Test1234", "newPassword": "short"}))
            .await;

        response.assert_status(StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json::<Value>()["errors"],
            json!([{"field": "newPassword", "message": "New password must be at least 8 characters"}])
        );
    }

    #[tokio::test]
    async fn delete_account_removes_user_and_expenses() {
        let state = must_create_test_state();
        let (user, token) = must_create_test_user(&state);
        must_create_test_expense(&state, user.id);
        let server = must_create_test_server(state.clone());

        server
            .delete(endpoints::ACCOUNT)
            .authorization_bearer(&token)
            .json(&json!({"password": "Test1234"}))
            .await
            .assert_status_ok();

        let connection = state.db_connection.lock().unwrap();
        assert!(get_user_by_id(user.id, &connection).is_err());
        assert_eq!(count_expenses(user.id, &connection), Ok(0));
    }

    #[tokio::test]
    async fn delete_account_with_wrong_password_keeps_account() {
        let state = must_create_test_state();
        let (user, token) = must_create_test_user(&state);
        let server = must_create_test_server(state.clone());

        server
            .delete(endpoints::ACCOUNT)
            .authorization_bearer(&token)
            .json(&json!({"password": "Wrong1234"}))
            .await
            .assert_status(StatusCode::UNAUTHORIZED);

        let connection = state.db_connection.lock().unwrap();
        assert!(get_user_by_id(user.id, &connection).is_ok());
    }
}

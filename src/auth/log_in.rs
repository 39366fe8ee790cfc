//! Endpoints for signing in and for identifying the signed-in user.

use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use email_address::EmailAddress;
use serde::{Deserialize, Serialize};

use crate::{
    Error,
    auth::{AuthState, encode_token},
    db::lock_connection,
    envelope::Envelope,
    user::{User, UserID, get_user_by_email, get_user_by_id},
    validation::ValidationErrors,
};

/// The data returned after a successful sign in or registration.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    /// The bearer token to send with future requests.
    pub token: String,
    /// The signed-in user.
    pub user: User,
}

/// The credentials entered during sign in.
#[derive(Debug, Default, Deserialize)]
pub struct LogInForm {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// Check that `raw_email` looks like an email address, returning it trimmed and lower-cased.
pub(crate) fn validate_email(raw_email: &str) -> Result<String, String> {
    let email = raw_email.trim();

    if email.is_empty() {
        return Err("Email is required".to_owned());
    }

    if !EmailAddress::is_valid(email) {
        return Err("Please enter a valid email".to_owned());
    }

    Ok(email.to_lowercase())
}

/// Handler for sign in requests.
///
/// # Errors
///
/// Responds with [Error::InvalidCredentials] if the email is not registered or
/// the password is wrong. The two cases are not distinguished.
pub async fn log_in_endpoint(
    State(state): State<AuthState>,
    form: Result<Json<LogInForm>, JsonRejection>,
) -> Result<Envelope<AuthResponse>, Error> {
    let Json(form) = form?;
    let mut errors = ValidationErrors::new();

    let email = errors.check("email", validate_email(&form.email));
    if form.password.is_empty() {
        errors.push("password", "Password is required");
    }
    let (Some(email), true) = (email, errors.is_empty()) else {
        return Err(Error::Validation(errors));
    };

    let user = {
        let connection = lock_connection(&state.db_connection)?;
        match get_user_by_email(&email, &connection) {
            Ok(user) => user,
            Err(Error::NotFound) => return Err(Error::InvalidCredentials),
            Err(error) => return Err(error),
        }
    };

    let is_password_correct = user
        .password_hash
        .verify(&form.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !is_password_correct {
        tracing::info!("Failed sign in attempt for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let token = encode_token(user.id, &state.jwt_keys, state.token_duration)?;

    Ok(Envelope::data(AuthResponse { token, user }).with_message("Login successful"))
}

/// A route handler that responds with the user the bearer token belongs to.
pub async fn get_current_user_endpoint(
    State(state): State<AuthState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Envelope<User>, Error> {
    let connection = lock_connection(&state.db_connection)?;
    let user = get_user_by_id(user_id, &connection)?;

    Ok(Envelope::data(user))
}

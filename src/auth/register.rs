//! The endpoint for creating a new account.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    Error,
    auth::{AuthResponse, AuthState, encode_token, log_in::validate_email},
    db::lock_connection,
    envelope::Envelope,
    password::{PasswordHash, ValidatedPassword},
    user::{NewUser, create_user, validate_name},
    validation::ValidationErrors,
};

/// The details entered when registering.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

/// A route handler for creating a new user.
///
/// Responds with 201 and a bearer token so the new user is signed in straight away.
///
/// # Errors
///
/// Responds with [Error::DuplicateEmail] if the email is already registered.
pub async fn register_endpoint(
    State(state): State<AuthState>,
    form: Result<Json<RegisterForm>, JsonRejection>,
) -> Result<(StatusCode, Envelope<AuthResponse>), Error> {
    let Json(form) = form?;
    let mut errors = ValidationErrors::new();

    let name = if form.name.trim().is_empty() {
        errors.push("name", "Name is required");
        None
    } else {
        errors.check("name", validate_name(&form.name))
    };
    let email = errors.check("email", validate_email(&form.email));
    let password = errors.check("password", ValidatedPassword::new(&form.password));

    let (Some(name), Some(email), Some(password), true) =
        (name, email, password, errors.is_empty())
    else {
        return Err(Error::Validation(errors));
    };

    let password_hash = PasswordHash::new(password, state.password_cost)?;

    let user = {
        let connection = lock_connection(&state.db_connection)?;
        create_user(
            NewUser {
                name,
                email,
                password_hash,
            },
            &connection,
        )?
    };
    tracing::info!("Registered user {}", user.id);

    let token = encode_token(user.id, &state.jwt_keys, state.token_duration)?;

    Ok((
        StatusCode::CREATED,
        Envelope::data(AuthResponse { token, user }).with_message("User registered successfully"),
    ))
}

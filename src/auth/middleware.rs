//! Authentication middleware that checks bearer tokens and identifies the caller.

use std::sync::{Arc, Mutex};

use axum::{
    RequestPartsExt,
    extract::{FromRef, Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use rusqlite::Connection;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{JwtKeys, decode_token},
    db::lock_connection,
    user::{UserID, get_user_by_id},
};

/// The state needed for the auth middleware and the credential endpoints.
#[derive(Clone)]
pub struct AuthState {
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The keys for signing and verifying bearer tokens.
    pub jwt_keys: JwtKeys,
    /// How long a newly issued token is valid for.
    pub token_duration: Duration,
    /// The bcrypt cost used when hashing a new password.
    pub password_cost: u32,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            jwt_keys: state.jwt_keys.clone(),
            token_duration: state.token_duration,
            password_cost: state.password_cost,
        }
    }
}

/// Middleware function that checks for a valid bearer token.
///
/// The user ID is placed into the request extensions and the request executed
/// normally if the token is valid and belongs to an existing user, otherwise a
/// 401 response is returned.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
pub async fn auth_guard(
    State(state): State<AuthState>,
    request: Request,
    next: Next,
) -> Result<Response, Error> {
    let (mut parts, body) = request.into_parts();

    let TypedHeader(Authorization(bearer)) = parts
        .extract::<TypedHeader<Authorization<Bearer>>>()
        .await
        .map_err(|_| Error::MissingToken)?;

    let user_id = decode_token(bearer.token(), &state.jwt_keys)?;
    check_user_exists(user_id, &state.db_connection)?;

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);

    Ok(next.run(request).await)
}

fn check_user_exists(user_id: UserID, db_connection: &Mutex<Connection>) -> Result<(), Error> {
    let connection = lock_connection(db_connection)?;

    match get_user_by_id(user_id, &connection) {
        Ok(_) => Ok(()),
        Err(Error::NotFound) => {
            tracing::debug!("Rejected token for deleted user {user_id}");
            Err(Error::InvalidToken)
        }
        Err(error) => Err(error),
    }
}

//! The fallback for requests that do not match any route.

use axum::{
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};

use crate::envelope::Envelope;

/// Respond with 404 and the path that was not found.
pub async fn get_404_not_found(uri: Uri) -> Response {
    (
        StatusCode::NOT_FOUND,
        Envelope::failure(format!("Route {} not found", uri.path())),
    )
        .into_response()
}

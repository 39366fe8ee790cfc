//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
};

use crate::{
    AppState,
    auth::{auth_guard, get_current_user_endpoint, log_in_endpoint, register_endpoint},
    endpoints,
    expense::{
        create_expense_endpoint, delete_expense_endpoint, delete_expenses_endpoint,
        edit_expense_endpoint, get_expense_endpoint, get_recent_expenses_endpoint,
        get_summary_endpoint, get_trends_endpoint, list_expenses_endpoint,
    },
    health::get_health,
    logging::{MAX_BODY_SIZE, logging_middleware},
    not_found::get_404_not_found,
    user::{
        change_password_endpoint, delete_account_endpoint, get_profile_endpoint,
        update_profile_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::HEALTH, get(get_health))
        .route(endpoints::REGISTER, post(register_endpoint))
        .route(endpoints::LOG_IN, post(log_in_endpoint));

    // The analytics routes are static segments so they take priority over `{expense_id}`.
    let protected_routes = Router::new()
        .route(endpoints::ME, get(get_current_user_endpoint))
        .route(
            endpoints::EXPENSES,
            get(list_expenses_endpoint)
                .post(create_expense_endpoint)
                .delete(delete_expenses_endpoint),
        )
        .route(endpoints::EXPENSE_SUMMARY, get(get_summary_endpoint))
        .route(endpoints::EXPENSE_TRENDS, get(get_trends_endpoint))
        .route(endpoints::EXPENSE_RECENT, get(get_recent_expenses_endpoint))
        .route(
            endpoints::EXPENSE,
            get(get_expense_endpoint)
                .put(edit_expense_endpoint)
                .delete(delete_expense_endpoint),
        )
        .route(
            endpoints::PROFILE,
            get(get_profile_endpoint).put(update_profile_endpoint),
        )
        .route(endpoints::CHANGE_PASSWORD, put(change_password_endpoint))
        .route(
            endpoints::ACCOUNT,
            axum::routing::delete(delete_account_endpoint),
        )
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .fallback(get_404_not_found)
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        endpoints,
        logging::MAX_BODY_SIZE,
        test_utils::{must_create_test_server, must_create_test_state, must_create_test_user},
    };

    #[tokio::test]
    async fn health_check_needs_no_token() {
        let server = must_create_test_server(must_create_test_state());

        let response = server.get(endpoints::HEALTH).await;

        response.assert_status_ok();
        let body = response.json::<Value>();
        assert_eq!(body["success"], json!(true));
        assert_eq!(body["message"], json!("Server is healthy"));
        assert!(body["timestamp"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_not_found() {
        let server = must_create_test_server(must_create_test_state());

        let response = server.get("/api/nope").await;

        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(
            response.json::<Value>(),
            json!({"success": false, "message": "Route /api/nope not found"})
        );
    }

    #[tokio::test]
    async fn analytics_routes_do_not_collide_with_expense_id() {
        let state = must_create_test_state();
        let (_, token) = must_create_test_user(&state);
        let server = must_create_test_server(state);

        for endpoint in [
            endpoints::EXPENSE_SUMMARY,
            endpoints::EXPENSE_TRENDS,
            endpoints::EXPENSE_RECENT,
        ] {
            server
                .get(endpoint)
                .authorization_bearer(&token)
                .await
                .assert_status_ok();
        }
    }

    #[tokio::test]
    async fn rejects_oversized_body() {
        let state = must_create_test_state();
        let (_, token) = must_create_test_user(&state);
        let server = must_create_test_server(state);

        let response = server
            .post(endpoints::EXPENSES)
            .authorization_bearer(&token)
            .json(&json!({"title": "Big", "description": "x".repeat(MAX_BODY_SIZE)}))
            .await;

        response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    }
}

#![allow(missing_docs)]

use axum_test::TestServer;
use rusqlite::Connection;
use time::macros::date;

use crate::{
    AppState, build_router,
    auth::encode_token,
    expense::{Category, Expense, ExpenseKind, NewExpense, create_expense},
    pagination::PaginationConfig,
    password::{PasswordHash, ValidatedPassword},
    user::{NewUser, User, UserID, create_user},
};

/// The password of every user made by [must_create_test_user].
pub(crate) const TEST_PASSWORD: &str = "Test1234";

/// The lowest cost bcrypt accepts, keeps the tests fast.
const TEST_PASSWORD_COST: u32 = 4;

pub(crate) fn must_create_test_state() -> AppState {
    let connection = Connection::open_in_memory().expect("could not open in-memory database");
    let mut state = AppState::new(
        connection,
        "42",
        "Etc/UTC",
        PaginationConfig::default(),
    )
    .expect("could not create app state");
    state.password_cost = TEST_PASSWORD_COST;

    state
}

pub(crate) fn must_create_test_user(state: &AppState) -> (User, String) {
    must_create_test_user_with_email(state, "test@example.com")
}

pub(crate) fn must_create_test_user_with_email(state: &AppState, email: &str) -> (User, String) {
    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(TEST_PASSWORD),
        TEST_PASSWORD_COST,
    )
    .expect("could not hash password");
    let user = create_user(
        NewUser {
            name: "Test User".to_owned(),
            email: email.to_owned(),
            password_hash,
        },
        &state.db_connection.lock().unwrap(),
    )
    .expect("could not create test user");
    let token = encode_token(user.id, &state.jwt_keys, state.token_duration)
        .expect("could not create token");

    (user, token)
}

pub(crate) fn must_create_test_expense(state: &AppState, owner: UserID) -> Expense {
    create_expense(
        owner,
        NewExpense::build(
            "Weekly shop",
            42.5,
            ExpenseKind::Expense,
            Category::Food,
            date!(2025 - 06 - 15),
        ),
        &state.db_connection.lock().unwrap(),
    )
    .expect("could not create test expense")
}

pub(crate) fn must_create_test_server(state: AppState) -> TestServer {
    TestServer::new(build_router(state))
}

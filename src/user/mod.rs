//! Registered users, their stored profile and the endpoints for managing it.

mod core;
mod profile;

#[cfg(test)]
pub use core::count_users;
pub use core::{
    Currency, NewUser, ProfileUpdate, Theme, User, UserID, create_user, create_user_table,
    delete_user, get_user_by_email, get_user_by_id, update_password, update_profile,
};
pub use profile::{
    change_password_endpoint, delete_account_endpoint, get_profile_endpoint,
    update_profile_endpoint,
};
pub(crate) use profile::validate_name;

//! Identity domain - users, registration rules, password digests.

mod user;

pub use user::{NewUser, PasswordHash, User, UserProfile};

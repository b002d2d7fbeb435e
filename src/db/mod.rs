//! Database module
//!
//! Account storage: models, the `UserStore` seam and its Postgres
//! implementation.

pub mod models;
pub mod operations;

pub use models::{normalize_email, NewUser, User, UserResponse, UserUpdate};
pub use operations::{PgUserStore, UserStore};

//! User endpoints. Every route requires an access token.

pub mod handlers;

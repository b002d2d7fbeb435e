//! Authentication module
//!
//! Password hashing, token issuance and verification, the account service
//! built on them, the fixed-window rate limiter and the `/auth` handlers.

pub mod extractor;
pub mod handlers;
pub mod password;
pub mod rate_limit;
pub mod service;
pub mod token;

pub use extractor::AuthenticatedUser;
pub use password::PasswordHasher;
pub use rate_limit::{RateLimitConfig, RateLimitDecision, RateLimitRule, RateLimiter};
pub use service::{AuthService, ProfileUpdate, Registration, TokenPair};
pub use token::{Claims, TokenCodec, TokenType};

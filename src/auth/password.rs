use crate::error::AppError;

/// Placeholder verified against when an email is unknown, so the response
/// time matches a real wrong-password check.
const DUMMY_PASSWORD: &str = "dummy-password-for-timing-equalization";

/// bcrypt only reads this many bytes of input.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Salted one-way password hashing (bcrypt).
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    dummy_hash: String,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Result<Self, AppError> {
        let dummy_hash = bcrypt::hash(DUMMY_PASSWORD, cost)
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))?;
        Ok(Self { cost, dummy_hash })
    }

    /// Each call draws a fresh random salt, so equal inputs give different hashes.
    pub fn hash(&self, password: &str) -> Result<String, AppError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AppError::ValidationError(format!(
                "Password must be at most {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        bcrypt::hash(password, self.cost)
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
    }

    /// A malformed stored hash verifies as `false` rather than erroring.
    pub fn verify(&self, password: &str, hashed: &str) -> bool {
        match bcrypt::verify(password, hashed) {
            Ok(valid) => valid,
            Err(e) => {
                tracing::warn!("Stored password hash could not be parsed: {}", e);
                false
            }
        }
    }

    /// Spend the same work as [`verify`](Self::verify) and always fail.
    pub fn verify_dummy(&self, password: &str) -> bool {
        let _ = bcrypt::verify(password, &self.dummy_hash);
        false
    }
}

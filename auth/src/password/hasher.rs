use super::errors::PasswordError;

/// Password hashing implementation.
///
/// Provides salted, deliberately slow password hashing (internally uses bcrypt).
/// The salt is generated per call and embedded in the output, so hashing the
/// same plaintext twice yields two different strings.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Work factor used when none is configured.
    pub const DEFAULT_COST: u32 = 12;

    /// Lowest work factor bcrypt accepts.
    pub const MIN_COST: u32 = 4;

    /// Highest work factor bcrypt accepts.
    pub const MAX_COST: u32 = 31;

    /// bcrypt only digests this many bytes of input.
    pub const MAX_PASSWORD_BYTES: usize = 72;

    /// Create a new password hasher with the default cost factor.
    ///
    /// # Returns
    /// PasswordHasher instance configured with cost 12
    pub fn new() -> Self {
        Self {
            cost: Self::DEFAULT_COST,
        }
    }

    /// Create a password hasher with an explicit cost factor.
    ///
    /// # Arguments
    /// * `cost` - bcrypt work factor (each increment doubles hashing time)
    ///
    /// # Errors
    /// * `InvalidCost` - Cost is outside the range bcrypt supports
    pub fn with_cost(cost: u32) -> Result<Self, PasswordError> {
        if !(Self::MIN_COST..=Self::MAX_COST).contains(&cost) {
            return Err(PasswordError::InvalidCost {
                min: Self::MIN_COST,
                max: Self::MAX_COST,
                actual: cost,
            });
        }

        Ok(Self { cost })
    }

    /// Configured work factor.
    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a plaintext password.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to hash
    ///
    /// # Returns
    /// Modular crypt format hash (includes version, cost, salt, and digest)
    ///
    /// # Errors
    /// * `TooLong` - Password exceeds 72 bytes and would be truncated
    /// * `HashingFailed` - Password hashing operation failed
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > Self::MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong {
                max: Self::MAX_PASSWORD_BYTES,
                actual: password.len(),
            });
        }

        bcrypt::hash(password, self.cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Verify a password against a stored hash.
    ///
    /// The digest comparison is done on the full hash output in constant time.
    /// Passwords longer than 72 bytes never match, since no stored hash can
    /// have been produced from one.
    ///
    /// # Arguments
    /// * `password` - Plaintext password to verify
    /// * `hash` - Stored password hash
    ///
    /// # Returns
    /// True if password matches, false otherwise
    ///
    /// # Errors
    /// * `VerificationFailed` - Stored hash is not a valid bcrypt hash
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, PasswordError> {
        if password.len() > Self::MAX_PASSWORD_BYTES {
            return Ok(false);
        }

        bcrypt::verify(password, hash)
            .map_err(|e| PasswordError::VerificationFailed(format!("Invalid password hash: {}", e)))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

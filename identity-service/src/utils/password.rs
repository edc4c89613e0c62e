use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};

/// Newtype for password to prevent accidental logging
#[derive(Debug, Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> Self {
        Self(password)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Newtype for password hash
#[derive(Debug, Clone)]
pub struct PasswordHashString(String);

impl PasswordHashString {
    pub fn new(hash: String) -> Self {
        Self(hash)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

/// Opaque password-hashing capability. The authentication core never sees
/// hash internals, only this interface.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &Password) -> Result<PasswordHashString, anyhow::Error>;

    /// Verify a password against a stored hash. A hash that fails to parse
    /// counts as a mismatch, never as an error surfaced to the caller.
    fn verify(&self, plain: &Password, hash: &PasswordHashString) -> bool;
}

/// Argon2id-backed hasher with secure default parameters. Salt is generated
/// per hash and embedded in the encoded string.
#[derive(Debug, Clone, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, plain: &Password) -> Result<PasswordHashString, anyhow::Error> {
        let argon2 = Argon2::default();
        let salt = SaltString::generate(&mut OsRng);

        let password_hash = argon2::password_hash::PasswordHasher::hash_password(
            &argon2,
            plain.as_str().as_bytes(),
            &salt,
        )
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();

        Ok(PasswordHashString::new(password_hash))
    }

    fn verify(&self, plain: &Password, hash: &PasswordHashString) -> bool {
        let parsed_hash = match PasswordHash::new(hash.as_str()) {
            Ok(parsed) => parsed,
            Err(_) => return false,
        };

        Argon2::default()
            .verify_password(plain.as_str().as_bytes(), &parsed_hash)
            .is_ok()
    }
}

//! Admin bearer token for the SMT routes.
//!
//! Only the argon2id PHC hash of the token is ever configured. An empty setting
//! means "no token"; anything else must be a hash this module can verify with,
//! otherwise the service refuses to start rather than serve unauthenticated.

use argon2::password_hash::{
    self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng,
};
use argon2::{Algorithm, Argon2, Params, Version};

const PHC_PREFIX: &str = "$argon2id$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminTokenHash(String);

#[derive(Debug)]
pub enum AdminTokenHashError {
    NotArgon2id,
    Malformed(password_hash::Error),
    EmptyToken,
    Hash(password_hash::Error),
}

impl std::fmt::Display for AdminTokenHashError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotArgon2id => write!(f, "admin token hash must start with {PHC_PREFIX}"),
            Self::Malformed(e) => {
                write!(f, "admin token hash is not a valid argon2id PHC string: {e}")
            }
            Self::EmptyToken => write!(f, "admin token is empty"),
            Self::Hash(e) => write!(f, "argon2id hash failed: {e}"),
        }
    }
}

impl std::error::Error for AdminTokenHashError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Malformed(e) | Self::Hash(e) => Some(e),
            Self::NotArgon2id | Self::EmptyToken => None,
        }
    }
}

impl AdminTokenHash {
    /// Parses a configured hash. Blank input means no token is configured.
    pub fn parse(raw: &str) -> Result<Option<Self>, AdminTokenHashError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(None);
        }
        if !raw.starts_with(PHC_PREFIX) {
            return Err(AdminTokenHashError::NotArgon2id);
        }
        PasswordHash::new(raw).map_err(AdminTokenHashError::Malformed)?;
        Ok(Some(Self(raw.to_string())))
    }

    /// Hashes a plaintext token with m=19456 KiB, t=2, p=1.
    pub fn generate(token_plaintext: &str) -> Result<Self, AdminTokenHashError> {
        if token_plaintext.trim().is_empty() {
            return Err(AdminTokenHashError::EmptyToken);
        }
        let params =
            Params::new(19_456, 2, 1, None).map_err(|e| AdminTokenHashError::Hash(e.into()))?;
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
            .hash_password(token_plaintext.as_bytes(), &salt)
            .map_err(AdminTokenHashError::Hash)?;
        Ok(Self(hash.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn verify(&self, token_plaintext: &str) -> bool {
        if token_plaintext.is_empty() {
            return false;
        }
        PasswordHash::new(&self.0).is_ok_and(|parsed| {
            Argon2::default()
                .verify_password(token_plaintext.as_bytes(), &parsed)
                .is_ok()
        })
    }
}

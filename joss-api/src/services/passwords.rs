use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};

use joss_shared::errors::{AppError, AppResult, ErrorCode};

/// Argon2id hashing with configurable cost. Hashing and verification run
/// on the blocking pool.
#[derive(Clone)]
pub struct Passwords {
    params: Params,
    /// Verified against when an account has no usable hash, so a miss costs
    /// the same as a wrong password.
    dummy_hash: String,
}

impl Passwords {
    pub fn new(memory_kib: u32, iterations: u32) -> AppResult<Self> {
        let params = Params::new(memory_kib, iterations, 1, None)
            .map_err(|e| AppError::internal(format!("invalid argon2 parameters: {e}")))?;
        let dummy_hash = hash_with(&params, "joss-dummy-password")?;
        Ok(Self { params, dummy_hash })
    }

    pub async fn hash(&self, password: &str) -> AppResult<String> {
        let params = self.params.clone();
        let password = password.to_string();
        tokio::task::spawn_blocking(move || hash_with(&params, &password))
            .await
            .map_err(|e| AppError::internal(format!("hashing task failed: {e}")))?
    }

    /// `false` for a wrong password and for accounts without a password hash.
    pub async fn verify(&self, password: &str, hash: Option<&str>) -> AppResult<bool> {
        let (hash, known) = match hash {
            Some(h) => (h.to_string(), true),
            None => (self.dummy_hash.clone(), false),
        };
        let params = self.params.clone();
        let password = password.to_string();

        let matched = tokio::task::spawn_blocking(move || verify_with(&params, &password, &hash))
            .await
            .map_err(|e| AppError::internal(format!("verification task failed: {e}")))??;

        Ok(known && matched)
    }
}

fn argon2(params: &Params) -> Argon2<'static> {
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params.clone())
}

fn hash_with(params: &Params, password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2(params)
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

fn verify_with(params: &Params, password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(argon2(params)
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < 8 {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must be at least 8 characters"));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one number"));
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(AppError::new(ErrorCode::PasswordTooWeak, "password must contain at least one letter"));
    }
    Ok(())
}

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use rand::RngCore;

pub const PASSWORD_MIN: usize = 6;
pub const PASSWORD_MAX: usize = 128;

/// Length rules for account passwords.
pub fn validate_password(password: &str) -> Result<(), String> {
    if password.len() < PASSWORD_MIN {
        return Err(format!(
            "Password must be at least {} characters",
            PASSWORD_MIN
        ));
    }

    if password.len() > PASSWORD_MAX {
        return Err(format!("Password cannot exceed {} characters", PASSWORD_MAX));
    }

    Ok(())
}

/// Hash a password using Argon2
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let mut salt_bytes = [0u8; 16];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)?;
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string();
    Ok(hash)
}

/// Check `password` against a stored PHC hash string. Malformed hashes never
/// verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

//! Account name and password rules plus credential derivation.

use sha2::{Digest, Sha512};
use subtle::ConstantTimeEq;

use super::error::DomainError;

const MIN_ACCOUNT_NAME_LEN: usize = 3;
const MIN_PASSWORD_LEN: usize = 6;

fn is_word_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Account names and passwords are restricted to `[0-9A-Za-z_]`.
pub fn validate_registration(account_name: &str, password: &str) -> Result<(), DomainError> {
    if account_name.len() < MIN_ACCOUNT_NAME_LEN || !account_name.chars().all(is_word_char) {
        return Err(DomainError::validation(format!(
            "account name must be at least {MIN_ACCOUNT_NAME_LEN} characters of [0-9A-Za-z_]"
        )));
    }
    if password.len() < MIN_PASSWORD_LEN || !password.chars().all(is_word_char) {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters of [0-9A-Za-z_]"
        )));
    }
    Ok(())
}

fn digest(input: &str) -> String {
    hex::encode(Sha512::digest(input.as_bytes()))
}

/// Hash of `password:sha512(account_name)`; the account name doubles as salt.
pub fn calculate_passhash(account_name: &str, password: &str) -> String {
    let salt = digest(account_name);
    digest(&format!("{password}:{salt}"))
}

pub fn verify_passhash(account_name: &str, password: &str, stored: &str) -> bool {
    let candidate = calculate_passhash(account_name, password);
    candidate.as_bytes().ct_eq(stored.as_bytes()).into()
}

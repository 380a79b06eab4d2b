use bcrypt::{hash, verify};
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{3,32}$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 6;

pub fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    hash(password, cost)
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, bcrypt::BcryptError> {
    verify(password, password_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn usernames_follow_the_allowed_alphabet() {
        assert!(is_valid_username("neko_01"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("with space"));
        assert!(!is_valid_username("emoji🐱"));
    }

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hashed = hash_password("hunter22", 4).unwrap();
        assert!(verify_password("hunter22", &hashed).unwrap());
        assert!(!verify_password("hunter23", &hashed).unwrap());
    }
}

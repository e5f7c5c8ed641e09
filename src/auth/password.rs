use std::sync::OnceLock;

use crate::error::{AppError, AppResult};

pub fn hash_password(plaintext: &str, cost: u32) -> AppResult<String> {
    bcrypt::hash(plaintext, cost).map_err(|e| AppError::Internal(format!("bcrypt: {}", e)))
}

/// Constant-time check via bcrypt. Malformed hashes count as a mismatch.
pub fn verify_password(plaintext: &str, hash: &str) -> bool {
    bcrypt::verify(plaintext, hash).unwrap_or(false)
}

/// Stand-in hash for logins with no account, made once at the first cost asked for.
fn dummy_hash(cost: u32) -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| bcrypt::hash("mentor-trader-no-account", cost).unwrap_or_default())
}

/// Spend a full bcrypt verify for a login with no matching account, so it
/// takes as long as a wrong password. Always false.
pub fn verify_without_account(plaintext: &str, cost: u32) -> bool {
    verify_password(plaintext, dummy_hash(cost));
    false
}

/// Trim and lowercase an email, rejecting anything without `local@domain.tld` shape.
pub fn normalize_email(raw: &str) -> AppResult<String> {
    let email = raw.trim().to_lowercase();

    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
                && domain.contains('.')
                && domain.split('.').all(|part| !part.is_empty())
        }
        None => false,
    };

    if !valid {
        return Err(AppError::BadRequest("A valid email is required".into()));
    }
    Ok(email)
}

pub fn check_password_rules(password: &str, min_len: usize) -> AppResult<()> {
    if password.chars().count() < min_len {
        return Err(AppError::BadRequest(format!(
            "Password must be at least {} characters",
            min_len
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter22", 4).unwrap();
        assert_ne!(hash, "hunter22");
        assert!(verify_password("hunter22", &hash));
        assert!(!verify_password("hunter23", &hash));
    }

    #[test]
    fn verify_against_garbage_hash_is_false() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn missing_account_still_runs_bcrypt() {
        // A real hash, so the verify costs the same as for an existing user
        let hash = dummy_hash(4);
        assert!(hash.starts_with("$2"));
        assert!(verify_password("mentor-trader-no-account", hash));

        assert!(!verify_without_account("mentor-trader-no-account", 4));
        assert!(!verify_without_account("hunter22", 4));
    }

    #[test]
    fn email_is_trimmed_and_lowercased() {
        assert_eq!(
            normalize_email("  Trader@Example.COM ").unwrap(),
            "trader@example.com"
        );
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["", "plain", "@example.com", "a@", "a@localhost", "a@b@c.com", "a b@c.com", "a@.com"] {
            assert!(normalize_email(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn short_password_is_rejected() {
        assert!(check_password_rules("12345", 6).is_err());
        assert!(check_password_rules("123456", 6).is_ok());
    }
}

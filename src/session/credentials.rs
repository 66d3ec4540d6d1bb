//! Credential checks for the login endpoint.

use subtle::ConstantTimeEq;

use crate::config::UserCredential;

/// Decides whether an email/password pair may sign in.
pub trait CredentialVerifier: Send + Sync + std::fmt::Debug {
    fn verify(&self, email: &str, password: &str) -> bool;
}

/// Fixed list of demo accounts from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    users: Vec<UserCredential>,
}

impl StaticCredentials {
    pub fn new(users: Vec<UserCredential>) -> Self {
        Self { users }
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, email: &str, password: &str) -> bool {
        self.users.iter().any(|u| {
            u.email.eq_ignore_ascii_case(email)
                && bool::from(u.password.as_bytes().ct_eq(password.as_bytes()))
        })
    }
}

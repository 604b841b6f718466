//! Credential handling.
//!
//! Passwords given on the command line, through `PGPASSWORD`, the prompt or
//! the configuration file are moved into [`Credentials`] as soon as they are
//! read and only leave it while the connection URL is being built.
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers and cleared on drop
//! - `Debug` output never contains the password

use zeroize::{Zeroize, Zeroizing};

/// Secure credential container that automatically zeros memory on drop.
///
/// An empty username means "not given": the server then falls back to its
/// own default (usually the operating system user).
///
/// # Example
///
/// ```rust
/// use pgslicer_core::security::Credentials;
///
/// let creds = Credentials::new("admin".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "admin");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Default, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn has_username(&self) -> bool {
        !self.username.is_empty()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Replaces the password, zeroing the previous one.
    pub fn set_password(&mut self, password: Option<String>) {
        self.password = Zeroizing::new(password);
    }

    /// Replaces the username.
    pub fn set_username(&mut self, username: String) {
        self.username = Zeroizing::new(username);
    }

    /// Exposes the password for building the connection URL.
    pub(crate) fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &self.password().map(|_| "****"))
            .finish()
    }
}

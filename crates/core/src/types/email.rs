//! The address typed into the sign-in form.

use thiserror::Error;

use super::validation::FieldError;

/// Why a sign-in address was refused before any request was made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("email is required")]
    Empty,

    #[error("email must be at most {max} characters")]
    TooLong { max: usize },

    /// Anything that is not `name@host.tld`.
    #[error("enter an address like name@example.com")]
    Malformed,
}

impl From<EmailError> for FieldError {
    fn from(error: EmailError) -> Self {
        Self::new("email", error.to_string())
    }
}

/// A normalized sign-in address: trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Email(String);

impl Email {
    pub const MAX_LENGTH: usize = 254;

    /// Parse what the customer typed.
    ///
    /// # Errors
    ///
    /// Returns an error when the address is empty, too long, or not of the
    /// form `name@host.tld` with a single `@`.
    pub fn parse(input: &str) -> Result<Self, EmailError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(EmailError::Empty);
        }
        if input.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        let (name, host) = input.split_once('@').ok_or(EmailError::Malformed)?;
        let host_ok = host
            .split_once('.')
            .is_some_and(|(label, tld)| !label.is_empty() && !tld.is_empty());
        if name.is_empty() || host.contains('@') || !host_ok || input.contains(char::is_whitespace)
        {
            return Err(EmailError::Malformed);
        }

        Ok(Self(input.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

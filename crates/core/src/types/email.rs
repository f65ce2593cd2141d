//! Contact email addresses for suppliers and users.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`Email`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailError {
    /// The input is empty or only whitespace.
    #[error("email cannot be empty")]
    Empty,
    /// The input is longer than the RFC 5321 limit.
    #[error("email must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// Not exactly one `@`.
    #[error("email must contain exactly one @ symbol")]
    AtSymbol,
    /// Whitespace inside the address.
    #[error("email cannot contain whitespace")]
    Whitespace,
    /// Nothing before the `@`.
    #[error("email local part cannot be empty")]
    EmptyLocalPart,
    /// Empty domain or an empty label such as `a@b..c`.
    #[error("email domain is malformed")]
    MalformedDomain,
}

/// A syntactically plausible email address.
///
/// Checks are deliberately shallow: the backend validates for real, this only
/// catches typos before a round-trip. Surrounding whitespace is trimmed.
///
/// ```
/// use officine_core::Email;
///
/// assert!(Email::parse("compta@grossiste-alger.dz").is_ok());
/// assert!(Email::parse(" contact@pharmacie.fr ").is_ok());
///
/// assert!(Email::parse("").is_err());
/// assert!(Email::parse("contact.pharmacie.fr").is_err());
/// assert!(Email::parse("a@b@c.fr").is_err());
/// assert!(Email::parse("contact@pharmacie..fr").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Maximum length of an email address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse an `Email` from user input.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailError`] describing the first problem found.
    pub fn parse(s: &str) -> Result<Self, EmailError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailError::AtSymbol)?;
        if domain.contains('@') {
            return Err(EmailError::AtSymbol);
        }
        if local.is_empty() {
            return Err(EmailError::EmptyLocalPart);
        }
        if domain.is_empty() || domain.split('.').any(str::is_empty) {
            return Err(EmailError::MalformedDomain);
        }

        Ok(Self(s.to_owned()))
    }

    /// Returns the email address as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the domain part of the email (after the @).
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, d)| d)
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Email {
    type Err = EmailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert!(Email::parse("achats@pharmacie.fr").is_ok());
        assert!(Email::parse("a.b+c@sub.domain.dz").is_ok());
        assert!(Email::parse("x@localhost").is_ok());
    }

    #[test]
    fn test_parse_trims() {
        let email = Email::parse("  achats@pharmacie.fr\n").unwrap();
        assert_eq!(email.as_str(), "achats@pharmacie.fr");
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Email::parse("   "), Err(EmailError::Empty));
        assert_eq!(Email::parse("nobody"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("a@b@c"), Err(EmailError::AtSymbol));
        assert_eq!(Email::parse("@pharmacie.fr"), Err(EmailError::EmptyLocalPart));
        assert_eq!(Email::parse("a@"), Err(EmailError::MalformedDomain));
        assert_eq!(Email::parse("a@.fr"), Err(EmailError::MalformedDomain));
        assert_eq!(Email::parse("a b@c.fr"), Err(EmailError::Whitespace));
    }

    #[test]
    fn test_parse_too_long() {
        let long = format!("{}@pharmacie.fr", "a".repeat(250));
        assert!(matches!(Email::parse(&long), Err(EmailError::TooLong { .. })));
    }

    #[test]
    fn test_domain() {
        let email = Email::parse("achats@pharmacie.fr").unwrap();
        assert_eq!(email.domain(), "pharmacie.fr");
    }
}

//! # Y-BOCS Types
//!
//! Validated primitive types shared by the core, CLI and REST crates.
//!
//! - [`NonEmptyText`] for free text that must carry content (display names, symptom notes)
//! - [`Login`] for account identifiers, which double as per-patient directory names

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input is not usable as a login
    #[error("Invalid login: {0}")]
    InvalidLogin(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// An account login.
///
/// Logins key the credential document and name each patient's directory under the
/// data root, so they are restricted to a conservative ASCII set:
/// - 1 to [`Login::MAX_LEN`] characters after trimming
/// - only `A-Z`, `a-z`, `0-9`, `.`, `-`, `_`
/// - never `.` or `..`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Login(String);

impl Login {
    /// Maximum accepted login length.
    pub const MAX_LEN: usize = 64;

    /// Parses and validates a login.
    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();

        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }

        if trimmed.len() > Self::MAX_LEN {
            return Err(TextError::InvalidLogin(format!(
                "login exceeds maximum length of {} characters",
                Self::MAX_LEN
            )));
        }

        if trimmed == "." || trimmed == ".." {
            return Err(TextError::InvalidLogin(
                "login cannot be a relative path component".into(),
            ));
        }

        let ok = trimmed
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'.' | b'-' | b'_'));

        if !ok {
            return Err(TextError::InvalidLogin(format!(
                "'{trimmed}' contains invalid characters (only alphanumeric, '.', '-', '_' allowed)"
            )));
        }

        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(&self.0)
    }
}

impl AsRef<str> for Login {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for Login {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Login::parse(s)
    }
}

impl serde::Serialize for Login {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Login {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Login::parse(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims() {
        let text = NonEmptyText::new("  Jan K  ").unwrap();
        assert_eq!(text.as_str(), "Jan K");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace_only() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn test_login_accepts_valid_login() {
        let login = Login::parse("jkowal").unwrap();
        assert_eq!(login.as_str(), "jkowal");
        assert!(Login::parse("a.b-c_9").is_ok());
    }

    #[test]
    fn test_login_rejects_empty() {
        assert_eq!(Login::parse(""), Err(TextError::Empty));
    }

    #[test]
    fn test_login_rejects_path_components() {
        assert!(Login::parse("..").is_err());
        assert!(Login::parse("../etc").is_err());
        assert!(Login::parse("a/b").is_err());
    }

    #[test]
    fn test_login_rejects_non_ascii_and_spaces() {
        assert!(Login::parse("żaneta").is_err());
        assert!(Login::parse("jan kowal").is_err());
    }

    #[test]
    fn test_login_rejects_too_long() {
        let long = "a".repeat(Login::MAX_LEN + 1);
        assert!(matches!(Login::parse(long), Err(TextError::InvalidLogin(_))));
    }

    #[test]
    fn test_login_deserialize_validates() {
        let ok: Login = serde_json::from_str("\"jkowal\"").unwrap();
        assert_eq!(ok.as_str(), "jkowal");
        assert!(serde_json::from_str::<Login>("\"bad login\"").is_err());
    }
}

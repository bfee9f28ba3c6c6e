//! Input validation utilities.
//!
//! This module contains functions for validating user inputs to ensure they meet
//! safety and correctness requirements before being used in operations.

use crate::{YbocsError, YbocsResult};

/// Validates a new password against its confirmation, as entered on a reset form.
///
/// Blankness is checked before equality so that two empty fields report
/// [`YbocsError::EmptyPassword`] rather than a misleading match.
///
/// # Errors
///
/// - [`YbocsError::EmptyPassword`] if `new_password` is empty or whitespace-only
/// - [`YbocsError::PasswordMismatch`] if `confirm` differs from `new_password`
pub fn validate_new_password(new_password: &str, confirm: &str) -> YbocsResult<()> {
    if new_password.trim().is_empty() {
        return Err(YbocsError::EmptyPassword);
    }

    if new_password != confirm {
        return Err(YbocsError::PasswordMismatch);
    }

    Ok(())
}

/// Validates an initial password chosen by an administrator.
pub fn validate_initial_password(password: &str) -> YbocsResult<()> {
    if password.trim().is_empty() {
        return Err(YbocsError::EmptyPassword);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_new_password_accepts_matching() {
        assert!(validate_new_password("NewPass1", "NewPass1").is_ok());
    }

    #[test]
    fn test_validate_new_password_rejects_blank() {
        assert!(matches!(
            validate_new_password("   ", "   "),
            Err(YbocsError::EmptyPassword)
        ));
    }

    #[test]
    fn test_validate_new_password_rejects_mismatch() {
        assert!(matches!(
            validate_new_password("NewPass1", "NewPass2"),
            Err(YbocsError::PasswordMismatch)
        ));
    }

    #[test]
    fn test_validate_initial_password_rejects_empty() {
        assert!(matches!(
            validate_initial_password(""),
            Err(YbocsError::EmptyPassword)
        ));
    }
}

use non_empty_string::NonEmptyString;

/// Input rejected before it reaches a store or the credential backend.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty or whitespace.
    #[error("missing required field '{0}'")]
    MissingField(&'static str),

    /// The new password and its confirmation differ.
    #[error("the new passwords do not match")]
    PasswordMismatch,

    /// The new password is below the configured minimum length.
    #[error("the new password must contain at least {0} characters")]
    PasswordTooShort(usize),
}

/// Trims `value` and checks that something is left.
pub(crate) fn required(field: &'static str, value: &str) -> Result<NonEmptyString, ValidationError> {
    NonEmptyString::new(value.trim().to_string()).map_err(|_| ValidationError::MissingField(field))
}

/// Like [`required`], but collapses line breaks so the value fits on one line.
pub(crate) fn required_line(
    field: &'static str,
    value: &str,
) -> Result<NonEmptyString, ValidationError> {
    let line = value
        .lines()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    required(field, &line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_trims_surrounding_whitespace() {
        let value = required("title", "  Printer jam \n").unwrap();
        assert_eq!(value.as_str(), "Printer jam");
    }

    #[test]
    fn blank_values_are_missing() {
        assert_eq!(
            required("demandeur", " \t "),
            Err(ValidationError::MissingField("demandeur"))
        );
    }

    #[test]
    fn required_line_joins_lines() {
        let value = required_line("title", "VPN\n  down\n\n").unwrap();
        assert_eq!(value.as_str(), "VPN down");
    }
}

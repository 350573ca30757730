//! Validation of names that become single path components.

use crate::error::UtilError;

/// Validate that `name` can be embedded in a file name without escaping its directory.
///
/// Rejects empty names, `.` and `..`, and names containing `/`, `\` or NUL.
///
/// # Errors
/// Returns `UtilError::InvalidName` describing the first violated rule.
pub fn validate_component(name: &str) -> Result<(), UtilError> {
    let reason = if name.is_empty() {
        Some("must not be empty")
    } else if name == "." || name == ".." {
        Some("must not be a relative directory reference")
    } else if name.contains(['/', '\\']) {
        Some("must not contain path separators")
    } else if name.contains('\0') {
        Some("must not contain NUL characters")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(UtilError::InvalidName {
            name: name.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Ok(()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn accepts_project_names() {
        assert!(validate_component("core").is_ok());
        assert!(validate_component("base-services").is_ok());
        assert!(validate_component("index.html").is_ok());
        assert!(validate_component(".hidden").is_ok());
    }

    #[test]
    fn rejects_empty() {
        let err = validate_component("").unwrap_err().to_string();
        assert!(err.contains("must not be empty"), "error was: {err}");
    }

    #[test]
    fn rejects_traversal() {
        assert!(validate_component("..").is_err());
        assert!(validate_component(".").is_err());
        assert!(validate_component("../core").is_err());
        assert!(validate_component("a\\b").is_err());
    }

    #[test]
    fn rejects_nul() {
        assert!(validate_component("co\0re").is_err());
    }
}

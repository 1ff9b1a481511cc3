use common::{
    error::{AppError, Res},
    misc,
};

pub const PASSWORD_MIN_LEN: usize = 8;
pub const PASSWORD_MAX_LEN: usize = 128;

/// Every way `password` breaks the password policy.
pub fn password_violations(password: &str) -> Vec<String> {
    let mut errors = Vec::new();
    let len = password.chars().count();

    if password.is_empty() {
        errors.push("Password is required.".to_string());
        return errors;
    }
    if len < PASSWORD_MIN_LEN {
        errors.push(format!(
            "Password must be at least {} characters long.",
            PASSWORD_MIN_LEN
        ));
    }
    if len > PASSWORD_MAX_LEN {
        errors.push(format!(
            "Password must be at most {} characters long.",
            PASSWORD_MAX_LEN
        ));
    }
    let has_letter = password.chars().any(|c| c.is_ascii_alphabetic());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        errors.push("Password must include at least one letter and one number.".to_string());
    }
    errors
}

/// Validates a registration payload, reporting all violations at once.
/// `email` is expected normalized.
pub fn validate_registration(email: &str, password: &str) -> Res<()> {
    let mut errors = Vec::new();
    if email.is_empty() {
        errors.push("Email is required.".to_string());
    } else if !misc::valid_email(email) {
        errors.push("Please provide a valid email address.".to_string());
    }
    errors.extend(password_violations(password));

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

pub fn validate_password(password: &str) -> Res<()> {
    let errors = password_violations(password);
    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_policy_compliant_input() {
        assert!(validate_registration("ana@example.com", "s3cretpass").is_ok());
    }

    #[test]
    fn reports_all_violations_together() {
        let err = validate_registration("not-an-email", "short").unwrap_err();
        let AppError::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn password_needs_letter_and_digit() {
        assert_eq!(password_violations("onlyletters").len(), 1);
        assert_eq!(password_violations("1234567890").len(), 1);
        assert!(password_violations("abc12345").is_empty());
        assert_eq!(password_violations(&"a1".repeat(65)).len(), 1);
    }
}

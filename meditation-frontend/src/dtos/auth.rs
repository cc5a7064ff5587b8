use serde::Deserialize;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1, message = "Please enter your password"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SignupForm {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password should be at least 6 characters."))]
    pub password: String,
    #[validate(must_match(other = "password", message = "Passwords do not match"))]
    pub confirm_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dtos::generation::field_messages;

    #[test]
    fn test_login_requires_email_and_password() {
        let form = LoginForm {
            email: "not-an-email".to_string(),
            password: String::new(),
        };
        let errors = field_messages(&form.validate().unwrap_err());
        assert_eq!(
            errors.get("email").map(String::as_str),
            Some("Please enter a valid email address")
        );
        assert!(errors.contains_key("password"));
    }

    #[test]
    fn test_signup_rules() {
        let valid = SignupForm {
            email: "sam@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        };
        assert!(valid.validate().is_ok());

        let short = SignupForm {
            password: "abc".to_string(),
            confirm_password: "abc".to_string(),
            ..valid
        };
        let errors = field_messages(&short.validate().unwrap_err());
        assert_eq!(
            errors.get("password").map(String::as_str),
            Some("Password should be at least 6 characters.")
        );

        let mismatched = SignupForm {
            email: "sam@example.com".to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret2".to_string(),
        };
        let errors = field_messages(&mismatched.validate().unwrap_err());
        assert_eq!(
            errors.get("confirm_password").map(String::as_str),
            Some("Passwords do not match")
        );
    }
}

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A request to create a new account. The password is in plaintext and is
/// never stored directly.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[validate(length(min = 1, max = 20, message = "Username must be 1 to 20 characters"))]
    pub username: String,
    #[validate(email(message = "Email address is invalid"))]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[serde(alias = "adharId")]
    #[validate(length(min = 10, message = "National ID must be at least 10 characters"))]
    pub national_id: String,
}

impl SignupRequest {
    /// Validate every field, collapsing failures into a single bad request.
    pub fn validated(self) -> Result<Self> {
        match self.validate() {
            Ok(()) => Ok(self),
            Err(errors) => Err(Error::bad_request(format!("Invalid input data: {errors}"))),
        }
    }
}

/// Passwords need a minimum length plus an uppercase letter, a lowercase letter and a digit.
pub fn validate_password(password: &str) -> std::result::Result<(), ValidationError> {
    let failure = |message: &'static str| {
        Err(ValidationError::new("password").with_message(Cow::Borrowed(message)))
    };

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return failure("Password must be at least 8 characters");
    }
    if !password.chars().any(|c| c.is_uppercase()) {
        return failure("Password must contain one uppercase letter");
    }
    if !password.chars().any(|c| c.is_lowercase()) {
        return failure("Password must contain one lowercase letter");
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return failure("Password must contain one digit");
    }
    Ok(())
}

/// Sign-in credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl SignupRequest {
        pub fn example() -> Self {
            Self {
                username: "alice112".into(),
                email: "alice@example.com".into(),
                password: "Abc123xyz".into(),
                national_id: "1234567890".into(),
            }
        }

        pub fn example2() -> Self {
            Self {
                username: "bobthevoter".into(),
                email: "bob@example.com".into(),
                password: "Totally5ecure".into(),
                national_id: "0987654321".into(),
            }
        }
    }

    impl SigninRequest {
        pub fn example() -> Self {
            let signup = SignupRequest::example();
            Self {
                email: signup.email,
                password: signup.password,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        assert!(validate_password("abc").is_err());
        assert!(validate_password("abcdefgh1").is_err()); // No uppercase.
        assert!(validate_password("ABCDEFGH1").is_err()); // No lowercase.
        assert!(validate_password("Abcdefghi").is_err()); // No digit.
        assert!(validate_password("Abc12").is_err()); // Too short.
        assert!(validate_password("Abc123xyz").is_ok());
    }

    #[test]
    fn signup_validation() {
        assert!(SignupRequest::example().validated().is_ok());

        let weak = SignupRequest {
            password: "abc".into(),
            ..SignupRequest::example()
        };
        let err = weak.validated().unwrap_err();
        assert_eq!(err.status(), rocket::http::Status::BadRequest);

        let no_name = SignupRequest {
            username: "".into(),
            ..SignupRequest::example()
        };
        assert!(no_name.validated().is_err());

        let long_name = SignupRequest {
            username: "x".repeat(21),
            ..SignupRequest::example()
        };
        assert!(long_name.validated().is_err());

        let bad_email = SignupRequest {
            email: "not-an-email".into(),
            ..SignupRequest::example()
        };
        assert!(bad_email.validated().is_err());

        let short_id = SignupRequest {
            national_id: "123".into(),
            ..SignupRequest::example()
        };
        assert!(short_id.validated().is_err());
    }

    #[test]
    fn accepts_legacy_national_id_key() {
        let json = r#"{"username":"a","email":"a@b.co","password":"Abc123xyz","adharId":"1234567890"}"#;
        let request: SignupRequest = rocket::serde::json::serde_json::from_str(json).unwrap();
        assert_eq!(request.national_id, "1234567890");
    }
}

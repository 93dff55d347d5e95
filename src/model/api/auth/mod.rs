mod request;
mod token;
pub mod user;

use serde::{Deserialize, Serialize};

pub use request::{validate_password, SigninRequest, SignupRequest, MIN_PASSWORD_LENGTH};
pub use token::{AuthToken, AUTH_TOKEN_COOKIE};

/// Successful sign-in: the bearer token to present on later requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigninResponse {
    pub message: String,
    pub token: String,
}

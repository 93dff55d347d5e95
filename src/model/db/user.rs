use std::ops::{Deref, DerefMut};

use argon2::Config as Argon2Config;
use chrono::{DateTime, Utc};
use log::{info, warn};
use mongodb::bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    model::{
        api::auth::SignupRequest,
        common::role::Role,
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

/// Core user account data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCore {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub national_id: String,
    pub role: Role,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl UserCore {
    /// Create a new account from an already-validated signup request, hashing the password.
    pub fn new(request: SignupRequest, role: Role) -> Result<Self> {
        Ok(Self {
            username: request.username,
            email: request.email,
            password_hash: hash_password(&request.password)?,
            national_id: request.national_id,
            role,
            created_at: Utc::now(),
        })
    }

    /// Check whether the given password is correct.
    pub fn verify_password<T: AsRef<[u8]>>(&self, password: T) -> bool {
        // A malformed hash can never match.
        argon2::verify_encoded(&self.password_hash, password.as_ref()).unwrap_or(false)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Hash a plaintext password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String> {
    // 16 bytes is recommended for password hashing:
    //  https://en.wikipedia.org/wiki/Argon2
    let mut salt = [0_u8; 16];
    rand::thread_rng().fill(&mut salt);
    let hash = argon2::hash_encoded(password.as_bytes(), &salt, &Argon2Config::default())?;
    Ok(hash)
}

/// A user without an ID.
pub type NewUser = UserCore;

/// A user from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub user: UserCore,
}

impl Deref for User {
    type Target = UserCore;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl DerefMut for User {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.user
    }
}

/// Ensure that at least one admin account exists, creating the configured one if not.
pub async fn ensure_admin_exists(users: &Coll<NewUser>, config: &Config) -> Result<()> {
    let admins = users
        .count_documents(doc! { "role": Role::Admin }, None)
        .await?;
    if admins > 0 {
        return Ok(());
    }

    let admin = NewUser {
        username: config.admin_username().to_string(),
        email: config.admin_email().to_string(),
        password_hash: hash_password(config.admin_password())?,
        national_id: format!("admin-{}", config.admin_username()),
        role: Role::Admin,
        created_at: Utc::now(),
    };
    match users.insert_one(&admin, None).await {
        Ok(_) => {
            info!("Created default admin '{}'", admin.username);
            Ok(())
        }
        // Another instance won the race; that admin is just as good.
        Err(err) if is_duplicate_key_error(&err) => {
            warn!("Default admin '{}' already exists", admin.username);
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl UserCore {
        pub fn example() -> Self {
            Self::new(SignupRequest::example(), Role::Voter).unwrap()
        }

        pub fn example2() -> Self {
            Self::new(SignupRequest::example2(), Role::Voter).unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_round_trip() {
        let user = NewUser::example();
        assert!(user.verify_password(SignupRequest::example().password));
        assert!(!user.verify_password("Wrong1password"));
        assert!(!user.is_admin());
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("Abc123xyz").unwrap();
        let b = hash_password("Abc123xyz").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hash_never_verifies() {
        let mut user = NewUser::example();
        user.password_hash = "not a hash".to_string();
        assert!(!user.verify_password("anything"));
    }
}

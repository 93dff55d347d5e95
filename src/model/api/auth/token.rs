use std::marker::PhantomData;

use chrono::{serde::ts_seconds, DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, TokenData, Validation};
use log::debug;
use mongodb::Database;
use rocket::{
    http::{Cookie, SameSite, Status},
    request::{FromRequest, Outcome},
    time::Duration,
    Request, State,
};
use serde::{Deserialize, Serialize};

use crate::{
    config::Config,
    error::{guard_failure, Error, Result},
    model::{
        common::role::Role,
        db::user::User,
        mongodb::{Coll, Id},
    },
};

use super::user::Capability;

pub const AUTH_TOKEN_COOKIE: &str = "auth_token";
const BEARER_SCHEME: &str = "Bearer";

/// An authentication token representing a specific user, checked for capability `C`.
#[derive(Debug)]
pub struct AuthToken<C> {
    pub id: Id,
    pub role: Role,
    phantom: PhantomData<C>,
}

impl<C> AuthToken<C> {
    /// Create a token for the given user, carrying their current role.
    pub fn for_user(user: &User) -> Self {
        Self {
            id: user.id,
            role: user.role,
            phantom: PhantomData,
        }
    }

    /// Sign this token into a JWT that expires after the configured lifetime.
    pub fn encode(&self, config: &Config) -> Result<String> {
        let claims = Claims {
            id: self.id,
            role: self.role,
            expire_at: Utc::now() + config.auth_ttl(),
        };
        let token = jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(config.jwt_secret()),
        )?;
        Ok(token)
    }

    /// Verify a JWT's signature and expiry, recovering the token.
    pub fn decode(raw: &str, config: &Config) -> Result<Self> {
        let token = jsonwebtoken::decode(
            raw,
            &DecodingKey::from_secret(config.jwt_secret()),
            &Validation::default(),
        )
        .map(|claims: TokenData<Claims>| Self {
            id: claims.claims.id,
            role: claims.claims.role,
            phantom: PhantomData,
        })?;
        Ok(token)
    }

    /// Wrap an encoded JWT in a cookie, for browser clients.
    pub fn cookie(encoded: String, config: &Config) -> Cookie<'static> {
        Cookie::build((AUTH_TOKEN_COOKIE, encoded))
            .path("/")
            .max_age(Duration::seconds(config.auth_ttl().num_seconds()))
            .http_only(true)
            .same_site(SameSite::Strict)
            .build()
    }
}

/// JWT claims: the token itself plus an expiry datetime.
#[derive(Serialize, Deserialize)]
struct Claims {
    id: Id,
    #[serde(rename = "rgt")]
    role: Role,
    #[serde(rename = "exp", with = "ts_seconds")]
    expire_at: DateTime<Utc>,
}

/// The token of a `Bearer` authorization header. The scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case(BEARER_SCHEME) && !token.is_empty()).then_some(token)
}

/// Find the raw token: a bearer `Authorization` header first, then the cookie.
fn raw_token(req: &Request<'_>) -> Option<String> {
    req.headers()
        .get("Authorization")
        .find_map(bearer_token)
        .map(str::to_string)
        .or_else(|| {
            req.cookies()
                .get(AUTH_TOKEN_COOKIE)
                .map(|cookie| cookie.value().to_string())
        })
}

/// Fail the guard, leaving the reason for the catcher.
fn reject<T>(req: &Request<'_>, status: Status, msg: &str) -> Outcome<T, Error> {
    guard_failure(req, msg);
    Outcome::Error((status, Error::Status(status, msg.to_string())))
}

#[rocket::async_trait]
impl<'r, C> FromRequest<'r> for AuthToken<C>
where
    C: Capability + Send,
{
    type Error = Error;

    /// Get an [`AuthToken`] from the request and verify that its user holds capability `C`.
    async fn from_request(req: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        // Unwrap is safe as `Config` is always managed.
        let config = req.guard::<&State<Config>>().await.unwrap();

        let raw = match raw_token(req) {
            Some(raw) => raw,
            None => return reject(req, Status::Unauthorized, "No token provided"),
        };

        let mut token: Self = match Self::decode(&raw, config) {
            Ok(token) => token,
            Err(e) => {
                debug!("Rejected token: {e}");
                return reject(req, Status::Unauthorized, "Unauthorized");
            }
        };

        // Check the user still exists, and trust their stored role over the token's.
        let db = req.guard::<&State<Database>>().await.unwrap();
        match Coll::<User>::from_db(db).find_one(token.id.as_doc(), None).await {
            Ok(Some(user)) => token.role = user.role,
            Ok(None) => return reject(req, Status::Unauthorized, "Unauthorized"),
            Err(e) => return Outcome::Error((Status::InternalServerError, e.into())),
        }

        if !C::permits(token.role) {
            let msg = format!("{} access required", C::NAME);
            return reject(req, Status::Forbidden, &msg);
        }

        Outcome::Success(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::api::auth::user::{Admin, Voter};

    #[test]
    fn encode_decode() {
        let config = Config::example();
        let token = AuthToken::<Voter> {
            id: Id::new(),
            role: Role::Admin,
            phantom: PhantomData,
        };
        let raw = token.encode(&config).unwrap();

        let decoded = AuthToken::<Admin>::decode(&raw, &config).unwrap();
        assert_eq!(decoded.id, token.id);
        assert_eq!(decoded.role, Role::Admin);
    }

    #[test]
    fn bearer_scheme() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("bearer abc"), Some("abc"));
        assert_eq!(bearer_token("BEARER  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic dXNlcjpwdw=="), None);
        assert_eq!(bearer_token("Bearer"), None);
        assert_eq!(bearer_token("Bearer   "), None);
        assert_eq!(bearer_token("abc"), None);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let config = Config::example();
        let token = AuthToken::<Voter> {
            id: Id::new(),
            role: Role::Voter,
            phantom: PhantomData,
        };
        let raw = token.encode(&config).unwrap();

        let mut other = Config::example();
        other.jwt_secret = "a different secret".to_string();
        assert!(AuthToken::<Voter>::decode(&raw, &other).is_err());
        assert!(AuthToken::<Voter>::decode("garbage", &config).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let mut config = Config::example();
        // Well past the default validation leeway.
        config.auth_ttl = -600;
        let token = AuthToken::<Voter> {
            id: Id::new(),
            role: Role::Voter,
            phantom: PhantomData,
        };
        let raw = token.encode(&config).unwrap();
        let err = AuthToken::<Voter>::decode(&raw, &config).unwrap_err();
        assert_eq!(err.status(), Status::Unauthorized);
    }
}

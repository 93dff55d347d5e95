use argon2::Error as Argon2Error;
use jsonwebtoken::errors::{Error as JwtError, ErrorKind as JwtErrorKind};
use log::{error, warn};
use mongodb::error::Error as DbError;
use rocket::{
    http::{Status, StatusClass},
    response::{self, status, Responder},
    serde::json::{Error as JsonError, Json},
    Request,
};
use thiserror::Error;

use crate::model::api::message::Message;

pub type Result<T> = std::result::Result<T, Error>;

/// A JSON request body, kept as a `Result` so that malformed input becomes a
/// 400 through `?` rather than Rocket's own 422.
pub type JsonBody<'r, T> = std::result::Result<Json<T>, JsonError<'r>>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Jwt(#[from] JwtError),
    #[error(transparent)]
    Argon2(#[from] Argon2Error),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::Status(Status::BadRequest, msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Status(Status::Unauthorized, msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Status(Status::Forbidden, msg.into())
    }

    /// `what` names the missing resource, e.g. "Election 6423...".
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::Status(Status::NotFound, format!("{} not found", what.into()))
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Status(Status::Conflict, msg.into())
    }

    /// The HTTP status this error maps to.
    pub fn status(&self) -> Status {
        match self {
            Self::Status(status, _) => *status,
            Self::Db(_) | Self::Argon2(_) => Status::InternalServerError,
            Self::Jwt(err) => match err.kind() {
                JwtErrorKind::ExpiredSignature | JwtErrorKind::ImmatureSignature => {
                    Status::Unauthorized
                }
                _ => Status::InternalServerError,
            },
        }
    }

    /// The message shown to the client. Internal failures are never described in detail.
    pub fn public_message(&self) -> String {
        match self {
            Self::Status(_, msg) => msg.clone(),
            Self::Jwt(_) if self.status() == Status::Unauthorized => "Token expired".to_string(),
            _ => "Internal server error".to_string(),
        }
    }
}

impl From<JsonError<'_>> for Error {
    fn from(err: JsonError<'_>) -> Self {
        match err {
            JsonError::Io(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Self::Status(Status::PayloadTooLarge, "Request body too large".to_string())
            }
            JsonError::Io(e) => Self::bad_request(format!("Invalid input data: {e}")),
            JsonError::Parse(_, e) => Self::bad_request(format!("Invalid input data: {e}")),
        }
    }
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        match status.class() {
            StatusClass::ServerError => error!("{} {}: {self}", req.method(), req.uri()),
            _ => warn!("{} {}: {self}", req.method(), req.uri()),
        }
        status::Custom(status, Json(Message::new(self.public_message()))).respond_to(req)
    }
}

/// Message left behind by a failing request guard, picked up by the catchers.
#[derive(Debug, Default)]
pub struct GuardFailure(pub Option<String>);

/// Record why a guard failed so the catcher can report it.
pub fn guard_failure(req: &Request<'_>, msg: impl Into<String>) {
    let msg = msg.into();
    req.local_cache(|| GuardFailure(Some(msg)));
}

#[catch(default)]
pub fn default_catcher(status: Status, req: &Request<'_>) -> status::Custom<Json<Message>> {
    let msg = req
        .local_cache(GuardFailure::default)
        .0
        .clone()
        .unwrap_or_else(|| status.reason_lossy().to_string());
    status::Custom(status, Json(Message::new(msg)))
}

use log::info;
use mongodb::bson::doc;
use rocket::{http::CookieJar, serde::json::Json, Route, State};

use crate::{
    error::{Error, JsonBody, Result},
    model::{
        api::{
            auth::{
                user::Voter, AuthToken, SigninRequest, SigninResponse, SignupRequest,
                AUTH_TOKEN_COOKIE,
            },
            message::Message,
        },
        common::role::Role,
        db::user::{NewUser, User},
        mongodb::{is_duplicate_key_error, Coll},
    },
    Config,
};

pub fn routes() -> Vec<Route> {
    routes![signup, signin, logout]
}

/// Create an account with the given role, mapping uniqueness violations to a conflict.
pub(crate) async fn create_user(
    users: &Coll<NewUser>,
    request: SignupRequest,
    role: Role,
) -> Result<User> {
    let user = NewUser::new(request.validated()?, role)?;
    let result = users.insert_one(&user, None).await.map_err(|err| {
        if is_duplicate_key_error(&err) {
            Error::conflict("A user with this username, email or national ID already exists")
        } else {
            err.into()
        }
    })?;
    let id = super::common::inserted_id(result)?;
    info!("Created {} account '{}'", role, user.username);
    Ok(User { id, user })
}

#[post("/auth/signup", data = "<request>")]
pub async fn signup(
    request: JsonBody<'_, SignupRequest>,
    users: Coll<NewUser>,
) -> Result<Json<Message>> {
    create_user(&users, request?.0, Role::Voter).await?;
    Ok(Json(Message::new("Signup successful")))
}

#[post("/auth/signin", data = "<credentials>")]
pub async fn signin(
    cookies: &CookieJar<'_>,
    credentials: JsonBody<'_, SigninRequest>,
    users: Coll<User>,
    config: &State<Config>,
) -> Result<Json<SigninResponse>> {
    let credentials = credentials?.0;
    let with_email = doc! {
        "email": &credentials.email,
    };

    // Same failure whether the email or the password was wrong.
    let user = users
        .find_one(with_email, None)
        .await?
        .filter(|user| user.verify_password(&credentials.password))
        .ok_or_else(|| Error::unauthorized("Invalid email or password"))?;

    let token = AuthToken::<Voter>::for_user(&user).encode(config)?;
    cookies.add(AuthToken::<Voter>::cookie(token.clone(), config));

    Ok(Json(SigninResponse {
        message: "Signin successful".to_string(),
        token,
    }))
}

#[delete("/auth")]
pub fn logout(cookies: &CookieJar<'_>) -> Json<Message> {
    cookies.remove(AUTH_TOKEN_COOKIE);
    Json(Message::new("Signed out"))
}

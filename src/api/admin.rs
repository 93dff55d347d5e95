use rocket::{serde::json::Json, Route};

use crate::{
    error::{JsonBody, Result},
    model::{
        api::{
            auth::{user::Admin, AuthToken, SignupRequest},
            user::{ProfileResponse, UserProfile},
        },
        common::role::Role,
        db::user::NewUser,
        mongodb::Coll,
    },
};

use super::auth::create_user;

pub fn routes() -> Vec<Route> {
    routes![create_admin]
}

#[post("/admins", data = "<request>")]
async fn create_admin(
    _token: AuthToken<Admin>,
    request: JsonBody<'_, SignupRequest>,
    users: Coll<NewUser>,
) -> Result<Json<ProfileResponse>> {
    let admin = create_user(&users, request?.0, Role::Admin).await?;
    Ok(Json(ProfileResponse {
        message: "Admin created".to_string(),
        user: UserProfile::from(admin),
    }))
}

use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{
                user::{Admin, Capability, Voter},
                AuthToken,
            },
            user::{ProfileResponse, UserList, UserProfile},
        },
        db::user::User,
        mongodb::Coll,
    },
};

pub fn routes() -> Vec<Route> {
    routes![user_info, admin_info, list_users]
}

/// Load the profile of whoever holds the token.
async fn profile<C: Capability>(token: &AuthToken<C>, users: &Coll<User>) -> Result<UserProfile> {
    users
        .find_one(token.id.as_doc(), None)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| Error::not_found(format!("User {}", token.id)))
}

#[get("/info/user")]
async fn user_info(token: AuthToken<Voter>, users: Coll<User>) -> Result<Json<ProfileResponse>> {
    Ok(Json(ProfileResponse {
        message: "User details".to_string(),
        user: profile(&token, &users).await?,
    }))
}

#[get("/info/admin")]
async fn admin_info(token: AuthToken<Admin>, users: Coll<User>) -> Result<Json<ProfileResponse>> {
    Ok(Json(ProfileResponse {
        message: "Admin details".to_string(),
        user: profile(&token, &users).await?,
    }))
}

#[get("/info/users")]
async fn list_users(_token: AuthToken<Admin>, users: Coll<User>) -> Result<Json<UserList>> {
    let oldest_first = FindOptions::builder()
        .sort(doc! { "created_at": 1, "_id": 1 })
        .build();
    let users: Vec<UserProfile> = users
        .find(None, oldest_first)
        .await?
        .map_ok(UserProfile::from)
        .try_collect()
        .await?;
    Ok(Json(UserList {
        message: "Users".to_string(),
        users,
    }))
}

use rocket::{Catcher, Route};

mod admin;
mod auth;
mod candidate;
mod common;
mod election;
mod info;
mod vote;

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(auth::routes());
    routes.extend(admin::routes());
    routes.extend(election::routes());
    routes.extend(candidate::routes());
    routes.extend(vote::routes());
    routes.extend(info::routes());
    routes.extend(crate::cors::routes());
    routes
}

pub fn catchers() -> Vec<Catcher> {
    catchers![crate::error::default_catcher]
}

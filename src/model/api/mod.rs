pub mod auth;
pub mod candidate;
pub mod election;
pub mod id;
pub mod message;
pub mod results;
pub mod user;
pub mod vote;

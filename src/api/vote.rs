use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, serde::json::Json, Route};

use crate::{
    error::{Error, Result},
    model::{
        api::{
            auth::{
                user::{Admin, Voter},
                AuthToken,
            },
            vote::{voting_history, VoteCheck, VoteDetails, VotingHistory},
        },
        db::{
            election::Election,
            user::User,
            vote::{ballot_filter, Vote, VoteCore},
        },
        mongodb::{Coll, Id},
    },
};

pub fn routes() -> Vec<Route> {
    routes![check, my_history, user_history]
}

/// Whether `user_id` has voted in `election_id`, and if so for whom.
pub(crate) async fn vote_status(
    user_id: Id,
    election_id: Id,
    votes: &Coll<Vote>,
) -> Result<Json<VoteCheck>> {
    let vote = votes
        .find_one(ballot_filter(election_id, user_id), None)
        .await?;
    Ok(Json(VoteCheck {
        message: "Vote status".to_string(),
        has_voted: vote.is_some(),
        vote_details: vote.as_deref().map(VoteDetails::from),
    }))
}

/// Every election, paired with the user's ballot in it if there is one.
async fn history(
    user_id: Id,
    elections: &Coll<Election>,
    votes: &Coll<Vote>,
) -> Result<Json<VotingHistory>> {
    let newest_first = FindOptions::builder()
        .sort(doc! { "created_at": -1, "_id": -1 })
        .build();
    let elections: Vec<Election> = elections.find(None, newest_first).await?.try_collect().await?;
    let ballots: Vec<VoteCore> = votes
        .find(doc! { "user_id": user_id }, None)
        .await?
        .map_ok(|vote| vote.vote)
        .try_collect()
        .await?;
    Ok(Json(VotingHistory {
        message: "Voting history".to_string(),
        voting_history: voting_history(elections, &ballots),
    }))
}

#[get("/vote/check/<election_id>")]
async fn check(
    token: AuthToken<Voter>,
    election_id: Id,
    votes: Coll<Vote>,
) -> Result<Json<VoteCheck>> {
    vote_status(token.id, election_id, &votes).await
}

#[get("/vote/myhistory")]
async fn my_history(
    token: AuthToken<Voter>,
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<VotingHistory>> {
    history(token.id, &elections, &votes).await
}

#[get("/vote/history/<user_id>")]
async fn user_history(
    _token: AuthToken<Admin>,
    user_id: Id,
    users: Coll<User>,
    elections: Coll<Election>,
    votes: Coll<Vote>,
) -> Result<Json<VotingHistory>> {
    if users.find_one(user_id.as_doc(), None).await?.is_none() {
        return Err(Error::not_found(format!("User {user_id}")));
    }
    history(user_id, &elections, &votes).await
}

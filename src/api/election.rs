use log::info;
use mongodb::{
    bson::doc,
    options::FindOptions,
    Client, Database,
};
use rocket::{futures::TryStreamExt, serde::json::Json, Route, State};

use crate::{
    error::{Error, JsonBody, Result},
    model::{
        api::{
            auth::{
                user::{Admin, Voter},
                AuthToken,
            },
            candidate::CandidateDescription,
            election::{
                ElectionCreated, ElectionDescription, ElectionDetails, ElectionList,
                ElectionSpec, StatusChange,
            },
            message::Message,
            results::{compute_results, ElectionResults},
            vote::{VoteCast, VoteCheck},
        },
        common::election::ElectionStatus,
        db::{
            candidate::Candidate,
            election::{DeleteElection, Election, NewElection},
            vote::{CastVote, Vote},
        },
        mongodb::{run_transaction, Coll, Id},
    },
};

use super::common::{find_election, inserted_id};

pub fn routes() -> Vec<Route> {
    routes![
        list_elections,
        create_election,
        election_by_id,
        election_details,
        start_election,
        reset_election,
        complete_election,
        delete_election,
        cast_vote,
        check_vote,
        election_results,
    ]
}

#[get("/election?<status>")]
async fn list_elections(
    status: Option<ElectionStatus>,
    elections: Coll<Election>,
) -> Result<Json<ElectionList>> {
    let filter = status.map(|status| doc! { "status": status });
    let newest_first = FindOptions::builder()
        .sort(doc! { "created_at": -1, "_id": -1 })
        .build();
    let elections: Vec<ElectionDescription> = elections
        .find(filter, newest_first)
        .await?
        .map_ok(ElectionDescription::from)
        .try_collect()
        .await?;
    Ok(Json(ElectionList {
        message: "Elections".to_string(),
        elections,
    }))
}

#[post("/election/create", data = "<spec>")]
async fn create_election(
    token: AuthToken<Admin>,
    spec: JsonBody<'_, ElectionSpec>,
    new_elections: Coll<NewElection>,
) -> Result<Json<ElectionCreated>> {
    let election = NewElection::new(token.id, spec?.0.validated()?);
    let id = inserted_id(new_elections.insert_one(&election, None).await?)?;
    info!("Admin {} created election {id}", token.id);

    Ok(Json(ElectionCreated {
        message: "Election created".to_string(),
        election: Election { id, election }.into(),
    }))
}

async fn details(
    election_id: Id,
    elections: &Coll<Election>,
    candidates: &Coll<Candidate>,
) -> Result<Json<ElectionDetails>> {
    let election = find_election(elections, election_id).await?;
    let in_order_added = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let candidates: Vec<CandidateDescription> = candidates
        .find(doc! { "election_id": election_id }, in_order_added)
        .await?
        .map_ok(CandidateDescription::from)
        .try_collect()
        .await?;
    Ok(Json(ElectionDetails {
        message: "Election details".to_string(),
        election: election.into(),
        candidates,
    }))
}

#[get("/election/<election_id>")]
async fn election_by_id(
    election_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDetails>> {
    details(election_id, &elections, &candidates).await
}

#[get("/election/details/<election_id>")]
async fn election_details(
    election_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionDetails>> {
    details(election_id, &elections, &candidates).await
}

/// Set the status of an election owned by the caller. Any status may follow any other.
async fn set_status(
    token: AuthToken<Admin>,
    election_id: Id,
    status: ElectionStatus,
    elections: Coll<Election>,
) -> Result<Json<StatusChange>> {
    let filter = doc! {
        "_id": election_id,
        "creator_id": token.id,
    };
    let update = doc! {
        "$set": {
            "status": status,
        }
    };
    let result = elections.update_one(filter, update, None).await?;
    if result.matched_count == 0 {
        return Err(Error::not_found(format!("Election {election_id}")));
    }
    info!("Election {election_id} is now {status}");

    Ok(Json(StatusChange {
        message: "Election status updated".to_string(),
        status,
    }))
}

#[put("/election/status/start/<election_id>")]
async fn start_election(
    token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
) -> Result<Json<StatusChange>> {
    set_status(token, election_id, ElectionStatus::Active, elections).await
}

#[put("/election/status/upcoming/<election_id>")]
async fn reset_election(
    token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
) -> Result<Json<StatusChange>> {
    set_status(token, election_id, ElectionStatus::Upcoming, elections).await
}

#[put("/election/status/complete/<election_id>")]
async fn complete_election(
    token: AuthToken<Admin>,
    election_id: Id,
    elections: Coll<Election>,
) -> Result<Json<StatusChange>> {
    set_status(token, election_id, ElectionStatus::Completed, elections).await
}

#[delete("/election/delete/<election_id>")]
async fn delete_election(
    token: AuthToken<Admin>,
    election_id: Id,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<Json<Message>> {
    let deletion = DeleteElection {
        db,
        election_id,
        creator_id: token.id,
    };
    let (candidates, votes) = run_transaction(db_client, &deletion).await?;
    info!("Deleted election {election_id} with {candidates} candidates and {votes} votes");
    Ok(Json(Message::new("Election deleted")))
}

#[post("/election/vote/<election_id>/<candidate_id>")]
async fn cast_vote(
    token: AuthToken<Voter>,
    election_id: Id,
    candidate_id: Id,
    db: &State<Database>,
    db_client: &State<Client>,
) -> Result<Json<VoteCast>> {
    let vote = CastVote {
        db,
        election_id,
        candidate_id,
        user_id: token.id,
    };
    let recorded = run_transaction(db_client, &vote).await?;
    Ok(Json(recorded.into()))
}

#[get("/election/check-vote/<election_id>")]
async fn check_vote(
    token: AuthToken<Voter>,
    election_id: Id,
    votes: Coll<Vote>,
) -> Result<Json<VoteCheck>> {
    super::vote::vote_status(token.id, election_id, &votes).await
}

#[get("/election/<election_id>/results", rank = 2)]
async fn election_results(
    election_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<ElectionResults>> {
    let election = find_election(&elections, election_id).await?;
    if election.status != ElectionStatus::Completed {
        return Err(Error::bad_request(format!(
            "Election {election_id} is not completed"
        )));
    }

    let most_votes_first = FindOptions::builder()
        .sort(doc! { "vote_count": -1, "_id": 1 })
        .build();
    let candidates: Vec<Candidate> = candidates
        .find(doc! { "election_id": election_id }, most_votes_first)
        .await?
        .try_collect()
        .await?;
    Ok(Json(ElectionResults {
        message: "Election results".to_string(),
        total_votes: election.total_votes,
        results: compute_results(election.total_votes, candidates),
    }))
}

use log::info;
use mongodb::{bson::doc, options::FindOptions};
use rocket::{futures::TryStreamExt, http::Status, serde::json::Json, Route, State};

use crate::{
    error::{Error, JsonBody, Result},
    model::{
        api::{
            auth::{user::Admin, AuthToken},
            candidate::{
                check_capacity, CandidateAdded, CandidateBatch, CandidateDescription,
                CandidateList, CandidateSpec,
            },
        },
        db::{
            candidate::{Candidate, NewCandidate},
            election::Election,
        },
        mongodb::{Coll, Id},
    },
    Config,
};

use super::common::{inserted_id, object_id, owned_election};

pub fn routes() -> Vec<Route> {
    routes![add_candidate, add_candidates, list_candidates, delete_candidate]
}

#[post("/candidate/add/<election_id>", data = "<spec>")]
async fn add_candidate(
    token: AuthToken<Admin>,
    election_id: Id,
    spec: JsonBody<'_, CandidateSpec>,
    elections: Coll<Election>,
    new_candidates: Coll<NewCandidate>,
    config: &State<Config>,
) -> Result<Json<CandidateAdded>> {
    owned_election(&elections, election_id, token.id).await?;
    let existing = new_candidates
        .count_documents(doc! { "election_id": election_id }, None)
        .await?;
    check_capacity(existing, 1, config.max_candidates())?;

    let candidate = NewCandidate::new(election_id, spec?.0.validated()?);
    let id = inserted_id(new_candidates.insert_one(&candidate, None).await?)?;
    info!("Added candidate '{}' to election {election_id}", candidate.name);

    Ok(Json(CandidateAdded {
        message: "Candidate added".to_string(),
        candidate: Candidate { id, candidate }.into(),
    }))
}

#[post("/candidate/addcandidates/<election_id>", data = "<batch>")]
async fn add_candidates(
    token: AuthToken<Admin>,
    election_id: Id,
    batch: JsonBody<'_, CandidateBatch>,
    elections: Coll<Election>,
    new_candidates: Coll<NewCandidate>,
    config: &State<Config>,
) -> Result<Json<CandidateList>> {
    owned_election(&elections, election_id, token.id).await?;
    let existing = new_candidates
        .count_documents(doc! { "election_id": election_id }, None)
        .await?;
    let specs = batch?.0.validated(existing, config.max_candidates())?;

    let candidates: Vec<NewCandidate> = specs
        .into_iter()
        .map(|spec| NewCandidate::new(election_id, spec))
        .collect();
    let result = new_candidates.insert_many(&candidates, None).await?;
    info!(
        "Added {} candidates to election {election_id}",
        candidates.len()
    );

    let added = candidates
        .into_iter()
        .enumerate()
        .map(|(index, candidate)| -> Result<CandidateDescription> {
            let key = result.inserted_ids.get(&index).ok_or_else(|| {
                Error::Status(
                    Status::InternalServerError,
                    format!("Database returned no key for candidate {index}"),
                )
            })?;
            Ok(Candidate {
                id: object_id(key)?,
                candidate,
            }
            .into())
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Json(CandidateList {
        message: "Candidates added".to_string(),
        candidates: added,
    }))
}

#[get("/candidate/<election_id>")]
async fn list_candidates(
    election_id: Id,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateList>> {
    let in_order_added = FindOptions::builder().sort(doc! { "_id": 1 }).build();
    let candidates: Vec<CandidateDescription> = candidates
        .find(doc! { "election_id": election_id }, in_order_added)
        .await?
        .map_ok(CandidateDescription::from)
        .try_collect()
        .await?;
    Ok(Json(CandidateList {
        message: "Candidates".to_string(),
        candidates,
    }))
}

#[delete("/candidate/delete/<election_id>/<candidate_id>")]
async fn delete_candidate(
    token: AuthToken<Admin>,
    election_id: Id,
    candidate_id: Id,
    elections: Coll<Election>,
    candidates: Coll<Candidate>,
) -> Result<Json<CandidateAdded>> {
    owned_election(&elections, election_id, token.id).await?;
    let filter = doc! {
        "_id": candidate_id,
        "election_id": election_id,
    };
    let candidate = candidates
        .find_one_and_delete(filter, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("Candidate {candidate_id}")))?;
    info!("Removed candidate {candidate_id} from election {election_id}");

    Ok(Json(CandidateAdded {
        message: "Candidate deleted".to_string(),
        candidate: candidate.into(),
    }))
}

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use log::info;
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    ClientSession, Database,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        common::election::ElectionStatus,
        db::{candidate::Candidate, election::Election},
        mongodb::{is_duplicate_key_error, Coll, Id, Transaction},
    },
};

/// Core ballot data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteCore {
    pub election_id: Id,
    pub user_id: Id,
    pub candidate_id: Id,
    pub candidate_name: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub voted_at: DateTime<Utc>,
}

/// A vote without an ID.
pub type NewVote = VoteCore;

/// A vote from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub vote: VoteCore,
}

impl Deref for Vote {
    type Target = VoteCore;

    fn deref(&self) -> &Self::Target {
        &self.vote
    }
}

impl DerefMut for Vote {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.vote
    }
}

/// Filter matching the single vote a user may hold in an election.
pub fn ballot_filter(election_id: Id, user_id: Id) -> mongodb::bson::Document {
    doc! {
        "election_id": election_id,
        "user_id": user_id,
    }
}

/// Cast a single vote and update both tallies.
///
/// Every step reads and writes through the same session, so either the vote
/// record and both increments are committed together or none of them are.
/// The unique `(election_id, user_id)` index rejects a second ballot even if
/// two requests pass the existence check concurrently.
pub struct CastVote<'a> {
    pub db: &'a Database,
    pub election_id: Id,
    pub candidate_id: Id,
    pub user_id: Id,
}

#[rocket::async_trait]
impl Transaction for CastVote<'_> {
    type Output = NewVote;

    fn name(&self) -> &'static str {
        "vote casting"
    }

    async fn run(&self, session: &mut ClientSession) -> Result<Self::Output> {
        let elections = Coll::<Election>::from_db(self.db);

        // The election must exist and be open.
        let election = elections
            .find_one_with_session(self.election_id.as_doc(), None, session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Election {}", self.election_id)))?;
        if election.status != ElectionStatus::Active {
            return Err(Error::bad_request(format!(
                "Election {} is not active",
                self.election_id
            )));
        }

        // One ballot per user.
        let existing = Coll::<Vote>::from_db(self.db)
            .find_one_with_session(ballot_filter(self.election_id, self.user_id), None, session)
            .await?;
        if existing.is_some() {
            return Err(already_voted());
        }

        // The candidate must stand in this election.
        let in_election = doc! {
            "_id": self.candidate_id,
            "election_id": self.election_id,
        };
        let candidate = Coll::<Candidate>::from_db(self.db)
            .find_one_with_session(in_election.clone(), None, session)
            .await?
            .ok_or_else(|| Error::not_found(format!("Candidate {}", self.candidate_id)))?;

        let vote = NewVote {
            election_id: self.election_id,
            user_id: self.user_id,
            candidate_id: self.candidate_id,
            candidate_name: candidate.candidate.name,
            voted_at: Utc::now(),
        };
        Coll::<NewVote>::from_db(self.db)
            .insert_one_with_session(&vote, None, session)
            .await
            .map_err(|err| {
                if is_duplicate_key_error(&err) {
                    already_voted()
                } else {
                    err.into()
                }
            })?;

        let increment = doc! { "$inc": { "vote_count": 1 } };
        Coll::<Candidate>::from_db(self.db)
            .update_one_with_session(in_election, increment, None, session)
            .await?;

        // Only count the vote if the election is still open at write time.
        let still_active = doc! {
            "_id": self.election_id,
            "status": ElectionStatus::Active,
        };
        let increment = doc! { "$inc": { "total_votes": 1 } };
        let result = elections
            .update_one_with_session(still_active, increment, None, session)
            .await?;
        if result.matched_count != 1 {
            return Err(Error::bad_request(format!(
                "Election {} is not active",
                self.election_id
            )));
        }

        info!(
            "User {} voted in election {}",
            self.user_id, self.election_id
        );
        Ok(vote)
    }
}

fn already_voted() -> Error {
    Error::conflict("User has already voted in this election")
}

use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::{
    bson::{doc, serde_helpers::chrono_datetime_as_bson_datetime},
    ClientSession, Database,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::election::ElectionSpec,
        common::election::ElectionStatus,
        db::{candidate::Candidate, vote::Vote},
        mongodb::{Coll, Id, Transaction},
    },
};

/// Core election data, as stored in the database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCore {
    /// The admin who created, and therefore owns, this election.
    pub creator_id: Id,
    pub title: String,
    pub description: String,
    pub total_votes: u64,
    pub status: ElectionStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ElectionCore {
    /// A fresh upcoming election with no votes.
    pub fn new(creator_id: Id, spec: ElectionSpec) -> Self {
        Self {
            creator_id,
            title: spec.title,
            description: spec.description,
            total_votes: 0,
            status: ElectionStatus::Upcoming,
            created_at: Utc::now(),
        }
    }
}

/// An election without an ID.
pub type NewElection = ElectionCore;

/// An election from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionCore,
}

impl Deref for Election {
    type Target = ElectionCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for Election {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}

/// Delete an election owned by `creator_id`, together with all of its candidates and votes.
pub struct DeleteElection<'a> {
    pub db: &'a Database,
    pub election_id: Id,
    pub creator_id: Id,
}

#[rocket::async_trait]
impl Transaction for DeleteElection<'_> {
    /// Number of (candidates, votes) removed alongside the election.
    type Output = (u64, u64);

    fn name(&self) -> &'static str {
        "election deletion"
    }

    async fn run(&self, session: &mut ClientSession) -> Result<Self::Output> {
        let owned = doc! {
            "_id": self.election_id,
            "creator_id": self.creator_id,
        };
        let deleted = Coll::<Election>::from_db(self.db)
            .delete_one_with_session(owned, None, session)
            .await?;
        if deleted.deleted_count == 0 {
            return Err(Error::not_found(format!("Election {}", self.election_id)));
        }

        let belongs = doc! { "election_id": self.election_id };
        let candidates = Coll::<Candidate>::from_db(self.db)
            .delete_many_with_session(belongs.clone(), None, session)
            .await?;
        let votes = Coll::<Vote>::from_db(self.db)
            .delete_many_with_session(belongs, None, session)
            .await?;

        Ok((candidates.deleted_count, votes.deleted_count))
    }
}

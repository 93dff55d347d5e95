use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{
        api::{candidate::CandidateDescription, id::ApiId},
        common::election::ElectionStatus,
        db::election::Election,
    },
};

/// An election specification, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionSpec {
    pub title: String,
    #[serde(default)]
    pub description: String,
}

impl ElectionSpec {
    /// Reject blank titles; trims surrounding whitespace.
    pub fn validated(mut self) -> Result<Self> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(Error::bad_request("Election title must not be empty"));
        }
        Ok(self)
    }
}

/// An API-friendly election description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionDescription {
    pub id: ApiId,
    pub creator_id: ApiId,
    pub title: String,
    pub description: String,
    pub total_votes: u64,
    pub status: ElectionStatus,
    pub created_at: DateTime<Utc>,
}

impl From<Election> for ElectionDescription {
    fn from(election: Election) -> Self {
        Self {
            id: election.id.into(),
            creator_id: election.election.creator_id.into(),
            title: election.election.title,
            description: election.election.description,
            total_votes: election.election.total_votes,
            status: election.election.status,
            created_at: election.election.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionCreated {
    pub message: String,
    pub election: ElectionDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionList {
    pub message: String,
    pub elections: Vec<ElectionDescription>,
}

/// An election together with its candidates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDetails {
    pub message: String,
    pub election: ElectionDescription,
    pub candidates: Vec<CandidateDescription>,
}

/// Result of a status transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub message: String,
    pub status: ElectionStatus,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl ElectionSpec {
        pub fn example() -> Self {
            Self {
                title: "Student council".to_string(),
                description: "Annual student council election".to_string(),
            }
        }
    }
}

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    api::id::ApiId,
    common::election::ElectionStatus,
    db::{election::Election, vote::VoteCore},
    mongodb::Id,
};

/// When, and for whom, a ballot was cast.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteDetails {
    pub voted_at: DateTime<Utc>,
    pub candidate_name: String,
}

impl From<&VoteCore> for VoteDetails {
    fn from(vote: &VoteCore) -> Self {
        Self {
            voted_at: vote.voted_at,
            candidate_name: vote.candidate_name.clone(),
        }
    }
}

/// Whether the caller has voted in an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCheck {
    pub message: String,
    pub has_voted: bool,
    pub vote_details: Option<VoteDetails>,
}

/// A successfully recorded ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteCast {
    pub message: String,
    pub election_id: ApiId,
    pub candidate_id: ApiId,
    pub candidate_name: String,
    pub voted_at: DateTime<Utc>,
}

impl From<VoteCore> for VoteCast {
    fn from(vote: VoteCore) -> Self {
        Self {
            message: "Vote cast successfully".to_string(),
            election_id: vote.election_id.into(),
            candidate_id: vote.candidate_id.into(),
            candidate_name: vote.candidate_name,
            voted_at: vote.voted_at,
        }
    }
}

/// A user's standing in one election: whether, and how, they voted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub election_id: ApiId,
    pub election_title: String,
    pub election_status: ElectionStatus,
    pub has_voted: bool,
    pub vote_details: Option<VoteDetails>,
}

/// Pair every election with the user's ballot in it, if any.
pub fn voting_history(elections: Vec<Election>, votes: &[VoteCore]) -> Vec<HistoryEntry> {
    let ballots: HashMap<Id, &VoteCore> = votes.iter().map(|v| (v.election_id, v)).collect();
    elections
        .into_iter()
        .map(|election| {
            let vote_details = ballots.get(&election.id).map(|v| VoteDetails::from(*v));
            HistoryEntry {
                election_id: election.id.into(),
                election_title: election.election.title,
                election_status: election.election.status,
                has_voted: vote_details.is_some(),
                vote_details,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingHistory {
    pub message: String,
    pub voting_history: Vec<HistoryEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::db::election::ElectionCore;

    #[test]
    fn history_covers_every_election() {
        let creator = Id::new();
        let voted = Election {
            id: Id::new(),
            election: ElectionCore::example_with_status(creator, ElectionStatus::Completed),
        };
        let skipped = Election {
            id: Id::new(),
            election: ElectionCore::example(creator),
        };
        let vote = VoteCore {
            election_id: voted.id,
            user_id: Id::new(),
            candidate_id: Id::new(),
            candidate_name: "Alice".to_string(),
            voted_at: Utc::now(),
        };

        let history = voting_history(vec![voted.clone(), skipped.clone()], &[vote.clone()]);
        assert_eq!(history.len(), 2);
        assert!(history[0].has_voted);
        assert_eq!(history[0].election_status, ElectionStatus::Completed);
        assert_eq!(
            history[0].vote_details.as_ref().map(|d| d.candidate_name.as_str()),
            Some("Alice")
        );
        assert!(!history[1].has_voted);
        assert!(history[1].vote_details.is_none());
    }
}

use serde::{Deserialize, Serialize};

use crate::{
    error::{Error, Result},
    model::{api::id::ApiId, db::candidate::Candidate},
};

/// A candidate specification, as submitted by an admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl CandidateSpec {
    pub fn validated(mut self) -> Result<Self> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(Error::bad_request("Candidate name must not be empty"));
        }
        Ok(self)
    }
}

/// Several candidates submitted at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateBatch {
    pub candidates: Vec<CandidateSpec>,
}

impl CandidateBatch {
    /// Validate each candidate, and the batch as a whole against the room left in the election.
    pub fn validated(self, existing: u64, max: u64) -> Result<Vec<CandidateSpec>> {
        if self.candidates.is_empty() {
            return Err(Error::bad_request(
                "Invalid input: 'candidates' must be a non-empty array",
            ));
        }
        check_capacity(existing, self.candidates.len() as u64, max)?;
        self.candidates
            .into_iter()
            .map(CandidateSpec::validated)
            .collect()
    }
}

/// Fail if adding `adding` candidates to `existing` would exceed `max`.
pub fn check_capacity(existing: u64, adding: u64, max: u64) -> Result<()> {
    if existing + adding > max {
        return Err(Error::bad_request(format!(
            "An election may have at most {max} candidates ({existing} already present)"
        )));
    }
    Ok(())
}

/// An API-friendly candidate description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateDescription {
    pub id: ApiId,
    pub election_id: ApiId,
    pub name: String,
    pub description: String,
    pub vote_count: u64,
}

impl From<Candidate> for CandidateDescription {
    fn from(candidate: Candidate) -> Self {
        Self {
            id: candidate.id.into(),
            election_id: candidate.candidate.election_id.into(),
            name: candidate.candidate.name,
            description: candidate.candidate.description,
            vote_count: candidate.candidate.vote_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateAdded {
    pub message: String,
    pub candidate: CandidateDescription,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateList {
    pub message: String,
    pub candidates: Vec<CandidateDescription>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> CandidateSpec {
        CandidateSpec {
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[test]
    fn batch_rules() {
        let empty = CandidateBatch { candidates: vec![] };
        assert!(empty.validated(0, 10).is_err());

        let batch = CandidateBatch {
            candidates: vec![spec("Alice"), spec("Bob")],
        };
        assert_eq!(batch.clone().validated(8, 10).unwrap().len(), 2);
        assert!(batch.validated(9, 10).is_err());

        let blank = CandidateBatch {
            candidates: vec![spec("Alice"), spec(" ")],
        };
        assert!(blank.validated(0, 10).is_err());
    }

    #[test]
    fn capacity() {
        assert!(check_capacity(9, 1, 10).is_ok());
        assert!(check_capacity(10, 1, 10).is_err());
    }
}

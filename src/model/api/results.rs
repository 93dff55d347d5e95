use serde::{Deserialize, Serialize};

use crate::model::db::candidate::Candidate;

/// One line of an election's results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateResult {
    pub name: String,
    pub description: String,
    pub votes: u64,
    /// Share of the total vote, fixed to two decimal places.
    pub percentage: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectionResults {
    pub message: String,
    pub total_votes: u64,
    pub results: Vec<CandidateResult>,
}

/// Tabulate candidates by descending vote count.
///
/// Percentages are taken against `total_votes`; an election with no votes
/// reports `"0.00"` for everyone. Tied candidates keep their given order.
pub fn compute_results(total_votes: u64, mut candidates: Vec<Candidate>) -> Vec<CandidateResult> {
    candidates.sort_by(|a, b| b.vote_count.cmp(&a.vote_count));
    candidates
        .into_iter()
        .map(|candidate| {
            let share = if total_votes == 0 {
                0.0
            } else {
                candidate.vote_count as f64 * 100.0 / total_votes as f64
            };
            CandidateResult {
                votes: candidate.vote_count,
                name: candidate.candidate.name,
                description: candidate.candidate.description,
                percentage: format!("{share:.2}"),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{db::candidate::CandidateCore, mongodb::Id};

    fn candidates(election_id: Id, tallies: &[(&str, u64)]) -> Vec<Candidate> {
        tallies
            .iter()
            .map(|(name, votes)| Candidate {
                id: Id::new(),
                candidate: CandidateCore::example(election_id, name, *votes),
            })
            .collect()
    }

    #[test]
    fn sorted_with_percentages() {
        let election_id = Id::new();
        let input = candidates(election_id, &[("B", 35), ("C", 25), ("A", 40)]);

        let results = compute_results(100, input);
        let summary: Vec<_> = results
            .iter()
            .map(|r| (r.name.as_str(), r.votes, r.percentage.as_str()))
            .collect();
        assert_eq!(
            summary,
            vec![("A", 40, "40.00"), ("B", 35, "35.00"), ("C", 25, "25.00")]
        );
    }

    #[test]
    fn ties_keep_their_order() {
        let input = candidates(Id::new(), &[("C", 2), ("A", 5), ("B", 2), ("D", 2)]);
        let names: Vec<_> = compute_results(11, input)
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["A", "C", "B", "D"]);
    }

    #[test]
    fn thirds_are_rounded() {
        let input = candidates(Id::new(), &[("A", 1), ("B", 2)]);
        let results = compute_results(3, input);
        assert_eq!(results[0].percentage, "66.67");
        assert_eq!(results[1].percentage, "33.33");
    }

    #[test]
    fn no_votes_is_zero_percent() {
        let input = candidates(Id::new(), &[("A", 0), ("B", 0)]);
        let results = compute_results(0, input);
        assert!(results.iter().all(|r| r.percentage == "0.00"));
        assert!(compute_results(0, Vec::new()).is_empty());
    }
}

/// Vote tallying for a single round.
///
/// Tallying is pure and deterministic: it never mutates the round, so it is
/// safe to run repeatedly, including on closed rounds for re-display.
use crate::model::{Round, Selection};
use itertools::Itertools;
use std::collections::BTreeMap;

/// Computed counts for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTally {
    /// Per-candidate counts, pre-populated from the round roster so a
    /// candidate with zero votes still appears.
    pub votes_by_candidate: BTreeMap<String, u32>,
    pub blank: u32,
    pub spoiled: u32,
    /// Sum of per-candidate counts only; blank and spoiled are excluded.
    pub valid_total: u32,
}

impl RoundTally {
    /// Sorted candidate/count pairs, highest count first. Equal counts keep
    /// candidate-id order. This is the projection the presentation layer
    /// consumes.
    pub fn ranked(&self) -> Vec<(String, u32)> {
        self.votes_by_candidate
            .iter()
            .map(|(id, count)| (id.clone(), *count))
            .sorted_by(|a, b| b.1.cmp(&a.1))
            .collect()
    }
}

/// Count the ballots of a round against its roster.
///
/// Blank and spoiled sentinels are totaled separately. A selection naming a
/// candidate no longer on the roster is dropped from valid totals; stale
/// ballots are expected after cross-seat pruning and are not an error.
pub fn tally(round: &Round) -> RoundTally {
    let mut votes_by_candidate: BTreeMap<String, u32> = round
        .candidatos
        .iter()
        .map(|c| (c.user_id.clone(), 0))
        .collect();

    let mut blank = 0;
    let mut spoiled = 0;

    for ballot in &round.votos {
        match &ballot.selection {
            Selection::Blank => blank += 1,
            Selection::Spoiled => spoiled += 1,
            Selection::Candidate(id) => {
                if let Some(count) = votes_by_candidate.get_mut(id) {
                    *count += 1;
                }
            }
        }
    }

    let valid_total = votes_by_candidate.values().sum();

    RoundTally {
        votes_by_candidate,
        blank,
        spoiled,
        valid_total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Ballot, Candidate, RoundStatus};

    fn candidate(id: &str) -> Candidate {
        Candidate {
            user_id: id.to_string(),
            nome: format!("Member {}", id),
        }
    }

    fn vote(voter: &str, selection: Selection) -> Ballot {
        Ballot {
            voter_id: voter.to_string(),
            selection,
        }
    }

    fn round_with(candidates: &[&str], votos: Vec<Ballot>) -> Round {
        Round {
            numero: 1,
            candidatos: candidates.iter().map(|id| candidate(id)).collect(),
            votos,
            status: RoundStatus::Closed,
        }
    }

    #[test]
    fn zero_vote_candidates_still_appear() {
        let round = round_with(
            &["a", "b"],
            vec![vote("v1", Selection::Candidate("a".to_string()))],
        );
        let result = tally(&round);

        assert_eq!(result.votes_by_candidate["a"], 1);
        assert_eq!(result.votes_by_candidate["b"], 0);
        assert_eq!(result.valid_total, 1);
    }

    #[test]
    fn sentinels_are_counted_apart_from_valid_votes() {
        let round = round_with(
            &["a"],
            vec![
                vote("v1", Selection::Candidate("a".to_string())),
                vote("v2", Selection::Blank),
                vote("v3", Selection::Blank),
                vote("v4", Selection::Spoiled),
            ],
        );
        let result = tally(&round);

        assert_eq!(result.blank, 2);
        assert_eq!(result.spoiled, 1);
        assert_eq!(result.valid_total, 1);
    }

    #[test]
    fn stale_selections_are_dropped_from_valid_totals() {
        // "ghost" was pruned from the roster after this ballot was cast.
        let round = round_with(
            &["a"],
            vec![
                vote("v1", Selection::Candidate("a".to_string())),
                vote("v2", Selection::Candidate("ghost".to_string())),
            ],
        );
        let result = tally(&round);

        assert_eq!(result.valid_total, 1);
        assert!(!result.votes_by_candidate.contains_key("ghost"));
    }

    #[test]
    fn tally_is_idempotent() {
        let round = round_with(
            &["a", "b"],
            vec![
                vote("v1", Selection::Candidate("a".to_string())),
                vote("v2", Selection::Candidate("b".to_string())),
                vote("v3", Selection::Blank),
            ],
        );

        assert_eq!(tally(&round), tally(&round));
    }

    #[test]
    fn ranked_sorts_by_count_descending() {
        let round = round_with(
            &["a", "b", "c"],
            vec![
                vote("v1", Selection::Candidate("b".to_string())),
                vote("v2", Selection::Candidate("b".to_string())),
                vote("v3", Selection::Candidate("c".to_string())),
            ],
        );
        let ranked = tally(&round).ranked();

        assert_eq!(
            ranked,
            vec![
                ("b".to_string(), 2),
                ("c".to_string(), 1),
                ("a".to_string(), 0),
            ]
        );
    }

    #[test]
    fn equal_counts_rank_in_candidate_id_order() {
        let round = round_with(
            &["c", "a", "b"],
            vec![
                vote("v1", Selection::Candidate("c".to_string())),
                vote("v2", Selection::Candidate("a".to_string())),
            ],
        );
        let ranked = tally(&round).ranked();

        assert_eq!(ranked[0], ("a".to_string(), 1));
        assert_eq!(ranked[1], ("c".to_string(), 1));
        assert_eq!(ranked[2], ("b".to_string(), 0));
    }
}

/// Round advancement rules: winner declaration, round-3 roster selection,
/// and the cross-seat consistency rule.
use crate::model::{Candidate, RoundStatus, Seat, ROUNDS_PER_SEAT};
use crate::tally::RoundTally;
use std::collections::HashSet;

/// Decide the winner of a round from its tally, if any.
///
/// Rounds 1 and 2 require an absolute majority: strictly more than half of
/// the valid votes. A candidate sitting at exactly half does not win. Round 3
/// is decided by plurality: the first-ranked maximum wins, and a first-place
/// tie resolves to the lowest candidate id (tie-break policy still pending,
/// see DESIGN.md).
pub fn decide_winner(round_number: u8, tally: &RoundTally) -> Option<String> {
    if tally.valid_total == 0 {
        return None;
    }

    if round_number < ROUNDS_PER_SEAT {
        tally
            .votes_by_candidate
            .iter()
            .find(|(_, &count)| count * 2 > tally.valid_total)
            .map(|(id, _)| id.clone())
    } else {
        tally.ranked().into_iter().next().map(|(id, _)| id)
    }
}

/// Select the roster entering round 3 from the closed round-2 results.
///
/// Ranking rules, in order:
/// - a roster of two or fewer advances unchanged;
/// - a tie for first place advances everyone tied for first and drops the
///   nominal second place;
/// - a sole first place with a tie for second advances the first plus all
///   candidates tied for second;
/// - otherwise exactly the top two advance.
///
/// Candidates who already won another seat are excluded afterwards, so the
/// result may be empty; the coordinator treats that as a policy violation
/// rather than opening a contest-less round.
pub fn select_runoff_roster(
    round2_tally: &RoundTally,
    round2_roster: &[Candidate],
    already_elected: &HashSet<String>,
) -> Vec<Candidate> {
    let ranked = round2_tally.ranked();

    let advancing_ids: Vec<String> = if ranked.len() <= 2 {
        ranked.into_iter().map(|(id, _)| id).collect()
    } else {
        let first_count = ranked[0].1;
        let second_count = ranked[1].1;

        let tied_first: Vec<&(String, u32)> =
            ranked.iter().filter(|(_, c)| *c == first_count).collect();
        let tied_second: Vec<&(String, u32)> =
            ranked.iter().filter(|(_, c)| *c == second_count).collect();

        if tied_first.len() > 1 {
            tied_first.into_iter().map(|(id, _)| id.clone()).collect()
        } else if tied_second.len() > 1 {
            tied_first
                .into_iter()
                .chain(tied_second.into_iter())
                .map(|(id, _)| id.clone())
                .collect()
        } else {
            vec![ranked[0].0.clone(), ranked[1].0.clone()]
        }
    };

    // The round-2 roster is the source of truth for candidate data.
    advancing_ids
        .into_iter()
        .filter(|id| !already_elected.contains(id))
        .filter_map(|id| round2_roster.iter().find(|c| c.user_id == id).cloned())
        .collect()
}

/// Candidate ids holding a declared win on any seat.
pub fn elected_candidate_ids(seats: &[Seat]) -> HashSet<String> {
    seats
        .iter()
        .filter_map(|s| s.winner.as_ref())
        .map(|w| w.user_id.clone())
        .collect()
}

/// Remove a freshly declared winner from every other seat still in play.
///
/// Seats with their own winner are frozen and skipped. Within a pruned seat,
/// only rounds that have not started are rewritten; a candidate who already
/// received votes in an open or closed round stays on that round's roster.
pub fn prune_winner_from_seats(seats: &mut [Seat], winner_id: &str, winning_seat_id: &str) {
    for seat in seats.iter_mut() {
        if seat.id == winning_seat_id || seat.winner.is_some() {
            continue;
        }

        seat.initial_candidates.retain(|c| c.user_id != winner_id);

        for round in seat.rounds.iter_mut() {
            if round.status == RoundStatus::NotStarted {
                round.candidatos.retain(|c| c.user_id != winner_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{seed_rounds, SeatTitle};
    use crate::tally::RoundTally;
    use std::collections::BTreeMap;

    fn candidate(id: &str) -> Candidate {
        Candidate {
            user_id: id.to_string(),
            nome: format!("Member {}", id),
        }
    }

    fn tally_of(counts: &[(&str, u32)]) -> RoundTally {
        let votes_by_candidate: BTreeMap<String, u32> = counts
            .iter()
            .map(|(id, count)| (id.to_string(), *count))
            .collect();
        let valid_total = votes_by_candidate.values().sum();
        RoundTally {
            votes_by_candidate,
            blank: 0,
            spoiled: 0,
            valid_total,
        }
    }

    #[test]
    fn majority_win_requires_strictly_more_than_half() {
        // 6 of 10 valid votes is a majority.
        let winner = decide_winner(1, &tally_of(&[("a", 6), ("b", 4)]));
        assert_eq!(winner, Some("a".to_string()));

        // 5 of 10 is exactly half and does not win.
        let winner = decide_winner(2, &tally_of(&[("a", 5), ("b", 5)]));
        assert_eq!(winner, None);
    }

    #[test]
    fn no_winner_without_valid_votes() {
        assert_eq!(decide_winner(1, &tally_of(&[("a", 0), ("b", 0)])), None);
        assert_eq!(decide_winner(3, &tally_of(&[("a", 0), ("b", 0)])), None);
    }

    #[test]
    fn round_three_is_decided_by_plurality() {
        let winner = decide_winner(3, &tally_of(&[("a", 3), ("b", 5), ("c", 2)]));
        assert_eq!(winner, Some("b".to_string()));
    }

    #[test]
    fn small_rosters_advance_unchanged() {
        let roster = vec![candidate("a"), candidate("b")];
        let selected =
            select_runoff_roster(&tally_of(&[("a", 1), ("b", 7)]), &roster, &HashSet::new());
        assert_eq!(selected, roster);
    }

    #[test]
    fn tie_for_first_drops_the_nominal_second_place() {
        let roster = vec![candidate("a"), candidate("b"), candidate("c")];
        let selected = select_runoff_roster(
            &tally_of(&[("a", 10), ("b", 10), ("c", 5)]),
            &roster,
            &HashSet::new(),
        );

        let ids: Vec<&str> = selected.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn tie_for_second_expands_the_runoff() {
        let roster = vec![candidate("a"), candidate("b"), candidate("c")];
        let selected = select_runoff_roster(
            &tally_of(&[("a", 10), ("b", 5), ("c", 5)]),
            &roster,
            &HashSet::new(),
        );

        let ids: Vec<&str> = selected.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn clear_ranking_advances_exactly_the_top_two() {
        let roster = vec![candidate("a"), candidate("b"), candidate("c")];
        let selected = select_runoff_roster(
            &tally_of(&[("a", 10), ("b", 5), ("c", 2)]),
            &roster,
            &HashSet::new(),
        );

        let ids: Vec<&str> = selected.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn candidates_elected_elsewhere_are_excluded() {
        let roster = vec![candidate("a"), candidate("b"), candidate("c")];
        let elected: HashSet<String> = vec!["a".to_string()].into_iter().collect();
        let selected = select_runoff_roster(
            &tally_of(&[("a", 10), ("b", 5), ("c", 2)]),
            &roster,
            &elected,
        );

        let ids: Vec<&str> = selected.iter().map(|c| c.user_id.as_str()).collect();
        assert_eq!(ids, vec!["b"]);
    }

    #[test]
    fn exclusion_can_empty_the_selection() {
        let roster = vec![candidate("a"), candidate("b")];
        let elected: HashSet<String> = vec!["a".to_string(), "b".to_string()]
            .into_iter()
            .collect();
        let selected =
            select_runoff_roster(&tally_of(&[("a", 3), ("b", 2)]), &roster, &elected);
        assert!(selected.is_empty());
    }

    fn seat_with(id: &str, titulo: SeatTitle, roster: &[Candidate]) -> Seat {
        Seat {
            id: id.to_string(),
            titulo,
            initial_candidates: roster.to_vec(),
            rounds: seed_rounds(roster),
            winner: None,
        }
    }

    #[test]
    fn pruning_skips_started_rounds_and_frozen_seats() {
        let roster = vec![candidate("u"), candidate("x")];
        let mut seats = vec![
            seat_with("sx", SeatTitle::President, &roster),
            seat_with("sy", SeatTitle::VicePresident, &roster),
            seat_with("sz", SeatTitle::Treasurer, &roster),
            seat_with("sw", SeatTitle::FirstSecretary, &roster),
        ];

        // Seat X just declared "u" the winner; seat Z's round 1 is mid-vote;
        // seat W already has its own winner.
        seats[0].winner = Some(candidate("u"));
        seats[2].round_mut(1).unwrap().status = RoundStatus::Open;
        seats[3].winner = Some(candidate("x"));

        prune_winner_from_seats(&mut seats, "u", "sx");

        // Winning seat untouched.
        assert!(seats[0].initial_candidates.iter().any(|c| c.user_id == "u"));

        // Not-started sibling loses the winner everywhere.
        assert!(seats[1].initial_candidates.iter().all(|c| c.user_id != "u"));
        assert!(seats[1]
            .rounds
            .iter()
            .all(|r| r.candidatos.iter().all(|c| c.user_id != "u")));

        // The open round keeps its roster; the seat's later rounds do not.
        assert!(seats[2]
            .round(1)
            .unwrap()
            .candidatos
            .iter()
            .any(|c| c.user_id == "u"));
        assert!(seats[2]
            .round(2)
            .unwrap()
            .candidatos
            .iter()
            .all(|c| c.user_id != "u"));

        // Frozen seat untouched.
        assert!(seats[3].initial_candidates.iter().any(|c| c.user_id == "u"));
    }

    #[test]
    fn elected_ids_collects_winners_across_seats() {
        let roster = vec![candidate("u"), candidate("x")];
        let mut seats = vec![
            seat_with("sx", SeatTitle::President, &roster),
            seat_with("sy", SeatTitle::VicePresident, &roster),
        ];
        seats[0].winner = Some(candidate("u"));

        let elected = elected_candidate_ids(&seats);
        assert!(elected.contains("u"));
        assert!(!elected.contains("x"));
    }
}

/// The election state coordinator.
///
/// Every mutating operation here is a single read-modify-write transaction
/// against the shared election document: load a versioned snapshot, apply
/// the mutation to an owned copy, and commit with a compare-and-swap. A
/// version conflict retries the whole transaction up to a fixed bound; a
/// precondition failure aborts immediately and is never retried.
use crate::identity::IdentityProvider;
use crate::model::{
    seed_rounds, Ballot, Candidate, Election, ElectionDefinition, ElectionStatus, OpenVoting,
    Round, RoundStatus, Seat, SeatTitle, Selection, ROUNDS_PER_SEAT,
};
use crate::rules;
use crate::store::{CommitOutcome, ElectionStore, StoreError};
use crate::tally::{self, RoundTally};
use crate::util;
use std::collections::HashSet;

/// How many compare-and-swap attempts a transaction makes before giving up.
pub const MAX_COMMIT_ATTEMPTS: u32 = 5;

/// A precondition violation: the operation was invoked in a state that
/// forbids it. Carried verbatim to the caller so a rejected vote can be told
/// apart from a system failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Rejection {
    #[error("another round is already open for voting")]
    AnotherRoundOpen,
    #[error("round {0} was already opened before and cannot be reopened")]
    RoundAlreadyStarted(u8),
    #[error("round {0} is not open for voting")]
    RoundNotOpen(u8),
    #[error("voter is not on the eligible roster for this election")]
    VoterNotEligible,
    #[error("voter has already cast a ballot in this round")]
    AlreadyVoted,
    #[error("round 2 must be closed before the runoff can be prepared")]
    RoundTwoNotClosed,
    #[error("the runoff roster has already been prepared")]
    RunoffAlreadyPrepared,
    #[error("round 3 has no roster yet; prepare the runoff first")]
    RunoffNotPrepared,
    #[error("seat already has a declared winner")]
    SeatAlreadyDecided,
    #[error("no candidate may enter round 3: every selected candidate already won another seat")]
    NoValidRunoffRoster,
    #[error("no missed winner was found in the closed rounds")]
    NoMissedWinner,
    #[error("invalid election definition: {0}")]
    InvalidDefinition(String),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("operation rejected: {0}")]
    Rejected(#[from] Rejection),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("write conflict persisted after {attempts} attempts, try again")]
    Conflict { attempts: u32 },
    #[error("an authenticated admin identity is required")]
    Unauthenticated,
    #[error("storage error: {0}")]
    Store(StoreError),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => EngineError::NotFound(id),
            other => EngineError::Store(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// What closing a round produced.
#[derive(Debug, Clone)]
pub struct CloseOutcome {
    pub tally: RoundTally,
    pub winner: Option<Candidate>,
    pub election_finished: bool,
}

/// Outcome of a forced re-tally over already-closed rounds.
#[derive(Debug, Clone)]
pub struct RetallyOutcome {
    pub winner: Candidate,
    pub round_number: u8,
    pub election_finished: bool,
}

/// The at-most-one open ballot of an election, resolved for the voting flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBallot {
    pub seat_id: String,
    pub seat_title: SeatTitle,
    pub round_number: u8,
    pub candidates: Vec<Candidate>,
}

/// Check a voter against an open ballot: eligibility first, then the one
/// ballot per voter per round rule. The cast transaction re-checks both; this
/// exists so the voting flow can refuse up front with the true reason.
pub fn validate_voter(
    election: &Election,
    round: &Round,
    voter_id: &str,
) -> std::result::Result<(), Rejection> {
    if !election.is_eligible(voter_id) {
        return Err(Rejection::VoterNotEligible);
    }
    if round.has_voted(voter_id) {
        return Err(Rejection::AlreadyVoted);
    }
    Ok(())
}

pub struct Coordinator<S: ElectionStore> {
    store: S,
}

impl<S: ElectionStore> Coordinator<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Run one transaction: snapshot, mutate an owned copy, compare-and-swap.
    ///
    /// The snapshot is an owned value, so the mutation can never alias the
    /// stored state; a failed commit throws the whole copy away and starts
    /// over from a fresh read.
    async fn transact<T, F>(&self, election_id: &str, mutate: F) -> Result<T>
    where
        F: Fn(&mut Election) -> Result<T>,
    {
        for _ in 0..MAX_COMMIT_ATTEMPTS {
            let snapshot = self.store.load(election_id).await?;
            let mut election = snapshot.election;
            let value = mutate(&mut election)?;

            match self
                .store
                .try_commit(election_id, snapshot.version, &election)
                .await?
            {
                CommitOutcome::Committed => return Ok(value),
                CommitOutcome::Conflict => continue,
            }
        }

        Err(EngineError::Conflict {
            attempts: MAX_COMMIT_ATTEMPTS,
        })
    }

    /// Register a new election: validate the definition, assign ids, seed
    /// rounds 1-2 with the full roster and round 3 empty, persist at
    /// version 0. Requires a resolved admin identity before anything else.
    pub async fn create_election(
        &self,
        definition: &ElectionDefinition,
        identity: &dyn IdentityProvider,
    ) -> Result<Election> {
        let admin_uid = identity.current_uid().ok_or(EngineError::Unauthenticated)?;
        validate_definition(definition)?;

        let seats = definition
            .seats
            .iter()
            .map(|def| Seat {
                id: util::short_id(8),
                titulo: def.titulo,
                initial_candidates: def.candidates.clone(),
                rounds: seed_rounds(&def.candidates),
                winner: None,
            })
            .collect();

        let election = Election {
            id: util::short_id(10),
            titulo: definition.titulo.clone(),
            status: ElectionStatus::Scheduled,
            eligible_voters: definition.eligible_voters.clone(),
            seats,
            open_voting: None,
            admin_uid,
        };

        self.store.insert(&election).await?;
        Ok(election)
    }

    pub async fn get_election(&self, election_id: &str) -> Result<Election> {
        Ok(self.store.load(election_id).await?.election)
    }

    /// Elections administered by the identified user.
    pub async fn list_elections(&self, identity: &dyn IdentityProvider) -> Result<Vec<Election>> {
        let admin_uid = identity.current_uid().ok_or(EngineError::Unauthenticated)?;
        Ok(self.store.list_by_admin(&admin_uid).await?)
    }

    /// Resolve the currently open (seat, round) pair, or None when nothing
    /// is open. The voting flow builds its screen from exactly this lookup.
    pub async fn open_ballot(&self, election_id: &str) -> Result<Option<OpenBallot>> {
        let election = self.get_election(election_id).await?;

        let pointer = match (&election.status, &election.open_voting) {
            (ElectionStatus::InProgress, Some(pointer)) => pointer.clone(),
            _ => return Ok(None),
        };

        let seat = match election.seat(&pointer.seat_id) {
            Some(seat) => seat,
            None => return Ok(None),
        };
        let round = match seat.round(pointer.round_number) {
            Some(round) if round.status == RoundStatus::Open => round,
            _ => return Ok(None),
        };

        Ok(Some(OpenBallot {
            seat_id: seat.id.clone(),
            seat_title: seat.titulo,
            round_number: round.numero,
            candidates: round.candidatos.clone(),
        }))
    }

    /// Tally any round of any seat for display. Safe on closed rounds.
    pub async fn round_results(
        &self,
        election_id: &str,
        seat_id: &str,
        round_number: u8,
    ) -> Result<RoundTally> {
        let election = self.get_election(election_id).await?;
        let seat = election
            .seat(seat_id)
            .ok_or_else(|| EngineError::NotFound(format!("seat {}", seat_id)))?;
        let round = seat
            .round(round_number)
            .ok_or_else(|| EngineError::NotFound(format!("round {}", round_number)))?;
        Ok(tally::tally(round))
    }

    /// Open a round for voting. Only one round may be open across the whole
    /// election, and a round can never be reopened.
    pub async fn open_round(
        &self,
        election_id: &str,
        seat_id: &str,
        round_number: u8,
    ) -> Result<()> {
        self.transact(election_id, |election| {
            if election.open_voting.is_some() {
                return Err(Rejection::AnotherRoundOpen.into());
            }

            let seat = election
                .seat_mut(seat_id)
                .ok_or_else(|| EngineError::NotFound(format!("seat {}", seat_id)))?;
            if seat.winner.is_some() {
                return Err(Rejection::SeatAlreadyDecided.into());
            }

            let round = seat
                .round_mut(round_number)
                .ok_or_else(|| EngineError::NotFound(format!("round {}", round_number)))?;
            if round.status != RoundStatus::NotStarted {
                return Err(Rejection::RoundAlreadyStarted(round_number).into());
            }
            if round_number == ROUNDS_PER_SEAT && round.candidatos.is_empty() {
                return Err(Rejection::RunoffNotPrepared.into());
            }

            round.status = RoundStatus::Open;
            election.open_voting = Some(OpenVoting {
                seat_id: seat_id.to_string(),
                round_number,
            });
            election.status = ElectionStatus::InProgress;
            Ok(())
        })
        .await
    }

    /// Append one ballot. The eligibility and double-vote checks run inside
    /// the transaction, so two near-simultaneous submissions from the same
    /// voter cannot both land.
    pub async fn cast_ballot(
        &self,
        election_id: &str,
        seat_id: &str,
        round_number: u8,
        voter_id: &str,
        selection: Selection,
    ) -> Result<()> {
        self.transact(election_id, |election| {
            let open = election
                .open_voting
                .as_ref()
                .ok_or(Rejection::RoundNotOpen(round_number))?;
            if open.seat_id != seat_id || open.round_number != round_number {
                return Err(Rejection::RoundNotOpen(round_number).into());
            }
            if !election.is_eligible(voter_id) {
                return Err(Rejection::VoterNotEligible.into());
            }

            let seat = election
                .seat_mut(seat_id)
                .ok_or_else(|| EngineError::NotFound(format!("seat {}", seat_id)))?;
            let round = seat
                .round_mut(round_number)
                .ok_or_else(|| EngineError::NotFound(format!("round {}", round_number)))?;

            if round.status != RoundStatus::Open {
                return Err(Rejection::RoundNotOpen(round_number).into());
            }
            if round.has_voted(voter_id) {
                return Err(Rejection::AlreadyVoted.into());
            }

            round.votos.push(Ballot {
                voter_id: voter_id.to_string(),
                selection: selection.clone(),
            });
            Ok(())
        })
        .await
    }

    /// Close the open round, tally it, and apply the advancement rules.
    ///
    /// A majority in rounds 1-2 (or a plurality in round 3) declares the seat
    /// winner, which atomically prunes that candidate from every sibling seat
    /// whose rounds have not started. When the last seat is decided the
    /// election itself finishes.
    pub async fn close_round(
        &self,
        election_id: &str,
        seat_id: &str,
        round_number: u8,
    ) -> Result<CloseOutcome> {
        self.transact(election_id, |election| {
            let round_tally;
            let winner;
            {
                let seat = election
                    .seat_mut(seat_id)
                    .ok_or_else(|| EngineError::NotFound(format!("seat {}", seat_id)))?;
                let round = seat
                    .round_mut(round_number)
                    .ok_or_else(|| EngineError::NotFound(format!("round {}", round_number)))?;

                if round.status != RoundStatus::Open {
                    return Err(Rejection::RoundNotOpen(round_number).into());
                }

                round.status = RoundStatus::Closed;
                round_tally = tally::tally(round);
                winner = rules::decide_winner(round_number, &round_tally).and_then(|id| {
                    round
                        .candidatos
                        .iter()
                        .find(|c| c.user_id == id)
                        .cloned()
                });

                if let Some(candidate) = &winner {
                    seat.winner = Some(candidate.clone());
                }
            }

            election.open_voting = None;

            if let Some(candidate) = &winner {
                rules::prune_winner_from_seats(&mut election.seats, &candidate.user_id, seat_id);
            }

            let election_finished = election.all_seats_decided();
            if election_finished {
                election.status = ElectionStatus::Finished;
            }

            Ok(CloseOutcome {
                tally: round_tally,
                winner,
                election_finished,
            })
        })
        .await
    }

    /// Populate round 3 from the closed round-2 results: the top two advance,
    /// expanded on ties, minus anyone who already won another seat. Runs in
    /// the same transaction as its guards, and only once per seat.
    pub async fn prepare_round3(&self, election_id: &str, seat_id: &str) -> Result<Vec<Candidate>> {
        self.transact(election_id, |election| {
            let already_elected = rules::elected_candidate_ids(&election.seats);

            let selection = {
                let seat = election
                    .seat(seat_id)
                    .ok_or_else(|| EngineError::NotFound(format!("seat {}", seat_id)))?;
                if seat.winner.is_some() {
                    return Err(Rejection::SeatAlreadyDecided.into());
                }

                let round2 = seat
                    .round(2)
                    .ok_or_else(|| EngineError::NotFound("round 2".to_string()))?;
                if round2.status != RoundStatus::Closed {
                    return Err(Rejection::RoundTwoNotClosed.into());
                }

                let round3 = seat
                    .round(3)
                    .ok_or_else(|| EngineError::NotFound("round 3".to_string()))?;
                if round3.status != RoundStatus::NotStarted || !round3.candidatos.is_empty() {
                    return Err(Rejection::RunoffAlreadyPrepared.into());
                }

                rules::select_runoff_roster(
                    &tally::tally(round2),
                    &round2.candidatos,
                    &already_elected,
                )
            };

            if selection.is_empty() {
                return Err(Rejection::NoValidRunoffRoster.into());
            }

            let seat = election
                .seat_mut(seat_id)
                .ok_or_else(|| EngineError::NotFound(format!("seat {}", seat_id)))?;
            let round3 = seat
                .round_mut(3)
                .ok_or_else(|| EngineError::NotFound("round 3".to_string()))?;
            round3.candidatos = selection.clone();

            Ok(selection)
        })
        .await
    }

    /// Re-run the majority rule over a seat's already-closed rounds 1-2 and
    /// assign a winner a non-transactional writer may have missed. Recovery
    /// path for documents written by older tooling.
    pub async fn force_retally(&self, election_id: &str, seat_id: &str) -> Result<RetallyOutcome> {
        self.transact(election_id, |election| {
            let found = {
                let seat = election
                    .seat(seat_id)
                    .ok_or_else(|| EngineError::NotFound(format!("seat {}", seat_id)))?;
                if seat.winner.is_some() {
                    return Err(Rejection::SeatAlreadyDecided.into());
                }

                let mut found = None;
                for round_number in 1..ROUNDS_PER_SEAT {
                    let round = match seat.round(round_number) {
                        Some(round) if round.status == RoundStatus::Closed => round,
                        _ => continue,
                    };
                    let round_tally = tally::tally(round);
                    if let Some(id) = rules::decide_winner(round_number, &round_tally) {
                        let candidate = round.candidatos.iter().find(|c| c.user_id == id).cloned();
                        if let Some(candidate) = candidate {
                            found = Some((round_number, candidate));
                            break;
                        }
                    }
                }
                found
            };

            let (round_number, candidate) = found.ok_or(Rejection::NoMissedWinner)?;

            if let Some(seat) = election.seat_mut(seat_id) {
                seat.winner = Some(candidate.clone());
            }
            rules::prune_winner_from_seats(&mut election.seats, &candidate.user_id, seat_id);

            let election_finished = election.all_seats_decided();
            if election_finished {
                election.status = ElectionStatus::Finished;
            }

            Ok(RetallyOutcome {
                winner: candidate,
                round_number,
                election_finished,
            })
        })
        .await
    }
}

fn validate_definition(definition: &ElectionDefinition) -> std::result::Result<(), Rejection> {
    let invalid = |reason: &str| Rejection::InvalidDefinition(reason.to_string());

    if definition.titulo.trim().is_empty() {
        return Err(invalid("the election needs a title"));
    }
    if definition.eligible_voters.is_empty() {
        return Err(invalid("the eligible voter roster is empty"));
    }

    let mut voter_ids = HashSet::new();
    for voter in &definition.eligible_voters {
        if !voter_ids.insert(voter.id.as_str()) {
            return Err(invalid(&format!("duplicate voter id {}", voter.id)));
        }
    }

    if definition.seats.is_empty() {
        return Err(invalid("at least one seat is required"));
    }

    let mut titles = HashSet::new();
    for seat in &definition.seats {
        if !titles.insert(seat.titulo) {
            return Err(invalid(&format!("duplicate seat {}", seat.titulo)));
        }
        if seat.candidates.is_empty() {
            return Err(invalid(&format!("seat {} has no candidates", seat.titulo)));
        }

        let mut candidate_ids = HashSet::new();
        for candidate in &seat.candidates {
            if !candidate_ids.insert(candidate.user_id.as_str()) {
                return Err(invalid(&format!(
                    "duplicate candidate {} on seat {}",
                    candidate.user_id, seat.titulo
                )));
            }
            if !voter_ids.contains(candidate.user_id.as_str()) {
                return Err(invalid(&format!(
                    "candidate {} is not an eligible voter",
                    candidate.user_id
                )));
            }
        }
    }

    Ok(())
}

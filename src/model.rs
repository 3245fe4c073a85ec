/// Election document model.
///
/// One `Election` is one persisted document. Seats, rounds, and ballots are
/// sub-trees of it and are never written independently; every mutation goes
/// through the coordinator, which rewrites the whole `cargos` structure in a
/// single compare-and-swap.
use serde::{Deserialize, Serialize};

/// Rounds per seat. Rounds 1 and 2 require an absolute majority, round 3 is
/// decided by plurality.
pub const ROUNDS_PER_SEAT: u8 = 3;

/// Sentinel ballot value for a blank vote.
pub const BLANK_SENTINEL: &str = "BRANCO";
/// Sentinel ballot value for a spoiled (null) vote.
pub const SPOILED_SENTINEL: &str = "NULO";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionStatus {
    #[serde(rename = "agendada")]
    Scheduled,
    #[serde(rename = "em_andamento")]
    InProgress,
    #[serde(rename = "finalizada")]
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundStatus {
    #[serde(rename = "nao_iniciado")]
    NotStarted,
    #[serde(rename = "aberto")]
    Open,
    #[serde(rename = "fechado")]
    Closed,
}

/// The closed set of board offices a seat can be contested for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatTitle {
    #[serde(rename = "Presidente")]
    President,
    #[serde(rename = "Vice-Presidente")]
    VicePresident,
    #[serde(rename = "1º Secretário")]
    FirstSecretary,
    #[serde(rename = "2º Secretário")]
    SecondSecretary,
    #[serde(rename = "Tesoureiro")]
    Treasurer,
}

impl std::fmt::Display for SeatTitle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SeatTitle::President => "Presidente",
            SeatTitle::VicePresident => "Vice-Presidente",
            SeatTitle::FirstSecretary => "1º Secretário",
            SeatTitle::SecondSecretary => "2º Secretário",
            SeatTitle::Treasurer => "Tesoureiro",
        };
        write!(f, "{}", name)
    }
}

/// An eligible voter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Voter {
    pub id: String,
    pub nome: String,
}

/// A candidate is always drawn from the voter roster, so `user_id` is a
/// voter id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "userId")]
    pub user_id: String,
    pub nome: String,
}

/// A voter's single selection in one round: a candidate, or one of the two
/// sentinels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selection {
    Blank,
    Spoiled,
    Candidate(String),
}

impl From<String> for Selection {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            BLANK_SENTINEL => Selection::Blank,
            SPOILED_SENTINEL => Selection::Spoiled,
            _ => Selection::Candidate(raw),
        }
    }
}

impl From<Selection> for String {
    fn from(selection: Selection) -> Self {
        match selection {
            Selection::Blank => BLANK_SENTINEL.to_string(),
            Selection::Spoiled => SPOILED_SENTINEL.to_string(),
            Selection::Candidate(id) => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "eleitorId")]
    pub voter_id: String,
    #[serde(rename = "candidatoId")]
    pub selection: Selection,
}

/// One voting pass (escrutínio) for a seat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub numero: u8,
    pub candidatos: Vec<Candidate>,
    pub votos: Vec<Ballot>,
    pub status: RoundStatus,
}

impl Round {
    pub fn has_voted(&self, voter_id: &str) -> bool {
        self.votos.iter().any(|v| v.voter_id == voter_id)
    }
}

/// One contestable office within an election.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seat {
    pub id: String,
    pub titulo: SeatTitle,
    #[serde(rename = "candidatosIniciais")]
    pub initial_candidates: Vec<Candidate>,
    #[serde(rename = "escrutinios")]
    pub rounds: Vec<Round>,
    #[serde(rename = "vencedor", skip_serializing_if = "Option::is_none")]
    pub winner: Option<Candidate>,
}

impl Seat {
    pub fn round(&self, numero: u8) -> Option<&Round> {
        self.rounds.iter().find(|r| r.numero == numero)
    }

    pub fn round_mut(&mut self, numero: u8) -> Option<&mut Round> {
        self.rounds.iter_mut().find(|r| r.numero == numero)
    }
}

/// Pointer to the single round currently accepting ballots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenVoting {
    #[serde(rename = "cargoId")]
    pub seat_id: String,
    #[serde(rename = "escrutinioNum")]
    pub round_number: u8,
}

/// The shared mutable election document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub id: String,
    pub titulo: String,
    pub status: ElectionStatus,
    #[serde(rename = "membrosElegiveis")]
    pub eligible_voters: Vec<Voter>,
    #[serde(rename = "cargos")]
    pub seats: Vec<Seat>,
    #[serde(rename = "cargoAbertoParaVotacao")]
    pub open_voting: Option<OpenVoting>,
    #[serde(rename = "adminUid")]
    pub admin_uid: String,
}

impl Election {
    pub fn seat(&self, seat_id: &str) -> Option<&Seat> {
        self.seats.iter().find(|s| s.id == seat_id)
    }

    pub fn seat_mut(&mut self, seat_id: &str) -> Option<&mut Seat> {
        self.seats.iter_mut().find(|s| s.id == seat_id)
    }

    pub fn is_eligible(&self, voter_id: &str) -> bool {
        self.eligible_voters.iter().any(|m| m.id == voter_id)
    }

    pub fn all_seats_decided(&self) -> bool {
        self.seats.iter().all(|s| s.winner.is_some())
    }
}

/// Election definition as submitted at registration time, before ids are
/// assigned and rounds are seeded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionDefinition {
    pub titulo: String,
    #[serde(rename = "membrosElegiveis")]
    pub eligible_voters: Vec<Voter>,
    #[serde(rename = "cargos")]
    pub seats: Vec<SeatDefinition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeatDefinition {
    pub titulo: SeatTitle,
    #[serde(rename = "candidatosIniciais")]
    pub candidates: Vec<Candidate>,
}

/// Seed the three rounds of a new seat: rounds 1 and 2 start with the full
/// initial roster, round 3 starts empty and is only populated after round 2
/// closes.
pub fn seed_rounds(initial_candidates: &[Candidate]) -> Vec<Round> {
    (1..=ROUNDS_PER_SEAT)
        .map(|numero| Round {
            numero,
            candidatos: if numero < ROUNDS_PER_SEAT {
                initial_candidates.to_vec()
            } else {
                Vec::new()
            },
            votos: Vec::new(),
            status: RoundStatus::NotStarted,
        })
        .collect()
}

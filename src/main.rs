mod commands;
mod coordinator;
mod identity;
mod model;
mod rules;
mod store;
mod tally;
mod util;

use crate::coordinator::Coordinator;
use crate::identity::{EnvIdentity, FixedIdentity, IdentityProvider};
use crate::store::sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
struct Opts {
    /// SQLite database file holding the election documents.
    #[clap(long, default_value = "elections.db")]
    database: PathBuf,
    /// Admin uid override; defaults to the BOARD_VOTE_ADMIN environment
    /// variable.
    #[clap(long)]
    admin: Option<String>,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new election from a JSON definition file.
    Create {
        /// Election definition (title, eligible voters, seats).
        definition: PathBuf,
    },
    /// List elections administered by the current identity.
    List,
    /// Show an election's full state and tallies.
    Show { election_id: String },
    /// Open a round for voting.
    OpenRound {
        election_id: String,
        seat_id: String,
        round: u8,
    },
    /// Close the open round, tally it, and apply the advancement rules.
    CloseRound {
        election_id: String,
        seat_id: String,
        round: u8,
    },
    /// Prepare the round-3 roster from the closed round-2 results.
    PrepareRunoff {
        election_id: String,
        seat_id: String,
    },
    /// Re-run winner detection over a seat's closed rounds.
    Retally {
        election_id: String,
        seat_id: String,
    },
    /// Show the ballot currently open for voting.
    Ballot { election_id: String },
    /// Cast a vote in the open round.
    Vote {
        election_id: String,
        /// The voter's id on the eligible roster.
        voter: String,
        /// Candidate id, or BRANCO / NULO.
        selection: String,
    },
}

#[tokio::main]
async fn main() {
    let opts = Opts::parse();

    let identity: Box<dyn IdentityProvider> = match opts.admin {
        Some(uid) => Box::new(FixedIdentity(uid)),
        None => Box::new(EnvIdentity),
    };

    let database_url = format!("sqlite:{}", opts.database.display());
    let store = match SqliteStore::new(&database_url).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Failed to open {}: {}", opts.database.display(), e);
            std::process::exit(1);
        }
    };
    let coordinator = Coordinator::new(store);

    let result = match opts.command {
        Command::Create { definition } => {
            commands::create(&coordinator, &definition, identity.as_ref()).await
        }
        Command::List => commands::list(&coordinator, identity.as_ref()).await,
        Command::Show { election_id } => commands::show(&coordinator, &election_id).await,
        Command::OpenRound {
            election_id,
            seat_id,
            round,
        } => commands::open_round(&coordinator, &election_id, &seat_id, round).await,
        Command::CloseRound {
            election_id,
            seat_id,
            round,
        } => commands::close_round(&coordinator, &election_id, &seat_id, round).await,
        Command::PrepareRunoff {
            election_id,
            seat_id,
        } => commands::prepare_runoff(&coordinator, &election_id, &seat_id).await,
        Command::Retally {
            election_id,
            seat_id,
        } => commands::retally(&coordinator, &election_id, &seat_id).await,
        Command::Ballot { election_id } => commands::ballot(&coordinator, &election_id).await,
        Command::Vote {
            election_id,
            voter,
            selection,
        } => commands::vote(&coordinator, &election_id, &voter, &selection).await,
    };

    if let Err(e) = result {
        eprintln!("❌ {}", e);
        std::process::exit(1);
    }
}

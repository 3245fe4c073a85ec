/// Voter-facing flow: resolve the open ballot, validate, cast, confirm.
use crate::coordinator::Coordinator;
use crate::model::Selection;
use crate::store::ElectionStore;
use colored::Colorize;

/// Show the ballot currently open for voting, if any.
pub async fn ballot<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    election_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    match coordinator.open_ballot(election_id).await? {
        Some(ballot) => {
            println!(
                "🗳️  Voting is open: {} (round {})",
                ballot.seat_title.to_string().bright_cyan(),
                ballot.round_number.to_string().bright_yellow()
            );
            for candidate in &ballot.candidates {
                println!("    {} ({})", candidate.nome, candidate.user_id);
            }
            println!("    or {} / {}", "BRANCO".bright_white(), "NULO".bright_white());
        }
        None => println!("No round is open for voting right now"),
    }

    Ok(())
}

/// Cast a vote in the open round. `selection` is a candidate id or one of
/// the BRANCO / NULO sentinels.
pub async fn vote<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    election_id: &str,
    voter_id: &str,
    selection: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let open = match coordinator.open_ballot(election_id).await? {
        Some(open) => open,
        None => {
            println!("No round is open for voting right now");
            return Ok(());
        }
    };

    coordinator
        .cast_ballot(
            election_id,
            &open.seat_id,
            open.round_number,
            voter_id,
            Selection::from(selection.to_string()),
        )
        .await?;

    println!(
        "✅ Vote recorded for {} (round {})",
        open.seat_title.to_string().bright_cyan(),
        open.round_number.to_string().bright_yellow()
    );

    Ok(())
}

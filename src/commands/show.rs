/// Read-only projections: the admin listing and the full election state.
use crate::coordinator::Coordinator;
use crate::identity::IdentityProvider;
use crate::model::{Election, RoundStatus};
use crate::store::ElectionStore;
use crate::tally;
use colored::Colorize;

pub async fn list<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    identity: &dyn IdentityProvider,
) -> Result<(), Box<dyn std::error::Error>> {
    let elections = coordinator.list_elections(identity).await?;

    if elections.is_empty() {
        println!("No elections registered for this admin");
        return Ok(());
    }

    for election in &elections {
        println!(
            "{}  {}  [{}]",
            election.id.bright_green(),
            election.titulo.bright_cyan(),
            status_label(election)
        );
    }

    Ok(())
}

pub async fn show<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    election_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let election = coordinator.get_election(election_id).await?;

    println!(
        "{} ({}) [{}]",
        election.titulo.bright_cyan().bold(),
        election.id,
        status_label(&election)
    );
    println!("Eligible voters: {}", election.eligible_voters.len());

    for seat in &election.seats {
        println!();
        match &seat.winner {
            Some(winner) => println!(
                "🪑 {} ({}) | winner: {}",
                seat.titulo.to_string().bright_yellow().bold(),
                seat.id,
                winner.nome.bright_green().bold()
            ),
            None => println!(
                "🪑 {} ({})",
                seat.titulo.to_string().bright_yellow().bold(),
                seat.id
            ),
        }

        for round in &seat.rounds {
            let status = match round.status {
                RoundStatus::NotStarted => "not started".normal(),
                RoundStatus::Open => "open".bright_green(),
                RoundStatus::Closed => "closed".bright_red(),
            };
            println!(
                "  round {} [{}]: {} ballots",
                round.numero,
                status,
                round.votos.len()
            );

            if round.status != RoundStatus::NotStarted {
                let results = tally::tally(round);
                for (candidate_id, count) in results.ranked() {
                    let nome = round
                        .candidatos
                        .iter()
                        .find(|c| c.user_id == candidate_id)
                        .map(|c| c.nome.as_str())
                        .unwrap_or(candidate_id.as_str());
                    println!("      {} {}", count.to_string().bright_white().bold(), nome);
                }
                if results.blank > 0 || results.spoiled > 0 {
                    println!(
                        "      ({} blank, {} spoiled)",
                        results.blank, results.spoiled
                    );
                }
            }
        }
    }

    Ok(())
}

fn status_label(election: &Election) -> colored::ColoredString {
    use crate::model::ElectionStatus;
    match election.status {
        ElectionStatus::Scheduled => "scheduled".normal(),
        ElectionStatus::InProgress => "in progress".bright_green(),
        ElectionStatus::Finished => "finished".bright_red(),
    }
}

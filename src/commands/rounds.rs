/// Admin round control: open, close, runoff preparation, forced re-tally.
use crate::coordinator::Coordinator;
use crate::store::ElectionStore;
use colored::Colorize;

pub async fn open_round<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    election_id: &str,
    seat_id: &str,
    round: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    coordinator.open_round(election_id, seat_id, round).await?;
    println!(
        "🗳️  Round {} of seat {} is now open for voting",
        round.to_string().bright_yellow(),
        seat_id.bright_cyan()
    );
    Ok(())
}

pub async fn close_round<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    election_id: &str,
    seat_id: &str,
    round: u8,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = coordinator.close_round(election_id, seat_id, round).await?;

    println!(
        "📊 Round {} closed: {} valid, {} blank, {} spoiled",
        round.to_string().bright_yellow(),
        outcome.tally.valid_total.to_string().bright_green(),
        outcome.tally.blank,
        outcome.tally.spoiled
    );
    for (candidate_id, count) in outcome.tally.ranked() {
        println!("    {} {}", count.to_string().bright_white().bold(), candidate_id);
    }

    match &outcome.winner {
        Some(winner) => println!(
            "🏆 {} wins the seat",
            winner.nome.bright_green().bold()
        ),
        None => println!("➡️  No absolute majority; the seat advances to the next round"),
    }
    if outcome.election_finished {
        println!("{}", "🎉 Every seat is decided; the election is finished".bright_green());
    }

    Ok(())
}

pub async fn prepare_runoff<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    election_id: &str,
    seat_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let roster = coordinator.prepare_round3(election_id, seat_id).await?;

    println!(
        "✅ Round 3 of seat {} prepared with {} candidates:",
        seat_id.bright_cyan(),
        roster.len().to_string().bright_yellow()
    );
    for candidate in &roster {
        println!("    {} ({})", candidate.nome, candidate.user_id);
    }

    Ok(())
}

pub async fn retally<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    election_id: &str,
    seat_id: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let outcome = coordinator.force_retally(election_id, seat_id).await?;

    println!(
        "🏆 Recovered winner {} from closed round {}",
        outcome.winner.nome.bright_green().bold(),
        outcome.round_number.to_string().bright_yellow()
    );
    if outcome.election_finished {
        println!("{}", "🎉 Every seat is decided; the election is finished".bright_green());
    }

    Ok(())
}

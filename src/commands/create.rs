use crate::coordinator::Coordinator;
use crate::identity::IdentityProvider;
use crate::model::ElectionDefinition;
use crate::store::ElectionStore;
use colored::Colorize;
use std::fs;
use std::path::Path;

/// Register a new election from a JSON definition file.
pub async fn create<S: ElectionStore>(
    coordinator: &Coordinator<S>,
    definition_path: &Path,
    identity: &dyn IdentityProvider,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(definition_path)?;
    let definition: ElectionDefinition = serde_json::from_str(&raw)?;

    let election = coordinator.create_election(&definition, identity).await?;

    println!(
        "✅ Election {} registered with id {}",
        election.titulo.bright_cyan(),
        election.id.bright_green().bold()
    );
    for seat in &election.seats {
        println!(
            "  🪑 {} ({}): {} candidates",
            seat.titulo.to_string().bright_yellow(),
            seat.id,
            seat.initial_candidates.len()
        );
    }

    Ok(())
}

mod create;
mod rounds;
mod show;
mod vote;

pub use create::create;
pub use rounds::{close_round, open_round, prepare_runoff, retally};
pub use show::{list, show};
pub use vote::{ballot, vote};

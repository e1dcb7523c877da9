pub mod challenge;
pub mod handle;

use std::sync::Arc;

use clap::{Parser, Subcommand};
use eyre::Result;
use tokio::sync::watch;

use crate::{
    settings::Settings,
    solver::{HuaweiSolver, Solver},
};

#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Publish a challenge value in the TXT record for a domain
    Present(challenge::ChallengeArgs),
    /// Remove a challenge value from the TXT record for a domain
    Cleanup(challenge::ChallengeArgs),
    /// Process challenge requests in the certificate controller's JSON form
    Handle(handle::HandleArgs),
}

pub struct State {
    pub solver: Arc<dyn Solver>,
}

pub async fn run(settings: Settings) -> Result<()> {
    let args = Args::parse();

    let solver = Arc::new(HuaweiSolver::new());
    let (stop, stop_rx) = watch::channel(false);
    solver.initialize(&settings, stop_rx).await?;

    let state = Arc::new(State { solver });

    let result = match args.command {
        Commands::Present(args) => challenge::present(state, args).await,
        Commands::Cleanup(args) => challenge::cleanup(state, args).await,
        Commands::Handle(args) => handle::run(state, args).await,
    };

    stop.send(true).ok();
    result
}

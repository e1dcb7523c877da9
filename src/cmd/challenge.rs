use std::sync::Arc;

use clap::Args;
use eyre::Result;

use crate::{
    challenge::{ChallengeAction, ChallengeRequest},
    config::read_config_arg,
};

use super::State;

#[derive(Args, Debug)]
pub struct ChallengeArgs {
    /// Fully-qualified challenge record name, e.g. `_acme-challenge.example.com.`
    #[clap(long)]
    fqdn: String,

    /// The zone that holds the record, e.g. `example.com.`
    #[clap(long)]
    zone: String,

    /// The challenge value to publish or remove
    #[clap(long)]
    key: String,

    /// Provider config as inline JSON, or `@path` to read it from a file. Fields are
    /// `region`, `zoneId`, `appKey` and `appSecret`.
    #[clap(long)]
    config: Option<String>,
}

async fn build_request(action: ChallengeAction, args: ChallengeArgs) -> Result<ChallengeRequest> {
    let config = match args.config {
        Some(arg) => Some(read_config_arg(&arg).await?),
        None => None,
    };

    Ok(ChallengeRequest::new(
        action, args.fqdn, args.zone, args.key, config,
    ))
}

pub async fn present(state: Arc<State>, args: ChallengeArgs) -> Result<()> {
    let request = build_request(ChallengeAction::Present, args).await?;
    state.solver.present(&request).await?;
    println!("Challenge record present for {}", request.resolved_fqdn);
    Ok(())
}

pub async fn cleanup(state: Arc<State>, args: ChallengeArgs) -> Result<()> {
    let request = build_request(ChallengeAction::CleanUp, args).await?;
    state.solver.cleanup(&request).await?;
    println!("Challenge record cleaned up for {}", request.resolved_fqdn);
    Ok(())
}

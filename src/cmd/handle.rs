use std::{path::PathBuf, sync::Arc};

use clap::Args;
use eyre::{eyre, Result};
use tokio::io::AsyncReadExt;
use tracing::{event, Level};

use crate::{
    challenge::{ChallengeBatch, ChallengeRequest},
    error::SolverError,
};

use super::State;

#[derive(Args, Debug)]
pub struct HandleArgs {
    /// A JSON file holding one challenge request or a list of them. Reads stdin when omitted
    /// or `-`.
    input: Option<PathBuf>,
}

async fn read_input(input: Option<PathBuf>) -> Result<String> {
    match input {
        Some(path) if path.as_os_str() != "-" => Ok(tokio::fs::read_to_string(path).await?),
        _ => {
            let mut buf = String::new();
            tokio::io::stdin().read_to_string(&mut buf).await?;
            Ok(buf)
        }
    }
}

pub fn parse_requests(input: &str) -> Result<Vec<ChallengeRequest>> {
    let batch: ChallengeBatch = serde_json::from_str(input)?;
    Ok(batch.into_requests())
}

fn report_line(solver: &str, request: &ChallengeRequest, error: Option<&SolverError>) -> String {
    match error {
        None => format!("[{solver}] {} {}: ok", request.action, request.resolved_fqdn),
        Some(e) => format!(
            "[{solver}] {} {} failed: {e}",
            request.action, request.resolved_fqdn
        ),
    }
}

/// Run every request concurrently and report each failure. Fails if any request failed.
pub async fn run_requests(state: Arc<State>, requests: Vec<ChallengeRequest>) -> Result<()> {
    if requests.is_empty() {
        println!("No challenge requests to process");
        return Ok(());
    }

    let tasks = requests
        .into_iter()
        .map(|request| {
            let state = state.clone();
            tokio::task::spawn(async move {
                let result = state.solver.handle(&request).await;
                (request, result)
            })
        })
        .collect::<Vec<_>>();

    let results = futures::future::join_all(tasks).await;

    let solver = state.solver.name();
    let mut errored = false;
    for r in results {
        match r {
            Ok((request, Ok(()))) => {
                println!("{}", report_line(solver, &request, None));
            }
            Ok((request, Err(e))) => {
                eprintln!("{}", report_line(solver, &request, Some(&e)));
                errored = true;
            }
            Err(e) => {
                event!(Level::ERROR, "Challenge task panicked: {}", e);
                errored = true;
            }
        }
    }

    if errored {
        Err(eyre!("Encountered errors"))
    } else {
        Ok(())
    }
}

pub async fn run(state: Arc<State>, args: HandleArgs) -> Result<()> {
    let input = read_input(args.input).await?;
    let requests = parse_requests(&input)?;
    run_requests(state, requests).await
}

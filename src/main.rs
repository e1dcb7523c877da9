mod challenge;
mod cmd;
mod config;
mod dns;
mod error;
mod settings;
mod solver;
mod tracing_config;

use eyre::Result;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_config::init_tracing()?;

    let settings = settings::Settings::load()?;

    cmd::run(settings).await?;
    Ok(())
}

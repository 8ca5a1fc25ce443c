use anyhow::Context;
use clap::Parser;
use quizzer::{Config, gateway};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    let address = config
        .address()
        .with_context(|| format!("invalid host address {:?}", config.host))?;

    gateway::serve(address)
        .await
        .with_context(|| format!("server on {address} failed"))
}

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use casewatch_core::CaseId;
use casewatch_engine::{CaseClient, ReqwestCaseClient};
use clap::Parser;
use engine_logging::engine_info;

mod cli;
mod commands;
mod config;
mod error;
mod render;

use cli::{Cli, Command};
use error::AppError;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = config::load(&cli.config)?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    engine_logging::initialize(&config.log_destination(), config.log_level()?);
    engine_info!("casewatch starting base_url={}", config.base_url);

    let token = cli
        .token
        .filter(|token| !token.trim().is_empty())
        .ok_or(AppError::MissingToken)?;
    let client: Arc<dyn CaseClient> = Arc::new(
        ReqwestCaseClient::new(config.client_settings())
            .with_context(|| format!("Invalid backend url {:?}", config.base_url))?,
    );

    let reason = match cli.command {
        Command::Watch { case_id } => commands::watch(client, &token, CaseId::new(case_id)).await?,
        Command::Analyze { case_id, watch } => {
            commands::analyze(client, &token, CaseId::new(case_id), watch).await?
        }
        Command::Dashboard => {
            commands::dashboard(client, &token).await?;
            return Ok(ExitCode::SUCCESS);
        }
    };
    Ok(ExitCode::from(render::exit_code_for(reason)))
}

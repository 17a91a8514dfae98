//! Ariel CLI - command-line access to the Ariel search API
//!
//! Every subcommand maps to a single API call and prints the raw response.
//! `run` chains them: submit a query, wait for it to finish, fetch the results.
use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use ariel_client::ArielClient;
use ariel_common::SearchStatus;

mod commands;
mod config;
mod display;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML connection file
    #[arg(long, env = "ARIEL_CONFIG")]
    config: PathBuf,

    /// Security token, overrides `auth.sec` from the config file
    #[arg(long, env = "ARIEL_SEC_TOKEN", hide_env_values = true)]
    sec_token: Option<String>,

    /// Maximum transport retries for transient failures
    #[arg(long)]
    max_retries: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check connectivity and credentials
    Ping,
    /// List the searchable databases
    Databases,
    /// Describe the columns of one database
    Database {
        /// Database name, e.g. `events` or `flows`
        name: String,
    },
    /// List search ids
    Searches,
    /// Submit an AQL query
    Create {
        /// AQL query expression
        query: String,
    },
    /// Show the state of a search
    Status {
        /// Search id
        id: String,
    },
    /// Fetch the results of a search
    Results {
        /// Search id
        id: String,
        /// Accept type of the results
        #[arg(long, default_value = "application/json")]
        response_type: String,
        /// First record to return
        #[arg(long, requires = "range_end")]
        range_start: Option<u64>,
        /// Last record to return
        #[arg(long, requires = "range_start")]
        range_end: Option<u64>,
    },
    /// Change a search
    Update {
        /// Search id
        id: String,
        /// Keep results after the search expires
        #[arg(long)]
        save_results: Option<bool>,
        /// New status, `CANCELED` stops a running search
        #[arg(long)]
        status: Option<SearchStatus>,
    },
    /// Delete a search and its results
    Delete {
        /// Search id
        id: String,
    },
    /// Submit a query, wait for it, and print the results
    Run {
        /// AQL query expression
        query: String,
        /// Seconds between status checks
        #[arg(long, default_value_t = 2)]
        poll_interval: u64,
        /// Give up after this many status checks
        #[arg(long, default_value_t = 150)]
        max_polls: u32,
        /// Accept type of the results
        #[arg(long, default_value = "application/json")]
        response_type: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let args = Args::parse();

    let mut config = config::load_config(&args.config)?;
    config::apply_overrides(&mut config, args.sec_token, args.max_retries);

    let client = ArielClient::new(&config.connection, &config.auth)?;

    let response = commands::execute(&client, args.command).await?;
    display::print_response(&response);
    anyhow::ensure!(
        response.is_success(),
        "Request failed with {}",
        response.status
    );

    Ok(())
}

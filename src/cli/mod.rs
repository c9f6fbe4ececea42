//! Command-line interface
//!
//! `regcheck [--json] [--config PATH] <command>`

pub mod commands;
pub mod context;
pub mod output;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::domain::errors::ComplianceError;

/// Check chat messages for regulatory compliance against an embedded corpus
#[derive(Parser, Debug)]
#[command(name = "regcheck")]
#[command(about = "Check chat messages for regulatory compliance against an embedded corpus", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Configuration file (defaults to .regcheck/config.yaml and .regcheck/local.yaml)
    #[arg(short, long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ingest PDF regulations and load their chunks into the corpus
    Ingest(commands::ingest::IngestArgs),

    /// Register the embedding job for rows left pending by an earlier ingest
    Embed(commands::embed::EmbedArgs),

    /// Build the similarity and lexical indexes
    Index(commands::index::IndexArgs),

    /// Show corpus size, embedding progress and model
    Status(commands::status::StatusArgs),

    /// Retrieve the chunks nearest to a text
    Search(commands::search::SearchArgs),

    /// Judge a single chat message
    Judge(commands::judge::JudgeArgs),

    /// Judge every message in a dataset and report the non-compliant ones
    Check(commands::check::CheckArgs),

    /// Drop the corpus table and its metadata
    Teardown(commands::teardown::TeardownArgs),
}

/// Prints the error and exits with a non-zero status.
pub fn handle_error(err: anyhow::Error, json_mode: bool) -> ! {
    let kind = err
        .chain()
        .find_map(|cause| cause.downcast_ref::<ComplianceError>())
        .map(ComplianceError::kind);

    if json_mode {
        let body = serde_json::json!({
            "error": format!("{err:#}"),
            "kind": kind,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&body).unwrap_or_default()
        );
    } else {
        eprintln!("Error: {err:#}");
    }
    std::process::exit(1);
}

//! regcheck CLI entry point.

use clap::Parser;

use regcheck::cli::commands::{check, embed, index, ingest, judge, search, status, teardown};
use regcheck::cli::context::load_config;
use regcheck::cli::{handle_error, Cli, Commands};
use regcheck::infrastructure::logging::LoggerImpl;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let json = cli.json;

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => handle_error(err, json),
    };
    let logger = match LoggerImpl::init(&config.logging) {
        Ok(logger) => logger,
        Err(err) => handle_error(err, json),
    };

    let result = match cli.command {
        Commands::Ingest(args) => ingest::execute(args, &config, json).await,
        Commands::Embed(args) => embed::execute(args, &config, json).await,
        Commands::Index(args) => index::execute(args, &config, json).await,
        Commands::Status(args) => status::execute(args, &config, json).await,
        Commands::Search(args) => search::execute(args, &config, json).await,
        Commands::Judge(args) => judge::execute(args, &config, json).await,
        Commands::Check(args) => check::execute(args, &config, json).await,
        Commands::Teardown(args) => teardown::execute(args, &config, json).await,
    };

    if let Err(err) = result {
        // Flush file logs before exiting
        drop(logger);
        handle_error(err, json);
    }
}

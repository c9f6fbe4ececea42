//! Implementation of the `regcheck teardown` command.

use anyhow::{bail, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::open_store;
use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

/// Drop the corpus table and its metadata
#[derive(Args, Debug)]
pub struct TeardownArgs {
    /// Confirm dropping the corpus table and its metadata
    #[arg(long)]
    pub yes: bool,
}

/// Result of `teardown`.
#[derive(Debug, Serialize)]
pub struct TeardownOutput {
    /// Qualified corpus table
    pub table: String,
    /// Always true once printed
    pub dropped: bool,
}

impl CommandOutput for TeardownOutput {
    fn to_human(&self) -> String {
        format!("Dropped corpus {}", self.table)
    }
}

/// Drops the corpus after `--yes` confirmation.
pub async fn execute(args: TeardownArgs, config: &Config, json_mode: bool) -> Result<()> {
    let table = format!("{}.{}", config.corpus.schema, config.corpus.table);
    if !args.yes {
        bail!("Refusing to drop {table} without --yes");
    }

    let store = open_store(config).await?;
    let result = store.teardown().await;
    store.close().await;
    result?;

    output(
        &TeardownOutput {
            table,
            dropped: true,
        },
        json_mode,
    );
    Ok(())
}

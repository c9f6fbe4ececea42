//! Implementation of the `regcheck index` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::context::open_store;
use crate::cli::output::{create_spinner, output, CommandOutput};
use crate::domain::models::{Config, DistanceMetric};
use crate::domain::ports::IndexSpec;

/// Build the similarity and lexical indexes
#[derive(Args, Debug)]
pub struct IndexArgs {
    /// Distance metric (l2_squared or cosine), overriding index.metric
    #[arg(long)]
    pub metric: Option<DistanceMetric>,

    /// HNSW graph degree
    #[arg(long)]
    pub m: Option<u32>,

    /// HNSW construction candidate list size
    #[arg(long)]
    pub ef_construction: Option<u32>,

    /// HNSW search candidate list size
    #[arg(long)]
    pub ef: Option<u32>,
}

/// Indexes created by `index`.
#[derive(Debug, Serialize)]
pub struct IndexOutput {
    /// Qualified corpus table
    pub table: String,
    /// Effective index parameters after overrides
    pub spec: IndexSpec,
}

impl CommandOutput for IndexOutput {
    fn to_human(&self) -> String {
        let mut params = vec![format!("dim={}", self.spec.dimension)];
        params.extend(self.spec.m.map(|v| format!("m={v}")));
        params.extend(self.spec.ef_construction.map(|v| format!("ef_construction={v}")));
        params.extend(self.spec.ef.map(|v| format!("ef={v}")));
        format!(
            "Created {} index ({}, {}) and {} full-text index on {}",
            self.spec.index_type,
            self.spec.metric,
            params.join(", "),
            self.spec.text_search_config,
            self.table
        )
    }
}

/// Applies command-line overrides to the configured index parameters.
pub fn index_spec(config: &Config, args: &IndexArgs) -> IndexSpec {
    let mut spec = IndexSpec::from_config(config);
    if let Some(metric) = args.metric {
        spec.metric = metric;
    }
    spec.m = args.m.or(spec.m);
    spec.ef_construction = args.ef_construction.or(spec.ef_construction);
    spec.ef = args.ef.or(spec.ef);
    spec
}

/// Creates both indexes with command-line overrides applied.
pub async fn execute(args: IndexArgs, config: &Config, json_mode: bool) -> Result<()> {
    let spec = index_spec(config, &args);
    let store = open_store(config).await?;

    let spinner = create_spinner("Building indexes", json_mode);
    let result = store.create_indexes(&spec).await;
    spinner.finish_and_clear();
    store.close().await;
    result.context("Failed to build indexes")?;

    output(
        &IndexOutput {
            table: format!("{}.{}", config.corpus.schema, config.corpus.table),
            spec,
        },
        json_mode,
    );
    Ok(())
}

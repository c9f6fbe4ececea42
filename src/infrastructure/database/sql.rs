//! SQL statement builders for the corpus table, its metadata and its indexes.
//!
//! Identifiers cannot be bound as parameters, so table and index names are
//! quoted here and everything else is passed as `$n` binds.

use crate::domain::errors::{ComplianceError, ComplianceResult};
use crate::domain::models::DistanceMetric;
use crate::domain::ports::IndexSpec;

/// Metadata table recording the embedding model and dimension of each corpus.
pub const META_TABLE: &str = "regcheck_corpus_meta";

/// Schema-qualified table identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName {
    schema: String,
    table: String,
}

impl TableName {
    /// Rejects blank schema or table names.
    pub fn new(schema: impl Into<String>, table: impl Into<String>) -> ComplianceResult<Self> {
        let schema = schema.into();
        let table = table.into();
        if schema.trim().is_empty() {
            return Err(ComplianceError::Config("corpus schema name is required".to_string()));
        }
        if table.trim().is_empty() {
            return Err(ComplianceError::Config("corpus table name is required".to_string()));
        }
        Ok(Self { schema, table })
    }

    /// Fully-qualified table reference with quoted identifiers.
    pub fn qualified(&self) -> String {
        format!("{}.{}", quote_ident(&self.schema), quote_ident(&self.table))
    }

    /// Unquoted `schema.table`, the key of the metadata row.
    pub fn key(&self) -> String {
        format!("{}.{}", self.schema, self.table)
    }

    /// Unquoted schema name.
    pub fn schema(&self) -> &str {
        &self.schema
    }

    /// Unquoted table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Name of the similarity index.
    pub fn ann_index_name(&self) -> String {
        format!(
            "{}_{}_vector_idx",
            sanitize_ident(&self.schema),
            sanitize_ident(&self.table)
        )
    }

    /// Name of the lexical index.
    pub fn fts_index_name(&self) -> String {
        format!(
            "{}_{}_chunk_tsv_idx",
            sanitize_ident(&self.schema),
            sanitize_ident(&self.table)
        )
    }
}

/// Quotes Postgres identifiers, escaping embedded quotes.
pub fn quote_ident(input: &str) -> String {
    format!("\"{}\"", input.replace('"', "\"\""))
}

/// Quotes a string literal for the places SQL does not accept binds (DDL).
pub fn quote_literal(input: &str) -> String {
    format!("'{}'", input.replace('\'', "''"))
}

fn sanitize_ident(input: &str) -> String {
    input
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() { ch.to_ascii_lowercase() } else { '_' })
        .collect()
}

/// One metadata row per corpus table, keyed by `schema.table`.
pub fn create_meta_table() -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
            table_name TEXT PRIMARY KEY,
            embedding_model TEXT NOT NULL,
            dimension INTEGER NOT NULL,
            embedding_job_id INTEGER,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )",
        quote_ident(META_TABLE)
    )
}

/// Corpus table whose vectors are either null or exactly `dimension` wide.
pub fn create_corpus_table(table: &TableName, dimension: usize) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
            id INTEGER PRIMARY KEY,
            chunk TEXT NOT NULL,
            vector REAL[{dimension}],
            CHECK (vector IS NULL OR array_length(vector, 1) = {dimension})
        )",
        table = table.qualified(),
    )
}

/// Drops the table with its indexes.
pub fn drop_corpus_table(table: &TableName) -> String {
    format!("DROP TABLE IF EXISTS {} CASCADE", table.qualified())
}

/// `$1` id, `$2` chunk, `$3` vector or null.
pub fn insert_document(table: &TableName) -> String {
    format!(
        "INSERT INTO {} (id, chunk, vector) VALUES ($1, $2, $3)",
        table.qualified()
    )
}

/// `$1` is the regclass of the table, `$2` the embedding model. Returns the job id.
pub fn add_embedding_job() -> &'static str {
    "SELECT add_embedding_job($1::regclass, 'chunk', 'vector', $2)::int4"
}

/// `$1` is the job id recorded in the metadata table.
pub fn cancel_embedding_job() -> &'static str {
    "SELECT cancel_embedding_job($1)"
}

/// `$1` is the table key. Returns model, dimension and job id.
pub fn select_metadata() -> String {
    format!(
        "SELECT embedding_model, dimension, embedding_job_id FROM {} WHERE table_name = $1",
        quote_ident(META_TABLE)
    )
}

/// `$1` table key, `$2` model, `$3` dimension.
pub fn insert_metadata() -> String {
    format!(
        "INSERT INTO {} (table_name, embedding_model, dimension) VALUES ($1, $2, $3)",
        quote_ident(META_TABLE)
    )
}

/// `$1` table key, `$2` job id.
pub fn record_embedding_job() -> String {
    format!(
        "UPDATE {} SET embedding_job_id = $2 WHERE table_name = $1",
        quote_ident(META_TABLE)
    )
}

/// `$1` is the table key.
pub fn delete_metadata() -> String {
    format!("DELETE FROM {} WHERE table_name = $1", quote_ident(META_TABLE))
}

/// `$1` is the batch size.
pub fn select_pending(table: &TableName) -> String {
    format!(
        "SELECT id, chunk FROM {} WHERE vector IS NULL ORDER BY id LIMIT $1",
        table.qualified()
    )
}

/// `$1` id, `$2` vector.
pub fn update_vector(table: &TableName) -> String {
    format!("UPDATE {} SET vector = $2 WHERE id = $1", table.qualified())
}

/// Total and embedded row counts.
pub fn embedding_progress(table: &TableName) -> String {
    format!(
        "SELECT COUNT(*)::int8, COUNT(vector)::int8 FROM {}",
        table.qualified()
    )
}

/// Row count.
pub fn count_rows(table: &TableName) -> String {
    format!("SELECT COUNT(*)::int8 FROM {}", table.qualified())
}

/// Highest id, null when empty.
pub fn max_id(table: &TableName) -> String {
    format!("SELECT MAX(id) FROM {}", table.qualified())
}

/// Approximate nearest-neighbor index over `vector`.
pub fn create_ann_index(table: &TableName, spec: &IndexSpec) -> String {
    let mut params = vec![format!("dim = {}", spec.dimension)];
    if let Some(m) = spec.m {
        params.push(format!("m = {m}"));
    }
    if let Some(ef_construction) = spec.ef_construction {
        params.push(format!("ef_construction = {ef_construction}"));
    }
    if let Some(ef) = spec.ef {
        params.push(format!("ef = {ef}"));
    }

    format!(
        "CREATE INDEX IF NOT EXISTS {index} ON {table} USING {method} (vector {opclass}) WITH ({params})",
        index = quote_ident(&table.ann_index_name()),
        table = table.qualified(),
        method = quote_ident(&spec.index_type),
        opclass = spec.metric.operator_class(),
        params = params.join(", "),
    )
}

/// GIN full-text index over `chunk`.
pub fn create_lexical_index(table: &TableName, text_search_config: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {index} ON {table} USING GIN (to_tsvector({config}, chunk))",
        index = quote_ident(&table.fts_index_name()),
        table = table.qualified(),
        config = quote_literal(text_search_config),
    )
}

/// Top-k query embedding the text inside the database.
///
/// Binds: `$1` model, `$2` query text, `$3` limit.
pub fn nearest_by_text(table: &TableName, metric: DistanceMetric) -> String {
    let op = metric.operator();
    format!(
        "SELECT id, chunk, (vector {op} text_embedding($1, $2))::float8 AS distance \
         FROM {table} \
         WHERE vector IS NOT NULL \
         ORDER BY vector {op} text_embedding($1, $2) \
         LIMIT $3",
        table = table.qualified(),
    )
}

/// Top-k query against a precomputed query vector.
///
/// Binds: `$1` query vector, `$2` limit.
pub fn nearest_by_vector(table: &TableName, metric: DistanceMetric) -> String {
    let op = metric.operator();
    format!(
        "SELECT id, chunk, (vector {op} $1::real[])::float8 AS distance \
         FROM {table} \
         WHERE vector IS NOT NULL \
         ORDER BY vector {op} $1::real[] \
         LIMIT $2",
        table = table.qualified(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TableName {
        TableName::new("public", "compliance_documents").unwrap()
    }

    fn spec() -> IndexSpec {
        IndexSpec {
            index_type: "lantern_hnsw".to_string(),
            metric: DistanceMetric::L2Squared,
            dimension: 1536,
            m: None,
            ef_construction: None,
            ef: None,
            text_search_config: "english".to_string(),
        }
    }

    #[test]
    fn test_table_name_validation() {
        assert!(TableName::new("", "t").is_err());
        assert!(TableName::new("public", "  ").is_err());
        assert_eq!(table().key(), "public.compliance_documents");
    }

    #[test]
    fn test_quote_ident_escapes() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_literal("it's"), "'it''s'");
    }

    #[test]
    fn test_create_table_fixes_dimension() {
        let sql = create_corpus_table(&table(), 3);
        assert!(sql.contains("\"public\".\"compliance_documents\""));
        assert!(sql.contains("vector REAL[3]"));
        assert!(sql.contains("array_length(vector, 1) = 3"));
    }

    #[test]
    fn test_ann_index_default() {
        let sql = create_ann_index(&table(), &spec());
        assert!(sql.starts_with("CREATE INDEX IF NOT EXISTS"));
        assert!(sql.contains("USING \"lantern_hnsw\" (vector dist_l2sq_ops)"));
        assert!(sql.ends_with("WITH (dim = 1536)"));
    }

    #[test]
    fn test_ann_index_with_hnsw_params() {
        let spec = IndexSpec {
            metric: DistanceMetric::Cosine,
            m: Some(16),
            ef_construction: Some(64),
            ef: Some(32),
            ..spec()
        };
        let sql = create_ann_index(&table(), &spec);
        assert!(sql.contains("(vector dist_cos_ops)"));
        assert!(sql.contains("WITH (dim = 1536, m = 16, ef_construction = 64, ef = 32)"));
    }

    #[test]
    fn test_lexical_index() {
        let sql = create_lexical_index(&table(), "english");
        assert!(sql.contains("public_compliance_documents_chunk_tsv_idx"));
        assert!(sql.contains("USING GIN (to_tsvector('english', chunk))"));
    }

    #[test]
    fn test_nearest_excludes_pending_rows() {
        let sql = nearest_by_text(&table(), DistanceMetric::L2Squared);
        assert!(sql.contains("WHERE vector IS NOT NULL"));
        assert!(sql.contains("ORDER BY vector <-> text_embedding($1, $2)"));
        assert!(sql.ends_with("LIMIT $3"));

        let sql = nearest_by_vector(&table(), DistanceMetric::Cosine);
        assert!(sql.contains("ORDER BY vector <=> $1::real[]"));
        assert!(sql.ends_with("LIMIT $2"));
    }

    #[test]
    fn test_embedding_job_lifecycle_statements() {
        assert!(add_embedding_job().contains("add_embedding_job($1::regclass, 'chunk', 'vector', $2)"));
        assert_eq!(cancel_embedding_job(), "SELECT cancel_embedding_job($1)");
        assert!(record_embedding_job().contains("SET embedding_job_id = $2 WHERE table_name = $1"));
    }
}

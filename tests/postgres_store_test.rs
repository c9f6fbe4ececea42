//! Postgres corpus store against a live database
//!
//! Ignored by default. Run with a scratch database:
//!
//! ```text
//! DATABASE_URL=postgres://localhost/regcheck_test cargo test --test postgres_store_test -- --ignored
//! ```
//!
//! Database-mode tests also need the `lantern_extras` extension installed.

use regcheck::domain::errors::ErrorKind;
use regcheck::domain::models::{DatabaseConfig, DistanceMetric, EmbeddingProgress};
use regcheck::domain::ports::{CorpusDescriptor, CorpusStore};
use regcheck::infrastructure::database::{DatabaseConnection, PostgresCorpusStore};
use regcheck::services::{CorpusLoader, RetrievalPipeline};
use std::sync::Arc;
use uuid::Uuid;

mod common;
use common::{FixedEmbedder, TEST_MODEL};

async fn connect() -> Option<DatabaseConnection> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) if !url.is_empty() => url,
        _ => {
            eprintln!("Skipping Postgres test: DATABASE_URL not set");
            return None;
        }
    };
    let config = DatabaseConfig {
        url: Some(url),
        ..DatabaseConfig::default()
    };
    Some(
        DatabaseConnection::connect(&config)
            .await
            .expect("Failed to connect to test database"),
    )
}

/// Descriptor for a table no other test run touches.
fn scratch_descriptor(model: &str, dimension: usize) -> CorpusDescriptor {
    CorpusDescriptor {
        schema: "public".to_string(),
        table: format!("regcheck_test_{}", Uuid::new_v4().simple()),
        embedding_model: model.to_string(),
        dimension,
        metric: DistanceMetric::L2Squared,
    }
}

fn client_store(
    connection: &DatabaseConnection,
    descriptor: CorpusDescriptor,
) -> PostgresCorpusStore {
    let dimension = descriptor.dimension;
    PostgresCorpusStore::with_embedder(
        connection.clone(),
        descriptor,
        Arc::new(FixedEmbedder::new(dimension)),
    )
    .unwrap()
}

async fn recorded_job_id(connection: &DatabaseConnection, key: &str) -> Option<i32> {
    let row: Option<(Option<i32>,)> =
        sqlx::query_as("SELECT embedding_job_id FROM regcheck_corpus_meta WHERE table_name = $1")
            .bind(key)
            .fetch_optional(connection.pool())
            .await
            .unwrap();
    row.and_then(|(id,)| id)
}

#[tokio::test]
#[ignore]
async fn test_metadata_conflict_is_schema_error() {
    let Some(connection) = connect().await else {
        return;
    };
    let descriptor = scratch_descriptor(TEST_MODEL, 2);
    let first = client_store(&connection, descriptor.clone());
    first.prepare_schema().await.unwrap();
    first.prepare_schema().await.unwrap();

    let other_model = client_store(
        &connection,
        CorpusDescriptor {
            embedding_model: "openai/text-embedding-3-small".to_string(),
            ..descriptor.clone()
        },
    );
    let err = other_model.prepare_schema().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Schema);
    assert!(err.to_string().contains(TEST_MODEL));

    let other_width = client_store(
        &connection,
        CorpusDescriptor {
            dimension: 3,
            ..descriptor
        },
    );
    assert_eq!(
        other_width.prepare_schema().await.unwrap_err().kind(),
        ErrorKind::Schema
    );

    first.teardown().await.unwrap();
    assert!(first.stored_model().await.unwrap().is_none());
    connection.close().await;
}

#[tokio::test]
#[ignore]
async fn test_client_backfill_embeds_every_pending_row() {
    let Some(connection) = connect().await else {
        return;
    };
    let store: Arc<dyn CorpusStore> =
        Arc::new(client_store(&connection, scratch_descriptor(TEST_MODEL, 4)));
    let loader = CorpusLoader::new(Arc::clone(&store));

    // More rows than one embedding batch
    let chunks: Vec<String> = (0..40).map(|i| format!("rule number {i}")).collect();
    let summary = loader.load_chunks(chunks).await.unwrap();
    assert!(summary.is_complete());
    assert_eq!(summary.id_range, Some((1, 40)));

    let progress = store.embedding_progress().await.unwrap();
    assert_eq!(progress, EmbeddingProgress::new(40, 40));
    assert_eq!(progress.pending, 0);

    let retrieval = RetrievalPipeline::new(Arc::clone(&store), 3, TEST_MODEL).unwrap();
    let hits = retrieval.retrieve("rule number 7").await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits[0].distance.abs() < 1e-9);

    store.teardown().await.unwrap();
    connection.close().await;
}

#[tokio::test]
#[ignore]
async fn test_database_job_registered_once_and_cancelled_on_teardown() {
    let Some(connection) = connect().await else {
        return;
    };
    let descriptor = scratch_descriptor("BAAI/bge-small-en", 384);
    let key = format!("{}.{}", descriptor.schema, descriptor.table);
    let store = PostgresCorpusStore::new(connection.clone(), descriptor).unwrap();

    store.prepare_schema().await.unwrap();
    store.register_embedding_job().await.unwrap();
    let job_id = recorded_job_id(&connection, &key).await;
    assert!(job_id.is_some());

    store.register_embedding_job().await.unwrap();
    assert_eq!(recorded_job_id(&connection, &key).await, job_id);

    store.teardown().await.unwrap();
    assert_eq!(recorded_job_id(&connection, &key).await, None);
    connection.close().await;
}

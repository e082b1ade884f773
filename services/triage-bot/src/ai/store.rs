//! Qdrant-backed document search
//!
//! Documents are embedded with [`EmbeddingClient`] and stored as points whose
//! payload carries the document id, its text and its metadata entries.

use super::embeddings::{EmbeddingClient, EMBEDDING_DIM};
use crate::error::ApiError;
use qdrant_client::qdrant::{
    CreateCollectionBuilder, Distance, PointStruct, SearchPointsBuilder, UpsertPointsBuilder,
    Value, VectorParamsBuilder,
};
use qdrant_client::Qdrant;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

const DOC_ID_KEY: &str = "doc_id";
const TEXT_KEY: &str = "text";

/// Default number of hits returned by [`VectorStore::search`]
pub const DEFAULT_SEARCH_LIMIT: u64 = 1;

/// A document to index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: u64,
    pub text: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

/// A scored search result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: u64,
    pub text: String,
    pub metadata: HashMap<String, String>,
    pub score: f32,
}

/// Server identification returned by the health check
#[derive(Debug, Clone, Serialize)]
pub struct StoreInfo {
    pub title: String,
    pub version: String,
}

fn to_payload(document: &SearchDocument) -> HashMap<String, Value> {
    let mut payload: HashMap<String, Value> = document
        .metadata
        .iter()
        .map(|(key, value)| (key.clone(), Value::from(value.clone())))
        .collect();
    payload.insert(DOC_ID_KEY.to_string(), Value::from(document.id as i64));
    payload.insert(TEXT_KEY.to_string(), Value::from(document.text.clone()));
    payload
}

fn hit_from_payload(payload: &HashMap<String, Value>, score: f32) -> Result<SearchHit, ApiError> {
    let id = payload
        .get(DOC_ID_KEY)
        .and_then(|v| v.as_integer())
        .ok_or_else(|| ApiError::VectorStore("doc_id missing from payload".to_string()))?;

    let text = payload
        .get(TEXT_KEY)
        .and_then(|v| v.as_str())
        .ok_or_else(|| ApiError::VectorStore("text missing from payload".to_string()))?
        .to_string();

    let metadata = payload
        .iter()
        .filter(|(key, _)| key.as_str() != DOC_ID_KEY && key.as_str() != TEXT_KEY)
        .filter_map(|(key, value)| value.as_str().map(|v| (key.clone(), v.to_string())))
        .collect();

    Ok(SearchHit {
        id: id as u64,
        text,
        metadata,
        score,
    })
}

pub struct VectorStore {
    qdrant: Qdrant,
    embedder: EmbeddingClient,
}

impl VectorStore {
    pub fn new(
        url: &str,
        api_key: Option<String>,
        embedder: EmbeddingClient,
    ) -> Result<Self, ApiError> {
        let qdrant = Qdrant::from_url(url)
            .api_key(api_key)
            .build()
            .map_err(|e| ApiError::VectorStore(format!("Failed to connect to {}: {}", url, e)))?;

        Ok(Self { qdrant, embedder })
    }

    pub async fn info(&self) -> Result<StoreInfo, ApiError> {
        let reply = self
            .qdrant
            .health_check()
            .await
            .map_err(|e| ApiError::VectorStore(e.to_string()))?;

        Ok(StoreInfo {
            title: reply.title,
            version: reply.version,
        })
    }

    /// Create `collection` if it does not exist yet
    pub async fn ensure_collection(&self, collection: &str) -> Result<(), ApiError> {
        let collections = self
            .qdrant
            .list_collections()
            .await
            .map_err(|e| ApiError::VectorStore(e.to_string()))?;
        let exists = collections.collections.iter().any(|c| c.name == collection);

        if !exists {
            info!(collection = %collection, "Creating collection");
            self.qdrant
                .create_collection(
                    CreateCollectionBuilder::new(collection)
                        .vectors_config(VectorParamsBuilder::new(EMBEDDING_DIM, Distance::Cosine)),
                )
                .await
                .map_err(|e| ApiError::VectorStore(e.to_string()))?;
        }

        Ok(())
    }

    /// Embed and upsert `documents`; returns how many were stored
    pub async fn insert(
        &self,
        collection: &str,
        documents: &[SearchDocument],
    ) -> Result<usize, ApiError> {
        let texts: Vec<String> = documents.iter().map(|doc| doc.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let points: Vec<PointStruct> = documents
            .iter()
            .zip(vectors)
            .map(|(doc, vector)| PointStruct::new(doc.id, vector, to_payload(doc)))
            .collect();

        if points.is_empty() {
            return Ok(0);
        }
        let count = points.len();

        self.qdrant
            .upsert_points(UpsertPointsBuilder::new(collection, points).wait(true))
            .await
            .map_err(|e| ApiError::VectorStore(e.to_string()))?;

        info!(collection = %collection, count, "Inserted documents");
        Ok(count)
    }

    /// The `limit` documents closest to `query`
    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        limit: u64,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let vector = self.embedder.embed_one(query).await?;

        let results = self
            .qdrant
            .search_points(SearchPointsBuilder::new(collection, vector, limit).with_payload(true))
            .await
            .map_err(|e| ApiError::VectorStore(e.to_string()))?;

        results
            .result
            .iter()
            .map(|point| hit_from_payload(&point.payload, point.score))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn document() -> SearchDocument {
        SearchDocument {
            id: 42,
            text: "Login fails with a 500 after upgrade".to_string(),
            metadata: HashMap::from([
                ("issue".to_string(), "42".to_string()),
                ("repo".to_string(), "o/r".to_string()),
            ]),
        }
    }

    #[test]
    fn test_payload_round_trip() {
        let doc = document();
        let payload = to_payload(&doc);
        assert_eq!(payload.len(), 4);

        let hit = hit_from_payload(&payload, 0.93).unwrap();
        assert_eq!(hit.id, 42);
        assert_eq!(hit.text, doc.text);
        assert_eq!(hit.metadata, doc.metadata);
        assert!((hit.score - 0.93).abs() < f32::EPSILON);
    }

    #[test]
    fn test_payload_without_text() {
        let mut payload = to_payload(&document());
        payload.remove(TEXT_KEY);
        assert!(matches!(
            hit_from_payload(&payload, 0.5),
            Err(ApiError::VectorStore(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Requires a running Qdrant and OPENAI_API_KEY
    async fn test_insert_and_search_live() {
        let key = std::env::var("OPENAI_API_KEY").unwrap();
        let store =
            VectorStore::new("http://localhost:6334", None, EmbeddingClient::new(&key)).unwrap();
        store.ensure_collection("triage_docs_test").await.unwrap();
        store
            .insert("triage_docs_test", &[document()])
            .await
            .unwrap();

        let hits = store
            .search("triage_docs_test", "login error", DEFAULT_SEARCH_LIMIT)
            .await
            .unwrap();
        assert_eq!(hits[0].id, 42);
    }
}

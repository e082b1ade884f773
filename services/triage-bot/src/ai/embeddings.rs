//! OpenAI embedding client.

use crate::error::ApiError;
use async_openai::config::OpenAIConfig;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_openai::Client;
use tracing::debug;

/// Default embedding model
pub const EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Embedding dimension (OpenAI text-embedding-3-small)
pub const EMBEDDING_DIM: u64 = 1536;

pub struct EmbeddingClient {
    client: Client<OpenAIConfig>,
    model: String,
}

impl EmbeddingClient {
    pub fn new(api_key: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: EMBEDDING_MODEL.to_string(),
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// One vector per input text, in input order
    pub async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ApiError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(model = %self.model, count = texts.len(), "Requesting embeddings");

        let request = CreateEmbeddingRequestArgs::default()
            .model(self.model.as_str())
            .input(EmbeddingInput::StringArray(texts.to_vec()))
            .build()
            .map_err(|e| ApiError::Embedding(e.to_string()))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| ApiError::Embedding(e.to_string()))?;

        let mut data = response.data;
        if data.len() != texts.len() {
            return Err(ApiError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }
        data.sort_by_key(|embedding| embedding.index);

        Ok(data.into_iter().map(|embedding| embedding.embedding).collect())
    }

    pub async fn embed_one(&self, text: &str) -> Result<Vec<f32>, ApiError> {
        self.embed(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| ApiError::Embedding("empty embedding response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_input_skips_request() {
        let client = EmbeddingClient::new("sk-unused");
        assert!(client.embed(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    #[ignore] // Requires OPENAI_API_KEY
    async fn test_embed_live() {
        let key = std::env::var("OPENAI_API_KEY").unwrap();
        let client = EmbeddingClient::new(&key);
        let vector = client.embed_one("flaky test on CI").await.unwrap();
        assert_eq!(vector.len() as u64, EMBEDDING_DIM);
    }
}

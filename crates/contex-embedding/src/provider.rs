//! The embedding model as an opaque function (spec §4.1): `encode(text) ->
//! vector`. `EmbeddingProvider` is the dyn-compatible trait every concrete
//! backend implements; `HttpEmbeddingProvider` is the shipped
//! OpenAI-compatible implementation, grounded on `ai-client`'s
//! status-check-then-`.json()` request idiom.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{EmbeddingError, EmbeddingResult};

pub const EMBEDDING_DIM: usize = 384;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>>;
    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>>;
    fn model_version(&self) -> &str;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: EmbeddingInput<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum EmbeddingInput<'a> {
    One(&'a str),
    Many(&'a [String]),
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

pub struct HttpEmbeddingProvider {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl HttpEmbeddingProvider {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key,
            model: model.into(),
        }
    }

    async fn post(&self, input: EmbeddingInput<'_>) -> EmbeddingResult<EmbeddingResponse> {
        let url = format!("{}/embeddings", self.base_url);
        let mut req = self.http.post(&url).json(&EmbeddingRequest { model: &self.model, input });
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| EmbeddingError::Provider(e.into()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::Provider(anyhow::anyhow!(
                "embedding API error ({status}): {body}"
            )));
        }

        response.json().await.map_err(|e| EmbeddingError::Provider(e.into()))
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> EmbeddingResult<Vec<f32>> {
        let mut response = self.post(EmbeddingInput::One(text)).await?;
        let vector = response
            .data
            .pop()
            .ok_or_else(|| EmbeddingError::Provider(anyhow::anyhow!("empty embedding response")))?
            .embedding;
        check_dimension(vector)
    }

    async fn embed_batch(&self, texts: &[String]) -> EmbeddingResult<Vec<Vec<f32>>> {
        let response = self.post(EmbeddingInput::Many(texts)).await?;
        response.data.into_iter().map(|d| check_dimension(d.embedding)).collect()
    }

    fn model_version(&self) -> &str {
        &self.model
    }
}

fn check_dimension(vector: Vec<f32>) -> EmbeddingResult<Vec<f32>> {
    if vector.len() != EMBEDDING_DIM {
        return Err(EmbeddingError::DimensionMismatch { expected: EMBEDDING_DIM, got: vector.len() });
    }
    Ok(vector)
}

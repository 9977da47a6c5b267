//! REST client for a remote embedding/generation endpoint.
//!
//! Speaks a Vertex-style predict API: `POST {endpoint}/v1/models/{model}:predict`
//! for embeddings and `:generateText` for copy generation. Rate-limited so a
//! wide pipeline cannot stampede the endpoint, and authenticated with a
//! bearer token read from a configured environment variable at construction
//! time (never lazily).

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use skuforge_core::config::EmbeddingConfig;
use skuforge_core::{Error, Result};

use crate::embedding::{EmbeddingPair, EmbeddingProvider, GenerationParams};

type DirectLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct RemoteEmbeddingClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    token: String,
    dimension: usize,
    limiter: Arc<DirectLimiter>,
}

impl RemoteEmbeddingClient {
    /// Build a client from the embedding config section.
    ///
    /// Fails when no endpoint is configured or the token env var named by
    /// `config.token_env` is unset or empty.
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::validation("embedding.endpoint is not configured"))?;

        let token = std::env::var(&config.token_env)
            .ok()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                Error::environment(format!("{} is not set", config.token_env))
            })?;

        let rps = NonZeroU32::new(config.requests_per_second).ok_or_else(|| {
            Error::validation("embedding.requests_per_second must be positive")
        })?;
        let limiter = Arc::new(RateLimiter::direct(Quota::per_second(rps)));

        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            token,
            dimension: config.dimension,
            limiter,
        })
    }

    async fn post<Req: Serialize, Resp: serde::de::DeserializeOwned>(
        &self,
        verb: &str,
        body: &Req,
    ) -> Result<Resp> {
        self.limiter.until_ready().await;

        let url = format!("{}/v1/models/{}:{verb}", self.endpoint, self.model);
        let resp = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| Error::provider(format!("{verb} request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::provider(format!(
                "{verb} endpoint returned {status}: {body}"
            )));
        }

        resp.json::<Resp>()
            .await
            .map_err(|e| Error::provider(format!("{verb} response parse error: {e}")))
    }
}

#[async_trait::async_trait]
impl EmbeddingProvider for RemoteEmbeddingClient {
    fn name(&self) -> &'static str {
        "remote"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, image_url: &str, contextual_text: &str) -> Result<EmbeddingPair> {
        let request = EmbedRequest {
            instances: vec![EmbedInstance {
                image_uri: image_url,
                text: contextual_text,
            }],
            parameters: EmbedParameters {
                dimension: self.dimension,
            },
        };

        let response: EmbedResponse = self.post("predict", &request).await?;
        let prediction = response
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider("predict response carried no predictions"))?;

        for (side, vector) in [
            ("image", &prediction.image_embedding),
            ("text", &prediction.text_embedding),
        ] {
            if vector.len() != self.dimension {
                return Err(Error::provider(format!(
                    "{side} embedding has dimension {} (expected {})",
                    vector.len(),
                    self.dimension
                )));
            }
        }

        Ok(EmbeddingPair {
            image: prediction.image_embedding,
            text: prediction.text_embedding,
        })
    }

    async fn generate_text(&self, prompt: &str, params: &GenerationParams) -> Result<String> {
        let request = GenerateRequest {
            prompt,
            parameters: GenerateParameters {
                max_output_tokens: params.max_output_tokens,
                temperature: params.temperature,
            },
        };

        let response: GenerateResponse = self.post("generateText", &request).await?;
        let prediction = response
            .predictions
            .into_iter()
            .next()
            .ok_or_else(|| Error::provider("generateText response carried no predictions"))?;

        Ok(prediction.content)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    instances: Vec<EmbedInstance<'a>>,
    parameters: EmbedParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedInstance<'a> {
    image_uri: &'a str,
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct EmbedParameters {
    dimension: usize,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    predictions: Vec<EmbedPrediction>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EmbedPrediction {
    image_embedding: Vec<f32>,
    text_embedding: Vec<f32>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    parameters: GenerateParameters,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateParameters {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    predictions: Vec<GeneratePrediction>,
}

#[derive(Debug, Deserialize)]
struct GeneratePrediction {
    content: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{bearer_token, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: &str, token_env: &str, dimension: usize) -> EmbeddingConfig {
        EmbeddingConfig {
            endpoint: Some(endpoint.to_string()),
            dimension,
            token_env: token_env.to_string(),
            ..EmbeddingConfig::default()
        }
    }

    #[test]
    fn test_new_requires_endpoint() {
        let config = EmbeddingConfig::default();
        let err = RemoteEmbeddingClient::new(&config).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_new_requires_token_env() {
        let config = test_config("http://localhost:1", "SKUFORGE_TEST_TOKEN_UNSET", 4);
        let err = RemoteEmbeddingClient::new(&config).unwrap_err();
        assert!(matches!(err, Error::Environment(_)));
        assert!(err.to_string().contains("SKUFORGE_TEST_TOKEN_UNSET"));
    }

    #[tokio::test]
    async fn test_embed_success() {
        std::env::set_var("SKUFORGE_TEST_TOKEN_EMBED", "secret-token");
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/models/multimodalembedding:predict"))
            .and(bearer_token("secret-token"))
            .and(body_partial_json(serde_json::json!({
                "parameters": { "dimension": 4 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{
                    "imageEmbedding": [0.1, 0.2, 0.3, 0.4],
                    "textEmbedding": [0.5, 0.6, 0.7, 0.8]
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), "SKUFORGE_TEST_TOKEN_EMBED", 4);
        let client = RemoteEmbeddingClient::new(&config).unwrap();

        let pair = client
            .embed("local://assets/images/SKU-1.jpg", "Denim Jacket Acme")
            .await
            .unwrap();
        assert_eq!(pair.image, vec![0.1, 0.2, 0.3, 0.4]);
        assert_eq!(pair.text, vec![0.5, 0.6, 0.7, 0.8]);
    }

    #[tokio::test]
    async fn test_embed_error_includes_status() {
        std::env::set_var("SKUFORGE_TEST_TOKEN_STATUS", "secret-token");
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), "SKUFORGE_TEST_TOKEN_STATUS", 4);
        let client = RemoteEmbeddingClient::new(&config).unwrap();

        let err = client.embed("local://x.jpg", "text").await.unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("429"), "got: {msg}");
        assert!(msg.contains("quota exhausted"), "got: {msg}");
    }

    #[tokio::test]
    async fn test_embed_rejects_wrong_dimension() {
        std::env::set_var("SKUFORGE_TEST_TOKEN_DIM", "secret-token");
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{
                    "imageEmbedding": [0.1, 0.2],
                    "textEmbedding": [0.5, 0.6]
                }]
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), "SKUFORGE_TEST_TOKEN_DIM", 4);
        let client = RemoteEmbeddingClient::new(&config).unwrap();

        let err = client.embed("local://x.jpg", "text").await.unwrap_err();
        assert!(err.to_string().contains("dimension"), "got: {err}");
    }

    #[tokio::test]
    async fn test_generate_text_success() {
        std::env::set_var("SKUFORGE_TEST_TOKEN_GEN", "secret-token");
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/models/multimodalembedding:generateText"))
            .and(body_partial_json(serde_json::json!({
                "parameters": { "maxOutputTokens": 1024, "temperature": 0.5 }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "predictions": [{ "content": "A finely crafted jacket." }]
            })))
            .mount(&server)
            .await;

        let config = test_config(&server.uri(), "SKUFORGE_TEST_TOKEN_GEN", 4);
        let client = RemoteEmbeddingClient::new(&config).unwrap();

        let copy = client
            .generate_text("Describe this product", &GenerationParams::default())
            .await
            .unwrap();
        assert_eq!(copy, "A finely crafted jacket.");
    }
}

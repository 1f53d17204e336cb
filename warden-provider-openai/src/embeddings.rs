//! OpenAI Embeddings API implementation.

use std::future::Future;

use warden_types::{
    EmbeddingError, EmbeddingProvider, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage,
};

use crate::client::OpenAi;

/// Default embedding model used when none is specified on the request.
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

impl OpenAi {
    /// Build the embeddings endpoint URL.
    pub(crate) fn embeddings_url(&self) -> String {
        format!("{}/v1/embeddings", self.base_url)
    }
}

/// Map an HTTP status code from the embeddings endpoint to an [`EmbeddingError`].
fn map_embedding_http_status(status: reqwest::StatusCode, body: &str) -> EmbeddingError {
    match status.as_u16() {
        401 | 403 => EmbeddingError::Authentication(body.to_string()),
        429 => EmbeddingError::RateLimit {
            retry_after: parse_retry_after(body),
        },
        400 | 404 => EmbeddingError::InvalidRequest(body.to_string()),
        _ => EmbeddingError::Other(body.to_string().into()),
    }
}

/// Attempt to parse a retry delay from an OpenAI error body.
fn parse_retry_after(body: &str) -> Option<std::time::Duration> {
    let lower = body.to_lowercase();
    if let Some(idx) = lower.find("retry after ") {
        let after = &lower[idx + 12..];
        let num_str: String = after.chars().take_while(|c| c.is_ascii_digit()).collect();
        if let Ok(secs) = num_str.parse::<u64>() {
            return Some(std::time::Duration::from_secs(secs));
        }
    }
    None
}

/// Map a [`reqwest::Error`] to an [`EmbeddingError`].
fn map_reqwest_error(err: reqwest::Error) -> EmbeddingError {
    EmbeddingError::Network(Box::new(err))
}

impl EmbeddingProvider for OpenAi {
    /// Generate embeddings via the OpenAI Embeddings API.
    ///
    /// Sends a POST request to `{base_url}/v1/embeddings` with the model,
    /// input texts, and optional dimensions. Returns one embedding vector
    /// per input string.
    fn embed(
        &self,
        request: EmbeddingRequest,
    ) -> impl Future<Output = Result<EmbeddingResponse, EmbeddingError>> + Send {
        let url = self.embeddings_url();
        let api_key = self.api_key.clone();
        let organization = self.organization.clone();
        let http_client = self.client.clone();

        async move {
            let model = if request.model.is_empty() {
                DEFAULT_EMBEDDING_MODEL.to_string()
            } else {
                request.model
            };

            let mut body = serde_json::json!({
                "model": model,
                "input": request.input,
                "encoding_format": "float",
            });

            if let Some(dims) = request.dimensions {
                body["dimensions"] = serde_json::json!(dims);
            }

            // Merge extra fields into the body
            if let serde_json::Value::Object(body_map) = &mut body {
                for (key, value) in request.extra {
                    body_map.insert(key, value);
                }
            }

            tracing::debug!(url = %url, model = %body["model"], "sending embedding request");

            let mut req = http_client
                .post(&url)
                .header("authorization", format!("Bearer {api_key}"))
                .header("content-type", "application/json")
                .json(&body);

            if let Some(org) = &organization {
                req = req.header("openai-organization", org);
            }

            let response = req.send().await.map_err(map_reqwest_error)?;

            let status = response.status();
            let response_text = response.text().await.map_err(map_reqwest_error)?;

            if !status.is_success() {
                return Err(map_embedding_http_status(status, &response_text));
            }

            let json: serde_json::Value = serde_json::from_str(&response_text).map_err(|e| {
                EmbeddingError::InvalidRequest(format!("invalid JSON response: {e}"))
            })?;

            parse_embedding_response(&json, &model)
        }
    }
}

/// Parse an OpenAI embeddings API response into an [`EmbeddingResponse`].
fn parse_embedding_response(
    json: &serde_json::Value,
    default_model: &str,
) -> Result<EmbeddingResponse, EmbeddingError> {
    let data = json["data"]
        .as_array()
        .ok_or_else(|| EmbeddingError::InvalidRequest("missing 'data' array".to_string()))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item["embedding"]
            .as_array()
            .ok_or_else(|| {
                EmbeddingError::InvalidRequest("missing 'embedding' array in data item".to_string())
            })?
            .iter()
            .map(|v| {
                v.as_f64().map(|f| f as f32).ok_or_else(|| {
                    EmbeddingError::InvalidRequest("non-numeric value in embedding".to_string())
                })
            })
            .collect::<Result<Vec<f32>, _>>()?;
        embeddings.push(embedding);
    }

    let model = json["model"].as_str().unwrap_or(default_model).to_string();

    let usage = &json["usage"];
    let prompt_tokens = usage["prompt_tokens"].as_u64().unwrap_or(0) as usize;
    let total_tokens = usage["total_tokens"].as_u64().unwrap_or(0) as usize;

    Ok(EmbeddingResponse {
        embeddings,
        model,
        usage: EmbeddingUsage {
            prompt_tokens,
            total_tokens,
        },
    })
}

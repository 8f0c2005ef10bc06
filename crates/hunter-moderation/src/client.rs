//! Moderation service HTTP client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use hunter_models::ClassificationResult;

use crate::config::ModerationConfig;
use crate::error::{ModerationError, ModerationResult};
use crate::types::{ModerationRequest, ModerationResponse};

/// External text classifier.
///
/// One call is one external request. Implementations report every failure as
/// an error; the gateway decides what a failure means for the caller.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> ModerationResult<ClassificationResult>;
}

/// Client for an OpenAI-compatible moderation endpoint.
pub struct ModerationClient {
    http: Client,
    config: ModerationConfig,
}

impl ModerationClient {
    /// Create a new moderation client.
    pub fn new(config: ModerationConfig) -> ModerationResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(ModerationError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> ModerationResult<Self> {
        Self::new(ModerationConfig::from_env())
    }

    pub fn config(&self) -> &ModerationConfig {
        &self.config
    }
}

#[async_trait]
impl Classifier for ModerationClient {
    async fn classify(&self, text: &str) -> ModerationResult<ClassificationResult> {
        let body = ModerationRequest {
            input: text.to_string(),
            model: self.config.model.clone(),
        };

        debug!(url = %self.config.api_url, chars = text.len(), "Sending moderation request");

        let mut request = self.http.post(&self.config.api_url).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                ModerationError::Timeout(self.config.timeout.as_secs())
            } else {
                ModerationError::Network(e)
            }
        })?;

        let status = response.status();
        if status == reqwest::StatusCode::SERVICE_UNAVAILABLE {
            return Err(ModerationError::ServiceUnavailable(status.to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ModerationError::RequestFailed(format!(
                "Moderation service returned {}: {}",
                status, body
            )));
        }

        let bytes = response.bytes().await?;
        let parsed: ModerationResponse = serde_json::from_slice(&bytes)?;
        parsed
            .first_verdict()
            .ok_or_else(|| ModerationError::InvalidResponse("response has no results".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> ModerationClient {
        let config = ModerationConfig::default()
            .with_api_url(format!("{}/v1/moderations", server.uri()))
            .with_api_key("test-key");
        ModerationClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_flagged_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/moderations"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({
                "input": "some text",
                "model": "text-moderation-latest"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "modr-1",
                "model": "text-moderation-007",
                "results": [{
                    "flagged": true,
                    "categories": {"hate": true, "violence": false, "harassment": true},
                    "category_scores": {"hate": 0.91, "violence": 0.01, "harassment": 0.7}
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client_for(&server).classify("some text").await.unwrap();
        assert!(result.flagged);
        assert_eq!(result.categories_label(), "harassment, hate");
    }

    #[tokio::test]
    async fn test_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = client_for(&server).classify("text").await.unwrap_err();
        assert!(matches!(err, ModerationError::RequestFailed(ref msg) if msg.contains("429")));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = client_for(&server).classify("text").await.unwrap_err();
        assert!(matches!(err, ModerationError::Json(_)));
    }

    #[tokio::test]
    async fn test_empty_results() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).classify("text").await.unwrap_err();
        assert!(matches!(err, ModerationError::InvalidResponse(_)));
    }
}

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::constants::*;
use crate::error_rules::ErrorRules;
use crate::media::InlinePayload;
use crate::specs::gemini::{GenerateContentRequest, GenerationConfig};
use crate::types::{PrismError, Result};

/// Upstream `generateContent` response, passed through untouched except for
/// optional in-place text reshaping.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewayResponse(pub Value);

impl GatewayResponse {
    pub fn new(body: Value) -> Self {
        Self(body)
    }

    /// `candidates[0].content.parts[0].text`, if the response has that shape.
    pub fn text(&self) -> Option<&str> {
        self.0.pointer("/candidates/0/content/parts/0/text")?.as_str()
    }

    pub fn text_mut(&mut self) -> Option<&mut String> {
        match self.0.pointer_mut("/candidates/0/content/parts/0/text") {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    pub fn text_or_unexpected(&self) -> &str {
        match self.text() {
            Some(t) => t,
            None => UNEXPECTED_RESPONSE_FORMAT,
        }
    }

    pub fn candidate_count(&self) -> usize {
        match self.0.get("candidates").and_then(|c| c.as_array()) {
            Some(c) => c.len(),
            None => 0,
        }
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Single-shot client for the Gemini `generateContent` endpoint.
///
/// One inbound request maps to exactly one outbound call. Nothing here retries;
/// overload and quota failures are classified and surfaced so the caller can decide.
pub struct GeminiGateway {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
    rules: Arc<ErrorRules>,
}

impl GeminiGateway {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        rules: Arc<ErrorRules>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            model: model.into(),
            api_key: api_key.into(),
            rules,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    #[tracing::instrument(
        name = "gateway.generate",
        skip_all,
        fields(model = %self.model, http.status = tracing::field::Empty)
    )]
    pub async fn generate<T>(&self, body: &T) -> Result<GatewayResponse>
    where
        T: Serialize + ?Sized,
    {
        let started = std::time::Instant::now();
        let response = self
            .client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(body)
            .send()
            .await
            // The URL carries the API key; keep it out of error messages.
            .map_err(|e| PrismError::Network(e.without_url()))?;

        let status = response.status();
        tracing::Span::current().record("http.status", status.as_u16());

        if !status.is_success() {
            let error_body = match response.text().await {
                Ok(text) => text,
                Err(e) => format!("Upstream error (body unreadable): {}", e.without_url()),
            };
            tracing::error!(
                "[gemini] Upstream Error {}: {}",
                status,
                crate::str_utils::prefix_chars(&error_body, 500)
            );
            return Err(self.rules.classify(status, error_body).into());
        }

        let body = response
            .json::<Value>()
            .await
            .map_err(|e| PrismError::Network(e.without_url()))?;
        let response = GatewayResponse::new(body);

        tracing::info!(
            "[gemini] Status: {} | Candidates: {} | {}ms",
            status,
            response.candidate_count(),
            started.elapsed().as_millis()
        );
        Ok(response)
    }

    /// Sends `[prompt, inline?]` as one user turn and asks for plain text back.
    pub async fn generate_parts(
        &self,
        prompt: &str,
        inline: Option<InlinePayload>,
    ) -> Result<GatewayResponse> {
        if let Some(ref part) = inline {
            tracing::debug!(
                "Inline part: {} ({} base64 chars)",
                part.mime_type,
                part.data.len()
            );
        }
        let request = GenerateContentRequest::user_turn(prompt, inline).with_config(
            GenerationConfig {
                response_mime_type: Some(MEDIA_RESPONSE_MIME_TYPE.to_string()),
                ..Default::default()
            },
        );
        self.generate(&request).await
    }

    pub async fn smoke_test(&self) -> Result<GatewayResponse> {
        let request = GenerateContentRequest::user_turn(SMOKE_TEST_PROMPT, None).with_config(
            GenerationConfig {
                temperature: Some(0.7),
                max_output_tokens: Some(100),
                response_mime_type: None,
            },
        );
        self.generate(&request).await
    }
}

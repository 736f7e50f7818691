//! GeminiCoach - direct REST implementation of the coach collaborator.
//!
//! Calls `generateContent` with a system instruction per operation. Routing
//! and simulation turns request a JSON response matching a schema; debriefs
//! are free text.

use crate::coach::{Classification, Coach, SimulationReply, prompt};
use crate::config::CoachConfig;
use crate::dialogue::mode::{Mode, SimulationContext};
use crate::error::{EchoError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::Duration;

/// Coach backed by the Gemini HTTP API.
#[derive(Clone)]
pub struct GeminiCoach {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    language: String,
}

impl GeminiCoach {
    /// Build a coach from configuration.
    ///
    /// Fails with `CollaboratorNotConfigured` when no API key is set.
    pub fn from_config(config: &CoachConfig, language: &str) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| EchoError::CollaboratorNotConfigured {
                message: "no API key (set ECHOCOACH_API_KEY or coach.api_key)".to_string(),
            })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EchoError::CollaboratorNotConfigured {
                message: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            api_key,
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: language.to_string(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        system_instruction: String,
        contents: String,
        response_schema: Option<Value>,
    ) -> Result<String> {
        let request = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: contents }],
            }],
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: system_instruction,
                }],
            },
            generation_config: response_schema.map(|schema| GenerationConfig {
                response_mime_type: "application/json",
                response_schema: schema,
            }),
        };

        let url = format!("{}/{}:generateContent", self.base_url, self.model);
        tracing::debug!(model = %self.model, "sending generateContent request");

        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|err| EchoError::CollaboratorRequest {
                status: None,
                message: format!("Gemini API request failed: {err}"),
                retryable: err.is_connect() || err.is_timeout(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read Gemini error body".to_string());
            return Err(map_http_error(status, &body));
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|err| EchoError::CollaboratorResponse {
                    message: format!("Failed to parse Gemini response: {err}"),
                })?;

        extract_text_response(parsed)
    }
}

#[async_trait]
impl Coach for GeminiCoach {
    async fn classify(&self, user_text: &str) -> Result<Classification> {
        let text = self
            .generate(
                prompt::classify_instruction(&self.language),
                prompt::classify_contents(user_text),
                Some(classify_schema()),
            )
            .await?;
        parse_classification(&text)
    }

    async fn simulation_turn(
        &self,
        context: &SimulationContext,
        user_text: &str,
    ) -> Result<SimulationReply> {
        let text = self
            .generate(
                prompt::simulation_instruction(&self.language, context),
                prompt::simulation_contents(user_text),
                Some(simulation_schema()),
            )
            .await?;
        parse_simulation_reply(&text)
    }

    async fn debrief(&self, conversation: &str) -> Result<String> {
        let text = self
            .generate(
                prompt::debrief_instruction(&self.language),
                prompt::debrief_contents(conversation),
                None,
            )
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(EchoError::CollaboratorResponse {
                message: "empty debrief".to_string(),
            });
        }
        Ok(text.to_string())
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn classify_schema() -> Value {
    let modes: Vec<&str> = Mode::ALL.iter().map(|m| m.wire_name()).collect();
    json!({
        "type": "OBJECT",
        "properties": {
            "nextMode": { "type": "STRING", "enum": modes },
            "response": { "type": "STRING" }
        },
        "required": ["nextMode", "response"]
    })
}

fn simulation_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "personaResponse": {
                "type": "STRING",
                "description": "The reply of the character you play."
            },
            "coachComment": {
                "type": "STRING",
                "description": "The coach's comment (or null).",
                "nullable": true
            }
        },
        "required": ["personaResponse"]
    })
}

/// Models occasionally wrap JSON in a markdown fence even when asked not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassificationPayload {
    next_mode: Option<String>,
    response: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimulationPayload {
    persona_response: Option<String>,
    coach_comment: Option<String>,
}

pub(crate) fn parse_classification(text: &str) -> Result<Classification> {
    let payload: ClassificationPayload =
        serde_json::from_str(strip_code_fence(text)).map_err(|e| {
            EchoError::CollaboratorResponse {
                message: format!("classification is not valid JSON: {e}"),
            }
        })?;

    let response = payload
        .response
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| EchoError::CollaboratorResponse {
            message: "classification has no response text".to_string(),
        })?;

    let next_mode = payload
        .next_mode
        .as_deref()
        .map(Mode::from_wire_or_idle)
        .unwrap_or_default();

    Ok(Classification {
        next_mode,
        response,
    })
}

pub(crate) fn parse_simulation_reply(text: &str) -> Result<SimulationReply> {
    let payload: SimulationPayload =
        serde_json::from_str(strip_code_fence(text)).map_err(|e| {
            EchoError::CollaboratorResponse {
                message: format!("simulation reply is not valid JSON: {e}"),
            }
        })?;

    let persona_response = payload
        .persona_response
        .filter(|r| !r.trim().is_empty())
        .ok_or_else(|| EchoError::CollaboratorResponse {
            message: "simulation reply has no personaResponse".to_string(),
        })?;

    Ok(SimulationReply {
        persona_response,
        coach_comment: payload.coach_comment.filter(|c| !c.trim().is_empty()),
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    system_instruction: Content,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    response_mime_type: &'static str,
    response_schema: Value,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<ContentResponse>,
}

#[derive(Deserialize)]
struct ContentResponse {
    #[serde(default)]
    parts: Vec<PartResponse>,
}

#[derive(Deserialize)]
struct PartResponse {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorWrapper {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    status: Option<String>,
}

fn extract_text_response(response: GenerateContentResponse) -> Result<String> {
    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .filter(|text| !text.trim().is_empty())
        .ok_or_else(|| EchoError::CollaboratorResponse {
            message: "Gemini API returned no text in the response candidates".to_string(),
        })
}

fn map_http_error(status: StatusCode, body: &str) -> EchoError {
    let message = serde_json::from_str::<ErrorWrapper>(body)
        .map(|wrapper| {
            let status_text = wrapper.error.status.unwrap_or_default();
            let msg = wrapper.error.message.unwrap_or_else(|| body.to_string());
            if status_text.is_empty() {
                msg
            } else {
                format!("{status_text}: {msg}")
            }
        })
        .unwrap_or_else(|_| body.to_string());

    let retryable = matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    );

    EchoError::CollaboratorRequest {
        status: Some(status.as_u16()),
        message,
        retryable,
    }
}

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::config::OpenAiSettings;
use crate::models::extraction::strip_code_fences;
use crate::models::ExtractedPreferences;
use crate::services::{
    ExplanationGenerator, ExplanationRequest, PreferenceExtractor, ServiceError, Transcriber,
};

const EXTRACTION_PROMPT: &str = r#"You convert senior living consultation transcripts into JSON.
Output ONLY a single JSON object, no prose and no Markdown.

Fields:
{
  "name_of_patient": "",
  "age_of_patient": "",
  "injury_or_reason": "",
  "primary_contact_information": {"name": "", "phone_number": "", "email": ""},
  "mentally": "",
  "care_level": "",
  "preferred_location": [],
  "enhanced": "",
  "enriched": "",
  "move_in_window": "",
  "max_budget": null,
  "pet_friendly": "",
  "tour_availability": [],
  "other_keywords": {}
}

Rules:
- care_level is one of "Independent Living", "Assisted Living", "Enhanced Assisted Living", "Memory Care".
- max_budget is the monthly budget as a plain number (4000, not "$4,000"); use the maximum if several are given; null if none.
- enhanced / enriched are "yes" only when explicitly required.
- move_in_window uses YYYY-MM-DD dates when the transcript gives dates.
- Leave a field empty when the transcript does not mention it."#;

/// Model names used for each call
#[derive(Debug, Clone)]
pub struct OpenAiModels {
    pub transcription: String,
    pub extraction: String,
    pub explanation: String,
}

/// Client for an OpenAI-compatible API
///
/// Handles the three external AI steps of a consultation:
/// - transcribing the uploaded recording
/// - extracting structured preferences from the transcript
/// - writing a short explanation for each top match
pub struct OpenAiClient {
    base_url: String,
    api_key: String,
    client: Client,
    models: OpenAiModels,
    explanation_max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: String,
        api_key: String,
        models: OpenAiModels,
        timeout: Duration,
    ) -> Result<Self, ServiceError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
            models,
            explanation_max_tokens: 200,
        })
    }

    pub fn from_settings(settings: &OpenAiSettings) -> Result<Self, ServiceError> {
        let models = OpenAiModels {
            transcription: settings.transcription_model.clone(),
            extraction: settings.extraction_model.clone(),
            explanation: settings.explanation_model.clone(),
        };

        let mut client = Self::new(
            settings.endpoint.clone(),
            settings.api_key.clone(),
            models,
            Duration::from_secs(settings.timeout_secs),
        )?;
        client.explanation_max_tokens = settings.explanation_max_tokens;
        Ok(client)
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn chat(
        &self,
        model: &str,
        messages: Vec<ChatMessage<'_>>,
        temperature: Option<f32>,
        max_tokens: Option<u32>,
    ) -> Result<String, ServiceError> {
        let request = ChatRequest {
            model,
            messages,
            temperature,
            max_tokens,
        };

        tracing::debug!("Sending chat completion request (model: {})", model);

        let response = self
            .client
            .post(self.url("chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::InvalidResponse(format!("Failed to parse chat response: {}", e)))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        Ok(content)
    }
}

async fn check_status(response: Response) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ServiceError::Unauthorized);
    }

    let message = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read body".to_string());
    tracing::error!("AI service returned {}: {}", status, message);

    Err(ServiceError::ApiError {
        status: status.as_u16(),
        message,
    })
}

impl Transcriber for OpenAiClient {
    async fn transcribe(&self, audio: &Path) -> Result<String, ServiceError> {
        let bytes = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "consultation.m4a".to_string());

        tracing::info!("Transcribing {} ({} bytes)", file_name, bytes.len());

        let form = Form::new()
            .text("model", self.models.transcription.clone())
            .part("file", Part::bytes(bytes).file_name(file_name));

        let response = self
            .client
            .post(self.url("audio/transcriptions"))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let response = check_status(response).await?;
        let body: TranscriptionResponse = response.json().await.map_err(|e| {
            ServiceError::InvalidResponse(format!("Failed to parse transcription: {}", e))
        })?;

        if body.text.trim().is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        Ok(body.text)
    }
}

impl PreferenceExtractor for OpenAiClient {
    async fn extract(&self, transcript: &str) -> Result<ExtractedPreferences, ServiceError> {
        let messages = vec![
            ChatMessage {
                role: "system",
                content: EXTRACTION_PROMPT,
            },
            ChatMessage {
                role: "user",
                content: transcript,
            },
        ];

        let raw = self.chat(&self.models.extraction, messages, Some(0.0), None).await?;
        let json = strip_code_fences(&raw);
        if json.is_empty() {
            return Err(ServiceError::EmptyResponse);
        }

        serde_json::from_str(json)
            .map_err(|e| ServiceError::InvalidResponse(format!("Extraction is not valid JSON: {}", e)))
    }
}

impl ExplanationGenerator for OpenAiClient {
    async fn explain(&self, request: &ExplanationRequest<'_>) -> Result<String, ServiceError> {
        let prompt = explanation_prompt(request);
        let messages = vec![ChatMessage {
            role: "user",
            content: &prompt,
        }];

        let text = self
            .chat(
                &self.models.explanation,
                messages,
                Some(0.5),
                Some(self.explanation_max_tokens),
            )
            .await?;

        Ok(text.trim().to_string())
    }
}

fn explanation_prompt(request: &ExplanationRequest<'_>) -> String {
    let prefs = request.preferences;
    let community = request.community;
    let location = community.location.geocode_queries().pop().unwrap_or_else(|| "N/A".to_string());
    let rate = community
        .monthly_rate
        .map(|r| r.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let distance = request
        .distance_miles
        .map(|d| format!("{:.1} miles", d))
        .unwrap_or_else(|| "N/A".to_string());
    let offered = community
        .care_levels
        .iter()
        .map(|l| l.label())
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "As a senior living placement advisor, explain in 2-3 concise sentences why this community is a good match for the client.\n\n\
         Client needs:\n\
         - Care level: {care}\n\
         - Budget: {budget}\n\
         - Preferred location: {locations}\n\
         - Special requirements: enhanced={enhanced}, enriched={enriched}\n\n\
         Community:\n\
         - Name: {name}\n\
         - Services: {offered}\n\
         - Location: {location}\n\
         - Monthly fee: {rate}\n\
         - Distance: {distance}\n\
         - Priority: {tier} ({tier_desc})\n\n\
         Focus on care level fit, location convenience, value, and why this priority tier makes sense.",
        care = prefs.care_level_label(),
        budget = prefs.budget_label(),
        locations = prefs.locations_label(),
        enhanced = if prefs.enhanced_needed { "yes" } else { "no" },
        enriched = if prefs.enriched_needed { "yes" } else { "no" },
        name = community.display_name(),
        offered = offered,
        location = location,
        rate = rate,
        distance = distance,
        tier = request.tier,
        tier_desc = request.tier.description(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CareLevel, CommunityRecord, PreferenceRecord, Tier};

    fn test_client(base_url: String) -> OpenAiClient {
        OpenAiClient::new(
            base_url,
            "test_key".to_string(),
            OpenAiModels {
                transcription: "whisper-1".to_string(),
                extraction: "gpt-4o".to_string(),
                explanation: "gpt-4o-mini".to_string(),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    fn chat_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[test]
    fn test_client_creation() {
        let client = test_client("https://api.test/v1/".to_string());
        assert_eq!(client.url("chat/completions"), "https://api.test/v1/chat/completions");
        assert_eq!(client.api_key, "test_key");
    }

    #[tokio::test]
    async fn test_extract_strips_fences() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer test_key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body("```json\n{\"name_of_patient\": \"Ruth\", \"care_level\": \"Memory Care\"}\n```"))
            .create_async()
            .await;

        let client = test_client(server.url());
        let extracted = client.extract("transcript text").await.unwrap();
        let record = extracted.into_record(None);

        mock.assert_async().await;
        assert_eq!(record.client_name, "Ruth");
        assert_eq!(record.care_level, Some(CareLevel::MemoryCare));
    }

    #[tokio::test]
    async fn test_extract_rejects_invalid_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body("I could not find any details."))
            .create_async()
            .await;

        let client = test_client(server.url());
        assert!(matches!(
            client.extract("transcript").await,
            Err(ServiceError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(401)
            .create_async()
            .await;

        let client = test_client(server.url());
        assert!(matches!(client.extract("t").await, Err(ServiceError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_api_error_carries_status() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let client = test_client(server.url());
        let record = PreferenceRecord::default();
        let community = CommunityRecord::default();
        let request = ExplanationRequest {
            preferences: &record,
            community: &community,
            tier: Tier::One,
            distance_miles: None,
        };

        match client.explain(&request).await {
            Err(ServiceError::ApiError { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected ApiError, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_explain_empty_content() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(chat_body("   "))
            .create_async()
            .await;

        let client = test_client(server.url());
        let record = PreferenceRecord::default();
        let community = CommunityRecord::default();
        let request = ExplanationRequest {
            preferences: &record,
            community: &community,
            tier: Tier::Two,
            distance_miles: Some(3.2),
        };

        assert!(matches!(client.explain(&request).await, Err(ServiceError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_transcribe() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/audio/transcriptions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"text": "My mother needs memory care near Pittsford."}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let audio = dir.path().join("consult.m4a");
        std::fs::write(&audio, b"fake audio").unwrap();

        let client = test_client(server.url());
        let text = client.transcribe(&audio).await.unwrap();

        mock.assert_async().await;
        assert!(text.contains("memory care"));
    }

    #[tokio::test]
    async fn test_transcribe_missing_file() {
        let client = test_client("http://127.0.0.1:9".to_string());
        let result = client.transcribe(Path::new("/nonexistent/consult.m4a")).await;
        assert!(matches!(result, Err(ServiceError::Io(_))));
    }

    #[test]
    fn test_explanation_prompt_mentions_community() {
        let record = PreferenceRecord {
            care_level: Some(CareLevel::MemoryCare),
            monthly_budget: Some(6000.0),
            ..PreferenceRecord::default()
        };
        let community = CommunityRecord {
            name: Some("Maple Grove".to_string()),
            ..CommunityRecord::default()
        };
        let prompt = explanation_prompt(&ExplanationRequest {
            preferences: &record,
            community: &community,
            tier: Tier::One,
            distance_miles: Some(4.25),
        });

        assert!(prompt.contains("Maple Grove"));
        assert!(prompt.contains("Memory Care"));
        assert!(prompt.contains("$6,000"));
        assert!(prompt.contains("4.2 miles") || prompt.contains("4.3 miles"));
        assert!(prompt.contains("Contracted rates"));
    }
}

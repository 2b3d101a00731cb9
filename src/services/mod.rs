// Service exports
pub mod catalog;
pub mod geocoder;
pub mod openai;

use std::path::Path;
use thiserror::Error;

use crate::models::{CommunityRecord, ExtractedPreferences, PreferenceRecord, Tier};

pub use catalog::{load_catalog, load_catalog_from_path, CatalogError};
pub use geocoder::{Gazetteer, GeocodeError, Geocoder};
pub use openai::{OpenAiClient, OpenAiModels};

/// Errors from the external transcription / language-model service
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Unauthorized: invalid API key")]
    Unauthorized,

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Service returned an empty response")]
    EmptyResponse,

    #[error("Failed to read input: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything an explanation needs to know about one match
#[derive(Debug, Clone, Copy)]
pub struct ExplanationRequest<'a> {
    pub preferences: &'a PreferenceRecord,
    pub community: &'a CommunityRecord,
    pub tier: Tier,
    pub distance_miles: Option<f64>,
}

/// Speech-to-text for an uploaded consultation recording
#[allow(async_fn_in_trait)]
pub trait Transcriber {
    async fn transcribe(&self, audio: &Path) -> Result<String, ServiceError>;
}

/// Structured preference extraction from a transcript
#[allow(async_fn_in_trait)]
pub trait PreferenceExtractor {
    async fn extract(&self, transcript: &str) -> Result<ExtractedPreferences, ServiceError>;
}

/// Short natural-language rationale for a single match
#[allow(async_fn_in_trait)]
pub trait ExplanationGenerator {
    async fn explain(&self, request: &ExplanationRequest<'_>) -> Result<String, ServiceError>;
}

use std::fmt;
use std::path::Path;
use thiserror::Error;
use validator::{Validate, ValidationErrors};

use crate::core::{explain_matches, Matcher, RankedMatches};
use crate::models::{CareLevel, Catalog, PreferenceRecord};
use crate::services::{ExplanationGenerator, Geocoder, PreferenceExtractor, ServiceError, Transcriber};

/// Pipeline steps that depend on an external service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Transcription,
    Extraction,
    Ranking,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Transcription => f.write_str("transcription"),
            Step::Extraction => f.write_str("preference extraction"),
            Step::Ranking => f.write_str("ranking"),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No transcript loaded")]
    MissingTranscript,

    #[error("No preferences extracted")]
    MissingPreferences,

    #[error("Community catalog is empty")]
    EmptyCatalog,

    #[error("Invalid preferences: {0}")]
    InvalidPreferences(#[from] ValidationErrors),

    #[error("{step} failed: {source}")]
    Service {
        step: Step,
        #[source]
        source: ServiceError,
    },
}

/// One client consultation, driven a step at a time
///
/// Completed steps are kept, so a failed step can be retried without
/// repeating the ones before it. Loading a new transcript discards the
/// preferences extracted from the old one.
#[derive(Debug, Default)]
pub struct Consultation {
    transcript: Option<String>,
    preferences: Option<PreferenceRecord>,
}

impl Consultation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transcript(&self) -> Option<&str> {
        self.transcript.as_deref()
    }

    pub fn preferences(&self) -> Option<&PreferenceRecord> {
        self.preferences.as_ref()
    }

    /// The next step that has not completed yet
    pub fn next_step(&self) -> Step {
        match (&self.transcript, &self.preferences) {
            (_, Some(_)) => Step::Ranking,
            (Some(_), None) => Step::Extraction,
            (None, None) => Step::Transcription,
        }
    }

    /// Use an existing transcript instead of transcribing audio
    pub fn load_transcript(&mut self, text: impl Into<String>) -> Result<&str, SessionError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(SessionError::MissingTranscript);
        }

        self.preferences = None;
        Ok(self.transcript.insert(text).as_str())
    }

    pub async fn transcribe<T: Transcriber>(
        &mut self,
        transcriber: &T,
        audio: &Path,
    ) -> Result<&str, SessionError> {
        tracing::info!("Transcribing {}", audio.display());

        let text = transcriber.transcribe(audio).await.map_err(|source| {
            tracing::error!("Transcription failed: {}", source);
            SessionError::Service {
                step: Step::Transcription,
                source,
            }
        })?;

        tracing::info!("Transcript ready ({} characters)", text.len());
        self.load_transcript(text)
    }

    /// Extract and normalize preferences from the loaded transcript
    pub async fn extract<E: PreferenceExtractor>(
        &mut self,
        extractor: &E,
    ) -> Result<&PreferenceRecord, SessionError> {
        let transcript = self.transcript.as_deref().ok_or(SessionError::MissingTranscript)?;

        let extracted = extractor.extract(transcript).await.map_err(|source| {
            tracing::error!("Preference extraction failed: {}", source);
            SessionError::Service {
                step: Step::Extraction,
                source,
            }
        })?;

        let record = extracted.into_record(Some(transcript));
        tracing::info!(
            client = %record.client_name,
            care_level = record.care_level_label(),
            budget = %record.budget_label(),
            "Preferences extracted"
        );

        self.set_preferences(record)?;
        self.preferences.as_ref().ok_or(SessionError::MissingPreferences)
    }

    /// Supply preferences directly, e.g. after an operator correction
    pub fn set_preferences(&mut self, preferences: PreferenceRecord) -> Result<(), SessionError> {
        preferences.validate()?;
        self.preferences = Some(preferences);
        Ok(())
    }

    /// Operator corrections to the extracted budget and care level
    ///
    /// A budget of zero clears the budget constraint. Fields left `None`
    /// keep their extracted values.
    pub fn adjust_preferences(
        &mut self,
        budget: Option<f64>,
        care_level: Option<CareLevel>,
    ) -> Result<&PreferenceRecord, SessionError> {
        let mut adjusted = self.preferences.clone().ok_or(SessionError::MissingPreferences)?;

        if let Some(budget) = budget {
            adjusted.monthly_budget = (budget != 0.0).then_some(budget);
        }
        if let Some(level) = care_level {
            adjusted.care_level = Some(level);
        }

        tracing::info!(
            care_level = adjusted.care_level_label(),
            budget = %adjusted.budget_label(),
            "Preferences adjusted"
        );
        self.set_preferences(adjusted)?;
        self.preferences.as_ref().ok_or(SessionError::MissingPreferences)
    }

    /// Rank the catalog against the current preferences
    pub fn rank<'a, G: Geocoder + ?Sized>(
        &self,
        catalog: &'a Catalog,
        geocoder: &G,
    ) -> Result<RankedMatches<'a>, SessionError> {
        let preferences = self.preferences.as_ref().ok_or(SessionError::MissingPreferences)?;
        if catalog.is_empty() {
            return Err(SessionError::EmptyCatalog);
        }

        Ok(Matcher::new(geocoder).find_matches(preferences, catalog))
    }

    /// Explain the first `limit` ranked matches; failures leave blank text
    pub async fn explain<X: ExplanationGenerator>(
        &self,
        generator: &X,
        ranked: &mut RankedMatches<'_>,
        limit: usize,
    ) -> Result<usize, SessionError> {
        let preferences = self.preferences.as_ref().ok_or(SessionError::MissingPreferences)?;
        Ok(explain_matches(generator, preferences, &mut ranked.matches, limit).await)
    }
}

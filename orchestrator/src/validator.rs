//! # Context Validator (spec §2 item 1, §4.1)
//!
//! `Validator::validate` turns a raw [`crate::api::PipelineRequest`] into an
//! immutable [`ValidatedContext`], grounded in the teacher's practice of
//! small, dependency-injected structs over global state: this holds only
//! the configured supported-language set and a handle to the preferences
//! port, both passed in at construction.

use crate::error::PipelineError;
use agent_core::{Coordinates, Language, UserPreferences, ValidatedContext};
use persistence::PreferencesStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

pub struct Validator {
    supported_languages: HashSet<Language>,
    preferences: Arc<dyn PreferencesStore>,
}

impl Validator {
    pub fn new(supported_languages: Vec<Language>, preferences: Arc<dyn PreferencesStore>) -> Self {
        Self {
            supported_languages: supported_languages.into_iter().collect(),
            preferences,
        }
    }

    /// Validates `user_id`/`session_id`/`language`/`location` and merges in
    /// stored preferences (spec §4.1). The request's own `language` always
    /// wins over a stored preference — preferences never override
    /// request-supplied language.
    #[instrument(skip(self, user_id, query_language))]
    pub async fn validate(
        &self,
        user_id: &str,
        session_id_raw: &str,
        query_language: &str,
        location: Option<(f64, f64)>,
    ) -> Result<ValidatedContext, PipelineError> {
        if user_id.trim().is_empty() {
            return Err(PipelineError::InvalidSession);
        }
        let session_id = Uuid::parse_str(session_id_raw).map_err(|_| PipelineError::InvalidSession)?;

        let language = Language::parse(query_language).ok_or(PipelineError::UnsupportedLanguage)?;
        if !self.supported_languages.contains(&language) {
            return Err(PipelineError::UnsupportedLanguage);
        }

        let location = match location {
            Some((lat, lon)) => {
                if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                    return Err(PipelineError::InvalidLocation);
                }
                Some(Coordinates { lat, lon })
            }
            None => None,
        };

        let preferences = self
            .preferences
            .get(user_id)
            .await
            .ok()
            .flatten()
            .unwrap_or_else(|| UserPreferences::empty(user_id));

        Ok(ValidatedContext {
            user_id: user_id.to_string(),
            session_id,
            language,
            location,
            preferences,
        })
    }
}

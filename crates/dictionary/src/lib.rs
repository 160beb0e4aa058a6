use dictionary_api::{get_definition, DICTIONARY_API_URL};
use thiserror::Error;

mod dictionary;
mod dictionary_api;

pub use dictionary::{DictionaryEntry, PartOfSpeech, Phonetic, WordDefinition, WordMeaning};

#[derive(Debug, Error)]
pub enum DictionaryError {
    #[error("failed to reach the dictionary service: {0}")]
    Fetch(#[source] reqwest::Error),
    #[error("unexpected dictionary response: {0}")]
    Deserialize(#[source] reqwest::Error),
    #[error(transparent)]
    NotFound(NotFoundError),
}

#[derive(Debug, Clone, Error)]
#[error("{title}: {message}")]
pub struct NotFoundError {
    pub title: String,
    pub message: String,
}

/// Best-effort client for the public dictionary service. No retries, no auth.
pub struct Dictionary {
    client: reqwest::Client,
    base_url: String,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::with_base_url(DICTIONARY_API_URL)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn lookup(&self, word: &str) -> Result<DictionaryEntry, DictionaryError> {
        get_definition(&self.client, &self.base_url, word).await
    }
}

impl Default for Dictionary {
    fn default() -> Self {
        Self::new()
    }
}

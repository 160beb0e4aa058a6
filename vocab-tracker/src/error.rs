use dictionary::DictionaryError;
use thiserror::Error;

use crate::{quiz::QuizError, storage::StoreError};

/// Failures surfaced to the user. None of them is fatal: the triggering
/// action is abandoned and local state stays as it was.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Need at least 2 words to start a quiz ({available} available).")]
    InsufficientWords { available: usize },
    #[error("Could not load words: {0}")]
    FetchFailed(#[source] StoreError),
    #[error("This word already exists!")]
    DuplicateWord,
    #[error("No definition found for \"{0}\".")]
    LookupNotFound(String),
    #[error("Unauthorized.")]
    Unauthorized,
    #[error("{0}")]
    Invalid(String),
    #[error("You need to sign in to do that.")]
    SignInRequired,
    #[error("Not found.")]
    NotFound,
    #[error("Dictionary lookup failed: {0}")]
    Lookup(#[source] DictionaryError),
    #[error(transparent)]
    Quiz(QuizError),
    #[error("Request failed: {0}")]
    Store(#[source] StoreError),
}

impl AppError {
    /// Maps a failed write; reads go through [`AppError::FetchFailed`].
    pub fn from_write(error: StoreError) -> Self {
        match error {
            StoreError::UniqueViolation => AppError::DuplicateWord,
            StoreError::NotFound => AppError::NotFound,
            StoreError::Unauthorized => AppError::Unauthorized,
            other => AppError::Store(other),
        }
    }
}

impl From<QuizError> for AppError {
    fn from(error: QuizError) -> Self {
        match error {
            QuizError::InsufficientWords { available } => AppError::InsufficientWords { available },
            other => AppError::Quiz(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_errors_keep_their_meaning() {
        assert!(matches!(
            AppError::from_write(StoreError::UniqueViolation),
            AppError::DuplicateWord
        ));
        assert!(matches!(
            AppError::from_write(StoreError::Unauthorized),
            AppError::Unauthorized
        ));
        assert!(matches!(
            AppError::from_write(StoreError::NotFound),
            AppError::NotFound
        ));
    }

    #[test]
    fn duplicate_message_is_user_facing() {
        assert_eq!(AppError::DuplicateWord.to_string(), "This word already exists!");
    }

    #[test]
    fn insufficient_words_is_lifted_out_of_quiz_errors() {
        let error = AppError::from(QuizError::InsufficientWords { available: 1 });
        assert!(matches!(error, AppError::InsufficientWords { available: 1 }));
        let error = AppError::from(QuizError::Incomplete);
        assert!(matches!(error, AppError::Quiz(QuizError::Incomplete)));
    }
}

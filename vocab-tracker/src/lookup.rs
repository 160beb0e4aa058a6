use std::future::Future;

use dictionary::{Dictionary, DictionaryEntry, DictionaryError};

use crate::{
    definition::format_senses,
    error::AppError,
    model::{Difficulty, NewWord, Sense, Word},
    repository::{WordRepository, MAX_DEFINITION_LEN, MAX_EXAMPLE_LEN},
    session::Session,
};

const MAX_DEFINITIONS_PER_SENSE: usize = 3;

/// Anything that can turn a word into a dictionary entry.
pub trait DefinitionSource {
    fn define(&self, word: &str) -> impl Future<Output = Result<DictionaryEntry, DictionaryError>>;
}

impl DefinitionSource for Dictionary {
    fn define(&self, word: &str) -> impl Future<Output = Result<DictionaryEntry, DictionaryError>> {
        self.lookup(word)
    }
}

/// A looked-up word, normalized for storage but not yet saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordDraft {
    pub word: String,
    pub phonetic: Option<String>,
    pub senses: Vec<Sense>,
    pub definition: String,
    pub example_sentence: Option<String>,
}

impl WordDraft {
    pub fn from_entry(entry: &DictionaryEntry) -> Self {
        let mut senses: Vec<Sense> = entry
            .meanings
            .iter()
            .filter(|meaning| !meaning.definitions.is_empty())
            .map(|meaning| Sense {
                part_of_speech: meaning.part_of_speech.to_string(),
                definitions: meaning
                    .definitions
                    .iter()
                    .take(MAX_DEFINITIONS_PER_SENSE)
                    .map(|definition| definition.definition.trim().to_owned())
                    .collect(),
            })
            .collect();
        let mut definition = format_senses(&senses);
        // drop trailing definitions until the text fits in a stored word
        while definition.chars().count() > MAX_DEFINITION_LEN {
            let Some(last) = senses.last_mut() else {
                break;
            };
            last.definitions.pop();
            if last.definitions.is_empty() {
                senses.pop();
            }
            definition = format_senses(&senses);
        }
        Self {
            word: entry.word.trim().to_lowercase(),
            phonetic: entry.phonetic.clone(),
            senses,
            definition,
            example_sentence: entry
                .first_example()
                .filter(|example| example.chars().count() <= MAX_EXAMPLE_LEN)
                .map(str::to_owned),
        }
    }

    pub fn into_new_word(self, difficulty: Difficulty) -> NewWord {
        NewWord {
            word: self.word,
            definition: self.definition,
            senses: Some(self.senses),
            example_sentence: self.example_sentence,
            difficulty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddMode {
    Preview,
    Insert { difficulty: Difficulty },
}

#[derive(Debug)]
pub enum LookupOutcome {
    Preview(WordDraft),
    Inserted(Word),
}

pub async fn lookup<S: DefinitionSource>(source: &S, query: &str) -> Result<WordDraft, AppError> {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return Err(AppError::Invalid("Enter a word to look up.".into()));
    }
    match source.define(&query).await {
        Ok(entry) => Ok(WordDraft::from_entry(&entry)),
        Err(DictionaryError::NotFound(error)) => {
            tracing::debug!(%query, %error, "no dictionary entry");
            Err(AppError::LookupNotFound(query))
        }
        Err(error) => {
            tracing::warn!(%query, %error, "dictionary lookup failed");
            Err(AppError::Lookup(error))
        }
    }
}

/// Looks the word up and either returns the draft or saves it straight away.
pub async fn lookup_and_add<S: DefinitionSource>(
    source: &S,
    words: &WordRepository,
    session: &Session,
    query: &str,
    mode: AddMode,
) -> Result<LookupOutcome, AppError> {
    let draft = lookup(source, query).await?;
    match mode {
        AddMode::Preview => Ok(LookupOutcome::Preview(draft)),
        AddMode::Insert { difficulty } => {
            let word = words.add(session, draft.into_new_word(difficulty)).await?;
            Ok(LookupOutcome::Inserted(word))
        }
    }
}

#[cfg(test)]
mod tests {
    use dictionary::{NotFoundError, PartOfSpeech, WordDefinition, WordMeaning};

    use super::*;
    use crate::{repository::WordFilter, storage::Storage};

    /// Serves canned entries; everything else is not found.
    struct Canned(Vec<DictionaryEntry>);

    impl DefinitionSource for Canned {
        async fn define(&self, word: &str) -> Result<DictionaryEntry, DictionaryError> {
            self.0
                .iter()
                .find(|entry| entry.word == word)
                .cloned()
                .ok_or_else(|| {
                    DictionaryError::NotFound(NotFoundError {
                        title: "No Definitions Found".into(),
                        message: format!("nothing for {word}"),
                    })
                })
        }
    }

    fn definition(text: &str, example: Option<&str>) -> WordDefinition {
        WordDefinition {
            definition: text.into(),
            example: example.map(Into::into),
            synonyms: vec![],
            antonyms: vec![],
        }
    }

    fn cat() -> DictionaryEntry {
        DictionaryEntry {
            word: "cat".into(),
            phonetic: Some("/kæt/".into()),
            phonetics: vec![],
            origin: None,
            meanings: vec![
                WordMeaning {
                    part_of_speech: PartOfSpeech::Noun,
                    definitions: vec![
                        definition("A small domesticated carnivorous mammal.", None),
                        definition("A person.", Some("He's a cool cat.")),
                    ],
                    synonyms: vec![],
                    antonyms: vec![],
                },
                WordMeaning {
                    part_of_speech: PartOfSpeech::Verb,
                    definitions: vec![definition("To hoist the anchor.", None)],
                    synonyms: vec![],
                    antonyms: vec![],
                },
                WordMeaning {
                    part_of_speech: PartOfSpeech::Other("abbreviation".into()),
                    definitions: vec![],
                    synonyms: vec![],
                    antonyms: vec![],
                },
            ],
        }
    }

    #[test]
    fn entry_is_normalized_into_tagged_senses() {
        let draft = WordDraft::from_entry(&cat());
        assert_eq!(draft.word, "cat");
        assert_eq!(draft.senses.len(), 2);
        assert_eq!(
            draft.definition,
            "(noun) A small domesticated carnivorous mammal.; A person. | (verb) To hoist the anchor."
        );
        assert_eq!(draft.example_sentence.as_deref(), Some("He's a cool cat."));
    }

    #[test]
    fn long_entries_are_trimmed_to_fit() {
        let mut entry = cat();
        entry.meanings[0].definitions =
            (0..3).map(|_| definition(&"x".repeat(400), None)).collect();
        let draft = WordDraft::from_entry(&entry);
        assert!(draft.definition.chars().count() <= MAX_DEFINITION_LEN);
        assert_eq!(draft.senses[0].definitions.len(), 2);
    }

    #[tokio::test]
    async fn unknown_word_is_not_found_and_nothing_is_saved() {
        let storage = Storage::in_memory().await.unwrap();
        let session = Session::sign_in(&storage, "ada").await.unwrap();
        let words = WordRepository::new(storage);
        let result = lookup_and_add(
            &Canned(vec![cat()]),
            &words,
            &session,
            "xyzzynotaword",
            AddMode::Insert {
                difficulty: Difficulty::Easy,
            },
        )
        .await;
        assert!(matches!(result, Err(AppError::LookupNotFound(word)) if word == "xyzzynotaword"));
        assert_eq!(words.count(&WordFilter::default()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn found_word_is_inserted_then_reported_as_duplicate() {
        let storage = Storage::in_memory().await.unwrap();
        let session = Session::sign_in(&storage, "ada").await.unwrap();
        let words = WordRepository::new(storage);
        let source = Canned(vec![cat()]);
        let mode = AddMode::Insert {
            difficulty: Difficulty::Medium,
        };

        let outcome = lookup_and_add(&source, &words, &session, " Cat ", mode)
            .await
            .unwrap();
        let LookupOutcome::Inserted(word) = outcome else {
            panic!("expected an insert");
        };
        assert_eq!(word.word, "cat");
        assert_eq!(word.senses[1].part_of_speech, "verb");

        let again = lookup_and_add(&source, &words, &session, "cat", mode).await;
        assert!(matches!(again, Err(AppError::DuplicateWord)));
    }

    #[tokio::test]
    async fn preview_does_not_write() {
        let storage = Storage::in_memory().await.unwrap();
        let words = WordRepository::new(storage);
        let outcome = lookup_and_add(
            &Canned(vec![cat()]),
            &words,
            &Session::anonymous(),
            "cat",
            AddMode::Preview,
        )
        .await
        .unwrap();
        assert!(matches!(outcome, LookupOutcome::Preview(draft) if draft.word == "cat"));
        assert_eq!(words.count(&WordFilter::default()).await.unwrap(), 0);
    }
}

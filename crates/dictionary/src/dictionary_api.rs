// https://dictionaryapi.dev/ - free, no key, returns a list of entries per headword

use reqwest::StatusCode;
use serde::Deserialize;

use crate::{
    DictionaryEntry, DictionaryError, NotFoundError, PartOfSpeech, Phonetic, WordDefinition,
    WordMeaning,
};

pub(crate) const DICTIONARY_API_URL: &str = "https://api.dictionaryapi.dev/api/v2/entries/en";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiEntry {
    word: String,
    phonetic: Option<String>,
    #[serde(default)]
    phonetics: Vec<ApiPhonetic>,
    origin: Option<String>,
    #[serde(default)]
    meanings: Vec<ApiMeaning>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiPhonetic {
    text: Option<String>,
    audio: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ApiMeaning {
    part_of_speech: String,
    #[serde(default)]
    definitions: Vec<ApiDefinition>,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    antonyms: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiDefinition {
    definition: String,
    example: Option<String>,
    #[serde(default)]
    synonyms: Vec<String>,
    #[serde(default)]
    antonyms: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiNotFound {
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
}

pub(crate) async fn get_definition(
    client: &reqwest::Client,
    base_url: &str,
    word: &str,
) -> Result<DictionaryEntry, DictionaryError> {
    let url = format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(word)
    );
    tracing::debug!(%url, "looking up definition");
    let res = client.get(&url).send().await.map_err(DictionaryError::Fetch)?;
    if res.status() == StatusCode::NOT_FOUND {
        let body = res.json::<ApiNotFound>().await.unwrap_or(ApiNotFound {
            title: String::new(),
            message: String::new(),
        });
        return Err(not_found(word, body));
    }
    let res = res.error_for_status().map_err(DictionaryError::Fetch)?;
    let entries = res
        .json::<Vec<ApiEntry>>()
        .await
        .map_err(DictionaryError::Deserialize)?;
    merge_entries(entries).ok_or_else(|| {
        not_found(
            word,
            ApiNotFound {
                title: String::new(),
                message: String::new(),
            },
        )
    })
}

fn not_found(word: &str, body: ApiNotFound) -> DictionaryError {
    let title = if body.title.is_empty() {
        "No Definitions Found".to_owned()
    } else {
        body.title
    };
    let message = if body.message.is_empty() {
        format!("No definitions for '{word}'.")
    } else {
        body.message
    };
    DictionaryError::NotFound(NotFoundError { title, message })
}

/// The service splits homographs into separate entries; they are folded into
/// one, keeping the first headword and phonetic.
pub(crate) fn merge_entries(entries: Vec<ApiEntry>) -> Option<DictionaryEntry> {
    let mut entries = entries.into_iter();
    let first = entries.next()?;
    let mut merged = convert_entry(first);
    for entry in entries {
        let entry = convert_entry(entry);
        if merged.phonetic.is_none() {
            merged.phonetic = entry.phonetic;
        }
        if merged.origin.is_none() {
            merged.origin = entry.origin;
        }
        merged.phonetics.extend(entry.phonetics);
        merged.meanings.extend(entry.meanings);
    }
    Some(merged)
}

fn convert_entry(entry: ApiEntry) -> DictionaryEntry {
    DictionaryEntry {
        word: entry.word,
        phonetic: entry.phonetic.filter(|text| !text.is_empty()),
        phonetics: entry
            .phonetics
            .into_iter()
            .map(|phonetic| Phonetic {
                text: phonetic.text.filter(|text| !text.is_empty()),
                audio: phonetic.audio.filter(|audio| !audio.is_empty()),
            })
            .collect(),
        origin: entry.origin,
        meanings: entry
            .meanings
            .into_iter()
            .map(|meaning| WordMeaning {
                part_of_speech: PartOfSpeech::from(&meaning.part_of_speech[..]),
                definitions: meaning
                    .definitions
                    .into_iter()
                    .map(|definition| WordDefinition {
                        definition: definition.definition,
                        example: definition.example,
                        synonyms: definition.synonyms,
                        antonyms: definition.antonyms,
                    })
                    .collect(),
                synonyms: meaning.synonyms,
                antonyms: meaning.antonyms,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO: &str = r#"[
        {
            "word": "hello",
            "phonetic": "həˈləʊ",
            "phonetics": [{"text": "həˈləʊ", "audio": ""}],
            "origin": "early 19th century",
            "meanings": [
                {
                    "partOfSpeech": "exclamation",
                    "definitions": [
                        {"definition": "used as a greeting", "example": "hello there, Katie!", "synonyms": [], "antonyms": []}
                    ]
                },
                {
                    "partOfSpeech": "noun",
                    "definitions": [
                        {"definition": "an utterance of 'hello'; a greeting", "synonyms": [], "antonyms": []}
                    ],
                    "synonyms": ["greeting"],
                    "antonyms": []
                }
            ]
        },
        {
            "word": "hello",
            "phonetics": [],
            "meanings": [
                {
                    "partOfSpeech": "verb",
                    "definitions": [{"definition": "say or shout 'hello'"}]
                }
            ]
        }
    ]"#;

    #[test]
    fn homograph_entries_are_merged() {
        let entries: Vec<ApiEntry> = serde_json::from_str(HELLO).unwrap();
        let entry = merge_entries(entries).unwrap();
        assert_eq!(entry.word, "hello");
        assert_eq!(entry.phonetic.as_deref(), Some("həˈləʊ"));
        assert_eq!(entry.meanings.len(), 3);
        assert_eq!(
            entry.meanings[0].part_of_speech,
            PartOfSpeech::Other("exclamation".into())
        );
        assert_eq!(entry.meanings[1].part_of_speech, PartOfSpeech::Noun);
        assert_eq!(entry.meanings[1].synonyms, vec!["greeting".to_owned()]);
        assert_eq!(entry.meanings[2].part_of_speech, PartOfSpeech::Verb);
        assert_eq!(entry.first_example(), Some("hello there, Katie!"));
        // empty audio links are dropped
        assert_eq!(entry.phonetics[0].audio, None);
    }

    #[test]
    fn empty_response_is_not_an_entry() {
        assert!(merge_entries(vec![]).is_none());
    }

    #[test]
    fn not_found_keeps_service_message() {
        let body: ApiNotFound = serde_json::from_str(
            r#"{"title":"No Definitions Found","message":"Sorry pal, we couldn't find definitions for the word you were looking for.","resolution":"Try the web."}"#,
        )
        .unwrap();
        match not_found("xyzzynotaword", body) {
            DictionaryError::NotFound(error) => {
                assert_eq!(error.title, "No Definitions Found");
                assert!(error.message.starts_with("Sorry pal"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn not_found_without_body_names_the_word() {
        let body = ApiNotFound {
            title: String::new(),
            message: String::new(),
        };
        let DictionaryError::NotFound(error) = not_found("qwfp", body) else {
            panic!("expected not found");
        };
        assert!(error.message.contains("qwfp"));
    }
}

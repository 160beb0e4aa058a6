//! Flat definition text <-> structured senses.
//!
//! Stored words keep both forms: the flat text is what the quiz and the word
//! cards show, the senses are what structured views render. The flat shape is
//! `(noun) first; second | (verb) third`.

use crate::model::Sense;

const SENSE_SEPARATOR: &str = " | ";
const DEFINITION_SEPARATOR: &str = "; ";

pub fn format_senses(senses: &[Sense]) -> String {
    senses
        .iter()
        .filter(|sense| !sense.definitions.is_empty())
        .map(|sense| {
            let definitions = sense.definitions.join(DEFINITION_SEPARATOR);
            if sense.part_of_speech.is_empty() {
                definitions
            } else {
                format!("({}) {definitions}", sense.part_of_speech)
            }
        })
        .collect::<Vec<_>>()
        .join(SENSE_SEPARATOR)
}

/// Parses text written in the flat shape. Anything that does not start with a
/// parenthesised part of speech is kept as a single untagged definition, so
/// free-form sentences containing `;` survive untouched.
pub fn parse_definition(text: &str) -> Vec<Sense> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    if !text.starts_with('(') {
        return vec![Sense {
            part_of_speech: String::new(),
            definitions: vec![text.to_owned()],
        }];
    }
    text.split('|')
        .filter_map(|segment| parse_segment(segment.trim()))
        .collect()
}

fn parse_segment(segment: &str) -> Option<Sense> {
    if segment.is_empty() {
        return None;
    }
    let tagged = segment
        .strip_prefix('(')
        .and_then(|rest| rest.split_once(')'))
        .filter(|(label, _)| !label.trim().is_empty());
    let Some((label, rest)) = tagged else {
        return Some(Sense {
            part_of_speech: String::new(),
            definitions: vec![segment.to_owned()],
        });
    };
    let definitions: Vec<String> = rest
        .split(';')
        .map(str::trim)
        .filter(|definition| !definition.is_empty())
        .map(str::to_owned)
        .collect();
    if definitions.is_empty() {
        return None;
    }
    Some(Sense {
        part_of_speech: label.trim().to_lowercase(),
        definitions,
    })
}

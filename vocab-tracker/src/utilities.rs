use std::io::{self, BufRead, Write};

/// Fails with [`io::ErrorKind::UnexpectedEof`] once stdin is exhausted.
pub fn input(prompt: &str) -> io::Result<String> {
    print!("{prompt}");
    io::stdout().flush()?;
    read_line(&mut io::stdin().lock())
}

fn read_line<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "no more input"));
    }
    Ok(line)
}

pub fn is_end_of_input(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<io::Error>()
        .is_some_and(|error| error.kind() == io::ErrorKind::UnexpectedEof)
}

pub fn str_to_bool(mut str: String) -> Option<bool> {
    str.make_ascii_lowercase();
    match str.trim() {
        "y" | "yes" | "yeah" | "yea" | "true" | "on" => Some(true),
        "n" | "no" | "nope" | "false" | "off" => Some(false),
        _ => None,
    }
}

/// Index of the option the typed text most plausibly names. Accepts a clear
/// winner only: an exact match, or a close match well ahead of the runner-up.
pub fn closest_match<'a>(typed: &str, options: impl IntoIterator<Item = &'a str>) -> Option<usize> {
    let typed = typed.trim().to_lowercase();
    let mut scored = options
        .into_iter()
        .enumerate()
        .map(|(index, option)| (index, strsim::jaro(&option.to_lowercase(), &typed)))
        .collect::<Vec<(usize, f64)>>();
    // most similar at the start
    scored.sort_unstable_by(|(_, a), (_, b)| b.total_cmp(a));
    let (best, best_score) = *scored.first()?;
    if best_score == 1.0 {
        return Some(best);
    }
    let runner_up = scored.get(1).map_or(0.0, |(_, score)| *score);
    (best_score > 0.9 && best_score - runner_up > 0.25).then_some(best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exhausted_input_is_an_error_not_an_empty_line() {
        let mut reader = io::Cursor::new("login ada\n\n");
        assert_eq!(read_line(&mut reader).unwrap(), "login ada\n");
        assert_eq!(read_line(&mut reader).unwrap(), "\n");

        let error = read_line(&mut reader).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::UnexpectedEof);
        assert!(is_end_of_input(&anyhow::Error::from(error)));
        assert!(!is_end_of_input(&anyhow::anyhow!("something else")));
    }

    #[test]
    fn yes_and_no_variants() {
        assert_eq!(str_to_bool("Yes\n".into()), Some(true));
        assert_eq!(str_to_bool(" nope ".into()), Some(false));
        assert_eq!(str_to_bool("maybe".into()), None);
    }

    #[test]
    fn exact_word_wins() {
        let options = ["cat", "dog", "catalog"];
        assert_eq!(closest_match("CAT", options), Some(0));
        assert_eq!(closest_match("catalog", options), Some(2));
    }

    #[test]
    fn small_typo_is_forgiven_when_unambiguous() {
        assert_eq!(closest_match("serendipty", ["serendipity", "dog"]), Some(0));
    }

    #[test]
    fn ambiguous_or_unrelated_text_is_rejected() {
        assert_eq!(closest_match("xyz", ["cat", "dog"]), None);
        assert_eq!(closest_match("anything", std::iter::empty()), None);
    }
}

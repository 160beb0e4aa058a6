use admin::{AdminGate, DashboardData};
use anyhow::Context;
use config::Config;
use dictionary::Dictionary;
use error::AppError;
use lookup::{AddMode, LookupOutcome, WordDraft};
use model::{Difficulty, DifficultyFilter, NewWord, Word, WordId, WordPatch};
use quiz::{Phase, QuizSession};
use rand::{rngs::StdRng, SeedableRng};
use repository::{WordFilter, WordRepository};
use session::Session;
use storage::Storage;
use utilities::{closest_match, input, is_end_of_input, str_to_bool};

mod admin;
mod config;
mod definition;
mod error;
mod logging;
mod lookup;
mod model;
mod quiz;
mod repository;
mod session;
mod shuffle;
mod storage;
mod utilities;

struct App {
    config: Config,
    words: WordRepository,
    dictionary: Dictionary,
    gate: AdminGate,
    session: Session,
    quiz: QuizSession,
    rng: StdRng,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env();
    logging::init_tracing(&config.log_level);

    let storage = Storage::initialize(&config.database_url)
        .await
        .with_context(|| format!("failed to open {}", config.database_url))?;
    tracing::info!(database = %config.database_url, "storage ready");

    let mut app = App {
        words: WordRepository::new(storage),
        dictionary: Dictionary::with_base_url(config.dictionary_api_url.clone()),
        gate: AdminGate::new(config.admin_password.clone()),
        session: Session::anonymous(),
        quiz: QuizSession::default(),
        rng: StdRng::from_entropy(),
        config,
    };

    println!("Type 'help' to see the available commands.");
    loop {
        let prompt = match app.session.user() {
            Some(profile) => format!("{} >> ", profile.name()),
            None => ">> ".to_string(),
        };
        let line = match input(&prompt) {
            Ok(line) => line,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(error) => return Err(error.into()),
        };
        let line = line.trim();
        let mut command_parts = line.split_ascii_whitespace();
        let Some(command) = command_parts.next() else {
            continue;
        };
        let rest = command_parts.collect::<Vec<&str>>().join(" ");
        let result = match command {
            "exit" | "leave" | "quit" | "e" | "q" | "l" => {
                break;
            }
            "help" | "h" => {
                print_help();
                Ok(())
            }
            "login" => login(&mut app, &rest).await,
            "logout" => {
                app.session = Session::anonymous();
                println!("Signed out.");
                Ok(())
            }
            "define" | "find" => define_word(&app, &rest).await,
            "add" => add_word(&app, &rest).await,
            "new" => new_word(&app, &rest).await,
            "recent" => recent_words(&app, &rest).await,
            "browse" => browse_words(&app, &rest).await,
            "show" => show_word(&app, &rest).await,
            "edit" => edit_word(&app, &rest).await,
            "remove" => remove_word(&app, &rest).await,
            "profile" => show_profile(&app).await,
            "quiz" | "practice" => practice(&mut app).await,
            "admin" => admin_dashboard(&app, &rest).await,
            _ => {
                println!("Unknown command {command}.");
                Ok(())
            }
        };
        if let Err(error) = result {
            if is_end_of_input(&error) {
                break;
            }
            // only a broken terminal ends the session
            if error.is::<std::io::Error>() {
                return Err(error);
            }
            println!("{error}");
        }
    }
    Ok(())
}

fn print_help() {
    println!("login <name>                  sign in, creating the profile if needed");
    println!("logout                        sign out");
    println!("define <word>                 look a word up and optionally save it");
    println!("add <word> [difficulty]       look a word up and save it");
    println!("new <word> [difficulty]       save a word with your own definition");
    println!("recent [search]               newest words");
    println!("browse [difficulty] [search]  all words, alphabetical");
    println!("show <id>                     word details");
    println!("edit <id>                     change one of your words");
    println!("remove <id>                   delete one of your words");
    println!("profile                       your words and quiz history");
    println!("quiz                          match words to their definitions");
    println!("admin [--json]                community statistics");
    println!("quit                          leave");
}

async fn login(app: &mut App, name: &str) -> anyhow::Result<()> {
    app.session = Session::sign_in(app.words.storage(), name).await?;
    if let Some(profile) = app.session.user() {
        println!("Signed in as {}.", profile.name());
    }
    Ok(())
}

async fn define_word(app: &App, word: &str) -> anyhow::Result<()> {
    let outcome = lookup::lookup_and_add(
        &app.dictionary,
        &app.words,
        &app.session,
        word,
        AddMode::Preview,
    )
    .await?;
    let LookupOutcome::Preview(draft) = outcome else {
        return Ok(());
    };
    print_draft(&draft);
    if app.session.user().is_none() {
        return Ok(());
    }
    let practice = input("Would you like to practice this word? (y/N): ")?;
    if str_to_bool(practice).unwrap_or(false) {
        let difficulty = ask_difficulty()?;
        let word = app.words.add(&app.session, draft.into_new_word(difficulty)).await?;
        println!("Saved '{}' as #{}.", word.word, word.id);
    }
    Ok(())
}

/// Splits a trailing difficulty off `<word> [difficulty]`.
fn split_difficulty(args: &str) -> (String, Option<Difficulty>) {
    let mut parts = args.split_ascii_whitespace().collect::<Vec<&str>>();
    let difficulty = match parts.last().map(|last| last.parse::<Difficulty>()) {
        Some(Ok(difficulty)) if parts.len() > 1 => {
            parts.pop();
            Some(difficulty)
        }
        _ => None,
    };
    (parts.join(" "), difficulty)
}

async fn add_word(app: &App, args: &str) -> anyhow::Result<()> {
    app.session.require_user()?;
    let (query, difficulty) = split_difficulty(args);
    let difficulty = match difficulty {
        Some(difficulty) => difficulty,
        None => ask_difficulty()?,
    };
    let outcome = lookup::lookup_and_add(
        &app.dictionary,
        &app.words,
        &app.session,
        &query,
        AddMode::Insert { difficulty },
    )
    .await;
    match outcome {
        Ok(LookupOutcome::Inserted(word)) => {
            println!("Saved '{}' as #{}.", word.word, word.id);
            println!("    {}", word.definition);
        }
        Ok(LookupOutcome::Preview(_)) => {}
        Err(AppError::LookupNotFound(word)) => {
            println!("{}", AppError::LookupNotFound(word.clone()));
            let own = input("Enter a definition yourself? (y/N): ")?;
            if str_to_bool(own).unwrap_or(false) {
                add_typed_word(app, &word, difficulty).await?;
            }
        }
        Err(error) => return Err(error.into()),
    }
    Ok(())
}

async fn new_word(app: &App, args: &str) -> anyhow::Result<()> {
    app.session.require_user()?;
    let (word, difficulty) = split_difficulty(args);
    let word = if word.is_empty() {
        input("Word: ")?
    } else {
        word
    };
    let difficulty = match difficulty {
        Some(difficulty) => difficulty,
        None => ask_difficulty()?,
    };
    add_typed_word(app, &word, difficulty).await
}

async fn add_typed_word(app: &App, word: &str, difficulty: Difficulty) -> anyhow::Result<()> {
    println!("Write '(noun) first; second | (verb) third' to keep parts of speech.");
    let definition = input("Definition: ")?;
    let example = input("Example sentence (optional): ")?;
    let new_word = NewWord::typed(word, &definition, &example, difficulty);
    let word = app.words.add(&app.session, new_word).await?;
    println!("Saved '{}' as #{}.", word.word, word.id);
    println!("    {}", word.definition);
    Ok(())
}

fn ask_difficulty() -> anyhow::Result<Difficulty> {
    loop {
        let answer = input("Difficulty (easy/medium/hard) [medium]: ")?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(Difficulty::Medium);
        }
        match answer.parse::<Difficulty>() {
            Ok(difficulty) => return Ok(difficulty),
            Err(error) => println!("{error}"),
        }
    }
}

async fn recent_words(app: &App, search: &str) -> anyhow::Result<()> {
    let filter = WordFilter::recent(Some(search));
    let words = app.words.list(&filter).await?;
    if filter.search.is_none() {
        let total = app.words.count(&WordFilter::default()).await?;
        println!("Showing {} of {total} word(s).", words.len());
    }
    print_word_list(&words);
    Ok(())
}

async fn browse_words(app: &App, args: &str) -> anyhow::Result<()> {
    let (difficulty, search) = match args.split_once(' ') {
        Some((first, rest)) => match first.parse::<DifficultyFilter>() {
            Ok(difficulty) => (difficulty, rest),
            Err(_) => (DifficultyFilter::All, args),
        },
        None => match args.parse::<DifficultyFilter>() {
            Ok(difficulty) => (difficulty, ""),
            Err(_) => (DifficultyFilter::All, args),
        },
    };
    let filter = WordFilter::browse(difficulty, Some(search));
    let words = app.words.list(&filter).await?;
    println!("{} word(s), difficulty: {difficulty}", words.len());
    print_word_list(&words);
    Ok(())
}

fn parse_id(arg: &str) -> Result<WordId, AppError> {
    arg.trim()
        .trim_start_matches('#')
        .parse::<i64>()
        .map(WordId)
        .map_err(|_| AppError::Invalid(format!("'{arg}' is not a word id.")))
}

async fn show_word(app: &App, arg: &str) -> anyhow::Result<()> {
    let id = parse_id(arg)?;
    let word = app.words.get(id).await?.ok_or(AppError::NotFound)?;
    let yours = word.owner.is_some() && word.owner == app.session.user_id();
    let marker = if yours { " [yours]" } else { "" };
    println!("#{} {} ({}){marker}", word.id, word.word, word.difficulty);
    for sense in word.senses.iter() {
        if sense.part_of_speech.is_empty() {
            println!("    definition:");
        } else {
            println!("    {}:", sense.part_of_speech);
        }
        for definition in &sense.definitions {
            println!("        {definition}");
        }
    }
    if let Some(example) = &word.example_sentence {
        println!("    example: {example}");
    }
    println!("    added {}", word.created_at.format("%Y-%m-%d %H:%M"));
    Ok(())
}

async fn edit_word(app: &App, arg: &str) -> anyhow::Result<()> {
    let id = parse_id(arg)?;
    let word = app.words.get(id).await?.ok_or(AppError::NotFound)?;
    println!("Editing '{}'. Leave a field blank to keep it.", word.word);
    let mut patch = WordPatch::default();

    let definition = input(&format!("Definition [{}]: ", word.definition))?;
    if !definition.trim().is_empty() {
        patch.definition = Some(definition);
    }
    let example = input("Example sentence ('-' clears): ")?;
    match example.trim() {
        "" => {}
        "-" => patch.example_sentence = Some(None),
        text => patch.example_sentence = Some(Some(text.to_owned())),
    }
    let difficulty = input(&format!("Difficulty [{}]: ", word.difficulty))?;
    if !difficulty.trim().is_empty() {
        let difficulty = difficulty
            .trim()
            .parse::<Difficulty>()
            .map_err(|error| AppError::Invalid(error.to_string()))?;
        patch.difficulty = Some(difficulty);
    }

    if patch.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    let word = app.words.update(&app.session, id, patch).await?;
    println!("Updated '{}'.", word.word);
    Ok(())
}

async fn remove_word(app: &App, arg: &str) -> anyhow::Result<()> {
    let id = parse_id(arg)?;
    app.words.remove(&app.session, id).await?;
    println!("Deleted the word successfully.");
    Ok(())
}

async fn show_profile(app: &App) -> anyhow::Result<()> {
    let summary = app.words.profile_summary(&app.session).await?;
    println!(
        "{} (since {})",
        summary.profile.name(),
        summary.profile.created_at.format("%Y-%m-%d")
    );
    println!(
        "    {} word(s), {} quiz(zes) taken",
        summary.word_count, summary.quizzes_taken
    );
    if !summary.recent_scores.is_empty() {
        println!("    recent scores:");
        for score in &summary.recent_scores {
            println!(
                "        {}/{} ({}) on {}",
                score.score,
                score.total,
                score.difficulty,
                score.created_at.format("%Y-%m-%d %H:%M")
            );
        }
    }
    print_word_list(&summary.words);
    Ok(())
}

async fn practice(app: &mut App) -> anyhow::Result<()> {
    loop {
        if app.quiz.phase() != Phase::Setup {
            app.quiz.new_quiz();
        }
        let filter = ask_filter(app.quiz.filter())?;
        app.quiz.set_filter(filter).map_err(AppError::from)?;
        quiz::start_quiz(&mut app.quiz, &app.words, &mut app.rng).await?;

        loop {
            if !play_round(&mut app.quiz)? {
                app.quiz.new_quiz();
                return Ok(());
            }
            quiz::submit_quiz(&mut app.quiz, &app.words, &app.session).await?;
            print_results(&app.quiz);
            if app.session.user().is_none() {
                println!("Sign in to keep track of your scores.");
            }

            let next = input("[r]etry, [n]ew quiz or [q]uit: ")?;
            match next.trim().to_lowercase().as_str() {
                "r" | "retry" => {
                    quiz::start_quiz(&mut app.quiz, &app.words, &mut app.rng).await?;
                }
                "n" | "new" => break,
                _ => {
                    app.quiz.new_quiz();
                    return Ok(());
                }
            }
        }
    }
}

fn ask_filter(current: DifficultyFilter) -> anyhow::Result<DifficultyFilter> {
    loop {
        let answer = input(&format!("Difficulty (all/easy/medium/hard) [{current}]: "))?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(current);
        }
        match answer.parse::<DifficultyFilter>() {
            Ok(filter) => return Ok(filter),
            Err(error) => println!("{error}"),
        }
    }
}

/// Lets the player match pairs until they submit. Returns `false` when they
/// abandon the quiz instead.
fn play_round(quiz: &mut QuizSession) -> anyhow::Result<bool> {
    println!("Pick a word by number, then its definition by letter. 'undo <n>' frees a pair.");
    println!("':submit' scores the quiz, ':quit' abandons it.");
    loop {
        print_board(quiz);
        let answer = match input("> ") {
            Ok(answer) => answer,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(false),
            Err(error) => return Err(error.into()),
        };
        let answer = answer.trim().to_lowercase();
        match answer.as_str() {
            "" => continue,
            ":q" | ":quit" => return Ok(false),
            ":s" | ":submit" => {
                if quiz.can_submit() {
                    return Ok(true);
                }
                println!("Match every word before submitting.");
                continue;
            }
            _ => {}
        }
        if let Some(target) = answer.strip_prefix("undo ") {
            let word = resolve_word(quiz, target);
            if !word.is_some_and(|word| quiz.unmatch(word)) {
                println!("That word isn't matched.");
            }
            continue;
        }
        let mut understood = false;
        for part in answer.split_ascii_whitespace() {
            if let Some(word) = resolve_word(quiz, part) {
                understood |= quiz.select_word(word);
            } else if let Some(owner) = resolve_definition(quiz, part) {
                understood |= quiz.choose_definition(owner);
            }
        }
        if !understood {
            if let Some(word) = resolve_word(quiz, &answer) {
                understood = quiz.select_word(word);
            } else if let Some(owner) = resolve_definition(quiz, &answer) {
                understood = quiz.choose_definition(owner);
            }
        }
        if !understood {
            println!("Couldn't understand your answer, please try again.");
        }
    }
}

fn resolve_word(quiz: &QuizSession, typed: &str) -> Option<WordId> {
    let words = quiz.quiz_words();
    let index = match typed.parse::<usize>() {
        Ok(number) => number.wrapping_sub(1),
        Err(_) => closest_match(typed, words.iter().map(|word| word.word.as_str()))?,
    };
    words.get(index).map(|word| word.id)
}

fn resolve_definition(quiz: &QuizSession, typed: &str) -> Option<WordId> {
    let definitions = quiz.definitions();
    let mut letters = typed.chars();
    let index = match (letters.next(), letters.next()) {
        (Some(letter @ 'a'..='z'), None) => letter as usize - 'a' as usize,
        _ => closest_match(typed, definitions.iter().map(|card| card.text.as_str()))?,
    };
    definitions.get(index).map(|card| card.owner)
}

fn definition_label(index: usize) -> char {
    (b'A' + index as u8) as char
}

fn print_board(quiz: &QuizSession) {
    let definitions = quiz.definitions();
    let label_of = |owner: WordId| {
        definitions
            .iter()
            .position(|card| card.owner == owner)
            .map(definition_label)
    };
    println!("----------------------------------------");
    for (index, word) in quiz.quiz_words().iter().enumerate() {
        let marker = if quiz.selected() == Some(word.id) { '>' } else { ' ' };
        match quiz.matches().get(&word.id).and_then(|owner| label_of(*owner)) {
            Some(label) => println!("{marker}[{}]: {} -> {label}", index + 1, word.word),
            None => println!("{marker}[{}]: {}", index + 1, word.word),
        }
    }
    println!();
    for (index, card) in definitions.iter().enumerate() {
        let used = if quiz.is_definition_used(card.owner) { '*' } else { ' ' };
        println!("{used}[{}]: {}", definition_label(index), card.text);
    }
}

fn print_results(quiz: &QuizSession) {
    for outcome in quiz.outcomes() {
        let verdict = if outcome.correct { "correct" } else { "wrong" };
        println!("{} ({verdict})", outcome.word.word);
        if !outcome.correct {
            if let Some(chosen) = outcome.chosen {
                println!("    you chose: {}", chosen.text);
            }
        }
        println!("    definition: {}", outcome.word.definition);
    }
    if let Some(score) = quiz.results() {
        println!("Score: {}/{}. {}", score.correct, score.total, score.verdict());
    }
}

async fn admin_dashboard(app: &App, args: &str) -> anyhow::Result<()> {
    let json = args.split_ascii_whitespace().any(|arg| arg == "--json");
    let password = input("Admin password: ")?;
    let password = password.trim_end_matches(['\r', '\n']).to_owned();
    let data = admin::dashboard(&app.gate, app.words.storage(), &password).await?;
    print_dashboard(&data, json)?;

    let watch = input("Keep the dashboard refreshing? (y/N): ")?;
    if !str_to_bool(watch).unwrap_or(false) {
        return Ok(());
    }
    let (mut receiver, handle) = admin::spawn_dashboard_refresh(
        app.gate.clone(),
        app.words.storage().clone(),
        password,
        app.config.dashboard_refresh,
    );
    // the first tick fires immediately and repeats what was just shown
    let _ = receiver.changed().await;
    println!("Refreshing every {}s.", app.config.dashboard_refresh.as_secs());
    while receiver.changed().await.is_ok() {
        if let Some(update) = receiver.borrow_and_update().as_ref() {
            match update {
                Ok(data) => print_dashboard(data, json)?,
                Err(error) => println!("{error}"),
            }
        }
        let more = match input("Wait for the next refresh? (Y/n): ") {
            Ok(more) => more,
            Err(error) if error.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(error) => return Err(error.into()),
        };
        if !str_to_bool(more).unwrap_or(true) {
            break;
        }
    }
    drop(receiver);
    handle.await.context("dashboard refresh task panicked")?;
    Ok(())
}

fn print_dashboard(data: &DashboardData, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(data)?);
        return Ok(());
    }
    let stats = &data.stats;
    println!(
        "Users: {}  Words: {}  Today: {}  Per user: {:.1}",
        stats.total_users, stats.total_words, stats.words_today, stats.avg_per_user
    );
    println!("Words per day:");
    for day in data.words_by_date.iter().filter(|day| day.count > 0) {
        println!("    {} {}", day.date, day.count);
    }
    println!("By difficulty:");
    for entry in &data.difficulty_breakdown {
        println!("    {:<6} {}", entry.difficulty, entry.count);
    }
    println!("Recent words:");
    for word in &data.recent_words {
        println!(
            "    {} ({}) by {} at {}",
            word.word,
            word.difficulty,
            word.display_name,
            word.created_at.format("%Y-%m-%d %H:%M")
        );
    }
    println!("Top users:");
    for user in &data.top_users {
        println!(
            "    {} {} word(s), last active {}",
            user.display_name,
            user.word_count,
            user.latest_activity.format("%Y-%m-%d %H:%M")
        );
    }
    Ok(())
}

fn print_word_list(words: &[Word]) {
    if words.is_empty() {
        println!("No words yet.");
    }
    for word in words {
        println!("#{:<4} {} ({}): {}", word.id, word.word, word.difficulty, word.definition);
    }
}

fn print_draft(draft: &WordDraft) {
    match &draft.phonetic {
        Some(phonetic) => println!("Showing definition for '{}' {phonetic}:", draft.word),
        None => println!("Showing definition for '{}':", draft.word),
    }
    for sense in &draft.senses {
        println!("    {}:", sense.part_of_speech);
        for definition in &sense.definitions {
            println!("        {definition}");
        }
    }
    if let Some(example) = &draft.example_sentence {
        println!("    example: {example}");
    }
}

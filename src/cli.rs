use std::error::Error;
use std::path::PathBuf;

use atty::Stream;
use clap::{Args, Parser, Subcommand};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tokio::runtime::Runtime;
use trinetra::analysis::canned_results;
use trinetra::app::{self, DefaultTrinetra};
use trinetra::highlight::{self, HighlightMatch};
use trinetra::history::{self, now_millis};
use trinetra::quiz::{self, QuizSession};
use trinetra::validate::upload_from_path;
use trinetra::{
    AnalysisResult, HistoryEntry, InputDraft, Settings, Severity, Submission, SuspiciousPhrase,
    Verdict,
};

#[derive(Parser, Debug)]
#[command(name = "trinetra", about = "Check content for misinformation patterns", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    /// Directory holding the session and history files.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Skip the simulated network delays.
    #[arg(long, global = true)]
    no_delay: bool,

    /// Seed for the mock analyzer.
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit text, a URL or a file for analysis.
    Analyze(InputArgs),
    /// Locate phrases in text without running an analysis.
    Highlight {
        /// Text to scan.
        text: String,
        /// Phrase to look for, optionally prefixed with a severity (`high:phrase`).
        #[arg(short, long = "phrase")]
        phrases: Vec<String>,
        /// Also use the phrases of a canned verdict.
        #[arg(long, value_parser = parse_verdict)]
        canned: Option<Verdict>,
    },
    /// Sign in, sign out, or show the current session.
    #[command(subcommand)]
    Auth(AuthCommand),
    /// Inspect past analyses.
    #[command(subcommand)]
    History(HistoryCommand),
    /// Media literacy quiz.
    Quiz {
        /// Comma-separated answer indexes to score, e.g. `1,1,2,1`.
        #[arg(long, value_delimiter = ',')]
        answers: Vec<usize>,
    },
    /// Serve the web interface.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind, overriding TRINETRA_ADDR.
        #[arg(long)]
        addr: Option<std::net::SocketAddr>,
    },
}

#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// Text to analyze.
    #[arg(long)]
    text: Option<String>,
    /// Article URL to analyze.
    #[arg(long)]
    url: Option<String>,
    /// Text, image or PDF file to analyze.
    #[arg(long)]
    file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Sign in with the demo account.
    SignIn {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    SignOut,
    /// Show the stored session.
    Status,
}

#[derive(Subcommand, Debug)]
enum HistoryCommand {
    /// List stored analyses, newest first.
    List {
        /// Only show entries whose content or verdict contains this text.
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one stored analysis with its highlights.
    Show { id: String },
    /// Delete all stored analyses.
    Clear,
}

fn parse_verdict(value: &str) -> Result<Verdict, String> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(Verdict::True),
        "misinformation" => Ok(Verdict::Misinformation),
        "uncertain" => Ok(Verdict::Uncertain),
        other => Err(format!("unknown verdict {other:?}")),
    }
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let settings = settings_for(&cli)?;
    let runtime = Runtime::new()?;
    match cli.command {
        Command::Analyze(input) => {
            let app = app::open(&settings)?;
            runtime.block_on(handle_analyze(&app, input, cli.json))
        }
        Command::Highlight {
            text,
            phrases,
            canned,
        } => handle_highlight(text, phrases, canned, cli.json),
        Command::Auth(command) => {
            let app = app::open(&settings)?;
            runtime.block_on(handle_auth(&app, command, cli.json))
        }
        Command::History(command) => {
            let app = app::open(&settings)?;
            handle_history(&app, command, cli.json)
        }
        Command::Quiz { answers } => handle_quiz(answers, cli.json),
        #[cfg(feature = "web")]
        Command::Serve { addr } => {
            let mut config = trinetra::web::WebConfig::from_settings(&settings);
            if let Some(addr) = addr {
                config.addr = addr;
            }
            runtime.block_on(trinetra::web::serve(config))?;
            Ok(())
        }
    }
}

fn settings_for(cli: &Cli) -> Result<Settings, Box<dyn Error>> {
    let mut settings = Settings::from_env()?;
    if let Some(dir) = &cli.data_dir {
        settings.data_dir = dir.clone();
    }
    if cli.seed.is_some() {
        settings.seed = cli.seed;
    }
    if cli.no_delay {
        settings = settings.without_delays();
    }
    Ok(settings)
}

async fn handle_analyze(
    app: &DefaultTrinetra,
    input: InputArgs,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let draft = match (input.text, input.url, input.file) {
        (Some(text), _, _) => InputDraft::Text(text),
        (_, Some(url), _) => InputDraft::Url(url),
        (_, _, Some(path)) => InputDraft::File(Some(upload_from_path(&path)?)),
        (None, None, None) => InputDraft::File(None),
    };
    let input = draft.validate()?;
    if !as_json {
        eprintln!("Analyzing...");
    }
    let submission = app.submit(input).await?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&submission)?);
    } else {
        print_submission(&submission);
    }
    Ok(())
}

fn handle_highlight(
    text: String,
    phrases: Vec<String>,
    canned: Option<Verdict>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut parsed: Vec<SuspiciousPhrase> = phrases.iter().map(|raw| parse_phrase(raw)).collect();
    if let Some(verdict) = canned {
        if let Some(result) = canned_results().into_iter().find(|r| r.verdict == verdict) {
            parsed.extend(result.suspicious_phrases);
        }
    }
    if parsed.is_empty() {
        return Err("Provide at least one --phrase or --canned verdict".into());
    }
    let matches = highlight::highlight(&text, &parsed);

    if as_json {
        let payload = json!({ "text": text, "matches": matches });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_highlights(&text, &matches);
    }
    Ok(())
}

fn parse_phrase(raw: &str) -> SuspiciousPhrase {
    if let Some((prefix, rest)) = raw.split_once(':').filter(|(_, rest)| !rest.is_empty()) {
        if let Ok(severity) = prefix.parse::<Severity>() {
            return SuspiciousPhrase::new(rest, "Flagged on the command line", severity);
        }
    }
    SuspiciousPhrase::new(raw, "Flagged on the command line", Severity::Medium)
}

async fn handle_auth(
    app: &DefaultTrinetra,
    command: AuthCommand,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let state = match command {
        AuthCommand::SignIn { email, password } => app.auth().sign_in(&email, &password).await?,
        AuthCommand::SignOut => {
            app.auth().sign_out()?;
            app.auth().current()
        }
        AuthCommand::Status => app.auth().current(),
    };

    if as_json {
        println!("{}", serde_json::to_string_pretty(&state)?);
    } else {
        match &state.user {
            Some(user) if state.is_authenticated => {
                println!("Signed in as {} <{}>", user.name, user.email)
            }
            _ => println!("Not signed in."),
        }
    }
    Ok(())
}

fn handle_history(
    app: &DefaultTrinetra,
    command: HistoryCommand,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    if !app.auth().is_authenticated() {
        return Err("Please sign in to view your verification history.".into());
    }
    match command {
        HistoryCommand::List { search } => {
            let entries = app.history().search(search.as_deref().unwrap_or_default());
            if as_json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_history_table(&entries, search.is_some());
            }
        }
        HistoryCommand::Show { id } => {
            let entry = app
                .history()
                .find_by_id(&id)
                .ok_or_else(|| format!("No history entry with id {id:?}"))?;
            let matches =
                highlight::highlight(entry.input_data.content(), &entry.result.suspicious_phrases);
            if as_json {
                let payload = json!({ "entry": entry, "highlights": matches });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                print_result(&entry.result, entry.input_data.content(), &matches);
            }
        }
        HistoryCommand::Clear => {
            app.history().clear()?;
            if as_json {
                println!("{}", json!({ "cleared": true }));
            } else {
                println!("History cleared.");
            }
        }
    }
    Ok(())
}

fn handle_quiz(answers: Vec<usize>, as_json: bool) -> Result<(), Box<dyn Error>> {
    if answers.is_empty() {
        if as_json {
            println!("{}", serde_json::to_string_pretty(quiz::questions())?);
        } else {
            for question in quiz::questions() {
                println!("{}. {}", question.id, question.question);
                for (idx, option) in question.options.iter().enumerate() {
                    println!("   [{idx}] {option}");
                }
            }
        }
        return Ok(());
    }

    let mut session = QuizSession::new();
    let mut rows = Vec::new();
    for (position, answer) in answers.into_iter().enumerate() {
        if position > 0 && !session.next() {
            break;
        }
        session.select(answer);
        let question = session.current();
        let outcome = session.submit();
        rows.push(json!({
            "question": question.id,
            "answer": answer,
            "correct": outcome.map(|o| o.correct).unwrap_or(false),
            "correctAnswer": question.correct_answer,
            "explanation": question.explanation,
        }));
        if !as_json {
            let mark = match outcome {
                Some(o) if o.correct => "correct",
                Some(_) => "wrong",
                None => "invalid option",
            };
            println!("{}. {} -> {mark}", question.id, question.question);
            println!("   {}", question.explanation);
        }
    }

    if as_json {
        let payload = json!({
            "score": session.score(),
            "total": quiz::questions().len(),
            "answers": rows,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("\nScore: {}/{}", session.score(), quiz::questions().len());
    }
    Ok(())
}

fn print_submission(submission: &Submission) {
    print_result(
        &submission.result,
        submission.input_data.content(),
        &submission.highlights,
    );
    match &submission.history_id {
        Some(id) => println!("\nSaved to history as {id}"),
        None => println!("\nSign in to keep this analysis in your history."),
    }
}

fn print_result(result: &AnalysisResult, content: &str, matches: &[HighlightMatch]) {
    println!("{}", result.verdict.label());
    println!(
        "Analysis completed with {}% confidence",
        result.confidence_percent()
    );
    println!("\nSummary:");
    println!("{}", result.summary);

    if !result.suspicious_phrases.is_empty() {
        print_highlights(content, matches);
        println!("\nDetected Issues:");
        for phrase in &result.suspicious_phrases {
            println!("- [{}] \"{}\": {}", phrase.severity, phrase.text, phrase.reason);
        }
    }

    if !result.sources().is_empty() {
        println!("\nRelated Sources:");
        for source in result.sources() {
            println!(
                "- {} ({}% reliability) {}",
                source.title, source.reliability, source.url
            );
        }
    }
}

fn print_highlights(content: &str, matches: &[HighlightMatch]) {
    if matches.is_empty() {
        println!("\nNo suspicious phrases found in the content.");
        return;
    }
    render_markdown_block(
        "Suspicious Content Analysis",
        &highlight::to_markdown(content, matches),
    );
    let width = matches
        .iter()
        .map(|m| m.text.chars().count())
        .max()
        .unwrap_or(6)
        .max("PHRASE".len());
    println!(
        "{:<width$}  {:>5}  {:>5}  {:<8}  {}",
        "PHRASE",
        "START",
        "END",
        "SEVERITY",
        "REASON",
        width = width
    );
    println!("{:-<width$}  -----  -----  --------  ------", "", width = width);
    for m in matches {
        println!(
            "{:<width$}  {:>5}  {:>5}  {:<8}  {}",
            m.text,
            m.start,
            m.end,
            m.severity,
            m.reason,
            width = width
        );
    }
}

fn print_history_table(entries: &[HistoryEntry], filtered: bool) {
    if entries.is_empty() {
        if filtered {
            println!("No Results Found. Try adjusting your search query.");
        } else {
            println!("No History Yet. Start analyzing content to build your verification history.");
        }
        return;
    }
    let now = now_millis();
    for entry in entries {
        println!(
            "{}  [{}] {}  ({}, {}%)",
            entry.id,
            entry.input_data.kind(),
            history::format_relative(entry.timestamp, now),
            entry.result.verdict.label(),
            entry.result.confidence_percent()
        );
        println!("    {}", history::truncate_content(entry.input_data.content(), 100));
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}

//! Terminal front-end for Kai.

use anyhow::Context;
use clap::Parser;
use kai::credentials::{ChainSource, KeyringSource};
use kai::signals::Gathered;
use kai::{Kai, KaiConfig, Mode, Session, TurnOutcome, TurnRequest};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

/// Kai: chat with search, documents, images and spoken replies.
#[derive(Parser)]
#[command(name = "kai", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start in deep-reasoning mode.
    #[arg(long)]
    deep: bool,

    /// Start with web search switched on.
    #[arg(long)]
    search: bool,

    /// Do not synthesize spoken replies.
    #[arg(long)]
    no_speech: bool,

    /// Directory for synthesized reply audio.
    #[arg(long)]
    audio_dir: Option<PathBuf>,

    /// Store a key entered at the prompt in the platform keyring.
    #[arg(long)]
    remember_key: bool,
}

/// A line typed at the prompt.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Say(String),
    Voice(String),
    Image(PathBuf),
    Document(PathBuf),
    SetMode(Mode),
    Search(bool),
    Speech(bool),
    Clear,
    Export(PathBuf),
    Help,
    Quit,
    Invalid(String),
}

fn parse_command(line: &str) -> Command {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('/') else {
        return Command::Say(line.to_owned());
    };
    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    match (name, arg) {
        ("voice", text) if !text.is_empty() => Command::Voice(text.to_owned()),
        ("image", path) if !path.is_empty() => Command::Image(PathBuf::from(path)),
        ("doc", path) if !path.is_empty() => Command::Document(PathBuf::from(path)),
        ("deep", "") => Command::SetMode(Mode::Deep),
        ("fast", "") => Command::SetMode(Mode::Fast),
        ("search", "on") => Command::Search(true),
        ("search", "off") => Command::Search(false),
        ("speech", "on") => Command::Speech(true),
        ("speech", "off") => Command::Speech(false),
        ("clear", "") => Command::Clear,
        ("export", path) if !path.is_empty() => Command::Export(PathBuf::from(path)),
        ("help", _) => Command::Help,
        ("quit" | "exit", _) => Command::Quit,
        _ => Command::Invalid(line.to_owned()),
    }
}

const HELP: &str = "\
Commands:
  <text>              send typed text
  /voice <transcript> send a voice transcript
  /image <path>       recognize text in an image; it feeds the next turn
  /doc <path>         upload a PDF or text file as context
  /deep | /fast       switch reasoning mode
  /search on|off      toggle web search
  /speech on|off      toggle spoken replies
  /clear              start the conversation over
  /export <path>      write the transcript to a file
  /quit               leave";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the conversation.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("kai=info,kai_search=warn")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let chain = ChainSource::from_config(&config.credentials);
    let credential = match chain.resolve_with_origin() {
        Some((credential, origin)) => {
            if cli.remember_key && origin == "prompt" {
                let keyring = KeyringSource::new(
                    &config.credentials.keyring_service,
                    &config.credentials.keyring_account,
                );
                match keyring.store(&credential) {
                    Ok(()) => println!("Key saved to the system keyring."),
                    Err(e) => eprintln!("Could not save key: {e}"),
                }
            }
            Some(credential)
        }
        None => {
            eprintln!(
                "No API key found. Set {} to chat; other commands still work.",
                config.credentials.env_var
            );
            None
        }
    };

    let audio_dir = cli.audio_dir.unwrap_or_else(default_audio_dir);
    let kai = Kai::from_config(config).context("failed to start Kai")?;
    let mut session = kai.new_session(credential);
    if cli.search {
        session.set_web_search(true);
    }
    if cli.no_speech {
        session.set_speech(false);
    }
    let mut mode = if cli.deep { Mode::Deep } else { Mode::Fast };

    println!("Kai v{} ({mode} mode). Type /help for commands.\n", env!("CARGO_PKG_VERSION"));
    if let Some(greeting) = session.conversation().last() {
        println!("{}: {}\n", kai.config().persona.name, greeting.content);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut reply_count = 0usize;
    while let Some(line) = lines.next_line().await? {
        let request = match parse_command(&line) {
            // An empty line sends pending image text, if any.
            Command::Say(text) if text.is_empty() => TurnRequest {
                mode,
                ..TurnRequest::default()
            },
            Command::Say(text) => TurnRequest::typed(text, mode),
            Command::Voice(text) => TurnRequest::voice(text, mode),
            Command::Image(path) => {
                capture_image(&kai, &mut session, &path).await;
                continue;
            }
            Command::Document(path) => {
                upload_document(&kai, &mut session, &path).await;
                continue;
            }
            Command::SetMode(m) => {
                mode = m;
                println!("Mode: {mode}");
                continue;
            }
            Command::Search(on) => {
                session.set_web_search(on);
                println!("Web search {}", if on { "on" } else { "off" });
                continue;
            }
            Command::Speech(on) => {
                session.set_speech(on);
                println!("Speech {}", if on { "on" } else { "off" });
                continue;
            }
            Command::Clear => {
                session.clear();
                println!("Conversation cleared.");
                continue;
            }
            Command::Export(path) => {
                export_transcript(&kai, &session, &path);
                continue;
            }
            Command::Help => {
                println!("{HELP}");
                continue;
            }
            Command::Quit => break,
            Command::Invalid(text) => {
                eprintln!("Unknown command: {text} (try /help)");
                continue;
            }
        };

        match kai.submit_turn(&mut session, request).await {
            Ok(Some(outcome)) => {
                reply_count += 1;
                show_outcome(&kai, &outcome, &audio_dir, reply_count);
            }
            Ok(None) => {}
            Err(e) => eprintln!("Error: {e}"),
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<KaiConfig> {
    if let Some(path) = path {
        return KaiConfig::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()));
    }
    let default_path = KaiConfig::default_config_path();
    if default_path.is_file() {
        return KaiConfig::from_file(&default_path)
            .with_context(|| format!("failed to load config from {}", default_path.display()));
    }
    Ok(KaiConfig::default())
}

fn default_audio_dir() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("kai")
        .join("audio")
}

async fn capture_image(kai: &Kai, session: &mut Session, path: &Path) {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", path.display());
            return;
        }
    };
    match kai.capture_image(session, &bytes).await {
        Gathered::Data(signal) => {
            println!("Recognized text:\n---\n{}\n---", signal.text);
            println!("It is used on your next turn. Press Enter to send it now.");
        }
        Gathered::Empty | Gathered::NoResults(_) => println!("No text found in the image."),
        Gathered::Diagnostic(message) => eprintln!("Text recognition unavailable: {message}"),
    }
}

async fn upload_document(kai: &Kai, session: &mut Session, path: &Path) {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            eprintln!("Cannot read {}: {e}", path.display());
            return;
        }
    };
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    match kai.upload_document(session, &name, &bytes).await {
        Ok(extract) => println!(
            "Loaded {} ({} characters extracted).",
            extract.name,
            extract.char_count()
        ),
        Err(e) => eprintln!("Could not read document: {e}"),
    }
}

fn export_transcript(kai: &Kai, session: &Session, path: &Path) {
    let transcript = session
        .conversation()
        .to_transcript(&kai.config().persona.name, "我");
    match std::fs::write(path, transcript) {
        Ok(()) => println!("Transcript written to {}", path.display()),
        Err(e) => eprintln!("Could not write {}: {e}", path.display()),
    }
}

fn show_outcome(kai: &Kai, outcome: &TurnOutcome, audio_dir: &Path, n: usize) {
    for diagnostic in &outcome.diagnostics {
        eprintln!("(skipped: {diagnostic})");
    }
    if let Some(reasoning) = &outcome.reasoning {
        println!("[thinking]\n{reasoning}\n[/thinking]");
    }
    println!("{}: {}\n", kai.config().persona.name, outcome.reply);

    if let Some(audio) = &outcome.audio {
        let path = audio_dir.join(format!("reply-{n:04}.mp3"));
        let written = std::fs::create_dir_all(audio_dir).and_then(|()| std::fs::write(&path, audio));
        match written {
            Ok(()) => println!("(audio: {})", path.display()),
            Err(e) => tracing::warn!(error = %e, "could not save reply audio"),
        }
    }
}

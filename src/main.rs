//! # Quire - A Multi-Document Editing Session
//!
//! A line-oriented front end for the session controller: every input line
//! is one command, and the tab strip is printed after each one.
//!
//! ## Quick Start
//!
//! ```bash
//! # Open the current directory as the project
//! cargo run
//!
//! # Open two files from another project
//! cargo run -- --project path/to/project src/main.rs README.md
//! ```

use anyhow::Context;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use quire_core::{
    Config, EventReceiver, NotifyLevel, ProjectContext, SessionController, SessionEvent,
    SessionSignal, SessionState, SignalHandler, ToolbarAction, event_queue,
};

/// Quire - edit several files of one project side by side
#[derive(Parser, Debug)]
#[command(name = "quire")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Files to open, relative to the project
    #[arg(value_name = "FILE")]
    files: Vec<PathBuf>,

    /// Project directory (defaults to the current directory)
    #[arg(short, long, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Config file to use instead of the default location
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

const HELP: &str = "\
commands:
  open <path>      open a file (or focus it if already open)
  select <n>       select tab n
  close <n>        close tab n
  others           close every tab but the selected one
  close-all        close every tab
  append <text>    append a line to the selected document
  save | save-all  write the selected / every document
  undo | redo
  more             toggle the overflow menu
  show | help | quit";

/// One line of user input.
#[derive(Debug, PartialEq)]
enum Command {
    Event(SessionEvent),
    Append(String),
    Show,
    Help,
    Quit,
}

/// Parses one input line. Tab numbers are 1-based.
fn parse_command(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (word, rest) = match line.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (line, ""),
    };

    let tab = |rest: &str| {
        rest.parse::<usize>()
            .ok()
            .and_then(|n| n.checked_sub(1))
            .ok_or_else(|| format!("expected a tab number, got '{rest}'"))
    };

    let command = match word {
        "" | "show" | "ls" => Command::Show,
        "open" | "o" if rest.is_empty() => return Err("open needs a path".to_string()),
        "open" | "o" => Command::Event(SessionEvent::OpenDocument(PathBuf::from(rest))),
        "select" | "s" => Command::Event(SessionEvent::SelectDocument(tab(rest)?)),
        "close" | "c" => Command::Event(SessionEvent::CloseDocument(tab(rest)?)),
        "others" => Command::Event(SessionEvent::CloseOthers),
        "close-all" => Command::Event(SessionEvent::CloseAll),
        "save" | "w" => Command::Event(SessionEvent::SaveCurrent),
        "save-all" | "wa" => Command::Event(SessionEvent::SaveAll),
        "undo" | "u" => Command::Event(SessionEvent::Undo),
        "redo" | "r" => Command::Event(SessionEvent::Redo),
        "more" | "m" => Command::Event(SessionEvent::ToggleMoreMenu),
        "append" | "a" => Command::Append(rest.to_string()),
        "help" | "?" => Command::Help,
        "quit" | "q" => Command::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(command)
}

/// Renders the title, the tab strip and the toolbar.
fn render(state: &SessionState) -> String {
    if !state.has_open_documents() {
        return format!("{} (no documents open)", state.title);
    }

    let tabs: Vec<String> = state
        .documents
        .iter()
        .enumerate()
        .map(|(i, tab)| {
            let label = format!("{} {}{}", i + 1, tab.name, if tab.dirty { "*" } else { "" });
            if state.selected_index == Some(i) {
                format!("[{label}]")
            } else {
                label
            }
        })
        .collect();

    let toolbar = state.toolbar();
    let action = |action: ToolbarAction, name: &str| {
        if action.enabled {
            name.to_string()
        } else {
            format!("({name})")
        }
    };
    let more = if state.more_menu_open { "[more]" } else { "more" };

    format!(
        "{}\n  {}\n  {} {} {}",
        state.title,
        tabs.join("  "),
        action(toolbar.undo, "undo"),
        action(toolbar.redo, "redo"),
        more
    )
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    // RUST_LOG wins over -v
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_level(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<Config> {
    match path {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display())),
        None => Ok(Config::load()),
    }
}

/// Applies every event waiting in the queue.
async fn drain_events(session: &mut SessionController, inbox: &mut EventReceiver) {
    while let Some(event) = inbox.consume() {
        let name = event.display_name();
        if let Err(err) = session.dispatch(event).await {
            tracing::warn!("{} failed: {}", name, err);
            eprintln!("error: {err}");
        }
    }
}

fn report_signals(signals: &mut SignalHandler) {
    for signal in signals.drain() {
        match signal {
            SessionSignal::Notify { message, level } => match level {
                NotifyLevel::Info => println!("{message}"),
                NotifyLevel::Warning => eprintln!("warning: {message}"),
                NotifyLevel::Error => eprintln!("error: {message}"),
            },
            SessionSignal::OpenProjectSettings { project_root } => {
                println!("(project settings for {})", project_root.display());
            }
            other => tracing::debug!("Signal: {:?}", other),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    init_logging(args.verbose);

    tracing::info!("Starting Quire v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(args.config.as_ref())?;
    let root = match args.project {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to read current directory")?,
    };
    let project = ProjectContext::open(&root)
        .with_context(|| format!("Failed to open project {}", root.display()))?;

    let mut session: SessionController = SessionController::with_disk(project, config);
    let mut signals = SignalHandler::new(session.subscribe_signals());
    let (events, mut inbox) = event_queue();

    for file in args.files {
        events.post(SessionEvent::OpenDocument(file));
        drain_events(&mut session, &mut inbox).await;
    }
    report_signals(&mut signals);
    println!("{}", render(&session.state()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(Command::Event(event)) => {
                events.post(event);
                drain_events(&mut session, &mut inbox).await;
            }
            Ok(Command::Append(text)) => {
                let appended = session.edit_selected(|engine| {
                    let end = engine.len_chars();
                    engine.insert(end, &format!("{text}\n"))
                });
                match appended {
                    Ok(Ok(())) => {}
                    Ok(Err(err)) => eprintln!("error: {err}"),
                    Err(err) => eprintln!("error: {err}"),
                }
            }
            Ok(Command::Show) => {}
            Ok(Command::Help) => {
                println!("{HELP}");
                continue;
            }
            Ok(Command::Quit) => break,
            Err(message) => {
                eprintln!("error: {message}");
                continue;
            }
        }

        report_signals(&mut signals);
        println!("{}", render(&session.state()));
    }

    if session.has_unsaved_changes() {
        tracing::warn!("Discarding unsaved changes");
        eprintln!("warning: unsaved changes were discarded");
    }
    session.end_session();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use quire_core::{DocumentId, DocumentTab};
    use tempfile::tempdir;

    #[test]
    fn test_args_parsing() {
        let args = Args::parse_from(["quire"]);
        assert!(args.files.is_empty());
        assert!(args.project.is_none());
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn test_args_with_files() {
        let args = Args::parse_from(["quire", "-p", "proj", "-vv", "a.rs", "b.rs"]);
        assert_eq!(args.project, Some(PathBuf::from("proj")));
        assert_eq!(args.files, vec![PathBuf::from("a.rs"), PathBuf::from("b.rs")]);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            parse_command("open src/lib.rs"),
            Ok(Command::Event(SessionEvent::OpenDocument(PathBuf::from("src/lib.rs"))))
        );
        assert_eq!(
            parse_command("  close 2 "),
            Ok(Command::Event(SessionEvent::CloseDocument(1)))
        );
        assert_eq!(parse_command("wa"), Ok(Command::Event(SessionEvent::SaveAll)));
        assert_eq!(parse_command("a hello world"), Ok(Command::Append("hello world".into())));
        assert_eq!(parse_command(""), Ok(Command::Show));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_command("open").is_err());
        assert!(parse_command("select 0").is_err());
        assert!(parse_command("close x").is_err());
        assert!(parse_command("frobnicate").is_err());
    }

    #[test]
    fn test_render() {
        assert_eq!(render(&SessionState::empty("demo")), "demo (no documents open)");

        let state = SessionState {
            documents: vec![
                DocumentTab {
                    id: DocumentId::new(),
                    path: PathBuf::from("/p/a.txt"),
                    name: "a.txt".into(),
                    dirty: true,
                },
                DocumentTab {
                    id: DocumentId::new(),
                    path: PathBuf::from("/p/b.txt"),
                    name: "b.txt".into(),
                    dirty: false,
                },
            ],
            selected_index: Some(1),
            can_undo: true,
            can_redo: false,
            more_menu_open: false,
            title: "b.txt".into(),
        };
        assert_eq!(render(&state), "b.txt\n  1 a.txt*  [2 b.txt]\n  undo (redo) more");
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("quire.toml");
        std::fs::write(&path, "[session]\nsaved_message = \"Written\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.session.saved_message, "Written");

        let missing = dir.path().join("missing.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    proptest! {
        #[test]
        fn parse_never_panics(line in "\\PC*") {
            let _ = parse_command(&line);
        }
    }
}

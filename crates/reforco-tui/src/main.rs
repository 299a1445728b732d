//! Reforço TUI - a terminal calendar for tutoring lessons.
//!
//! Shows the lessons of a month from the backing store, keeps working from
//! the local cache when the network is down and can forward questions to the
//! teaching assistant function.

mod app;
mod ui;
mod utils;

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use reforco_core::{CacheManager, CalendarMonth, Config};

use app::{App, AppState};
use ui::input::handle_input;
use ui::render::render;

// ============================================================================
// Constants
// ============================================================================

/// Timeout for polling terminal events (in milliseconds)
const EVENT_POLL_TIMEOUT_MS: u64 = 100;

const LOG_FILE_NAME: &str = "reforco.log";

const USAGE: &str = "\
Usage: reforco [--month YYYY-MM]
       reforco --ask \"<question>\"
       reforco --clear-cache";

fn env_filter() -> EnvFilter {
    // RUST_LOG controls the level (e.g. RUST_LOG=reforco_core=debug)
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Logging for one-shot commands: straight to stderr.
fn init_stderr_tracing() {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter())
        .init();
}

/// Logging while the TUI owns the terminal: a daily file in the cache directory.
/// The returned guard flushes the writer when dropped.
fn init_file_tracing(config: &Config) -> Option<WorkerGuard> {
    let log_dir = config.cache_dir().ok()?;
    std::fs::create_dir_all(&log_dir).ok()?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(env_filter())
        .init();
    Some(guard)
}

/// What the command line asked for.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    Tui { month: Option<CalendarMonth> },
    Ask(String),
    ClearCache,
    Help,
}

fn parse_args(args: &[String]) -> Result<Command> {
    match args.first().map(String::as_str) {
        None => Ok(Command::Tui { month: None }),
        Some("--ask") => {
            let question = args[1..].join(" ");
            if question.trim().is_empty() {
                anyhow::bail!("--ask needs a question\n\n{}", USAGE);
            }
            Ok(Command::Ask(question))
        }
        Some("--clear-cache") => Ok(Command::ClearCache),
        Some("--month") => {
            let raw = args
                .get(1)
                .ok_or_else(|| anyhow::anyhow!("--month needs a value\n\n{}", USAGE))?;
            let month = raw.parse::<CalendarMonth>().map_err(anyhow::Error::msg)?;
            Ok(Command::Tui { month: Some(month) })
        }
        Some("--help") | Some("-h") => Ok(Command::Help),
        Some(other) => anyhow::bail!("Unknown argument: {}\n\n{}", other, USAGE),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_args(&args)?;
    run(command, || Config::load().context("Failed to load configuration")).await
}

/// Dispatch a parsed command. The config is only loaded for commands that
/// need it, so `--help` works even with a broken config file.
async fn run(command: Command, load_config: impl FnOnce() -> Result<Config>) -> Result<()> {
    if command == Command::Help {
        println!("{}", USAGE);
        return Ok(());
    }
    let config = load_config()?;

    match command {
        Command::Help => Ok(()),
        Command::Ask(question) => {
            init_stderr_tracing();
            ask(&config, &question).await
        }
        Command::ClearCache => {
            init_stderr_tracing();
            clear_cache(&config)
        }
        Command::Tui { month } => {
            let _guard = init_file_tracing(&config);
            run_tui(config, month.unwrap_or_else(CalendarMonth::current)).await
        }
    }
}

/// Send one question to the assistant and print the answer.
async fn ask(config: &Config, question: &str) -> Result<()> {
    let client = config.backend_client()?;

    eprintln!("Gathering recent lessons and students...");
    let context = client.fetch_assistant_context().await?;
    let reply = client.ask_assistant(question, &context).await?;

    println!("{}", reply.message);
    if !reply.suggestions.is_empty() {
        println!("\nSuggestions:");
        for suggestion in &reply.suggestions {
            println!("  - {}", suggestion);
        }
    }
    if !reply.actions.is_empty() {
        println!("\nActions:");
        for action in &reply.actions {
            match &action.priority {
                Some(priority) => {
                    println!("  [{}] {} ({})", action.action_type, action.description, priority)
                }
                None => println!("  [{}] {}", action.action_type, action.description),
            }
        }
    }
    Ok(())
}

fn clear_cache(config: &Config) -> Result<()> {
    let cache_dir = config.cache_dir()?;
    let cache = CacheManager::open(cache_dir.clone());
    if !cache.clear() {
        anyhow::bail!("Could not clear cache at {}", cache_dir.display());
    }
    eprintln!("Cache cleared: {}", cache_dir.display());
    Ok(())
}

async fn run_tui(config: Config, month: CalendarMonth) -> Result<()> {
    info!(%month, "Reforço TUI starting");

    let mut app = App::from_config(config, month)?;
    app.load_month();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_app(&mut terminal, &mut app);
    app.shutdown();

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(e) = result {
        eprintln!("Error: {}", e);
    }

    info!("Reforço TUI shutting down");
    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| render(f, app))?;

        // Poll for events with timeout to allow background updates
        if event::poll(Duration::from_millis(EVENT_POLL_TIMEOUT_MS))? {
            if let Event::Key(key) = event::read()? {
                // Ctrl+C to quit
                if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                    return Ok(());
                }

                if handle_input(app, key)? {
                    return Ok(());
                }
            }
        }

        app.check_background_tasks();

        if matches!(app.state, AppState::Quitting) {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_no_args_opens_current_month() {
        assert_eq!(parse_args(&[]).unwrap(), Command::Tui { month: None });
    }

    #[test]
    fn test_month_argument() {
        assert_eq!(
            parse_args(&args(&["--month", "2024-03"])).unwrap(),
            Command::Tui {
                month: CalendarMonth::new(2024, 3)
            }
        );
        assert!(parse_args(&args(&["--month", "2024-13"])).is_err());
        assert!(parse_args(&args(&["--month"])).is_err());
    }

    #[test]
    fn test_ask_joins_words() {
        assert_eq!(
            parse_args(&args(&["--ask", "quem", "precisa", "revisar?"])).unwrap(),
            Command::Ask("quem precisa revisar?".to_string())
        );
        assert!(parse_args(&args(&["--ask"])).is_err());
    }

    #[tokio::test]
    async fn test_help_does_not_need_config() {
        let result = run(Command::Help, || anyhow::bail!("Failed to parse config file")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_broken_config_fails_other_commands() {
        let result = run(Command::ClearCache, || anyhow::bail!("Failed to parse config file")).await;
        assert!(result.unwrap_err().to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_other_commands() {
        assert_eq!(parse_args(&args(&["--clear-cache"])).unwrap(), Command::ClearCache);
        assert_eq!(parse_args(&args(&["-h"])).unwrap(), Command::Help);
        assert!(parse_args(&args(&["--bogus"])).is_err());
    }
}

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{self, DisableBracketedPaste, EnableBracketedPaste, Event},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::info;

use glint::app::App;
use glint::constants;
use glint::credentials::{mask_key, validate_api_key, CredentialStore, FileCredentialStore};
use glint::events::handle_key_event;
use glint::ui;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Model id used for generation.
    #[arg(long)]
    model: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Manage the stored API credential without starting the UI.
    Key {
        #[command(subcommand)]
        action: KeyAction,
    },
}

#[derive(clap::Subcommand, Debug)]
enum KeyAction {
    /// Validate and store an API key.
    Set { value: String },
    /// Show whether a key is configured.
    Show,
    /// Remove the stored key.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for environment variables like API keys)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Key { action }) => {
            tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_writer(std::io::stderr)
                .init();
            run_key_command(action)
        }
        None => {
            // The terminal owns stdout, so the UI logs to a file.
            let file_appender = tracing_appender::rolling::never(".", "glint.log");
            let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
            tracing_subscriber::fmt()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_env_filter(
                    tracing_subscriber::EnvFilter::try_from_default_env()
                        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("glint=info")),
                )
                .init();

            info!("Starting glint");
            let model = cli
                .model
                .unwrap_or_else(|| constants::DEFAULT_MODEL.clone());
            run_tui(model).await
        }
    }
}

fn run_key_command(action: KeyAction) -> Result<()> {
    let mut store = FileCredentialStore::open(default_key_from_env())
        .context("failed to open the credential store")?;
    match action {
        KeyAction::Set { value } => {
            validate_api_key(&value)?;
            store.set(&value)?;
            println!("API key saved.");
        }
        KeyAction::Show => match store.get() {
            Some(key) => println!("API key configured: {}", mask_key(&key)),
            None => println!("No API key configured."),
        },
        KeyAction::Clear => {
            store.remove()?;
            println!("API key removed.");
        }
    }
    Ok(())
}

fn default_key_from_env() -> Option<String> {
    std::env::var("GEMINI_API_KEY").ok().filter(|k| !k.is_empty())
}

async fn run_tui(model: String) -> Result<()> {
    let store = FileCredentialStore::open(default_key_from_env())
        .context("failed to open the credential store")?;
    let mut app = App::new(Box::new(store), model, constants::GEMINI_API_URL.clone());

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableBracketedPaste
    )?;
    terminal.show_cursor()?;

    res
}

async fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<()> {
    loop {
        app.process_stream_events();
        app.process_attachment_events();

        terminal.draw(|f| ui::draw_ui(f, app))?;

        if event::poll(Duration::from_millis(100))? {
            match event::read()? {
                Event::Key(key) => {
                    if handle_key_event(app, key) {
                        info!("quit requested");
                        return Ok(());
                    }
                }
                Event::Paste(data) => {
                    if app.settings.visible {
                        for c in data.chars().filter(|c| !c.is_control()) {
                            app.settings.push_char(c);
                        }
                    } else {
                        app.composer.insert_str(data);
                    }
                }
                _ => {}
            }
        }
    }
}

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use padcalc::calculator::{
    Display, FormulaEditor, InputEvent, NumberFormatter, copy_result, parse_keys,
};
use padcalc::config::Config;
use padcalc::history::{HistoryEntry, HistoryStore, HistoryWriter, JsonFileStore};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "padcalc", version, about = "Keypad calculator with live formula editing")]
struct Cli {
    /// Path to config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Path of the saved session state
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Ignore any saved session state
    #[arg(long, global = true)]
    fresh: bool,

    /// Copy the final result to the clipboard
    #[arg(long, global = true)]
    copy: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Apply a key script such as `12+3×(4=`
    ///
    /// Keys: digits, `.`, `(`, `)`, `+ - * / × ÷ %`, `=`, `<` (backspace),
    /// `C` (reset), `~` (negative).
    Keys { script: String },
    /// Replace the formula with a number
    Load { number: String },
    /// Read key scripts from stdin, one per line
    Repl,
    /// Load the result of a history entry
    Recall { id: i64 },
    /// List past calculations, newest first
    History,
    /// Delete all past calculations
    ClearHistory,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match &cli.command {
        Command::Keys { script } => {
            let events = parse_keys(script)?;
            run_session(&cli, &config, |editor| {
                let mut display = editor.display();
                for event in events {
                    display = editor.apply(event);
                }
                Ok(display)
            })
        }
        Command::Load { number } => run_session(&cli, &config, |editor| {
            Ok(editor.apply(InputEvent::LoadNumber(number.clone())))
        }),
        Command::Repl => run_session(&cli, &config, repl),
        Command::Recall { id } => {
            let entry = find_entry(&config, *id)?;
            run_session(&cli, &config, |editor| Ok(editor.load_number(&entry.result)))
        }
        Command::History => list_history(&config),
        Command::ClearHistory => clear_history(&config),
    }
}

/// Restore the saved session, drive it, print the outcome and save it again.
fn run_session<F>(cli: &Cli, config: &Config, drive: F) -> Result<()>
where
    F: FnOnce(&mut FormulaEditor) -> Result<Display>,
{
    let writer = match (config.history.enabled, config.history_path()) {
        (true, Some(path)) => Some(
            HistoryWriter::spawn(JsonFileStore::new(path), config.history.max_retries)
                .context("Failed to start history writer")?,
        ),
        _ => None,
    };

    let mut editor = FormulaEditor::new(NumberFormatter::new(config.format));
    if let Some(writer) = &writer {
        editor = editor.with_history(writer.handle());
    }

    let state_path = cli.state.clone().or_else(|| config.state_path());
    if !cli.fresh
        && let Some(path) = &state_path
    {
        restore_session(&mut editor, path);
    }

    let display = drive(&mut editor)?;
    print_display(&display);

    if cli.copy {
        copy_result(&display.result, editor.formatter())?;
    }

    if let Some(path) = &state_path {
        save_session(&editor, path)?;
    }

    drop(editor);
    if let Some(writer) = writer {
        writer.shutdown();
    }
    Ok(())
}

fn restore_session(editor: &mut FormulaEditor, path: &Path) {
    let json = match fs::read_to_string(path) {
        Ok(json) => json,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "Failed to read session state");
            return;
        }
    };

    if let Err(err) = editor.restore_state(&json) {
        warn!(path = %path.display(), error = %err, "Discarding corrupt session state");
        editor.full_reset();
    } else {
        debug!(path = %path.display(), "Restored session state");
    }
}

fn save_session(editor: &FormulaEditor, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = editor
        .serialize_state()
        .context("Failed to serialize session state")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
}

fn repl(editor: &mut FormulaEditor) -> Result<Display> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut display = editor.display();

    print_display(&display);
    print!("> ");
    stdout.flush()?;

    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();

        if matches!(input, "q" | "quit" | "exit") {
            break;
        }

        match parse_keys(input) {
            Ok(events) => {
                for event in events {
                    display = editor.apply(event);
                }
                print_display(&display);
            }
            Err(err) => eprintln!("{err}"),
        }

        print!("> ");
        stdout.flush()?;
    }

    println!();
    Ok(display)
}

fn print_display(display: &Display) {
    println!("{}", display.formula);
    println!("{}", display.result);
}

fn open_store(config: &Config) -> Result<JsonFileStore> {
    let path = config
        .history_path()
        .context("No history location; set history.path in the config")?;
    Ok(JsonFileStore::new(path))
}

fn find_entry(config: &Config, id: i64) -> Result<HistoryEntry> {
    open_store(config)?
        .get_history()?
        .into_iter()
        .find(|entry| entry.id == Some(id))
        .with_context(|| format!("No history entry with id {id}"))
}

fn list_history(config: &Config) -> Result<()> {
    let history = open_store(config)?.get_history()?;
    if history.is_empty() {
        println!("History is empty");
        return Ok(());
    }

    for entry in history {
        let id = entry.id.map(|id| id.to_string()).unwrap_or_default();
        println!("{id}\t{} = {}", entry.formula, entry.result);
    }
    Ok(())
}

fn clear_history(config: &Config) -> Result<()> {
    open_store(config)?.delete_history()?;
    println!("History cleared");
    Ok(())
}

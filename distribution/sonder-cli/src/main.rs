//! Terminal front end for the Sonder symbol picker
//!
//! Lists categories, filters the catalog, copies symbols and replays key
//! scripts through the same navigation engine the GUI hosts use.
//!
//! Run with: cargo run -p sonder-cli -- search omega

mod host;
mod keys;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use sonder::database::{MemoryKeyValueStore, SqliteKeyValueStore};
use sonder::{
    Category, CopyFormat, CopyOutcome, KeyValueStore, SessionConfig, Symbol, SymbolSession,
    SystemClipboard,
};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::host::{ArboardClipboard, Osc52Host};
use crate::keys::KeyScript;

#[derive(Parser, Debug)]
#[command(author, version, about = "Browse, search and copy physics symbols", long_about = None)]
struct Args {
    /// SQLite file holding the recent-symbols list
    #[arg(long, env = "SONDER_DB")]
    db: Option<PathBuf>,

    /// Keep the recent-symbols list in memory only
    #[arg(long)]
    ephemeral: bool,

    /// Log filter, e.g. "sonder=debug"
    #[arg(long, env = "SONDER_LOG", default_value = "warn")]
    log: String,

    /// Skip the system clipboard and copy through the terminal (OSC 52)
    #[arg(long)]
    osc52: bool,

    /// Print JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List categories with their digit shortcuts
    Categories,
    /// Show the symbols matching a query
    Search {
        /// Query words, joined with spaces
        query: Vec<String>,
    },
    /// Copy one symbol to the clipboard
    Copy {
        glyph: String,
        #[arg(short, long, default_value = "unicode", value_parser = parse_format)]
        format: CopyFormat,
    },
    /// List recently copied symbols
    Recent,
    /// Replay keys through the navigator, e.g. `keys / o h m enter`
    Keys {
        #[arg(required = true, allow_hyphen_values = true)]
        tokens: Vec<String>,
        #[arg(short, long, default_value = "unicode", value_parser = parse_format)]
        format: CopyFormat,
    },
}

fn parse_format(label: &str) -> Result<CopyFormat, String> {
    CopyFormat::from_label(label).ok_or_else(|| {
        let known: Vec<&str> = CopyFormat::ALL.iter().map(|f| f.label()).collect();
        format!("unknown format `{}` (expected one of: {})", label, known.join(", "))
    })
}

fn default_db_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("org", "sonder", "sonder").map(|dirs| dirs.data_dir().join("sonder.db"))
}

fn open_storage(args: &Args, config: &SessionConfig) -> Result<Arc<dyn KeyValueStore>> {
    if args.ephemeral {
        return Ok(Arc::new(MemoryKeyValueStore::new()));
    }
    let Some(path) = args.db.clone().or_else(default_db_path) else {
        warn!("No data directory available; recent symbols will not be kept");
        return Ok(Arc::new(MemoryKeyValueStore::new()));
    };
    let store = SqliteKeyValueStore::open(&path, &config.storage_namespace)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    Ok(Arc::new(store))
}

fn open_session(args: &Args) -> Result<SymbolSession> {
    let config = SessionConfig::default();
    let storage = open_storage(args, &config)?;
    let clipboard: Option<Arc<dyn SystemClipboard>> =
        if args.osc52 { None } else { Some(Arc::new(ArboardClipboard) as Arc<dyn SystemClipboard>) };
    let session = SymbolSession::new(config, storage, clipboard, Arc::new(Osc52Host::new()), None)
        .context("Failed to start session")?;
    Ok(session)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    sonder::logging::init_logging(args.log.clone()).context("Invalid log filter")?;

    let session = open_session(&args)?;
    let result = run(&args, &session).await;
    session.flush().await;
    result
}

async fn run(args: &Args, session: &SymbolSession) -> Result<()> {
    match &args.command {
        Command::Categories => {
            let categories = session.filter(String::new());
            if args.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
                return Ok(());
            }
            for (i, category) in categories.iter().enumerate() {
                let shortcut = if i < 9 { (i + 1).to_string() } else { "-".to_string() };
                println!("{}  {:<18} {} ({})", shortcut, category.id, category.title, category.symbols.len());
            }
        }
        Command::Search { query } => {
            let categories = session.filter(query.join(" "));
            if args.json {
                println!("{}", serde_json::to_string_pretty(&categories)?);
                return Ok(());
            }
            print_categories(&categories);
        }
        Command::Copy { glyph, format } => {
            let outcome = session.activate_glyph(glyph.clone(), *format).await;
            report_outcome(&mut std::io::stdout().lock(), args.json, &outcome)?;
        }
        Command::Recent => {
            let recent = session.recent();
            if args.json {
                println!("{}", serde_json::to_string_pretty(&recent)?);
                return Ok(());
            }
            if recent.is_empty() {
                println!("No recent symbols");
            }
            for symbol in &recent {
                print_symbol(symbol);
            }
        }
        Command::Keys { tokens, format } => {
            let events = KeyScript::parse(tokens.as_slice())?;
            let cancel = CancellationToken::new();
            let ctrl_c = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    ctrl_c.cancel();
                }
            });

            let summary = session.run_events(futures::stream::iter(events), *format, cancel).await;
            for effect in &summary.effects {
                println!("effect: {:?}", effect);
            }
            let reported = report_outcomes(&mut std::io::stdout().lock(), args.json, &summary.outcomes);
            println!("mode: {:?}", session.mode());
            println!("query: {:?}", session.query());
            match session.focused_symbol() {
                Some(symbol) => print_symbol(&symbol),
                None => println!("no focus"),
            }
            reported?;
        }
    }
    Ok(())
}

fn report_outcome(out: &mut impl Write, json: bool, outcome: &CopyOutcome) -> Result<()> {
    if json {
        writeln!(out, "{}", serde_json::to_string(outcome)?)?;
    }
    match outcome {
        CopyOutcome::Copied { value, format, path } => {
            if !json {
                writeln!(out, "Copied {} as {} ({:?})", value, format.label(), path)?;
            }
            Ok(())
        }
        CopyOutcome::Failed { format } => bail!("Could not copy as {}: no clipboard accepted the text", format.label()),
        CopyOutcome::Rejected => bail!("Unknown symbol"),
    }
}

/// Report every outcome, then return the first failure
fn report_outcomes(out: &mut impl Write, json: bool, outcomes: &[CopyOutcome]) -> Result<()> {
    let mut first_failure = None;
    for outcome in outcomes {
        if let Err(e) = report_outcome(out, json, outcome) {
            warn!("{:#}", e);
            first_failure.get_or_insert(e);
        }
    }
    match first_failure {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_categories(categories: &[Category]) {
    let total: usize = categories.iter().map(|c| c.symbols.len()).sum();
    println!("{} Symbole gefunden", total);
    for category in categories {
        println!();
        println!("{}", category.title);
        for symbol in &category.symbols {
            print_symbol(symbol);
        }
    }
}

fn print_symbol(symbol: &Symbol) {
    let formats: Vec<String> = symbol
        .available_formats()
        .into_iter()
        .skip(1)
        .map(|format| format.resolve(symbol))
        .collect();
    println!("  {}  {:<24} {}", symbol.glyph, symbol.name, formats.join("  "));
}

#[cfg(test)]
mod tests {
    use super::*;
    use sonder::CopyPath;

    fn copied(value: &str) -> CopyOutcome {
        CopyOutcome::Copied { value: value.to_string(), format: CopyFormat::Unicode, path: CopyPath::Primary }
    }

    #[test]
    fn test_failed_outcome_does_not_hide_later_ones() {
        let outcomes = vec![CopyOutcome::Failed { format: CopyFormat::Latex }, copied("π")];
        let mut out = Vec::new();

        let err = report_outcomes(&mut out, false, &outcomes).unwrap_err();
        assert!(err.to_string().contains("latex"), "{}", err);
        assert_eq!(String::from_utf8(out).unwrap(), "Copied π as unicode (Primary)\n");
    }

    #[test]
    fn test_json_reports_every_outcome() {
        let outcomes = vec![copied("α"), CopyOutcome::Rejected, copied("β")];
        let mut out = Vec::new();

        assert!(report_outcomes(&mut out, true, &outcomes).is_err());
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 3);
    }

    #[test]
    fn test_all_copied_is_ok() {
        let mut out = Vec::new();
        report_outcomes(&mut out, false, &[copied("α"), copied("β")]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }
}

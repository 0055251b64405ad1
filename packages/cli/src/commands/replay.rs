use super::{decode_log, read_json};
use crate::config::Config;
use clap::Args;
use colored::Colorize;
use scribe_model::{
    Batch, BatchId, BatchType, DataProcessor, Document, DocumentSnapshot, JsonDataProcessor,
    SessionId, UndoStack,
};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Document snapshot to start from (JSON)
    #[arg(short, long)]
    pub document: PathBuf,

    /// Delta log to apply (JSON array of `{ session, delta }`)
    #[arg(short, long)]
    pub log: PathBuf,

    /// Local session (overrides `sessionId` from config)
    #[arg(short, long)]
    pub session: Option<u64>,

    /// Undo this many of the local session's deltas after replaying
    #[arg(long, default_value = "0")]
    pub undo: usize,

    /// Write the resulting snapshot here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print only the children of this root instead of the whole snapshot
    #[arg(long)]
    pub root: Option<String>,

    /// Pretty-print the output
    #[arg(long)]
    pub pretty: bool,
}

/// Replay a delta log against a snapshot and print the result
pub fn replay(args: ReplayArgs, config: &Config) -> Result<(), anyhow::Error> {
    let snapshot = replay_snapshot(&args, config)?;

    let json = render(&snapshot, &args)?;

    match &args.output {
        Some(path) => {
            std::fs::write(path, json)?;
            eprintln!(
                "{} version {} → {}",
                "✓".green(),
                snapshot.version,
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}

fn render(snapshot: &DocumentSnapshot, args: &ReplayArgs) -> anyhow::Result<String> {
    let json = match &args.root {
        Some(name) => {
            let root = snapshot
                .roots
                .get(name)
                .ok_or_else(|| anyhow::anyhow!("Root not found: {}", name))?;
            let processor = JsonDataProcessor { pretty: args.pretty };
            processor.to_data(root.children())?
        }
        None if args.pretty => serde_json::to_string_pretty(snapshot)?,
        None => serde_json::to_string(snapshot)?,
    };
    Ok(json)
}

fn replay_snapshot(args: &ReplayArgs, config: &Config) -> anyhow::Result<DocumentSnapshot> {
    let local = SessionId(args.session.unwrap_or(config.session_id));
    let snapshot: DocumentSnapshot = read_json(&args.document)?;
    let mut document = Document::from_snapshot(snapshot, config.document_options(local))?;
    let mut undo = UndoStack::with_max_levels(config.undo_levels);

    let deltas = decode_log(&args.log)?;
    tracing::info!(deltas = deltas.len(), version = document.version(), "replaying log");

    for (index, (session, delta)) in deltas.into_iter().enumerate() {
        let applied = document
            .apply_remote(delta, session)
            .map_err(|e| anyhow::anyhow!("Log entry {}: {}", index, e))?;

        if session == local {
            let mut batch = Batch::new(BatchId(index as u64), BatchType::Default);
            batch.deltas.push(applied);
            undo.record(batch);
        }
    }

    for _ in 0..args.undo {
        if !undo.undo(&mut document)? {
            tracing::warn!(requested = args.undo, "undo stack exhausted");
            break;
        }
    }

    tracing::info!(version = document.version(), "replay finished");
    Ok(document.snapshot())
}

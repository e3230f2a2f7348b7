//! ddbstream CLI: replay captured change-stream batches through the processor.
//!
//! Usage:
//! ```bash
//! # Dispatch every event in a batch file and print it as a JSON line
//! ddbstream replay records.json
//!
//! # Only route events for some sources, with a processor config file
//! ddbstream replay records.json --source orders --config processor.json
//!
//! ddbstream info
//! ```

use std::collections::BTreeSet;
use std::env;
use std::io::Write;
use std::process;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use async_trait::async_trait;
use ddbstream_core::{
    BoxError, Conversion, Event, EventHandler, EventType, OperationType, Processor,
    ProcessorConfig, StreamContext, StreamRecord,
};
use ddbstream_observability::{init_tracing, LogConfig, LogTarget};

#[tokio::main]
async fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let result = match args[1].as_str() {
        "replay" => cmd_replay(&args[2..]).await,
        "info" => {
            cmd_info();
            Ok(())
        }
        "version" | "--version" | "-V" => {
            println!("ddbstream {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {other}");
            print_usage();
            process::exit(1);
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn print_usage() {
    println!("ddbstream {}", env!("CARGO_PKG_VERSION"));
    println!("Convert key-value change-stream records into domain events\n");
    println!("USAGE:");
    println!("    ddbstream <COMMAND>\n");
    println!("COMMANDS:");
    println!("    replay   Process a JSON batch of stream records");
    println!("    info     Show processor defaults and the operation table");
    println!("    version  Print version");
    println!("    help     Print this help\n");
    println!("REPLAY:");
    println!("    ddbstream replay <FILE> [FLAGS]");
    println!("    --config <FILE>     Processor config (JSON)");
    println!("    --source <NAME>     Route events for this source (repeatable; default: all in batch)");
    println!("    --log-level <LVL>   Log level  [default: info]");
    println!("    --json-logs         Emit JSON structured logs");
}

fn cmd_info() {
    let cfg = ProcessorConfig::default();
    println!("ddbstream v{}", env!("CARGO_PKG_VERSION"));
    println!("  Primary key attribute: {}", cfg.pk_attribute);
    println!("  Sort key attribute:    {}", cfg.sk_attribute);
    println!("  Key format:            <source>#<uuid>");
    println!("  Composite keys:        {:?}", cfg.composite_keys);
    println!("  Unknown operations:    {:?}", cfg.unknown_operations);
    println!("  Operation table:");
    for op in [OperationType::Insert, OperationType::Modify, OperationType::Remove] {
        if let Some(ty) = op.event_type() {
            println!("    {:<8} → {ty}", op.as_str());
        }
    }
}

async fn cmd_replay(args: &[String]) -> anyhow::Result<()> {
    let path = args
        .first()
        .filter(|a| !a.starts_with("--"))
        .context("replay needs a records file")?;

    let log = replay_log_config(args);
    init_tracing(&log);

    let config = match parse_flag(args, "--config") {
        Some(file) => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading config {file}"))?;
            ProcessorConfig::from_json(&raw).with_context(|| format!("parsing config {file}"))?
        }
        None => ProcessorConfig::default(),
    };

    let raw = std::fs::read_to_string(path).with_context(|| format!("reading {path}"))?;
    let records =
        StreamRecord::batch_from_json(&raw).with_context(|| format!("parsing records in {path}"))?;

    let sources = parse_flags(args, "--source");
    let out: Arc<Mutex<dyn Write + Send>> = Arc::new(Mutex::new(std::io::stdout()));
    replay(config, &records, sources, out).await
}

/// Logs go to stderr so stdout carries nothing but event lines.
fn replay_log_config(args: &[String]) -> LogConfig {
    LogConfig {
        level: parse_flag(args, "--log-level").unwrap_or_else(|| "info".into()),
        json: args.iter().any(|a| a == "--json-logs"),
        target: LogTarget::Stderr,
        ..LogConfig::default()
    }
}

/// Route every event of `sources` (default: all sources in the batch) to `out`.
async fn replay(
    config: ProcessorConfig,
    records: &[StreamRecord],
    sources: Vec<String>,
    out: Arc<Mutex<dyn Write + Send>>,
) -> anyhow::Result<()> {
    let mut processor = Processor::with_config(config);
    let mut sources: BTreeSet<String> = sources.into_iter().collect();
    if sources.is_empty() {
        // Key errors are reported by `process` below.
        sources = records
            .iter()
            .filter_map(|r| match processor.convert(r) {
                Ok(Conversion::Event(event)) => Some(event.source),
                _ => None,
            })
            .collect();
    }

    let printer: Arc<dyn EventHandler> = Arc::new(PrintHandler { out });
    for source in &sources {
        for ty in EventType::ALL {
            processor.register_handler(source.clone(), ty, printer.clone());
        }
    }

    tracing::info!(
        records = records.len(),
        sources = sources.len(),
        handlers = processor.handler_count(),
        "Replaying batch"
    );

    processor
        .process(&StreamContext::new(), records)
        .await
        .context("batch failed")?;
    Ok(())
}

/// Writes each event as one JSON line.
struct PrintHandler {
    out: Arc<Mutex<dyn Write + Send>>,
}

#[async_trait]
impl EventHandler for PrintHandler {
    async fn handle(&self, _ctx: &StreamContext, event: &Event) -> Result<(), BoxError> {
        let line = serde_json::to_string(event)?;
        let mut out = self.out.lock().map_err(|_| "output lock poisoned")?;
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

/// Value after `flag`, unless that token is itself a flag.
fn parse_flag(args: &[String], flag: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == flag)?;
    args.get(pos + 1).filter(|v| !v.starts_with("--")).cloned()
}

fn parse_flags(args: &[String], flag: &str) -> Vec<String> {
    args.windows(2)
        .filter(|w| w[0] == flag && !w[1].starts_with("--"))
        .map(|w| w[1].clone())
        .collect()
}

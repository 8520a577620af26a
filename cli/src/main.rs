mod demo;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chain_command_core::{
    ChatData, Error, HostContext, InboundMessage, Outcome, RouterConfig, tokenize, validate_schema,
};
use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::demo::DemoRouter;

#[derive(Debug, Parser)]
#[command(name = "chain-command")]
#[command(about = "Route bot command lines through the built-in demo bot")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Split a command line into tokens and print them as JSON.
    Tokenize(TokenizeArgs),
    /// Dispatch one command line and print the replies.
    Route(RouteArgs),
    /// Dispatch a JSON-lines file of messages and print one result per line.
    Replay(ReplayArgs),
    /// Validate the demo command trees and argument schemas.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct ConfigArgs {
    /// Router configuration YAML (default: built-in settings).
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TokenizeArgs {
    /// Raw command line.
    text: String,
}

#[derive(Debug, Args)]
struct RouteArgs {
    /// Raw command line.
    text: String,
    /// Sender name shown to handlers.
    #[arg(long)]
    sender: Option<String>,
    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Debug, Args)]
struct ReplayArgs {
    /// JSON-lines file with one message per line.
    input: PathBuf,
    /// Number of parallel jobs (default: number of CPUs).
    #[arg(long)]
    jobs: Option<usize>,
    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Debug, Args)]
struct CheckArgs {
    #[command(flatten)]
    config: ConfigArgs,
}

/// Result line written by `replay`.
#[derive(Debug, Serialize)]
struct ReplayRecord {
    line: usize,
    message_id: i64,
    chat_id: i64,
    outcome: &'static str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    replies: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Command::Tokenize(args) => run_tokenize(args),
        Command::Route(args) => run_route(args),
        Command::Replay(args) => run_replay(args),
        Command::Check(args) => run_check(args),
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn load_config(args: &ConfigArgs) -> Result<RouterConfig, String> {
    match &args.config {
        Some(path) => RouterConfig::load(path)
            .map_err(|e| format!("Failed to load config '{}': {e}", path.display())),
        None => Ok(RouterConfig::default()),
    }
}

fn run_tokenize(args: TokenizeArgs) -> Result<(), String> {
    let tokens = tokenize(&args.text).map_err(|e| e.to_string())?;
    let json = serde_json::to_string(&tokens).map_err(|e| format!("Failed to serialize tokens: {e}"))?;
    println!("{json}");
    Ok(())
}

fn run_route(args: RouteArgs) -> Result<(), String> {
    let router = demo::router(load_config(&args.config)?);

    let mut message = InboundMessage::text(0, args.text);
    message.sender = args.sender;
    let mut ctx = HostContext::new(message.clone(), ChatData::default());
    let outcome = router
        .handle_message(&mut ctx, &message)
        .map_err(|e| e.to_string())?;

    if outcome == Outcome::NotMatched {
        eprintln!("No command matched.");
        return Ok(());
    }
    for reply in ctx.replies() {
        println!("{reply}");
    }
    Ok(())
}

fn read_messages(path: &Path) -> Result<Vec<(usize, InboundMessage)>, String> {
    let content =
        fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {e}", path.display()))?;

    let mut messages = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let message: InboundMessage = serde_json::from_str(line)
            .map_err(|e| format!("{}:{}: invalid message: {e}", path.display(), idx + 1))?;
        messages.push((idx + 1, message));
    }
    Ok(messages)
}

/// Runs one chat's messages in order, threading its chat data through.
fn replay_chat(router: &DemoRouter, messages: &[&(usize, InboundMessage)]) -> Vec<ReplayRecord> {
    let mut chat_data = ChatData::default();
    let mut records = Vec::with_capacity(messages.len());

    for entry in messages {
        let (line, message) = (entry.0, &entry.1);
        let mut ctx = HostContext::new(message.clone(), chat_data);
        let result = router.handle_message(&mut ctx, message);
        let (replies, data) = ctx.finish();
        chat_data = data;

        let (outcome, error) = match result {
            Ok(Outcome::Handled(())) => ("handled", None),
            Ok(Outcome::Unhandled) => ("unhandled", None),
            Ok(Outcome::NotMatched) => ("not_matched", None),
            Err(err) => ("error", Some(err.to_string())),
        };
        records.push(ReplayRecord {
            line,
            message_id: message.message_id,
            chat_id: message.chat_id,
            outcome,
            replies,
            error,
        });
    }
    records
}

fn run_replay(args: ReplayArgs) -> Result<(), String> {
    let router = demo::router(load_config(&args.config)?);
    let messages = read_messages(&args.input)?;

    // Chats are independent; messages within one chat share chat data and
    // stay sequential.
    let mut chats: BTreeMap<i64, Vec<&(usize, InboundMessage)>> = BTreeMap::new();
    for entry in &messages {
        chats.entry(entry.1.chat_id).or_default().push(entry);
    }
    debug!(messages = messages.len(), chats = chats.len(), "Replaying messages");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()
        .map_err(|e| format!("Failed to create thread pool: {e}"))?;

    let mut records: Vec<ReplayRecord> = pool.install(|| {
        chats
            .par_iter()
            .flat_map_iter(|(_, chat)| replay_chat(&router, chat))
            .collect()
    });
    records.sort_by_key(|record| record.line);

    for record in &records {
        let json =
            serde_json::to_string(record).map_err(|e| format!("Failed to serialize result: {e}"))?;
        println!("{json}");
    }

    let failed = records.iter().filter(|r| r.error.is_some()).count();
    if failed > 0 {
        eprintln!("{failed} message(s) could not be tokenized.");
    }
    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), String> {
    let config = load_config(&args.config)?;
    let prefix = config.prefix;
    let router = demo::router(config);

    let mut problems: Vec<String> = Vec::new();
    match router.validate() {
        Ok(()) => {}
        Err(Error::Invalid(errors)) => problems.extend(errors.iter().map(ToString::to_string)),
        Err(err) => problems.push(err.to_string()),
    }
    for schema in demo::schemas(prefix) {
        problems.extend(validate_schema(&schema).iter().map(ToString::to_string));
        println!("{}", schema.usage());
    }
    println!("{}", router.help());

    if problems.is_empty() {
        println!("OK: {} root command(s) valid.", router.roots().len());
        Ok(())
    } else {
        for problem in &problems {
            eprintln!("  {problem}");
        }
        Err(format!("{} validation problem(s)", problems.len()))
    }
}

use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use serde::Serialize;
use tracing::debug;

use chronicle_engine::{DetailOutcome, DetailedWriteOutcome, QueryOutcome, WriteOutcome};
use chronicle_sdk::{Chronicle, ClientConfig};
use chronicle_types::{QueryRequest, TransactionId};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = ClientConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    debug!(
        path = %cli.config.display(),
        channel = %config.channel,
        peers = config.peers.len(),
        "configuration loaded"
    );
    match cli.command {
        Command::Write(args) => cmd_write(&config, args, cli.format).await,
        Command::Query(args) => cmd_query(&config, args, cli.format).await,
        Command::Details(args) => cmd_details(&config, args, cli.format).await,
        Command::CheckConfig(args) => cmd_check_config(&config, args, cli.format),
    }
}

async fn cmd_write(config: &ClientConfig, args: WriteArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (client, _network) = Chronicle::in_memory(config)?;

    let mut request = config.write_request(args.payload);
    if args.autogenerate {
        request = request.autogenerate_id();
    }
    if let Some(id) = args.id {
        request = request.with_record_id(id);
    }
    if let Some(position) = args.position {
        request = request.with_identifier_position(position);
    }
    if let Some(function) = args.function {
        request = request.with_function(function);
    }
    if let Some(ms) = args.timeout_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }
    if let Some(attempts) = args.attempts {
        request = request.with_max_attempts(attempts);
    }

    let outcome = if args.details {
        client.write_record_with_details(&request).await
    } else {
        DetailedWriteOutcome::without_details(client.write_record(&request).await)
    };

    match format {
        OutputFormat::Json if args.details => print_json(&outcome)?,
        OutputFormat::Json => print_json(&outcome.write)?,
        OutputFormat::Text => print_write(&outcome, args.details),
    }
    if !outcome.succeeded() {
        bail!("write failed");
    }
    Ok(())
}

async fn cmd_query(config: &ClientConfig, args: QueryArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (client, network) = Chronicle::in_memory(config)?;
    for seed in &args.seed {
        let (key, value) = parse_seed(seed)?;
        network.preload(&config.contract.name, key, value.as_bytes().to_vec());
    }

    let mut request: QueryRequest = config.query_request(args.key);
    if let Some(peer) = args.peer {
        request = request.on_peer(peer);
    }
    if let Some(function) = args.function {
        request = request.with_function(function);
    }
    if let Some(ms) = args.timeout_ms {
        request = request.with_timeout(Duration::from_millis(ms));
    }
    if let Some(attempts) = args.attempts {
        request = request.with_max_attempts(attempts);
    }

    let outcome = client.query_record(&request).await;
    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text => print_query(&outcome),
    }
    if !outcome.succeeded {
        bail!("query failed");
    }
    Ok(())
}

/// Each run starts from an empty sandbox ledger, so an id given on its own
/// is only found when `--write` recorded it first.
async fn cmd_details(config: &ClientConfig, args: DetailsArgs, format: OutputFormat) -> anyhow::Result<()> {
    let (client, _network) = Chronicle::in_memory(config)?;

    let written = if args.write.is_empty() {
        None
    } else {
        let request = config.write_request(args.write).autogenerate_id();
        let outcome = client.write_record(&request).await;
        match (outcome.transaction_id, outcome.error) {
            (Some(tx), None) => {
                debug!(tx_id = tx.short_id(), "sandbox record written");
                Some(tx)
            }
            (_, Some(err)) => bail!("sandbox write failed: {err}"),
            (None, None) => bail!("sandbox write produced no transaction"),
        }
    };

    let transaction_id = match (args.transaction_id, written) {
        (Some(hex), _) => TransactionId::from_hex(&hex)
            .with_context(|| format!("invalid transaction id {hex}"))?,
        (None, Some(tx)) => tx,
        (None, None) => bail!("a transaction id or --write is required"),
    };

    let outcome = client
        .get_transaction_details(&transaction_id, args.peer.as_deref())
        .await;
    match format {
        OutputFormat::Json => print_json(&outcome)?,
        OutputFormat::Text => print_details(&transaction_id, &outcome),
    }
    if !outcome.succeeded {
        bail!("lookup failed");
    }
    Ok(())
}

fn cmd_check_config(config: &ClientConfig, args: CheckConfigArgs, format: OutputFormat) -> anyhow::Result<()> {
    let problems = config.problems(!args.skip_files);
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "valid": problems.is_empty(),
            "problems": problems,
        }))?,
        OutputFormat::Text if problems.is_empty() => {
            println!("{} Configuration valid", "✓".green().bold());
            println!("  Channel: {}", config.channel.bold());
            println!("  Contract: {}", config.contract.name.cyan());
            for peer in &config.peers {
                println!("  Peer: {} ({})", peer.name.yellow(), peer.url);
            }
        }
        OutputFormat::Text => {
            println!("{} Configuration invalid", "✗".red().bold());
            for problem in &problems {
                println!("  - {problem}");
            }
        }
    }
    if !problems.is_empty() {
        bail!("{} configuration problem(s)", problems.len());
    }
    Ok(())
}

fn parse_seed(seed: &str) -> anyhow::Result<(&str, &str)> {
    match seed.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key, value)),
        _ => bail!("seed must look like KEY=VALUE, got {seed:?}"),
    }
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_write(outcome: &DetailedWriteOutcome, with_details: bool) {
    let write: &WriteOutcome = &outcome.write;
    if write.succeeded {
        println!("{} Record committed", "✓".green().bold());
    } else if write.is_pending() {
        println!("{} Commit not observed in time", "…".yellow().bold());
    } else {
        println!("{} Write failed", "✗".red().bold());
    }
    if let Some(tx) = &write.transaction_id {
        println!("  Transaction: {}", tx.as_str().yellow());
    }
    if let Some(record_id) = &write.record_id {
        println!("  Record: {}", record_id.cyan());
    }
    if let Some(peer) = &write.peer {
        println!("  Peer: {peer}");
    }
    if let Some(status) = &write.commit_status {
        println!("  Status: {status}");
    }
    if let Some(block) = write.block_number {
        println!("  Block: {block}");
    }
    if !write.payload.is_empty() {
        println!("  Payload: {}", write.payload_text().dimmed());
    }
    println!("  Attempts: {}", write.attempts);
    if let Some(err) = &write.error {
        println!("  Error: {}", err.to_string().red());
    }
    if with_details && write.succeeded {
        match (&outcome.timestamp, &outcome.detail_error) {
            (Some(ts), _) => println!("  Timestamp: {}", ts.to_rfc3339().green()),
            (None, Some(err)) => println!("  Details: {}", err.to_string().yellow()),
            (None, None) => {}
        }
    }
}

fn print_query(outcome: &QueryOutcome) {
    match outcome.payload_text() {
        Some(text) => {
            println!("{} Record found", "✓".green().bold());
            println!("  Value: {text}");
        }
        None => println!("{} Record not found", "✗".red().bold()),
    }
    println!("  Attempts: {}", outcome.attempts);
    let peer_errors = outcome.peer_errors();
    if !peer_errors.is_empty() {
        for entry in peer_errors {
            println!("  {} {entry}", "-".dimmed());
        }
    } else if let Some(err) = &outcome.error {
        println!("  Error: {}", err.to_string().red());
    }
}

fn print_details(transaction_id: &TransactionId, outcome: &DetailOutcome) {
    match &outcome.result {
        Some(record) => {
            println!("Transaction {}", transaction_id.as_str().yellow().bold());
            println!("  Validation: {}", record.validation_code);
            println!("  Block: {}", record.block_number);
            if let Some(ts) = outcome.timestamp() {
                println!("  Timestamp: {}", ts.to_rfc3339().green());
            }
            let call = &record.transaction_envelope.payload.data;
            println!("  Call: {}.{}({})", call.contract, call.function, call.args.join(", "));
        }
        None => {
            println!("{} Transaction {} not available", "✗".red().bold(), transaction_id.short_id());
            if let Some(err) = &outcome.error {
                println!("  Error: {}", err.to_string().red());
            }
        }
    }
}

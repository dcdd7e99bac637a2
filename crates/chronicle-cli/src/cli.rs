use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "chronicle",
    about = "Chronicle: write and query ledger records",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Client configuration file
    #[arg(short, long, global = true, default_value = "chronicle.toml")]
    pub config: PathBuf,

    /// Log engine activity at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Write a record and wait for its commit
    Write(WriteArgs),
    /// Query a record from one or all peers
    Query(QueryArgs),
    /// Look up a committed transaction
    Details(DetailsArgs),
    /// Validate the configuration file
    CheckConfig(CheckConfigArgs),
}

#[derive(Args)]
pub struct WriteArgs {
    /// Values passed to the contract after the record id
    #[arg(required = true)]
    pub payload: Vec<String>,
    /// Record identifier
    #[arg(long, conflicts_with = "autogenerate")]
    pub id: Option<String>,
    /// Use the transaction id as the record identifier
    #[arg(long)]
    pub autogenerate: bool,
    /// Argument position of the identifier
    #[arg(long)]
    pub position: Option<usize>,
    #[arg(long)]
    pub function: Option<String>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    #[arg(long)]
    pub attempts: Option<u32>,
    /// Also fetch the committed transaction and its timestamp
    #[arg(long)]
    pub details: bool,
}

#[derive(Args)]
pub struct QueryArgs {
    pub key: String,
    /// Ask only this peer
    #[arg(long)]
    pub peer: Option<String>,
    #[arg(long)]
    pub function: Option<String>,
    #[arg(long)]
    pub timeout_ms: Option<u64>,
    #[arg(long)]
    pub attempts: Option<u32>,
    /// Preload KEY=VALUE into the sandbox ledger before querying
    #[arg(long, value_name = "KEY=VALUE")]
    pub seed: Vec<String>,
}

#[derive(Args)]
pub struct DetailsArgs {
    /// Transaction id (hex); defaults to the transaction made by `--write`
    #[arg(required_unless_present = "write")]
    pub transaction_id: Option<String>,
    /// Peer to ask; the channel's first peer when omitted
    #[arg(long)]
    pub peer: Option<String>,
    /// Write a record with these values into the sandbox before the lookup
    #[arg(long, num_args = 1.., value_name = "VALUE")]
    pub write: Vec<String>,
}

#[derive(Args)]
pub struct CheckConfigArgs {
    /// Do not check that TLS CA files exist
    #[arg(long)]
    pub skip_files: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn write_flags_parse() {
        let cli = Cli::try_parse_from([
            "chronicle", "write", "--autogenerate", "--details", "--attempts", "3", "a", "b",
        ])
        .unwrap();
        let Command::Write(args) = cli.command else {
            panic!("expected write");
        };
        assert_eq!(args.payload, vec!["a", "b"]);
        assert!(args.autogenerate && args.details);
        assert_eq!(args.attempts, Some(3));
        assert_eq!(cli.config, PathBuf::from("chronicle.toml"));
    }

    #[test]
    fn details_needs_an_id_or_a_write() {
        assert!(Cli::try_parse_from(["chronicle", "details"]).is_err());
        let cli = Cli::try_parse_from(["chronicle", "details", "--write", "a", "b"]).unwrap();
        let Command::Details(args) = cli.command else {
            panic!("expected details");
        };
        assert_eq!(args.transaction_id, None);
        assert_eq!(args.write, vec!["a", "b"]);
    }

    #[test]
    fn id_and_autogenerate_conflict() {
        assert!(Cli::try_parse_from(["chronicle", "write", "--id", "k", "--autogenerate", "a"]).is_err());
    }
}

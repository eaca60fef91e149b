use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mcps",
    about = "MCP Storage: versioned JSON records on an append-only ledger",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file; `MCPS_*` environment variables override it
    #[arg(short, long, global = true, env = "MCPS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use a process-local ledger instead of the configured one
    #[arg(long, global = true)]
    pub in_memory: bool,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Produce an x-api-key header value from the configured secret
    EncryptKey(EncryptKeyArgs),
    /// Store a new record
    Create(PayloadArgs),
    /// Append a new version of an existing record
    Modify(PayloadArgs),
    /// List the current content of every record
    List(ListArgs),
    /// Show the current content of one record
    Get(RecordArgs),
    /// Show every stored version of one record
    History(RecordArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(long)]
    pub bind: Option<SocketAddr>,
}

#[derive(Args)]
pub struct EncryptKeyArgs {
    /// Plaintext key to encrypt; defaults to the configured API key
    pub plaintext: Option<String>,
}

#[derive(Args)]
pub struct PayloadArgs {
    /// JSON object, `@path` to read a file, or `-` for stdin
    pub payload: String,
}

#[derive(Args)]
pub struct ListArgs {
    /// Print root transaction ids only, without fetching content
    #[arg(long)]
    pub ids_only: bool,
}

#[derive(Args)]
pub struct RecordArgs {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_serve() {
        let cli = Cli::try_parse_from(["mcps", "serve", "--bind", "0.0.0.0:8080"]).unwrap();
        if let Command::Serve(args) = cli.command {
            assert_eq!(args.bind, Some("0.0.0.0:8080".parse().unwrap()));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_serve_rejects_bad_bind() {
        assert!(Cli::try_parse_from(["mcps", "serve", "--bind", "somewhere"]).is_err());
    }

    #[test]
    fn parse_encrypt_key() {
        let cli = Cli::try_parse_from(["mcps", "encrypt-key", "secret-api-key"]).unwrap();
        if let Command::EncryptKey(args) = cli.command {
            assert_eq!(args.plaintext.as_deref(), Some("secret-api-key"));
        } else { panic!("wrong command"); }

        let cli = Cli::try_parse_from(["mcps", "encrypt-key"]).unwrap();
        assert!(matches!(cli.command, Command::EncryptKey(EncryptKeyArgs { plaintext: None })));
    }

    #[test]
    fn parse_create() {
        let cli = Cli::try_parse_from(["mcps", "create", r#"{"a":1}"#]).unwrap();
        if let Command::Create(args) = cli.command {
            assert_eq!(args.payload, r#"{"a":1}"#);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_modify_requires_payload() {
        assert!(Cli::try_parse_from(["mcps", "modify"]).is_err());
    }

    #[test]
    fn parse_list_ids_only() {
        let cli = Cli::try_parse_from(["mcps", "list", "--ids-only"]).unwrap();
        if let Command::List(args) = cli.command {
            assert!(args.ids_only);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_history() {
        let cli = Cli::try_parse_from(["mcps", "history", "rec-1"]).unwrap();
        if let Command::History(args) = cli.command {
            assert_eq!(args.id, "rec-1");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_globals() {
        let cli = Cli::try_parse_from([
            "mcps", "--verbose", "--in-memory", "--format", "json", "--config", "mcps.toml", "list",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.in_memory);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.config, Some(PathBuf::from("mcps.toml")));
    }

    #[test]
    fn globals_after_subcommand() {
        let cli = Cli::try_parse_from(["mcps", "get", "rec-1", "--format", "json"]).unwrap();
        assert_eq!(cli.format, OutputFormat::Json);
        assert!(matches!(cli.command, Command::Get(_)));
    }
}

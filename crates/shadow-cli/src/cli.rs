use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use shadow_crypto::HashAlgorithm;
use shadow_store::BackendKind;

#[derive(Parser, Debug)]
#[command(name = "shadow", about = "Shadow named-document store", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file; flags override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Store directory
    #[arg(long, global = true)]
    pub dbdir: Option<PathBuf>,

    /// Store backend (log, file, memory)
    #[arg(long, global = true)]
    pub backend: Option<BackendKind>,

    /// Index digest (md5, blake3)
    #[arg(long, global = true)]
    pub hash: Option<HashAlgorithm>,

    /// Debug logging, echoed to stdout when logging to a directory
    #[arg(long, global = true)]
    pub debug: bool,

    /// Log directory; `shadow.log` is appended there
    #[arg(long, global = true)]
    pub log: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the HTTP service
    Serve(ServeArgs),
    /// Print the index JSON
    Index,
    /// Print an entry's document JSON
    Get(EntryArgs),
    /// Add or replace an item
    Add(AddArgs),
    /// Remove an item, or a whole section when no id is given
    RemoveItem(RemoveItemArgs),
    /// Remove an entry
    RemoveEntry(EntryArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Listen address
    #[arg(long)]
    pub http: Option<SocketAddr>,
}

#[derive(Args, Debug)]
pub struct EntryArgs {
    pub entry: String,
}

#[derive(Args, Debug)]
pub struct AddArgs {
    pub entry: String,
    pub section: String,
    /// Item JSON; read from stdin when omitted
    pub item: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemoveItemArgs {
    pub entry: String,
    pub section: String,
    #[arg(long)]
    pub id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "shadow", "get", "facility-1", "--dbdir", "/tmp/db", "--backend", "file",
        ])
        .unwrap();
        assert_eq!(cli.dbdir, Some(PathBuf::from("/tmp/db")));
        assert_eq!(cli.backend, Some(BackendKind::File));
        assert!(matches!(cli.command, Command::Get(EntryArgs { ref entry }) if entry == "facility-1"));
    }

    #[test]
    fn parses_serve_address() {
        let cli = Cli::try_parse_from(["shadow", "serve", "--http", "127.0.0.1:9000", "--debug"])
            .unwrap();
        assert!(cli.debug);
        match cli.command {
            Command::Serve(args) => assert_eq!(args.http.map(|a| a.port()), Some(9000)),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn remove_item_id_is_optional() {
        let cli = Cli::try_parse_from(["shadow", "remove-item", "e", "cards"]).unwrap();
        match cli.command {
            Command::RemoveItem(args) => assert!(args.id.is_none()),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_hash() {
        assert!(Cli::try_parse_from(["shadow", "index", "--hash", "sha1"]).is_err());
    }
}

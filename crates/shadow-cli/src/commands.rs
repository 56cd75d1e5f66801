use std::io::{self, Read, Write};

use anyhow::Context;
use colored::Colorize;
use shadow_crypto::ContentHasher;
use shadow_entry::EntryManager;
use shadow_server::{ServerConfig, ShadowServer};
use shadow_store::open_store;
use tracing::{debug, info};

use crate::cli::*;

/// Configuration file values (or defaults) with command-line overrides.
pub fn resolve_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(dir) = &cli.dbdir {
        config.store.path = dir.clone();
    }
    if let Some(backend) = cli.backend {
        config.store.backend = backend;
    }
    if let Some(hash) = cli.hash {
        config.hash = hash;
    }
    if let Command::Serve(ServeArgs { http: Some(addr) }) = &cli.command {
        config.bind_addr = *addr;
    }
    Ok(config)
}

pub fn run_command(command: Command, config: ServerConfig, out: &mut dyn Write) -> anyhow::Result<()> {
    match command {
        Command::Serve(_) => cmd_serve(config),
        Command::Index => with_entries(&config, |entries| {
            let index = entries.index_to_json()?;
            out.write_all(&index)?;
            writeln!(out)?;
            Ok(())
        }),
        Command::Get(args) => with_entries(&config, |entries| {
            let doc = entries
                .to_json(&args.entry)
                .with_context(|| format!("cannot read entry {}", args.entry))?;
            out.write_all(&doc)?;
            writeln!(out)?;
            Ok(())
        }),
        Command::Add(args) => {
            let item = match args.item {
                Some(item) => item,
                None => read_stdin()?,
            };
            with_entries(&config, |entries| {
                let hash = entries.add_item(&args.entry, &args.section, item.as_bytes())?;
                writeln!(
                    out,
                    "{} Added item to {}/{} ({})",
                    "✓".green().bold(),
                    args.entry.bold(),
                    args.section.yellow(),
                    hash.short_hex().dimmed()
                )?;
                Ok(())
            })
        }
        Command::RemoveItem(args) => with_entries(&config, |entries| {
            let id = args.id.as_deref().unwrap_or_default();
            entries.remove_item(&args.entry, &args.section, id)?;
            if id.is_empty() {
                writeln!(
                    out,
                    "{} Removed section {}/{}",
                    "✓".green().bold(),
                    args.entry.bold(),
                    args.section.yellow()
                )?;
            } else {
                writeln!(
                    out,
                    "{} Removed item {} from {}/{}",
                    "✓".green().bold(),
                    id.cyan(),
                    args.entry.bold(),
                    args.section.yellow()
                )?;
            }
            Ok(())
        }),
        Command::RemoveEntry(args) => with_entries(&config, |entries| {
            entries.remove_entry(&args.entry)?;
            writeln!(out, "{} Removed entry {}", "✓".green().bold(), args.entry.bold())?;
            Ok(())
        }),
    }
}

fn cmd_serve(config: ServerConfig) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start tokio runtime")?;
    info!(
        addr = %config.bind_addr,
        store = %config.store.path.display(),
        hash = %config.hash,
        "starting shadow server"
    );
    runtime.block_on(ShadowServer::new(config).serve())?;
    Ok(())
}

/// Open the configured store, run `op`, and close the store again.
fn with_entries<F>(config: &ServerConfig, op: F) -> anyhow::Result<()>
where
    F: FnOnce(&EntryManager) -> anyhow::Result<()>,
{
    let store = open_store(&config.store)
        .with_context(|| format!("cannot open store at {}", config.store.path.display()))?;
    let entries = EntryManager::load(store, ContentHasher::new(config.hash))?;
    debug!(
        store = %config.store.path.display(),
        entries = entries.len()?,
        "store opened for offline command"
    );
    let result = op(&entries);
    entries.close()?;
    result
}

fn read_stdin() -> anyhow::Result<String> {
    let mut item = String::new();
    io::stdin()
        .read_to_string(&mut item)
        .context("cannot read item from stdin")?;
    Ok(item)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use shadow_store::BackendKind;

    fn file_config(dir: &tempfile::TempDir) -> ServerConfig {
        let cli = Cli::try_parse_from([
            "shadow",
            "index",
            "--backend",
            "file",
            "--dbdir",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();
        resolve_config(&cli).unwrap()
    }

    fn run(config: &ServerConfig, args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(std::iter::once("shadow").chain(args.iter().copied()))?;
        let mut out = Vec::new();
        run_command(cli.command, config.clone(), &mut out)?;
        Ok(String::from_utf8(out)?)
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shadow.toml");
        std::fs::write(
            &path,
            "bind_addr = \"127.0.0.1:7000\"\nhash = \"blake3\"\n[store]\nbackend = \"memory\"\n",
        )
        .unwrap();
        let config_arg = path.to_str().unwrap();

        let cli = Cli::try_parse_from(["shadow", "serve", "--config", config_arg]).unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.bind_addr.port(), 7000);
        assert_eq!(config.store.backend, BackendKind::Memory);

        let cli = Cli::try_parse_from([
            "shadow", "serve", "--config", config_arg, "--http", "0.0.0.0:8081", "--hash", "md5",
        ])
        .unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.bind_addr.port(), 8081);
        assert_eq!(config.hash, shadow_crypto::HashAlgorithm::Md5);
    }

    #[test]
    fn offline_commands_share_one_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir);

        let added = run(&config, &["add", "facility-1", "cards", r#"{"id":"1","code":"1212"}"#]).unwrap();
        assert!(added.contains("facility-1"));

        let doc = run(&config, &["get", "facility-1"]).unwrap();
        assert_eq!(doc, "{\"cards\":[{\"id\":\"1\",\"code\":\"1212\"}]}\n");

        let index = run(&config, &["index"]).unwrap();
        assert!(index.starts_with(r#"[{"name":"facility-1","hash":""#));

        run(&config, &["remove-item", "facility-1", "cards", "--id", "1"]).unwrap();
        assert!(run(&config, &["get", "facility-1"]).is_err());
        assert_eq!(run(&config, &["index"]).unwrap(), "[]\n");
    }

    #[test]
    fn remove_entry_and_section() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir);
        run(&config, &["add", "e", "a", r#"{"id":"1"}"#]).unwrap();
        run(&config, &["add", "e", "b", r#"{"id":"1"}"#]).unwrap();

        run(&config, &["remove-item", "e", "a"]).unwrap();
        assert_eq!(run(&config, &["get", "e"]).unwrap(), "{\"b\":[{\"id\":\"1\"}]}\n");

        run(&config, &["remove-entry", "e"]).unwrap();
        assert!(!dir.path().join("e.json").exists());
    }

    #[derive(Clone, Default)]
    struct SharedBuf(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn offline_commands_log_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir);
        let logs = SharedBuf::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            run(&config, &["add", "e", "s", r#"{"id":"1"}"#]).unwrap();
        });

        let logs = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("store opened for offline command"));
        assert!(logs.contains("entries loaded"));
    }

    #[test]
    fn invalid_item_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = file_config(&dir);
        let err = run(&config, &["add", "e", "s", r#"{"code":"1"}"#]).unwrap_err();
        assert!(err.to_string().contains("id"));
    }
}

use std::io::Read;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};

use mcps_crypto::{encrypt, CipherKey};
use mcps_ledger::{HttpLedger, InMemoryLedger, LedgerClient};
use mcps_records::{Published, RecordId, RecordStore, Version};
use mcps_server::{AppConfig, LedgerBackend, McpsServer};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config =
        AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.in_memory {
        config.ledger_backend = LedgerBackend::Memory;
    }
    let format = cli.format;

    let output = match cli.command {
        Command::Serve(args) => return cmd_serve(config, args).await,
        Command::EncryptKey(args) => cmd_encrypt_key(&config, args, format)?,
        command => {
            let store = open_store(&config)?;
            run_record_command(&store, command, format).await?
        }
    };
    println!("{output}");
    Ok(())
}

async fn run_record_command(
    store: &RecordStore,
    command: Command,
    format: OutputFormat,
) -> anyhow::Result<String> {
    match command {
        Command::Create(args) => {
            let published = store.create(read_payload(&args.payload)?).await?;
            render_published(&published, "Created", format)
        }
        Command::Modify(args) => {
            let published = store.update(read_payload(&args.payload)?).await?;
            render_published(&published, "Updated", format)
        }
        Command::List(args) if args.ids_only => {
            let roots = store.list_root_ids().await?;
            match format {
                OutputFormat::Json => Ok(serde_json::to_string_pretty(&roots)?),
                OutputFormat::Text => {
                    Ok(roots.iter().map(|id| id.to_string()).collect::<Vec<_>>().join("\n"))
                }
            }
        }
        Command::List(_) => render_records(&store.list().await?, format),
        Command::Get(args) => {
            let record = RecordId::parse(&args.id)?;
            Ok(serde_json::to_string_pretty(&store.get(&record).await?)?)
        }
        Command::History(args) => {
            let record = RecordId::parse(&args.id)?;
            render_history(&store.history(&record).await?, format)
        }
        Command::Serve(_) | Command::EncryptKey(_) => bail!("not a record command"),
    }
}

fn open_store(config: &AppConfig) -> anyhow::Result<RecordStore> {
    let ledger: Arc<dyn LedgerClient> = match config.ledger_backend {
        LedgerBackend::Http => Arc::new(
            HttpLedger::new(&config.ledger).context("failed to configure the ledger client")?,
        ),
        LedgerBackend::Memory => {
            tracing::warn!("in-memory ledger: anything written by this command is discarded");
            Arc::new(InMemoryLedger::default())
        }
    };
    Ok(RecordStore::new(ledger, config.records.clone()))
}

async fn cmd_serve(mut config: AppConfig, args: ServeArgs) -> anyhow::Result<()> {
    if let Some(bind) = args.bind {
        config.server.bind_addr = bind;
    }
    McpsServer::new(config)?.serve().await?;
    Ok(())
}

fn cmd_encrypt_key(
    config: &AppConfig,
    args: EncryptKeyArgs,
    format: OutputFormat,
) -> anyhow::Result<String> {
    let secret = config
        .auth
        .secret_key
        .as_deref()
        .filter(|s| !s.is_empty())
        .context("no secret key configured (set MCPS_SECRET_KEY or auth.secret_key)")?;
    let plaintext = args
        .plaintext
        .or_else(|| config.auth.api_key.clone())
        .context("no API key given and none configured")?;
    let value = encrypt(&plaintext, &CipherKey::derive(secret))?;
    Ok(match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(&json!({ "header": mcps_server::API_KEY_HEADER, "value": value }))?
        }
        OutputFormat::Text => value,
    })
}

/// Parse a payload argument: inline JSON, `@path`, or `-` for stdin.
fn read_payload(raw: &str) -> anyhow::Result<Value> {
    let text = if raw == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).context("failed to read stdin")?;
        buf
    } else if let Some(path) = raw.strip_prefix('@') {
        std::fs::read_to_string(path).with_context(|| format!("failed to read {path}"))?
    } else {
        raw.to_string()
    };
    serde_json::from_str(&text).context("payload is not valid JSON")
}

fn render_published(published: &Published, verb: &str, format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(published)?),
        OutputFormat::Text => Ok(format!(
            "{} {} record {}\n  Address: {}\n  Transaction: {}",
            "✓".green().bold(),
            verb,
            published.record_id.to_string().yellow(),
            published.address.to_string().cyan(),
            published.transaction.short().dimmed(),
        )),
    }
}

fn render_records(records: &[Value], format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(records)?);
    }
    if records.is_empty() {
        return Ok("No records.".into());
    }
    let mut lines = Vec::with_capacity(records.len());
    for record in records {
        let id = record.get("recordId").and_then(Value::as_str).unwrap_or("?");
        lines.push(format!("{}  {}", id.yellow().bold(), serde_json::to_string(record)?));
    }
    Ok(lines.join("\n"))
}

fn render_history(versions: &[Version], format: OutputFormat) -> anyhow::Result<String> {
    if format == OutputFormat::Json {
        return Ok(serde_json::to_string_pretty(versions)?);
    }
    let mut lines = Vec::with_capacity(versions.len() * 2);
    for (n, version) in versions.iter().enumerate() {
        let marker = if version.is_root { " (root)".green().to_string() } else { String::new() };
        lines.push(format!(
            "{}. {} at {}{}",
            n + 1,
            version.transaction.short().yellow(),
            version.timestamp,
            marker
        ));
        lines.push(format!("   {}", serde_json::to_string(&version.payload)?));
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use mcps_crypto::decrypt;
    use mcps_records::RecordsConfig;

    fn store() -> RecordStore {
        RecordStore::new(Arc::new(InMemoryLedger::default()), RecordsConfig::default())
    }

    fn create(payload: &str) -> Command {
        Command::Create(PayloadArgs { payload: payload.into() })
    }

    #[tokio::test]
    async fn create_then_list() {
        let store = store();
        let out = run_record_command(&store, create(r#"{"title":"hello"}"#), OutputFormat::Json)
            .await
            .unwrap();
        let published: Value = serde_json::from_str(&out).unwrap();
        let record_id = published["record_id"].as_str().unwrap().to_string();
        assert_eq!(published["transaction"], published["root"]);

        let out = run_record_command(&store, Command::List(ListArgs { ids_only: false }), OutputFormat::Text)
            .await
            .unwrap();
        assert!(out.contains(&record_id));
        assert!(out.contains("hello"));

        let out = run_record_command(&store, Command::List(ListArgs { ids_only: true }), OutputFormat::Json)
            .await
            .unwrap();
        let ids: Vec<String> = serde_json::from_str(&out).unwrap();
        assert_eq!(ids, vec![published["root"].as_str().unwrap().to_string()]);
    }

    #[tokio::test]
    async fn modify_and_history() {
        let store = store();
        let published = store.create(json!({ "v": 1 })).await.unwrap();
        let id = published.record_id.to_string();

        let modify = Command::Modify(PayloadArgs { payload: json!({ "recordId": id, "v": 2 }).to_string() });
        let out = run_record_command(&store, modify, OutputFormat::Text).await.unwrap();
        assert!(out.contains("Updated"));
        assert!(out.contains(&published.address.to_string()));

        let out = run_record_command(&store, Command::Get(RecordArgs { id: id.clone() }), OutputFormat::Text)
            .await
            .unwrap();
        assert_eq!(serde_json::from_str::<Value>(&out).unwrap()["v"], 2);

        let out = run_record_command(&store, Command::History(RecordArgs { id }), OutputFormat::Json)
            .await
            .unwrap();
        let versions: Vec<Value> = serde_json::from_str(&out).unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0]["payload"]["v"], 1);
    }

    #[tokio::test]
    async fn unknown_record_is_an_error() {
        let store = store();
        let result =
            run_record_command(&store, Command::Get(RecordArgs { id: "ghost".into() }), OutputFormat::Text).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_list_text() {
        let out = run_record_command(&store(), Command::List(ListArgs { ids_only: false }), OutputFormat::Text)
            .await
            .unwrap();
        assert_eq!(out, "No records.");
    }

    #[test]
    fn payload_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"from":"file"}}"#).unwrap();
        let value = read_payload(&format!("@{}", file.path().display())).unwrap();
        assert_eq!(value, json!({ "from": "file" }));
    }

    #[test]
    fn invalid_payload_is_rejected() {
        assert!(read_payload("{not json").is_err());
        assert!(read_payload("@/definitely/not/here.json").is_err());
    }

    #[test]
    fn encrypt_key_round_trips() {
        let mut config = AppConfig::default();
        config.auth.secret_key = Some("s3cret".into());
        config.auth.api_key = Some("configured-key".into());

        let header = cmd_encrypt_key(&config, EncryptKeyArgs { plaintext: None }, OutputFormat::Text).unwrap();
        assert_eq!(decrypt(&header, &CipherKey::derive("s3cret")).unwrap(), "configured-key");

        let out = cmd_encrypt_key(
            &config,
            EncryptKeyArgs { plaintext: Some("explicit".into()) },
            OutputFormat::Json,
        )
        .unwrap();
        let parsed: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed["header"], "x-api-key");
        let value = parsed["value"].as_str().unwrap();
        assert_eq!(decrypt(value, &CipherKey::derive("s3cret")).unwrap(), "explicit");
    }

    #[test]
    fn encrypt_key_needs_a_secret() {
        let config = AppConfig::default();
        let args = EncryptKeyArgs { plaintext: Some("k".into()) };
        assert!(cmd_encrypt_key(&config, args, OutputFormat::Text).is_err());
    }
}

use std::sync::Arc;

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use inbox_sort::cache::{FileSource, RuleSource, StaticSource};
use inbox_sort::classify::{EmailInput, KeywordClassifier};
use inbox_sort::config::ClassifierConfig;

const USAGE: &str = "usage: inbox-sort [classify|verify|explain]

  classify  read one JSON email per line on stdin, write one decision per line (default)
  verify    load the rule table and report its summary and warnings
  explain   like classify, with per-category keyword totals

environment:
  INBOX_SORT_RULES   rule table JSON file (default: built-in table)
  RUST_LOG           log filter (default: info)";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries results only.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mode = std::env::args().nth(1).unwrap_or_else(|| "classify".to_string());
    if !matches!(mode.as_str(), "classify" | "verify" | "explain") {
        eprintln!("{USAGE}");
        bail!("unknown mode '{mode}'");
    }

    let config = ClassifierConfig::from_env();
    let source: Arc<dyn RuleSource> = match std::env::var("INBOX_SORT_RULES") {
        Ok(path) if !path.trim().is_empty() => Arc::new(FileSource::new(path.trim())),
        _ => Arc::new(StaticSource::builtin().context("built-in rule table is invalid")?),
    };
    let source_name = source.name().to_string();

    let classifier = KeywordClassifier::new(source, config);
    let snapshot = classifier
        .warm()
        .await
        .with_context(|| format!("failed to load rules from {source_name}"))?;

    tracing::info!(
        source = %source_name,
        categories = snapshot.active.len(),
        fallback = %classifier.config().fallback_category,
        "Inbox sort ready"
    );

    if mode == "verify" {
        let summary = snapshot.book.summary();
        let warnings = snapshot.book.validate();
        let report = serde_json::json!({
            "summary": summary,
            "warnings": warnings,
            "loaded_at": snapshot.loaded_at,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !warnings.is_empty() {
            bail!("{} rule table warning(s)", warnings.len());
        }
        return Ok(());
    }

    let explain = mode == "explain";
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        line_no += 1;
        if line.trim().is_empty() {
            continue;
        }
        let email: EmailInput = match serde_json::from_str(&line) {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "Skipping malformed input line");
                continue;
            }
        };

        let output = if explain {
            let (decision, totals) = classifier.explain(&email).await;
            serde_json::to_string(&serde_json::json!({
                "decision": decision,
                "totals": totals,
            }))?
        } else {
            serde_json::to_string(&classifier.classify(&email).await)?
        };
        stdout.write_all(output.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
    }

    stdout.flush().await?;
    Ok(())
}

//! `emlak-editor` -- replays a recorded listing-editor session.
//!
//! Loads a session script (see [`emlak_editor::script`]), runs it against an
//! in-memory store with the configured autosave behaviour, logs every editor
//! event and prints a JSON report on stdout.
//!
//! # Usage
//!
//! ```text
//! emlak-editor <session.json>
//! ```
//!
//! Editor settings come from `EDITOR_*` environment variables (see
//! [`EditorConfig::from_env`]); log filtering from `RUST_LOG`.

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use emlak_editor::config::EditorConfig;
use emlak_editor::script;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "emlak_editor=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let path = std::env::args()
        .nth(1)
        .context("usage: emlak-editor <session.json>")?;

    let raw = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read session script {path}"))?;
    let session_script = script::parse_script(&raw)
        .with_context(|| format!("invalid session script {path}"))?;

    let config = EditorConfig::from_env();
    tracing::info!(
        path = %path,
        listing_id = session_script.listing_id,
        steps = session_script.steps.len(),
        ?config,
        "Replaying editor session",
    );

    let report = script::run_script(session_script, config).await;

    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize report")?
    );
    Ok(())
}

use anyhow::Context;
use jiff::Timestamp;
use tracing_subscriber::EnvFilter;

use redlite::rdb::RdbFile;
use redlite::server::Server;
use redlite::store::{DataType, Store, Value};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let server = Server::new(std::env::args()).context("invalid command line arguments")?;

    let mut store = Store::new();

    if let Some(path) = server.snapshot_path() {
        if path.exists() {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;

            let snapshot = RdbFile::parse(&bytes)
                .with_context(|| format!("failed to parse snapshot {}", path.display()))?;

            seed_store(&mut store, snapshot);
            tracing::info!(path = %path.display(), keys = store.len(), "loaded snapshot");
        }
    }

    server.run(store).await;

    Ok(())
}

/// Seeds the store from a parsed snapshot. Expiries are absolute; already
/// expired entries are loaded as-is and disappear lazily on first read.
fn seed_store(store: &mut Store, snapshot: RdbFile) {
    for entry in snapshot.db.entries {
        let expires_at = entry
            .expires_at_ms
            .and_then(|ms| Timestamp::from_millisecond(ms as i64).ok());

        store.insert(
            entry.key,
            Value {
                data: DataType::String(entry.value),
                expires_at,
            },
        );
    }
}

//! Upload images into a Lumen gallery from the command line.
//!
//! ```bash
//! lumen-upload --gallery 12 a.jpg b.png
//! ```
//!
//! Runs the same optimistic flow as the web client and logs per-file
//! progress, then the gallery as the server reports it.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use bytes::Bytes;
use clap::Parser;
use lumen_client::collection::PendingStatus;
use lumen_client::config::ClientConfig;
use lumen_client::preview::SelectedFile;
use lumen_client::session::Session;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const PROGRESS_POLL: Duration = Duration::from_millis(250);

#[derive(Parser, Debug)]
#[clap(name = "lumen-upload")]
#[clap(about = "Upload images into a Lumen gallery")]
struct Args {
    /// Base URL of the API, including /api/v1
    #[clap(long, env = "LUMEN_API_URL")]
    api_url: Option<String>,

    /// Session token from the identity provider
    #[clap(long, env = "LUMEN_TOKEN", hide_env_values = true)]
    token: String,

    /// Gallery to upload into
    #[clap(long)]
    gallery: i64,

    /// Image files, uploaded concurrently
    #[clap(required = true, value_name = "FILE")]
    files: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumen_client=info,lumen_upload=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env();
    if let Some(api_url) = args.api_url {
        config.api_url = api_url;
    }

    let mut files = Vec::with_capacity(args.files.len());
    for path in &args.files {
        files.push(read_file(path).await?);
    }

    let session = Session::over_http(config, &args.token);
    session
        .open_gallery(args.gallery)
        .await
        .with_context(|| format!("Failed to open gallery {}", args.gallery))?;

    let uploader = session.uploader(args.gallery);
    let handles = uploader.select_files(files).await;
    let collection = uploader.collection().clone();

    // Log progress until every chain has settled.
    let mut last_seen: HashMap<uuid::Uuid, (u8, PendingStatus)> = HashMap::new();
    while handles.iter().any(|h| !h.task.is_finished()) {
        for pending in collection.pending_entries() {
            let seen = (pending.progress, pending.status.clone());
            if last_seen.get(&pending.client_id) != Some(&seen) {
                tracing::info!(
                    file = %pending.file_name,
                    progress = pending.progress,
                    status = ?pending.status,
                    "Upload progress"
                );
                last_seen.insert(pending.client_id, seen);
            }
        }
        tokio::time::sleep(PROGRESS_POLL).await;
    }

    let mut failed = 0usize;
    for handle in handles {
        match handle.task.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                failed += 1;
                tracing::error!(client_id = %handle.client_id, error = %e, "Upload failed");
            }
            Err(e) => {
                failed += 1;
                tracing::error!(client_id = %handle.client_id, error = %e, "Upload task panicked");
            }
        }
    }

    // One more read picks up anything still finalizing.
    session.refresh(&collection).await?;

    for image in collection.durable() {
        tracing::info!(
            id = image.id,
            position = image.position,
            file = %image.original_filename,
            url = %image.url,
            "Gallery image"
        );
    }
    for pending in collection.pending_entries() {
        tracing::warn!(file = %pending.file_name, status = ?pending.status, "Not confirmed");
    }

    session.sign_out().await;

    if failed > 0 {
        anyhow::bail!("{failed} upload(s) failed");
    }
    Ok(())
}

async fn read_file(path: &PathBuf) -> anyhow::Result<SelectedFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let content_type = image::ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or("application/octet-stream");
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SelectedFile::new(name, content_type, Bytes::from(bytes)))
}

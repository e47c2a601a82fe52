//! Follow the public murmur feed from the terminal
//!
//! Boots the client tier from environment config, mounts the feed, and
//! logs every refresh until Ctrl-C. Useful for watching a deployment
//! without a frontend in the way.

use anyhow::{Context, Result};
use tracing::{info, warn};

use murmur_client::app::AppState;
use murmur_client::config::ClientConfig;
use murmur_client::display;
use murmur_client::keys;
use murmur_client::logging::init_tracing;
use query_cache::{CacheEventKind, QueryState};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    info!("🔧 Starting feed-tail");

    let config = ClientConfig::from_env().context("Failed to load configuration")?;
    let app = AppState::connect(&config).context("Failed to build the remote client")?;

    // Read-only tail: no identity to restore, browse anonymously.
    app.session.finish_initializing();
    let mut events = app.subscribe();
    let _mounts = app.mount_queries();

    info!(
        backend = %config.backend.base_url,
        refresh_secs = config.feed.refresh_secs,
        "✅ Following the public feed"
    );

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
            event = events.recv() => {
                match event {
                    Ok(event) if event.key == keys::public_feed() => match event.kind {
                        CacheEventKind::Updated => print_feed(&app),
                        CacheEventKind::Failed => {
                            warn!("Feed refresh failed, keeping the last page");
                        }
                        _ => {}
                    },
                    Ok(_) => {}
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped = skipped, "Event stream lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        }
    }

    Ok(())
}

fn print_feed(app: &AppState) {
    let now = chrono::Utc::now();
    if let QueryState::Ready(posts) = app.feed.feed() {
        info!(count = posts.len(), "Feed refreshed");
        for entry in posts.iter().take(10) {
            info!(
                "[{}] {} · {}: {}",
                display::topic_label(entry.post.topic),
                display::relative_timestamp(entry.post.timestamp, now),
                entry.display_name(),
                entry.post.content
            );
        }
    }
}

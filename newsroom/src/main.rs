use std::future::Future;
use std::path::{Path, PathBuf};

use newsroom_core::{spawn_poller, AppConfig, ArticleStore, DataApi, Fetcher};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let dir = data_dir()?;
    let config_path = dir.join("config.json");
    let config = AppConfig::load_or_init(&config_path)?;

    let store = open_store(&dir).await?;
    let fetcher = Fetcher::new(config.fetch_config())?;
    let interval = config.poll_config().interval;

    let api = DataApi::new(store.clone(), config, Some(config_path));
    api.sync_feeds().await;

    info!(?interval, "starting feed scheduler");
    let poller = spawn_poller(store.clone(), fetcher, api.shared_config());

    let signal = shutdown_signal().await;
    info!(signal, "shutting down");

    if let Err(err) = poller.stop().await {
        error!(error = %err, "poller did not stop cleanly");
    }
    store.close().await;
    info!("stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

fn data_dir() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let dir = AppConfig::data_dir()?;
    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

async fn open_store(dir: &Path) -> Result<ArticleStore, Box<dyn std::error::Error>> {
    let path = dir.join("news.db");
    let store = ArticleStore::open(&path).await?;
    Ok(store)
}

/// Resolves with the name of the first stop signal received: Ctrl-C, or
/// SIGTERM on unix. The SIGTERM listener is installed before this returns.
fn shutdown_signal() -> impl Future<Output = &'static str> {
    #[cfg(unix)]
    let mut terminate = {
        use tokio::signal::unix::{signal, SignalKind};
        signal(SignalKind::terminate())
            .map_err(|err| error!(error = %err, "failed to listen for SIGTERM"))
            .ok()
    };

    async move {
        let ctrl_c = async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                error!(error = %err, "failed to listen for Ctrl-C");
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let term = async {
            match terminate.as_mut() {
                Some(stream) => {
                    stream.recv().await;
                }
                None => std::future::pending::<()>().await,
            }
        };
        #[cfg(not(unix))]
        let term = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => "SIGINT",
            _ = term => "SIGTERM",
        }
    }
}

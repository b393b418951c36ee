mod wiring;

use crate::{cli, context, rest, storage};
use anyhow::{Context as AnyhowContext, Result};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub struct App {
    pub ctx: context::Context,
    pub storage: storage::SqliteStorage,
    shutdown: CancellationToken,
}

impl App {
    /// Parse the CLI and perform the startup side effects: log file,
    /// data directory, schema.
    pub fn from_cli(logs: &crate::tracing::LogSink) -> Result<Self> {
        let cli = cli::parse();
        let ctx = context::Context::from_cli(&cli);

        logs.set_file(ctx.log_file.as_deref()).context("opening log file")?;
        log::info!("🚀 Starting todos");
        log::info!("📂 Data dir: {}", ctx.data_dir.to_string_lossy());

        wiring::init_data_dir(&ctx).context("initializing data dir")?;
        let storage = wiring::init_storage(&ctx)?;

        Ok(Self::new(ctx, storage))
    }

    fn new(ctx: context::Context, storage: storage::SqliteStorage) -> Self {
        Self {
            ctx,
            storage,
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn run_daemon(&self) -> Result<()> {
        if let Some(path) = self.ctx.log_file.as_deref() {
            log::info!("📝 Log file: {}", path.to_string_lossy());
        }
        log::info!("🗄️ Database: {}", self.storage.path().to_string_lossy());

        let mut rest_handle = self.spawn_rest_server();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => log::info!("🧨 Ctrl-C received, shutting down"),
            _ = &mut rest_handle => log::error!("REST task exited unexpectedly"),
        }

        self.shutdown.cancel();
        if !rest_handle.is_finished() {
            rest_handle.await?;
        }

        log::info!("✅ Shutdown complete");
        Ok(())
    }

    fn spawn_rest_server(&self) -> JoinHandle<()> {
        let addr = self.ctx.api_listen;
        let storage = self.storage.clone();
        let token = self.shutdown.clone();

        tokio::spawn(async move {
            if let Err(e) = rest::serve(addr, storage, token).await {
                log::error!("REST server failed: {:#}", e);
            }
        })
    }
}

pub async fn run() -> Result<()> {
    let logs = crate::tracing::init();
    let app = App::from_cli(&logs)?;
    app.run_daemon().await
}

mod app;
mod cli;
mod context;
mod repository;
mod rest;
mod storage;
mod tracing;
mod types;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    app::run().await
}

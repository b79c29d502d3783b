use anyhow::{Context, Result};
use catalog_server::{build_app, serve_until};
use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "server")]
#[command(about = "Serve course search over HTTP")]
struct Args {
    /// Directory written by `indexer build`
    #[arg(long, default_value = "./index")]
    index: String,
    /// Address to bind, host:port
    #[arg(long, env = "CATALOG_BIND", default_value = "0.0.0.0:8080")]
    bind: String,
}

async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "cannot listen for ctrl-c, serving until killed");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let app = build_app(args.index.clone()).with_context(|| format!("loading index from {}", args.index))?;
    let listener = TcpListener::bind(&args.bind).await.with_context(|| format!("binding {}", args.bind))?;
    serve_until(listener, app, ctrl_c()).await
}

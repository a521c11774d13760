use anyhow::Context;
use clap::Parser;
use dotenv::dotenv;
use tracing_subscriber::EnvFilter;
use uast_dashboard::{AppState, Args, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    let default_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let app_state = AppState::from_args(&args).await.with_context(|| {
        format!(
            "failed to connect to the parsing service at {}",
            args.bblfsh_addr
        )
    })?;

    let listener = tokio::net::TcpListener::bind(&args.addr)
        .await
        .with_context(|| format!("failed to bind {}", args.addr))?;

    tracing::info!(addr = %args.addr, "server running");
    axum::serve(listener, router(app_state)).await?;

    Ok(())
}

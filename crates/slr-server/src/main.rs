use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use slr_server::data::DEFAULT_DATA_FILE;
use slr_server::{AppState, DataFile, GeminiGenerator, router};

#[derive(Parser, Debug)]
#[command(name = "slr-server", version, about = "Reference backend for SLR Partner")]
struct Cli {
    /// Port to listen on
    #[arg(long, default_value_t = 8000)]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: std::net::IpAddr,

    /// JSON file holding projects, papers and query history
    #[arg(long, default_value = DEFAULT_DATA_FILE)]
    data_file: PathBuf,

    /// Gemini model used for query generation
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut generator = GeminiGenerator::default();
    if let Some(model) = cli.model {
        generator = generator.with_model(model);
    }
    let state = Arc::new(AppState::new(
        DataFile::new(&cli.data_file),
        Arc::new(generator),
    ));
    tracing::info!(data_file = %cli.data_file.display(), "using data file");

    let addr = SocketAddr::new(cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{addr}");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;

    Ok(())
}

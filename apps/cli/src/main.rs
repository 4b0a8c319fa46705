//! SessVault command-line entry point.

mod commands;
mod config;
mod mime;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sessvault_blob_store::BlobStore;
use sessvault_protocol::RemoteLocation;
use sessvault_session::WsSessionClient;

use config::Config;

#[derive(Parser, Debug)]
#[command(name = "sessvault", version)]
#[command(about = "Store files as chunked remote session records")]
struct Cli {
    /// Config file (defaults to sessvault/config.json in the user config dir).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Suppress progress output.
    #[arg(short, long, global = true, action = ArgAction::SetTrue)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a file and print its handle.
    Store(StoreArgs),
    /// Retrieve a stored file.
    Fetch(FetchArgs),
    /// Show what a handle points to.
    Info(InfoArgs),
}

#[derive(clap::Args, Debug)]
struct StoreArgs {
    file: PathBuf,
    /// MIME type to record (detected from the extension otherwise).
    #[arg(long)]
    mime: Option<String>,
    /// Maximum chunk length in base64 characters.
    #[arg(long)]
    chunk_size: Option<usize>,
    /// Maximum chunk uploads in flight.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(clap::Args, Debug)]
struct FetchArgs {
    /// Handle printed by `store`, as ID:PRINCIPAL.
    handle: RemoteLocation,
    /// Output path (defaults to the recorded filename).
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Maximum chunk reads in flight.
    #[arg(long)]
    concurrency: Option<usize>,
}

#[derive(clap::Args, Debug)]
struct InfoArgs {
    handle: RemoteLocation,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,sessvault=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(cli))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Store(args) => {
            let config = config.with_overrides(args.chunk_size, args.concurrency);
            let store = open_store(&config)?;
            let handle = commands::store(&store, &args.file, args.mime.as_deref(), cli.quiet).await?;
            println!("{handle}");
        }
        Commands::Fetch(args) => {
            let config = config.with_overrides(None, args.concurrency);
            let store = open_store(&config)?;
            let path =
                commands::fetch(&store, &args.handle, args.output.as_deref(), cli.quiet).await?;
            println!("{}", path.display());
        }
        Commands::Info(args) => {
            let store = open_store(&config)?;
            let meta = commands::info(&store, &args.handle).await?;
            println!("filename:  {}", meta.filename);
            println!("mime type: {}", meta.mime_type);
            println!("chunks:    {}", meta.chunk_locations.len());
        }
    }
    Ok(())
}

/// Builds a store on the live service. Ctrl-C cancels it.
fn open_store(config: &Config) -> anyhow::Result<BlobStore> {
    config.store.validate()?;
    let client = WsSessionClient::new(config.remote.clone())?;
    let store = BlobStore::new(Arc::new(client), config.store);

    let cancel = store.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });

    Ok(store)
}

//! fileshare CLI
//!
//! Publish, discover, and fetch files fragment by fragment over the local
//! network.

mod config;
mod progress;
mod table;

use clap::{Parser, Subcommand};
use fileshare_catalog::Catalog;
use fileshare_core::{NodeConfig, PeerResolver, RpcPeerResolver, Seeder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use config::Config;
use progress::{format_duration, TransferProgress};

#[derive(Parser)]
#[command(name = "fileshare")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the local catalog database.
    #[arg(long, global = true)]
    db: Option<String>,

    /// Enable debug-level logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file path. Defaults to the platform config directory.
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Advertise a local file to the network.
    Publish {
        /// Path of the file to publish.
        file: String,
    },
    /// Stop advertising a published file (it stays on disk).
    Unpublish {
        /// Display name of the file, as shown by `list`.
        name: String,
    },
    /// Remove a file's metadata and fragment records from the catalog.
    Delete {
        /// Display name of the file, as shown by `list`.
        name: String,
    },
    /// List files.
    List {
        /// List only what this node's catalog already knows, skipping discovery.
        #[arg(long)]
        local: bool,
    },
    /// Become discoverable and serve fragments until the listen duration
    /// elapses or the process is interrupted.
    Seed {
        /// Name this node advertises to peers.
        #[arg(long)]
        name: Option<String>,
        /// Address to bind the RPC service to.
        #[arg(long, default_value = "0.0.0.0:0")]
        bind: String,
        /// Also advertise/serve `Downloading`/`Paused` files, not just complete ones.
        #[arg(long)]
        allow_partial: bool,
        /// How long to stay discoverable, in seconds. Omit to run until interrupted.
        #[arg(long)]
        duration: Option<u64>,
    },
    /// Fetch a file by fingerprint or display name.
    Download {
        /// Fingerprint (or display name) of the file to fetch.
        target: String,
        /// Destination directory the file is written into.
        #[arg(short, long, default_value = ".")]
        output: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(if cli.verbose { "debug" } else { "info" })
        .init();

    let file_config = match cli.config {
        Some(path) => Config::load(&path)?,
        None => Config::load_or_default()?,
    };

    let node_config = file_config.to_node_config(cli.verbose);
    let catalog_path = cli.db.unwrap_or(node_config.catalog_path.clone());
    let catalog = Catalog::open(&catalog_path, cli.verbose).await?;
    let self_name = hostname::get()?.to_string_lossy().into_owned();

    match cli.command {
        Commands::Publish { file } => publish(&catalog, &file, &self_name).await,
        Commands::Unpublish { name } => unpublish(&catalog, &name).await,
        Commands::Delete { name } => delete(&catalog, &name).await,
        Commands::List { local } => {
            list(&catalog, local, &self_name, &node_config).await
        }
        Commands::Seed {
            name,
            bind,
            allow_partial,
            duration,
        } => {
            seed(
                catalog,
                name.unwrap_or(self_name),
                &bind,
                allow_partial,
                duration.map(std::time::Duration::from_secs),
                &node_config,
            )
            .await
        }
        Commands::Download { target, output } => {
            download(&catalog, &target, &output, &self_name, &node_config).await
        }
    }
}

async fn publish(catalog: &Catalog, file: &str, publisher: &str) -> anyhow::Result<()> {
    catalog.publish(file, publisher).await?;
    println!("Published: {file}");
    Ok(())
}

async fn unpublish(catalog: &Catalog, name: &str) -> anyhow::Result<()> {
    catalog.unpublish(name).await?;
    println!("Unpublished: {name}");
    Ok(())
}

async fn delete(catalog: &Catalog, name: &str) -> anyhow::Result<()> {
    catalog.delete(name).await?;
    println!("Deleted: {name}");
    Ok(())
}

async fn list(
    catalog: &Catalog,
    local_only: bool,
    self_name: &str,
    config: &NodeConfig,
) -> anyhow::Result<()> {
    let mut files = catalog.list_local().await?;

    if !local_only {
        let rpc_addr: SocketAddr = ([0, 0, 0, 0], config.rpc_port).into();
        let resolver = RpcPeerResolver::new(self_name.to_string(), rpc_addr, config.discovery_port);
        match resolver.discover().await {
            Ok(peers) => {
                for peer in peers {
                    files.extend(peer.list().await);
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "peer discovery failed, showing local catalog only");
            }
        }
    }

    println!("{}", table::render_listing(&files));
    Ok(())
}

async fn seed(
    catalog: Catalog,
    self_name: String,
    bind: &str,
    allow_partial: bool,
    duration: Option<std::time::Duration>,
    config: &NodeConfig,
) -> anyhow::Result<()> {
    let bind_addr: SocketAddr = bind.parse()?;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let rpc_addr = listener.local_addr()?;
    drop(listener);

    let cancel = CancellationToken::new();
    let discovery_cancel = cancel.clone();
    let discovery_handle = tokio::spawn(fileshare_discovery::listen(
        self_name.clone(),
        rpc_addr,
        config.discovery_port,
        discovery_cancel,
    ));

    let seeder = Arc::new(Seeder::new(catalog, allow_partial));
    println!("Seeding as '{self_name}' on {rpc_addr} (allow_partial={allow_partial})");
    match duration {
        Some(d) => println!("Listening for {}, or press Ctrl+C to stop early", format_duration(d)),
        None => println!("Press Ctrl+C to stop"),
    }

    let serve_cancel = cancel.clone();
    tokio::select! {
        result = fileshare_rpc::serve(rpc_addr, seeder, serve_cancel) => {
            result?;
        }
        () = listen_timeout(duration) => {
            println!("\nListen duration elapsed, shutting down...");
            cancel.cancel();
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
            cancel.cancel();
        }
    }

    let _ = discovery_handle.await;
    Ok(())
}

/// Resolves after `duration`, or never when `duration` is `None` — the
/// operator-configured listen-timeout from §5: expiry cancels the server
/// context the same way an interrupt signal does.
async fn listen_timeout(duration: Option<std::time::Duration>) {
    match duration {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

async fn download(
    catalog: &Catalog,
    target: &str,
    output_dir: &str,
    self_name: &str,
    config: &NodeConfig,
) -> anyhow::Result<()> {
    tokio::fs::create_dir_all(output_dir).await?;

    let rpc_addr: SocketAddr = ([0, 0, 0, 0], config.rpc_port).into();
    let resolver: Arc<dyn PeerResolver> = Arc::new(RpcPeerResolver::new(
        self_name.to_string(),
        rpc_addr,
        config.discovery_port,
    ));

    let progress = TransferProgress::new(0, target);
    let cancel = CancellationToken::new();
    let download_cancel = cancel.clone();

    tokio::select! {
        result = fileshare_core::download(
            catalog,
            resolver,
            config,
            target,
            output_dir,
            &progress,
            download_cancel,
        ) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            cancel.cancel();
            println!("\nCancelling...");
        }
    }

    Ok(())
}

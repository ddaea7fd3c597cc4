//! `marquee` command line client.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use marquee_client::{
    AuthToken, ClientConfig, CreateLibraryForm, DeleteOutcome, FetchStatus,
    HttpLibraryApi, Library, LibraryId, LibrarySession, MediaType,
    RegistryState,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "marquee")]
#[command(about = "List, watch and manage media server libraries")]
struct Cli {
    /// Server base URL (overrides config)
    #[arg(long, env = "MARQUEE_SERVER_URL")]
    server: Option<String>,

    /// Session token sent in the Authorization header
    #[arg(long, env = "MARQUEE_TOKEN", hide_env_values = true)]
    token: Option<String>,

    /// Config file to read instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print every library once
    List,
    /// Print the collection on every change until Ctrl-C
    Watch,
    /// Create a library
    Create {
        name: String,
        #[arg(long, default_value = "")]
        location: String,
        /// movie or tv
        #[arg(long, default_value_t = MediaType::Movie)]
        media_type: MediaType,
    },
    /// Delete a library by id
    Delete { id: LibraryId },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,marquee_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = match &cli.config {
        Some(path) => {
            let mut config = ClientConfig::load_from(Some(path))
                .with_context(|| {
                    format!("failed to load config from {}", path.display())
                })?;
            config
                .apply_overrides(|name| std::env::var(name).ok())
                .context("invalid MARQUEE_* environment override")?;
            config
        }
        None => ClientConfig::load().context("failed to load config")?,
    };
    if let Some(server) = cli.server {
        config.server_url = server;
    }

    let token = cli
        .token
        .map(AuthToken::new)
        .or_else(|| config.token.clone())
        .context("no session token; pass --token or set MARQUEE_TOKEN")?;

    match cli.command {
        Command::List => list(&config, token).await,
        Command::Watch => watch(&config, token).await,
        Command::Create {
            name,
            location,
            media_type,
        } => create(&config, token, name, location, media_type).await,
        Command::Delete { id } => delete(&config, token, id).await,
    }
}

/// One-shot commands never attach the push channel.
async fn mount_oneshot(
    config: &ClientConfig,
    token: AuthToken,
) -> anyhow::Result<LibrarySession> {
    let mut settings = config
        .channel_settings()
        .context("invalid channel settings")?;
    settings.insecure_channel_allowed = false;

    let api = HttpLibraryApi::new(
        &config.normalized_server_url(),
        config.request_timeout(),
    )
    .context("failed to build HTTP client")?;
    Ok(LibrarySession::mount(Arc::new(api), &settings, token).await)
}

fn ensure_loaded(state: &RegistryState) -> anyhow::Result<()> {
    if let Some(err) = state.error() {
        bail!("failed to load libraries: {err}");
    }
    Ok(())
}

fn print_library(library: &Library) {
    println!(
        "{:>6}  {:<10}  {:<24}  {}",
        library.id,
        library.media_type.label(),
        library.name,
        library.location
    );
}

fn print_state(state: &RegistryState) {
    match state.status() {
        FetchStatus::Idle | FetchStatus::Fetching => {
            println!("loading libraries...");
        }
        FetchStatus::Errored => {
            if let Some(err) = state.error() {
                println!("error: {err}");
            }
        }
        FetchStatus::Ready if state.is_empty() => println!("no libraries"),
        FetchStatus::Ready => {}
    }
    for library in state.items() {
        print_library(library);
    }
}

async fn list(config: &ClientConfig, token: AuthToken) -> anyhow::Result<()> {
    let session = mount_oneshot(config, token).await?;
    let state = session.snapshot();
    session.unmount().await;

    ensure_loaded(&state)?;
    print_state(&state);
    Ok(())
}

async fn watch(config: &ClientConfig, token: AuthToken) -> anyhow::Result<()> {
    let session = LibrarySession::mount_with_config(config, token)
        .await
        .context("failed to mount library session")?;
    if !session.has_channel() {
        info!("event channel disabled; showing fetched state only");
    }

    let mut rx = session.subscribe();
    print_state(&rx.borrow_and_update());

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
                println!();
                print_state(&rx.borrow_and_update());
            }
        }
    }

    session.unmount().await;
    Ok(())
}

async fn create(
    config: &ClientConfig,
    token: AuthToken,
    name: String,
    location: String,
    media_type: MediaType,
) -> anyhow::Result<()> {
    let session = mount_oneshot(config, token).await?;

    let mut form = CreateLibraryForm::new();
    form.set_name(name);
    form.set_location(location);
    form.set_media_type(media_type);

    let result = session.create(&mut form).await;
    session.unmount().await;

    let library = result.context("failed to create library")?;
    println!("created library {}", library.id);
    print_library(&library);
    Ok(())
}

async fn delete(
    config: &ClientConfig,
    token: AuthToken,
    id: LibraryId,
) -> anyhow::Result<()> {
    let session = mount_oneshot(config, token).await?;
    let result = session.delete(id).await;
    session.unmount().await;

    match result.context("failed to delete library")? {
        DeleteOutcome::Deleted(id) => println!("deleted library {id}"),
        DeleteOutcome::AlreadyInFlight(id) => {
            println!("delete for library {id} already in progress")
        }
    }
    Ok(())
}

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use xenoar::api;
use xenoar::app::{App, Notice};
use xenoar::capture::{FileCamera, MAX_IMAGES};
use xenoar::config::{self, Config};
use xenoar::library::{AssetLibrary, LIBRARY_KEY};
use xenoar::reconstruct::{GeminiBackend, ReconstructionClient};
use xenoar::router::processing_status;
use xenoar::scene::{self, ExportFormat, Scene};
use xenoar::store::Database;

#[derive(Parser)]
#[command(name = "xenoar")]
#[command(about = "Scan physical objects into 3D models with AI vision")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconstruct an object from 2 to 8 photos
    Scan {
        /// Photos of the object from different angles
        #[arg(required = true)]
        images: Vec<PathBuf>,

        /// Save the result to the library
        #[arg(short, long)]
        save: bool,

        /// Write the result as a 3D file into this directory
        #[arg(short, long)]
        export: Option<PathBuf>,

        /// Export format (gltf or glb)
        #[arg(short, long, default_value = "gltf")]
        format: ExportFormat,
    },
    /// Manage saved objects
    Library {
        #[command(subcommand)]
        command: LibraryCommand,
    },
    /// Serve the library and reconstruction over HTTP
    Serve {
        /// Port for HTTP API
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Show or write the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand)]
enum LibraryCommand {
    /// List saved objects, newest first
    List,
    /// Print a saved object's description as JSON
    Show { id: Uuid },
    /// Delete a saved object
    Delete { id: Uuid },
    /// Export a saved object as a 3D file
    Export {
        id: Uuid,
        /// Directory to write into
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        #[arg(short, long, default_value = "gltf")]
        format: ExportFormat,
    },
    /// Move an unreadable library aside and start an empty one
    Recover,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration (API key redacted)
    Show,
    /// Write the effective configuration to the config file
    Init,
}

/// Logs go to stderr so stdout only carries command output.
fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "xenoar=info,tower_http=info".into()),
    );

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_database(config: &Config) -> anyhow::Result<Database> {
    let db = Database::open_default(config.data_dir.clone())?;
    db.migrate()?;
    Ok(db)
}

fn reconstruction_client(config: &Config) -> ReconstructionClient<GeminiBackend> {
    let backend = GeminiBackend::new(&config.endpoint, &config.model, config.api_key.clone());
    ReconstructionClient::new(backend).with_max_vertices(config.max_mesh_vertices)
}

fn write_export(file: &scene::ExportedFile, dir: &std::path::Path) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = dir.join(&file.file_name);
    std::fs::write(&path, &file.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load();

    match cli.command {
        Commands::Scan {
            images,
            save,
            export,
            format,
        } => {
            scan(&config, images, save, export, format).await?;
        }
        Commands::Library { command } => {
            library(&config, command)?;
        }
        Commands::Serve { port } => {
            let library = load_library(open_database(&config)?)?;
            let app = api::create_router(api::ApiState::new(library, reconstruction_client(&config)));

            let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
            tracing::info!("XenoAR API listening on http://127.0.0.1:{}/api/v1", port);

            axum::serve(listener, app).await?;
        }
        Commands::Config { command } => match command {
            ConfigCommand::Show => {
                let mut shown = config.clone();
                if shown.api_key.is_some() {
                    shown.api_key = Some("***".to_string());
                }
                println!("{}", serde_json::to_string_pretty(&shown)?);
            }
            ConfigCommand::Init => {
                config.save()?;
                println!("Wrote {}", config::get_config_path()?.display());
            }
        },
    }

    Ok(())
}

async fn scan(
    config: &Config,
    images: Vec<PathBuf>,
    save: bool,
    export: Option<PathBuf>,
    format: ExportFormat,
) -> anyhow::Result<()> {
    if images.len() > MAX_IMAGES {
        tracing::warn!(
            "{} photos given, only the first {} are used",
            images.len(),
            MAX_IMAGES
        );
    }

    let library = load_library(open_database(config)?)?;
    let mut app = App::new(library).with_jpeg_quality(config.jpeg_quality);
    app.finish_welcome()?;

    let frames = images.len().min(MAX_IMAGES);
    let mut camera = FileCamera::new(images);
    if let Err(e) = app.start_scan(&mut camera) {
        if let Some(notice) = app.take_notice() {
            eprintln!("{}", notice);
        }
        return Err(e.into());
    }
    for _ in 0..frames {
        app.capture_frame()?;
    }
    println!("Captured: {}/{}", frames, MAX_IMAGES);

    let client = reconstruction_client(config);
    let started = Instant::now();
    let ticker = tokio::spawn(async move {
        let mut last = "";
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(500));
        loop {
            interval.tick().await;
            let status = processing_status(started.elapsed());
            if status != last {
                eprintln!("{}", status);
                last = status;
            }
        }
    });
    let result = app.complete_scan(&client).await.map(|active| {
        (
            active.description.name.clone(),
            active.description.shape_type,
            active.description.geometry_label(),
            active.description.spatial_description.clone(),
        )
    });
    ticker.abort();

    let (name, shape, label, spatial) = match result {
        Ok(summary) => summary,
        Err(e) => {
            if let Some(notice) = app.take_notice() {
                eprintln!("{}", notice);
            }
            return Err(e.into());
        }
    };
    println!("{} ({}, {})", name, shape.as_str(), label);
    if !spatial.is_empty() {
        println!("{}", spatial);
    }

    if let Some(dir) = export {
        match app.export_active(format) {
            Ok(file) => println!("Exported {}", write_export(&file, &dir)?.display()),
            Err(_) => {
                if let Some(notice) = app.take_notice() {
                    eprintln!("{}", notice);
                }
            }
        }
    }

    if save {
        let stored = app.save_active()?;
        println!("Saved {} ({} assets in library)", stored.id, app.library().len());
    }

    Ok(())
}

fn load_library(db: Database) -> anyhow::Result<AssetLibrary> {
    AssetLibrary::load(db).context("Run `xenoar library recover` to start a fresh library")
}

fn library(config: &Config, command: LibraryCommand) -> anyhow::Result<()> {
    let db = open_database(config)?;

    match command {
        LibraryCommand::List => {
            let library = load_library(db)?;
            if library.is_empty() {
                println!("Library is empty.");
            }
            for object in library.objects() {
                println!(
                    "{}  {}  {}  {}",
                    object.id,
                    object.timestamp.format("%Y-%m-%d"),
                    object.params.shape_type.as_str(),
                    object.name
                );
            }
        }
        LibraryCommand::Show { id } => {
            let library = load_library(db)?;
            let object = library
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("No saved object {}", id))?;
            println!("{}", serde_json::to_string_pretty(&object.params)?);
        }
        LibraryCommand::Delete { id } => {
            let mut library = load_library(db)?;
            if library.remove(id)? {
                println!("Deleted {}", id);
            } else {
                println!("No saved object {}", id);
            }
        }
        LibraryCommand::Export { id, out, format } => {
            let library = load_library(db)?;
            let object = library
                .get(id)
                .ok_or_else(|| anyhow::anyhow!("No saved object {}", id))?;
            let file = scene::export(&Scene::materialize(&object.params), format)?;
            println!("Exported {}", write_export(&file, &out)?.display());
        }
        LibraryCommand::Recover => {
            let (library, backup) = AssetLibrary::recover(db.clone())?;
            match backup {
                Some(backup_key) => println!("{}", Notice::LibraryRecovered { backup_key }),
                None => println!("Library is readable ({} assets)", library.len()),
            }
            for key in db.keys_with_prefix(&format!("{}.corrupt-", LIBRARY_KEY))? {
                println!("  backup: {}", key);
            }
        }
    }

    Ok(())
}

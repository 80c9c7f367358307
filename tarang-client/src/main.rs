//! tarang - command-line front-end
//!
//! Lists, plays (headless) and deletes the signed-in user's audio assets, and
//! runs the upload-and-analyze pipeline on a local file.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tarang_client::models::{AnalysisRun, SelectedFile};
use tarang_client::session::TrackSelection;
use tarang_client::StudioSession;
use tarang_common::config::{
    update_toml_config, user_config_path, ClientConfig, ConfigOverrides, ENV_CONFIG,
};
use tarang_common::events::AssetSource;
use tarang_common::time::format_time;
use tarang_common::AssetId;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for tarang
#[derive(Parser, Debug)]
#[command(name = "tarang")]
#[command(about = "Audio library and analysis client")]
#[command(version)]
struct Args {
    /// Base URL of the audio service
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// User id to act as
    #[arg(short, long, global = true)]
    user: Option<String>,

    /// TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List uploaded (default) or generated assets
    List {
        #[arg(long)]
        generated: bool,
    },
    /// Fetch an asset and bind it to a headless player
    Play {
        id: String,
        #[arg(long)]
        generated: bool,
    },
    /// Delete a generated asset
    Delete { id: String },
    /// Upload an .mp3 and run the full analysis
    Analyze { file: PathBuf },
    /// Save connection and profile settings to the config file
    Configure {
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        volume: Option<f64>,
    },
}

fn source(generated: bool) -> AssetSource {
    if generated {
        AssetSource::Generated
    } else {
        AssetSource::Uploaded
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Command::Configure { .. } = args.command {
        return configure(&args);
    }

    let config = ClientConfig::resolve(ConfigOverrides {
        api_url: args.api_url.clone(),
        user_id: args.user.clone(),
        config_path: args.config.clone(),
    })
    .context("Failed to resolve configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!(api_url = %config.api_url, "Starting tarang {}", env!("CARGO_PKG_VERSION"));

    let session = StudioSession::from_config(&config).context("Failed to create session")?;
    let result = run(&session, args.command).await;
    session.close().await;
    result
}

async fn run(session: &StudioSession, command: Command) -> Result<()> {
    match command {
        Command::List { generated } => {
            let assets = session.refresh(source(generated)).await?;
            if assets.is_empty() {
                println!("No files");
            }
            for asset in assets {
                println!("{}  {}  {}", asset.id, asset.display_date(), asset.filename);
            }
        }

        Command::Play { id, generated } => {
            let source = source(generated);
            session.refresh(source).await?;
            let selection = session.select_track(AssetId::from(id), source).await?;
            if selection != TrackSelection::Loaded {
                bail!("Track was not loaded ({:?})", selection);
            }
            let snapshot = session.playback_snapshot().await;
            let label = session.now_playing_label().await.unwrap_or_default();
            println!(
                "Now playing: {} [{}] {} / {} volume {:.0}%",
                label,
                snapshot.state,
                format_time(snapshot.current_time),
                format_time(snapshot.duration.unwrap_or(0.0)),
                snapshot.volume * 100.0
            );
            if let Some(url) = snapshot.object_url {
                println!(
                    "Bound to {} ({} bytes)",
                    url,
                    snapshot.payload_bytes.unwrap_or(0)
                );
            }
        }

        Command::Delete { id } => {
            let id = AssetId::from(id);
            session.refresh(AssetSource::Generated).await?;
            session.delete(AssetSource::Generated, &id).await?;
            println!("Deleted {}", id);
        }

        Command::Analyze { file } => {
            let file = SelectedFile::from_path(&file).await?;
            match session.pipeline().run_all(file).await {
                Ok(run) => {
                    print_run(&run);
                    if !run.stage.is_terminal() {
                        bail!("Analysis run was interrupted at {:?}", run.stage);
                    }
                }
                Err(e) => {
                    print_run(&session.pipeline().run().await);
                    return Err(e.into());
                }
            }
        }

        Command::Configure { .. } => bail!("configure runs without a session"),
    }
    Ok(())
}

/// Merge the given flags into the config file, leaving other settings alone
fn configure(args: &Args) -> Result<()> {
    let Command::Configure {
        email,
        full_name,
        volume,
    } = &args.command
    else {
        bail!("not a configure command");
    };

    let path = args
        .config
        .clone()
        .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from))
        .or_else(user_config_path)
        .context("No config directory available; pass --config")?;

    update_toml_config(&path, |toml| {
        toml.api_url = args.api_url.clone().or(toml.api_url.take());
        toml.user_id = args.user.clone().or(toml.user_id.take());
        toml.email = email.clone().or(toml.email.take());
        toml.full_name = full_name.clone().or(toml.full_name.take());
        toml.default_volume = volume.or(toml.default_volume);
    })
    .with_context(|| format!("Failed to write {}", path.display()))?;

    println!("Saved settings to {}", path.display());
    Ok(())
}

fn print_run(run: &AnalysisRun) {
    if let Some(name) = &run.file_name {
        println!("File:       {}", name);
    }
    println!("Stage:      {:?}", run.stage);
    if let Some(genre) = &run.genre {
        println!("Genre:      {}", genre);
    }
    if let Some(key) = &run.key {
        println!("Key:        {}", key);
    }
    if let Some(tempo) = run.tempo {
        println!("Tempo:      {:.1} BPM", tempo);
    }
    if let Some(vis) = &run.visualization {
        println!("Waveform:   {}", vis.waveform);
        println!("Harmonic:   {}", vis.harmonic);
    }
    if let Some(prediction) = &run.instrument {
        println!("Instrument: {}", prediction.predicted);
        for bar in run.instrument_bars() {
            let filled = (bar.width_percent / 5.0).round() as usize;
            println!(
                "  {:<12} {:<20} {:.2}",
                bar.label,
                "#".repeat(filled),
                bar.probability
            );
        }
    }
    if let Some(failure) = &run.failure {
        println!("Failed at {}: {}", failure.step, failure.message);
    }
}

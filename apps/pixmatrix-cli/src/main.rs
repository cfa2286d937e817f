mod ui;

use std::{env, path::PathBuf, sync::mpsc as std_mpsc, time::Duration};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use futures::StreamExt;
use pixmatrix_encoder::{to_hex_string, PixelEncoder};
use pixmatrix_ops::{init_tracing, TelemetryStore};
use pixmatrix_session::{Session, SessionCommand, SessionHandle};
use pixmatrix_surface::{import_image, MemorySurface};
use pixmatrix_transport::{LocalTransport, Transport, UdpTransport};
use pixmatrix_types::{
    config::{PixmatrixConfig, TransportMode},
    events::SessionEvent,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info};

use crate::ui::UiMessage;

/// Drive a serpentine LED matrix from images on disk.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// TOML config file; falls back to $PIXMATRIX_CONFIG, then built-in defaults
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode one image into a wire frame and print it
    Encode {
        image: PathBuf,
        /// Print the row-major hex preview of the frame instead of wire bytes
        #[arg(long)]
        hex: bool,
    },
    /// Encode one image and send it through the configured transport
    Send { image: PathBuf },
    /// Loop over a sequence of images as an animation
    Animate {
        #[arg(required = true)]
        images: Vec<PathBuf>,
        #[arg(long)]
        fps: Option<u32>,
        /// Push every animation frame to the transport
        #[arg(long)]
        broadcast: bool,
        #[arg(long, default_value = "10")]
        duration_secs: u64,
        /// Show a terminal preview while animating
        #[arg(long)]
        tui: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.clone());

    let tui = matches!(args.command, Command::Animate { tui: true, .. });
    if !tui {
        init_tracing(&config.ops)?;
    }

    match args.command {
        Command::Encode { image, hex } => encode(&config, image, hex),
        Command::Send { image } => send(&config, image).await,
        Command::Animate {
            images,
            fps,
            broadcast,
            duration_secs,
            tui,
        } => {
            animate(
                &config,
                images,
                fps,
                broadcast,
                Duration::from_secs(duration_secs),
                tui,
            )
            .await
        }
    }
}

fn encode(config: &PixmatrixConfig, image: PathBuf, hex: bool) -> Result<()> {
    let frame = import_image(&image, config.matrix.grid())?;
    if hex {
        println!("{}", to_hex_string(&frame));
        return Ok(());
    }
    let encoder = PixelEncoder::new(config.matrix.grid());
    let wire = encoder.encode(&frame, &config.correction);
    println!("{}", serde_json::to_string(&wire)?);
    Ok(())
}

async fn send(config: &PixmatrixConfig, image: PathBuf) -> Result<()> {
    let frame = import_image(&image, config.matrix.grid())?;
    let surface = MemorySurface::new(config.matrix.grid());
    surface.load(frame)?;

    let telemetry = TelemetryStore::new();
    let transport = build_transport(config).await?;
    let (mut session, handle) = Session::new(config, surface, transport, telemetry.clone());
    session.boot().await?;
    let running = tokio::spawn(session.run());

    handle.send(SessionCommand::Send).await?;
    handle.shutdown().await?;
    running.await.context("session task panicked")??;

    let stats = telemetry.broadcast_stats().await;
    if stats.delivered == 0 {
        bail!("transport did not accept the frame");
    }
    info!("Sent {} bytes from {}", stats.bytes, image.display());
    Ok(())
}

async fn animate(
    config: &PixmatrixConfig,
    images: Vec<PathBuf>,
    fps: Option<u32>,
    broadcast: bool,
    duration: Duration,
    tui: bool,
) -> Result<()> {
    let size = config.matrix.grid();
    let surface = MemorySurface::new(size);
    let telemetry = TelemetryStore::new();
    let transport = build_transport(config).await?;
    let (mut session, handle) =
        Session::new(config, surface.clone(), transport, telemetry.clone());
    session.boot().await?;
    let running = tokio::spawn(session.run());

    // The first image replaces the initial blank frame; the rest are appended.
    for (index, path) in images.iter().enumerate() {
        surface.load(import_image(path, size)?)?;
        let command = if index == 0 {
            SessionCommand::CommitEdit
        } else {
            SessionCommand::AddFrame
        };
        handle.send(command).await?;
        // Wait for the capture before the next image overwrites the surface.
        handle.status().await?;
    }
    if let Some(fps) = fps {
        handle.send(SessionCommand::SetFrameRate(fps)).await?;
    }
    handle
        .send(SessionCommand::SetBroadcast(
            broadcast || config.animation.broadcast,
        ))
        .await?;
    handle.send(SessionCommand::StartAnimation).await?;

    let status = handle.status().await?;
    info!(
        "Animating {} frames at {} fps (broadcast: {})",
        status.frames, status.fps, status.broadcast
    );

    if tui {
        let summary = format!(
            "{}x{} {} frames @ {} fps",
            size.width, size.height, status.frames, status.fps
        );
        run_with_preview(&handle, surface, summary, duration).await?;
    } else {
        let log_task = tokio::spawn(log_events(handle.subscribe_events()));
        tokio::time::sleep(duration).await;
        log_task.abort();
    }

    handle.shutdown().await?;
    running.await.context("session task panicked")??;

    let stats = telemetry.broadcast_stats().await;
    info!(
        attempted = stats.attempted,
        delivered = stats.delivered,
        bytes = stats.bytes,
        "Animation finished"
    );
    Ok(())
}

async fn run_with_preview(
    handle: &SessionHandle,
    surface: MemorySurface,
    summary: String,
    duration: Duration,
) -> Result<()> {
    let (ui_tx, ui_rx) = std_mpsc::channel();
    let mut events = handle.subscribe_events();
    let forward_tx = ui_tx.clone();
    let forwarder = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if forward_tx.send(UiMessage::Event(event)).is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut ui_task = tokio::task::spawn_blocking(move || ui::run(ui_rx, surface, summary));
    let ui_result = tokio::select! {
        res = &mut ui_task => Some(res),
        _ = tokio::time::sleep(duration) => None,
    };
    forwarder.abort();

    let ui_result = match ui_result {
        Some(res) => res,
        None => {
            // The preview may already be gone.
            let _ = ui_tx.send(UiMessage::Shutdown);
            ui_task.await
        }
    };
    ui_result.context("preview task panicked")?
}

async fn log_events(mut events: tokio::sync::broadcast::Receiver<SessionEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => debug!(kind = ?event.kind, "{}", event.to_json().unwrap_or_default()),
            Err(RecvError::Lagged(skipped)) => debug!(skipped, "event log lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

async fn build_transport(config: &PixmatrixConfig) -> Result<Box<dyn Transport>> {
    match config.transport.mode {
        TransportMode::Udp => Ok(Box::new(UdpTransport::from_config(&config.transport).await?)),
        TransportMode::Local => {
            let local = LocalTransport::new(config.transport.channel_capacity);
            let mut frames = local.subscribe();
            tokio::spawn(async move {
                while let Some(wire) = frames.next().await {
                    debug!(leds = wire.led_count(), "local frame delivered");
                }
            });
            Ok(Box::new(local))
        }
    }
}

fn load_config(from_args: Option<PathBuf>) -> PixmatrixConfig {
    let from_env = env::var("PIXMATRIX_CONFIG").ok().map(PathBuf::from);
    let Some(path) = from_args.or(from_env) else {
        return PixmatrixConfig::default();
    };
    match PixmatrixConfig::from_file(&path) {
        Ok(cfg) => {
            if let Err(err) = cfg.validate() {
                eprintln!(
                    "Invalid config in '{}': {err}. Falling back to internal defaults.",
                    path.display()
                );
                PixmatrixConfig::default()
            } else {
                cfg
            }
        }
        Err(err) => {
            eprintln!(
                "Failed to load config from '{}': {err}. Falling back to internal defaults.",
                path.display()
            );
            PixmatrixConfig::default()
        }
    }
}

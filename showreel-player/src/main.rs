//! Showreel driver - Main entry point
//!
//! Mounts the portfolio section against simulated media elements and runs
//! one command per stdin line, so scroll/filter/transport behaviour can be
//! scripted and watched through the logs.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use showreel_common::config::ConfigResolver;
use showreel_common::{Locale, VideoEntry, VideoId};
use showreel_player::catalog::ConfiguredCatalog;
use showreel_player::commands::{Command, HELP};
use showreel_player::device::{DeviceProfile, DeviceSignals};
use showreel_player::media::{MediaElement, MediaError, MediaEvent, SimulatedMedia};
use showreel_player::section::{MediaFactory, PortfolioSection, TileLayout};
use showreel_player::SharedState;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Rounds of event delivery per command before giving up
const MAX_MEDIA_ROUNDS: usize = 16;

/// Media elements of mounted tiles; a tile's presenter owns the strong ref
type MediaHandles = Arc<Mutex<HashMap<VideoId, Weak<SimulatedMedia>>>>;

/// Command-line arguments for showreel
#[derive(Parser, Debug)]
#[command(name = "showreel")]
#[command(about = "Video portfolio playback coordinator")]
#[command(version)]
struct Args {
    /// Config file (overrides SHOWREEL_CONFIG and the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Catalog JSON export
    #[arg(long, env = "SHOWREEL_CATALOG")]
    catalog: Option<PathBuf>,

    /// Content store base URL (serves /categories and /videos)
    #[arg(long, env = "SHOWREEL_CATALOG_URL", conflicts_with = "catalog")]
    catalog_url: Option<String>,

    /// Viewport width in CSS pixels
    #[arg(long, default_value_t = 1280)]
    viewport_width: u32,

    /// Viewport height in CSS pixels
    #[arg(long, default_value_t = 800)]
    viewport_height: u32,

    /// Maximum touch points reported by the device
    #[arg(long)]
    touch_points: Option<u32>,

    /// Language for titles and category names
    #[arg(long, env = "SHOWREEL_LOCALE", default_value = "en")]
    locale: Locale,

    /// Log filter, e.g. "debug" or "showreel_player=trace"
    #[arg(long, env = "SHOWREEL_LOG")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ConfigResolver::new("showreel")
        .resolve(args.config.as_deref())
        .context("Failed to load configuration")?;

    // Initialize tracing (stderr, so stdout stays for command output)
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting showreel v{}", env!("CARGO_PKG_VERSION"));

    if let Some(path) = args.catalog {
        config.catalog.path = Some(path);
    }
    if let Some(url) = args.catalog_url {
        config.catalog.path = None;
        config.catalog.url = Some(url);
    }

    // Classify the device
    let signals = DeviceSignals::detect_host()
        .with_viewport(Some(args.viewport_width), args.touch_points);
    let profile = DeviceProfile::detect(&signals, &config.device, &config.playback);
    info!(
        "Device: {} (ceiling {}, preload margin {}px)",
        profile.class, profile.ceiling, profile.visibility.enter_margin
    );

    // Load the catalog
    let catalog = ConfiguredCatalog::from_config(&config.catalog)
        .context("Failed to configure catalog source")?
        .load()
        .await
        .context("Failed to load catalog")?;
    if catalog.is_empty() {
        warn!("Catalog has no videos");
    }

    let settle_delay = config.playback.settle_delay();
    let shared = SharedState::new(profile, config.playback.clone());
    spawn_event_logger(&shared);

    // Simulated media elements, kept so their events can be delivered
    let handles: MediaHandles = Arc::new(Mutex::new(HashMap::new()));
    let factory: MediaFactory = {
        let handles = handles.clone();
        Box::new(move |entry: &VideoEntry| {
            let media = Arc::new(SimulatedMedia::new(entry.id.clone()));
            let mut handles = handles.lock().unwrap_or_else(PoisonError::into_inner);
            handles.retain(|_, media| media.strong_count() > 0);
            handles.insert(entry.id.clone(), Arc::downgrade(&media));
            media as Arc<dyn MediaElement>
        })
    };

    let mut section = PortfolioSection::mount(
        catalog,
        shared.clone(),
        TileLayout::from_config(&config.layout),
        (args.viewport_width as f64, args.viewport_height as f64),
        factory,
    );
    section.set_locale(args.locale);
    settle(&mut section, &handles, settle_delay).await;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line.context("Failed to read command")?,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else {
            debug!("End of input");
            break;
        };
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }

        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                println!("{} (try 'help')", e);
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }

        execute(&mut section, &handles, command)?;
        settle(&mut section, &handles, settle_delay).await;
    }

    section.unmount();
    info!("Shutdown complete");
    Ok(())
}

fn execute(section: &mut PortfolioSection, handles: &MediaHandles, command: Command) -> Result<()> {
    debug!("Command: {:?}", command);
    match command {
        Command::Scroll(y) => section.scroll_to(y),
        Command::Resize { width, height } => section.resize(width, height),
        Command::Filter(category) => section.select_category(category.as_deref()),
        Command::Locale(locale) => section.set_locale(locale),
        Command::Next => print_playing(section.next()),
        Command::Previous => print_playing(section.previous()),
        Command::Select(index) => print_playing(section.select(index)),
        Command::Play(id) => section.play(&id),
        Command::Pause(id) => {
            if !section.pause(&id) {
                println!("{} is not playing", id);
            }
        }
        Command::Click(id) => {
            if !section.click(&id) {
                println!("{} has no tile in the current view", id);
            }
        }
        Command::Stop => section.stop(),
        Command::Fail { video_id, reason } => {
            if section.presenter(&video_id).is_none() {
                println!("{} is not mounted", video_id);
                return Ok(());
            }
            let media = handles
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .get(&video_id)
                .and_then(Weak::upgrade);
            match media {
                Some(media) => media.raise_error(MediaError::Network(reason)),
                None => println!("{} has no media element", video_id),
            }
        }
        Command::Status => {
            let status = serde_json::to_string_pretty(&section.status())
                .context("Failed to render status")?;
            println!("{}", status);
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => {}
    }
    Ok(())
}

fn print_playing(id: Option<VideoId>) {
    println!("playing: {}", id.as_deref().unwrap_or("nothing"));
}

/// Let admitted loads settle, then deliver media events until quiet
async fn settle(section: &mut PortfolioSection, handles: &MediaHandles, delay: Duration) {
    tokio::time::sleep(delay).await;
    section.reconcile();

    for _ in 0..MAX_MEDIA_ROUNDS {
        let batch: Vec<(VideoId, MediaEvent)> = live_media(handles)
            .into_iter()
            .flat_map(|(id, media)| {
                media
                    .take_events()
                    .into_iter()
                    .map(move |event| (id.clone(), event))
            })
            .collect();
        if batch.is_empty() {
            return;
        }
        for (id, event) in batch {
            section.dispatch_media_event(&id, event);
        }
        section.reconcile();
    }
    warn!("Media events still pending after {} rounds", MAX_MEDIA_ROUNDS);
}

/// Media elements whose tiles are still mounted; drops the rest
fn live_media(handles: &MediaHandles) -> Vec<(VideoId, Arc<SimulatedMedia>)> {
    let mut handles = handles.lock().unwrap_or_else(PoisonError::into_inner);
    handles.retain(|_, media| media.strong_count() > 0);
    handles
        .iter()
        .filter_map(|(id, media)| Some((id.clone(), media.upgrade()?)))
        .collect()
}

/// Log every core event at debug level
fn spawn_event_logger(shared: &Arc<SharedState>) {
    let mut events = shared.subscribe_events();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => debug!(target: "showreel::events", "{}", json),
                    Err(e) => warn!("Unserializable event {:?}: {}", event, e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event logger lagged, {} events skipped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_media_drops_unmounted_elements() {
        let handles: MediaHandles = Arc::new(Mutex::new(HashMap::new()));
        let kept = Arc::new(SimulatedMedia::new("a".to_string()));
        let dropped = Arc::new(SimulatedMedia::new("b".to_string()));
        {
            let mut map = handles.lock().unwrap();
            map.insert("a".to_string(), Arc::downgrade(&kept));
            map.insert("b".to_string(), Arc::downgrade(&dropped));
        }
        drop(dropped);

        let live = live_media(&handles);
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].0, "a");
        assert_eq!(handles.lock().unwrap().len(), 1);
    }
}

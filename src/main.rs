use helix_dyads::analysis::TimelineStats;
use helix_dyads::console_display;
use helix_dyads::driver::FrameDriver;
use helix_dyads::player::{FreeRunPlayer, MediaPlayer, WavPlayer};
use helix_dyads::renderer::{RenderConfig, SceneRenderer};
use helix_dyads::session::VizSession;
use helix_dyads::sync::PlaybackTimeSlot;
use helix_dyads::timeline::Timeline;
use helix_dyads::types::*;
#[cfg(feature = "gui")]
use helix_dyads::webview_app;
use helix_dyads::ws_server;

use clap::Parser;
use crossbeam_channel::{bounded, unbounded};
use log::{error, info, warn};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;

#[derive(Parser)]
#[command(name = "helix-dyads")]
#[command(about = "Helix visualization of chord intervals synced to audio playback")]
struct Cli {
    /// Timeline JSON: {"0": {"Time (s)": 0.0, "Playing": [60, 64]}, ...} or an array of records
    timeline: PathBuf,

    /// WAV file to play and sync against
    #[arg(long)]
    audio: Option<PathBuf>,

    /// No audio file: drive the visualization from a silent transport
    #[arg(long, conflicts_with = "audio")]
    free_run: bool,

    /// Print timeline statistics and exit
    #[arg(long)]
    stats: bool,

    /// Frame rate of the render loop (Hz)
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Semitones added to every timeline pitch before placement
    #[arg(long, default_value_t = -24, allow_hyphen_values = true)]
    transpose: i32,

    /// Number of backdrop pitch slots
    #[arg(long, default_value_t = 88)]
    pitches: i32,

    /// Start with the backdrop circles hidden
    #[arg(long)]
    no_circles: bool,

    /// Disable the native GUI window
    #[arg(long)]
    no_gui: bool,

    /// Enable the WebSocket server for browser visualization
    #[arg(long)]
    ws: bool,

    /// WebSocket server bind address
    #[arg(long, default_value = "127.0.0.1:8080")]
    ws_addr: String,

    /// WebSocket broadcast rate (Hz)
    #[arg(long, default_value_t = 60)]
    ws_fps: u32,

    /// Enable console display (terminal panel; type `j` + Enter to toggle circles)
    #[arg(long)]
    console: bool,

    /// Console display refresh rate (Hz)
    #[arg(long, default_value_t = 10)]
    display_hz: u32,

    /// Suppress auto-opening the browser when --ws is active
    #[arg(long)]
    no_open: bool,
}

fn main() {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or("info"),
    )
    .format_timestamp_millis()
    .init();

    let cli = Cli::parse();

    // Fatal before any frame: a bad timeline never reaches the renderer
    let timeline = match Timeline::load(&cli.timeline) {
        Ok(t) => Arc::new(t),
        Err(e) => {
            error!("{}: {}", cli.timeline.display(), e);
            std::process::exit(1);
        }
    };
    let stats = TimelineStats::compute(&timeline);

    if cli.stats {
        println!("{}", stats);
        return;
    }

    let gui_enabled = cfg!(feature = "gui") && !cli.no_gui;

    info!("═══════════════════════════════════════════════");
    info!("  HELIX DYADS v{}", env!("CARGO_PKG_VERSION"));
    info!("  Timeline: {} ({} events, {:.1}s)", cli.timeline.display(), stats.events, stats.duration);
    info!("  Largest chord: {} notes, {} dyads", stats.max_notes, stats.max_dyads);
    match (&cli.audio, cli.free_run) {
        (Some(p), _) => info!("  Audio: {}", p.display()),
        (None, true) => info!("  Audio: none (free-running transport)"),
        (None, false) => info!("  Audio: none (unsynced)"),
    }
    if gui_enabled { info!("  UI: WebView (wry) → http://{}", cli.ws_addr.replace("0.0.0.0", "localhost")); }
    if cli.ws { info!("  UI: WebSocket on {}", cli.ws_addr); }
    if cli.console { info!("  UI: Console"); }
    info!("═══════════════════════════════════════════════");

    let clock = SessionClock::new();
    let slot = PlaybackTimeSlot::new();

    // ─── Playback (fire-and-forget) ─────────────────────────────────
    let mut player: Option<Box<dyn MediaPlayer>> = match (&cli.audio, cli.free_run) {
        (Some(_), _) => Some(Box::new(WavPlayer::new())),
        (None, true) => Some(Box::new(FreeRunPlayer::new())),
        (None, false) => {
            warn!("No --audio or --free-run: chord lines stay hidden until an audio clock arrives");
            None
        }
    };
    if let Some(p) = player.as_mut() {
        let writer = slot.clone();
        p.on_time_update(Box::new(move |t| writer.publish(t)));
        p.start(cli.audio.as_deref().unwrap_or(std::path::Path::new("")));
    }

    // Channel: UI inputs → frame driver
    let (input_tx, input_rx) = unbounded::<InputEvent>();

    // Channels: frame driver → consumers
    let mut frame_txs: Vec<crossbeam_channel::Sender<SceneFrame>> = Vec::new();
    let mut handles = Vec::new();

    // ─── Console display ────────────────────────────────────────────
    if cli.console {
        let (tx, rx) = bounded::<SceneFrame>(8);
        frame_txs.push(tx);
        let hz = cli.display_hz;
        let fps = cli.fps;
        handles.push(thread::Builder::new().name("display".into()).spawn(move || {
            console_display::ConsoleDisplay::new(rx, hz, fps).run();
        }).unwrap());

        let keys_tx = input_tx.clone();
        thread::Builder::new().name("stdin-keys".into()).spawn(move || {
            for line in std::io::stdin().lock().lines().map_while(Result::ok) {
                if line.trim().eq_ignore_ascii_case("j") && keys_tx.send(InputEvent::Toggle).is_err() {
                    break;
                }
            }
        }).unwrap();
    }

    // ─── WebSocket server ───────────────────────────────────────────
    // Always started when the webview GUI is active (it loads the viz from it).
    if gui_enabled || cli.ws {
        let (tx, rx) = bounded::<SceneFrame>(8);
        frame_txs.push(tx);
        let ws_addr = cli.ws_addr.clone();
        let ws_fps = cli.ws_fps;
        let ws_input = input_tx.clone();
        let viz_path = std::env::current_dir()
            .unwrap_or_default()
            .join("visualization.html");
        handles.push(thread::Builder::new().name("ws-server".into()).spawn(move || {
            ws_server::WsServer::new(rx, ws_input, ws_addr, ws_fps, viz_path).run();
        }).unwrap());

        if cli.ws && !gui_enabled && !cli.no_open {
            let url = format!("http://{}", cli.ws_addr.replace("0.0.0.0", "localhost"));
            handles.push(thread::Builder::new().name("browser-open".into()).spawn(move || {
                thread::sleep(std::time::Duration::from_millis(800));
                #[cfg(target_os = "macos")]
                let _ = std::process::Command::new("open").arg(&url).spawn();
                #[cfg(target_os = "linux")]
                let _ = std::process::Command::new("xdg-open").arg(&url).spawn();
                info!("Browser opened at {}", url);
            }).unwrap());
        }
    }

    if frame_txs.is_empty() {
        error!("Nothing to display: enable the GUI, --ws, or --console");
        std::process::exit(2);
    }

    // ─── Frame driver ───────────────────────────────────────────────
    let config = RenderConfig {
        transpose: cli.transpose,
        num_pitches: cli.pitches,
        ..RenderConfig::default()
    };
    let session = VizSession::new(timeline).with_circles(!cli.no_circles);
    let fps = cli.fps;
    handles.push(thread::Builder::new().name("frame-driver".into()).spawn(move || {
        FrameDriver::new(session, SceneRenderer::new(config), slot, clock, input_rx, frame_txs)
            .with_fps(fps)
            .run();
    }).unwrap());

    // ─── Launch WebView on main thread (blocks until window closes) ──
    #[cfg(feature = "gui")]
    if gui_enabled {
        // Give the server a moment to bind before the WebView tries to load.
        thread::sleep(std::time::Duration::from_millis(600));
        let url = format!("http://{}", cli.ws_addr.replace("0.0.0.0", "localhost"));
        info!("Launching WebView at {}", url);
        webview_app::run(&url, input_tx);
    }

    info!("Running headless. Press Ctrl+C to stop.");
    // Keep one input sender alive so the driver only stops when its consumers go
    let _input_tx = input_tx;
    for h in handles {
        let _ = h.join();
    }
}

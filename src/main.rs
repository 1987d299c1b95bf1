mod audio;
mod audio_api;
mod config;
mod loader;
mod logging;
mod middle;
mod mixer;
mod playback;
mod relay;
mod room;
mod shared;
mod tui;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crossterm::terminal;
use log::{error, info};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use audio::AudioHandle;
use config::RoomConfig;
use loader::SampleLoader;
use middle::{Middle, Output};
use relay::Connection;
use shared::InputEvent;

fn main() {
    if let Err(e) = run() {
        error!("{e:#}");
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let project_dir: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_default());

    if let Err(e) = logging::init_logging(&project_dir) {
        eprintln!("logging disabled: {e:#}");
    }
    // tungstenite's rustls connector needs a process-wide crypto provider
    let _ = rustls::crypto::ring::default_provider().install_default();

    let config = RoomConfig::load(&project_dir);
    let samples = config.registry(&project_dir);
    info!("{} samples, relay {}", samples.len(), config.relay_url);

    let audio = audio::start_audio()?;
    let loader = SampleLoader::spawn(audio.sample_rate())?;
    let mut middle = Middle::new(&config, samples, audio.sample_rate(), Instant::now());
    let mut connection: Option<Connection> = None;

    terminal::enable_raw_mode()?;
    // Enable keyboard enhancement for real press/release detection.
    // Falls back gracefully if the terminal doesn't support it.
    let _ = crossterm::execute!(
        std::io::stdout(),
        crossterm::event::PushKeyboardEnhancementFlags(
            crossterm::event::KeyboardEnhancementFlags::REPORT_EVENT_TYPES
        )
    );
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = Duration::from_millis(16); // ~60fps
    let mut tui_state = tui::mode::TuiState::default();
    let mut last_skipped: Vec<&'static str> = Vec::new();

    loop {
        let ds = middle.display_state();
        tui_state.screen = ds.screen;
        tui_state.num_samples = ds.solo.len();

        let mut skipped = Vec::new();
        term.draw(|frame| {
            skipped = tui::view::render(frame, frame.area(), &ds, tui_state.cursor);
        })?;
        // log once per change, not once per frame
        if skipped != last_skipped {
            for target in &skipped {
                error!("CRITICAL: no room to draw {target}, skipping it");
            }
            last_skipped = skipped;
        }

        let events = tui::input::poll_input(tick_rate, &mut tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                info!("quit");
                drop(connection);
                drop(term);
                return Ok(());
            }
            let outputs = middle.handle_input(event, Instant::now());
            dispatch(outputs, &audio, &loader, &mut connection, &config);
        }

        while let Some(result) = loader.poll() {
            let outputs = middle.on_loaded(result, Instant::now());
            dispatch(outputs, &audio, &loader, &mut connection, &config);
        }

        let relay_events: Vec<_> = connection
            .as_ref()
            .map(|c| std::iter::from_fn(|| c.poll_event()).collect())
            .unwrap_or_default();
        for event in relay_events {
            let outputs = middle.on_relay_event(event, Instant::now());
            dispatch(outputs, &audio, &loader, &mut connection, &config);
        }

        let outputs = middle.tick(Instant::now());
        dispatch(outputs, &audio, &loader, &mut connection, &config);
    }
}

fn dispatch(
    outputs: Vec<Output>,
    audio: &AudioHandle,
    loader: &SampleLoader,
    connection: &mut Option<Connection>,
    config: &RoomConfig,
) {
    for output in outputs {
        match output {
            Output::Audio(cmd) => audio.send(cmd),
            Output::Load { index, path } => loader.request(index, &path),
            // replacing the old handle hangs it up
            Output::Connect => {
                *connection = Some(relay::connect(&config.relay_url, config.connect_timeout()));
            }
            Output::Relay(msg) => {
                if let Some(conn) = connection.as_ref() {
                    conn.send(msg);
                }
            }
        }
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(
            std::io::stdout(),
            crossterm::event::PopKeyboardEnhancementFlags
        );
        let _ = terminal::disable_raw_mode();
    }
}

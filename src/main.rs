use std::{
    error::Error,
    sync::{Arc, Mutex},
};

use clap::{Parser, Subcommand};
use eframe::run_native;
use mathwake::{
    playback::{self, ChannelPlayback},
    ring::RingController,
    scheduler::{self, ClockState},
    store::AlarmStore,
    WakeApp,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[clap(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write a fresh, empty alarm file.
    Init {
        #[clap(long, short)]
        force: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    // initialize the logger
    simple_file_logger::init_logger!("mathwake")
        .map_err(|e| format!("couldn't initialize logger: {e}"))?;

    let store_path =
        AlarmStore::default_path().ok_or("couldn't find a config directory for the alarm file")?;

    let args = Args::parse();
    if let Some(Command::Init { force }) = args.command {
        if force || !store_path.exists() {
            AlarmStore::new(store_path).save()?;
        }
        return Ok(());
    }

    let now = chrono::Local::now().naive_local();
    let store = AlarmStore::load(store_path, now);

    // audio runs on its own thread; ring control only ever talks to it over
    // the channel
    let player = playback::spawn_audio_thread();
    let state = Arc::new(Mutex::new(ClockState::new(
        store,
        RingController::new(Box::new(ChannelPlayback::new(player))),
    )));
    let _scheduler = scheduler::spawn(Arc::clone(&state));

    // run the gui
    run_native(
        "Mathwake",
        eframe::NativeOptions::default(),
        Box::new(|_| Ok(Box::new(WakeApp::new(state)))),
    )
    .map_err(Into::into)
}

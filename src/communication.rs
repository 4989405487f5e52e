use std::{fs::File, io::BufReader};

use rodio::Decoder;

/// A decoded alarm sound, opened and decoded on the caller's side so codec
/// and I/O failures surface before anything is queued.
pub type AlarmSource = Decoder<BufReader<File>>;

/// Commands for the audio thread. There is at most one ringing alarm, so a
/// bare stop is unambiguous.
pub enum PlayerCommand {
    /// Start looping this source, replacing whatever is playing.
    Play(Box<AlarmSource>),
    /// Stop playback. A no-op if nothing is playing.
    Stop,
}

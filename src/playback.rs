use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
};

use log::error;
use rodio::{Decoder, OutputStream, Sink, Source};

use crate::communication::PlayerCommand;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("couldn't open sound file {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("couldn't decode sound file {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },
    #[error("the audio thread is gone")]
    AudioThreadGone,
}

/// The start/stop capability a ring session needs. Boxed behind this trait so
/// tests can swap in a recording fake for the real audio thread.
pub trait SoundPlayback: Send {
    /// Starts looping `path` until [`SoundPlayback::stop`]. Errors mean the
    /// sound couldn't start; the alarm still counts as ringing.
    fn play(&mut self, path: &Path) -> Result<(), PlaybackError>;

    /// Stops playback. Idempotent.
    fn stop(&mut self);
}

/// Sends play/stop over the channel to the rodio thread. Decoding happens
/// here so the caller learns about unreadable files synchronously.
pub struct ChannelPlayback {
    sender: mpsc::Sender<PlayerCommand>,
}

impl ChannelPlayback {
    #[must_use]
    pub const fn new(sender: mpsc::Sender<PlayerCommand>) -> Self {
        Self { sender }
    }
}

impl SoundPlayback for ChannelPlayback {
    fn play(&mut self, path: &Path) -> Result<(), PlaybackError> {
        let file = File::open(path).map_err(|source| PlaybackError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let source =
            Decoder::new(BufReader::new(file)).map_err(|source| PlaybackError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        self.sender
            .send(PlayerCommand::Play(Box::new(source)))
            .map_err(|_| PlaybackError::AudioThreadGone)
    }

    fn stop(&mut self) {
        // if the audio thread died there is nothing playing to stop
        let _ = self.sender.send(PlayerCommand::Stop);
    }
}

/// Spawns the audio thread and hands back its command channel.
///
/// The thread owns the output stream and at most one sink; a new play
/// replaces the old sink so a sound can never double-start. If no output
/// device can be opened the thread exits and later plays report
/// [`PlaybackError::AudioThreadGone`].
#[must_use]
pub fn spawn_audio_thread() -> mpsc::Sender<PlayerCommand> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let (_stream, handle) = match OutputStream::try_default() {
            Ok(output) => output,
            Err(e) => {
                error!("couldn't open an audio output device: {e}");
                return;
            }
        };
        let mut playing: Option<Sink> = None;
        while let Ok(command) = receiver.recv() {
            match command {
                PlayerCommand::Play(source) => {
                    if let Some(old) = playing.take() {
                        old.stop();
                    }
                    match Sink::try_new(&handle) {
                        Ok(sink) => {
                            // loop until told to stop
                            sink.append((*source).repeat_infinite());
                            sink.play();
                            playing = Some(sink);
                        }
                        Err(e) => error!("couldn't open an audio sink: {e}"),
                    }
                }
                PlayerCommand::Stop => {
                    if let Some(sink) = playing.take() {
                        sink.stop();
                    }
                }
            }
        }
    });
    sender
}

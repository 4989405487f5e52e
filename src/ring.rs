use chrono::NaiveDateTime;
use log::{error, info, warn};

use crate::{
    alarm::AlarmId,
    challenge::{ChallengeSession, Grade, Problem},
    playback::SoundPlayback,
    store::AlarmStore,
};

/// A ringing alarm: which record fired, whether its sound actually started,
/// and the challenge standing between the user and silence. Exists only
/// between trigger and dismissal, never persisted.
pub struct RingSession {
    pub alarm_id: AlarmId,
    pub playing: bool,
    /// Set when the sound failed to start; shown to the user while the alarm
    /// rings silently.
    pub playback_error: Option<String>,
    challenge: ChallengeSession,
}

impl RingSession {
    #[must_use]
    pub const fn problem(&self) -> &Problem {
        self.challenge.problem()
    }

    #[must_use]
    pub const fn correct_so_far(&self) -> u32 {
        self.challenge.correct_so_far()
    }

    #[must_use]
    pub const fn required(&self) -> u32 {
        self.challenge.required()
    }
}

/// What one submitted answer did to the ringing alarm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    /// Challenge complete: sound stopped, alarm rescheduled.
    Dismissed,
    /// Right answer, keep going.
    Correct,
    /// Wrong answer, fresh problem.
    Incorrect,
    /// Input wasn't a number; same problem, no progress change.
    NotANumber,
    /// No alarm is ringing.
    NotRinging,
}

/// Orchestrates one ring at a time: starts and stops the sound, runs the
/// challenge, and reschedules the alarm once the challenge is solved.
pub struct RingController {
    playback: Box<dyn SoundPlayback>,
    session: Option<RingSession>,
}

impl RingController {
    #[must_use]
    pub fn new(playback: Box<dyn SoundPlayback>) -> Self {
        Self {
            playback,
            session: None,
        }
    }

    #[must_use]
    pub fn is_ringing(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub fn active_id(&self) -> Option<AlarmId> {
        self.session.as_ref().map(|s| s.alarm_id)
    }

    #[must_use]
    pub fn session(&self) -> Option<&RingSession> {
        self.session.as_ref()
    }

    /// Starts ringing `id`. Refuses (returns false) if a session is already
    /// active or the record is gone. A sound that won't play is logged and
    /// reported on the session; the challenge still runs so the alarm stays
    /// dismissable.
    pub fn begin(&mut self, store: &AlarmStore, id: AlarmId) -> bool {
        if self.session.is_some() {
            return false;
        }
        let Some(alarm) = store.get(id) else {
            warn!("asked to ring alarm {id}, which no longer exists");
            return false;
        };
        info!("alarm {id} ({}) is ringing", alarm.label());
        let (playing, playback_error) = match self.playback.play(&alarm.sound) {
            Ok(()) => (true, None),
            Err(e) => {
                error!("alarm {id} rings silently: {e}");
                (false, Some(e.to_string()))
            }
        };
        self.session = Some(RingSession {
            alarm_id: id,
            playing,
            playback_error,
            challenge: ChallengeSession::new(alarm.required_answers),
        });
        true
    }

    /// Grades one answer against the active session. On the final correct
    /// answer the sound stops, the alarm's next occurrence is recomputed from
    /// `now`, and the store is persisted.
    pub fn submit_answer(
        &mut self,
        store: &mut AlarmStore,
        input: &str,
        now: NaiveDateTime,
    ) -> AnswerOutcome {
        let Some(session) = self.session.as_mut() else {
            return AnswerOutcome::NotRinging;
        };
        let Ok(answer) = input.trim().parse::<i64>() else {
            return AnswerOutcome::NotANumber;
        };
        match session.challenge.submit(answer) {
            Grade::Complete => {
                let id = session.alarm_id;
                self.playback.stop();
                self.session = None;
                if let Some(alarm) = store.get_mut(id) {
                    alarm.reschedule(now);
                    info!(
                        "alarm {id} dismissed, next occurrence {}",
                        alarm.next_fire_at
                    );
                }
                if let Err(e) = store.save() {
                    // in-memory state stays authoritative until the next save
                    error!("couldn't persist dismissal: {e}");
                }
                AnswerOutcome::Dismissed
            }
            Grade::Correct => AnswerOutcome::Correct,
            Grade::Incorrect => AnswerOutcome::Incorrect,
        }
    }

    /// Kills the session without a dismissal, for when the ringing alarm is
    /// deleted or disabled out from under us. Stops the sound, drops the
    /// session, and (if the record survives) still moves its next occurrence
    /// into the future.
    pub fn force_stop(&mut self, store: &mut AlarmStore, now: NaiveDateTime) {
        let Some(session) = self.session.take() else {
            return;
        };
        self.playback.stop();
        info!("alarm {} force-stopped", session.alarm_id);
        if let Some(alarm) = store.get_mut(session.alarm_id) {
            alarm.reschedule(now);
        }
    }
}

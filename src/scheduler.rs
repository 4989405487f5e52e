use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread,
    time::Duration,
};

use chrono::{Local, NaiveDateTime};
use log::error;

use crate::{
    alarm::AlarmId,
    ring::{AnswerOutcome, RingController},
    store::{AlarmStore, StoreError},
};

/// How often the background loop re-checks the alarms.
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The store and the ring controller behind one lock, shared between the
/// scheduler thread and the UI thread. All mutation goes through here.
pub struct ClockState {
    pub store: AlarmStore,
    pub ring: RingController,
}

impl ClockState {
    #[must_use]
    pub fn new(store: AlarmStore, ring: RingController) -> Self {
        Self { store, ring }
    }

    /// One scheduler pass: if nothing is ringing, fire the first due alarm
    /// in store order. Other due alarms stay untouched (their `next_fire_at`
    /// isn't advanced) so they fire on a later tick instead of being skipped.
    pub fn tick(&mut self, now: NaiveDateTime) -> Option<AlarmId> {
        if self.ring.is_ringing() {
            return None;
        }
        let due = self.store.alarms().iter().find(|a| a.due(now))?.id;
        self.ring.begin(&self.store, due).then_some(due)
    }

    /// Deletes an alarm, force-stopping it first if it is the one ringing so
    /// no audio outlives its record.
    pub fn delete_alarm(&mut self, id: AlarmId, now: NaiveDateTime) {
        if self.ring.active_id() == Some(id) {
            self.ring.force_stop(&mut self.store, now);
        }
        if self.store.delete(id) {
            self.persist();
        }
    }

    /// Disables or enables an alarm; disabling the ringing alarm stops it.
    pub fn set_enabled(
        &mut self,
        id: AlarmId,
        enabled: bool,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        if !enabled && self.ring.active_id() == Some(id) {
            self.ring.force_stop(&mut self.store, now);
        }
        self.store.set_enabled(id, enabled, now)?;
        self.persist();
        Ok(())
    }

    pub fn submit_answer(&mut self, input: &str, now: NaiveDateTime) -> AnswerOutcome {
        self.ring.submit_answer(&mut self.store, input, now)
    }

    /// Saves, logging instead of failing; in-memory state stays authoritative
    /// until a save goes through.
    pub fn persist(&mut self) {
        if let Err(e) = self.store.save() {
            error!("couldn't save alarms: {e}");
        }
    }
}

/// Locks the shared state, recovering it if the other thread panicked
/// mid-hold.
pub fn lock(state: &Arc<Mutex<ClockState>>) -> MutexGuard<'_, ClockState> {
    match state.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Spawns the 1 Hz polling loop. It holds the lock only for the duration of
/// one [`ClockState::tick`], never across the sleep, so the UI thread can
/// always get in between polls.
pub fn spawn(state: Arc<Mutex<ClockState>>) -> thread::JoinHandle<()> {
    thread::spawn(move || loop {
        {
            let now = Local::now().naive_local();
            lock(&state).tick(now);
        }
        thread::sleep(POLL_INTERVAL);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alarm::AlarmDraft;
    use crate::playback::{PlaybackError, SoundPlayback};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use std::path::{Path, PathBuf};

    struct SilentPlayback;

    impl SoundPlayback for SilentPlayback {
        fn play(&mut self, _path: &Path) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn stop(&mut self) {}
    }

    fn at(hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn draft(hour: u32, minute: u32, required: u32) -> AlarmDraft {
        AlarmDraft {
            name: None,
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            sound: PathBuf::from("/sounds/ring.mp3"),
            required_answers: required,
            enabled: None,
        }
    }

    fn state(name: &str) -> ClockState {
        let path = std::env::temp_dir().join(format!(
            "mathwake-sched-test-{name}-{}.toml",
            std::process::id()
        ));
        ClockState::new(
            AlarmStore::new(path),
            RingController::new(Box::new(SilentPlayback)),
        )
    }

    fn dismiss(state: &mut ClockState, now: NaiveDateTime) {
        loop {
            let answer = state.ring.session().unwrap().problem().answer().to_string();
            if state.submit_answer(&answer, now) == AnswerOutcome::Dismissed {
                break;
            }
        }
    }

    #[test]
    fn nothing_fires_before_its_time() {
        let mut state = state("early");
        state.store.create(draft(7, 0, 1), at(6, 0)).unwrap();
        assert_eq!(state.tick(at(6, 59)), None);
        assert!(!state.ring.is_ringing());
    }

    #[test]
    fn due_alarm_fires_once_and_not_again_while_ringing() {
        let mut state = state("fires-once");
        let id = state.store.create(draft(7, 0, 1), at(6, 0)).unwrap();
        assert_eq!(state.tick(at(7, 0)), Some(id));
        // still ringing, later ticks must not re-trigger
        assert_eq!(state.tick(at(7, 1)), None);
        assert_eq!(state.tick(at(7, 30)), None);
        assert_eq!(state.ring.active_id(), Some(id));
    }

    #[test]
    fn second_due_alarm_waits_with_next_fire_untouched() {
        let mut state = state("deferral");
        let first = state.store.create(draft(7, 0, 1), at(6, 0)).unwrap();
        let second = state.store.create(draft(7, 1, 1), at(6, 0)).unwrap();

        assert_eq!(state.tick(at(7, 5)), Some(first));
        let deferred_at = state.store.get(second).unwrap().next_fire_at;
        assert_eq!(state.tick(at(7, 6)), None);
        assert_eq!(state.store.get(second).unwrap().next_fire_at, deferred_at);

        dismiss(&mut state, at(7, 6));
        // next tick picks up the deferred alarm, nothing was skipped
        assert_eq!(state.tick(at(7, 7)), Some(second));
        let _ = std::fs::remove_file(state.store.path());
    }

    #[test]
    fn insertion_order_breaks_ties() {
        let mut state = state("ties");
        let first = state.store.create(draft(7, 0, 1), at(6, 0)).unwrap();
        let _second = state.store.create(draft(7, 0, 1), at(6, 0)).unwrap();
        assert_eq!(state.tick(at(7, 0)), Some(first));
    }

    #[test]
    fn full_cycle_reschedules_for_the_next_day() {
        // create at 08:00 for 07:00 -> fires tomorrow; solve two problems and
        // it moves to the day after
        let mut state = state("cycle");
        let id = state.store.create(draft(7, 0, 2), at(8, 0)).unwrap();
        let tomorrow = NaiveDate::from_ymd_opt(2024, 5, 4)
            .unwrap()
            .and_hms_opt(7, 0, 0)
            .unwrap();
        assert_eq!(state.store.get(id).unwrap().next_fire_at, tomorrow);

        assert_eq!(state.tick(tomorrow), Some(id));
        dismiss(&mut state, tomorrow);
        assert_eq!(
            state.store.get(id).unwrap().next_fire_at,
            NaiveDate::from_ymd_opt(2024, 5, 5)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap()
        );
        assert!(!state.ring.is_ringing());
        let _ = std::fs::remove_file(state.store.path());
    }

    #[test]
    fn deleting_the_ringing_alarm_stops_the_session() {
        let mut state = state("delete-ringing");
        let id = state.store.create(draft(7, 0, 5), at(6, 0)).unwrap();
        assert_eq!(state.tick(at(7, 0)), Some(id));
        state.delete_alarm(id, at(7, 0));
        assert!(!state.ring.is_ringing());
        assert!(state.store.get(id).is_none());
        // and the slot is free for the next alarm
        let other = state.store.create(draft(7, 0, 1), at(6, 0)).unwrap();
        assert_eq!(state.tick(at(7, 10)), Some(other));
        let _ = std::fs::remove_file(state.store.path());
    }

    #[test]
    fn disabling_the_ringing_alarm_stops_it_and_keeps_the_invariant() {
        let mut state = state("disable-ringing");
        let id = state.store.create(draft(7, 0, 5), at(6, 0)).unwrap();
        assert_eq!(state.tick(at(7, 0)), Some(id));
        state.set_enabled(id, false, at(7, 0)).unwrap();
        assert!(!state.ring.is_ringing());
        let alarm = state.store.get(id).unwrap();
        assert!(!alarm.enabled);
        assert!(alarm.next_fire_at > at(7, 0));
        let _ = std::fs::remove_file(state.store.path());
    }

    #[test]
    fn enabled_alarms_are_future_dated_at_quiescent_points() {
        let mut state = state("invariant");
        let now = at(12, 0);
        for hour in [6, 12, 18] {
            state.store.create(draft(hour, 0, 1), now).unwrap();
        }
        for alarm in state.store.alarms() {
            assert!(alarm.next_fire_at > now);
        }
        let _ = std::fs::remove_file(state.store.path());
    }
}

use std::path::PathBuf;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

pub type AlarmId = u64;

#[inline]
#[must_use]
pub const fn always_true() -> bool {
    true
}

#[inline]
#[must_use]
pub const fn one_answer() -> u32 {
    1
}

/// A persisted alarm.
///
/// `time` is the date-less wall-clock instant the alarm rings at each day,
/// `next_fire_at` the concrete next occurrence. For an enabled alarm
/// `next_fire_at` is always in the future except while it is actually
/// ringing; it only advances once the challenge is solved.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Alarm {
    pub id: AlarmId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(with = "toml_datetime_compat")]
    pub time: NaiveTime,
    pub sound: PathBuf,
    #[serde(default = "always_true")]
    pub enabled: bool,
    #[serde(default = "one_answer")]
    pub required_answers: u32,
    #[serde(with = "toml_datetime_compat")]
    pub next_fire_at: NaiveDateTime,
}

impl Alarm {
    #[must_use]
    pub fn due(&self, now: NaiveDateTime) -> bool {
        self.enabled && now >= self.next_fire_at
    }

    /// Moves `next_fire_at` to the next future occurrence of `time`.
    pub fn reschedule(&mut self, now: NaiveDateTime) {
        self.next_fire_at = next_occurrence(self.time, now);
    }

    /// Applies an edit, keeping the id and (unless the draft says otherwise)
    /// the enabled flag.
    pub fn apply_draft(&mut self, draft: AlarmDraft, now: NaiveDateTime) {
        self.name = draft.name;
        self.time = draft.time;
        self.sound = draft.sound;
        self.required_answers = draft.required_answers;
        if let Some(enabled) = draft.enabled {
            self.enabled = enabled;
        }
        self.reschedule(now);
    }

    #[must_use]
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or("alarm")
    }
}

/// Everything the user fills in to create or edit an alarm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmDraft {
    pub name: Option<String>,
    pub time: NaiveTime,
    pub sound: PathBuf,
    pub required_answers: u32,
    /// `None` keeps the current enabled state on edit (new alarms start
    /// enabled).
    pub enabled: Option<bool>,
}

/// The strictly-future occurrence of `time` closest to `now`: later today if
/// `time` has not passed yet, otherwise tomorrow.
#[must_use]
pub fn next_occurrence(time: NaiveTime, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date().and_time(time);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

use std::{io, path::PathBuf};

use chrono::NaiveDateTime;
use log::{error, info, warn};
use serde::Serialize;

use crate::alarm::{Alarm, AlarmDraft, AlarmId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("no alarm with id {0}")]
    NotFound(AlarmId),
    #[error("an alarm needs a sound file before it can be armed")]
    MissingSound,
    #[error("an alarm needs at least one correct answer to be dismissable, got {0}")]
    BadAnswerCount(u32),
    #[error("couldn't write alarm file: {0}")]
    Io(#[from] io::Error),
    #[error("couldn't serialize alarms: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Serialize)]
struct StoreDoc<'a> {
    alarm: &'a [Alarm],
}

/// The durable alarm collection.
///
/// Owns every [`Alarm`]; the scheduler and ring controller only ever hold
/// ids into it. Alarms keep insertion order, which is also the tie-break
/// order when several are due at once.
#[derive(Debug)]
pub struct AlarmStore {
    path: PathBuf,
    alarms: Vec<Alarm>,
    next_id: AlarmId,
}

impl AlarmStore {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            alarms: Vec::new(),
            next_id: 1,
        }
    }

    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "mathwake")
            .map(|dirs| dirs.config_dir().join("alarms.toml"))
    }

    /// Loads the collection from `path`.
    ///
    /// A missing file is an empty store. A broken file is salvaged record by
    /// record rather than crashing: whatever parses is kept, the rest is
    /// logged and dropped; the file itself is left as it was so a bad parse
    /// never destroys data on disk (the salvaged subset only gets written on
    /// the next regular save). Any record whose `next_fire_at` already
    /// passed is advanced to the next occurrence of its alarm time, and that
    /// repair is written back right away.
    #[must_use]
    pub fn load(path: PathBuf, now: NaiveDateTime) -> Self {
        let (alarms, lost) = match std::fs::read_to_string(&path) {
            Ok(text) => parse_alarms(&text),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!("no alarm file at {}, starting empty", path.display());
                (Vec::new(), false)
            }
            Err(e) => {
                error!("couldn't read alarm file {}: {e}", path.display());
                (Vec::new(), false)
            }
        };
        let next_id = alarms.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let mut store = Self {
            path,
            alarms,
            next_id,
        };
        let mut repaired = false;
        for alarm in &mut store.alarms {
            if alarm.next_fire_at <= now {
                info!(
                    "alarm {} ({}) had a stale next occurrence, rescheduling",
                    alarm.id,
                    alarm.label()
                );
                alarm.reschedule(now);
                repaired = true;
            }
        }
        // only the stale-time repair rewrites the file; a partial parse keeps
        // the original on disk until the user changes something
        if repaired && !lost {
            if let Err(e) = store.save() {
                error!("couldn't rewrite repaired alarm file: {e}");
            }
        }
        store
    }

    /// Writes the whole collection back to disk.
    pub fn save(&self) -> Result<(), StoreError> {
        let doc = toml::to_string(&StoreDoc {
            alarm: &self.alarms,
        })?;
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&self.path, doc)?;
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String, StoreError> {
        Ok(toml::to_string(&StoreDoc {
            alarm: &self.alarms,
        })?)
    }

    /// Creates a new alarm from a draft, returning its id. The first
    /// occurrence is later today if the alarm time hasn't passed yet,
    /// otherwise tomorrow.
    pub fn create(&mut self, draft: AlarmDraft, now: NaiveDateTime) -> Result<AlarmId, StoreError> {
        validate(&draft)?;
        let id = self.next_id;
        self.next_id += 1;
        let next_fire_at = crate::alarm::next_occurrence(draft.time, now);
        self.alarms.push(Alarm {
            id,
            name: draft.name,
            time: draft.time,
            sound: draft.sound,
            enabled: draft.enabled.unwrap_or(true),
            required_answers: draft.required_answers,
            next_fire_at,
        });
        Ok(id)
    }

    /// Edits an existing alarm and recomputes its next occurrence.
    pub fn update(
        &mut self,
        id: AlarmId,
        draft: AlarmDraft,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        validate(&draft)?;
        let alarm = self.get_mut(id).ok_or(StoreError::NotFound(id))?;
        alarm.apply_draft(draft, now);
        Ok(())
    }

    /// Removes an alarm. Deleting an id that isn't there is a no-op.
    pub fn delete(&mut self, id: AlarmId) -> bool {
        let before = self.alarms.len();
        self.alarms.retain(|a| a.id != id);
        self.alarms.len() != before
    }

    /// Toggles an alarm. Re-enabling recomputes the next occurrence so a
    /// long-disabled alarm doesn't fire the moment it comes back.
    pub fn set_enabled(
        &mut self,
        id: AlarmId,
        enabled: bool,
        now: NaiveDateTime,
    ) -> Result<(), StoreError> {
        let alarm = self.get_mut(id).ok_or(StoreError::NotFound(id))?;
        if enabled && !alarm.enabled {
            alarm.reschedule(now);
        }
        alarm.enabled = enabled;
        Ok(())
    }

    #[must_use]
    pub fn get(&self, id: AlarmId) -> Option<&Alarm> {
        self.alarms.iter().find(|a| a.id == id)
    }

    pub fn get_mut(&mut self, id: AlarmId) -> Option<&mut Alarm> {
        self.alarms.iter_mut().find(|a| a.id == id)
    }

    /// All alarms in insertion order.
    #[must_use]
    pub fn alarms(&self) -> &[Alarm] {
        &self.alarms
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.alarms.is_empty()
    }

    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

fn validate(draft: &AlarmDraft) -> Result<(), StoreError> {
    if draft.sound.as_os_str().is_empty() {
        return Err(StoreError::MissingSound);
    }
    if draft.required_answers == 0 {
        return Err(StoreError::BadAnswerCount(draft.required_answers));
    }
    Ok(())
}

/// Parses the alarm file, keeping every record that decodes. Returns the
/// alarms plus whether anything was lost on the way (so the caller knows not
/// to overwrite the original file).
fn parse_alarms(text: &str) -> (Vec<Alarm>, bool) {
    #[derive(serde::Deserialize)]
    struct Doc {
        #[serde(default)]
        alarm: Vec<Alarm>,
    }

    // the happy path: the whole file decodes in one go
    match toml::from_str::<Doc>(text) {
        Ok(doc) => return (doc.alarm, false),
        Err(e) => warn!("alarm file didn't parse cleanly, salvaging record by record: {e}"),
    }
    let table: toml::Table = match text.parse() {
        Ok(table) => table,
        Err(e) => {
            error!("alarm file isn't valid toml, starting empty: {e}");
            return (Vec::new(), !text.trim().is_empty());
        }
    };
    let Some(entries) = table.get("alarm") else {
        return (Vec::new(), true);
    };
    let Some(entries) = entries.as_array() else {
        error!("`alarm` in the alarm file isn't a list, starting empty");
        return (Vec::new(), true);
    };
    let mut alarms = Vec::with_capacity(entries.len());
    let mut dropped = 0usize;
    for entry in entries {
        // round-trip each record through text: decoding straight out of a
        // `toml::Value` loses the datetime type, which `time`/`next_fire_at`
        // need
        let record = toml::to_string(entry)
            .map_err(|e| e.to_string())
            .and_then(|record| toml::from_str::<Alarm>(&record).map_err(|e| e.to_string()));
        match record {
            Ok(alarm) => alarms.push(alarm),
            Err(e) => {
                warn!("skipping unreadable alarm record: {e}");
                dropped += 1;
            }
        }
    }
    if dropped > 0 {
        warn!("dropped {dropped} unreadable alarm record(s)");
    }
    (alarms, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
    use std::path::Path;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 3)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn draft(hour: u32, minute: u32) -> AlarmDraft {
        AlarmDraft {
            name: Some("wake".to_string()),
            time: NaiveTime::from_hms_opt(hour, minute, 0).unwrap(),
            sound: PathBuf::from("/sounds/ring.mp3"),
            required_answers: 2,
            enabled: None,
        }
    }

    fn scratch(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("mathwake-test-{name}-{}", std::process::id()))
    }

    #[test]
    fn create_assigns_ids_and_future_occurrences() {
        let mut store = AlarmStore::new(PathBuf::from("unused.toml"));
        let first = store.create(draft(7, 0), now()).unwrap();
        let second = store.create(draft(9, 30), now()).unwrap();
        assert_ne!(first, second);
        for alarm in store.alarms() {
            assert!(alarm.next_fire_at > now());
            assert!(alarm.enabled);
        }
        // 07:00 already passed at 08:00, 09:30 hasn't
        assert_eq!(store.get(first).unwrap().next_fire_at.date(), NaiveDate::from_ymd_opt(2024, 5, 4).unwrap());
        assert_eq!(store.get(second).unwrap().next_fire_at.date(), now().date());
    }

    #[test]
    fn create_rejects_bad_drafts() {
        let mut store = AlarmStore::new(PathBuf::from("unused.toml"));
        let no_sound = AlarmDraft {
            sound: PathBuf::new(),
            ..draft(7, 0)
        };
        assert!(matches!(
            store.create(no_sound, now()),
            Err(StoreError::MissingSound)
        ));
        let no_answers = AlarmDraft {
            required_answers: 0,
            ..draft(7, 0)
        };
        assert!(matches!(
            store.create(no_answers, now()),
            Err(StoreError::BadAnswerCount(0))
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn update_missing_alarm_is_not_found() {
        let mut store = AlarmStore::new(PathBuf::from("unused.toml"));
        assert!(matches!(
            store.update(42, draft(7, 0), now()),
            Err(StoreError::NotFound(42))
        ));
    }

    #[test]
    fn delete_is_idempotent() {
        let mut store = AlarmStore::new(PathBuf::from("unused.toml"));
        let id = store.create(draft(7, 0), now()).unwrap();
        assert!(store.delete(id));
        assert!(!store.delete(id));
        assert!(store.is_empty());
    }

    #[test]
    fn reenabling_reschedules() {
        let mut store = AlarmStore::new(PathBuf::from("unused.toml"));
        let id = store.create(draft(9, 0), now()).unwrap();
        store.set_enabled(id, false, now()).unwrap();
        // pretend a day went by while disabled
        let later = now() + chrono::Duration::days(2);
        store.set_enabled(id, true, later).unwrap();
        assert!(store.get(id).unwrap().next_fire_at > later);
    }

    #[test]
    fn serialization_round_trips_and_is_idempotent() {
        let path = scratch("roundtrip");
        let mut store = AlarmStore::new(path.clone());
        store.create(draft(7, 0), now()).unwrap();
        store
            .create(
                AlarmDraft {
                    name: None,
                    required_answers: 1,
                    ..draft(23, 59)
                },
                now(),
            )
            .unwrap();
        store.save().unwrap();
        let first = store.to_toml().unwrap();

        let reloaded = AlarmStore::load(path.clone(), now());
        assert_eq!(reloaded.alarms(), store.alarms());
        assert_eq!(reloaded.to_toml().unwrap(), first);
        // ids keep counting up after a reload
        let mut reloaded = reloaded;
        let id = reloaded.create(draft(6, 0), now()).unwrap();
        assert_eq!(id, 3);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn missing_file_is_an_empty_store() {
        let store = AlarmStore::load(scratch("does-not-exist"), now());
        assert!(store.is_empty());
    }

    #[test]
    fn malformed_record_is_dropped_but_the_rest_survive() {
        let text = concat!(
            "[[alarm]]\n",
            "id = 1\n",
            "time = 07:00:00\n",
            "sound = \"/sounds/ring.mp3\"\n",
            "next_fire_at = 2024-05-04T07:00:00\n",
            "\n",
            "[[alarm]]\n",
            "id = 2\n",
            "time = \"not a time\"\n",
            "sound = \"/sounds/ring.mp3\"\n",
            "next_fire_at = 2024-05-04T07:00:00\n",
        );
        let (alarms, lost) = parse_alarms(text);
        assert_eq!(alarms.len(), 1);
        assert_eq!(alarms[0].id, 1);
        assert_eq!(alarms[0].required_answers, 1);
        assert!(alarms[0].enabled);
        assert!(lost);
    }

    #[test]
    fn unparseable_file_degrades_to_empty() {
        let (alarms, lost) = parse_alarms("this is { not toml");
        assert!(alarms.is_empty());
        assert!(lost);
        let (alarms, lost) = parse_alarms("");
        assert!(alarms.is_empty());
        assert!(!lost);
    }

    #[test]
    fn partial_parse_never_rewrites_the_file() {
        let path = scratch("partial");
        // one stale-but-good record, one garbage record
        let text = concat!(
            "[[alarm]]\n",
            "id = 1\n",
            "time = 07:00:00\n",
            "sound = \"/sounds/ring.mp3\"\n",
            "next_fire_at = 2024-05-03T07:00:00\n",
            "\n",
            "[[alarm]]\n",
            "id = \"two\"\n",
        );
        std::fs::write(&path, text).unwrap();
        let store = AlarmStore::load(path.clone(), now());
        // the good record is salvaged and repaired in memory
        assert_eq!(store.alarms().len(), 1);
        assert!(store.get(1).unwrap().next_fire_at > now());
        // but the original file is not clobbered with the salvaged subset
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn stale_next_fire_is_repaired_on_load() {
        let path = scratch("stale");
        let text = concat!(
            "[[alarm]]\n",
            "id = 1\n",
            "time = 07:00:00\n",
            "sound = \"/sounds/ring.mp3\"\n",
            "next_fire_at = 2024-05-03T07:00:00\n",
        );
        std::fs::write(&path, text).unwrap();
        let store = AlarmStore::load(path.clone(), now());
        let alarm = store.get(1).unwrap();
        assert!(alarm.next_fire_at > now());
        assert_eq!(
            alarm.next_fire_at,
            NaiveDate::from_ymd_opt(2024, 5, 4)
                .unwrap()
                .and_hms_opt(7, 0, 0)
                .unwrap()
        );
        // the repair was written back out
        let rewritten = std::fs::read_to_string(Path::new(&path)).unwrap();
        assert!(rewritten.contains("2024-05-04"));
        let _ = std::fs::remove_file(path);
    }
}

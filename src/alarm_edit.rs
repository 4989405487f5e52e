use std::path::{Path, PathBuf};

use chrono::Timelike;
use eframe::egui::{self, TextEdit, Widget, Window};

use crate::{
    alarm::{Alarm, AlarmDraft, AlarmId},
    clock_face::{self, TimeOfDay},
};

/// The in-progress state of the add/edit alarm window.
#[derive(Debug, Clone, PartialEq)]
pub struct AlarmBuilder {
    /// `Some` when editing an existing alarm, `None` when adding.
    pub target: Option<AlarmId>,
    name: String,
    hour12: u32,
    hour_string: String,
    minute: u32,
    minute_string: String,
    time_of_day: TimeOfDay,
    sound: PathBuf,
    required_answers: u32,
    answers_string: String,
}

pub enum EditingState {
    Cancelled,
    Editing,
    Done(AlarmDraft),
}

impl Default for AlarmBuilder {
    fn default() -> Self {
        let time = chrono::Local::now().naive_local().time();
        let (hour12, time_of_day) = clock_face::from_hour24(time.hour());
        Self {
            target: None,
            name: String::default(),
            hour12,
            hour_string: hour12.to_string(),
            minute: time.minute(),
            minute_string: time.minute().to_string(),
            time_of_day,
            sound: PathBuf::new(),
            required_answers: 1,
            answers_string: "1".to_string(),
        }
    }
}

impl From<&Alarm> for AlarmBuilder {
    /// Pre-fills the editor from an existing alarm so editing a 5:00 PM alarm
    /// shows 5:00 PM, not the current time.
    fn from(alarm: &Alarm) -> Self {
        let (hour12, time_of_day) = clock_face::from_hour24(alarm.time.hour());
        let minute = alarm.time.minute();
        Self {
            target: Some(alarm.id),
            name: alarm.name.clone().unwrap_or_default(),
            hour12,
            hour_string: hour12.to_string(),
            minute,
            minute_string: minute.to_string(),
            time_of_day,
            sound: alarm.sound.clone(),
            required_answers: alarm.required_answers,
            answers_string: alarm.required_answers.to_string(),
        }
    }
}

impl AlarmBuilder {
    #[must_use]
    pub fn build(&self) -> AlarmDraft {
        AlarmDraft {
            name: if self.name.is_empty() {
                None
            } else {
                Some(self.name.clone())
            },
            // the spinners keep hour12/minute in range, so this can't be None
            time: clock_face::dial_time(self.hour12, self.minute, self.time_of_day)
                .unwrap_or_default(),
            sound: self.sound.clone(),
            required_answers: self.required_answers,
            enabled: None,
        }
    }

    pub fn render_alarm_editor(&mut self, ctx: &egui::Context) -> EditingState {
        let mut ret = EditingState::Editing;
        let title = match self.target {
            Some(id) => format!("editing alarm {id}"),
            None => "new alarm".to_string(),
        };
        Window::new(title).collapsible(false).show(ctx, |ui| {
            self.edit_alarm(ui);
            ui.horizontal(|ui| {
                if ui.button("done").clicked() {
                    ret = EditingState::Done(self.build());
                } else if ui.button("cancel").clicked() {
                    ret = EditingState::Cancelled;
                }
            });
        });
        ret
    }

    fn edit_alarm(&mut self, ui: &mut egui::Ui) {
        ui.text_edit_singleline(&mut self.name);
        ui.horizontal(|ui| {
            self.render_time_editor(ui);
            self.render_sound_editor(ui);
        });
        self.render_answers_selector(ui);
    }

    fn render_time_editor(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            ui.horizontal(|ui| {
                self.render_hour_selector(ui);
                self.render_minute_selector(ui);
            });
            self.render_am_pm_selector(ui);
        });
    }

    fn render_am_pm_selector(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.add_space(15.0);
            ui.selectable_value(&mut self.time_of_day, TimeOfDay::AM, "AM");
            ui.selectable_value(&mut self.time_of_day, TimeOfDay::PM, "PM");
        });
    }

    fn render_hour_selector(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            ui.label("Hour");
            if ui.button("Up").clicked() && self.hour12 < 12 {
                self.hour12 += 1;
                self.hour_string = self.hour12.to_string();
            }
            if TextEdit::singleline(&mut self.hour_string)
                .desired_width(20.0)
                .char_limit(2)
                .ui(ui)
                .lost_focus()
            {
                // if the input value is valid, update the value
                if let Ok(parsed_value) = self.hour_string.parse::<u32>() {
                    self.hour12 = parsed_value.clamp(1, 12);
                }
                // sync the input value and the value regardless
                self.hour_string = self.hour12.to_string();
            }
            if ui.button("Down").clicked() && self.hour12 > 1 {
                self.hour12 -= 1;
                self.hour_string = self.hour12.to_string();
            }
        });
    }

    fn render_minute_selector(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            ui.label("Minute");
            if ui.button("Up").clicked() && self.minute < 59 {
                self.minute += 1;
                self.minute_string = self.minute.to_string();
            }
            if TextEdit::singleline(&mut self.minute_string)
                .desired_width(20.0)
                .char_limit(2)
                .ui(ui)
                .lost_focus()
            {
                if let Ok(parsed_value) = self.minute_string.parse::<u32>() {
                    self.minute = parsed_value.clamp(0, 59);
                }
                self.minute_string = self.minute.to_string();
            }
            if ui.button("Down").clicked() && self.minute > 0 {
                self.minute -= 1;
                self.minute_string = self.minute.to_string();
            }
        });
    }

    fn render_answers_selector(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.label("Problems to solve");
            if TextEdit::singleline(&mut self.answers_string)
                .desired_width(20.0)
                .char_limit(2)
                .ui(ui)
                .lost_focus()
            {
                if let Ok(parsed_value) = self.answers_string.parse::<u32>() {
                    self.required_answers = parsed_value.clamp(1, 99);
                }
                self.answers_string = self.required_answers.to_string();
            }
        });
    }

    fn render_sound_editor(&mut self, ui: &mut egui::Ui) {
        ui.vertical(|ui| {
            let current = self
                .sound
                .file_name()
                .map_or_else(|| "no sound picked".to_string(), |name| {
                    name.to_string_lossy().into_owned()
                });
            ui.label(current);
            if ui.button("Pick sound").clicked() {
                // TODO: rfd with gnome opens Recents not the audio folder https://github.com/PolyMeilex/rfd/issues/237
                let file_dialog = rfd::FileDialog::new()
                    .set_title("Pick alarm sound")
                    .add_filter("Audio", &["mp3", "wav", "ogg"]);
                let file_dialog = match directories::UserDirs::new()
                    .and_then(|u| u.audio_dir().map(Path::to_path_buf))
                {
                    Some(audio_path) => file_dialog.set_directory(audio_path),
                    None => file_dialog,
                };
                if let Some(path) = file_dialog.pick_file() {
                    self.sound = path;
                }
            }
        });
    }
}

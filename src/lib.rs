#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

use std::sync::{Arc, Mutex};

use eframe::egui::{
    self, Button, CentralPanel, Grid, Layout, RichText, ScrollArea, TopBottomPanel, Window,
};

use alarm::AlarmId;
use alarm_edit::{AlarmBuilder, EditingState};
use ring::AnswerOutcome;
use scheduler::{lock, ClockState};

pub mod alarm;
/// implementation of alarm editing for egui
pub mod alarm_edit;
pub mod challenge;
pub mod clock_face;
pub mod communication;
pub mod playback;
pub mod ring;
pub mod scheduler;
pub mod store;

/// how alarm times are shown in the list
const ALARM_TIME_FORMAT: &str = "%l:%M %p";
/// how the header clock is shown
const CLOCK_FORMAT: &str = "%H:%M:%S";

enum ListAction {
    Delete(AlarmId),
    SetEnabled(AlarmId, bool),
    Edit(AlarmId),
}

/// The main window: header clock, alarm list, the add/edit window, and the
/// challenge window while an alarm rings. All alarm state lives behind
/// `state`, shared with the scheduler thread.
pub struct WakeApp {
    state: Arc<Mutex<ClockState>>,
    adding_alarm: Option<AlarmBuilder>,
    answer_input: String,
    challenge_feedback: Option<String>,
    error_banner: Option<String>,
}

impl WakeApp {
    #[must_use]
    pub const fn new(state: Arc<Mutex<ClockState>>) -> Self {
        Self {
            state,
            adding_alarm: None,
            answer_input: String::new(),
            challenge_feedback: None,
            error_banner: None,
        }
    }

    fn render_header(&mut self, ctx: &egui::Context) {
        TopBottomPanel::top("time_and_ctrl").show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.centered_and_justified(|ui| {
                    ui.label(format!(
                        "Time: {}",
                        chrono::Local::now().naive_local().format(CLOCK_FORMAT)
                    ));
                });
                ui.with_layout(Layout::right_to_left(eframe::emath::Align::Min), |ui| {
                    if ui
                        .add_enabled(self.adding_alarm.is_none(), Button::new("+"))
                        .on_hover_text("add alarm")
                        .clicked()
                    {
                        self.adding_alarm = Some(AlarmBuilder::default());
                    }
                });
            });
        });
    }

    fn render_alarm_editor(&mut self, ctx: &egui::Context) {
        let outcome = self
            .adding_alarm
            .as_mut()
            .map(|builder| (builder.target, builder.render_alarm_editor(ctx)));
        match outcome {
            Some((target, EditingState::Done(draft))) => {
                self.adding_alarm = None;
                let now = chrono::Local::now().naive_local();
                let mut state = lock(&self.state);
                let result = match target {
                    Some(id) => state.store.update(id, draft, now),
                    None => state.store.create(draft, now).map(|_| ()),
                };
                match result {
                    Ok(()) => {
                        self.error_banner = None;
                        state.persist();
                    }
                    Err(e) => {
                        // keep the half-finished alarm out of the store, tell
                        // the user why
                        self.error_banner = Some(e.to_string());
                    }
                }
            }
            Some((_, EditingState::Cancelled)) => {
                self.adding_alarm = None;
            }
            _ => {}
        }
    }

    /// The challenge window. There is deliberately no close or snooze
    /// control: the session lives in `ClockState`, so even if the window
    /// could go away it would come back with the same progress on the next
    /// frame.
    fn render_challenge(&mut self, ctx: &egui::Context) {
        let mut state = lock(&self.state);
        let Some(session) = state.ring.session() else {
            return;
        };
        let title = state
            .store
            .get(session.alarm_id)
            .map_or_else(|| "Wake up!".to_string(), |a| format!("Wake up: {}", a.label()));
        let question = session.problem().to_string();
        let progress = format!("{} of {} solved", session.correct_so_far(), session.required());
        let playback_error = session.playback_error.clone();

        Window::new(title)
            .collapsible(false)
            .resizable(false)
            .show(ctx, |ui| {
                ui.label("Solve the problem to turn the alarm off!");
                if let Some(error) = playback_error {
                    ui.label(RichText::new(format!("(ringing silently: {error})")).weak());
                }
                ui.heading(question);
                ui.label(progress);
                let entry = ui.text_edit_singleline(&mut self.answer_input);
                let submitted = ui.button("Submit").clicked()
                    || (entry.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)));
                if submitted {
                    let now = chrono::Local::now().naive_local();
                    let answer = std::mem::take(&mut self.answer_input);
                    self.challenge_feedback = match state.submit_answer(&answer, now) {
                        AnswerOutcome::Dismissed => None,
                        AnswerOutcome::Correct => Some("Right! Keep going.".to_string()),
                        AnswerOutcome::Incorrect => Some("Wrong, try this one.".to_string()),
                        AnswerOutcome::NotANumber => {
                            self.answer_input = answer;
                            Some("Please enter a number.".to_string())
                        }
                        AnswerOutcome::NotRinging => None,
                    };
                }
                if let Some(feedback) = &self.challenge_feedback {
                    ui.label(feedback);
                }
            });
    }

    fn render_alarm_list(&mut self, ctx: &egui::Context) {
        let now = chrono::Local::now().naive_local();
        let mut action = None;
        let mut state = lock(&self.state);
        CentralPanel::default().show(ctx, |ui| {
            if let Some(banner) = self.error_banner.clone() {
                ui.horizontal(|ui| {
                    ui.label(RichText::new(banner).strong());
                    if ui.button("x").clicked() {
                        self.error_banner = None;
                    }
                });
            }
            if state.store.is_empty() {
                ui.label("No alarms yet.");
                return;
            }
            ScrollArea::vertical().show(ui, |ui| {
                Grid::new("alarms").striped(true).show(ui, |ui| {
                    for alarm in state.store.alarms() {
                        ui.label(alarm.label());
                        ui.label(alarm.time.format(ALARM_TIME_FORMAT).to_string());
                        ui.label(if alarm.enabled {
                            format!("rings {}", alarm.next_fire_at.format("%a %H:%M"))
                        } else {
                            "off".to_string()
                        });
                        ui.label(format!("{} problem(s)", alarm.required_answers));
                        let mut enabled = alarm.enabled;
                        if ui.checkbox(&mut enabled, "enabled").changed() {
                            action = Some(ListAction::SetEnabled(alarm.id, enabled));
                        }
                        if ui.button("edit").clicked() {
                            action = Some(ListAction::Edit(alarm.id));
                        }
                        if ui.button("x").on_hover_text("delete alarm").clicked() {
                            action = Some(ListAction::Delete(alarm.id));
                        }
                        ui.end_row();
                    }
                });
            });
        });
        match action {
            Some(ListAction::Delete(id)) => state.delete_alarm(id, now),
            Some(ListAction::SetEnabled(id, enabled)) => {
                // ignoring NotFound: the alarm went away under us, the list
                // redraws next frame anyway
                let _ = state.set_enabled(id, enabled, now);
            }
            Some(ListAction::Edit(id)) => {
                self.adding_alarm = state.store.get(id).map(AlarmBuilder::from);
            }
            None => {}
        }
    }
}

impl eframe::App for WakeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // the scheduler thread fires alarms even when nothing repaints, but
        // the clock readout and the challenge window should stay fresh
        ctx.request_repaint_after(std::time::Duration::from_millis(250));
        self.render_header(ctx);
        self.render_alarm_editor(ctx);
        self.render_alarm_list(ctx);
        self.render_challenge(ctx);
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        lock(&self.state).persist();
    }
}

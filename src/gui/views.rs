use std::time::Duration;

use egui::{Align, Button, Color32, Layout, ProgressBar, RichText, SelectableLabel};

use crate::models::events::Command;
use crate::models::session::{Choice, SessionPhase};
use crate::models::state::{QuestionView, SessionView, TerminalView};

const ACCENT: Color32 = Color32::from_rgb(30, 64, 175);

pub fn before(ctx: &egui::Context, elapsed: Duration) {
    let dots = ".".repeat(((elapsed.as_millis() / 500) % 4) as usize);
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() / 3.0);
            ui.label(RichText::new("WELCOME").small().weak());
            ui.add_space(12.0);
            ui.heading(RichText::new("Live Vote").size(32.0).color(ACCENT));
            ui.add_space(12.0);
            ui.label(RichText::new(format!("WAITING{dots}")).size(18.0));
        });
    });
}

pub fn after(ctx: &egui::Context) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(ui.available_height() / 3.0);
            ui.heading(RichText::new("THANK YOU!").size(36.0).color(ACCENT));
            ui.label("YOUR VOTE MAKES A DIFFERENCE");
        });
    });
}

pub fn live(ctx: &egui::Context, view: &TerminalView, outgoing: &mut Vec<Command>) {
    egui::TopBottomPanel::top("header").show(ctx, |ui| {
        egui::Frame::default()
            .outer_margin(egui::vec2(0.0, 4.0))
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    if let Some(current) = &view.session {
                        ui.label(format!("#{}", current.session.session_id));
                        ui.strong(&current.session.title);
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if let Some(secs) = view.session.as_ref().and_then(|s| s.remaining_secs) {
                            ui.label(
                                RichText::new(format!("TIME LEFT {:02}s", secs)).strong(),
                            );
                        }
                    });
                });
            });
    });

    egui::TopBottomPanel::bottom("footer").show(ctx, |ui| {
        ui.horizontal(|ui| match &view.notice {
            Some(notice) => {
                ui.colored_label(Color32::DARK_RED, notice);
            }
            None => {
                ui.label(RichText::new("Connected").weak());
            }
        });
    });

    egui::CentralPanel::default().show(ctx, |ui| {
        let Some(current) = &view.session else {
            ui.vertical_centered(|ui| {
                ui.add_space(24.0);
                ui.label("Loading...");
            });
            return;
        };

        egui::ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match current.session.phase {
                SessionPhase::Presenting => presenting(ui, current),
                SessionPhase::Voting => voting(ui, current, outgoing),
                SessionPhase::VotingClosed => results(ui, current),
            });
    });
}

fn presenting(ui: &mut egui::Ui, current: &SessionView) {
    let session = &current.session;
    ui.vertical_centered(|ui| {
        ui.heading(RichText::new(&session.title).color(ACCENT));
        ui.add_space(8.0);
        ui.label(&session.text);
        if let Some(image) = &session.image_ref {
            ui.add_space(8.0);
            ui.hyperlink_to("Project image", image);
        }
    });
}

fn voting(ui: &mut egui::Ui, current: &SessionView, outgoing: &mut Vec<Command>) {
    let session_id = current.session.session_id;
    if current.questions.is_empty() {
        ui.label("No questions for this project.");
        return;
    }

    for question in &current.questions {
        ui.add_space(8.0);
        ui.label(&question.question.text);
        ui.horizontal(|ui| {
            for (choice, label) in [(Choice::Positive, "YES"), (Choice::Negative, "NO")] {
                let selected = question.staged == Some(choice);
                let clicked = ui
                    .add_enabled(question.can_vote, SelectableLabel::new(selected, label))
                    .clicked();
                if clicked {
                    outgoing.push(Command::Select {
                        session_id,
                        question_id: question.question.question_id,
                        choice,
                    });
                }
            }
            status_badge(ui, question);
        });
    }

    ui.add_space(12.0);
    let submit = ui.add_enabled(
        current.window_open && current.has_staged(),
        Button::new(RichText::new("SUBMIT VOTE").strong()),
    );
    if submit.clicked() {
        outgoing.push(Command::SubmitStaged { session_id });
    }
    if !current.window_open {
        ui.label(RichText::new("Voting time is over.").weak());
    }
}

fn status_badge(ui: &mut egui::Ui, question: &QuestionView) {
    if question.pending {
        ui.spinner();
    } else if question.voted {
        ui.label(RichText::new("Voted").italics().weak());
    }
}

fn results(ui: &mut egui::Ui, current: &SessionView) {
    for question in &current.questions {
        let (positive, negative) = question.question.split_percent();
        ui.add_space(8.0);
        ui.label(RichText::new(format!("• {}", question.question.text)).italics());
        ui.add(
            ProgressBar::new(positive as f32 / 100.0)
                .text(format!("YES {}%  ·  NO {}%", positive, negative)),
        );
    }
}

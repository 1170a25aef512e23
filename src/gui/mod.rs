use std::time::{Duration, Instant};

use log::error;
use tokio::sync::{mpsc, watch};

use crate::models::events::Command;
use crate::models::phase::AppPhase;
use crate::models::state::TerminalView;

pub mod views;

/// Render layer. Reads whole snapshots from the engine and sends back commands;
/// it holds no voting state of its own.
pub struct TerminalApp {
    view: watch::Receiver<TerminalView>,
    commands: mpsc::UnboundedSender<Command>,
    started: Instant,
}

impl TerminalApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        view: watch::Receiver<TerminalView>,
        commands: mpsc::UnboundedSender<Command>,
    ) -> Self {
        cc.egui_ctx.set_visuals(egui::Visuals::light());
        Self {
            view,
            commands,
            started: Instant::now(),
        }
    }

    fn send(&self, command: Command) {
        if let Err(e) = self.commands.send(command) {
            error!("Terminal engine stopped, dropping command: {}", e);
        }
    }
}

impl eframe::App for TerminalApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let view = self.view.borrow().clone();
        let mut outgoing = Vec::new();

        match view.app_phase {
            AppPhase::Before => views::before(ctx, self.started.elapsed()),
            AppPhase::After => views::after(ctx),
            AppPhase::Live => views::live(ctx, &view, &mut outgoing),
        }

        for command in outgoing {
            self.send(command);
        }
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

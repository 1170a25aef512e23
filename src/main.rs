use eframe::egui;
use log::error;
use vote_terminal::config::Config;
use vote_terminal::engine;
use vote_terminal::gui::TerminalApp;

fn main() -> eframe::Result {
    env_logger::init();

    let handle = match Config::load().and_then(|config| engine::spawn(&config)) {
        Ok(handle) => handle,
        Err(e) => {
            error!("Failed to start terminal: {:#}", e);
            std::process::exit(1);
        }
    };

    let builder = egui::ViewportBuilder::default()
        .with_title("Vote Terminal")
        .with_inner_size(egui::vec2(480.0, 720.0));

    let options = eframe::NativeOptions {
        viewport: builder,
        ..Default::default()
    };

    let view = handle.view.clone();
    let commands = handle.commands.clone();
    let result = eframe::run_native(
        "Vote Terminal",
        options,
        Box::new(move |cc| Ok(Box::new(TerminalApp::new(cc, view, commands)))),
    );

    handle.shutdown();
    result
}

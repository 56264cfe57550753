mod app;
mod assignment;
mod bus_watcher;
mod config;
mod display;
mod error;
mod gst_logger;
mod media;
mod message;
mod monitor;
mod orchestrator;
mod playback;
mod refresh;
mod state;
mod sync;
mod transitions;
mod ui;
mod window_host;

use std::cell::RefCell;

use playback::GstEngine;
use state::App;

fn main() -> iced::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::load();
    let engine = match GstEngine::new() {
        Ok(engine) => engine,
        Err(e) => {
            log::error!("Failed to initialise GStreamer: {}", e);
            std::process::exit(1);
        }
    };

    // iced calls boot through `Fn`; hand the engine over exactly once.
    let boot_state = RefCell::new(Some((config, engine)));
    let boot = move || {
        let (config, engine) = boot_state
            .borrow_mut()
            .take()
            .expect("Boot function called more than once");
        App::new(config, engine)
    };

    iced::daemon(boot, App::update, App::view)
        .title(App::title)
        .subscription(App::subscription)
        .run()
}

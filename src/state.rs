use iced::{Size, Task, window};

use crate::assignment::AssignmentTable;
use crate::config::Config;
use crate::display::{DisplayEnumerator, SystemDisplays};
use crate::media::MediaStore;
use crate::message::Message;
use crate::orchestrator::Orchestrator;
use crate::playback::GstEngine;
use crate::window_host::IcedWindowHost;

/// Application state: the control window plus every output window.
pub struct App {
    pub config: Config,
    pub main_window: window::Id,
    pub displays: DisplayEnumerator<SystemDisplays>,
    pub media: MediaStore<GstEngine>,
    pub assignments: AssignmentTable,
    pub orchestrator: Orchestrator<IcedWindowHost>,
    pub errors: Vec<String>,
    pub status: String,
}

impl App {
    pub fn new(config: Config, engine: GstEngine) -> (Self, Task<Message>) {
        let (main_window, open) = window::open(window::Settings {
            size: Size::new(1024.0, 768.0),
            min_size: Some(Size::new(640.0, 480.0)),
            ..window::Settings::default()
        });

        let displays = DisplayEnumerator::new(SystemDisplays::new(
            config.displays.clone(),
            config.default_refresh_hz,
        ));
        let assignments = AssignmentTable::new(0, displays.len());
        let media = MediaStore::new(engine, config.mute_outputs);

        let app = App {
            config,
            main_window,
            displays,
            media,
            assignments,
            orchestrator: Orchestrator::new(IcedWindowHost::default()),
            errors: Vec::new(),
            status: "Choose videos to get started".to_string(),
        };
        (app, open.map(Message::MainWindowOpened))
    }
}

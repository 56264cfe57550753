use iced::{Element, Subscription, Task, time, window};
use std::time::Duration;

use crate::config::Config;
use crate::message::Message;
use crate::state::App;
use crate::transitions;
use crate::ui;

impl App {
    /// Handle UI messages and state updates.
    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::MainWindowOpened(id) => {
                log::info!("Control window opened: {:?}", id);
                Task::none()
            }
            Message::PollDisplays => self.poll_displays(false),
            Message::RefreshDisplays => self.poll_displays(true),
            Message::OutputWindowOpened(id) => {
                log::debug!("Output window opened: {:?}", id);
                Task::none()
            }
            Message::WindowClosed(id) => {
                if id == self.main_window {
                    log::info!("Control window closed, exiting");
                    self.orchestrator.stop(&mut self.media);
                    let close_outputs = self.orchestrator.host_mut().take_tasks();
                    return close_outputs.chain(iced::exit());
                }
                self.orchestrator.host_mut().forget(id);
                self.orchestrator.window_closed(id, &mut self.media);
                if !self.orchestrator.is_active() {
                    self.status = "Playback stopped".to_string();
                }
                self.orchestrator.host_mut().take_tasks()
            }
            Message::SelectVideos => {
                let extensions = Config::picker_filter(&self.config.video_extensions);
                Task::perform(
                    async move {
                        rfd::AsyncFileDialog::new()
                            .add_filter("Videos", &extensions)
                            .pick_files()
                            .await
                            .map(|files| {
                                files
                                    .into_iter()
                                    .map(|f| f.path().to_path_buf())
                                    .collect()
                            })
                            .unwrap_or_default()
                    },
                    Message::VideosPicked,
                )
            }
            Message::VideosPicked(paths) => {
                if paths.is_empty() {
                    return Task::none();
                }
                let report = transitions::replace_selection(
                    &mut self.orchestrator,
                    &mut self.media,
                    &mut self.assignments,
                    paths,
                    self.displays.len(),
                );
                self.errors
                    .extend(report.failures.iter().map(|e| e.to_string()));
                self.status = format!(
                    "{} video{} loaded",
                    report.opened,
                    if report.opened == 1 { "" } else { "s" }
                );
                self.orchestrator.host_mut().take_tasks()
            }
            Message::SelectAudio => {
                let extensions = Config::picker_filter(&self.config.audio_extensions);
                Task::perform(
                    async move {
                        rfd::AsyncFileDialog::new()
                            .add_filter("Audio", &extensions)
                            .pick_file()
                            .await
                            .map(|f| f.path().to_path_buf())
                    },
                    Message::AudioPicked,
                )
            }
            Message::AudioPicked(path) => {
                if path.is_none() {
                    return Task::none();
                }
                if self.orchestrator.is_active() {
                    self.status = "Stop playback before changing the audio".to_string();
                    return Task::none();
                }
                match self.media.set_audio(path) {
                    Ok(()) => {
                        if let Some(audio) = self.media.audio() {
                            self.status = format!("Audio: {}", audio.file_name());
                        }
                    }
                    Err(e) => self.errors.push(e.to_string()),
                }
                Task::none()
            }
            Message::ClearAudio => {
                if self.orchestrator.is_active() {
                    self.status = "Stop playback before changing the audio".to_string();
                    return Task::none();
                }
                match self.media.set_audio(None) {
                    Ok(()) => self.status = "Audio removed".to_string(),
                    Err(e) => self.errors.push(e.to_string()),
                }
                Task::none()
            }
            Message::Assign(video, display) => {
                if let Err(e) = self.assignments.assign(video, display) {
                    log::warn!("Assignment rejected: {}", e);
                    self.errors.push(e.to_string());
                }
                Task::none()
            }
            Message::Start => {
                match self.orchestrator.start(
                    &mut self.media,
                    &self.assignments,
                    self.displays.current_displays(),
                ) {
                    Ok(report) => {
                        self.errors
                            .extend(report.failures.iter().map(|e| e.to_string()));
                        self.status = if report.started.is_empty() {
                            "No screen could be started".to_string()
                        } else {
                            format!(
                                "Playing on {} screen{}",
                                report.started.len(),
                                if report.started.len() == 1 { "" } else { "s" }
                            )
                        };
                    }
                    Err(e) => self.status = e.to_string(),
                }
                self.orchestrator.host_mut().take_tasks()
            }
            Message::Stop => {
                self.orchestrator.stop(&mut self.media);
                self.status = "Playback stopped".to_string();
                self.orchestrator.host_mut().take_tasks()
            }
            Message::RateTick => Task::none(),
            Message::DismissErrors => {
                self.errors.clear();
                Task::none()
            }
        }
    }

    /// Re-read displays; a changed topology ends playback and clears assignments.
    fn poll_displays(&mut self, requested: bool) -> Task<Message> {
        let changed = transitions::poll_displays(
            &mut self.displays,
            &mut self.orchestrator,
            &mut self.media,
            &mut self.assignments,
        );
        if changed {
            self.status = format!("{} screens available", self.displays.len());
        } else if requested {
            self.status = "Screens unchanged".to_string();
        }
        self.orchestrator.host_mut().take_tasks()
    }

    /// Subscribe to events.
    pub fn subscription(&self) -> Subscription<Message> {
        let mut subscriptions = vec![
            window::close_events().map(Message::WindowClosed),
            time::every(self.config.display_poll_interval()).map(|_| Message::PollDisplays),
        ];
        if self.orchestrator.is_active() && self.config.show_fps_overlay {
            subscriptions.push(time::every(Duration::from_millis(500)).map(|_| Message::RateTick));
        }
        Subscription::batch(subscriptions)
    }

    pub fn title(&self, window: window::Id) -> String {
        if window == self.main_window {
            "Cinewall".to_string()
        } else {
            "Cinewall output".to_string()
        }
    }

    /// Render the view.
    pub fn view(&self, window: window::Id) -> Element<'_, Message> {
        if window == self.main_window {
            ui::render_control_view(self)
        } else {
            ui::render_output_view(self, window)
        }
    }
}

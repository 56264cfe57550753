use iced::window;
use iced::{Point, Size, Task};
use std::collections::HashSet;

use crate::display::{Bounds, DisplayDescriptor};
use crate::message::Message;
use crate::monitor::RefreshSignal;
use crate::orchestrator::WindowHost;
use crate::refresh::TimerRefreshSignal;

/// Output windows on top of iced's multi-window runtime.
///
/// iced hands out window ids synchronously and performs the actual open and
/// close as tasks; those are queued here and drained by the update loop.
#[derive(Default)]
pub struct IcedWindowHost {
    open: HashSet<window::Id>,
    sizes: Vec<(window::Id, Size)>,
    pending: Vec<Task<Message>>,
}

impl IcedWindowHost {
    pub fn output_settings(display: &DisplayDescriptor) -> window::Settings {
        window::Settings {
            size: Size::new(display.bounds.width, display.bounds.height),
            position: window::Position::Specific(Point::new(display.bounds.x, display.bounds.y)),
            decorations: false,
            resizable: false,
            level: window::Level::AlwaysOnTop,
            ..window::Settings::default()
        }
    }

    /// Queued open/close tasks since the last call.
    pub fn take_tasks(&mut self) -> Task<Message> {
        Task::batch(std::mem::take(&mut self.pending))
    }

    /// The window is gone already; stop tracking it.
    pub fn forget(&mut self, id: window::Id) {
        self.open.remove(&id);
        self.sizes.retain(|(w, _)| *w != id);
    }
}

impl WindowHost for IcedWindowHost {
    type WindowId = window::Id;

    fn create_window(&mut self, display: &DisplayDescriptor) -> Result<window::Id, String> {
        if !display.bounds.is_drawable() {
            return Err(format!("cannot open a window on display {}", display.id));
        }

        let (id, open) = window::open(Self::output_settings(display));
        self.pending.push(open.map(Message::OutputWindowOpened));
        self.open.insert(id);
        self.sizes
            .push((id, Size::new(display.bounds.width, display.bounds.height)));
        log::debug!("Opening output window {:?} on display {}", id, display.id);
        Ok(id)
    }

    fn attach_surface(&mut self, window: window::Id, region: &Bounds) -> Result<(), String> {
        let Some((_, size)) = self.sizes.iter().find(|(w, _)| *w == window) else {
            return Err(format!("window {:?} is not open", window));
        };
        let frame = Bounds::new(0.0, 0.0, size.width, size.height);
        if !region.is_drawable() || !frame.contains(region) {
            return Err(format!(
                "region {}x{} at {} does not fit the window",
                region.width, region.height, region.x
            ));
        }
        Ok(())
    }

    fn close_window(&mut self, window: window::Id) {
        if self.open.remove(&window) {
            self.sizes.retain(|(w, _)| *w != window);
            self.pending.push(window::close(window));
            log::debug!("Closing output window {:?}", window);
        }
    }

    fn refresh_signal(&self, display: &DisplayDescriptor) -> Option<Box<dyn RefreshSignal>> {
        Some(Box::new(TimerRefreshSignal::new(
            format!("display-{}", display.id.0),
            display.refresh_hz,
        )))
    }
}

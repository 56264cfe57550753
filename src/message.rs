use iced::window;
use std::path::PathBuf;

#[derive(Clone, Debug)]
pub enum Message {
    MainWindowOpened(window::Id),
    OutputWindowOpened(window::Id),
    WindowClosed(window::Id),
    SelectVideos,
    VideosPicked(Vec<PathBuf>),
    SelectAudio,
    AudioPicked(Option<PathBuf>),
    ClearAudio,
    Assign(usize, Option<usize>), // video index, display index
    Start,
    Stop,
    RefreshDisplays,
    PollDisplays,
    RateTick,
    DismissErrors,
}

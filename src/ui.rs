use iced::widget::text::Shaping;
use iced::widget::{button, column, container, row, scrollable, stack, text};
use iced::{Alignment, Color, ContentFit, Element, Length, Theme, window};
use iced_video_player::VideoPlayer;

use crate::message::Message;
use crate::orchestrator::Surface;
use crate::state::App;

/// Format a measured render rate for display.
pub fn get_fps_display(fps: Option<f64>) -> String {
    match fps {
        Some(fps) => format!("{:.0} FPS", fps),
        None => "-- FPS".to_string(),
    }
}

/// Get the color for FPS display based on the display's refresh rate.
pub fn get_fps_color(current_fps: Option<f64>, refresh_hz: f32) -> Color {
    // Green: 95%+ of refresh (excellent)
    // Yellow: 85-95% (good)
    // Orange: 70-85% (acceptable)
    // Red: below 70% (poor)
    let Some(current_fps) = current_fps else {
        return Color::from_rgb8(160, 160, 160);
    };
    let target = f64::from(refresh_hz);

    if current_fps >= target * 0.95 {
        Color::from_rgb8(0, 255, 0)
    } else if current_fps >= target * 0.85 {
        Color::from_rgb8(255, 255, 0)
    } else if current_fps >= target * 0.70 {
        Color::from_rgb8(255, 165, 0)
    } else {
        Color::from_rgb8(255, 0, 0)
    }
}

fn black_background(_theme: &Theme) -> container::Style {
    container::Style {
        background: Some(Color::BLACK.into()),
        ..Default::default()
    }
}

/// Render the control window.
pub fn render_control_view(app: &App) -> Element<'_, Message> {
    let playing = app.orchestrator.is_active();

    let header = column![
        text("Cinewall").size(32),
        text("Route videos to your screens").size(14),
    ]
    .spacing(4);

    let mut content = column![header, render_previews(app)]
        .spacing(16)
        .padding(20);

    if !playing {
        let label = if app.media.is_empty() {
            "Choose files"
        } else {
            "Replace files"
        };
        content = content.push(button(text(label)).on_press(Message::SelectVideos).padding(10));
    }

    content = content
        .push(render_audio_row(app, playing))
        .push(render_screens(app))
        .push(render_assignments(app, playing));

    let transport = if playing {
        button(text("Stop playback"))
            .style(button::danger)
            .on_press(Message::Stop)
    } else {
        button(text("Start experience!"))
            .style(button::success)
            .on_press(Message::Start)
    };
    content = content.push(
        row![
            transport.padding(10),
            button(text("Refresh screens"))
                .style(button::secondary)
                .on_press(Message::RefreshDisplays)
                .padding(10),
        ]
        .spacing(10),
    );

    content = content.push(text(app.status.clone()).size(12));
    if !app.errors.is_empty() {
        content = content.push(render_errors(app));
    }

    scrollable(content).into()
}

fn render_previews(app: &App) -> Element<'_, Message> {
    if app.media.is_empty() {
        return container(text("No videos selected").size(16))
            .width(Length::Fill)
            .height(Length::Fixed(180.0))
            .center_x(Length::Fill)
            .center_y(Length::Fixed(180.0))
            .style(black_background)
            .into();
    }

    let previews = app.media.items().iter().map(|item| -> Element<'_, Message> {
        column![
            VideoPlayer::new(item.preview.video())
                .width(Length::Fill)
                .height(Length::Fixed(180.0))
                .content_fit(ContentFit::Contain),
            text(item.file_name()).size(12),
        ]
        .spacing(4)
        .width(Length::Fill)
        .into()
    });

    row(previews).spacing(10).into()
}

fn render_audio_row(app: &App, playing: bool) -> Element<'_, Message> {
    let current = match app.media.audio() {
        Some(audio) => text(format!("Audio: {}", audio.file_name())),
        None => text("No background audio"),
    };

    let mut choose = button(text("Choose audio")).style(button::secondary).padding(8);
    let mut clear = button(text("Remove audio")).style(button::secondary).padding(8);
    if !playing {
        choose = choose.on_press(Message::SelectAudio);
        if app.media.audio().is_some() {
            clear = clear.on_press(Message::ClearAudio);
        }
    }

    row![choose, clear, current.size(14)]
        .spacing(10)
        .align_y(Alignment::Center)
        .into()
}

fn render_screens(app: &App) -> Element<'_, Message> {
    let displays = app.displays.current_displays();
    let mut list = column![text("Available screens for playback:").size(18)].spacing(6);

    if displays.is_empty() {
        list = list.push(text("No screens detected").size(14));
    }
    for (index, display) in displays.iter().enumerate() {
        list = list.push(
            text(format!(
                "{} at ({}, {}), {:.0} Hz",
                display.label(index),
                display.bounds.x,
                display.bounds.y,
                display.refresh_hz
            ))
            .size(14),
        );
    }

    list.into()
}

fn render_assignments(app: &App, playing: bool) -> Element<'_, Message> {
    let display_count = app.displays.len();
    let mut rows = column![].spacing(6);

    for (video, item) in app.media.items().iter().enumerate() {
        let assigned = app.assignments.get(video);

        let mut choices = row![].spacing(4);
        let none = button(text("None").size(12))
            .style(if assigned.is_none() {
                button::primary
            } else {
                button::secondary
            })
            .padding(6);
        choices = choices.push(if playing {
            none
        } else {
            none.on_press(Message::Assign(video, None))
        });

        for display in 0..display_count {
            let choice = button(text(format!("Screen {}", display + 1)).size(12))
                .style(if assigned == Some(display) {
                    button::primary
                } else {
                    button::secondary
                })
                .padding(6);
            choices = choices.push(if playing {
                choice
            } else {
                choice.on_press(Message::Assign(video, Some(display)))
            });
        }

        rows = rows.push(
            row![
                text(item.file_name()).size(14).width(Length::Fixed(220.0)),
                choices,
            ]
            .spacing(10)
            .align_y(Alignment::Center),
        );
    }

    rows.into()
}

fn render_errors(app: &App) -> Element<'_, Message> {
    let mut list = column![].spacing(2);
    for error in &app.errors {
        list = list.push(
            text(error.clone())
                .size(12)
                .color(Color::from_rgb8(255, 90, 90)),
        );
    }

    column![
        list,
        button(text("Dismiss").size(12))
            .style(button::secondary)
            .on_press(Message::DismissErrors)
            .padding(5),
    ]
    .spacing(6)
    .into()
}

/// Render one output window: its regions side by side, edge to edge.
pub fn render_output_view(app: &App, id: window::Id) -> Element<'_, Message> {
    let Some(session) = app.orchestrator.session() else {
        return blank_output();
    };
    // Indices of a replaced selection no longer point at the session's videos.
    if session.generation != app.media.generation() {
        return blank_output();
    }
    let Some(window) = session.window(id) else {
        return blank_output();
    };

    let regions = window
        .surfaces
        .iter()
        .map(|surface| render_region(app, surface, window.refresh_hz));

    container(row(regions).width(Length::Fill).height(Length::Fill))
        .style(black_background)
        .into()
}

fn blank_output<'a>() -> Element<'a, Message> {
    container("")
        .width(Length::Fill)
        .height(Length::Fill)
        .style(black_background)
        .into()
}

fn render_region<'a>(app: &'a App, surface: &'a Surface, refresh_hz: f32) -> Element<'a, Message> {
    let width = Length::Fixed(surface.region.width);
    let Some(item) = app.media.item(surface.video) else {
        return container("").width(width).height(Length::Fill).into();
    };

    let player = VideoPlayer::new(item.output.video())
        .width(width)
        .height(Length::Fill)
        .content_fit(ContentFit::Cover);

    if !app.config.show_fps_overlay {
        return container(player).width(width).height(Length::Fill).into();
    }

    let rate = surface.monitor.as_ref().and_then(|m| m.rate());
    let overlay = container(
        text(get_fps_display(rate))
            .size(14)
            .shaping(Shaping::Basic)
            .color(get_fps_color(rate, refresh_hz)),
    )
    .padding(10)
    .width(width)
    .height(Length::Fill);

    stack![player, overlay].width(width).height(Length::Fill).into()
}

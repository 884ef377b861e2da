//! UI rendering helpers for the terminal user interface.
//!
//! This module contains functions to render the TUI using `ratatui`.

use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style, Stylize},
    text::Line,
    widgets::{Block, Borders, Gauge, List, ListItem, ListState, Padding, Paragraph, Sparkline, Wrap},
};
use std::{collections::BTreeMap, sync::LazyLock, time::Instant};

use crate::app::{App, InputMode};
use crate::audio::eq::{MAX_GAIN_DB, MIN_GAIN_DB};
use crate::audio::{BAND_COUNT, BAND_FREQUENCIES, MediaOutput, PlaybackStatus};
use crate::config::Settings;
use crate::library::{TrackOrigin, format_duration, format_time, truncate_name};

static CONTROLS_MAP: LazyLock<BTreeMap<&'static str, &'static str>> = LazyLock::new(|| {
    let mut map = BTreeMap::new();
    map.insert("j/k", "up/down");
    map.insert("gg/G", "top/bottom");
    map.insert("enter", "play selected");
    map.insert("space/p", "play/pause");
    map.insert("h/l", "prev/next");
    // H/L is filled dynamically from config.
    map.insert("+/-", "volume");
    map.insert("m", "mute");
    map.insert("[/]", "speed");
    map.insert("s", "shuffle");
    map.insert("r", "repeat");
    map.insert("/", "search");
    map.insert("o", "sort");
    map.insert("a", "add");
    map.insert("C", "clear");
    map.insert("e", "equalizer");
    map.insert("q", "quit");
    map
});

const EQ_CONTROLS: &str =
    "[h/l] band | [j/k] -/+ gain | [1-5] flat/pop/rock/jazz/classical | [e/esc] close";

/// Render the controls help text, incorporating seek seconds.
fn controls_text(seek_seconds: u64) -> String {
    // Keep the rendered order stable and human-friendly.
    let order = [
        "j/k", "h/l", "H/L", "enter", "space/p", "gg/G", "+/-", "m", "[/]", "s", "r", "/", "o",
        "a", "C", "e", "q",
    ];
    order
        .iter()
        .filter_map(|k| {
            if *k == "H/L" {
                Some(format!("[H/L] seek -/+{seek_seconds}s"))
            } else {
                CONTROLS_MAP.get(*k).map(|v| format!("[{k}] {v}"))
            }
        })
        .collect::<Vec<String>>()
        .join(" | ")
}

fn status_label(status: PlaybackStatus) -> &'static str {
    match status {
        PlaybackStatus::Idle => "Stopped",
        PlaybackStatus::Loaded => "Ready",
        PlaybackStatus::Playing => "Playing",
        PlaybackStatus::Paused => "Paused",
    }
}

fn on_off(flag: bool) -> &'static str {
    if flag { "ON" } else { "OFF" }
}

/// A fixed-width bar for one band, centred on 0 dB.
fn eq_bar(gain_db: f32, half_width: usize) -> String {
    let span = MAX_GAIN_DB.max(-MIN_GAIN_DB);
    let filled = ((gain_db.abs() / span) * half_width as f32).round() as usize;
    let filled = filled.min(half_width);
    let empty = half_width - filled;
    if gain_db >= 0.0 {
        format!("{}|{}{}", " ".repeat(half_width), "#".repeat(filled), " ".repeat(empty))
    } else {
        format!("{}{}|{}", " ".repeat(empty), "#".repeat(filled), " ".repeat(half_width))
    }
}

fn band_label(hz: f32) -> String {
    if hz >= 1000.0 {
        format!("{}k", hz / 1000.0)
    } else {
        format!("{hz}")
    }
}

fn status_text<O: MediaOutput>(app: &App<O>) -> String {
    let settings = app.engine.settings();
    let mut parts: Vec<String> = Vec::new();

    match app.now_playing() {
        Some(track) => parts.push(format!(
            "{} - {} - {}",
            track.name, track.artist, track.album
        )),
        None => parts.push("No track loaded".to_string()),
    }
    parts.push(status_label(app.engine.status()).to_string());
    parts.push(format!("Shuffle: {}", on_off(settings.shuffle)));
    parts.push(format!("Repeat: {}", on_off(settings.repeat)));
    parts.push(format!("Speed: {:.2}x", settings.playback_rate));
    parts.push(format!("Volume: {:.0}%", settings.volume * 100.0));

    parts.join(" • ")
}

fn footer_text<O: MediaOutput>(app: &App<O>, settings: &Settings) -> String {
    match &app.mode {
        InputMode::Search => format!("/{}", app.query),
        InputMode::AddPath(path) => format!("Add file or directory: {path}"),
        InputMode::ConfirmClear => {
            format!("Clear all {} tracks? [y] yes | any other key cancels", app.catalog.len())
        }
        InputMode::Equalizer => EQ_CONTROLS.to_string(),
        InputMode::Normal => match app.notice_at(Instant::now()) {
            Some(notice) => notice.to_string(),
            None => controls_text(settings.controls.seek_seconds),
        },
    }
}

fn padded(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .title(title)
        .padding(Padding {
            left: 1,
            right: 0,
            top: 0,
            bottom: 0,
        })
}

/// Render the entire UI into the provided `frame` using `app` state and settings.
pub fn draw<O: MediaOutput>(frame: &mut Frame, app: &mut App<O>, settings: &Settings) {
    app.refresh_spectrum();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Length(3),
            Constraint::Min(1),
            Constraint::Length(3),
            Constraint::Length(4),
        ])
        .split(frame.area());

    // Header
    let header = Paragraph::new(settings.ui.header_text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(" allegro ")
                .title_alignment(Alignment::Center),
        );
    frame.render_widget(header, chunks[0]);

    let status_par = Paragraph::new(status_text(app))
        .block(padded(" now playing "))
        .wrap(Wrap { trim: true });
    frame.render_widget(status_par, chunks[1]);

    draw_progress(frame, app, chunks[2]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[3]);
    draw_playlist(frame, app, body[0]);

    let queue_height = settings.ui.queue_length as u16 + 2;
    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(queue_height),
            Constraint::Length(BAND_COUNT as u16 + 2),
            Constraint::Min(0),
        ])
        .split(body[1]);
    draw_up_next(frame, app, settings.ui.queue_length, side[0]);
    draw_equalizer(frame, app, side[1]);
    if settings.ui.visualizer {
        draw_spectrum(frame, app, side[2]);
    }

    let stats = app.catalog.stats();
    let stats_text = format!(
        "{} tracks • total {} • played {} • listening {}",
        stats.count,
        format_time(stats.total_duration),
        app.session.tracks_played(),
        app.session.listening_label()
    );
    frame.render_widget(
        Paragraph::new(stats_text).block(padded(" stats ")),
        chunks[4],
    );

    let footer = Paragraph::new(footer_text(app, settings))
        .block(padded(" controls "))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[5]);
}

fn draw_progress<O: MediaOutput>(frame: &mut Frame, app: &App<O>, area: Rect) {
    let position = app.engine.position();
    let duration = app.engine.duration();
    let ratio = match duration {
        Some(d) if d > 0.0 => (position / d).clamp(0.0, 1.0),
        _ => 0.0,
    };
    let label = format!("{} / {}", format_time(position), format_duration(duration));
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL))
        .gauge_style(Style::default().add_modifier(Modifier::BOLD))
        .ratio(ratio)
        .label(label);
    frame.render_widget(gauge, area);
}

fn draw_playlist<O: MediaOutput>(frame: &mut Frame, app: &App<O>, area: Rect) {
    let display = app.view_indices();
    let title = if app.query.trim().is_empty() {
        format!(" playlist ({}) ", app.sort.label())
    } else {
        format!(" playlist ({}) /{} ", app.sort.label(), app.query.trim())
    };

    // Only build ListItems for the visible window, centred on the selection.
    let total = display.len();
    let list_height = area.height.saturating_sub(2) as usize;
    let sel_pos = app
        .selected
        .and_then(|s| display.iter().position(|&i| i == s))
        .unwrap_or(0);
    let (start, end, selected_pos_in_visible) = if total <= list_height || list_height == 0 {
        (0, total, sel_pos)
    } else {
        let half = list_height / 2;
        let mut start = sel_pos.saturating_sub(half);
        if start + list_height > total {
            start = total - list_height;
        }
        (start, start + list_height, sel_pos - start)
    };

    let current = app.engine.current_index();
    let visible_items: Vec<ListItem> = display[start..end]
        .iter()
        .filter_map(|&i| app.catalog.get(i).map(|t| (i, t)))
        .map(|(i, track)| {
            let marker = if current == Some(i) { "♪ " } else { "  " };
            let restored = if track.origin == TrackOrigin::Restored {
                " *"
            } else {
                ""
            };
            ListItem::new(format!(
                "{marker}{} - {} [{}]{restored}",
                truncate_name(&track.name, 48),
                track.artist,
                format_duration(track.duration)
            ))
        })
        .collect();

    let list = List::new(visible_items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    let mut state = ListState::default();
    if total > 0 && app.selected.is_some() {
        state.select(Some(selected_pos_in_visible));
    }
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_up_next<O: MediaOutput>(frame: &mut Frame, app: &App<O>, count: usize, area: Rect) {
    let items: Vec<ListItem> = app
        .engine
        .up_next(&app.catalog, count)
        .into_iter()
        .filter_map(|i| app.catalog.get(i))
        .map(|t| ListItem::new(format!("{} [{}]", truncate_name(&t.name, 40), format_duration(t.duration))))
        .collect();
    let list = List::new(items).block(Block::default().borders(Borders::ALL).title(" up next "));
    frame.render_widget(list, area);
}

fn draw_equalizer<O: MediaOutput>(frame: &mut Frame, app: &App<O>, area: Rect) {
    let editing = app.mode == InputMode::Equalizer;
    let (gains, label) = match app.engine.equalizer() {
        Some(eq) => (eq.current_gains(), eq.active_preset().label()),
        None => ([0.0; BAND_COUNT], "inactive"),
    };

    let lines: Vec<Line> = BAND_FREQUENCIES
        .iter()
        .zip(gains)
        .enumerate()
        .map(|(band, (&hz, gain))| {
            let text = format!("{:>4} {:+5.1} dB {}", band_label(hz), gain, eq_bar(gain, 8));
            if editing && band == app.eq_band {
                Line::from(text).reversed()
            } else {
                Line::from(text)
            }
        })
        .collect();

    let title = format!(" equalizer: {label} ");
    let block = if editing {
        padded(&title).bold()
    } else {
        padded(&title)
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_spectrum<O: MediaOutput>(frame: &mut Frame, app: &App<O>, area: Rect) {
    let data: Vec<u64> = app.spectrum().iter().map(|&b| u64::from(b)).collect();
    let sparkline = Sparkline::default()
        .block(Block::default().borders(Borders::ALL).title(" spectrum "))
        .data(data)
        .max(u64::from(u8::MAX));
    frame.render_widget(sparkline, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn controls_text_includes_seek_seconds() {
        let text = controls_text(15);
        assert!(text.contains("[H/L] seek -/+15s"));
        assert!(text.starts_with("[j/k] up/down"));
        assert!(text.ends_with("[q] quit"));
    }

    #[test]
    fn eq_bar_grows_from_the_centre() {
        assert_eq!(eq_bar(0.0, 4), "    |    ");
        assert_eq!(eq_bar(12.0, 4), "    |####");
        assert_eq!(eq_bar(-6.0, 4), "  ##|    ");
    }

    #[test]
    fn band_labels_use_k_suffix() {
        assert_eq!(band_label(32.0), "32");
        assert_eq!(band_label(16000.0), "16k");
        assert_eq!(band_label(1000.0), "1k");
    }
}

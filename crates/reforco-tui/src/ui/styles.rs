use ratatui::style::{Color, Modifier, Style};

use reforco_core::models::LessonStatus;

// Color palette
pub const PRIMARY: Color = Color::Rgb(64, 128, 192);
pub const SECONDARY: Color = Color::Rgb(96, 160, 96);
pub const ACCENT: Color = Color::Rgb(192, 160, 64);
pub const ERROR: Color = Color::Rgb(192, 64, 64);
pub const MUTED: Color = Color::Rgb(128, 128, 128);
pub const HIGHLIGHT: Color = Color::Rgb(48, 48, 64);

// Styles
pub fn title_style() -> Style {
    Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
}

pub fn selected_style() -> Style {
    Style::default().bg(HIGHLIGHT).add_modifier(Modifier::BOLD)
}

pub fn list_item_style() -> Style {
    Style::default().fg(Color::White)
}

pub fn muted_style() -> Style {
    Style::default().fg(MUTED)
}

pub fn highlight_style() -> Style {
    Style::default().fg(ACCENT)
}

pub fn error_style() -> Style {
    Style::default().fg(ERROR)
}

/// Banner shown while serving cached data
pub fn offline_banner_style() -> Style {
    Style::default()
        .bg(ACCENT)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

pub fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(PRIMARY)
    } else {
        Style::default().fg(MUTED)
    }
}

pub fn status_bar_style() -> Style {
    Style::default().bg(Color::Rgb(32, 32, 40)).fg(Color::White)
}

pub fn help_key_style() -> Style {
    Style::default().fg(ACCENT).add_modifier(Modifier::BOLD)
}

pub fn help_desc_style() -> Style {
    Style::default().fg(Color::White)
}

/// Calendar cell for a day of the month
pub fn day_style(has_lessons: bool, is_today: bool, is_selected: bool) -> Style {
    let mut style = if has_lessons {
        Style::default().fg(PRIMARY).add_modifier(Modifier::BOLD)
    } else {
        muted_style()
    };
    if is_today {
        style = style.add_modifier(Modifier::UNDERLINED);
    }
    if is_selected {
        style = style.bg(HIGHLIGHT);
    }
    style
}

pub fn lesson_status_style(status: LessonStatus) -> Style {
    match status {
        LessonStatus::Scheduled => Style::default().fg(PRIMARY),
        LessonStatus::Done => Style::default().fg(SECONDARY),
        LessonStatus::Cancelled => error_style(),
        LessonStatus::Unknown => muted_style(),
    }
}

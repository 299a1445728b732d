use chrono::{Datelike, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, AppState, DataStatus};
use crate::utils::{format_date, format_duration, format_time, truncate_string};

use super::styles;

/// Calendar grid: 7 columns of 4 characters plus borders
const CALENDAR_WIDTH: u16 = 30;

const WEEKDAY_HEADER: &str = " Dom Seg Ter Qua Qui Sex Sáb";

pub fn render(frame: &mut Frame, app: &App) {
    let banner = app.offline_banner();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                                    // Title bar
            Constraint::Length(if banner.is_some() { 1 } else { 0 }), // Offline banner
            Constraint::Min(10),                                      // Main content
            Constraint::Length(2),                                    // Status bar
        ])
        .split(frame.area());

    render_title_bar(frame, app, chunks[0]);
    if let Some(text) = banner {
        render_banner(frame, &text, chunks[1]);
    }
    render_main_content(frame, app, chunks[2]);
    render_status_bar(frame, app, chunks[3]);

    // Render overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Reforço do Saber";
    let month = format!("◀ {} ▶", app.month);
    let help_hint = "[?] Help";

    let used = title.chars().count() + month.chars().count() + help_hint.len() + 4;
    let gap = (area.width as usize).saturating_sub(used) / 2;

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(gap)),
        Span::styled(month, styles::highlight_style()),
        Span::raw(" ".repeat(gap)),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_banner(frame: &mut Frame, text: &str, area: Rect) {
    let text = truncate_string(&format!(" {}  [r]etry", text), area.width as usize);
    let paragraph = Paragraph::new(text).style(styles::offline_banner_style());
    frame.render_widget(paragraph, area);
}

fn render_main_content(frame: &mut Frame, app: &App, area: Rect) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(CALENDAR_WIDTH), Constraint::Min(20)])
        .split(area);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(5), Constraint::Length(7)])
        .split(columns[1]);

    render_calendar(frame, app, columns[0]);
    render_lesson_list(frame, app, right[0]);
    render_lesson_detail(frame, app, right[1]);
}

fn render_calendar(frame: &mut Frame, app: &App, area: Rect) {
    let month = app.month;
    let days = month.group_by_day(&app.lessons);
    let today = Local::now().date_naive();
    let today_day = (today.year() == month.year() && today.month() == month.month())
        .then(|| today.day());
    let selected_day = app.selected_day();

    let mut lines = vec![Line::from(Span::styled(WEEKDAY_HEADER, styles::muted_style()))];

    let mut spans = vec![Span::raw("    ".repeat(month.first_weekday() as usize))];
    for day in 1..=month.days_in_month() {
        let style = styles::day_style(
            days.contains_key(&day),
            today_day == Some(day),
            selected_day == Some(day),
        );
        spans.push(Span::raw(" "));
        spans.push(Span::styled(format!("{:>3}", day), style));

        if (month.first_weekday() + day) % 7 == 0 {
            lines.push(Line::from(std::mem::take(&mut spans)));
        }
    }
    if !spans.is_empty() {
        lines.push(Line::from(spans));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!(" {} aulas em {} dias", app.lessons.len(), days.len()),
        styles::muted_style(),
    )));

    let block = Block::default()
        .title(format!(" {} ", month))
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_lesson_list(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(" Aulas ")
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    if app.lessons.is_empty() {
        let message = match &app.status {
            DataStatus::Loading { .. } => Span::styled(" Carregando...", styles::muted_style()),
            DataStatus::Error(_) => Span::styled(" Sem dados para este mês", styles::error_style()),
            _ => Span::styled(" Nenhuma aula neste mês", styles::muted_style()),
        };
        frame.render_widget(Paragraph::new(Line::from(message)).block(block), area);
        return;
    }

    let name_width = (area.width as usize).saturating_sub(40).max(8);
    let items: Vec<ListItem> = app
        .lessons
        .iter()
        .map(|lesson| {
            let status = lesson.status();
            ListItem::new(Line::from(vec![
                Span::styled(
                    format!(" {} ", lesson.data.as_deref().map(format_date).unwrap_or_default()),
                    styles::muted_style(),
                ),
                Span::styled(
                    format!("{} ", format_time(lesson.horario.as_deref())),
                    styles::list_item_style(),
                ),
                Span::styled(
                    format!("{:<width$} ", truncate_string(&lesson.student_name(), name_width), width = name_width),
                    styles::list_item_style(),
                ),
                Span::styled(status.to_string(), styles::lesson_status_style(status)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(styles::selected_style());

    let mut state = ListState::default();
    state.select(Some(app.selection));
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_lesson_detail(frame: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(false));

    let Some(lesson) = app.selected_lesson() else {
        frame.render_widget(block, area);
        return;
    };

    let field = |label: &'static str, value: String| {
        Line::from(vec![
            Span::styled(format!(" {:<10}", label), styles::muted_style()),
            Span::styled(value, styles::list_item_style()),
        ])
    };

    let mut lines = vec![
        field("Aluno", lesson.student_name()),
        field(
            "Quando",
            format!(
                "{} {} {}",
                lesson.data.as_deref().map(format_date).unwrap_or_default(),
                format_time(lesson.horario.as_deref()),
                format_duration(lesson.duracao.as_deref())
            ),
        ),
        field("Matéria", lesson.materia.clone().unwrap_or_else(|| "-".to_string())),
    ];
    if let Some(serie) = lesson.student.as_ref().and_then(|s| s.serie.clone()) {
        lines.push(field("Série", serie));
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let shortcuts = "←/→ month | [t]oday | [r]etry | [q]uit";

    let left_text = if let Some(ref msg) = app.status_message {
        format!(" {} ", msg)
    } else {
        match &app.status {
            DataStatus::Loading { from_cache: true } => {
                format!(" Showing cached lessons, refreshing {}... ", app.month)
            }
            DataStatus::Loading { from_cache: false } => format!(" Loading {}... ", app.month),
            DataStatus::Fresh => " Up to date ".to_string(),
            DataStatus::Offline { .. } => " Offline ".to_string(),
            DataStatus::Error(_) => " Could not load lessons ".to_string(),
        }
    };
    let left_style = match app.status {
        DataStatus::Error(_) => styles::error_style(),
        DataStatus::Offline { .. } => styles::highlight_style(),
        _ => styles::muted_style(),
    };

    let mut right_text = format!(" {} ", shortcuts);
    if !app.is_configured() {
        right_text = format!(" not configured |{}", right_text);
    }

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());

    let status_line = Line::from(vec![
        Span::styled(left_text, left_style),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn help_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 17, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let help_text = vec![
        Line::from(Span::styled("  Reforço do Saber", styles::title_style())),
        Line::from(Span::styled(format!("  version {}", version), styles::muted_style())),
        Line::from(""),
        Line::from(Span::styled(" Calendar", styles::highlight_style())),
        help_line("←/h →/l", "Previous/next month"),
        help_line("t", "Jump to the current month"),
        help_line("↑/↓", "Select lesson"),
        help_line("PgUp/PgDn", "Scroll lessons"),
        Line::from(""),
        Line::from(Span::styled(" Actions", styles::highlight_style())),
        help_line("r", "Retry loading from the server"),
        help_line("q", "Quit"),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("?", styles::help_key_style()),
            Span::styled(" or ", styles::muted_style()),
            Span::styled("Esc", styles::help_key_style()),
            Span::styled(" to close", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(help_text).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(40, 7, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(
            "   Are you sure you want to quit?",
            styles::highlight_style(),
        )),
        Line::from(""),
        Line::from(vec![
            Span::styled("   Press ", styles::muted_style()),
            Span::styled("[Y]", styles::help_key_style()),
            Span::styled(" to quit, ", styles::muted_style()),
            Span::styled("[N]", styles::help_key_style()),
            Span::styled(" to cancel", styles::muted_style()),
        ]),
    ];

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

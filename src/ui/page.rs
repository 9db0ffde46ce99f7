use crate::app::{App, InputMode, View};
use crate::layout::{PAGE_PREAMBLE_ROWS, online_button_label};
use crate::overlay::OverlayId;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};
use unicode_width::UnicodeWidthStr;

use super::header::trigger_style;
use super::truncate_str;

const FILTER_LABEL: &str = " Filter (/): ";
const FILTER_EDITING_LABEL: &str = " Filter (Enter to apply, Esc to cancel): ";

fn pad(s: &str, width: usize) -> String {
    let s = truncate_str(s, width);
    let fill = width.saturating_sub(s.width());
    format!("{}{}", s, " ".repeat(fill))
}

/// Column header and one line per visible row of the active table.
fn table(app: &App, width: usize) -> (Line<'static>, Vec<Line<'static>>) {
    match app.view {
        View::Users => {
            let email_width = 28;
            let name_width = 18;
            let rest = width.saturating_sub(2 + 6 + name_width + email_width + 3);
            let header = Line::from(Span::styled(
                format!(
                    "  {:>5} {} {} {}",
                    "ID",
                    pad("Username", name_width),
                    pad("Email", email_width),
                    pad("Permissions", rest),
                ),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
            ));
            let rows = app
                .filtered_users
                .iter()
                .filter_map(|&i| app.users.get(i))
                .map(|user| {
                    let permissions = if user.permissions.is_empty() {
                        "-".to_string()
                    } else {
                        user.permissions.join(", ")
                    };
                    Line::from(vec![
                        Span::styled(format!("{:>5} ", user.id), Style::default().fg(Color::DarkGray)),
                        Span::raw(format!("{} ", pad(&user.username, name_width))),
                        Span::styled(
                            format!("{} ", pad(user.email.as_deref().unwrap_or(""), email_width)),
                            Style::default().fg(Color::Gray),
                        ),
                        Span::styled(pad(&permissions, rest), Style::default().fg(Color::Yellow)),
                    ])
                })
                .collect();
            (header, rows)
        }
        View::Permissions => {
            let name_width = width.saturating_sub(2 + 10).min(40);
            let header = Line::from(Span::styled(
                format!("  {} {:>8}", pad("Permission", name_width), "Users"),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::BOLD),
            ));
            let rows = app
                .filtered_permissions
                .iter()
                .filter_map(|&i| app.permissions.get(i))
                .map(|p| {
                    Line::from(vec![
                        Span::raw(format!("{} ", pad(&p.name, name_width))),
                        Span::styled(format!("{:>8}", p.holders), Style::default().fg(Color::Yellow)),
                    ])
                })
                .collect();
            (header, rows)
        }
    }
}

fn render_stats(app: &App, frame: &mut Frame, area: Rect) {
    let mut x = area.x + 1;
    if let Some(button) = app.layout.online_button {
        let active = app.overlays.is_open(OverlayId::OnlineList);
        let label = online_button_label(app.online.total);
        frame.render_widget(
            Paragraph::new(label).style(trigger_style(active)),
            button.intersection(area),
        );
        x = button.right() + 1;
    }
    let stats = Line::from(vec![
        Span::styled("Users: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.users.len().to_string(), Style::default().fg(Color::White)),
        Span::styled("  Permissions: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.permissions.len().to_string(), Style::default().fg(Color::White)),
    ]);
    let rest = Rect::new(x, area.y, area.right().saturating_sub(x), 1);
    frame.render_widget(Paragraph::new(stats), rest);
}

fn render_filter(app: &App, frame: &mut Frame, area: Rect) {
    let (label, style) = match app.input_mode {
        InputMode::Editing => (FILTER_EDITING_LABEL, Style::default().fg(Color::Yellow)),
        InputMode::Normal => (FILTER_LABEL, Style::default().fg(Color::DarkGray)),
    };
    frame.render_widget(
        Paragraph::new(format!("{}{}", label, app.filter)).style(style),
        area,
    );

    // Set cursor position when editing
    if app.input_mode == InputMode::Editing {
        let x = area.x as usize + label.width() + app.filter.width();
        let x = u16::try_from(x).unwrap_or(u16::MAX).min(area.right().saturating_sub(1));
        frame.set_cursor_position((x, area.y));
    }
}

/// The scrollable page: stats strip, filter bar, then the table, offset by
/// the body scroll.
pub fn render(app: &App, frame: &mut Frame) {
    let body = app.layout.body.intersection(frame.area());
    if body.is_empty() {
        return;
    }
    let (columns, rows) = table(app, usize::from(body.width));
    let scroll = usize::from(app.scroll());
    let preamble = usize::from(PAGE_PREAMBLE_ROWS);

    for offset in 0..body.height {
        let page_row = scroll + usize::from(offset);
        let area = Rect::new(body.x, body.y + offset, body.width, 1);

        if page_row == 0 {
            render_stats(app, frame, area);
        } else if page_row == 1 {
            render_filter(app, frame, area);
        } else if page_row == 2 {
            frame.render_widget(Paragraph::new(columns.clone()), area);
        } else {
            let index = page_row - preamble;
            match rows.get(index) {
                Some(line) => {
                    let selected = index == app.selected;
                    let (marker, style) = if selected {
                        (
                            "▸ ",
                            Style::default()
                                .bg(Color::DarkGray)
                                .fg(Color::White)
                                .add_modifier(Modifier::BOLD),
                        )
                    } else {
                        ("  ", Style::default())
                    };
                    let mut spans = vec![Span::raw(marker)];
                    spans.extend(line.spans.iter().cloned());
                    frame.render_widget(Paragraph::new(Line::from(spans)).style(style), area);
                }
                None if index == 0 => {
                    let empty = if app.filter.is_empty() {
                        "  Nothing to show yet (r to reload)"
                    } else {
                        "  No rows match the filter"
                    };
                    frame.render_widget(
                        Paragraph::new(empty).style(Style::default().fg(Color::DarkGray)),
                        area,
                    );
                }
                None => break,
            }
        }
    }
}

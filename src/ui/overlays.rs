//! Navigation overlay content. Sizes are measured here too, so the controller
//! hit-tests exactly what gets drawn.

use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
};
use unicode_width::UnicodeWidthStr;

use super::truncate_str;
use crate::api::OnlineUser;
use crate::app::{AccountAction, App, View};
use crate::overlay::OverlayId;

const ONLINE_TITLE: &str = " Online now ";
const ONLINE_MAX_WIDTH: u16 = 40;

fn as_cells(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}

/// Full-width menu with one row per view.
pub fn mobile_nav_size(viewport_width: u16) -> (u16, u16, usize) {
    (viewport_width, as_cells(View::ALL.len() + 2), View::ALL.len())
}

pub fn user_dropdown_size() -> (u16, u16, usize) {
    let widest = AccountAction::ALL
        .iter()
        .map(|a| a.label().width())
        .max()
        .unwrap_or(0);
    (
        as_cells(widest + 4),
        as_cells(AccountAction::ALL.len() + 2),
        AccountAction::ALL.len(),
    )
}

fn online_row(user: &OnlineUser) -> String {
    format!(" {}  {} ", user.display_name(), user.last_seen)
}

/// Popover listing recent visitors; an empty list still shows one line.
pub fn online_list_size(users: &[OnlineUser], viewport_width: u16) -> (u16, u16, usize) {
    let widest = users
        .iter()
        .map(|u| online_row(u).width())
        .chain(std::iter::once(ONLINE_TITLE.width()))
        .max()
        .unwrap_or(0);
    let width = as_cells(widest + 2)
        .min(ONLINE_MAX_WIDTH)
        .min(viewport_width);
    (width, as_cells(users.len().max(1) + 2), users.len())
}

fn item_style(active: bool) -> Style {
    if active {
        Style::default()
            .bg(Color::DarkGray)
            .fg(Color::White)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::White)
    }
}

pub fn render(app: &App, frame: &mut Frame) {
    // Portaled last: it is on top for hit-testing as well.
    for id in [OverlayId::MobileNav, OverlayId::UserDropdown, OverlayId::OnlineList] {
        let Some(overlay) = app.overlays.registry().get(id) else {
            continue;
        };
        if !overlay.visibility().visible() {
            continue;
        }
        let Some(content) = overlay.content() else {
            continue;
        };
        let area = content.intersection(frame.area());
        if area.is_empty() {
            continue;
        }
        frame.render_widget(Clear, area);

        match id {
            OverlayId::MobileNav => render_mobile_nav(app, frame, area),
            OverlayId::UserDropdown => render_user_dropdown(frame, area),
            OverlayId::OnlineList => render_online(app, frame, area),
        }
    }
}

fn render_mobile_nav(app: &App, frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = View::ALL
        .iter()
        .map(|view| {
            let active = *view == app.view;
            let marker = if active { "▸ " } else { "  " };
            Line::from(Span::styled(
                format!("{}{}", marker, view.label()),
                item_style(active),
            ))
        })
        .collect();

    let menu = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(menu, area);
}

fn render_user_dropdown(frame: &mut Frame, area: Rect) {
    let lines: Vec<Line> = AccountAction::ALL
        .iter()
        .map(|action| {
            let style = match action {
                AccountAction::Quit => Style::default().fg(Color::Red),
                _ => Style::default().fg(Color::White),
            };
            Line::from(Span::styled(format!(" {}", action.label()), style))
        })
        .collect();

    let dropdown = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(dropdown, area);
}

fn render_online(app: &App, frame: &mut Frame, area: Rect) {
    let inner_width = usize::from(area.width.saturating_sub(2));
    let lines: Vec<Line> = if app.online.users.is_empty() {
        vec![Line::from(Span::styled(
            " No one online",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        app.online
            .users
            .iter()
            .map(|user| {
                let stamp = format!(" {} ", user.last_seen);
                let name_width = inner_width.saturating_sub(stamp.width() + 1);
                let name = truncate_str(user.display_name(), name_width);
                let pad = inner_width.saturating_sub(name.width() + 1 + stamp.width());
                let name_style = if user.username.is_some() {
                    Style::default().fg(Color::White)
                } else {
                    Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
                };
                Line::from(vec![
                    Span::raw(" "),
                    Span::styled(name, name_style),
                    Span::raw(" ".repeat(pad)),
                    Span::styled(stamp, Style::default().fg(Color::DarkGray)),
                ])
            })
            .collect()
    };

    let title = if app.online.total > app.online.users.len() {
        format!(" Online now ({} of {}) ", app.online.users.len(), app.online.total)
    } else {
        ONLINE_TITLE.to_string()
    };
    let popover = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green))
            .title(title),
    );
    frame.render_widget(popover, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sizes_count_border_rows() {
        assert_eq!(mobile_nav_size(60), (60, 4, 2));
        // "Refresh data" is the widest label.
        assert_eq!(user_dropdown_size(), (16, 5, 3));
    }

    #[test]
    fn test_online_size_empty_still_has_a_row() {
        let (width, height, items) = online_list_size(&[], 100);
        assert_eq!(width, as_cells(ONLINE_TITLE.width() + 2));
        assert_eq!(height, 3);
        assert_eq!(items, 0);
    }

    #[test]
    fn test_online_size_capped_by_viewport() {
        let users = vec![OnlineUser {
            username: Some("a-very-long-username-that-goes-on-and-on".to_string()),
            last_seen: "10:00".to_string(),
        }];
        assert_eq!(online_list_size(&users, 100).0, ONLINE_MAX_WIDTH);
        assert_eq!(online_list_size(&users, 30).0, 30);
    }
}

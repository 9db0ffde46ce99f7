use crate::app::App;
use crate::layout::{BRAND, MENU_BUTTON, nav_link_label, user_button_label};
use crate::overlay::OverlayId;
use ratatui::{
    Frame,
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Paragraph},
};

/// Highlighted while the trigger's overlay is open.
pub fn trigger_style(active: bool) -> Style {
    if active {
        Style::default()
            .bg(Color::Cyan)
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Cyan)
    }
}

fn put(frame: &mut Frame, area: Rect, text: String, style: Style) {
    let area = area.intersection(frame.area());
    if !area.is_empty() {
        frame.render_widget(Paragraph::new(text).style(style), area);
    }
}

pub fn render(app: &App, frame: &mut Frame) {
    let layout = &app.layout;

    frame.render_widget(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(Color::DarkGray)),
        layout.header,
    );

    if let Some(button) = layout.menu_button {
        let active = app.overlays.is_open(OverlayId::MobileNav);
        put(frame, button, MENU_BUTTON.to_string(), trigger_style(active));
    }

    put(
        frame,
        layout.brand,
        BRAND.to_string(),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    );

    for (view, rect) in &layout.nav_links {
        let style = if *view == app.view {
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        put(frame, *rect, nav_link_label(*view), style);
    }

    let active = app.overlays.is_open(OverlayId::UserDropdown);
    put(
        frame,
        layout.user_button,
        user_button_label(&app.config.admin_name),
        trigger_style(active),
    );
}

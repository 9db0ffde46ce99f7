use crate::app::App;
use crate::toast::ToastKind;
use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
};

fn key_hint(key: &'static str) -> Span<'static> {
    Span::styled(
        key,
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
}

pub fn render(app: &App, frame: &mut Frame) {
    // ── Ticker ──
    if let (Some(area), Some(ticker)) = (app.layout.ticker, app.ticker.as_ref()) {
        let area = area.intersection(frame.area());
        if !area.is_empty() {
            let marquee = Paragraph::new(ticker.window(area.width))
                .style(Style::default().fg(Color::Yellow).bg(Color::Black));
            frame.render_widget(marquee, area);
        }
    }

    // ── Status bar ──
    let area = app.layout.status.intersection(frame.area());
    if area.is_empty() {
        return;
    }

    let line = match app.toasts.current() {
        Some(toast) => {
            let color = match toast.kind {
                ToastKind::Info => Color::Cyan,
                ToastKind::Success => Color::Green,
                ToastKind::Error => Color::Red,
            };
            Line::from(vec![
                Span::styled(format!(" {} ", toast.stamp()), Style::default().fg(Color::DarkGray)),
                Span::styled(
                    toast.message.as_str(),
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                ),
            ])
        }
        None => Line::from(vec![
            key_hint(" ↑↓"),
            Span::raw(" Navigate  "),
            key_hint("/"),
            Span::raw(" Filter  "),
            key_hint("a"),
            Span::raw(" Add  "),
            key_hint("d"),
            Span::raw(" Delete  "),
            key_hint("?"),
            Span::raw(" Help  "),
            key_hint("q"),
            Span::raw(" Quit  "),
            Span::styled(app.status_msg.as_str(), Style::default().fg(Color::DarkGray)),
        ]),
    };
    frame.render_widget(Paragraph::new(line), area);
}

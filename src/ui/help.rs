use ratatui::{
    Frame,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};

use super::centered_rect;

fn section(title: &'static str) -> Line<'static> {
    Line::from(Span::styled(
        title,
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
}

fn binding(keys: &'static str, action: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("    {:<10}", keys), Style::default().fg(Color::Yellow)),
        Span::raw(action),
    ])
}

pub fn render(frame: &mut Frame) {
    let area = centered_rect(70, 80, frame.area());

    // Clear the area behind the popup
    frame.render_widget(Clear, area);

    let help_text = vec![
        Line::from(""),
        section("  Global"),
        binding("?", "Toggle this help"),
        binding("q", "Quit application"),
        binding("Esc", "Close open menus, then cancel"),
        binding("Tab", "Switch between Users and Permissions"),
        binding("r", "Reload users and online visitors"),
        Line::from(""),
        section("  Menus"),
        binding("m", "Navigation menu (narrow terminals)"),
        binding("u", "Account menu"),
        binding("o", "Online visitors"),
        binding("click", "Trigger toggles, outside closes"),
        binding("wheel", "Scroll the page"),
        Line::from(""),
        section("  Tables"),
        binding("↑/k ↓/j", "Navigate up/down"),
        binding("PgUp/PgDn", "Move a page"),
        binding("g/G", "Jump to first/last row"),
        binding("/", "Filter (* and ? wildcards)"),
        binding("a", "Add a user or permission"),
        binding("d/Del", "Delete the selected user"),
        Line::from(""),
        section("  Forms"),
        binding("Tab", "Next field"),
        binding("Enter", "Submit"),
        binding("Esc", "Cancel"),
        Line::from(""),
    ];

    let help = Paragraph::new(help_text)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Help: Keybindings ")
                .title_bottom(
                    Line::from(" Press any key to close ").style(Style::default().fg(Color::DarkGray)),
                ),
        )
        .style(Style::default().fg(Color::White));

    frame.render_widget(help, area);
}

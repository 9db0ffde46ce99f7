use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use super::centered_rect;

/// Answer to a confirmation prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmResult {
    Confirmed,
    Cancelled,
}

/// Yes/no gate in front of a destructive request.
pub struct ConfirmOverlay {
    prompt: String,
    user_id: i64,
}

impl ConfirmOverlay {
    pub fn new(prompt: String, user_id: i64) -> Self {
        Self { prompt, user_id }
    }

    /// The user the pending delete targets.
    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn handle_key(&self, key: KeyEvent) -> Option<ConfirmResult> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                Some(ConfirmResult::Confirmed)
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                Some(ConfirmResult::Cancelled)
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let area = centered_rect(50, 25, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(" Confirm ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let prompt = Paragraph::new(self.prompt.as_str())
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(prompt, chunks[0]);

        let help = Paragraph::new(Line::from(vec![
            Span::styled("y", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::raw(": Delete | "),
            Span::styled("n", Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)),
            Span::raw(": Keep"),
        ]))
        .style(Style::default().fg(Color::DarkGray))
        .alignment(Alignment::Center);
        frame.render_widget(help, chunks[1]);
    }
}

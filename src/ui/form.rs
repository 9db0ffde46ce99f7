use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use unicode_width::UnicodeWidthStr;

use super::centered_rect;
use crate::forms::{Form, FormKind};

/// Result of form input
#[derive(Debug, Clone)]
pub enum FormResult {
    /// User pressed Enter; the caller validates and sends it
    Submit(Form),
    Cancel,
}

/// Modal add-user / add-permission form
pub struct FormOverlay {
    form: Form,
    error_message: Option<String>,
}

impl FormOverlay {
    pub fn new(kind: FormKind) -> Self {
        Self {
            form: Form::for_kind(kind),
            error_message: None,
        }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Handle keyboard input
    pub fn handle_key(&mut self, key: KeyEvent) -> Option<FormResult> {
        match key.code {
            KeyCode::Enter => Some(FormResult::Submit(self.form.clone())),
            KeyCode::Esc => Some(FormResult::Cancel),
            KeyCode::Tab | KeyCode::Down => {
                self.form.focus_next();
                None
            }
            KeyCode::BackTab | KeyCode::Up => {
                self.form.focus_prev();
                None
            }
            KeyCode::Char(c) => {
                self.form.push_char(c);
                self.error_message = None;
                None
            }
            KeyCode::Backspace => {
                self.form.pop_char();
                None
            }
            _ => None,
        }
    }

    /// Show an error under the fields; typing clears it.
    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
    }

    pub fn render(&self, frame: &mut Frame) {
        let fields = self.form.fields();
        let area = centered_rect(60, 60, frame.area());
        frame.render_widget(Clear, area);

        let block = Block::default()
            .title(format!(" {} ", self.form.kind().title()))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let label_width = fields.iter().map(|f| f.label.width()).max().unwrap_or(0) + 2;

        let mut constraints: Vec<Constraint> = fields.iter().map(|_| Constraint::Length(1)).collect();
        constraints.extend([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(1),
        ]);
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints(constraints)
            .split(inner);

        for (i, field) in fields.iter().enumerate() {
            let focused = i == self.form.focus();
            let label_style = if focused {
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            let marker = if field.required { "*" } else { " " };
            let line = Line::from(vec![
                Span::styled(
                    format!(" {:<width$}{}", field.label, marker, width = label_width),
                    label_style,
                ),
                Span::styled(field.display_value(), Style::default().fg(Color::Cyan)),
            ]);
            frame.render_widget(Paragraph::new(line), chunks[i]);

            if focused {
                let x = cursor_column(chunks[i], label_width, field.display_value().width());
                frame.set_cursor_position((x, chunks[i].y));
            }
        }

        // Live preview of the row about to be created
        let preview_area = chunks[fields.len() + 1];
        let mut spans = vec![Span::styled(" Preview ", Style::default().fg(Color::DarkGray))];
        for (column, value) in self.form.preview() {
            spans.push(Span::styled(format!("│ {}: ", column), Style::default().fg(Color::DarkGray)));
            spans.push(Span::styled(value, Style::default().fg(Color::White)));
            spans.push(Span::raw(" "));
        }
        let preview = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
        frame.render_widget(preview, preview_area);

        let footer_area = chunks[fields.len() + 2];
        let footer = if let Some(error) = &self.error_message {
            Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red))
        } else {
            Paragraph::new("Enter: Submit | Tab: Next field | Esc: Cancel")
                .style(Style::default().fg(Color::DarkGray))
        };
        frame.render_widget(footer.alignment(Alignment::Center), footer_area);
    }
}

/// Column just past the typed value, kept inside the field row.
fn cursor_column(row: Rect, label_width: usize, value_width: usize) -> u16 {
    let x = usize::from(row.x) + 1 + label_width + 1 + value_width;
    u16::try_from(x)
        .unwrap_or(u16::MAX)
        .min(row.right().saturating_sub(1))
}

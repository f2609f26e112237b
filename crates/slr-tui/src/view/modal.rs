use ratatui::Frame;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};

use crate::app::{ModalField, ProjectModal};
use crate::theme::Theme;
use crate::view::centered_rect;

/// Render the "new project" modal as a centered popup.
pub fn render(f: &mut Frame, modal: &ProjectModal, theme: &Theme) {
    let popup = centered_rect(56, 9, f.area());

    let field = |label: &'static str, value: &str, active: bool| {
        let label_style = if active {
            Style::default().fg(theme.active).add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(theme.dim)
        };
        let mut spans = vec![
            Span::styled(format!("  {label:<14}"), label_style),
            Span::styled(value.to_string(), Style::default().fg(theme.text)),
        ];
        if active {
            spans.push(Span::styled("\u{2588}", Style::default().fg(theme.active)));
        }
        Line::from(spans)
    };

    let status = if modal.submitting {
        Span::styled("  Creating...", Style::default().fg(theme.spinner))
    } else {
        Span::styled(
            "  Enter: Create   Esc: Cancel   Tab: next field",
            Style::default().fg(theme.dim),
        )
    };

    let lines = vec![
        Line::from(""),
        field("Project ID", &modal.form.id, modal.field == ModalField::Id),
        Line::from(""),
        field("Project name", &modal.form.name, modal.field == ModalField::Name),
        Line::from(""),
        Line::from(status),
    ];

    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(theme.active))
            .title(" New Project "),
    );
    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

use ratatui::Frame;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

use crate::theme::Theme;
use crate::view::centered_rect;

/// Render the help overlay as a centered popup.
pub fn render(f: &mut Frame, theme: &Theme) {
    let popup = centered_rect(64, 36, f.area());

    let lines = vec![
        Line::from(Span::styled(" Keyboard Shortcuts ", theme.header_style())),
        Line::from(""),
        section_header("Navigation", theme),
        key_line("Tab / 1 / 2", "Switch Assistant / Database", theme),
        key_line("j / \u{2193}", "Move down", theme),
        key_line("k / \u{2191}", "Move up", theme),
        key_line("h l / \u{2190} \u{2192}", "Strategy, or Papers / History", theme),
        key_line("g / G", "Top / bottom", theme),
        Line::from(""),
        section_header("Assistant", theme),
        key_line("Enter", "Edit field, select, or generate", theme),
        key_line("Space", "Toggle a site", theme),
        key_line("Enter on query", "Search Google Scholar", theme),
        key_line("y", "Copy query (OSC 52)", theme),
        Line::from(""),
        section_header("Database", theme),
        key_line("/", "Filter papers by title or author", theme),
        key_line("Space", "Mark reviewed / unread", theme),
        key_line("d", "Remove paper", theme),
        key_line("o / f", "Open link / PDF", theme),
        key_line("Enter on query", "Re-run search", theme),
        key_line("r", "Reload", theme),
        Line::from(""),
        section_header("Projects", theme),
        key_line("p / P", "Next / previous project", theme),
        key_line("n", "New project", theme),
        key_line("c", "Reconnect", theme),
        Line::from(""),
        section_header("Global", theme),
        key_line("t", "Switch theme", theme),
        key_line("?", "Toggle this help", theme),
        key_line("q / Ctrl+c", "Quit", theme),
    ];

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(theme.active))
                .title(" Help "),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(Clear, popup);
    f.render_widget(paragraph, popup);
}

fn section_header<'a>(title: &'a str, theme: &Theme) -> Line<'a> {
    Line::from(Span::styled(
        format!("  {title}"),
        Style::default().fg(theme.active).add_modifier(Modifier::BOLD),
    ))
}

fn key_line<'a>(key: &'a str, desc: &'a str, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::styled(format!("    {key:<16}"), Style::default().fg(theme.text)),
        Span::styled(desc, Style::default().fg(theme.dim)),
    ])
}

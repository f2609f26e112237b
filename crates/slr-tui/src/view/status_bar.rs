use ratatui::Frame;
use ratatui::layout::Rect;
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;

use crate::app::{App, DbTab, InputMode, Tab};
use crate::view::spinner_char;

/// Top row: title, connection, project and paper counts.
pub fn render_status(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let connection = if app.connection == slr_core::sidebar::ConnectionStatus::Connecting {
        format!("{} {}", spinner_char(app.tick), app.connection.label())
    } else {
        format!("\u{25CF} {}", app.connection.label())
    };
    let project = match app.projects.selected() {
        Some(p) => format!("{} ({})", p.name, p.id),
        None => app.current_project().to_string(),
    };

    let spans = vec![
        Span::styled(" SLR Partner ", theme.header_style()),
        Span::raw(" "),
        Span::styled(
            connection,
            Style::default().fg(theme.connection_color(app.connection)),
        ),
        Span::styled("  |  ", Style::default().fg(theme.dim)),
        Span::styled("project: ", Style::default().fg(theme.dim)),
        Span::styled(
            project,
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
        Span::styled("  |  ", Style::default().fg(theme.dim)),
        Span::styled(app.papers.stats().to_string(), Style::default().fg(theme.text)),
    ];
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn tab_span(label: &str, active: bool, app: &App) -> Span<'static> {
    let theme = &app.theme;
    if active {
        Span::styled(format!(" {label} "), theme.header_style())
    } else {
        Span::styled(format!(" {label} "), Style::default().fg(theme.dim))
    }
}

/// Second row: main tabs, plus the Database sub-tabs.
pub fn render_tabs(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        tab_span("1 Assistant", app.tab == Tab::Assistant, app),
        Span::raw(" "),
        tab_span("2 Database", app.tab == Tab::Database, app),
    ];
    if app.tab == Tab::Database {
        spans.push(Span::styled("   \u{2502} ", Style::default().fg(app.theme.border)));
        for (label, tab) in [("Papers", DbTab::Papers), ("History", DbTab::History)] {
            let style = if app.db_tab == tab {
                Style::default()
                    .fg(app.theme.active)
                    .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
            } else {
                Style::default().fg(app.theme.dim)
            };
            spans.push(Span::styled(label, style));
            spans.push(Span::raw("  "));
        }
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn hints(app: &App) -> &'static str {
    if app.modal.is_some() {
        return " Tab switch field  Enter create  Esc cancel";
    }
    if app.input_mode == InputMode::TextInput {
        return " type to edit  Enter done  Esc done";
    }
    match app.tab {
        Tab::Assistant => {
            " j/k move  Enter edit/select  Space toggle site  y copy  p project  n new  ? help  q quit"
        }
        Tab::Database => match app.db_tab {
            DbTab::Papers => {
                " h/l sub-tab  / filter  Space reviewed  d remove  o link  f pdf  y copy  r reload  ? help"
            }
            DbTab::History => " h/l sub-tab  Enter re-run  y copy  r reload  ? help  q quit",
        },
    }
}

/// Bottom row: the current notice if there is one, key hints otherwise.
pub fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let line = match &app.notice {
        Some(notice) => Line::from(Span::styled(
            format!(" {}", notice.message),
            Style::default()
                .fg(app.theme.notice_color(notice.kind))
                .add_modifier(Modifier::BOLD),
        )),
        None => Line::from(Span::styled(hints(app), app.theme.footer_style())),
    };
    f.render_widget(Paragraph::new(line), area);
}

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState};
use slr_core::curation::{self, PaperSource};

use crate::app::{App, DbTab, EditTarget};
use crate::theme::Theme;
use crate::view::truncate;

/// Render the Database tab (Papers or History sub-tab).
pub fn render_in(f: &mut Frame, app: &App, area: Rect) {
    match app.db_tab {
        DbTab::Papers => render_papers(f, app, area),
        DbTab::History => render_history(f, app, area),
    }
}

fn empty_state(f: &mut Frame, area: Rect, theme: &Theme, msg: &str, hint: &str, title: &str) {
    let lines = vec![
        Line::from(""),
        Line::from(Span::styled(msg.to_string(), Style::default().fg(theme.text))),
        Line::from(Span::styled(hint.to_string(), Style::default().fg(theme.dim))),
    ];
    let paragraph = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style())
            .title(title.to_string()),
    );
    f.render_widget(paragraph, area);
}

fn render_filter_bar(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let editing = app.editing == Some(EditTarget::Filter);
    let mut spans = vec![
        Span::styled(
            " /",
            Style::default().fg(theme.active).add_modifier(Modifier::BOLD),
        ),
        Span::styled(app.papers.filter().to_string(), Style::default().fg(theme.text)),
    ];
    if editing {
        spans.push(Span::styled("\u{2588}", Style::default().fg(theme.active)));
    } else if app.papers.filter().is_empty() {
        spans.push(Span::styled(
            " search papers...",
            Style::default().fg(theme.dim),
        ));
    }
    if app.paper_source == PaperSource::LocalBuffer {
        spans.push(Span::styled(
            "   backend unreachable, showing local buffer",
            Style::default().fg(theme.warning),
        ));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_papers(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    let chunks = Layout::vertical([
        Constraint::Length(1), // filter bar
        Constraint::Min(3),    // table
        Constraint::Length(4), // detail of the selected paper
    ])
    .split(area);
    render_filter_bar(f, chunks[0], app);

    let papers = app.visible_papers();
    if papers.is_empty() {
        empty_state(
            f,
            chunks[1],
            theme,
            curation::NO_PAPERS,
            curation::NO_PAPERS_HINT,
            " Papers ",
        );
        return;
    }

    let title_width = (chunks[1].width as usize).saturating_sub(40).max(20);
    let rows: Vec<Row> = papers
        .iter()
        .map(|p| {
            let mark = if p.is_reviewed() { "\u{2713}" } else { "\u{25CB}" };
            let authors = if p.authors.is_empty() {
                curation::UNKNOWN_AUTHORS
            } else {
                p.authors.as_str()
            };
            Row::new(vec![
                Cell::from(mark).style(Style::default().fg(theme.status_color(p.status))),
                Cell::from(truncate(&p.title, title_width)),
                Cell::from(truncate(authors, 24)).style(Style::default().fg(theme.dim)),
                Cell::from(p.year.map(|y| y.to_string()).unwrap_or_default()),
                Cell::from(if p.pdf_url.is_some() { "PDF" } else { "" })
                    .style(Style::default().fg(theme.active)),
            ])
        })
        .collect();

    let header = Row::new(vec!["", "Title", "Authors", "Year", ""])
        .style(Style::default().fg(theme.dim).add_modifier(Modifier::BOLD));
    let table = Table::new(
        rows,
        [
            Constraint::Length(2),
            Constraint::Min(20),
            Constraint::Length(24),
            Constraint::Length(5),
            Constraint::Length(4),
        ],
    )
    .header(header)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(theme.border_style())
            .title(format!(" Papers ({}) ", papers.len())),
    )
    .row_highlight_style(theme.highlight_style());

    let mut state = TableState::default().with_selected(Some(app.paper_cursor));
    f.render_stateful_widget(table, chunks[1], &mut state);

    if let Some(paper) = papers.get(app.paper_cursor) {
        let action = if paper.is_reviewed() {
            "Space: Mark Unread"
        } else {
            "Space: Mark Reviewed"
        };
        let lines = vec![
            Line::from(Span::styled(
                paper.title.clone(),
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(paper.url.clone(), Style::default().fg(theme.dim))),
            Line::from(Span::styled(action, Style::default().fg(theme.active))),
        ];
        let detail = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::TOP)
                .border_style(theme.border_style()),
        );
        f.render_widget(detail, chunks[2]);
    }
}

fn render_history(f: &mut Frame, app: &App, area: Rect) {
    let theme = &app.theme;
    if app.history.is_empty() {
        empty_state(
            f,
            area,
            theme,
            curation::NO_HISTORY,
            curation::NO_HISTORY_HINT,
            " Query History ",
        );
        return;
    }

    let query_width = (area.width as usize).saturating_sub(24).max(20);
    let rows: Vec<Row> = app
        .history
        .iter()
        .map(|h| {
            Row::new(vec![
                Cell::from(truncate(&h.query, query_width)),
                Cell::from(h.display_time()).style(Style::default().fg(theme.dim)),
            ])
        })
        .collect();

    let table = Table::new(rows, [Constraint::Min(20), Constraint::Length(17)])
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(theme.border_style())
                .title(" Query History  (Enter to re-run) "),
        )
        .row_highlight_style(theme.highlight_style());

    let mut state = TableState::default().with_selected(Some(app.history_cursor));
    f.render_stateful_widget(table, area, &mut state);
}

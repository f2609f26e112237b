use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use slr_core::assistant::{DEFAULT_SITES, NO_QUERIES};

use crate::app::{App, AssistantFocus, EditTarget};
use crate::theme::Theme;
use crate::view::{scroll_offset, spinner_char, truncate};

const CURSOR: &str = "\u{2588}";

/// Render the Assistant tab: the query form on top, suggestions below.
pub fn render_in(f: &mut Frame, app: &App, area: Rect) {
    let form_rows = 3 + DEFAULT_SITES.len() as u16 + 1;
    let chunks = Layout::vertical([
        Constraint::Length(6),         // abstract
        Constraint::Length(form_rows), // key, strategy, sites, button
        Constraint::Min(3),            // results
    ])
    .split(area);

    render_abstract(f, chunks[0], app);
    render_form(f, chunks[1], app);
    render_results(f, chunks[2], app);
}

fn marker(focused: bool, theme: &Theme) -> Span<'static> {
    if focused {
        Span::styled("\u{25B6} ", Style::default().fg(theme.active))
    } else {
        Span::raw("  ")
    }
}

fn render_abstract(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let editing = app.editing == Some(EditTarget::Abstract);
    let focused = app.assistant.focus == AssistantFocus::Abstract;
    let border = if focused {
        theme.focus_border_style()
    } else {
        theme.border_style()
    };

    let text = &app.assistant.form.abstract_text;
    let mut spans = if text.is_empty() && !editing {
        vec![Span::styled(
            "Describe your research idea or paste an abstract (Enter to edit)",
            Style::default().fg(theme.dim),
        )]
    } else {
        vec![Span::styled(text.as_str(), Style::default().fg(theme.text))]
    };
    if editing {
        spans.push(Span::styled(CURSOR, Style::default().fg(theme.active)));
    }

    let paragraph = Paragraph::new(Line::from(spans))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(border)
                .title(" Idea / Abstract "),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let state = &app.assistant;
    let label = |s: &'static str| Span::styled(s, Style::default().fg(theme.dim));
    let mut lines = Vec::new();

    let editing_key = app.editing == Some(EditTarget::ApiKey);
    let key = &state.form.api_key;
    let mut key_line = vec![
        marker(state.focus == AssistantFocus::ApiKey, theme),
        label("Gemini API key  "),
    ];
    if editing_key {
        key_line.push(Span::styled(key.clone(), Style::default().fg(theme.text)));
        key_line.push(Span::styled(CURSOR, Style::default().fg(theme.active)));
    } else if key.is_empty() {
        key_line.push(Span::styled("not set", Style::default().fg(theme.warning)));
    } else {
        key_line.push(Span::styled(
            "\u{2022}".repeat(key.chars().count().min(24)),
            Style::default().fg(theme.text),
        ));
    }
    lines.push(Line::from(key_line));

    lines.push(Line::from(vec![
        marker(state.focus == AssistantFocus::Strategy, theme),
        label("Strategy        "),
        Span::styled(
            format!("\u{2039} {} \u{203A}", state.strategy_label()),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ),
    ]));

    lines.push(Line::from(vec![Span::raw("  "), label("Sites")]));
    for (i, site) in DEFAULT_SITES.iter().enumerate() {
        let checked = if state.site_selected(site) { "[x]" } else { "[ ]" };
        lines.push(Line::from(vec![
            marker(state.focus == AssistantFocus::Site(i), theme),
            Span::styled(format!("  {checked} {site}"), Style::default().fg(theme.text)),
        ]));
    }

    let button = if state.generating {
        Span::styled(
            format!("{} Generating...", spinner_char(app.tick)),
            Style::default().fg(theme.spinner),
        )
    } else {
        let style = if state.focus == AssistantFocus::Generate {
            theme.header_style()
        } else {
            Style::default().fg(theme.active).add_modifier(Modifier::BOLD)
        };
        Span::styled(" Generate Search Strategies ", style)
    };
    lines.push(Line::from(vec![
        marker(state.focus == AssistantFocus::Generate, theme),
        button,
    ]));

    f.render_widget(Paragraph::new(lines), area);
}

fn render_results(f: &mut Frame, area: Rect, app: &App) {
    let theme = &app.theme;
    let state = &app.assistant;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.border_style())
        .title(" Search Strategies ");
    let inner_width = area.width.saturating_sub(4) as usize;

    let lines: Vec<Line> = if state.generating {
        vec![Line::from(Span::styled(
            "Generating search strategies...",
            Style::default().fg(theme.dim),
        ))]
    } else if let Some(error) = &state.error {
        vec![Line::from(Span::styled(
            error.as_str(),
            Style::default().fg(theme.error),
        ))]
    } else if state.queries.is_empty() {
        let msg = if state.generated { NO_QUERIES } else { "" };
        vec![Line::from(Span::styled(msg, Style::default().fg(theme.dim)))]
    } else {
        let focused = match state.focus {
            AssistantFocus::Query(i) => Some(i),
            _ => None,
        };
        let per_query = 2;
        let height = (area.height.saturating_sub(2) as usize) / per_query;
        let offset = scroll_offset(focused.unwrap_or(0), height);
        state
            .queries
            .iter()
            .enumerate()
            .skip(offset)
            .take(height.max(1))
            .flat_map(|(i, q)| {
                let selected = focused == Some(i);
                let query_style = if selected {
                    theme.highlight_style().fg(theme.text)
                } else {
                    Style::default().fg(theme.text)
                };
                [
                    Line::from(vec![
                        marker(selected, theme),
                        Span::styled(truncate(&q.query, inner_width.saturating_sub(2)), query_style),
                    ]),
                    Line::from(Span::styled(
                        format!("    {}", q.description.as_deref().unwrap_or("")),
                        Style::default().fg(theme.dim),
                    )),
                ]
            })
            .collect()
    };

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

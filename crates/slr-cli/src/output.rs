use std::io::Write;

use owo_colors::OwoColorize;
use slr_core::curation::{self, PaperSource, PaperStats};
use slr_core::sidebar::ConnectionStatus;
use slr_core::toggle::ButtonState;
use slr_core::{Config, Paper, Project, QueryHistoryEntry, QuerySuggestion, ReviewStatus};

/// Whether to use colored output.
#[derive(Debug, Clone, Copy)]
pub struct ColorMode(pub bool);

impl ColorMode {
    pub fn enabled(&self) -> bool {
        self.0
    }
}

pub fn print_connection(
    w: &mut dyn Write,
    base_url: &str,
    status: ConnectionStatus,
    color: ColorMode,
) -> std::io::Result<()> {
    if color.enabled() {
        let label = match status {
            ConnectionStatus::Connected => status.label().green().to_string(),
            _ => status.label().red().to_string(),
        };
        writeln!(w, "{} {}", label, base_url.dimmed())
    } else {
        writeln!(w, "{} {}", status.label(), base_url)
    }
}

pub fn print_projects(
    w: &mut dyn Write,
    projects: &[Project],
    selected: &str,
    color: ColorMode,
) -> std::io::Result<()> {
    for project in projects {
        let marker = if project.id == selected { "*" } else { " " };
        if color.enabled() {
            writeln!(w, "{} {}  {}", marker.cyan(), project.id.bold(), project.name)?;
        } else {
            writeln!(w, "{} {}  {}", marker, project.id, project.name)?;
        }
    }
    Ok(())
}

fn status_mark(status: ReviewStatus) -> &'static str {
    match status {
        ReviewStatus::Reviewed => "✓",
        ReviewStatus::Unread => "○",
    }
}

/// One paper card: status, title, authors/year and links.
pub fn print_paper(w: &mut dyn Write, paper: &Paper, color: ColorMode) -> std::io::Result<()> {
    let mark = status_mark(paper.status);
    let authors = if paper.authors.is_empty() {
        curation::UNKNOWN_AUTHORS
    } else {
        &paper.authors
    };
    let meta = match paper.year {
        Some(year) => format!("{} ({})", authors, year),
        None => authors.to_string(),
    };

    if color.enabled() {
        let mark = if paper.is_reviewed() {
            mark.green().to_string()
        } else {
            mark.dimmed().to_string()
        };
        writeln!(w, "{} {}", mark, paper.title.bold())?;
        writeln!(w, "  {}", meta.dimmed())?;
        writeln!(w, "  id: {}", paper.id.cyan())?;
    } else {
        writeln!(w, "{} {}", mark, paper.title)?;
        writeln!(w, "  {}", meta)?;
        writeln!(w, "  id: {}", paper.id)?;
    }
    if !paper.url.is_empty() {
        writeln!(w, "  link: {}", paper.url)?;
    }
    if let Some(pdf) = &paper.pdf_url {
        writeln!(w, "  pdf:  {}", pdf)?;
    }
    Ok(())
}

pub fn print_papers(
    w: &mut dyn Write,
    papers: &[&Paper],
    source: PaperSource,
    stats: PaperStats,
    color: ColorMode,
) -> std::io::Result<()> {
    if source == PaperSource::LocalBuffer {
        let msg = "Backend unreachable; showing locally buffered papers.";
        if color.enabled() {
            writeln!(w, "{}", msg.yellow())?;
        } else {
            writeln!(w, "{}", msg)?;
        }
    }
    if papers.is_empty() {
        writeln!(w, "{}", curation::NO_PAPERS)?;
        if color.enabled() {
            writeln!(w, "{}", curation::NO_PAPERS_HINT.dimmed())?;
        } else {
            writeln!(w, "{}", curation::NO_PAPERS_HINT)?;
        }
    } else {
        for paper in papers {
            print_paper(w, paper, color)?;
        }
    }
    writeln!(w)?;
    if color.enabled() {
        writeln!(w, "{}", stats.to_string().bold())
    } else {
        writeln!(w, "{}", stats)
    }
}

pub fn print_history(
    w: &mut dyn Write,
    history: &[QueryHistoryEntry],
    color: ColorMode,
) -> std::io::Result<()> {
    if history.is_empty() {
        writeln!(w, "{}", curation::NO_HISTORY)?;
        if color.enabled() {
            return writeln!(w, "{}", curation::NO_HISTORY_HINT.dimmed());
        }
        return writeln!(w, "{}", curation::NO_HISTORY_HINT);
    }
    for (i, entry) in history.iter().enumerate() {
        if color.enabled() {
            writeln!(
                w,
                "{:>3}. {}  {}",
                i + 1,
                entry.query,
                entry.display_time().dimmed()
            )?;
        } else {
            writeln!(w, "{:>3}. {}  {}", i + 1, entry.query, entry.display_time())?;
        }
    }
    Ok(())
}

pub fn print_queries(
    w: &mut dyn Write,
    queries: &[QuerySuggestion],
    color: ColorMode,
) -> std::io::Result<()> {
    if queries.is_empty() {
        return writeln!(w, "{}", slr_core::assistant::NO_QUERIES);
    }
    for (i, q) in queries.iter().enumerate() {
        if color.enabled() {
            writeln!(w, "{:>3}. {}", (i + 1).cyan(), q.query.bold())?;
        } else {
            writeln!(w, "{:>3}. {}", i + 1, q.query)?;
        }
        if let Some(desc) = q.description.as_deref().filter(|d| !d.is_empty()) {
            if color.enabled() {
                writeln!(w, "     {}", desc.dimmed())?;
            } else {
                writeln!(w, "     {}", desc)?;
            }
        }
    }
    Ok(())
}

/// Result of one toggle activation, e.g. `Saved  Attention is all you need`.
pub fn print_toggle(
    w: &mut dyn Write,
    paper: &Paper,
    state: ButtonState,
    color: ColorMode,
) -> std::io::Result<()> {
    let label = format!("{:<9}", state.label());
    if color.enabled() {
        let label = match state {
            ButtonState::Saved => label.green().to_string(),
            ButtonState::Saving => label.yellow().to_string(),
            ButtonState::New => label.dimmed().to_string(),
        };
        writeln!(w, "{} {}", label, paper.title)
    } else {
        writeln!(w, "{} {}", label, paper.title)
    }
}

pub fn print_success(w: &mut dyn Write, msg: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{}", msg.green())
    } else {
        writeln!(w, "{}", msg)
    }
}

pub fn print_warning(w: &mut dyn Write, msg: &str, color: ColorMode) -> std::io::Result<()> {
    if color.enabled() {
        writeln!(w, "{} {}", "WARNING:".yellow(), msg)
    } else {
        writeln!(w, "WARNING: {}", msg)
    }
}

pub fn print_config(w: &mut dyn Write, config: &Config, color: ColorMode) -> std::io::Result<()> {
    let key = match &config.api_key {
        Some(k) if k.len() > 4 => format!("{}...", &k[..4]),
        Some(_) => "set".to_string(),
        None => "not set".to_string(),
    };
    let timeout = config
        .timeout_secs
        .map(|t| format!("{}s", t))
        .unwrap_or_else(|| "client default".to_string());
    let storage = config
        .storage_path
        .clone()
        .or_else(slr_core::store::default_path)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "in memory".to_string());
    let rows = [
        ("backend", config.base_url.clone()),
        ("timeout", timeout),
        ("api key", key),
        ("strategy", config.strategy.clone()),
        ("sites", config.sites.join(", ")),
        ("storage", storage),
        ("theme", config.theme.clone()),
    ];
    for (name, value) in rows {
        if color.enabled() {
            writeln!(w, "{:<9} {}", name.bold(), value)?;
        } else {
            writeln!(w, "{:<9} {}", name, value)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(f: impl FnOnce(&mut Vec<u8>) -> std::io::Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn paper_without_authors_says_unknown() {
        let out = render(|w| print_paper(w, &Paper::new("x", "Untitled"), ColorMode(false)));
        assert!(out.contains("○ Untitled"));
        assert!(out.contains("Unknown authors"));
        assert!(!out.contains("pdf:"));
    }

    #[test]
    fn empty_list_shows_hint_and_stats() {
        let out = render(|w| {
            print_papers(
                w,
                &[],
                PaperSource::Backend,
                PaperStats::default(),
                ColorMode(false),
            )
        });
        assert!(out.contains("No papers found."));
        assert!(out.contains("0 papers | 0 reviewed"));
    }

    #[test]
    fn history_is_numbered_from_one() {
        let history = vec![QueryHistoryEntry {
            query: "llm review".into(),
            timestamp: "not a time".into(),
            project_id: "default".into(),
        }];
        let out = render(|w| print_history(w, &history, ColorMode(false)));
        assert_eq!(out, "  1. llm review  not a time\n");
    }

    #[test]
    fn api_key_is_masked() {
        let config = Config {
            api_key: Some("AIzaSyExample".into()),
            ..Config::default()
        };
        let out = render(|w| print_config(w, &config, ColorMode(false)));
        assert!(out.contains("AIza..."));
        assert!(!out.contains("AIzaSyExample"));
    }
}

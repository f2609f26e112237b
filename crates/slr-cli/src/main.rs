use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use slr_core::assistant::{self, QueryForm};
use slr_core::config_file::{self, ConfigFile};
use slr_core::curation::{self, PaperCollection};
use slr_core::scholar::{self, ResultScanner};
use slr_core::sidebar::{self, NewProjectForm, ProjectSelector};
use slr_core::toggle::AddToggle;
use slr_core::{
    Backend, BackendClient, Config, DEFAULT_PROJECT_ID, LocalStore, Paper, Relay, ReviewStatus,
    RuntimeMessage,
};
use tokio::sync::broadcast;

mod output;

use output::ColorMode;

/// SLR Partner - collect papers from Google Scholar and curate them per project
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Project to work in (default: the stored current project)
    #[arg(long, global = true)]
    project: Option<String>,

    /// Backend base URL [env: SLR_BACKEND_URL]
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Check whether the backend is reachable
    Health,

    /// List, create or switch projects
    Projects {
        #[command(subcommand)]
        action: ProjectsAction,
    },

    /// Extract papers from a saved Google Scholar results page
    Scrape {
        /// Path to the saved HTML page
        html_file: PathBuf,

        /// Save every extracted paper to the current project
        #[arg(long, conflicts_with = "remove")]
        add: bool,

        /// Remove every extracted paper again
        #[arg(long)]
        remove: bool,

        /// Route additions and removals through the background relay
        #[arg(long)]
        relay: bool,
    },

    /// Browse and curate collected papers
    Papers {
        #[command(subcommand)]
        action: PapersAction,
    },

    /// Generate Google Scholar queries from an abstract
    Generate {
        /// Research idea or abstract
        #[arg(long = "abstract")]
        abstract_text: String,

        /// Search strategy: balanced, broad or precise
        #[arg(long)]
        strategy: Option<String>,

        /// Restrict queries to a site (repeatable)
        #[arg(long = "site")]
        sites: Vec<String>,

        /// Gemini API key [env: GEMINI_API_KEY]; saved for next time
        #[arg(long)]
        api_key: Option<String>,

        /// Open suggestion N in the browser and log it to history
        #[arg(long)]
        open: Option<usize>,
    },

    /// Show, log or re-run executed queries
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Show or save the resolved configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProjectsAction {
    /// List projects; the current one is marked with *
    List,
    /// Create a project
    Create { id: String, name: String },
    /// Make a project current
    Use { id: String },
}

#[derive(Subcommand, Debug)]
enum PapersAction {
    /// List papers of the current project
    List {
        /// Only show papers whose title or authors contain this text
        #[arg(long)]
        filter: Option<String>,
    },
    /// Set a paper's review status
    Status { id: String, status: ReviewStatus },
    /// Flip a paper between unread and reviewed
    Toggle { id: String },
    /// Remove a paper from the backend and the local buffer
    Remove { id: String },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    /// List executed queries of the current project
    List,
    /// Open a query on Google Scholar and record it
    Log { query: String },
    /// Re-open history entry N
    Rerun { n: usize },
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the resolved configuration
    Show,
    /// Write the resolved configuration to the user config file
    Save,
}

/// Everything a command needs.
struct Ctx {
    config: Config,
    backend: Arc<BackendClient>,
    store: Arc<LocalStore>,
    project: String,
    color: ColorMode,
}

impl Ctx {
    fn dyn_backend(&self) -> Arc<dyn Backend> {
        self.backend.clone()
    }
}

fn resolve_config(cli: &Cli) -> Config {
    let mut config = Config::default();
    config_file::load_config().apply(&mut config);
    config_file::apply_env(&mut config);
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    if let Some(t) = cli.timeout {
        config.timeout_secs = Some(t);
    }
    config
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner:.green} {msg}").unwrap());
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = resolve_config(&cli);
    let store = Arc::new(config.open_store());
    let project = match &cli.project {
        Some(p) => p.clone(),
        None => store
            .current_project()
            .ok()
            .flatten()
            .unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string()),
    };
    let ctx = Ctx {
        backend: Arc::new(BackendClient::from_config(&config)),
        config,
        store,
        project,
        color: ColorMode(!cli.no_color),
    };
    let mut out = std::io::stdout();

    match cli.command {
        Command::Health => health(&ctx, &mut out).await,
        Command::Projects { action } => projects(&ctx, action, &mut out).await,
        Command::Scrape {
            html_file,
            add,
            remove,
            relay,
        } => scrape(&ctx, &html_file, add, remove, relay, &mut out).await,
        Command::Papers { action } => papers(&ctx, action, &mut out).await,
        Command::Generate {
            abstract_text,
            strategy,
            sites,
            api_key,
            open,
        } => {
            let form = QueryForm {
                abstract_text,
                strategy: strategy.unwrap_or_else(|| ctx.config.strategy.clone()),
                sites: if sites.is_empty() {
                    ctx.config.sites.clone()
                } else {
                    sites
                },
                api_key: api_key
                    .or_else(|| ctx.config.api_key.clone())
                    .or_else(|| ctx.store.api_key().ok().flatten())
                    .unwrap_or_default(),
            };
            generate(&ctx, form, open, &mut out).await
        }
        Command::History { action } => history(&ctx, action, &mut out).await,
        Command::Config { action } => config_cmd(&ctx, action, &mut out),
    }
}

async fn health(ctx: &Ctx, out: &mut dyn Write) -> anyhow::Result<()> {
    let status = sidebar::check_connection(ctx.backend.as_ref()).await;
    output::print_connection(out, ctx.backend.base_url(), status, ctx.color)?;
    if status.is_connected() {
        match ctx.backend.server_health().await {
            Ok(true) => writeln!(out, "server root healthy")?,
            Ok(false) => output::print_warning(out, "server root is not healthy", ctx.color)?,
            Err(e) => output::print_warning(out, &e.to_string(), ctx.color)?,
        }
        Ok(())
    } else {
        anyhow::bail!("backend at {} is offline", ctx.backend.base_url())
    }
}

async fn projects(ctx: &Ctx, action: ProjectsAction, out: &mut dyn Write) -> anyhow::Result<()> {
    match action {
        ProjectsAction::List => {
            let mut selector = ProjectSelector::with_selected(ctx.project.clone());
            selector.replace_options(sidebar::load_projects(ctx.backend.as_ref()).await?);
            output::print_projects(out, selector.options(), selector.selected_id(), ctx.color)?;
        }
        ProjectsAction::Create { id, name } => {
            let form = NewProjectForm { id, name };
            let project = sidebar::create_project(ctx.backend.as_ref(), &form).await?;
            output::print_success(
                out,
                &format!("Created project {} ({})", project.id, project.name),
                ctx.color,
            )?;
        }
        ProjectsAction::Use { id } => {
            let mut selector = ProjectSelector::new();
            selector.replace_options(sidebar::load_projects(ctx.backend.as_ref()).await?);
            if !selector.select(&id) {
                anyhow::bail!("no project with id '{}'", id);
            }
            ctx.store.set_current_project(&id)?;
            output::print_success(out, &format!("Now working in {}", id), ctx.color)?;
        }
    }
    Ok(())
}

async fn scrape(
    ctx: &Ctx,
    html_file: &Path,
    add: bool,
    remove: bool,
    relay: bool,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    if !html_file.exists() {
        anyhow::bail!("File not found: {}", html_file.display());
    }
    let html = std::fs::read_to_string(html_file)
        .with_context(|| format!("reading {}", html_file.display()))?;

    let mut scanner = ResultScanner::new();
    let papers: Vec<_> = scanner
        .scan(&html)
        .into_iter()
        .map(|p| p.with_project(&ctx.project))
        .collect();

    if !add && !remove {
        for paper in &papers {
            output::print_paper(out, paper, ctx.color)?;
        }
        writeln!(out, "\n{} results", papers.len())?;
        return Ok(());
    }

    if relay {
        relay_papers(ctx.dyn_backend(), ctx.store.clone(), &ctx.project, papers, add).await?;
        return output::print_success(out, "Relay finished", ctx.color).map_err(Into::into);
    }

    let (updates, _) = broadcast::channel(16);
    let pb = spinner("Saving papers...");
    let mut results = Vec::with_capacity(papers.len());
    for paper in papers {
        let mut toggle = if add {
            AddToggle::new(paper)
        } else {
            AddToggle::saved(paper)
        };
        pb.set_message(toggle.paper().title.clone());
        let state = toggle
            .activate(ctx.backend.as_ref(), &ctx.store, &updates)
            .await;
        results.push((toggle, state));
    }
    pb.finish_and_clear();
    for (toggle, state) in &results {
        output::print_toggle(out, toggle.paper(), *state, ctx.color)?;
    }
    Ok(())
}

/// Push selections or deselections through the background relay and wait
/// until it has handled all of them. Selections go to `project_id`.
async fn relay_papers(
    backend: Arc<dyn Backend>,
    store: Arc<LocalStore>,
    project_id: &str,
    papers: Vec<Paper>,
    add: bool,
) -> anyhow::Result<()> {
    let (tx, handle) = Relay::new(backend, store).with_project(project_id).spawn();
    for paper in papers {
        let message = if add {
            RuntimeMessage::PaperSelected(paper)
        } else {
            RuntimeMessage::PaperRemoved(paper)
        };
        tx.send(message).await?;
    }
    tx.close();
    handle.await?;
    Ok(())
}

async fn papers(ctx: &Ctx, action: PapersAction, out: &mut dyn Write) -> anyhow::Result<()> {
    let backend = ctx.backend.as_ref();
    match action {
        PapersAction::List { filter } => {
            let loaded = curation::load_papers(backend, &ctx.store, &ctx.project).await;
            let mut collection = PaperCollection::new(loaded.papers);
            if let Some(f) = &filter {
                collection.set_filter(f);
            }
            output::print_papers(
                out,
                &collection.visible(),
                loaded.source,
                collection.stats(),
                ctx.color,
            )?;
        }
        PapersAction::Status { id, status } => {
            backend.update_status(&id, status).await?;
            output::print_success(out, &format!("{} marked {}", id, status), ctx.color)?;
        }
        PapersAction::Toggle { id } => {
            let loaded = curation::load_papers(backend, &ctx.store, &ctx.project).await;
            let collection = PaperCollection::new(loaded.papers);
            let paper = collection
                .get(&id)
                .ok_or_else(|| anyhow::anyhow!("no paper '{}' in project {}", id, ctx.project))?;
            let status = curation::toggle_status(backend, paper).await?;
            output::print_success(out, &format!("{} marked {}", id, status), ctx.color)?;
        }
        PapersAction::Remove { id } => {
            curation::remove_paper(backend, &ctx.store, &id).await?;
            output::print_success(out, &format!("Removed {}", id), ctx.color)?;
        }
    }
    Ok(())
}

async fn generate(
    ctx: &Ctx,
    form: QueryForm,
    open: Option<usize>,
    out: &mut dyn Write,
) -> anyhow::Result<()> {
    let pb = spinner("Generating queries...");
    let result = assistant::generate_queries(ctx.backend.as_ref(), &form).await;
    pb.finish_and_clear();

    let queries = match result {
        Ok(q) => q,
        Err(e) if e.is_warning() => {
            output::print_warning(out, &e.to_string(), ctx.color)?;
            return Ok(());
        }
        Err(e) => anyhow::bail!(e),
    };
    if let Err(e) = ctx.store.set_api_key(form.api_key.trim()) {
        tracing::warn!(error = %e, "could not remember API key");
    }
    output::print_queries(out, &queries, ctx.color)?;

    if let Some(n) = open {
        let suggestion = n
            .checked_sub(1)
            .and_then(|i| queries.get(i))
            .ok_or_else(|| anyhow::anyhow!("no suggestion number {}", n))?;
        open_and_log(ctx, &suggestion.query).await?;
    }
    Ok(())
}

/// Open a Scholar search and record it, waiting for the log request.
async fn open_and_log(ctx: &Ctx, query: &str) -> anyhow::Result<()> {
    assistant::open_url(&scholar::scholar_search_url(query))
        .context("could not launch a browser")?;
    ctx.backend.log_query(query, &ctx.project).await?;
    Ok(())
}

async fn history(ctx: &Ctx, action: HistoryAction, out: &mut dyn Write) -> anyhow::Result<()> {
    match action {
        HistoryAction::List => {
            let entries = curation::load_history(ctx.backend.as_ref(), &ctx.project).await;
            output::print_history(out, &entries, ctx.color)?;
        }
        HistoryAction::Log { query } => {
            open_and_log(ctx, &query).await?;
            output::print_success(out, &format!("Opened {}", query), ctx.color)?;
        }
        HistoryAction::Rerun { n } => {
            let query = rerun_history(ctx.backend.as_ref(), &ctx.project, n, assistant::open_url)
                .await?;
            output::print_success(out, &format!("Opened {}", query), ctx.color)?;
        }
    }
    Ok(())
}

/// Open history entry `n` (1-based) again. The entry is already in the
/// history, so nothing new is logged.
async fn rerun_history(
    backend: &dyn Backend,
    project_id: &str,
    n: usize,
    open: impl FnOnce(&str) -> std::io::Result<()>,
) -> anyhow::Result<String> {
    let entries = curation::load_history(backend, project_id).await;
    let entry = n
        .checked_sub(1)
        .and_then(|i| entries.get(i))
        .ok_or_else(|| anyhow::anyhow!("no history entry number {}", n))?;
    open(&scholar::scholar_search_url(&entry.query)).context("could not launch a browser")?;
    Ok(entry.query.clone())
}

fn config_cmd(ctx: &Ctx, action: ConfigAction, out: &mut dyn Write) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => output::print_config(out, &ctx.config, ctx.color)?,
        ConfigAction::Save => {
            let path = config_file::save_config(&ConfigFile::from_config(&ctx.config))
                .map_err(|e| anyhow::anyhow!(e))?;
            output::print_success(out, &format!("Saved {}", path.display()), ctx.color)?;
        }
    }
    Ok(())
}

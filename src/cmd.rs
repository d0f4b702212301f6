//! Command implementations for the CLI interface.
//!
//! Each handler loads what it needs from the record store, runs one of the
//! library engines and prints the result. Mutating commands go through the
//! same layout intents the Gantt view relays.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing::{info, warn};

use pmtrack::config::Config;
use pmtrack::db::{print_task_table, Database};
use pmtrack::fields::TaskColumn;
use pmtrack::layout::{GanttLayout, IntentSink, LayoutIntent, TaskChanges, TaskDraft};
use pmtrack::status::compute_status;
use pmtrack::table::{
    distinct_options, filter_options, parse_filter_spec, parse_sort_spec, FilterSortState,
    TaskRow, NONE_LABEL,
};
use pmtrack::task::{parse_date, DateValue, TaskStatusData};
use pmtrack::weekly::{
    metric_trend_with_limit, unreviewed_customers, week_options, weekly_health_summary, WeekWindow,
};

#[derive(Subcommand)]
pub enum Commands {
    /// Derive a task's display status from its dates.
    Status {
        /// Read the dates from this stored task instead of the flags.
        #[arg(long)]
        task: Option<String>,
        #[arg(long)]
        planned_start: Option<String>,
        #[arg(long)]
        planned_end: Option<String>,
        #[arg(long)]
        actual_start: Option<String>,
        #[arg(long)]
        actual_end: Option<String>,
        /// Evaluate as of this day instead of today (YYYY-MM-DD).
        #[arg(long)]
        today: Option<String>,
    },

    /// List tasks with derived status.
    List {
        /// Column filter COLUMN=V1,V2. May be repeated; values OR, columns AND.
        #[arg(long = "filter")]
        filters: Vec<String>,
        /// Sort COLUMN[:asc|desc].
        #[arg(long)]
        sort: Option<String>,
        /// Only tasks in this step.
        #[arg(long)]
        step: Option<String>,
        /// Render the hierarchical Gantt layout.
        #[arg(long)]
        tree: bool,
        #[arg(long)]
        today: Option<String>,
    },

    /// Show a column's filter options in presentation order.
    Options {
        #[arg(value_enum)]
        column: TaskColumn,
        /// Case-insensitive label search.
        #[arg(long, default_value = "")]
        search: String,
        /// Currently selected values. May be repeated.
        #[arg(long = "selected")]
        selected: Vec<String>,
        #[arg(long)]
        today: Option<String>,
    },

    /// Add a root task to a step, or a subtask under a root task.
    Add {
        title: String,
        /// Step the task belongs to (ignored for subtasks).
        #[arg(long)]
        step: Option<String>,
        /// Root task to nest this one under.
        #[arg(long)]
        parent: Option<String>,
        #[arg(long)]
        details: Option<String>,
        #[arg(long)]
        planned_start: Option<String>,
        #[arg(long)]
        planned_end: Option<String>,
        #[arg(long)]
        actual_start: Option<String>,
        #[arg(long)]
        actual_end: Option<String>,
    },

    /// Update a task's title, details or dates.
    Update {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        details: Option<String>,
        #[arg(long)]
        planned_start: Option<String>,
        #[arg(long)]
        planned_end: Option<String>,
        #[arg(long)]
        actual_start: Option<String>,
        #[arg(long)]
        actual_end: Option<String>,
        #[arg(long)]
        clear_planned_start: bool,
        #[arg(long)]
        clear_planned_end: bool,
        #[arg(long)]
        clear_actual_start: bool,
        #[arg(long)]
        clear_actual_end: bool,
    },

    /// Delete a task and its subtasks.
    Delete { id: String },

    /// List the reporting weeks present in the metrics.
    Weeks,

    /// Weekly health summary. Defaults to the most recent week.
    Health {
        #[arg(long, requires = "to")]
        from: Option<String>,
        #[arg(long, requires = "from")]
        to: Option<String>,
    },

    /// Recent values of one metric for one customer, oldest first.
    Trend {
        customer: String,
        metric: String,
        /// Number of weeks (defaults to the configured trend window).
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export the task view with derived status to CSV.
    Export {
        /// Output file path (default: tasks.csv)
        #[arg(long, short)]
        output: Option<String>,
        #[arg(long = "filter")]
        filters: Vec<String>,
        #[arg(long)]
        sort: Option<String>,
        #[arg(long)]
        today: Option<String>,
    },

    /// Generate shell completion scripts.
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Dispatch a parsed command.
pub fn run(command: Commands, config: &Config, db_path: &Path) -> Result<()> {
    if let Commands::Completions { shell } = command {
        cmd_completions(shell);
        return Ok(());
    }

    let mut db = Database::load(db_path)
        .with_context(|| format!("loading store {}", db_path.display()))?;

    match command {
        Commands::Status { task, planned_start, planned_end, actual_start, actual_end, today } => {
            cmd_status(&db, task, planned_start, planned_end, actual_start, actual_end, today)
        }
        Commands::List { filters, sort, step, tree, today } => {
            cmd_list(&db, config, filters, sort, step, tree, today)
        }
        Commands::Options { column, search, selected, today } => {
            cmd_options(&db, column, search, selected, today)
        }
        Commands::Add {
            title, step, parent, details, planned_start, planned_end, actual_start, actual_end,
        } => cmd_add(
            &mut db, db_path, title, step, parent, details, planned_start, planned_end,
            actual_start, actual_end,
        ),
        Commands::Update {
            id, title, details, planned_start, planned_end, actual_start, actual_end,
            clear_planned_start, clear_planned_end, clear_actual_start, clear_actual_end,
        } => {
            let changes = TaskChanges {
                title,
                details,
                planned_start: date_change(planned_start, clear_planned_start)?,
                planned_end: date_change(planned_end, clear_planned_end)?,
                actual_start: date_change(actual_start, clear_actual_start)?,
                actual_end: date_change(actual_end, clear_actual_end)?,
            };
            cmd_update(&mut db, db_path, id, changes)
        }
        Commands::Delete { id } => cmd_delete(&mut db, db_path, id),
        Commands::Weeks => cmd_weeks(&db),
        Commands::Health { from, to } => cmd_health(&db, from, to),
        Commands::Trend { customer, metric, limit } => {
            cmd_trend(&db, customer, metric, limit.unwrap_or(config.trend_window))
        }
        Commands::Export { output, filters, sort, today } => {
            cmd_export(&db, output, filters, sort, today)
        }
        Commands::Completions { .. } => unreachable!("completions handled above"),
    }
}

fn resolve_today(today: Option<String>) -> Result<NaiveDate> {
    match today {
        Some(s) => Ok(parse_date(&s)?),
        None => Ok(Local::now().date_naive()),
    }
}

fn parse_opt_date(s: Option<String>) -> Result<Option<DateValue>> {
    Ok(match s {
        Some(s) => Some(DateValue::Date(parse_date(&s)?)),
        None => None,
    })
}

/// `None` leaves the field alone, `Some(None)` clears it.
fn date_change(value: Option<String>, clear: bool) -> Result<Option<Option<DateValue>>> {
    match (value, clear) {
        (Some(_), true) => bail!("cannot both set and clear the same date"),
        (_, true) => Ok(Some(None)),
        (v, false) => Ok(parse_opt_date(v)?.map(Some)),
    }
}

/// Build table state over every task column from command-line specs.
fn build_state(filters: &[String], sort: Option<&str>) -> Result<FilterSortState<TaskColumn>> {
    let mut state = FilterSortState::new(TaskColumn::value_variants().iter().copied());
    for spec in filters {
        let (column, values) = parse_filter_spec(spec)?;
        state.set_filter(column, values)?;
    }
    if let Some(spec) = sort {
        let (column, direction) = parse_sort_spec(spec)?;
        state.set_sort(column, Some(direction))?;
    }
    Ok(state)
}

/// Limit the view to one step. Refuses to override a `step=` filter.
fn restrict_to_step(state: &mut FilterSortState<TaskColumn>, step: String) -> Result<()> {
    if state.selected(TaskColumn::Step).is_some_and(|s| !s.is_empty()) {
        bail!("--step cannot be combined with a step= filter");
    }
    state.set_filter(TaskColumn::Step, [step])?;
    Ok(())
}

/// Print the derived status for a stored task or for dates given as flags.
pub fn cmd_status(
    db: &Database,
    task: Option<String>,
    planned_start: Option<String>,
    planned_end: Option<String>,
    actual_start: Option<String>,
    actual_end: Option<String>,
    today: Option<String>,
) -> Result<()> {
    let today = resolve_today(today)?;
    let data = match task {
        Some(id) => db
            .get(&id)
            .map(|t| t.status_data())
            .ok_or_else(|| pmtrack::Error::UnknownTask(id))?,
        None => TaskStatusData {
            planned_start: parse_opt_date(planned_start)?,
            planned_end: parse_opt_date(planned_end)?,
            actual_start: parse_opt_date(actual_start)?,
            actual_end: parse_opt_date(actual_end)?,
        },
    };
    let result = compute_status(&data, today);
    println!("Status:   {}", result.status);
    println!("Color:    {}", result.color);
    println!("Style:    {}", result.bg_color);
    Ok(())
}

/// List tasks through the filter/sort state, or as the Gantt hierarchy.
pub fn cmd_list(
    db: &Database,
    config: &Config,
    filters: Vec<String>,
    sort: Option<String>,
    step: Option<String>,
    tree: bool,
    today: Option<String>,
) -> Result<()> {
    let today = resolve_today(today)?;
    let mut state = build_state(&filters, sort.as_deref())?;
    if let Some(step) = step {
        restrict_to_step(&mut state, step)?;
    }

    if tree {
        if sort.is_some() {
            warn!("--sort is ignored with --tree; the hierarchy keeps position order");
        }
        let flags = config.flags();
        let layout = GanttLayout::build(&db.tasks, today, &flags);
        let rows: Vec<(TaskRow<'_>, usize)> = layout
            .retain_with_ancestors(|r| state.matches(&TaskRow { task: r.task, status: r.status }))
            .into_iter()
            .map(|r| (TaskRow { task: r.task, status: r.status }, r.level))
            .collect();
        print_task_table(rows.iter().map(|(row, level)| (row, *level)));
        if let Some((from, to)) = layout.range {
            println!("\nTimeline: {from} .. {to}");
        }
        if !layout.hierarchical {
            println!("(Gantt view disabled for this session: flat list)");
        }
        return Ok(());
    }

    let rows = TaskRow::build(&db.tasks, today);
    let view = state.apply(&rows);
    print_task_table(view.into_iter().map(|r| (r, 0)));
    if state.has_active_filters() {
        println!("\n{} of {} task(s) match the active filters", state.apply(&rows).len(), rows.len());
    }
    Ok(())
}

/// Print the option list of a column's filter.
pub fn cmd_options(
    db: &Database,
    column: TaskColumn,
    search: String,
    selected: Vec<String>,
    today: Option<String>,
) -> Result<()> {
    let today = resolve_today(today)?;
    let rows = TaskRow::build(&db.tasks, today);
    let options = distinct_options(&rows, column);
    let mut state = FilterSortState::new([column]);
    state.set_filter(
        column,
        selected.into_iter().map(|v| if v == NONE_LABEL { String::new() } else { v }),
    )?;
    let selected = state.selected(column).cloned().unwrap_or_default();
    for option in filter_options(&options, &selected, &search) {
        let mark = if selected.contains(&option.value) { "[x]" } else { "[ ]" };
        println!("{mark} {}", option.label);
    }
    Ok(())
}

/// Add a root task or a subtask.
pub fn cmd_add(
    db: &mut Database,
    db_path: &Path,
    title: String,
    step: Option<String>,
    parent: Option<String>,
    details: Option<String>,
    planned_start: Option<String>,
    planned_end: Option<String>,
    actual_start: Option<String>,
    actual_end: Option<String>,
) -> Result<()> {
    let draft = TaskDraft {
        title,
        details,
        dates: TaskStatusData {
            planned_start: parse_opt_date(planned_start)?,
            planned_end: parse_opt_date(planned_end)?,
            actual_start: parse_opt_date(actual_start)?,
            actual_end: parse_opt_date(actual_end)?,
        },
    };
    let intent = match parent {
        Some(parent_id) => {
            let Some(parent_task) = db.get(&parent_id) else {
                bail!("parent task '{parent_id}' not found");
            };
            if parent_task.is_subtask() {
                bail!("subtasks can only be added under root tasks");
            }
            if step.is_some() {
                warn!("--step is ignored for subtasks; the parent's step is used");
            }
            LayoutIntent::AddSubtask { parent_id, draft }
        }
        None => LayoutIntent::AddRootTask { step_id: step, draft },
    };
    let id = db.apply(intent)?;
    db.save(db_path).context("saving store")?;
    println!("Added task {id}");
    Ok(())
}

/// Apply edits to a task.
pub fn cmd_update(db: &mut Database, db_path: &Path, id: String, changes: TaskChanges) -> Result<()> {
    let id = db.apply(LayoutIntent::EditTask { task_id: id, changes })?;
    db.save(db_path).context("saving store")?;
    if let Some(task) = db.get(&id) {
        println!("Updated task {id}: {}", task.status);
    }
    Ok(())
}

/// Delete a task and its subtasks.
pub fn cmd_delete(db: &mut Database, db_path: &Path, id: String) -> Result<()> {
    let id = db.apply(LayoutIntent::DeleteTask { task_id: id })?;
    db.save(db_path).context("saving store")?;
    println!("Deleted task {id}");
    Ok(())
}

/// List reporting weeks, most recent first.
pub fn cmd_weeks(db: &Database) -> Result<()> {
    let options = week_options(&db.metrics);
    if options.is_empty() {
        println!("No weeks recorded.");
    }
    for option in options {
        println!("{}", option.label);
    }
    Ok(())
}

/// Print health counts and unreviewed customers for one week.
pub fn cmd_health(db: &Database, from: Option<String>, to: Option<String>) -> Result<()> {
    let window = match (from, to) {
        (Some(from), Some(to)) => WeekWindow::new(parse_date(&from)?, parse_date(&to)?),
        _ => match week_options(&db.metrics).first() {
            Some(option) => option.window,
            None => {
                println!("No weeks recorded.");
                return Ok(());
            }
        },
    };
    let summary = weekly_health_summary(window, &db.reviews, &db.customers);
    if summary.unreviewed < 0 {
        warn!(unreviewed = summary.unreviewed, "more reviews than customers on the roster");
    }
    println!("{}", window.label());
    println!("Customers:   {}", summary.total_count);
    println!("Green:       {}", summary.green_count);
    println!("Red:         {}", summary.red_count);
    println!("Reviewed:    {}", summary.reviewed_count);
    println!("Unreviewed:  {}", summary.unreviewed);
    let missing = unreviewed_customers(window, &db.reviews, &db.customers);
    if !missing.is_empty() {
        println!("Awaiting review:");
        for customer in missing {
            println!("  - {} ({})", customer.name, customer.id);
        }
    }
    Ok(())
}

/// Print a metric trend, oldest week first.
pub fn cmd_trend(db: &Database, customer: String, metric: String, limit: usize) -> Result<()> {
    let points = metric_trend_with_limit(&db.metrics, &customer, &metric, limit);
    if points.is_empty() {
        println!("No values for {metric} on {customer}.");
    }
    for p in points {
        let value = p.value.map(|v| v.to_string()).unwrap_or_else(|| "-".into());
        println!("{}  {}", pmtrack::weekly::format_uk_date(p.date_to), value);
    }
    Ok(())
}

fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Export the filtered and sorted task view to CSV.
pub fn cmd_export(
    db: &Database,
    output: Option<String>,
    filters: Vec<String>,
    sort: Option<String>,
    today: Option<String>,
) -> Result<()> {
    let output_path = output.unwrap_or_else(|| "tasks.csv".to_string());
    let today = resolve_today(today)?;
    let state = build_state(&filters, sort.as_deref())?;
    let rows = TaskRow::build(&db.tasks, today);
    let view = state.apply(&rows);

    let mut csv = String::from(
        "ID,Title,Step,Parent,Position,Status,Color,PlannedStart,PlannedEnd,ActualStart,ActualEnd\n",
    );
    let day = |v: &Option<DateValue>| {
        v.as_ref().and_then(|d| d.to_date()).map(|d| d.to_string()).unwrap_or_default()
    };
    for row in &view {
        let t = row.task;
        writeln!(
            csv,
            "{},{},{},{},{},{},{},{},{},{},{}",
            escape_csv(&t.id),
            escape_csv(&t.title),
            escape_csv(t.step_id.as_deref().unwrap_or("")),
            escape_csv(t.parent_task_id.as_deref().unwrap_or("")),
            t.position,
            escape_csv(row.status.status.label()),
            row.status.color,
            day(&t.planned_start),
            day(&t.planned_end),
            day(&t.actual_start),
            day(&t.actual_end),
        )?;
    }

    fs::write(&output_path, csv).with_context(|| format!("writing {output_path}"))?;
    info!(path = %output_path, rows = view.len(), "exported tasks");
    println!("Exported {} task(s) to {}", view.len(), output_path);
    Ok(())
}

/// Generate shell completion scripts.
pub fn cmd_completions(shell: Shell) {
    use clap::CommandFactory;
    use crate::cli::Cli;

    let mut app = Cli::command();
    let app_name = app.get_name().to_string();
    generate(shell, &mut app, app_name, &mut std::io::stdout());
}

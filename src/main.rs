mod app;
mod clock;
mod domain;
mod error;
mod persistence;
mod report;
mod session;
mod ticker;
mod time;

use anyhow::{Context, Result};
use app::App;
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use clock::SystemClock;
use domain::{SessionState, TaskDefinition, Tether};
use persistence::{
    ensure_tether_dir, history_for_date, init_local_tether, load_settings, save_settings,
    settings_file, AppSettings, JsonDirStore,
};
use report::{render_summary, TetherSummary};
use std::io::{self, Write};
use std::path::PathBuf;
use time::{estimated_end, format_clock, format_minutes, format_time_range, format_timer, time_diff};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tether")]
#[command(about = "Time-box your day: run ordered task lists against the clock", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a local .tether directory in the current directory
    Init,
    /// Create a tether from NAME:MINUTES task specs
    New {
        name: String,
        /// Task as NAME:MINUTES[@HH:MM] (repeatable, in order)
        #[arg(short, long = "task", required = true)]
        tasks: Vec<String>,
        /// Fixed start time of day (HH:MM)
        #[arg(short, long)]
        start: Option<String>,
    },
    /// List saved tethers
    List,
    /// Show a tether's tasks
    Show { tether: String },
    /// Rename a tether or change its fixed start time
    Update {
        tether: String,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long, conflicts_with = "clear_start")]
        start: Option<String>,
        #[arg(long)]
        clear_start: bool,
    },
    /// Delete a tether
    Delete { tether: String },
    /// Copy a tether under a new name
    Duplicate { tether: String },
    /// Copy one task of a tether (1-based position) right after itself
    CopyTask { tether: String, position: usize },
    /// Start running a tether
    Start { tether: String },
    /// Pause the running tether
    Pause,
    /// Resume a paused tether
    Resume,
    /// Mark the current task done and move on
    Done,
    /// Skip the current task
    Skip,
    /// End the session now
    Stop,
    /// Show the running session
    Status,
    /// Live countdown for the current task
    Watch {
        /// Return as soon as the current task runs over
        #[arg(long)]
        until_overtime: bool,
    },
    /// Insert a task into the running session (defaults to after the current task)
    Insert {
        /// Task as NAME:MINUTES[@HH:MM]
        task: String,
        /// 1-based position
        #[arg(short, long)]
        at: Option<usize>,
        #[arg(short, long)]
        notes: Option<String>,
    },
    /// Remove an upcoming task from the running session (1-based position)
    Remove { position: usize },
    /// Reorder upcoming tasks in the running session (1-based positions)
    Move { from: usize, to: usize },
    /// List finished sessions for a day
    History {
        /// Date (YYYY-MM-DD). Defaults to today.
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Write a markdown variance report for a day
    Report {
        /// Date to generate report for (YYYY-MM-DD format). Defaults to today.
        #[arg(short, long)]
        date: Option<String>,
        /// Output file path. Defaults to <tether dir>/report-YYYY-MM-DD.md
        #[arg(short, long)]
        output: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init(),
        command => run(command),
    }
}

fn init() -> Result<()> {
    let tether_dir = init_local_tether()?;
    save_settings(tether_dir.join("settings.json"), &AppSettings::default())?;
    println!("Initialized tether directory: {}", tether_dir.display());
    println!();
    println!("Tether will now use this local directory for its data.");
    Ok(())
}

fn run(command: Commands) -> Result<()> {
    let settings = load_settings(settings_file()?)?;
    init_logging(&settings);

    let store = JsonDirStore::new(ensure_tether_dir()?);
    let mut app = App::new(store.clone(), SystemClock)?;

    match command {
        Commands::Init => init()?,
        Commands::New { name, tasks, start } => {
            let tasks = tasks
                .iter()
                .map(|spec| parse_task_spec(spec))
                .collect::<Result<Vec<_>>>()?;
            let tether = app
                .catalog()
                .create_tether(&name, tasks, start, Vec::new(), app.now())?;
            println!("Created '{}' ({} tasks, {})", tether.name, tether.tasks.len(),
                format_minutes(f64::from(tether.planned_minutes())));
        }
        Commands::List => {
            let tethers = app.catalog().tethers();
            if tethers.is_empty() {
                println!("No tethers yet. Create one with 'tether new'.");
            }
            for tether in &tethers {
                print_tether_line(tether);
            }
        }
        Commands::Show { tether } => {
            let tether = app.catalog().find_tether(&tether)?;
            print_tether(&tether, &settings, &app);
        }
        Commands::Update { tether, name, start, clear_start } => {
            let tether = app.catalog().find_tether(&tether)?;
            let start_time = if clear_start { None } else { start.or(tether.start_time.clone()) };
            let updated = app.catalog().update_tether(
                tether.id,
                name.as_deref().unwrap_or(&tether.name),
                tether.tasks.clone(),
                start_time,
                tether.groups.clone(),
                app.now(),
            )?;
            println!("Updated '{}'", updated.name);
        }
        Commands::Delete { tether } => {
            let tether = app.catalog().find_tether(&tether)?;
            let removed = app.catalog().delete_tether(tether.id)?;
            println!("Deleted '{}'", removed.name);
        }
        Commands::Duplicate { tether } => {
            let tether = app.catalog().find_tether(&tether)?;
            let copy = app.catalog().duplicate_tether(tether.id, app.now())?;
            println!("Created '{}'", copy.name);
        }
        Commands::CopyTask { tether, position } => {
            let tether = app.catalog().find_tether(&tether)?;
            let task = position
                .checked_sub(1)
                .and_then(|i| tether.tasks.get(i))
                .with_context(|| format!("No task at position {}", position))?;
            let updated = app.catalog().duplicate_task(tether.id, task.id, app.now())?;
            print_tether(&updated, &settings, &app);
        }
        Commands::Start { tether } => {
            let tether = app.start(&tether)?;
            println!("▶ Started '{}'", tether.name);
            print_status(&app, &settings);
        }
        Commands::Pause => {
            if app.pause()? {
                println!("⏸ Paused");
            } else {
                println!("Nothing is running");
            }
        }
        Commands::Resume => {
            if app.resume()? {
                println!("▶ Resumed");
                print_status(&app, &settings);
            } else {
                println!("Nothing is paused");
            }
        }
        Commands::Done => {
            let summary = app.complete_task()?;
            after_advance(&app, summary, &settings);
        }
        Commands::Skip => {
            let summary = app.skip_task()?;
            after_advance(&app, summary, &settings);
        }
        Commands::Stop => match app.stop()? {
            Some(summary) => print_summary(&summary, &settings),
            None => println!("Nothing is running"),
        },
        Commands::Status => print_status(&app, &settings),
        Commands::Watch { until_overtime } => watch(store, &settings, until_overtime)?,
        Commands::Insert { task, at, notes } => {
            let mut task = parse_task_spec(&task)?;
            if let Some(notes) = notes {
                task = task.with_notes(notes);
            }
            app.insert_task(task, at.map(|p| p.saturating_sub(1)))?;
            print_status(&app, &settings);
        }
        Commands::Remove { position } => {
            let removed = app.remove_task(position.saturating_sub(1))?;
            println!("Removed '{}'", removed.name);
            print_status(&app, &settings);
        }
        Commands::Move { from, to } => {
            app.move_task(from.saturating_sub(1), to.saturating_sub(1))?;
            print_status(&app, &settings);
        }
        Commands::History { date } => {
            let date = parse_date(date)?.unwrap_or_else(|| Local::now().date_naive());
            let summaries = history_for_date(app.catalog().store(), date);
            if summaries.is_empty() {
                println!("No tethers finished on {}", date);
            }
            for summary in &summaries {
                println!("{}  {}  planned {}, actual {}{}",
                    format_time_range(&summary.start_time, &summary.end_time, settings.use_12_hour_clock),
                    summary.tether_name,
                    format_minutes(f64::from(summary.planned_duration)),
                    format_minutes(summary.actual_duration),
                    variance_note(summary));
            }
        }
        Commands::Report { date, output } => {
            let report_date = parse_date(date)?;
            let output_path = output.map(PathBuf::from);

            let report_path = report::generate_report(
                app.catalog().store(),
                report_date,
                output_path,
                settings.use_12_hour_clock,
            )?;
            println!("Report generated: {}", report_path.display());
        }
    }

    Ok(())
}

/// Log to stderr. RUST_LOG wins over the configured filter.
fn init_logging(settings: &AppSettings) {
    let fallback = settings.log_filter.as_deref().unwrap_or("warn");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn parse_date(date: Option<String>) -> Result<Option<NaiveDate>> {
    date.map(|date_str| {
        NaiveDate::parse_from_str(&date_str, "%Y-%m-%d")
            .map_err(|e| anyhow::anyhow!("Invalid date format. Use YYYY-MM-DD: {}", e))
    })
    .transpose()
}

/// "Deep work:50" or "Standup:15@09:30" (anchored to a time of day)
fn parse_task_spec(spec: &str) -> Result<TaskDefinition> {
    let (body, anchor) = match spec.rsplit_once('@') {
        Some((body, anchor)) => (body, Some(anchor.trim())),
        None => (spec, None),
    };
    let (name, minutes) = body
        .rsplit_once(':')
        .with_context(|| format!("Task '{}' should look like NAME:MINUTES[@HH:MM]", spec))?;
    let minutes: u32 = minutes
        .trim()
        .parse()
        .with_context(|| format!("Invalid minutes in '{}'", spec))?;

    let mut task = TaskDefinition::new(name.trim(), minutes);
    if let Some(anchor) = anchor {
        task = task.anchored_at(anchor);
    }
    task.validate()?;
    Ok(task)
}

fn variance_note(summary: &TetherSummary) -> String {
    let variance = summary.variance_minutes().round();
    if variance > 0.0 {
        format!(" (over by {})", format_minutes(variance))
    } else if variance < 0.0 {
        format!(" (early by {})", format_minutes(variance.abs()))
    } else {
        String::new()
    }
}

fn print_tether_line(tether: &Tether) {
    let start = tether
        .start_time
        .as_deref()
        .map(|s| format!(" @ {}", s))
        .unwrap_or_default();
    let last_used = tether
        .last_used
        .map(|ts| format!(", last used {}", ts.with_timezone(&Local).format("%Y-%m-%d")))
        .unwrap_or_default();
    println!("{}  {}{}  ({} tasks, {}{})",
        &tether.id.to_string()[..8],
        tether.name,
        start,
        tether.tasks.len(),
        format_minutes(f64::from(tether.planned_minutes())),
        last_used);
}

fn print_tether(tether: &Tether, settings: &AppSettings, app: &App<JsonDirStore, SystemClock>) {
    print_tether_line(tether);
    for (i, task) in tether.tasks.iter().enumerate() {
        let anchor = task
            .anchored_start_time
            .as_deref()
            .map(|s| format!(" ⚓ {}", s))
            .unwrap_or_default();
        let group = task
            .group_label
            .as_deref()
            .map(|s| format!(" [{}]", s))
            .unwrap_or_default();
        println!("  {}. {} ({}){}{}", i + 1, task.name, format_minutes(f64::from(task.duration)), anchor, group);
    }
    let end = estimated_end(app.now(), &tether.tasks);
    println!("  Started now, it would end at {}", format_clock(&end, settings.use_12_hour_clock));
}

fn print_status(app: &App<JsonDirStore, SystemClock>, settings: &AppSettings) {
    let Some(session) = app.active() else {
        println!("No tether is running");
        return;
    };
    let use_12_hour = settings.use_12_hour_clock;

    println!("{} · {}", session.name, session.state().label());
    if let (Some(task), Some(remaining)) = (session.current_task(), app.projection()) {
        let sign = if remaining.is_overtime && remaining.remaining_seconds < 0 { "+" } else { "" };
        println!("  {}/{} {} ({})  {}{}{}  [{:.0}%]",
            session.current_task_index + 1,
            session.tasks.len(),
            task.name(),
            format_minutes(f64::from(app.current_task_time())),
            sign,
            remaining.display(),
            if remaining.is_overtime { " overtime" } else { " left" },
            remaining.progress_ratio() * 100.0);
        if !task.task.notes.is_empty() {
            println!("  {}", task.task.notes);
        }
    }
    if let Some(next) = session.next_task() {
        println!("  Next: {} ({})", next.name(), format_minutes(f64::from(next.planned())));
    }
    println!("  Done so far: {} | Running for {}",
        format_minutes(app.elapsed_time()),
        time_diff(&session.actual_start_time, &app.now()));
    if let Some(end) = app.estimated_end() {
        println!("  {}", format_time_range(&session.start_time, &end, use_12_hour));
    }
}

fn print_summary(summary: &TetherSummary, settings: &AppSettings) {
    println!("■ Finished '{}'", summary.tether_name);
    println!();
    print!("{}", render_summary(summary, settings.use_12_hour_clock));
}

fn after_advance(app: &App<JsonDirStore, SystemClock>, summary: Option<TetherSummary>, settings: &AppSettings) {
    match summary {
        Some(summary) => print_summary(&summary, settings),
        None if app.state() == SessionState::Idle => println!("Nothing is running"),
        None => print_status(app, settings),
    }
}

/// Re-read the session every tick so commands from other shells show up
fn watch(store: JsonDirStore, settings: &AppSettings, until_overtime: bool) -> Result<()> {
    let tick_rate = ticker::tick_duration(settings);
    let mut stdout = io::stdout();

    loop {
        let app = App::new(store.clone(), SystemClock)?;
        let Some(session) = app.active() else {
            println!();
            println!("No tether is running");
            return Ok(());
        };
        let Some(remaining) = app.projection() else {
            return Ok(());
        };

        let label = if session.is_paused() {
            "paused"
        } else if remaining.is_overtime {
            "overtime"
        } else {
            "left"
        };
        let task = session.current_task().map(|t| t.name().to_string()).unwrap_or_default();
        write!(stdout, "\r\x1b[2K{} · {}  {} {}", session.name, task, format_timer(remaining.remaining_seconds), label)?;
        stdout.flush()?;

        if until_overtime && remaining.is_overtime {
            println!();
            return Ok(());
        }
        std::thread::sleep(tick_rate);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_task_spec() {
        let task = parse_task_spec("Deep work: 50").unwrap();
        assert_eq!(task.name, "Deep work");
        assert_eq!(task.duration, 50);
        assert!(!task.is_anchored);

        let anchored = parse_task_spec("Standup:15@09:30").unwrap();
        assert_eq!(anchored.name, "Standup");
        assert_eq!(anchored.anchored_start_time.as_deref(), Some("09:30"));
    }

    #[test]
    fn test_parse_task_spec_rejects_bad_input() {
        assert!(parse_task_spec("Deep work").is_err());
        assert!(parse_task_spec("Deep work:soon").is_err());
        assert!(parse_task_spec("Nap:0").is_err());
        assert!(parse_task_spec("Standup:15@9am").is_err());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date(None).unwrap(), None);
        assert_eq!(
            parse_date(Some("2024-03-05".to_string())).unwrap(),
            NaiveDate::from_ymd_opt(2024, 3, 5)
        );
        assert!(parse_date(Some("05/03/2024".to_string())).is_err());
    }
}

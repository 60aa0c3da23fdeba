use crate::domain::TaskStatus;
use crate::persistence::{history_for_date, report_file, KeyValueStore};
use crate::report::summary::{TaskSummary, TetherSummary};
use crate::time::{format_minutes, format_time_range};
use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use std::fs;
use std::path::PathBuf;

/// Whole-minute delta with an explicit sign, or None when it rounds to zero
fn signed_delta(minutes: f64) -> Option<String> {
    let rounded = minutes.round();
    if rounded == 0.0 || !rounded.is_finite() {
        return None;
    }
    let sign = if rounded > 0.0 { "+" } else { "-" };
    Some(format!("{}{}", sign, format_minutes(rounded.abs())))
}

fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Completed => "✓",
        TaskStatus::Skipped => "⤼",
        TaskStatus::Partial => "◐",
        TaskStatus::Pending => " ",
    }
}

fn task_row(task: &TaskSummary) -> String {
    let delta = task
        .variance_minutes()
        .and_then(signed_delta)
        .unwrap_or_default();
    let actual = if task.status == TaskStatus::Skipped {
        "-".to_string()
    } else {
        format_minutes(task.actual_duration)
    };

    format!(
        "| {} {} | {} | {} | {} | {} |\n",
        status_icon(task.status),
        task.name,
        task.status.as_str(),
        format_minutes(f64::from(task.planned_duration)),
        actual,
        delta
    )
}

/// Markdown for a single finished session
pub fn render_summary(summary: &TetherSummary, use_12_hour: bool) -> String {
    let mut report = String::new();

    report.push_str(&format!("## {}\n\n", summary.tether_name));
    report.push_str(&format!(
        "- **Time:** {}\n",
        format_time_range(&summary.start_time, &summary.end_time, use_12_hour)
    ));
    report.push_str(&format!(
        "- **Planned:** {}\n",
        format_minutes(f64::from(summary.planned_duration))
    ));
    report.push_str(&format!(
        "- **Actual:** {}\n",
        format_minutes(summary.actual_duration)
    ));

    let variance = summary.variance_minutes().round();
    if variance > 0.0 {
        report.push_str(&format!("- You went over by {}\n", format_minutes(variance)));
    } else if variance < 0.0 {
        report.push_str(&format!(
            "- You finished early by {}\n",
            format_minutes(variance.abs())
        ));
    } else {
        report.push_str("- Right on time\n");
    }
    report.push_str(&format!(
        "- **Tasks:** {} completed, {} partial, {} skipped\n\n",
        summary.count(TaskStatus::Completed),
        summary.count(TaskStatus::Partial),
        summary.count(TaskStatus::Skipped)
    ));

    report.push_str("| Task | Status | Planned | Actual | Delta |\n");
    report.push_str("|------|--------|---------|--------|-------|\n");
    for task in &summary.tasks {
        report.push_str(&task_row(task));
    }
    report.push('\n');

    report
}

/// Markdown for every session finished on `date`
pub fn render_history(date: NaiveDate, summaries: &[TetherSummary], use_12_hour: bool) -> String {
    let mut report = String::new();
    report.push_str(&format!("# Tether Report - {}\n\n", date));

    if summaries.is_empty() {
        report.push_str("No tethers finished on this day.\n");
        return report;
    }

    let planned: u64 = summaries.iter().map(|s| u64::from(s.planned_duration)).sum();
    let actual: f64 = summaries.iter().map(|s| s.actual_duration).sum();
    report.push_str(&format!(
        "**{} tethers** | planned {} | actual {}\n\n",
        summaries.len(),
        format_minutes(planned as f64),
        format_minutes(actual)
    ));

    for summary in summaries {
        report.push_str(&render_summary(summary, use_12_hour));
    }

    report
}

/// Write the history report for a date (default today) and return its path
pub fn generate_report<S: KeyValueStore + ?Sized>(
    store: &S,
    date: Option<NaiveDate>,
    output_path: Option<PathBuf>,
    use_12_hour: bool,
) -> Result<PathBuf> {
    let report_date = date.unwrap_or_else(|| Local::now().date_naive());
    let summaries = history_for_date(store, report_date);
    let report = render_history(report_date, &summaries, use_12_hour);

    let output = match output_path {
        Some(path) => path,
        None => report_file(report_date)?,
    };
    fs::write(&output, report)
        .with_context(|| format!("Failed to write report: {}", output.display()))?;

    Ok(output)
}

use crate::domain::{ActiveSession, TaskStatus};
use crate::time::elapsed_minutes;
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Planned vs actual for one task
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSummary {
    pub id: Uuid,
    pub name: String,
    pub planned_duration: u32,
    pub actual_duration: f64,
    pub status: TaskStatus,
}

impl TaskSummary {
    /// Actual minus planned; positive is overtime, negative an early finish.
    /// Skipped tasks have no variance.
    pub fn variance_minutes(&self) -> Option<f64> {
        if self.status == TaskStatus::Skipped {
            return None;
        }
        Some(self.actual_duration - f64::from(self.planned_duration))
    }
}

/// Immutable record of one finished session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TetherSummary {
    pub tether_id: Uuid,
    pub tether_name: String,
    pub date: NaiveDate,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Sum of planned minutes
    pub planned_duration: u32,
    /// Wall-clock minutes from session start to stop, pauses included
    pub actual_duration: f64,
    pub tasks: Vec<TaskSummary>,
}

impl TetherSummary {
    /// Actual minus planned for the whole session
    pub fn variance_minutes(&self) -> f64 {
        self.actual_duration - f64::from(self.planned_duration)
    }

    pub fn is_overtime(&self) -> bool {
        self.variance_minutes() > 0.0
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|task| task.status == status).count()
    }
}

/// Build the variance summary for a session whose tasks are already finalized
pub fn build_summary(session: &ActiveSession, now: DateTime<Utc>) -> TetherSummary {
    let tasks = session
        .tasks
        .iter()
        .map(|task| TaskSummary {
            id: task.id(),
            name: task.name().to_string(),
            planned_duration: task.planned(),
            actual_duration: task.actual_or_zero(),
            status: task.status,
        })
        .collect();

    TetherSummary {
        tether_id: session.tether_id,
        tether_name: session.name.clone(),
        date: now.with_timezone(&Local).date_naive(),
        start_time: session.start_time,
        end_time: now,
        planned_duration: session.planned_minutes(),
        actual_duration: elapsed_minutes(&session.start_time, &now),
        tasks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{SessionPhase, TaskDefinition, TaskRuntime};
    use chrono::{Duration, TimeZone};

    fn finished_session() -> ActiveSession {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        let mut tasks: Vec<TaskRuntime> = [10, 10, 10]
            .iter()
            .enumerate()
            .map(|(i, d)| TaskRuntime::pending(TaskDefinition::new(format!("Task {}", i + 1), *d)))
            .collect();
        tasks[0].mark_completed(12.0);
        tasks[1].mark_skipped();
        tasks[2].mark_partial(4.0);

        ActiveSession {
            tether_id: Uuid::new_v4(),
            name: "Morning".to_string(),
            tasks,
            start_time: start,
            end_time: start + Duration::minutes(30),
            current_task_index: 2,
            phase: SessionPhase::Running,
            actual_start_time: start,
            task_started_at: start + Duration::minutes(12),
        }
    }

    #[test]
    fn test_build_summary() {
        let session = finished_session();
        let now = session.start_time + Duration::minutes(16);
        let summary = build_summary(&session, now);

        assert_eq!(summary.tether_name, "Morning");
        assert_eq!(summary.planned_duration, 30);
        assert_eq!(summary.actual_duration, 16.0);
        assert_eq!(summary.end_time, now);
        assert_eq!(summary.variance_minutes(), -14.0);
        assert!(!summary.is_overtime());
        assert_eq!(summary.count(TaskStatus::Skipped), 1);

        let actual: Vec<f64> = summary.tasks.iter().map(|t| t.actual_duration).collect();
        assert_eq!(actual, vec![12.0, 0.0, 4.0]);
    }

    #[test]
    fn test_task_variance_skips_skipped() {
        let summary = build_summary(&finished_session(), Utc::now());
        assert_eq!(summary.tasks[0].variance_minutes(), Some(2.0));
        assert_eq!(summary.tasks[1].variance_minutes(), None);
        assert_eq!(summary.tasks[2].variance_minutes(), Some(-6.0));
    }

    #[test]
    fn test_future_start_never_goes_negative() {
        let session = finished_session();
        let summary = build_summary(&session, session.start_time - Duration::minutes(5));
        assert_eq!(summary.actual_duration, 0.0);
    }
}

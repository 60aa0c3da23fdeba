use super::enums::SessionState;
use super::task::TaskRuntime;
use crate::time::duration_from_minutes;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether the session clock is ticking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionPhase {
    Running,
    Paused { paused_at: DateTime<Utc> },
}

/// The single in-progress execution of a tether
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSession {
    /// Source tether
    pub tether_id: Uuid,
    pub name: String,
    /// Session-local copies of the tether's tasks
    pub tasks: Vec<TaskRuntime>,
    /// Scheduled start: now, or a later fixed start time
    pub start_time: DateTime<Utc>,
    /// Projected end, rebased whenever the remaining schedule changes
    pub end_time: DateTime<Utc>,
    pub current_task_index: usize,
    pub phase: SessionPhase,
    /// When start() was actually called
    pub actual_start_time: DateTime<Utc>,
    /// When the current task became current
    pub task_started_at: DateTime<Utc>,
}

impl ActiveSession {
    pub fn state(&self) -> SessionState {
        match self.phase {
            SessionPhase::Running => SessionState::Running,
            SessionPhase::Paused { .. } => SessionState::Paused,
        }
    }

    pub fn is_running(&self) -> bool {
        self.phase == SessionPhase::Running
    }

    pub fn is_paused(&self) -> bool {
        matches!(self.phase, SessionPhase::Paused { .. })
    }

    pub fn paused_at(&self) -> Option<DateTime<Utc>> {
        match self.phase {
            SessionPhase::Paused { paused_at } => Some(paused_at),
            SessionPhase::Running => None,
        }
    }

    pub fn current_task(&self) -> Option<&TaskRuntime> {
        self.tasks.get(self.current_task_index)
    }

    pub fn current_task_mut(&mut self) -> Option<&mut TaskRuntime> {
        self.tasks.get_mut(self.current_task_index)
    }

    pub fn next_task(&self) -> Option<&TaskRuntime> {
        self.tasks.get(self.current_task_index + 1)
    }

    pub fn is_last_task(&self) -> bool {
        self.current_task_index + 1 >= self.tasks.len()
    }

    /// Sum of planned minutes across every task
    pub fn planned_minutes(&self) -> u32 {
        self.tasks
            .iter()
            .map(TaskRuntime::planned)
            .fold(0, u32::saturating_add)
    }

    /// Start time plus actual minutes of finished tasks plus planned minutes
    /// of the current and remaining tasks
    pub fn rebased_end_time(&self) -> DateTime<Utc> {
        let (done, remaining) = self.tasks.split_at(self.current_task_index.min(self.tasks.len()));
        let finished: f64 = done.iter().map(TaskRuntime::actual_or_zero).sum();
        let planned: i64 = remaining.iter().map(|task| i64::from(task.planned())).sum();

        self.start_time + duration_from_minutes(finished) + Duration::minutes(planned)
    }

    /// Structural sanity check used when restoring from storage
    pub fn is_consistent(&self) -> bool {
        !self.tasks.is_empty() && self.current_task_index < self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskDefinition;
    use chrono::TimeZone;

    fn session(durations: &[u32]) -> ActiveSession {
        let start = Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap();
        ActiveSession {
            tether_id: Uuid::new_v4(),
            name: "Morning".to_string(),
            tasks: durations
                .iter()
                .map(|d| TaskRuntime::pending(TaskDefinition::new(format!("Task {}", d), *d)))
                .collect(),
            start_time: start,
            end_time: start,
            current_task_index: 0,
            phase: SessionPhase::Running,
            actual_start_time: start,
            task_started_at: start,
        }
    }

    #[test]
    fn test_rebased_end_time_uses_actuals_for_finished_work() {
        let mut s = session(&[10, 20, 30]);
        assert_eq!(s.rebased_end_time(), s.start_time + Duration::minutes(60));

        s.tasks[0].mark_completed(15.0);
        s.current_task_index = 1;
        assert_eq!(s.rebased_end_time(), s.start_time + Duration::minutes(65));

        s.tasks[1].mark_skipped();
        s.current_task_index = 2;
        assert_eq!(s.rebased_end_time(), s.start_time + Duration::minutes(45));
    }

    #[test]
    fn test_planned_minutes_saturates_on_unvalidated_records() {
        let s = session(&[3_000_000_000, 3_000_000_000]);
        assert_eq!(s.planned_minutes(), u32::MAX);
        assert_eq!(session(&[10, 20]).planned_minutes(), 30);
    }

    #[test]
    fn test_phase_accessors() {
        let mut s = session(&[10]);
        assert!(s.is_running());
        assert_eq!(s.paused_at(), None);

        let at = s.start_time + Duration::minutes(3);
        s.phase = SessionPhase::Paused { paused_at: at };
        assert!(s.is_paused());
        assert!(!s.is_running());
        assert_eq!(s.paused_at(), Some(at));
        assert_eq!(s.state(), SessionState::Paused);
    }

    #[test]
    fn test_is_consistent() {
        let mut s = session(&[10, 10]);
        assert!(s.is_consistent());
        assert!(!s.is_last_task());
        s.current_task_index = 1;
        assert!(s.is_last_task());
        s.current_task_index = 2;
        assert!(!s.is_consistent());
    }

    #[test]
    fn test_phase_json_shape() {
        let at = Utc.with_ymd_and_hms(2024, 3, 5, 9, 5, 0).unwrap();
        let value = serde_json::to_value(SessionPhase::Paused { paused_at: at }).unwrap();
        assert_eq!(value["state"], "paused");
        assert!(value["paused_at"].is_string());
    }
}

use super::enums::TaskStatus;
use crate::error::TetherError;
use crate::time::parse_time_of_day;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Longest plannable task: one day
pub const MAX_TASK_MINUTES: u32 = 24 * 60;

/// A durable unit of work inside a tether
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: Uuid,
    pub name: String,
    /// Planned duration in whole minutes
    pub duration: u32,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_anchored: bool,
    /// Fixed time of day ("HH:MM") when anchored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchored_start_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<String>,
    /// Template the task was inserted from, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kitblock_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kitblock_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_label: Option<String>,
}

impl TaskDefinition {
    pub fn new(name: impl Into<String>, duration: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            duration,
            notes: String::new(),
            is_anchored: false,
            anchored_start_time: None,
            scheduled_date: None,
            kitblock_id: None,
            kitblock_name: None,
            group_label: None,
        }
    }

    /// Pin the task to a time of day
    pub fn anchored_at(mut self, time_of_day: impl Into<String>) -> Self {
        self.is_anchored = true;
        self.anchored_start_time = Some(time_of_day.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    /// Check duration and anchor format
    pub fn validate(&self) -> Result<(), TetherError> {
        if self.duration == 0 || self.duration > MAX_TASK_MINUTES {
            return Err(TetherError::InvalidDuration(self.name.clone()));
        }
        if let Some(anchor) = &self.anchored_start_time {
            if parse_time_of_day(anchor).is_none() {
                return Err(TetherError::InvalidStartTime(anchor.clone()));
            }
        }
        Ok(())
    }

    /// Copy with a fresh id and the anchor cleared
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: format!("{} (copy)", self.name),
            is_anchored: false,
            anchored_start_time: None,
            ..self.clone()
        }
    }
}

/// A task as it exists inside a running session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRuntime {
    #[serde(flatten)]
    pub task: TaskDefinition,
    #[serde(default)]
    pub completed: bool,
    pub status: TaskStatus,
    /// Minutes actually spent, set once the task is finalized
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_duration: Option<f64>,
    /// Seconds spent paused while this task was current
    #[serde(default)]
    pub paused_duration: i64,
}

impl TaskRuntime {
    /// Session-local copy of a definition, not yet started
    pub fn pending(task: TaskDefinition) -> Self {
        Self {
            task,
            completed: false,
            status: TaskStatus::Pending,
            actual_duration: None,
            paused_duration: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.task.id
    }

    pub fn name(&self) -> &str {
        &self.task.name
    }

    /// Planned duration in minutes
    pub fn planned(&self) -> u32 {
        self.task.duration
    }

    pub fn mark_completed(&mut self, actual_minutes: f64) {
        self.completed = true;
        self.status = TaskStatus::Completed;
        self.actual_duration = Some(actual_minutes.max(0.0));
    }

    pub fn mark_skipped(&mut self) {
        self.completed = false;
        self.status = TaskStatus::Skipped;
        self.actual_duration = Some(0.0);
    }

    pub fn mark_partial(&mut self, actual_minutes: f64) {
        self.completed = false;
        self.status = TaskStatus::Partial;
        self.actual_duration = Some(actual_minutes.max(0.0));
    }

    /// Re-stamp a task that sits before the current index after an edit.
    /// Finalized tasks keep their outcome.
    pub fn stamp_finished(&mut self) {
        if !self.status.is_terminal() {
            self.status = TaskStatus::Completed;
            self.completed = true;
        }
    }

    /// Clear runtime fields of a task that sits after the current index
    pub fn reset_pending(&mut self) {
        self.completed = false;
        self.status = TaskStatus::Pending;
        self.actual_duration = None;
        self.paused_duration = 0;
    }

    /// Recorded actual minutes, or zero if none
    pub fn actual_or_zero(&self) -> f64 {
        self.actual_duration.unwrap_or(0.0)
    }
}

/// Named grouping of task ids inside a tether
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskGroup {
    pub id: Uuid,
    pub name: String,
    pub tasks: Vec<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_validate() {
        assert!(TaskDefinition::new("Write", 25).validate().is_ok());
        assert_eq!(
            TaskDefinition::new("Nothing", 0).validate(),
            Err(TetherError::InvalidDuration("Nothing".to_string()))
        );
        assert!(TaskDefinition::new("Day", MAX_TASK_MINUTES).validate().is_ok());
        assert_eq!(
            TaskDefinition::new("Forever", 3_000_000_000).validate(),
            Err(TetherError::InvalidDuration("Forever".to_string()))
        );
        assert_eq!(
            TaskDefinition::new("Standup", 15).anchored_at("9am").validate(),
            Err(TetherError::InvalidStartTime("9am".to_string()))
        );
    }

    #[test]
    fn test_duplicate_clears_anchor() {
        let task = TaskDefinition::new("Standup", 15)
            .anchored_at("09:30")
            .with_notes("daily");
        let copy = task.duplicate();
        assert_ne!(copy.id, task.id);
        assert_eq!(copy.name, "Standup (copy)");
        assert!(!copy.is_anchored);
        assert!(copy.anchored_start_time.is_none());
        assert_eq!(copy.notes, "daily");
    }

    #[test]
    fn test_runtime_transitions() {
        let mut task = TaskRuntime::pending(TaskDefinition::new("Write", 25));
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.actual_duration.is_none());

        task.mark_completed(27.5);
        assert!(task.completed);
        assert_eq!(task.actual_duration, Some(27.5));

        task.mark_partial(-3.0);
        assert_eq!(task.status, TaskStatus::Partial);
        assert_eq!(task.actual_duration, Some(0.0));

        task.mark_skipped();
        assert!(!task.completed);
        assert_eq!(task.actual_or_zero(), 0.0);
    }

    #[test]
    fn test_stamp_finished_keeps_skipped() {
        let mut skipped = TaskRuntime::pending(TaskDefinition::new("A", 5));
        skipped.mark_skipped();
        skipped.stamp_finished();
        assert_eq!(skipped.status, TaskStatus::Skipped);

        let mut pending = TaskRuntime::pending(TaskDefinition::new("B", 5));
        pending.stamp_finished();
        assert_eq!(pending.status, TaskStatus::Completed);
        assert!(pending.completed);
        assert!(pending.actual_duration.is_none());
    }

    #[test]
    fn test_runtime_json_is_flat() {
        let task = TaskRuntime::pending(TaskDefinition::new("Write", 25));
        let value = serde_json::to_value(&task).unwrap();
        assert_eq!(value["name"], "Write");
        assert_eq!(value["duration"], 25);
        assert_eq!(value["status"], "pending");
        let back: TaskRuntime = serde_json::from_value(value).unwrap();
        assert_eq!(back, task);
    }
}

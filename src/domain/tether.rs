use super::task::{TaskDefinition, TaskGroup};
use crate::error::TetherError;
use crate::time::parse_time_of_day;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// A named, ordered plan of tasks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tether {
    pub id: Uuid,
    pub name: String,
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub groups: Vec<TaskGroup>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used: Option<DateTime<Utc>>,
    /// Fixed start time of day ("HH:MM")
    #[serde(default)]
    pub start_time: Option<String>,
}

impl Tether {
    pub fn new(
        name: impl Into<String>,
        tasks: Vec<TaskDefinition>,
        start_time: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Self, TetherError> {
        let tether = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            tasks,
            groups: Vec::new(),
            created_at: now,
            last_used: None,
            start_time,
        };
        tether.validate()?;
        Ok(tether)
    }

    pub fn with_groups(mut self, groups: Vec<TaskGroup>) -> Self {
        self.groups = groups;
        self
    }

    /// Empty task lists, zero durations and malformed start times are rejected
    pub fn validate(&self) -> Result<(), TetherError> {
        if self.tasks.is_empty() {
            return Err(TetherError::EmptyTether(self.name.clone()));
        }
        for task in &self.tasks {
            task.validate()?;
        }
        if let Some(start) = &self.start_time {
            if parse_time_of_day(start).is_none() {
                return Err(TetherError::InvalidStartTime(start.clone()));
            }
        }
        Ok(())
    }

    /// Sum of planned minutes
    pub fn planned_minutes(&self) -> u32 {
        self.tasks
            .iter()
            .map(|task| task.duration)
            .fold(0, u32::saturating_add)
    }

    /// Copy with fresh ids; group membership follows the copied tasks
    pub fn duplicate(&self, now: DateTime<Utc>) -> Self {
        let mut id_map: HashMap<Uuid, Uuid> = HashMap::new();
        let tasks = self
            .tasks
            .iter()
            .map(|task| {
                let copy = TaskDefinition {
                    id: Uuid::new_v4(),
                    ..task.clone()
                };
                id_map.insert(task.id, copy.id);
                copy
            })
            .collect();

        let groups = self
            .groups
            .iter()
            .map(|group| TaskGroup {
                id: Uuid::new_v4(),
                name: group.name.clone(),
                tasks: group
                    .tasks
                    .iter()
                    .filter_map(|id| id_map.get(id).copied())
                    .collect(),
            })
            .collect();

        Self {
            id: Uuid::new_v4(),
            name: format!("{} (Copy)", self.name),
            tasks,
            groups,
            created_at: now,
            last_used: None,
            start_time: self.start_time.clone(),
        }
    }
}

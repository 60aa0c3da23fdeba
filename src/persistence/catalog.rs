use super::store::{load_record, save_record, KeyValueStore};
use crate::domain::{TaskDefinition, TaskGroup, Tether};
use crate::error::TetherError;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

pub const TETHERS_KEY: &str = "tethers";

/// Resolve a reference to an index: exact id or name first, then id/name prefix
pub fn position_of(tethers: &[Tether], reference: &str) -> Result<Option<usize>, TetherError> {
    let needle = reference.trim().to_lowercase();
    if needle.is_empty() {
        return Ok(None);
    }

    let exact: Vec<usize> = tethers
        .iter()
        .enumerate()
        .filter(|(_, tether)| {
            tether.id.to_string() == needle || tether.name.to_lowercase() == needle
        })
        .map(|(i, _)| i)
        .collect();

    let candidates = if exact.is_empty() {
        tethers
            .iter()
            .enumerate()
            .filter(|(_, tether)| {
                tether.id.to_string().starts_with(&needle)
                    || tether.name.to_lowercase().starts_with(&needle)
            })
            .map(|(i, _)| i)
            .collect()
    } else {
        exact
    };

    match candidates.as_slice() {
        [] => Ok(None),
        [only] => Ok(Some(*only)),
        many => {
            let names: Vec<String> = many
                .iter()
                .map(|&i| tethers[i].name.clone())
                .collect();
            Err(TetherError::ambiguous(reference, &names))
        }
    }
}

/// Tether definitions over a key-value store
pub struct Catalog<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> Catalog<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// All tethers; a malformed list is discarded
    pub fn tethers(&self) -> Vec<Tether> {
        load_record(&self.store, TETHERS_KEY).unwrap_or_default()
    }

    fn save_tethers(&self, tethers: &[Tether]) -> Result<()> {
        save_record(&self.store, TETHERS_KEY, tethers)
    }

    pub fn find_tether(&self, reference: &str) -> Result<Tether> {
        let mut tethers = self.tethers();
        let index = position_of(&tethers, reference)?
            .ok_or_else(|| TetherError::TetherNotFound(reference.to_string()))?;
        Ok(tethers.swap_remove(index))
    }

    pub fn get_tether(&self, id: Uuid) -> Option<Tether> {
        self.tethers().into_iter().find(|tether| tether.id == id)
    }

    pub fn create_tether(
        &self,
        name: &str,
        tasks: Vec<TaskDefinition>,
        start_time: Option<String>,
        groups: Vec<TaskGroup>,
        now: DateTime<Utc>,
    ) -> Result<Tether> {
        let tether = Tether::new(name, tasks, start_time, now)?.with_groups(groups);
        let mut tethers = self.tethers();
        tethers.push(tether.clone());
        self.save_tethers(&tethers)?;
        info!(tether = %tether.name, tasks = tether.tasks.len(), "tether created");
        Ok(tether)
    }

    /// Replace a tether's definition and stamp it as used
    pub fn update_tether(
        &self,
        id: Uuid,
        name: &str,
        tasks: Vec<TaskDefinition>,
        start_time: Option<String>,
        groups: Vec<TaskGroup>,
        now: DateTime<Utc>,
    ) -> Result<Tether> {
        let mut tethers = self.tethers();
        let tether = tethers
            .iter_mut()
            .find(|tether| tether.id == id)
            .ok_or_else(|| TetherError::TetherNotFound(id.to_string()))?;

        let updated = Tether {
            name: name.to_string(),
            tasks,
            groups,
            start_time,
            last_used: Some(now),
            ..tether.clone()
        };
        updated.validate()?;
        *tether = updated.clone();

        self.save_tethers(&tethers)?;
        Ok(updated)
    }

    pub fn delete_tether(&self, id: Uuid) -> Result<Tether> {
        let mut tethers = self.tethers();
        let index = tethers
            .iter()
            .position(|tether| tether.id == id)
            .ok_or_else(|| TetherError::TetherNotFound(id.to_string()))?;
        let removed = tethers.remove(index);
        self.save_tethers(&tethers)?;
        info!(tether = %removed.name, "tether deleted");
        Ok(removed)
    }

    pub fn duplicate_tether(&self, id: Uuid, now: DateTime<Utc>) -> Result<Tether> {
        let mut tethers = self.tethers();
        let copy = tethers
            .iter()
            .find(|tether| tether.id == id)
            .ok_or_else(|| TetherError::TetherNotFound(id.to_string()))?
            .duplicate(now);
        tethers.push(copy.clone());
        self.save_tethers(&tethers)?;
        Ok(copy)
    }

    /// Record that a tether was started. Its definition is left alone.
    pub fn touch_last_used(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        let mut tethers = self.tethers();
        if let Some(tether) = tethers.iter_mut().find(|tether| tether.id == id) {
            tether.last_used = Some(now);
            self.save_tethers(&tethers)?;
        }
        Ok(())
    }

    /// Insert a copy of one task right after the original
    pub fn duplicate_task(&self, tether_id: Uuid, task_id: Uuid, now: DateTime<Utc>) -> Result<Tether> {
        let tether = self
            .get_tether(tether_id)
            .ok_or_else(|| TetherError::TetherNotFound(tether_id.to_string()))?;
        let index = tether
            .tasks
            .iter()
            .position(|task| task.id == task_id)
            .with_context(|| format!("Task {} is not part of {}", task_id, tether.name))?;

        let mut tasks = tether.tasks.clone();
        tasks.insert(index + 1, tasks[index].duplicate());
        self.update_tether(
            tether.id,
            &tether.name,
            tasks,
            tether.start_time.clone(),
            tether.groups.clone(),
            now,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::store::MemoryStore;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 5, 8, 0, 0).unwrap()
    }

    fn catalog() -> Catalog<MemoryStore> {
        Catalog::new(MemoryStore::new())
    }

    fn tasks() -> Vec<TaskDefinition> {
        vec![TaskDefinition::new("Write", 25), TaskDefinition::new("Review", 10)]
    }

    #[test]
    fn test_create_and_find_tether() {
        let catalog = catalog();
        let created = catalog
            .create_tether("Morning", tasks(), Some("09:00".to_string()), vec![], now())
            .unwrap();

        assert_eq!(catalog.find_tether("morning").unwrap(), created);
        assert_eq!(catalog.find_tether("Morn").unwrap().id, created.id);
        assert_eq!(catalog.find_tether(&created.id.to_string()[..8]).unwrap().id, created.id);
        assert!(catalog.find_tether("evening").is_err());
    }

    #[test]
    fn test_create_rejects_empty_tether() {
        let err = catalog()
            .create_tether("Empty", vec![], None, vec![], now())
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<TetherError>(),
            Some(&TetherError::EmptyTether("Empty".to_string()))
        );
    }

    #[test]
    fn test_ambiguous_prefix() {
        let catalog = catalog();
        catalog.create_tether("Morning", tasks(), None, vec![], now()).unwrap();
        catalog.create_tether("Mornings", tasks(), None, vec![], now()).unwrap();

        assert_eq!(catalog.find_tether("Morning").unwrap().name, "Morning");
        let err = catalog.find_tether("Morn").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TetherError>(),
            Some(TetherError::AmbiguousRef { .. })
        ));
    }

    #[test]
    fn test_update_delete_duplicate() {
        let catalog = catalog();
        let created = catalog.create_tether("Morning", tasks(), None, vec![], now()).unwrap();

        let later = now() + chrono::Duration::hours(1);
        let updated = catalog
            .update_tether(created.id, "Early", tasks(), None, vec![], later)
            .unwrap();
        assert_eq!(updated.name, "Early");
        assert_eq!(updated.last_used, Some(later));
        assert_eq!(updated.created_at, created.created_at);

        let copy = catalog.duplicate_tether(created.id, later).unwrap();
        assert_eq!(copy.name, "Early (Copy)");
        assert_eq!(catalog.tethers().len(), 2);

        catalog.delete_tether(created.id).unwrap();
        let remaining: Vec<Uuid> = catalog.tethers().iter().map(|t| t.id).collect();
        assert_eq!(remaining, vec![copy.id]);
    }

    #[test]
    fn test_touch_last_used_keeps_definition() {
        let catalog = catalog();
        let created = catalog.create_tether("Morning", tasks(), None, vec![], now()).unwrap();
        catalog.touch_last_used(created.id, now()).unwrap();

        let stored = catalog.get_tether(created.id).unwrap();
        assert_eq!(stored.last_used, Some(now()));
        assert_eq!(stored.tasks, created.tasks);
    }

    #[test]
    fn test_malformed_tethers_are_discarded() {
        let catalog = catalog();
        catalog
            .store()
            .save(TETHERS_KEY, &json!([{"id": "nope", "name": 3}]))
            .unwrap();
        assert!(catalog.tethers().is_empty());
    }

    #[test]
    fn test_duplicate_task_inserts_after_original() {
        let catalog = catalog();
        let created = catalog.create_tether("Morning", tasks(), None, vec![], now()).unwrap();

        let updated = catalog
            .duplicate_task(created.id, created.tasks[0].id, now())
            .unwrap();
        let names: Vec<&str> = updated.tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["Write", "Write (copy)", "Review"]);
        assert_ne!(updated.tasks[1].id, created.tasks[0].id);
        assert!(catalog.duplicate_task(created.id, Uuid::new_v4(), now()).is_err());
    }
}

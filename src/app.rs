use crate::clock::Clock;
use crate::domain::{ActiveSession, SessionState, TaskDefinition, Tether};
use crate::persistence::{
    append_summary, load_active_session, save_active_session, Catalog, KeyValueStore,
};
use crate::report::TetherSummary;
use crate::session::{RemainingTime, SessionEngine};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tracing::debug;

/// Ties the session engine to durable storage.
///
/// Every mutation persists the active session (or its absence) before
/// returning, and finished sessions are appended to history.
pub struct App<S: KeyValueStore, C: Clock> {
    catalog: Catalog<S>,
    engine: SessionEngine<C>,
}

impl<S: KeyValueStore, C: Clock> App<S, C> {
    /// Restore whatever session was in flight when the process last exited
    pub fn new(store: S, clock: C) -> Result<Self> {
        let session = load_active_session(&store)?;
        if let Some(session) = &session {
            debug!(tether = %session.name, state = session.state().label(), "restored session");
        }
        Ok(Self {
            catalog: Catalog::new(store),
            engine: SessionEngine::restore(clock, session),
        })
    }

    pub fn catalog(&self) -> &Catalog<S> {
        &self.catalog
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.engine.now()
    }

    fn persist(&self) -> Result<()> {
        save_active_session(self.catalog.store(), self.engine.active())
    }

    /// History is written before the session record is cleared, so a failed
    /// append leaves the session on disk to be stopped again.
    fn record(&self, summary: Option<TetherSummary>) -> Result<Option<TetherSummary>> {
        if let Some(summary) = &summary {
            append_summary(self.catalog.store(), summary)?;
        }
        self.persist()?;
        Ok(summary)
    }

    /// Start a tether by id, name or unique prefix
    pub fn start(&mut self, reference: &str) -> Result<Tether> {
        let tether = self.catalog.find_tether(reference)?;
        self.engine.start(&tether)?;
        self.catalog.touch_last_used(tether.id, self.engine.now())?;
        self.persist()?;
        Ok(tether)
    }

    pub fn pause(&mut self) -> Result<bool> {
        let changed = self.engine.pause();
        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    pub fn resume(&mut self) -> Result<bool> {
        let changed = self.engine.resume();
        if changed {
            self.persist()?;
        }
        Ok(changed)
    }

    pub fn complete_task(&mut self) -> Result<Option<TetherSummary>> {
        let summary = self.engine.complete_task();
        self.record(summary)
    }

    pub fn skip_task(&mut self) -> Result<Option<TetherSummary>> {
        let summary = self.engine.skip_task();
        self.record(summary)
    }

    pub fn stop(&mut self) -> Result<Option<TetherSummary>> {
        let summary = self.engine.stop();
        self.record(summary)
    }

    pub fn edit_tasks(&mut self, tasks: Vec<TaskDefinition>) -> Result<()> {
        self.engine.edit_tasks(tasks)?;
        self.persist()
    }

    fn session_tasks(&self) -> Result<Vec<TaskDefinition>> {
        match self.engine.active() {
            Some(session) => Ok(session.tasks.iter().map(|t| t.task.clone()).collect()),
            None => bail!("No tether is running"),
        }
    }

    /// Insert a task into the running session. Defaults to right after the current task.
    pub fn insert_task(&mut self, task: TaskDefinition, position: Option<usize>) -> Result<()> {
        let mut tasks = self.session_tasks()?;
        let after_current = self.current_index().map_or(tasks.len(), |i| i + 1);
        let at = position.unwrap_or(after_current).min(tasks.len());
        tasks.insert(at, task);
        self.edit_tasks(tasks)
    }

    /// Remove the task at `index` from the running session
    pub fn remove_task(&mut self, index: usize) -> Result<TaskDefinition> {
        let mut tasks = self.session_tasks()?;
        if index >= tasks.len() {
            bail!("No task at position {}", index + 1);
        }
        let removed = tasks.remove(index);
        self.edit_tasks(tasks)?;
        Ok(removed)
    }

    /// Move a task within the running session
    pub fn move_task(&mut self, from: usize, to: usize) -> Result<()> {
        let mut tasks = self.session_tasks()?;
        if from >= tasks.len() || to >= tasks.len() {
            bail!("Positions must be between 1 and {}", tasks.len());
        }
        let task = tasks.remove(from);
        tasks.insert(to, task);
        self.edit_tasks(tasks)
    }

    pub fn state(&self) -> SessionState {
        self.engine.state()
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.engine.active()
    }

    pub fn current_index(&self) -> Option<usize> {
        self.engine.active().map(|session| session.current_task_index)
    }

    pub fn projection(&self) -> Option<RemainingTime> {
        self.engine.projection()
    }

    pub fn current_task_time(&self) -> u32 {
        self.engine.current_task_time()
    }

    pub fn elapsed_time(&self) -> f64 {
        self.engine.elapsed_time()
    }

    pub fn estimated_end(&self) -> Option<DateTime<Utc>> {
        self.engine.estimated_end()
    }
}

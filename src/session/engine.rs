use super::projection::{project, RemainingTime, TaskClock};
use crate::clock::Clock;
use crate::domain::{
    ActiveSession, SessionPhase, SessionState, TaskDefinition, TaskRuntime, Tether,
};
use crate::error::TetherError;
use crate::report::{build_summary, TetherSummary};
use crate::time::{elapsed_minutes, estimated_end, resolve_time_of_day, seconds_between};
use chrono::{DateTime, Local, Utc};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Owner of the single active session.
///
/// Only `start` and `edit_tasks` report errors. Every other transition is a
/// silent no-op when its precondition does not hold, so a UI can fire them
/// without checking state first.
pub struct SessionEngine<C: Clock> {
    clock: C,
    active: Option<ActiveSession>,
}

impl<C: Clock> SessionEngine<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            active: None,
        }
    }

    /// Rebuild the engine around a session restored from storage
    pub fn restore(clock: C, session: Option<ActiveSession>) -> Self {
        let active = session.filter(|session| {
            if !session.is_consistent() {
                warn!(tether = %session.name, "discarding inconsistent session");
                return false;
            }
            true
        });
        Self { clock, active }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn state(&self) -> SessionState {
        self.active
            .as_ref()
            .map_or(SessionState::Idle, ActiveSession::state)
    }

    /// Start running a tether. Fails if any session already exists.
    pub fn start(&mut self, tether: &Tether) -> Result<(), TetherError> {
        if let Some(existing) = &self.active {
            warn!(running = %existing.name, requested = %tether.name, "rejected concurrent session");
            return Err(TetherError::SessionConflict);
        }
        if tether.tasks.is_empty() {
            return Err(TetherError::EmptyTether(tether.name.clone()));
        }

        let now = self.clock.now();
        let start_time = scheduled_start(tether, now);
        let session = ActiveSession {
            tether_id: tether.id,
            name: tether.name.clone(),
            tasks: tether.tasks.iter().cloned().map(TaskRuntime::pending).collect(),
            start_time,
            end_time: estimated_end(start_time, &tether.tasks),
            current_task_index: 0,
            phase: SessionPhase::Running,
            actual_start_time: now,
            task_started_at: now,
        };

        info!(
            tether = %tether.name,
            tasks = session.tasks.len(),
            start = %start_time,
            end = %session.end_time,
            "session started"
        );
        self.active = Some(session);
        Ok(())
    }

    /// Returns true if the session moved from running to paused
    pub fn pause(&mut self) -> bool {
        let now = self.clock.now();
        match self.active.as_mut() {
            Some(session) if session.is_running() => {
                session.phase = SessionPhase::Paused { paused_at: now };
                debug!(tether = %session.name, "session paused");
                true
            }
            _ => false,
        }
    }

    /// Returns true if the session moved from paused to running
    pub fn resume(&mut self) -> bool {
        let now = self.clock.now();
        let Some(session) = self.active.as_mut() else {
            return false;
        };
        let Some(paused_at) = session.paused_at() else {
            return false;
        };

        let seconds_paused = seconds_between(&paused_at, &now).max(0);
        if let Some(task) = session.current_task_mut() {
            task.paused_duration += seconds_paused;
        }
        session.phase = SessionPhase::Running;
        debug!(tether = %session.name, seconds_paused, "session resumed");
        true
    }

    /// Finish the current task. Returns the summary if it was the last one.
    pub fn complete_task(&mut self) -> Option<TetherSummary> {
        let now = self.clock.now();
        let session = self.active.as_mut()?;
        let actual = elapsed_minutes(&session.task_started_at, &now);
        let task = session.current_task_mut()?;
        task.mark_completed(actual);
        info!(task = %task.name(), actual_minutes = actual, "task completed");

        self.advance_or_finish(now)
    }

    /// Skip the current task. Returns the summary if it was the last one.
    pub fn skip_task(&mut self) -> Option<TetherSummary> {
        let now = self.clock.now();
        let session = self.active.as_mut()?;
        let task = session.current_task_mut()?;
        task.mark_skipped();
        info!(task = %task.name(), "task skipped");

        self.advance_or_finish(now)
    }

    /// End the session and produce its summary. No-op when idle.
    pub fn stop(&mut self) -> Option<TetherSummary> {
        let now = self.clock.now();
        self.finish(now)
    }

    /// Replace the session's task list after an external insert, delete or reorder.
    ///
    /// The current task must stay at the current index. Runtime state is carried
    /// over by task id; tasks before the current index are stamped finished and
    /// tasks after it are reset to pending. On error nothing is applied.
    pub fn edit_tasks(&mut self, tasks: Vec<TaskDefinition>) -> Result<(), TetherError> {
        let Some(session) = self.active.as_mut() else {
            return Ok(());
        };
        let index = session.current_task_index;
        let Some(current_id) = session.current_task().map(TaskRuntime::id) else {
            return Err(TetherError::invalid_edit("session has no current task"));
        };

        if tasks.is_empty() {
            return Err(TetherError::invalid_edit("a running tether needs at least one task"));
        }
        let mut seen = HashSet::new();
        if !tasks.iter().all(|task| seen.insert(task.id)) {
            return Err(TetherError::invalid_edit("task list contains duplicate ids"));
        }
        match tasks.get(index) {
            Some(task) if task.id == current_id => {}
            _ if seen.contains(&current_id) => {
                return Err(TetherError::invalid_edit("the task in progress cannot be moved"));
            }
            _ => {
                return Err(TetherError::invalid_edit("the task in progress was removed"));
            }
        }
        for task in &tasks {
            task.validate()?;
        }

        let previous: HashMap<_, _> = session.tasks.iter().map(|t| (t.id(), t)).collect();
        let rebuilt: Vec<TaskRuntime> = tasks
            .into_iter()
            .enumerate()
            .map(|(i, task)| {
                let mut runtime = match previous.get(&task.id) {
                    Some(old) => TaskRuntime {
                        task,
                        ..(*old).clone()
                    },
                    None => TaskRuntime::pending(task),
                };
                if i < index {
                    runtime.stamp_finished();
                } else if i > index {
                    runtime.reset_pending();
                }
                runtime
            })
            .collect();

        session.tasks = rebuilt;
        session.end_time = session.rebased_end_time();
        info!(
            tether = %session.name,
            tasks = session.tasks.len(),
            end = %session.end_time,
            "session tasks edited"
        );
        Ok(())
    }

    /// Seconds left on the current task; 0 when idle or paused
    pub fn current_task_time_left(&self) -> i64 {
        match &self.active {
            Some(session) if session.is_running() => self
                .projection()
                .map_or(0, |remaining| remaining.remaining_seconds),
            _ => 0,
        }
    }

    /// Countdown for the current task. While paused it is frozen at the pause instant.
    pub fn projection(&self) -> Option<RemainingTime> {
        let session = self.active.as_ref()?;
        let clock = TaskClock::for_session(session)?;
        let at = session.paused_at().unwrap_or_else(|| self.clock.now());
        Some(project(at, &clock))
    }

    /// Minutes accounted to tasks before the current one (actual if recorded, else planned)
    pub fn elapsed_time(&self) -> f64 {
        let Some(session) = &self.active else {
            return 0.0;
        };
        session.tasks[..session.current_task_index.min(session.tasks.len())]
            .iter()
            .map(|task| task.actual_duration.unwrap_or(f64::from(task.planned())))
            .sum()
    }

    /// Planned minutes of the current task
    pub fn current_task_time(&self) -> u32 {
        self.active
            .as_ref()
            .and_then(ActiveSession::current_task)
            .map_or(0, TaskRuntime::planned)
    }

    pub fn estimated_end(&self) -> Option<DateTime<Utc>> {
        self.active.as_ref().map(|session| session.end_time)
    }

    fn advance_or_finish(&mut self, now: DateTime<Utc>) -> Option<TetherSummary> {
        let session = self.active.as_mut()?;
        if session.is_last_task() {
            return self.finish(now);
        }

        session.current_task_index += 1;
        session.task_started_at = now;
        if session.is_paused() {
            // the next task only owes pause time from its own start
            session.phase = SessionPhase::Paused { paused_at: now };
        }
        session.end_time = session.rebased_end_time();
        debug!(index = session.current_task_index, end = %session.end_time, "advanced");
        None
    }

    fn finish(&mut self, now: DateTime<Utc>) -> Option<TetherSummary> {
        let mut session = self.active.take()?;
        let index = session.current_task_index;
        let task_started_at = session.task_started_at;

        for (i, task) in session.tasks.iter_mut().enumerate() {
            if i == index && !task.status.is_terminal() {
                task.mark_partial(elapsed_minutes(&task_started_at, &now));
            } else if i > index {
                task.mark_skipped();
            }
        }

        let summary = build_summary(&session, now);
        info!(
            tether = %summary.tether_name,
            planned_minutes = summary.planned_duration,
            actual_minutes = summary.actual_duration,
            "session stopped"
        );
        Some(summary)
    }
}

/// Now, unless the tether's fixed start time is still ahead today
fn scheduled_start(tether: &Tether, now: DateTime<Utc>) -> DateTime<Utc> {
    let Some(fixed) = tether.start_time.as_deref() else {
        return now;
    };
    match resolve_time_of_day(&now.with_timezone(&Local), fixed) {
        Some(at) => {
            let at = at.with_timezone(&Utc);
            if at > now {
                at
            } else {
                now
            }
        }
        None => {
            warn!(tether = %tether.name, start_time = fixed, "ignoring unparseable start time");
            now
        }
    }
}

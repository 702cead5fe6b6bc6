use chrono::{DateTime, Local};

use crate::format::{elapsed_seconds, format_duration, format_time_of_day};
use crate::record::LogRecord;

/// The task currently being timed. At most one exists at a time.
#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSession {
    pub task_name: String,
    pub description: String,
    pub started_at: DateTime<Local>,
}

/// A session that was stopped, before it is turned into a [`LogRecord`].
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedSession {
    pub task_name: String,
    pub description: String,
    pub started_at: DateTime<Local>,
    pub ended_at: DateTime<Local>,
    pub seconds: u64,
}

impl CompletedSession {
    pub fn into_record(self, time_format: &str) -> LogRecord {
        LogRecord {
            start: format_time_of_day(self.started_at, time_format),
            end: format_time_of_day(self.ended_at, time_format),
            duration: format_duration(self.seconds),
            task: self.task_name,
            description: self.description,
            seconds: self.seconds,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SessionController {
    active: Option<ActiveSession>,
    elapsed: u64,
}

impl SessionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts timing `task_name`. Does nothing and returns false when the name is
    /// empty or a session is already running.
    pub fn start(&mut self, task_name: &str, description: &str, now: DateTime<Local>) -> bool {
        if task_name.is_empty() || self.active.is_some() {
            return false;
        }
        self.active = Some(ActiveSession {
            task_name: task_name.to_string(),
            description: description.to_string(),
            started_at: now,
        });
        self.elapsed = 0;
        true
    }

    /// Ends the running session. The task name is the one given at start, the
    /// description is the one current at stop. `None` when nothing was running.
    pub fn stop(&mut self, description: &str, now: DateTime<Local>) -> Option<CompletedSession> {
        let session = self.active.take()?;
        self.elapsed = 0;
        Some(CompletedSession {
            seconds: elapsed_seconds(session.started_at, now),
            task_name: session.task_name,
            description: description.to_string(),
            started_at: session.started_at,
            ended_at: now,
        })
    }

    /// Recomputes the displayed elapsed seconds. Display only, never stored.
    pub fn refresh_elapsed(&mut self, now: DateTime<Local>) -> u64 {
        if let Some(session) = &self.active {
            self.elapsed = elapsed_seconds(session.started_at, now);
        }
        self.elapsed
    }

    pub fn active(&self) -> Option<&ActiveSession> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }
}

use chrono::{DateTime, Utc};

use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Converting,
    Done,
    Failed,
}

impl SessionState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Converting => "converting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }
}

/// One upload moving through `Idle -> Converting -> Done | Failed`.
///
/// Every other transition is rejected and leaves the session unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSession {
    file_name: String,
    state: SessionState,
    created_at: DateTime<Utc>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error_message: Option<String>,
}

impl ConversionSession {
    pub fn new(file_name: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            file_name: file_name.into(),
            state: SessionState::Idle,
            created_at: now,
            started_at: None,
            finished_at: None,
            error_message: None,
        }
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn begin(&mut self, now: DateTime<Utc>) -> Result<(), ApiError> {
        self.transition(SessionState::Idle, SessionState::Converting)?;
        self.started_at = Some(now);
        Ok(())
    }

    pub fn finish(&mut self, now: DateTime<Utc>) -> Result<(), ApiError> {
        self.transition(SessionState::Converting, SessionState::Done)?;
        self.finished_at = Some(now);
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>, now: DateTime<Utc>) -> Result<(), ApiError> {
        self.transition(SessionState::Converting, SessionState::Failed)?;
        self.finished_at = Some(now);
        self.error_message = Some(message.into());
        Ok(())
    }

    /// Milliseconds spent converting, once the session has ended.
    pub fn elapsed_ms(&self) -> Option<i64> {
        let started = self.started_at?;
        let finished = self.finished_at?;
        Some((finished - started).num_milliseconds())
    }

    pub fn summary(&self) -> String {
        let elapsed = self
            .elapsed_ms()
            .map_or_else(|| "-".to_string(), |ms| format!("{ms}ms"));
        match &self.error_message {
            Some(message) => format!(
                "session '{}' {} after {elapsed}: {message}",
                self.file_name,
                self.state.as_str()
            ),
            None => format!(
                "session '{}' {} after {elapsed}",
                self.file_name,
                self.state.as_str()
            ),
        }
    }

    fn transition(&mut self, from: SessionState, to: SessionState) -> Result<(), ApiError> {
        if self.state != from {
            return Err(ApiError::Internal(format!(
                "illegal session transition {} -> {} for '{}'",
                self.state.as_str(),
                to.as_str(),
                self.file_name
            )));
        }
        self.state = to;
        Ok(())
    }
}

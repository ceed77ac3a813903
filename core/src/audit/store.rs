use std::{
    fmt, fs,
    io::Write,
    path::PathBuf,
    sync::Mutex,
};

use crate::audit::types::{CrisisEvent, CrisisEventDraft, ReviewerStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditErrorKind {
    Io,
    InvalidRequest,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditError {
    pub kind: AuditErrorKind,
    pub message: String,
}

impl AuditError {
    pub fn new(kind: AuditErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for AuditError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AuditError {}

fn io_error(message: impl Into<String>) -> AuditError {
    AuditError::new(AuditErrorKind::Io, message)
}

fn invalid_request(message: impl Into<String>) -> AuditError {
    AuditError::new(AuditErrorKind::InvalidRequest, message)
}

#[derive(Debug, Default)]
struct AuditInner {
    next_seq: u64,
    events: Vec<CrisisEvent>,
}

/// Append-only crisis-event log with monotonic ids per store. Each append is
/// one atomic line write; review-status updates append an amended copy and
/// the loader keeps the last line per id.
#[derive(Debug)]
pub struct AuditStore {
    path: Option<PathBuf>,
    inner: Mutex<AuditInner>,
}

impl AuditStore {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            inner: Mutex::new(AuditInner::default()),
        }
    }

    pub fn with_log_path(path: PathBuf) -> Result<Self, AuditError> {
        let mut inner = AuditInner::default();
        match fs::read_to_string(&path) {
            Ok(content) => {
                for (line_no, line) in content.lines().enumerate() {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let event: CrisisEvent = serde_json::from_str(line).map_err(|err| {
                        io_error(format!(
                            "corrupt audit log '{}' at line {}: {err}",
                            path.display(),
                            line_no + 1
                        ))
                    })?;
                    let seq = parse_event_seq(&event.event_id);
                    if seq > inner.next_seq {
                        inner.next_seq = seq;
                    }
                    match inner
                        .events
                        .iter_mut()
                        .find(|e| e.event_id == event.event_id)
                    {
                        Some(slot) => *slot = event,
                        None => inner.events.push(event),
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(io_error(format!(
                    "failed to read audit log '{}': {err}",
                    path.display()
                )));
            }
        }

        Ok(Self {
            path: Some(path),
            inner: Mutex::new(inner),
        })
    }

    pub fn append(&self, draft: CrisisEventDraft) -> Result<CrisisEvent, AuditError> {
        let mut inner = self.inner.lock().expect("audit lock poisoned");
        inner.next_seq += 1;
        let event = draft.into_event(format!("evt:{:016}", inner.next_seq));
        self.write_line(&event)?;
        inner.events.push(event.clone());

        tracing::info!(
            target: "audit",
            event_id = %event.event_id,
            risk = %event.risk,
            ai_failure = event.ai_failure_detected,
            degradation = event.model_degradation_detected,
            stopped = event.conversation_stopped,
            "crisis_event_recorded"
        );
        Ok(event)
    }

    /// Only mutation allowed after append, reserved for the review workflow.
    pub fn update_review(
        &self,
        event_id: &str,
        status: ReviewerStatus,
    ) -> Result<CrisisEvent, AuditError> {
        let mut inner = self.inner.lock().expect("audit lock poisoned");
        let event = inner
            .events
            .iter_mut()
            .find(|e| e.event_id == event_id)
            .ok_or_else(|| invalid_request(format!("unknown event '{}'", event_id)))?;
        event.reviewer_status = status;
        let updated = event.clone();
        drop(inner);
        self.write_line(&updated)?;
        Ok(updated)
    }

    pub fn events_for(&self, user_id: &str, conversation_id: &str) -> Vec<CrisisEvent> {
        let inner = self.inner.lock().expect("audit lock poisoned");
        inner
            .events
            .iter()
            .filter(|e| e.user_id == user_id && e.conversation_id == conversation_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("audit lock poisoned").events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn last(&self) -> Option<CrisisEvent> {
        self.inner
            .lock()
            .expect("audit lock poisoned")
            .events
            .last()
            .cloned()
    }

    fn write_line(&self, event: &CrisisEvent) -> Result<(), AuditError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                io_error(format!(
                    "failed to create audit directory '{}': {err}",
                    parent.display()
                ))
            })?;
        }
        let encoded = serde_json::to_string(event)
            .map_err(|err| io_error(format!("failed to encode crisis event: {err}")))?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|err| {
                io_error(format!(
                    "failed to open audit log '{}': {err}",
                    path.display()
                ))
            })?;
        let mut line = encoded.into_bytes();
        line.push(b'\n');
        file.write_all(&line).map_err(|err| {
            io_error(format!(
                "failed to append to audit log '{}': {err}",
                path.display()
            ))
        })?;
        file.flush()
            .map_err(|err| io_error(format!("failed to flush audit log: {err}")))?;
        Ok(())
    }
}

fn parse_event_seq(event_id: &str) -> u64 {
    event_id
        .strip_prefix("evt:")
        .and_then(|rest| rest.parse::<u64>().ok())
        .unwrap_or(0)
}
